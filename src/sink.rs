//! Structured trace records and the sinks that receive them
//!
//! Text rendering is left to the sink. `LogSink` hands records to the `log`
//! facade; `MemorySink` keeps them for inspection.

use crate::classify::StackPtr;
use crate::frame::FrameDescriptor;
use crate::symbols::Label;
use crate::watch::ChangeEvent;
use crate::window::WindowEvent;
use crate::{Address, Word};
use log::info;

/// A heap pointer. `offset` is absent when no heap zone is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapPtr {
    pub offset: Option<isize>,
    pub raw: Option<Address>,
}

/// One general purpose register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterValue {
    /// 1-based register number
    pub index: usize,
    pub value: Word,
    /// Offset into the heap zone when the value points there
    pub heap_offset: Option<isize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialRegisters {
    pub succip: Label,
    pub curfr: StackPtr,
    pub maxfr: StackPtr,
    pub hp: HeapPtr,
    pub sp: StackPtr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeapAllocEvent {
    UnravelUniv { univ: Word, type_info: Word, value: Word },
    NewUnivOnHeap { type_info: Word, value: Word, univ: Word },
    TagOffsetIncrHp { tag: u32, offset: i64, count: u64, atomic: bool, ptr: Word },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceRecord {
    /// The four fixed fields only; the det frame and redo frame slots of
    /// own-stack frames are not reported.
    NewChoicePoint {
        procedure: String,
        frame: StackPtr,
        previous: StackPtr,
        success_frame: StackPtr,
        success_ip: Label,
        retry_ip: Label,
    },
    NewTempFrame {
        frame: StackPtr,
        previous: StackPtr,
        retry_ip: Label,
        /// Present for det temp frames
        det_frame: Option<StackPtr>,
    },
    Succeed {
        discard: bool,
        frame: StackPtr,
        success_frame: StackPtr,
        success_ip: Label,
    },
    Fail {
        frame: StackPtr,
        fail_frame: StackPtr,
        fail_ip: Label,
    },
    Redo {
        frame: StackPtr,
        redo_frame: StackPtr,
        redo_ip: Label,
    },
    Call {
        call: u64,
        tail: bool,
        target: Label,
        continuation: Label,
    },
    Proceed,
    /// Values just stored below `at`, lowest address first
    HeapCreate { values: Vec<Word>, at: HeapPtr },
    HeapIncrement { words: Word, from: HeapPtr },
    /// `words` pushed (`increment`) or popped at `from`
    DetStackAdjust { words: Word, increment: bool, from: StackPtr },
    Goto { target: Label },
    RegisterDump { values: Vec<RegisterValue> },
    Registers {
        message: String,
        special: Option<SpecialRegisters>,
        ordinary: Vec<RegisterValue>,
    },
    Frame {
        message: String,
        frame: FrameDescriptor,
        ordinary: Vec<RegisterValue>,
    },
    ChoiceStackDump { frames: Vec<FrameDescriptor> },
    Window(WindowEvent),
    WatchedWord { address: Address, value: Option<Word> },
    CallSiteChanged(ChangeEvent),
    HeapAlloc(HeapAllocEvent),
}

pub trait TraceSink {
    fn emit(&mut self, record: TraceRecord);
}

/// Forwards every record to `log::info!`, numbered
#[derive(Debug, Default)]
pub struct LogSink {
    count: usize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl TraceSink for LogSink {
    fn emit(&mut self, record: TraceRecord) {
        self.count += 1;
        info!("[{:05}] {:?}", self.count, record);
    }
}

/// Keeps every record in order
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<TraceRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TraceRecord] {
        &self.records
    }

    pub fn take(&mut self) -> Vec<TraceRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl TraceSink for MemorySink {
    fn emit(&mut self, record: TraceRecord) {
        self.records.push(record);
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn emit(&mut self, record: TraceRecord) {
        (**self).emit(record);
    }
}
