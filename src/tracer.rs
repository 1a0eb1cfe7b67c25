//! Event entry points called by the machine
//!
//! Each hook is called in line with execution and returns before the
//! machine resumes. Watches are polled on success, failure, redo, call,
//! tail call and proceed whether or not printing is on; every other record
//! is produced only while the call windows (or the manual override) enable
//! printing and, where it applies, the record's category flag is set.

use crate::classify::{PointerClassifier, StackPtr};
use crate::config::TraceConfig;
use crate::context::StackKind;
use crate::error::IntrospectError;
use crate::frame::{describe, describe_temp, FrameView};
use crate::machine::MachineView;
use crate::sink::{HeapAllocEvent, HeapPtr, RegisterValue, SpecialRegisters, TraceRecord, TraceSink};
use crate::walk::walk;
use crate::watch::DifferentialWatch;
use crate::window::CallWindowController;
use crate::{Address, CodeAddr, Word};
use log::debug;

pub struct Tracer<S: TraceSink> {
    config: TraceConfig,
    window: CallWindowController,
    watch: DifferentialWatch,
    sink: S,
}

impl<S: TraceSink> Tracer<S> {
    pub fn new(config: TraceConfig, sink: S) -> Self {
        let window = CallWindowController::new(config.window_settings());
        let watch = DifferentialWatch::new(config.watch_call_site, config.facets);
        Tracer {
            config,
            window,
            watch,
            sink,
        }
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    pub fn window(&self) -> &CallWindowController {
        &self.window
    }

    pub fn watch(&self) -> &DifferentialWatch {
        &self.watch
    }

    pub fn print_enabled(&self) -> bool {
        self.window.print_enabled()
    }

    /// Switch on the manual override for the rest of the run
    pub fn enable_manual(&mut self) {
        self.window.enable_manual();
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn classifier<'a>(&self, view: &MachineView<'a>) -> PointerClassifier<'a> {
        view.classifier(self.config.stack_model)
    }

    fn choice_ptr(&self, view: &MachineView<'_>, addr: Address) -> Result<StackPtr, IntrospectError> {
        self.classifier(view)
            .pointer(addr, StackKind::Choice, self.config.raw_addresses)
    }

    fn det_ptr(&self, view: &MachineView<'_>, addr: Address) -> Result<StackPtr, IntrospectError> {
        self.classifier(view)
            .pointer(addr, StackKind::Det, self.config.raw_addresses)
    }

    fn heap_ptr(&self, view: &MachineView<'_>, addr: Address) -> HeapPtr {
        match view.heap_zone() {
            Some(heap) => HeapPtr {
                offset: Some(heap.offset_of(addr)),
                raw: self.config.raw_addresses.then_some(addr),
            },
            None => HeapPtr {
                offset: None,
                raw: Some(addr),
            },
        }
    }

    fn ordinary_regs(&self, view: &MachineView<'_>) -> Vec<RegisterValue> {
        let heap = view.heap_zone();
        view.registers
            .general
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let addr = value as Address;
                RegisterValue {
                    index: i + 1,
                    value,
                    heap_offset: heap
                        .filter(|zone| zone.contains(addr))
                        .map(|zone| zone.offset_of(addr)),
                }
            })
            .collect()
    }

    fn special_regs(&self, view: &MachineView<'_>) -> Result<SpecialRegisters, IntrospectError> {
        let regs = view.registers;
        Ok(SpecialRegisters {
            succip: view.symbols.resolve(regs.succip),
            curfr: self.choice_ptr(view, regs.curfr)?,
            maxfr: self.choice_ptr(view, regs.maxfr)?,
            hp: self.heap_ptr(view, regs.hp),
            sp: self.det_ptr(view, regs.sp)?,
        })
    }

    /// Count the call, move the windows and start the call-site watch when
    /// its site is entered
    fn count_call(&mut self, view: &MachineView<'_>, proc: CodeAddr) {
        let next_site = view.call_sites.and_then(|src| src.next_call_site());
        let outcome = self.window.on_call(proc, view.symbols, next_site);
        if outcome.watch_started {
            self.watch.start();
        }
        for event in outcome.events {
            self.sink.emit(TraceRecord::Window(event));
        }
    }

    fn do_watches(&mut self, view: &MachineView<'_>) {
        if let Some(address) = self.config.watch_address {
            let value = view.zones.read_any(address);
            if value.is_none() {
                debug!("watched address 0x{:x} is not in any zone", address);
            }
            self.sink.emit(TraceRecord::WatchedWord { address, value });
        }

        if let (Some(site), Some(source)) = (self.watch.site(), view.call_sites) {
            let current = source.record_at(site);
            if let Some(change) = self.watch.poll(self.window.calls(), current.as_ref()) {
                self.sink.emit(TraceRecord::CallSiteChanged(change));
            }
        }
    }

    /// A new ordinary choice point for `procedure` is at curfr
    pub fn make_frame(&mut self, view: &MachineView<'_>, procedure: &str) -> Result<(), IntrospectError> {
        if !self.print_enabled() {
            return Ok(());
        }

        let curfr = view.registers.curfr;
        let frame = FrameView::at(&self.classifier(view), curfr)?;
        let record = TraceRecord::NewChoicePoint {
            procedure: procedure.to_string(),
            frame: self.choice_ptr(view, curfr)?,
            previous: self.choice_ptr(view, frame.previous_frame()?)?,
            success_frame: self.choice_ptr(view, frame.success_frame()?)?,
            success_ip: view.symbols.resolve(frame.success_continuation()?),
            retry_ip: view.symbols.resolve(frame.retry_continuation()?),
        };
        self.sink.emit(record);

        if self.config.detail {
            self.emit_choice_stack(view)?;
        }
        Ok(())
    }

    /// A new temp frame is at maxfr
    pub fn make_temp_frame(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        self.temp_frame(view, false)
    }

    /// A new det temp frame is at maxfr
    pub fn make_det_temp_frame(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        self.temp_frame(view, true)
    }

    fn temp_frame(&mut self, view: &MachineView<'_>, det: bool) -> Result<(), IntrospectError> {
        if !self.print_enabled() {
            return Ok(());
        }

        let maxfr = view.registers.maxfr;
        let temp = describe_temp(&self.classifier(view), maxfr, det)?;
        let det_frame = match temp.det_frame {
            Some(detfr) => Some(self.det_ptr(view, detfr)?),
            None => None,
        };
        let record = TraceRecord::NewTempFrame {
            frame: self.choice_ptr(view, maxfr)?,
            previous: self.choice_ptr(view, temp.previous_frame)?,
            retry_ip: view.symbols.resolve(temp.retry_continuation),
            det_frame,
        };
        self.sink.emit(record);

        if self.config.detail {
            self.emit_choice_stack(view)?;
        }
        Ok(())
    }

    pub fn succeed(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        self.succeed_from(view, false)
    }

    pub fn succeed_discard(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        self.succeed_from(view, true)
    }

    fn succeed_from(&mut self, view: &MachineView<'_>, discard: bool) -> Result<(), IntrospectError> {
        self.do_watches(view);
        if !self.print_enabled() {
            return Ok(());
        }

        let curfr = view.registers.curfr;
        let frame = FrameView::at(&self.classifier(view), curfr)?;
        let record = TraceRecord::Succeed {
            discard,
            frame: self.choice_ptr(view, curfr)?,
            success_frame: self.choice_ptr(view, frame.success_frame()?)?,
            success_ip: view.symbols.resolve(frame.success_continuation()?),
        };
        self.sink.emit(record);

        if self.config.detail {
            self.print_regs(view, "registers at success")?;
        }
        Ok(())
    }

    /// The current frame failed; control moves to its predecessor's retry
    pub fn fail(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        self.do_watches(view);
        if !self.print_enabled() {
            return Ok(());
        }

        let classifier = self.classifier(view);
        let curfr = view.registers.curfr;
        let prevfr = FrameView::at(&classifier, curfr)?.previous_frame()?;
        let fail_ip = FrameView::at(&classifier, prevfr)?.retry_continuation()?;
        let record = TraceRecord::Fail {
            frame: self.choice_ptr(view, curfr)?,
            fail_frame: self.choice_ptr(view, prevfr)?,
            fail_ip: view.symbols.resolve(fail_ip),
        };
        self.sink.emit(record);
        Ok(())
    }

    /// Backtracking into the topmost frame
    pub fn redo(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        self.do_watches(view);
        if !self.print_enabled() {
            return Ok(());
        }

        let maxfr = view.registers.maxfr;
        let redo_ip = FrameView::at(&self.classifier(view), maxfr)?.retry_continuation()?;
        let record = TraceRecord::Redo {
            frame: self.choice_ptr(view, view.registers.curfr)?,
            redo_frame: self.choice_ptr(view, maxfr)?,
            redo_ip: view.symbols.resolve(redo_ip),
        };
        self.sink.emit(record);
        Ok(())
    }

    pub fn call(&mut self, view: &MachineView<'_>, proc: CodeAddr, succ_cont: CodeAddr) -> Result<(), IntrospectError> {
        self.count_call(view, proc);
        self.do_watches(view);
        if !self.print_enabled() {
            return Ok(());
        }

        self.sink.emit(TraceRecord::Call {
            call: self.window.calls(),
            tail: false,
            target: view.symbols.resolve(proc),
            continuation: view.symbols.resolve(succ_cont),
        });
        if self.config.any_regs() {
            self.print_regs(view, "at call:")?;
        }
        Ok(())
    }

    /// A tail call continues to the caller's success continuation
    pub fn tail_call(&mut self, view: &MachineView<'_>, proc: CodeAddr) -> Result<(), IntrospectError> {
        self.count_call(view, proc);
        self.do_watches(view);
        if !self.print_enabled() {
            return Ok(());
        }

        self.sink.emit(TraceRecord::Call {
            call: self.window.calls(),
            tail: true,
            target: view.symbols.resolve(proc),
            continuation: view.symbols.resolve(view.registers.succip),
        });
        if self.config.any_regs() {
            self.print_regs(view, "at tailcall:")?;
        }
        Ok(())
    }

    /// Return from a deterministic procedure
    pub fn proceed(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        self.do_watches(view);
        if !self.print_enabled() {
            return Ok(());
        }

        self.sink.emit(TraceRecord::Proceed);
        if self.config.any_regs() {
            self.print_regs(view, "at proceed:")?;
        }
        Ok(())
    }

    /// A cell of `arity` words was just stored immediately below `addr`
    pub fn create(&mut self, view: &MachineView<'_>, addr: Address, arity: usize) -> Result<(), IntrospectError> {
        if !self.print_enabled() {
            return Ok(());
        }

        let start = addr.checked_sub(arity).ok_or(IntrospectError::Unmapped(addr))?;
        let values = (start..addr)
            .map(|a| view.zones.read_any(a).ok_or(IntrospectError::Unmapped(a)))
            .collect::<Result<Vec<Word>, _>>()?;
        self.sink.emit(TraceRecord::HeapCreate {
            values,
            at: self.heap_ptr(view, addr),
        });
        Ok(())
    }

    pub fn incr_hp(&mut self, view: &MachineView<'_>, words: Word, addr: Address) -> Result<(), IntrospectError> {
        if !self.print_enabled() {
            return Ok(());
        }
        self.sink.emit(TraceRecord::HeapIncrement {
            words,
            from: self.heap_ptr(view, addr),
        });
        Ok(())
    }

    pub fn incr_sp(&mut self, view: &MachineView<'_>, words: Word, addr: Address) -> Result<(), IntrospectError> {
        self.adjust_sp(view, words, true, addr)
    }

    pub fn decr_sp(&mut self, view: &MachineView<'_>, words: Word, addr: Address) -> Result<(), IntrospectError> {
        self.adjust_sp(view, words, false, addr)
    }

    fn adjust_sp(
        &mut self,
        view: &MachineView<'_>,
        words: Word,
        increment: bool,
        addr: Address,
    ) -> Result<(), IntrospectError> {
        if !self.print_enabled() {
            return Ok(());
        }
        let from = self.det_ptr(view, addr)?;
        self.sink.emit(TraceRecord::DetStackAdjust {
            words,
            increment,
            from,
        });
        Ok(())
    }

    pub fn goto(&mut self, view: &MachineView<'_>, target: CodeAddr) -> Result<(), IntrospectError> {
        if !self.config.gotos || !self.print_enabled() {
            return Ok(());
        }
        self.sink.emit(TraceRecord::Goto {
            target: view.symbols.resolve(target),
        });
        Ok(())
    }

    /// General registers, heap pointers shown as heap offsets
    pub fn reg_dump(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        if !self.config.gotos || !self.print_enabled() {
            return Ok(());
        }
        let values = self.ordinary_regs(view);
        self.sink.emit(TraceRecord::RegisterDump { values });
        Ok(())
    }

    /// Explicit request: describe the current frame
    pub fn print_frame(&mut self, view: &MachineView<'_>, message: &str) -> Result<(), IntrospectError> {
        let frame = describe(&self.classifier(view), view.registers.curfr)?;
        let ordinary = self.ordinary_regs(view);
        self.sink.emit(TraceRecord::Frame {
            message: message.to_string(),
            frame,
            ordinary,
        });
        Ok(())
    }

    /// Explicit request: the register classes selected in the config
    pub fn print_regs(&mut self, view: &MachineView<'_>, message: &str) -> Result<(), IntrospectError> {
        let special = if self.config.special_regs {
            Some(self.special_regs(view)?)
        } else {
            None
        };
        let ordinary = if self.config.ordinary_regs {
            self.ordinary_regs(view)
        } else {
            Vec::new()
        };
        self.sink.emit(TraceRecord::Registers {
            message: message.to_string(),
            special,
            ordinary,
        });
        Ok(())
    }

    /// Explicit request: every frame from maxfr down to the trace bottom
    pub fn dump_choice_stack(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        self.emit_choice_stack(view)
    }

    fn emit_choice_stack(&mut self, view: &MachineView<'_>) -> Result<(), IntrospectError> {
        let regs = view.registers;
        let frames = walk(self.classifier(view), regs.maxfr, regs.choice_bottom)
            .collect::<Result<Vec<_>, _>>()?;
        self.sink.emit(TraceRecord::ChoiceStackDump { frames });
        Ok(())
    }

    fn heap_alloc(&mut self, event: HeapAllocEvent) {
        if self.config.heap && self.print_enabled() {
            self.sink.emit(TraceRecord::HeapAlloc(event));
        }
    }

    pub fn unravel_univ(&mut self, univ: Word, type_info: Word, value: Word) {
        self.heap_alloc(HeapAllocEvent::UnravelUniv {
            univ,
            type_info,
            value,
        });
    }

    pub fn new_univ_on_hp(&mut self, univ: Word, type_info: Word, value: Word) {
        self.heap_alloc(HeapAllocEvent::NewUnivOnHeap {
            type_info,
            value,
            univ,
        });
    }

    pub fn tag_offset_incr_hp(&mut self, ptr: Word, tag: u32, offset: i64, count: u64, atomic: bool) {
        self.heap_alloc(HeapAllocEvent::TagOffsetIncrHp {
            tag,
            offset,
            count,
            atomic,
            ptr,
        });
    }
}
