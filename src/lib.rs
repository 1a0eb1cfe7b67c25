//! Execution-state introspection for a register-based abstract machine.
//!
//! Given a suspended machine, this crate answers which context and zone a
//! stack pointer belongs to, what the choice-point chain looks like, and
//! whether a watched profiling record changed since the last look. It also
//! decides, per call, whether verbose tracing is on.
//!
//! The machine drives everything through [`tracer::Tracer`], passing a
//! [`machine::MachineView`] of its zones, contexts and registers to each
//! hook. Records go to a caller supplied [`sink::TraceSink`].

pub mod classify;
pub mod config;
pub mod context;
pub mod error;
pub mod frame;
pub mod machine;
pub mod sink;
pub mod symbols;
pub mod tracer;
pub mod walk;
pub mod watch;
pub mod window;
pub mod zone;

#[cfg(test)]
mod window_tests;

/// A machine word
pub type Word = u64;

/// A word address. Addresses index words, not bytes.
pub type Address = usize;

/// Address of a code label
pub type CodeAddr = u64;

pub use classify::{PointerClassifier, StackPtr};
pub use config::TraceConfig;
pub use context::{ContextDirectory, ContextId, ExecutionContext, GeneratorId, StackKind, StackModel};
pub use error::IntrospectError;
pub use frame::{describe, FrameDescriptor};
pub use machine::{MachineView, Registers};
pub use sink::{LogSink, MemorySink, TraceRecord, TraceSink};
pub use symbols::{Label, LabelTable, SymbolTable};
pub use tracer::Tracer;
pub use walk::walk;
pub use watch::{CallSiteDynamicRecord, CallSiteSource, ChangeEvent, DifferentialWatch};
pub use window::{CallWindow, CallWindowController};
pub use zone::{Zone, ZoneId, ZoneRegistry};
