//! Execution contexts and the directory of live ones
//!
//! The main context always exists. Generator contexts are attached and
//! detached by the machine as tabled evaluation creates and completes
//! generators; the introspection layer only reads the current set.

use crate::zone::ZoneId;
use indexmap::IndexMap;
use serde::Deserialize;
use std::fmt;

/// Which of a context's two stacks a pointer is expected to live on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    /// Deterministic call stack
    Det,
    /// Choice-point (backtracking) stack
    Choice,
}

impl fmt::Display for StackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackKind::Det => write!(f, "det"),
            StackKind::Choice => write!(f, "choice"),
        }
    }
}

/// Whether generators run on stacks of their own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackModel {
    /// One stack pair; every pointer belongs to the main context
    #[default]
    Shared,
    /// Each generator owns a det/choice stack pair
    OwnStacks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeneratorId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionContext {
    pub id: ContextId,
    pub det_zone: ZoneId,
    pub choice_zone: ZoneId,
    /// None for the main context
    pub owner_generator: Option<GeneratorId>,
}

impl ExecutionContext {
    pub fn main(id: ContextId, det_zone: ZoneId, choice_zone: ZoneId) -> Self {
        ExecutionContext {
            id,
            det_zone,
            choice_zone,
            owner_generator: None,
        }
    }

    pub fn for_generator(
        id: ContextId,
        det_zone: ZoneId,
        choice_zone: ZoneId,
        generator: GeneratorId,
    ) -> Self {
        ExecutionContext {
            id,
            det_zone,
            choice_zone,
            owner_generator: Some(generator),
        }
    }

    pub fn zone(&self, stack: StackKind) -> ZoneId {
        match stack {
            StackKind::Det => self.det_zone,
            StackKind::Choice => self.choice_zone,
        }
    }
}

/// Live contexts of one engine: the main context followed by generator
/// contexts in creation order.
#[derive(Debug)]
pub struct ContextDirectory {
    main: ExecutionContext,
    secondaries: IndexMap<ContextId, ExecutionContext>,
}

impl ContextDirectory {
    pub fn new(main: ExecutionContext) -> Self {
        ContextDirectory {
            main,
            secondaries: IndexMap::new(),
        }
    }

    pub fn main(&self) -> &ExecutionContext {
        &self.main
    }

    /// Record a newly created generator context
    pub fn attach(&mut self, ctx: ExecutionContext) {
        self.secondaries.insert(ctx.id, ctx);
    }

    /// Forget a completed generator's context, keeping the order of the rest
    pub fn detach(&mut self, id: ContextId) -> Option<ExecutionContext> {
        self.secondaries.shift_remove(&id)
    }

    pub fn secondaries(&self) -> impl Iterator<Item = &ExecutionContext> {
        self.secondaries.values()
    }

    /// Main context first, then generator contexts in creation order
    pub fn iter(&self) -> impl Iterator<Item = &ExecutionContext> {
        std::iter::once(&self.main).chain(self.secondaries.values())
    }

    pub fn len(&self) -> usize {
        1 + self.secondaries.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}
