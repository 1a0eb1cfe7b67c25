//! Attribute raw stack pointers to the context and zone that own them

use crate::context::{ContextDirectory, ExecutionContext, GeneratorId, StackKind, StackModel};
use crate::error::IntrospectError;
use crate::zone::{Zone, ZoneRegistry};
use crate::Address;
use log::error;

/// A stack pointer as reported to sinks: its word offset inside the owning
/// zone, plus the raw address when raw display is switched on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackPtr {
    pub stack: StackKind,
    pub offset: isize,
    pub raw: Option<Address>,
}

#[derive(Debug, Clone, Copy)]
pub struct PointerClassifier<'a> {
    contexts: &'a ContextDirectory,
    zones: &'a ZoneRegistry,
    model: StackModel,
}

impl<'a> PointerClassifier<'a> {
    pub fn new(contexts: &'a ContextDirectory, zones: &'a ZoneRegistry, model: StackModel) -> Self {
        PointerClassifier {
            contexts,
            zones,
            model,
        }
    }

    pub fn zones(&self) -> &'a ZoneRegistry {
        self.zones
    }

    /// Find the context whose `stack` zone holds `ptr`. The main context is
    /// tried first, then generator contexts in creation order.
    pub fn classify(&self, ptr: Address, stack: StackKind) -> Option<&'a ExecutionContext> {
        if self.model == StackModel::Shared {
            return Some(self.contexts.main());
        }

        self.contexts.iter().find(|ctx| {
            self.zones
                .zone(ctx.zone(stack))
                .is_some_and(|zone| zone.contains(ptr))
        })
    }

    /// Pure lookup: `None` when no live context owns the pointer
    pub fn context_for(&self, ptr: Address, stack: StackKind) -> Option<&'a ExecutionContext> {
        self.classify(ptr, stack)
    }

    /// The context and zone holding `ptr`. A miss means the stacks are
    /// corrupt.
    pub fn locate(&self, ptr: Address, stack: StackKind) -> Result<(&'a ExecutionContext, &'a Zone), IntrospectError> {
        let ctx = self.classify(ptr, stack).ok_or_else(|| {
            error!("locate: {} pointer 0x{:x} not in any context", stack, ptr);
            IntrospectError::Attribution {
                stack,
                address: ptr,
            }
        })?;
        let zone_id = ctx.zone(stack);
        let zone = self
            .zones
            .zone(zone_id)
            .ok_or(IntrospectError::UnknownZone(zone_id))?;
        Ok((ctx, zone))
    }

    /// The zone holding `ptr`
    pub fn zone_for(&self, ptr: Address, stack: StackKind) -> Result<&'a Zone, IntrospectError> {
        self.locate(ptr, stack).map(|(_, zone)| zone)
    }

    /// The generator owning the context that holds `ptr`; `Ok(None)` for the
    /// main context.
    pub fn generator_for(
        &self,
        ptr: Address,
        stack: StackKind,
    ) -> Result<Option<GeneratorId>, IntrospectError> {
        match self.classify(ptr, stack) {
            Some(ctx) => Ok(ctx.owner_generator),
            None => {
                error!("generator_for: {} pointer 0x{:x} not in any context", stack, ptr);
                Err(IntrospectError::Attribution {
                    stack,
                    address: ptr,
                })
            }
        }
    }

    /// Word offset of `ptr` from the lower bound of its owning zone
    pub fn stack_offset(&self, ptr: Address, stack: StackKind) -> Result<isize, IntrospectError> {
        Ok(self.zone_for(ptr, stack)?.offset_of(ptr))
    }

    pub fn pointer(&self, ptr: Address, stack: StackKind, raw: bool) -> Result<StackPtr, IntrospectError> {
        Ok(StackPtr {
            stack,
            offset: self.stack_offset(ptr, stack)?,
            raw: raw.then_some(ptr),
        })
    }
}
