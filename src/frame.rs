//! Choice-point frame layout and descriptor extraction
//!
//! The choice-point stack grows towards higher addresses. A frame pointer
//! addresses the frame's highest word; the fixed slots sit just below it
//! and the frame's locals below those, down to (but excluding) the address
//! held in the previous-frame slot. Frame size is never stored.

use crate::classify::PointerClassifier;
use crate::context::{ContextId, ExecutionContext, StackKind};
use crate::error::IntrospectError;
use crate::zone::Zone;
use crate::{Address, CodeAddr, Word};

/// Slot offsets below the frame pointer
pub const PREVFR_SLOT: usize = 0;
pub const REDOIP_SLOT: usize = 1;
pub const SUCCIP_SLOT: usize = 2;
pub const SUCCFR_SLOT: usize = 3;
/// Det temp frames keep the det-stack frame where an ordinary frame keeps
/// its success continuation
pub const TMP_DETFR_SLOT: usize = 2;

/// Number of fixed slots in an ordinary choice-point frame
pub const NONDET_FIXED_SIZE: usize = 4;

/// Address of local `i` (1-based) of the frame at `frame`
pub fn local_slot(frame: Address, i: usize) -> Option<Address> {
    frame.checked_sub(NONDET_FIXED_SIZE - 1 + i)
}

/// Everything an ordinary choice-point frame records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub address: Address,
    pub context: ContextId,
    /// Words from the owning zone's lower bound
    pub offset_in_zone: isize,
    pub success_continuation: CodeAddr,
    pub retry_continuation: CodeAddr,
    pub success_frame: Address,
    pub previous_frame: Address,
    /// locals[0] is local 1, the slot nearest the fixed fields
    pub locals: Vec<Word>,
}

/// A temporary frame: no success link and no locals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempFrameDescriptor {
    pub address: Address,
    pub offset_in_zone: isize,
    pub retry_continuation: CodeAddr,
    pub previous_frame: Address,
    /// Set only for det temp frames
    pub det_frame: Option<Address>,
}

/// Slot access for one frame, bounds-checked against its zone
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    context: &'a ExecutionContext,
    zone: &'a Zone,
    frame: Address,
}

impl<'a> FrameView<'a> {
    pub fn at(classifier: &PointerClassifier<'a>, frame: Address) -> Result<Self, IntrospectError> {
        let (context, zone) = classifier.locate(frame, StackKind::Choice)?;
        Ok(FrameView {
            context,
            zone,
            frame,
        })
    }

    pub fn address(&self) -> Address {
        self.frame
    }

    pub fn zone(&self) -> &'a Zone {
        self.zone
    }

    pub fn context(&self) -> &'a ExecutionContext {
        self.context
    }

    fn slot(&self, offset: usize) -> Result<Word, IntrospectError> {
        let addr = self
            .frame
            .checked_sub(offset)
            .ok_or(IntrospectError::ZoneRead {
                zone: self.zone.id(),
                address: self.frame,
            })?;
        self.read(addr)
    }

    fn read(&self, addr: Address) -> Result<Word, IntrospectError> {
        self.zone.read(addr).ok_or(IntrospectError::ZoneRead {
            zone: self.zone.id(),
            address: addr,
        })
    }

    pub fn previous_frame(&self) -> Result<Address, IntrospectError> {
        Ok(self.slot(PREVFR_SLOT)? as Address)
    }

    pub fn retry_continuation(&self) -> Result<CodeAddr, IntrospectError> {
        self.slot(REDOIP_SLOT)
    }

    pub fn success_continuation(&self) -> Result<CodeAddr, IntrospectError> {
        self.slot(SUCCIP_SLOT)
    }

    pub fn success_frame(&self) -> Result<Address, IntrospectError> {
        Ok(self.slot(SUCCFR_SLOT)? as Address)
    }

    pub fn det_frame(&self) -> Result<Address, IntrospectError> {
        Ok(self.slot(TMP_DETFR_SLOT)? as Address)
    }

    /// Every slot strictly above the previous frame belongs to this frame
    pub fn locals(&self) -> Result<Vec<Word>, IntrospectError> {
        let previous = self.previous_frame()?;
        let mut locals = Vec::new();
        let mut i = 1;
        while let Some(addr) = local_slot(self.frame, i) {
            if addr <= previous {
                break;
            }
            locals.push(self.read(addr)?);
            i += 1;
        }
        Ok(locals)
    }
}

/// Extract the fixed fields and locals of the frame at `frame`
pub fn describe(classifier: &PointerClassifier<'_>, frame: Address) -> Result<FrameDescriptor, IntrospectError> {
    let view = FrameView::at(classifier, frame)?;

    Ok(FrameDescriptor {
        address: frame,
        context: view.context().id,
        offset_in_zone: view.zone().offset_of(frame),
        success_continuation: view.success_continuation()?,
        retry_continuation: view.retry_continuation()?,
        success_frame: view.success_frame()?,
        previous_frame: view.previous_frame()?,
        locals: view.locals()?,
    })
}

/// Extract a temporary frame; `det` selects the det-temp layout
pub fn describe_temp(
    classifier: &PointerClassifier<'_>,
    frame: Address,
    det: bool,
) -> Result<TempFrameDescriptor, IntrospectError> {
    let view = FrameView::at(classifier, frame)?;
    let det_frame = if det { Some(view.det_frame()?) } else { None };

    Ok(TempFrameDescriptor {
        address: frame,
        offset_in_zone: view.zone().offset_of(frame),
        retry_continuation: view.retry_continuation()?,
        previous_frame: view.previous_frame()?,
        det_frame,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextDirectory, ContextId, ExecutionContext, StackModel};
    use crate::zone::{ZoneId, ZoneRegistry};

    /// Lay out an ordinary frame at `frame` in the choice zone
    fn push_frame(zone: &mut Zone, frame: Address, prev: Address, succip: Word, redoip: Word, succfr: Address) {
        zone.write(frame - PREVFR_SLOT, prev as Word);
        zone.write(frame - REDOIP_SLOT, redoip);
        zone.write(frame - SUCCIP_SLOT, succip);
        zone.write(frame - SUCCFR_SLOT, succfr as Word);
    }

    fn setup() -> (ContextDirectory, ZoneRegistry) {
        let mut choice = Zone::new(ZoneId(2), "choice", 100, 100);
        push_frame(&mut choice, 110, 99, 0x400, 0x500, 99);
        // frame at 120 owns slots 116..=111: six locals
        push_frame(&mut choice, 120, 110, 0x410, 0x510, 110);
        for (i, addr) in (111..=116).rev().enumerate() {
            choice.write(addr, 10 + i as Word);
        }
        let mut zones = ZoneRegistry::new();
        zones.insert(Zone::new(ZoneId(1), "det", 0, 50));
        zones.insert(choice);
        let dir = ContextDirectory::new(ExecutionContext::main(ContextId(0), ZoneId(1), ZoneId(2)));
        (dir, zones)
    }

    #[test]
    fn local_slots_start_below_fixed_fields() {
        assert_eq!(local_slot(100, 1), Some(96));
        assert_eq!(local_slot(100, 2), Some(95));
        assert_eq!(local_slot(2, 1), None);
    }

    #[test]
    fn describe_reads_fixed_fields_and_counts_locals_from_the_gap() {
        let (dir, zones) = setup();
        let c = PointerClassifier::new(&dir, &zones, StackModel::OwnStacks);

        let d = describe(&c, 120).unwrap();
        assert_eq!(d.offset_in_zone, 20);
        assert_eq!(d.previous_frame, 110);
        assert_eq!(d.success_continuation, 0x410);
        assert_eq!(d.retry_continuation, 0x510);
        assert_eq!(d.success_frame, 110);
        assert_eq!(d.locals, vec![10, 11, 12, 13, 14, 15]);
        assert_eq!(d.context, ContextId(0));
    }

    #[test]
    fn frame_with_no_gap_has_no_locals() {
        let (dir, mut zones) = setup();
        // previous frame directly below the fixed slots
        if let Some(zone) = zones.zone_mut(ZoneId(2)) {
            push_frame(zone, 124, 120, 0, 0, 120);
        }
        let c = PointerClassifier::new(&dir, &zones, StackModel::OwnStacks);
        assert!(describe(&c, 124).unwrap().locals.is_empty());
    }

    #[test]
    fn describe_outside_every_zone_is_an_attribution_failure() {
        let (dir, zones) = setup();
        let c = PointerClassifier::new(&dir, &zones, StackModel::OwnStacks);
        assert!(matches!(
            describe(&c, 400),
            Err(IntrospectError::Attribution { address: 400, .. })
        ));
    }

    #[test]
    fn temp_frames_read_only_their_layout() {
        let (dir, mut zones) = setup();
        if let Some(zone) = zones.zone_mut(ZoneId(2)) {
            zone.write(130 - PREVFR_SLOT, 120);
            zone.write(130 - REDOIP_SLOT, 0x600);
            zone.write(130 - TMP_DETFR_SLOT, 42);
        }
        let c = PointerClassifier::new(&dir, &zones, StackModel::OwnStacks);

        let plain = describe_temp(&c, 130, false).unwrap();
        assert_eq!(plain.previous_frame, 120);
        assert_eq!(plain.retry_continuation, 0x600);
        assert_eq!(plain.det_frame, None);
        assert_eq!(describe_temp(&c, 130, true).unwrap().det_frame, Some(42));
    }
}
