//! Lazy walk down a choice-point chain

use crate::classify::PointerClassifier;
use crate::error::IntrospectError;
use crate::frame::{describe, FrameDescriptor};
use crate::Address;
use log::error;

/// Iterator over the frames from `top` down to, but excluding, `bottom`.
///
/// Each step yields the descriptor of the current frame and then follows its
/// previous-frame link. Links must strictly decrease; a link that does not,
/// or one that jumps below the sentinel, ends the walk with
/// [`IntrospectError::CorruptChain`]. Attribution failures end it too.
pub struct FrameWalk<'a> {
    classifier: PointerClassifier<'a>,
    current: Address,
    bottom: Address,
    done: bool,
}

pub fn walk<'a>(classifier: PointerClassifier<'a>, top: Address, bottom: Address) -> FrameWalk<'a> {
    FrameWalk {
        classifier,
        current: top,
        bottom,
        done: false,
    }
}

impl<'a> FrameWalk<'a> {
    fn fail(&mut self, err: IntrospectError) -> Option<Result<FrameDescriptor, IntrospectError>> {
        error!("stack walk aborted: {}", err);
        self.done = true;
        Some(Err(err))
    }
}

impl<'a> Iterator for FrameWalk<'a> {
    type Item = Result<FrameDescriptor, IntrospectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current == self.bottom {
            self.done = true;
            return None;
        }
        if self.current < self.bottom {
            return self.fail(IntrospectError::CorruptChain {
                frame: self.current,
                previous: self.bottom,
            });
        }

        let descriptor = match describe(&self.classifier, self.current) {
            Ok(d) => d,
            Err(e) => return self.fail(e),
        };

        let previous = descriptor.previous_frame;
        if previous >= self.current {
            return self.fail(IntrospectError::CorruptChain {
                frame: self.current,
                previous,
            });
        }

        self.current = previous;
        Some(Ok(descriptor))
    }
}

impl<'a> std::iter::FusedIterator for FrameWalk<'a> {}
