//! Non-recursive release of runtime structures.
//!
//! Bindings, frames and values own each other through `Rc` in every
//! direction: a binding holds a value, a closure holds an environment, a
//! continuation holds frames, and a frame holds environments and values.
//! The compiler-generated drop would recurse once per edge, so a closure
//! nested a hundred thousand environments deep would overflow the native
//! stack. Instead, whatever a node owns is detached into a worklist and
//! released from a loop.

use std::rc::Rc;

use crate::cont::Frame;
use crate::env::Binding;

/// A reference-counted node whose contents may still need releasing.
pub(crate) enum Owned {
    Binding(Rc<Binding>),
    Frame(Rc<Frame>),
}

impl Owned {
    /// If this was the last reference, empty the node into `out`.
    fn dismantle(self, out: &mut Vec<Owned>) {
        match self {
            Owned::Binding(binding) => {
                if let Ok(mut binding) = Rc::try_unwrap(binding) {
                    binding.detach(out);
                }
            }
            Owned::Frame(frame) => {
                if let Ok(mut frame) = Rc::try_unwrap(frame) {
                    frame.detach(out);
                }
            }
        }
    }
}

/// Release `node` and everything reachable only through it.
pub(crate) fn release(node: Owned) {
    let mut pending = Vec::new();
    node.dismantle(&mut pending);
    release_all(pending);
}

/// Release every queued node and everything reachable only through them.
pub(crate) fn release_all(mut pending: Vec<Owned>) {
    while let Some(node) = pending.pop() {
        node.dismantle(&mut pending);
    }
}
