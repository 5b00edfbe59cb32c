//! Reified continuations: the machine's control stack as plain data.
//!
//! Each frame records one piece of pending work plus the continuation to
//! resume after it. Frames are immutable and reference counted, so a
//! continuation can be captured as a value and resumed any number of times
//! without disturbing other holders of the same chain.

use std::fmt;
use std::rc::Rc;

use kfae_resolve::ir::Expr;

use crate::env::Env;
use crate::teardown::{self, Owned};
use crate::value::Value;

#[derive(Clone, Default)]
pub enum Cont {
    /// Nothing left to do; resuming yields the value.
    #[default]
    Done,
    Frame(Rc<Frame>),
}

pub enum Frame {
    /// Left operand of `+` is being computed; the right one comes next.
    AwaitAddRight { right: Rc<Expr>, env: Env, next: Cont },
    /// Right operand of `+` is being computed.
    FinishAdd { left: Value, next: Cont },
    AwaitSubRight { right: Rc<Expr>, env: Env, next: Cont },
    FinishSub { left: Value, next: Cont },
    /// Function position is being computed; the argument comes next.
    AwaitArg { arg: Rc<Expr>, env: Env, next: Cont },
    /// Argument is being computed; then `func` is applied to it.
    FinishApply { func: Value, next: Cont },
}

impl Cont {
    /// Push `frame` on top of the chain it already links to.
    pub fn push(frame: Frame) -> Cont {
        Cont::Frame(Rc::new(frame))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Cont::Done)
    }

    /// Pending frames, innermost first.
    pub fn frames(&self) -> impl Iterator<Item = &Frame> {
        let mut cursor = self;
        std::iter::from_fn(move || {
            let current: &Cont = cursor;
            match current {
                Cont::Done => None,
                Cont::Frame(frame) => {
                    cursor = frame.next();
                    Some(frame.as_ref())
                }
            }
        })
    }

    /// Number of pending frames.
    pub fn depth(&self) -> usize {
        self.frames().count()
    }

    pub(crate) fn detach(&mut self, out: &mut Vec<Owned>) {
        if let Cont::Frame(frame) = std::mem::take(self) {
            out.push(Owned::Frame(frame));
        }
    }
}

impl Frame {
    pub fn next(&self) -> &Cont {
        match self {
            Frame::AwaitAddRight { next, .. }
            | Frame::FinishAdd { next, .. }
            | Frame::AwaitSubRight { next, .. }
            | Frame::FinishSub { next, .. }
            | Frame::AwaitArg { next, .. }
            | Frame::FinishApply { next, .. } => next,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Frame::AwaitAddRight { .. } => "AwaitAddRight",
            Frame::FinishAdd { .. } => "FinishAdd",
            Frame::AwaitSubRight { .. } => "AwaitSubRight",
            Frame::FinishSub { .. } => "FinishSub",
            Frame::AwaitArg { .. } => "AwaitArg",
            Frame::FinishApply { .. } => "FinishApply",
        }
    }

    /// Move out everything the frame owns apart from code.
    pub(crate) fn detach(&mut self, out: &mut Vec<Owned>) {
        match self {
            Frame::AwaitAddRight { env, next, .. }
            | Frame::AwaitSubRight { env, next, .. }
            | Frame::AwaitArg { env, next, .. } => {
                env.detach(out);
                next.detach(out);
            }
            Frame::FinishAdd { left: value, next }
            | Frame::FinishSub { left: value, next }
            | Frame::FinishApply { func: value, next } => {
                value.detach(out);
                next.detach(out);
            }
        }
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach(&mut pending);
        teardown::release_all(pending);
    }
}

impl fmt::Debug for Cont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for frame in self.frames() {
            write!(f, "{}, ", frame.name())?;
        }
        f.write_str("Done]")
    }
}

impl fmt::Display for Cont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for frame in self.frames() {
            write!(f, "{} > ", frame.name())?;
        }
        write!(f, "Done")
    }
}
