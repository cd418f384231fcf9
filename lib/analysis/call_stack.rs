//! Frames for inlined calls and closures.

use crate::analysis::state::MemoryState;
use crate::il::Slot;
use crate::{StateMismatch, RC};
use serde::{Deserialize, Serialize};

/// The record of one inlined `Call`, pushed when the callee is entered and
/// popped by its `Return`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CallFrame {
    return_offset: usize,
    results: usize,
    captures: Vec<Slot>,
    caller: RC<MemoryState>,
}

impl CallFrame {
    pub fn new(
        return_offset: usize,
        results: usize,
        captures: Vec<Slot>,
        caller: MemoryState,
    ) -> CallFrame {
        CallFrame {
            return_offset,
            results,
            captures,
            caller: RC::new(caller),
        }
    }

    /// The offset execution continues at once the callee returns.
    pub fn return_offset(&self) -> usize {
        self.return_offset
    }

    /// The number of values the callee must return.
    pub fn results(&self) -> usize {
        self.results
    }

    /// The caller slots visible to the callee, written back on return.
    pub fn captures(&self) -> &[Slot] {
        &self.captures
    }

    /// The state of the caller at the call site, after the arguments were
    /// popped.
    pub fn caller(&self) -> &MemoryState {
        &self.caller
    }

    /// Take the caller state out of this frame.
    pub fn into_caller(self) -> MemoryState {
        RC::try_unwrap(self.caller).unwrap_or_else(|caller| (*caller).clone())
    }

    /// Merge two frames for the same call site.
    pub fn merge(&self, other: &CallFrame, max_intervals: usize) -> Result<CallFrame, StateMismatch> {
        if self.return_offset != other.return_offset
            || self.results != other.results
            || self.captures != other.captures
        {
            return Err(StateMismatch::CallStack);
        }
        let caller = if RC::ptr_eq(&self.caller, &other.caller) {
            self.caller.clone()
        } else {
            RC::new(self.caller.merge(&other.caller, max_intervals)?)
        };
        Ok(CallFrame {
            return_offset: self.return_offset,
            results: self.results,
            captures: self.captures.clone(),
            caller,
        })
    }
}

/// A LIFO stack of `CallFrame`.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct CallStack {
    frames: Vec<CallFrame>,
}

impl CallStack {
    pub fn new() -> CallStack {
        CallStack { frames: Vec::new() }
    }

    pub fn push(&mut self, frame: CallFrame) {
        self.frames.push(frame);
    }

    /// Pop the innermost frame.
    pub fn pop(&mut self) -> Result<CallFrame, StateMismatch> {
        self.frames.pop().ok_or(StateMismatch::EmptyCallStack)
    }

    /// The innermost frame.
    pub fn top(&self) -> Option<&CallFrame> {
        self.frames.last()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The return offsets of every frame, outermost first. Two states with
    /// the same context may be merged.
    pub fn context(&self) -> Vec<usize> {
        self.frames.iter().map(|frame| frame.return_offset).collect()
    }

    /// Merge two call stacks frame by frame.
    pub fn merge(&self, other: &CallStack, max_intervals: usize) -> Result<CallStack, StateMismatch> {
        if self.frames.len() != other.frames.len() {
            return Err(StateMismatch::CallStack);
        }
        let frames = self
            .frames
            .iter()
            .zip(other.frames.iter())
            .map(|(l, r)| l.merge(r, max_intervals))
            .collect::<Result<Vec<CallFrame>, StateMismatch>>()?;
        Ok(CallStack { frames })
    }
}
