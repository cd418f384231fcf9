use crate::il::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An `Instruction` gives position to an `Operation` in a `ControlFlowGraph`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Instruction {
    offset: usize,
    operation: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
}

impl Instruction {
    pub fn new(offset: usize, operation: Operation) -> Instruction {
        Instruction {
            offset,
            operation,
            comment: None,
        }
    }

    /// Get the offset of this `Instruction` in its `ControlFlowGraph`.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Get the `Operation` for this `Instruction`.
    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub(crate) fn operation_mut(&mut self) -> &mut Operation {
        &mut self.operation
    }

    /// Get the optional comment for this `Instruction`.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:>4} {}", self.offset, self.operation)?;
        if let Some(ref comment) = self.comment {
            write!(f, " // {}", comment)?;
        }
        Ok(())
    }
}
