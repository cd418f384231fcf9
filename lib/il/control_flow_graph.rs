//! A `ControlFlowGraph` is a linear sequence of `Instruction` with resolved
//! jump targets.

use crate::il::*;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An immutable, already-resolved instruction sequence for one method, or one
/// inlined closure body.
///
/// The instruction at offset `0` is the entry. Every instruction's offset is
/// its position in the sequence. Once built, a `ControlFlowGraph` is only
/// ever borrowed immutably by analyses, and may be shared between threads.
///
/// The builder methods append an instruction and return its offset. Forward
/// jumps are emitted with a placeholder target and resolved with
/// `set_target` once the target offset is known.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, Default)]
pub struct ControlFlowGraph {
    instructions: Vec<Instruction>,
}

impl ControlFlowGraph {
    pub fn new() -> ControlFlowGraph {
        ControlFlowGraph {
            instructions: Vec::new(),
        }
    }

    /// Deserialize a `ControlFlowGraph` from json.
    ///
    /// The result is not validated. `analyze` validates before analysis
    /// begins.
    pub fn from_json(json: &str) -> Result<ControlFlowGraph, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize this `ControlFlowGraph` to json.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Get every `Instruction` in this `ControlFlowGraph`, in offset order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Get an `Instruction` by offset.
    pub fn instruction(&self, offset: usize) -> Result<&Instruction, Error> {
        self.instructions
            .get(offset)
            .ok_or(Error::InstructionNotFound(offset))
    }

    /// Get a mutable reference to an `Instruction` by offset.
    pub fn instruction_mut(&mut self, offset: usize) -> Result<&mut Instruction, Error> {
        self.instructions
            .get_mut(offset)
            .ok_or(Error::InstructionNotFound(offset))
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The offset the next appended instruction will receive.
    pub fn next_offset(&self) -> usize {
        self.instructions.len()
    }

    /// Append an `Operation`, and return the offset of its `Instruction`.
    pub fn append(&mut self, operation: Operation) -> usize {
        let offset = self.next_offset();
        self.instructions.push(Instruction::new(offset, operation));
        offset
    }

    /// Resolve the target of the `Goto`, `ConditionalGoto` or `Call` at
    /// `offset`.
    pub fn set_target(&mut self, offset: usize, new_target: usize) -> Result<(), Error> {
        match *self.instruction_mut(offset)?.operation_mut() {
            Operation::Goto { ref mut target }
            | Operation::ConditionalGoto { ref mut target, .. } => *target = new_target,
            Operation::Call { ref mut entry, .. } => *entry = new_target,
            _ => {
                return Err(Error::Custom(format!(
                    "Instruction at offset {} has no target to set",
                    offset
                )))
            }
        }
        Ok(())
    }

    pub fn push<C: Into<Constant>>(&mut self, constant: C) -> usize {
        self.append(Operation::Push {
            constant: constant.into(),
        })
    }

    pub fn push_null(&mut self) -> usize {
        self.append(Operation::Push {
            constant: Constant::Null,
        })
    }

    pub fn push_unknown(&mut self) -> usize {
        self.append(Operation::PushUnknown)
    }

    pub fn new_object<S: Into<String>>(&mut self, type_name: S) -> usize {
        self.append(Operation::New {
            type_name: type_name.into(),
        })
    }

    pub fn load(&mut self, slot: Slot) -> usize {
        self.append(Operation::Load { slot })
    }

    pub fn store(&mut self, slot: Slot) -> usize {
        self.append(Operation::Store { slot })
    }

    pub fn pop(&mut self) -> usize {
        self.append(Operation::Pop)
    }

    pub fn dup(&mut self) -> usize {
        self.append(Operation::Dup)
    }

    pub fn binary(&mut self, op: BinaryOp) -> usize {
        self.append(Operation::Binary { op })
    }

    pub fn unary(&mut self, op: UnaryOp) -> usize {
        self.append(Operation::Unary { op })
    }

    pub fn goto(&mut self, target: usize) -> usize {
        self.append(Operation::Goto { target })
    }

    pub fn conditional_goto(&mut self, target: usize, jump_if: bool) -> usize {
        self.append(Operation::ConditionalGoto { target, jump_if })
    }

    pub fn dereference(&mut self) -> usize {
        self.append(Operation::Dereference)
    }

    pub fn flush(&mut self, slot: Slot) -> usize {
        self.append(Operation::Flush { slot })
    }

    pub fn invoke(&mut self, arguments: usize, returns: bool, pure: bool) -> usize {
        self.append(Operation::Invoke {
            arguments,
            returns,
            pure,
        })
    }

    pub fn call(
        &mut self,
        entry: usize,
        parameters: Vec<Slot>,
        captures: Vec<Slot>,
        results: usize,
    ) -> usize {
        self.append(Operation::Call {
            entry,
            parameters,
            captures,
            results,
        })
    }

    pub fn return_(&mut self, values: usize) -> usize {
        self.append(Operation::Return { values })
    }

    pub fn exit(&mut self) -> usize {
        self.append(Operation::Exit)
    }

    pub fn nop(&mut self) -> usize {
        self.append(Operation::Nop)
    }

    pub fn unsupported<S: Into<String>>(
        &mut self,
        name: S,
        pops: usize,
        pushes: usize,
        writes: Option<Vec<Slot>>,
    ) -> usize {
        self.append(Operation::Unsupported {
            name: name.into(),
            pops,
            pushes,
            writes,
        })
    }

    /// Ensure this `ControlFlowGraph` can be analyzed.
    ///
    /// # Errors
    /// * `EmptyControlFlowGraph` if there are no instructions.
    /// * `OffsetMismatch` if an instruction's offset is not its position.
    /// * `DanglingJumpTarget` if a jump, or call, targets a missing offset.
    /// * `FallsOffEnd` if the last instruction may fall through.
    pub fn validate(&self) -> Result<(), Error> {
        if self.instructions.is_empty() {
            return Err(Error::EmptyControlFlowGraph);
        }

        for (expected, instruction) in self.instructions.iter().enumerate() {
            if instruction.offset() != expected {
                return Err(Error::OffsetMismatch {
                    expected,
                    actual: instruction.offset(),
                });
            }
            for target in instruction.operation().targets() {
                if target >= self.instructions.len() {
                    return Err(Error::DanglingJumpTarget {
                        offset: instruction.offset(),
                        target,
                    });
                }
            }
            if instruction.operation().falls_through()
                && instruction.offset() + 1 >= self.instructions.len()
            {
                return Err(Error::FallsOffEnd(instruction.offset()));
            }
        }

        Ok(())
    }

    /// Get the offsets of loop headers.
    ///
    /// A loop header is the target of a `Goto` or `ConditionalGoto` at the
    /// same, or a later, offset.
    pub fn loop_headers(&self) -> BTreeSet<usize> {
        self.instructions
            .iter()
            .filter_map(|instruction| match *instruction.operation() {
                Operation::Goto { target } | Operation::ConditionalGoto { target, .. }
                    if target <= instruction.offset() =>
                {
                    Some(target)
                }
                _ => None,
            })
            .collect()
    }

    /// Get the offsets of every conditional branch.
    pub fn conditional_branches(&self) -> Vec<usize> {
        self.instructions
            .iter()
            .filter(|instruction| instruction.operation().is_conditional_branch())
            .map(|instruction| instruction.offset())
            .collect()
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for instruction in &self.instructions {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}
