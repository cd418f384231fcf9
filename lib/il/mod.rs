//! Dfa Intermediate Language.
//!
//! # An Introduction
//!
//! Dfa IL is a small, stack-based, already-resolved instruction language. A
//! front end lowers a method, or an inlined closure body, into a
//! `ControlFlowGraph`, and the analysis consumes it without ever modifying
//! it.
//!
//! * **Stack-based** - operations communicate through an operand stack.
//! Values pushed by `Load` remember the slot they came from, which lets a
//! later conditional branch narrow that slot.
//! * **Resolved** - every jump and call target is an absolute offset into the
//! `ControlFlowGraph`. There are no labels, and no blocks.
//! * **Closed** - `Operation` is a closed enum. Instructions the front end
//! cannot express are lowered to `Operation::Unsupported`, which the analysis
//! handles conservatively.
//!
//! # Components of the IL
//!
//! ## `Slot` and `Constant`
//!
//! A `Slot` is a symbolic storage location: a local variable, a stack
//! temporary, or a field access fingerprint such as `this.next`. A `Constant`
//! is a concrete integer, boolean, string, or `null`.
//!
//! ## `Operation`
//!
//! * Stack: `Push`, `PushUnknown`, `New`, `Pop`, `Dup`.
//! * Slots: `Load`, `Store`, `Flush`.
//! * Arithmetic and comparison: `Binary`, `Unary`.
//! * Control flow: `Goto`, `ConditionalGoto`, `Exit`.
//! * Calls: `Invoke` for opaque calls, `Call` and `Return` for inlined calls
//! and closures.
//! * `Dereference`, `Nop`, and the catch-all `Unsupported`.
//!
//! Comparisons evaluate to a boolean. `ConditionalGoto` pops a boolean and
//! jumps when it equals the instruction's `jump_if` flag.
//!
//! ## `Instruction` and `ControlFlowGraph`
//!
//! An `Instruction` gives an `Operation` its offset. A `ControlFlowGraph` is
//! the sequence of instructions for one unit of analysis, entered at offset
//! `0`.

mod constant;
mod control_flow_graph;
mod instruction;
mod operation;
mod slot;

pub use self::constant::*;
pub use self::control_flow_graph::*;
pub use self::instruction::*;
pub use self::operation::*;
pub use self::slot::*;

/// A convenience function to create a new local variable slot.
///
/// This is the preferred way to create a `Slot::Local`.
pub fn local<S>(name: S) -> Slot
where
    S: Into<String>,
{
    Slot::local(name)
}

/// A convenience function to create a new field access slot.
///
/// This is the preferred way to create a `Slot::Field`.
pub fn field<Q, N>(qualifier: Q, name: N) -> Slot
where
    Q: Into<String>,
    N: Into<String>,
{
    Slot::field(qualifier, name)
}
