//! The abstract memory at a program point.

use crate::analysis::call_stack::CallStack;
use crate::analysis::dftype::{DfType, Kind};
use crate::analysis::range::LongRangeSet;
use crate::il::{BinaryOp, Constant, Slot};
use crate::{StateMismatch, RC};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A fact relating the values of two slots.
///
/// Relations are always built through `Relation::equal` and `Relation::not_equal`, which
/// order the two slots, so each fact has one representation.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Relation {
    Eq(Slot, Slot),
    Ne(Slot, Slot),
}

impl Relation {
    pub fn equal(a: Slot, b: Slot) -> Relation {
        if a <= b {
            Relation::Eq(a, b)
        } else {
            Relation::Eq(b, a)
        }
    }

    pub fn not_equal(a: Slot, b: Slot) -> Relation {
        if a <= b {
            Relation::Ne(a, b)
        } else {
            Relation::Ne(b, a)
        }
    }

    fn slots(&self) -> (&Slot, &Slot) {
        match *self {
            Relation::Eq(ref a, ref b) | Relation::Ne(ref a, ref b) => (a, b),
        }
    }

    /// Returns true if this relation mentions `slot`.
    pub fn mentions(&self, slot: &Slot) -> bool {
        let (a, b) = self.slots();
        a == slot || b == slot
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Relation::Eq(ref a, ref b) => write!(f, "{} == {}", a, b),
            Relation::Ne(ref a, ref b) => write!(f, "{} != {}", a, b),
        }
    }
}

/// One side of a remembered comparison.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Operand {
    dftype: DfType,
    slot: Option<Slot>,
}

impl Operand {
    pub fn new(dftype: DfType, slot: Option<Slot>) -> Operand {
        Operand { dftype, slot }
    }

    /// The value of this operand when it was compared.
    pub fn dftype(&self) -> &DfType {
        &self.dftype
    }

    /// The slot this operand was loaded from.
    pub fn slot(&self) -> Option<&Slot> {
        self.slot.as_ref()
    }
}

/// A comparison whose boolean result is on the operand stack. A branch on
/// that boolean narrows both sides of the comparison.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Condition {
    lhs: Operand,
    op: BinaryOp,
    rhs: Operand,
}

impl Condition {
    pub fn new(lhs: Operand, op: BinaryOp, rhs: Operand) -> Condition {
        Condition { lhs, op, rhs }
    }

    pub fn lhs(&self) -> &Operand {
        &self.lhs
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }

    pub fn rhs(&self) -> &Operand {
        &self.rhs
    }

    /// The condition which holds exactly when this one does not.
    pub fn negate(&self) -> Option<Condition> {
        Some(Condition {
            lhs: self.lhs.clone(),
            op: self.op.negate()?,
            rhs: self.rhs.clone(),
        })
    }

    fn mentions(&self, slot: &Slot) -> bool {
        self.lhs.slot.as_ref() == Some(slot) || self.rhs.slot.as_ref() == Some(slot)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let operand = |operand: &Operand| match operand.slot {
            Some(ref slot) => slot.to_string(),
            None => operand.dftype.to_string(),
        };
        write!(f, "{} {} {}", operand(&self.lhs), self.op, operand(&self.rhs))
    }
}

/// A value on the operand stack.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct StackValue {
    dftype: DfType,
    origin: Option<Slot>,
    condition: Option<Condition>,
}

impl StackValue {
    pub fn new(dftype: DfType) -> StackValue {
        StackValue {
            dftype,
            origin: None,
            condition: None,
        }
    }

    /// A value loaded from `origin`.
    pub fn with_origin(dftype: DfType, origin: Slot) -> StackValue {
        StackValue {
            dftype,
            origin: Some(origin),
            condition: None,
        }
    }

    /// A boolean produced by `condition`.
    pub fn with_condition(dftype: DfType, condition: Condition) -> StackValue {
        StackValue {
            dftype,
            origin: None,
            condition: Some(condition),
        }
    }

    pub fn dftype(&self) -> &DfType {
        &self.dftype
    }

    pub fn origin(&self) -> Option<&Slot> {
        self.origin.as_ref()
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// This value as one side of a comparison.
    pub fn operand(&self) -> Operand {
        Operand::new(self.dftype.clone(), self.origin.clone())
    }

    fn join(&self, other: &StackValue, max_intervals: usize) -> StackValue {
        StackValue {
            dftype: self.dftype.join_capped(&other.dftype, max_intervals),
            origin: if self.origin == other.origin {
                self.origin.clone()
            } else {
                None
            },
            condition: if self.condition == other.condition {
                self.condition.clone()
            } else {
                None
            },
        }
    }

    fn forget(&mut self, slot: &Slot) {
        if self.origin.as_ref() == Some(slot) {
            self.origin = None;
        }
        if self.condition.as_ref().map(|c| c.mentions(slot)).unwrap_or(false) {
            self.condition = None;
        }
    }

    fn forget_all(&mut self) {
        self.origin = None;
        self.condition = None;
    }
}

impl fmt::Display for StackValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.dftype)?;
        if let Some(ref origin) = self.origin {
            write!(f, " ({})", origin)?;
        }
        if let Some(ref condition) = self.condition {
            write!(f, " ({})", condition)?;
        }
        Ok(())
    }
}

/// The abstract memory at one program point.
///
/// A slot which is not bound is `Top`, and a slot is never bound to `Top`.
/// Cloning a `MemoryState` is cheap. The slot and relation maps are shared
/// until one of the clones is written.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct MemoryState {
    slots: RC<BTreeMap<Slot, DfType>>,
    relations: RC<BTreeSet<Relation>>,
    stack: Vec<StackValue>,
    call_stack: CallStack,
}

impl MemoryState {
    /// An empty state, where every slot is `Top`.
    pub fn new() -> MemoryState {
        MemoryState::default()
    }

    /// A state with the given slots bound.
    pub fn with_slots(slots: &BTreeMap<Slot, DfType>) -> MemoryState {
        let mut state = MemoryState::new();
        for (slot, dftype) in slots {
            state.assign(slot.clone(), dftype.clone());
        }
        state
    }

    /// Get the value of a slot.
    pub fn get(&self, slot: &Slot) -> DfType {
        self.slots.get(slot).cloned().unwrap_or(DfType::Top)
    }

    /// Every bound slot.
    pub fn slots(&self) -> &BTreeMap<Slot, DfType> {
        &self.slots
    }

    pub fn relations(&self) -> &BTreeSet<Relation> {
        &self.relations
    }

    pub fn stack(&self) -> &[StackValue] {
        &self.stack
    }

    pub fn call_stack(&self) -> &CallStack {
        &self.call_stack
    }

    pub fn call_stack_mut(&mut self) -> &mut CallStack {
        &mut self.call_stack
    }

    /// Returns true if `a` and `b` are known to hold the same value.
    pub fn are_equal(&self, a: &Slot, b: &Slot) -> bool {
        a == b || self.equal_slots(a).contains(b)
    }

    /// Returns true if `a` and `b` are known to hold different values.
    pub fn are_different(&self, a: &Slot, b: &Slot) -> bool {
        self.relations
            .contains(&Relation::not_equal(a.clone(), b.clone()))
    }

    /// Bind a slot to a value. Every relation mentioning the slot is dropped,
    /// as are stack provenances which refer to its old value.
    pub fn assign(&mut self, slot: Slot, dftype: DfType) {
        self.forget(&slot);
        if !dftype.is_top() {
            RC::make_mut(&mut self.slots).insert(slot, dftype);
        }
    }

    /// Bind a slot to `Top`.
    pub fn flush(&mut self, slot: &Slot) {
        self.forget(slot);
    }

    /// Bind every field slot to `Top`.
    pub fn flush_fields(&mut self) {
        let fields = self
            .slots
            .keys()
            .chain(self.relations.iter().flat_map(|relation| {
                let (a, b) = relation.slots();
                vec![a, b]
            }))
            .filter(|slot| slot.is_field())
            .cloned()
            .collect::<BTreeSet<Slot>>();
        for field in fields {
            self.forget(&field);
        }
        for value in &mut self.stack {
            if value.origin.as_ref().map(|o| o.is_field()).unwrap_or(false) {
                value.forget_all();
            }
        }
    }

    /// Bind every slot to `Top`.
    pub fn flush_all(&mut self) {
        if !self.slots.is_empty() {
            self.slots = RC::new(BTreeMap::new());
        }
        if !self.relations.is_empty() {
            self.relations = RC::new(BTreeSet::new());
        }
        for value in &mut self.stack {
            value.forget_all();
        }
    }

    fn forget(&mut self, slot: &Slot) {
        if self.slots.contains_key(slot) {
            RC::make_mut(&mut self.slots).remove(slot);
        }
        if self.relations.iter().any(|r| r.mentions(slot)) {
            RC::make_mut(&mut self.relations).retain(|r| !r.mentions(slot));
        }
        for value in &mut self.stack {
            value.forget(slot);
        }
    }

    /// Record a relation between two slots.
    pub fn add_relation(&mut self, relation: Relation) {
        if !self.relations.contains(&relation) {
            RC::make_mut(&mut self.relations).insert(relation);
        }
    }

    /// Meet a slot with `dftype`. The narrowing is applied to every slot known
    /// to be equal.
    ///
    /// Returns `None` if the slot can hold no value, which means the path is
    /// infeasible.
    pub fn narrow(&mut self, slot: &Slot, dftype: &DfType) -> Option<()> {
        for slot in self.equal_slots(slot) {
            let narrowed = self.get(&slot).meet(dftype);
            if narrowed.is_bottom() {
                return None;
            }
            if !narrowed.is_top() && self.slots.get(&slot) != Some(&narrowed) {
                RC::make_mut(&mut self.slots).insert(slot, narrowed);
            }
        }
        Some(())
    }

    /// `slot`, and every slot reachable from it through a chain of `Eq`
    /// relations.
    fn equal_slots(&self, slot: &Slot) -> BTreeSet<Slot> {
        let mut equal = BTreeSet::new();
        let mut pending = vec![slot.clone()];
        while let Some(slot) = pending.pop() {
            if !equal.insert(slot.clone()) {
                continue;
            }
            for relation in self.relations.iter() {
                if let Relation::Eq(ref a, ref b) = *relation {
                    if *a == slot && !equal.contains(b) {
                        pending.push(b.clone());
                    } else if *b == slot && !equal.contains(a) {
                        pending.push(a.clone());
                    }
                }
            }
        }
        equal
    }

    /// Narrow this state under the assumption that `condition` evaluated to
    /// `truth`.
    ///
    /// Returns `None` if the assumption contradicts what is known.
    pub fn apply_condition(&self, condition: &Condition, truth: bool) -> Option<MemoryState> {
        let condition = if truth {
            condition.clone()
        } else {
            match condition.negate() {
                Some(negated) => negated,
                None => return Some(self.clone()),
            }
        };
        let op = condition.op();
        let lhs = self.operand_value(condition.lhs());
        let rhs = self.operand_value(condition.rhs());

        if DfType::compare(op, &lhs, &rhs) == DfType::bool(false) {
            return None;
        }

        let mut state = self.clone();

        if let (Some(a), Some(b)) = (condition.lhs().slot(), condition.rhs().slot()) {
            if self.are_equal(a, b) {
                if !matches!(op, BinaryOp::Eq | BinaryOp::Le | BinaryOp::Ge) {
                    return None;
                }
                return Some(state);
            }
            if self.are_different(a, b) && op == BinaryOp::Eq {
                return None;
            }
            match op {
                BinaryOp::Eq => state.add_relation(Relation::equal(a.clone(), b.clone())),
                BinaryOp::Ne => state.add_relation(Relation::not_equal(a.clone(), b.clone())),
                _ => {}
            }
        }

        let flipped = match op.flip() {
            Some(flipped) => flipped,
            None => return Some(state),
        };
        if let Some(slot) = condition.lhs().slot() {
            state.narrow(slot, &narrowing(op, &lhs, &rhs))?;
        }
        if let Some(slot) = condition.rhs().slot() {
            state.narrow(slot, &narrowing(flipped, &rhs, &lhs))?;
        }
        Some(state)
    }

    fn operand_value(&self, operand: &Operand) -> DfType {
        match operand.slot() {
            Some(slot) => self.get(slot).meet(operand.dftype()),
            None => operand.dftype().clone(),
        }
    }

    /// Push a value onto the operand stack.
    pub fn push(&mut self, value: StackValue) {
        self.stack.push(value);
    }

    /// Pop a value from the operand stack.
    pub fn pop(&mut self) -> Result<StackValue, StateMismatch> {
        self.stack.pop().ok_or(StateMismatch::StackUnderflow {
            needed: 1,
            available: 0,
        })
    }

    /// Pop `n` values from the operand stack, returned in the order they
    /// were pushed.
    pub fn pop_n(&mut self, n: usize) -> Result<Vec<StackValue>, StateMismatch> {
        if n > self.stack.len() {
            return Err(StateMismatch::StackUnderflow {
                needed: n,
                available: self.stack.len(),
            });
        }
        let at = self.stack.len() - n;
        Ok(self.stack.split_off(at))
    }

    /// The value on top of the operand stack.
    pub fn peek(&self) -> Result<&StackValue, StateMismatch> {
        self.stack.last().ok_or(StateMismatch::StackUnderflow {
            needed: 1,
            available: 0,
        })
    }

    /// Join two states reaching the same point.
    ///
    /// Only relations holding in both states survive. The operand stacks and
    /// call stacks must have the same shape.
    pub fn merge(&self, other: &MemoryState, max_intervals: usize) -> Result<MemoryState, StateMismatch> {
        if self == other {
            return Ok(self.clone());
        }
        if self.stack.len() != other.stack.len() {
            return Err(StateMismatch::StackHeight {
                left: self.stack.len(),
                right: other.stack.len(),
            });
        }

        let slots = if RC::ptr_eq(&self.slots, &other.slots) {
            self.slots.clone()
        } else {
            RC::new(
                self.slots
                    .iter()
                    .filter_map(|(slot, dftype)| {
                        let joined = dftype.join_capped(other.slots.get(slot)?, max_intervals);
                        if joined.is_top() {
                            None
                        } else {
                            Some((slot.clone(), joined))
                        }
                    })
                    .collect(),
            )
        };

        let relations = if RC::ptr_eq(&self.relations, &other.relations) {
            self.relations.clone()
        } else {
            RC::new(
                self.relations
                    .intersection(&other.relations)
                    .cloned()
                    .collect(),
            )
        };

        let stack = self
            .stack
            .iter()
            .zip(other.stack.iter())
            .map(|(l, r)| l.join(r, max_intervals))
            .collect();

        Ok(MemoryState {
            slots,
            relations,
            stack,
            call_stack: self.call_stack.merge(&other.call_stack, max_intervals)?,
        })
    }

    /// Widen this state against the state previously recorded at the same
    /// point. Integer slots and stack values which changed become `Top`.
    pub fn widen(&self, previous: &MemoryState) -> MemoryState {
        let mut state = self.clone();
        let widened = self
            .slots
            .iter()
            .map(|(slot, dftype)| (slot.clone(), dftype.widen(&previous.get(slot))))
            .filter(|(_, dftype)| !dftype.is_top())
            .collect::<BTreeMap<Slot, DfType>>();
        if widened != *self.slots {
            state.slots = RC::new(widened);
        }
        if self.stack.len() == previous.stack.len() {
            for (value, previous) in state.stack.iter_mut().zip(previous.stack.iter()) {
                value.dftype = value.dftype.widen(&previous.dftype);
            }
        }
        state
    }

    /// This state with its call stack removed, used to report one state per
    /// offset across every calling context.
    pub fn without_call_stack(&self) -> MemoryState {
        MemoryState {
            slots: self.slots.clone(),
            relations: self.relations.clone(),
            stack: self.stack.clone(),
            call_stack: CallStack::new(),
        }
    }
}

/// The values `x` may take if `x op other` holds.
fn narrowing(op: BinaryOp, value: &DfType, other: &DfType) -> DfType {
    match (value.kind(), other.kind()) {
        (Some(Kind::Int), Some(Kind::Int)) | (None, Some(Kind::Int)) => {
            let other = other.int_set().unwrap_or_default();
            match LongRangeSet::from_relation(op, &other) {
                Some(set) => DfType::range(set),
                None => DfType::Top,
            }
        }
        _ => match op {
            BinaryOp::Eq => other.clone(),
            // Only a single value has a complement which excludes exactly it.
            BinaryOp::Ne => match other.as_constant() {
                Some(Constant::Null) | Some(Constant::Bool(_)) => {
                    other.try_negate().unwrap_or(DfType::Top)
                }
                _ => DfType::Top,
            },
            _ => DfType::Top,
        },
    }
}

impl fmt::Display for MemoryState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut items = self
            .slots
            .iter()
            .map(|(slot, dftype)| format!("{} = {}", slot, dftype))
            .collect::<Vec<String>>();
        items.extend(self.relations.iter().map(|r| r.to_string()));
        write!(f, "[{}]", items.join(", "))?;
        if !self.stack.is_empty() {
            write!(
                f,
                " stack [{}]",
                self.stack
                    .iter()
                    .map(|value| value.to_string())
                    .collect::<Vec<String>>()
                    .join(", ")
            )?;
        }
        if !self.call_stack.is_empty() {
            write!(f, " calls {:?}", self.call_stack.context())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il;

    fn compare(lhs: Operand, op: BinaryOp, rhs: Operand) -> Condition {
        Condition::new(lhs, op, rhs)
    }

    fn slot_operand(state: &MemoryState, name: &str) -> Operand {
        Operand::new(state.get(&il::local(name)), Some(il::local(name)))
    }

    #[test]
    fn top_is_never_stored() {
        let mut state = MemoryState::new();
        state.assign(il::local("x"), DfType::int(1));
        state.assign(il::local("x"), DfType::Top);
        assert!(state.slots().is_empty());
        assert_eq!(state.get(&il::local("x")), DfType::Top);
        assert_eq!(state, MemoryState::new());
    }

    #[test]
    fn assign_drops_relations() {
        let mut state = MemoryState::new();
        state.add_relation(Relation::equal(il::local("b"), il::local("a")));
        assert!(state.are_equal(&il::local("a"), &il::local("b")));

        state.assign(il::local("a"), DfType::int(0));
        assert!(state.relations().is_empty());
    }

    #[test]
    fn clones_share_until_written() {
        let mut state = MemoryState::new();
        state.assign(il::local("x"), DfType::int(1));
        let mut clone = state.clone();
        assert!(RC::ptr_eq(&state.slots, &clone.slots));

        clone.assign(il::local("y"), DfType::int(2));
        assert!(!RC::ptr_eq(&state.slots, &clone.slots));
        assert_eq!(state.get(&il::local("y")), DfType::Top);
    }

    #[test]
    fn merge() {
        let mut left = MemoryState::new();
        left.assign(il::local("x"), DfType::int(1));
        left.assign(il::local("y"), DfType::int(5));
        left.add_relation(Relation::equal(il::local("a"), il::local("b")));
        let mut right = MemoryState::new();
        right.assign(il::local("x"), DfType::int(2));

        let merged = left.merge(&right, 16).unwrap();
        assert_eq!(merged.get(&il::local("x")), DfType::int_range(1, 2));
        assert_eq!(merged.get(&il::local("y")), DfType::Top);
        assert!(merged.relations().is_empty());

        left.push(StackValue::new(DfType::int(0)));
        assert_eq!(
            left.merge(&right, 16),
            Err(StateMismatch::StackHeight { left: 1, right: 0 })
        );
    }

    #[test]
    fn narrow_through_equal_slots() {
        let mut state = MemoryState::new();
        state.add_relation(Relation::equal(il::local("a"), il::local("b")));
        state.narrow(&il::local("a"), &DfType::not_null()).unwrap();
        assert_eq!(state.get(&il::local("b")), DfType::not_null());

        assert!(state.narrow(&il::local("b"), &DfType::null()).is_none());
    }

    #[test]
    fn narrow_through_chain_of_copies() {
        let mut state = MemoryState::new();
        state.add_relation(Relation::equal(il::local("q"), il::local("p")));
        state.add_relation(Relation::equal(il::local("r"), il::local("q")));
        state.add_relation(Relation::equal(il::local("s"), il::local("t")));
        assert!(state.are_equal(&il::local("p"), &il::local("r")));
        assert!(!state.are_equal(&il::local("p"), &il::local("s")));

        state.narrow(&il::local("r"), &DfType::not_null()).unwrap();
        assert_eq!(state.get(&il::local("p")), DfType::not_null());
        assert_eq!(state.get(&il::local("q")), DfType::not_null());
        assert_eq!(state.get(&il::local("s")), DfType::Top);
    }

    #[test]
    fn apply_condition_narrows_ranges() {
        let mut state = MemoryState::new();
        state.assign(il::local("x"), DfType::int_range(-10, 10));
        let condition = compare(
            slot_operand(&state, "x"),
            BinaryOp::Gt,
            Operand::new(DfType::int(0), None),
        );

        let taken = state.apply_condition(&condition, true).unwrap();
        assert_eq!(taken.get(&il::local("x")), DfType::int_range(1, 10));
        let not_taken = state.apply_condition(&condition, false).unwrap();
        assert_eq!(not_taken.get(&il::local("x")), DfType::int_range(-10, 0));

        state.assign(il::local("x"), DfType::int(5));
        let condition = compare(
            slot_operand(&state, "x"),
            BinaryOp::Gt,
            Operand::new(DfType::int(0), None),
        );
        assert!(state.apply_condition(&condition, false).is_none());
    }

    #[test]
    fn apply_condition_narrows_null_checks() {
        let state = MemoryState::new();
        let condition = compare(
            slot_operand(&state, "p"),
            BinaryOp::Eq,
            Operand::new(DfType::null(), None),
        );

        let null = state.apply_condition(&condition, true).unwrap();
        assert_eq!(null.get(&il::local("p")), DfType::null());
        let not_null = state.apply_condition(&condition, false).unwrap();
        assert_eq!(not_null.get(&il::local("p")), DfType::not_null());
    }

    #[test]
    fn apply_condition_records_relations() {
        let state = MemoryState::new();
        let condition = compare(
            slot_operand(&state, "a"),
            BinaryOp::Eq,
            slot_operand(&state, "b"),
        );

        let equal = state.apply_condition(&condition, true).unwrap();
        assert!(equal.are_equal(&il::local("a"), &il::local("b")));
        assert!(equal.apply_condition(&condition, false).is_none());

        let different = state.apply_condition(&condition, false).unwrap();
        assert!(different.are_different(&il::local("a"), &il::local("b")));
        assert!(different.apply_condition(&condition, true).is_none());
    }

    #[test]
    fn widen_integer_slots() {
        let mut previous = MemoryState::new();
        previous.assign(il::local("i"), DfType::int_range(0, 1));
        previous.assign(il::local("p"), DfType::null());
        let mut state = previous.clone();
        state.assign(il::local("i"), DfType::int_range(0, 2));

        let widened = state.widen(&previous);
        assert_eq!(widened.get(&il::local("i")), DfType::Top);
        assert_eq!(widened.get(&il::local("p")), DfType::null());
    }

    #[test]
    fn flush_fields_keeps_locals() {
        let mut state = MemoryState::new();
        state.assign(il::local("x"), DfType::int(1));
        state.assign(il::field("this", "f"), DfType::not_null());
        state.push(StackValue::with_origin(DfType::not_null(), il::field("this", "f")));

        state.flush_fields();
        assert_eq!(state.get(&il::local("x")), DfType::int(1));
        assert_eq!(state.get(&il::field("this", "f")), DfType::Top);
        assert_eq!(state.peek().unwrap().origin(), None);

        state.flush_all();
        assert!(state.slots().is_empty());
    }

    #[test]
    fn pop_n_underflow() {
        let mut state = MemoryState::new();
        state.push(StackValue::new(DfType::int(1)));
        assert_eq!(
            state.pop_n(2),
            Err(StateMismatch::StackUnderflow {
                needed: 2,
                available: 1
            })
        );
        assert_eq!(state.pop_n(1).unwrap().len(), 1);
    }
}
