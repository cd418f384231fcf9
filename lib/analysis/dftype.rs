//! The value lattice.
//!
//! A `DfType` abstracts every value a slot, or a stack entry, may hold at a
//! program point. `Top` is no information, and `Bottom` is a contradiction,
//! which marks a path as unreachable.
//!
//! Every `DfType` has exactly one representation, and the constructors on
//! `DfType` enforce it:
//!
//! * A `Range` never holds fewer than two values. A single value is a
//! `Constant(Int)`, and no values is `Bottom`.
//! * A `Reference` is never `null`. The null reference is `Constant(Null)`.
//!
//! This keeps `==` meaningful, which the fixed point driver relies on to
//! detect stable states.

use crate::analysis::range::LongRangeSet;
use crate::il::{BinaryOp, Constant, UnaryOp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A join producing more intervals than this is widened to `Top`.
pub const MAX_RANGE_INTERVALS: usize = 16;

/// The type constraint carried by string constants.
pub const STRING_TYPE: &str = "String";

/// Whether a reference may be `null`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Nullability {
    Null,
    NotNull,
    Unknown,
}

impl Nullability {
    pub fn join(self, other: Nullability) -> Nullability {
        if self == other {
            self
        } else {
            Nullability::Unknown
        }
    }

    /// Returns `None` if no reference can satisfy both.
    pub fn meet(self, other: Nullability) -> Option<Nullability> {
        match (self, other) {
            (Nullability::Unknown, n) | (n, Nullability::Unknown) => Some(n),
            (l, r) if l == r => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Nullability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Nullability::Null => write!(f, "null"),
            Nullability::NotNull => write!(f, "notnull"),
            Nullability::Unknown => write!(f, "nullable"),
        }
    }
}

/// A named bound on the type of a reference.
///
/// No class hierarchy is available to the analysis, so two different names
/// are treated as unrelated types.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct TypeConstraint(String);

impl TypeConstraint {
    pub fn new<S: Into<String>>(name: S) -> TypeConstraint {
        TypeConstraint(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn join(lhs: &Option<TypeConstraint>, rhs: &Option<TypeConstraint>) -> Option<TypeConstraint> {
        if lhs == rhs {
            lhs.clone()
        } else {
            None
        }
    }

    /// `Err(())` if no reference can satisfy both constraints.
    fn meet(
        lhs: &Option<TypeConstraint>,
        rhs: &Option<TypeConstraint>,
    ) -> Result<Option<TypeConstraint>, ()> {
        match (lhs, rhs) {
            (None, t) | (t, None) => Ok(t.clone()),
            (Some(l), Some(r)) if l == r => Ok(Some(l.clone())),
            _ => Err(()),
        }
    }

    fn string() -> TypeConstraint {
        TypeConstraint::new(STRING_TYPE)
    }
}

impl fmt::Display for TypeConstraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The underlying kind of a `DfType`. Values of different kinds never
/// describe the same value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Kind {
    Int,
    Bool,
    Reference,
}

/// An element of the value lattice.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum DfType {
    /// Nothing is known.
    Top,
    /// No value is possible.
    Bottom,
    /// Exactly one concrete value.
    Constant(Constant),
    /// One of at least two integers.
    Range(LongRangeSet),
    /// A reference which is not known to be `null`, with an optional type
    /// bound.
    Reference(Nullability, Option<TypeConstraint>),
}

impl DfType {
    pub const TOP: DfType = DfType::Top;
    pub const BOTTOM: DfType = DfType::Bottom;

    pub fn int(value: i64) -> DfType {
        DfType::Constant(Constant::Int(value))
    }

    pub fn bool(value: bool) -> DfType {
        DfType::Constant(Constant::Bool(value))
    }

    pub fn null() -> DfType {
        DfType::Constant(Constant::Null)
    }

    pub fn string<S: Into<String>>(value: S) -> DfType {
        DfType::Constant(Constant::Str(value.into()))
    }

    pub fn constant(constant: Constant) -> DfType {
        DfType::Constant(constant)
    }

    /// Any integer.
    pub fn any_int() -> DfType {
        DfType::Range(LongRangeSet::all())
    }

    /// The integers in `[lo, hi]`.
    pub fn int_range(lo: i64, hi: i64) -> DfType {
        DfType::range(LongRangeSet::range(lo, hi))
    }

    /// The integers in `set`.
    pub fn range(set: LongRangeSet) -> DfType {
        if set.is_empty() {
            DfType::Bottom
        } else if let Some(point) = set.as_point() {
            DfType::int(point)
        } else {
            DfType::Range(set)
        }
    }

    pub fn reference(nullability: Nullability, constraint: Option<TypeConstraint>) -> DfType {
        match nullability {
            Nullability::Null => DfType::null(),
            Nullability::NotNull | Nullability::Unknown => {
                DfType::Reference(nullability, constraint)
            }
        }
    }

    /// Any reference which is not `null`.
    pub fn not_null() -> DfType {
        DfType::Reference(Nullability::NotNull, None)
    }

    /// Any reference, `null` included.
    pub fn nullable() -> DfType {
        DfType::Reference(Nullability::Unknown, None)
    }

    /// Rebuild this `DfType` in its canonical representation. Values built by
    /// the constructors are already canonical, deserialized values may not
    /// be.
    pub fn canonical(self) -> DfType {
        match self {
            DfType::Range(set) => DfType::range(set),
            DfType::Reference(nullability, constraint) => DfType::reference(nullability, constraint),
            dftype => dftype,
        }
    }

    pub fn is_top(&self) -> bool {
        *self == DfType::Top
    }

    pub fn is_bottom(&self) -> bool {
        *self == DfType::Bottom
    }

    pub fn kind(&self) -> Option<Kind> {
        match *self {
            DfType::Top | DfType::Bottom => None,
            DfType::Constant(Constant::Int(_)) | DfType::Range(_) => Some(Kind::Int),
            DfType::Constant(Constant::Bool(_)) => Some(Kind::Bool),
            DfType::Constant(Constant::Str(_))
            | DfType::Constant(Constant::Null)
            | DfType::Reference(..) => Some(Kind::Reference),
        }
    }

    /// The integers this value may be, if it is an integer.
    pub fn int_set(&self) -> Option<LongRangeSet> {
        match *self {
            DfType::Constant(Constant::Int(value)) => Some(LongRangeSet::point(value)),
            DfType::Range(ref set) => Some(set.clone()),
            _ => None,
        }
    }

    /// The nullability of this value, if it is a reference.
    pub fn nullability(&self) -> Option<Nullability> {
        match *self {
            DfType::Constant(Constant::Null) => Some(Nullability::Null),
            DfType::Constant(Constant::Str(_)) => Some(Nullability::NotNull),
            DfType::Reference(nullability, _) => Some(nullability),
            _ => None,
        }
    }

    /// If this value is exactly one constant, return it.
    pub fn as_constant(&self) -> Option<&Constant> {
        match *self {
            DfType::Constant(ref constant) => Some(constant),
            _ => None,
        }
    }

    /// The least upper bound of this value and `other`.
    pub fn join(&self, other: &DfType) -> DfType {
        self.join_capped(other, MAX_RANGE_INTERVALS)
    }

    /// The least upper bound of this value and `other`. An integer join
    /// which needs more than `max_intervals` intervals, and more than either
    /// operand, widens to `Top`.
    pub fn join_capped(&self, other: &DfType, max_intervals: usize) -> DfType {
        match (self, other) {
            (DfType::Top, _) | (_, DfType::Top) => DfType::Top,
            (DfType::Bottom, t) | (t, DfType::Bottom) => t.clone(),
            (l, r) if l == r => l.clone(),
            (l, r) => match (l.kind(), r.kind()) {
                (Some(Kind::Int), Some(Kind::Int)) => {
                    let (lset, rset) = (l.int_set().unwrap_or_default(), r.int_set().unwrap_or_default());
                    let union = lset.union(&rset);
                    let count = union.interval_count();
                    if count > max_intervals
                        && count > lset.interval_count()
                        && count > rset.interval_count()
                    {
                        DfType::Top
                    } else {
                        DfType::range(union)
                    }
                }
                // Two different booleans are both booleans.
                (Some(Kind::Bool), Some(Kind::Bool)) => DfType::Top,
                (Some(Kind::Reference), Some(Kind::Reference)) => join_references(l, r),
                _ => DfType::Top,
            },
        }
    }

    /// The greatest lower bound of this value and `other`. `Bottom` means no
    /// value satisfies both.
    pub fn meet(&self, other: &DfType) -> DfType {
        match (self, other) {
            (DfType::Bottom, _) | (_, DfType::Bottom) => DfType::Bottom,
            (DfType::Top, t) | (t, DfType::Top) => t.clone(),
            (l, r) if l == r => l.clone(),
            (l, r) => match (l.kind(), r.kind()) {
                (Some(Kind::Int), Some(Kind::Int)) => DfType::range(
                    l.int_set()
                        .unwrap_or_default()
                        .intersect(&r.int_set().unwrap_or_default()),
                ),
                (Some(Kind::Reference), Some(Kind::Reference)) => meet_references(l, r),
                // Different booleans, or different kinds.
                _ => DfType::Bottom,
            },
        }
    }

    /// Returns true if every value described by `other` is described by this
    /// value.
    pub fn is_super_type_of(&self, other: &DfType) -> bool {
        self.join(other) == *self
    }

    /// The exact complement of this value within its kind, if it can be
    /// represented.
    ///
    /// `x != c` holds exactly when `x` meets `c.try_negate()`, which is how
    /// conditions decided on the negative side are narrowed.
    pub fn try_negate(&self) -> Option<DfType> {
        match *self {
            DfType::Top => Some(DfType::Bottom),
            DfType::Bottom => Some(DfType::Top),
            DfType::Constant(Constant::Int(_)) | DfType::Range(_) => {
                let set = self.int_set()?;
                let complement = LongRangeSet::all().subtract(&set);
                if complement.intersects(&set) {
                    None
                } else {
                    Some(DfType::range(complement))
                }
            }
            DfType::Constant(Constant::Bool(value)) => Some(DfType::bool(!value)),
            DfType::Constant(Constant::Null) => Some(DfType::not_null()),
            DfType::Reference(Nullability::NotNull, None) => Some(DfType::null()),
            DfType::Constant(Constant::Str(_)) | DfType::Reference(..) => None,
        }
    }

    /// Force a loop-carried integer which changed since `previous` to `Top`.
    /// Other kinds have finite height and are returned unchanged.
    pub fn widen(&self, previous: &DfType) -> DfType {
        if self == previous {
            return self.clone();
        }
        match self.kind() {
            Some(Kind::Int) => DfType::Top,
            Some(Kind::Bool) | Some(Kind::Reference) | None => self.clone(),
        }
    }

    /// Evaluate a binary operator over abstract values.
    pub fn binary(op: BinaryOp, lhs: &DfType, rhs: &DfType) -> DfType {
        if op.is_comparison() {
            return DfType::compare(op, lhs, rhs);
        }
        if lhs.is_bottom() || rhs.is_bottom() {
            return DfType::Bottom;
        }
        if let (Some(l), Some(r)) = (lhs.int_set(), rhs.int_set()) {
            return DfType::range(match op {
                BinaryOp::Add => l.add(&r),
                BinaryOp::Sub => l.sub(&r),
                BinaryOp::Mul => l.mul(&r),
                BinaryOp::Div => l.div(&r),
                BinaryOp::Rem => l.rem(&r),
                BinaryOp::And => l.bit_and(&r),
                BinaryOp::Or => l.bit_or(&r),
                BinaryOp::Xor => l.bit_xor(&r),
                BinaryOp::Shl => l.shl(&r),
                BinaryOp::Shr => l.shr(&r),
                _ => return DfType::Top,
            });
        }
        let (l, r) = (lhs.as_bool(), rhs.as_bool());
        match op {
            BinaryOp::And if l == Some(false) || r == Some(false) => DfType::bool(false),
            BinaryOp::Or if l == Some(true) || r == Some(true) => DfType::bool(true),
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => match (l, r) {
                (Some(l), Some(r)) => DfType::bool(match op {
                    BinaryOp::And => l && r,
                    BinaryOp::Or => l || r,
                    _ => l ^ r,
                }),
                _ => DfType::Top,
            },
            _ => DfType::Top,
        }
    }

    /// Evaluate a comparison over abstract values. The result is a boolean
    /// constant when the comparison is decided, `Top` when it is not.
    pub fn compare(op: BinaryOp, lhs: &DfType, rhs: &DfType) -> DfType {
        if lhs.is_bottom() || rhs.is_bottom() {
            return DfType::Bottom;
        }
        let decided = match op {
            BinaryOp::Eq => DfType::equals(lhs, rhs),
            BinaryOp::Ne => DfType::equals(lhs, rhs).map(|equal| !equal),
            BinaryOp::Lt | BinaryOp::Le => match (lhs.int_set(), rhs.int_set()) {
                (Some(l), Some(r)) => match (l.min(), l.max(), r.min(), r.max()) {
                    (Some(lmin), Some(lmax), Some(rmin), Some(rmax)) => {
                        if op == BinaryOp::Lt {
                            if lmax < rmin {
                                Some(true)
                            } else if lmin >= rmax {
                                Some(false)
                            } else {
                                None
                            }
                        } else if lmax <= rmin {
                            Some(true)
                        } else if lmin > rmax {
                            Some(false)
                        } else {
                            None
                        }
                    }
                    _ => None,
                },
                _ => None,
            },
            BinaryOp::Gt | BinaryOp::Ge => {
                return match op.flip() {
                    Some(flipped) => DfType::compare(flipped, rhs, lhs),
                    None => DfType::Top,
                }
            }
            _ => return DfType::Top,
        };
        match decided {
            Some(value) => DfType::bool(value),
            None => DfType::Top,
        }
    }

    /// `Some(true)` if both values are certainly equal, `Some(false)` if they
    /// are certainly different.
    fn equals(lhs: &DfType, rhs: &DfType) -> Option<bool> {
        match (lhs.kind()?, rhs.kind()?) {
            (Kind::Int, Kind::Int) => {
                let (l, r) = (lhs.int_set()?, rhs.int_set()?);
                if !l.intersects(&r) {
                    Some(false)
                } else if l.as_point().is_some() && l == r {
                    Some(true)
                } else {
                    None
                }
            }
            (Kind::Bool, Kind::Bool) => Some(lhs.as_bool()? == rhs.as_bool()?),
            (Kind::Reference, Kind::Reference) => {
                match (lhs.nullability()?, rhs.nullability()?) {
                    (Nullability::Null, Nullability::Null) => Some(true),
                    (Nullability::Null, Nullability::NotNull)
                    | (Nullability::NotNull, Nullability::Null) => Some(false),
                    _ => match (lhs, rhs) {
                        (
                            DfType::Constant(Constant::Str(l)),
                            DfType::Constant(Constant::Str(r)),
                        ) if l != r => Some(false),
                        _ => None,
                    },
                }
            }
            _ => None,
        }
    }

    /// Evaluate a unary operator over an abstract value.
    pub fn unary(op: UnaryOp, value: &DfType) -> DfType {
        if value.is_bottom() {
            return DfType::Bottom;
        }
        match op {
            UnaryOp::Neg => value
                .int_set()
                .map(|set| DfType::range(set.unary_minus()))
                .unwrap_or(DfType::Top),
            UnaryOp::BitNot => value
                .int_set()
                .map(|set| DfType::range(set.bit_not()))
                .unwrap_or(DfType::Top),
            UnaryOp::Not => value
                .as_bool()
                .map(|value| DfType::bool(!value))
                .unwrap_or(DfType::Top),
        }
    }

    fn as_bool(&self) -> Option<bool> {
        self.as_constant().and_then(|constant| constant.as_bool())
    }
}

fn join_references(lhs: &DfType, rhs: &DfType) -> DfType {
    match (lhs, rhs) {
        (DfType::Constant(Constant::Null), DfType::Reference(_, t))
        | (DfType::Reference(_, t), DfType::Constant(Constant::Null)) => {
            DfType::reference(Nullability::Unknown, t.clone())
        }
        (DfType::Constant(Constant::Null), DfType::Constant(Constant::Str(_)))
        | (DfType::Constant(Constant::Str(_)), DfType::Constant(Constant::Null)) => {
            DfType::reference(Nullability::Unknown, Some(TypeConstraint::string()))
        }
        (DfType::Constant(Constant::Str(_)), DfType::Constant(Constant::Str(_))) => {
            DfType::reference(Nullability::NotNull, Some(TypeConstraint::string()))
        }
        (DfType::Constant(Constant::Str(_)), DfType::Reference(n, t))
        | (DfType::Reference(n, t), DfType::Constant(Constant::Str(_))) => DfType::reference(
            n.join(Nullability::NotNull),
            TypeConstraint::join(&Some(TypeConstraint::string()), t),
        ),
        (DfType::Reference(ln, lt), DfType::Reference(rn, rt)) => {
            DfType::reference(ln.join(*rn), TypeConstraint::join(lt, rt))
        }
        _ => DfType::Top,
    }
}

fn meet_references(lhs: &DfType, rhs: &DfType) -> DfType {
    match (lhs, rhs) {
        (DfType::Constant(Constant::Null), DfType::Reference(n, _))
        | (DfType::Reference(n, _), DfType::Constant(Constant::Null)) => {
            match n.meet(Nullability::Null) {
                Some(_) => DfType::null(),
                None => DfType::Bottom,
            }
        }
        (DfType::Constant(Constant::Str(s)), DfType::Reference(_, t))
        | (DfType::Reference(_, t), DfType::Constant(Constant::Str(s))) => {
            match TypeConstraint::meet(&Some(TypeConstraint::string()), t) {
                Ok(_) => DfType::string(s.clone()),
                Err(()) => DfType::Bottom,
            }
        }
        (DfType::Reference(ln, lt), DfType::Reference(rn, rt)) => {
            match (ln.meet(*rn), TypeConstraint::meet(lt, rt)) {
                (Some(n), Ok(t)) => DfType::reference(n, t),
                _ => DfType::Bottom,
            }
        }
        // Two different constants.
        _ => DfType::Bottom,
    }
}

impl Default for DfType {
    fn default() -> DfType {
        DfType::Top
    }
}

impl From<Constant> for DfType {
    fn from(constant: Constant) -> DfType {
        DfType::Constant(constant)
    }
}

impl From<LongRangeSet> for DfType {
    fn from(set: LongRangeSet) -> DfType {
        DfType::range(set)
    }
}

impl fmt::Display for DfType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DfType::Top => write!(f, "⊤"),
            DfType::Bottom => write!(f, "⊥"),
            DfType::Constant(ref constant) => write!(f, "{}", constant),
            DfType::Range(ref set) => write!(f, "{}", set),
            DfType::Reference(nullability, Some(ref constraint)) => {
                write!(f, "{} {}", nullability, constraint)
            }
            DfType::Reference(nullability, None) => write!(f, "{}", nullability),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_dftype() -> impl Strategy<Value = DfType> {
        let nullability = prop_oneof![Just(Nullability::NotNull), Just(Nullability::Unknown)];
        let constraint = prop_oneof![
            Just(None),
            Just(Some(TypeConstraint::new(STRING_TYPE))),
            Just(Some(TypeConstraint::new("List"))),
        ];
        prop_oneof![
            Just(DfType::Top),
            Just(DfType::Bottom),
            (-20i64..20).prop_map(DfType::int),
            prop::collection::vec((-50i64..50, 0i64..10), 1..4).prop_map(|intervals| {
                DfType::range(LongRangeSet::from_intervals(
                    intervals.into_iter().map(|(lo, len)| (lo, lo + len)),
                ))
            }),
            Just(DfType::any_int()),
            any::<bool>().prop_map(DfType::bool),
            Just(DfType::null()),
            prop_oneof![Just("a"), Just("b")].prop_map(DfType::string),
            (nullability, constraint).prop_map(|(n, t)| DfType::reference(n, t)),
        ]
    }

    proptest! {
        #[test]
        fn prop_idempotence(a in arb_dftype()) {
            prop_assert_eq!(a.join(&a), a.clone());
            prop_assert_eq!(a.meet(&a), a);
        }

        #[test]
        fn prop_identity(a in arb_dftype()) {
            prop_assert_eq!(a.join(&DfType::BOTTOM), a.clone());
            prop_assert_eq!(a.meet(&DfType::TOP), a);
        }

        #[test]
        fn prop_absorption(a in arb_dftype()) {
            prop_assert_eq!(a.join(&DfType::TOP), DfType::Top);
            prop_assert_eq!(a.meet(&DfType::BOTTOM), DfType::Bottom);
        }

        #[test]
        fn prop_commutativity(a in arb_dftype(), b in arb_dftype()) {
            prop_assert_eq!(a.join(&b), b.join(&a));
            prop_assert_eq!(a.meet(&b), b.meet(&a));
        }

        #[test]
        fn prop_join_is_upper_bound(a in arb_dftype(), b in arb_dftype()) {
            let join = a.join(&b);
            prop_assert!(join.is_super_type_of(&a));
            prop_assert!(join.is_super_type_of(&b));
        }

        #[test]
        fn prop_meet_is_below_both(a in arb_dftype(), b in arb_dftype()) {
            let meet = a.meet(&b);
            prop_assert!(a.is_super_type_of(&meet));
            prop_assert!(b.is_super_type_of(&meet));
        }

        #[test]
        fn prop_negation_is_disjoint(a in arb_dftype()) {
            if let Some(negated) = a.try_negate() {
                if !a.is_top() && !a.is_bottom() {
                    prop_assert_eq!(a.meet(&negated), DfType::Bottom);
                }
            }
        }
    }

    #[test]
    fn constant_folding() {
        let five = DfType::int(5);
        assert_eq!(five.meet(&DfType::int_range(0, 10)), DfType::int(5));
        assert_eq!(five.meet(&DfType::int_range(6, 10)), DfType::Bottom);
        assert_eq!(
            DfType::string("s").meet(&DfType::int_range(0, 10)),
            DfType::Bottom
        );
    }

    #[test]
    fn constants_join_to_ranges() {
        assert_eq!(
            DfType::int(1).join(&DfType::int(2)),
            DfType::range(LongRangeSet::range(1, 2))
        );
        assert_eq!(
            DfType::int(-1).join(&DfType::int(1)),
            DfType::range(LongRangeSet::from_intervals(vec![(-1, -1), (1, 1)]))
        );
        assert_eq!(DfType::int(3).join(&DfType::int(3)), DfType::int(3));
        assert_eq!(
            DfType::int_range(3, 3),
            DfType::int(3),
            "single value ranges are constants"
        );
    }

    #[test]
    fn join_cap_widens_to_top() {
        let mut dftype = DfType::Bottom;
        for i in 0..3 {
            dftype = dftype.join_capped(&DfType::int(i * 10), 2);
        }
        assert_eq!(dftype, DfType::Top);
    }

    #[test]
    fn reference_lattice() {
        let not_null = DfType::not_null();
        assert_eq!(DfType::null().join(&not_null), DfType::nullable());
        assert_eq!(DfType::null().meet(&not_null), DfType::Bottom);
        assert_eq!(DfType::nullable().meet(&not_null), not_null);
        assert_eq!(DfType::nullable().meet(&DfType::null()), DfType::null());
        assert_eq!(
            DfType::string("a").join(&DfType::string("b")),
            DfType::reference(Nullability::NotNull, Some(TypeConstraint::new(STRING_TYPE)))
        );
        assert_eq!(
            DfType::reference(Nullability::NotNull, Some(TypeConstraint::new("List")))
                .meet(&DfType::string("a")),
            DfType::Bottom
        );
        assert_eq!(DfType::reference(Nullability::Null, None), DfType::null());
    }

    #[test]
    fn mismatched_kinds() {
        assert_eq!(DfType::bool(true).join(&DfType::int(1)), DfType::Top);
        assert_eq!(DfType::bool(true).meet(&DfType::int(1)), DfType::Bottom);
        assert_eq!(DfType::bool(true).join(&DfType::bool(false)), DfType::Top);
    }

    #[test]
    fn try_negate() {
        assert_eq!(
            DfType::int(0).try_negate(),
            Some(DfType::range(LongRangeSet::point(0).negate()))
        );
        assert_eq!(DfType::any_int().try_negate(), Some(DfType::Bottom));
        assert_eq!(DfType::null().try_negate(), Some(DfType::not_null()));
        assert_eq!(DfType::not_null().try_negate(), Some(DfType::null()));
        assert_eq!(DfType::bool(true).try_negate(), Some(DfType::bool(false)));
        assert_eq!(DfType::nullable().try_negate(), None);
        assert_eq!(DfType::Top.try_negate(), Some(DfType::Bottom));

        // A range which can never be zero is always true in a `!= 0` check.
        let positive = DfType::int_range(1, 100);
        assert_eq!(
            DfType::compare(BinaryOp::Ne, &positive, &DfType::int(0)),
            DfType::bool(true)
        );
    }

    #[test]
    fn arithmetic() {
        assert_eq!(
            DfType::binary(BinaryOp::Add, &DfType::int(2), &DfType::int(3)),
            DfType::int(5)
        );
        assert_eq!(
            DfType::binary(BinaryOp::Add, &DfType::int_range(0, 4), &DfType::int(1)),
            DfType::int_range(1, 5)
        );
        assert_eq!(
            DfType::binary(BinaryOp::Div, &DfType::int(1), &DfType::int(0)),
            DfType::Bottom
        );
        assert_eq!(
            DfType::binary(BinaryOp::Add, &DfType::Top, &DfType::int(1)),
            DfType::Top
        );
        assert_eq!(
            DfType::binary(BinaryOp::And, &DfType::Top, &DfType::bool(false)),
            DfType::bool(false)
        );
        assert_eq!(DfType::unary(UnaryOp::Neg, &DfType::int(4)), DfType::int(-4));
        assert_eq!(DfType::unary(UnaryOp::Not, &DfType::bool(true)), DfType::bool(false));
    }

    #[test]
    fn comparisons() {
        let small = DfType::int_range(0, 5);
        assert_eq!(
            DfType::compare(BinaryOp::Lt, &small, &DfType::int(6)),
            DfType::bool(true)
        );
        assert_eq!(
            DfType::compare(BinaryOp::Gt, &small, &DfType::int(5)),
            DfType::bool(false)
        );
        assert_eq!(DfType::compare(BinaryOp::Le, &small, &DfType::int(3)), DfType::Top);
        assert_eq!(
            DfType::compare(BinaryOp::Eq, &DfType::null(), &DfType::not_null()),
            DfType::bool(false)
        );
        assert_eq!(
            DfType::compare(BinaryOp::Eq, &DfType::null(), &DfType::null()),
            DfType::bool(true)
        );
        assert_eq!(
            DfType::compare(BinaryOp::Eq, &DfType::nullable(), &DfType::null()),
            DfType::Top
        );
    }

    #[test]
    fn widen() {
        assert_eq!(DfType::int_range(0, 2).widen(&DfType::int_range(0, 1)), DfType::Top);
        assert_eq!(DfType::int(1).widen(&DfType::int(1)), DfType::int(1));
        assert_eq!(DfType::nullable().widen(&DfType::null()), DfType::nullable());
    }
}
