//! Universe levels and the operations the type checker performs on them.
//!
//! Levels form a join-semilattice generated by `0`, `+1`, `max`, `imax` and named parameters.
//! Two levels are considered equal by the checker if they normalise to the same level,
//! or if each is provably at most the other (see [`Level::is_equivalent`]).

// Allow this lint to increase readability in complex chains of logic.
#![allow(clippy::if_same_then_else)]

use std::{collections::BTreeSet, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::basic::Name;

/// A concrete universe level.
/// Level `0` represents `Prop`, the type of (proof-irrelevant) propositions.
/// Level `1` represents `Type`, the type of all (small) types.
pub type ExplicitLevel = u32;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Level {
    Zero,
    Succ(Box<Level>),
    /// Takes the larger level of `left` and `right`.
    Max(Box<Level>, Box<Level>),
    /// Takes the larger level of `left` and `right`, but if `right == 0`, then this just gives `0`.
    ImpredicativeMax(Box<Level>, Box<Level>),
    /// A universe parameter of a declaration.
    /// Parameters are opaque: two parameters are only equal if they have the same name.
    Param(Name),
}

impl Level {
    pub fn zero() -> Level {
        Level::Zero
    }

    pub fn one() -> Level {
        Level::Zero.succ()
    }

    pub fn param(name: impl Into<Name>) -> Level {
        Level::Param(name.into())
    }

    pub fn from_explicit(level: ExplicitLevel) -> Level {
        let mut result = Level::Zero;
        result.add_offset(level);
        result
    }

    #[must_use]
    pub fn succ(self) -> Level {
        Level::Succ(Box::new(self))
    }

    pub fn max(left: Level, right: Level) -> Level {
        Level::Max(Box::new(left), Box::new(right))
    }

    pub fn imax(left: Level, right: Level) -> Level {
        Level::ImpredicativeMax(Box::new(left), Box::new(right))
    }

    /// If this level is syntactically equal to `k` for some integer `k`, return `k`.
    pub fn to_explicit_level(&self) -> Option<ExplicitLevel> {
        match self {
            Level::Zero => Some(0),
            Level::Succ(inner) => inner.to_explicit_level().map(|n| n + 1),
            _ => None,
        }
    }

    /// Factors out the outermost sequence of [`Level::Succ`] instances.
    /// If the input is `u + k` where `k` is an integer, we remove the `+ k` from the input and return `k`.
    fn remove_offset(&mut self) -> ExplicitLevel {
        let mut levels = 0;
        loop {
            match std::mem::replace(self, Level::Zero) {
                Level::Succ(inner) => {
                    *self = *inner;
                    levels += 1;
                }
                other => {
                    *self = other;
                    break levels;
                }
            }
        }
    }

    /// Reverses [`Self::remove_offset`] by adding iterated `+ 1` operations to this level.
    fn add_offset(&mut self, levels_to_raise: ExplicitLevel) {
        for _ in 0..levels_to_raise {
            let inner = std::mem::replace(self, Level::Zero);
            *self = Level::Succ(Box::new(inner));
        }
    }

    /// Returns true if this level is definitely not the zero level, `Prop`.
    /// It is possible for [`Self::is_zero`] and [`Self::is_nonzero`] to both be false.
    pub fn is_nonzero(&self) -> bool {
        match self {
            Level::Zero => false,
            Level::Param(_) => false,
            Level::Succ(_) => true,
            Level::Max(left, right) => left.is_nonzero() || right.is_nonzero(),
            // Even if the left hand side of an `imax` is nonzero, the result is still zero if the right hand side is.
            Level::ImpredicativeMax(_, right) => right.is_nonzero(),
        }
    }

    /// Returns true if this level is syntactically zero.
    /// Normalise first to decide whether a level is definitionally zero.
    pub fn is_zero(&self) -> bool {
        matches!(self, Level::Zero)
    }

    /// Converts a level to an equivalent, simpler, form.
    #[must_use]
    pub fn normalise(mut self) -> Level {
        // First, factor out the outermost `+ k` chain.
        let levels = self.remove_offset();
        match self {
            Level::Zero | Level::Param(_) => {
                self.add_offset(levels);
                self
            }
            Level::Succ(_) => unreachable!("should have already factored out succ chain"),
            Level::Max(mut left, mut right) => {
                // `(max a b) + k` is `max (a + k) (b + k)`.
                left.add_offset(levels);
                right.add_offset(levels);
                Self::normalise_max_chain(*left, *right)
            }
            Level::ImpredicativeMax(left, right) => {
                let mut result = Self::normalise_imax(left.normalise(), right.normalise());
                result.add_offset(levels);
                result
            }
        }
    }

    /// Both arguments must already be normalised.
    fn normalise_imax(left: Level, right: Level) -> Level {
        if right.is_nonzero() {
            // This is a regular max expression.
            Self::normalise_max_chain(left, right)
        } else if left.is_zero() || right.is_zero() {
            // If the left parameter is zero, the result is the right parameter.
            // If the right parameter is zero, then the result is zero, which is the right parameter.
            right
        } else if left == right {
            left
        } else {
            Level::imax(left, right)
        }
    }

    fn normalise_max_chain(left: Level, right: Level) -> Level {
        // Flatten out nested invocations of `max`, normalise all parameters, and flatten again.
        let mut args = Self::collect_max_args(left, right)
            .into_iter()
            .flat_map(|arg| match arg.normalise() {
                Level::Max(left, right) => Self::collect_max_args(*left, *right),
                other => vec![other],
            })
            .collect::<Vec<_>>();
        // Sort the arguments so that easily comparable arguments are adjacent.
        args.sort_by(|left, right| left.sort_key().cmp(&right.sort_key()));
        // We reverse the iterator so this behaves like a right-facing fold.
        args.into_iter()
            .rev()
            .reduce(|right, left| Self::normalise_max(left, right))
            .unwrap_or(Level::Zero)
    }

    fn sort_key(&self) -> (u8, Option<&Name>, ExplicitLevel) {
        match self {
            Level::Zero => (0, None, 0),
            Level::Succ(_) => {
                let mut base = self;
                let mut offset = 0;
                while let Level::Succ(inner) = base {
                    base = inner;
                    offset += 1;
                }
                match base {
                    Level::Param(name) => (1, Some(name), offset),
                    _ => (1, None, offset),
                }
            }
            Level::Max(_, _) => (2, None, 0),
            Level::ImpredicativeMax(_, _) => (3, None, 0),
            Level::Param(name) => (4, Some(name), 0),
        }
    }

    fn collect_max_args(left: Level, right: Level) -> Vec<Level> {
        let mut result = match left {
            Level::Max(l, r) => Self::collect_max_args(*l, *r),
            other => vec![other],
        };
        match right {
            Level::Max(l, r) => result.extend(Self::collect_max_args(*l, *r)),
            other => result.push(other),
        }
        result
    }

    fn normalise_max(mut left: Level, mut right: Level) -> Level {
        if let (Some(l), Some(r)) = (left.to_explicit_level(), right.to_explicit_level()) {
            // We can compare the levels directly because we know their values.
            if l >= r {
                left
            } else {
                right
            }
        } else if left.is_zero() {
            right
        } else if right.is_zero() {
            left
        } else if left == right {
            left
        } else if matches!(&left, Level::Max(a, b) if **a == right || **b == right) {
            // The result of `max (max a b) a` or `max (max a b) b` is `max a b`.
            left
        } else if matches!(&right, Level::Max(a, b) if **a == left || **b == left) {
            // The result of `max a (max a b)` or `max b (max a b)` is `max a b`.
            right
        } else {
            // Try to factor out `+ k` chains from the left and right arguments.
            let left_levels = left.remove_offset();
            let right_levels = right.remove_offset();
            if left == right {
                if left_levels >= right_levels {
                    left.add_offset(left_levels);
                    left
                } else {
                    right.add_offset(right_levels);
                    right
                }
            } else if left.is_zero() && left_levels <= right_levels {
                // `max k (u + j)` is `u + j` when `k <= j`.
                right.add_offset(right_levels);
                right
            } else if right.is_zero() && right_levels <= left_levels {
                left.add_offset(left_levels);
                left
            } else {
                // Couldn't simplify. Revert the `+ k` chains.
                left.add_offset(left_levels);
                right.add_offset(right_levels);
                Level::max(left, right)
            }
        }
    }
}

enum ReplaceResult {
    /// The level should not be replaced.
    Skip,
    /// The level should be replaced with the given value.
    ReplaceWith(Level),
}

impl Level {
    fn replace(&self, replace_fn: &impl Fn(&Level) -> ReplaceResult) -> Level {
        match replace_fn(self) {
            ReplaceResult::Skip => match self {
                Level::Zero | Level::Param(_) => self.clone(),
                Level::Succ(inner) => inner.replace(replace_fn).succ(),
                Level::Max(left, right) => {
                    Level::max(left.replace(replace_fn), right.replace(replace_fn))
                }
                Level::ImpredicativeMax(left, right) => {
                    Level::imax(left.replace(replace_fn), right.replace(replace_fn))
                }
            },
            ReplaceResult::ReplaceWith(replacement) => replacement,
        }
    }

    /// Replaces each parameter in `params` with the level at the same position in `levels`.
    /// Parameters not listed are left untouched.
    #[must_use]
    pub fn instantiate_params(&self, params: &[Name], levels: &[Level]) -> Level {
        self.replace(&|inner| match inner {
            Level::Param(name) => params
                .iter()
                .position(|param| param == name)
                .and_then(|position| levels.get(position))
                .map_or(ReplaceResult::Skip, |level| {
                    ReplaceResult::ReplaceWith(level.clone())
                }),
            _ => ReplaceResult::Skip,
        })
    }

    /// Calls `f` on every parameter occurring in this level.
    pub fn for_each_param(&self, f: &mut impl FnMut(&Name)) {
        match self {
            Level::Zero => {}
            Level::Param(name) => f(name),
            Level::Succ(inner) => inner.for_each_param(f),
            Level::Max(left, right) | Level::ImpredicativeMax(left, right) => {
                left.for_each_param(f);
                right.for_each_param(f);
            }
        }
    }

    /// The set of parameters occurring in this level.
    pub fn params(&self) -> BTreeSet<Name> {
        let mut result = BTreeSet::new();
        self.for_each_param(&mut |name| {
            result.insert(name.clone());
        });
        result
    }

    /// Returns true if the left level is at most (<=) the right level, for every assignment of parameters.
    /// This check is sound but not complete: a `false` result does not prove `left > right`.
    pub fn is_leq(left: &Level, right: &Level) -> bool {
        Self::is_leq_core(left.clone().normalise(), right.clone().normalise())
    }

    fn is_leq_core(mut left: Level, mut right: Level) -> bool {
        if left == right || left.is_zero() {
            // The zero level is never greater than any other level.
            return true;
        }
        if let Level::Max(a, b) = &left {
            return Self::is_leq_core((**a).clone(), right.clone())
                && Self::is_leq_core((**b).clone(), right);
        }
        if let Level::Max(a, b) = &right {
            if Self::is_leq_core(left.clone(), (**a).clone())
                || Self::is_leq_core(left.clone(), (**b).clone())
            {
                return true;
            }
        }
        if let Level::ImpredicativeMax(a, b) = &left {
            return Self::is_leq_core((**a).clone(), right.clone())
                && Self::is_leq_core((**b).clone(), right);
        }
        if let Level::ImpredicativeMax(_, b) = &right {
            // If `b` is zero, so is the `imax`, and `left <= b` still holds.
            // Otherwise the `imax` is at least `b`.
            return Self::is_leq_core(left, (**b).clone());
        }

        let left_offset = left.remove_offset();
        let right_offset = right.remove_offset();
        if left == right || left.is_zero() {
            left_offset <= right_offset
        } else if left_offset <= right_offset && right_offset > 0 {
            Self::is_leq_core(left, right)
        } else {
            false
        }
    }

    /// Decides whether two levels are definitionally equal.
    pub fn is_equivalent(left: &Level, right: &Level) -> bool {
        let left = left.clone().normalise();
        let right = right.clone().normalise();
        left == right
            || (Self::is_leq_core(left.clone(), right.clone()) && Self::is_leq_core(right, left))
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(explicit) = self.to_explicit_level() {
            return write!(f, "{explicit}");
        }
        match self {
            Level::Zero => write!(f, "0"),
            Level::Param(name) => write!(f, "{name}"),
            Level::Succ(_) => {
                let mut base = self.clone();
                let offset = base.remove_offset();
                match base {
                    Level::Param(_) => write!(f, "{base}+{offset}"),
                    _ => write!(f, "({base})+{offset}"),
                }
            }
            Level::Max(left, right) => write!(f, "max {} {}", Atom(left), Atom(right)),
            Level::ImpredicativeMax(left, right) => {
                write!(f, "imax {} {}", Atom(left), Atom(right))
            }
        }
    }
}

/// Parenthesises compound levels appearing as arguments of `max` and `imax`.
struct Atom<'a>(&'a Level);

impl Display for Atom<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Level::Max(_, _) | Level::ImpredicativeMax(_, _) => write!(f, "({})", self.0),
            Level::Succ(_) if self.0.to_explicit_level().is_none() => write!(f, "({})", self.0),
            _ => write!(f, "{}", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::universe::*;

    fn u() -> Level {
        Level::param("u")
    }

    fn v() -> Level {
        Level::param("v")
    }

    #[test]
    fn explicit_levels() {
        assert_eq!(Level::from_explicit(3).to_explicit_level(), Some(3));
        assert_eq!(u().succ().to_explicit_level(), None);
    }

    #[test]
    fn normalise_explicit_max() {
        let level = Level::max(Level::one(), Level::from_explicit(3));
        assert_eq!(level.normalise(), Level::from_explicit(3));
    }

    #[test]
    fn normalise_max_with_zero() {
        assert_eq!(Level::max(Level::Zero, u()).normalise(), u());
        assert_eq!(Level::max(u(), Level::Zero).normalise(), u());
    }

    #[test]
    fn normalise_max_of_offsets() {
        let level = Level::max(u().succ(), u().succ().succ());
        assert_eq!(level.normalise(), u().succ().succ());
        let level = Level::max(Level::one(), u().succ());
        assert_eq!(level.normalise(), u().succ());
    }

    #[test]
    fn offsets_distribute_over_max() {
        let outer = Level::max(u(), v()).succ();
        let inner = Level::max(u().succ(), v().succ());
        assert_eq!(outer.clone().normalise(), inner.clone().normalise());
        assert!(Level::is_equivalent(&outer, &inner));
        assert!(Level::is_leq(&outer, &inner) && Level::is_leq(&inner, &outer));
        // Nested chains are flattened after the offset is pushed inside.
        let nested = Level::max(Level::max(u(), Level::one()).succ(), v().succ().succ());
        assert!(Level::is_equivalent(
            &nested,
            &Level::max(Level::max(u().succ(), Level::from_explicit(2)), v().succ().succ())
        ));
        assert!(!Level::is_equivalent(&outer, &Level::max(u(), v().succ())));
    }

    #[test]
    fn normalise_imax() {
        // `imax u 0` is `0`.
        assert_eq!(Level::imax(u(), Level::Zero).normalise(), Level::Zero);
        // `imax u (v + 1)` is `max u (v + 1)`.
        assert!(!matches!(
            Level::imax(u(), v().succ()).normalise(),
            Level::ImpredicativeMax(_, _)
        ));
        // `imax u v` cannot be simplified.
        assert_eq!(Level::imax(u(), v()).normalise(), Level::imax(u(), v()));
        assert_eq!(Level::imax(u(), u()).normalise(), u());
    }

    #[test]
    fn max_is_commutative_up_to_equivalence() {
        assert!(Level::is_equivalent(
            &Level::max(u(), v()),
            &Level::max(v(), u())
        ));
        assert!(Level::is_equivalent(
            &Level::max(u(), Level::max(v(), u())),
            &Level::max(v(), u())
        ));
    }

    #[test]
    fn params_are_opaque() {
        assert!(!Level::is_equivalent(&u(), &v()));
        assert!(!Level::is_equivalent(&u(), &Level::Zero));
        assert!(Level::is_equivalent(&u(), &u()));
    }

    #[test]
    fn leq() {
        assert!(Level::is_leq(&Level::Zero, &u()));
        assert!(Level::is_leq(&u(), &u().succ()));
        assert!(!Level::is_leq(&u().succ(), &u()));
        assert!(Level::is_leq(&u(), &Level::max(v(), u())));
        assert!(Level::is_leq(&Level::imax(u(), v()), &Level::max(u(), v())));
        assert!(!Level::is_leq(&u(), &v()));
        assert!(Level::is_leq(&Level::one(), &u().succ()));
    }

    #[test]
    fn instantiate() {
        let level = Level::max(u(), v().succ());
        let instantiated = level.instantiate_params(
            &[Name::new("u"), Name::new("v")],
            &[Level::one(), Level::Zero],
        );
        assert_eq!(instantiated.normalise(), Level::one());
    }

    #[test]
    fn collect_params() {
        let level = Level::imax(u(), Level::max(v().succ(), u()));
        assert_eq!(
            level.params().into_iter().collect::<Vec<_>>(),
            vec![Name::new("u"), Name::new("v")]
        );
    }

    #[test]
    fn display() {
        assert_eq!(Level::from_explicit(2).to_string(), "2");
        assert_eq!(u().succ().to_string(), "u+1");
        assert_eq!(Level::max(u(), v().succ()).to_string(), "max u (v+1)");
    }
}
