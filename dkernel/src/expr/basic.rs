//! # Expressions
//!
//! Expressions are immutable trees whose nodes are shared through reference counting.
//! Bound variables are de Bruijn indices, so two expressions are alpha-equivalent exactly when
//! they are structurally equal.
//!
//! Every node caches its structural hash and the index of its first free variable when it is
//! created. This makes hashing, equality tests on distinct-but-equal trees, and closedness
//! tests cheap, which the memoisation caches of the type checker rely on.

use std::{
    collections::hash_map::DefaultHasher,
    fmt::Debug,
    hash::{Hash, Hasher},
    rc::Rc,
};

use serde::{Deserialize, Serialize};

use crate::{
    basic::{DeBruijnIndex, Name},
    universe::Level,
};

/// A constant declared in the environment, instantiated with universe levels.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Constant {
    pub name: Name,
    /// One level for each universe parameter of the declaration.
    pub levels: Vec<Level>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Apply {
    /// The function to be invoked.
    pub function: Expression,
    /// The argument to apply to the function.
    pub argument: Expression,
}

/// Either a lambda abstraction or the type of such lambda abstractions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binder {
    /// The type of the bound variable.
    pub domain: Expression,
    /// The variable is bound at index zero in this expression.
    /// If this is a lambda abstraction, this is the lambda term.
    /// If this is a function type, this is the type of the function's body.
    pub body: Expression,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Let {
    /// The value to assign to the new bound variable.
    pub value: Expression,
    /// The main body of the expression, in which the value is bound at index zero.
    pub body: Expression,
}

/// The main expression type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExpressionContents {
    Variable(DeBruijnIndex),
    /// The type of types at the given level.
    Sort(Level),
    Constant(Constant),
    Apply(Apply),
    Lambda(Binder),
    Pi(Binder),
    Let(Let),
}

struct ExpressionNode {
    hash: u64,
    first_free_variable_index: DeBruijnIndex,
    contents: ExpressionContents,
}

/// A reference-counted, immutable expression.
/// Cloning an expression is cheap and shares the underlying tree.
#[derive(Clone)]
pub struct Expression(Rc<ExpressionNode>);

impl Expression {
    /// Creates a new [`Expression`] with the given value.
    pub fn new(contents: ExpressionContents) -> Self {
        let mut hasher = DefaultHasher::new();
        contents.hash(&mut hasher);
        let first_free_variable_index = first_free_variable_index(&contents);
        Self(Rc::new(ExpressionNode {
            hash: hasher.finish(),
            first_free_variable_index,
            contents,
        }))
    }

    pub fn value(&self) -> &ExpressionContents {
        &self.0.contents
    }

    /// Returns true if the two expressions are the same allocation.
    /// This is a sufficient, but not necessary, condition for equality.
    pub fn ptr_eq(&self, other: &Expression) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn variable(index: u32) -> Self {
        Self::new(ExpressionContents::Variable(DeBruijnIndex::new(index)))
    }

    pub fn sort(level: Level) -> Self {
        Self::new(ExpressionContents::Sort(level))
    }

    /// Returns the sort of proof-irrelevant propositions.
    pub fn sort_prop() -> Self {
        Self::sort(Level::Zero)
    }

    /// Returns the sort of small types.
    pub fn sort_type() -> Self {
        Self::sort(Level::one())
    }

    pub fn constant(name: impl Into<Name>, levels: Vec<Level>) -> Self {
        Self::new(ExpressionContents::Constant(Constant {
            name: name.into(),
            levels,
        }))
    }

    pub fn apply(function: Expression, argument: Expression) -> Self {
        Self::new(ExpressionContents::Apply(Apply { function, argument }))
    }

    pub fn lambda(domain: Expression, body: Expression) -> Self {
        Self::new(ExpressionContents::Lambda(Binder { domain, body }))
    }

    pub fn pi(domain: Expression, body: Expression) -> Self {
        Self::new(ExpressionContents::Pi(Binder { domain, body }))
    }

    /// A non-dependent function type `domain -> codomain`.
    /// The codomain is given relative to the context *outside* the arrow.
    pub fn arrow(domain: Expression, codomain: Expression) -> Self {
        Self::pi(domain, codomain.lift_free_vars(crate::basic::DeBruijnOffset::new(1)))
    }

    pub fn let_in(value: Expression, body: Expression) -> Self {
        Self::new(ExpressionContents::Let(Let { value, body }))
    }

    /// All de Bruijn indices used by this expression that refer outside it are less than the return value.
    /// For instance, if the expression is `#0`, we return `#1`.
    /// If the expression is `fun _ => #0`, we return `#0`, because the inner `#0` refers to the binder.
    pub fn first_free_variable_index(&self) -> DeBruijnIndex {
        self.0.first_free_variable_index
    }

    /// An expression is called *closed* if it contains no free variables.
    /// The type and weak head normal form of a closed expression do not depend on the context.
    pub fn closed(&self) -> bool {
        self.first_free_variable_index() == DeBruijnIndex::zero()
    }

    /// The opposite of [`Self::closed`].
    pub fn has_free_variables(&self) -> bool {
        !self.closed()
    }

    /// We use [`ron`] to provide readable debug output for expressions.
    pub fn display(&self) -> String {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .unwrap_or_else(|err| format!("<could not render expression: {err}>"))
    }
}

fn first_free_variable_index(contents: &ExpressionContents) -> DeBruijnIndex {
    match contents {
        ExpressionContents::Variable(index) => index.succ(),
        ExpressionContents::Sort(_) | ExpressionContents::Constant(_) => DeBruijnIndex::zero(),
        ExpressionContents::Apply(apply) => std::cmp::max(
            apply.function.first_free_variable_index(),
            apply.argument.first_free_variable_index(),
        ),
        ExpressionContents::Lambda(binder) | ExpressionContents::Pi(binder) => std::cmp::max(
            binder.domain.first_free_variable_index(),
            binder.body.first_free_variable_index().pred(),
        ),
        ExpressionContents::Let(let_expr) => std::cmp::max(
            let_expr.value.first_free_variable_index(),
            let_expr.body.first_free_variable_index().pred(),
        ),
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.0.hash == other.0.hash && self.0.contents == other.0.contents)
    }
}

impl Eq for Expression {}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl Debug for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.contents.fmt(f)
    }
}

impl From<ExpressionContents> for Expression {
    fn from(value: ExpressionContents) -> Self {
        Self::new(value)
    }
}

impl Serialize for Expression {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.contents.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Expression {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        ExpressionContents::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use crate::{basic::DeBruijnIndex, expr::*};

    #[test]
    fn structural_equality_ignores_sharing() {
        let left = Expression::lambda(Expression::sort_prop(), Expression::variable(0));
        let right = Expression::lambda(Expression::sort_prop(), Expression::variable(0));
        assert!(!left.ptr_eq(&right));
        assert_eq!(left, right);
        assert_ne!(
            left,
            Expression::pi(Expression::sort_prop(), Expression::variable(0))
        );
    }

    #[test]
    fn free_variables() {
        assert_eq!(
            Expression::variable(2).first_free_variable_index(),
            DeBruijnIndex::new(3)
        );
        let identity = Expression::lambda(Expression::sort_prop(), Expression::variable(0));
        assert!(identity.closed());
        let open = Expression::lambda(Expression::variable(0), Expression::variable(1));
        assert_eq!(open.first_free_variable_index(), DeBruijnIndex::new(1));
        assert!(open.has_free_variables());
    }

    #[test]
    fn ron_round_trip() {
        let e = Expression::apply(
            Expression::constant("id", vec![crate::universe::Level::one()]),
            Expression::sort_prop(),
        );
        let text = ron::ser::to_string(&e).unwrap();
        let parsed: Expression = ron::from_str(&text).unwrap();
        assert_eq!(parsed, e);
    }
}
