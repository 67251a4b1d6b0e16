//! Local contexts: the free variables an expression may refer to.

use rpds::List;
use serde::{Deserialize, Serialize};

use crate::{
    basic::{DeBruijnIndex, DeBruijnOffset, Name},
    expr::Expression,
};

/// A single local binding.
/// The type and value are well-scoped relative to the bindings pushed *before* this one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// Only used when rendering expressions.
    pub name: Name,
    pub ty: Expression,
    /// Present for bindings introduced by `let`.
    pub value: Option<Expression>,
}

/// An ordered, append-only sequence of bindings.
/// Index zero is the most recently pushed binding, matching de Bruijn indices.
///
/// Contexts are persistent: [`Context::push`] returns an extended context and leaves `self`
/// untouched, sharing every existing binding.
#[derive(Clone)]
pub struct Context {
    bindings: List<Binding>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            bindings: List::new(),
        }
    }

    /// Builds a context from bindings listed outermost first.
    pub fn from_bindings(bindings: impl IntoIterator<Item = Binding>) -> Self {
        bindings
            .into_iter()
            .fold(Self::new(), |ctx, binding| ctx.push_binding(binding))
    }

    #[must_use]
    pub fn push_binding(&self, binding: Binding) -> Self {
        Self {
            bindings: self.bindings.push_front(binding),
        }
    }

    /// Extends the context with a new innermost binding.
    #[must_use]
    pub fn push(&self, name: Name, ty: Expression, value: Option<Expression>) -> Self {
        self.push_binding(Binding { name, ty, value })
    }

    /// Extends the context with an anonymous variable of the given type.
    #[must_use]
    pub fn push_anonymous(&self, ty: Expression) -> Self {
        self.push(Name::anonymous(), ty, None)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns the binding with the given index, exactly as it was pushed.
    pub fn lookup(&self, index: DeBruijnIndex) -> Option<&Binding> {
        self.bindings.iter().nth(index.value() as usize)
    }

    /// Returns the type of the variable with the given index, valid in this whole context.
    pub fn lookup_type(&self, index: DeBruijnIndex) -> Option<Expression> {
        self.lookup(index)
            .map(|binding| binding.ty.lift_free_vars(DeBruijnOffset::new(index.value() + 1)))
    }

    /// Returns the value of a `let`-bound variable with the given index, valid in this whole context.
    pub fn lookup_value(&self, index: DeBruijnIndex) -> Option<Expression> {
        self.lookup(index).and_then(|binding| {
            binding
                .value
                .as_ref()
                .map(|value| value.lift_free_vars(DeBruijnOffset::new(index.value() + 1)))
        })
    }

    /// Iterates over the bindings, innermost first.
    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    /// The bindings, outermost first.
    pub fn to_vec(&self) -> Vec<&Binding> {
        let mut result = self.bindings.iter().collect::<Vec<_>>();
        result.reverse();
        result
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for Context {}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.to_vec()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{basic::*, context::*, expr::Expression};

    #[test]
    fn push_is_persistent() {
        let empty = Context::new();
        let one = empty.push_anonymous(Expression::sort_prop());
        assert!(empty.is_empty());
        assert_eq!(one.len(), 1);
    }

    #[test]
    fn lookup_lifts_types() {
        // x : Prop, y : x
        let ctx = Context::new()
            .push(Name::new("x"), Expression::sort_prop(), None)
            .push(Name::new("y"), Expression::variable(0), None);
        // The type of `y` refers to `x`, which is `#1` from inside the full context.
        assert_eq!(
            ctx.lookup_type(DeBruijnIndex::zero()),
            Some(Expression::variable(1))
        );
        assert_eq!(
            ctx.lookup_type(DeBruijnIndex::new(1)),
            Some(Expression::sort_prop())
        );
        assert_eq!(ctx.lookup_type(DeBruijnIndex::new(2)), None);
        assert_eq!(ctx.lookup(DeBruijnIndex::new(1)).map(|b| b.name.clone()), Some(Name::new("x")));
    }

    #[test]
    fn lookup_values() {
        let ctx = Context::new()
            .push(Name::new("a"), Expression::sort_type(), Some(Expression::sort_prop()))
            .push_anonymous(Expression::variable(0));
        assert_eq!(ctx.lookup_value(DeBruijnIndex::zero()), None);
        assert_eq!(
            ctx.lookup_value(DeBruijnIndex::new(1)),
            Some(Expression::sort_prop())
        );
    }

    #[test]
    fn from_bindings_is_outermost_first() {
        let ctx = Context::from_bindings([
            Binding {
                name: Name::new("a"),
                ty: Expression::sort_prop(),
                value: None,
            },
            Binding {
                name: Name::new("b"),
                ty: Expression::variable(0),
                value: None,
            },
        ]);
        let names = ctx.to_vec().iter().map(|b| b.name.clone()).collect::<Vec<_>>();
        assert_eq!(names, vec![Name::new("a"), Name::new("b")]);
        assert_eq!(ctx.lookup(DeBruijnIndex::zero()).map(|b| b.name.clone()), Some(Name::new("b")));
    }
}
