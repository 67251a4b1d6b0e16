//! Provides utilities for working with n-ary functions, even though
//! function currying makes all functions behave like they are unary.

use crate::expr::*;

impl Expression {
    /// If this expression is a function application, return the leftmost function in the call chain.
    /// For example, applying this function to `foo 1 2 3` returns `foo`,
    /// and applying it to `(fun x => x) 1 2 3` returns `fun x => x`.
    /// If this is not a function application, we interpret the expression as a nullary function,
    /// and return the whole expression.
    #[must_use]
    pub fn head(&self) -> &Expression {
        let mut head = self;
        while let ExpressionContents::Apply(apply) = head.value() {
            head = &apply.function;
        }
        head
    }

    /// If this is a function application, return the list of arguments applied to the [`Self::head`] of the expression.
    /// Applying this function to `foo 1 2 3` returns `[1, 2, 3]`.
    /// If this is not a function application, return `[]`.
    #[must_use]
    pub fn apply_args(&self) -> Vec<&Expression> {
        let mut result = Vec::new();
        let mut e = self;
        while let ExpressionContents::Apply(apply) = e.value() {
            result.push(&apply.argument);
            e = &apply.function;
        }
        result.reverse();
        result
    }

    /// Suppose that this expression is an n-ary function application, where n is zero or a positive integer.
    /// Then, this function returns the [`Self::head`] of this expression, and the list of
    /// [`Self::apply_args`] that were applied to it.
    #[must_use]
    pub fn destructure_as_nary_application(&self) -> (&Expression, Vec<&Expression>) {
        (self.head(), self.apply_args())
    }

    /// Creates an n-ary function application chain from the given function (`self`) and arguments.
    #[must_use]
    pub fn create_nary_application<'a>(
        &self,
        arguments: impl IntoIterator<Item = &'a Expression>,
    ) -> Expression {
        arguments
            .into_iter()
            .fold(self.clone(), |function, argument| {
                Expression::apply(function, argument.clone())
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::*;

    #[test]
    fn destructure() {
        let f = Expression::constant("f", Vec::new());
        let a = Expression::constant("a", Vec::new());
        let b = Expression::constant("b", Vec::new());
        let e = f.create_nary_application([&a, &b]);
        assert_eq!(e, Expression::apply(Expression::apply(f.clone(), a.clone()), b.clone()));
        let (head, args) = e.destructure_as_nary_application();
        assert_eq!(head, &f);
        assert_eq!(args, vec![&a, &b]);
        assert_eq!(a.head(), &a);
        assert!(a.apply_args().is_empty());
    }
}
