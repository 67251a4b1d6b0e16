//! Unfolds definitions.

use crate::{
    environment::{Declaration, DefinitionHeight},
    expr::{Constant, Expression, ExpressionContents},
};

use super::Normalizer;

impl<'env> Normalizer<'env> {
    /// Returns the declaration that the head of this application spine refers to,
    /// if it can be unfolded with the universe levels it was given.
    fn unfoldable_head<'e>(
        &self,
        e: &'e Expression,
    ) -> Option<(&'env Declaration, &'e Constant)> {
        match e.head().value() {
            ExpressionContents::Constant(constant) => self
                .environment()
                .lookup(&constant.name)
                .filter(|decl| {
                    decl.definition_height().is_some()
                        && decl.universe_params.len() == constant.levels.len()
                })
                .map(|decl| (decl, constant)),
            _ => None,
        }
    }

    /// Returns the height of the definition at the head of this expression.
    /// If the head is not a definition that can be unfolded, return [`None`].
    pub fn head_definition_height(&self, e: &Expression) -> Option<DefinitionHeight> {
        self.unfoldable_head(e)
            .and_then(|(decl, _)| decl.definition_height())
    }

    /// Unfolds the definition at the head of this expression once, keeping its arguments.
    /// If we could not unfold the definition, return [`None`].
    pub fn unfold_definition(&self, e: &Expression) -> Option<Expression> {
        let (decl, constant) = self.unfoldable_head(e)?;
        let body = decl
            .unfoldable_body()?
            .instantiate_universe_parameters(&decl.universe_params, &constant.levels);
        tracing::trace!("unfolding {}", constant.name);
        Some(body.create_nary_application(e.apply_args()))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        basic::Name,
        environment::{Declaration, Environment},
        expr::Expression,
        interrupt::InterruptFlag,
        typeck::Normalizer,
        universe::Level,
    };

    fn environment() -> Environment {
        // const.{u} : Sort u -> Sort u -> Sort u := fun x y => x
        let sort_u = Expression::sort(Level::param("u"));
        Environment::new()
            .add(
                Name::new("const"),
                Declaration::definition(
                    vec![Name::new("u")],
                    Expression::arrow(
                        sort_u.clone(),
                        Expression::arrow(sort_u.clone(), sort_u.clone()),
                    ),
                    Expression::lambda(
                        sort_u.clone(),
                        Expression::lambda(sort_u, Expression::variable(1)),
                    ),
                ),
            )
            .unwrap()
    }

    #[test]
    fn unfold_keeps_arguments() {
        let env = environment();
        let normalizer = Normalizer::new(&env, InterruptFlag::new());
        let head = Expression::constant("const", vec![Level::one()]);
        let e = Expression::apply(head, Expression::sort_prop());
        let unfolded = normalizer.unfold_definition(&e).unwrap();
        let expected = Expression::apply(
            Expression::lambda(
                Expression::sort_type(),
                Expression::lambda(Expression::sort_type(), Expression::variable(1)),
            ),
            Expression::sort_prop(),
        );
        assert_eq!(unfolded, expected);
        assert_eq!(normalizer.head_definition_height(&e), Some(1));
    }

    #[test]
    fn wrong_arity_is_not_unfolded() {
        let env = environment();
        let normalizer = Normalizer::new(&env, InterruptFlag::new());
        let e = Expression::constant("const", Vec::new());
        assert_eq!(normalizer.unfold_definition(&e), None);
        assert_eq!(normalizer.head_definition_height(&e), None);
    }

    #[test]
    fn non_constants_are_not_unfolded() {
        let env = environment();
        let normalizer = Normalizer::new(&env, InterruptFlag::new());
        assert_eq!(normalizer.unfold_definition(&Expression::sort_prop()), None);
        assert_eq!(
            normalizer.unfold_definition(&Expression::constant("missing", Vec::new())),
            None
        );
    }
}
