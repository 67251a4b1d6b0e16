//! Decides definitional equality of expressions.

use std::cmp::Ordering;

use crate::{
    basic::DeBruijnOffset,
    context::Context,
    expr::*,
    result::Ir,
    universe::Level,
};

use super::TypeChecker;

impl<'env> TypeChecker<'env> {
    pub(super) fn is_convertible_core(
        &mut self,
        left: &Expression,
        right: &Expression,
        ctx: &Context,
    ) -> Ir<bool> {
        self.descend(|tc| tc.definitionally_equal(left, right, ctx))
    }

    /// Returns true if the two expressions are definitionally equal.
    /// Type errors found while trying a conversion rule mean that the rule does not apply.
    fn definitionally_equal(
        &mut self,
        left: &Expression,
        right: &Expression,
        ctx: &Context,
    ) -> Ir<bool> {
        // Structurally identical expressions are equal without any reduction.
        if left == right {
            return Ok(true);
        }

        // Reduce without unfolding definitions, so that lazy delta reduction can pick what to unfold.
        let mut left = self.normalizer.whnf_core(left, ctx)?;
        let mut right = self.normalizer.whnf_core(right, ctx)?;
        if left == right {
            return Ok(true);
        }

        // Test for simple cases first.
        if let Some(result) = self.quick_definitionally_equal(&left, &right, ctx)? {
            return Ok(result);
        }

        // Test for equality by performing delta reduction on `left` and `right`.
        // After invoking this, `left` and `right` are in weak head normal form.
        if let Some(result) = self.lazy_delta_reduction(&mut left, &mut right, ctx)? {
            return Ok(result);
        }

        // Now test all the other cases.
        match (left.value(), right.value()) {
            (ExpressionContents::Constant(left), ExpressionContents::Constant(right)) => {
                return Ok(constants_equal(left, right));
            }
            (ExpressionContents::Apply(_), ExpressionContents::Apply(_)) => {
                if self.spine_definitionally_equal(&left, &right, ctx)? {
                    return Ok(true);
                }
            }
            (ExpressionContents::Lambda(lambda), _) => {
                // Test if we can eta-expand the right expression into the form of the left lambda.
                if let Some(result) = self.try_eta_expansion(lambda, &right, ctx)? {
                    return Ok(result);
                }
            }
            (_, ExpressionContents::Lambda(lambda)) => {
                if let Some(result) = self.try_eta_expansion(lambda, &left, ctx)? {
                    return Ok(result);
                }
            }
            _ => {}
        }

        // All strategies to prove definitional equality failed.
        Ok(false)
    }

    /// Tries some fast simplifications to test for definitional equality.
    /// If this function returns a value, this is the answer to whether `left` and `right` are definitionally
    /// equal. If this function doesn't return anything, we could not tell whether they were equal.
    ///
    /// In particular, this function will return a value when both parameters are lambda, pi, or sort expressions.
    fn quick_definitionally_equal(
        &mut self,
        left: &Expression,
        right: &Expression,
        ctx: &Context,
    ) -> Ir<Option<bool>> {
        match (left.value(), right.value()) {
            (ExpressionContents::Lambda(left), ExpressionContents::Lambda(right))
            | (ExpressionContents::Pi(left), ExpressionContents::Pi(right)) => {
                self.binder_definitionally_equal(left, right, ctx).map(Some)
            }
            (ExpressionContents::Sort(left), ExpressionContents::Sort(right)) => {
                Ok(Some(Level::is_equivalent(left, right)))
            }
            _ => Ok(None),
        }
    }

    /// Lambda and pi expressions are definitionally equal if their parameter types are equal and their bodies are equal.
    fn binder_definitionally_equal(
        &mut self,
        left: &Binder,
        right: &Binder,
        ctx: &Context,
    ) -> Ir<bool> {
        if !self.is_convertible_core(&left.domain, &right.domain, ctx)? {
            return Ok(false);
        }
        // The parameter types are the same, so the bodies are compared under the same binding.
        let body_ctx = ctx.push_anonymous(left.domain.clone());
        self.is_convertible_core(&left.body, &right.body, &body_ctx)
    }

    /// Perform delta reduction at the heads of the input expressions
    /// to try to check if two expressions are definitionally equal.
    /// While executing this check, `left` and `right` will be unfolded, so they are passed mutably.
    fn lazy_delta_reduction(
        &mut self,
        left: &mut Expression,
        right: &mut Expression,
        ctx: &Context,
    ) -> Ir<Option<bool>> {
        loop {
            self.interrupt.check()?;

            // Check if either the left function or right function can be delta reduced.
            let left_height = self.normalizer.head_definition_height(left);
            let right_height = self.normalizer.head_definition_height(right);
            if left_height.is_none() && right_height.is_none() {
                // If neither head is a definition, we can't do any delta reduction in this step.
                break Ok(None);
            }

            if left_height == right_height
                && same_head_constant(left, right)
                && self.arguments_definitionally_equal(left, right, ctx)?
            {
                // Applications of the same definition to equal arguments are equal.
                // If the arguments differ, the results might still be equal, so we keep unfolding.
                break Ok(Some(true));
            }

            match left_height.cmp(&right_height) {
                Ordering::Less => {
                    // The right height was higher, so unfold that expression first.
                    *right = self.unfold_and_reduce(right, ctx)?;
                }
                Ordering::Greater => {
                    *left = self.unfold_and_reduce(left, ctx)?;
                }
                Ordering::Equal => {
                    // Both had the same height, so we unfold both definitions.
                    *left = self.unfold_and_reduce(left, ctx)?;
                    *right = self.unfold_and_reduce(right, ctx)?;
                }
            }

            // Now that we've done some delta reduction, check if the resulting terms match.
            if left == right {
                break Ok(Some(true));
            }
            if let Some(result) = self.quick_definitionally_equal(left, right, ctx)? {
                break Ok(Some(result));
            }
        }
    }

    fn unfold_and_reduce(&mut self, e: &Expression, ctx: &Context) -> Ir<Expression> {
        match self.normalizer.unfold_definition(e) {
            Some(unfolded) => self.normalizer.whnf_core(&unfolded, ctx),
            None => Ok(e.clone()),
        }
    }

    /// Compares the arguments of two application spines pairwise, stopping at the first mismatch.
    fn arguments_definitionally_equal(
        &mut self,
        left: &Expression,
        right: &Expression,
        ctx: &Context,
    ) -> Ir<bool> {
        let left_args = left.apply_args();
        let right_args = right.apply_args();
        if left_args.len() != right_args.len() {
            return Ok(false);
        }
        for (left_arg, right_arg) in left_args.into_iter().zip(right_args) {
            if !self.is_convertible_core(left_arg, right_arg, ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Test if the two expressions are applications of equal functions with equal arguments.
    fn spine_definitionally_equal(
        &mut self,
        left: &Expression,
        right: &Expression,
        ctx: &Context,
    ) -> Ir<bool> {
        if left.apply_args().len() != right.apply_args().len() {
            return Ok(false);
        }
        Ok(self.is_convertible_core(left.head(), right.head(), ctx)?
            && self.arguments_definitionally_equal(left, right, ctx)?)
    }

    /// Tries to check if the lambda and `other` are definitionally equal by eta-expanding `other`.
    /// `other` should not be a lambda.
    ///
    /// If `other` cannot be given a function type, eta expansion does not apply.
    fn try_eta_expansion(
        &mut self,
        lambda: &Binder,
        other: &Expression,
        ctx: &Context,
    ) -> Ir<Option<bool>> {
        let other_type = match self.infer_type_core(other, ctx) {
            Ok(ty) => ty,
            Err(err) if err.is_fatal() => return Err(err),
            Err(_) => return Ok(None),
        };
        let pi = match self.normalizer.as_pi(&other_type, ctx)? {
            Some(pi) => pi,
            None => return Ok(None),
        };
        if !self.is_convertible_core(&lambda.domain, &pi.domain, ctx)? {
            return Ok(Some(false));
        }

        // `other` is equal to `fun x => other x`.
        let body_ctx = ctx.push_anonymous(lambda.domain.clone());
        let expanded = Expression::apply(
            other.lift_free_vars(DeBruijnOffset::new(1)),
            Expression::variable(0),
        );
        self.is_convertible_core(&lambda.body, &expanded, &body_ctx)
            .map(Some)
    }
}

/// Test if the two expressions are equal constants.
fn constants_equal(left: &Constant, right: &Constant) -> bool {
    left.name == right.name
        && left.levels.len() == right.levels.len()
        && left
            .levels
            .iter()
            .zip(&right.levels)
            .all(|(left, right)| Level::is_equivalent(left, right))
}

fn same_head_constant(left: &Expression, right: &Expression) -> bool {
    match (left.head().value(), right.head().value()) {
        (ExpressionContents::Constant(left), ExpressionContents::Constant(right)) => {
            constants_equal(left, right)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        basic::Name,
        context::Context,
        environment::{Declaration, Environment},
        expr::Expression,
        result::InferenceError,
        typeck::{CheckerConfig, TypeChecker},
        universe::Level,
    };

    fn nat() -> Expression {
        Expression::constant("nat", Vec::new())
    }

    fn zero() -> Expression {
        Expression::constant("zero", Vec::new())
    }

    fn succ(e: Expression) -> Expression {
        Expression::apply(Expression::constant("succ", Vec::new()), e)
    }

    fn nat_to_nat() -> Expression {
        Expression::arrow(nat(), nat())
    }

    /// `nat`, `zero` and `succ` are axioms.
    /// `one := succ zero`, `two := succ one`, `twice := fun f x => f (f x)`,
    /// `add_two := twice succ` and `sealed := zero` (opaque).
    fn environment() -> Environment {
        Environment::new()
            .add(
                Name::new("nat"),
                Declaration::axiom(Vec::new(), Expression::sort_type()),
            )
            .unwrap()
            .add(Name::new("zero"), Declaration::axiom(Vec::new(), nat()))
            .unwrap()
            .add(Name::new("succ"), Declaration::axiom(Vec::new(), nat_to_nat()))
            .unwrap()
            .add(
                Name::new("one"),
                Declaration::definition(Vec::new(), nat(), succ(zero())),
            )
            .unwrap()
            .add(
                Name::new("two"),
                Declaration::definition(
                    Vec::new(),
                    nat(),
                    succ(Expression::constant("one", Vec::new())),
                ),
            )
            .unwrap()
            .add(
                Name::new("twice"),
                Declaration::definition(
                    Vec::new(),
                    Expression::arrow(nat_to_nat(), nat_to_nat()),
                    Expression::lambda(
                        nat_to_nat(),
                        Expression::lambda(
                            nat(),
                            Expression::apply(
                                Expression::variable(1),
                                Expression::apply(Expression::variable(1), Expression::variable(0)),
                            ),
                        ),
                    ),
                ),
            )
            .unwrap()
            .add(
                Name::new("add_two"),
                Declaration::definition(
                    Vec::new(),
                    nat_to_nat(),
                    Expression::apply(
                        Expression::constant("twice", Vec::new()),
                        Expression::constant("succ", Vec::new()),
                    ),
                ),
            )
            .unwrap()
            .add(
                Name::new("sealed"),
                Declaration::opaque(Vec::new(), nat(), zero()),
            )
            .unwrap()
    }

    fn convertible(env: &Environment, left: &Expression, right: &Expression) -> bool {
        let mut tc = TypeChecker::new(env);
        let forwards = tc.is_convertible(left, right, &Context::new()).unwrap();
        let backwards = tc.is_convertible(right, left, &Context::new()).unwrap();
        assert_eq!(forwards, backwards, "convertibility should be symmetric");
        forwards
    }

    #[test]
    fn reflexive() {
        let env = environment();
        for e in [nat(), zero(), succ(zero()), Expression::sort_prop()] {
            assert!(convertible(&env, &e, &e));
        }
    }

    #[test]
    fn beta() {
        let env = environment();
        let identity = Expression::lambda(nat(), Expression::variable(0));
        assert!(convertible(
            &env,
            &Expression::apply(identity, zero()),
            &zero()
        ));
    }

    #[test]
    fn delta() {
        let env = environment();
        let two = Expression::constant("two", Vec::new());
        assert!(convertible(&env, &two, &succ(succ(zero()))));
        assert!(convertible(
            &env,
            &two,
            &succ(Expression::constant("one", Vec::new()))
        ));
        assert!(!convertible(&env, &two, &succ(zero())));
    }

    #[test]
    fn delta_through_higher_order_definitions() {
        let env = environment();
        let e = Expression::apply(Expression::constant("add_two", Vec::new()), zero());
        assert!(convertible(&env, &e, &Expression::constant("two", Vec::new())));
    }

    #[test]
    fn opaque_constants_do_not_unfold() {
        let env = environment();
        let sealed = Expression::constant("sealed", Vec::new());
        assert!(convertible(&env, &sealed, &sealed));
        assert!(!convertible(&env, &sealed, &zero()));
    }

    #[test]
    fn distinct_axioms() {
        let env = environment();
        assert!(!convertible(&env, &zero(), &succ(zero())));
        assert!(!convertible(&env, &nat(), &zero()));
    }

    #[test]
    fn sorts_compare_levels() {
        let env = Environment::new();
        let u = Level::param("u");
        let v = Level::param("v");
        assert!(convertible(
            &env,
            &Expression::sort(Level::max(u.clone(), v.clone())),
            &Expression::sort(Level::max(v.clone(), u.clone()))
        ));
        assert!(convertible(
            &env,
            &Expression::sort(Level::max(Level::one(), Level::Zero)),
            &Expression::sort_type()
        ));
        assert!(!convertible(&env, &Expression::sort(u), &Expression::sort(v)));
    }

    #[test]
    fn binders() {
        let env = environment();
        let left = Expression::pi(
            nat(),
            Expression::apply(Expression::constant("succ", Vec::new()), Expression::variable(0)),
        );
        let right = Expression::pi(
            Expression::apply(
                Expression::lambda(Expression::sort_type(), Expression::variable(0)),
                nat(),
            ),
            succ(Expression::variable(0)),
        );
        assert!(convertible(&env, &left, &right));
        let other = Expression::pi(nat(), zero());
        assert!(!convertible(&env, &left, &other));
        // Lambdas and pis are never convertible with each other.
        let lambda = Expression::lambda(nat(), zero());
        assert!(!convertible(&env, &lambda, &other));
    }

    #[test]
    fn eta() {
        let env = environment();
        let succ_constant = Expression::constant("succ", Vec::new());
        let expanded = Expression::lambda(nat(), succ(Expression::variable(0)));
        assert!(convertible(&env, &expanded, &succ_constant));
        // Eta expansion combines with delta reduction.
        let add_two = Expression::constant("add_two", Vec::new());
        let expanded_add_two = Expression::lambda(nat(), succ(succ(Expression::variable(0))));
        assert!(convertible(&env, &expanded_add_two, &add_two));
    }

    #[test]
    fn eta_with_free_variables() {
        // f : nat -> nat |- (fun x => f x) == f
        let env = environment();
        let ctx = Context::new().push(Name::new("f"), nat_to_nat(), None);
        let expanded = Expression::lambda(
            nat(),
            Expression::apply(Expression::variable(1), Expression::variable(0)),
        );
        let mut tc = TypeChecker::new(&env);
        assert_eq!(
            tc.is_convertible(&expanded, &Expression::variable(0), &ctx),
            Ok(true)
        );
    }

    #[test]
    fn ill_typed_terms_are_not_errors() {
        let env = environment();
        let nonsense = Expression::apply(zero(), zero());
        assert!(!convertible(&env, &nonsense, &zero()));
        let lambda = Expression::lambda(nat(), Expression::variable(0));
        assert!(!convertible(&env, &lambda, &nonsense));
    }

    #[test]
    fn interrupted() {
        let env = environment();
        let mut tc = TypeChecker::new(&env);
        tc.interrupt_flag().raise();
        assert_eq!(
            tc.is_convertible(&zero(), &Expression::constant("two", Vec::new()), &Context::new()),
            Err(InferenceError::Interrupted)
        );
        tc.reset_interrupt();
        assert_eq!(
            tc.is_convertible(&zero(), &zero(), &Context::new()),
            Ok(true)
        );
    }

    #[test]
    fn interrupted_while_unfolding() {
        // `lp := lp` unfolds to itself forever.
        let lp = Expression::constant("lp", Vec::new());
        let env = Environment::new()
            .add(
                Name::new("lp"),
                Declaration::definition(Vec::new(), Expression::sort_prop(), lp.clone()),
            )
            .unwrap();
        let mut tc = TypeChecker::new(&env);
        let flag = tc.interrupt_flag();
        let raiser = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(50));
            flag.raise();
        });
        assert_eq!(
            tc.is_convertible(&lp, &Expression::sort_prop(), &Context::new()),
            Err(InferenceError::Interrupted)
        );
        raiser.join().unwrap();
        tc.reset_interrupt();
        assert_eq!(tc.is_convertible(&lp, &lp, &Context::new()), Ok(true));
    }

    #[test]
    fn clear_does_not_change_results() {
        let env = environment();
        let mut tc = TypeChecker::new(&env);
        let e = Expression::apply(Expression::constant("add_two", Vec::new()), zero());
        let two = Expression::constant("two", Vec::new());
        let ty = tc.infer_type(&e, &Context::new()).unwrap();
        assert!(tc.is_convertible(&e, &two, &Context::new()).unwrap());
        tc.clear();
        tc.clear();
        assert_eq!(tc.infer_type(&e, &Context::new()), Ok(ty));
        assert!(tc.is_convertible(&e, &two, &Context::new()).unwrap());
    }

    #[test]
    fn uncached_checker_agrees() {
        let env = environment();
        let mut tc = TypeChecker::with_config(
            &env,
            CheckerConfig {
                cache_inference: false,
                cache_whnf: false,
                ..Default::default()
            },
        );
        let e = Expression::apply(Expression::constant("add_two", Vec::new()), zero());
        assert_eq!(tc.infer_type(&e, &Context::new()), Ok(nat()));
        assert_eq!(
            tc.is_convertible(&e, &Expression::constant("two", Vec::new()), &Context::new()),
            Ok(true)
        );
        assert_eq!(tc.get_normalizer().cache_len(), 0);
    }
}
