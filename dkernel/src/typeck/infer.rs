//! Infers types of terms.

use crate::{
    basic::Name,
    context::Context,
    expr::*,
    result::{InferenceError, Ir, UniverseError},
    universe::Level,
};

use super::TypeChecker;

impl<'env> TypeChecker<'env> {
    /// Infers the type of `e` by structural recursion.
    /// Types of closed expressions do not depend on the context, so they are memoised.
    /// A memoised type is only reused if recomputing it would fit under the depth limit.
    pub(super) fn infer_type_core(&mut self, e: &Expression, ctx: &Context) -> Ir<Expression> {
        self.descend(|tc| {
            let cacheable = tc.config.cache_inference && e.closed();
            if cacheable {
                if let Some((ty, height)) = tc.infer_cache.get(e).cloned() {
                    if tc.depth + height > tc.config.max_depth {
                        return Err(InferenceError::DeepRecursion {
                            depth: tc.config.max_depth,
                        });
                    }
                    tc.deepest = tc.deepest.max(tc.depth + height);
                    return Ok(ty);
                }
            }

            let outer_deepest = std::mem::replace(&mut tc.deepest, tc.depth);
            let ty = match e.value() {
                ExpressionContents::Variable(index) => {
                    ctx.lookup_type(*index)
                        .ok_or(InferenceError::UnboundVariable {
                            index: *index,
                            context_length: ctx.len(),
                        })
                }
                ExpressionContents::Sort(level) => {
                    Ok(Expression::sort(level.clone().succ()))
                }
                ExpressionContents::Constant(constant) => tc.infer_type_constant(constant),
                ExpressionContents::Apply(apply) => tc.infer_type_apply(e, apply, ctx),
                ExpressionContents::Lambda(binder) => tc.infer_type_lambda(binder, ctx),
                ExpressionContents::Pi(binder) => tc.infer_type_pi(binder, ctx),
                ExpressionContents::Let(let_expr) => tc.infer_type_let(let_expr, ctx),
            };
            let height = tc.deepest - tc.depth;
            tc.deepest = tc.deepest.max(outer_deepest);
            let ty = ty?;

            if cacheable {
                tc.infer_cache.insert(e.clone(), (ty.clone(), height));
            }
            Ok(ty)
        })
    }

    /// Infers the type of `e` and forces it to be a sort.
    pub(super) fn infer_universe_core(&mut self, e: &Expression, ctx: &Context) -> Ir<Level> {
        let ty = self.infer_type_core(e, ctx)?;
        match self.normalizer.as_sort(&ty, ctx)? {
            Some(level) => Ok(level),
            None => Err(InferenceError::NotASort {
                expression: e.clone(),
                ty,
                context: ctx.clone(),
            }),
        }
    }

    fn infer_type_constant(&mut self, constant: &Constant) -> Ir<Expression> {
        let decl = self
            .env
            .lookup(&constant.name)
            .ok_or_else(|| InferenceError::UnknownConstant(constant.name.clone()))?;
        if decl.universe_params.len() != constant.levels.len() {
            return Err(UniverseError::ArityMismatch {
                constant: constant.name.clone(),
                expected: decl.universe_params.len(),
                found: constant.levels.len(),
            }
            .into());
        }
        Ok(decl
            .ty
            .instantiate_universe_parameters(&decl.universe_params, &constant.levels))
    }

    fn infer_type_apply(&mut self, e: &Expression, apply: &Apply, ctx: &Context) -> Ir<Expression> {
        let function_type = self.infer_type_core(&apply.function, ctx)?;
        let pi = match self.normalizer.as_pi(&function_type, ctx)? {
            Some(pi) => pi,
            None => {
                return Err(InferenceError::FunctionExpected {
                    function: apply.function.clone(),
                    function_type,
                    context: ctx.clone(),
                })
            }
        };

        let argument_type = self.infer_type_core(&apply.argument, ctx)?;
        if !self.is_convertible_core(&argument_type, &pi.domain, ctx)? {
            tracing::trace!("argument type mismatch in {}", e.display());
            return Err(InferenceError::TypeMismatch {
                function: apply.function.clone(),
                argument: apply.argument.clone(),
                expected: pi.domain,
                found: argument_type,
                context: ctx.clone(),
            });
        }

        Ok(pi.body.instantiate(&apply.argument))
    }

    fn infer_type_lambda(&mut self, binder: &Binder, ctx: &Context) -> Ir<Expression> {
        self.infer_universe_core(&binder.domain, ctx)?;
        let body_ctx = ctx.push_anonymous(binder.domain.clone());
        let body_type = self.infer_type_core(&binder.body, &body_ctx)?;
        Ok(Expression::pi(binder.domain.clone(), body_type))
    }

    fn infer_type_pi(&mut self, binder: &Binder, ctx: &Context) -> Ir<Expression> {
        let domain_level = self.infer_universe_core(&binder.domain, ctx)?;
        let body_ctx = ctx.push_anonymous(binder.domain.clone());
        let body_level = self.infer_universe_core(&binder.body, &body_ctx)?;
        Ok(Expression::sort(pi_level(domain_level, body_level)))
    }

    fn infer_type_let(&mut self, let_expr: &Let, ctx: &Context) -> Ir<Expression> {
        let value_type = self.infer_type_core(&let_expr.value, ctx)?;
        let body_ctx = ctx.push(Name::anonymous(), value_type, Some(let_expr.value.clone()));
        let body_type = self.infer_type_core(&let_expr.body, &body_ctx)?;
        Ok(body_type.instantiate(&let_expr.value))
    }
}

/// The level of a function type whose domain lives in `domain` and whose codomain lives in `body`.
/// If the codomain could be a proposition, the function type is a proposition too.
fn pi_level(domain: Level, body: Level) -> Level {
    if body.clone().normalise().is_nonzero() {
        Level::max(domain, body)
    } else {
        Level::imax(domain, body)
    }
}
