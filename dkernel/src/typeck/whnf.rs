//! Converts expressions to weak head normal form.
//!
//! Conversion rules: <https://coq.inria.fr/refman/language/core/conversion.html>

use std::collections::HashMap;

use crate::{
    context::Context,
    environment::Environment,
    expr::{Binder, Expression, ExpressionContents},
    interrupt::InterruptFlag,
    result::Ir,
    universe::Level,
};

/// Reduces expressions towards weak head normal form on behalf of a type checker.
///
/// The normalizer shares its interrupt flag with the checker that owns it.
/// Weak head normal forms of closed expressions are memoised, since they do not depend on the context.
pub struct Normalizer<'env> {
    env: &'env Environment,
    interrupt: InterruptFlag,
    cache: HashMap<Expression, Expression>,
    use_cache: bool,
}

impl<'env> Normalizer<'env> {
    pub fn new(env: &'env Environment, interrupt: InterruptFlag) -> Self {
        Self {
            env,
            interrupt,
            cache: HashMap::new(),
            use_cache: true,
        }
    }

    pub(crate) fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn environment(&self) -> &'env Environment {
        self.env
    }

    pub fn interrupt_flag(&self) -> &InterruptFlag {
        &self.interrupt
    }

    pub(crate) fn set_interrupt_flag(&mut self, interrupt: InterruptFlag) {
        self.interrupt = interrupt;
    }

    /// The number of memoised weak head normal forms.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Reduces an expression to weak head normal form.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn whnf(&mut self, e: &Expression, ctx: &Context) -> Ir<Expression> {
        let cacheable = self.use_cache && e.closed();
        if cacheable {
            if let Some(result) = self.cache.get(e) {
                return Ok(result.clone());
            }
        }

        let mut t = e.clone();
        loop {
            t = self.whnf_core(&t, ctx)?;
            match self.unfold_definition(&t) {
                Some(unfolded) => t = unfolded,
                None => break,
            }
        }

        if cacheable {
            self.cache.insert(e.clone(), t.clone());
        }
        Ok(t)
    }

    /// Reduces an expression to weak head normal form without unfolding definitions.
    ///
    /// This performs beta reduction, zeta reduction of `let` expressions, and replaces
    /// variables bound to values in the context with those values.
    /// The head of the application spine is reduced in a loop, so deep redexes do not consume stack.
    pub fn whnf_core(&mut self, e: &Expression, ctx: &Context) -> Ir<Expression> {
        let mut head = e.clone();
        // Arguments applied to `head`, with the first argument at the end of the vector.
        let mut args = Vec::new();
        let mut reduced = false;

        loop {
            self.interrupt.check()?;
            match head.value() {
                ExpressionContents::Apply(apply) => {
                    args.push(apply.argument.clone());
                    head = apply.function.clone();
                }
                ExpressionContents::Lambda(binder) => match args.pop() {
                    Some(argument) => {
                        // This is called beta reduction.
                        head = binder.body.instantiate(&argument);
                        reduced = true;
                    }
                    None => break,
                },
                ExpressionContents::Let(let_expr) => {
                    // We substitute the value into the body of the let expression.
                    // This is called zeta reduction.
                    head = let_expr.body.instantiate(&let_expr.value);
                    reduced = true;
                }
                ExpressionContents::Variable(index) => match ctx.lookup_value(*index) {
                    Some(value) => {
                        tracing::trace!("unfolding let-bound variable {index}");
                        head = value;
                        reduced = true;
                    }
                    None => break,
                },
                ExpressionContents::Sort(_)
                | ExpressionContents::Constant(_)
                | ExpressionContents::Pi(_) => break,
            }
        }

        if reduced {
            Ok(head.create_nary_application(args.iter().rev()))
        } else {
            Ok(e.clone())
        }
    }

    /// Expands the given expression until it is a sort.
    /// If the expression could not be reduced to a sort, returns [`None`].
    pub fn as_sort(&mut self, e: &Expression, ctx: &Context) -> Ir<Option<Level>> {
        if let ExpressionContents::Sort(level) = e.value() {
            return Ok(Some(level.clone()));
        }
        match self.whnf(e, ctx)?.value() {
            ExpressionContents::Sort(level) => Ok(Some(level.clone())),
            _ => Ok(None),
        }
    }

    /// Expands the given expression until it is a function type.
    /// If the expression could not be reduced to a function type, returns [`None`].
    pub fn as_pi(&mut self, e: &Expression, ctx: &Context) -> Ir<Option<Binder>> {
        if let ExpressionContents::Pi(pi) = e.value() {
            return Ok(Some(pi.clone()));
        }
        match self.whnf(e, ctx)?.value() {
            ExpressionContents::Pi(pi) => Ok(Some(pi.clone())),
            _ => Ok(None),
        }
    }
}
