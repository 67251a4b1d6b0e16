//! The type checker and the normalizer it delegates reduction to.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{
    context::Context,
    environment::Environment,
    expr::Expression,
    interrupt::InterruptFlag,
    result::{InferenceError, Ir},
    universe::Level,
};

mod defeq;
mod definition;
mod infer;
mod unfold;
mod whnf;

pub use whnf::*;

/// Tuning parameters for a [`TypeChecker`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct CheckerConfig {
    /// The maximum nesting of inference and convertibility calls before
    /// [`InferenceError::DeepRecursion`] is reported.
    pub max_depth: usize,
    /// Whether to memoise the inferred types of closed expressions.
    pub cache_inference: bool,
    /// Whether to memoise the weak head normal forms of closed expressions.
    pub cache_whnf: bool,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            max_depth: 512,
            cache_inference: true,
            cache_whnf: true,
        }
    }
}

/// Infers types and decides definitional equality against one environment snapshot.
///
/// All operations take a local [`Context`] describing the free variables of the expressions involved.
/// The checker never mutates a caller's context.
///
/// Cached results are only valid for the environment the checker is bound to.
/// The checker borrows its environment, so checking against a new snapshot needs a new checker.
pub struct TypeChecker<'env> {
    env: &'env Environment,
    normalizer: Normalizer<'env>,
    /// Inferred types of closed expressions, with the recursion height their inference needed.
    infer_cache: HashMap<Expression, (Expression, usize)>,
    config: CheckerConfig,
    interrupt: InterruptFlag,
    /// The current nesting of inference and convertibility calls.
    depth: usize,
    /// The deepest nesting reached since the innermost inference call began.
    deepest: usize,
}

impl<'env> TypeChecker<'env> {
    pub fn new(env: &'env Environment) -> Self {
        Self::with_config(env, CheckerConfig::default())
    }

    pub fn with_config(env: &'env Environment, config: CheckerConfig) -> Self {
        let interrupt = InterruptFlag::new();
        Self {
            env,
            normalizer: Normalizer::new(env, interrupt.clone()).with_cache(config.cache_whnf),
            infer_cache: HashMap::new(),
            config,
            interrupt,
            depth: 0,
            deepest: 0,
        }
    }

    pub fn environment(&self) -> &'env Environment {
        self.env
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Computes the type of `e` in the given context.
    /// If we return [`Ok`], the expression is type correct.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn infer_type(&mut self, e: &Expression, ctx: &Context) -> Ir<Expression> {
        let result = self.infer_type_core(e, ctx);
        if let Err(err) = &result {
            tracing::debug!("inference failed: {err:?}");
        }
        result
    }

    /// Computes the universe level of the type `e`.
    /// Fails with [`InferenceError::NotASort`] if `e` is not a type.
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn infer_universe(&mut self, e: &Expression, ctx: &Context) -> Ir<Level> {
        self.infer_universe_core(e, ctx)
    }

    /// Checks that `e` is type correct, discarding its type.
    pub fn check(&mut self, e: &Expression, ctx: &Context) -> Ir<()> {
        self.infer_type(e, ctx).map(|_| ())
    }

    /// Returns true if the two expressions are definitionally equal.
    ///
    /// This never reports a type error: the only errors are [`InferenceError::Interrupted`]
    /// and [`InferenceError::DeepRecursion`].
    #[tracing::instrument(level = "trace", skip_all)]
    pub fn is_convertible(
        &mut self,
        left: &Expression,
        right: &Expression,
        ctx: &Context,
    ) -> Ir<bool> {
        self.is_convertible_core(left, right, ctx)
    }

    /// Drops every cached result, both in the checker and in its normalizer.
    pub fn clear(&mut self) {
        tracing::debug!(
            "clearing {} inferred types and {} normal forms",
            self.infer_cache.len(),
            self.normalizer.cache_len()
        );
        self.infer_cache.clear();
        self.normalizer.clear();
    }

    /// The number of memoised inferred types.
    pub fn cache_len(&self) -> usize {
        self.infer_cache.len()
    }

    /// Raises or lowers the interrupt flag.
    /// This takes effect at the next recursive step of any in-flight or future call.
    pub fn set_interrupt(&self, value: bool) {
        tracing::debug!("interrupt flag set to {value}");
        self.interrupt.set(value);
    }

    pub fn interrupt(&self) {
        self.set_interrupt(true);
    }

    pub fn reset_interrupt(&self) {
        self.set_interrupt(false);
    }

    /// A handle to the interrupt flag, which may be raised from another thread.
    pub fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }

    /// Replaces the interrupt flag of this checker and its normalizer,
    /// for instance to share one flag between several checkers.
    pub fn use_interrupt_flag(&mut self, interrupt: InterruptFlag) {
        self.normalizer.set_interrupt_flag(interrupt.clone());
        self.interrupt = interrupt;
    }

    pub fn get_normalizer(&self) -> &Normalizer<'env> {
        &self.normalizer
    }

    pub fn get_normalizer_mut(&mut self) -> &mut Normalizer<'env> {
        &mut self.normalizer
    }

    /// Runs one recursive step of inference or convertibility checking.
    /// Polls the interrupt flag and enforces the maximum recursion depth.
    fn descend<T>(&mut self, f: impl FnOnce(&mut Self) -> Ir<T>) -> Ir<T> {
        self.interrupt.check()?;
        if self.depth >= self.config.max_depth {
            return Err(InferenceError::DeepRecursion { depth: self.depth });
        }
        self.depth += 1;
        self.deepest = self.deepest.max(self.depth);
        let result = f(self);
        self.depth -= 1;
        result
    }
}

/// Infers the type of `e` using a fresh type checker.
/// No results are cached between calls.
pub fn infer_type(e: &Expression, env: &Environment, ctx: &Context) -> Ir<Expression> {
    TypeChecker::new(env).infer_type(e, ctx)
}

/// Infers the universe level of the type `e` using a fresh type checker.
/// No results are cached between calls.
pub fn infer_universe(e: &Expression, env: &Environment, ctx: &Context) -> Ir<Level> {
    TypeChecker::new(env).infer_universe(e, ctx)
}
