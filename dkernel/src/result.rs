//! Errors emitted by the kernel.
//!
//! The kernel never renders errors as text.
//! Each error carries the expressions and context needed for a formatter to explain it.

use crate::{
    basic::{DeBruijnIndex, Name},
    context::Context,
    expr::Expression,
};

/// An error emitted by the kernel when performing type inference or definitional equality checking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    /// A variable referred past the end of the local context.
    UnboundVariable {
        index: DeBruijnIndex,
        context_length: usize,
    },
    /// A constant was not declared in the environment.
    UnknownConstant(Name),
    /// The function in an application did not have a function type.
    FunctionExpected {
        function: Expression,
        function_type: Expression,
        context: Context,
    },
    /// The type of an argument did not match the domain of the function it was applied to.
    TypeMismatch {
        function: Expression,
        argument: Expression,
        expected: Expression,
        found: Expression,
        context: Context,
    },
    /// An expression was used as a type, but its type was not a sort.
    NotASort {
        expression: Expression,
        ty: Expression,
        context: Context,
    },
    UniverseError(UniverseError),
    /// The body of a declaration did not have the declared type.
    DeclarationTypeMismatch {
        expected: Expression,
        found: Expression,
    },
    /// The checker exceeded its configured recursion depth.
    DeepRecursion { depth: usize },
    /// The interrupt flag was raised during the computation.
    Interrupted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UniverseError {
    /// A constant was given the wrong number of universe levels.
    ArityMismatch {
        constant: Name,
        expected: usize,
        found: usize,
    },
    /// A declaration mentioned a universe parameter it did not declare.
    UndeclaredParameter { parameter: Name },
    /// A declaration listed the same universe parameter twice.
    DuplicateParameter { parameter: Name },
}

impl From<UniverseError> for InferenceError {
    fn from(value: UniverseError) -> Self {
        InferenceError::UniverseError(value)
    }
}

impl InferenceError {
    pub fn is_interrupted(&self) -> bool {
        matches!(self, InferenceError::Interrupted)
    }

    /// Errors that abort the whole computation, rather than describing an ill-typed input.
    /// These are never swallowed when the checker is trying out a conversion rule.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InferenceError::Interrupted | InferenceError::DeepRecursion { .. }
        )
    }
}

/// Short for "inference result".
///
/// Instead of emitting textual errors, the kernel emits *inference results* which either succeed
/// or error with a particular [`InferenceError`].
pub type Ir<T> = Result<T, InferenceError>;
