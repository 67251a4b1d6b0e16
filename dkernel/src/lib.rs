//! The trusted kernel of a dependently typed language.
//!
//! Given an [`environment::Environment`] of declarations and a [`context::Context`] of local
//! variables, the [`typeck::TypeChecker`] infers types of expressions and decides whether two
//! expressions are definitionally equal.

pub mod basic;
pub mod context;
pub mod environment;
pub mod expr;
pub mod interrupt;
pub mod result;
pub mod typeck;
pub mod universe;
