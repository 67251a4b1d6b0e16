mod basic;
mod nary_operations;
mod traverse;

pub use basic::*;
pub use nary_operations::*;
pub use traverse::*;
