//! Command implementations.

pub mod assemble;
pub mod build;
pub mod check;
