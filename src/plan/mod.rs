//! Logical planning and optimization.

pub mod logical;
pub mod optimize;
