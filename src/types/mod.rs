//! # types
//!
//! `types` is the module containing the model structs of the crate and its error types

pub mod attributes;
pub mod bus;
pub mod database;
pub mod errors;
pub mod message;
pub mod node;
pub mod signal;
pub mod value;
