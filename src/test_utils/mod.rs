//! Helpers shared by unit tests across modules
mod common;

pub use common::*;
