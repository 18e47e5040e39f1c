//! Utility functions

mod common;

pub use common::*;
