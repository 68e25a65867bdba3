//! # Pushup-Core
//!
//! Core types, error handling and planar geometry shared by the push-up
//! repetition engine.

pub mod error;
pub mod geometry;
pub mod types;

pub use error::{Error, Result};
pub use geometry::*;
pub use types::*;
