//! evalreport-core — Test cases, evaluation engine, and summary persistence.
//!
//! This crate defines the value and test-case model, the lifecycle-driven
//! engine that accumulates criteria results, and the JSON summary that the
//! report crate renders.

pub mod case;
pub mod engine;
pub mod error;
pub mod layout;
pub mod summary;
pub mod traits;
pub mod value;
