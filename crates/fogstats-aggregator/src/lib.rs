//! Profile aggregation.
//!
//! Orchestrates per-dataset cache lookup, retried upstream fetch and schema
//! mapping, then fuses partial successes and failures into one
//! [`fogstats_core::PlayerProfile`] carrying per-dataset provenance.

pub mod service;

pub use service::{ProfileService, ProfileServiceConfig};
