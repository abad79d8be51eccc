//! Service layer for business logic.
//!
//! Services load and persist through `grr-core` and return plain data;
//! commands decide how to present it.

pub mod review;

pub use review::{MatchReport, Review, ReviewService, indexed};
