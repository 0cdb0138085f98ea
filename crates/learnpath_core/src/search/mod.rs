//! Content search entry points.
//!
//! # Responsibility
//! - Scan markdown documents per query and shape lightweight hits.
//! - Keep excerpt and title rules in one place.

pub mod scan;
