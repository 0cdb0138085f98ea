//! Content domain model.
//!
//! # Responsibility
//! - Define the typed content tree loaded from the structure listing.
//! - Define leaf identity (`LeafKey`) and its derived storage/URL keys.
//!
//! # Invariants
//! - A section is either a leaf with a body file or fans out into subsections.
//! - Leaf files are unique across one tree.

pub mod structure;
