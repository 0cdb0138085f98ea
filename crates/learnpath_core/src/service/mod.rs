//! Use-case services over the core modules.
//!
//! # Responsibility
//! - Wire configuration, structure, stores and the offline worker together.
//! - Keep CLI and FFI shells free of storage and caching details.

pub mod portal;
