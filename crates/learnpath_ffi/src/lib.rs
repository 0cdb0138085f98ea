//! Flutter bridge surface for the learnpath core.

pub mod api;
