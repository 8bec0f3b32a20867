//! Shared type aliases and helpers.

pub mod aliases;

pub use aliases::*;
