//! # AVKit Core
//!
//! Core types, errors, and utilities for AVKit.
//! Provides the error taxonomy and shared-state type aliases used by the
//! device-communication crates.

pub mod error;
pub mod types;

pub use error::{ConnectionError, Error, Result, TransportError};

pub use types::{
    thread_safe, thread_safe_none, thread_safe_rw, thread_safe_vec, ThreadSafe, ThreadSafeOption,
    ThreadSafeRw, ThreadSafeVec,
};
