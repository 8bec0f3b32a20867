//! Type aliases for commonly used complex types.
//!
//! Complex types like `Arc<Mutex<Option<T>>>` are hard to read at a glance.
//! These aliases give the shared-state patterns used across the AVKit crates
//! consistent, meaningful names, and keep the underlying lock choice
//! (`parking_lot`) in one place.

use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// A thread-safe, mutex-protected wrapper for cross-thread sharing.
///
/// Use when mutable state is shared between async tasks, timer callbacks,
/// and I/O threads. Uses `parking_lot::Mutex` for better performance than
/// `std::sync::Mutex` and no lock poisoning.
pub type ThreadSafe<T> = Arc<Mutex<T>>;

/// A thread-safe optional wrapper for lazily-initialized cross-thread state.
pub type ThreadSafeOption<T> = Arc<Mutex<Option<T>>>;

/// A thread-safe vector for cross-thread collection management.
pub type ThreadSafeVec<T> = Arc<Mutex<Vec<T>>>;

/// A thread-safe reader-writer lock wrapper for read-heavy workloads.
///
/// Use when reads greatly outnumber writes, such as listener slots that are
/// read on every event but replaced rarely.
pub type ThreadSafeRw<T> = Arc<RwLock<T>>;

/// Create a new `ThreadSafe<T>` from a value.
#[inline]
pub fn thread_safe<T>(value: T) -> ThreadSafe<T> {
    Arc::new(Mutex::new(value))
}

/// Create a new `ThreadSafeOption<T>` initialized to `None`.
#[inline]
pub fn thread_safe_none<T>() -> ThreadSafeOption<T> {
    Arc::new(Mutex::new(None))
}

/// Create a new empty `ThreadSafeVec<T>`.
#[inline]
pub fn thread_safe_vec<T>() -> ThreadSafeVec<T> {
    Arc::new(Mutex::new(Vec::new()))
}

/// Create a new `ThreadSafeRw<T>` from a value.
#[inline]
pub fn thread_safe_rw<T>(value: T) -> ThreadSafeRw<T> {
    Arc::new(RwLock::new(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_safe_creation() {
        let value: ThreadSafe<i32> = thread_safe(42);
        assert_eq!(*value.lock(), 42);

        *value.lock() = 100;
        assert_eq!(*value.lock(), 100);
    }

    #[test]
    fn test_thread_safe_option() {
        let opt: ThreadSafeOption<String> = thread_safe_none();
        assert!(opt.lock().is_none());

        *opt.lock() = Some("hello".to_string());
        assert_eq!(opt.lock().as_deref(), Some("hello"));
    }

    #[test]
    fn test_thread_safe_vec() {
        let vec: ThreadSafeVec<String> = thread_safe_vec();
        vec.lock().push("item1".to_string());
        vec.lock().push("item2".to_string());

        assert_eq!(vec.lock().len(), 2);
    }

    #[test]
    fn test_thread_safe_rw() {
        let value: ThreadSafeRw<i32> = thread_safe_rw(42);

        assert_eq!(*value.read(), 42);
        *value.write() = 100;
        assert_eq!(*value.read(), 100);
    }
}
