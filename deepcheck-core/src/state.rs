//! Shared mutable state between concurrent tasks.

use parking_lot::Mutex;
use std::sync::Arc;

/// Lock, mutate, drop. Never hold the guard across an `.await`.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Move the value out once every writer is done, leaving the default behind.
pub fn take_state<T: Default>(state: &Shared<T>) -> T {
    std::mem::take(&mut *state.lock())
}
