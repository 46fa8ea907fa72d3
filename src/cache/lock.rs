use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

// A panic while holding a cache lock leaves the map usable; the worst case is
// an entry that is dropped or recomputed early.

pub(crate) fn read<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockReadGuard<'a, T> {
    lock.read().unwrap_or_else(|poisoned| {
        note_poisoned(op, "read");
        poisoned.into_inner()
    })
}

pub(crate) fn write<'a, T>(lock: &'a RwLock<T>, op: &'static str) -> RwLockWriteGuard<'a, T> {
    lock.write().unwrap_or_else(|poisoned| {
        note_poisoned(op, "write");
        poisoned.into_inner()
    })
}

fn note_poisoned(op: &'static str, mode: &'static str) {
    warn!(
        target: "canvass::cache",
        op,
        mode,
        result = "poisoned_recovered",
        "Recovered from poisoned cache lock"
    );
}
