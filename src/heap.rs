//! Ownership accounting for heap objects.
//!
//! Every heap-allocated value (pairs, strings, closures, frames, ports and native
//! procedures) embeds an [`Allocation`]. Ownership itself is plain `Rc` counting:
//! storing a value anywhere clones the `Rc` (retain), overwriting or dropping it
//! releases it, and the last release frees the object and releases its children.
//!
//! Cycles never reach a count of zero and stay allocated for the life of the
//! thread. The only long-lived structure is the global environment, so this is
//! accepted rather than collected.

use std::cell::Cell;

thread_local! {
    static LIVE_OBJECTS: Cell<usize> = const { Cell::new(0) };
}

/// Token embedded in each heap object; counts the object as live until it is dropped.
#[derive(Debug)]
pub struct Allocation(());

impl Allocation {
    pub(crate) fn new() -> Self {
        LIVE_OBJECTS.with(|live| live.set(live.get() + 1));
        Self(())
    }
}

impl Drop for Allocation {
    fn drop(&mut self) {
        LIVE_OBJECTS.with(|live| live.set(live.get().saturating_sub(1)));
    }
}

/// Number of heap objects currently alive on this thread.
///
/// Values are `!Send`, so every interpreter (and every test) sees only its own objects.
pub fn live_objects() -> usize {
    LIVE_OBJECTS.with(Cell::get)
}
