//! Hard-drop in-flight guard.

use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Slot {
    held: Option<u64>,
    next: u64,
}

/// Rejects a second hard drop while one is on the wire.
#[derive(Debug, Default)]
pub struct HardDropGuard {
    slot: Mutex<Slot>,
}

impl HardDropGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard. `None` if a hard drop is already in flight.
    pub fn try_begin(&self) -> Option<HardDropPermit<'_>> {
        let mut slot = self.slot.lock();
        if slot.held.is_some() {
            return None;
        }
        slot.next = slot.next.wrapping_add(1);
        let token = slot.next;
        slot.held = Some(token);
        Some(HardDropPermit { guard: self, token })
    }

    pub fn is_held(&self) -> bool {
        self.slot.lock().held.is_some()
    }

    /// Drop the guard regardless of who holds it.
    pub fn clear(&self) {
        self.slot.lock().held = None;
    }
}

/// Held for the duration of one hard-drop round trip.
///
/// Dropping it frees the guard unless the guard was cleared and taken again
/// in the meantime.
#[derive(Debug)]
pub struct HardDropPermit<'a> {
    guard: &'a HardDropGuard,
    token: u64,
}

impl Drop for HardDropPermit<'_> {
    fn drop(&mut self) {
        let mut slot = self.guard.slot.lock();
        if slot.held == Some(self.token) {
            slot.held = None;
        }
    }
}
