//! Collaborator interfaces injected at construction.

/// Whole-client recovery, fired by the global safety deadline and the
/// emergency key. Must not call back into the animation lock.
pub trait EmergencyReset: Send + Sync {
    fn full_reset(&self);
}

/// The periodic driver, as seen by the coordinator.
pub trait LoopControl: Send + Sync {
    fn stop(&self);

    fn set_speed(&self, level: u32);
}
