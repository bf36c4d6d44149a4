use std::time::Duration;

use crate::fault::RestartReason;

/// Device services the polling loop needs besides the network.
pub trait Board {
    /// Time since boot. Never jumps when the wall clock is set.
    fn monotonic(&self) -> Duration;

    fn sleep(&mut self, duration: Duration);

    /// Set the wall clock to `epoch` seconds, already shifted to local time.
    fn set_local_time(&mut self, epoch: i64) -> anyhow::Result<()>;

    /// Current wall clock in local epoch seconds. Only meaningful after a
    /// successful `set_local_time`.
    fn local_time(&self) -> i64;

    /// Hint that now is a good moment to return memory to the allocator.
    fn reclaim_memory(&mut self) {}

    /// Restart the whole device. Does not return.
    fn restart(&mut self, reason: RestartReason) -> !;
}
