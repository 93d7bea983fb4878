//! Background keep-alive for session resources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::service::{DataService, ResourceId};

/// Sleep slice between stop-flag checks, so dropping a handle does not
/// block for a whole keep-alive interval.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Owns the keep-alive thread for one session resource. Dropping the
/// handle stops the thread and joins it.
pub struct KeepAliveHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl KeepAliveHandle {
    /// Spawn a thread that pings `resource` every `interval`.
    /// Failures are logged and the cadence continues unchanged.
    pub fn spawn(service: Arc<dyn DataService>, resource: ResourceId, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let thread = std::thread::spawn(move || run(service, resource, interval, flag));
        Self { stop, thread: Some(thread) }
    }
}

impl Drop for KeepAliveHandle {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run(service: Arc<dyn DataService>, resource: ResourceId, interval: Duration, stop: Arc<AtomicBool>) {
    let slice = POLL_SLICE.min(interval).max(Duration::from_millis(1));
    let mut waited = Duration::ZERO;
    while !stop.load(Ordering::Relaxed) {
        std::thread::sleep(slice);
        waited += slice;
        if waited < interval {
            continue;
        }
        waited = Duration::ZERO;
        match service.keep_alive(&resource) {
            Ok(()) => tracing::debug!(resource = %resource, "keep-alive sent"),
            Err(err) => tracing::warn!(resource = %resource, error = %err, "keep-alive failed"),
        }
    }
}
