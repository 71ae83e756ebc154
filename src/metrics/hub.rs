//! Metrics hub: periodic counters → telemetry forwarding.
//!
//! Purely observational. Reads a consistent snapshot of the shared
//! counters on a fixed short interval and hands it to the configured
//! sink. A sink failure is logged and retried on the next interval; it
//! never reaches the training components.

use std::thread::JoinHandle;
use std::time::Duration;

use crate::core::counters::SharedCountersHandle;

use super::sink::TelemetrySink;

/// Handle for a spawned metrics thread.
pub struct MetricsHandle {
    thread: JoinHandle<()>,
}

impl MetricsHandle {
    /// Wait for the metrics thread to finish.
    pub fn join(self) -> std::thread::Result<()> {
        self.thread.join()
    }
}

/// Background reporter forwarding counter snapshots to a sink.
pub struct MetricsHub {
    interval: Duration,
    sink: Box<dyn TelemetrySink>,
}

impl MetricsHub {
    /// Create a hub reporting every `interval`.
    pub fn new(interval: Duration, sink: Box<dyn TelemetrySink>) -> Self {
        Self { interval, sink }
    }

    /// Run until the training flag clears.
    pub fn run(mut self, counters: SharedCountersHandle) {
        while counters.training_active() {
            std::thread::sleep(self.interval);
            let snapshot = counters.snapshot();
            if let Err(e) = self.sink.record(&snapshot) {
                eprintln!("telemetry sink error: {} (retrying next interval)", e);
            }
        }

        // Final state, so the end of the run is visible in the sink.
        let snapshot = counters.snapshot();
        if let Err(e) = self.sink.record(&snapshot) {
            eprintln!("telemetry sink error on final snapshot: {}", e);
        }
        if let Err(e) = self.sink.flush() {
            eprintln!("telemetry sink flush failed: {}", e);
        }
    }

    /// Spawn the hub on a named thread.
    pub fn spawn(self, counters: SharedCountersHandle) -> MetricsHandle {
        let thread = std::thread::Builder::new()
            .name("Metrics".to_string())
            .spawn(move || self.run(counters))
            .expect("failed to spawn metrics thread");
        MetricsHandle { thread }
    }
}
