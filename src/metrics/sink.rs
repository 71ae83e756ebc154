//! Telemetry sinks for training metrics.
//!
//! The metrics hub forwards counter snapshots to a `TelemetrySink` on a
//! fixed interval. Sinks are deliberately fallible: a hiccup is reported
//! back to the hub, which logs and retries on the next interval; it never
//! reaches the training components.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::Instant;

use crate::core::counters::CountersSnapshot;

/// Consumer of periodic counter snapshots.
pub trait TelemetrySink: Send {
    /// Record one snapshot, keyed by its monotonic update step.
    fn record(&mut self, snapshot: &CountersSnapshot) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&mut self) -> io::Result<()>;
}

/// Console sink printing a fixed-width table.
pub struct ConsoleSink {
    /// Update steps between printed rows.
    log_interval: u64,
    last_log_step: u64,
    start_time: Instant,
    show_header: bool,
}

impl ConsoleSink {
    /// Create a console sink printing every `log_interval` update steps.
    pub fn new(log_interval: u64) -> Self {
        Self {
            log_interval: log_interval.max(1),
            last_log_step: 0,
            start_time: Instant::now(),
            show_header: true,
        }
    }

    fn print_header(&self) {
        println!(
            "{:>8} {:>10} {:>10} {:>10} {:>10} {:>8} {:>8} {:>8} {:>8}",
            "Update", "Episodes", "EnvSteps", "Policy", "Value", "RawQ", "BatchQ", "Buffer", "SPS"
        );
        println!("{}", "-".repeat(89));
    }
}

impl TelemetrySink for ConsoleSink {
    fn record(&mut self, snapshot: &CountersSnapshot) -> io::Result<()> {
        if snapshot.update_step < self.last_log_step + self.log_interval {
            return Ok(());
        }
        if self.show_header {
            self.print_header();
            self.show_header = false;
        }

        let elapsed = self.start_time.elapsed().as_secs_f64();
        let steps_per_sec = if elapsed > 0.0 {
            snapshot.global_step as f64 / elapsed
        } else {
            0.0
        };

        println!(
            "{:>8} {:>10} {:>10} {:>10.4} {:>10.4} {:>8} {:>8} {:>8} {:>8.0}",
            snapshot.update_step,
            snapshot.global_episode,
            snapshot.global_step,
            snapshot.losses.policy_loss,
            snapshot.losses.value_loss,
            snapshot.pipeline.raw_queue_depth,
            snapshot.pipeline.batch_queue_depth,
            snapshot.pipeline.buffer_len,
            steps_per_sec,
        );
        self.last_log_step = snapshot.update_step;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }
}

/// CSV file sink for offline analysis.
pub struct CsvSink {
    writer: BufWriter<File>,
    start_time: Instant,
}

impl CsvSink {
    /// Create a CSV sink writing to `path`.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "update_step,global_episode,global_step,policy_loss,value_loss,update_secs,\
             raw_queue,batch_queue,buffer_len,elapsed_secs"
        )?;
        Ok(Self {
            writer,
            start_time: Instant::now(),
        })
    }
}

impl TelemetrySink for CsvSink {
    fn record(&mut self, snapshot: &CountersSnapshot) -> io::Result<()> {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        writeln!(
            self.writer,
            "{},{},{},{:.6},{:.6},{:.6},{},{},{},{:.2}",
            snapshot.update_step,
            snapshot.global_episode,
            snapshot.global_step,
            snapshot.losses.policy_loss,
            snapshot.losses.value_loss,
            snapshot.losses.update_secs,
            snapshot.pipeline.raw_queue_depth,
            snapshot.pipeline.batch_queue_depth,
            snapshot.pipeline.buffer_len,
            elapsed,
        )
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

/// Fan-out sink writing to multiple backends.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn TelemetrySink>>,
}

impl MultiSink {
    /// Create an empty multi-sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn add<S: TelemetrySink + 'static>(mut self, sink: S) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl TelemetrySink for MultiSink {
    fn record(&mut self, snapshot: &CountersSnapshot) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.record(snapshot)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::counters::SharedCounters;
    use tempfile::tempdir;

    fn snapshot(update_step: u64) -> CountersSnapshot {
        let counters = SharedCounters::new(2);
        for _ in 0..update_step {
            counters.increment_update_step();
        }
        counters.record_losses(0.1, 0.2, 0.01);
        counters.set_pipeline_gauges(1, 2, 3);
        counters.snapshot()
    }

    #[test]
    fn test_console_sink_interval_gating() {
        let mut sink = ConsoleSink::new(10);
        sink.record(&snapshot(5)).unwrap();
        assert_eq!(sink.last_log_step, 0); // Below interval, skipped.
        sink.record(&snapshot(10)).unwrap();
        assert_eq!(sink.last_log_step, 10);
    }

    #[test]
    fn test_csv_sink_writes_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics.csv");
        {
            let mut sink = CsvSink::new(&path).unwrap();
            sink.record(&snapshot(1)).unwrap();
            sink.record(&snapshot(2)).unwrap();
            sink.flush().unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3); // Header + 2 rows.
        assert!(lines[0].starts_with("update_step,"));
        assert!(lines[1].starts_with("1,"));
    }

    #[test]
    fn test_multi_sink_fans_out() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("multi.csv");
        let mut multi = MultiSink::new()
            .add(ConsoleSink::new(1))
            .add(CsvSink::new(&path).unwrap());
        multi.record(&snapshot(1)).unwrap();
        multi.flush().unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
