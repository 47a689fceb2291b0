//! Capture run statistics.

use std::path::PathBuf;
use std::time::Duration;

use observability::CaptureSummary;

/// Statistics from a capture run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Tick and record counters
    pub summary: CaptureSummary,

    /// Total duration of the run
    pub duration: Duration,

    /// Where records were written
    pub output_dir: PathBuf,
}

impl RunStats {
    /// Records persisted per second
    pub fn records_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.summary.persisted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Capture Statistics                       ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Output: {}", self.output_dir.display());
        println!("   ├─ Clips: {}", self.summary.clips);
        println!(
            "   ├─ Ticks: {} ({} silent)",
            self.summary.total_ticks, self.summary.silent_ticks
        );
        println!("   ├─ Records persisted: {}", self.summary.persisted);
        println!("   └─ Records/s: {:.2}", self.records_per_sec());

        println!("\n📈 Tick Metrics");
        println!("   ├─ Callbacks: {}", self.summary.total_callbacks);
        println!("   ├─ Callbacks per tick: {}", self.summary.callbacks_per_tick);
        println!("   └─ Tick duration (ms): {}", self.summary.tick_duration_ms);

        if self.summary.pending_overwrites > 0 {
            println!(
                "\n⚠️  Center-view halves overwritten: {}",
                self.summary.pending_overwrites
            );
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_per_sec() {
        let mut stats = RunStats::default();
        assert_eq!(stats.records_per_sec(), 0.0);

        stats.summary.persisted = 50;
        stats.duration = Duration::from_secs(5);
        assert!((stats.records_per_sec() - 10.0).abs() < 1e-10);
    }
}
