//! Agent run statistics.

use std::time::Duration;

use dispatcher::DispatchSummary;
use handlers::MetricsSnapshot;
use runner::RunSummary;

/// Statistics from an agent run
#[derive(Debug, Clone, Default)]
pub struct AgentStats {
    /// Collectors that were started
    pub collectors: usize,

    /// Handlers that were started
    pub handlers: usize,

    /// Collector cycles of runners that ran to completion
    pub cycles: u64,

    /// Invocations that exceeded their deadline
    pub overruns: u64,

    /// Invocations that returned an error
    pub failures: u64,

    /// Merged dispatcher counters
    pub dispatch: DispatchSummary,

    /// Summed final handler counters
    pub handled: MetricsSnapshot,

    /// Total duration of the run
    pub duration: Duration,
}

impl AgentStats {
    pub fn absorb_run(&mut self, summary: &RunSummary) {
        self.cycles += summary.cycles;
        self.overruns += summary.overruns;
        self.failures += summary.failures;
    }

    pub fn absorb_dispatch(&mut self, summary: &DispatchSummary) {
        self.dispatch.received += summary.received;
        self.dispatch.forwarded += summary.forwarded;
        self.dispatch.blacklisted += summary.blacklisted;
        self.dispatch.rejected += summary.rejected;
    }

    pub fn absorb_handler(&mut self, counts: &MetricsSnapshot) {
        self.handled.received_count += counts.received_count;
        self.handled.emitted_count += counts.emitted_count;
        self.handled.dropped_count += counts.dropped_count;
        self.handled.failure_count += counts.failure_count;
    }

    /// Forwarded records per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.dispatch.forwarded as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Agent Statistics                        ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Collectors: {}", self.collectors);
        println!("   ├─ Handlers: {}", self.handlers);
        println!("   ├─ Cycles: {}", self.cycles);
        println!("   ├─ Overruns: {}", self.overruns);
        println!("   └─ Failures: {}", self.failures);

        println!("\n📈 Routing");
        println!("   ├─ Received: {}", self.dispatch.received);
        println!("   ├─ Forwarded: {}", self.dispatch.forwarded);
        println!("   ├─ Blacklisted: {}", self.dispatch.blacklisted);
        println!("   ├─ Rejected: {}", self.dispatch.rejected);
        println!("   └─ Records/s: {:.2}", self.throughput());

        println!("\n📤 Handlers");
        println!("   ├─ Received: {}", self.handled.received_count);
        println!("   ├─ Emitted: {}", self.handled.emitted_count);
        println!("   ├─ Dropped: {}", self.handled.dropped_count);
        println!("   └─ Failures: {}", self.handled.failure_count);

        println!();
    }
}
