//! agent 自身指标
//!
//! 对 `metrics` facade 的薄封装，保证各 crate 使用相同的指标名与标签。
//! 未安装 recorder 时调用为空操作。

use metrics::{counter, gauge, histogram};

/// Watchdog fired for a collector invocation
pub fn record_collection_overrun(collector: &str) {
    counter!(
        "hostwatch_collection_overruns_total",
        "collector" => collector.to_string()
    )
    .increment(1);
}

/// Wall time of one collector invocation
pub fn record_collection_duration_ms(collector: &str, duration_ms: f64) {
    histogram!(
        "hostwatch_collection_duration_ms",
        "collector" => collector.to_string()
    )
    .record(duration_ms);
}

/// Cumulative emission count reported by a dispatcher
pub fn record_collector_emission(source: &str, count: u64) {
    gauge!(
        "hostwatch_collector_emissions",
        "collector" => source.to_string()
    )
    .set(count as f64);
}

/// A handler published one generation for `source`
pub fn record_generation_published(handler: &str, source: &str, samples: usize) {
    counter!(
        "hostwatch_generations_published_total",
        "handler" => handler.to_string(),
        "source" => source.to_string()
    )
    .increment(1);
    gauge!(
        "hostwatch_generation_samples",
        "handler" => handler.to_string(),
        "source" => source.to_string()
    )
    .set(samples as f64);
}

/// Records a handler discarded (`reason`: no_generation, invalid_name, no_output)
pub fn record_records_dropped(handler: &str, reason: &'static str, count: u64) {
    if count == 0 {
        return;
    }
    counter!(
        "hostwatch_records_dropped_total",
        "handler" => handler.to_string(),
        "reason" => reason
    )
    .increment(count);
}

/// One handler flush
pub fn record_handler_flush(handler: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "hostwatch_handler_flushes_total",
        "handler" => handler.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Summary of a `RunningStats`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计 (Welford 算法)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
