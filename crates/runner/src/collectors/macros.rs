//! Collector boilerplate macro
//!
//! Every built-in collector keeps its common settings in a
//! `settings: CollectorSettings` field; this macro wires those settings
//! into the `Collector` trait and delegates `collect()` to the type's own
//! `collect_once()`.

/// Implement `Collector` for a built-in collector
///
/// # Usage
/// ```ignore
/// impl_collector!(LoadAvgCollector, CollectorType::Poller);
/// ```
macro_rules! impl_collector {
    ($collector:ident, $collector_type:expr) => {
        impl contracts::Collector for $collector {
            fn name(&self) -> &str {
                &self.settings.name
            }

            fn canonical_name(&self) -> &str {
                &self.settings.canonical_name
            }

            fn interval(&self) -> u64 {
                self.settings.interval
            }

            fn prefix(&self) -> &str {
                &self.settings.prefix
            }

            fn blacklist(&self) -> &[String] {
                &self.settings.blacklist
            }

            fn canonical_sources(&self) -> &[String] {
                &self.settings.canonical_sources
            }

            fn channel(&self) -> &contracts::MetricSender {
                &self.settings.channel
            }

            fn collect(&self) -> Result<(), contracts::CollectorError> {
                self.collect_once()
            }

            fn collector_type(&self) -> contracts::CollectorType {
                $collector_type
            }
        }
    };
}

pub(crate) use impl_collector;
