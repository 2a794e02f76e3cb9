//! Load average collector (`/proc/loadavg` format)
//!
//! Line format: `0.52 0.58 0.59 2/1234 5678`

use std::path::PathBuf;

use contracts::{CollectorError, CollectorType, MetricRecord};
use tracing::warn;

use super::macros::impl_collector;
use super::CollectorSettings;

pub const DEFAULT_LOADAVG_PATH: &str = "/proc/loadavg";

pub struct LoadAvgCollector {
    settings: CollectorSettings,
    path: PathBuf,
}

impl LoadAvgCollector {
    pub fn new(settings: CollectorSettings, path: impl Into<PathBuf>) -> Self {
        Self {
            settings,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn collect_once(&self) -> Result<(), CollectorError> {
        let records = match std::fs::read_to_string(&self.path)
            .map_err(CollectorError::from)
            .and_then(|content| parse_loadavg(&content))
        {
            Ok(records) => records,
            Err(e) => {
                warn!(
                    collector = %self.settings.name,
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read load average"
                );
                return Err(e);
            }
        };

        for record in records {
            self.settings.channel.emit(record)?;
        }
        Ok(())
    }
}

impl_collector!(LoadAvgCollector, CollectorType::Poller);

/// Parse one loadavg line into gauges
pub fn parse_loadavg(content: &str) -> Result<Vec<MetricRecord>, CollectorError> {
    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() < 4 {
        return Err(CollectorError::Parse(format!(
            "expected at least 4 fields, got {}",
            fields.len()
        )));
    }

    let float = |raw: &str| {
        raw.parse::<f64>()
            .map_err(|e| CollectorError::Parse(format!("invalid number '{raw}': {e}")))
    };

    let (running, total) = fields[3]
        .split_once('/')
        .ok_or_else(|| CollectorError::Parse(format!("invalid process field '{}'", fields[3])))?;

    Ok(vec![
        MetricRecord::with_value("loadavg.1", float(fields[0])?),
        MetricRecord::with_value("loadavg.5", float(fields[1])?),
        MetricRecord::with_value("loadavg.15", float(fields[2])?),
        MetricRecord::with_value("processes.running", float(running)?),
        MetricRecord::with_value("processes.total", float(total)?),
    ])
}
