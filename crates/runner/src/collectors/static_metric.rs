//! Static collector: emits one configured metric every cycle

use std::collections::BTreeMap;

use contracts::{CollectorError, CollectorType, ContractError, MetricKind, MetricRecord};

use super::macros::impl_collector;
use super::CollectorSettings;

/// Parameter prefix for extra dimensions (`dim.<key> = <value>`)
const DIMENSION_PARAM_PREFIX: &str = "dim.";

pub struct StaticCollector {
    settings: CollectorSettings,
    metric_name: String,
    value: f64,
    kind: MetricKind,
    dimensions: BTreeMap<String, String>,
}

impl StaticCollector {
    /// Build from the `params` table of a collector config
    ///
    /// `metric_name` defaults to `<name>.value`, `value` to 1, `kind` to gauge.
    pub fn from_params(
        settings: CollectorSettings,
        params: &std::collections::HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let metric_name = params
            .get("metric_name")
            .cloned()
            .unwrap_or_else(|| format!("{}.value", settings.name));

        let value = match params.get("value") {
            Some(raw) => raw.parse::<f64>().map_err(|e| {
                ContractError::collector_setup(&settings.name, format!("invalid value '{raw}': {e}"))
            })?,
            None => 1.0,
        };

        let kind = match params.get("kind") {
            Some(raw) => raw
                .parse::<MetricKind>()
                .map_err(|e| ContractError::collector_setup(&settings.name, e))?,
            None => MetricKind::Gauge,
        };

        let dimensions = params
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(DIMENSION_PARAM_PREFIX)
                    .map(|key| (key.to_string(), v.clone()))
            })
            .collect();

        Ok(Self {
            settings,
            metric_name,
            value,
            kind,
            dimensions,
        })
    }

    fn collect_once(&self) -> Result<(), CollectorError> {
        let mut record = MetricRecord::with_value(&self.metric_name, self.value).kind(self.kind);
        record.add_dimensions(self.dimensions.clone());
        self.settings.channel.emit(record)?;
        Ok(())
    }
}

impl_collector!(StaticCollector, CollectorType::Poller);
