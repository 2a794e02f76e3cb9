//! # Observability
//!
//! 可观测性模块：Tracing + agent 自身指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式)
//! - agent 自身指标的 Prometheus recorder
//! - collector / dispatcher / handler 的指标记录函数
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{init_with_config, ObservabilityConfig};
//!
//! let handle = init_with_config(ObservabilityConfig::default())?;
//! observability::record_collection_overrun("LoadAvg");
//! if let Some(handle) = handle {
//!     println!("{}", handle.render());
//! }
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use crate::metrics::{
    record_collection_duration_ms, record_collection_overrun, record_collector_emission,
    record_generation_published, record_handler_flush, record_records_dropped, RunningStats,
    StatsSummary,
};
pub use metrics_exporter_prometheus::PrometheusHandle;

/// Observability configuration
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log format
    pub log_format: LogFormat,
    /// Install the global Prometheus recorder for self-metrics
    pub install_recorder: bool,
    /// Default log level when RUST_LOG is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            install_recorder: true,
            default_log_level: "info".to_string(),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON structured logs
    #[default]
    Json,
    /// Human readable
    Pretty,
    /// Compact single line
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// 按配置初始化可观测性
///
/// - Tracing: 支持 RUST_LOG 环境变量，未设置时使用 `default_log_level`
/// - Prometheus: `install_recorder` 为 true 时返回 handle，由 HTTP 层在
///   `/internal/metrics` 渲染
pub fn init_with_config(config: ObservabilityConfig) -> Result<Option<PrometheusHandle>> {
    // 1. 初始化 Tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    match config.log_format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_target(true)
                .with_thread_ids(true)
                .with_thread_names(true)
                .with_file(true)
                .with_line_number(true);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer().pretty();

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer().compact();

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
                .context("Failed to initialize tracing subscriber")?;
        }
    }

    // 2. 安装 Prometheus recorder（如启用）
    let handle = if config.install_recorder {
        Some(init_metrics_only()?)
    } else {
        None
    };

    tracing::info!(
        log_format = ?config.log_format,
        recorder = config.install_recorder,
        "Observability initialized"
    );

    Ok(handle)
}

/// 仅安装 Prometheus recorder（不初始化 tracing）
///
/// 适用于 tracing 已在别处初始化的场景。
pub fn init_metrics_only() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}
