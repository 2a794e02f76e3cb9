//! # Integration Tests
//!
//! Cross-crate end-to-end tests.
//!
//! Covers:
//! - configuration to routing table
//! - runner -> dispatcher -> handler flows with real tasks

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_config_to_routing() {
        let content = r#"
[agent]
interval = 15

[[collectors]]
name = "Diamond"
kind = "static"
interval = 30
canonical_sources = ["CPUCollector"]

[[collectors]]
name = "LoadAvg"
kind = "loadavg"

[[handlers]]
name = "prometheus"
kind = "prometheus"

[[handlers]]
name = "cpu"
kind = "log"
collectors = ["CPUCollector", "LoadAvg"]
"#;
        let bp = ConfigLoader::load_from_str(content, ConfigFormat::Toml).unwrap();

        assert_eq!(
            bp.handler_sources(&bp.handlers[0]),
            vec![
                ("Diamond".to_string(), 30),
                ("CPUCollector".to_string(), 30),
                ("LoadAvg".to_string(), 15),
            ]
        );
        assert_eq!(
            bp.handler_sources(&bp.handlers[1]),
            vec![("CPUCollector".to_string(), 30), ("LoadAvg".to_string(), 15)]
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        metric_channel, Collector, CollectorConfig, CollectorError, Message, MetricHandler,
        MetricReceiver, MetricRecord, MetricSender, CANONICAL_OVERRIDE_DIMENSION,
    };
    use dispatcher::{CollectorProfile, DispatchSummary, DispatcherBuilder};
    use handlers::{
        BufferedHandler, HandlerHandle, PrometheusHandler, SnapshotCache, TextfileConfig,
        TextfileEmitter,
    };
    use runner::{CollectorRunner, RunSummary, RunnerConfig};

    /// Collector replaying a fixed list of messages on every invocation
    struct ScriptedCollector {
        name: String,
        prefix: String,
        blacklist: Vec<String>,
        canonical_sources: Vec<String>,
        sender: MetricSender,
        script: Vec<Message>,
        delay: Duration,
    }

    impl ScriptedCollector {
        fn new(name: &str, script: Vec<Message>) -> (Self, MetricReceiver) {
            let (sender, rx) = metric_channel(64);
            let collector = Self {
                name: name.to_string(),
                prefix: String::new(),
                blacklist: vec![],
                canonical_sources: vec![],
                sender,
                script,
                delay: Duration::ZERO,
            };
            (collector, rx)
        }
    }

    impl Collector for ScriptedCollector {
        fn name(&self) -> &str {
            &self.name
        }

        fn interval(&self) -> u64 {
            1
        }

        fn prefix(&self) -> &str {
            &self.prefix
        }

        fn blacklist(&self) -> &[String] {
            &self.blacklist
        }

        fn canonical_sources(&self) -> &[String] {
            &self.canonical_sources
        }

        fn channel(&self) -> &MetricSender {
            &self.sender
        }

        fn collect(&self) -> Result<(), CollectorError> {
            std::thread::sleep(self.delay);
            for message in &self.script {
                self.sender.emit(message.clone())?;
            }
            Ok(())
        }
    }

    fn fast_schedule(cycles: u64) -> RunnerConfig {
        RunnerConfig {
            period: Some(Duration::from_millis(50)),
            stagger: Duration::from_millis(50),
            max_cycles: Some(cycles),
        }
    }

    fn static_collector(name: &str) -> (Arc<dyn Collector>, MetricReceiver) {
        let config = CollectorConfig {
            name: name.to_string(),
            kind: "static".to_string(),
            canonical_name: None,
            interval: None,
            prefix: String::new(),
            metrics_blacklist: vec![],
            canonical_sources: vec![],
            params: HashMap::from([
                ("metric_name".to_string(), "cpu.total".to_string()),
                ("value".to_string(), "42".to_string()),
            ]),
        };
        let (sender, rx) = metric_channel(64);
        let collector = runner::build_collector(&config, 1, sender).unwrap();
        (collector, rx)
    }

    /// Wire one collector to one handler, run `config` to completion,
    /// then shut everything down in order
    async fn run_flow<H: MetricHandler + Send + 'static>(
        collector: Arc<dyn Collector>,
        rx: MetricReceiver,
        handler: H,
        config: RunnerConfig,
    ) -> (RunSummary, DispatchSummary) {
        let profile = CollectorProfile::from_collector(collector.as_ref());
        let sources: Vec<(String, u64)> = profile
            .known_sources()
            .into_iter()
            .map(|source| (source, collector.interval()))
            .collect();

        let handle = HandlerHandle::spawn(handler, &sources, 16, Duration::from_secs(60));
        let dispatcher = DispatcherBuilder::new(profile, rx)
            .handler(handle.endpoints())
            .build()
            .unwrap()
            .spawn();
        let runner = CollectorRunner::with_config(collector, config).spawn();

        let run_summary = runner.await.unwrap();
        let dispatch_summary = dispatcher.await.unwrap();
        handle.shutdown().await;
        (run_summary, dispatch_summary)
    }

    /// Static collector -> runner -> dispatcher -> Prometheus cache
    #[tokio::test]
    async fn test_generation_published_to_cache() {
        let (collector, rx) = static_collector("Static");
        let cache = Arc::new(SnapshotCache::new("prometheus").without_timestamps());
        let handler = PrometheusHandler::with_cache(Arc::clone(&cache), "prometheus");

        let (run, dispatch) = run_flow(collector, rx, handler, fast_schedule(3)).await;

        assert_eq!(run.cycles, 3);
        assert_eq!(run.overruns, 0);
        assert_eq!(dispatch.forwarded, 3);
        // Each generation replaces the previous one
        assert_eq!(
            cache.render(),
            "# TYPE cpu_total gauge\ncpu_total{collector=\"Static\"} 42\n"
        );
        assert!(!cache.is_open("Static"));
    }

    #[tokio::test]
    async fn test_blacklist_and_prefix() {
        let (mut collector, rx) = ScriptedCollector::new(
            "Scripted",
            vec![
                Message::Data(MetricRecord::with_value("m1", 1.0)),
                Message::Data(MetricRecord::with_value("m22", 2.0)),
                Message::Data(MetricRecord::with_value("keep", 3.0)),
            ],
        );
        collector.blacklist = vec!["m[0-9]+$".to_string()];
        collector.prefix = "px.".to_string();

        let cache = Arc::new(SnapshotCache::new("prometheus").without_timestamps());
        let handler = PrometheusHandler::with_cache(Arc::clone(&cache), "prometheus");

        let (_, dispatch) = run_flow(Arc::new(collector), rx, handler, fast_schedule(1)).await;

        assert_eq!(dispatch.received, 3);
        assert_eq!(dispatch.blacklisted, 2);
        assert_eq!(dispatch.forwarded, 1);
        assert_eq!(
            cache.render(),
            "# TYPE px_keep gauge\npx_keep{collector=\"Scripted\"} 3\n"
        );
    }

    #[tokio::test]
    async fn test_override_routes_to_declared_source() {
        let (mut collector, rx) = ScriptedCollector::new(
            "Diamond",
            vec![
                Message::BeginGeneration("CPUCollector".to_string()),
                Message::Data(
                    MetricRecord::with_value("cpu.total", 5.0)
                        .dimension(CANONICAL_OVERRIDE_DIMENSION, "CPUCollector"),
                ),
                Message::EndGeneration("CPUCollector".to_string()),
                Message::Data(
                    MetricRecord::with_value("lost", 1.0)
                        .dimension(CANONICAL_OVERRIDE_DIMENSION, "Nope"),
                ),
            ],
        );
        collector.canonical_sources = vec!["CPUCollector".to_string()];

        let cache = Arc::new(SnapshotCache::new("prometheus").without_timestamps());
        let handler = PrometheusHandler::with_cache(Arc::clone(&cache), "prometheus");

        let (_, dispatch) = run_flow(Arc::new(collector), rx, handler, fast_schedule(1)).await;

        assert_eq!(dispatch.forwarded, 1);
        assert_eq!(dispatch.rejected, 1);
        assert_eq!(
            cache.published("CPUCollector").as_deref(),
            Some("cpu_total{collector=\"Diamond\"} 5\n")
        );
        // The physical collector's own generation was empty
        assert_eq!(cache.published("Diamond").as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_watchdog_overrun_lands_in_generation() {
        let (mut collector, rx) = ScriptedCollector::new(
            "Slow",
            vec![Message::Data(MetricRecord::with_value("slow", 1.0))],
        );
        collector.delay = Duration::from_millis(300);

        let cache = Arc::new(SnapshotCache::new("prometheus").without_timestamps());
        let handler = PrometheusHandler::with_cache(Arc::clone(&cache), "prometheus");

        let (run, _) = run_flow(Arc::new(collector), rx, handler, fast_schedule(1)).await;

        assert_eq!(run.overruns, 1);
        let payload = cache.render();
        assert!(payload.contains("# TYPE hostwatch_collection_time_exceeded counter\n"));
        assert!(payload
            .contains("hostwatch_collection_time_exceeded{collector=\"Slow\",interval=\"1\"} 1\n"));
        assert!(payload.contains("slow{collector=\"Slow\"} 1\n"));
    }

    #[tokio::test]
    async fn test_textfile_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hostwatch.prom");
        let config = TextfileConfig::from_params(&HashMap::from([(
            "filename".to_string(),
            path.display().to_string(),
        )]))
        .unwrap();
        let emitter = TextfileEmitter::new("textfile", config);
        // Buffer of one: every record is flushed on arrival
        let handler = BufferedHandler::new("textfile", emitter, 1);

        let (collector, rx) = static_collector("Static");
        let (run, _) = run_flow(collector, rx, handler, fast_schedule(2)).await;

        assert_eq!(run.cycles, 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "cpu_total{collector=\"Static\"} 42\n");
    }
}
