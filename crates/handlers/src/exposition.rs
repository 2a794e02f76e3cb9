//! Prometheus text exposition serializer
//!
//! Line grammar: `name{k="v",...} value [timestamp_ms]`

use std::collections::BTreeMap;
use std::fmt::Write;
use std::sync::LazyLock;

use contracts::{MetricKind, MetricRecord};
use regex::Regex;
use tracing::{error, warn};

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

static VALID_NAME: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").ok());

static VALID_LABEL_KEY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").ok());

/// Exposition-safe metric name
///
/// Substitutes `.`, `-` and space with `_`, strips `$`, `/` and `'`, then
/// lower-cases the first character. Idempotent.
pub fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .filter_map(|c| match c {
            '.' | '-' | ' ' => Some('_'),
            '$' | '/' | '\'' => None,
            other => Some(other),
        })
        .collect();

    let mut chars = replaced.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => replaced,
    }
}

/// Whether `name` is a legal exposition metric name
pub fn is_valid_name(name: &str) -> bool {
    match VALID_NAME.as_ref() {
        Some(re) => re.is_match(name),
        None => false,
    }
}

/// Exposition-safe label key
///
/// Same substitutions as metric names, plus `:` becomes `_`. Case is kept.
pub fn sanitize_label_key(key: &str) -> String {
    key.chars()
        .filter_map(|c| match c {
            '.' | '-' | ' ' | ':' => Some('_'),
            '$' | '/' | '\'' => None,
            other => Some(other),
        })
        .collect()
}

pub fn is_valid_label_key(key: &str) -> bool {
    match VALID_LABEL_KEY.as_ref() {
        Some(re) => re.is_match(key),
        None => false,
    }
}

/// Fixed spellings for 0, 1, -1, NaN and the infinities; shortest
/// round-trip decimal otherwise
pub fn format_value(value: f64) -> String {
    if value == 1.0 {
        "1".to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value == -1.0 {
        "-1".to_string()
    } else if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "+Inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        // Debug is the shortest round-trip form and switches to exponent
        // notation for very large and very small magnitudes
        let shortest = format!("{value:?}");
        match shortest.strip_suffix(".0") {
            Some(integral) => integral.to_string(),
            None => shortest,
        }
    }
}

/// Escape backslash, double quote and newline in a label value
pub fn escape_label_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str(r"\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str(r"\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// `{k="v",...}`, or `{}` for an empty set
///
/// Keys are sanitized; a key that is still invalid drops its label.
pub fn render_labels(dimensions: &BTreeMap<String, String>) -> String {
    let mut labels: BTreeMap<String, &str> = BTreeMap::new();
    for (key, value) in dimensions {
        let clean = sanitize_label_key(key);
        if !is_valid_label_key(&clean) {
            warn!(label = %key, sanitized = %clean, "Invalid label key, label dropped");
            continue;
        }
        labels.insert(clean, value);
    }

    let mut out = String::from("{");
    for (i, (key, value)) in labels.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{key}=\"{}\"", escape_label_value(value));
    }
    out.push('}');
    out
}

/// One sample line including the trailing newline
pub fn render_sample(name: &str, record: &MetricRecord, timestamp_ms: Option<i64>) -> String {
    let mut line = format!(
        "{name}{} {}",
        render_labels(&record.dimensions),
        format_value(record.value)
    );
    if let Some(ts) = timestamp_ms {
        let _ = write!(line, " {ts}");
    }
    line.push('\n');
    line
}

/// `# TYPE <name> <counter|gauge>` including the trailing newline
pub fn render_type_line(name: &str, kind: MetricKind) -> String {
    format!("# TYPE {name} {}\n", kind.exposition_type())
}

/// Serialized body of one generation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedGeneration {
    pub body: String,
    /// Sanitized name and kind of every rendered sample, in record order
    pub types: Vec<(String, MetricKind)>,
    pub samples: usize,
    /// Records dropped for an invalid name
    pub invalid: usize,
}

/// Render a generation's records in order, dropping invalid names
pub fn render_generation(records: &[MetricRecord], timestamp_ms: Option<i64>) -> RenderedGeneration {
    let mut rendered = RenderedGeneration::default();
    for record in records {
        let name = sanitize_name(&record.name);
        if !is_valid_name(&name) {
            rendered.invalid += 1;
            error!(metric = %record.name, sanitized = %name, "Invalid metric name, sample dropped");
            continue;
        }
        rendered.body.push_str(&render_sample(&name, record, timestamp_ms));
        rendered.types.push((name, record.kind));
        rendered.samples += 1;
    }
    rendered
}

/// Milliseconds since the Unix epoch
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
