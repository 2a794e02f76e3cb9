//! TextfileEmitter - node-exporter textfile output
//!
//! Every batch replaces the file: lines go to `<filename>.tmp`, which is
//! then renamed over `<filename>`. No type headers, no timestamps.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use contracts::{ContractError, MetricRecord};
use tracing::{debug, error, warn};

use crate::buffered::Emitter;
use crate::exposition::{is_valid_name, render_sample, sanitize_name};

/// Configuration for TextfileEmitter
#[derive(Debug, Clone)]
pub struct TextfileConfig {
    /// Output file
    pub filename: PathBuf,
}

impl TextfileConfig {
    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Option<Self> {
        params.get("filename").map(|f| Self {
            filename: PathBuf::from(f),
        })
    }
}

pub struct TextfileEmitter {
    config: TextfileConfig,
    /// False once the output proved unusable at configuration time
    writable: bool,
}

impl TextfileEmitter {
    /// Create the emitter, probing the output location
    ///
    /// An unusable location degrades the emitter to discarding batches.
    pub fn new(handler: &str, config: TextfileConfig) -> Self {
        let writable = match probe(&config.filename) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    handler,
                    filename = %config.filename.display(),
                    error = %e,
                    "Textfile output unusable, metrics will be discarded"
                );
                false
            }
        };
        Self { config, writable }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.config.filename.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn write_batch(&self, records: &[MetricRecord]) -> std::io::Result<usize> {
        let temp = self.temp_path();
        let mut writer = BufWriter::new(File::create(&temp)?);
        let mut written = 0;
        for record in records {
            let name = sanitize_name(&record.name);
            if !is_valid_name(&name) {
                error!(metric = %record.name, "Invalid metric name, line dropped");
                continue;
            }
            writer.write_all(render_sample(&name, record, None).as_bytes())?;
            written += 1;
        }
        writer.flush()?;
        drop(writer);
        fs::rename(&temp, &self.config.filename)?;
        Ok(written)
    }
}

/// Ensure the parent directory exists and a file can be created next to the target
fn probe(filename: &Path) -> std::io::Result<()> {
    if let Some(parent) = filename.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut name = filename.as_os_str().to_owned();
    name.push(".tmp");
    let temp = PathBuf::from(name);
    File::create(&temp)?;
    fs::remove_file(&temp)
}

impl Emitter for TextfileEmitter {
    fn kind(&self) -> &'static str {
        "textfile"
    }

    fn emit(&mut self, handler: &str, records: &[MetricRecord]) -> Result<(), ContractError> {
        if !self.writable {
            observability::record_records_dropped(handler, "no_output", records.len() as u64);
            debug!(handler, records = records.len(), "Textfile output disabled, batch discarded");
            return Ok(());
        }

        let written = self.write_batch(records).map_err(|e| {
            error!(handler, filename = %self.config.filename.display(), error = %e, "Write failed");
            ContractError::handler_write(handler, e.to_string())
        })?;

        let invalid = records.len() - written;
        observability::record_records_dropped(handler, "invalid_name", invalid as u64);
        debug!(handler, written, invalid, "Textfile written");
        Ok(())
    }
}
