use crate::core::config::QcConfig;
use crate::core::io::{detect_format, InputFormat};
use crate::core::model::ReportModel;
use crate::core::reader::RecordReader;
use crate::core::stats::FastqStats;
use crate::core::summary::summarize;
use crate::error::Result;
use std::path::PathBuf;
use tracing::{debug, info};

const READS_PER_PROGRESS_LINE: u64 = 1_000_000;

pub struct RunConfig {
    pub input: PathBuf,
    pub format: Option<InputFormat>,
    pub config: QcConfig,
}

#[derive(Debug)]
pub struct RunOutput {
    pub model: ReportModel,
    pub file_name: String,
}

/// Scans the input once, then summarizes. The whole pipeline runs on the
/// calling thread; record order fully determines every counter update.
pub fn run(cfg: &RunConfig) -> Result<RunOutput> {
    let format = cfg.format.unwrap_or_else(|| detect_format(&cfg.input));
    debug!(input = %cfg.input.display(), ?format, "starting scan");

    let mut stats = FastqStats::new(&cfg.config)?;
    let tile_enabled = stats.tile_enabled();
    let mut reader = RecordReader::open(&cfg.input, format, tile_enabled)?;

    let mut next_progress = READS_PER_PROGRESS_LINE;
    while reader.next_record(&mut stats)? {
        if stats.num_reads == next_progress {
            info!(reads = stats.num_reads, "processed");
            next_progress += READS_PER_PROGRESS_LINE;
        }
    }
    info!(
        reads = stats.num_reads,
        max_read_length = stats.max_read_length,
        "scan finished"
    );

    let model = summarize(&stats, &cfg.config);

    let file_name = cfg
        .input
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("input")
        .to_string();

    Ok(RunOutput { model, file_name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn run_over_small_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fastq");
        fs::write(&path, b"@r1\nACGT\n+\nIIII\n@r2\nACGT\n+\nIIII\n").unwrap();

        let cfg = RunConfig {
            input: path,
            format: None,
            config: QcConfig::load(7, None, None, None).unwrap(),
        };
        let output = run(&cfg).unwrap();
        assert_eq!(output.model.basic.total_sequences, 2);
        assert_eq!(output.file_name, "reads.fastq");
    }
}
