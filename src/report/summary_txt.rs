use crate::core::model::ReportModel;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const MODULES: [&str; 11] = [
    "Basic Statistics",
    "Per base sequence quality",
    "Per sequence quality scores",
    "Per base sequence content",
    "Per tile sequence quality",
    "Per sequence GC content",
    "Per base N content",
    "Sequence Length Distribution",
    "Sequence Duplication Levels",
    "Overrepresented sequences",
    "Adapter Content",
];

/// One `STATUS\tModule\tfilename` line per report module.
pub fn write(path: &Path, model: &ReportModel, file_name: &str) -> Result<()> {
    let mut w = BufWriter::new(File::create(path).with_context(|| "create summary.txt failed")?);
    let s = &model.statuses;
    let statuses = [
        s.basic,
        s.per_base_qual,
        s.per_seq_qual,
        s.per_base_content,
        s.per_tile_qual,
        s.per_seq_gc,
        s.per_base_n,
        s.length_dist,
        s.duplication,
        s.overrepresented,
        s.adapter,
    ];
    for (status, module) in statuses.iter().zip(MODULES.iter()) {
        writeln!(w, "{}\t{}\t{}", status.as_str_upper(), module, file_name)?;
    }
    Ok(())
}
