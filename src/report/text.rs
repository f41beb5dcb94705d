use crate::core::model::{ReportModel, DUP_BUCKET_LABELS};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes the structured text report: one `>>Module\t<verdict>` section per
/// module, fixed column orders, `>>END_MODULE` terminators.
pub fn write(path: &Path, model: &ReportModel, file_name: &str) -> Result<()> {
    let mut w = BufWriter::new(File::create(path).with_context(|| "create data report failed")?);
    write_report(&mut w, model, file_name)
}

pub fn write_report(w: &mut dyn Write, model: &ReportModel, file_name: &str) -> Result<()> {
    writeln!(w, "##FastQC\t0.11.8")?;

    writeln!(
        w,
        ">>Basic Statistics\t{}",
        model.statuses.basic.as_str_lower()
    )?;
    writeln!(w, "#Measure\tValue")?;
    writeln!(w, "Filename\t{}", file_name)?;
    writeln!(w, "File type\tConventional base calls")?;
    writeln!(w, "Encoding\tSanger / Illumina 1.9")?;
    writeln!(w, "Total Sequences\t{}", model.basic.total_sequences)?;
    writeln!(
        w,
        "Sequences flagged as poor quality\t{}",
        model.basic.num_poor
    )?;
    if model.basic.min_read_length == model.basic.max_read_length {
        writeln!(w, "Sequence length\t{}", model.basic.max_read_length)?;
    } else {
        writeln!(
            w,
            "Sequence length\t{}-{}",
            model.basic.min_read_length, model.basic.max_read_length
        )?;
    }
    writeln!(w, "%GC\t{:.0}", model.basic.gc_percent)?;
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Per base sequence quality\t{}",
        model.statuses.per_base_qual.as_str_lower()
    )?;
    writeln!(
        w,
        "#Base\tMean\tMedian\tLower Quartile\tUpper Quartile\t10th Percentile\t90th Percentile"
    )?;
    for row in &model.per_base_qual {
        writeln!(
            w,
            "{}\t{:.1}\t{}\t{}\t{}\t{}\t{}",
            row.base, row.mean, row.median, row.lower_quartile, row.upper_quartile, row.ldecile,
            row.udecile
        )?;
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Per sequence quality scores\t{}",
        model.statuses.per_seq_qual.as_str_lower()
    )?;
    writeln!(w, "#Quality\tCount")?;
    for (q, &count) in model.quality_count.iter().enumerate() {
        if count > 0 {
            writeln!(w, "{}\t{}", q, count)?;
        }
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Per base sequence content\t{}",
        model.statuses.per_base_content.as_str_lower()
    )?;
    writeln!(w, "#Base\tG\tA\tT\tC")?;
    for row in &model.per_base_content {
        writeln!(
            w,
            "{}\t{:.1}\t{:.1}\t{:.1}\t{:.1}",
            row.base, row.g, row.a, row.t, row.c
        )?;
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Per tile sequence quality\t{}",
        model.statuses.per_tile_qual.as_str_lower()
    )?;
    writeln!(w, "#Tile\tBase\tMean")?;
    for tile in &model.tiles {
        for (p, dev) in tile.deviations.iter().enumerate() {
            writeln!(w, "{}\t{}\t{:.2}", tile.tile, p + 1, dev)?;
        }
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Per sequence GC content\t{}",
        model.statuses.per_seq_gc.as_str_lower()
    )?;
    writeln!(w, "#GC Content\tCount")?;
    for (gc, &count) in model.gc_count.iter().enumerate() {
        if count > 0 {
            writeln!(w, "{}\t{}", gc, count)?;
        }
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Per base N content\t{}",
        model.statuses.per_base_n.as_str_lower()
    )?;
    writeln!(w, "#Base\tN-Count")?;
    for row in &model.per_base_content {
        writeln!(w, "{}\t{:.1}", row.base, row.n)?;
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Sequence Length Distribution\t{}",
        model.statuses.length_dist.as_str_lower()
    )?;
    writeln!(w, "#Length\tCount")?;
    for row in &model.length_dist {
        writeln!(w, "{}\t{}", row.length, row.count)?;
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Sequence Duplication Levels\t{}",
        model.statuses.duplication.as_str_lower()
    )?;
    writeln!(
        w,
        ">>Total Deduplicated Percentage\t{:.2}",
        model.duplication.total_deduplicated_pct
    )?;
    writeln!(
        w,
        "#Duplication Level\tPercentage of deduplicated\tPercentage of total"
    )?;
    for (i, label) in DUP_BUCKET_LABELS.iter().enumerate() {
        writeln!(
            w,
            "{}\t{:.2}\t{:.2}",
            label,
            model.duplication.percentage_deduplicated[i],
            model.duplication.percentage_total[i]
        )?;
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Overrepresented sequences\t{}",
        model.statuses.overrepresented.as_str_lower()
    )?;
    writeln!(w, "#Sequence\tCount\tPercentage\tPossible Source")?;
    for row in &model.overrepresented {
        writeln!(
            w,
            "{}\t{}\t{:.2}\t{}",
            row.sequence, row.count, row.percent, row.source
        )?;
    }
    writeln!(w, ">>END_MODULE")?;

    writeln!(
        w,
        ">>Adapter Content\t{}",
        model.statuses.adapter.as_str_lower()
    )?;
    write!(w, "#Position")?;
    for name in &model.adapter_names {
        write!(w, "\t{}", name)?;
    }
    writeln!(w)?;
    for row in &model.adapter_content {
        write!(w, "{}", row.position)?;
        for v in &row.values {
            write!(w, "\t{:.1}", v)?;
        }
        writeln!(w)?;
    }
    writeln!(w, ">>END_MODULE")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::QcConfig;
    use crate::core::stats::FastqStats;
    use crate::core::summary::summarize;

    #[test]
    fn modules_are_delimited() {
        let config = QcConfig::load(7, None, None, None).unwrap();
        let mut stats = FastqStats::new(&config).unwrap();
        stats.begin_read(None);
        for &b in b"ACGT" {
            stats.sequence_byte(b);
        }
        stats.finish_sequence().unwrap();
        for &b in b"IIII" {
            stats.quality_byte(b).unwrap();
        }
        stats.finish_quality().unwrap();
        stats.finish_record();
        let model = summarize(&stats, &config);

        let mut out = Vec::new();
        write_report(&mut out, &model, "reads.fastq").unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("##FastQC"));
        assert_eq!(text.matches(">>END_MODULE").count(), 11);
        assert!(text.contains(">>Basic Statistics\tpass"));
        assert!(text.contains("Total Sequences\t1"));
        assert!(text.contains("%GC\t50"));
        assert!(text.contains(">>Sequence Length Distribution"));
        assert!(text.contains("4\t1\n"));
    }
}
