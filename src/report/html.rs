use crate::core::model::{ReportModel, DUP_BUCKET_LABELS};
use anyhow::{bail, Context, Result};
use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;

const DEFAULT_TEMPLATE: &str = include_str!("../../assets/template.html");

/// Substitutes the report data into the HTML template and writes the result.
/// A template path overrides the embedded default.
pub fn write(
    path: &Path,
    model: &ReportModel,
    file_name: &str,
    template: Option<&Path>,
) -> Result<()> {
    let source = match template {
        Some(p) => {
            fs::read_to_string(p).with_context(|| format!("read template {}", p.display()))?
        }
        None => DEFAULT_TEMPLATE.to_string(),
    };
    let html = render(&source, model, file_name)?;
    fs::write(path, html).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn render(template: &str, model: &ReportModel, file_name: &str) -> Result<String> {
    let mut source = template.to_string();
    let substitutions = [
        ("{{FILENAME}}", file_name.to_string()),
        ("{{BASICSTATSDATA}}", basic_stats_data(model, file_name)),
        ("{{SEQBASEQUALITYDATA}}", position_quality_data(model)),
        ("{{TILEQUALITYDATA}}", tile_quality_data(model)),
        ("{{SEQQUALITYDATA}}", sequence_quality_data(model)),
        ("{{BASESEQCONTENTDATA}}", base_content_data(model)),
        ("{{SEQGCCONTENTDATA}}", gc_content_data(model)),
        ("{{BASENCONTENTDATA}}", base_n_data(model)),
        ("{{SEQLENDATA}}", length_data(model)),
        ("{{SEQDUPDATA}}", duplication_data(model)),
        ("{{OVERREPSEQDATA}}", overrep_data(model)),
        ("{{ADAPTERDATA}}", adapter_data(model)),
    ];
    for (placeholder, data) in substitutions {
        if !source.contains(placeholder) {
            bail!("placeholder not found in template: {}", placeholder);
        }
        source = source.replace(placeholder, &data);
    }
    Ok(source)
}

fn status_cell(status: crate::core::model::Status) -> String {
    format!(
        "<span class=\"{}\">{}</span>",
        status.as_str_lower(),
        status.as_str_upper()
    )
}

fn basic_stats_data(model: &ReportModel, file_name: &str) -> String {
    let mut data = String::new();
    data.push_str("<table><thead><tr><th>Measure</th><th>Value</th></tr></thead><tbody>");
    let _ = write!(data, "<tr><td>Filename</td><td>{}</td></tr>", file_name);
    data.push_str("<tr><td>File type</td><td>Conventional base calls</td></tr>");
    data.push_str("<tr><td>Encoding</td><td>Sanger / Illumina 1.9</td></tr>");
    let _ = write!(
        data,
        "<tr><td>Total Sequences</td><td>{}</td></tr>",
        model.basic.total_sequences
    );
    let _ = write!(
        data,
        "<tr><td>Sequences flagged as poor quality</td><td>{}</td></tr>",
        model.basic.num_poor
    );
    if model.basic.min_read_length == model.basic.max_read_length {
        let _ = write!(
            data,
            "<tr><td>Sequence length</td><td>{}</td></tr>",
            model.basic.max_read_length
        );
    } else {
        let _ = write!(
            data,
            "<tr><td>Sequence length</td><td>{} - {}</td></tr>",
            model.basic.min_read_length, model.basic.max_read_length
        );
    }
    let _ = write!(
        data,
        "<tr><td>%GC</td><td>{:.0}</td></tr>",
        model.basic.gc_percent
    );
    let _ = write!(
        data,
        "<tr><td>Overall</td><td>{}</td></tr>",
        status_cell(model.statuses.basic)
    );
    data.push_str("</tbody></table>");
    data
}

/// One box trace per position, colored by the median band.
fn position_quality_data(model: &ReportModel) -> String {
    let mut data = String::new();
    for (i, row) in model.per_base_qual.iter().enumerate() {
        let color = if row.median > 30 {
            "green"
        } else if row.median > 20 {
            "orange"
        } else {
            "red"
        };
        let _ = write!(
            data,
            "{{y : [{}, {}, {}, {}, {}], type : 'box', name : '{}', marker : {{color : '{}'}}}}",
            row.ldecile,
            row.lower_quartile,
            row.median,
            row.upper_quartile,
            row.udecile,
            row.base,
            color
        );
        if i + 1 < model.per_base_qual.len() {
            data.push_str(", ");
        }
    }
    data
}

fn tile_quality_data(model: &ReportModel) -> String {
    let positions = model.per_base_qual.len();
    let mut data = String::from("{x : [");
    for p in 0..positions {
        let _ = write!(data, "{}", p + 1);
        if p + 1 < positions {
            data.push(',');
        }
    }
    data.push_str("], y : [");
    for (i, tile) in model.tiles.iter().enumerate() {
        if i > 0 {
            data.push(',');
        }
        let _ = write!(data, "{}", tile.tile);
    }
    data.push_str("], z : [");
    for (i, tile) in model.tiles.iter().enumerate() {
        if i > 0 {
            data.push_str(", ");
        }
        data.push('[');
        for (p, dev) in tile.deviations.iter().enumerate() {
            if p > 0 {
                data.push(',');
            }
            let _ = write!(data, "{:.3}", dev);
        }
        data.push(']');
    }
    data.push_str("], type : 'heatmap'}");
    data
}

fn sequence_quality_data(model: &ReportModel) -> String {
    let mut data = String::from("{x : [");
    for q in 0..model.quality_count.len() {
        let _ = write!(data, "{}", q);
        if q + 1 < model.quality_count.len() {
            data.push_str(", ");
        }
    }
    data.push_str("], y : [");
    for (q, &count) in model.quality_count.iter().enumerate() {
        let _ = write!(data, "{}", count);
        if q + 1 < model.quality_count.len() {
            data.push_str(", ");
        }
    }
    data.push_str("], type : 'line', line : {color : 'red'}}");
    data
}

fn base_content_data(model: &ReportModel) -> String {
    let series = [
        ("A", "green"),
        ("C", "blue"),
        ("T", "red"),
        ("G", "black"),
    ];
    let mut data = String::new();
    for (s, &(name, color)) in series.iter().enumerate() {
        if s > 0 {
            data.push_str(", ");
        }
        data.push_str("{x : [");
        for (i, row) in model.per_base_content.iter().enumerate() {
            if i > 0 {
                data.push_str(", ");
            }
            let _ = write!(data, "{}", row.base);
        }
        data.push_str("], y : [");
        for (i, row) in model.per_base_content.iter().enumerate() {
            if i > 0 {
                data.push_str(", ");
            }
            let value = match s {
                0 => row.a,
                1 => row.c,
                2 => row.t,
                _ => row.g,
            };
            let _ = write!(data, "{:.3}", value);
        }
        let _ = write!(
            data,
            "], mode : 'lines', name : '{}', line : {{color : '{}'}}}}",
            name, color
        );
    }
    data
}

fn gc_content_data(model: &ReportModel) -> String {
    let mut data = String::from("{x : [");
    for i in 0..=100 {
        let _ = write!(data, "{}", i);
        if i < 100 {
            data.push_str(", ");
        }
    }
    data.push_str("], y : [");
    for (i, &count) in model.gc_count.iter().enumerate() {
        let _ = write!(data, "{}", count);
        if i < 100 {
            data.push_str(", ");
        }
    }
    data.push_str("], type : 'line', name : 'GC count per read', line : {color : 'red'}}, {x : [");
    for i in 0..=100 {
        let _ = write!(data, "{}", i);
        if i < 100 {
            data.push_str(", ");
        }
    }
    data.push_str("], y : [");
    for (i, value) in model.theoretical_gc.iter().enumerate() {
        let _ = write!(data, "{:.3}", value);
        if i < 100 {
            data.push_str(", ");
        }
    }
    data.push_str("], type : 'line', name : 'Theoretical distribution', line : {color : 'blue'}}");
    data
}

fn base_n_data(model: &ReportModel) -> String {
    let mut data = String::from("{x : [");
    for (i, row) in model.per_base_content.iter().enumerate() {
        if i > 0 {
            data.push_str(", ");
        }
        let _ = write!(data, "{}", row.base);
    }
    data.push_str("], y : [");
    for (i, row) in model.per_base_content.iter().enumerate() {
        if i > 0 {
            data.push_str(", ");
        }
        let _ = write!(data, "{:.3}", row.n);
    }
    data.push_str("], type : 'line', line : {color : 'red'}}");
    data
}

fn length_data(model: &ReportModel) -> String {
    let mut data = String::from("{x : [");
    for (i, row) in model.length_dist.iter().enumerate() {
        if i > 0 {
            data.push(',');
        }
        let _ = write!(data, "{}", row.length);
    }
    data.push_str("], y : [");
    for (i, row) in model.length_dist.iter().enumerate() {
        if i > 0 {
            data.push(',');
        }
        let _ = write!(data, "{}", row.count);
    }
    data.push_str("], type : 'line', line : {color : 'red'}}");
    data
}

fn duplication_data(model: &ReportModel) -> String {
    let labels = |data: &mut String| {
        for (i, label) in DUP_BUCKET_LABELS.iter().enumerate() {
            if i > 0 {
                data.push_str(", ");
            }
            let _ = write!(data, "'{}'", label);
        }
    };
    let mut data = String::from("{x : [");
    labels(&mut data);
    data.push_str("], y : [");
    for (i, value) in model.duplication.percentage_total.iter().enumerate() {
        if i > 0 {
            data.push_str(", ");
        }
        let _ = write!(data, "{:.3}", value);
    }
    data.push_str("], type : 'line', name : '% Total sequences', line : {color : 'blue'}}, {x : [");
    labels(&mut data);
    data.push_str("], y : [");
    for (i, value) in model.duplication.percentage_deduplicated.iter().enumerate() {
        if i > 0 {
            data.push_str(", ");
        }
        let _ = write!(data, "{:.3}", value);
    }
    data.push_str("], type : 'line', name : '% Deduplicated sequences', line : {color : 'red'}}");
    data
}

fn overrep_data(model: &ReportModel) -> String {
    let mut data = String::new();
    data.push_str(
        "<table><thead><tr><th>Sequence</th><th>Count</th><th>Percentage</th>\
         <th>Possible Source</th></tr></thead><tbody>",
    );
    for row in &model.overrepresented {
        let _ = write!(
            data,
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td></tr>",
            row.sequence, row.count, row.percent, row.source
        );
    }
    data.push_str("</tbody></table>");
    data
}

fn adapter_data(model: &ReportModel) -> String {
    let mut data = String::new();
    for (j, name) in model.adapter_names.iter().enumerate() {
        if j > 0 {
            data.push_str(", ");
        }
        data.push_str("{x : [");
        for (i, row) in model.adapter_content.iter().enumerate() {
            if i > 0 {
                data.push(',');
            }
            let _ = write!(data, "{}", row.position);
        }
        data.push_str("], y : [");
        for (i, row) in model.adapter_content.iter().enumerate() {
            if i > 0 {
                data.push(',');
            }
            let _ = write!(data, "{:.4}", row.values[j]);
        }
        let _ = write!(data, "], type : 'line', name : '{}'}}", name);
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::QcConfig;
    use crate::core::stats::FastqStats;
    use crate::core::summary::summarize;

    fn model() -> ReportModel {
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
        summarize(&stats, &config)
    }

    #[test]
    fn embedded_template_renders_without_leftover_placeholders() {
        let html = render(DEFAULT_TEMPLATE, &model(), "reads.fastq").unwrap();
        assert!(!html.contains("{{"));
        assert!(html.contains("reads.fastq"));
        assert!(html.contains("Total Sequences"));
        assert!(html.contains("type : 'box'"));
    }

    #[test]
    fn missing_placeholder_is_an_error() {
        let err = render("<html></html>", &model(), "x").unwrap_err();
        assert!(err.to_string().contains("placeholder not found"));
    }
}
