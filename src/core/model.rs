use crate::core::stats::NUM_QUALITY_VALUES;

/// Pass/warn/fail verdict for one report module. Error dominates warn:
/// verdicts only ever escalate within a metric.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Status {
    Pass,
    Warn,
    Fail,
}

impl Status {
    pub fn as_str_lower(self) -> &'static str {
        match self {
            Status::Pass => "pass",
            Status::Warn => "warn",
            Status::Fail => "fail",
        }
    }

    pub fn as_str_upper(self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Warn => "WARN",
            Status::Fail => "FAIL",
        }
    }

    pub fn escalate(&mut self, other: Status) {
        if other > *self {
            *self = other;
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BasicStats {
    pub total_sequences: u64,
    pub num_poor: u64,
    pub min_read_length: usize,
    pub max_read_length: usize,
    pub avg_read_length: u64,
    pub total_bases: u64,
    pub gc_percent: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerBaseQualRow {
    pub base: usize,
    pub mean: f64,
    pub median: usize,
    pub lower_quartile: usize,
    pub upper_quartile: usize,
    pub ldecile: usize,
    pub udecile: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerBaseContentRow {
    pub base: usize,
    pub a: f64,
    pub c: f64,
    pub t: f64,
    pub g: f64,
    pub n: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LengthDistRow {
    pub length: usize,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverrepRow {
    pub sequence: String,
    pub count: u64,
    pub percent: f64,
    pub source: String,
}

/// Cumulative adapter-prefix percentages at one read position.
#[derive(Clone, Debug, PartialEq)]
pub struct AdapterRow {
    pub position: usize,
    pub values: Vec<f64>,
}

/// Mean-quality deviation from the positional mean for one tile.
#[derive(Clone, Debug, PartialEq)]
pub struct TileRow {
    pub tile: usize,
    pub deviations: Vec<f64>,
}

/// Duplication extrapolation over the 16 FastQC buckets
/// (1..9, >=10, >=50, >=100, >=500, >=1k, >=5k, >=10k).
#[derive(Clone, Debug, PartialEq)]
pub struct DuplicationSummary {
    pub percentage_deduplicated: [f64; 16],
    pub percentage_total: [f64; 16],
    pub total_deduplicated_pct: f64,
}

pub const DUP_BUCKET_LABELS: [&str; 16] = [
    "1", "2", "3", "4", "5", "6", "7", "8", "9", ">10", ">50", ">100", ">500", ">1k", ">5k",
    ">10k+",
];

#[derive(Clone, Debug, PartialEq)]
pub struct Statuses {
    pub basic: Status,
    pub per_base_qual: Status,
    pub per_tile_qual: Status,
    pub per_seq_qual: Status,
    pub per_base_content: Status,
    pub per_seq_gc: Status,
    pub per_base_n: Status,
    pub length_dist: Status,
    pub duplication: Status,
    pub overrepresented: Status,
    pub kmer: Status,
    pub adapter: Status,
}

/// Inert result of summarization; the text and HTML writers only read it.
#[derive(Clone, Debug, PartialEq)]
pub struct ReportModel {
    pub basic: BasicStats,
    pub per_base_qual: Vec<PerBaseQualRow>,
    pub quality_count: [u64; NUM_QUALITY_VALUES],
    pub per_base_content: Vec<PerBaseContentRow>,
    pub gc_count: [u64; 101],
    pub theoretical_gc: [f64; 101],
    pub gc_deviation: f64,
    pub length_dist: Vec<LengthDistRow>,
    pub duplication: DuplicationSummary,
    pub overrepresented: Vec<OverrepRow>,
    pub adapter_names: Vec<String>,
    pub adapter_content: Vec<AdapterRow>,
    pub tiles: Vec<TileRow>,
    pub statuses: Statuses,
}
