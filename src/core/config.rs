use crate::error::{QcError, Result};
use std::fs;
use std::path::Path;

pub const MIN_KMER_SIZE: usize = 2;
pub const MAX_KMER_SIZE: usize = 10;

/// Quality value below which a read's mean quality flags it as poor.
pub const POOR_QUALITY_THRESHOLD: usize = 20;

/// Fraction of reads a sequence must reach to be reported as overrepresented.
pub const OVERREP_MIN_FRAC: f64 = 0.001;

/// ASCII offset of the lowest quality character (Sanger / Illumina 1.9).
pub const QUALITY_OFFSET: u8 = 33;

const DEFAULT_LIMITS: &str = include_str!("../../assets/limits.txt");
const DEFAULT_ADAPTERS: &str = include_str!("../../assets/adapter_list.txt");
const DEFAULT_CONTAMINANTS: &str = include_str!("../../assets/contaminant_list.txt");

/// Warn/error thresholds and the ignore switch for one metric.
#[derive(Clone, Copy, Debug, Default)]
pub struct Limit {
    pub warn: f64,
    pub error: f64,
    pub ignore: bool,
}

/// Thresholds for the closed set of recognized metrics.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub duplication: Limit,
    pub kmer: Limit,
    pub n_content: Limit,
    pub overrepresented: Limit,
    pub quality_base_lower: Limit,
    pub quality_base_median: Limit,
    pub quality_sequence: Limit,
    pub sequence: Limit,
    pub gc_sequence: Limit,
    pub tile: Limit,
    pub sequence_length: Limit,
    pub adapter: Limit,
}

const METRIC_NAMES: [&str; 12] = [
    "duplication",
    "kmer",
    "n_content",
    "overrepresented",
    "quality_base_lower",
    "quality_base_median",
    "quality_sequence",
    "sequence",
    "gc_sequence",
    "tile",
    "sequence_length",
    "adapter",
];

impl Limits {
    fn slot(&mut self, name: &str) -> Option<&mut Limit> {
        match name {
            "duplication" => Some(&mut self.duplication),
            "kmer" => Some(&mut self.kmer),
            "n_content" => Some(&mut self.n_content),
            "overrepresented" => Some(&mut self.overrepresented),
            "quality_base_lower" => Some(&mut self.quality_base_lower),
            "quality_base_median" => Some(&mut self.quality_base_median),
            "quality_sequence" => Some(&mut self.quality_sequence),
            "sequence" => Some(&mut self.sequence),
            "gc_sequence" => Some(&mut self.gc_sequence),
            "tile" => Some(&mut self.tile),
            "sequence_length" => Some(&mut self.sequence_length),
            "adapter" => Some(&mut self.adapter),
            _ => None,
        }
    }
}

/// Adapter entry: display name plus the 2-bit hash of its K-length prefix.
#[derive(Clone, Debug)]
pub struct Adapter {
    pub name: String,
    pub prefix_hash: u64,
}

#[derive(Clone, Debug)]
pub struct Contaminant {
    pub name: String,
    pub seq: Vec<u8>,
}

/// Everything the engine consumes besides the input file itself.
#[derive(Clone, Debug)]
pub struct QcConfig {
    pub kmer_size: usize,
    pub poor_quality_threshold: usize,
    pub overrep_min_frac: f64,
    pub quality_offset: u8,
    pub limits: Limits,
    pub adapters: Vec<Adapter>,
    pub contaminants: Vec<Contaminant>,
}

impl QcConfig {
    /// Builds a configuration from the given file paths, falling back to the
    /// embedded defaults for any path not provided. When the adapter metric
    /// is ignored, neither the adapter list nor the contaminants list is
    /// loaded.
    pub fn load(
        kmer_size: usize,
        limits_path: Option<&Path>,
        adapters_path: Option<&Path>,
        contaminants_path: Option<&Path>,
    ) -> Result<Self> {
        if !(MIN_KMER_SIZE..=MAX_KMER_SIZE).contains(&kmer_size) {
            return Err(QcError::config(
                "kmer",
                format!(
                    "k-mer length {} out of range [{}, {}]",
                    kmer_size, MIN_KMER_SIZE, MAX_KMER_SIZE
                ),
            ));
        }

        let limits = match limits_path {
            Some(p) => parse_limits(&read_config_file(p)?, &p.display().to_string())?,
            None => parse_limits(DEFAULT_LIMITS, "<builtin limits>")?,
        };

        let (adapters, contaminants) = if limits.adapter.ignore {
            (Vec::new(), Vec::new())
        } else {
            let adapters = match adapters_path {
                Some(p) => {
                    parse_adapters(&read_config_file(p)?, &p.display().to_string(), kmer_size)?
                }
                None => parse_adapters(DEFAULT_ADAPTERS, "<builtin adapters>", kmer_size)?,
            };
            let contaminants = match contaminants_path {
                Some(p) => parse_contaminants(&read_config_file(p)?),
                None => parse_contaminants(DEFAULT_CONTAMINANTS),
            };
            (adapters, contaminants)
        };

        Ok(QcConfig {
            kmer_size,
            poor_quality_threshold: POOR_QUALITY_THRESHOLD,
            overrep_min_frac: OVERREP_MIN_FRAC,
            quality_offset: QUALITY_OFFSET,
            limits,
            adapters,
            contaminants,
        })
    }
}

fn read_config_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| QcError::io(path, e))
}

/// Parses a limits file: `<metric> <warn|error|ignore> <number>` per line,
/// `#` comments. Every metric of the closed set must appear.
pub fn parse_limits(text: &str, origin: &str) -> Result<Limits> {
    let mut limits = Limits::default();
    let mut seen = [false; METRIC_NAMES.len()];

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut tok = line.split_whitespace();
        let (name, instruction, value) = match (tok.next(), tok.next(), tok.next()) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => {
                return Err(QcError::config(
                    origin,
                    format!("malformed limit line: {:?}", line),
                ))
            }
        };
        let value: f64 = value.parse().map_err(|_| {
            QcError::config(origin, format!("bad numeric value for {}: {}", name, value))
        })?;

        let slot = limits
            .slot(name)
            .ok_or_else(|| QcError::config(origin, format!("unknown limit option: {}", name)))?;
        match instruction {
            "warn" => slot.warn = value,
            "error" => slot.error = value,
            "ignore" => slot.ignore = value != 0.0,
            other => {
                return Err(QcError::config(
                    origin,
                    format!("unknown instruction for limit {}: {}", name, other),
                ))
            }
        }
        let idx = METRIC_NAMES.iter().position(|&m| m == name).unwrap();
        seen[idx] = true;
    }

    for (idx, &was_seen) in seen.iter().enumerate() {
        if !was_seen {
            return Err(QcError::config(
                origin,
                format!("instruction for limit {} not found", METRIC_NAMES[idx]),
            ));
        }
    }
    Ok(limits)
}

/// Parses an adapters file: whitespace-separated name tokens followed by the
/// literal sequence. The sequence is truncated to the first `kmer_size` bases
/// and folded into a 2-bit hash.
pub fn parse_adapters(text: &str, origin: &str, kmer_size: usize) -> Result<Vec<Adapter>> {
    let mut adapters = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }
        let name = tokens[..tokens.len() - 1].join(" ");
        let seq = tokens[tokens.len() - 1].as_bytes();
        let prefix = &seq[..seq.len().min(kmer_size)];

        let mut hash: u64 = 0;
        for &c in prefix {
            if !matches!(c, b'A' | b'C' | b'T' | b'G') {
                return Err(QcError::config(
                    origin,
                    format!(
                        "bad adapter (non-ACTG characters): {}",
                        String::from_utf8_lossy(seq)
                    ),
                ));
            }
            hash = (hash << 2) | ((c as u64 >> 1) & 3);
        }
        adapters.push(Adapter { name, prefix_hash: hash });
    }
    Ok(adapters)
}

/// Parses a contaminants file: same shape as the adapters file, but the
/// sequence is kept literally with no alphabet validation.
pub fn parse_contaminants(text: &str) -> Vec<Contaminant> {
    let mut contaminants = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() < 2 {
            continue;
        }
        contaminants.push(Contaminant {
            name: tokens[..tokens.len() - 1].join(" "),
            seq: tokens[tokens.len() - 1].as_bytes().to_vec(),
        });
    }
    contaminants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_defaults_parse() {
        let config = QcConfig::load(7, None, None, None).unwrap();
        assert_eq!(config.kmer_size, 7);
        assert!(!config.adapters.is_empty());
        assert!(!config.contaminants.is_empty());
        assert_eq!(config.limits.duplication.warn, 70.0);
        assert_eq!(config.limits.quality_base_median.error, 20.0);
    }

    #[test]
    fn unknown_metric_rejected() {
        let err = parse_limits("frobnicate warn 10\n", "<test>").unwrap_err();
        assert!(err.to_string().contains("unknown limit option"));
    }

    #[test]
    fn unknown_instruction_rejected() {
        let err = parse_limits("duplication shout 10\n", "<test>").unwrap_err();
        assert!(err.to_string().contains("unknown instruction"));
    }

    #[test]
    fn missing_metric_rejected() {
        let err = parse_limits("duplication warn 70\n", "<test>").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn adapter_prefix_hash_folds_two_bits_per_base() {
        let adapters = parse_adapters("Test Adapter ACTG\n", "<test>", 4).unwrap();
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].name, "Test Adapter");
        // A=0, C=1, T=2, G=3 -> 0b00_01_10_11
        assert_eq!(adapters[0].prefix_hash, 0b00011011);
    }

    #[test]
    fn adapter_truncated_to_kmer_size() {
        let adapters = parse_adapters("X AAAACCCC\n", "<test>", 4).unwrap();
        assert_eq!(adapters[0].prefix_hash, 0);
    }

    #[test]
    fn adapter_bad_alphabet_rejected() {
        assert!(parse_adapters("X ACUG\n", "<test>", 4).is_err());
    }

    #[test]
    fn kmer_size_out_of_range_rejected() {
        assert!(QcConfig::load(1, None, None, None).is_err());
        assert!(QcConfig::load(11, None, None, None).is_err());
    }

    #[test]
    fn ignored_adapter_metric_skips_both_lists() {
        let mut text = String::from("adapter ignore 1\n");
        for name in super::METRIC_NAMES {
            text.push_str(&format!("{} warn 1\n{} error 1\n", name, name));
        }
        let dir = tempfile::tempdir().unwrap();
        let limits_path = dir.path().join("limits.txt");
        std::fs::write(&limits_path, text).unwrap();
        let config = QcConfig::load(7, Some(&limits_path), None, None).unwrap();
        assert!(config.adapters.is_empty());
        assert!(config.contaminants.is_empty());
    }
}
