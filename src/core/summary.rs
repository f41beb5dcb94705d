use crate::core::config::{Contaminant, QcConfig};
use crate::core::model::{
    AdapterRow, BasicStats, DuplicationSummary, LengthDistRow, OverrepRow, PerBaseContentRow,
    PerBaseQualRow, ReportModel, Status, Statuses, TileRow,
};
use crate::core::stats::{
    nuc_index, FastqStats, KMER_MAX_BASES, NUM_BASES, NUM_QUALITY_VALUES,
};
use aho_corasick::AhoCorasick;
use memchr::memmem;
use std::collections::HashMap;

/// One-shot post-scan summarization. Pure function of the frozen
/// accumulator, so running it twice yields identical models.
pub fn summarize(stats: &FastqStats, config: &QcConfig) -> ReportModel {
    let limits = &config.limits;
    let n_positions = stats.max_read_length;
    let num_reads = stats.num_reads;

    let freqs: Vec<u64> = (0..n_positions)
        .map(|p| stats.read_length_freq_at(p))
        .collect();

    // number of reads with length >= p+1, as a reverse prefix sum
    let mut cumulative = vec![0u64; n_positions];
    let mut running = 0u64;
    for p in (0..n_positions).rev() {
        running += freqs[p];
        cumulative[p] = running;
    }

    let total_bases: u64 = freqs
        .iter()
        .enumerate()
        .map(|(p, &f)| (p as u64 + 1) * f)
        .sum();
    let avg_read_length = if num_reads == 0 {
        0
    } else {
        total_bases / num_reads
    };
    let gc_bases: u64 = (0..n_positions)
        .map(|p| {
            stats.base_count_at(p, nuc_index(b'C')) + stats.base_count_at(p, nuc_index(b'G'))
        })
        .sum();
    let gc_percent = if total_bases == 0 {
        0.0
    } else {
        100.0 * gc_bases as f64 / total_bases as f64
    };
    let num_poor: u64 = stats.quality_count[..config.poor_quality_threshold]
        .iter()
        .sum();
    let min_read_length = freqs
        .iter()
        .position(|&f| f > 0)
        .map(|p| p + 1)
        .unwrap_or(0);

    let basic = BasicStats {
        total_sequences: num_reads,
        num_poor,
        min_read_length,
        max_read_length: n_positions,
        avg_read_length,
        total_bases,
        gc_percent,
    };

    // per-position quality quantiles by stepping through the histogram
    let mut per_base_qual = Vec::with_capacity(n_positions);
    let mut per_base_qual_status = Status::Pass;
    let mut means = vec![0.0f64; n_positions];
    for p in 0..n_positions {
        let cum = cumulative[p] as f64;
        let thresholds = [0.1 * cum, 0.25 * cum, 0.5 * cum, 0.75 * cum, 0.9 * cum];
        let mut quantiles = [0usize; 5];
        let mut counts = 0u64;
        let mut mean_sum = 0.0f64;
        for q in 0..NUM_QUALITY_VALUES {
            let cur = stats.position_quality_at(p, q);
            for (slot, &th) in quantiles.iter_mut().zip(thresholds.iter()) {
                if (counts as f64) < th && (counts + cur) as f64 >= th {
                    *slot = q;
                }
            }
            mean_sum += (cur * q as u64) as f64;
            counts += cur;
        }
        let mean = mean_sum / cum;
        means[p] = mean;
        per_base_qual.push(PerBaseQualRow {
            base: p + 1,
            mean,
            median: quantiles[2],
            lower_quartile: quantiles[1],
            upper_quartile: quantiles[3],
            ldecile: quantiles[0],
            udecile: quantiles[4],
        });
        if !limits.quality_base_lower.ignore {
            if (quantiles[1] as f64) < limits.quality_base_lower.error {
                per_base_qual_status.escalate(Status::Fail);
            } else if (quantiles[1] as f64) < limits.quality_base_lower.warn {
                per_base_qual_status.escalate(Status::Warn);
            }
        }
        if !limits.quality_base_median.ignore {
            if (quantiles[2] as f64) < limits.quality_base_median.error {
                per_base_qual_status.escalate(Status::Fail);
            } else if (quantiles[2] as f64) < limits.quality_base_median.warn {
                per_base_qual_status.escalate(Status::Warn);
            }
        }
    }

    // per-position base composition percentages
    let mut per_base_content = Vec::with_capacity(n_positions);
    let mut per_base_content_status = Status::Pass;
    let mut per_base_n_status = Status::Pass;
    for p in 0..n_positions {
        let a = stats.base_count_at(p, nuc_index(b'A'));
        let c = stats.base_count_at(p, nuc_index(b'C'));
        let t = stats.base_count_at(p, nuc_index(b'T'));
        let g = stats.base_count_at(p, nuc_index(b'G'));
        let n = stats.n_base_count_at(p);
        let total = (a + c + t + g + n) as f64;
        let row = PerBaseContentRow {
            base: p + 1,
            a: 100.0 * a as f64 / total,
            c: 100.0 * c as f64 / total,
            t: 100.0 * t as f64 / total,
            g: 100.0 * g as f64 / total,
            n: 100.0 * n as f64 / total,
        };
        if !limits.sequence.ignore {
            let pcts = [row.a, row.c, row.t, row.g];
            let mut max_diff = 0.0f64;
            for i in 0..pcts.len() {
                for j in i + 1..pcts.len() {
                    max_diff = max_diff.max((pcts[i] - pcts[j]).abs());
                }
            }
            if max_diff > limits.sequence.error {
                per_base_content_status.escalate(Status::Fail);
            } else if max_diff > limits.sequence.warn {
                per_base_content_status.escalate(Status::Warn);
            }
        }
        if !limits.n_content.ignore {
            if row.n > limits.n_content.error {
                per_base_n_status.escalate(Status::Fail);
            } else if row.n > limits.n_content.warn {
                per_base_n_status.escalate(Status::Warn);
            }
        }
        per_base_content.push(row);
    }

    // per-sequence quality scores: verdict on the histogram mode
    let mut per_seq_qual_status = Status::Pass;
    if !limits.quality_sequence.ignore && num_reads > 0 {
        let mut mode = 0usize;
        let mut mode_count = 0u64;
        for (q, &count) in stats.quality_count.iter().enumerate() {
            if count > mode_count {
                mode_count = count;
                mode = q;
            }
        }
        if (mode as f64) < limits.quality_sequence.error {
            per_seq_qual_status.escalate(Status::Fail);
        } else if (mode as f64) < limits.quality_sequence.warn {
            per_seq_qual_status.escalate(Status::Warn);
        }
    }

    // GC histogram: smooth interior zeros, then fit a normal curve
    let mut gc_count = stats.gc_count;
    for i in 1..=98 {
        if gc_count[i] == 0 {
            gc_count[i] = (gc_count[i + 1] + gc_count[i - 1]) / 2;
        }
    }
    let (theoretical_gc, gc_deviation) = gc_normal_deviation(&gc_count);
    let mut per_seq_gc_status = Status::Pass;
    if !limits.gc_sequence.ignore {
        if gc_deviation >= limits.gc_sequence.error {
            per_seq_gc_status.escalate(Status::Fail);
        } else if gc_deviation >= limits.gc_sequence.warn {
            per_seq_gc_status.escalate(Status::Warn);
        }
    }

    // length distribution
    let length_dist: Vec<LengthDistRow> = freqs
        .iter()
        .enumerate()
        .filter(|&(_, &count)| count > 0)
        .map(|(p, &count)| LengthDistRow {
            length: p + 1,
            count,
        })
        .collect();
    let mut length_dist_status = Status::Pass;
    if !limits.sequence_length.ignore
        && limits.sequence_length.error == 1.0
        && num_reads > 0
        && avg_read_length >= 1
    {
        let freq_of_avg = freqs
            .get(avg_read_length as usize - 1)
            .copied()
            .unwrap_or(0);
        if freq_of_avg != num_reads {
            length_dist_status.escalate(Status::Warn);
        }
    }

    // duplication extrapolation
    let mut counts_by_freq: HashMap<u64, u64> = HashMap::new();
    for &count in stats.sequence_count.values() {
        *counts_by_freq.entry(count).or_insert(0) += 1;
    }
    let mut percentage_deduplicated = [0.0f64; 16];
    let mut percentage_total = [0.0f64; 16];
    let mut seq_dedup = 0.0f64;
    let mut seq_total = 0.0f64;
    for (&dup_level, &num_obs) in &counts_by_freq {
        let corrected = corrected_count(stats.count_at_limit, num_reads, dup_level, num_obs);
        let slot = dup_bucket(dup_level);
        percentage_deduplicated[slot] += corrected;
        percentage_total[slot] += corrected * dup_level as f64;
        seq_dedup += corrected;
        seq_total += corrected * dup_level as f64;
    }
    let total_deduplicated_pct = if seq_total > 0.0 {
        100.0 * seq_dedup / seq_total
    } else {
        0.0
    };
    if seq_dedup > 0.0 {
        for v in percentage_deduplicated.iter_mut() {
            *v = 100.0 * *v / seq_dedup;
        }
    }
    if seq_total > 0.0 {
        for v in percentage_total.iter_mut() {
            *v = 100.0 * *v / seq_total;
        }
    }
    let mut duplication_status = Status::Pass;
    if !limits.duplication.ignore && num_reads > 0 {
        if percentage_total[0] <= limits.duplication.error {
            duplication_status.escalate(Status::Fail);
        } else if percentage_total[0] <= limits.duplication.warn {
            duplication_status.escalate(Status::Warn);
        }
    }
    let duplication = DuplicationSummary {
        percentage_deduplicated,
        percentage_total,
        total_deduplicated_pct,
    };

    // overrepresented sequences above the configured fraction
    let matcher = ContaminantMatcher::new(&config.contaminants);
    let mut overrepresented = Vec::new();
    let mut overrep_status = Status::Pass;
    if num_reads > 0 {
        for (seq, &count) in &stats.sequence_count {
            if (count as f64) > config.overrep_min_frac * num_reads as f64 {
                let percent = 100.0 * count as f64 / num_reads as f64;
                overrepresented.push(OverrepRow {
                    sequence: String::from_utf8_lossy(seq).into_owned(),
                    count,
                    percent,
                    source: matcher.best_hit(seq),
                });
                if !limits.overrepresented.ignore {
                    if percent > limits.overrepresented.error {
                        overrep_status.escalate(Status::Fail);
                    } else if percent > limits.overrepresented.warn {
                        overrep_status.escalate(Status::Warn);
                    }
                }
            }
        }
        overrepresented.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.sequence.cmp(&b.sequence))
        });
    }

    // cumulative adapter-prefix frequency by position
    let adapter_names: Vec<String> = config.adapters.iter().map(|a| a.name.clone()).collect();
    let mut adapter_content = Vec::new();
    let mut adapter_status = Status::Pass;
    let mut running_counts = vec![0.0f64; config.adapters.len()];
    for p in 0..NUM_BASES.min(KMER_MAX_BASES).min(n_positions) {
        if cumulative[p] == 0 {
            break;
        }
        let mut values = Vec::with_capacity(config.adapters.len());
        for (j, adapter) in config.adapters.iter().enumerate() {
            running_counts[j] += stats.kmer_count_at(p, adapter.prefix_hash) as f64;
            let pct = 100.0 * running_counts[j] / num_reads as f64;
            if !limits.adapter.ignore {
                if pct > limits.adapter.error {
                    adapter_status.escalate(Status::Fail);
                } else if pct > limits.adapter.warn {
                    adapter_status.escalate(Status::Warn);
                }
            }
            values.push(pct);
        }
        adapter_content.push(AdapterRow {
            position: p + 1,
            values,
        });
    }

    // per-tile deviation from the positional mean quality
    let mut tiles = Vec::new();
    let mut per_tile_status = Status::Pass;
    if stats.tile_active() {
        for (t, &count) in stats.tile_counts().iter().enumerate() {
            if count == 0 {
                continue;
            }
            let deviations: Vec<f64> = (0..n_positions)
                .map(|p| stats.tile_quality_at(p, t) / count as f64 - means[p])
                .collect();
            if !limits.tile.ignore {
                for &dev in &deviations {
                    if dev <= -limits.tile.error {
                        per_tile_status.escalate(Status::Fail);
                    } else if dev <= -limits.tile.warn {
                        per_tile_status.escalate(Status::Warn);
                    }
                }
            }
            tiles.push(TileRow {
                tile: t,
                deviations,
            });
        }
    }

    let statuses = Statuses {
        basic: Status::Pass,
        per_base_qual: per_base_qual_status,
        per_tile_qual: per_tile_status,
        per_seq_qual: per_seq_qual_status,
        per_base_content: per_base_content_status,
        per_seq_gc: per_seq_gc_status,
        per_base_n: per_base_n_status,
        length_dist: length_dist_status,
        duplication: duplication_status,
        overrepresented: overrep_status,
        kmer: Status::Pass,
        adapter: adapter_status,
    };

    ReportModel {
        basic,
        per_base_qual,
        quality_count: stats.quality_count,
        per_base_content,
        gc_count,
        theoretical_gc,
        gc_deviation,
        length_dist,
        duplication,
        overrepresented,
        adapter_names,
        adapter_content,
        tiles,
        statuses,
    }
}

/// Slot in the 16-bucket duplication histogram for an occurrence count.
fn dup_bucket(dup_level: u64) -> usize {
    match dup_level {
        level if level >= 10_000 => 15,
        level if level >= 5_000 => 14,
        level if level >= 1_000 => 13,
        level if level >= 500 => 12,
        level if level >= 100 => 11,
        level if level >= 50 => 10,
        level if level >= 10 => 9,
        level => (level - 1) as usize,
    }
}

/// Extrapolates an observed count of sequences with a given duplication
/// level to the counts a scan without the unique-key cap would have seen.
pub fn corrected_count(count_at_limit: u64, num_reads: u64, dup_level: u64, num_obs: u64) -> f64 {
    if count_at_limit == num_reads {
        return num_obs as f64;
    }
    // not enough remaining reads to hide another sequence at this level
    if num_reads - num_obs < count_at_limit {
        return num_obs as f64;
    }

    let mut p_not_seeing = 1.0f64;
    let limit_of_caring = 1.0 - num_obs as f64 / (num_obs as f64 + 0.01);
    for i in 0..count_at_limit {
        let remaining = (num_reads - i) as f64;
        p_not_seeing *= (remaining - dup_level as f64) / remaining;
        if p_not_seeing < limit_of_caring {
            p_not_seeing = 0.0;
            break;
        }
    }
    num_obs as f64 / (1.0 - p_not_seeing)
}

/// Fits a normal curve to the (smoothed) GC histogram and returns the
/// renormalized theoretical curve plus the L1 deviation divided by the
/// histogram total. Degenerate histograms (fewer than two counts, or zero
/// spread) report zero deviation.
fn gc_normal_deviation(gc_count: &[u64; 101]) -> ([f64; 101], f64) {
    let mut theoretical = [0.0f64; 101];
    let total: f64 = gc_count.iter().map(|&v| v as f64).sum();
    if total < 2.0 {
        return (theoretical, 0.0);
    }

    // weighted mean, which FastQC calls the mode
    let mut mode = 0.0f64;
    for (i, &count) in gc_count.iter().enumerate() {
        mode += (i as f64) * count as f64;
    }
    mode /= total;

    let mut stdev = 0.0f64;
    for (i, &count) in gc_count.iter().enumerate() {
        let z = mode - i as f64;
        stdev += z * z * count as f64;
    }
    stdev = (stdev / (total - 1.0)).sqrt();
    if stdev == 0.0 {
        return (theoretical, 0.0);
    }

    let mut theoretical_sum = 0.0f64;
    for (i, slot) in theoretical.iter_mut().enumerate() {
        let z = i as f64 - mode;
        *slot = (-(z * z) / (2.0 * stdev * stdev)).exp();
        theoretical_sum += *slot;
    }
    for slot in theoretical.iter_mut() {
        *slot = *slot * total / theoretical_sum;
    }

    let mut deviation = 0.0f64;
    for (i, &count) in gc_count.iter().enumerate() {
        deviation += (count as f64 - theoretical[i]).abs();
    }
    (theoretical, deviation / total)
}

/// Finds the first configured contaminant matching an overrepresented
/// sequence, in either containment direction.
struct ContaminantMatcher<'a> {
    contaminants: &'a [Contaminant],
    automaton: Option<AhoCorasick>,
}

impl<'a> ContaminantMatcher<'a> {
    fn new(contaminants: &'a [Contaminant]) -> Self {
        let automaton = if contaminants.is_empty() {
            None
        } else {
            AhoCorasick::new(contaminants.iter().map(|c| c.seq.as_slice())).ok()
        };
        Self {
            contaminants,
            automaton,
        }
    }

    fn best_hit(&self, seq: &[u8]) -> String {
        let mut contained = vec![false; self.contaminants.len()];
        if let Some(ac) = &self.automaton {
            for mat in ac.find_overlapping_iter(seq) {
                contained[mat.pattern().as_usize()] = true;
            }
        }
        for (i, c) in self.contaminants.iter().enumerate() {
            if seq.len() > c.seq.len() {
                if contained[i] {
                    return c.name.clone();
                }
            } else if memmem::find(&c.seq, seq).is_some() {
                return c.name.clone();
            }
        }
        "No Hit".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::QcConfig;
    use crate::core::stats::NUM_BASES;

    fn default_config() -> QcConfig {
        QcConfig::load(7, None, None, None).unwrap()
    }

    fn feed(stats: &mut FastqStats, seq: &[u8], qual: &[u8]) {
        stats.begin_read(None);
        for &b in seq {
            stats.sequence_byte(b);
        }
        stats.finish_sequence().unwrap();
        for &b in qual {
            stats.quality_byte(b).unwrap();
        }
        stats.finish_quality().unwrap();
        stats.finish_record();
    }

    #[test]
    fn empty_input_summarizes_cleanly() {
        let config = default_config();
        let stats = FastqStats::new(&config).unwrap();
        let model = summarize(&stats, &config);
        assert_eq!(model.basic.total_sequences, 0);
        assert_eq!(model.basic.avg_read_length, 0);
        assert_eq!(model.statuses.basic, Status::Pass);
        assert_eq!(model.statuses.per_seq_gc, Status::Pass);
        assert!(model.per_base_qual.is_empty());
        assert!(model.length_dist.is_empty());
    }

    #[test]
    fn single_record_summary() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        feed(&mut stats, b"ACGT", b"IIII");
        let model = summarize(&stats, &config);

        assert_eq!(model.basic.total_sequences, 1);
        assert_eq!(model.basic.avg_read_length, 4);
        assert_eq!(model.basic.total_bases, 4);
        assert!((model.basic.gc_percent - 50.0).abs() < 1e-9);
        assert_eq!(model.basic.num_poor, 0);
        assert_eq!(model.per_base_qual.len(), 4);
        for row in &model.per_base_qual {
            assert_eq!(row.median, 40);
            assert_eq!(row.lower_quartile, 40);
            assert_eq!(row.udecile, 40);
            assert!((row.mean - 40.0).abs() < 1e-9);
        }
        assert_eq!(model.length_dist, vec![LengthDistRow { length: 4, count: 1 }]);
    }

    #[test]
    fn base_percentages_sum_to_one_hundred() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        feed(&mut stats, b"ACGT", b"IIII");
        feed(&mut stats, b"NNGATTACA", b"IIIIIIIII");
        feed(&mut stats, b"AC", b"!!");
        let model = summarize(&stats, &config);
        for row in &model.per_base_content {
            let sum = row.a + row.c + row.t + row.g + row.n;
            assert!((sum - 100.0).abs() < 1e-6, "sum {} at base {}", sum, row.base);
        }
    }

    #[test]
    fn two_identical_records_give_fifty_percent_dedup() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        feed(&mut stats, b"AAAA", b"IIII");
        feed(&mut stats, b"AAAA", b"IIII");
        let model = summarize(&stats, &config);

        assert_eq!(stats.sequence_count.get(&b"AAAA"[..]), Some(&2));
        assert!((model.duplication.total_deduplicated_pct - 50.0).abs() < 1e-9);
        // the single distinct sequence was seen twice: bucket index 1
        assert!((model.duplication.percentage_total[1] - 100.0).abs() < 1e-9);
        assert!((model.duplication.percentage_deduplicated[1] - 100.0).abs() < 1e-9);
    }

    #[test]
    fn cumulative_reaches_into_long_tier() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        let len = NUM_BASES + 5;
        feed(&mut stats, &vec![b'A'; len], &vec![b'I'; len]);
        let model = summarize(&stats, &config);
        assert_eq!(model.basic.max_read_length, len);
        assert_eq!(model.per_base_qual.len(), len);
        // one read covers every position, including the long tier
        assert_eq!(model.per_base_qual[NUM_BASES].median, 40);
        assert_eq!(model.per_base_content[NUM_BASES].a, 100.0);
    }

    #[test]
    fn corrected_count_properties() {
        // no cap reached: identity
        assert_eq!(corrected_count(100, 100, 2, 7), 7.0);
        // corrected counts never shrink
        for &(limit, reads, level, obs) in
            &[(50u64, 200u64, 2u64, 10u64), (10, 1000, 3, 5), (100, 150, 1, 40)]
        {
            let c = corrected_count(limit, reads, level, obs);
            assert!(c >= obs as f64, "C({},{})={} < {}", level, obs, c, obs);
        }
        // monotone in the observed count
        let c5 = corrected_count(50, 1000, 2, 5);
        let c9 = corrected_count(50, 1000, 2, 9);
        assert!(c9 >= c5);
    }

    #[test]
    fn gc_smoothing_fills_interior_zeros() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        // GC percentages 25 and 75 leave a gap of zeros between them
        feed(&mut stats, b"ACTT", b"IIII");
        feed(&mut stats, b"CGGT", b"IIII");
        let model = summarize(&stats, &config);
        assert_eq!(model.gc_count[25], 1);
        assert_eq!(model.gc_count[75], 1);
        assert!(model.gc_deviation >= 0.0);
        let theoretical_total: f64 = model.theoretical_gc.iter().sum();
        let observed_total: f64 = model.gc_count.iter().map(|&v| v as f64).sum();
        assert!((theoretical_total - observed_total).abs() < 1e-6);
    }

    #[test]
    fn gc_deviation_degenerate_histograms() {
        let mut gc = [0u64; 101];
        let (_, dev) = gc_normal_deviation(&gc);
        assert_eq!(dev, 0.0);
        gc[50] = 5;
        let (_, dev) = gc_normal_deviation(&gc);
        assert_eq!(dev, 0.0);
    }

    #[test]
    fn overrepresented_sorted_and_labelled() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        for _ in 0..3 {
            feed(&mut stats, b"CCCCCCCC", b"IIIIIIII");
        }
        for _ in 0..5 {
            feed(&mut stats, b"GATTACAA", b"IIIIIIII");
        }
        let model = summarize(&stats, &config);
        assert_eq!(model.overrepresented.len(), 2);
        assert_eq!(model.overrepresented[0].sequence, "GATTACAA");
        assert_eq!(model.overrepresented[0].count, 5);
        assert_eq!(model.overrepresented[1].count, 3);
        assert_eq!(model.overrepresented[1].source, "No Hit");
        assert_eq!(model.statuses.overrepresented, Status::Fail);
    }

    #[test]
    fn contaminant_matching_is_bidirectional() {
        let contaminants = vec![
            Contaminant {
                name: "Shorty".into(),
                seq: b"ACGT".to_vec(),
            },
            Contaminant {
                name: "Longy".into(),
                seq: b"TTTTACGTACGTTTTT".to_vec(),
            },
        ];
        let matcher = ContaminantMatcher::new(&contaminants);
        // contaminant contained in the sequence
        assert_eq!(matcher.best_hit(b"GGACGTGG"), "Shorty");
        // sequence contained in the contaminant
        assert_eq!(matcher.best_hit(b"TTTTACGTACG"), "Longy");
        assert_eq!(matcher.best_hit(b"CCCCCCCC"), "No Hit");
    }

    #[test]
    fn adapter_percentages_are_cumulative() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        // record 0 is k-mer sampled; start with the Illumina universal prefix
        let seq = b"AGATCGGAAGAGCACACGTC";
        feed(&mut stats, seq, &vec![b'I'; seq.len()]);
        let model = summarize(&stats, &config);

        let universal = 0; // first adapter in the builtin list
        let last = model.adapter_content.last().unwrap();
        assert!(last.values[universal] > 0.0);
        for pair in model.adapter_content.windows(2) {
            assert!(pair[1].values[universal] >= pair[0].values[universal]);
        }
    }

    #[test]
    fn tile_deviation_is_mean_relative() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        stats.activate_tiles();
        for (tile, qual) in [(1101usize, b'I'), (1102, b'!')] {
            stats.begin_read(Some(tile));
            for &b in b"AAAA" {
                stats.sequence_byte(b);
            }
            stats.finish_sequence().unwrap();
            for _ in 0..4 {
                stats.quality_byte(qual).unwrap();
            }
            stats.finish_quality().unwrap();
            stats.finish_record();
        }
        let model = summarize(&stats, &config);
        assert_eq!(model.tiles.len(), 2);
        let hi = model.tiles.iter().find(|t| t.tile == 1101).unwrap();
        let lo = model.tiles.iter().find(|t| t.tile == 1102).unwrap();
        // mean over both reads is 20, so deviations are +20 and -20
        assert!((hi.deviations[0] - 20.0).abs() < 1e-9);
        assert!((lo.deviations[0] + 20.0).abs() < 1e-9);
        assert_eq!(model.statuses.per_tile_qual, Status::Fail);
    }

    #[test]
    fn summarization_is_idempotent() {
        let config = default_config();
        let mut stats = FastqStats::new(&config).unwrap();
        feed(&mut stats, b"ACGT", b"IIII");
        feed(&mut stats, b"GGGG", b"!!!!");
        let first = summarize(&stats, &config);
        let second = summarize(&stats, &config);
        assert_eq!(first, second);
    }
}
