use crate::core::config::QcConfig;
use crate::error::{QcError, Result};
use std::collections::HashMap;

/// Positions held in fixed-length arrays; anything beyond spills into the
/// dynamically grown long tier.
pub const NUM_BASES: usize = 1000;

/// Nucleotide alphabet size (A = 00, C = 01, T = 10, G = 11).
pub const NUM_NUCLEOTIDES: usize = 4;

/// Smallest power of two covering all quality values after offset removal.
pub const NUM_QUALITY_VALUES: usize = 64;

/// Tile identifiers above this value are dropped.
pub const NUM_TILES: usize = 65536;

/// K-mer statistics are only kept for positions below this bound.
pub const KMER_MAX_BASES: usize = 500;

/// Unique keys admitted to the duplication map before new keys are refused.
pub const DUP_UNIQUE_CUTOFF: u64 = 100_000;

/// Reads longer than this are keyed by a truncated prefix.
pub const DUP_READ_MAX_SIZE: usize = 75;

/// Prefix length used for reads that exceed `DUP_READ_MAX_SIZE`.
pub const DUP_READ_TRUNCATE_SIZE: usize = 50;

/// Two-bit nucleotide index from bits 1-2 of the ASCII byte. Everything that
/// is not a literal 'N' is classified by this extraction, as FastQC does
/// (so 'U' or lower-case letters land on whatever index their bit pattern
/// gives).
#[inline(always)]
pub fn nuc_index(b: u8) -> usize {
    ((b >> 1) & 3) as usize
}

fn log2_exact(value: usize) -> Result<u32> {
    if !value.is_power_of_two() {
        return Err(QcError::InvariantViolation(format!(
            "{} is not a power of two",
            value
        )));
    }
    Ok(value.trailing_zeros())
}

/// Position-indexed buffers for reads longer than `NUM_BASES`. All buffers
/// grow one logical position at a time in lockstep so their lengths stay
/// matched.
#[derive(Default)]
struct LongTier {
    positions: usize,
    base_count: Vec<u64>,
    n_base_count: Vec<u64>,
    base_quality: Vec<u64>,
    n_base_quality: Vec<u64>,
    position_quality_count: Vec<u64>,
    read_length_freq: Vec<u64>,
    tile_quality: Vec<f64>,
}

impl LongTier {
    fn ensure(&mut self, pos: usize, tiles: bool) {
        while self.positions <= pos {
            self.base_count.resize(self.base_count.len() + NUM_NUCLEOTIDES, 0);
            self.n_base_count.push(0);
            self.base_quality
                .resize(self.base_quality.len() + NUM_NUCLEOTIDES, 0);
            self.n_base_quality.push(0);
            self.position_quality_count
                .resize(self.position_quality_count.len() + NUM_QUALITY_VALUES, 0);
            self.read_length_freq.push(0);
            if tiles {
                self.tile_quality
                    .resize(self.tile_quality.len() + NUM_TILES, 0.0);
            }
            self.positions += 1;
        }
    }
}

/// Streaming statistics accumulator. Created once per input, fed byte by
/// byte by the tokenizer, frozen at scan end and handed to the summarizer.
pub struct FastqStats {
    // analysis switches from the limits configuration
    kmer_size: usize,
    kmer_mask: u64,
    quality_offset: u8,
    do_kmer: bool,
    do_tile: bool,
    do_duplication: bool,
    tile_active: bool,

    shift_nucleotide: u32,
    shift_quality: u32,
    shift_tile: u32,
    shift_kmer: u32,

    pub num_reads: u64,
    pub max_read_length: usize,
    pub num_unique_seen: u64,
    pub count_at_limit: u64,

    // fixed tier, indexed by read position
    base_count: Box<[u64]>,
    n_base_count: Box<[u64]>,
    base_quality: Box<[u64]>,
    n_base_quality: Box<[u64]>,
    position_quality_count: Box<[u64]>,
    read_length_freq: Box<[u64]>,
    tile_quality: Option<Box<[f64]>>,

    long: LongTier,

    // per-sequence accumulators
    pub quality_count: [u64; NUM_QUALITY_VALUES],
    pub gc_count: [u64; 101],
    tile_count: Box<[u64]>,
    kmer_count: Box<[u64]>,
    pub sequence_count: HashMap<Vec<u8>, u64>,

    // per-record scratch shared by the sequence and quality hot loops
    seq_buf: Box<[u8]>,
    spill_buf: Vec<u8>,
    read_pos: usize,
    qual_pos: usize,
    cur_gc: u64,
    cur_quality_sum: u64,
    cur_kmer: u64,
    bases_after_n: usize,
    cur_tile: Option<usize>,
    kmer_record: bool,
}

impl FastqStats {
    pub fn new(config: &QcConfig) -> Result<Self> {
        let shift_nucleotide = log2_exact(NUM_NUCLEOTIDES)?;
        let shift_quality = log2_exact(NUM_QUALITY_VALUES)?;
        let shift_tile = log2_exact(NUM_TILES)?;
        let shift_kmer = 2 * config.kmer_size as u32;
        let kmer_mask = (1u64 << shift_kmer) - 1;
        let kmer_positions = NUM_BASES.min(KMER_MAX_BASES);

        let limits = &config.limits;
        Ok(Self {
            kmer_size: config.kmer_size,
            kmer_mask,
            quality_offset: config.quality_offset,
            do_kmer: !limits.kmer.ignore,
            do_tile: !limits.tile.ignore,
            do_duplication: !(limits.duplication.ignore && limits.overrepresented.ignore),
            tile_active: false,

            shift_nucleotide,
            shift_quality,
            shift_tile,
            shift_kmer,

            num_reads: 0,
            max_read_length: 0,
            num_unique_seen: 0,
            count_at_limit: 0,

            base_count: vec![0; NUM_BASES * NUM_NUCLEOTIDES].into_boxed_slice(),
            n_base_count: vec![0; NUM_BASES].into_boxed_slice(),
            base_quality: vec![0; NUM_BASES * NUM_NUCLEOTIDES].into_boxed_slice(),
            n_base_quality: vec![0; NUM_BASES].into_boxed_slice(),
            position_quality_count: vec![0; NUM_BASES * NUM_QUALITY_VALUES].into_boxed_slice(),
            read_length_freq: vec![0; NUM_BASES].into_boxed_slice(),
            tile_quality: None,

            long: LongTier::default(),

            quality_count: [0; NUM_QUALITY_VALUES],
            gc_count: [0; 101],
            tile_count: vec![0; NUM_TILES].into_boxed_slice(),
            kmer_count: vec![0; kmer_positions << shift_kmer].into_boxed_slice(),
            sequence_count: HashMap::new(),

            seq_buf: vec![0; NUM_BASES].into_boxed_slice(),
            spill_buf: Vec::new(),
            read_pos: 0,
            qual_pos: 0,
            cur_gc: 0,
            cur_quality_sum: 0,
            cur_kmer: 0,
            bases_after_n: 1,
            cur_tile: None,
            kmer_record: false,
        })
    }

    pub fn kmer_size(&self) -> usize {
        self.kmer_size
    }

    /// K-mer work is sampled: only records whose index has its low 5 bits
    /// clear contribute.
    #[inline]
    pub fn is_kmer_record(&self) -> bool {
        self.num_reads & 31 == 0
    }

    /// Tile work is sampled every 8th record.
    #[inline]
    pub fn is_tile_record(&self) -> bool {
        self.num_reads & 7 == 0
    }

    pub fn tile_enabled(&self) -> bool {
        self.do_tile
    }

    pub fn tile_active(&self) -> bool {
        self.tile_active
    }

    /// Called by the tokenizer once a tile split point has been resolved.
    /// Allocates the fixed-tier tile buffer and backfills the long tier so
    /// all long buffers stay length-matched.
    pub fn activate_tiles(&mut self) {
        if !self.do_tile || self.tile_active {
            return;
        }
        self.tile_active = true;
        self.tile_quality = Some(vec![0.0; NUM_BASES * NUM_TILES].into_boxed_slice());
        self.long
            .tile_quality
            .resize(self.long.positions * NUM_TILES, 0.0);
    }

    pub fn begin_read(&mut self, tile: Option<usize>) {
        self.read_pos = 0;
        self.qual_pos = 0;
        self.cur_gc = 0;
        self.cur_quality_sum = 0;
        self.cur_kmer = 0;
        self.bases_after_n = 1;
        self.spill_buf.clear();
        self.cur_tile = tile;
        self.kmer_record = self.do_kmer && self.is_kmer_record();
    }

    /// Sequence ingestion, one byte per call.
    #[inline]
    pub fn sequence_byte(&mut self, b: u8) {
        let p = self.read_pos;
        if p < NUM_BASES {
            self.seq_buf[p] = b;
            if b == b'N' {
                self.n_base_count[p] += 1;
                // restart the rolling k-mer window
                self.bases_after_n = 1;
            } else {
                let ind = nuc_index(b);
                self.cur_gc += (ind & 1) as u64;
                self.base_count[(p << self.shift_nucleotide) | ind] += 1;
                if self.kmer_record && p < KMER_MAX_BASES {
                    self.cur_kmer = (self.cur_kmer << self.shift_nucleotide) | ind as u64;
                    if self.bases_after_n == self.kmer_size {
                        let idx =
                            ((p as u64) << self.shift_kmer) | (self.cur_kmer & self.kmer_mask);
                        self.kmer_count[idx as usize] += 1;
                    } else {
                        self.bases_after_n += 1;
                    }
                }
            }
        } else {
            let lp = p - NUM_BASES;
            self.long.ensure(lp, self.tile_active);
            self.spill_buf.push(b);
            if b == b'N' {
                self.long.n_base_count[lp] += 1;
                self.bases_after_n = 1;
            } else {
                let ind = nuc_index(b);
                self.cur_gc += (ind & 1) as u64;
                self.long.base_count[(lp << self.shift_nucleotide) | ind] += 1;
                // no k-mer statistics outside the fixed tier
            }
        }
        self.read_pos += 1;
    }

    /// Closes the sequence line: length histogram, maximum length, GC bin.
    pub fn finish_sequence(&mut self) -> Result<()> {
        let len = self.read_pos;
        if len == 0 {
            return Err(QcError::malformed(self.num_reads + 1, "empty sequence line"));
        }
        if len <= NUM_BASES {
            self.read_length_freq[len - 1] += 1;
        } else {
            self.long.read_length_freq[len - 1 - NUM_BASES] += 1;
        }
        if len > self.max_read_length {
            self.max_read_length = len;
        }
        let gc_pct = (100.0 * self.cur_gc as f64 / len as f64).round() as usize;
        self.gc_count[gc_pct] += 1;
        Ok(())
    }

    /// Quality ingestion, one byte per call, paired with the buffered
    /// nucleotide at the same position.
    #[inline]
    pub fn quality_byte(&mut self, b: u8) -> Result<()> {
        let p = self.qual_pos;
        if p >= self.read_pos {
            return Err(QcError::malformed(
                self.num_reads + 1,
                "quality line longer than sequence line",
            ));
        }
        if b < self.quality_offset {
            return Err(QcError::malformed(
                self.num_reads + 1,
                format!("quality byte {:#04x} below offset", b),
            ));
        }
        let q = (b - self.quality_offset) as usize;
        if q >= NUM_QUALITY_VALUES {
            return Err(QcError::malformed(
                self.num_reads + 1,
                format!("quality value {} out of range", q),
            ));
        }

        if p < NUM_BASES {
            let base = self.seq_buf[p];
            self.position_quality_count[(p << self.shift_quality) | q] += 1;
            if base == b'N' {
                self.n_base_quality[p] += q as u64;
            } else {
                self.base_quality[(p << self.shift_nucleotide) | nuc_index(base)] += q as u64;
            }
            if let Some(t) = self.cur_tile {
                if let Some(tq) = self.tile_quality.as_mut() {
                    tq[(p << self.shift_tile) | t] += q as f64;
                }
            }
        } else {
            let lp = p - NUM_BASES;
            let base = self.spill_buf[lp];
            self.long.position_quality_count[(lp << self.shift_quality) | q] += 1;
            if base == b'N' {
                self.long.n_base_quality[lp] += q as u64;
            } else {
                self.long.base_quality[(lp << self.shift_nucleotide) | nuc_index(base)] +=
                    q as u64;
            }
            if self.tile_active {
                if let Some(t) = self.cur_tile {
                    self.long.tile_quality[(lp << self.shift_tile) | t] += q as f64;
                }
            }
        }
        self.cur_quality_sum += q as u64;
        self.qual_pos += 1;
        Ok(())
    }

    /// Closes the quality line, enforcing equal sequence/quality lengths and
    /// binning the truncated mean quality.
    pub fn finish_quality(&mut self) -> Result<()> {
        if self.qual_pos != self.read_pos {
            return Err(QcError::malformed(
                self.num_reads + 1,
                format!(
                    "sequence length {} does not match quality length {}",
                    self.read_pos, self.qual_pos
                ),
            ));
        }
        self.quality_count[(self.cur_quality_sum / self.read_pos as u64) as usize] += 1;
        Ok(())
    }

    /// Closes the record: read counter, duplication prefix map, tile count.
    /// The read counter is bumped first so `count_at_limit == num_reads`
    /// holds whenever the unique-key cap is never reached.
    pub fn finish_record(&mut self) {
        self.num_reads += 1;

        if self.do_duplication {
            let len = self.read_pos;
            let prefix_len = if len > DUP_READ_MAX_SIZE {
                DUP_READ_TRUNCATE_SIZE
            } else {
                len
            };
            let prefix = &self.seq_buf[..prefix_len];
            if let Some(count) = self.sequence_count.get_mut(prefix) {
                *count += 1;
                if self.num_unique_seen < DUP_UNIQUE_CUTOFF {
                    self.count_at_limit = self.num_reads;
                }
            } else if self.num_unique_seen != DUP_UNIQUE_CUTOFF {
                self.sequence_count.insert(prefix.to_vec(), 1);
                self.count_at_limit = self.num_reads;
                self.num_unique_seen += 1;
            }
        }

        if let Some(t) = self.cur_tile {
            self.tile_count[t] += 1;
        }
    }

    // tier-bridging accessors used by the summarizer and tests

    pub fn base_count_at(&self, p: usize, ind: usize) -> u64 {
        if p < NUM_BASES {
            self.base_count[(p << self.shift_nucleotide) | ind]
        } else {
            self.long.base_count[((p - NUM_BASES) << self.shift_nucleotide) | ind]
        }
    }

    pub fn n_base_count_at(&self, p: usize) -> u64 {
        if p < NUM_BASES {
            self.n_base_count[p]
        } else {
            self.long.n_base_count[p - NUM_BASES]
        }
    }

    pub fn base_quality_at(&self, p: usize, ind: usize) -> u64 {
        if p < NUM_BASES {
            self.base_quality[(p << self.shift_nucleotide) | ind]
        } else {
            self.long.base_quality[((p - NUM_BASES) << self.shift_nucleotide) | ind]
        }
    }

    pub fn n_base_quality_at(&self, p: usize) -> u64 {
        if p < NUM_BASES {
            self.n_base_quality[p]
        } else {
            self.long.n_base_quality[p - NUM_BASES]
        }
    }

    pub fn position_quality_at(&self, p: usize, q: usize) -> u64 {
        if p < NUM_BASES {
            self.position_quality_count[(p << self.shift_quality) | q]
        } else {
            self.long.position_quality_count[((p - NUM_BASES) << self.shift_quality) | q]
        }
    }

    pub fn read_length_freq_at(&self, p: usize) -> u64 {
        if p < NUM_BASES {
            self.read_length_freq[p]
        } else {
            self.long.read_length_freq[p - NUM_BASES]
        }
    }

    pub fn tile_quality_at(&self, p: usize, t: usize) -> f64 {
        if p < NUM_BASES {
            match &self.tile_quality {
                Some(tq) => tq[(p << self.shift_tile) | t],
                None => 0.0,
            }
        } else {
            self.long.tile_quality[((p - NUM_BASES) << self.shift_tile) | t]
        }
    }

    pub fn tile_counts(&self) -> &[u64] {
        &self.tile_count
    }

    pub fn kmer_count_at(&self, p: usize, hash: u64) -> u64 {
        self.kmer_count[(((p as u64) << self.shift_kmer) | hash) as usize]
    }
}
