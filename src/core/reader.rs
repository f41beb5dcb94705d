use crate::core::io::{GzLineReader, InputFormat, MmapSource};
use crate::core::stats::{FastqStats, NUM_TILES};
use crate::error::{QcError, Result};
use memchr::{memchr, memchr2};
use std::path::{Path, PathBuf};

/// Number of tab-delimited alignment metadata fields between the identifier
/// and the sequence field.
const SAM_SKIP_FIELDS: usize = 8;

/// Tracks the colon split point used to pull a tile number out of read
/// identifiers. The first sampled header only resolves the split point; a
/// value is parsed from later sampled headers.
struct TileTracker {
    enabled: bool,
    ignore: bool,
    split_point: Option<usize>,
}

impl TileTracker {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ignore: false,
            split_point: None,
        }
    }

    /// Inspects a sampled header, returning the tile for this record if one
    /// could be parsed. Headers with too few colons disable per-tile
    /// statistics for the rest of the run.
    fn observe(&mut self, stats: &mut FastqStats, header: &[u8]) -> Option<usize> {
        if !self.enabled || self.ignore || !stats.is_tile_record() {
            return None;
        }
        match self.split_point {
            None => {
                let colons = header.iter().filter(|&&b| b == b':').count();
                if colons >= 6 {
                    self.split_point = Some(4);
                } else if colons >= 4 {
                    self.split_point = Some(2);
                } else {
                    self.ignore = true;
                    return None;
                }
                stats.activate_tiles();
                None
            }
            Some(split) => {
                let tile = parse_tile_field(header, split)?;
                if tile == 0 || tile >= NUM_TILES {
                    None
                } else {
                    Some(tile)
                }
            }
        }
    }
}

/// Parses the decimal value of the colon-delimited field that follows
/// `split` colons. A field with any non-digit byte yields no tile.
fn parse_tile_field(header: &[u8], split: usize) -> Option<usize> {
    let mut colons = 0;
    let mut iter = header.iter();
    if split > 0 {
        for &b in iter.by_ref() {
            if b == b':' {
                colons += 1;
                if colons == split {
                    break;
                }
            }
        }
        if colons < split {
            return None;
        }
    }
    let mut value: usize = 0;
    let mut digits = 0;
    for &b in iter {
        if b == b':' {
            break;
        }
        if !b.is_ascii_digit() {
            return None;
        }
        value = value.wrapping_mul(10).wrapping_add((b - b'0') as usize);
        digits += 1;
    }
    if digits == 0 {
        None
    } else {
        Some(value)
    }
}

/// Feeds one record's fields through the accumulator, byte by byte.
fn process_record(
    stats: &mut FastqStats,
    tile: &mut TileTracker,
    header: &[u8],
    seq: &[u8],
    qual: &[u8],
) -> Result<()> {
    let tile_value = tile.observe(stats, header);
    stats.begin_read(tile_value);
    for &b in seq {
        stats.sequence_byte(b);
    }
    stats.finish_sequence()?;
    for &b in qual {
        stats.quality_byte(b)?;
    }
    stats.finish_quality()?;
    stats.finish_record();
    Ok(())
}

/// Forward cursor over a memory-mapped plain or alignment file.
pub struct MappedReader {
    source: MmapSource,
    pos: usize,
    layout: InputFormat,
    tile: TileTracker,
}

impl MappedReader {
    pub fn open(path: &Path, layout: InputFormat, tile_enabled: bool) -> Result<Self> {
        Ok(Self {
            source: MmapSource::open(path)?,
            pos: 0,
            layout,
            tile: TileTracker::new(tile_enabled),
        })
    }

    pub fn next_record(&mut self, stats: &mut FastqStats) -> Result<bool> {
        let data = self.source.bytes();
        let mut pos = self.pos;
        while pos < data.len() && data[pos] == b'\n' {
            pos += 1;
        }
        if pos >= data.len() {
            self.pos = pos;
            return Ok(false);
        }
        let consumed = match self.layout {
            InputFormat::Sam => sam_record(data, pos, stats, &mut self.tile)?,
            _ => fastq_record(data, pos, stats, &mut self.tile)?,
        };
        self.pos = consumed;
        Ok(true)
    }
}

fn line_end(data: &[u8], pos: usize) -> usize {
    memchr(b'\n', &data[pos..]).map_or(data.len(), |i| pos + i)
}

/// One four-line plain record starting at `pos`. Returns the cursor position
/// after the record.
fn fastq_record(
    data: &[u8],
    mut pos: usize,
    stats: &mut FastqStats,
    tile: &mut TileTracker,
) -> Result<usize> {
    let record = stats.num_reads + 1;

    let header_end = line_end(data, pos);
    let header = &data[pos..header_end];
    pos = header_end + 1;
    if pos >= data.len() {
        return Err(QcError::malformed(record, "file ends mid-record"));
    }

    let seq_end = line_end(data, pos);
    let seq = &data[pos..seq_end];
    pos = seq_end + 1;
    if pos >= data.len() {
        return Err(QcError::malformed(record, "file ends mid-record"));
    }

    // quality descriptor line, skipped entirely
    pos = line_end(data, pos) + 1;
    if pos > data.len() {
        return Err(QcError::malformed(record, "file ends mid-record"));
    }

    let qual_end = line_end(data, pos);
    let qual = &data[pos..qual_end];
    pos = qual_end + 1;

    process_record(stats, tile, header, seq, qual)?;
    Ok(pos.min(data.len()))
}

/// One tab-delimited alignment record starting at `pos`. Lines starting with
/// `@` (stream header) are skipped. Returns the cursor position after the
/// record.
fn sam_record(
    data: &[u8],
    mut pos: usize,
    stats: &mut FastqStats,
    tile: &mut TileTracker,
) -> Result<usize> {
    while pos < data.len() && data[pos] == b'@' {
        pos = line_end(data, pos) + 1;
        while pos < data.len() && data[pos] == b'\n' {
            pos += 1;
        }
    }
    if pos >= data.len() {
        return Ok(data.len());
    }
    let record = stats.num_reads + 1;

    let field = |pos: usize| -> Option<(usize, usize)> {
        let end = memchr2(b'\t', b'\n', &data[pos..]).map(|i| pos + i)?;
        if data[end] != b'\t' {
            return None;
        }
        Some((end, end + 1))
    };

    let (header_end, mut next) =
        field(pos).ok_or_else(|| QcError::malformed(record, "truncated alignment record"))?;
    let header = &data[pos..header_end];

    for _ in 0..SAM_SKIP_FIELDS {
        let (_, n) =
            field(next).ok_or_else(|| QcError::malformed(record, "truncated alignment record"))?;
        next = n;
    }

    let (seq_end, qual_start) =
        field(next).ok_or_else(|| QcError::malformed(record, "truncated alignment record"))?;
    let seq = &data[next..seq_end];

    // quality runs to the next tab (optional tags follow) or to the newline
    let qual_end = memchr2(b'\t', b'\n', &data[qual_start..])
        .map_or(data.len(), |i| qual_start + i);
    let qual = &data[qual_start..qual_end];

    process_record(stats, tile, header, seq, qual)?;
    Ok(line_end(data, qual_end) + 1)
}

/// Streamed gzip-compressed plain records, four lines per record.
pub struct GzReader {
    lines: GzLineReader,
    path: PathBuf,
    tile: TileTracker,
    header: Vec<u8>,
    seq: Vec<u8>,
    plus: Vec<u8>,
    qual: Vec<u8>,
}

impl GzReader {
    pub fn open(path: &Path, tile_enabled: bool) -> Result<Self> {
        Ok(Self {
            lines: GzLineReader::open(path)?,
            path: path.to_path_buf(),
            tile: TileTracker::new(tile_enabled),
            header: Vec::new(),
            seq: Vec::new(),
            plus: Vec::new(),
            qual: Vec::new(),
        })
    }

    pub fn next_record(&mut self, stats: &mut FastqStats) -> Result<bool> {
        loop {
            if !self.lines.next_line(&self.path, &mut self.header)? {
                return Ok(false);
            }
            if !self.header.is_empty() {
                break;
            }
        }
        let record = stats.num_reads + 1;
        if !self.lines.next_line(&self.path, &mut self.seq)?
            || !self.lines.next_line(&self.path, &mut self.plus)?
        {
            return Err(QcError::malformed(record, "file ends mid-record"));
        }
        if !self.lines.next_line(&self.path, &mut self.qual)? {
            self.qual.clear();
        }
        process_record(stats, &mut self.tile, &self.header, &self.seq, &self.qual)?;
        Ok(true)
    }
}

/// Format-dispatched record reader.
pub enum RecordReader {
    Mapped(MappedReader),
    Gz(GzReader),
}

impl RecordReader {
    pub fn open(path: &Path, format: InputFormat, tile_enabled: bool) -> Result<Self> {
        match format {
            InputFormat::FastqGz => Ok(RecordReader::Gz(GzReader::open(path, tile_enabled)?)),
            other => Ok(RecordReader::Mapped(MappedReader::open(
                path,
                other,
                tile_enabled,
            )?)),
        }
    }

    /// Consumes one record. Returns false at end of input.
    pub fn next_record(&mut self, stats: &mut FastqStats) -> Result<bool> {
        match self {
            RecordReader::Mapped(r) => r.next_record(stats),
            RecordReader::Gz(r) => r.next_record(stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::QcConfig;
    use crate::core::stats::nuc_index;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::fs;
    use std::io::Write;

    fn stats() -> FastqStats {
        let config = QcConfig::load(4, None, None, None).unwrap();
        FastqStats::new(&config).unwrap()
    }

    fn scan(reader: &mut RecordReader, stats: &mut FastqStats) -> Result<()> {
        while reader.next_record(stats)? {}
        Ok(())
    }

    fn write_temp(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn plain_records_are_tokenized() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(
            &dir,
            "reads.fastq",
            b"@r1\nACGT\n+\nIIII\n@r2\nAACC\n+anything\nII!!\n",
        );
        let mut reader = RecordReader::open(&path, InputFormat::Fastq, true).unwrap();
        let mut st = stats();
        scan(&mut reader, &mut st).unwrap();

        assert_eq!(st.num_reads, 2);
        assert_eq!(st.base_count_at(0, nuc_index(b'A')), 2);
        assert_eq!(st.base_count_at(1, nuc_index(b'C')), 1);
        assert_eq!(st.position_quality_at(3, 0), 1);
        assert_eq!(st.position_quality_at(3, 40), 1);
    }

    #[test]
    fn missing_trailing_newline_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "reads.fastq", b"@r1\nACGT\n+\nIIII");
        let mut reader = RecordReader::open(&path, InputFormat::Fastq, true).unwrap();
        let mut st = stats();
        scan(&mut reader, &mut st).unwrap();
        assert_eq!(st.num_reads, 1);
        assert_eq!(st.quality_count[40], 1);
    }

    #[test]
    fn truncated_record_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        for contents in [&b"@r1\nACGT"[..], b"@r1\nACGT\n+\n"] {
            let path = write_temp(&dir, "broken.fastq", contents);
            let mut reader = RecordReader::open(&path, InputFormat::Fastq, true).unwrap();
            let mut st = stats();
            assert!(matches!(
                scan(&mut reader, &mut st),
                Err(QcError::MalformedRecord { .. })
            ));
        }
    }

    #[test]
    fn length_mismatch_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "reads.fastq", b"@r1\nACGT\n+\nII\n");
        let mut reader = RecordReader::open(&path, InputFormat::Fastq, true).unwrap();
        let mut st = stats();
        assert!(matches!(
            scan(&mut reader, &mut st),
            Err(QcError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn empty_input_yields_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "empty.fastq", b"");
        let mut reader = RecordReader::open(&path, InputFormat::Fastq, true).unwrap();
        let mut st = stats();
        scan(&mut reader, &mut st).unwrap();
        assert_eq!(st.num_reads, 0);
    }

    #[test]
    fn tile_split_point_resolution_and_value() {
        // first sampled header (record 0) resolves the split point; the next
        // sampled header (record 8) contributes a tile value
        let mut body = Vec::new();
        for i in 0..9 {
            write!(body, "@inst:20:FC:3:2104:{}:99\nACGT\n+\nIIII\n", i).unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "reads.fastq", &body);
        let mut reader = RecordReader::open(&path, InputFormat::Fastq, true).unwrap();
        let mut st = stats();
        scan(&mut reader, &mut st).unwrap();

        assert_eq!(st.num_reads, 9);
        assert!(st.tile_active());
        assert_eq!(st.tile_counts()[2104], 1);
        assert_eq!(st.tile_quality_at(0, 2104), 40.0);
    }

    #[test]
    fn few_colons_disable_tiles_for_the_run() {
        let mut body = Vec::new();
        for i in 0..9 {
            write!(body, "@r{}\nACGT\n+\nIIII\n", i).unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "reads.fastq", &body);
        let mut reader = RecordReader::open(&path, InputFormat::Fastq, true).unwrap();
        let mut st = stats();
        scan(&mut reader, &mut st).unwrap();
        assert!(!st.tile_active());
        assert_eq!(st.tile_counts().iter().sum::<u64>(), 0);
    }

    #[test]
    fn oversized_tile_values_are_dropped() {
        let mut body = Vec::new();
        for i in 0..9 {
            write!(body, "@inst:20:FC:3:70000:{}:99\nACGT\n+\nIIII\n", i).unwrap();
        }
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "reads.fastq", &body);
        let mut reader = RecordReader::open(&path, InputFormat::Fastq, true).unwrap();
        let mut st = stats();
        scan(&mut reader, &mut st).unwrap();
        assert_eq!(st.tile_counts().iter().sum::<u64>(), 0);
    }

    #[test]
    fn sam_records_skip_metadata_fields() {
        let sam = b"@HD\tVN:1.6\n@SQ\tSN:chr1\tLN:1000\n\
r1\t0\tchr1\t100\t60\t4M\t*\t0\t0\tACGT\tIIII\tNM:i:0\n\
r2\t16\tchr1\t200\t60\t4M\t*\t0\t0\tAACC\tII!!\n";
        let dir = tempfile::tempdir().unwrap();
        let path = write_temp(&dir, "aln.sam", sam);
        let mut reader = RecordReader::open(&path, InputFormat::Sam, true).unwrap();
        let mut st = stats();
        scan(&mut reader, &mut st).unwrap();

        assert_eq!(st.num_reads, 2);
        assert_eq!(st.base_count_at(0, nuc_index(b'A')), 2);
        assert_eq!(st.position_quality_at(3, 0), 1);
        assert_eq!(st.quality_count[40], 1);
    }

    #[test]
    fn gz_records_match_plain() {
        let body = b"@r1\nACGT\n+\nIIII\n@r2\nNNNN\n+\n!!!!\n";
        let dir = tempfile::tempdir().unwrap();
        let gz_path = dir.path().join("reads.fastq.gz");
        let mut enc = GzEncoder::new(fs::File::create(&gz_path).unwrap(), Compression::default());
        enc.write_all(body).unwrap();
        enc.finish().unwrap();

        let mut reader = RecordReader::open(&gz_path, InputFormat::FastqGz, true).unwrap();
        let mut gz_stats = stats();
        scan(&mut reader, &mut gz_stats).unwrap();

        let plain_path = write_temp(&dir, "reads.fastq", body);
        let mut reader = RecordReader::open(&plain_path, InputFormat::Fastq, true).unwrap();
        let mut plain_stats = stats();
        scan(&mut reader, &mut plain_stats).unwrap();

        assert_eq!(gz_stats.num_reads, plain_stats.num_reads);
        assert_eq!(gz_stats.gc_count, plain_stats.gc_count);
        assert_eq!(gz_stats.quality_count, plain_stats.quality_count);
        for p in 0..4 {
            assert_eq!(gz_stats.n_base_count_at(p), plain_stats.n_base_count_at(p));
        }
    }

    #[test]
    fn tile_field_parser() {
        assert_eq!(parse_tile_field(b"@a:b:2104:x", 2), Some(2104));
        assert_eq!(parse_tile_field(b"@a:b:21x4:x", 2), None);
        assert_eq!(parse_tile_field(b"@a:b", 2), None);
        assert_eq!(parse_tile_field(b"@i:20:FC:3:2104:55:99", 4), Some(2104));
    }
}
