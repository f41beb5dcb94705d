use crate::error::{QcError, Result};
use flate2::read::MultiGzDecoder;
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Decompressed bytes are pulled in chunks of at most this size.
pub const GZ_CHUNK_SIZE: usize = 16 * 1024;

/// Input layout, normally decided by the filename suffix.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum InputFormat {
    /// Four-line records, memory-mapped.
    Fastq,
    /// Four-line records behind a gzip stream.
    FastqGz,
    /// Tab-delimited alignment records, memory-mapped.
    Sam,
}

/// Picks the input format from the filename suffix: `.sam` and `.bam` select
/// the alignment layout, `.gz` the streamed plain layout, anything else the
/// mapped plain layout.
pub fn detect_format(path: &Path) -> InputFormat {
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if name.ends_with(".sam") || name.ends_with(".bam") {
        InputFormat::Sam
    } else if name.ends_with(".gz") {
        InputFormat::FastqGz
    } else {
        InputFormat::Fastq
    }
}

/// Read-only mapping of an input file. The last byte address is fixed at
/// open time. Zero-length files map to an empty slice instead of failing.
pub struct MmapSource {
    mmap: Option<Mmap>,
}

impl MmapSource {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| QcError::io(path, e))?;
        let len = file.metadata().map_err(|e| QcError::io(path, e))?.len();
        if len == 0 {
            return Ok(Self { mmap: None });
        }
        // SAFETY: read-only file mapping.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| QcError::io(path, e))?;
        Ok(Self { mmap: Some(mmap) })
    }

    pub fn bytes(&self) -> &[u8] {
        match &self.mmap {
            Some(m) => m,
            None => &[],
        }
    }
}

/// Line-oriented reader over a gzip stream. Each call yields one logical
/// line (without the trailing newline) from a bounded decompression buffer.
pub struct GzLineReader {
    reader: BufReader<MultiGzDecoder<File>>,
}

impl GzLineReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| QcError::io(path, e))?;
        let reader = BufReader::with_capacity(GZ_CHUNK_SIZE, MultiGzDecoder::new(file));
        Ok(Self { reader })
    }

    /// Reads the next line into `buf`, stripping the newline. Returns false
    /// at end of stream when no bytes were read.
    pub fn next_line(&mut self, path: &Path, buf: &mut Vec<u8>) -> Result<bool> {
        buf.clear();
        let n = self
            .reader
            .read_until(b'\n', buf)
            .map_err(|e| QcError::io(path, e))?;
        if n == 0 {
            return Ok(false);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn format_detection_by_suffix() {
        assert_eq!(detect_format(Path::new("reads.fastq")), InputFormat::Fastq);
        assert_eq!(detect_format(Path::new("reads.fq")), InputFormat::Fastq);
        assert_eq!(
            detect_format(Path::new("reads.fastq.gz")),
            InputFormat::FastqGz
        );
        assert_eq!(detect_format(Path::new("aln.sam")), InputFormat::Sam);
        assert_eq!(detect_format(Path::new("aln.bam")), InputFormat::Sam);
        assert_eq!(
            detect_format(Path::new("READS.FASTQ.GZ")),
            InputFormat::FastqGz
        );
    }

    #[test]
    fn mmap_of_empty_file_is_empty_slice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.fastq");
        File::create(&path).unwrap();
        let source = MmapSource::open(&path).unwrap();
        assert!(source.bytes().is_empty());
    }

    #[test]
    fn gz_lines_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reads.fastq.gz");
        let file = File::create(&path).unwrap();
        let mut enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        enc.write_all(b"@r1\nACGT\n+\nIIII\n").unwrap();
        enc.finish().unwrap();

        let mut reader = GzLineReader::open(&path).unwrap();
        let mut buf = Vec::new();
        let mut lines = Vec::new();
        while reader.next_line(&path, &mut buf).unwrap() {
            lines.push(buf.clone());
        }
        assert_eq!(
            lines,
            vec![
                b"@r1".to_vec(),
                b"ACGT".to_vec(),
                b"+".to_vec(),
                b"IIII".to_vec()
            ]
        );
    }
}
