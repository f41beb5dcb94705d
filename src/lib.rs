//! Single-pass quality control for high-throughput sequencing read files.
//!
//! One scan over a FASTQ (plain or gzipped) or SAM file fills a
//! [`core::stats::FastqStats`] accumulator; a post-scan summarization pass
//! derives the report model consumed by the text and HTML writers.

pub mod cli;
pub mod core;
pub mod error;
pub mod report;

pub use error::{QcError, Result};
