mod extract;

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{RowParseWarning, SourceFormatError};

pub use extract::MAX_KEPT_WARNINGS;
use extract::Extractor;

/// Contract number in the regulator's namespace, kept verbatim
/// (leading zeros are significant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractId(String);

impl ContractId {
    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStrategy {
    Streaming,
    RawFallback,
}

impl ReadStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            ReadStrategy::Streaming => "streaming",
            ReadStrategy::RawFallback => "raw_fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub delimiter: char,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self { delimiter: ';' }
    }
}

#[derive(Debug, Clone)]
pub struct SourceExtract {
    /// Unique identifiers in order of first appearance.
    pub ids: Vec<ContractId>,
    /// Non-blank lines seen.
    pub rows: usize,
    pub malformed: usize,
    pub duplicates: usize,
    pub strategy: ReadStrategy,
    /// First `MAX_KEPT_WARNINGS` dropped rows; `malformed` holds the full count.
    pub warnings: Vec<RowParseWarning>,
}

pub fn read_identifiers(
    path: &Path,
    opts: &SourceOptions,
) -> Result<SourceExtract, SourceFormatError> {
    if !path.exists() {
        return Err(SourceFormatError::Missing {
            path: path.to_path_buf(),
        });
    }

    let extract = match read_streaming(path, opts) {
        Ok(extract) => extract,
        Err(primary) => {
            warn!(
                path = %path.display(),
                error = %primary,
                "streaming read failed; retrying with raw decompression"
            );
            read_raw(path, opts).map_err(|fallback| SourceFormatError::Corrupt {
                path: path.to_path_buf(),
                reason: format!("{primary}; raw fallback: {fallback}"),
            })?
        }
    };

    info!(
        ids = extract.ids.len(),
        rows = extract.rows,
        malformed = extract.malformed,
        duplicates = extract.duplicates,
        strategy = extract.strategy.as_str(),
        "source_identifiers_ready"
    );
    Ok(extract)
}

/// Line-by-line gzip reader; rejects anything that is not valid UTF-8.
fn read_streaming(path: &Path, opts: &SourceOptions) -> std::io::Result<SourceExtract> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(MultiGzDecoder::new(file));
    let mut extractor = Extractor::new(opts.delimiter);

    let mut line = String::new();
    let mut line_no = 0usize;
    while reader.read_line(&mut line)? > 0 {
        line_no += 1;
        extractor.push_line(line_no, &line);
        line.clear();
    }

    Ok(extractor.finish(ReadStrategy::Streaming))
}

/// Whole-archive decompression decoded as Latin-1, so no byte sequence can
/// fail decoding. Shares the extraction rules with the streaming path.
fn read_raw(path: &Path, opts: &SourceOptions) -> std::io::Result<SourceExtract> {
    let file = File::open(path)?;
    let mut bytes = Vec::new();
    MultiGzDecoder::new(file).read_to_end(&mut bytes)?;
    let text: String = bytes.iter().map(|&b| b as char).collect();

    let mut extractor = Extractor::new(opts.delimiter);
    for (idx, line) in text.split('\n').enumerate() {
        extractor.push_line(idx + 1, line);
    }
    Ok(extractor.finish(ReadStrategy::RawFallback))
}
