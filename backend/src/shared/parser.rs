//! Shard codec
//!
//! A shard is newline-delimited JSON, one reading per line. Decoding is
//! all-or-nothing per shard: a single malformed line fails the whole shard.
//! Callers log the failure and continue with the remaining shards, so a
//! corrupted tail costs that shard only.

use thiserror::Error;

use crate::domain::Reading;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Shard is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Invalid reading on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Decode a shard into its readings, in stored order. Blank lines are skipped.
pub fn parse_shard(raw: &[u8]) -> Result<Vec<Reading>, ParseError> {
    let text = std::str::from_utf8(raw)?;

    let mut readings = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let reading = serde_json::from_str::<Reading>(line).map_err(|source| ParseError::Json {
            line: index + 1,
            source,
        })?;
        readings.push(reading);
    }

    Ok(readings)
}

/// Encode readings as a shard body
pub fn encode_shard(readings: &[Reading]) -> Result<Vec<u8>, serde_json::Error> {
    let lines = readings
        .iter()
        .map(serde_json::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(lines.join("\n").into_bytes())
}
