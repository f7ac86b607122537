//! Run-length coding for the chunk file format.
//!
//! Terrain arrays are dominated by long runs (empty air, uniform stone),
//! so the on-disk format optionally stores each section as `(count, value)`
//! pairs. Values are carried as `u16` so one codec serves both the type
//! array and the byte-valued arrays.

use thiserror::Error;

/// Errors that can occur while decoding a run-length section.
#[derive(Debug, Error)]
pub enum RleError {
    /// Decoded length does not match the expected element count.
    #[error("run-length section decoded to {actual} elements, expected {expected}")]
    LengthMismatch {
        /// Expected number of elements.
        expected: usize,
        /// Actual number of decoded elements.
        actual: usize,
    },
    /// The byte stream ended inside a run record.
    #[error("run-length section truncated")]
    Truncated,
}

/// Encodes `values` as run records: `count: u16 LE`, `value: u16 LE` per
/// run, prefixed with the run count as `u32 LE`.
///
/// Runs are capped at `u16::MAX` elements; longer runs split.
pub fn encode_section(values: impl Iterator<Item = u16>, out: &mut Vec<u8>) {
    let mut runs: Vec<(u16, u16)> = Vec::new();
    for value in values {
        match runs.last_mut() {
            Some((count, last)) if *last == value && *count < u16::MAX => *count += 1,
            _ => runs.push((1, value)),
        }
    }

    out.extend_from_slice(&(runs.len() as u32).to_le_bytes());
    for (count, value) in runs {
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value.to_le_bytes());
    }
}

/// Decodes one run-length section from the front of `data`.
///
/// Returns the decoded values and the number of bytes consumed.
pub fn decode_section(data: &[u8], expected_len: usize) -> Result<(Vec<u16>, usize), RleError> {
    if data.len() < 4 {
        return Err(RleError::Truncated);
    }
    let run_count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let body_len = run_count.checked_mul(4).ok_or(RleError::Truncated)?;
    if data.len() < 4 + body_len {
        return Err(RleError::Truncated);
    }

    let mut values = Vec::with_capacity(expected_len);
    for record in data[4..4 + body_len].chunks_exact(4) {
        let count = u16::from_le_bytes([record[0], record[1]]) as usize;
        let value = u16::from_le_bytes([record[2], record[3]]);
        values.extend(std::iter::repeat_n(value, count));
        if values.len() > expected_len {
            return Err(RleError::LengthMismatch {
                expected: expected_len,
                actual: values.len(),
            });
        }
    }
    if values.len() != expected_len {
        return Err(RleError::LengthMismatch {
            expected: expected_len,
            actual: values.len(),
        });
    }
    Ok((values, 4 + body_len))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
