//! Newline-delimited decimal encoding

use super::RawArray;
use crate::error::{Result, StoreError};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Render values one per line with `precision` fractional digits.
pub fn encode(values: &[f64], precision: usize) -> String {
    let mut out = String::with_capacity(values.len() * (precision + 8));
    for v in values {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{:.*}", precision, v);
    }
    out
}

/// Parse one value per line. Blank lines are skipped; anything else that
/// fails to parse is an error carrying the 1-based line number.
pub fn decode(path: &Path, contents: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: f64 = line.parse().map_err(|e| StoreError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            reason: format!("{} ({:?})", e, line),
        })?;
        values.push(value);
    }
    Ok(values)
}

pub fn write(path: &Path, values: &[f64], precision: usize) -> Result<()> {
    fs::write(path, encode(values, precision))?;
    tracing::debug!("Wrote {} values to {}", values.len(), path.display());
    Ok(())
}

pub fn read(path: &Path) -> Result<RawArray> {
    let contents = fs::read_to_string(path)?;
    let data = decode(path, &contents)?;
    tracing::debug!("Read {} values from {}", data.len(), path.display());
    Ok(RawArray { shape: None, data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_encode_fixed_digits() {
        let text = encode(&[0.5, -1.0], 32);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "0.50000000000000000000000000000000");
        assert_eq!(lines[1], "-1.00000000000000000000000000000000");
    }

    #[test]
    fn test_full_precision_survives() {
        let values = [std::f64::consts::PI, 1.0 / 3.0, -2.5e-7, 123456.789];
        let decoded = decode(Path::new("mem"), &encode(&values, 32)).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_decode_reports_line() {
        let err = decode(Path::new("weights"), "1.0\n\nabc\n").unwrap_err();
        match err {
            StoreError::Parse { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_decode_tolerates_crlf_and_trailing_blank() {
        let decoded = decode(Path::new("mem"), "1.5\r\n2.5\r\n\n").unwrap();
        assert_eq!(decoded, vec![1.5, 2.5]);
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("biases");
        write(&path, &[0.25, 0.75], 32).unwrap();
        let raw = read(&path).unwrap();
        assert_eq!(raw.shape, None);
        assert_eq!(raw.data, vec![0.25, 0.75]);
    }
}
