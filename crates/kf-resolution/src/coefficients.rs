//! Coefficient-file parsing.
//!
//! A coefficient file is a whitespace/line-delimited list of reals. Text after `#` on a
//! line is ignored. The number of values must match the arity of the functional form
//! exactly; anything else is a construction-time configuration error.

use std::path::Path;

use kf_core::{Error, Result};

/// Parse `expected` finite reals from `text`.
///
/// `origin` names the source in error messages (usually the file path).
pub fn parse_coefficients(text: &str, expected: usize, origin: &str) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(expected);
    for (line_no, line) in text.lines().enumerate() {
        let content = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line,
        };
        for token in content.split_whitespace() {
            let v: f64 = token.parse().map_err(|_| {
                Error::Configuration(format!(
                    "{origin}:{}: cannot parse coefficient '{token}'",
                    line_no + 1
                ))
            })?;
            if !v.is_finite() {
                return Err(Error::Configuration(format!(
                    "{origin}:{}: coefficient must be finite, got {v}",
                    line_no + 1
                )));
            }
            values.push(v);
        }
    }
    if values.len() != expected {
        return Err(Error::Configuration(format!(
            "{origin}: expected {expected} coefficients, found {}",
            values.len()
        )));
    }
    Ok(values)
}

/// Read and parse a coefficient file.
pub fn read_coefficients(path: &Path, expected: usize) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::Configuration(format!("cannot read coefficient file {}: {e}", path.display()))
    })?;
    parse_coefficients(&text, expected, &path.display().to_string())
}
