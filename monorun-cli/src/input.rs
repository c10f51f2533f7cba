//! Numeric input parsing.
//!
//! Values are separated by whitespace and/or commas. `#` starts a comment that
//! runs to the end of the line.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};

/// Read the whole input: the file at `path`, or stdin for `None` / `-`.
pub fn read_source(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            Ok(text)
        }
    }
}

/// Parse every value in `text`.
pub fn parse_values(text: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or_default();
        for token in content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
        {
            let value: f64 = token
                .parse()
                .with_context(|| format!("line {}: '{token}' is not a number", index + 1))?;
            if value.is_nan() {
                bail!("line {}: NaN is not accepted as input", index + 1);
            }
            values.push(value);
        }
    }
    Ok(values)
}
