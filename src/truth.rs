// SPDX-License-Identifier: Apache-2.0

//! Reads `.truth` benchmark files: one line per output, each line a
//! `2^k`-character binary string, most significant bit first. The input
//! arity `k` is inferred from the line length.
//!
//! The parser is intentionally strict -- any ragged line length or stray
//! character fails the whole read so downstream code can rely on a
//! well-formed specification.

use crate::tt::Tt;

#[derive(Debug, Clone)]
pub struct TruthSpec {
    pub num_vars: usize,
    pub outputs: Vec<Tt>,
}

pub fn parse_truth(src: &str) -> Result<TruthSpec, String> {
    let mut outputs: Vec<Tt> = Vec::new();
    let mut num_vars: Option<usize> = None;
    for (lineno, line) in src.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let len = line.len();
        if !len.is_power_of_two() {
            return Err(format!(
                "line {}: length {} is not a power of two",
                lineno + 1,
                len
            ));
        }
        let k = len.trailing_zeros() as usize;
        match num_vars {
            None => num_vars = Some(k),
            Some(prev) if prev != k => {
                return Err(format!(
                    "line {}: inferred {} variables but earlier lines had {}",
                    lineno + 1,
                    k,
                    prev
                ));
            }
            _ => {}
        }
        let tt = Tt::from_binary_str(line)
            .map_err(|e| format!("line {}: {}", lineno + 1, e))?;
        outputs.push(tt);
    }
    let num_vars = num_vars.ok_or_else(|| "no output rows in truth file".to_string())?;
    Ok(TruthSpec { num_vars, outputs })
}

pub fn read_truth(path: &std::path::Path) -> Result<TruthSpec, String> {
    let src = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    parse_truth(&src)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_outputs() {
        let spec = parse_truth("11101000\n10010110\n").unwrap();
        assert_eq!(spec.num_vars, 3);
        assert_eq!(spec.outputs.len(), 2);
        assert_eq!(spec.outputs[0].to_binary_str(), "11101000");
        // MSB-first: the first character is minterm 7.
        assert!(spec.outputs[0].get_bit(7));
        assert!(!spec.outputs[0].get_bit(0));
    }

    #[test]
    fn test_rejects_ragged_lines() {
        assert!(parse_truth("1100\n10\n").is_err());
        assert!(parse_truth("110\n").is_err());
        assert!(parse_truth("11x0\n").is_err());
        assert!(parse_truth("").is_err());
    }
}
