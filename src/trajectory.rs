//! Fixed-point trajectory file format shared with the hardware testbench.
//!
//! One record per line, three integer fields, each `round(value * 1000)`.
//! The loader divides by the same factor, so files stay bit-comparable with
//! the fixed-point reference regardless of who wrote them.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Fixed-point scale: 1000 represents 1.0 in the hardware datapath.
pub const SCALE_FACTOR: f64 = 1000.0;

pub fn write_scaled(path: &Path, rows: &[[f64; 3]]) -> Result<()> {
    let mut out = String::with_capacity(rows.len() * 20);
    for row in rows {
        writeln!(
            out,
            "{} {} {}",
            (row[0] * SCALE_FACTOR).round() as i64,
            (row[1] * SCALE_FACTOR).round() as i64,
            (row[2] * SCALE_FACTOR).round() as i64,
        )?;
    }
    fs::write(path, out).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Load a scaled trajectory file. Fields may be space- or comma-delimited.
pub fn load_scaled(path: &Path) -> Result<Vec<[f64; 3]>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let mut rows = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() != 3 {
            bail!(
                "{}:{}: expected 3 fields, found {}",
                path.display(),
                lineno + 1,
                fields.len()
            );
        }
        let mut row = [0f64; 3];
        for (slot, field) in row.iter_mut().zip(fields.iter()) {
            let scaled: i64 = field.parse().with_context(|| {
                format!("{}:{}: bad integer {:?}", path.display(), lineno + 1, field)
            })?;
            *slot = scaled as f64 / SCALE_FACTOR;
        }
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_within_quantization() {
        let dir = std::env::temp_dir().join("color_tracker_trajectory_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("round_trip.txt");

        let rows = vec![[1.2345, -0.6789, 3.0], [0.0005, -0.0004, 12.3456]];
        write_scaled(&path, &rows).unwrap();
        let loaded = load_scaled(&path).unwrap();

        assert_eq!(loaded.len(), rows.len());
        for (a, b) in rows.iter().zip(loaded.iter()) {
            for axis in 0..3 {
                assert!(
                    (a[axis] - b[axis]).abs() <= 0.5 / SCALE_FACTOR,
                    "{} vs {}",
                    a[axis],
                    b[axis]
                );
            }
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_loads_comma_delimited() {
        let dir = std::env::temp_dir().join("color_tracker_trajectory_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("comma.txt");
        std::fs::write(&path, "1000, -2000, 500\n").unwrap();

        let rows = load_scaled(&path).unwrap();
        assert_eq!(rows, vec![[1.0, -2.0, 0.5]]);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_rejects_short_record() {
        let dir = std::env::temp_dir().join("color_tracker_trajectory_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("short.txt");
        std::fs::write(&path, "1000 2000\n").unwrap();

        let err = load_scaled(&path).unwrap_err().to_string();
        assert!(err.contains("expected 3 fields"), "got: {}", err);
        std::fs::remove_file(&path).unwrap();
    }
}
