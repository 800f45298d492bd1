// Output: the flat embedding file and terminal summaries.
//
// File format:
//
//   <count>
//   <id> <v1> <v2> ... <vN>
//
// Each component is rounded to 6 decimal places.

pub mod terminal;

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Round to 6 decimal places.
pub fn round6(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}

/// Write the embedding file format to any writer.
pub fn write_to<W: Write>(mut writer: W, entries: &[(String, Vec<f64>)]) -> Result<()> {
    writeln!(writer, "{}", entries.len())?;
    for (id, vector) in entries {
        write!(writer, "{id}")?;
        for value in vector {
            write!(writer, " {}", round6(*value))?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_embeddings(path: &Path, entries: &[(String, Vec<f64>)]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file {}", path.display()))?;
    write_to(BufWriter::new(file), entries)
        .with_context(|| format!("Failed to write embeddings to {}", path.display()))?;
    info!(count = entries.len(), "Wrote embeddings to {}", path.display());
    Ok(())
}

/// Parse the embedding file format. The count line must match the number
/// of rows that follow.
pub fn read_embeddings<R: BufRead>(reader: R) -> Result<Vec<(String, Vec<f64>)>> {
    let mut lines = reader.lines();
    let header = lines
        .next()
        .context("Embedding file is empty")?
        .context("Failed to read count line")?;
    let count: usize = header
        .trim()
        .parse()
        .with_context(|| format!("Invalid count line {header:?}"))?;

    let mut entries = Vec::with_capacity(count);
    for line in lines {
        let line = line.context("Failed to read embedding line")?;
        let mut fields = line.split_whitespace();
        let Some(id) = fields.next() else {
            continue;
        };
        let vector = fields
            .map(|v| v.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Invalid vector for {id}"))?;
        entries.push((id.to_string(), vector));
    }

    if entries.len() != count {
        anyhow::bail!(
            "Count line says {count} embeddings but {} follow",
            entries.len()
        );
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round6() {
        assert_eq!(round6(0.1234564), 0.123456);
        assert_eq!(round6(-0.1234566), -0.123457);
        assert_eq!(round6(2.0), 2.0);
    }

    #[test]
    fn test_format() {
        let mut out = Vec::new();
        write_to(&mut out, &[("42".to_string(), vec![0.5, -1.0, 0.0000004])]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "1\n42 0.5 -1 0\n");
    }

    #[test]
    fn test_round_trip_reproduces_rounded_values() {
        let entries = vec![
            ("a".to_string(), vec![0.123456789, -2.5, 1e-7]),
            ("b".to_string(), vec![3.0, 0.333333333, -0.0000015]),
        ];
        let mut out = Vec::new();
        write_to(&mut out, &entries).unwrap();

        let parsed = read_embeddings(out.as_slice()).unwrap();
        assert_eq!(parsed.len(), 2);
        for ((id, vector), (pid, pvector)) in entries.iter().zip(&parsed) {
            assert_eq!(id, pid);
            let rounded: Vec<f64> = vector.iter().map(|v| round6(*v)).collect();
            assert_eq!(&rounded, pvector);
        }
    }

    #[test]
    fn test_read_rejects_count_mismatch() {
        assert!(read_embeddings("3\na 1 2\n".as_bytes()).is_err());
    }

    #[test]
    fn test_empty_output() {
        let mut out = Vec::new();
        write_to(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out.clone()).unwrap(), "0\n");
        assert!(read_embeddings(out.as_slice()).unwrap().is_empty());
    }
}
