// Export user interaction lists as weighted user-item edges.
//
//   <input>                      <output>
//   user item1 item2 ...    ->   u<user> item1 1
//                                u<user> item2 1

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

/// Convert every line of `reader`, returning the number of edges written.
pub fn convert<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<usize> {
    let mut edges = 0;
    for line in reader.lines() {
        let line = line.context("Failed to read interaction line")?;
        let mut fields = line.trim().split(' ');
        let Some(user) = fields.next().filter(|u| !u.is_empty()) else {
            continue;
        };
        for item in fields {
            writeln!(writer, "u{user} {item} 1")?;
            edges += 1;
        }
    }
    writer.flush()?;
    Ok(edges)
}

pub fn export_pronet(input: &Path, output: &Path) -> Result<usize> {
    let reader = BufReader::new(
        File::open(input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let writer = BufWriter::new(
        File::create(output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    let edges = convert(reader, writer)?;
    info!(edges, "Exported {} to {}", input.display(), output.display());
    Ok(edges)
}
