// Colored terminal output for run summaries.

use colored::Colorize;

/// What a propagation run produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    /// Unseen items read from the input file
    pub unseen: usize,
    /// Items written to the output file
    pub written: usize,
    /// Items skipped because no neighbor could be used
    pub skipped: Vec<String>,
    /// Items indexed for neighbor search
    pub indexed: usize,
}

/// Display a run summary in the terminal.
pub fn display_summary(title: &str, summary: &RunSummary, output: &str) {
    println!("\n{}", format!("=== {title} ===").bold());
    println!("  Indexed items:   {}", summary.indexed);
    println!("  Unseen items:    {}", summary.unseen);
    println!(
        "  Embeddings:      {}",
        summary.written.to_string().bright_green()
    );

    if !summary.skipped.is_empty() {
        println!(
            "  {} {} unseen items had no usable neighbors: {}",
            "!".yellow(),
            summary.skipped.len(),
            summary.skipped.join(", ").dimmed()
        );
    }

    println!("\n  Written to {}", output.bold());
}
