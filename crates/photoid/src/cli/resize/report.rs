//! Progress display, run summary, and the per-file report.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Duration;

use photoid_core::{OutcomeRecord, OutputFormat, OutputWriter, PipelineSummary};

/// Spinner for a run whose total is unknown until the walk ends.
pub fn create_spinner() -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} file(s) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message("walking...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Write the collected outcome records to `path`. Returns how many were written.
pub fn write_report(
    path: &Path,
    format: OutputFormat,
    records: &[OutcomeRecord],
) -> anyhow::Result<usize> {
    let file = File::create(path)
        .map_err(|e| anyhow::anyhow!("Cannot create report {}: {e}", path.display()))?;
    let mut writer = OutputWriter::new(BufWriter::new(file), format, true);
    for record in records {
        writer.write(record)?;
    }
    let written = writer.items_written();
    writer.finish()?;
    Ok(written)
}

/// Print a formatted summary table after the run.
pub fn print_summary(summary: &PipelineSummary) {
    let secs = summary.elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        summary.processed as f64 / secs
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Scanned:      {:>8}", summary.visited);
    eprintln!("    Accepted:     {:>8}", summary.accepted);
    eprintln!("    Copied:       {:>8}", summary.copied);
    eprintln!("    Resized:      {:>8}", summary.transformed);
    if summary.fell_back > 0 {
        eprintln!("    Fell back:    {:>8}", summary.fell_back);
    }
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Processed:    {:>8}", summary.processed);
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} files/sec", rate);
    eprintln!("  ====================================");
}
