//! The `photoid resize` command.

mod report;
mod setup;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::{Args, ValueEnum};
use photoid_core::{Config, OutcomeRecord};

use report::{create_spinner, print_summary, write_report};
use setup::build_pipeline;

/// Arguments for the `resize` command.
#[derive(Args, Debug)]
pub struct ResizeArgs {
    /// Source directory, walked recursively
    #[arg(short, long)]
    pub source: PathBuf,

    /// Destination directory (created when missing)
    #[arg(short, long)]
    pub destination: PathBuf,

    /// Maximum height of the output images in pixels (0 for none)
    #[arg(short = 'H', long)]
    pub max_height: Option<u32>,

    /// Maximum width of the output images in pixels (0 for none)
    #[arg(short = 'w', long)]
    pub max_width: Option<u32>,

    /// Regular expression file names must match [default: jpg|png]
    #[arg(short = 'm', long = "match", value_name = "REGEX")]
    pub include: Option<String>,

    /// Regular expression excluding file names before the match is checked
    #[arg(short = 'x', long, value_name = "REGEX")]
    pub exclude: Option<String>,

    /// Face classification file; enables face-aware resizing
    #[arg(short = 'f', long)]
    pub classifier: Option<PathBuf>,

    /// Number of files processed concurrently [default: available parallelism]
    #[arg(short = 't', long)]
    pub workers: Option<usize>,

    /// Skip files modified more than this many days ago (0 = no limit)
    #[arg(short = 'a', long, value_name = "DAYS")]
    pub max_age: Option<u32>,

    /// Paths and outcomes buffered between stages
    #[arg(long)]
    pub buffer_size: Option<usize>,

    /// Write a per-file report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "jsonl")]
    pub report_format: ReportFormat,

    /// Disable the progress spinner
    #[arg(long)]
    pub no_progress: bool,
}

/// Supported report formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<ReportFormat> for photoid_core::OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Json => Self::Json,
            ReportFormat::Jsonl => Self::JsonLines,
        }
    }
}

/// Execute the resize command.
pub async fn execute(args: ResizeArgs, mut config: Config) -> anyhow::Result<()> {
    let pipeline = build_pipeline(&mut config, &args)?;

    // Ctrl-C lets in-flight files finish, then stops the walk.
    let cancel = pipeline.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, waiting for in-flight files");
            cancel.cancel();
        }
    });

    let progress = (!args.no_progress).then(create_spinner);
    let records = Arc::new(Mutex::new(Vec::new()));

    let observer = {
        let progress = progress.clone();
        let records = Arc::clone(&records);
        let keep_records = args.report.is_some();
        move |outcome: &photoid_core::Outcome| {
            if let Some(pb) = &progress {
                pb.inc(1);
                if let Some(name) = outcome.path.file_name() {
                    pb.set_message(name.to_string_lossy().into_owned());
                }
            }
            if keep_records {
                if let Ok(mut records) = records.lock() {
                    records.push(OutcomeRecord::from(outcome));
                }
            }
        }
    };

    let result = pipeline.run_with(observer).await;
    interrupt.abort();

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    // A partial report is still worth keeping when the run was cut short.
    if let Some(path) = &args.report {
        let records = records
            .lock()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default();
        let written = write_report(path, args.report_format.into(), &records)?;
        tracing::info!("Wrote {} record(s) to {:?}", written, path);
    }

    let summary = result?;
    print_summary(&summary);
    Ok(())
}
