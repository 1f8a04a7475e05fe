//! Progress spinners and summary reporting for CLI downloads.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::download::DownloadProgress;
use crate::entry::EntryMetadata;
use crate::format::{format_bytes, format_duration};
use crate::stats::{FileOrigin, WalkReport};

const SEPARATOR: &str = "────────────────────────────────────────────────────────────";

/// Creates a spinner for a file whose size is not known up front.
pub fn make_spinner(name: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg} {bytes} @ {bytes_per_sec}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    bar.set_style(style);
    bar.set_message(name.to_string());
    bar
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Called with every ready file, from the download thread.
pub type ReadyHook = Box<dyn Fn(&Path) + Send + Sync>;

/// Drives one spinner per in-flight file on a shared [`MultiProgress`].
pub struct CliProgress {
    multi: MultiProgress,
    label: &'static str,
    bars: Mutex<HashMap<PathBuf, ProgressBar>>,
    on_ready: Option<ReadyHook>,
}

impl CliProgress {
    /// Creates a reporter whose lines are prefixed with `label`.
    pub fn new(multi: MultiProgress, label: &'static str) -> Self {
        Self {
            multi,
            label,
            bars: Mutex::new(HashMap::new()),
            on_ready: None,
        }
    }

    /// Runs `hook` for every file once it is ready.
    #[must_use]
    pub fn with_ready_hook(mut self, hook: ReadyHook) -> Self {
        self.on_ready = Some(hook);
        self
    }

    fn take_bar(&self, path: &Path) -> Option<ProgressBar> {
        self.bars.lock().ok()?.remove(path)
    }

    fn println(&self, line: String) {
        let _ = self.multi.println(format!("[{}] {line}", self.label));
    }
}

impl DownloadProgress for CliProgress {
    fn on_file_start(&self, path: &Path) {
        let bar = self.multi.add(make_spinner(&display_name(path)));
        bar.enable_steady_tick(Duration::from_millis(250));
        if let Ok(mut bars) = self.bars.lock() {
            bars.insert(path.to_path_buf(), bar);
        }
    }

    fn on_progress(&self, path: &Path, bytes: u64) {
        if let Ok(bars) = self.bars.lock()
            && let Some(bar) = bars.get(path)
        {
            bar.set_position(bytes);
        }
    }

    fn on_file_ready(&self, path: &Path, origin: FileOrigin) {
        if let Some(bar) = self.take_bar(path) {
            bar.finish_and_clear();
        }
        let status = match origin {
            FileOrigin::Downloaded => style("downloaded").green(),
            FileOrigin::AlreadyPresent => style("present").dim(),
        };
        self.println(format!("{status} {}", path.display()));
        if let Some(hook) = &self.on_ready {
            hook(path);
        }
    }

    fn on_error(&self, path: &Path, error: &str) {
        if let Some(bar) = self.take_bar(path) {
            bar.abandon_with_message(format!("✗ {}", display_name(path)));
        }
        self.println(format!("{} {}: {error}", style("failed").red(), path.display()));
    }

    fn on_limit_reached(&self, limit: usize) {
        self.println(format!("file limit of {limit} reached"));
    }
}

/// Prints what is about to be downloaded.
pub fn print_entry(meta: &EntryMetadata) {
    println!("\n{SEPARATOR}");
    println!("ENTRY: {}", style(&meta.entry_id).bold());
    println!("Title: {}", meta.title);
    match meta.sampling_rate {
        Some(rate) => println!("Sampling rate: {rate} Å/px"),
        None => println!("Sampling rate: unknown"),
    }
    println!("Data format: {}", meta.data_format);
    println!("Data at: {}", meta.directory);
    println!("{SEPARATOR}\n");
}

/// Prints a summary of one download operation.
pub fn print_summary(label: &str, report: &WalkReport) {
    println!("\n{SEPARATOR}");
    println!("{label} summary");
    println!("{SEPARATOR}");
    println!("  Files ready:       {}", report.files_ready);
    if report.files_downloaded > 0 {
        println!("  Files downloaded:  {}", report.files_downloaded);
        println!("  Total size:        {}", format_bytes(report.total_bytes));
        println!("  Total time:        {}", format_duration(report.elapsed));
        println!(
            "  Average speed:     {}/s",
            format_bytes(report.average_speed())
        );
    }
    if report.files_present > 0 {
        println!("  Already present:   {}", report.files_present);
    }
    if report.files_filtered > 0 {
        println!("  Filtered out:      {}", report.files_filtered);
    }
    if report.limit_reached {
        println!("  Stopped at the file limit");
    }
    println!("{SEPARATOR}");
}
