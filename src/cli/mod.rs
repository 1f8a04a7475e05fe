//! CLI mode for empiar-dl: download the movies of an EMPIAR entry.

mod progress;

use std::io;
use std::path::{Path, PathBuf};

use indicatif::MultiProgress;

use crate::config::{AppConfig, ListingMode};
use crate::download::Downloader;
use crate::entry::{EmpiarApi, EntryResolver};
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::plan::{DownloadPlan, is_movie};
use crate::stats::WalkReport;

use progress::{CliProgress, ReadyHook, print_entry, print_summary};

const DEFAULT_AMOUNT: usize = 1;

/// Options given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    /// Entry identifier without prefix.
    pub entry_id: String,
    /// Download directory; the configured one when absent.
    pub output: Option<PathBuf>,
    /// Maximum number of movies; `None` for all of them.
    pub amount: Option<usize>,
    /// Extra suffixes to download.
    pub extensions: Vec<String>,
    /// Whether to create an `EMPIAR<id>` folder.
    pub make_entry_folder: bool,
    /// Gain reference URL.
    pub gain_url: Option<String>,
    /// Local gain reference used instead of downloading one.
    pub gain_path: Option<PathBuf>,
    /// Folder that ready movies and the gain are linked into.
    pub link_dir: Option<PathBuf>,
    /// Force name-only listings classified by probing.
    pub probe: bool,
    /// Alternative configuration file.
    pub config_path: Option<PathBuf>,
}

/// What the command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print usage and exit.
    Help,
    /// Download an entry.
    Download(CliOptions),
}

fn invalid(message: impl Into<String>) -> Error {
    Error::Config(message.into())
}

fn normalize_entry_id(raw: &str) -> Result<String> {
    let id = raw
        .strip_prefix("EMPIAR-")
        .or_else(|| raw.strip_prefix("EMPIAR"))
        .unwrap_or(raw);
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(format!("not an EMPIAR identifier: {raw}")));
    }
    Ok(id.to_string())
}

/// Parses command line arguments, without the program name.
///
/// # Errors
///
/// Returns [`Error::Config`] for unknown options, missing values or a
/// malformed entry identifier.
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<Command> {
    let mut args = args.into_iter();
    let mut entry_id = None;
    let mut options = CliOptions {
        entry_id: String::new(),
        output: None,
        amount: Some(DEFAULT_AMOUNT),
        extensions: Vec::new(),
        make_entry_folder: true,
        gain_url: None,
        gain_path: None,
        link_dir: None,
        probe: false,
        config_path: None,
    };

    while let Some(arg) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| invalid(format!("{flag} requires a value")))
        };
        match arg.as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-o" | "--output" => options.output = Some(PathBuf::from(value(&arg)?)),
            "-n" | "--count" => {
                let raw = value(&arg)?;
                let count = raw
                    .parse()
                    .map_err(|_| invalid(format!("invalid count: {raw}")))?;
                options.amount = Some(count);
            }
            "--all" => options.amount = None,
            "-e" | "--extensions" => options.extensions.extend(
                value(&arg)?
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(String::from),
            ),
            "--no-entry-folder" => options.make_entry_folder = false,
            "--gain-url" => options.gain_url = Some(value(&arg)?),
            "--gain-path" => options.gain_path = Some(PathBuf::from(value(&arg)?)),
            "--link-dir" => options.link_dir = Some(PathBuf::from(value(&arg)?)),
            "--probe" => options.probe = true,
            "-c" | "--config" => options.config_path = Some(PathBuf::from(value(&arg)?)),
            flag if flag.starts_with('-') => return Err(invalid(format!("unknown option: {flag}"))),
            positional => {
                if entry_id.is_some() {
                    return Err(invalid(format!("unexpected argument: {positional}")));
                }
                entry_id = Some(normalize_entry_id(positional)?);
            }
        }
    }

    if options.gain_url.is_some() && options.gain_path.is_some() {
        return Err(invalid("--gain-url and --gain-path are mutually exclusive"));
    }
    options.entry_id = entry_id.ok_or_else(|| invalid("missing entry identifier"))?;
    Ok(Command::Download(options))
}

/// Prints usage information to stderr.
pub fn print_usage() {
    eprintln!("Usage: empiar-dl [OPTIONS] <ENTRY_ID>");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <ENTRY_ID>             EMPIAR identifier, e.g. 10200 or EMPIAR-10200");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o, --output <DIR>     Download folder (default: from config, else .)");
    eprintln!("  -n, --count <N>        Number of movies to download (default: {DEFAULT_AMOUNT}, 0 = all)");
    eprintln!("      --all              Download every movie");
    eprintln!("  -e, --extensions <E>   Extra comma separated suffixes, e.g. .xml,.gain");
    eprintln!("      --no-entry-folder  Do not create an EMPIAR<id> subfolder");
    eprintln!("      --gain-url <URL>   Gain reference to download before the movies");
    eprintln!("      --gain-path <FILE> Local gain reference to use instead");
    eprintln!("      --link-dir <DIR>   Link ready movies and gain into DIR");
    eprintln!("      --probe            Classify entries by probing instead of MLSD");
    eprintln!("  -c, --config <FILE>    Configuration file (default: {})", AppConfig::default_path().display());
    eprintln!("  -h, --help             Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  RUST_LOG               Log filter (default: info)");
}

/// Links `file` into `dir` under its own name and returns the link path.
///
/// Symlinks on unix, copies elsewhere. An existing destination is kept.
///
/// # Errors
///
/// Returns an error if `file` has no name or the link cannot be created.
pub fn link_into(file: &Path, dir: &Path) -> io::Result<PathBuf> {
    let name = file
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let dest = dir.join(name);
    if dest.symlink_metadata().is_ok() {
        return Ok(dest);
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(std::path::absolute(file)?, &dest)?;
    #[cfg(not(unix))]
    std::fs::copy(file, &dest)?;
    Ok(dest)
}

fn link_hook(dir: PathBuf, data_format: Option<String>) -> ReadyHook {
    Box::new(move |file: &Path| {
        if data_format
            .as_deref()
            .is_some_and(|format| !is_movie(file, format))
        {
            return;
        }
        match link_into(file, &dir) {
            Ok(link) => log::debug!("Linked {} -> {}", link.display(), file.display()),
            Err(e) => log::warn!("Could not link {}: {e}", file.display()),
        }
    })
}

/// Uses an existing local gain file, linking it into `link_dir` if given.
fn use_local_gain(path: &Path, link_dir: Option<&Path>) -> Result<()> {
    if !path.is_file() {
        return Err(invalid(format!("gain file not found: {}", path.display())));
    }
    println!("Using local gain reference {}", path.display());
    if let Some(dir) = link_dir {
        link_hook(dir.to_path_buf(), None)(path);
    }
    Ok(())
}

async fn blocking<T, F>(job: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| Error::Io(io::Error::other(e)))?
}

/// Runs the gain job to completion, then the movie job. A failed gain
/// download stops the run before any movie is fetched.
async fn run_in_order<G, M>(gain: Option<G>, movies: M) -> Result<()>
where
    G: FnOnce() -> Result<WalkReport> + Send + 'static,
    M: FnOnce() -> Result<WalkReport> + Send + 'static,
{
    if let Some(job) = gain {
        report_outcome("Gain", blocking(job).await)?;
    }
    report_outcome("Movies", blocking(movies).await)
}

/// Prints the report of a finished or interrupted operation.
fn report_outcome(label: &str, outcome: Result<WalkReport>) -> Result<()> {
    match outcome {
        Ok(report) => {
            print_summary(label, &report);
            Ok(())
        }
        Err(Error::Interrupted { report, source }) => {
            print_summary(label, &report);
            Err(Error::Interrupted { report, source })
        }
        Err(e) => Err(e),
    }
}

impl CliOptions {
    /// Builds the download plan, filling unset values from `config`.
    #[must_use]
    pub fn plan(&self, config: &AppConfig) -> DownloadPlan {
        let mut plan = DownloadPlan::new(
            self.entry_id.clone(),
            self.output
                .clone()
                .unwrap_or_else(|| config.paths.download_dir.clone()),
        );
        plan.amount = self.amount.filter(|&n| n > 0);
        plan.extensions.clone_from(&self.extensions);
        plan.make_entry_folder = self.make_entry_folder;
        plan.gain_url.clone_from(&self.gain_url);
        plan.remote_root.clone_from(&config.empiar.remote_root);
        plan
    }
}

/// Runs the CLI with the process arguments.
///
/// # Errors
///
/// Returns an error if the arguments are invalid, the configuration cannot
/// be loaded or a download fails.
pub async fn run() -> Result<()> {
    let options = match parse_args(std::env::args().skip(1))? {
        Command::Help => {
            print_usage();
            return Ok(());
        }
        Command::Download(options) => options,
    };
    let config = match &options.config_path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    run_download(config, options).await
}

/// Resolves the entry, then downloads its gain and its movies, in that order.
///
/// # Errors
///
/// Returns the first failure of the metadata lookup, the gain download or
/// the movie download.
pub async fn run_download(mut config: AppConfig, options: CliOptions) -> Result<()> {
    if options.probe {
        config.download.listing = ListingMode::Probe;
    }
    let plan = options.plan(&config);

    let api = EmpiarApi::new(config.empiar.api_url.as_str())?;
    let meta = api.resolve(&plan.entry_id).await?;
    print_entry(&meta);

    if let Some(dir) = &options.link_dir {
        std::fs::create_dir_all(dir)?;
    }
    if let Some(path) = &options.gain_path {
        use_local_gain(path, options.link_dir.as_deref())?;
    }
    let multi = MultiProgress::new();

    let gain_job = plan.gain_target(&config.download.server)?.map(|target| {
        let mut progress = CliProgress::new(multi.clone(), "gain");
        if let Some(dir) = &options.link_dir {
            progress = progress.with_ready_hook(link_hook(dir.clone(), None));
        }
        let download = config.download.clone();
        move || {
            Downloader::new(download, Filter::accept_all()).download_file(
                &target.remote_file,
                &target.local_folder,
                &progress,
            )
        }
    });

    let movies_job = {
        let mut progress = CliProgress::new(multi.clone(), "movies");
        if let Some(dir) = &options.link_dir {
            progress = progress
                .with_ready_hook(link_hook(dir.clone(), Some(meta.data_format.clone())));
        }
        let filter = plan.filter(&meta.data_format);
        let remote = plan.remote_images_dir(&meta);
        let local = plan.local_images_dir(&meta);
        let download = config.download.clone();
        let amount = plan.amount;
        log::info!("Filter by extension: {filter}");
        move || {
            Downloader::new(download, filter).download_folder(&remote, &local, &progress, amount)
        }
    };

    let outcome = run_in_order(gain_job, movies_job).await;
    multi.clear().ok();
    outcome
}
