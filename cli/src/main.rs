//! libupload - Command-line interface for the upload engine.
//!
//! Uploads files and folders into a document library and reports progress
//! on stderr.

use clap::Parser;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use upload_engine::{
    batch::{create_batch, plan_batch, run_batch},
    metadata::{ClassificationSource, NoClassification, SidecarClassification},
    model::{BatchItem, BatchSettings, FailurePolicy, ItemState, UploadBatch},
    progress::ProgressCallback,
    combine_urls, Credentials, LibraryClient, PropertyAction, SoapClient, SourceAction, TargetAction, Uploader,
};

/// libupload - Upload files into a document library
#[derive(Parser, Debug)]
#[command(name = "libupload")]
#[command(version)]
#[command(about = "Upload files into a document library with conflict and source handling")]
struct Args {
    /// Files or folders to upload (folders are walked recursively)
    #[arg(value_name = "PATH", required = true)]
    inputs: Vec<PathBuf>,

    /// Site URL hosting the library
    #[arg(long, value_name = "URL", env = "LIBUPLOAD_URL")]
    url: String,

    /// Library path relative to the site (e.g. "Shared Documents")
    #[arg(long, value_name = "PATH", env = "LIBUPLOAD_LIBRARY", default_value = "")]
    library: String,

    /// Target file name instead of the source's name
    #[arg(long, value_name = "NAME")]
    name: Option<String>,

    /// After upload: keep, delete, or url (replace with a shortcut)
    #[arg(long, value_name = "ACTION", default_value = "keep")]
    source_action: String,

    /// Existing target: overwrite, skip, or fail
    #[arg(long, value_name = "ACTION", default_value = "overwrite")]
    target_action: String,

    /// Classification properties: copy or ignore
    #[arg(long, value_name = "ACTION", default_value = "copy")]
    properties: String,

    /// Username for the library (ambient identity when omitted)
    #[arg(long, env = "LIBUPLOAD_USERNAME")]
    username: Option<String>,

    /// Password for the library
    #[arg(long, env = "LIBUPLOAD_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Keep going after a failed file instead of stopping the batch
    #[arg(long)]
    continue_on_error: bool,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 100)]
    timeout: u64,

    /// Enable verbose output
    #[arg(long)]
    verbose: bool,

    /// Print the batch summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

/// CLI implementation of ProgressCallback for displaying upload progress
struct CliProgress {
    verbose: bool,
    start_time: Instant,
}

impl CliProgress {
    fn new(verbose: bool) -> Self {
        CliProgress {
            verbose,
            start_time: Instant::now(),
        }
    }

    fn format_bytes(bytes: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = bytes as f64;
        let mut unit_idx = 0;

        while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
            size /= 1024.0;
            unit_idx += 1;
        }

        format!("{:.2} {}", size, UNITS[unit_idx])
    }

    fn format_duration(elapsed: Duration) -> String {
        let secs = elapsed.as_secs();
        let mins = secs / 60;
        let secs = secs % 60;

        if mins > 0 {
            format!("{}m {}s", mins, secs)
        } else {
            format!("{}s", secs)
        }
    }

    fn item_name(item: &BatchItem) -> &str {
        item.source_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("(unknown)")
    }
}

impl ProgressCallback for CliProgress {
    fn on_batch_started(&self, batch: &UploadBatch) {
        eprintln!("Preparing upload...");
        eprintln!("  Site: {}", batch.settings.endpoint_url);
        eprintln!("  Library: {}", batch.settings.library_path);
        eprintln!(
            "  Actions: source={}, target={}, properties={}",
            batch.settings.source_action, batch.settings.target_action, batch.settings.property_action
        );
        eprintln!("  Files: {}", batch.items.len());
        eprintln!();
    }

    fn on_file_started(&self, _batch: &UploadBatch, item_index: usize, item: &BatchItem) {
        if self.verbose {
            eprintln!("[{:3}] Starting: {}", item_index, Self::item_name(item));
        }
    }

    fn on_file_completed(&self, batch: &UploadBatch, item_index: usize, item: &BatchItem) {
        let done = batch.items.iter().filter(|i| i.state.is_terminal()).count();
        if self.verbose {
            let status = match item.state {
                ItemState::Uploaded => "Uploaded",
                ItemState::Skipped => "Skipped",
                ItemState::Failed => "Failed",
                _ => "Unknown",
            };
            eprintln!("[{:3}] {}: {}", item_index, status, Self::item_name(item));
        } else {
            eprint!("\rProgress: {}/{} files", done, batch.items.len());
            let _ = std::io::Write::flush(&mut std::io::stderr());
        }
    }

    fn on_batch_completed(&self, batch: &UploadBatch) {
        let summary = batch.summary();

        eprintln!();
        eprintln!("Upload {}!", if summary.failed > 0 { "finished with errors" } else { "complete" });
        eprintln!(
            "Summary: {} uploaded, {} skipped, {} failed, {} not attempted",
            summary.uploaded, summary.skipped, summary.failed, summary.pending
        );
        eprintln!("Bytes sent: {}", Self::format_bytes(summary.bytes_sent));
        eprintln!("Elapsed: {}", Self::format_duration(self.start_time.elapsed()));

        if !summary.failures.is_empty() {
            eprintln!();
            eprintln!("Failed files:");
            for failure in &summary.failures {
                eprintln!("  {}: {}", failure.path.display(), failure.message);
            }
        }
    }
}

/// Parse and validate command-line arguments, then run the batch
fn main() {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .try_init();

    // Exit code tracking
    let exit_code = match run_cli(&args) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            2
        }
    };

    std::process::exit(exit_code);
}

/// Build batch settings from the arguments.
fn parse_settings(args: &Args) -> Result<BatchSettings, String> {
    let source_action = SourceAction::from_str(&args.source_action).ok_or_else(|| {
        format!(
            "Invalid source action '{}'. Must be 'keep', 'delete', or 'url'",
            args.source_action
        )
    })?;
    let target_action = TargetAction::from_str(&args.target_action).ok_or_else(|| {
        format!(
            "Invalid target action '{}'. Must be 'overwrite', 'skip', or 'fail'",
            args.target_action
        )
    })?;
    let property_action = PropertyAction::from_str(&args.properties).ok_or_else(|| {
        format!(
            "Invalid properties action '{}'. Must be 'copy' or 'ignore'",
            args.properties
        )
    })?;

    let credentials = Credentials::from_parts(args.username.as_deref(), args.password.as_deref());
    let has_username = args.username.as_deref().is_some_and(|u| !u.is_empty());
    let has_password = args.password.as_deref().is_some_and(|p| !p.is_empty());
    if credentials.is_none() && (has_username || has_password) {
        log::warn!("Username and password must both be given; using the ambient identity");
    }

    Ok(BatchSettings {
        endpoint_url: args.url.clone(),
        library_path: args.library.clone(),
        name_override: args.name.clone().filter(|n| !n.is_empty()),
        source_action,
        target_action,
        property_action,
        credentials,
    })
}

/// Main CLI logic - separated for testability
fn run_cli(args: &Args) -> Result<(), String> {
    let client = SoapClient::new(Duration::from_secs(args.timeout))
        .map_err(|e| format!("HTTP client setup failed: {}", e))?;
    run_with_client(args, &client)
}

fn run_with_client(args: &Args, client: &dyn LibraryClient) -> Result<(), String> {
    for input in &args.inputs {
        if !input.exists() {
            return Err(format!("Input does not exist: {}", input.display()));
        }
    }

    let settings = parse_settings(args)?;
    let policy = if args.continue_on_error {
        FailurePolicy::ContinueOnError
    } else {
        FailurePolicy::AbortOnError
    };
    let classification: &dyn ClassificationSource = match settings.property_action {
        PropertyAction::Copy => &SidecarClassification,
        PropertyAction::Ignore => &NoClassification,
    };

    let mut batch = create_batch(settings, policy).map_err(|e| format!("Batch creation failed: {}", e))?;
    plan_batch(&mut batch, &args.inputs).map_err(|e| format!("Batch planning failed: {}", e))?;

    log::info!(
        "Batch {} planned: {} files to {}",
        batch.id,
        batch.items.len(),
        combine_urls(&batch.settings.endpoint_url, &batch.settings.library_path)
    );

    let uploader = Uploader::new(client, classification);
    let progress = CliProgress::new(args.verbose);
    let result = run_batch(&mut batch, &uploader, Some(&progress));

    let summary = batch.summary();
    if args.json {
        let rendered = serde_json::to_string_pretty(&summary)
            .map_err(|e| format!("Failed to render summary: {}", e))?;
        println!("{}", rendered);
    }

    result.map_err(|e| format!("Upload stopped: {}", e))?;

    if summary.failed > 0 {
        Err("One or more files failed to upload".to_string())
    } else {
        Ok(())
    }
}
