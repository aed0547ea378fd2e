use std::path::Path;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::{Args, Command};
use crate::context::{CancelFlag, ScanOptions};
use crate::engine::{spawn_compare, spawn_size_scan};
use crate::json::{compare_envelope, size_envelope, to_json_string};
use crate::model::{CompareProgress, ComparePhase, ErrorStats, SizeProgress};
use crate::report::{print_comparison, print_error_summary, print_largest, print_size_report};
use crate::settings::load_settings;
use crate::util::fmt_bytes;

/// Exit status when a comparison found differences.
pub const EXIT_DIFFERENCES: u8 = 1;
pub const EXIT_ERROR: u8 = 2;
/// Exit status for a run interrupted by the user.
pub const EXIT_CANCELLED: u8 = 130;

/// Runs the CLI application by selecting the appropriate mode.
///
/// ```rust,no_run
/// use treecmp::modes;
///
/// if let Err(err) = modes::run() {
///     eprintln!("{err:#}");
/// }
/// ```
pub fn run() -> Result<ExitCode> {
    let args = Args::parse();
    setup_logging(args.verbose);

    let settings = load_settings();
    let mut options = settings.scan_options().with_skip_names(args.skip.iter().cloned());
    if args.follow_symlinks {
        options.follow_symlinks = true;
    }

    match &args.command {
        Command::Size {
            path,
            top,
            largest,
        } => run_size_mode(&args, path, *top, *largest, options),
        Command::Compare {
            left,
            right,
            only_diff,
            ..
        } => {
            let recursive = args
                .command
                .resolve_recursive(settings.default_recursive)
                .unwrap_or(settings.default_recursive);
            run_compare_mode(&args, left, right, recursive, *only_diff, options)
        }
    }
}

fn run_size_mode(
    args: &Args,
    path: &Path,
    top: usize,
    largest: Option<usize>,
    options: ScanOptions,
) -> Result<ExitCode> {
    let (progress_tx, progress_rx) = mpsc::channel::<SizeProgress>();
    let quiet = args.quiet;
    let printer = thread::spawn(move || {
        while let Ok(progress) = progress_rx.recv() {
            if quiet {
                continue;
            }
            eprintln!(
                "[size {:>3}%] {} folders, {} :: {}",
                progress.percentage,
                progress.folders_scanned,
                fmt_bytes(progress.total_size),
                progress.current_path.display()
            );
        }
    });

    let handle = spawn_size_scan(path.to_path_buf(), options, Some(progress_tx))
        .context("failed to start size scan")?;
    install_interrupt(handle.cancel_flag())?;
    let errors = handle.errors().clone();

    let result = handle.join()?;
    join_printer(printer)?;

    if args.json {
        println!("{}", to_json_string(&size_envelope(&result), true));
        report_errors(&errors);
        return Ok(match &result {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => failure_code(err.is_cancelled()),
        });
    }

    let tree = match result {
        Ok(tree) => tree,
        Err(err) => {
            if let Some(partial) = err.partial() {
                warn!("scan cancelled, showing partial totals");
                print_size_report(partial, top);
                report_errors(&errors);
            }
            return Err(err)
                .with_context(|| format!("size scan of {} did not complete", path.display()));
        }
    };

    print_size_report(&tree, top);
    if let Some(count) = largest {
        println!();
        print_largest(&tree, count);
    }
    report_errors(&errors);
    Ok(ExitCode::SUCCESS)
}

fn run_compare_mode(
    args: &Args,
    left: &Path,
    right: &Path,
    recursive: bool,
    only_diff: bool,
    options: ScanOptions,
) -> Result<ExitCode> {
    let (progress_tx, progress_rx) = mpsc::channel::<CompareProgress>();
    let quiet = args.quiet;
    let printer = thread::spawn(move || {
        while let Ok(progress) = progress_rx.recv() {
            if quiet {
                continue;
            }
            match progress.phase {
                ComparePhase::Scanning => {
                    eprintln!("[scan] {} entries :: {}", progress.current, progress.file_name)
                }
                ComparePhase::Comparing => eprintln!(
                    "[compare {:>3}%] {}/{} :: {}",
                    progress.percentage, progress.current, progress.total, progress.file_name
                ),
            }
        }
    });

    let handle = spawn_compare(
        left.to_path_buf(),
        right.to_path_buf(),
        recursive,
        options,
        Some(progress_tx),
    )
    .context("failed to start comparison")?;
    install_interrupt(handle.cancel_flag())?;
    let errors = handle.errors().clone();

    let result = handle.join()?;
    join_printer(printer)?;

    if args.json {
        println!("{}", to_json_string(&compare_envelope(&result), true));
        report_errors(&errors);
        return Ok(match &result {
            Ok(comparison) if comparison.has_differences() => ExitCode::from(EXIT_DIFFERENCES),
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => failure_code(err.is_cancelled()),
        });
    }

    let comparison = result.with_context(|| {
        format!("failed to compare {} with {}", left.display(), right.display())
    })?;
    print_comparison(&comparison, only_diff);
    report_errors(&errors);

    if comparison.has_differences() {
        Ok(ExitCode::from(EXIT_DIFFERENCES))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Waits for the progress printer. It exits once the scan drops its sender.
fn join_printer(printer: JoinHandle<()>) -> Result<()> {
    printer
        .join()
        .map_err(|_| anyhow!("progress printer thread panicked"))
}

fn failure_code(cancelled: bool) -> ExitCode {
    ExitCode::from(if cancelled { EXIT_CANCELLED } else { EXIT_ERROR })
}

fn install_interrupt(cancel: &CancelFlag) -> Result<()> {
    let cancel = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, cancelling...");
        cancel.cancel();
    })
    .context("failed to set signal handler")
}

fn report_errors(errors: &ErrorStats) {
    let counts = errors.snapshot();
    let total: usize = counts.values().sum();
    if total > 0 {
        info!(skipped = total, "entries skipped during scan");
    }
    print_error_summary(&counts);
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("treecmp=debug,warn")
        } else {
            EnvFilter::new("treecmp=info,warn")
        }
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
