mod collectors;
mod config;
mod logbook;

use chrono::{Local, NaiveDateTime};
use clap::Parser;
use collectors::system::SysinfoSource;
use collectors::Snapshot;
use config::Config;
use indicatif::{ProgressBar, ProgressStyle};
use logbook::{Appended, LogWriter};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sysinfo-log")]
#[command(version)]
#[command(about = "Append a CPU, memory and disk snapshot to a spreadsheet log")]
struct Cli {
    /// YAML configuration file; built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    print_default_config: bool,
    /// Full path of the log file, overriding log.directory and log.file_name.
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    no_progress: bool,
    /// Print the date of the last logged row and exit.
    #[arg(long)]
    latest: bool,
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load configuration");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let log_path = match cli.output.clone() {
        Some(path) => config::validate_log_path(&path).map(|()| path),
        None => cfg.log_path(),
    };
    let log_path = match log_path {
        Ok(path) => path,
        Err(err) => {
            error!(error = %err, "failed to resolve the log path");
            std::process::exit(1);
        }
    };
    let cpu_window = match cfg.sampling.cpu_window() {
        Ok(window) => window,
        Err(err) => {
            error!(error = %err, "invalid sampling settings");
            std::process::exit(1);
        }
    };
    let writer = LogWriter::new(log_path, &cfg.log);

    if cli.latest {
        match writer.latest_date() {
            Ok(Some(date)) => println!("{date}"),
            Ok(None) => println!("No entries in {}", writer.path().display()),
            Err(err) => {
                error!(error = %err, "failed to read the log");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Collecting system information, please wait...");
    info!(
        path = %writer.path().display(),
        cpu_window = %humantime::format_duration(cpu_window),
        "starting sysinfo-log"
    );

    let previous_latest_date = match writer.latest_date() {
        Ok(date) => date,
        Err(err) => {
            warn!(error = %err, "failed to read the latest logged date");
            None
        }
    };

    let mut source = SysinfoSource::new(cpu_window);
    let snapshot = Snapshot::capture(&mut source, Local::now().naive_local());

    let progress = progress_bar(cfg.progress && !cli.no_progress);
    let written = write_snapshot(
        &writer,
        snapshot.as_ref(),
        previous_latest_date.as_deref(),
        Local::now().naive_local(),
    );
    progress.inc(1);
    progress.finish();

    match written {
        Some(appended) => {
            info!(
                path = %appended.path.display(),
                date = %appended.date,
                previous_latest_date = %appended.previous_latest_date,
                row = appended.row,
                duplicate = appended.duplicate,
                "snapshot written"
            );
            println!(
                "System information written to {}",
                appended.path.display()
            );
            if appended.duplicate {
                println!(
                    "{} already had an entry; the new row is marked as a duplicate.",
                    appended.date
                );
            }
        }
        None => {
            println!("Failed to write system information to the log.");
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn write_snapshot(
    writer: &LogWriter,
    snapshot: Option<&Snapshot>,
    previous_latest_date: Option<&str>,
    now: NaiveDateTime,
) -> Option<Appended> {
    let Some(snapshot) = snapshot else {
        error!("one or more metrics could not be sampled, skipping write");
        return None;
    };
    debug!(
        captured_at = %snapshot.timestamp,
        cpu_percent = snapshot.cpu_percent,
        disks = snapshot.disks.len(),
        "snapshot captured"
    );

    match writer.append(snapshot, previous_latest_date, now) {
        Ok(appended) => Some(appended),
        Err(err) => {
            error!(error = %err, "failed to write the log");
            None
        }
    }
}

fn progress_bar(enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(1);
    match ProgressStyle::default_bar().template("{msg} [{bar:20.cyan/blue}] {pos}/{len}") {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(err) => debug!(error = %err, "invalid progress template, using default style"),
    }
    pb.set_message("Writing system info");
    pb
}
