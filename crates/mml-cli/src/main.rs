//! MML Draw Order Sync CLI
//!
//! Command-line tool for copying CSF draw orders from one MML file to another.

mod logging;

use clap::{ArgGroup, Parser, Subcommand, ValueEnum};
use mml_core::{
    load_draw_orders, run_batch, sync_directory, sync_files, BatchFile, OutputTarget, SyncReport,
};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "mml-sync")]
#[command(about = "MML file draw order sync tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MapFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy draw orders from a source file into a destination file
    #[command(group(ArgGroup::new("target").required(true).args(["output", "in_place"])))]
    Sync {
        /// Source MML file providing the draw orders
        #[arg(short, long)]
        source: PathBuf,

        /// Destination MML file to update
        #[arg(short, long)]
        destination: PathBuf,

        /// Directory to write the processed destination into
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the destination file
        #[arg(long)]
        in_place: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report draw order differences without writing; exits 2 if any line would change
    Check {
        /// Source MML file providing the draw orders
        #[arg(short, long)]
        source: PathBuf,

        /// Destination MML file to compare
        #[arg(short, long)]
        destination: PathBuf,
    },

    /// Print the identifier -> draw order mapping of a file
    Extract {
        /// MML file to read
        #[arg(short, long)]
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: MapFormat,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Copy draw orders from a source file into every MML file under the roots
    SyncDir {
        /// Source MML file providing the draw orders
        #[arg(short, long)]
        source: PathBuf,

        /// Root directories to scan for destination files
        #[arg(short, long, required = true)]
        root: Vec<PathBuf>,

        /// Output directory for processed files
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Run a batch of sync jobs
    Batch {
        /// Path to batch file (JSON)
        #[arg(short, long)]
        batch: PathBuf,
    },

    /// Create a batch file template
    CreateBatch {
        /// Output path for the batch file
        #[arg(short, long)]
        output: PathBuf,

        /// Output directory the batch will write into
        #[arg(long)]
        export_dir: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> mml_core::Result<i32> {
    match command {
        Commands::Sync {
            source,
            destination,
            output,
            in_place,
            json,
        } => {
            // The "target" group guarantees exactly one of the two
            let target = match (output, in_place) {
                (Some(dir), false) => OutputTarget::Directory(dir),
                _ => OutputTarget::InPlace,
            };
            cmd_sync(&source, &destination, &target, json)
        }
        Commands::Check {
            source,
            destination,
        } => cmd_check(&source, &destination),
        Commands::Extract {
            file,
            format,
            output,
        } => cmd_extract(&file, format, output.as_deref()),
        Commands::SyncDir {
            source,
            root,
            output,
        } => cmd_sync_dir(&source, &root, &output),
        Commands::Batch { batch } => cmd_batch(&batch),
        Commands::CreateBatch { output, export_dir } => cmd_create_batch(&output, &export_dir),
    }
}

fn cmd_sync(
    source: &Path,
    destination: &Path,
    target: &OutputTarget,
    json: bool,
) -> mml_core::Result<i32> {
    let report = sync_files(source, destination, target)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(0);
    }

    print_changes(&report);
    println!("{}", report.summary());
    if let Some(output) = &report.output {
        println!("Wrote {}", output.display());
    }

    Ok(0)
}

fn cmd_check(source: &Path, destination: &Path) -> mml_core::Result<i32> {
    let report = sync_files(source, destination, &OutputTarget::DryRun)?;

    print_changes(&report);
    println!(
        "{} of {} records matched, {}",
        report.records_matched,
        report.records_seen,
        report.summary()
    );

    Ok(check_exit_code(&report))
}

/// 0 when the destination is already in sync, 2 when any line would change
fn check_exit_code(report: &SyncReport) -> i32 {
    if report.lines_affected == 0 {
        0
    } else {
        2
    }
}

fn cmd_extract(file: &Path, format: MapFormat, output: Option<&Path>) -> mml_core::Result<i32> {
    let map = load_draw_orders(file)?;

    let writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout().lock()),
    };

    match format {
        MapFormat::Json => {
            let mut writer = writer;
            map.write_json(&mut writer)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        MapFormat::Csv => map.write_csv(writer)?,
    }

    if let Some(path) = output {
        eprintln!("Exported {} identifiers to {}", map.len(), path.display());
    }

    Ok(0)
}

fn cmd_sync_dir(source: &Path, roots: &[PathBuf], output: &Path) -> mml_core::Result<i32> {
    let result = sync_directory(source, roots, output)?;

    for report in &result.reports {
        println!(
            "  {}: {}",
            report.destination.display(),
            report.summary()
        );
    }

    println!();
    println!("Synced {} files, {} lines affected", result.reports.len(), result.lines_affected());

    if !result.errors.is_empty() {
        println!("\nErrors ({}):", result.errors.len());
        for (path, err) in &result.errors {
            println!("  {}: {}", path.display(), err);
        }
        return Ok(1);
    }

    Ok(0)
}

fn cmd_batch(batch_path: &Path) -> mml_core::Result<i32> {
    let batch = BatchFile::load(batch_path)?;

    println!("Running batch with {} jobs", batch.jobs.len());
    println!("Output: {}", batch.output_dir.display());
    println!();

    let result = run_batch(&batch);

    for report in &result.reports {
        println!(
            "  {} -> {}: {}",
            report.source.display(),
            report.destination.display(),
            report.summary()
        );
    }

    println!();
    println!("Batch complete:");
    println!("  {} jobs succeeded", result.reports.len());
    println!("  {} total lines affected", result.lines_affected());

    if !result.errors.is_empty() {
        println!("\nErrors ({}):", result.errors.len());
        for (path, err) in &result.errors {
            println!("  {}: {}", path.display(), err);
        }
        return Ok(1);
    }

    Ok(0)
}

fn cmd_create_batch(output: &Path, export_dir: &Path) -> mml_core::Result<i32> {
    let batch = BatchFile::template(export_dir);

    batch.save(output)?;
    println!("Created batch file: {}", output.display());
    println!();
    println!("Edit the file to configure your jobs, then run:");
    println!("  mml-sync batch --batch {}", output.display());

    Ok(0)
}

fn print_changes(report: &SyncReport) {
    for change in &report.changes {
        println!(
            "  line {}: {} {} -> {}",
            change.line, change.identifier, change.from, change.to
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use mml_core::LineChange;

    fn report(changes: Vec<LineChange>) -> SyncReport {
        SyncReport {
            source: PathBuf::from("src.mml"),
            destination: PathBuf::from("dest.mml"),
            output: None,
            identifiers: 1,
            records_seen: 1,
            records_matched: 1,
            lines_affected: changes.len(),
            changes,
        }
    }

    #[test]
    fn test_check_exit_code() {
        assert_eq!(check_exit_code(&report(Vec::new())), 0);

        let change = LineChange {
            line: 3,
            identifier: "FOO.jsf".to_string(),
            from: "7".to_string(),
            to: "42".to_string(),
        };
        assert_eq!(check_exit_code(&report(vec![change])), 2);
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_requires_a_target() {
        let parsed = Cli::try_parse_from(["mml-sync", "sync", "-s", "a.mml", "-d", "b.mml"]);
        assert!(parsed.is_err());

        let parsed =
            Cli::try_parse_from(["mml-sync", "sync", "-s", "a.mml", "-d", "b.mml", "--in-place"]);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_sync_target_flags_conflict() {
        let parsed = Cli::try_parse_from([
            "mml-sync", "sync", "-s", "a.mml", "-d", "b.mml", "-o", "out", "--in-place",
        ]);
        assert!(parsed.is_err());
    }
}
