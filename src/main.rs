//! plysplat CLI
//!
//! Command-line interface for converting Gaussian Splatting PLY scenes to
//! `.splat` files and inspecting either format.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use plysplat_export::{convert_file, ExportSummary, SplatExportOptions};
use plysplat_parsers::logging::{init_with_config, TracingConfig};
use plysplat_parsers::{HumanReadable, ParseOptions, Parser as ParserTrait, PlyParser, SplatParser};

/// plysplat - convert 3D Gaussian Splatting PLY files for web viewers
#[derive(Parser)]
#[command(name = "plysplat")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for reports
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a PLY point set to a .splat file
    Convert(ConvertArgs),

    /// Show information about a .ply or .splat file
    Info(InfoArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// Input PLY file
    input: PathBuf,

    /// Output path (defaults to the input with a .splat extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    overwrite: bool,

    /// Transform points on a single thread
    #[arg(long)]
    sequential: bool,

    /// Accept any numeric property type, not only float
    #[arg(long)]
    lenient_types: bool,

    /// Write straight to the output instead of staging and renaming
    #[arg(long)]
    no_atomic: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Path to a .ply or .splat file
    path: PathBuf,
}

fn setup_logging(verbosity: u8) {
    init_with_config(TracingConfig::from_verbosity(verbosity));
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Convert(args) => cmd_convert(args, cli.format),
        Commands::Info(args) => cmd_info(args, cli.format),
    }
}

fn cmd_convert(args: ConvertArgs, format: OutputFormat) -> Result<()> {
    let output = args.output.clone().unwrap_or_else(|| default_output_path(&args.input));
    info!("Converting {:?} -> {:?}", args.input, output);

    let parse_options = ParseOptions {
        strict_types: !args.lenient_types,
        ..ParseOptions::default()
    };
    let export_options = SplatExportOptions {
        parallel: !args.sequential,
        overwrite: args.overwrite,
        atomic: !args.no_atomic,
        ..SplatExportOptions::default()
    };

    let summary = convert_file(&args.input, &output, &parse_options, &export_options)
        .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    print_summary(&args.input, &output, &summary, format)
}

fn print_summary(input: &Path, output: &Path, summary: &ExportSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "input": input,
                "output": output,
                "summary": summary,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("Converted {:?} -> {:?}", input, output);
            println!("  Points:        {}", summary.point_count);
            println!("  Size:          {}", format_size(summary.bytes_written));
            println!(
                "  Bounds:        ({:.3}, {:.3}, {:.3}) - ({:.3}, {:.3}, {:.3})",
                summary.bounds.min.x,
                summary.bounds.min.y,
                summary.bounds.min.z,
                summary.bounds.max.x,
                summary.bounds.max.y,
                summary.bounds.max.z
            );
            println!("  Time:          {} ms", summary.duration_ms);
        }
    }

    Ok(())
}

fn cmd_info(args: InfoArgs, format: OutputFormat) -> Result<()> {
    let path = &args.path;

    if !path.exists() {
        bail!("File not found: {:?}", path);
    }

    let ext = path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let report: Box<dyn HumanReadable> = match ext.as_str() {
        "ply" => Box::new(read_ply(path)?),
        "splat" => Box::new(read_splat(path)?),
        _ if PlyParser::new().can_parse(path) => Box::new(read_ply(path)?),
        _ => bail!("Unrecognised file type: {:?} (expected .ply or .splat)", path),
    };

    match format {
        OutputFormat::Json => {
            let mut json = report.to_json();
            json["path"] = serde_json::json!(path);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            println!("{:?}", path);
            print!("{}", report.to_readable_string());
        }
    }

    Ok(())
}

fn read_ply(path: &Path) -> Result<plysplat_parsers::PlyCloud> {
    PlyParser::new()
        .parse_file(path)
        .with_context(|| format!("Failed to parse PLY file {}", path.display()))
}

fn read_splat(path: &Path) -> Result<plysplat_parsers::SplatFile> {
    SplatParser::new()
        .parse_file(path)
        .with_context(|| format!("Failed to read splat file {}", path.display()))
}

fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("splat")
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
