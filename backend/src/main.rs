//! LO Mastery CLI
//!
//! ```bash
//! lomastery serve                              # Start HTTP server (port 8080)
//! lomastery normalize tests.json --xlsx out.xlsx   # Raw results → intermediate spreadsheet
//! lomastery aggregate out.xlsx                 # Intermediate spreadsheet → % per LO
//! ```

use clap::{Parser, Subcommand};
use lomastery::{
    aggregate_file, normalize_json, server::ServerConfig, write_csv, write_xlsx, Grid,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "lomastery")]
#[command(about = "Turn raw exam results into learning objective mastery reports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge per-test raw results into the intermediate table
    Normalize {
        /// JSON file: array of {name, identifier, datFile, datFileName, loFile, loFileName}
        input: PathBuf,

        /// Output file for the JSON table (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the table as an XLSX workbook
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Also write the table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Compute per-student mastery percentages from an intermediate spreadsheet
    Aggregate {
        /// Intermediate spreadsheet (.xlsx, .xls, .ods or .csv)
        input: PathBuf,

        /// Number of LO key rows (default: count leading digit rows)
        #[arg(short, long)]
        num_tests: Option<usize>,

        /// Output file for the JSON report (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also write the report as an XLSX workbook
        #[arg(long)]
        xlsx: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on [env: LOMASTERY_PORT, default: 8080]
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for temporary upload files [env: LOMASTERY_UPLOAD_DIR, default: uploaded]
        #[arg(long)]
        upload_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Normalize {
            input,
            output,
            xlsx,
            csv,
        } => cmd_normalize(&input, output.as_deref(), xlsx.as_deref(), csv.as_deref()),

        Commands::Aggregate {
            input,
            num_tests,
            output,
            xlsx,
        } => cmd_aggregate(&input, num_tests, output.as_deref(), xlsx.as_deref()),

        Commands::Serve { port, upload_dir } => cmd_serve(port, upload_dir).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_normalize(
    input: &Path,
    output: Option<&Path>,
    xlsx: Option<&Path>,
    csv: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Normalizing: {}", input.display());

    let body = fs::read(input)?;
    let grid = normalize_json(&body)?.to_grid();

    if let Some(path) = xlsx {
        fs::write(path, write_xlsx(&grid, "Intermediate")?)?;
        eprintln!("💾 Workbook written to: {}", path.display());
    }

    if let Some(path) = csv {
        write_csv(&grid, fs::File::create(path)?)?;
        eprintln!("💾 CSV written to: {}", path.display());
    }

    write_table(&grid, output)
}

fn cmd_aggregate(
    input: &Path,
    num_tests: Option<usize>,
    output: Option<&Path>,
    xlsx: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let grid = aggregate_file(input, num_tests)?.to_grid();

    if let Some(path) = xlsx {
        fs::write(path, write_xlsx(&grid, "FinalOutput")?)?;
        eprintln!("💾 Workbook written to: {}", path.display());
    }

    write_table(&grid, output)
}

async fn cmd_serve(
    port: Option<u16>,
    upload_dir: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env();
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(dir) = upload_dir {
        config.upload_dir = dir;
    }

    lomastery::server::start_server(config).await
}

fn write_table(grid: &Grid, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = serde_json::to_string_pretty(grid)?;
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
