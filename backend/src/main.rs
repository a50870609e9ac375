//! Gradesheet CLI - turn a grade spreadsheet into roster and grades extracts
//!
//! ```bash
//! gradesheet serve                          # Start HTTP server (port 5000)
//! gradesheet process notas.xlsx --campo2 K1021 --campo3 AM1
//! gradesheet check notas.xlsx               # Validation report only
//! ```

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use gradesheet::config::{ServerConfig, REQUIRED_COLUMNS};
use gradesheet::{
    filter_by_faculty, parse_spreadsheet_file, process_spreadsheet, validate_content,
    validate_structure, ExtractNames, ExtractOptions, FormParams,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gradesheet")]
#[command(
    about = "Validate grade spreadsheets and generate enrollment extracts",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write both extracts
    Process {
        /// Input spreadsheet (.xlsx or .xls)
        input: PathBuf,

        #[command(flatten)]
        form: FormArgs,

        /// Directory for the generated CSV files
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,

        /// Quote fields per RFC 4180 instead of writing them raw
        #[arg(long)]
        quoted: bool,
    },

    /// Report structure and content problems without writing extracts
    Check {
        /// Input spreadsheet (.xlsx or .xls)
        input: PathBuf,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

/// The six values copied into every extract line.
#[derive(Args)]
struct FormArgs {
    /// Program (Propuesta)
    #[arg(long)]
    campo1: Option<String>,
    /// Commission (Comision)
    #[arg(long)]
    campo2: Option<String>,
    /// Activity (Actividad)
    #[arg(long)]
    campo3: Option<String>,
    /// Academic period
    #[arg(long)]
    campo4: Option<String>,
    /// Regularity date
    #[arg(long)]
    campo5: Option<String>,
    /// Promotion date
    #[arg(long)]
    campo6: Option<String>,
}

impl From<FormArgs> for FormParams {
    fn from(args: FormArgs) -> Self {
        FormParams {
            program: args.campo1,
            commission: args.campo2,
            activity: args.campo3,
            academic_period: args.campo4,
            regularity_date: args.campo5,
            promotion_date: args.campo6,
        }
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Process {
            input,
            form,
            out_dir,
            quoted,
        } => cmd_process(&input, form.into(), &out_dir, quoted),

        Commands::Check { input } => cmd_check(&input),

        Commands::Serve { port } => cmd_serve(port).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_process(
    input: &Path,
    params: FormParams,
    out_dir: &Path,
    quoted: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let filename = input
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or("input path has no file name")?;
    let bytes = fs::read(input)?;

    let options = if quoted {
        ExtractOptions::quoted()
    } else {
        ExtractOptions::default()
    };

    let output = match process_spreadsheet(&bytes, filename, &params, &options) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("❌ {}", e.message());
            for detail in e.details() {
                eprintln!("   - {}", detail);
            }
            std::process::exit(1);
        }
    };

    let names = ExtractNames::for_upload(
        params.commission(),
        params.activity(),
        Local::now().naive_local(),
    );
    fs::create_dir_all(out_dir)?;
    let roster_path = out_dir.join(&names.roster);
    let grades_path = out_dir.join(&names.grades);
    fs::write(&roster_path, &output.roster_csv)?;
    fs::write(&grades_path, &output.grades_csv)?;

    eprintln!("\n📊 Rows read:         {}", output.rows_read);
    eprintln!("   After filter:      {}", output.rows_after_filter);
    eprintln!("   Valid records:     {}", output.total_records);
    print_content_errors(&output.content_errors);
    eprintln!("\n💾 {}", roster_path.display());
    eprintln!("💾 {}", grades_path.display());
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_check(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", input.display());

    let dataset = parse_spreadsheet_file(input)?;
    eprintln!("   Rows: {}", dataset.len());
    eprintln!("   Columns: {}", dataset.columns().join(", "));

    let (ok, structure_errors) = validate_structure(&dataset, &REQUIRED_COLUMNS);
    if !ok {
        eprintln!("\n❌ The file does not have the correct structure:");
        for err in &structure_errors {
            eprintln!("   - {}", err);
        }
        std::process::exit(1);
    }

    let filtered = filter_by_faculty(&dataset);
    eprintln!("   After faculty filter: {}", filtered.len());

    let (valid, content_errors) = validate_content(&filtered);
    eprintln!("\n📊 Results: {} valid, {} rows after filter", valid.len(), filtered.len());
    print_content_errors(&content_errors);

    if valid.is_empty() {
        eprintln!("\n❌ No valid records found in the file");
        std::process::exit(1);
    }
    Ok(())
}

fn print_content_errors(errors: &[String]) {
    if errors.is_empty() {
        return;
    }
    eprintln!("\n⚠️  Content errors ({}):", errors.len());
    for err in errors {
        eprintln!("   - {}", err);
    }
}

async fn cmd_serve(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::from_env();
    if let Some(port) = port {
        config = config.with_port(port);
    }
    gradesheet::server::start_server(config).await
}
