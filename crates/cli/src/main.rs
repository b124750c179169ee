// sblock - headless tools for spreadsheet block snapshots

mod exit_codes;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use sheetblock_config::Settings;
use sheetblock_engine::sheet::{Sheet, SheetId};
use sheetblock_engine::workbook::Workbook;
use sheetblock_io::{decode, decode_payload, encode, is_snapshot, project, SnapshotError};

use exit_codes::{EXIT_ERROR, EXIT_IO, EXIT_SNAPSHOT, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "sblock")]
#[command(about = "Inspect, project and convert spreadsheet block snapshots")]
#[command(version)]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a sheet as a Markdown table
    #[command(after_help = "\
Examples:
  sblock project budget.snapshot
  sblock project budget.snapshot --sheet Summary
  cat block.md | sblock project -")]
    Project {
        /// Snapshot file, or - for stdin
        input: PathBuf,

        /// Sheet name or zero-based position (default: active sheet)
        #[arg(long, short = 's')]
        sheet: Option<String>,
    },

    /// List the sheets of a snapshot
    Inspect {
        /// Snapshot file, or - for stdin
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-encode a snapshot: contiguous sheet order, selections dropped
    #[command(after_help = "\
Accepts the fenced block, a bare JSON array of sheets, or the legacy
{\"data\": [...]} object, and always writes the fenced block.")]
    Normalize {
        /// Snapshot file, or - for stdin
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Export a sheet's displayed text
    Export {
        /// Snapshot file, or - for stdin
        input: PathBuf,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Sheet name or zero-based position (default: active sheet)
        #[arg(long, short = 's')]
        sheet: Option<String>,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write the snapshot of a new, empty workbook
    New {
        /// Name of the single sheet (default: workbook.defaultSheetName)
        #[arg(long)]
        name: Option<String>,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Show effective settings
    Config {
        /// Print only the settings file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ExportFormat {
    Csv,
    Tsv,
}

impl ExportFormat {
    fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Csv => b',',
            ExportFormat::Tsv => b'\t',
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Project { input, sheet } => cmd_project(&input, sheet.as_deref()),
        Commands::Inspect { input, json } => cmd_inspect(&input, json),
        Commands::Normalize { input, output } => cmd_normalize(&input, output.as_deref()),
        Commands::Export { input, format, sheet, output } => {
            cmd_export(&input, format, sheet.as_deref(), output.as_deref())
        }
        Commands::New { name, output } => cmd_new(name, output.as_deref()),
        Commands::Config { path } => cmd_config(path),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn init_logging(verbose: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_timestamp(None);
    let _ = builder.try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn snapshot(source: &Path, err: SnapshotError) -> Self {
        let hint = match err {
            SnapshotError::MissingEnvelope => {
                Some("expected a ```json fenced block or a JSON array of sheets".to_string())
            }
            _ => None,
        };
        Self {
            code: EXIT_SNAPSHOT,
            message: format!("{}: {}", source.display(), err),
            hint,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// Input / output
// ============================================================================

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_input(path: &Path) -> Result<String, CliError> {
    if is_stdin(path) {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| CliError::io(format!("stdin: {}", e)))?;
        return Ok(text);
    }
    fs::read_to_string(path).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
}

/// Decode a fenced snapshot, or bare JSON when the input starts with it.
fn load_workbook(path: &Path) -> Result<Workbook, CliError> {
    let text = read_input(path)?;
    let trimmed = text.trim_start();

    let workbook = if is_snapshot(trimmed) {
        decode(trimmed)
    } else if trimmed.starts_with('[') || trimmed.starts_with('{') {
        decode_payload(trimmed)
    } else {
        // prose before the fence, e.g. a whole exported page
        decode(trimmed)
    }
    .map_err(|e| CliError::snapshot(path, e))?;

    log::debug!("{}: {} sheet(s)", path.display(), workbook.sheet_count());
    Ok(workbook)
}

/// Resolve `--sheet`: exact name, then case-insensitive name, then position.
fn select_sheet<'a>(workbook: &'a Workbook, selector: Option<&str>) -> Result<&'a Sheet, CliError> {
    let Some(selector) = selector else {
        return Ok(workbook.active_sheet());
    };

    let sheets = workbook.sheets();
    let by_name = sheets
        .iter()
        .find(|s| s.name == selector)
        .or_else(|| sheets.iter().find(|s| s.name.eq_ignore_ascii_case(selector)));
    if let Some(sheet) = by_name {
        return Ok(sheet);
    }

    selector
        .parse::<usize>()
        .ok()
        .and_then(|i| workbook.sheet(i))
        .ok_or_else(|| {
            CliError::usage(format!("no sheet {:?}", selector))
                .with_hint(format!("sheets: {}", workbook.sheet_names().join(", ")))
        })
}

fn write_output(output: Option<&Path>, contents: &str) -> Result<(), CliError> {
    match output {
        Some(path) => {
            fs::write(path, contents).map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", contents).map_err(|e| CliError::io(e.to_string()))
        }
    }
}

fn encode_workbook(workbook: &Workbook) -> Result<String, CliError> {
    encode(workbook).map_err(|e| CliError::general(e.to_string()))
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_project(input: &Path, sheet: Option<&str>) -> Result<(), CliError> {
    let workbook = load_workbook(input)?;
    let sheet = select_sheet(&workbook, sheet)?;

    let markdown = project(sheet);
    if markdown.is_empty() {
        log::info!("sheet {:?} has no table to project", sheet.name);
        return Ok(());
    }
    write_output(None, &markdown)
}

#[derive(Serialize)]
struct SheetSummary<'a> {
    position: usize,
    name: &'a str,
    id: &'a SheetId,
    order: usize,
    active: bool,
    rows: usize,
    cols: usize,
    cells: usize,
}

fn cmd_inspect(input: &Path, json: bool) -> Result<(), CliError> {
    let workbook = load_workbook(input)?;
    let active = workbook.active_sheet_index();

    let summaries: Vec<SheetSummary<'_>> = workbook
        .sheets()
        .iter()
        .enumerate()
        .map(|(position, sheet)| SheetSummary {
            position,
            name: &sheet.name,
            id: &sheet.id,
            order: sheet.order,
            active: position == active,
            rows: sheet.rows(),
            cols: sheet.cols(),
            cells: sheet.cell_count(),
        })
        .collect();

    if json {
        let text = serde_json::to_string_pretty(&summaries)
            .map_err(|e| CliError::general(e.to_string()))?;
        return write_output(None, &text);
    }

    let lines: Vec<String> = summaries
        .iter()
        .map(|s| {
            format!(
                "{}{} {:?} id={} order={} {}x{} cells={}",
                if s.active { "*" } else { " " },
                s.position,
                s.name,
                s.id,
                s.order,
                s.rows,
                s.cols,
                s.cells
            )
        })
        .collect();
    write_output(None, &lines.join("\n"))
}

fn cmd_normalize(input: &Path, output: Option<&Path>) -> Result<(), CliError> {
    let mut workbook = load_workbook(input)?;
    workbook.normalize_order();
    write_output(output, &encode_workbook(&workbook)?)
}

fn cmd_export(
    input: &Path,
    format: ExportFormat,
    sheet: Option<&str>,
    output: Option<&Path>,
) -> Result<(), CliError> {
    let workbook = load_workbook(input)?;
    let sheet = select_sheet(&workbook, sheet)?;

    let written = match output {
        Some(path) => {
            let file = fs::File::create(path)
                .map_err(|e| CliError::io(format!("{}: {}", path.display(), e)))?;
            sheetblock_io::csv::write_delimited(sheet, file, format.delimiter())
        }
        None => sheetblock_io::csv::write_delimited(sheet, io::stdout().lock(), format.delimiter()),
    };
    written.map_err(CliError::io)
}

fn cmd_new(name: Option<String>, output: Option<&Path>) -> Result<(), CliError> {
    let name = name.unwrap_or_else(|| Settings::load().default_sheet_name);
    if name.trim().is_empty() {
        return Err(CliError::usage("sheet name cannot be blank"));
    }
    let workbook = Workbook::with_sheet_name(name.trim());
    write_output(output, &encode_workbook(&workbook)?)
}

fn cmd_config(path_only: bool) -> Result<(), CliError> {
    if path_only {
        return write_output(None, &Settings::config_path_display());
    }
    let text = serde_json::to_string_pretty(&Settings::load())
        .map_err(|e| CliError::general(e.to_string()))?;
    write_output(None, &text)
}
