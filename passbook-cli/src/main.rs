use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use passbook_core::{process, DateOrder, Statement, StatementError};
use passbook_export::{output_file_name, render, ExportFormat};
use serde::Serialize;
use std::path::{Path, PathBuf};

mod config;
mod logging;
mod state;
mod tui;

use config::Config;
use logging::LogTarget;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("PASSBOOK_BUILD_SHA"), ")");

#[derive(Parser, Debug)]
#[command(name = "passbook", version = VERSION, about = "Bank statement PDF → CSV / XLSX / PDF transaction tables")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Config file (default: ~/.passbook/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract transactions and write export files named after the input
    Extract {
        /// Statement PDF (or a .txt dump of its text)
        file: PathBuf,

        /// Output format; repeat for several (default from config: csv)
        #[arg(short, long = "format", value_enum)]
        formats: Vec<FormatArg>,

        /// Write csv, xlsx and pdf
        #[arg(long, conflicts_with = "formats")]
        all: bool,

        /// Output directory (default: config export.output_dir, else next to the input)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,

        #[command(flatten)]
        parsing: ParsingArgs,
    },

    /// Print the extracted transactions without writing files
    Preview {
        file: PathBuf,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Maximum rows to print (0 = all)
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Also print the processing log (skipped lines and why)
        #[arg(long)]
        logs: bool,

        #[command(flatten)]
        parsing: ParsingArgs,
    },

    /// Interactive viewer: open a statement, browse the table, export
    View {
        /// Statement to open right away
        file: Option<PathBuf>,
    },

    /// Manage ~/.passbook/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write a default config file if none exists
    Init,
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
}

#[derive(clap::Args, Debug, Default)]
struct ParsingArgs {
    /// How to read dates like 01/02/2023
    #[arg(long, value_enum)]
    date_order: Option<DateOrderArg>,

    /// chrono format for the Date column of exports (e.g. %Y-%m-%d)
    #[arg(long)]
    date_format: Option<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Csv,
    Xlsx,
    Pdf,
}

impl From<FormatArg> for ExportFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Xlsx => ExportFormat::Xlsx,
            FormatArg::Pdf => ExportFormat::Pdf,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum DateOrderArg {
    DayFirst,
    MonthFirst,
}

impl From<DateOrderArg> for DateOrder {
    fn from(d: DateOrderArg) -> Self {
        match d {
            DateOrderArg::DayFirst => DateOrder::DayFirst,
            DateOrderArg::MonthFirst => DateOrder::MonthFirst,
        }
    }
}

impl ParsingArgs {
    fn apply(&self, cfg: &mut Config) {
        if let Some(order) = self.date_order {
            cfg.parsing.date_order = order.into();
        }
        if let Some(fmt) = &self.date_format {
            cfg.export.date_format = fmt.clone();
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => state::default_config_path()?,
    };
    let mut cfg = config::load_config(&config_path)?;

    let level = logging::effective_level(&cfg.logging.level, cli.verbose);
    let target = match cli.command {
        Command::View { .. } => LogTarget::File(state::log_path()?),
        _ => LogTarget::Stderr,
    };
    logging::init_logging(&level, target)?;

    match cli.command {
        Command::Extract {
            file,
            formats,
            all,
            out_dir,
            parsing,
        } => {
            parsing.apply(&mut cfg);
            cfg.validate()?;
            let formats: Vec<ExportFormat> = if all {
                ExportFormat::ALL.to_vec()
            } else if formats.is_empty() {
                cfg.export.default_formats.clone()
            } else {
                formats.into_iter().map(Into::into).collect()
            };
            extract(&file, &formats, out_dir, &cfg).await?;
        }

        Command::Preview {
            file,
            json,
            limit,
            logs,
            parsing,
        } => {
            parsing.apply(&mut cfg);
            cfg.validate()?;
            preview(&file, json, limit, logs, &cfg).await?;
        }

        Command::View { file } => {
            cfg.validate()?;
            tui::run_viewer(file, cfg)?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config(&config_path)?,
            ConfigCommand::Show => {
                print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
            }
            ConfigCommand::Path => println!("{}", config_path.display()),
        },
    }

    Ok(())
}

fn source_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read, extract and process one statement file.
pub(crate) fn statement_from_bytes(bytes: &[u8], name: &str, cfg: &Config) -> Result<Statement, StatementError> {
    let lines = passbook_ingest::extract_lines(bytes, name)?;
    process(&lines, name, &cfg.pipeline())
}

async fn load(path: &Path, cfg: &Config) -> Result<Statement> {
    if !path.exists() {
        bail!("file not found: {}", path.display());
    }
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    let name = source_name(path);

    match statement_from_bytes(&bytes, &name, cfg) {
        Ok(st) => Ok(st),
        Err(StatementError::EmptyResult { skipped }) => {
            bail!("No transactions found in {name} ({skipped} lines skipped); nothing to export")
        }
        Err(e) => Err(e).with_context(|| format!("processing {}", path.display())),
    }
}

/// Directory exports go to: explicit flag, then config, then the input's folder.
pub(crate) fn export_dir(input: &Path, flag: Option<PathBuf>, cfg: &Config) -> PathBuf {
    flag.or_else(|| cfg.export.output_dir.clone())
        .or_else(|| input.parent().map(Path::to_path_buf))
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn extract(file: &Path, formats: &[ExportFormat], out_dir: Option<PathBuf>, cfg: &Config) -> Result<()> {
    if formats.is_empty() {
        bail!("no export format selected; pass --format, --all, or set [export] default_formats");
    }
    let st = load(file, cfg).await?;
    println!(
        "Extracted {} transactions from {}",
        st.batch.len(),
        st.meta.source_name
    );
    if !st.report.skipped.is_empty() {
        println!("{} lines skipped (run `passbook preview --logs` for details)", st.report.skipped.len());
    }

    let dir = export_dir(file, out_dir, cfg);
    tokio::fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("create {}", dir.display()))?;

    let options = cfg.export_options(Some(st.meta.source_name.clone()));
    for format in formats {
        let bytes = render(&st.batch, *format, &options)
            .with_context(|| format!("rendering {format}"))?;
        let path = dir.join(output_file_name(&st.meta.source_name, *format));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

#[derive(Serialize)]
struct PreviewJson<'a> {
    meta: &'a passbook_core::StatementMeta,
    transactions: &'a passbook_core::TransactionBatch,
    skipped: usize,
}

async fn preview(file: &Path, json: bool, limit: usize, logs: bool, cfg: &Config) -> Result<()> {
    let st = load(file, cfg).await?;

    if json {
        let out = PreviewJson {
            meta: &st.meta,
            transactions: &st.batch,
            skipped: st.report.skipped.len(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("# {}\n", st.meta.source_name);
    if let Some(acct) = &st.meta.account_number {
        println!("Account: {acct}");
    }
    if let Some((from, to)) = st.meta.period {
        println!("Period:  {from} to {to}");
    }

    let options = cfg.export_options(None);
    let take = if limit == 0 { st.batch.len() } else { limit };
    println!(
        "\n{:<12}  {:<48}  {:>12}  {:>12}",
        "Date", "Description", "Amount", "Balance"
    );
    for txn in st.batch.iter().take(take) {
        let [date, desc, amount, balance] = passbook_export::row_cells(txn, &options)?;
        println!("{date:<12}  {desc:<48.48}  {amount:>12}  {balance:>12}");
    }
    if st.batch.len() > take {
        println!("... {} more", st.batch.len() - take);
    }

    let totals = st.batch.totals();
    println!(
        "\nExtracted {} transactions | debits {} | credits {} | net {}",
        st.batch.len(),
        totals.debits,
        totals.credits,
        totals.net
    );
    if !st.report.skipped.is_empty() {
        println!("{} lines skipped", st.report.skipped.len());
    }

    if logs {
        println!("\n## Processing log\n");
        for line in &st.report.logs {
            println!("- {line}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_extract() {
        let cli = Cli::try_parse_from([
            "passbook", "extract", "stmt.pdf", "-f", "csv", "-f", "pdf", "--date-order", "month-first",
        ])
        .unwrap();
        match cli.command {
            Command::Extract { formats, parsing, all, .. } => {
                assert_eq!(formats.len(), 2);
                assert!(!all);
                assert!(matches!(parsing.date_order, Some(DateOrderArg::MonthFirst)));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_all_conflicts_with_format() {
        assert!(Cli::try_parse_from(["passbook", "extract", "a.pdf", "--all", "-f", "csv"]).is_err());
    }

    #[test]
    fn test_export_dir_precedence() {
        let mut cfg = Config::default();
        let input = Path::new("/data/stmt.pdf");
        assert_eq!(export_dir(input, None, &cfg), PathBuf::from("/data"));
        assert_eq!(export_dir(Path::new("stmt.pdf"), None, &cfg), PathBuf::from("."));

        cfg.export.output_dir = Some(PathBuf::from("/exports"));
        assert_eq!(export_dir(input, None, &cfg), PathBuf::from("/exports"));
        assert_eq!(
            export_dir(input, Some(PathBuf::from("/flag")), &cfg),
            PathBuf::from("/flag")
        );
    }

    #[test]
    fn test_statement_from_text_bytes() {
        let text = b"STATEMENT OF ACCOUNT\n01/02/2023 GROCERY STORE PURCHASE -45.20 1000.00\nPage 1 of 1\n";
        let st = statement_from_bytes(text, "feb.txt", &Config::default()).unwrap();
        assert_eq!(st.batch.len(), 1);

        let err = statement_from_bytes(b"Page 1 of 1\n", "empty.txt", &Config::default()).unwrap_err();
        assert!(matches!(err, StatementError::EmptyResult { .. }));
    }

    #[tokio::test]
    async fn test_extract_writes_all_formats() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("feb.txt");
        std::fs::write(
            &input,
            "01/02/2023 GROCERY STORE PURCHASE -45.20 1000.00\n02/02/2023 SALARY 500.00 1500.00\n",
        )
        .unwrap();

        let out = dir.path().join("out");
        extract(&input, &ExportFormat::ALL, Some(out.clone()), &Config::default())
            .await
            .unwrap();
        for ext in ["csv", "xlsx", "pdf"] {
            assert!(out.join(format!("feb.{ext}")).exists(), "{ext}");
        }
    }

    #[tokio::test]
    async fn test_extract_without_formats_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("feb.txt");
        std::fs::write(&input, "01/02/2023 GROCERY STORE PURCHASE -45.20 1000.00\n").unwrap();

        let mut cfg = Config::default();
        cfg.export.default_formats.clear();
        let out = dir.path().join("out");
        let err = extract(&input, &cfg.export.default_formats, Some(out.clone()), &cfg)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no export format selected"));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_preview_with_bad_date_format_errors() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("feb.txt");
        std::fs::write(&input, "01/02/2023 GROCERY STORE PURCHASE -45.20 1000.00\n").unwrap();

        let mut cfg = Config::default();
        ParsingArgs {
            date_order: None,
            date_format: Some("%H:%M".into()),
        }
        .apply(&mut cfg);
        assert!(cfg.validate().is_err());
        assert!(preview(&input, false, 20, false, &cfg).await.is_err());
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let err = load(Path::new("/no/such/statement.pdf"), &Config::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
