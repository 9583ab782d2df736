// sheetfill CLI - populate spreadsheet templates from categorized data items

mod exit_codes;
mod logger;
mod populate;

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use exit_codes::{EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "sheetfill")]
#[command(about = "Fill placeholder tokens in spreadsheet templates")]
#[command(long_version = long_version())]
#[command(version)]
#[command(subcommand_required = false)]
struct Cli {
    /// More log output on stderr (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// No log output on stderr
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Populate a template with data items and write the result
    #[command(after_help = "\
Tokens in the template are resolved in three passes: specific item codes
(<site.purchase.price>), category fallback rows (<all.professional.fees.name.1>),
then any token left over is cleared.

Examples:
  sheetfill populate appraisal.xlsx --items items.json -o out.xlsx
  sheetfill populate appraisal.xlsx --items items.json -o out.xlsx --json
  sheetfill populate --url https://example.com/t.xlsx --items items.json -o out.xlsx
  cat items.json | sheetfill populate appraisal.xlsx --items - -o out.xlsx")]
    Populate {
        /// Template workbook (.xlsx / .xlsm)
        #[arg(required_unless_present = "url", conflicts_with = "url")]
        template: Option<PathBuf>,

        /// Download the template from this URL instead
        #[arg(long)]
        url: Option<String>,

        /// Data items JSON (array or {"items": [...]}), - for stdin
        #[arg(long)]
        items: String,

        /// Output workbook path
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// Synonym config (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the population report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Also write the population report JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Bearer token for --url
        #[arg(long, env = "SHEETFILL_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// HTTP timeout for --url, in seconds
        #[arg(long, default_value_t = 60)]
        timeout: u64,
    },

    /// List the placeholder tokens in a template
    #[command(after_help = "\
Examples:
  sheetfill scan appraisal.xlsx
  sheetfill scan appraisal.xlsx --items items.json --json")]
    Scan {
        /// Template workbook (.xlsx / .xlsm)
        template: PathBuf,

        /// Data items JSON; marks which tokens would resolve
        #[arg(long)]
        items: Option<String>,

        /// Synonym config (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the canonical category key for each label
    #[command(after_help = "\
Examples:
  sheetfill normalize \"Profesional Fees\" \"Disposal fees\"
  sheetfill normalize \"Legal fees\" --config synonyms.toml --json")]
    Normalize {
        /// Category labels
        #[arg(required = true)]
        labels: Vec<String>,

        /// Synonym config (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
            "\ncontract_version(report): 1",
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
            "\ncontract_version(report): 1",
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(logger::level_for(cli.verbose, cli.quiet));

    let result = match cli.command {
        None => {
            // No subcommand = show help
            eprintln!("Usage: sheetfill <command> [options]");
            eprintln!("       sheetfill --help for more information");
            Ok(())
        }
        Some(Commands::Populate {
            template,
            url,
            items,
            output,
            config,
            json,
            report,
            token,
            timeout,
        }) => populate::cmd_populate(populate::PopulateArgs {
            template,
            url,
            items,
            output,
            config,
            json,
            report,
            token,
            timeout,
        }),
        Some(Commands::Scan { template, items, config, json }) => {
            populate::cmd_scan(template, items, config, json)
        }
        Some(Commands::Normalize { labels, config, json }) => cmd_normalize(labels, config, json),
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

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Create error from a fetch failure with its exit code.
    pub fn fetch(err: sheetfill_fetch::FetchError) -> Self {
        let code = exit_codes::fetch_exit_code(&err);
        let hint = match &err {
            sheetfill_fetch::FetchError::Http { status: 401 | 403, .. } => {
                Some("check the SHEETFILL_TOKEN environment variable or --token".to_string())
            }
            sheetfill_fetch::FetchError::InvalidUrl { .. } => {
                Some("template URLs must be absolute http(s) URLs".to_string())
            }
            _ => None,
        };
        Self { code, message: format!("template fetch failed: {err}"), hint }
    }

    /// Create error from a populate failure with its exit code.
    pub fn populate(err: sheetfill_populate::PopulateError) -> Self {
        let code = exit_codes::populate_exit_code(&err);
        let hint = match &err {
            sheetfill_populate::PopulateError::Workbook(_) => {
                Some("the template must be an .xlsx or .xlsm workbook".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

// ============================================================================
// normalize
// ============================================================================

fn cmd_normalize(labels: Vec<String>, config: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let table = populate::load_config(config.as_deref())?.category_table();
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if json {
        let rows: Vec<serde_json::Value> = labels
            .iter()
            .map(|label| serde_json::json!({ "label": label, "key": table.normalize(label) }))
            .collect();
        let text = serde_json::to_string_pretty(&rows).map_err(|e| CliError::general(e.to_string()))?;
        writeln!(handle, "{}", text).map_err(|e| CliError::io(e.to_string()))?;
        return Ok(());
    }

    for label in &labels {
        writeln!(handle, "{}\t{}", label, table.normalize(label)).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}
