//! `sheetfill populate` and `sheetfill scan`.

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use sheetfill_fetch::{ClientOptions, TemplateClient};
use sheetfill_populate::{
    inspect_template, items_from_json, populate_template, DataItem, PopulateConfig, PopulationReport, ScanReport,
};

use crate::CliError;

pub struct PopulateArgs {
    pub template: Option<PathBuf>,
    pub url: Option<String>,
    pub items: String,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub report: Option<PathBuf>,
    pub token: Option<String>,
    pub timeout: u64,
}

pub fn cmd_populate(args: PopulateArgs) -> Result<(), CliError> {
    if args.timeout == 0 {
        return Err(CliError::args("--timeout must be at least 1 second"));
    }
    if args.template.as_deref() == Some(args.output.as_path()) {
        return Err(CliError::args("output path is the template path")
            .with_hint("write to a new file; the template is never modified"));
    }

    let config = load_config(args.config.as_deref())?;
    let items = load_items(&args.items)?;

    let template = match (&args.template, &args.url) {
        (Some(path), _) => read_file(path, "template")?,
        (None, Some(url)) => {
            let client = TemplateClient::with_options(ClientOptions {
                timeout: Duration::from_secs(args.timeout),
                bearer_token: args.token.clone(),
                ..ClientOptions::default()
            })
            .map_err(CliError::fetch)?;
            client.fetch_template(url).map_err(CliError::fetch)?
        }
        (None, None) => return Err(CliError::args("a template path or --url is required")),
    };

    let output = populate_template(&template, &items, &config).map_err(CliError::populate)?;

    // atomic: write .tmp then rename
    let tmp_path = args.output.with_extension("sheetfill.tmp");
    std::fs::write(&tmp_path, &output.output_bytes)
        .map_err(|e| CliError::io(format!("failed to write {}: {}", tmp_path.display(), e)))?;
    std::fs::rename(&tmp_path, &args.output)
        .map_err(|e| CliError::io(format!("failed to rename tmp to output: {}", e)))?;

    if let Some(path) = &args.report {
        let text = report_json(&output.report, &args.output)?;
        std::fs::write(path, text + "\n")
            .map_err(|e| CliError::io(format!("failed to write report {}: {}", path.display(), e)))?;
    }

    if args.json {
        println!("{}", report_json(&output.report, &args.output)?);
    } else {
        print_summary(&output.report, &args.output);
    }
    Ok(())
}

pub fn cmd_scan(
    template: PathBuf,
    items: Option<String>,
    config: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;
    let items = items.as_deref().map(load_items).transpose()?;
    let bytes = read_file(&template, "template")?;

    let report = inspect_template(&bytes, items.as_deref(), &config).map_err(CliError::populate)?;

    if json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| CliError::general(e.to_string()))?;
        println!("{}", text);
    } else {
        print_scan(&report);
    }
    Ok(())
}

/// Read and validate a synonym config; no path means built-in synonyms only.
pub fn load_config(path: Option<&Path>) -> Result<PopulateConfig, CliError> {
    let Some(path) = path else {
        return Ok(PopulateConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {}", path.display(), e)))?;
    PopulateConfig::from_toml(&text).map_err(CliError::populate)
}

/// Read data items from a file, or stdin when `source` is `-`.
fn load_items(source: &str) -> Result<Vec<DataItem>, CliError> {
    let text = if source == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("cannot read items from stdin: {}", e)))?;
        buf
    } else {
        std::fs::read_to_string(source).map_err(|e| CliError::io(format!("cannot read items {}: {}", source, e)))?
    };
    let items = items_from_json(&text).map_err(CliError::populate)?;
    log::info!("loaded {} data item(s)", items.len());
    Ok(items)
}

fn read_file(path: &Path, what: &str) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|e| CliError::io(format!("cannot read {} {}: {}", what, path.display(), e)))
}

fn report_json(report: &PopulationReport, output: &Path) -> Result<String, CliError> {
    let mut value = serde_json::to_value(report).map_err(|e| CliError::general(e.to_string()))?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("output".into(), serde_json::Value::String(output.display().to_string()));
    }
    serde_json::to_string_pretty(&value).map_err(|e| CliError::general(e.to_string()))
}

fn print_summary(report: &PopulationReport, output: &Path) {
    let stats = &report.stats;
    println!("wrote {}", output.display());
    println!("  placeholders:  {}", stats.total_placeholders);
    println!("  matched:       {}", stats.matched);
    println!("  unmatched:     {}", stats.unmatched);
    println!("  fallback rows: {}", stats.fallbacks_inserted);
    println!("  cleared:       {}", stats.placeholders_cleared);
    if !report.unmatched_placeholders.is_empty() {
        println!();
        println!("unmatched codes:");
        for token in &report.unmatched_placeholders {
            println!("  {}", token);
        }
    }
}

fn print_scan(report: &ScanReport) {
    let s = &report.summary;
    println!(
        "{} token(s) in {} cell(s): {} specific, {} fallback, {} numbered fallback",
        s.tokens, s.cells, s.specific, s.fallback_default, s.fallback_numbered
    );
    if let Some(unresolved) = s.unresolved {
        println!("{} would not resolve", unresolved);
    }
    for entry in &report.tokens {
        let mark = match entry.resolves {
            Some(true) => "  ok",
            Some(false) => "  --",
            None => "",
        };
        println!("  {}!{}\t{}{}", entry.sheet, entry.cell, entry.token, mark);
    }
}
