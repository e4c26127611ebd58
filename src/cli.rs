//! Driver CLI: fact sheets → (emit | inspect)
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::config::GenConfig;
use crate::error::{GenError, TypeFailure};
use crate::facts::FactSheet;
use crate::generate::Generator;
use crate::schema::RuleTable;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate dictionary glue (wrappers + registration descriptors) from type fact sheets
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit wrapper functions and registration blocks
    Emit(EmitOut),
    /// print the resolved capabilities and diagnostics as JSON
    Inspect(InspectOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat each input as newline-delimited JSON, one fact sheet per line
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select the fact sheet in each document (e.g. /analysis/facts)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more fact sheets. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(Args, Debug, Clone)]
struct GenSettings {
    /// JSON configuration (I/O constructor markers, opaque aliases, schema rules)
    #[arg(long)]
    config: Option<PathBuf>,

    /// extra I/O constructor marker type, tried before the configured ones
    #[arg(long = "io-ctor")]
    io_ctors: Vec<String>,

    /// extra alias that must never be desugared
    #[arg(long = "opaque")]
    opaque: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct EmitOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    gen_settings: GenSettings,

    /// output .cxx file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// add a generation timestamp to the banner
    #[arg(long)]
    stamp: bool,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct InspectOut {
    #[command(flatten)]
    input_settings: InputSettings,

    #[command(flatten)]
    gen_settings: GenSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

/// Totals over one run, printed at the end.
#[derive(Debug, Default)]
pub struct RunReport {
    pub emitted: usize,
    pub warnings: usize,
    pub failures: Vec<TypeFailure>,
    pub rejected_rules: Vec<GenError>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load_process(&self, mut apply: impl FnMut(FactSheet) -> Result<()>) -> Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input).context("failed to resolve input file paths")?;
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            let documents: Vec<&str> = if self.ndjson {
                source.lines().filter(|l| !l.trim().is_empty()).collect()
            } else {
                vec![source.as_str()]
            };
            for document in documents {
                let json_value = serde_json::from_str::<serde_json::Value>(document)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                let values = match self.jq_expr.as_ref() {
                    None => vec![json_value],
                    Some(jq_expr) => crate::jq_exec::run_jaq(jq_expr, &json_value).with_context(|| {
                        format!("failed to apply jq expression to source file ({source_path_str})")
                    })?,
                };
                for value in values {
                    let value = match self.json_pointer.as_deref() {
                        None => value,
                        Some(pointer) => value
                            .pointer(pointer)
                            .cloned()
                            .ok_or_else(|| anyhow!("JSON pointer {pointer} matched nothing in {source_path_str}"))?,
                    };
                    let sheet = FactSheet::from_value(value)
                        .map_err(|e| anyhow!("invalid fact sheet ({source_path_str}) {e}"))?;
                    tracing::info!(path = %source_path_str, records = sheet.records.len(), "loaded fact sheet");
                    apply(sheet)?;
                }
            }
        }
        Ok(())
    }
}

impl GenSettings {
    fn load_config(&self) -> Result<GenConfig> {
        let config = match self.config.as_ref() {
            Some(path) => GenConfig::load(path)?,
            None => GenConfig::default(),
        };
        Ok(config.with_overrides(&self.io_ctors, &self.opaque))
    }
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    fn print(&self) {
        for error in &self.rejected_rules {
            eprintln!("{} {error}", "rule rejected:".yellow().bold());
        }
        for failure in &self.failures {
            eprintln!("{} {failure}", "failed:".red().bold());
        }
        let summary = format!(
            "{} type(s) emitted, {} warning(s), {} failure(s)",
            self.emitted,
            self.warnings,
            self.failures.len()
        );
        if self.has_failures() {
            eprintln!("{} {summary}", "done:".red().bold());
        } else if self.warnings > 0 || !self.rejected_rules.is_empty() {
            eprintln!("{} {summary}", "done:".yellow().bold());
        } else {
            eprintln!("{} {summary}", "done:".green().bold());
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn run(&self) -> Result<RunReport> {
        let mut report = RunReport::default();
        match &self.cmd {
            Command::Emit(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(report);
                }

                let config = target.gen_settings.load_config()?;
                let (rules, rejected) = RuleTable::load(&config.rules);
                report.rejected_rules = rejected;

                let mut src = banner(target.stamp);
                target.input_settings.load_process(|sheet| {
                    let generator = Generator::new(&sheet, &config, &rules);
                    for result in generator.generate_all(&sheet.requests) {
                        match result {
                            Ok(descriptor) => {
                                report.emitted += 1;
                                report.warnings += descriptor.diagnostics.len();
                                src.push_str(&descriptor.render());
                            }
                            Err(failure) => report.failures.push(failure),
                        }
                    }
                    Ok(())
                })?;
                write_output(target.out.as_deref(), &src)?;
            }
            Command::Inspect(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(report);
                }

                let config = target.gen_settings.load_config()?;
                let (rules, rejected) = RuleTable::load(&config.rules);
                report.rejected_rules = rejected;

                let mut entries = Vec::new();
                target.input_settings.load_process(|sheet| {
                    let generator = Generator::new(&sheet, &config, &rules);
                    for result in generator.inspect_all(&sheet.requests) {
                        match result {
                            Ok(type_report) => {
                                report.emitted += 1;
                                report.warnings += type_report.diagnostics.len();
                                entries.push(serde_json::to_value(&type_report)?);
                            }
                            Err(failure) => {
                                entries.push(serde_json::json!({
                                    "index": failure.index,
                                    "name": failure.name,
                                    "error": failure.error.kind(),
                                    "message": failure.error.to_string(),
                                }));
                                report.failures.push(failure);
                            }
                        }
                    }
                    Ok(())
                })?;
                let json_src = serde_json::to_string_pretty(&entries)?;
                write_output(target.out.as_deref(), &json_src)?;
            }
        }
        report.print();
        Ok(report)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn banner(stamp: bool) -> String {
    let mut out = String::from("// Do NOT change. Changes will be lost next time file is generated\n");
    if stamp {
        let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        out.push_str(&format!("// Generated by descgen {} on {now}\n", env!("CARGO_PKG_VERSION")));
    }
    out.push('\n');
    out
}

fn write_output(out: Option<&Path>, src: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(out, src).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{src}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
