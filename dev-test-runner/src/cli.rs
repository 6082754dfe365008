//! Dev harness: convert sample documents against a schema and time it.
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use json_dataclass::{ConvertOptions, Converter, RecordRef, Registry, Schema};
use rayon::prelude::*;
use serde_json::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// convert JSON/NDJSON samples into declared records and report the outcome
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// convert every document once and print one line per document
    Convert(ConvertRun),
    /// convert every document repeatedly and report the average time
    Timing(TimingRun),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// schema file declaring the record types
    #[arg(long)]
    schema: PathBuf,

    /// record type to convert each document into
    #[arg(long)]
    record: String,

    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// fail on values whose type disagrees with the declaration
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// keep undeclared keys on the converted records
    #[arg(long, default_value_t = false)]
    keep_extra: bool,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct ConvertRun {
    #[command(flatten)]
    input_settings: InputSettings,

    /// print each converted record
    #[arg(long)]
    show: bool,
}

#[derive(clap::Parser, Debug)]
struct TimingRun {
    #[command(flatten)]
    input_settings: InputSettings,

    /// conversions per document
    #[arg(long, default_value_t = 1000)]
    repeat: u32,

    /// fail if the average conversion takes longer (microseconds)
    #[arg(long)]
    max_avg_us: Option<u64>,
}

struct Document {
    label: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn options(&self) -> ConvertOptions {
        ConvertOptions {
            strict: self.strict,
            ignore_extra: !self.keep_extra,
        }
    }

    fn load_record(&self) -> Result<RecordRef> {
        let source = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema {}", self.schema.display()))?;
        let schema = Schema::from_json(&source)
            .with_context(|| format!("invalid schema {}", self.schema.display()))?;
        match schema.get(&self.record) {
            Some(record) => Ok(RecordRef::clone(record)),
            None => bail!("schema {} declares no record `{}`", self.schema.display(), self.record),
        }
    }

    fn load_documents(&self) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (line_no, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", line_no + 1);
                    let value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse JSON ({label})"))?;
                    documents.push(Document { label, value });
                }
            } else {
                let value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                documents.push(Document { label: source_path_str, value });
            }
        }
        Ok(documents)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Convert(target) => target.run(),
            Command::Timing(target) => target.run(),
        }
    }
}

impl ConvertRun {
    fn run(&self) -> Result<()> {
        let settings = &self.input_settings;
        let record = settings.load_record()?;
        let documents = settings.load_documents()?;

        // one registry shared by every worker
        let registry = Registry::new();
        let converter = Converter::with_options(&registry, settings.options());
        let outcomes = documents
            .par_iter()
            .map(|doc| (doc, converter.convert(&record, &doc.value)))
            .collect::<Vec<_>>();

        let mut failures = 0usize;
        for (doc, outcome) in outcomes {
            match outcome {
                Ok(instance) => {
                    println!("{} {}", "OK".green().bold(), doc.label);
                    if self.show {
                        println!("   {instance}");
                    }
                }
                Err(error) => {
                    failures += 1;
                    println!("{} {}", "FAIL".red().bold(), doc.label);
                    for line in error.to_string().lines() {
                        println!("   {}", line.dimmed());
                    }
                }
            }
        }
        tracing::info!(
            documents = documents.len(),
            failures,
            cached_records = registry.descriptor_count(),
            cached_extensions = registry.extension_count(),
            "conversion finished"
        );
        if failures > 0 {
            bail!("{failures} of {} documents failed to convert", documents.len());
        }
        Ok(())
    }
}

impl TimingRun {
    fn run(&self) -> Result<()> {
        let settings = &self.input_settings;
        let record = settings.load_record()?;
        let documents = settings.load_documents()?;
        if self.repeat == 0 {
            bail!("--repeat must be at least 1");
        }

        let registry = Registry::new();
        registry.cache_metadata(&record);
        let converter = Converter::with_options(&registry, settings.options());

        let mut slowest = Duration::ZERO;
        let mut total = Duration::ZERO;
        for doc in &documents {
            let start = Instant::now();
            for _ in 0..self.repeat {
                converter
                    .convert(&record, &doc.value)
                    .with_context(|| format!("failed to convert {}", doc.label))?;
            }
            let average = start.elapsed() / self.repeat;
            println!("{:>10.2?}  {}", average, doc.label);
            slowest = slowest.max(average);
            total += average;
        }
        if documents.is_empty() {
            return Ok(());
        }

        let overall = total / documents.len() as u32;
        println!("{} {:.2?} average, {:.2?} slowest", "timing".bold(), overall, slowest);
        if let Some(limit) = self.max_avg_us {
            if overall > Duration::from_micros(limit) {
                bail!("average conversion time {overall:.2?} exceeds {limit}µs");
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let before = out.len();
            for entry in glob::glob(pattern)? {
                out.push(entry?);
            }
            if out.len() == before {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
