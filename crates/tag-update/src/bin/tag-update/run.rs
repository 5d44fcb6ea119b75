//! Apply/check/tags command handlers.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tag_update::config::DeviceConfig;
use tag_update::store::MemoryTagStore;
use tag_update::{ProcessReport, TagUpdateProcessor};
use tracing_subscriber::filter::LevelFilter;

use crate::style;

/// Exit code for a processed envelope that did not succeed.
pub const EXIT_NOT_APPLIED: i32 = 2;

pub fn run_apply(
    device: PathBuf,
    envelope: PathBuf,
    expected_id: Option<i64>,
    json: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = load_device(&device, verbose)?;
    let text = read_envelope(&envelope)?;
    let expected_id = expected_id.unwrap_or(config.service.expected_id);

    let mut store = MemoryTagStore::from_config(&config)?;
    let report = TagUpdateProcessor::new(&mut store).process_json(&text, expected_id);
    print_report(&report, json)?;
    if !json {
        if verbose {
            for record in store.journal() {
                println!("  {} <- {}", style::accent(&record.tag), record.value);
            }
        }
        println!();
        print_tags(&store);
    }
    finish(&report);
    Ok(())
}

pub fn run_check(
    device: PathBuf,
    envelope: PathBuf,
    expected_id: Option<i64>,
    json: bool,
    verbose: bool,
) -> anyhow::Result<()> {
    let config = load_device(&device, verbose)?;
    let text = read_envelope(&envelope)?;
    let expected_id = expected_id.unwrap_or(config.service.expected_id);

    let mut store = MemoryTagStore::from_config(&config)?;
    let report = TagUpdateProcessor::new(&mut store).check_json(&text, expected_id);
    print_report(&report, json)?;
    finish(&report);
    Ok(())
}

pub fn run_tags(device: PathBuf, verbose: bool) -> anyhow::Result<()> {
    let config = load_device(&device, verbose)?;
    let store = MemoryTagStore::from_config(&config)?;
    print_tags(&store);
    Ok(())
}

fn print_tags(store: &MemoryTagStore) {
    if store.is_empty() {
        println!("{}", style::warning("No tags configured."));
        return;
    }
    let width = store
        .tags()
        .map(|tag| tag.info.name.len())
        .max()
        .unwrap_or(4)
        .max(4);
    println!(
        "{}",
        style::accent(format!("{:>4}  {:<width$}  {:<22}  VALUE", "ID", "NAME", "TYPE"))
    );
    for tag in store.tags() {
        let mut flags = Vec::new();
        if tag.fail_reads {
            flags.push("fail-reads".to_string());
        }
        match tag.fail_writes_after {
            Some(0) => flags.push("fail-writes".to_string()),
            Some(count) => flags.push(format!("fail-writes-after={count}")),
            None => {}
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", flags.join(", "))
        };
        println!(
            "{:>4}  {:<width$}  {:<22}  {}{}",
            tag.info.id,
            tag.info.name,
            tag.info.data_type.to_string(),
            tag.value,
            style::warning(flags)
        );
    }
}

fn load_device(path: &Path, verbose: bool) -> anyhow::Result<DeviceConfig> {
    let config = DeviceConfig::load(path)
        .with_context(|| format!("failed to load device config {}", path.display()))?;
    init_tracing(verbose, &config.service.log_level);
    Ok(config)
}

fn init_tracing(verbose: bool, log_level: &str) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        log_level.parse().unwrap_or(LevelFilter::INFO)
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn read_envelope(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read envelope from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read envelope {}", path.display()))
}

fn print_report(report: &ProcessReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
        return Ok(());
    }
    let line = format!("[{}] {}", report.code(), report.summary());
    if report.outcome.is_success() {
        println!("{}", style::success(line));
    } else {
        println!("{}", style::error(line));
    }
    Ok(())
}

fn finish(report: &ProcessReport) {
    if !report.outcome.is_success() {
        std::process::exit(EXIT_NOT_APPLIED);
    }
}
