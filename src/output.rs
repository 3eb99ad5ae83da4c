use std::fs;
use std::io::{self, Write};

use camino::Utf8Path;
use serde::Serialize;

use crate::error::IngressError;
use crate::pipeline::{ProgressEvent, ProgressSink, RunReport};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// Forwards progress events to the log.
pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message),
            None => tracing::info!("{}", event.message),
        }
    }
}

pub fn write_report(path: &Utf8Path, report: &RunReport) -> Result<(), IngressError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or(Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| IngressError::Filesystem(err.to_string()))?;
    let content = serde_json::to_vec_pretty(report)
        .map_err(|err| IngressError::Filesystem(err.to_string()))?;
    let mut temp = tempfile::Builder::new()
        .prefix("kg-ingress-report")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| IngressError::Filesystem(err.to_string()))?;
    temp.write_all(&content)
        .map_err(|err| IngressError::Filesystem(err.to_string()))?;
    temp.persist(path.as_std_path())
        .map_err(|err| IngressError::Filesystem(err.to_string()))?;
    Ok(())
}

pub fn print_summary(report: &RunReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}kg-ingress summary{reset}");
    println!("{cyan}  fetched records:   {}{reset}", report.fetched);
    println!(
        "{green}  resolved records:  {} ({} phenotypes, {} studies){reset}",
        report.resolved, report.phenotypes, report.studies
    );
    println!(
        "{yellow}  dropped records:   {} unresolved, {} malformed, {} errored{reset}",
        report.unresolved, report.malformed, report.errored
    );
    if report.dry_run {
        println!("{yellow}  dry run: nothing written to the graph{reset}");
    } else {
        println!("{green}  loaded entities:   {}{reset}", report.loaded);
        let color = if report.failed > 0 { red } else { green };
        println!("{color}  failed entities:   {}{reset}", report.failed);
    }
}
