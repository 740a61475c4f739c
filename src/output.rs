use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ArchiveResult, ProgressEvent, ProgressSink};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Machine-readable output: the final result as pretty JSON, no progress
/// lines.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_archive(result: &ArchiveResult) -> io::Result<()> {
        Self::print_json(result)
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

/// Human-readable per-branch progress lines on stdout.
pub struct TextOutput;

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => println!("{} ({}ms)", event.message, elapsed.as_millis()),
            None => println!("{}", event.message),
        }
    }
}

pub fn print_archive_summary(result: &ArchiveResult) {
    let green = "\x1b[32m";
    let cyan = "\x1b[36m";
    let reset = "\x1b[0m";

    println!(
        "{cyan}archive summary for {user}{reset}",
        user = result.user
    );
    println!(
        "{green}downloaded: {} / up to date: {}{reset}",
        result.downloaded(),
        result.up_to_date()
    );
}
