#![forbid(unsafe_code)]

//! JSONL render trace for replaying a scripted session.
//!
//! One JSON object per line, tagged by `event`:
//! - `trace_header`: run metadata, written once.
//! - `step`: a scripted step and how many handlers it ran.
//! - `render`: one slot render, in render order.
//! - `trace_summary`: totals, written last.

use std::fs::{File, create_dir_all};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use lumen_view::{Output, RenderEntry};
use serde::Serialize;

use crate::error::Result;

pub const SCHEMA_VERSION: &str = "render-trace-v1";

/// Configuration for trace recording.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Enable trace recording.
    pub enabled: bool,
    /// Output JSONL path.
    pub output_path: PathBuf,
    /// Optional run identifier override.
    pub run_id: Option<String>,
    /// Flush after every line.
    pub flush_on_write: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            output_path: PathBuf::from("trace.jsonl"),
            run_id: None,
            flush_on_write: true,
        }
    }
}

impl TraceConfig {
    /// Enable recording to `path`.
    #[must_use]
    pub fn enabled_file(path: impl Into<PathBuf>) -> Self {
        Self {
            enabled: true,
            output_path: path.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    #[must_use]
    pub fn with_flush_on_write(mut self, flush: bool) -> Self {
        self.flush_on_write = flush;
        self
    }
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum TraceLine<'a> {
    TraceHeader {
        schema_version: &'static str,
        run_id: &'a str,
        fixture_count: usize,
        initial_item: Option<u64>,
    },
    Step {
        index: usize,
        step: String,
        handlers: usize,
    },
    Render {
        seq: u64,
        slot: String,
        renders: u64,
        output: &'a Output,
    },
    TraceSummary {
        steps: usize,
        renders: u64,
        records: usize,
    },
}

/// Totals written at the end of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSummary {
    pub steps: usize,
    pub renders: u64,
    pub records: usize,
}

pub struct TraceRecorder {
    writer: BufWriter<File>,
    run_id: String,
    flush_on_write: bool,
    lines: u64,
}

impl TraceRecorder {
    /// Open the trace file, or `None` if tracing is disabled.
    ///
    /// # Errors
    ///
    /// I/O errors creating the file or its parent directory.
    pub fn create(config: &TraceConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        if let Some(parent) = config.output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            create_dir_all(parent)?;
        }
        let file = File::create(&config.output_path)?;
        let run_id = config
            .run_id
            .clone()
            .unwrap_or_else(|| format!("lumen-{}", std::process::id()));
        Ok(Some(Self {
            writer: BufWriter::new(file),
            run_id,
            flush_on_write: config.flush_on_write,
            lines: 0,
        }))
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Lines written so far.
    #[must_use]
    pub fn lines(&self) -> u64 {
        self.lines
    }

    fn write_line(&mut self, line: &TraceLine<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        if self.flush_on_write {
            self.writer.flush()?;
        }
        self.lines += 1;
        Ok(())
    }

    pub fn header(&mut self, fixture_count: usize, initial_item: Option<u64>) -> Result<()> {
        let run_id = self.run_id.clone();
        self.write_line(&TraceLine::TraceHeader {
            schema_version: SCHEMA_VERSION,
            run_id: &run_id,
            fixture_count,
            initial_item,
        })
    }

    pub fn step(&mut self, index: usize, step: &str, handlers: usize) -> Result<()> {
        self.write_line(&TraceLine::Step {
            index,
            step: step.to_string(),
            handlers,
        })
    }

    pub fn renders(&mut self, entries: &[RenderEntry]) -> Result<()> {
        for entry in entries {
            self.write_line(&TraceLine::Render {
                seq: entry.seq,
                slot: entry.slot.to_string(),
                renders: entry.renders,
                output: &entry.output,
            })?;
        }
        Ok(())
    }

    /// Write the summary line and flush.
    pub fn finish(mut self, summary: TraceSummary) -> Result<()> {
        self.write_line(&TraceLine::TraceSummary {
            steps: summary.steps,
            renders: summary.renders,
            records: summary.records,
        })?;
        self.writer.flush()?;
        Ok(())
    }
}
