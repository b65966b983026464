#![forbid(unsafe_code)]

use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use lumen_store::{StoreConfig, Value};
use lumen_view::SlotKey;
use tracing_subscriber::EnvFilter;

use crate::app::{App, CURRENT_ITEM, ITEM_TEMPLATE, ITEMS_TEMPLATE};
use crate::config::DemoConfig;
use crate::error::Result;
use crate::script::ScriptStep;
use crate::trace::{TraceConfig, TraceRecorder, TraceSummary};

#[derive(Debug, Parser)]
#[command(
    name = "lumen-demo",
    about = "Replay UI events against a reactive item list",
    version
)]
pub struct Cli {
    /// Steps to replay: click:<id>, focus:<id>, input:<id>=<text>, reconnect.
    #[arg(value_name = "STEP")]
    pub steps: Vec<ScriptStep>,

    /// Number of fixture records created at startup.
    #[arg(long, default_value_t = 3)]
    pub fixtures: usize,

    /// Record selected when the client starts.
    #[arg(long, default_value_t = 1, conflicts_with = "no_selection")]
    pub initial_item: u64,

    /// Start with nothing selected.
    #[arg(long)]
    pub no_selection: bool,

    /// Maximum invalidations processed per notification cascade.
    #[arg(long, default_value_t = 1024)]
    pub max_cascade: usize,

    /// Write a JSONL render trace to this path.
    #[arg(long, value_name = "PATH")]
    pub trace: Option<PathBuf>,

    /// Print nothing on success.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    #[must_use]
    pub fn config(&self) -> DemoConfig {
        let trace = self
            .trace
            .as_ref()
            .map_or_else(TraceConfig::default, |path| TraceConfig::enabled_file(path));
        DemoConfig::default()
            .with_fixture_count(self.fixtures)
            .with_initial_item((!self.no_selection).then_some(self.initial_item))
            .with_store(StoreConfig::default().with_max_cascade(self.max_cascade))
            .with_trace(trace)
    }
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let stdout = io::stdout();
    run(&cli, &mut stdout.lock())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

/// Boot the app, replay the steps and report the final view.
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<()> {
    let config = cli.config();
    let mut app = App::boot(&config)?;
    let mut recorder = TraceRecorder::create(&config.trace)?;

    let log = app.log();
    let mut cursor = 0;
    if let Some(rec) = recorder.as_mut() {
        rec.header(config.fixture_count, config.initial_item)?;
        rec.renders(log.borrow().since(cursor))?;
    }
    cursor = log.borrow().cursor();

    for (index, step) in cli.steps.iter().enumerate() {
        let ran = app.apply(step)?;
        if let Some(rec) = recorder.as_mut() {
            rec.step(index, &step.to_string(), ran)?;
            rec.renders(log.borrow().since(cursor))?;
        }
        cursor = log.borrow().cursor();
    }

    if let Some(rec) = recorder {
        rec.finish(TraceSummary {
            steps: cli.steps.len(),
            renders: log.borrow().cursor(),
            records: app.store().record_count(),
        })?;
    }

    if !cli.quiet {
        report(&app, out)?;
    }
    Ok(())
}

fn report(app: &App, out: &mut dyn Write) -> Result<()> {
    let binder = app.binder();
    let items = SlotKey::template(ITEMS_TEMPLATE);
    writeln!(
        out,
        "{ITEMS_TEMPLATE} (renders: {})",
        binder.render_count(&items)
    )?;
    for record in app.store().records() {
        let slot = SlotKey::instance(ITEM_TEMPLATE, record.id());
        let mark = if app.is_selected(record.id()) == Some(true) {
            "x"
        } else {
            " "
        };
        let name = match record.get("name") {
            Value::Unset => String::new(),
            name => format!(" name={name}"),
        };
        writeln!(
            out,
            "  [{mark}] {slot} id={}{name} (renders: {})",
            record.get("id"),
            binder.render_count(&slot)
        )?;
    }
    writeln!(out, "{CURRENT_ITEM} = {}", app.store().peek(CURRENT_ITEM))?;
    Ok(())
}
