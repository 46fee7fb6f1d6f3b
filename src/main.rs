use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use ratatui::DefaultTerminal;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod columns;
mod controller;
mod debounce;
mod domain;
mod editor;
mod inputter;
mod loader;
mod model;
mod page_size;
mod pager;
mod pipeline;
mod store;
mod ui;

use columns::ColumnConfig;
use controller::Controller;
use domain::{TVConfig, TVError};
use loader::Source;
use model::{Model, Status};
use ui::TableUI;

const DEFAULT_SOURCE: &str = "https://mate-academy.github.io/phone-catalogue-static/phones/phones.json";

/// Browse a catalogue of records: filter, sort, page, check and edit them.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Dataset to load: a .json/.csv/.parquet/.arrow file or an http(s) URL to a JSON array
    #[arg(default_value = DEFAULT_SOURCE)]
    source: String,

    /// JSON file describing the columns (title, isSortable, isSearchable, isEditable, hasPhoto)
    #[arg(short, long)]
    columns: Option<PathBuf>,

    /// Initial number of rows per page
    #[arg(short = 'n', long, default_value_t = 5)]
    per_page: usize,

    /// Quiet time after the last keystroke before the filter is applied
    #[arg(long, default_value_t = 500)]
    debounce_ms: u64,

    /// Event poll interval
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Log file, the terminal belongs to the table
    #[arg(long, default_value = "ctv.log")]
    log_file: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args.log_file) {
        eprintln!("Error: cannot open log file {:?}: {}", args.log_file, e);
        return ExitCode::FAILURE;
    }

    match run(args) {
        Err(e) => {
            error!("Terminating: {e:?}");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn init_logging(path: &Path) -> Result<(), TVError> {
    let file = File::create(path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), TVError> {
    info!("Starting ctv with {:?}", args);

    let cfg = TVConfig::default()
        .with_event_poll_time(args.poll_ms)
        .with_debounce_ms(args.debounce_ms)
        .with_per_page(args.per_page);

    let columns = match &args.columns {
        Some(path) => ColumnConfig::load(path)?,
        None => ColumnConfig::default(),
    };
    let source = Source::parse(&args.source)?;
    let store = loader::load(&source)?;

    let mut model = Model::new(&cfg, &source.name(), store, columns);
    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut model, &mut ui, &controller);
    ratatui::restore();
    info!("Bye!");
    result
}

fn event_loop(
    terminal: &mut DefaultTerminal,
    model: &mut Model,
    ui: &mut TableUI,
    controller: &Controller,
) -> Result<(), TVError> {
    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model)? {
            model.update(message)?;
        };
    }
    Ok(())
}
