use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Mutex;
use std::time::Instant;

use clap::Parser;
use color_eyre::eyre::eyre;
use treecombo::config::{load_config, ComboConfig};
use treecombo::dataset::{load_dataset, DemoKind};
use treecombo::filter::build_predicate;
use treecombo::{HierarchicalDataView, MatchMode};

mod app;
mod ui;
mod widgets;

use app::App;

/// Pick one item from a tree by typing part of its caption
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON dataset: an array of { "label": ..., "children": [...] } nodes
    #[arg(long)]
    data: Option<PathBuf>,

    /// Built-in demo dataset (used when no --data is given)
    #[arg(long, value_enum)]
    demo: Option<DemoKind>,

    /// JSON config file with combo box options
    #[arg(long)]
    config: Option<PathBuf>,

    /// How typed text is matched against captions
    #[arg(long, value_enum)]
    match_mode: Option<MatchMode>,

    /// Only allow leaf items to be selected
    #[arg(long)]
    leafs_only: bool,

    /// Hide the clear button
    #[arg(long)]
    no_clear_button: bool,

    /// Browse only; typing does not filter
    #[arg(long)]
    disable_filtering: bool,

    /// Field label
    #[arg(long)]
    label: Option<String>,

    /// Helper text shown below the field
    #[arg(long)]
    helper: Option<String>,

    /// Field width in columns
    #[arg(long)]
    width: Option<u16>,

    /// Popup width in columns
    #[arg(long)]
    popup_width: Option<u16>,

    /// Milliseconds of typing inactivity before the filter is applied
    #[arg(long)]
    debounce_ms: Option<u64>,

    /// Caption of the item selected on start
    #[arg(long)]
    value: Option<String>,

    /// Print the accepted item's full path instead of its caption
    #[arg(long)]
    print_path: bool,

    /// Apply this filter without the terminal UI and print the resulting tree
    #[arg(long)]
    filter: Option<String>,

    /// Write debug logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    /// Options given on the command line, as the topmost config layer.
    fn config_layer(&self) -> ComboConfig {
        ComboConfig {
            match_mode: self.match_mode.map(|mode| mode.name().to_string()),
            select_only_leafs: self.leafs_only.then_some(true),
            clear_button_visible: self.no_clear_button.then_some(false),
            disable_filtering: self.disable_filtering.then_some(true),
            width: self.width,
            popup_width: self.popup_width,
            label: self.label.clone(),
            helper_text: self.helper.clone(),
            debounce_ms: self.debounce_ms,
            ..ComboConfig::default()
        }
    }
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    if let Some(ref path) = args.log_file {
        init_logging(path)?;
    }

    if args.data.is_some() && args.demo.is_some() {
        return Err(eyre!(
            "Cannot specify both --data and --demo. Use --help for usage information."
        ));
    }

    let mut app = build_app(&args)?;

    if let Some(ref text) = args.filter {
        print_filtered(&mut app, text);
        return Ok(());
    }

    // Enable mouse capture before initializing the terminal
    crossterm::execute!(std::io::stderr(), crossterm::event::EnableMouseCapture)?;

    let mut terminal = ratatui::init();
    let result = run_event_loop(&mut terminal, &mut app, args.print_path);

    // Restore terminal and disable mouse capture
    ratatui::restore();
    crossterm::execute!(std::io::stderr(), crossterm::event::DisableMouseCapture)?;

    match result {
        Ok(Some(accepted)) => {
            println!("{accepted}");
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => Err(e),
    }
}

/// A terminal UI owns stdout and stderr, so logs only go to a file.
fn init_logging(path: &Path) -> color_eyre::Result<()> {
    let file = File::create(path)
        .map_err(|e| eyre!("Failed to create log file '{}': {}", path.display(), e))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "treecombo=debug".into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_app(args: &Args) -> color_eyre::Result<App> {
    let (title, data, preset, mut default_value) = match args.data {
        Some(ref path) => {
            let data = load_dataset(path)?;
            let title = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "dataset".to_string());
            (title, data, ComboConfig::default(), None)
        }
        None => {
            let kind = args.demo.unwrap_or_default();
            let demo = kind.build()?;
            let title = match kind {
                DemoKind::Library => "library",
                DemoKind::Departments => "departments",
            };
            (title.to_string(), demo.data, demo.config, demo.default_value)
        }
    };

    let file_layer = match args.config {
        Some(ref path) => load_config(path)?,
        None => ComboConfig::default(),
    };
    let options = preset.merge(file_layer).merge(args.config_layer()).to_options();

    if let Some(ref caption) = args.value {
        let found = data.find(|label| label == caption);
        if found.is_none() {
            return Err(eyre!("No item with caption '{}' in the dataset", caption));
        }
        default_value = found;
    }

    tracing::info!(title = %title, nodes = data.len(), "starting");
    Ok(App::new(title, data, options, default_value))
}

/// Headless mode: resolve `text` once from an empty selection and print the
/// tree as the popup would show it.
fn print_filtered(app: &mut App, text: &str) {
    println!("{}", filtered_outline(app, text));
}

/// Filters even when the options disable typing: `--filter` asks for it
/// explicitly.
fn filtered_outline(app: &mut App, text: &str) -> String {
    let combo = &mut app.combo;
    combo.set_value(None);
    if !text.trim().is_empty() {
        let predicate = build_predicate(text, combo.match_mode(), combo.label_provider());
        combo
            .data_provider_mut()
            .set_filter(Some(Rc::clone(&predicate)));
        combo.resolve(Some(&predicate), None);
    }

    let mut output = combo
        .tree()
        .outline(combo.data_provider(), &|label: &String| label.clone());
    if let Some(path) = app.value_path() {
        output.push_str(&format!("\nselected: {path}"));
    }
    output
}

fn run_event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
    print_path: bool,
) -> color_eyre::Result<Option<String>> {
    use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

    let accepted = |app: &App| {
        if print_path {
            app.value_path()
        } else {
            app.value_caption()
        }
    };

    loop {
        // A steady stream of mouse events must not hold back due filter text.
        app.tick(Instant::now());
        terminal.draw(|frame| ui::render(frame, app))?;

        // Block until input arrives or the pending filter text is due.
        if let Some(timeout) = app.combo.time_until_tick(Instant::now()) {
            if !event::poll(timeout)? {
                continue;
            }
        }

        match event::read()? {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                // Global quit shortcut
                if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
                    return Ok(None);
                }

                match app.handle_key(key, Instant::now()) {
                    app::Action::None => {}
                    app::Action::Quit => return Ok(None),
                    app::Action::Accept => return Ok(accepted(app)),
                }
            }
            Event::Mouse(mouse) => match app.handle_mouse(mouse) {
                app::Action::None => {}
                app::Action::Quit => return Ok(None),
                app::Action::Accept => return Ok(accepted(app)),
            },
            Event::Resize(_, _) => {
                // Redrawn on the next iteration
            }
            _ => {}
        }
    }
}
