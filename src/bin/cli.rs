//! Binary entry point for the Sombra predicate filter CLI.
#![forbid(unsafe_code)]

#[path = "cli/config.rs"]
mod config;
#[path = "cli/ui.rs"]
mod ui;

use std::error::Error;
use std::io::{BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sombra_filter::query::{
    parse_predicate, FunctionRegistry, JsonResolver, ParseOptions, Translator,
};
use sombra_filter::FilterErrorWithCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use config::CliConfig;
use ui::{Theme, Ui};

const LOG_ENV: &str = "SOMBRA_FILTER_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "sombra-filter",
    version,
    about = "Translate predicate expressions into rules-engine query text",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "SOMBRA_FILTER_CONFIG",
        value_name = "FILE",
        help = "Path to the filter config file"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for translated queries"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_name = "NAME",
        help = "Subject parameter used when an expression has no `x =>` prefix"
    )]
    param: Option<String>,

    #[arg(
        long = "collection",
        global = true,
        value_name = "MEMBER",
        help = "Treat MEMBER as a collection (repeatable)"
    )]
    collections: Vec<String>,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = ThemeArg::Auto,
        help = "Color theme for terminal output"
    )]
    theme: ThemeArg,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a single predicate expression.
    Translate {
        #[arg(value_name = "EXPR")]
        expr: String,
    },
    /// Read predicates line by line until `q` or end of input.
    Repl,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ThemeArg {
    Auto,
    Light,
    Dark,
    Plain,
}

impl From<ThemeArg> for Theme {
    fn from(theme: ThemeArg) -> Self {
        match theme {
            ThemeArg::Auto => Theme::Auto,
            ThemeArg::Light => Theme::Light,
            ThemeArg::Dark => Theme::Dark,
            ThemeArg::Plain => Theme::Plain,
        }
    }
}

#[derive(Serialize)]
struct QueryReport<'a> {
    query: &'a str,
}

struct Session {
    options: ParseOptions,
    translator: Translator,
    format: OutputFormat,
    ui: Ui,
}

impl Session {
    fn translate(&self, expr: &str) -> Result<String, Box<dyn Error>> {
        let predicate = parse_predicate(expr, &self.options)?;
        let query = self
            .translator
            .translate_predicate(&predicate)
            .map_err(|err| FilterErrorWithCode(&err).to_string())?;
        Ok(query)
    }

    fn emit(&self, prefix: Option<&str>, query: &str) -> Result<(), Box<dyn Error>> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string(&QueryReport { query })?;
                println!("{json}");
            }
            OutputFormat::Text => self.ui.query(prefix, query),
        }
        Ok(())
    }
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let session = build_session(&cli)?;

    match &cli.command {
        Command::Translate { expr } => {
            let query = session.translate(expr)?;
            session.emit(None, &query)?;
        }
        Command::Repl => run_repl(&session)?,
    }
    Ok(())
}

fn build_session(cli: &Cli) -> Result<Session, Box<dyn Error>> {
    let config = CliConfig::load(cli.config.clone())?;
    debug!(path = ?config.path(), "filter.cli.config_loaded");

    let mut options = ParseOptions::default();
    if let Some(param) = cli.param.as_deref().or(config.param()) {
        options = options.with_default_param(param);
    }
    for member in config.collections().iter().chain(&cli.collections) {
        options = options.with_collection(member.clone());
    }
    if let Some(captures) = config.captures()? {
        options = options.with_captures(captures);
    }

    let registry = FunctionRegistry::with_builtins(Arc::new(config.context()));
    let translator = Translator::new()
        .with_registry(registry)
        .with_resolver(Arc::new(JsonResolver));

    Ok(Session {
        options,
        translator,
        format: cli.format,
        ui: Ui::new(cli.theme.into()),
    })
}

fn run_repl(session: &Session) -> Result<(), Box<dyn Error>> {
    let stdin = std::io::stdin();
    let interactive = stdin.is_terminal();
    let mut lines = stdin.lock().lines();
    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();
        if input == "q" {
            break;
        }
        if input.is_empty() {
            continue;
        }
        match session.translate(input) {
            Ok(query) => session.emit(Some("query is:"), &query)?,
            Err(err) => session.ui.error(&err.to_string()),
        }
    }
    Ok(())
}
