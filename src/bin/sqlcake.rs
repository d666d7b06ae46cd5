//! sqlcake CLI
//!
//! Usage: sqlcake [SQL] [-f FILE] [--json] [--from-json] ...
//!
//! Reads one SQL statement from the argument, a file, or stdin and prints
//! the CakePHP query builder code for it. `RUST_LOG` controls the log
//! output on stderr.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use sqlcake::{GeneratorConfig, TableLocator, Translator, TranslatorConfig};

#[derive(Parser)]
#[command(name = "sqlcake")]
#[command(about = "Translate a SQL statement into CakePHP query builder code")]
struct Args {
    /// SQL statement (read from stdin when neither this nor --file is given)
    sql: Option<String>,

    /// Read the statement from a file
    #[arg(short, long, conflicts_with = "sql")]
    file: Option<PathBuf>,

    /// Print the parsed statement as JSON instead of PHP
    #[arg(long)]
    json: bool,

    /// Input is a JSON statement (as printed by --json), not SQL
    #[arg(long, conflicts_with = "json")]
    from_json: bool,

    /// Spaces per indentation level
    #[arg(long, default_value = "4")]
    indent: usize,

    /// Use TableRegistry::getTableLocator() instead of $this->fetchTable()
    #[arg(long)]
    registry: bool,

    /// Leave out the result fetching examples
    #[arg(long)]
    no_usage: bool,

    /// Leave out association and alias hints
    #[arg(long)]
    no_advisories: bool,

    /// Reject input larger than this many bytes
    #[arg(long, default_value = "65536")]
    max_input: usize,
}

fn read_input(args: &Args) -> io::Result<String> {
    if let Some(sql) = &args.sql {
        return Ok(sql.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path);
    }
    if atty::is(atty::Stream::Stdin) {
        eprintln!("Enter a SQL statement, then Ctrl-D:");
    }
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;
    Ok(input)
}

fn run(args: &Args) -> Result<String, String> {
    let input = read_input(args).map_err(|e| format!("failed to read input: {}", e))?;

    let locator = if args.registry {
        TableLocator::TableRegistry
    } else {
        TableLocator::FetchTable
    };
    let config = TranslatorConfig::new()
        .with_max_input_len(args.max_input)
        .with_generator(
            GeneratorConfig::new()
                .with_indent(args.indent)
                .with_locator(locator)
                .with_usage_examples(!args.no_usage)
                .with_advisories(!args.no_advisories),
        );
    let translator = Translator::with_config(config);

    let output = if args.from_json {
        translator.translate_json(&input)
    } else if args.json {
        translator.parse(&input).and_then(|stmt| stmt.to_json())
    } else {
        translator.translate(&input)
    };
    output.map_err(|e| e.to_string())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            ExitCode::SUCCESS
        }
        Err(message) => {
            tracing::debug!(%message, "translation failed");
            eprintln!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}
