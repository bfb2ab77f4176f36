//! talkwiki CLI
//!
//! Usage:
//!   talkwiki --synthesize request.json                # Print final wikitext
//!   talkwiki --locate target.json --page page.txt     # Find a comment in a page
//!   talkwiki --signatures --page page.txt             # List signatures on a page
//!   talkwiki --synthesize - --json < request.json     # Read stdin, JSON output
//!   talkwiki ... --config config.json                 # Preferences and weights

use clap::Parser;
use colored::Colorize;
use serde::de::DeserializeOwned;
use std::io::{self, Read};
use thiserror::Error;
use tracing::{debug, Level};

use talkwiki::core::{scan_signatures, synthesize, SourceLocator};
use talkwiki::types::{
    CommentSource, CommentTarget, EngineConfig, EngineError, SignatureOccurrence, SynthesisRequest,
};
use talkwiki::VERSION;

#[derive(Parser, Debug)]
#[command(
    name = "talkwiki",
    version = VERSION,
    about = "Turn plain talk page comments into wikitext and find comments in page source",
    long_about = "talkwiki synthesizes insertable wikitext from a plain comment body\n\
                  (indentation, lists, line breaks, headline, signature) and locates\n\
                  a known comment in the current wikitext of a page.\n\n\
                  Modes:\n  \
                  --synthesize <request.json>            Synthesize a comment\n  \
                  --locate <target.json> --page <file>   Locate a comment\n  \
                  --signatures --page <file>             List signatures\n\n\
                  Pass - as a file name to read it from stdin."
)]
struct Args {
    /// Synthesis request (JSON)
    #[arg(long, value_name = "FILE")]
    synthesize: Option<String>,

    /// Comment target to locate (JSON)
    #[arg(long, value_name = "FILE")]
    locate: Option<String>,

    /// List the signatures found on the page
    #[arg(long)]
    signatures: bool,

    /// Page wikitext for --locate and --signatures
    #[arg(long, value_name = "FILE")]
    page: Option<String>,

    /// Engine configuration (JSON: {"synthesis": ..., "locator": ...})
    #[arg(long, value_name = "FILE")]
    config: Option<String>,

    /// Output as JSON
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,

    /// Log engine decisions to stderr
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("couldn't read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("couldn't write output: {0}")]
    Output(#[from] serde_json::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("--page is required with --{0}")]
    MissingPage(&'static str),

    #[error("nothing to do: pass --synthesize, --locate or --signatures (see --help)")]
    NoCommand,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    if args.no_color {
        colored::control::set_override(false);
    }

    if let Err(error) = run(&args) {
        match (&error, args.json) {
            (CliError::Engine(engine_error), true) => {
                match serde_json::to_string_pretty(engine_error) {
                    Ok(json) => println!("{}", json),
                    Err(_) => eprintln!("{} {}", "error:".red().bold(), error),
                }
            }
            _ => eprintln!("{} {}", "error:".red().bold(), error),
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(args: &Args) -> Result<(), CliError> {
    let config: EngineConfig = match &args.config {
        Some(path) => load_json(path)?,
        None => EngineConfig::default(),
    };

    if let Some(path) = &args.synthesize {
        let request: SynthesisRequest = load_json(path)?;
        debug!(mode = %request.mode, "synthesizing");
        let wikitext = synthesize(&request, &config.synthesis)?;
        if args.json {
            let output = serde_json::json!({ "wikitext": wikitext });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            print!("{}", wikitext);
        }
        return Ok(());
    }

    if let Some(path) = &args.locate {
        let page_path = args.page.as_deref().ok_or(CliError::MissingPage("locate"))?;
        let target: CommentTarget = load_json(path)?;
        let page = read_input(page_path)?;
        let source = SourceLocator::new(config.locator).locate(&page, &target)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&source)?);
        } else {
            print_source(&source);
        }
        return Ok(());
    }

    if args.signatures {
        let page_path = args.page.as_deref().ok_or(CliError::MissingPage("signatures"))?;
        let page = read_input(page_path)?;
        let occurrences = scan_signatures(&page);
        if args.json {
            println!("{}", serde_json::to_string_pretty(&occurrences)?);
        } else {
            print_signatures(&occurrences);
        }
        return Ok(());
    }

    Err(CliError::NoCommand)
}

/// Read a file, or stdin for `-`
fn read_input(path: &str) -> Result<String, CliError> {
    let result = if path == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).map(|_| buffer)
    } else {
        std::fs::read_to_string(path)
    };
    result.map_err(|source| CliError::Io {
        path: path.to_string(),
        source,
    })
}

fn load_json<T: DeserializeOwned>(path: &str) -> Result<T, CliError> {
    let text = read_input(path)?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_string(),
        source,
    })
}

/// Print a located comment
fn print_source(source: &CommentSource) {
    println!(
        "{} signature #{} (score {:.3})",
        "Found".green().bold(),
        source.signature_index,
        source.score
    );
    println!(
        "  headline:    {}",
        source.headline.as_deref().unwrap_or("(before first heading)")
    );
    println!("  indentation: {:?}", source.indentation);
    if source.is_reply_outdented {
        println!("  reply:       {}", "outdented".yellow());
    } else {
        println!("  reply:       {:?}", source.reply_indentation);
    }
    println!(
        "  span:        {}..{} (signature to {})",
        source.start_index, source.end_index, source.signature_end_index
    );
    println!("  code:        {}", source.code.dimmed());
}

/// Print scanned signatures, one per line
fn print_signatures(occurrences: &[SignatureOccurrence]) {
    if occurrences.is_empty() {
        println!("{}", "No signatures found".yellow());
        return;
    }
    for occurrence in occurrences {
        let timestamp = match occurrence.date {
            Some(date) => date.format("%Y-%m-%d %H:%M").to_string().normal(),
            None if occurrence.timestamp.is_undated() => occurrence.timestamp.to_string().yellow(),
            None => occurrence.timestamp.to_string().normal(),
        };
        println!(
            "{:>4}  {}  {}  {}",
            occurrence.index,
            occurrence.author.to_string().cyan(),
            timestamp,
            occurrence
                .headline
                .as_deref()
                .map(|headline| format!("[{}]", headline))
                .unwrap_or_default()
                .dimmed()
        );
    }
}
