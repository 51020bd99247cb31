use clap::{Parser, Subcommand, ValueEnum};
use redraft::config::Config;
use redraft::ingest;
use redraft::richtext::range_mutator::remove_matches;
use redraft::richtext::style_editor::apply_style_to_matches;
use redraft::suggest::{StaticSuggestions, SuggestionMode, SuggestionProvider};
use redraft::{
    Delivery, Document, Position, Selection, StyleTag, SuggestionSession,
    apply_style_over_selection, extract_text, replace_selection_with_text,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "redraft")]
#[command(about = "Review AI rewrites of selected text", long_about = None)]
struct Args {
    /// Treat input files as Markdown instead of one block per line
    #[arg(short = 'm', long, global = true)]
    markdown: bool,

    /// How to print resulting documents
    #[arg(short = 'f', long, value_enum, default_value = "text", global = true)]
    format: Format,

    /// Config file (default: platform config dir)
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    /// Block dump with spans
    Text,
    /// Serialized document
    Toml,
    /// Plain text, blocks separated by newlines
    Plain,
    /// Markdown with bold and italic spans
    Markdown,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the ingested document
    Show { file: PathBuf },
    /// Print the text of a selection
    Extract {
        file: PathBuf,
        /// Anchor as BLOCK:OFFSET
        #[arg(long)]
        from: Position,
        /// Focus as BLOCK:OFFSET
        #[arg(long)]
        to: Position,
    },
    /// Apply a style tag over a selection
    Style {
        file: PathBuf,
        #[arg(long)]
        from: Position,
        #[arg(long)]
        to: Position,
        /// Tag to apply (default: the pending tag)
        #[arg(long)]
        tag: Option<String>,
    },
    /// Replace a selection with text
    Replace {
        file: PathBuf,
        #[arg(long)]
        from: Position,
        #[arg(long)]
        to: Position,
        /// Replacement text
        #[arg(long)]
        text: String,
        /// Tag the inserted text
        #[arg(long)]
        tag: Option<String>,
    },
    /// Bold reference markers, or strip reference trailers
    References {
        file: PathBuf,
        /// Remove "Extracted from: ..." trailers instead of styling markers
        #[arg(long)]
        strip: bool,
    },
    /// Run a whole suggestion cycle with fixed candidates
    Suggest {
        file: PathBuf,
        #[arg(long)]
        from: Position,
        #[arg(long)]
        to: Position,
        /// Candidate rewrite (repeat for several)
        #[arg(long = "candidate", required = true)]
        candidates: Vec<String>,
        /// Index of the candidate to apply
        #[arg(long, default_value = "0")]
        pick: usize,
        /// Quick action label
        #[arg(long, default_value = "Rewrite", conflicts_with = "prompt")]
        action: String,
        /// Free-form instruction instead of a quick action
        #[arg(long)]
        prompt: Option<String>,
        /// Roll back instead of accepting
        #[arg(long)]
        reject: bool,
    },
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config, String> {
    match path {
        Some(path) => Config::load_from(path).map_err(|e| e.to_string()),
        None => Ok(Config::load()),
    }
}

fn load_document(file: &Path, markdown: bool) -> Result<Document, String> {
    let contents = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read '{}': {}", file.display(), e))?;
    Ok(if markdown {
        ingest::from_markdown(&contents)
    } else {
        ingest::from_plain_text(&contents)
    })
}

fn print_document(doc: &Document, format: Format) -> Result<(), String> {
    match format {
        Format::Text => print!("{}", doc),
        Format::Plain => println!("{}", ingest::to_plain_text(doc)),
        Format::Markdown => println!("{}", ingest::to_markdown(doc)),
        Format::Toml => {
            let toml = toml::to_string_pretty(doc)
                .map_err(|e| format!("toml serialization error: {}", e))?;
            print!("{}", toml);
        }
    }
    Ok(())
}

fn tag_or_pending(tag: Option<String>, config: &Config) -> StyleTag {
    tag.map(StyleTag::new)
        .unwrap_or_else(|| config.pending_tag.clone())
}

fn cmd_references(doc: &Document, strip: bool, config: &Config) -> Result<Document, String> {
    if strip {
        let pattern = config.trailer_regex().map_err(|e| e.to_string())?;
        remove_matches(doc, &pattern).map_err(|e| e.to_string())
    } else {
        let pattern = config.reference_regex().map_err(|e| e.to_string())?;
        Ok(apply_style_to_matches(doc, &pattern, &config.reference_tag))
    }
}

fn cmd_suggest(
    doc: Document,
    selection: Selection,
    candidates: Vec<String>,
    pick: usize,
    mode: SuggestionMode,
    reject: bool,
    config: &Config,
) -> Result<Document, String> {
    let provider = StaticSuggestions::new(candidates);
    let mut session = SuggestionSession::with_pending_tag(doc, config.pending_tag.clone());

    let selection = session.highlight(selection).map_err(|e| e.to_string())?;
    let request = session
        .request_suggestions("", mode)
        .map_err(|e| e.to_string())?;
    eprintln!("Requesting {} for {:?}", request.mode, request.fragment);

    let candidates = provider.suggest(&request).map_err(|e| e.to_string())?;
    if session.receive_candidates(request.id, candidates) == Delivery::Discarded {
        return Err("Suggestions arrived too late".to_string());
    }

    let inserted = session.choose(pick).map_err(|e| e.to_string())?;
    eprintln!("Applied candidate {} over {} (was {})", pick, inserted, selection);

    if reject {
        Ok(session.cancel().clone())
    } else {
        session.accept().cloned().map_err(|e| e.to_string())
    }
}

fn run(args: Args, config: &Config) -> Result<(), String> {
    let format = args.format;
    let markdown = args.markdown;

    match args.command {
        Commands::Show { file } => {
            let doc = load_document(&file, markdown)?;
            print_document(&doc, format)
        }
        Commands::Extract { file, from, to } => {
            let doc = load_document(&file, markdown)?;
            let text = extract_text(&doc, &Selection::new(from, to)).map_err(|e| e.to_string())?;
            println!("{}", text);
            Ok(())
        }
        Commands::Style { file, from, to, tag } => {
            let doc = load_document(&file, markdown)?;
            let tag = tag_or_pending(tag, config);
            let styled = apply_style_over_selection(&doc, &Selection::new(from, to), &tag)
                .map_err(|e| e.to_string())?;
            print_document(&styled, format)
        }
        Commands::Replace {
            file,
            from,
            to,
            text,
            tag,
        } => {
            let doc = load_document(&file, markdown)?;
            let tag = tag.map(StyleTag::new);
            let (new_doc, selection) =
                replace_selection_with_text(&doc, &Selection::new(from, to), &text, tag.as_ref())
                    .map_err(|e| e.to_string())?;
            print_document(&new_doc, format)?;
            eprintln!("Selection: {}", selection);
            Ok(())
        }
        Commands::References { file, strip } => {
            let doc = load_document(&file, markdown)?;
            let doc = cmd_references(&doc, strip, config)?;
            print_document(&doc, format)
        }
        Commands::Suggest {
            file,
            from,
            to,
            candidates,
            pick,
            action,
            prompt,
            reject,
        } => {
            let doc = load_document(&file, markdown)?;
            let mode = match prompt {
                Some(prompt) => SuggestionMode::CustomPrompt(prompt),
                None => SuggestionMode::QuickAction(action),
            };
            let doc = cmd_suggest(
                doc,
                Selection::new(from, to),
                candidates,
                pick,
                mode,
                reject,
                config,
            )?;
            print_document(&doc, format)
        }
    }
}

fn main() {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    init_logging(&config);

    if let Err(e) = run(args, &config) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
