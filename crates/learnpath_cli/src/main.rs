//! Command-line shell over the learnpath core.
//!
//! # Responsibility
//! - Map subcommands onto portal use-cases.
//! - Render results as plain text or JSON.

use clap::{Parser, Subcommand};
use learnpath_core::{
    group_by_letter, init_logging, DocumentPart, Grade, LeafKey, Outcome, Portal, PortalConfig,
    QuizPhase, QuizQuestion, QuizSession, SectionView,
};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// Learning portal: navigation, progress, search, quizzes and offline cache.
#[derive(Parser)]
#[command(name = "learnpath", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML config file
    #[arg(short, long, global = true, env = "LEARNPATH_CONFIG")]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List every navigable leaf with its read flag.
    Structure,
    /// Show one section and record the visit.
    Show {
        /// `/axis/chapter/section[/subsection]`
        path: String,
    },
    /// Search content.
    Search { query: String },
    /// Mark a section read (or unread).
    MarkRead {
        path: String,
        #[arg(long)]
        unread: bool,
    },
    /// Overall reading progress.
    Progress,
    /// Toggle a section favorite.
    Favorite { path: String },
    /// List favorites.
    Favorites,
    /// Read, replace or clear the note of a section.
    Note {
        path: String,
        /// New note text. Omit to print the current note.
        text: Option<String>,
        #[arg(long, conflicts_with = "text")]
        clear: bool,
    },
    /// Run the quizzes of a section interactively.
    Quiz {
        path: String,
        /// Seed for a reproducible question order
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Browse the glossary, grouped by initial.
    Glossary {
        /// Text matched against terms and definitions
        query: Option<String>,
        /// Keep one category only
        #[arg(long)]
        category: Option<String>,
        /// List categories instead of terms
        #[arg(long, conflicts_with_all = ["query", "category"])]
        categories: bool,
    },
    /// Fill the offline caches.
    Prefetch {
        /// Also cache the static shell assets
        #[arg(long)]
        shell: bool,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Structure => "structure",
            Self::Show { .. } => "show",
            Self::Search { .. } => "search",
            Self::MarkRead { .. } => "mark-read",
            Self::Progress => "progress",
            Self::Favorite { .. } => "favorite",
            Self::Favorites => "favorites",
            Self::Note { .. } => "note",
            Self::Quiz { .. } => "quiz",
            Self::Glossary { .. } => "glossary",
            Self::Prefetch { .. } => "prefetch",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let config = PortalConfig::load(cli.config.as_deref()).map_err(|err| err.to_string())?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, &log_dir.to_string_lossy())?;
    }
    let portal = Portal::open(config).map_err(|err| err.to_string())?;
    let json = cli.json;
    debug!(
        "event=cli_command module=cli status=start command={} json={json}",
        cli.command.name()
    );

    match cli.command {
        Command::Structure => {
            let items = portal.navigation();
            if json {
                return print_json(&items);
            }
            for item in items {
                let key = item.key();
                let marker = if portal.is_read(&key) { "x" } else { " " };
                println!("[{marker}] {}  {}", key.url_path(), item.title());
            }
        }
        Command::Show { path } => {
            let view = portal.visit(&parse_key(&path)?).map_err(|err| err.to_string())?;
            if json {
                return print_json(&view);
            }
            print_section(&view);
        }
        Command::Search { query } => {
            let hits = portal.search(&query);
            if json {
                return print_json(&hits);
            }
            if hits.is_empty() {
                println!("No results.");
            }
            for hit in hits {
                println!("{}  {}\n    {}", hit.path, hit.title, hit.excerpt);
            }
        }
        Command::MarkRead { path, unread } => {
            let key = parse_key(&path)?;
            let result = if unread {
                portal.mark_unread(&key)
            } else {
                portal.mark_read(&key)
            };
            result.map_err(|err| err.to_string())?;
            print_progress(&portal, json)?;
        }
        Command::Progress => print_progress(&portal, json)?,
        Command::Favorite { path } => {
            let active = portal
                .toggle_favorite(&parse_key(&path)?)
                .map_err(|err| err.to_string())?;
            if json {
                return print_json(&serde_json::json!({ "path": path, "favorite": active }));
            }
            println!("{} {path}", if active { "Added" } else { "Removed" });
        }
        Command::Favorites => {
            let favorites = portal.favorites();
            if json {
                return print_json(&favorites);
            }
            for favorite in favorites {
                println!("{}  {}", favorite.path, favorite.title);
            }
        }
        Command::Note { path, text, clear } => {
            let key = parse_key(&path)?;
            portal.item(&key).map_err(|err| err.to_string())?;
            let result = match (text, clear) {
                (Some(text), _) => portal.set_note(&key, &text),
                (None, true) => portal.set_note(&key, ""),
                (None, false) => {
                    println!("{}", portal.note(&key));
                    return Ok(());
                }
            };
            result.map_err(|err| err.to_string())?;
        }
        Command::Quiz { path, seed } => {
            let view = portal.section(&parse_key(&path)?).map_err(|err| err.to_string())?;
            let quizzes = view.document.quizzes().collect::<Vec<_>>();
            if quizzes.is_empty() {
                println!("No quiz in {path}.");
            }
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_rng(&mut rand::rng()),
            };
            let stdin = io::stdin();
            let mut input = stdin.lock();
            for questions in quizzes {
                run_quiz(questions, &mut rng, &mut input)?;
            }
        }
        Command::Glossary {
            query,
            category,
            categories,
        } => {
            let glossary = portal.glossary().map_err(|err| err.to_string())?;
            if categories {
                let names = glossary.categories();
                if json {
                    return print_json(&names);
                }
                for name in names {
                    println!("{name}");
                }
                return Ok(());
            }
            let query = query.unwrap_or_default();
            let groups = group_by_letter(glossary.filter(&query, category.as_deref()));
            if json {
                return print_json(&groups);
            }
            if groups.is_empty() {
                println!("No term matches `{query}`.");
            }
            for group in groups {
                println!("{}", group.letter);
                for term in group.terms {
                    println!("  {} [{}]\n      {}", term.term, term.category, term.definition);
                }
            }
        }
        Command::Prefetch { shell } => {
            let install = if shell {
                Some(portal.install_shell().map_err(|err| err.to_string())?)
            } else {
                None
            };
            let report = portal.prefetch_content().map_err(|err| err.to_string())?;
            if json {
                return print_json(&serde_json::json!({ "install": install, "activation": report }));
            }
            if let Some(install) = install {
                println!("shell: {} asset(s) in {}", install.cached, install.cache_name);
            }
            println!(
                "content: {} cached, {} failed, {} stale cache(s) removed",
                report.cached.len(),
                report.failed.len(),
                report.deleted_caches.len()
            );
            for url in report.failed {
                println!("  failed {url}");
            }
        }
    }
    Ok(())
}

fn parse_key(path: &str) -> Result<LeafKey, String> {
    LeafKey::parse_path(path)
        .ok_or_else(|| format!("expected /axis/chapter/section[/subsection], got `{path}`"))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}

fn print_progress(portal: &Portal, json: bool) -> Result<(), String> {
    let stats = portal.progress();
    if json {
        return print_json(&stats);
    }
    println!("{}/{} read ({}%)", stats.completed, stats.total, stats.percentage);
    Ok(())
}

fn print_section(view: &SectionView) {
    println!(
        "{} > {} > {}",
        view.item.axis_name,
        view.item.chapter_name,
        view.item.title()
    );
    println!(
        "{} min read{}{}",
        view.reading_time_minutes,
        if view.is_read { " · read" } else { "" },
        if view.is_favorite { " · favorite" } else { "" }
    );
    for entry in &view.toc {
        let indent = if entry.level == 3 { "    " } else { "  " };
        println!("{indent}- {} (#{})", entry.text, entry.anchor);
    }
    println!();
    for part in &view.document.parts {
        match part {
            DocumentPart::Markdown(text) => print!("{text}"),
            DocumentPart::Quiz(questions) => {
                println!("[quiz: {} question(s)]", questions.len())
            }
        }
    }
    println!();
    if !view.note.is_empty() {
        println!("Note: {}", view.note);
    }
    if let Some(prev) = &view.prev {
        println!("<- {}", prev.url_path());
    }
    if let Some(next) = &view.next {
        println!("-> {}", next.url_path());
    }
}

fn run_quiz(
    questions: &[QuizQuestion],
    rng: &mut StdRng,
    input: &mut impl BufRead,
) -> Result<(), String> {
    let mut session = QuizSession::with_rng(questions, rng);
    while session.phase() == QuizPhase::Active {
        let index = session.current_index();
        let Some(question) = session.current_question().cloned() else {
            break;
        };
        println!("\nQuestion {}/{}: {}", index + 1, session.len(), question.question);
        for (number, option) in question.options.iter().enumerate() {
            println!("  {}. {}", number + 1, option.text);
        }

        let Some(choice) = read_choice(input, question.options.len())? else {
            println!("Quiz aborted.");
            return Ok(());
        };
        session.select_option(choice);
        session.validate();
        match session.outcome(index) {
            Outcome::Correct => println!("Correct."),
            _ => {
                let answer = question
                    .options
                    .iter()
                    .find(|option| option.is_correct)
                    .map_or("", |option| option.text.as_str());
                println!("Incorrect. Answer: {answer}");
            }
        }
        if let Some(explanation) = &question.explanation {
            println!("  {explanation}");
        }
        session.next();
    }

    let message = match session.grade() {
        Grade::Excellent => "Excellent!",
        Grade::Good => "Good job.",
        Grade::KeepPracticing => "Keep practicing.",
    };
    println!(
        "\nScore: {}/{} ({}%) {message}",
        session.score(),
        session.len(),
        session.percentage()
    );
    Ok(())
}

/// Reads a 1-based option number. `None` on end of input.
fn read_choice(input: &mut impl BufRead, count: usize) -> Result<Option<usize>, String> {
    loop {
        print!("> ");
        io::stdout().flush().map_err(|err| err.to_string())?;
        let mut line = String::new();
        if input.read_line(&mut line).map_err(|err| err.to_string())? == 0 {
            return Ok(None);
        }
        match line.trim().parse::<usize>() {
            Ok(number) if (1..=count).contains(&number) => return Ok(Some(number - 1)),
            _ => println!("Enter a number between 1 and {count}."),
        }
    }
}
