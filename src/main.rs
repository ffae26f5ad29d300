use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use epub_reader::config::{self, Config};
use epub_reader::settings::{SettingsPatch, SettingsStore, parse_query};
use epub_reader::storage::{FileStorage, NoStorage, Storage};

#[derive(Parser)]
#[command(name = "epub-reader", about = "Inspect and maintain saved EPUB reader settings")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Persistence key namespace
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// Directory holding saved settings
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    /// Log output file path (logs go to stderr otherwise)
    #[arg(long, global = true)]
    log: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the persistence key of a book
    Key {
        /// Book path or URL
        book: String,
    },
    /// Print the resolved settings of a book as JSON
    Show {
        /// Book path or URL
        book: String,

        /// URL query string applied as overrides (e.g. `history=false&language=ja`)
        #[arg(long)]
        query: Option<String>,

        /// Ignore saved settings
        #[arg(long)]
        no_restore: bool,
    },
    /// Remove saved settings of a book
    Clear {
        /// Book path or URL
        book: String,
    },
    /// List bookmarks, or add/remove one and save
    Bookmark {
        /// Book path or URL
        book: String,

        /// Position to bookmark
        #[arg(long)]
        add: Option<String>,

        /// Position to unbookmark
        #[arg(long)]
        remove: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Some(log_path) = &cli.log {
        let file = match std::fs::File::create(log_path) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Error: failed to open log file {}: {e}", log_path.display());
                std::process::exit(1);
            }
        };
        env_logger::Builder::from_default_env()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .init();
    } else {
        env_logger::init();
    }

    // Load config file and merge CLI overrides
    let mut cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
    };
    cfg.merge_cli(cli.namespace, cli.storage_dir);
    let config = cfg.resolve();

    let storage: Rc<dyn Storage> = match &config.storage_dir {
        Some(dir) => Rc::new(FileStorage::new(dir)),
        None => {
            info!("main: no data directory, saved settings unavailable");
            Rc::new(NoStorage)
        }
    };

    let result = match cli.command {
        Command::Key { book } => {
            let store = open_store(&book, false, None, &config, storage);
            println!("{}", store.book_key());
            Ok(())
        }
        Command::Show {
            book,
            query,
            no_restore,
        } => cmd_show(&book, !no_restore, query.as_deref(), &config, storage),
        Command::Clear { book } => {
            let mut store = open_store(&book, false, None, &config, storage);
            if store.clear_persisted() {
                println!("removed saved settings for {book}");
            } else {
                println!("no saved settings for {book}");
            }
            Ok(())
        }
        Command::Bookmark { book, add, remove } => {
            cmd_bookmark(&book, add, remove, &config, storage)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn open_store(
    book: &str,
    restore: bool,
    query: Option<&str>,
    config: &Config,
    storage: Rc<dyn Storage>,
) -> SettingsStore {
    let overrides = SettingsPatch {
        restore: Some(restore),
        ..Default::default()
    };
    let query = query.map(parse_query).unwrap_or_default();
    SettingsStore::initialize(book, overrides, query, config, storage)
}

fn cmd_show(
    book: &str,
    restore: bool,
    query: Option<&str>,
    config: &Config,
    storage: Rc<dyn Storage>,
) -> Result<()> {
    let store = open_store(book, restore, query, config, storage);
    let json = serde_json::to_string_pretty(store.settings())
        .context("failed to serialize settings")?;
    println!("{json}");
    if !store.is_persisted() {
        eprintln!("(no saved settings for {book})");
    }
    Ok(())
}

fn cmd_bookmark(
    book: &str,
    add: Option<String>,
    remove: Option<String>,
    config: &Config,
    storage: Rc<dyn Storage>,
) -> Result<()> {
    let mut store = open_store(book, true, None, config, storage);
    let changed = add.is_some() || remove.is_some();

    let bookmarks = &mut store.settings_mut().bookmarks;
    if let Some(cfi) = add
        && !bookmarks.contains(&cfi)
    {
        bookmarks.push(cfi);
    }
    if let Some(cfi) = remove {
        bookmarks.retain(|b| *b != cfi);
    }

    for b in &store.settings().bookmarks {
        println!("{b}");
    }
    if changed && !store.persist(None) {
        anyhow::bail!("could not save bookmarks for {book}");
    }
    Ok(())
}
