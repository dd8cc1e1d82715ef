use anyhow::{bail, Context};
use clap::Parser;
use pt_client::{Generation, HttpNewsApi, NewsGenerator};
use pt_core::{Article, Clock, HumanDuration, NewsConfig, SystemClock, BREAKING_NEWS};
use pt_inference::InferenceConfig;
use pt_storage::{create_backend, NewsStore, TtlCache};
use pt_web::AppState;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "AI-generated news desk", long_about = None)]
pub struct Cli {
    /// Base URL of a running `pt serve`
    #[arg(long, env = "PT_SERVER", default_value = "http://127.0.0.1:3000", global = true)]
    server: String,
    /// State backend: memory, file or sqlite
    #[arg(long, env = "PT_STORAGE", default_value = "file", global = true)]
    storage: String,
    /// Directory (file) or database path (sqlite) for saved state
    #[arg(long, env = "PT_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// How long a section stays fresh (e.g. 1h, 30m, 1h15m)
    #[arg(long, default_value = "1h", global = true)]
    freshness: HumanDuration,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the news routes
    Serve(ServeArgs),
    #[command(flatten)]
    Desk(DeskCommands),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,
    #[arg(long, env = "PERPLEXITY_API_KEY", hide_env_values = true)]
    perplexity_api_key: Option<String>,
    #[arg(long, env = "XAI_API_KEY", hide_env_values = true)]
    xai_api_key: Option<String>,
    #[arg(long, env = "PERPLEXITY_BASE_URL")]
    perplexity_base_url: Option<String>,
    #[arg(long, env = "XAI_BASE_URL")]
    xai_base_url: Option<String>,
}

/// Commands that talk to a running server and the local store.
#[derive(clap::Subcommand, Debug)]
enum DeskCommands {
    /// Generate headlines for a section
    Headlines {
        #[arg(long, default_value = BREAKING_NEWS)]
        section: String,
        /// Keep asking until at least this many distinct headlines arrive
        #[arg(long, default_value_t = pt_core::config::DEFAULT_MIN_HEADLINES)]
        min: usize,
    },
    /// Write the article for a headline and add it to its section
    Article {
        headline: String,
        #[arg(long, default_value = BREAKING_NEWS)]
        section: String,
    },
    /// Regenerate sections; without --section only stale ones are refreshed
    Refresh {
        #[arg(long)]
        section: Option<String>,
        #[arg(long, default_value_t = pt_core::config::DEFAULT_MIN_HEADLINES)]
        count: usize,
        /// Refresh even when the section is still fresh
        #[arg(long)]
        force: bool,
    },
    /// Long-form version of a stored article
    Expand { id: String },
    /// Manage saved articles
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
    /// List sections and their freshness
    Sections {
        /// Make this the selected section
        #[arg(long)]
        select: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum SavedCommands {
    List,
    Save { id: String },
    Remove { id: String },
}

fn print_article(article: &Article) {
    println!("📰 {} [{}]", article.headline, article.id);
    println!("   {}", article.summary);
    if !article.keywords.is_empty() {
        println!("   🏷  {}", article.keywords.join(", "));
    }
    for source in &article.sources {
        println!("   🔗 {}", source);
    }
}

/// Cancel the active generation on Ctrl-C instead of killing the process.
fn cancel_on_interrupt(generator: &Arc<NewsGenerator>) {
    let generator = generator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupted, cancelling generation");
            generator.cancel_generation();
        }
    });
}

async fn open_store(
    storage: &str,
    data_dir: Option<&Path>,
    config: &NewsConfig,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<(Arc<NewsStore>, TtlCache)> {
    let backend = create_backend(storage, data_dir)
        .await
        .with_context(|| format!("opening {} storage", storage))?;
    let store = NewsStore::load(backend.clone(), clock.clone(), config).await?;
    let cache = TtlCache::new(backend, clock, config.article_cache_ttl);
    Ok((Arc::new(store), cache))
}

async fn refresh(
    generator: &NewsGenerator,
    config: &NewsConfig,
    section: Option<String>,
    count: usize,
    force: bool,
) -> anyhow::Result<()> {
    let sections = match section {
        Some(section) => vec![section],
        None => config.sections.clone(),
    };

    for section in sections {
        if !force && !generator.store().needs_update(&section).await {
            info!("✨ {} is fresh, skipping", section);
            continue;
        }
        info!("🔄 Refreshing {}", section);
        match generator.refresh_section(&section, count).await? {
            Generation::Completed(articles) => {
                info!("✅ {} now has {} articles", section, articles.len());
            }
            Generation::Cancelled => {
                warn!("🛑 Refresh of {} cancelled", section);
                break;
            }
        }
    }
    Ok(())
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let inference = InferenceConfig {
        perplexity_api_key: args.perplexity_api_key,
        perplexity_base_url: args.perplexity_base_url,
        xai_api_key: args.xai_api_key,
        xai_base_url: args.xai_base_url,
    };
    inference.validate()?;
    info!("🧠 Starting news routes");
    pt_web::serve(args.addr, AppState::from_config(&inference)).await?;
    Ok(())
}

async fn run_desk(
    server: &str,
    storage: &str,
    data_dir: Option<&Path>,
    config: NewsConfig,
    command: DeskCommands,
) -> anyhow::Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (store, cache) = open_store(storage, data_dir, &config, clock.clone()).await?;
    let api = Arc::new(HttpNewsApi::new(server));
    let generator = Arc::new(NewsGenerator::new(api, store.clone(), cache, clock, config.clone()));
    cancel_on_interrupt(&generator);

    match command {
        DeskCommands::Headlines { section, min } => {
            info!("🗞  Generating headlines for {}", section);
            match generator.generate_headlines(&section, min).await? {
                Generation::Completed(headlines) => {
                    for (i, headline) in headlines.iter().enumerate() {
                        println!("{}. {}", i + 1, headline);
                    }
                }
                Generation::Cancelled => warn!("🛑 Headline generation cancelled"),
            }
        }
        DeskCommands::Article { headline, section } => {
            info!("✍️  Writing article for \"{}\"", headline);
            match generator.generate_article(&headline, &section).await? {
                Generation::Completed(article) => {
                    print_article(&article);
                    println!();
                    println!("{}", article.content);
                }
                Generation::Cancelled => warn!("🛑 Article generation cancelled"),
            }
        }
        DeskCommands::Refresh {
            section,
            count,
            force,
        } => refresh(&generator, &config, section, count, force).await?,
        DeskCommands::Expand { id } => {
            let Some(article) = store.find_article(&id).await else {
                bail!("No stored article with id {}", id);
            };
            info!("🔎 Expanding \"{}\"", article.headline);
            match generator.expand_article(&article).await? {
                Generation::Completed(expanded) => {
                    println!("# {}\n", article.headline);
                    println!("{}\n", expanded.long_form_content);
                    if !expanded.additional_context.is_empty() {
                        println!("## Context\n\n{}\n", expanded.additional_context);
                    }
                    if !expanded.implications.is_empty() {
                        println!("## Implications\n\n{}", expanded.implications);
                    }
                }
                Generation::Cancelled => warn!("🛑 Expansion cancelled"),
            }
        }
        DeskCommands::Saved { command } => match command {
            SavedCommands::List => {
                let saved = store.saved_articles().await;
                if saved.is_empty() {
                    println!("No saved articles");
                }
                for article in &saved {
                    print_article(article);
                }
            }
            SavedCommands::Save { id } => {
                let Some(article) = store.find_article(&id).await else {
                    bail!("No stored article with id {}", id);
                };
                store.save_article(article).await?;
                info!("🔖 Saved {}", id);
            }
            SavedCommands::Remove { id } => {
                if store.remove_article(&id).await? {
                    info!("🗑  Removed {}", id);
                } else {
                    warn!("{} was not saved", id);
                }
            }
        },
        DeskCommands::Sections { select } => {
            if let Some(section) = select {
                store.set_selected_section(&section).await?;
            }
            let selected = store.selected_section().await;
            let mut names = config.sections.clone();
            for name in store.section_names().await {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            for name in names {
                let marker = if name == selected { "*" } else { " " };
                let count = store.get_articles_for_section(&name).await.len();
                let updated = store
                    .get_section_last_updated(&name)
                    .await
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "never".to_string());
                let stale = if store.needs_update(&name).await { " (stale)" } else { "" };
                println!("{} {:<12} {:>3} articles, updated {}{}", marker, name, count, updated, stale);
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pt_core::init_logging("info");
    let Cli {
        server,
        storage,
        data_dir,
        freshness,
        command,
    } = Cli::parse();

    match command {
        Commands::Serve(args) => serve(args).await,
        Commands::Desk(command) => {
            let config = NewsConfig::default().with_freshness_window(freshness.0);
            run_desk(&server, &storage, data_dir.as_deref(), config, command).await
        }
    }
}
