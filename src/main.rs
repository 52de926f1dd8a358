use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;

use dashfeed::config::{Config, ProviderKind};
use dashfeed::content::ContentItem;
use dashfeed::dashboard::Dashboard;
use dashfeed::fetch::{ContentProvider, ContentSource, HttpEndpoints, HttpProvider, MockProvider};
use dashfeed::preferences::{PreferenceManager, PreferencesUpdate};
use dashfeed::storage::{Database, DatabaseError};
use dashfeed::store::{ContentStore, FetchStatus, Section};
use dashfeed::util::{fit_to_width, single_line};

/// Get the config directory path (~/.config/dashfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("dashfeed"))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ProviderArg {
    Mock,
    Http,
}

impl From<ProviderArg> for ProviderKind {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Mock => ProviderKind::Mock,
            ProviderArg::Http => ProviderKind::Http,
        }
    }
}

fn parse_section(s: &str) -> Result<Section, String> {
    Section::from_str_name(s)
        .ok_or_else(|| format!("unknown section '{}' (feed, trending, favorites, search)", s))
}

#[derive(Parser, Debug)]
#[command(name = "dashfeed", about = "Aggregated news, movie, and social content dashboard")]
struct Args {
    /// Config file (default: ~/.config/dashfeed/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Preferences database (default: ~/.config/dashfeed/dashfeed.db)
    #[arg(long, value_name = "PATH", conflicts_with = "no_persist")]
    db: Option<PathBuf>,

    /// Keep preferences in memory only
    #[arg(long)]
    no_persist: bool,

    /// Content provider, overriding the config file
    #[arg(long, value_enum)]
    provider: Option<ProviderArg>,

    /// Toggle the favorite flag on an item (repeatable)
    #[arg(long = "favorite", value_name = "ID")]
    favorites: Vec<String>,

    /// Move the feed item at FROM so it ends up at TO
    #[arg(long, num_args = 2, value_names = ["FROM", "TO"], allow_negative_numbers = true)]
    reorder: Option<Vec<isize>>,

    /// Search feed and trending once loading finishes
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Section to print
    #[arg(long, value_parser = parse_section)]
    show: Option<Section>,

    /// Print JSON instead of a table (whole snapshot unless --show is given)
    #[arg(long)]
    json: bool,

    /// Save preferred news categories (comma-separated)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    set_categories: Option<Vec<String>>,

    /// Save preferred language
    #[arg(long, value_name = "LANG")]
    set_language: Option<String>,

    /// Forget saved preferences and use config defaults
    #[arg(long, conflicts_with_all = ["set_categories", "set_language"])]
    reset_preferences: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        tracing::info!(path = %config_dir.display(), "Created config directory");
    }

    // User-only access: the directory holds the preferences database
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) =
            std::fs::set_permissions(&config_dir, std::fs::Permissions::from_mode(0o700))
        {
            tracing::warn!(
                path = %config_dir.display(),
                error = %e,
                "Failed to set config directory permissions to 0700"
            );
        }
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(provider) = args.provider {
        config.provider = provider.into();
    }

    // Open database
    let db_path = if args.no_persist {
        ":memory:".to_string()
    } else {
        let path = args
            .db
            .clone()
            .unwrap_or_else(|| config_dir.join("dashfeed.db"));
        path.to_str()
            .ok_or_else(|| anyhow::anyhow!("Invalid UTF-8 in database path"))?
            .to_string()
    };
    let db = match Database::open(&db_path).await {
        Ok(db) => db,
        Err(DatabaseError::InstanceLocked) => {
            eprintln!(
                "Error: Another instance of dashfeed appears to be running. Please close it and try again."
            );
            std::process::exit(1);
        }
        Err(e) => {
            return Err(anyhow::anyhow!("Failed to open database: {}", e));
        }
    };

    let mut prefs = match PreferenceManager::load(&config, &db).await {
        Ok(pm) => pm,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load saved preferences, using config defaults");
            PreferenceManager::from_config(&config)
        }
    };

    if args.reset_preferences {
        prefs
            .reset(&config, &db)
            .await
            .context("Failed to reset preferences")?;
        eprintln!("Preferences reset to defaults.");
    }

    let update = PreferencesUpdate {
        categories: args.set_categories.as_ref().map(|list| {
            list.iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect()
        }),
        language: args.set_language.clone(),
    };
    if !update.is_empty() {
        prefs.save(&db, update).await?;
        eprintln!("Preferences saved.");
    }

    let provider = build_provider(&config)?;
    let mut dashboard = Dashboard::new(provider).with_search_latency(config.search_latency());

    dashboard.load(prefs.preferences());
    dashboard.run_until_idle().await;

    for id in &args.favorites {
        if !dashboard.toggle_favorite(id) {
            eprintln!("Warning: no item with id '{}'", id);
        }
    }

    if let Some(indices) = &args.reorder {
        if let [from, to] = indices.as_slice() {
            dashboard
                .reorder(*from, *to)
                .context("Failed to reorder feed")?;
        }
    }

    if let Some(query) = &args.search {
        dashboard.search(query).context("Failed to search")?;
        dashboard.run_until_idle().await;
    }

    let store = dashboard.store();
    if args.json {
        let json = match args.show {
            Some(section) => serde_json::to_string_pretty(store.section(section))?,
            None => serde_json::to_string_pretty(&store.snapshot())?,
        };
        println!("{}", json);
    } else {
        print_status(store);
        print_section(store, args.show.unwrap_or_default());
    }

    Ok(())
}

fn build_provider(config: &Config) -> Result<Arc<dyn ContentProvider>> {
    match config.provider {
        ProviderKind::Mock => {
            let provider = ContentSource::ALL
                .iter()
                .fold(MockProvider::new(), |provider, &source| {
                    provider.with_latency(source, config.latency(source))
                });
            Ok(Arc::new(provider))
        }
        ProviderKind::Http => {
            let (Some(news), Some(movies), Some(social)) =
                (&config.news_url, &config.movies_url, &config.social_url)
            else {
                anyhow::bail!(
                    "The http provider needs news_url, movies_url, and social_url in the config file"
                );
            };
            let endpoints = HttpEndpoints::parse(news, movies, social)
                .context("Invalid provider endpoint in config")?;
            let client = reqwest::Client::builder()
                .pool_max_idle_per_host(4)
                .tcp_keepalive(std::time::Duration::from_secs(60))
                .build()
                .context("Failed to build HTTP client")?;
            Ok(Arc::new(
                HttpProvider::new(client, endpoints).with_timeout(config.request_timeout()),
            ))
        }
    }
}

// ============================================================================
// Output
// ============================================================================

const ID_WIDTH: usize = 8;
const TYPE_WIDTH: usize = 6;
const CATEGORY_WIDTH: usize = 14;
const TITLE_WIDTH: usize = 48;

fn print_status(store: &ContentStore) {
    for source in ContentSource::ALL {
        match store.status(source) {
            FetchStatus::Failed(message) => {
                eprintln!("Warning: {} unavailable: {}", source, single_line(message));
            }
            FetchStatus::Pending => eprintln!("Warning: {} still loading", source),
            FetchStatus::Idle => {}
        }
    }
}

fn print_section(store: &ContentStore, section: Section) {
    let items = store.section(section);
    if section == Section::Search && !store.search_query().is_empty() {
        println!(
            "{} ({}) for \"{}\"",
            section.name(),
            items.len(),
            single_line(store.search_query())
        );
    } else {
        println!("{} ({})", section.name(), items.len());
    }

    if items.is_empty() {
        println!("  (empty)");
        return;
    }

    println!(
        "  #   {} * {} {} {}",
        fit_to_width("ID", ID_WIDTH),
        fit_to_width("TYPE", TYPE_WIDTH),
        fit_to_width("CATEGORY", CATEGORY_WIDTH),
        "TITLE"
    );
    for (index, item) in items.iter().enumerate() {
        println!("{}", format_row(index, item));
    }
}

fn format_row(index: usize, item: &ContentItem) -> String {
    format!(
        "  {:<3} {} {} {} {} {}",
        index,
        fit_to_width(&single_line(&item.id), ID_WIDTH),
        if item.is_favorite { '*' } else { ' ' },
        fit_to_width(item.content_type.name(), TYPE_WIDTH),
        fit_to_width(&single_line(&item.category), CATEGORY_WIDTH),
        fit_to_width(&single_line(&item.title), TITLE_WIDTH).trim_end()
    )
}
