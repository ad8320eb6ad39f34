use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use mediagrid::{
    Config,
    gallery::{CardView, Gallery, GalleryItem, ItemKind, NodeQuery, WatchSink, ZoomLevel},
    preview::LocalPreviewFetcher,
    source::LocalFolderSource,
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the dated timeline (default if no command specified)
    Timeline {
        /// Folder relative to the source directory
        #[arg(short, long, default_value = "")]
        folder: String,

        /// Include every descendant instead of direct children only
        #[arg(short, long)]
        recursive: bool,

        #[arg(short, long, value_enum)]
        zoom: Option<Zoom>,

        /// Print rows as JSON
        #[arg(long)]
        json: bool,

        /// Print right after the first publish, without waiting for previews
        #[arg(long)]
        no_wait: bool,
    },

    /// Print one card per year, month or day
    Cards {
        #[arg(short, long, value_enum, default_value = "months")]
        view: View,

        #[arg(short, long, default_value = "")]
        folder: String,

        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Zoom {
    Year,
    Month,
    Day,
}

impl From<Zoom> for ZoomLevel {
    fn from(zoom: Zoom) -> Self {
        match zoom {
            Zoom::Year => ZoomLevel::Year,
            Zoom::Month => ZoomLevel::Month,
            Zoom::Day => ZoomLevel::Day,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum View {
    Years,
    Months,
    Days,
}

impl From<View> for CardView {
    fn from(view: View) -> Self {
        match view {
            View::Years => CardView::Years,
            View::Months => CardView::Months,
            View::Days => CardView::Days,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(&cli.config)?;
    info!("Starting {}", config.app.name);
    info!("Configuration loaded from: {:?}", cli.config);

    if let Err(errors) = startup_checks::perform_startup_checks(&config).await {
        for error in &errors {
            tracing::error!("Startup check failed: {}", error);
        }
        if errors.iter().any(|e| e.is_critical()) {
            tracing::error!("Critical startup check failed, exiting");
            return Err("Critical startup check failed".into());
        }
        tracing::warn!("Non-critical startup checks failed, continuing");
    }

    let source = Arc::new(LocalFolderSource::from_config(&config.gallery)?);
    let fetcher = Arc::new(LocalPreviewFetcher::new(source.clone(), &config.gallery));
    let (sink, _rows) = WatchSink::channel();
    let gallery = Gallery::new(
        config.gallery.clone(),
        source.clone(),
        fetcher,
        Arc::new(sink),
    );

    match cli.command {
        Some(Commands::Timeline {
            folder,
            recursive,
            zoom,
            json,
            no_wait,
        }) => run_timeline(&gallery, &folder, recursive, zoom, json, no_wait).await,
        Some(Commands::Cards { view, folder, json }) => {
            let query = NodeQuery::Tree(LocalFolderSource::handle_for(folder_path(&folder)));
            let cards = gallery.cards(&query, view.into()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cards)?);
            } else {
                for card in cards {
                    println!("{:<24} {:>5}  cover: {}", card.title, card.count, card.cover_name);
                }
            }
            Ok(())
        }
        None => run_timeline(&gallery, "", true, None, false, false).await,
    }
}

async fn run_timeline(
    gallery: &Gallery,
    folder: &str,
    recursive: bool,
    zoom: Option<Zoom>,
    json: bool,
    no_wait: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let handle = LocalFolderSource::handle_for(folder_path(folder));
    let query = if recursive {
        NodeQuery::Tree(handle)
    } else {
        NodeQuery::Folder(handle)
    };
    let zoom = zoom.map(ZoomLevel::from).unwrap_or(gallery.config().default_zoom);

    let report = gallery.load(&query, zoom).await?;
    info!(
        "Loaded {} rows with {} headers, {} previews pending",
        report.items, report.headers, report.queued_backfill
    );

    if !no_wait {
        if let Some(summary) = gallery.wait_for_backfill().await {
            info!(
                "Backfill: {} applied, {} failed",
                summary.applied, summary.failed
            );
        }
    }

    let rows = gallery.items().await;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            println!("{}", format_row(row));
        }
    }
    Ok(())
}

fn folder_path(folder: &str) -> &str {
    folder.trim_matches('/')
}

fn format_row(row: &GalleryItem) -> String {
    match row.kind {
        ItemKind::Header => format!("== {} ==", row.header_title.as_deref().unwrap_or("")),
        ItemKind::Image | ItemKind::Video => {
            let tag = if row.kind == ItemKind::Video {
                "vid"
            } else {
                "img"
            };
            let thumbnail = row
                .thumbnail
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            format!(
                "  [{}] {:<40} {}",
                tag,
                row.name.as_deref().unwrap_or(""),
                thumbnail
            )
        }
    }
}
