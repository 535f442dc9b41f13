use anyhow::Context;
use clap::{Parser, Subcommand};
use folio_client::{FolioClient, VideoCatalogClient};
use folio_core::prelude::*;
use rand::Rng;
use rand::distr::Alphanumeric;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "CLI for the Folio portfolio server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server URL
    #[arg(short, long, env = "FOLIO_URL", default_value = "http://localhost:3000")]
    url: String,

    #[arg(short, long, env = "FOLIO_TOKEN")]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange admin credentials for a session token
    Login {
        #[arg(long, env = "FOLIO_ADMIN_EMAIL")]
        email: String,
        #[arg(long, env = "FOLIO_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    GenerateSecret,
    /// Upload an image, or every image below a directory
    Upload {
        path: PathBuf,
        /// Category id the uploads belong to
        #[arg(short, long)]
        category: Option<CategoryId>,
    },
    /// Delete an asset with all of its derived variants
    Delete { id: AssetId },
    /// Make an asset the holder of a role (e.g. home-hero, category-thumbnail)
    Promote {
        id: AssetId,
        role: Role,
        #[arg(short, long)]
        category: Option<CategoryId>,
    },
    /// Show the current holder of a role
    Holder {
        role: Role,
        #[arg(short, long)]
        category: Option<CategoryId>,
        /// Viewport width in pixels
        #[arg(short, long)]
        width: Option<u32>,
    },
    /// Show the URL an asset resolves to
    Resolve {
        id: AssetId,
        #[arg(short, long)]
        width: Option<u32>,
        #[arg(long)]
        hero: bool,
    },
    /// Create records for originals that have none
    Backfill,
    /// List categories
    Categories,
    /// Manage the video catalog
    Videos {
        /// Video catalog URL
        #[arg(long, env = "FOLIO_VIDEO_SERVICE_URL")]
        service: String,

        #[command(subcommand)]
        command: VideoCommands,
    },
}

#[derive(Subcommand)]
enum VideoCommands {
    Categories,
    List {
        category: String,
    },
    /// Add a YouTube link to a category
    Add {
        category: String,
        title: String,
        link: String,
    },
    /// Delete the video at `index` from a category
    Delete {
        category: String,
        index: usize,
    },
}

fn is_image(path: &Path) -> bool {
    mime_guess::from_path(path)
        .first()
        .is_some_and(|mime| mime.type_() == mime_guess::mime::IMAGE)
}

async fn upload_one(client: &FolioClient, path: &Path, category: Option<CategoryId>) -> anyhow::Result<()> {
    let report = client
        .upload_file(path, category)
        .await
        .with_context(|| format!("uploading {path:?}"))?;

    match report.thumbnail_error {
        None => println!("✅ {} → #{} ({})", path.display(), report.asset.id, report.asset.path),
        Some(e) => println!(
            "⚠️ {} → #{} uploaded, but thumbnails failed: {e}",
            path.display(),
            report.asset.id
        ),
    }
    Ok(())
}

async fn run_videos(client: VideoCatalogClient, command: VideoCommands) -> anyhow::Result<()> {
    let print = |videos: Vec<folio_client::Video>| {
        for (index, video) in videos.iter().enumerate() {
            println!("[{index}] {} - {}", video.title, video.url);
        }
    };

    match command {
        VideoCommands::Categories => {
            for category in client.categories().await? {
                println!("{category}");
            }
        }
        VideoCommands::List { category } => print(client.list(&category).await?),
        VideoCommands::Add {
            category,
            title,
            link,
        } => {
            let videos = client.add(&category, &title, &link).await?;
            println!("✅ Added '{title}' to {category}");
            print(videos);
        }
        VideoCommands::Delete { category, index } => {
            let videos = client.delete(&category, index).await?;
            println!("🗑️ Removed video {index} from {category}");
            print(videos);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "folio_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let client = FolioClient::new(cli.url.clone(), cli.token.clone());

    match cli.command {
        Commands::GenerateSecret => {
            let secret: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect();

            println!("🔑 Generated JWT Secret:");
            println!("\n    {secret}\n");
            println!("Copy this value and set it on your server:");
            println!("set FOLIO_JWT_SECRET=\"{secret}\"");
        }
        Commands::Login { email, password } => {
            let token = client.login(&email, &password).await?;
            println!("✅ Logged in as {email}. Session token (valid 30 days):\n");
            println!("{token}");
            println!("\nset FOLIO_TOKEN=\"...\" to use it for admin commands.");
        }
        Commands::Upload { path, category } => {
            if path.is_dir() {
                println!("🚀 Uploading images from {path:?}...");
                let mut count = 0;
                for entry in WalkDir::new(&path) {
                    let entry = entry?;
                    if entry.file_type().is_dir() || !is_image(entry.path()) {
                        continue;
                    }
                    upload_one(&client, entry.path(), category).await?;
                    count += 1;
                }
                println!("✅ Uploaded {count} images.");
            } else {
                upload_one(&client, &path, category).await?;
            }
        }
        Commands::Delete { id } => {
            let report = client.delete(id).await?;
            println!(
                "🗑️ Deleted {} and {} derived variants",
                report.path,
                report.derived_removed.len()
            );
        }
        Commands::Promote { id, role, category } => {
            let asset = client.promote(id, role, category).await?;
            println!("✅ #{} ({}) is now {role}", asset.id, asset.path);
        }
        Commands::Holder {
            role,
            category,
            width,
        } => {
            let holder = client.holder(role, category, width).await?;
            match holder.asset {
                Some(asset) => println!("{role}: #{} ({})", asset.id, asset.path),
                None => println!("{role}: nobody"),
            }
            println!("{}", serde_json::to_string_pretty(&holder.url)?);
        }
        Commands::Resolve { id, width, hero } => {
            let resolved = client.resolve(id, width, hero).await?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Commands::Backfill => {
            println!("🔍 Scanning originals for missing records...");
            let report = client.backfill().await?;
            println!(
                "✅ Scanned {}, inserted {}, skipped {}, failed {}",
                report.scanned, report.inserted, report.skipped, report.failed
            );
        }
        Commands::Categories => {
            for category in client.categories().await? {
                let hidden = if category.visible_on_hub { "" } else { " (hidden)" };
                println!("#{} {} [{}]{hidden}", category.id, category.name, category.slug);
            }
        }
        Commands::Videos { service, command } => {
            run_videos(VideoCatalogClient::new(service), command).await?;
        }
    }

    Ok(())
}
