use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use blog::{Config, Credentials, NotionClient};

#[derive(Parser)]
#[command(name = "blog")]
#[command(about = "Generate a static blog from a Notion database")]
struct Cli {
    /// Config file (defaults are used if it does not exist)
    #[arg(short, long, global = true, default_value = "blog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch all posts and write the static site
    Build {
        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,

        /// Include unpublished posts
        #[arg(long)]
        preview: bool,
    },
    /// Render one post page to stdout
    Post {
        slug: String,

        #[arg(long)]
        preview: bool,
    },
    /// Render a saved block listing (JSON) to an HTML fragment
    Render {
        input: PathBuf,
    },
    /// Download a media asset as block-<id>
    Asset {
        url: String,
        block_id: String,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
}

fn notion_client(config: &Config) -> Result<NotionClient> {
    let credentials = Credentials::from_env(config.site.environment)?;
    Ok(NotionClient::new(&config.notion, credentials)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = Config::load(&cli.config)?;
    config.apply_env();
    log::debug!("environment: {}", config.site.environment);

    match cli.command {
        Command::Build { out, preview } => {
            let client = notion_client(&config)?;
            let report = blog::build(&client, &config, &out, preview)
                .await
                .context("site build failed")?;
            println!("Created {} pages in {}", report.pages.len(), out.display());
        }
        Command::Post { slug, preview } => {
            let client = notion_client(&config)?;
            let html = match blog::get_post_data(&client, &slug, preview).await? {
                Some(post) => {
                    blog::document(&post.title, blog::post_page(&post, preview, &config), &config)
                }
                None => blog::document("Blog", blog::not_found_page(), &config),
            };
            print!("{html}");
        }
        Command::Render { input } => {
            let json = fs::read_to_string(&input)
                .with_context(|| format!("Error reading {}", input.display()))?;
            let html = blog::block_json_to_html(&json, &config)
                .with_context(|| format!("Error parsing {}", input.display()))?;
            println!("{html}");
        }
        Command::Asset {
            url,
            block_id,
            out_dir,
        } => {
            let http = reqwest::Client::new();
            let asset = blog::fetch_asset(&http, &url, &block_id)
                .await
                .context("Failed to fetch the asset")?;
            let output = out_dir.join(blog::asset_filename(&block_id));
            fs::write(&output, &asset.bytes)
                .with_context(|| format!("Error writing {}", output.display()))?;
            println!(
                "Created {} ({}, {} bytes)",
                output.display(),
                asset.content_type,
                asset.content_length
            );
        }
    }

    Ok(())
}
