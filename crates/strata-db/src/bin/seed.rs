//! # Seed Data Generator
//!
//! Populates a database with the demo blog model for development.
//!
//! ## Usage
//! ```bash
//! # Seed the configured database (strata.toml, STRATA_* variables)
//! cargo run -p strata-db --bin seed
//!
//! # Specify database path
//! cargo run -p strata-db --bin seed -- --db ./data/blog.db
//!
//! # Use a specific configuration file
//! cargo run -p strata-db --bin seed -- --config ./strata.toml
//! ```
//!
//! Log output follows `RUST_LOG`, else `logging.filter` from the config;
//! `RUST_LOG=strata_db=debug` prints every statement.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use strata_core::{record, MetadataRegistry, Order};
use strata_db::demo::{Author, Post, Tag};
use strata_db::{ConnectionProvider, FindOptions, OrmConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Authors and the titles of their posts
const AUTHORS: &[(&str, &[&str])] = &[
    ("Ada", &["Notes on the Analytical Engine", "Bernoulli Numbers"]),
    ("Grace", &["Compilers for Everyone", "Nanoseconds"]),
    ("Edsger", &["Goto Considered Harmful", "On the Cruelty of Teaching", "Semaphores"]),
];

const TAGS: &[&str] = &["history", "compilers", "concurrency"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Strata Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       SQLite database file (overrides config)");
                println!("  -c, --config <PATH>   Configuration file");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = OrmConfig::load_or_default(config_path);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .init();

    if let Some(path) = db_path {
        config.database.path = Some(path);
    }
    info!(path = %config.database_path().display(), "Seeding database");

    let registry = Arc::new(MetadataRegistry::new());
    registry.register::<Author>()?;
    registry.register::<Post>()?;
    registry.register::<Tag>()?;

    let provider = ConnectionProvider::new();
    let manager = provider.connect(&config, registry).await?;

    let authors = manager.repository::<Author>();
    let posts = manager.repository::<Post>();
    let tags = manager.repository::<Tag>();

    let existing = authors.count(FindOptions::new()).await?;
    if existing > 0 {
        println!("⚠ Database already has {} authors", existing);
        println!("  Skipping seed to avoid duplicates.");
        provider.close_all().await;
        return Ok(());
    }

    let start = std::time::Instant::now();

    for name in TAGS {
        tags.upsert(record! { "name" => *name }, &["name"]).await?;
    }

    let mut written = 0;
    for (name, titles) in AUTHORS {
        let saved = authors.save(Author::new(*name)).await?;
        let author_id = match saved.generated_maps().first() {
            Some(generated) => generated.get_i64("id")?,
            None => None,
        };
        for title in *titles {
            posts.save(Post::new(*title, author_id)).await?;
            written += 1;
        }
    }

    println!(
        "✓ Seeded {} authors, {} posts, {} tags in {:?}",
        AUTHORS.len(),
        written,
        TAGS.len(),
        start.elapsed()
    );

    // Read back through the relation loader
    let found = authors
        .find(
            FindOptions::new()
                .order_by("name", Order::Asc)
                .relation("posts"),
        )
        .await?;
    for author in found.entities() {
        println!("  {} ({} posts)", author.name, author.posts.len());
    }

    provider.close_all().await;
    Ok(())
}
