use std::{fs, path::Path, path::PathBuf, process::ExitCode};

use clap::Parser;
use foodgram::{
    database::{
        connection::establish_pooled_connection,
        models::{ingredient::NewIngredient, tag::NewTag},
    },
    Config, FoodgramError, PgStore, Store,
};
use serde::de::DeserializeOwned;
use tracing::{error, info, level_filters::LevelFilter, Level};
use tracing_subscriber::{prelude::*, Registry};

/// Loads the ingredient catalog and the tags into the database.
/// Rows that already exist are skipped, everything else is inserted in one transaction.
#[derive(Parser, Debug)]
#[command(name = "import-data", version)]
struct Cli {
    /// JSON array of `{"name", "measurement_unit"}`
    #[arg(long, default_value = "data/ingredients.json")]
    ingredients: PathBuf,

    /// JSON array of `{"name", "slug"}`
    #[arg(long)]
    tags: Option<PathBuf>,
}

fn main() -> ExitCode {
    let subscriber = Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(LevelFilter::from_level(Level::INFO));
    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global subscriber: {error}");
        return ExitCode::FAILURE;
    }

    match import(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("Import failed: {error}");
            ExitCode::FAILURE
        }
    }
}

fn import(cli: Cli) -> Result<(), FoodgramError> {
    let ingredients: Vec<NewIngredient> = read_json(&cli.ingredients)?;
    let tags: Vec<NewTag> = match &cli.tags {
        Some(path) => read_json(path)?,
        None => Vec::new(),
    };

    let config = Config::load()?;
    let store = PgStore::new(establish_pooled_connection(&config)?);

    info!(
        "Starting import of {} tags and {} ingredients",
        tags.len(),
        ingredients.len()
    );
    let (tag_count, ingredient_count) = store.import_catalog(&tags, &ingredients)?;
    info!("Inserted {tag_count} tags and {ingredient_count} ingredients");

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, FoodgramError> {
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|error| {
        FoodgramError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Can't parse {}: {error}", path.display()),
        ))
    })
}
