#![warn(clippy::all)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use foodgram::{
    build_shopping_list,
    database::connection::establish_pooled_connection,
    parse_recipes_limit,
    recipes::{list_recipes, recipe_detail, recipe_short_link, RecipeFilter},
    subscriptions, Config, FoodgramError, PgStore, Store,
};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing::{error, trace_span, Level};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::Registry;

#[derive(Parser, Debug)]
#[command(name = "foodgram", version, about = "Foodgram recipe store operations")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log debug events and span activity
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the consolidated shopping list of a user's cart
    ShoppingList {
        #[arg(long)]
        user: i32,
        /// File or directory to write to, prints to stdout when absent
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the short link of a recipe
    Link {
        #[arg(long)]
        recipe: i32,
    },
    /// Show a recipe as seen by a user
    Recipe {
        #[arg(long)]
        id: i32,
        #[arg(long)]
        viewer: Option<i32>,
    },
    /// List recipes, newest first
    Recipes {
        #[arg(long)]
        viewer: Option<i32>,
        #[arg(long)]
        author: Option<i32>,
        /// Tag slug, may be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        favorited: bool,
        #[arg(long)]
        in_cart: bool,
    },
    /// List the authors a user is subscribed to
    Subscriptions {
        #[arg(long)]
        user: i32,
        #[arg(long)]
        recipes_limit: Option<String>,
    },
    /// Search the ingredient catalog by name prefix
    Ingredients {
        #[arg(long)]
        name: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let span_events = if cli.verbose {
        FmtSpan::ACTIVE
    } else {
        FmtSpan::NONE
    };
    let stderr_log = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(span_events);
    let subscriber = Registry::default()
        .with(stderr_log)
        .with(LevelFilter::from_level(level));

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global subscriber: {error}");
        return ExitCode::FAILURE;
    }

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!("{error}");
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), FoodgramError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|error| FoodgramError::Io(error.into()))?;
    println!("{json}");
    Ok(())
}

fn run(command: Command) -> Result<(), FoodgramError> {
    let span = trace_span!("starting main");
    let _guard = span.enter();

    let config = Config::load()?;
    let store = PgStore::new(establish_pooled_connection(&config)?);

    match command {
        Command::ShoppingList { user, output } => {
            let document = build_shopping_list(&store, user)?;
            match output {
                Some(target) => {
                    let path = document.write_to(&target)?;
                    println!("{}", path.display());
                }
                None => println!("{}", document.content),
            }
        }
        Command::Link { recipe } => {
            print_json(&recipe_short_link(&store, &config.domain, recipe)?)?;
        }
        Command::Recipe { id, viewer } => {
            print_json(&recipe_detail(&store, viewer, id)?)?;
        }
        Command::Recipes {
            viewer,
            author,
            tags,
            favorited,
            in_cart,
        } => {
            let filter = RecipeFilter {
                author,
                tags,
                is_favorited: favorited,
                is_in_shopping_cart: in_cart,
            };
            print_json(&list_recipes(&store, viewer, &filter)?)?;
        }
        Command::Subscriptions {
            user,
            recipes_limit,
        } => {
            let limit = parse_recipes_limit(recipes_limit.as_deref());
            print_json(&subscriptions(&store, user, limit)?)?;
        }
        Command::Ingredients { name } => {
            print_json(&store.ingredients(name.as_deref())?)?;
        }
    }

    Ok(())
}
