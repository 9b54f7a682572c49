#![warn(clippy::all)]

pub mod config;
pub mod database;
pub mod error;
pub mod recipes;
pub mod relations;
pub mod shopping_list;
pub mod store;
pub mod subscriptions;
pub mod users;

pub use config::{Config, RecipeLimits};
pub use error::{FoodgramError, ValidationErrors};
pub use relations::{add_relation, remove_relation, RelationKind};
pub use shopping_list::{build_shopping_list, ShoppingList, ShoppingListDocument};
pub use store::{memory::MemoryStore, pg::PgStore, Store, StoreError};
pub use subscriptions::{parse_recipes_limit, subscribe, subscriptions, unsubscribe};
