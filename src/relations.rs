use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug_span, info, warn};

use crate::{
    database::models::recipe::{Recipe, RecipeShort},
    error::FoodgramError,
    store::{Store, StoreError},
    users::existing_user,
};

/// Per-user recipe lists sharing the same add/remove rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Favorite,
    ShoppingCart,
}

impl RelationKind {
    pub fn label(self) -> &'static str {
        match self {
            RelationKind::Favorite => "favorites",
            RelationKind::ShoppingCart => "shopping cart",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub(crate) fn existing_recipe<S: Store + ?Sized>(
    store: &S,
    recipe_id: i32,
) -> Result<Recipe, FoodgramError> {
    store
        .recipe(recipe_id)?
        .ok_or(FoodgramError::UnknownEntity {
            entity: "recipe",
            id: recipe_id,
        })
}

/// Puts `recipe_id` on `user_id`'s list of the given kind.
///
/// The existence check only saves a round trip: a concurrent insert of the same pair
/// is caught by the unique constraint and reported the same way.
pub fn add_relation<S: Store + ?Sized>(
    store: &S,
    kind: RelationKind,
    user_id: i32,
    recipe_id: i32,
) -> Result<RecipeShort, FoodgramError> {
    let span = debug_span!("add relation", %kind, user_id, recipe_id);
    let _guard = span.enter();

    existing_user(store, user_id)?;
    let recipe = existing_recipe(store, recipe_id)?;
    let already_exists =
        || FoodgramError::AlreadyExists(format!("recipe {recipe_id} is already in {kind}"));

    if store.relation_exists(kind, user_id, recipe_id)? {
        return Err(already_exists());
    }

    match store.insert_relation(kind, user_id, recipe_id) {
        Ok(()) => {}
        Err(StoreError::UniqueViolation(constraint)) => {
            warn!("Lost insert race on {constraint}");
            return Err(already_exists());
        }
        Err(error) => return Err(error.into()),
    }

    info!("Recipe {recipe_id} added to {kind} of user {user_id}");
    Ok(RecipeShort::from(&recipe))
}

pub fn remove_relation<S: Store + ?Sized>(
    store: &S,
    kind: RelationKind,
    user_id: i32,
    recipe_id: i32,
) -> Result<(), FoodgramError> {
    let span = debug_span!("remove relation", %kind, user_id, recipe_id);
    let _guard = span.enter();

    existing_recipe(store, recipe_id)?;

    if store.delete_relation(kind, user_id, recipe_id)? == 0 {
        return Err(FoodgramError::NotFound(format!(
            "recipe {recipe_id} is not in {kind}"
        )));
    }

    info!("Recipe {recipe_id} removed from {kind} of user {user_id}");
    Ok(())
}
