use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::trace_span;

use crate::{
    database::models::{recipe::Recipe, tag::Tag},
    error::FoodgramError,
    relations::{existing_recipe, RelationKind},
    store::{RecipeQuery, Store},
    users::{user_profile, UserProfile},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeIngredientView {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i16,
}

/// Full recipe as seen by a viewer, anonymous viewers get every flag `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeDetail {
    pub id: i32,
    pub tags: Vec<Tag>,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: Option<String>,
    pub text: String,
    pub cooking_time: i16,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecipeFilter {
    pub author: Option<i32>,
    /// Tag slugs, a recipe matches when it has any of them.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    /// Membership flags only narrow the list for a known viewer.
    fn to_query(&self, viewer: Option<i32>) -> RecipeQuery {
        RecipeQuery {
            author: self.author,
            tag_slugs: self.tags.clone(),
            favorited_by: viewer.filter(|_| self.is_favorited),
            in_cart_of: viewer.filter(|_| self.is_in_shopping_cart),
            limit: None,
        }
    }
}

fn membership<S: Store + ?Sized>(
    store: &S,
    viewer: Option<i32>,
    kind: RelationKind,
    recipe_id: i32,
) -> Result<bool, FoodgramError> {
    match viewer {
        Some(viewer) => Ok(store.relation_exists(kind, viewer, recipe_id)?),
        None => Ok(false),
    }
}

fn detail<S: Store + ?Sized>(
    store: &S,
    viewer: Option<i32>,
    recipe: Recipe,
) -> Result<RecipeDetail, FoodgramError> {
    let ingredients = store
        .recipe_ingredients(recipe.id)?
        .into_iter()
        .map(|(ingredient, amount)| RecipeIngredientView {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
            amount,
        })
        .collect();

    Ok(RecipeDetail {
        id: recipe.id,
        tags: store.recipe_tags(recipe.id)?,
        author: user_profile(store, viewer, recipe.author_id)?,
        ingredients,
        is_favorited: membership(store, viewer, RelationKind::Favorite, recipe.id)?,
        is_in_shopping_cart: membership(store, viewer, RelationKind::ShoppingCart, recipe.id)?,
        name: recipe.name,
        image: recipe.image,
        text: recipe.text,
        cooking_time: recipe.cooking_time,
        created_at: recipe.created_at,
    })
}

pub fn recipe_detail<S: Store + ?Sized>(
    store: &S,
    viewer: Option<i32>,
    recipe_id: i32,
) -> Result<RecipeDetail, FoodgramError> {
    let recipe = existing_recipe(store, recipe_id)?;
    detail(store, viewer, recipe)
}

/// Newest first.
pub fn list_recipes<S: Store + ?Sized>(
    store: &S,
    viewer: Option<i32>,
    filter: &RecipeFilter,
) -> Result<Vec<RecipeDetail>, FoodgramError> {
    let span = trace_span!("list recipes", ?viewer);
    let _guard = span.enter();

    store
        .recipes(&filter.to_query(viewer))?
        .into_iter()
        .map(|recipe| detail(store, viewer, recipe))
        .collect()
}
