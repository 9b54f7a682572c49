use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::{
    database::models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::{NewRecipe, Recipe, RecipeChangeset},
        recipe_ingredient::IngredientLine,
        relation::Subscription,
        tag::{NewTag, Tag},
        user::{NewUser, User},
    },
    relations::RelationKind,
};

pub mod memory;
pub mod pg;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("unique constraint {0} violated")]
    UniqueViolation(String),

    #[error("foreign key constraint {0} violated")]
    ForeignKeyViolation(String),

    #[error("check constraint {0} violated")]
    CheckViolation(String),

    #[error("row not found")]
    NotFound,

    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("database error: {0}")]
    Database(DieselError),
}

impl From<DieselError> for StoreError {
    fn from(error: DieselError) -> Self {
        match error {
            DieselError::DatabaseError(kind, info) => {
                let constraint = info.constraint_name().unwrap_or("unknown").to_owned();
                match kind {
                    DatabaseErrorKind::UniqueViolation => StoreError::UniqueViolation(constraint),
                    DatabaseErrorKind::ForeignKeyViolation => {
                        StoreError::ForeignKeyViolation(constraint)
                    }
                    DatabaseErrorKind::CheckViolation => StoreError::CheckViolation(constraint),
                    kind => StoreError::Database(DieselError::DatabaseError(kind, info)),
                }
            }
            DieselError::NotFound => StoreError::NotFound,
            error => StoreError::Database(error),
        }
    }
}

/// Which recipes to list. Every set field narrows the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeQuery {
    pub author: Option<i32>,
    /// Recipes carrying at least one of these tag slugs.
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i32>,
    pub in_cart_of: Option<i32>,
    pub limit: Option<i64>,
}

impl RecipeQuery {
    pub fn by_author(author: i32) -> Self {
        Self {
            author: Some(author),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: Option<i64>) -> Self {
        self.limit = limit;
        self
    }
}

/// Persistence behind every operation. Unique pairs, cascades and
/// transactional multi-writes are enforced here, not by the callers.
pub trait Store {
    /// Loads tags and ingredients in one transaction, skipping rows that already exist.
    /// Returns how many tags and ingredients were inserted.
    fn import_catalog(
        &self,
        tags: &[NewTag],
        ingredients: &[NewIngredient],
    ) -> StoreResult<(usize, usize)>;

    fn tags(&self) -> StoreResult<Vec<Tag>>;
    fn tag(&self, id: i32) -> StoreResult<Option<Tag>>;
    fn existing_tag_ids(&self, ids: &[i32]) -> StoreResult<Vec<i32>>;

    /// Ordered by name, optionally restricted to a case-insensitive name prefix.
    fn ingredients(&self, name_prefix: Option<&str>) -> StoreResult<Vec<Ingredient>>;
    fn ingredient(&self, id: i32) -> StoreResult<Option<Ingredient>>;
    fn existing_ingredient_ids(&self, ids: &[i32]) -> StoreResult<Vec<i32>>;

    fn insert_user(&self, user: &NewUser) -> StoreResult<User>;
    fn user(&self, id: i32) -> StoreResult<Option<User>>;

    /// Recipe row, tag links and ingredient lines, all or nothing.
    fn insert_recipe(
        &self,
        recipe: &NewRecipe,
        tags: &[i32],
        lines: &[IngredientLine],
    ) -> StoreResult<Recipe>;

    /// Applies `changes` and replaces the tag set and ingredient lines, all or nothing.
    fn replace_recipe(
        &self,
        id: i32,
        changes: &RecipeChangeset,
        tags: &[i32],
        lines: &[IngredientLine],
    ) -> StoreResult<Recipe>;

    fn delete_recipe(&self, id: i32) -> StoreResult<usize>;
    fn recipe(&self, id: i32) -> StoreResult<Option<Recipe>>;
    /// Newest first.
    fn recipes(&self, query: &RecipeQuery) -> StoreResult<Vec<Recipe>>;
    fn count_recipes_by(&self, author: i32) -> StoreResult<i64>;
    fn recipe_tags(&self, recipe_id: i32) -> StoreResult<Vec<Tag>>;
    /// In line insertion order.
    fn recipe_ingredients(&self, recipe_id: i32) -> StoreResult<Vec<(Ingredient, i16)>>;

    fn insert_relation(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<()>;
    fn delete_relation(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<usize>;
    fn relation_exists(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<bool>;
    /// Ingredient lines of every recipe in `user`'s cart, in line insertion order.
    fn cart_ingredient_lines(&self, user: i32) -> StoreResult<Vec<(Ingredient, i16)>>;

    fn insert_subscription(&self, follower: i32, author: i32) -> StoreResult<Subscription>;
    fn delete_subscription(&self, follower: i32, author: i32) -> StoreResult<usize>;
    fn subscription_exists(&self, follower: i32, author: i32) -> StoreResult<bool>;
    /// Authors `follower` is subscribed to, oldest subscription first.
    fn subscribed_authors(&self, follower: i32) -> StoreResult<Vec<User>>;
}
