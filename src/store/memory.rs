use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use itertools::Itertools;
use tracing::trace;

use crate::{
    database::models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::{NewRecipe, Recipe, RecipeChangeset},
        recipe_ingredient::{IngredientLine, RecipeIngredient},
        relation::{CartEntry, Favorite, Subscription},
        tag::{NewTag, RecipeTag, Tag},
        user::{NewUser, User},
    },
    relations::RelationKind,
};

use super::{RecipeQuery, Store, StoreError, StoreResult};

/// In-process tables with the same constraints as the PostgreSQL schema.
#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i32,
    users: Vec<User>,
    tags: Vec<Tag>,
    ingredients: Vec<Ingredient>,
    recipes: Vec<Recipe>,
    recipe_tags: Vec<RecipeTag>,
    recipe_ingredients: Vec<RecipeIngredient>,
    favorites: Vec<Favorite>,
    shopping_cart: Vec<CartEntry>,
    subscriptions: Vec<Subscription>,
}

fn violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation(constraint.to_owned())
}

fn missing(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation(constraint.to_owned())
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn has_user(&self, id: i32) -> bool {
        self.users.iter().any(|user| user.id == id)
    }

    fn has_recipe(&self, id: i32) -> bool {
        self.recipes.iter().any(|recipe| recipe.id == id)
    }

    fn ingredient(&self, id: i32) -> Option<&Ingredient> {
        self.ingredients.iter().find(|ingredient| ingredient.id == id)
    }

    fn write_composition(
        &mut self,
        recipe_id: i32,
        tag_ids: &[i32],
        lines: &[IngredientLine],
    ) -> StoreResult<()> {
        self.recipe_tags.retain(|link| link.recipe_id != recipe_id);
        for &tag_id in tag_ids {
            if !self.tags.iter().any(|tag| tag.id == tag_id) {
                return Err(missing("recipe_tags_tag_id_fkey"));
            }
            if self.recipe_tags.contains(&RecipeTag::new(recipe_id, tag_id)) {
                return Err(violation("recipe_tags_pkey"));
            }
            self.recipe_tags.push(RecipeTag::new(recipe_id, tag_id));
        }

        self.recipe_ingredients.retain(|line| line.recipe_id != recipe_id);
        for line in lines {
            if self.ingredient(line.ingredient_id).is_none() {
                return Err(missing("recipe_ingredients_ingredient_id_fkey"));
            }
            if line.amount < 1 {
                return Err(StoreError::CheckViolation(
                    "recipe_ingredients_amount_check".to_owned(),
                ));
            }

            // update or create
            if let Some(existing) = self
                .recipe_ingredients
                .iter_mut()
                .find(|row| row.recipe_id == recipe_id && row.ingredient_id == line.ingredient_id)
            {
                existing.amount = line.amount;
                continue;
            }

            let id = self.next_id();
            self.recipe_ingredients.push(RecipeIngredient::new(
                id,
                recipe_id,
                line.ingredient_id,
                line.amount,
            ));
        }

        Ok(())
    }

    fn lines_of(&self, recipe_ids: &HashSet<i32>) -> StoreResult<Vec<(Ingredient, i16)>> {
        self.recipe_ingredients
            .iter()
            .filter(|line| recipe_ids.contains(&line.recipe_id))
            .sorted_by_key(|line| line.id)
            .map(|line| {
                self.ingredient(line.ingredient_id)
                    .map(|ingredient| (ingredient.clone(), line.amount))
                    .ok_or_else(|| missing("recipe_ingredients_ingredient_id_fkey"))
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on a copy of the tables and keeps the copy only when `f` succeeds.
    fn transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Tables) -> StoreResult<T>,
    {
        let mut tables = self.read();
        let mut draft = tables.clone();
        let value = f(&mut draft)?;
        *tables = draft;

        Ok(value)
    }
}

impl Store for MemoryStore {
    fn import_catalog(
        &self,
        tags: &[NewTag],
        ingredients: &[NewIngredient],
    ) -> StoreResult<(usize, usize)> {
        self.transaction(|tables| {
            let mut tag_count = 0;
            for tag in tags {
                if tables.tags.iter().any(|existing| existing.slug == tag.slug) {
                    continue;
                }
                let id = tables.next_id();
                tables.tags.push(Tag {
                    id,
                    name: tag.name.clone(),
                    slug: tag.slug.clone(),
                });
                tag_count += 1;
            }

            let mut ingredient_count = 0;
            for ingredient in ingredients {
                if tables.ingredients.iter().any(|existing| {
                    existing.name == ingredient.name
                        && existing.measurement_unit == ingredient.measurement_unit
                }) {
                    continue;
                }
                let id = tables.next_id();
                tables.ingredients.push(Ingredient {
                    id,
                    name: ingredient.name.clone(),
                    measurement_unit: ingredient.measurement_unit.clone(),
                });
                ingredient_count += 1;
            }

            trace!("Imported {tag_count} tags and {ingredient_count} ingredients");
            Ok((tag_count, ingredient_count))
        })
    }

    fn tags(&self) -> StoreResult<Vec<Tag>> {
        Ok(self
            .read()
            .tags
            .iter()
            .sorted_by_key(|tag| tag.id)
            .cloned()
            .collect())
    }

    fn tag(&self, id: i32) -> StoreResult<Option<Tag>> {
        Ok(self.read().tags.iter().find(|tag| tag.id == id).cloned())
    }

    fn existing_tag_ids(&self, ids: &[i32]) -> StoreResult<Vec<i32>> {
        Ok(self
            .read()
            .tags
            .iter()
            .filter(|tag| ids.contains(&tag.id))
            .map(|tag| tag.id)
            .collect())
    }

    fn ingredients(&self, name_prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        let prefix = name_prefix.map(str::to_lowercase);

        Ok(self
            .read()
            .ingredients
            .iter()
            .filter(|ingredient| {
                prefix
                    .as_ref()
                    .map_or(true, |prefix| ingredient.name.to_lowercase().starts_with(prefix))
            })
            .sorted_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)))
            .cloned()
            .collect())
    }

    fn ingredient(&self, id: i32) -> StoreResult<Option<Ingredient>> {
        Ok(self.read().ingredient(id).cloned())
    }

    fn existing_ingredient_ids(&self, ids: &[i32]) -> StoreResult<Vec<i32>> {
        Ok(self
            .read()
            .ingredients
            .iter()
            .filter(|ingredient| ids.contains(&ingredient.id))
            .map(|ingredient| ingredient.id)
            .collect())
    }

    fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        self.transaction(|tables| {
            if tables.users.iter().any(|existing| existing.username == user.username) {
                return Err(violation("users_username_key"));
            }
            if tables.users.iter().any(|existing| existing.email == user.email) {
                return Err(violation("users_email_key"));
            }

            let user = User {
                id: tables.next_id(),
                username: user.username.clone(),
                email: user.email.clone(),
                first_name: user.first_name.clone(),
                last_name: user.last_name.clone(),
                avatar: user.avatar.clone(),
            };
            tables.users.push(user.clone());

            Ok(user)
        })
    }

    fn user(&self, id: i32) -> StoreResult<Option<User>> {
        Ok(self.read().users.iter().find(|user| user.id == id).cloned())
    }

    fn insert_recipe(
        &self,
        recipe: &NewRecipe,
        tag_ids: &[i32],
        lines: &[IngredientLine],
    ) -> StoreResult<Recipe> {
        self.transaction(|tables| {
            if !tables.has_user(recipe.author_id) {
                return Err(missing("recipes_author_id_fkey"));
            }

            let recipe = Recipe {
                id: tables.next_id(),
                author_id: recipe.author_id,
                name: recipe.name.clone(),
                text: recipe.text.clone(),
                cooking_time: recipe.cooking_time,
                image: recipe.image.clone(),
                created_at: Utc::now(),
            };
            tables.recipes.push(recipe.clone());
            tables.write_composition(recipe.id, tag_ids, lines)?;

            Ok(recipe)
        })
    }

    fn replace_recipe(
        &self,
        id: i32,
        changes: &RecipeChangeset,
        tag_ids: &[i32],
        lines: &[IngredientLine],
    ) -> StoreResult<Recipe> {
        self.transaction(|tables| {
            let recipe = tables
                .recipes
                .iter_mut()
                .find(|recipe| recipe.id == id)
                .ok_or(StoreError::NotFound)?;
            changes.apply(recipe);
            let recipe = recipe.clone();

            tables.write_composition(id, tag_ids, lines)?;

            Ok(recipe)
        })
    }

    fn delete_recipe(&self, id: i32) -> StoreResult<usize> {
        self.transaction(|tables| {
            let before = tables.recipes.len();
            tables.recipes.retain(|recipe| recipe.id != id);
            let deleted = before - tables.recipes.len();

            tables.recipe_tags.retain(|link| link.recipe_id != id);
            tables.recipe_ingredients.retain(|line| line.recipe_id != id);
            tables.favorites.retain(|entry| entry.recipe_id != id);
            tables.shopping_cart.retain(|entry| entry.recipe_id != id);

            Ok(deleted)
        })
    }

    fn recipe(&self, id: i32) -> StoreResult<Option<Recipe>> {
        Ok(self
            .read()
            .recipes
            .iter()
            .find(|recipe| recipe.id == id)
            .cloned())
    }

    fn recipes(&self, query: &RecipeQuery) -> StoreResult<Vec<Recipe>> {
        let tables = self.read();

        let tagged: Option<HashSet<i32>> = (!query.tag_slugs.is_empty()).then(|| {
            let tag_ids: HashSet<i32> = tables
                .tags
                .iter()
                .filter(|tag| query.tag_slugs.contains(&tag.slug))
                .map(|tag| tag.id)
                .collect();
            tables
                .recipe_tags
                .iter()
                .filter(|link| tag_ids.contains(&link.tag_id))
                .map(|link| link.recipe_id)
                .collect()
        });

        let recipes = tables
            .recipes
            .iter()
            .filter(|recipe| query.author.map_or(true, |author| recipe.author_id == author))
            .filter(|recipe| {
                tagged
                    .as_ref()
                    .map_or(true, |tagged| tagged.contains(&recipe.id))
            })
            .filter(|recipe| {
                query.favorited_by.map_or(true, |user| {
                    tables
                        .favorites
                        .iter()
                        .any(|entry| entry.user_id == user && entry.recipe_id == recipe.id)
                })
            })
            .filter(|recipe| {
                query.in_cart_of.map_or(true, |user| {
                    tables
                        .shopping_cart
                        .iter()
                        .any(|entry| entry.user_id == user && entry.recipe_id == recipe.id)
                })
            })
            .sorted_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            .take(query.limit.map_or(usize::MAX, |limit| limit.max(0) as usize))
            .cloned()
            .collect();

        Ok(recipes)
    }

    fn count_recipes_by(&self, author: i32) -> StoreResult<i64> {
        Ok(self
            .read()
            .recipes
            .iter()
            .filter(|recipe| recipe.author_id == author)
            .count() as i64)
    }

    fn recipe_tags(&self, recipe_id: i32) -> StoreResult<Vec<Tag>> {
        let tables = self.read();
        Ok(tables
            .tags
            .iter()
            .filter(|tag| tables.recipe_tags.contains(&RecipeTag::new(recipe_id, tag.id)))
            .sorted_by_key(|tag| tag.id)
            .cloned()
            .collect())
    }

    fn recipe_ingredients(&self, recipe_id: i32) -> StoreResult<Vec<(Ingredient, i16)>> {
        self.read().lines_of(&HashSet::from([recipe_id]))
    }

    fn insert_relation(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<()> {
        self.transaction(|tables| {
            if !tables.has_user(user) {
                return Err(missing("relation_user_id_fkey"));
            }
            if !tables.has_recipe(recipe) {
                return Err(missing("relation_recipe_id_fkey"));
            }

            let id = tables.next_id();
            match kind {
                RelationKind::Favorite => {
                    if tables
                        .favorites
                        .iter()
                        .any(|entry| entry.user_id == user && entry.recipe_id == recipe)
                    {
                        return Err(violation("unique_favorite_recipe"));
                    }
                    tables.favorites.push(Favorite {
                        id,
                        user_id: user,
                        recipe_id: recipe,
                    });
                }
                RelationKind::ShoppingCart => {
                    if tables
                        .shopping_cart
                        .iter()
                        .any(|entry| entry.user_id == user && entry.recipe_id == recipe)
                    {
                        return Err(violation("shopping_list_recipe"));
                    }
                    tables.shopping_cart.push(CartEntry {
                        id,
                        user_id: user,
                        recipe_id: recipe,
                    });
                }
            }

            Ok(())
        })
    }

    fn delete_relation(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<usize> {
        self.transaction(|tables| {
            let deleted = match kind {
                RelationKind::Favorite => {
                    let before = tables.favorites.len();
                    tables
                        .favorites
                        .retain(|entry| entry.user_id != user || entry.recipe_id != recipe);
                    before - tables.favorites.len()
                }
                RelationKind::ShoppingCart => {
                    let before = tables.shopping_cart.len();
                    tables
                        .shopping_cart
                        .retain(|entry| entry.user_id != user || entry.recipe_id != recipe);
                    before - tables.shopping_cart.len()
                }
            };

            Ok(deleted)
        })
    }

    fn relation_exists(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<bool> {
        let tables = self.read();
        let found = match kind {
            RelationKind::Favorite => tables
                .favorites
                .iter()
                .any(|entry| entry.user_id == user && entry.recipe_id == recipe),
            RelationKind::ShoppingCart => tables
                .shopping_cart
                .iter()
                .any(|entry| entry.user_id == user && entry.recipe_id == recipe),
        };

        Ok(found)
    }

    fn cart_ingredient_lines(&self, user: i32) -> StoreResult<Vec<(Ingredient, i16)>> {
        let tables = self.read();
        let in_cart: HashSet<i32> = tables
            .shopping_cart
            .iter()
            .filter(|entry| entry.user_id == user)
            .map(|entry| entry.recipe_id)
            .collect();

        tables.lines_of(&in_cart)
    }

    fn insert_subscription(&self, follower: i32, author: i32) -> StoreResult<Subscription> {
        self.transaction(|tables| {
            if !tables.has_user(follower) || !tables.has_user(author) {
                return Err(missing("subscriptions_user_id_fkey"));
            }
            if follower == author {
                return Err(StoreError::CheckViolation("no_self_subscription".to_owned()));
            }
            if tables
                .subscriptions
                .iter()
                .any(|entry| entry.user_id == follower && entry.author_id == author)
            {
                return Err(violation("unique_subscription"));
            }

            let subscription = Subscription {
                id: tables.next_id(),
                user_id: follower,
                author_id: author,
            };
            tables.subscriptions.push(subscription.clone());

            Ok(subscription)
        })
    }

    fn delete_subscription(&self, follower: i32, author: i32) -> StoreResult<usize> {
        self.transaction(|tables| {
            let before = tables.subscriptions.len();
            tables
                .subscriptions
                .retain(|entry| entry.user_id != follower || entry.author_id != author);

            Ok(before - tables.subscriptions.len())
        })
    }

    fn subscription_exists(&self, follower: i32, author: i32) -> StoreResult<bool> {
        Ok(self
            .read()
            .subscriptions
            .iter()
            .any(|entry| entry.user_id == follower && entry.author_id == author))
    }

    fn subscribed_authors(&self, follower: i32) -> StoreResult<Vec<User>> {
        let tables = self.read();
        Ok(tables
            .subscriptions
            .iter()
            .filter(|entry| entry.user_id == follower)
            .sorted_by_key(|entry| entry.id)
            .filter_map(|entry| tables.users.iter().find(|user| user.id == entry.author_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (MemoryStore, User, Vec<Tag>, Vec<Ingredient>) {
        let store = MemoryStore::new();
        store
            .import_catalog(
                &[NewTag::new("Breakfast".to_owned(), "breakfast".to_owned())],
                &[
                    NewIngredient::new("Flour".to_owned(), "g".to_owned()),
                    NewIngredient::new("Milk".to_owned(), "ml".to_owned()),
                ],
            )
            .unwrap();
        let user = store
            .insert_user(&NewUser::new(
                "cook".to_owned(),
                "cook@example.com".to_owned(),
                "Ada".to_owned(),
                "Cook".to_owned(),
                None,
            ))
            .unwrap();
        let tags = store.tags().unwrap();
        let ingredients = store.ingredients(None).unwrap();

        (store, user, tags, ingredients)
    }

    fn new_recipe(author_id: i32) -> NewRecipe {
        NewRecipe::new(author_id, "Pancakes".to_owned(), "Mix".to_owned(), 10, None)
    }

    #[test]
    fn import_skips_existing_rows() {
        let (store, _, _, _) = seeded();

        let counts = store
            .import_catalog(
                &[NewTag::new("Breakfast".to_owned(), "breakfast".to_owned())],
                &[
                    NewIngredient::new("Flour".to_owned(), "g".to_owned()),
                    NewIngredient::new("Flour".to_owned(), "kg".to_owned()),
                ],
            )
            .unwrap();

        assert_eq!(counts, (0, 1));
        assert_eq!(store.ingredients(Some("fl")).unwrap().len(), 2);
    }

    #[test]
    fn failed_insert_leaves_no_recipe_behind() {
        let (store, user, tags, ingredients) = seeded();

        let result = store.insert_recipe(
            &new_recipe(user.id),
            &[tags[0].id],
            &[
                IngredientLine::new(ingredients[0].id, 100),
                IngredientLine::new(9999, 1),
            ],
        );

        assert!(matches!(result, Err(StoreError::ForeignKeyViolation(_))));
        assert!(store.recipes(&RecipeQuery::default()).unwrap().is_empty());
    }

    #[test]
    fn duplicate_relation_is_a_unique_violation() {
        let (store, user, tags, ingredients) = seeded();
        let recipe = store
            .insert_recipe(
                &new_recipe(user.id),
                &[tags[0].id],
                &[IngredientLine::new(ingredients[0].id, 100)],
            )
            .unwrap();

        store
            .insert_relation(RelationKind::Favorite, user.id, recipe.id)
            .unwrap();
        let second = store.insert_relation(RelationKind::Favorite, user.id, recipe.id);

        assert!(matches!(second, Err(StoreError::UniqueViolation(_))));
        // the other relation kind is an independent table
        store
            .insert_relation(RelationKind::ShoppingCart, user.id, recipe.id)
            .unwrap();
    }

    #[test]
    fn deleting_a_recipe_cascades() {
        let (store, user, tags, ingredients) = seeded();
        let recipe = store
            .insert_recipe(
                &new_recipe(user.id),
                &[tags[0].id],
                &[IngredientLine::new(ingredients[0].id, 100)],
            )
            .unwrap();
        store
            .insert_relation(RelationKind::ShoppingCart, user.id, recipe.id)
            .unwrap();

        assert_eq!(store.delete_recipe(recipe.id).unwrap(), 1);
        assert!(store.recipe_ingredients(recipe.id).unwrap().is_empty());
        assert!(store.recipe_tags(recipe.id).unwrap().is_empty());
        assert!(!store
            .relation_exists(RelationKind::ShoppingCart, user.id, recipe.id)
            .unwrap());
        assert!(store.cart_ingredient_lines(user.id).unwrap().is_empty());
    }
}
