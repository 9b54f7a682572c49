use itertools::Itertools;
use lombok::AllArgsConstructor;
use serde::Deserialize;
use tracing::{debug, info, trace_span};

use crate::{
    config::RecipeLimits,
    database::models::{
        recipe::{NewRecipe, Recipe, RecipeChangeset},
        recipe_ingredient::IngredientLine,
    },
    error::{FoodgramError, ValidationErrors},
    relations::existing_recipe,
    store::{Store, StoreError},
    users::existing_user,
};

/// Ingredient line as sent by a client, `id` is the catalog ingredient.
#[derive(AllArgsConstructor, Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct IngredientAmount {
    pub id: i32,
    pub amount: i32,
}

#[derive(AllArgsConstructor, Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RecipeFields {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
}

/// Scalar fields of a partial update. Tags and ingredients are passed separately
/// because an update must always carry both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub image: Option<String>,
}

const REQUIRED: &str = "this field is required";

fn check_name(name: &str, limits: &RecipeLimits, errors: &mut ValidationErrors) {
    if name.trim().is_empty() {
        errors.add("name", "this field may not be blank");
    } else if name.chars().count() > limits.name_max_length {
        errors.add(
            "name",
            format!(
                "ensure this field has no more than {} characters",
                limits.name_max_length
            ),
        );
    }
}

fn check_text(text: &str, errors: &mut ValidationErrors) {
    if text.trim().is_empty() {
        errors.add("text", "this field may not be blank");
    }
}

fn check_cooking_time(value: i32, limits: &RecipeLimits, errors: &mut ValidationErrors) -> i16 {
    match i16::try_from(value) {
        Ok(cooking_time) if limits.cooking_time.contains(&cooking_time) => cooking_time,
        _ => {
            errors.add(
                "cooking_time",
                format!(
                    "must be between {} and {}",
                    limits.cooking_time.start(),
                    limits.cooking_time.end()
                ),
            );
            0
        }
    }
}

fn check_tags(tags: &[i32], errors: &mut ValidationErrors) {
    if tags.is_empty() {
        errors.add("tags", "add at least one tag");
    } else if !tags.iter().all_unique() {
        errors.add("tags", "tags must not repeat");
    }
}

/// Converts client lines into storable ones, recording every problem found.
fn check_ingredients(
    ingredients: &[IngredientAmount],
    limits: &RecipeLimits,
    errors: &mut ValidationErrors,
) -> Vec<IngredientLine> {
    if ingredients.is_empty() {
        errors.add("ingredients", "add at least one ingredient");
        return Vec::new();
    }

    for id in ingredients.iter().map(|line| line.id).duplicates() {
        errors.add(
            "ingredients",
            format!("a recipe cannot include ingredient {id} twice"),
        );
    }

    ingredients
        .iter()
        .filter_map(|line| match i16::try_from(line.amount) {
            Ok(amount) if limits.amount.contains(&amount) => {
                Some(IngredientLine::new(line.id, amount))
            }
            _ => {
                errors.add(
                    "ingredients",
                    format!(
                        "amount of ingredient {} must be between {} and {}",
                        line.id,
                        limits.amount.start(),
                        limits.amount.end()
                    ),
                );
                None
            }
        })
        .collect()
}

/// Validates and atomically writes recipes together with their tags and ingredient lines.
pub struct RecipeComposer<'a, S: Store + ?Sized> {
    store: &'a S,
    limits: RecipeLimits,
}

impl<'a, S: Store + ?Sized> RecipeComposer<'a, S> {
    pub fn new(store: &'a S, limits: RecipeLimits) -> Self {
        Self { store, limits }
    }

    /// Flags ids that do not exist in the catalog. Lines dropped by the structural
    /// checks are not looked up, every other line is.
    fn check_references(
        &self,
        tags: &[i32],
        lines: &[IngredientLine],
        errors: &mut ValidationErrors,
    ) -> Result<(), FoodgramError> {
        let tags = tags.iter().copied().unique().collect_vec();
        if !tags.is_empty() {
            let known = self.store.existing_tag_ids(&tags)?;
            tags.iter()
                .filter(|id| !known.contains(*id))
                .for_each(|id| errors.add("tags", format!("tag {id} does not exist")));
        }

        let ids = lines
            .iter()
            .map(|line| line.ingredient_id)
            .unique()
            .collect_vec();
        if !ids.is_empty() {
            let known = self.store.existing_ingredient_ids(&ids)?;
            ids.iter()
                .filter(|id| !known.contains(*id))
                .for_each(|id| {
                    errors.add("ingredients", format!("ingredient {id} does not exist"))
                });
        }

        Ok(())
    }

    pub fn create(
        &self,
        author_id: i32,
        fields: RecipeFields,
        tags: &[i32],
        ingredients: &[IngredientAmount],
    ) -> Result<Recipe, FoodgramError> {
        let span = trace_span!("create recipe", author_id);
        let _guard = span.enter();

        existing_user(self.store, author_id)?;

        let mut errors = ValidationErrors::new();
        check_name(&fields.name, &self.limits, &mut errors);
        check_text(&fields.text, &mut errors);
        let cooking_time = check_cooking_time(fields.cooking_time, &self.limits, &mut errors);
        check_tags(tags, &mut errors);
        let lines = check_ingredients(ingredients, &self.limits, &mut errors);
        self.check_references(tags, &lines, &mut errors)?;
        errors.into_result()?;

        let new_recipe = NewRecipe::new(
            author_id,
            fields.name,
            fields.text,
            cooking_time,
            fields.image,
        );
        let recipe = self.store.insert_recipe(&new_recipe, tags, &lines)?;

        info!(
            "Recipe {} created by user {} with {} ingredients",
            recipe.id,
            author_id,
            lines.len()
        );
        Ok(recipe)
    }

    /// Applies `fields` and replaces the whole tag set and ingredient list.
    /// Both `tags` and `ingredients` are mandatory.
    pub fn update(
        &self,
        recipe_id: i32,
        fields: RecipePatch,
        tags: Option<&[i32]>,
        ingredients: Option<&[IngredientAmount]>,
    ) -> Result<Recipe, FoodgramError> {
        let span = trace_span!("update recipe", recipe_id);
        let _guard = span.enter();

        existing_recipe(self.store, recipe_id)?;

        let mut errors = ValidationErrors::new();
        if let Some(name) = &fields.name {
            check_name(name, &self.limits, &mut errors);
        }
        if let Some(text) = &fields.text {
            check_text(text, &mut errors);
        }
        let cooking_time = fields
            .cooking_time
            .map(|value| check_cooking_time(value, &self.limits, &mut errors));

        let tags: &[i32] = match tags {
            Some(tags) => {
                check_tags(tags, &mut errors);
                tags
            }
            None => {
                errors.add("tags", REQUIRED);
                &[]
            }
        };
        let lines = match ingredients {
            Some(ingredients) => check_ingredients(ingredients, &self.limits, &mut errors),
            None => {
                errors.add("ingredients", REQUIRED);
                Vec::new()
            }
        };
        self.check_references(tags, &lines, &mut errors)?;
        errors.into_result()?;

        let changes = RecipeChangeset {
            name: fields.name,
            text: fields.text,
            cooking_time,
            image: fields.image,
        };
        let recipe = self
            .store
            .replace_recipe(recipe_id, &changes, tags, &lines)
            .map_err(|error| match error {
                StoreError::NotFound => FoodgramError::UnknownEntity {
                    entity: "recipe",
                    id: recipe_id,
                },
                error => error.into(),
            })?;

        info!(
            "Recipe {} updated with {} tags and {} ingredients",
            recipe.id,
            tags.len(),
            lines.len()
        );
        Ok(recipe)
    }

    pub fn delete(&self, recipe_id: i32) -> Result<(), FoodgramError> {
        if self.store.delete_recipe(recipe_id)? == 0 {
            return Err(FoodgramError::UnknownEntity {
                entity: "recipe",
                id: recipe_id,
            });
        }

        debug!("Recipe {recipe_id} deleted");
        Ok(())
    }
}
