#![allow(dead_code)]

use foodgram::{
    database::models::{
        ingredient::NewIngredient, recipe::Recipe, tag::NewTag, user::NewUser,
    },
    recipes::{IngredientAmount, RecipeComposer, RecipeFields},
    MemoryStore, RecipeLimits, Store,
};

/// A store with two tags, a small ingredient catalog and three users.
pub struct Fixture {
    pub store: MemoryStore,
    pub alice: i32,
    pub bob: i32,
    pub carol: i32,
    pub breakfast: i32,
    pub dinner: i32,
    pub flour_g: i32,
    pub flour_kg: i32,
    pub milk_ml: i32,
    pub sugar_g: i32,
}

fn user(store: &MemoryStore, name: &str) -> i32 {
    store
        .insert_user(&NewUser::new(
            name.to_owned(),
            format!("{name}@foodgram.test"),
            name.to_owned(),
            "Tester".to_owned(),
            None,
        ))
        .unwrap()
        .id
}

fn ingredient_id(store: &MemoryStore, name: &str, unit: &str) -> i32 {
    store
        .ingredients(Some(name))
        .unwrap()
        .into_iter()
        .find(|ingredient| ingredient.name == name && ingredient.measurement_unit == unit)
        .unwrap()
        .id
}

fn tag_id(store: &MemoryStore, slug: &str) -> i32 {
    store
        .tags()
        .unwrap()
        .into_iter()
        .find(|tag| tag.slug == slug)
        .unwrap()
        .id
}

pub fn seed() -> Fixture {
    let store = MemoryStore::new();

    let tags = [("Breakfast", "breakfast"), ("Dinner", "dinner")]
        .map(|(name, slug)| NewTag::new(name.to_owned(), slug.to_owned()));
    let ingredients = [("Flour", "g"), ("Flour", "kg"), ("Milk", "ml"), ("Sugar", "g")]
        .map(|(name, unit)| NewIngredient::new(name.to_owned(), unit.to_owned()));
    store.import_catalog(&tags, &ingredients).unwrap();

    Fixture {
        alice: user(&store, "alice"),
        bob: user(&store, "bob"),
        carol: user(&store, "carol"),
        breakfast: tag_id(&store, "breakfast"),
        dinner: tag_id(&store, "dinner"),
        flour_g: ingredient_id(&store, "Flour", "g"),
        flour_kg: ingredient_id(&store, "Flour", "kg"),
        milk_ml: ingredient_id(&store, "Milk", "ml"),
        sugar_g: ingredient_id(&store, "Sugar", "g"),
        store,
    }
}

pub fn fields(name: &str) -> RecipeFields {
    RecipeFields::new(name.to_owned(), format!("How to make {name}"), 20, None)
}

pub fn amounts(lines: &[(i32, i32)]) -> Vec<IngredientAmount> {
    lines
        .iter()
        .map(|&(id, amount)| IngredientAmount::new(id, amount))
        .collect()
}

impl Fixture {
    pub fn composer(&self) -> RecipeComposer<'_, MemoryStore> {
        RecipeComposer::new(&self.store, RecipeLimits::default())
    }

    pub fn recipe(&self, author: i32, name: &str, tags: &[i32], lines: &[(i32, i32)]) -> Recipe {
        self.composer()
            .create(author, fields(name), tags, &amounts(lines))
            .unwrap()
    }
}
