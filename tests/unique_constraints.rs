mod common;

use common::seed;
use foodgram::{
    add_relation,
    database::models::{
        ingredient::{Ingredient, NewIngredient},
        recipe::{NewRecipe, Recipe, RecipeChangeset},
        recipe_ingredient::IngredientLine,
        relation::Subscription,
        tag::{NewTag, Tag},
        user::{NewUser, User},
    },
    store::{RecipeQuery, StoreResult},
    subscribe, FoodgramError, MemoryStore, RelationKind, Store,
};

/// Answers every existence check with `false`, as a concurrent request that has not
/// seen the other insert yet would. Everything else goes to the wrapped store.
struct StaleReads<'a>(&'a MemoryStore);

impl Store for StaleReads<'_> {
    fn import_catalog(
        &self,
        tags: &[NewTag],
        ingredients: &[NewIngredient],
    ) -> StoreResult<(usize, usize)> {
        self.0.import_catalog(tags, ingredients)
    }

    fn tags(&self) -> StoreResult<Vec<Tag>> {
        self.0.tags()
    }

    fn tag(&self, id: i32) -> StoreResult<Option<Tag>> {
        self.0.tag(id)
    }

    fn existing_tag_ids(&self, ids: &[i32]) -> StoreResult<Vec<i32>> {
        self.0.existing_tag_ids(ids)
    }

    fn ingredients(&self, name_prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        self.0.ingredients(name_prefix)
    }

    fn ingredient(&self, id: i32) -> StoreResult<Option<Ingredient>> {
        self.0.ingredient(id)
    }

    fn existing_ingredient_ids(&self, ids: &[i32]) -> StoreResult<Vec<i32>> {
        self.0.existing_ingredient_ids(ids)
    }

    fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        self.0.insert_user(user)
    }

    fn user(&self, id: i32) -> StoreResult<Option<User>> {
        self.0.user(id)
    }

    fn insert_recipe(
        &self,
        recipe: &NewRecipe,
        tags: &[i32],
        lines: &[IngredientLine],
    ) -> StoreResult<Recipe> {
        self.0.insert_recipe(recipe, tags, lines)
    }

    fn replace_recipe(
        &self,
        id: i32,
        changes: &RecipeChangeset,
        tags: &[i32],
        lines: &[IngredientLine],
    ) -> StoreResult<Recipe> {
        self.0.replace_recipe(id, changes, tags, lines)
    }

    fn delete_recipe(&self, id: i32) -> StoreResult<usize> {
        self.0.delete_recipe(id)
    }

    fn recipe(&self, id: i32) -> StoreResult<Option<Recipe>> {
        self.0.recipe(id)
    }

    fn recipes(&self, query: &RecipeQuery) -> StoreResult<Vec<Recipe>> {
        self.0.recipes(query)
    }

    fn count_recipes_by(&self, author: i32) -> StoreResult<i64> {
        self.0.count_recipes_by(author)
    }

    fn recipe_tags(&self, recipe_id: i32) -> StoreResult<Vec<Tag>> {
        self.0.recipe_tags(recipe_id)
    }

    fn recipe_ingredients(&self, recipe_id: i32) -> StoreResult<Vec<(Ingredient, i16)>> {
        self.0.recipe_ingredients(recipe_id)
    }

    fn insert_relation(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<()> {
        self.0.insert_relation(kind, user, recipe)
    }

    fn delete_relation(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<usize> {
        self.0.delete_relation(kind, user, recipe)
    }

    fn relation_exists(&self, _kind: RelationKind, _user: i32, _recipe: i32) -> StoreResult<bool> {
        Ok(false)
    }

    fn cart_ingredient_lines(&self, user: i32) -> StoreResult<Vec<(Ingredient, i16)>> {
        self.0.cart_ingredient_lines(user)
    }

    fn insert_subscription(&self, follower: i32, author: i32) -> StoreResult<Subscription> {
        self.0.insert_subscription(follower, author)
    }

    fn delete_subscription(&self, follower: i32, author: i32) -> StoreResult<usize> {
        self.0.delete_subscription(follower, author)
    }

    fn subscription_exists(&self, _follower: i32, _author: i32) -> StoreResult<bool> {
        Ok(false)
    }

    fn subscribed_authors(&self, follower: i32) -> StoreResult<Vec<User>> {
        self.0.subscribed_authors(follower)
    }
}

#[test]
fn duplicate_relation_is_caught_by_the_store() {
    let fx = seed();
    let recipe = fx.recipe(fx.alice, "Bread", &[fx.breakfast], &[(fx.flour_g, 200)]);
    let store = StaleReads(&fx.store);

    for kind in [RelationKind::Favorite, RelationKind::ShoppingCart] {
        add_relation(&store, kind, fx.bob, recipe.id).unwrap();

        let error = add_relation(&store, kind, fx.bob, recipe.id).unwrap_err();
        assert!(matches!(error, FoodgramError::AlreadyExists(_)));
        assert_eq!(error.status_code(), 400);
    }

    assert_eq!(fx.store.cart_ingredient_lines(fx.bob).unwrap().len(), 1);
}

#[test]
fn duplicate_subscription_is_caught_by_the_store() {
    let fx = seed();
    let store = StaleReads(&fx.store);

    subscribe(&store, fx.bob, fx.alice, None).unwrap();

    let error = subscribe(&store, fx.bob, fx.alice, None).unwrap_err();
    assert!(matches!(error, FoodgramError::AlreadyExists(_)));
    assert_eq!(fx.store.subscribed_authors(fx.bob).unwrap().len(), 1);
}
