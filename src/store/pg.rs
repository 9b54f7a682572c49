use diesel::{delete, dsl::exists, insert_into, prelude::*, select, update, upsert::excluded};
use lombok::AllArgsConstructor;
use tracing::{debug, trace, trace_span};

use crate::{
    database::{
        connection::{PgPool, PgPooledConnection},
        models::{
            ingredient::{Ingredient, NewIngredient},
            recipe::{NewRecipe, Recipe, RecipeChangeset},
            recipe_ingredient::IngredientLine,
            relation::Subscription,
            tag::{NewTag, RecipeTag, Tag},
            user::{NewUser, User},
        },
        schema::{
            favorites, ingredients, recipe_ingredients, recipe_tags, recipes, shopping_cart,
            subscriptions, tags, users,
        },
    },
    relations::RelationKind,
};

use super::{RecipeQuery, Store, StoreResult};

#[derive(AllArgsConstructor, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    fn connection(&self) -> StoreResult<PgPooledConnection> {
        Ok(self.pool.get()?)
    }
}

/// Clears the tag links and ingredient lines of `recipe_id` and writes the new ones.
/// Must run inside a transaction.
fn write_composition(
    connection: &mut PgConnection,
    recipe_id: i32,
    tag_ids: &[i32],
    lines: &[IngredientLine],
) -> StoreResult<()> {
    delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id))).execute(connection)?;

    let links: Vec<_> = tag_ids
        .iter()
        .map(|tag_id| RecipeTag::new(recipe_id, *tag_id))
        .collect();
    insert_into(recipe_tags::table)
        .values(&links)
        .execute(connection)?;

    delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)))
        .execute(connection)?;

    for line in lines {
        insert_into(recipe_ingredients::table)
            .values(line.for_recipe(recipe_id))
            .on_conflict((recipe_ingredients::recipe_id, recipe_ingredients::ingredient_id))
            .do_update()
            .set(recipe_ingredients::amount.eq(excluded(recipe_ingredients::amount)))
            .execute(connection)?;
    }

    Ok(())
}

fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

impl Store for PgStore {
    fn import_catalog(
        &self,
        new_tags: &[NewTag],
        new_ingredients: &[NewIngredient],
    ) -> StoreResult<(usize, usize)> {
        let span = trace_span!("import catalog");
        let _guard = span.enter();

        let mut connection = self.connection()?;
        connection.build_transaction().run(|connection| {
            trace!("Inserting {} tags", new_tags.len());
            let tag_count = insert_into(tags::table)
                .values(new_tags)
                .on_conflict_do_nothing()
                .execute(connection)?;

            trace!("Inserting {} ingredients", new_ingredients.len());
            let mut ingredient_count = 0;
            // One statement per chunk keeps us under the bind parameter limit
            for chunk in new_ingredients.chunks(1000) {
                ingredient_count += insert_into(ingredients::table)
                    .values(chunk)
                    .on_conflict_do_nothing()
                    .execute(connection)?;
            }

            Ok((tag_count, ingredient_count))
        })
    }

    fn tags(&self) -> StoreResult<Vec<Tag>> {
        let mut connection = self.connection()?;
        Ok(tags::table
            .order(tags::id.asc())
            .select(Tag::as_select())
            .load(&mut connection)?)
    }

    fn tag(&self, id: i32) -> StoreResult<Option<Tag>> {
        let mut connection = self.connection()?;
        Ok(tags::table
            .find(id)
            .select(Tag::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn existing_tag_ids(&self, ids: &[i32]) -> StoreResult<Vec<i32>> {
        let mut connection = self.connection()?;
        Ok(tags::table
            .filter(tags::id.eq_any(ids))
            .select(tags::id)
            .load(&mut connection)?)
    }

    fn ingredients(&self, name_prefix: Option<&str>) -> StoreResult<Vec<Ingredient>> {
        let mut connection = self.connection()?;

        let mut query = ingredients::table
            .select(Ingredient::as_select())
            .into_boxed();
        if let Some(prefix) = name_prefix {
            query = query.filter(ingredients::name.ilike(format!("{}%", escape_like(prefix))));
        }

        Ok(query
            .order((ingredients::name.asc(), ingredients::id.asc()))
            .load(&mut connection)?)
    }

    fn ingredient(&self, id: i32) -> StoreResult<Option<Ingredient>> {
        let mut connection = self.connection()?;
        Ok(ingredients::table
            .find(id)
            .select(Ingredient::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn existing_ingredient_ids(&self, ids: &[i32]) -> StoreResult<Vec<i32>> {
        let mut connection = self.connection()?;
        Ok(ingredients::table
            .filter(ingredients::id.eq_any(ids))
            .select(ingredients::id)
            .load(&mut connection)?)
    }

    fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut connection = self.connection()?;
        Ok(insert_into(users::table)
            .values(user)
            .returning(User::as_returning())
            .get_result(&mut connection)?)
    }

    fn user(&self, id: i32) -> StoreResult<Option<User>> {
        let mut connection = self.connection()?;
        Ok(users::table
            .find(id)
            .select(User::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn insert_recipe(
        &self,
        recipe: &NewRecipe,
        tag_ids: &[i32],
        lines: &[IngredientLine],
    ) -> StoreResult<Recipe> {
        let span = trace_span!("insert recipe");
        let _guard = span.enter();

        let mut connection = self.connection()?;
        connection.build_transaction().run(|connection| {
            let recipe: Recipe = insert_into(recipes::table)
                .values(recipe)
                .returning(Recipe::as_returning())
                .get_result(connection)?;

            write_composition(connection, recipe.id, tag_ids, lines)?;
            debug!(
                "Recipe {} written with {} tags and {} lines",
                recipe.id,
                tag_ids.len(),
                lines.len()
            );

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
        let span = trace_span!("replace recipe", id);
        let _guard = span.enter();

        let mut connection = self.connection()?;
        connection.build_transaction().run(|connection| {
            // Lock the row so two concurrent updates replace the lines one after the other
            let recipe: Recipe = if changes.is_empty() {
                recipes::table
                    .find(id)
                    .select(Recipe::as_select())
                    .for_update()
                    .first(connection)?
            } else {
                update(recipes::table.find(id))
                    .set(changes)
                    .returning(Recipe::as_returning())
                    .get_result(connection)?
            };

            write_composition(connection, recipe.id, tag_ids, lines)?;

            Ok(recipe)
        })
    }

    fn delete_recipe(&self, id: i32) -> StoreResult<usize> {
        let mut connection = self.connection()?;
        Ok(delete(recipes::table.find(id)).execute(&mut connection)?)
    }

    fn recipe(&self, id: i32) -> StoreResult<Option<Recipe>> {
        let mut connection = self.connection()?;
        Ok(recipes::table
            .find(id)
            .select(Recipe::as_select())
            .first(&mut connection)
            .optional()?)
    }

    fn recipes(&self, recipe_query: &RecipeQuery) -> StoreResult<Vec<Recipe>> {
        let mut connection = self.connection()?;

        let mut query = recipes::table.select(Recipe::as_select()).into_boxed();
        if let Some(author) = recipe_query.author {
            query = query.filter(recipes::author_id.eq(author));
        }
        if !recipe_query.tag_slugs.is_empty() {
            query = query.filter(
                recipes::id.eq_any(
                    recipe_tags::table
                        .inner_join(tags::table)
                        .filter(tags::slug.eq_any(recipe_query.tag_slugs.clone()))
                        .select(recipe_tags::recipe_id),
                ),
            );
        }
        if let Some(user) = recipe_query.favorited_by {
            query = query.filter(
                recipes::id.eq_any(
                    favorites::table
                        .filter(favorites::user_id.eq(user))
                        .select(favorites::recipe_id),
                ),
            );
        }
        if let Some(user) = recipe_query.in_cart_of {
            query = query.filter(
                recipes::id.eq_any(
                    shopping_cart::table
                        .filter(shopping_cart::user_id.eq(user))
                        .select(shopping_cart::recipe_id),
                ),
            );
        }
        if let Some(limit) = recipe_query.limit {
            query = query.limit(limit);
        }

        Ok(query
            .order((recipes::created_at.desc(), recipes::id.desc()))
            .load(&mut connection)?)
    }

    fn count_recipes_by(&self, author: i32) -> StoreResult<i64> {
        let mut connection = self.connection()?;
        Ok(recipes::table
            .filter(recipes::author_id.eq(author))
            .count()
            .get_result(&mut connection)?)
    }

    fn recipe_tags(&self, recipe_id: i32) -> StoreResult<Vec<Tag>> {
        let mut connection = self.connection()?;
        Ok(recipe_tags::table
            .inner_join(tags::table)
            .filter(recipe_tags::recipe_id.eq(recipe_id))
            .order(tags::id.asc())
            .select(Tag::as_select())
            .load(&mut connection)?)
    }

    fn recipe_ingredients(&self, recipe_id: i32) -> StoreResult<Vec<(Ingredient, i16)>> {
        let mut connection = self.connection()?;
        Ok(recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .order(recipe_ingredients::id.asc())
            .select((Ingredient::as_select(), recipe_ingredients::amount))
            .load(&mut connection)?)
    }

    fn insert_relation(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<()> {
        let mut connection = self.connection()?;
        match kind {
            RelationKind::Favorite => insert_into(favorites::table)
                .values((favorites::user_id.eq(user), favorites::recipe_id.eq(recipe)))
                .execute(&mut connection)?,
            RelationKind::ShoppingCart => insert_into(shopping_cart::table)
                .values((
                    shopping_cart::user_id.eq(user),
                    shopping_cart::recipe_id.eq(recipe),
                ))
                .execute(&mut connection)?,
        };

        Ok(())
    }

    fn delete_relation(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<usize> {
        let mut connection = self.connection()?;
        let deleted = match kind {
            RelationKind::Favorite => delete(
                favorites::table
                    .filter(favorites::user_id.eq(user))
                    .filter(favorites::recipe_id.eq(recipe)),
            )
            .execute(&mut connection)?,
            RelationKind::ShoppingCart => delete(
                shopping_cart::table
                    .filter(shopping_cart::user_id.eq(user))
                    .filter(shopping_cart::recipe_id.eq(recipe)),
            )
            .execute(&mut connection)?,
        };

        Ok(deleted)
    }

    fn relation_exists(&self, kind: RelationKind, user: i32, recipe: i32) -> StoreResult<bool> {
        let mut connection = self.connection()?;
        let found = match kind {
            RelationKind::Favorite => select(exists(
                favorites::table
                    .filter(favorites::user_id.eq(user))
                    .filter(favorites::recipe_id.eq(recipe)),
            ))
            .get_result::<bool>(&mut connection)?,
            RelationKind::ShoppingCart => select(exists(
                shopping_cart::table
                    .filter(shopping_cart::user_id.eq(user))
                    .filter(shopping_cart::recipe_id.eq(recipe)),
            ))
            .get_result::<bool>(&mut connection)?,
        };

        Ok(found)
    }

    fn cart_ingredient_lines(&self, user: i32) -> StoreResult<Vec<(Ingredient, i16)>> {
        let mut connection = self.connection()?;
        Ok(recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(
                recipe_ingredients::recipe_id.eq_any(
                    shopping_cart::table
                        .filter(shopping_cart::user_id.eq(user))
                        .select(shopping_cart::recipe_id),
                ),
            )
            .order(recipe_ingredients::id.asc())
            .select((Ingredient::as_select(), recipe_ingredients::amount))
            .load(&mut connection)?)
    }

    fn insert_subscription(&self, follower: i32, author: i32) -> StoreResult<Subscription> {
        let mut connection = self.connection()?;
        Ok(insert_into(subscriptions::table)
            .values((
                subscriptions::user_id.eq(follower),
                subscriptions::author_id.eq(author),
            ))
            .returning(Subscription::as_returning())
            .get_result(&mut connection)?)
    }

    fn delete_subscription(&self, follower: i32, author: i32) -> StoreResult<usize> {
        let mut connection = self.connection()?;
        Ok(delete(
            subscriptions::table
                .filter(subscriptions::user_id.eq(follower))
                .filter(subscriptions::author_id.eq(author)),
        )
        .execute(&mut connection)?)
    }

    fn subscription_exists(&self, follower: i32, author: i32) -> StoreResult<bool> {
        let mut connection = self.connection()?;
        Ok(select(exists(
            subscriptions::table
                .filter(subscriptions::user_id.eq(follower))
                .filter(subscriptions::author_id.eq(author)),
        ))
        .get_result(&mut connection)?)
    }

    fn subscribed_authors(&self, follower: i32) -> StoreResult<Vec<User>> {
        let mut connection = self.connection()?;
        Ok(subscriptions::table
            .inner_join(users::table.on(users::id.eq(subscriptions::author_id)))
            .filter(subscriptions::user_id.eq(follower))
            .order(subscriptions::id.asc())
            .select(User::as_select())
            .load(&mut connection)?)
    }
}
