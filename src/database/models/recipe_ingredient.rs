use diesel::prelude::*;
use lombok::AllArgsConstructor;

#[derive(Queryable, Selectable, AllArgsConstructor, Debug, PartialEq, Eq, Hash, Clone)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeIngredient {
    pub id: i32,
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub amount: i16,
}

#[derive(Insertable, AsChangeset, AllArgsConstructor, Debug, PartialEq, Eq, Clone)]
#[diesel(table_name = crate::database::schema::recipe_ingredients)]
pub struct NewRecipeIngredient {
    pub recipe_id: i32,
    pub ingredient_id: i32,
    pub amount: i16,
}

/// One validated `(ingredient, amount)` line of a recipe being written.
#[derive(AllArgsConstructor, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct IngredientLine {
    pub ingredient_id: i32,
    pub amount: i16,
}

impl IngredientLine {
    pub fn for_recipe(&self, recipe_id: i32) -> NewRecipeIngredient {
        NewRecipeIngredient::new(recipe_id, self.ingredient_id, self.amount)
    }
}
