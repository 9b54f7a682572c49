use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lombok::AllArgsConstructor;
use serde::Serialize;

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Recipe {
    pub id: i32,
    pub author_id: i32,
    pub name: String,
    pub text: String,
    pub cooking_time: i16,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, AllArgsConstructor, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipe {
    pub author_id: i32,
    pub name: String,
    pub text: String,
    pub cooking_time: i16,
    pub image: Option<String>,
}

/// Partial update of the scalar recipe columns, `None` leaves the column untouched.
#[derive(AsChangeset, Debug, Clone, Default, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeChangeset {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i16>,
    pub image: Option<String>,
}

impl RecipeChangeset {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.text.is_none()
            && self.cooking_time.is_none()
            && self.image.is_none()
    }

    pub fn apply(&self, recipe: &mut Recipe) {
        if let Some(name) = &self.name {
            recipe.name = name.clone();
        }
        if let Some(text) = &self.text {
            recipe.text = text.clone();
        }
        if let Some(cooking_time) = self.cooking_time {
            recipe.cooking_time = cooking_time;
        }
        if let Some(image) = &self.image {
            recipe.image = Some(image.clone());
        }
    }
}

/// Short projection returned by the favorite/cart toggles and subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipeShort {
    pub id: i32,
    pub name: String,
    pub image: Option<String>,
    pub cooking_time: i16,
}

impl From<&Recipe> for RecipeShort {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            cooking_time: recipe.cooking_time,
        }
    }
}
