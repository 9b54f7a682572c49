use diesel::prelude::*;
use lombok::AllArgsConstructor;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[diesel(table_name = crate::database::schema::tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Tag {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Insertable, AllArgsConstructor, Debug, Clone, Deserialize)]
#[diesel(table_name = crate::database::schema::tags)]
pub struct NewTag {
    pub name: String,
    pub slug: String,
}

#[derive(Queryable, Selectable, Insertable, AllArgsConstructor, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::recipe_tags)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RecipeTag {
    pub recipe_id: i32,
    pub tag_id: i32,
}
