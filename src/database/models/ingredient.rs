use diesel::prelude::*;
use lombok::AllArgsConstructor;
use serde::{Deserialize, Serialize};

/// Catalog entry. `(name, measurement_unit)` is unique.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[diesel(table_name = crate::database::schema::ingredients)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Ingredient {
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(Insertable, AllArgsConstructor, Debug, Clone, PartialEq, Eq, Deserialize)]
#[diesel(table_name = crate::database::schema::ingredients)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}
