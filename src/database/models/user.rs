use diesel::prelude::*;
use lombok::AllArgsConstructor;
use serde::{Deserialize, Serialize};

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq, Serialize)]
#[diesel(table_name = crate::database::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}

// Accounts are created by the auth layer, this is only used for seeding
#[derive(Insertable, AllArgsConstructor, Debug, Clone, Deserialize)]
#[diesel(table_name = crate::database::schema::users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: Option<String>,
}
