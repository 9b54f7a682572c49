use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::favorites)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Favorite {
    pub id: i32,
    pub user_id: i32,
    pub recipe_id: i32,
}

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::shopping_cart)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartEntry {
    pub id: i32,
    pub user_id: i32,
    pub recipe_id: i32,
}

/// `user_id` follows `author_id`.
#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = crate::database::schema::subscriptions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Subscription {
    pub id: i32,
    pub user_id: i32,
    pub author_id: i32,
}
