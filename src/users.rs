use serde::Serialize;

use crate::{database::models::user::User, error::FoodgramError, store::Store};

/// A user as seen by `viewer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

impl UserProfile {
    pub fn for_viewer<S: Store + ?Sized>(
        store: &S,
        viewer: Option<i32>,
        user: User,
    ) -> Result<Self, FoodgramError> {
        let is_subscribed = match viewer {
            Some(viewer) => store.subscription_exists(viewer, user.id)?,
            None => false,
        };

        Ok(Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
            avatar: user.avatar,
        })
    }
}

pub fn existing_user<S: Store + ?Sized>(store: &S, user_id: i32) -> Result<User, FoodgramError> {
    store.user(user_id)?.ok_or(FoodgramError::UnknownEntity {
        entity: "user",
        id: user_id,
    })
}

pub fn user_profile<S: Store + ?Sized>(
    store: &S,
    viewer: Option<i32>,
    user_id: i32,
) -> Result<UserProfile, FoodgramError> {
    let user = existing_user(store, user_id)?;
    UserProfile::for_viewer(store, viewer, user)
}
