use serde::Serialize;
use tracing::{debug_span, info, warn};

use crate::{
    database::models::{recipe::RecipeShort, user::User},
    error::FoodgramError,
    store::{RecipeQuery, Store, StoreError},
    users::{existing_user, UserProfile},
};

/// A followed author with a preview of their recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRecord {
    #[serde(flatten)]
    pub author: UserProfile,
    pub recipes: Vec<RecipeShort>,
    /// Every recipe of the author, regardless of `recipes_limit`.
    pub recipes_count: i64,
}

/// `recipes_limit` query value: only a plain non-negative integer caps the preview.
pub fn parse_recipes_limit(raw: Option<&str>) -> Option<usize> {
    raw.filter(|raw| !raw.is_empty() && raw.bytes().all(|byte| byte.is_ascii_digit()))
        .and_then(|raw| raw.parse().ok())
}

fn record<S: Store + ?Sized>(
    store: &S,
    follower: i32,
    author: User,
    recipes_limit: Option<usize>,
) -> Result<SubscriptionRecord, FoodgramError> {
    let limit = recipes_limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX));
    let recipes = store
        .recipes(&RecipeQuery::by_author(author.id).limit(limit))?
        .iter()
        .map(RecipeShort::from)
        .collect();
    let recipes_count = store.count_recipes_by(author.id)?;

    Ok(SubscriptionRecord {
        author: UserProfile::for_viewer(store, Some(follower), author)?,
        recipes,
        recipes_count,
    })
}

pub fn subscribe<S: Store + ?Sized>(
    store: &S,
    follower: i32,
    author_id: i32,
    recipes_limit: Option<usize>,
) -> Result<SubscriptionRecord, FoodgramError> {
    let span = debug_span!("subscribe", follower, author_id);
    let _guard = span.enter();

    if follower == author_id {
        return Err(FoodgramError::SelfSubscription);
    }

    existing_user(store, follower)?;
    let author = existing_user(store, author_id)?;
    let already_exists = || {
        FoodgramError::AlreadyExists(format!("already subscribed to user {author_id}"))
    };

    if store.subscription_exists(follower, author_id)? {
        return Err(already_exists());
    }

    match store.insert_subscription(follower, author_id) {
        Ok(_) => {}
        Err(StoreError::UniqueViolation(constraint)) => {
            warn!("Lost insert race on {constraint}");
            return Err(already_exists());
        }
        Err(StoreError::CheckViolation(_)) => return Err(FoodgramError::SelfSubscription),
        Err(error) => return Err(error.into()),
    }

    info!("User {follower} subscribed to user {author_id}");
    record(store, follower, author, recipes_limit)
}

pub fn unsubscribe<S: Store + ?Sized>(
    store: &S,
    follower: i32,
    author_id: i32,
) -> Result<(), FoodgramError> {
    if store.delete_subscription(follower, author_id)? == 0 {
        return Err(FoodgramError::NotFound(format!(
            "not subscribed to user {author_id}"
        )));
    }

    info!("User {follower} unsubscribed from user {author_id}");
    Ok(())
}

/// Every author `follower` is subscribed to, oldest subscription first.
pub fn subscriptions<S: Store + ?Sized>(
    store: &S,
    follower: i32,
    recipes_limit: Option<usize>,
) -> Result<Vec<SubscriptionRecord>, FoodgramError> {
    store
        .subscribed_authors(follower)?
        .into_iter()
        .map(|author| record(store, follower, author, recipes_limit))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_recipes_limit;

    #[test]
    fn only_digits_limit_recipes() {
        assert_eq!(parse_recipes_limit(Some("3")), Some(3));
        assert_eq!(parse_recipes_limit(Some("0")), Some(0));
        assert_eq!(parse_recipes_limit(Some("-1")), None);
        assert_eq!(parse_recipes_limit(Some("+2")), None);
        assert_eq!(parse_recipes_limit(Some("two")), None);
        assert_eq!(parse_recipes_limit(Some("")), None);
        assert_eq!(parse_recipes_limit(None), None);
    }
}
