mod common;

use common::seed;
use foodgram::{
    parse_recipes_limit, subscribe, subscriptions, unsubscribe, FoodgramError, Store,
};

#[test]
fn self_subscription_always_fails() {
    let fx = seed();

    let error = subscribe(&fx.store, fx.alice, fx.alice, None).unwrap_err();
    assert!(matches!(error, FoodgramError::SelfSubscription));

    subscribe(&fx.store, fx.alice, fx.bob, None).unwrap();
    let error = subscribe(&fx.store, fx.alice, fx.alice, None).unwrap_err();
    assert!(matches!(error, FoodgramError::SelfSubscription));
    assert!(!fx.store.subscription_exists(fx.alice, fx.alice).unwrap());
}

#[test]
fn duplicate_subscription_fails() {
    let fx = seed();
    subscribe(&fx.store, fx.bob, fx.alice, None).unwrap();

    let error = subscribe(&fx.store, fx.bob, fx.alice, None).unwrap_err();
    assert!(matches!(error, FoodgramError::AlreadyExists(_)));
}

#[test]
fn recipes_count_ignores_limit() {
    let fx = seed();
    for name in ["Bread", "Cake", "Pie"] {
        fx.recipe(fx.alice, name, &[fx.breakfast], &[(fx.flour_g, 100)]);
    }

    let record = subscribe(&fx.store, fx.bob, fx.alice, parse_recipes_limit(Some("2"))).unwrap();

    assert_eq!(record.recipes.len(), 2);
    assert_eq!(record.recipes_count, 3);
    assert_eq!(record.author.id, fx.alice);
    assert!(record.author.is_subscribed);
    assert_eq!(record.recipes[0].name, "Pie");
}

#[test]
fn malformed_limit_means_unlimited() {
    let fx = seed();
    for name in ["Bread", "Cake", "Pie"] {
        fx.recipe(fx.alice, name, &[fx.breakfast], &[(fx.flour_g, 100)]);
    }
    subscribe(&fx.store, fx.bob, fx.alice, None).unwrap();

    let records = subscriptions(&fx.store, fx.bob, parse_recipes_limit(Some("many"))).unwrap();
    assert_eq!(records[0].recipes.len(), 3);

    let records = subscriptions(&fx.store, fx.bob, parse_recipes_limit(Some("0"))).unwrap();
    assert!(records[0].recipes.is_empty());
    assert_eq!(records[0].recipes_count, 3);
}

#[test]
fn subscriptions_are_listed_oldest_first() {
    let fx = seed();
    subscribe(&fx.store, fx.alice, fx.carol, None).unwrap();
    subscribe(&fx.store, fx.alice, fx.bob, None).unwrap();

    let authors = subscriptions(&fx.store, fx.alice, None)
        .unwrap()
        .into_iter()
        .map(|record| record.author.username)
        .collect::<Vec<_>>();

    assert_eq!(authors, ["carol", "bob"]);
}

#[test]
fn unsubscribe_requires_subscription() {
    let fx = seed();

    let error = unsubscribe(&fx.store, fx.bob, fx.alice).unwrap_err();
    assert!(matches!(error, FoodgramError::NotFound(_)));

    subscribe(&fx.store, fx.bob, fx.alice, None).unwrap();
    unsubscribe(&fx.store, fx.bob, fx.alice).unwrap();
    assert!(subscriptions(&fx.store, fx.bob, None).unwrap().is_empty());
}

#[test]
fn unknown_author_is_not_found() {
    let fx = seed();

    let error = subscribe(&fx.store, fx.bob, 5_150, None).unwrap_err();
    assert_eq!(error.status_code(), 404);
}

#[test]
fn record_flattens_the_author_profile() {
    let fx = seed();
    let record = subscribe(&fx.store, fx.bob, fx.alice, None).unwrap();

    let json = serde_json::to_value(record).unwrap();
    assert_eq!(json["username"], "alice");
    assert_eq!(json["is_subscribed"], true);
    assert_eq!(json["recipes_count"], 0);
    assert!(json.get("author").is_none());
}

#[test]
fn unknown_follower_is_not_found() {
    let fx = seed();

    let error = subscribe(&fx.store, 6_060, fx.alice, None).unwrap_err();

    assert!(matches!(
        error,
        FoodgramError::UnknownEntity {
            entity: "user",
            id: 6_060
        }
    ));
    assert!(subscriptions(&fx.store, 6_060, None).unwrap().is_empty());
}
