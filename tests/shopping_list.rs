mod common;

use common::seed;
use foodgram::{add_relation, build_shopping_list, remove_relation, RelationKind};

#[test]
fn same_ingredient_across_recipes_is_one_line() {
    let fx = seed();
    let a = fx.recipe(fx.alice, "Bread", &[fx.breakfast], &[(fx.flour_g, 200)]);
    let b = fx.recipe(
        fx.bob,
        "Cake",
        &[fx.dinner],
        &[(fx.flour_g, 300), (fx.sugar_g, 50)],
    );
    add_relation(&fx.store, RelationKind::ShoppingCart, fx.carol, a.id).unwrap();
    add_relation(&fx.store, RelationKind::ShoppingCart, fx.carol, b.id).unwrap();

    let document = build_shopping_list(&fx.store, fx.carol).unwrap();

    assert_eq!(document.content, "Flour (g) - 500\nSugar (g) - 50");
}

#[test]
fn units_are_kept_apart() {
    let fx = seed();
    let a = fx.recipe(fx.alice, "Bread", &[fx.breakfast], &[(fx.flour_g, 200)]);
    let b = fx.recipe(fx.alice, "Big bread", &[fx.breakfast], &[(fx.flour_kg, 2)]);
    add_relation(&fx.store, RelationKind::ShoppingCart, fx.bob, a.id).unwrap();
    add_relation(&fx.store, RelationKind::ShoppingCart, fx.bob, b.id).unwrap();

    let content = build_shopping_list(&fx.store, fx.bob).unwrap().content;

    assert_eq!(content.lines().count(), 2);
    assert!(content.contains("Flour (g) - 200"));
    assert!(content.contains("Flour (kg) - 2"));
}

#[test]
fn empty_cart_gives_empty_document() {
    let fx = seed();
    fx.recipe(fx.alice, "Bread", &[fx.breakfast], &[(fx.flour_g, 200)]);

    let document = build_shopping_list(&fx.store, fx.bob).unwrap();

    assert!(document.content.is_empty());
    assert_eq!(document.file_name, "shopping_list.txt");
    assert_eq!(document.content_type, "text/plain; charset=utf-8");
}

#[test]
fn carts_are_per_user() {
    let fx = seed();
    let recipe = fx.recipe(fx.alice, "Bread", &[fx.breakfast], &[(fx.flour_g, 200)]);
    add_relation(&fx.store, RelationKind::ShoppingCart, fx.bob, recipe.id).unwrap();
    add_relation(&fx.store, RelationKind::Favorite, fx.carol, recipe.id).unwrap();

    assert_eq!(
        build_shopping_list(&fx.store, fx.bob).unwrap().content,
        "Flour (g) - 200"
    );
    assert!(build_shopping_list(&fx.store, fx.carol)
        .unwrap()
        .content
        .is_empty());

    remove_relation(&fx.store, RelationKind::ShoppingCart, fx.bob, recipe.id).unwrap();
    assert!(build_shopping_list(&fx.store, fx.bob)
        .unwrap()
        .content
        .is_empty());
}

#[test]
fn document_is_written_into_a_directory() {
    let fx = seed();
    let recipe = fx.recipe(fx.alice, "Latte", &[fx.breakfast], &[(fx.milk_ml, 250)]);
    add_relation(&fx.store, RelationKind::ShoppingCart, fx.alice, recipe.id).unwrap();
    let document = build_shopping_list(&fx.store, fx.alice).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = document.write_to(dir.path()).unwrap();

    assert_eq!(path, dir.path().join("shopping_list.txt"));
    assert_eq!(std::fs::read_to_string(path).unwrap(), "Milk (ml) - 250");
}

#[test]
fn document_is_written_to_an_explicit_file() {
    let fx = seed();
    let document = build_shopping_list(&fx.store, fx.alice).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("cart.txt");
    let path = document.write_to(&target).unwrap();

    assert_eq!(path, target);
    assert_eq!(std::fs::read_to_string(path).unwrap(), "");
}
