use std::{
    collections::{hash_map::Entry, HashMap},
    fs,
    ops::Deref,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use tracing::{info, trace_span};

use crate::{database::models::ingredient::Ingredient, error::FoodgramError, store::Store};

pub const FILE_NAME: &str = "shopping_list.txt";
pub const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Ingredients are summed by name and unit, not by catalog id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IngredientKey {
    pub name: String,
    pub measurement_unit: String,
}

impl From<&Ingredient> for IngredientKey {
    fn from(ingredient: &Ingredient) -> Self {
        Self {
            name: ingredient.name.clone(),
            measurement_unit: ingredient.measurement_unit.clone(),
        }
    }
}

/// Summed amounts, in the order each ingredient was first added.
#[derive(Clone, Default)]
pub struct ShoppingList {
    inner: Vec<(IngredientKey, i64)>,
    positions: HashMap<IngredientKey, usize>,
}

impl ShoppingList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(&mut self, ingredient: &Ingredient, amount: i64) {
        match self.positions.entry(IngredientKey::from(ingredient)) {
            Entry::Occupied(position) => {
                self.inner[*position.get()].1 += amount;
            }
            Entry::Vacant(position) => {
                self.inner.push((position.key().clone(), amount));
                position.insert(self.inner.len() - 1);
            }
        }
    }

    pub fn add_items<'a, I>(&mut self, lines: I)
    where
        I: IntoIterator<Item = &'a (Ingredient, i16)>,
    {
        lines.into_iter().for_each(|(ingredient, amount)| {
            self.add_item(ingredient, i64::from(*amount));
        });
    }

    /// One `"<name> (<unit>) - <amount>"` line per ingredient, no trailing newline.
    pub fn render(&self) -> String {
        self.inner
            .iter()
            .map(|(key, amount)| format!("{} ({}) - {}", key.name, key.measurement_unit, amount))
            .join("\n")
    }

    pub fn into_document(self) -> ShoppingListDocument {
        ShoppingListDocument {
            file_name: FILE_NAME,
            content_type: CONTENT_TYPE,
            content: self.render(),
        }
    }
}

impl Deref for ShoppingList {
    type Target = [(IngredientKey, i64)];

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl std::fmt::Debug for ShoppingList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}

/// The downloadable artifact handed to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListDocument {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub content: String,
}

impl ShoppingListDocument {
    pub fn content_disposition(&self) -> String {
        format!("attachment; filename={}", self.file_name)
    }

    /// Writes the document to `target`, or into it under the suggested file name when
    /// `target` is a directory. Returns the written path.
    pub fn write_to(&self, target: &Path) -> Result<PathBuf, FoodgramError> {
        let path = if target.is_dir() {
            target.join(self.file_name)
        } else {
            target.to_path_buf()
        };

        fs::write(&path, &self.content)?;
        Ok(path)
    }
}

pub fn build_shopping_list<S: Store + ?Sized>(
    store: &S,
    user_id: i32,
) -> Result<ShoppingListDocument, FoodgramError> {
    let span = trace_span!("build shopping list", user_id);
    let _guard = span.enter();

    let lines = store.cart_ingredient_lines(user_id)?;

    let mut list = ShoppingList::new();
    list.add_items(&lines);

    info!(
        "Shopping list of user {user_id}: {} lines from {} recipe lines",
        list.len(),
        lines.len()
    );
    Ok(list.into_document())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ingredient(id: i32, name: &str, unit: &str) -> Ingredient {
        Ingredient {
            id,
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
        }
    }

    #[test]
    fn same_name_and_unit_are_summed() {
        let mut list = ShoppingList::new();
        list.add_items(&[
            (ingredient(1, "Flour", "g"), 200),
            (ingredient(2, "Milk", "ml"), 250),
            (ingredient(1, "Flour", "g"), 300),
        ]);

        assert_eq!(list.render(), "Flour (g) - 500\nMilk (ml) - 250");
    }

    #[test]
    fn grouping_ignores_catalog_id() {
        let mut list = ShoppingList::new();
        list.add_item(&ingredient(1, "Salt", "g"), 5);
        list.add_item(&ingredient(9, "Salt", "g"), 7);
        list.add_item(&ingredient(10, "Salt", "kg"), 1);

        assert_eq!(list.len(), 2);
        assert_eq!(list.render(), "Salt (g) - 12\nSalt (kg) - 1");
    }

    #[test]
    fn first_seen_order_is_kept() {
        let mut list = ShoppingList::new();
        list.add_item(&ingredient(3, "Zucchini", "pcs"), 1);
        list.add_item(&ingredient(1, "Apple", "pcs"), 2);
        list.add_item(&ingredient(3, "Zucchini", "pcs"), 1);

        let names = list.iter().map(|(key, _)| key.name.as_str()).collect_vec();
        assert_eq!(names, ["Zucchini", "Apple"]);
    }

    #[test]
    fn sums_do_not_overflow_small_ints() {
        let mut list = ShoppingList::new();
        list.add_items(&[
            (ingredient(1, "Rice", "g"), i16::MAX),
            (ingredient(1, "Rice", "g"), i16::MAX),
        ]);

        assert_eq!(list[0].1, 2 * i64::from(i16::MAX));
    }

    #[test]
    fn empty_list_renders_empty_document() {
        let document = ShoppingList::new().into_document();

        assert_eq!(document.content, "");
        assert_eq!(document.file_name, "shopping_list.txt");
        assert_eq!(document.content_type, "text/plain; charset=utf-8");
        assert_eq!(
            document.content_disposition(),
            "attachment; filename=shopping_list.txt"
        );
    }
}
