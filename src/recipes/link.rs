use serde::Serialize;

use crate::{error::FoodgramError, relations::existing_recipe, store::Store};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortLink {
    #[serde(rename = "short-link")]
    pub short_link: String,
}

pub fn short_link(domain: &str, recipe_id: i32) -> String {
    format!("{}/recipes/{recipe_id}", domain.trim_end_matches('/'))
}

pub fn recipe_short_link<S: Store + ?Sized>(
    store: &S,
    domain: &str,
    recipe_id: i32,
) -> Result<ShortLink, FoodgramError> {
    let recipe = existing_recipe(store, recipe_id)?;

    Ok(ShortLink {
        short_link: short_link(domain, recipe.id),
    })
}
