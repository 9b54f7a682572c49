pub mod composer;
pub mod link;
pub mod reader;

pub use composer::{IngredientAmount, RecipeComposer, RecipeFields, RecipePatch};
pub use link::{recipe_short_link, short_link, ShortLink};
pub use reader::{list_recipes, recipe_detail, RecipeDetail, RecipeFilter};
