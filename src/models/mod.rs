pub mod image;
pub mod menu;
pub mod recipe;
pub mod token;
