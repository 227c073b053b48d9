pub mod images;
pub mod menus;
pub mod recipes;
pub mod tokens;
