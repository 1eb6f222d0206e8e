pub mod hero;
pub mod image;
