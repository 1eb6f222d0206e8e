mod error;
mod hero;

pub use error::StoreError;
pub use hero::{HeroStore, HeroWithImages};
