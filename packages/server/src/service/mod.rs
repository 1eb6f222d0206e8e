mod hero;

pub use hero::HeroService;
