use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::UploadConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(upload: &UploadConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest("/superhero", hero_routes(upload))
}

fn hero_routes(upload: &UploadConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::hero::list_heroes,
            handlers::hero::create_hero
        ))
        .routes(routes!(handlers::hero::count_pages))
        .routes(routes!(
            handlers::hero::get_hero,
            handlers::hero::update_hero,
            handlers::hero::delete_hero
        ))
        .layer(handlers::hero::hero_body_limit(upload))
}
