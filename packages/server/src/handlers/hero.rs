use axum::Json;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::config::UploadConfig;
use crate::error::{AppError, ErrorBody};
use crate::extractors::multipart::AppMultipart;
use crate::extractors::path::AppPath;
use crate::models::hero::*;
use crate::service::HeroService;
use crate::state::AppState;

pub fn hero_body_limit(upload: &UploadConfig) -> DefaultBodyLimit {
    DefaultBodyLimit::max(upload.body_limit())
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Heroes",
    operation_id = "createHero",
    summary = "Create a new hero",
    description = "Creates a hero with up to 10 JPEG/PNG images (5 MB each). `superpowers` and \
        `images` are repeated multipart fields. Returns 409 CONFLICT when the nickname or real \
        name is already used by another hero, as either its nickname or its real name.",
    request_body(content_type = "multipart/form-data", description = "Hero fields and images"),
    responses(
        (status = 201, description = "Hero created", body = HeroResponse<ImageSummary>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Nickname or real name taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, form))]
pub async fn create_hero(
    State(state): State<AppState>,
    AppMultipart(form): AppMultipart<CreateHeroForm>,
) -> Result<impl IntoResponse, AppError> {
    let (hero, files) = validate_create_hero(form)?;
    let images: Vec<NewImage> = files.into_iter().map(NewImage::from).collect();
    validate_images(&images, &state.config.upload)?;

    let created = HeroService::new(&state.db).create(hero, images).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Heroes",
    operation_id = "listHeroes",
    summary = "List heroes",
    description = "Without `page`, returns every hero. With `page`, returns that 5-hero page \
        in creation order, or 404 when the page is past the last hero. Each hero carries only \
        its first image, encoded as a `data:` URI.",
    params(HeroListQuery),
    responses(
        (status = 200, description = "List of heroes", body = [HeroResponse<EncodedImage>]),
        (status = 400, description = "Invalid page (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Page out of range (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, query))]
pub async fn list_heroes(
    State(state): State<AppState>,
    Query(query): Query<HeroListQuery>,
) -> Result<Json<Vec<HeroResponse<EncodedImage>>>, AppError> {
    let page = parse_page(query.page.as_deref())?;

    let heroes = HeroService::new(&state.db).get_all(page).await?;
    Ok(Json(heroes))
}

#[utoipa::path(
    get,
    path = "/pages",
    tag = "Heroes",
    operation_id = "countHeroPages",
    summary = "Number of hero pages",
    description = "Returns how many 5-hero pages exist.",
    responses(
        (status = 200, description = "Page count", body = u64),
    ),
)]
#[instrument(skip(state))]
pub async fn count_pages(State(state): State<AppState>) -> Result<Json<u64>, AppError> {
    let pages = HeroService::new(&state.db).get_pages().await?;
    Ok(Json(pages))
}

#[utoipa::path(
    get,
    path = "/{id}",
    tag = "Heroes",
    operation_id = "getHero",
    summary = "Get a hero by ID",
    description = "Returns the hero with every image encoded as a `data:` URI.",
    params(("id" = i32, Path, description = "Hero ID")),
    responses(
        (status = 200, description = "Hero details", body = HeroResponse<EncodedImage>),
        (status = 400, description = "Malformed hero ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Hero not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn get_hero(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<HeroResponse<EncodedImage>>, AppError> {
    let hero = HeroService::new(&state.db).get_one(id).await?;
    Ok(Json(hero))
}

#[utoipa::path(
    patch,
    path = "/{id}",
    tag = "Heroes",
    operation_id = "updateHero",
    summary = "Update a hero",
    description = "Partially updates a hero. Only provided fields are modified; `superpowers` \
        replaces the list when sent. `deleteImagesIds` removes images owned by this hero and \
        ignores any other id. `newImages` attaches new images. Everything is applied in one \
        transaction. Images in the response carry their raw bytes.",
    params(("id" = i32, Path, description = "Hero ID")),
    request_body(content_type = "multipart/form-data", description = "Changed fields and images"),
    responses(
        (status = 200, description = "Hero updated", body = HeroResponse<RawImage>),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Hero not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Nickname or real name taken (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, form), fields(id))]
pub async fn update_hero(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppMultipart(form): AppMultipart<UpdateHeroForm>,
) -> Result<Json<HeroResponse<RawImage>>, AppError> {
    let (patch, files) = validate_update_hero(form)?;
    let images: Vec<NewImage> = files.into_iter().map(NewImage::from).collect();
    validate_images(&images, &state.config.upload)?;

    let hero = HeroService::new(&state.db).update(id, patch, images).await?;
    Ok(Json(hero))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Heroes",
    operation_id = "deleteHero",
    summary = "Delete a hero",
    description = "Permanently deletes a hero and all of its images. Returns the deleted hero.",
    params(("id" = i32, Path, description = "Hero ID")),
    responses(
        (status = 200, description = "Hero deleted", body = HeroResponse<RawImage>),
        (status = 400, description = "Malformed hero ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Hero not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn delete_hero(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> Result<Json<HeroResponse<RawImage>>, AppError> {
    let hero = HeroService::new(&state.db).delete(id).await?;
    Ok(Json(hero))
}
