use axum::body::Bytes;
use axum_typed_multipart::{FieldData, TryFromMultipart};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::UploadConfig;
use crate::entity::{hero, image};
use crate::error::AppError;

/// Number of heroes per listing page.
pub const PAGE_SIZE: u64 = 5;

/// Row offset of a 1-based page, or `None` when the offset cannot be
/// expressed as a signed 64-bit SQL bound.
pub fn page_offset(page: u64) -> Option<u64> {
    page.checked_sub(1)
        .and_then(|p| p.checked_mul(PAGE_SIZE))
        .filter(|offset| *offset <= i64::MAX as u64)
}

/// Number of pages needed to list `total` heroes.
pub fn page_count(total: u64) -> u64 {
    total.div_ceil(PAGE_SIZE)
}

/// Encode raw image bytes as a `data:` URI for direct embedding.
pub fn data_uri(mime_type: &str, data: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", STANDARD.encode(data))
}

/// Validated fields of a hero to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHero {
    pub nickname: String,
    pub real_name: String,
    pub origin_description: String,
    pub superpowers: Vec<String>,
    pub catch_phrase: String,
}

/// Partial update of a hero.
///
/// `None` leaves the stored value untouched. `delete_images_ids` only ever
/// removes images owned by the hero being updated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeroPatch {
    pub nickname: Option<String>,
    pub real_name: Option<String>,
    pub origin_description: Option<String>,
    pub superpowers: Option<Vec<String>>,
    pub catch_phrase: Option<String>,
    pub delete_images_ids: Vec<i32>,
}

impl HeroPatch {
    /// True when no scalar field is present.
    pub fn has_no_fields(&self) -> bool {
        self.nickname.is_none()
            && self.real_name.is_none()
            && self.origin_description.is_none()
            && self.superpowers.is_none()
            && self.catch_phrase.is_none()
    }
}

/// An uploaded image on its way into storage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub data: Vec<u8>,
    pub mime_type: String,
    /// Original upload filename, used in error messages.
    pub file_name: Option<String>,
}

impl NewImage {
    /// Label used when reporting problems with this upload.
    pub fn label(&self, index: usize) -> String {
        match &self.file_name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => format!("image #{}", index + 1),
        }
    }
}

impl From<FieldData<Bytes>> for NewImage {
    fn from(field: FieldData<Bytes>) -> Self {
        Self {
            data: field.contents.to_vec(),
            mime_type: field
                .metadata
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            file_name: field.metadata.file_name,
        }
    }
}

#[derive(TryFromMultipart)]
pub struct CreateHeroForm {
    pub nickname: String,
    pub real_name: String,
    pub origin_description: String,
    /// Repeated field, one entry per superpower.
    pub superpowers: Vec<String>,
    pub catch_phrase: String,
    #[form_data(limit = "unlimited")]
    pub images: Vec<FieldData<Bytes>>,
}

#[derive(TryFromMultipart)]
pub struct UpdateHeroForm {
    pub nickname: Option<String>,
    pub real_name: Option<String>,
    pub origin_description: Option<String>,
    /// Replaces the whole list when at least one entry is sent.
    pub superpowers: Vec<String>,
    pub catch_phrase: Option<String>,
    #[form_data(field_name = "deleteImagesIds")]
    pub delete_images_ids: Vec<i32>,
    #[form_data(field_name = "newImages", limit = "unlimited")]
    pub new_images: Vec<FieldData<Bytes>>,
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HeroListQuery {
    /// 1-based page number. Omit to list every hero.
    pub page: Option<String>,
}

/// Image metadata returned on creation.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ImageSummary {
    #[schema(example = 1)]
    pub id: i32,
    #[serde(rename = "mimeType")]
    #[schema(example = "image/png")]
    pub mime_type: String,
}

/// Image with its raw bytes, as returned by update and delete.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct RawImage {
    pub id: i32,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub data: Vec<u8>,
    pub hero_id: i32,
}

/// Image with its bytes encoded as a `data:` URI, as returned by reads.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct EncodedImage {
    pub id: i32,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// `data:<mimeType>;base64,<payload>`
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    pub data: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HeroResponse<I> {
    #[schema(example = 1)]
    pub id: i32,
    #[schema(example = "Nyx")]
    pub nickname: String,
    #[schema(example = "Jane Doe")]
    pub real_name: String,
    pub origin_description: String,
    pub superpowers: Vec<String>,
    pub catch_phrase: String,
    pub images: Vec<I>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<I> HeroResponse<I> {
    pub fn new(m: hero::Model, images: Vec<I>) -> Self {
        Self {
            id: m.id,
            nickname: m.nickname,
            real_name: m.real_name,
            origin_description: m.origin_description,
            superpowers: m.superpowers.0,
            catch_phrase: m.catch_phrase,
            images,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<image::Model> for ImageSummary {
    fn from(m: image::Model) -> Self {
        Self {
            id: m.id,
            mime_type: m.mime_type,
        }
    }
}

impl From<image::Model> for RawImage {
    fn from(m: image::Model) -> Self {
        Self {
            id: m.id,
            mime_type: m.mime_type,
            data: m.data,
            hero_id: m.hero_id,
        }
    }
}

impl From<image::Model> for EncodedImage {
    fn from(m: image::Model) -> Self {
        Self {
            id: m.id,
            data: data_uri(&m.mime_type, &m.data),
            mime_type: m.mime_type,
        }
    }
}

/// Parse the `page` query parameter.
///
/// An empty value counts as absent; anything else must be a positive integer.
pub fn parse_page(raw: Option<&str>) -> Result<Option<u64>, AppError> {
    let raw = match raw.map(str::trim) {
        None | Some("") => return Ok(None),
        Some(raw) => raw,
    };
    match raw.parse::<u64>() {
        Ok(page) if page >= 1 => Ok(Some(page)),
        _ => Err(AppError::Validation(
            "Page should be a positive integer".into(),
        )),
    }
}

fn required_text(value: String, field: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn optional_text(value: Option<String>, field: &str) -> Result<Option<String>, AppError> {
    value.map(|v| required_text(v, field)).transpose()
}

fn superpower_list(values: Vec<String>) -> Result<Vec<String>, AppError> {
    if values.is_empty() {
        return Err(AppError::Validation(
            "superpowers must contain at least one entry".into(),
        ));
    }
    values
        .into_iter()
        .map(|v| required_text(v, "superpowers entry"))
        .collect()
}

pub fn validate_create_hero(
    form: CreateHeroForm,
) -> Result<(NewHero, Vec<FieldData<Bytes>>), AppError> {
    let hero = NewHero {
        nickname: required_text(form.nickname, "nickname")?,
        real_name: required_text(form.real_name, "real_name")?,
        origin_description: required_text(form.origin_description, "origin_description")?,
        superpowers: superpower_list(form.superpowers)?,
        catch_phrase: required_text(form.catch_phrase, "catch_phrase")?,
    };
    Ok((hero, form.images))
}

pub fn validate_update_hero(
    form: UpdateHeroForm,
) -> Result<(HeroPatch, Vec<FieldData<Bytes>>), AppError> {
    let superpowers = if form.superpowers.is_empty() {
        None
    } else {
        Some(superpower_list(form.superpowers)?)
    };
    let patch = HeroPatch {
        nickname: optional_text(form.nickname, "nickname")?,
        real_name: optional_text(form.real_name, "real_name")?,
        origin_description: optional_text(form.origin_description, "origin_description")?,
        superpowers,
        catch_phrase: optional_text(form.catch_phrase, "catch_phrase")?,
        delete_images_ids: form.delete_images_ids,
    };
    Ok((patch, form.new_images))
}

/// Check uploaded images against the configured count, type and size limits.
pub fn validate_images(images: &[NewImage], limits: &UploadConfig) -> Result<(), AppError> {
    if images.len() > limits.max_files {
        return Err(AppError::Validation(format!(
            "Too many images: max {}",
            limits.max_files
        )));
    }
    for (index, img) in images.iter().enumerate() {
        if !limits
            .allowed_mime_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&img.mime_type))
        {
            return Err(AppError::Validation(format!(
                "Only image files are allowed: {} has type {}",
                img.label(index),
                img.mime_type
            )));
        }
        if img.data.len() > limits.max_file_size {
            return Err(AppError::Validation(format!(
                "{} exceeds maximum size of {} bytes",
                img.label(index),
                limits.max_file_size
            )));
        }
    }
    Ok(())
}
