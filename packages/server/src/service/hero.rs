use sea_orm::{ConnectionTrait, TransactionTrait};
use tracing::{info, warn};

use crate::entity::image;
use crate::error::AppError;
use crate::models::hero::{
    EncodedImage, HeroPatch, HeroResponse, ImageSummary, NewHero, NewImage, PAGE_SIZE, RawImage,
    page_count, page_offset,
};
use crate::store::{HeroStore, HeroWithImages};

/// Hero lifecycle rules on top of [`HeroStore`].
///
/// Enforces nickname / real name uniqueness on create, existence checks on
/// update and delete, and the attachment consistency of updates. Holds no
/// state between calls.
pub struct HeroService<'a, C: ConnectionTrait + TransactionTrait> {
    store: HeroStore<'a, C>,
}

impl<'a, C: ConnectionTrait + TransactionTrait> HeroService<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self {
            store: HeroStore::new(conn),
        }
    }

    /// Create a hero with its images.
    ///
    /// The uniqueness lookup and the insert are separate storage calls; a
    /// concurrent create that slips between them is rejected by the unique
    /// constraints and reported as a conflict as well.
    pub async fn create(
        &self,
        hero: NewHero,
        images: Vec<NewImage>,
    ) -> Result<HeroResponse<ImageSummary>, AppError> {
        if let Some(existing) = self
            .store
            .find_hero_by_nickname_or_real_name(&hero.nickname, &hero.real_name)
            .await?
        {
            warn!(
                existing_id = existing.id,
                nickname = %hero.nickname,
                "Rejected hero with duplicate identity"
            );
            return Err(AppError::Conflict(
                "A hero with this nickname or real name already exists".into(),
            ));
        }

        let created = self.store.create_hero(hero, images).await?;
        info!(
            hero_id = created.hero.id,
            images = created.images.len(),
            "Created hero"
        );

        Ok(into_response(created))
    }

    /// List heroes with their cover image encoded as a `data:` URI.
    ///
    /// Without a page every hero is returned. A page past the last hero is
    /// reported as not found rather than as an empty list.
    pub async fn get_all(
        &self,
        page: Option<u64>,
    ) -> Result<Vec<HeroResponse<EncodedImage>>, AppError> {
        let heroes = match page {
            None => self.store.find_heroes(None, None).await?,
            Some(page) => {
                let Some(offset) = page_offset(page) else {
                    warn!(page, "Requested page is beyond any storable offset");
                    return Err(AppError::NotFound(format!("Page {page} not found")));
                };
                let heroes = self
                    .store
                    .find_heroes(Some(offset), Some(PAGE_SIZE))
                    .await?;
                if heroes.is_empty() {
                    warn!(page, "Requested page is past the last hero");
                    return Err(AppError::NotFound(format!("Page {page} not found")));
                }
                heroes
            }
        };

        Ok(heroes.into_iter().map(into_response).collect())
    }

    /// Fetch one hero with every image encoded as a `data:` URI.
    pub async fn get_one(&self, id: i32) -> Result<HeroResponse<EncodedImage>, AppError> {
        let hero = self
            .store
            .find_hero(id)
            .await?
            .ok_or_else(|| hero_not_found(id))?;
        Ok(into_response(hero))
    }

    /// Partially update a hero and its images in one transaction.
    ///
    /// Image ids in the patch that belong to another hero are ignored. The
    /// returned images carry their raw bytes.
    pub async fn update(
        &self,
        id: i32,
        patch: HeroPatch,
        new_images: Vec<NewImage>,
    ) -> Result<HeroResponse<RawImage>, AppError> {
        if self.store.find_hero_row(id).await?.is_none() {
            return Err(hero_not_found(id));
        }

        if let Some((index, empty)) = new_images
            .iter()
            .enumerate()
            .find(|(_, img)| img.data.is_empty())
        {
            let label = empty.label(index);
            warn!(hero_id = id, image = %label, "Rejected image without data");
            return Err(AppError::Validation(format!(
                "{label} does not contain any data"
            )));
        }

        let updated = self.store.update_hero(id, &patch, new_images).await?;
        info!(
            hero_id = id,
            fields_changed = !patch.has_no_fields(),
            images = updated.images.len(),
            "Updated hero"
        );

        Ok(into_response(updated))
    }

    /// Delete a hero together with all of its images.
    ///
    /// Returns the hero as it was just before deletion.
    pub async fn delete(&self, id: i32) -> Result<HeroResponse<RawImage>, AppError> {
        if self.store.find_hero_row(id).await?.is_none() {
            return Err(hero_not_found(id));
        }

        let deleted = self.store.delete_hero(id).await?;
        info!(hero_id = id, images = deleted.images.len(), "Deleted hero");

        Ok(into_response(deleted))
    }

    /// Number of pages available at the fixed page size.
    pub async fn get_pages(&self) -> Result<u64, AppError> {
        let total = self.store.count_heroes().await?;
        Ok(page_count(total))
    }
}

fn hero_not_found(id: i32) -> AppError {
    warn!(hero_id = id, "Hero not found");
    AppError::NotFound(format!("Hero {id} not found"))
}

fn into_response<I: From<image::Model>>(record: HeroWithImages) -> HeroResponse<I> {
    let images = record.images.into_iter().map(I::from).collect();
    HeroResponse::new(record.hero, images)
}
