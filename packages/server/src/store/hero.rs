use std::collections::HashMap;

use chrono::Utc;
use sea_orm::prelude::Expr;
use sea_orm::sea_query::{Func, Query as SeaQuery};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionSession, TransactionTrait,
};
use tracing::debug;

use super::StoreError;
use crate::entity::hero::{self, Superpowers};
use crate::entity::image;
use crate::models::hero::{HeroPatch, NewHero, NewImage};

/// A hero row together with the image rows it owns, in id order.
#[derive(Debug, Clone, PartialEq)]
pub struct HeroWithImages {
    pub hero: hero::Model,
    pub images: Vec<image::Model>,
}

/// Durable storage for heroes and their images.
///
/// Multi-row writes run inside a single transaction and either commit
/// together or not at all. The gateway applies no business rules.
pub struct HeroStore<'a, C: ConnectionTrait + TransactionTrait> {
    conn: &'a C,
}

impl<'a, C: ConnectionTrait + TransactionTrait> HeroStore<'a, C> {
    pub fn new(conn: &'a C) -> Self {
        Self { conn }
    }

    /// List heroes in id order, each carrying at most its first image.
    ///
    /// `None` for `skip`/`take` means no offset / no limit.
    pub async fn find_heroes(
        &self,
        skip: Option<u64>,
        take: Option<u64>,
    ) -> Result<Vec<HeroWithImages>, StoreError> {
        let heroes = hero::Entity::find()
            .order_by_asc(hero::Column::Id)
            .offset(skip)
            .limit(take)
            .all(self.conn)
            .await?;

        if heroes.is_empty() {
            return Ok(Vec::new());
        }

        let paged = skip.is_some() || take.is_some();
        let ids: Vec<i32> = heroes.iter().map(|h| h.id).collect();
        let mut covers = self.cover_images(paged.then_some(ids.as_slice())).await?;

        Ok(heroes
            .into_iter()
            .map(|hero| {
                let images = covers.remove(&hero.id).into_iter().collect();
                HeroWithImages { hero, images }
            })
            .collect())
    }

    /// Lowest-id image of each hero, keyed by hero id.
    async fn cover_images(
        &self,
        hero_ids: Option<&[i32]>,
    ) -> Result<HashMap<i32, image::Model>, StoreError> {
        let mut first_ids = SeaQuery::select();
        first_ids
            .expr(Func::min(Expr::col(image::Column::Id)))
            .from(image::Entity)
            .group_by_col(image::Column::HeroId);
        if let Some(ids) = hero_ids {
            first_ids.and_where(image::Column::HeroId.is_in(ids.iter().copied()));
        }

        let covers = image::Entity::find()
            .filter(image::Column::Id.in_subquery(first_ids))
            .all(self.conn)
            .await?;

        Ok(covers.into_iter().map(|img| (img.hero_id, img)).collect())
    }

    /// Fetch one hero with all of its images.
    pub async fn find_hero(&self, id: i32) -> Result<Option<HeroWithImages>, StoreError> {
        let Some(hero) = self.find_hero_row(id).await? else {
            return Ok(None);
        };
        let images = load_images(self.conn, id).await?;
        Ok(Some(HeroWithImages { hero, images }))
    }

    /// Fetch the hero row alone.
    pub async fn find_hero_row(&self, id: i32) -> Result<Option<hero::Model>, StoreError> {
        Ok(hero::Entity::find_by_id(id).one(self.conn).await?)
    }

    /// Find any hero whose nickname or real name equals either given value.
    pub async fn find_hero_by_nickname_or_real_name(
        &self,
        nickname: &str,
        real_name: &str,
    ) -> Result<Option<hero::Model>, StoreError> {
        let names = [nickname, real_name];
        Ok(hero::Entity::find()
            .filter(
                Condition::any()
                    .add(hero::Column::Nickname.is_in(names))
                    .add(hero::Column::RealName.is_in(names)),
            )
            .one(self.conn)
            .await?)
    }

    /// Insert a hero and all of its images atomically.
    pub async fn create_hero(
        &self,
        fields: NewHero,
        images: Vec<NewImage>,
    ) -> Result<HeroWithImages, StoreError> {
        let txn = self.conn.begin().await?;

        let now = Utc::now();
        let hero = hero::ActiveModel {
            nickname: Set(fields.nickname),
            real_name: Set(fields.real_name),
            origin_description: Set(fields.origin_description),
            superpowers: Set(Superpowers(fields.superpowers)),
            catch_phrase: Set(fields.catch_phrase),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        insert_images(&txn, hero.id, images).await?;
        let images = load_images(&txn, hero.id).await?;

        txn.commit().await?;
        Ok(HeroWithImages { hero, images })
    }

    /// Apply a patch, drop the listed images owned by this hero, attach new
    /// images and re-read the result, all in one transaction.
    pub async fn update_hero(
        &self,
        id: i32,
        patch: &HeroPatch,
        new_images: Vec<NewImage>,
    ) -> Result<HeroWithImages, StoreError> {
        let txn = self.conn.begin().await?;

        let existing = hero::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Hero {id} not found")))?;

        let mut active: hero::ActiveModel = existing.into();
        if let Some(ref nickname) = patch.nickname {
            active.nickname = Set(nickname.clone());
        }
        if let Some(ref real_name) = patch.real_name {
            active.real_name = Set(real_name.clone());
        }
        if let Some(ref origin) = patch.origin_description {
            active.origin_description = Set(origin.clone());
        }
        if let Some(ref superpowers) = patch.superpowers {
            active.superpowers = Set(Superpowers(superpowers.clone()));
        }
        if let Some(ref catch_phrase) = patch.catch_phrase {
            active.catch_phrase = Set(catch_phrase.clone());
        }
        active.updated_at = Set(Utc::now());
        let hero = active.update(&txn).await?;

        if !patch.delete_images_ids.is_empty() {
            let deleted = image::Entity::delete_many()
                .filter(image::Column::Id.is_in(patch.delete_images_ids.iter().copied()))
                .filter(image::Column::HeroId.eq(id))
                .exec(&txn)
                .await?;
            debug!(
                hero_id = id,
                requested = patch.delete_images_ids.len(),
                deleted = deleted.rows_affected,
                "Removed hero images"
            );
        }

        insert_images(&txn, id, new_images).await?;
        let images = load_images(&txn, id).await?;

        txn.commit().await?;
        Ok(HeroWithImages { hero, images })
    }

    /// Delete a hero and every image it owns.
    pub async fn delete_hero(&self, id: i32) -> Result<HeroWithImages, StoreError> {
        let txn = self.conn.begin().await?;

        let hero = hero::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Hero {id} not found")))?;
        let images = load_images(&txn, id).await?;

        image::Entity::delete_many()
            .filter(image::Column::HeroId.eq(id))
            .exec(&txn)
            .await?;
        hero::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        Ok(HeroWithImages { hero, images })
    }

    pub async fn count_heroes(&self) -> Result<u64, StoreError> {
        Ok(hero::Entity::find().count(self.conn).await?)
    }
}

async fn load_images<C: ConnectionTrait>(
    conn: &C,
    hero_id: i32,
) -> Result<Vec<image::Model>, StoreError> {
    Ok(image::Entity::find()
        .filter(image::Column::HeroId.eq(hero_id))
        .order_by_asc(image::Column::Id)
        .all(conn)
        .await?)
}

async fn insert_images<T: ConnectionTrait>(
    txn: &T,
    hero_id: i32,
    images: Vec<NewImage>,
) -> Result<(), StoreError> {
    if images.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let rows = images.into_iter().map(|img| image::ActiveModel {
        data: Set(img.data),
        mime_type: Set(img.mime_type),
        hero_id: Set(hero_id),
        created_at: Set(now),
        ..Default::default()
    });
    image::Entity::insert_many(rows).exec(txn).await?;

    Ok(())
}
