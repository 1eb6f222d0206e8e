use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ordered list of superpowers, stored as a JSON array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Superpowers(pub Vec<String>);

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "hero")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub nickname: String,
    #[sea_orm(unique)]
    pub real_name: String,
    #[sea_orm(column_type = "Text")]
    pub origin_description: String,
    #[sea_orm(column_type = "JsonBinary")]
    pub superpowers: Superpowers,
    pub catch_phrase: String,

    #[sea_orm(has_many)]
    pub images: HasMany<super::image::Entity>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
