use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Raw image bytes.
    pub data: Vec<u8>,
    pub mime_type: String,

    pub hero_id: i32,
    #[sea_orm(belongs_to, from = "hero_id", to = "id", on_delete = "Cascade")]
    pub hero: HasOne<super::hero::Entity>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
