use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "conversations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub contact_address: String,
    pub customer_name: Option<String>,
    /// `ACTIVE` or `CLOSED`.
    pub status: String,
    /// Language code, `en` or `sw`.
    pub language: String,
    /// Conversation context document as JSON.
    #[sea_orm(column_type = "Text")]
    pub context: String,
    pub last_message_at: DateTime,
    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
