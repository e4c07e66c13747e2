use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::Role;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub username: String,

    #[sea_orm(unique)]
    pub email: String,

    pub password: String,
    pub email_verified: bool,
    pub role: Role,
    pub is_allowed_dashboard: bool,

    /// True while a mailed temporary password is the active credential.
    /// Cleared on the next successful password reset.
    pub is_temporary_password: bool,

    pub reset_token: Option<String>,
    pub reset_token_expires: Option<DateTimeWithTimeZone>,
    pub reset_attempts: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
