use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::sea_orm_active_enums::ApplicationStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "j1_applications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Human-readable id shown to staff, e.g. `jane_doe_k3x9v1bq`.
    #[sea_orm(unique)]
    pub application_id: String,

    pub first_name: String,
    pub last_name: String,
    pub full_address: String,
    pub country: String,
    pub phone_number: String,
    pub email_address: String,

    pub profession: String,
    pub other_profession: Option<String>,

    pub confirm_eligibility: String,
    pub terms_and_condition: bool,

    pub resume_url: Option<String>,
    pub passport_url: Option<String>,

    pub status: ApplicationStatus,

    #[schema(value_type = String, format = DateTime)]
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
