pub mod prelude;

pub mod category;
pub mod j1_application;
pub mod post;
pub mod sea_orm_active_enums;
pub mod user;
