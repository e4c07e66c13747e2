pub use super::category::Entity as Category;
pub use super::j1_application::Entity as J1Application;
pub use super::post::Entity as Post;
pub use super::user::Entity as User;
