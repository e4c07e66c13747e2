pub mod application;
pub mod category;
pub mod dashboard;
pub mod otp;
pub mod password;
pub mod post;
pub mod user;
