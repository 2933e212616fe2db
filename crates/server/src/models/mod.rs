pub mod rating;
pub mod resource;
pub mod user;
