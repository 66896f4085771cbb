pub mod author;
pub mod news;
pub mod newsletter;
pub mod post;
pub mod user;
pub mod visit;
