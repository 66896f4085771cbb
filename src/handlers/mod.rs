pub mod health_handlers;
pub mod news_handlers;
pub mod newsletter_handlers;
pub mod post_handlers;
pub mod user_handlers;
pub mod visit_handlers;
