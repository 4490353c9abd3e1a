// Presentation layer - HTTP view-model host
pub mod app_state;
pub mod handlers;
pub mod router;
