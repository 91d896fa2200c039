// Presentation layer - HTTP surface over the display state
pub mod app_state;
pub mod handlers;
