// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod display_state;
pub mod influx_repository;
