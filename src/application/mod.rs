// Application layer - Use cases over the reading repository
pub mod aggregator;
pub mod display;
pub mod poll_controller;
pub mod reading_repository;
