// Domain layer - Readings, series and watermarks
pub mod reading;
pub mod snapshot;
pub mod watermark;
pub mod zone;
