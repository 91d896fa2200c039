// In-memory display state shared with the HTTP handlers
use crate::application::display::{DisplaySink, ZoneView};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    views: Arc<RwLock<HashMap<String, ZoneView>>>,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last complete view rendered for the zone, if any cycle succeeded.
    pub fn view(&self, zone_id: &str) -> Option<ZoneView> {
        self.views.read().get(zone_id).cloned()
    }
}

impl DisplaySink for DisplayState {
    fn show(&self, zone_id: &str, view: ZoneView) {
        self.views.write().insert(zone_id.to_string(), view);
    }
}
