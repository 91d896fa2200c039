// Application state for HTTP handlers
use crate::domain::zone::Zone;
use crate::infrastructure::display_state::DisplayState;

#[derive(Clone)]
pub struct AppState {
    pub zones: Vec<Zone>,
    pub display: DisplayState,
}

impl AppState {
    pub fn zone(&self, id: &str) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id == id)
    }
}
