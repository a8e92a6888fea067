use crate::library::models::Track;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    /// No session
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Published transport state, what the presentation layer renders from
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransportSnapshot {
    pub state: PlayerState,
    pub current_index: Option<usize>,
    pub current_track: Option<Track>,
    pub output_level: f32,
    pub playlist_len: usize,
}

impl TransportSnapshot {
    pub fn is_playing(&self) -> bool {
        self.state == PlayerState::Playing
    }
}
