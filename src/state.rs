use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::audio::playback::PlaybackEngine;
use crate::audio::DecodedAudio;
use crate::auth::User;
use crate::synth::{TtsMode, VoiceName};
use crate::viz::RenderLoop;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppStatus {
    Idle,
    Synthesizing,
    Playing,
}

impl Default for AppStatus {
    fn default() -> Self {
        Self::Idle
    }
}

/// One generated clip in the session history. Most-recent-first; the
/// decoded audio is owned here and shared with the playback graph. The
/// history lives and dies with the session.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: String,
    pub source_text: String,
    pub voice: VoiceName,
    pub mode: TtsMode,
    pub created_at: u64,
    pub audio: Option<Arc<DecodedAudio>>,
}

pub struct AppState {
    pub status: Mutex<AppStatus>,
    pub settings: Mutex<Settings>,
    pub history: Mutex<Vec<HistoryEntry>>,
    pub playback: Mutex<PlaybackEngine>,
    pub session_user: Mutex<Option<User>>,
    pub render_loop: Mutex<Option<RenderLoop>>,
}

impl AppState {
    pub fn new(engine: PlaybackEngine) -> Self {
        Self {
            status: Mutex::new(AppStatus::default()),
            settings: Mutex::new(Settings::default()),
            history: Mutex::new(Vec::new()),
            playback: Mutex::new(engine),
            session_user: Mutex::new(None),
            render_loop: Mutex::new(None),
        }
    }

    /// Export gating consults only this.
    pub fn is_authorized(&self) -> bool {
        self.session_user.lock().unwrap().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub language: String,
    pub voice: VoiceName,
    pub mode: TtsMode,
    pub pitch: i8,
    pub speed: i8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: "bn-BD".to_string(),
            voice: VoiceName::Puck,
            mode: TtsMode::Normal,
            pitch: 0,
            speed: 0,
        }
    }
}
