pub mod gemini;
pub mod prompt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audio::RawAudioPayload;

/// Prebuilt voices offered by the synthesis model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoiceName {
    Kore,
    Puck,
    Charon,
    Fenrir,
    Zephyr,
}

impl VoiceName {
    pub const ALL: [VoiceName; 5] = [
        VoiceName::Kore,
        VoiceName::Puck,
        VoiceName::Charon,
        VoiceName::Fenrir,
        VoiceName::Zephyr,
    ];

    /// Wire name sent to the model.
    pub fn api_name(&self) -> &'static str {
        match self {
            VoiceName::Kore => "Kore",
            VoiceName::Puck => "Puck",
            VoiceName::Charon => "Charon",
            VoiceName::Fenrir => "Fenrir",
            VoiceName::Zephyr => "Zephyr",
        }
    }

    /// Name shown to the user.
    pub fn display_name(&self) -> &'static str {
        match self {
            VoiceName::Kore => "Nusrat",
            VoiceName::Puck => "Mehedi",
            VoiceName::Charon => "Mamun",
            VoiceName::Fenrir => "Hasan",
            VoiceName::Zephyr => "Ayesha",
        }
    }
}

impl std::str::FromStr for VoiceName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VoiceName::ALL
            .iter()
            .find(|v| v.api_name().eq_ignore_ascii_case(s) || v.display_name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown voice: {s}"))
    }
}

/// Speaking styles, each mapping to a prompt instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TtsMode {
    Normal,
    Story,
    Poem,
    Ad,
    Vlog,
    Social,
}

impl TtsMode {
    pub const ALL: [TtsMode; 6] = [
        TtsMode::Normal,
        TtsMode::Story,
        TtsMode::Poem,
        TtsMode::Ad,
        TtsMode::Vlog,
        TtsMode::Social,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TtsMode::Normal => "Natural",
            TtsMode::Story => "Story",
            TtsMode::Poem => "Poem",
            TtsMode::Ad => "Ad",
            TtsMode::Vlog => "Vlog",
            TtsMode::Social => "Social",
        }
    }

    pub fn instruction(&self) -> &'static str {
        match self {
            TtsMode::Normal => "",
            TtsMode::Story => "Narrate this story with deep emotion",
            TtsMode::Poem => "Recite this poem with rhythm and feeling",
            TtsMode::Ad => "Read this advertisement energetically and persuasively",
            TtsMode::Vlog => "Speak casually and engagingly like a video blogger",
            TtsMode::Social => "Speak in a trendy and upbeat social media style",
        }
    }
}

impl std::str::FromStr for TtsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "normal" | "natural" => Ok(TtsMode::Normal),
            "story" => Ok(TtsMode::Story),
            "poem" => Ok(TtsMode::Poem),
            "ad" => Ok(TtsMode::Ad),
            "vlog" => Ok(TtsMode::Vlog),
            "social" => Ok(TtsMode::Social),
            _ => Err(format!("unknown mode: {s}")),
        }
    }
}

/// Remote speech synthesis: final prompt text + voice → raw PCM bytes.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, prompt: &str, voice: VoiceName) -> Result<RawAudioPayload>;
}
