//! The session controller: ties generation, playback, history, and
//! export together over the shared [`AppState`].

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::audio::{decode_pcm16, wav};
use crate::error::{AudioError, SessionError};
use crate::state::{AppState, AppStatus, HistoryEntry};
use crate::synth::{prompt, Synthesizer};
use crate::viz::{Canvas, RenderLoop, Visualizer};

/// Run a generation end to end: build the prompt from the current
/// settings, call the synthesis collaborator, decode the payload,
/// prepend the new entry, and auto-play it. Single-flight: a second
/// generation while one is in progress is refused up front. On any
/// failure the history and playback state are left untouched.
pub async fn generate(
    state: &Arc<AppState>,
    synthesizer: &dyn Synthesizer,
    text: &str,
) -> Result<HistoryEntry, SessionError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(SessionError::EmptyText);
    }

    {
        let mut status = state.status.lock().unwrap();
        if *status == AppStatus::Synthesizing {
            return Err(SessionError::GenerationInFlight);
        }
        *status = AppStatus::Synthesizing;
    }
    // Any current clip stops before the request leaves.
    halt_graph(state);

    let (prompt_text, voice, mode) = {
        let settings = state.settings.lock().unwrap();
        (
            prompt::build_prompt(
                text,
                settings.mode,
                settings.pitch,
                settings.speed,
                &settings.language,
            ),
            settings.voice,
            settings.mode,
        )
    };

    tracing::info!("Generating speech ({} chars, voice {:?})", text.len(), voice);

    let payload = match synthesizer.synthesize(&prompt_text, voice).await {
        Ok(payload) => payload,
        Err(e) => {
            *state.status.lock().unwrap() = AppStatus::Idle;
            return Err(SessionError::Synthesis(e.to_string()));
        }
    };

    let audio = match decode_pcm16(&payload.bytes, payload.format) {
        Ok(audio) => Arc::new(audio),
        Err(e) => {
            *state.status.lock().unwrap() = AppStatus::Idle;
            return Err(e.into());
        }
    };

    // Apply the result as one atomic update, then hand off to playback.
    let entry = HistoryEntry {
        id: next_entry_id(state),
        source_text: text.to_string(),
        voice,
        mode,
        created_at: epoch_millis(),
        audio: Some(audio),
    };
    {
        let mut history = state.history.lock().unwrap();
        history.insert(0, entry.clone());
    }
    *state.status.lock().unwrap() = AppStatus::Idle;

    if let Err(e) = play_entry(state, &entry.id) {
        // The clip stays in history even when auto-play could not start.
        tracing::warn!("Auto-play failed for {}: {}", entry.id, e);
    }

    Ok(entry)
}

/// Play a history entry, implicitly stopping whatever is playing. The
/// old graph is fully torn down before the new one starts.
pub fn play_entry(state: &Arc<AppState>, entry_id: &str) -> Result<(), SessionError> {
    let entry = state
        .history
        .lock()
        .unwrap()
        .iter()
        .find(|e| e.id == entry_id)
        .cloned()
        .ok_or_else(|| SessionError::UnknownEntry(entry_id.to_string()))?;
    let audio = entry.audio.clone().ok_or_else(|| {
        AudioError::SubsystemUnavailable("entry has no decoded audio".into())
    })?;

    halt_graph(state);
    let started = state.playback.lock().unwrap().play(&entry.id, audio);

    let mut status = state.status.lock().unwrap();
    match started {
        Ok(()) => {
            *status = AppStatus::Playing;
            Ok(())
        }
        Err(e) => {
            *status = AppStatus::Idle;
            Err(e.into())
        }
    }
}

/// Stop playback and return to idle. No-op when nothing is playing.
pub fn stop_playback(state: &Arc<AppState>) {
    halt_graph(state);
    let mut status = state.status.lock().unwrap();
    if *status == AppStatus::Playing {
        *status = AppStatus::Idle;
    }
}

/// Delete a history entry. Deleting the playing entry stops playback
/// first; deleting an absent id is a pure no-op.
pub fn delete_entry(state: &Arc<AppState>, entry_id: &str) {
    let playing = state
        .playback
        .lock()
        .unwrap()
        .playing_entry_id()
        .map(str::to_string);
    if playing.as_deref() == Some(entry_id) {
        stop_playback(state);
    }
    state.history.lock().unwrap().retain(|e| e.id != entry_id);
}

/// Export an entry as a WAV file into `dir`. Requires an authorized
/// session; on `Unauthorized` the caller redirects to the login flow.
pub fn export_entry(
    state: &Arc<AppState>,
    entry_id: &str,
    dir: &Path,
) -> Result<PathBuf, SessionError> {
    if !state.is_authorized() {
        return Err(SessionError::Unauthorized);
    }

    let entry = state
        .history
        .lock()
        .unwrap()
        .iter()
        .find(|e| e.id == entry_id)
        .cloned()
        .ok_or_else(|| SessionError::UnknownEntry(entry_id.to_string()))?;
    let audio = entry.audio.as_ref().ok_or_else(|| {
        AudioError::SubsystemUnavailable("entry has no decoded audio".into())
    })?;

    let bytes = wav::encode_wav(audio);
    std::fs::create_dir_all(dir)?;
    let path = dir.join(wav::export_filename(&entry.id));
    std::fs::write(&path, &bytes)?;

    tracing::info!("Exported {} ({} bytes)", path.display(), bytes.len());
    Ok(path)
}

/// One cooperative tick of playback upkeep: reap a clip that reached
/// its natural end so the playing highlight clears, exactly as if
/// `stop` had been called. Returns true while playback continues.
pub fn poll_playing(state: &Arc<AppState>) -> bool {
    let finished = state.playback.lock().unwrap().reap_finished();
    if finished.is_some() {
        let mut status = state.status.lock().unwrap();
        if *status == AppStatus::Playing {
            *status = AppStatus::Idle;
        }
        return false;
    }
    state.playback.lock().unwrap().is_playing()
}

/// Attach a waveform render loop for the current playback, replacing
/// (and cancelling) any previous one.
pub fn start_render_loop<C>(state: &Arc<AppState>, canvas: C, refresh: Duration)
where
    C: Canvas + Send + 'static,
{
    let tap = state.playback.lock().unwrap().tap();
    let visualizer = Visualizer::new(canvas, tap);
    let poll_state = state.clone();
    let render_loop = RenderLoop::spawn(visualizer, refresh, move || poll_playing(&poll_state));

    let previous = state.render_loop.lock().unwrap().replace(render_loop);
    if let Some(mut previous) = previous {
        previous.cancel();
    }
}

/// Stop the engine graph and cancel the render loop without touching
/// the status flag.
fn halt_graph(state: &Arc<AppState>) {
    state.playback.lock().unwrap().stop();
    let render_loop = state.render_loop.lock().unwrap().take();
    if let Some(mut render_loop) = render_loop {
        render_loop.cancel();
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Creation-time id, uniquified against the live history.
fn next_entry_id(state: &AppState) -> String {
    let base = epoch_millis().to_string();
    let history = state.history.lock().unwrap();
    if !history.iter().any(|e| e.id == base) {
        return base;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !history.iter().any(|e| e.id == candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::{DeviceProbe, MockDevice};
    use crate::audio::playback::PlaybackEngine;
    use crate::audio::{PcmFormat, RawAudioPayload};
    use crate::auth::{User, UserRole};
    use crate::synth::VoiceName;
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;

    struct MockSynth {
        bytes: Vec<u8>,
        fail: bool,
    }

    impl MockSynth {
        fn ok(bytes: Vec<u8>) -> Self {
            Self { bytes, fail: false }
        }

        fn failing() -> Self {
            Self {
                bytes: Vec::new(),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Synthesizer for MockSynth {
        async fn synthesize(
            &self,
            _prompt: &str,
            _voice: VoiceName,
        ) -> anyhow::Result<RawAudioPayload> {
            if self.fail {
                anyhow::bail!("quota exceeded");
            }
            Ok(RawAudioPayload {
                bytes: self.bytes.clone(),
                format: PcmFormat {
                    sample_rate: 24000,
                    channel_count: 1,
                },
            })
        }
    }

    fn test_state() -> (Arc<AppState>, Arc<DeviceProbe>) {
        let probe = Arc::new(DeviceProbe::default());
        let engine = PlaybackEngine::new(Box::new(MockDevice::active(probe.clone())));
        (Arc::new(AppState::new(engine)), probe)
    }

    fn export_dir(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join("zotpot-tts-tests")
            .join(format!("export-{}-{}", name, std::process::id()))
    }

    #[tokio::test]
    async fn generate_prepends_and_auto_plays() {
        let (state, probe) = test_state();
        let synth = MockSynth::ok(vec![0x00, 0x40, 0x00, 0xC0]);

        let first = generate(&state, &synth, "hello there").await.unwrap();
        let second = generate(&state, &synth, "again").await.unwrap();

        let history = state.history.lock().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, second.id);
        assert_eq!(history[1].id, first.id);
        assert_ne!(first.id, second.id);
        drop(history);

        assert_eq!(
            state.playback.lock().unwrap().playing_entry_id(),
            Some(second.id.as_str())
        );
        assert_eq!(*state.status.lock().unwrap(), AppStatus::Playing);
        assert_eq!(probe.max_open.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn generate_decodes_the_payload() {
        let (state, _probe) = test_state();
        let synth = MockSynth::ok(vec![0x00, 0x40, 0x00, 0xC0]);

        let entry = generate(&state, &synth, "hi").await.unwrap();
        let audio = entry.audio.unwrap();
        assert_eq!(audio.sample_rate(), 24000);
        assert_eq!(audio.frame_count(), 2);
        assert_eq!(audio.channels()[0], vec![0.5, -0.5]);
    }

    #[tokio::test]
    async fn failed_synthesis_leaves_everything_untouched() {
        let (state, _probe) = test_state();
        let synth = MockSynth::ok(vec![0, 0, 0, 0]);
        generate(&state, &synth, "first").await.unwrap();

        let err = generate(&state, &MockSynth::failing(), "second")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Synthesis(ref msg) if msg == "quota exceeded"));

        assert_eq!(state.history.lock().unwrap().len(), 1);
        assert_eq!(*state.status.lock().unwrap(), AppStatus::Idle);
        assert!(!state.playback.lock().unwrap().is_playing());
    }

    #[tokio::test]
    async fn malformed_payload_fails_only_this_generation() {
        let (state, _probe) = test_state();
        let synth = MockSynth::ok(vec![0, 0, 0, 0]);
        generate(&state, &synth, "first").await.unwrap();

        // Odd byte count: not a whole frame.
        let bad = MockSynth::ok(vec![1, 2, 3]);
        let err = generate(&state, &bad, "second").await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Audio(AudioError::MalformedPayload { byte_len: 3, .. })
        ));

        assert_eq!(state.history.lock().unwrap().len(), 1);
        assert_eq!(*state.status.lock().unwrap(), AppStatus::Idle);
    }

    #[tokio::test]
    async fn second_generation_is_refused_while_one_is_in_flight() {
        let (state, _probe) = test_state();
        *state.status.lock().unwrap() = AppStatus::Synthesizing;

        let err = generate(&state, &MockSynth::ok(vec![]), "busy")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::GenerationInFlight));
    }

    #[tokio::test]
    async fn empty_text_is_refused() {
        let (state, _probe) = test_state();
        let err = generate(&state, &MockSynth::ok(vec![]), "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::EmptyText));
    }

    #[tokio::test]
    async fn play_switches_entries_without_overlap() {
        let (state, probe) = test_state();
        let synth = MockSynth::ok(vec![0, 0, 0, 0]);
        let a = generate(&state, &synth, "one").await.unwrap();
        let b = generate(&state, &synth, "two").await.unwrap();

        play_entry(&state, &a.id).unwrap();
        play_entry(&state, &b.id).unwrap();

        assert_eq!(
            state.playback.lock().unwrap().playing_entry_id(),
            Some(b.id.as_str())
        );
        assert_eq!(probe.max_open.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn natural_completion_clears_the_playing_state() {
        let (state, probe) = test_state();
        let synth = MockSynth::ok(vec![0, 0, 0, 0]);
        generate(&state, &synth, "clip").await.unwrap();

        assert!(poll_playing(&state));
        probe.finish_current_graph();
        assert!(!poll_playing(&state));

        assert_eq!(state.playback.lock().unwrap().playing_entry_id(), None);
        assert_eq!(*state.status.lock().unwrap(), AppStatus::Idle);
    }

    #[tokio::test]
    async fn deleting_the_playing_entry_stops_first() {
        let (state, probe) = test_state();
        let synth = MockSynth::ok(vec![0, 0, 0, 0]);
        let entry = generate(&state, &synth, "clip").await.unwrap();

        delete_entry(&state, &entry.id);

        assert_eq!(state.playback.lock().unwrap().playing_entry_id(), None);
        assert!(state.history.lock().unwrap().is_empty());
        assert_eq!(*state.status.lock().unwrap(), AppStatus::Idle);
        assert_eq!(probe.open_graphs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deleting_another_entry_keeps_playback_running() {
        let (state, _probe) = test_state();
        let synth = MockSynth::ok(vec![0, 0, 0, 0]);
        let a = generate(&state, &synth, "one").await.unwrap();
        let b = generate(&state, &synth, "two").await.unwrap();

        delete_entry(&state, &a.id);
        delete_entry(&state, "no-such-id");

        assert_eq!(
            state.playback.lock().unwrap().playing_entry_id(),
            Some(b.id.as_str())
        );
        assert_eq!(state.history.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn export_requires_authorization() {
        let (state, _probe) = test_state();
        let synth = MockSynth::ok(vec![0x00, 0x40]);
        let entry = generate(&state, &synth, "clip").await.unwrap();

        let err = export_entry(&state, &entry.id, &export_dir("unauth")).unwrap_err();
        assert!(matches!(err, SessionError::Unauthorized));

        *state.session_user.lock().unwrap() = Some(User {
            username: "user".into(),
            role: UserRole::User,
        });
        let path = export_entry(&state, &entry.id, &export_dir("ok")).unwrap();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("zotpot-{}.wav", entry.id)
        );
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(bytes.len(), 46);
        assert_eq!(&bytes[..4], b"RIFF");
    }

    #[tokio::test]
    async fn stop_is_a_no_op_when_idle() {
        let (state, _probe) = test_state();
        stop_playback(&state);
        assert_eq!(*state.status.lock().unwrap(), AppStatus::Idle);
    }
}
