use std::sync::Arc;

use crate::error::AudioError;

use super::{AnalysisTap, DecodedAudio, DeviceState};

/// One end-to-end output graph: source buffer → analysis tap → sink.
pub trait SourceGraph: Send {
    /// True once the source has played through to its natural end.
    fn finished(&self) -> bool;

    /// Halt output and release the underlying stream. Idempotent.
    fn stop(&mut self);
}

/// The platform output sink. The sink accepts at most one open source
/// graph at a time; the playback engine is the only constructor.
pub trait OutputDevice: Send {
    fn state(&self) -> DeviceState;

    /// Bring a suspended device back to active. Called before graph
    /// construction; failure aborts the play attempt.
    fn resume(&mut self) -> Result<(), AudioError>;

    fn create_source(
        &mut self,
        audio: Arc<DecodedAudio>,
        tap: AnalysisTap,
    ) -> Result<Box<dyn SourceGraph>, AudioError>;

    fn close(&mut self);
}

struct ActiveSource {
    entry_id: String,
    graph: Box<dyn SourceGraph>,
}

/// Single-source playback: Idle (no graph) or Playing (exactly one
/// graph bound to one history entry). A playing entry id exists exactly
/// when a graph is active.
pub struct PlaybackEngine {
    device: Box<dyn OutputDevice>,
    tap: AnalysisTap,
    active: Option<ActiveSource>,
}

impl PlaybackEngine {
    pub fn new(device: Box<dyn OutputDevice>) -> Self {
        Self {
            device,
            tap: AnalysisTap::new(),
            active: None,
        }
    }

    /// Handle to the shared analysis tap. Readers never mutate it.
    pub fn tap(&self) -> AnalysisTap {
        self.tap.clone()
    }

    /// Start playing `audio` for `entry_id`. Any active graph is fully
    /// torn down before the new one is constructed; a suspended device
    /// is resumed first.
    pub fn play(&mut self, entry_id: &str, audio: Arc<DecodedAudio>) -> Result<(), AudioError> {
        self.stop();

        if self.device.state() == DeviceState::Suspended {
            self.device.resume()?;
        }
        if self.device.state() != DeviceState::Active {
            return Err(AudioError::SubsystemUnavailable(
                "output device is closed".into(),
            ));
        }

        let graph = self.device.create_source(audio, self.tap.clone())?;
        self.active = Some(ActiveSource {
            entry_id: entry_id.to_string(),
            graph,
        });
        tracing::info!("Playback started: {}", entry_id);
        Ok(())
    }

    /// Halt the active graph and return to idle. No-op when idle.
    pub fn stop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.graph.stop();
            self.tap.reset();
            tracing::info!("Playback stopped: {}", active.entry_id);
        }
    }

    /// Reap a graph that reached its natural end, leaving the same
    /// state as an explicit `stop`. Returns the entry id that finished.
    pub fn reap_finished(&mut self) -> Option<String> {
        if self.active.as_ref().is_some_and(|a| a.graph.finished()) {
            let mut active = self.active.take().unwrap();
            active.graph.stop();
            self.tap.reset();
            tracing::info!("Playback finished: {}", active.entry_id);
            return Some(active.entry_id);
        }
        None
    }

    pub fn playing_entry_id(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.entry_id.as_str())
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Tear down playback and close the device.
    pub fn close(&mut self) {
        self.stop();
        self.device.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::{stub_audio, DeviceProbe, MockDevice};
    use std::sync::atomic::Ordering;

    #[test]
    fn play_then_play_never_overlaps_graphs() {
        let probe = Arc::new(DeviceProbe::default());
        let mut engine = PlaybackEngine::new(Box::new(MockDevice::active(probe.clone())));

        engine.play("a", stub_audio(100)).unwrap();
        engine.play("b", stub_audio(100)).unwrap();

        assert_eq!(engine.playing_entry_id(), Some("b"));
        assert_eq!(probe.max_open.load(Ordering::SeqCst), 1);
        assert_eq!(
            *probe.events.lock().unwrap(),
            vec!["graph created", "graph stopped", "graph created"]
        );
    }

    #[test]
    fn stop_is_idempotent() {
        let probe = Arc::new(DeviceProbe::default());
        let mut engine = PlaybackEngine::new(Box::new(MockDevice::active(probe.clone())));

        engine.play("a", stub_audio(10)).unwrap();
        engine.stop();
        engine.stop();

        assert!(!engine.is_playing());
        assert_eq!(engine.playing_entry_id(), None);
        assert_eq!(probe.open_graphs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn natural_completion_matches_explicit_stop() {
        let probe = Arc::new(DeviceProbe::default());
        let mut engine = PlaybackEngine::new(Box::new(MockDevice::active(probe.clone())));

        engine.play("a", stub_audio(10)).unwrap();
        assert_eq!(engine.reap_finished(), None);

        probe.finish_current_graph();
        assert_eq!(engine.reap_finished(), Some("a".to_string()));
        assert!(!engine.is_playing());
        assert_eq!(engine.playing_entry_id(), None);
        assert_eq!(probe.open_graphs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn suspended_device_is_resumed_before_the_graph_exists() {
        let probe = Arc::new(DeviceProbe::default());
        let mut engine = PlaybackEngine::new(Box::new(MockDevice::suspended(probe.clone())));

        engine.play("a", stub_audio(10)).unwrap();

        assert_eq!(probe.resumes.load(Ordering::SeqCst), 1);
        assert_eq!(
            *probe.events.lock().unwrap(),
            vec!["resume", "graph created"]
        );
    }

    #[test]
    fn failed_resume_leaves_the_engine_idle() {
        let probe = Arc::new(DeviceProbe::default());
        let mut device = MockDevice::suspended(probe.clone());
        device.fail_resume = true;
        let mut engine = PlaybackEngine::new(Box::new(device));

        let err = engine.play("a", stub_audio(10)).unwrap_err();
        assert!(matches!(err, AudioError::SubsystemUnavailable(_)));
        assert!(!engine.is_playing());
        assert_eq!(probe.open_graphs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn closed_device_refuses_playback() {
        let probe = Arc::new(DeviceProbe::default());
        let mut engine = PlaybackEngine::new(Box::new(MockDevice::active(probe)));
        engine.close();

        let err = engine.play("a", stub_audio(10)).unwrap_err();
        assert!(matches!(err, AudioError::SubsystemUnavailable(_)));
    }
}
