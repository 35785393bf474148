//! Test doubles for the output device seam.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::AudioError;

use super::{AnalysisTap, DecodedAudio, DeviceState, OutputDevice, SourceGraph};

/// Shared observation point for a mock device: counts open graphs and
/// records the peak so tests can assert that no two graphs ever
/// overlapped, plus an ordered event log.
#[derive(Default)]
pub struct DeviceProbe {
    pub open_graphs: AtomicUsize,
    pub max_open: AtomicUsize,
    pub resumes: AtomicUsize,
    pub events: Mutex<Vec<&'static str>>,
    graph_ends: Mutex<Vec<Arc<AtomicBool>>>,
}

impl DeviceProbe {
    fn record(&self, event: &'static str) {
        self.events.lock().unwrap().push(event);
    }

    /// Simulate the most recently created graph reaching end-of-clip.
    pub fn finish_current_graph(&self) {
        let ends = self.graph_ends.lock().unwrap();
        ends.last()
            .expect("no graph has been created")
            .store(true, Ordering::SeqCst);
    }
}

pub struct MockGraph {
    probe: Arc<DeviceProbe>,
    ended: Arc<AtomicBool>,
    stopped: bool,
}

impl SourceGraph for MockGraph {
    fn finished(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.probe.open_graphs.fetch_sub(1, Ordering::SeqCst);
            self.probe.record("graph stopped");
        }
    }
}

pub struct MockDevice {
    probe: Arc<DeviceProbe>,
    state: DeviceState,
    pub fail_resume: bool,
}

impl MockDevice {
    pub fn active(probe: Arc<DeviceProbe>) -> Self {
        Self {
            probe,
            state: DeviceState::Active,
            fail_resume: false,
        }
    }

    pub fn suspended(probe: Arc<DeviceProbe>) -> Self {
        Self {
            probe,
            state: DeviceState::Suspended,
            fail_resume: false,
        }
    }
}

impl OutputDevice for MockDevice {
    fn state(&self) -> DeviceState {
        self.state
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        self.probe.resumes.fetch_add(1, Ordering::SeqCst);
        self.probe.record("resume");
        if self.fail_resume {
            return Err(AudioError::SubsystemUnavailable("resume failed".into()));
        }
        self.state = DeviceState::Active;
        Ok(())
    }

    fn create_source(
        &mut self,
        _audio: Arc<DecodedAudio>,
        _tap: AnalysisTap,
    ) -> Result<Box<dyn SourceGraph>, AudioError> {
        if self.state != DeviceState::Active {
            return Err(AudioError::SubsystemUnavailable(
                "device is not active".into(),
            ));
        }
        let open = self.probe.open_graphs.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_open.fetch_max(open, Ordering::SeqCst);
        self.probe.record("graph created");

        let ended = Arc::new(AtomicBool::new(false));
        self.probe.graph_ends.lock().unwrap().push(ended.clone());
        Ok(Box::new(MockGraph {
            probe: self.probe.clone(),
            ended,
            stopped: false,
        }))
    }

    fn close(&mut self) {
        self.state = DeviceState::Closed;
        self.probe.record("device closed");
    }
}

/// A short mono clip for driving the engine in tests.
pub fn stub_audio(frames: usize) -> Arc<DecodedAudio> {
    let samples = (0..frames).map(|i| (i % 64) as f32 / 64.0).collect();
    Arc::new(DecodedAudio::new(24000, vec![samples]))
}
