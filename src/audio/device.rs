use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::error::AudioError;

use super::{
    processing, AnalysisTap, DecodedAudio, DeviceState, OutputDevice, SourceGraph,
};

/// Platform output sink backed by cpal, running at the device's native
/// sample rate and channel count.
pub struct CpalOutputDevice {
    device: cpal::Device,
    config: cpal::StreamConfig,
    state: DeviceState,
}

impl CpalOutputDevice {
    /// Open the default output device at its default config.
    pub fn open() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            AudioError::SubsystemUnavailable("no output device available".into())
        })?;
        let config = device
            .default_output_config()
            .map_err(|e| {
                AudioError::SubsystemUnavailable(format!("no default output config: {e}"))
            })?
            .config();

        tracing::info!(
            "Output device ready ({} Hz, {} channels)",
            config.sample_rate.0,
            config.channels
        );
        Ok(Self {
            device,
            config,
            state: DeviceState::Active,
        })
    }
}

impl OutputDevice for CpalOutputDevice {
    fn state(&self) -> DeviceState {
        self.state
    }

    fn resume(&mut self) -> Result<(), AudioError> {
        match self.state {
            DeviceState::Closed => Err(AudioError::SubsystemUnavailable(
                "output device is closed".into(),
            )),
            _ => {
                self.state = DeviceState::Active;
                Ok(())
            }
        }
    }

    fn create_source(
        &mut self,
        audio: Arc<DecodedAudio>,
        tap: AnalysisTap,
    ) -> Result<Box<dyn SourceGraph>, AudioError> {
        if self.state != DeviceState::Active {
            return Err(AudioError::SubsystemUnavailable(
                "output device is not active".into(),
            ));
        }

        let device_channels = self.config.channels as usize;
        let device_rate = self.config.sample_rate.0;

        // Adapt the clip to the sink's rate once, up front.
        let channels = processing::resample(audio.channels(), audio.sample_rate(), device_rate)
            .map_err(|e| {
                AudioError::SubsystemUnavailable(format!("rate adaptation failed: {e}"))
            })?;
        let frame_count = channels.first().map_or(0, Vec::len);

        let position = Arc::new(AtomicUsize::new(0));
        let ended = Arc::new(AtomicBool::new(frame_count == 0));

        let cursor = position.clone();
        let ended_flag = ended.clone();
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut index = cursor.load(Ordering::Relaxed);
                    let mut fed = Vec::with_capacity(data.len() / device_channels.max(1));
                    for frame in data.chunks_mut(device_channels.max(1)) {
                        if index < frame_count {
                            for (slot_idx, slot) in frame.iter_mut().enumerate() {
                                let source = slot_idx.min(channels.len() - 1);
                                *slot = channels[source][index];
                            }
                            fed.push(frame[0]);
                            index += 1;
                        } else {
                            // Silence once the clip has run out.
                            frame.fill(0.0);
                        }
                    }
                    cursor.store(index, Ordering::Relaxed);
                    if !fed.is_empty() {
                        tap.push(&fed);
                    }
                    if index >= frame_count {
                        ended_flag.store(true, Ordering::Relaxed);
                    }
                },
                |err| {
                    tracing::error!("Audio output error: {}", err);
                },
                None,
            )
            .map_err(|e| {
                AudioError::SubsystemUnavailable(format!("failed to build output stream: {e}"))
            })?;

        stream.play().map_err(|e| {
            AudioError::SubsystemUnavailable(format!("failed to start output stream: {e}"))
        })?;

        Ok(Box::new(CpalSourceGraph {
            stream: Some(stream),
            ended,
        }))
    }

    fn close(&mut self) {
        self.state = DeviceState::Closed;
    }
}

struct CpalSourceGraph {
    stream: Option<cpal::Stream>,
    ended: Arc<AtomicBool>,
}

// Safety: cpal::Stream is driven entirely from its own audio thread.
// The graph is only ever accessed behind the playback engine's mutex in
// AppState, so concurrent access to the stream is impossible.
unsafe impl Send for CpalSourceGraph {}

impl SourceGraph for CpalSourceGraph {
    fn finished(&self) -> bool {
        self.ended.load(Ordering::Relaxed)
    }

    fn stop(&mut self) {
        // Dropping the stream halts output and releases the voice.
        self.stream = None;
    }
}
