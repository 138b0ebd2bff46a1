//! Audio playback for synthesized replies.
//!
//! `PlaybackController` owns the single audio output and the identity of the
//! message currently playing. At most one message plays at a time: starting
//! playback stops whatever was playing first. The rodio output objects are
//! not `Send`, so they live on a lazily spawned dedicated audio thread that
//! receives commands over a channel and clears the playing marker when a
//! source drains naturally.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::PlaybackError;
use crate::gemini::speech::{SpeechSynthesizer, SPEECH_CHANNELS, SPEECH_SAMPLE_RATE};

/// Decode 16-bit little-endian PCM bytes into f32 samples in [-1, 1].
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>, PlaybackError> {
    if bytes.is_empty() {
        return Err(PlaybackError::DecodeFailed {
            message: "empty audio payload".to_string(),
        });
    }
    if bytes.len() % 2 != 0 {
        return Err(PlaybackError::DecodeFailed {
            message: format!("odd byte count: {}", bytes.len()),
        });
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|pair| {
            let sample = i16::from_le_bytes([pair[0], pair[1]]);
            (sample as f32 / i16::MAX as f32).clamp(-1.0, 1.0)
        })
        .collect())
}

/// The output device seam. The real implementation drives rodio; tests use
/// a null output.
pub trait AudioOut: Send {
    /// Queue samples for immediate playback, replacing anything playing.
    /// `id` identifies the message the samples belong to, so natural-drain
    /// bookkeeping can tell stale sources from the current one.
    fn play(
        &mut self,
        id: Uuid,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<(), PlaybackError>;

    /// Stop playback and drop the queued source.
    fn stop(&mut self);
}

enum AudioCommand {
    Play {
        id: Uuid,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
        ack: Sender<Result<(), String>>,
    },
    Stop,
}

/// Clear the shared playing marker only if it still belongs to `current`.
/// A marker already rewritten for a newer message is left alone.
fn clear_if_current(marker: &Mutex<Option<Uuid>>, current: Option<Uuid>) {
    let mut playing = marker.lock().expect("playing marker poisoned");
    if *playing == current {
        *playing = None;
    }
}

/// rodio-backed output running on a dedicated audio thread.
pub struct RodioOut {
    tx: Option<Sender<AudioCommand>>,
    playing: Arc<Mutex<Option<Uuid>>>,
}

impl RodioOut {
    fn new(playing: Arc<Mutex<Option<Uuid>>>) -> Self {
        Self { tx: None, playing }
    }

    fn ensure_thread(&mut self) -> Result<Sender<AudioCommand>, PlaybackError> {
        if let Some(tx) = &self.tx {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<AudioCommand>();
        let playing = Arc::clone(&self.playing);

        thread::Builder::new()
            .name("tabletalk-audio".to_string())
            .spawn(move || {
                // Holds the non-Send rodio objects for the thread's lifetime.
                // The stream and sink are created on the first play and
                // reused across plays; only the queued source is replaced.
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;
                let mut current: Option<Uuid> = None;

                loop {
                    match rx.recv_timeout(Duration::from_millis(50)) {
                        Ok(AudioCommand::Play {
                            id,
                            samples,
                            sample_rate,
                            channels,
                            ack,
                        }) => {
                            let result = (|| {
                                if sink.is_none() {
                                    let (s, handle) = OutputStream::try_default()
                                        .map_err(|e| format!("no audio output: {}", e))?;
                                    let new_sink = Sink::try_new(&handle)
                                        .map_err(|e| format!("no audio sink: {}", e))?;
                                    _stream = Some(s);
                                    sink = Some(new_sink);
                                }
                                if let Some(s) = &sink {
                                    s.stop();
                                    s.append(SamplesBuffer::new(channels, sample_rate, samples));
                                }
                                Ok(())
                            })();
                            if result.is_ok() {
                                current = Some(id);
                            }
                            let _ = ack.send(result);
                        }
                        Ok(AudioCommand::Stop) => {
                            // The controller owns the marker on explicit
                            // stops; only empty the queue here.
                            if let Some(s) = &sink {
                                s.stop();
                            }
                            current = None;
                        }
                        Err(RecvTimeoutError::Timeout) => {
                            // Natural completion: the current source drained.
                            let drained = current.is_some()
                                && sink.as_ref().map(|s| s.empty()).unwrap_or(false);
                            if drained {
                                clear_if_current(&playing, current);
                                current = None;
                            }
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })
            .map_err(|e| PlaybackError::OutputUnavailable {
                message: format!("failed to spawn audio thread: {}", e),
            })?;

        self.tx = Some(tx.clone());
        Ok(tx)
    }
}

impl AudioOut for RodioOut {
    fn play(
        &mut self,
        id: Uuid,
        samples: Vec<f32>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<(), PlaybackError> {
        let tx = self.ensure_thread()?;
        let (ack_tx, ack_rx) = mpsc::channel();
        tx.send(AudioCommand::Play {
            id,
            samples,
            sample_rate,
            channels,
            ack: ack_tx,
        })
        .map_err(|_| PlaybackError::OutputUnavailable {
            message: "audio thread is gone".to_string(),
        })?;

        match ack_rx.recv_timeout(Duration::from_secs(5)) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(PlaybackError::OutputUnavailable { message }),
            Err(_) => Err(PlaybackError::OutputUnavailable {
                message: "audio thread did not respond".to_string(),
            }),
        }
    }

    fn stop(&mut self) {
        if let Some(tx) = &self.tx {
            if tx.send(AudioCommand::Stop).is_err() {
                warn!("Audio thread is gone; dropping stop command");
            }
        }
    }
}

/// Owns the audio output and enforces at-most-one-playing.
///
/// No other component touches the output device or the playing marker.
pub struct PlaybackController {
    out: Box<dyn AudioOut>,
    playing: Arc<Mutex<Option<Uuid>>>,
}

impl PlaybackController {
    /// Controller backed by the system audio output (created lazily on
    /// first play).
    pub fn new() -> Self {
        let playing = Arc::new(Mutex::new(None));
        Self {
            out: Box::new(RodioOut::new(Arc::clone(&playing))),
            playing,
        }
    }

    /// Controller backed by a custom output (tests).
    pub fn with_output(out: Box<dyn AudioOut>) -> Self {
        Self {
            out,
            playing: Arc::new(Mutex::new(None)),
        }
    }

    /// Identity of the message currently playing, if any.
    pub fn playing(&self) -> Option<Uuid> {
        *self.playing.lock().expect("playing marker poisoned")
    }

    /// Synthesize and play one message, stopping any current playback
    /// first. On synthesis or decode failure the marker is cleared and no
    /// partial audio is played.
    pub async fn play(
        &mut self,
        message_id: Uuid,
        text: &str,
        synthesizer: &dyn SpeechSynthesizer,
    ) -> Result<(), PlaybackError> {
        if self.playing().is_some() {
            self.stop();
        }
        self.set_playing(Some(message_id));
        debug!(%message_id, "Starting playback");

        let bytes = match synthesizer.synthesize(text).await {
            Ok(bytes) => bytes,
            Err(e) => {
                self.set_playing(None);
                return Err(PlaybackError::Synthesis(e));
            }
        };

        let samples = match decode_pcm16(&bytes) {
            Ok(samples) => samples,
            Err(e) => {
                self.set_playing(None);
                return Err(e);
            }
        };

        if let Err(e) = self
            .out
            .play(message_id, samples, SPEECH_SAMPLE_RATE, SPEECH_CHANNELS)
        {
            self.set_playing(None);
            return Err(e);
        }
        Ok(())
    }

    /// Stop playback and clear the playing marker.
    pub fn stop(&mut self) {
        self.out.stop();
        self.set_playing(None);
    }

    fn set_playing(&self, id: Option<Uuid>) {
        *self.playing.lock().expect("playing marker poisoned") = id;
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
