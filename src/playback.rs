//! Read-aloud playback controller.
//!
//! At most one utterance is in flight. Every `speak` call gets a fresh
//! session id; results and completion callbacks that arrive for an older id
//! are dropped, so a stopped or superseded request can never start audio or
//! flip the state back.

use crate::audio::{AudioOutput, decode_pcm16};
use crate::error::{PlaybackError, SynthesisError};
use crate::tts::{SpeechSynthesizer, Voice};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    /// Waiting on synthesis or decoding.
    Starting,
    Playing,
}

/// How a spoken utterance ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Finished,
    Stopped,
}

/// Resolves once the utterance started by `speak` ends.
#[derive(Debug)]
pub struct PlaybackCompletion {
    rx: oneshot::Receiver<PlaybackOutcome>,
}

impl PlaybackCompletion {
    pub async fn finished(self) -> PlaybackOutcome {
        self.rx.await.unwrap_or(PlaybackOutcome::Stopped)
    }
}

struct ActiveSession {
    id: u64,
    voice: Voice,
    done_tx: oneshot::Sender<PlaybackOutcome>,
}

struct Slot {
    state: PlaybackState,
    next_id: u64,
    session: Option<ActiveSession>,
}

impl Slot {
    fn is_current(&self, id: u64) -> bool {
        self.session.as_ref().is_some_and(|session| session.id == id)
    }

    /// End the current session, if any, and go idle.
    fn finish(&mut self, outcome: PlaybackOutcome) {
        self.state = PlaybackState::Idle;
        if let Some(session) = self.session.take() {
            debug!(id = session.id, voice = %session.voice, ?outcome, "Read-aloud session ended");
            let _ = session.done_tx.send(outcome);
        }
    }
}

pub struct PlaybackController {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    output: Arc<dyn AudioOutput>,
    timeout: Option<Duration>,
    slot: Arc<Mutex<Slot>>,
}

impl PlaybackController {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>, output: Arc<dyn AudioOutput>) -> Self {
        Self {
            synthesizer,
            output,
            timeout: None,
            slot: Arc::new(Mutex::new(Slot {
                state: PlaybackState::Idle,
                next_id: 0,
                session: None,
            })),
        }
    }

    /// Abandon synthesis requests that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.slot.lock().state
    }

    pub fn is_active(&self) -> bool {
        self.state() != PlaybackState::Idle
    }

    /// Synthesize `text` and start playing it.
    ///
    /// Anything already in flight is stopped first. Returns once audio has
    /// started; the returned handle resolves when it ends. If `stop` or a
    /// newer `speak` wins the race while synthesis is pending, this returns
    /// `Ok` with a handle that resolves to [`PlaybackOutcome::Stopped`] and
    /// no audio is played.
    pub async fn speak(
        &self,
        text: &str,
        voice: Voice,
    ) -> Result<PlaybackCompletion, PlaybackError> {
        let (done_tx, rx) = oneshot::channel();
        // The old session ends and the new one registers under one lock.
        let id = {
            let mut slot = self.slot.lock();
            self.halt(&mut slot);
            let id = slot.next_id;
            slot.next_id = slot.next_id.wrapping_add(1);
            slot.session = Some(ActiveSession { id, voice, done_tx });
            slot.state = PlaybackState::Starting;
            id
        };
        let completion = PlaybackCompletion { rx };
        debug!(id, voice = %voice, "Starting read-aloud");

        let audio = match self.synthesize(text, voice).await {
            Ok(audio) => audio,
            Err(err) => return self.fail(id, completion, err.into()),
        };
        let decoded = match decode_pcm16(&audio.pcm, audio.sample_rate, audio.channels) {
            Ok(decoded) => decoded,
            Err(err) => return self.fail(id, completion, err.into()),
        };

        let mut slot = self.slot.lock();
        if !slot.is_current(id) {
            debug!(id, "Dropping synthesized audio for a superseded request");
            return Ok(completion);
        }

        let weak = Arc::downgrade(&self.slot);
        let on_done = Box::new(move || {
            let Some(slot) = weak.upgrade() else {
                return;
            };
            let mut slot = slot.lock();
            if slot.is_current(id) {
                debug!(id, "Read-aloud finished");
                slot.finish(PlaybackOutcome::Finished);
            }
        });

        match self.output.start(decoded, on_done) {
            Ok(()) => {
                slot.state = PlaybackState::Playing;
                info!(id, "Read-aloud playing");
                Ok(completion)
            }
            Err(err) => {
                warn!(id, "Audio output failed: {err}");
                slot.finish(PlaybackOutcome::Stopped);
                Err(err.into())
            }
        }
    }

    /// Silence any playback and cancel pending synthesis. Safe to call at any time.
    pub fn stop(&self) {
        let mut slot = self.slot.lock();
        self.halt(&mut slot);
    }

    fn halt(&self, slot: &mut Slot) {
        if slot.session.is_none() && slot.state == PlaybackState::Idle {
            return;
        }
        if slot.state == PlaybackState::Playing {
            if let Err(err) = self.output.stop() {
                warn!("Failed to stop audio output: {err}");
            }
        }
        debug!("Read-aloud stopped");
        slot.finish(PlaybackOutcome::Stopped);
    }

    async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
    ) -> Result<crate::tts::SynthesizedAudio, SynthesisError> {
        let request = self.synthesizer.synthesize(text, voice);
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| SynthesisError::Timeout(limit))?,
            None => request.await,
        }
    }

    fn fail(
        &self,
        id: u64,
        completion: PlaybackCompletion,
        err: PlaybackError,
    ) -> Result<PlaybackCompletion, PlaybackError> {
        let mut slot = self.slot.lock();
        if !slot.is_current(id) {
            debug!(id, "Ignoring failure of a superseded request: {err}");
            return Ok(completion);
        }
        warn!(id, "Read-aloud failed: {err}");
        slot.finish(PlaybackOutcome::Stopped);
        Err(err)
    }
}
