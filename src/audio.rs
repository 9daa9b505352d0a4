//! PCM decoding and the audio output device.
//!
//! `rodio::OutputStream` is `!Send` on some platforms, so [`RodioOutput`]
//! keeps it on a dedicated OS thread and proxies every call through a
//! channel. The public handle is `Send + Sync` and can be shared with the
//! async playback controller.

use crate::error::{AudioError, DecodeError};
use rodio::{OutputStream, OutputStreamHandle, Sink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{debug, info, warn};

/// Normalized samples ready for the output device.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples in `[-1.0, 1.0)`.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f32 / self.sample_rate as f32
    }
}

/// Interpret raw bytes as signed 16-bit little-endian PCM.
///
/// Each sample is divided by 32768 so full scale maps onto `[-1.0, 1.0)`.
pub fn decode_pcm16(
    bytes: &[u8],
    sample_rate: u32,
    channels: u16,
) -> Result<DecodedAudio, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    if bytes.len() % 2 != 0 {
        return Err(DecodeError::Truncated(bytes.len()));
    }

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| f32::from(i16::from_le_bytes([pair[0], pair[1]])) / 32768.0)
        .collect();

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels: channels.max(1),
    })
}

/// Callback invoked when playback finishes naturally (all queued audio drained).
pub type PlaybackDoneCallback = Box<dyn FnOnce() + Send + 'static>;

/// Something that can play one clip at a time.
///
/// `start` replaces whatever is playing. `on_done` fires at most once, only
/// when the clip drains on its own, and never from inside `start` itself.
/// `stop` silences the current clip without firing its callback and is a
/// no-op when nothing is playing.
pub trait AudioOutput: Send + Sync {
    fn start(&self, audio: DecodedAudio, on_done: PlaybackDoneCallback) -> Result<(), AudioError>;
    fn stop(&self) -> Result<(), AudioError>;
}

enum AudioCommand {
    Start {
        audio: DecodedAudio,
        on_done: PlaybackDoneCallback,
        reply: mpsc::Sender<Result<(), AudioError>>,
    },
    Stop {
        reply: mpsc::Sender<()>,
    },
    Shutdown,
}

/// `Send + Sync` handle to the thread owning the default output device.
pub struct RodioOutput {
    cmd_tx: mpsc::Sender<AudioCommand>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioOutput {
    /// Open the default output device on a new thread.
    pub fn spawn() -> Result<Self, AudioError> {
        let (cmd_tx, cmd_rx) = mpsc::channel::<AudioCommand>();
        let (init_tx, init_rx) = mpsc::channel::<Result<(), AudioError>>();

        let thread = thread::Builder::new()
            .name("aura-audio".into())
            .spawn(move || run(cmd_rx, init_tx))
            .map_err(|err| AudioError::Device(format!("failed to spawn audio thread: {err}")))?;

        init_rx.recv().map_err(|_| AudioError::ThreadDied)??;

        Ok(Self {
            cmd_tx,
            thread: Some(thread),
        })
    }
}

impl AudioOutput for RodioOutput {
    fn start(&self, audio: DecodedAudio, on_done: PlaybackDoneCallback) -> Result<(), AudioError> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(AudioCommand::Start {
                audio,
                on_done,
                reply,
            })
            .map_err(|_| AudioError::ThreadDied)?;
        rx.recv().map_err(|_| AudioError::ThreadDied)?
    }

    fn stop(&self) -> Result<(), AudioError> {
        let (reply, rx) = mpsc::channel();
        self.cmd_tx
            .send(AudioCommand::Stop { reply })
            .map_err(|_| AudioError::ThreadDied)?;
        rx.recv().map_err(|_| AudioError::ThreadDied)
    }
}

impl Drop for RodioOutput {
    fn drop(&mut self) {
        let _ = self.cmd_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

struct ActiveClip {
    sink: Arc<Sink>,
    playing: Arc<AtomicBool>,
}

impl ActiveClip {
    fn halt(self) {
        self.playing.store(false, Ordering::SeqCst);
        self.sink.stop();
    }
}

fn run(cmd_rx: mpsc::Receiver<AudioCommand>, init_tx: mpsc::Sender<Result<(), AudioError>>) {
    let (_stream, handle) = match OutputStream::try_default() {
        Ok(pair) => pair,
        Err(err) => {
            let _ = init_tx.send(Err(AudioError::Device(err.to_string())));
            return;
        }
    };
    info!("Audio output initialized on default device");
    if init_tx.send(Ok(())).is_err() {
        return;
    }

    let mut current: Option<ActiveClip> = None;
    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            AudioCommand::Start {
                audio,
                on_done,
                reply,
            } => {
                if let Some(clip) = current.take() {
                    clip.halt();
                }
                let result = start_clip(&handle, audio, on_done).map(|clip| {
                    current = Some(clip);
                });
                let _ = reply.send(result);
            }
            AudioCommand::Stop { reply } => {
                if let Some(clip) = current.take() {
                    clip.halt();
                    debug!("Audio playback stopped");
                }
                let _ = reply.send(());
            }
            AudioCommand::Shutdown => break,
        }
    }

    if let Some(clip) = current.take() {
        clip.halt();
    }
    debug!("Audio thread shutting down");
}

fn start_clip(
    handle: &OutputStreamHandle,
    audio: DecodedAudio,
    on_done: PlaybackDoneCallback,
) -> Result<ActiveClip, AudioError> {
    let sink = Sink::try_new(handle).map_err(|err| AudioError::Device(err.to_string()))?;
    let seconds = audio.duration_secs();
    let source =
        rodio::buffer::SamplesBuffer::new(audio.channels, audio.sample_rate, audio.samples);
    sink.append(source);

    let sink = Arc::new(sink);
    let playing = Arc::new(AtomicBool::new(true));
    let watcher_sink = Arc::clone(&sink);
    let watcher_flag = Arc::clone(&playing);

    // `sleep_until_end` also returns when the sink is stopped; the flag tells
    // the two cases apart.
    let spawned = thread::Builder::new()
        .name("aura-audio-watch".into())
        .spawn(move || {
            watcher_sink.sleep_until_end();
            if watcher_flag.swap(false, Ordering::SeqCst) {
                debug!("Playback finished naturally");
                on_done();
            }
        });
    if let Err(err) = spawned {
        warn!("Failed to spawn playback watcher: {err}");
        sink.stop();
        return Err(AudioError::Device(err.to_string()));
    }

    debug!(seconds, "Audio playback started");
    Ok(ActiveClip { sink, playing })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_little_endian_samples() {
        let bytes = [0x00, 0x00, 0xff, 0x7f, 0x00, 0x80, 0x00, 0x40];
        let audio = decode_pcm16(&bytes, 24_000, 1).unwrap();
        assert_eq!(audio.samples.len(), 4);
        assert_eq!(audio.samples[0], 0.0);
        assert_eq!(audio.samples[1], 32767.0 / 32768.0);
        assert_eq!(audio.samples[2], -1.0);
        assert_eq!(audio.samples[3], 0.5);
        assert_eq!(audio.sample_rate, 24_000);
        assert_eq!(audio.channels, 1);
    }

    #[test]
    fn rejects_empty_and_odd_payloads() {
        assert_eq!(decode_pcm16(&[], 24_000, 1), Err(DecodeError::Empty));
        assert_eq!(
            decode_pcm16(&[1, 2, 3], 24_000, 1),
            Err(DecodeError::Truncated(3))
        );
    }

    #[test]
    fn duration_accounts_for_channels() {
        let bytes = vec![0u8; 24_000 * 2 * 2];
        let audio = decode_pcm16(&bytes, 24_000, 2).unwrap();
        assert_eq!(audio.frames(), 24_000);
        assert_eq!(audio.duration_secs(), 1.0);
    }
}
