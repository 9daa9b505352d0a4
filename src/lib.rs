//! Read-aloud ebook reader.
//!
//! Books (PDF or plain text) are split into pages; the current page can be
//! sent to a speech service and played through the default audio device.

pub mod audio;
pub mod book;
pub mod book_loader;
pub mod config;
pub mod error;
pub mod pagination;
pub mod playback;
pub mod session;
pub mod text_utils;
pub mod tts;

pub use book::{Book, BookFormat, Page};
pub use book_loader::{PdfExtractor, UnpdfExtractor, load_book};
pub use config::AppConfig;
pub use error::{AudioError, DecodeError, LoadError, PlaybackError, SynthesisError};
pub use playback::{PlaybackCompletion, PlaybackController, PlaybackOutcome, PlaybackState};
pub use session::{ReaderSession, ReaderSnapshot, ReadingSettingsPatch, SessionCommand};
pub use tts::{GeminiSynthesizer, SpeechSynthesizer, Voice};
