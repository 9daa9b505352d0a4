//! Reader state: the open book, the current page, presentation settings and
//! the read-aloud controls.
//!
//! Every navigation or book change stops playback first, so audio always
//! belongs to the page on screen.

use crate::book::{Book, BookFormat};
use crate::book_loader::{PdfExtractor, load_book};
use crate::config::{AppConfig, ReadingSettings, clamp_font_size, snap_line_height};
use crate::error::{LoadError, PlaybackError};
use crate::playback::{PlaybackCompletion, PlaybackController};
use crate::tts::Voice;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ReadingSettingsPatch {
    pub voice: Option<Voice>,
    pub font_size: Option<u32>,
    pub line_height: Option<f32>,
    pub serif: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReaderSnapshot {
    pub title: Option<String>,
    pub author: Option<String>,
    pub format: Option<BookFormat>,
    /// 1-based; zero when there is nothing to show.
    pub page_number: usize,
    pub total_pages: usize,
    pub page_text: String,
    pub is_blank: bool,
    pub is_reading: bool,
    pub settings: ReadingSettings,
    pub notification: Option<String>,
}

#[derive(Debug, Clone)]
pub enum SessionCommand {
    GetSnapshot,
    Open { path: PathBuf },
    NextPage,
    PrevPage,
    CloseBook,
    ReadAloud,
    StopReading,
    ApplySettings { patch: ReadingSettingsPatch },
    DismissNotification,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "reader_get_snapshot",
            Self::Open { .. } => "reader_open",
            Self::NextPage => "reader_next_page",
            Self::PrevPage => "reader_prev_page",
            Self::CloseBook => "reader_close_book",
            Self::ReadAloud => "reader_read_aloud",
            Self::StopReading => "reader_stop_reading",
            Self::ApplySettings { .. } => "reader_apply_settings",
            Self::DismissNotification => "reader_dismiss_notification",
        }
    }
}

#[derive(Debug)]
pub struct SessionEvent {
    pub action: &'static str,
    pub snapshot: ReaderSnapshot,
    /// Set when the command started read-aloud.
    pub completion: Option<PlaybackCompletion>,
}

/// A read-aloud request detached from the session, so callers can drive the
/// synthesis wait without holding the session.
pub struct ReadAloud {
    playback: Arc<PlaybackController>,
    text: String,
    voice: Voice,
}

impl ReadAloud {
    pub async fn run(self) -> Result<PlaybackCompletion, PlaybackError> {
        self.playback.speak(&self.text, self.voice).await
    }
}

pub struct ReaderSession {
    book: Option<Book>,
    current_page: usize,
    settings: ReadingSettings,
    page_size: usize,
    notification: Option<String>,
    playback: Arc<PlaybackController>,
    extractor: Arc<dyn PdfExtractor>,
}

impl ReaderSession {
    pub fn new(
        settings: ReadingSettings,
        page_size: usize,
        playback: Arc<PlaybackController>,
        extractor: Arc<dyn PdfExtractor>,
    ) -> Self {
        Self {
            book: None,
            current_page: 0,
            settings,
            page_size: page_size.max(1),
            notification: None,
            playback,
            extractor,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        playback: Arc<PlaybackController>,
        extractor: Arc<dyn PdfExtractor>,
    ) -> Self {
        Self::new(
            config.reading_settings(),
            config.page_size,
            playback,
            extractor,
        )
    }

    pub fn book(&self) -> Option<&Book> {
        self.book.as_ref()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn settings(&self) -> ReadingSettings {
        self.settings
    }

    pub fn notification(&self) -> Option<&str> {
        self.notification.as_deref()
    }

    pub fn is_reading(&self) -> bool {
        self.playback.is_active()
    }

    /// Load `path`, replacing any open book.
    pub fn open(&mut self, path: &Path) -> Result<(), LoadError> {
        self.playback.stop();
        match load_book(path, self.page_size, self.extractor.as_ref()) {
            Ok(book) => {
                info!(title = %book.title, pages = book.total_pages(), "Opened book");
                self.book = Some(book);
                self.current_page = 0;
                self.notification = None;
                Ok(())
            }
            Err(err) => {
                warn!(path = %path.display(), "Failed to open book: {err}");
                self.book = None;
                self.current_page = 0;
                self.notification = Some(err.user_message().to_string());
                Err(err)
            }
        }
    }

    pub fn next_page(&mut self) {
        let total = self.total_pages();
        if total == 0 || self.current_page + 1 >= total {
            return;
        }
        self.playback.stop();
        self.current_page += 1;
        debug!(page = self.current_page, "Next page");
    }

    pub fn prev_page(&mut self) {
        if self.total_pages() == 0 || self.current_page == 0 {
            return;
        }
        self.playback.stop();
        self.current_page -= 1;
        debug!(page = self.current_page, "Previous page");
    }

    pub fn close_book(&mut self) {
        self.playback.stop();
        if let Some(book) = self.book.take() {
            info!(title = %book.title, "Closed book");
        }
        self.current_page = 0;
    }

    /// Prepare read-aloud of the current page.
    ///
    /// `None` when there is no page to read or reading is already underway.
    pub fn begin_read_aloud(&self) -> Option<ReadAloud> {
        if self.is_reading() {
            debug!("Read-aloud already in progress");
            return None;
        }
        let page = self.book.as_ref()?.page(self.current_page)?;
        Some(ReadAloud {
            playback: Arc::clone(&self.playback),
            text: page.text.clone(),
            voice: self.settings.voice,
        })
    }

    /// Surface a failed read-aloud to the user. The book stays open.
    pub fn record_playback_failure(&mut self, err: &PlaybackError) {
        warn!("Read-aloud failed: {err}");
        self.notification = Some(err.user_message().to_string());
    }

    pub async fn read_aloud(&mut self) -> Option<PlaybackCompletion> {
        let request = self.begin_read_aloud()?;
        match request.run().await {
            Ok(completion) => Some(completion),
            Err(err) => {
                self.record_playback_failure(&err);
                None
            }
        }
    }

    pub fn stop_reading(&mut self) {
        self.playback.stop();
    }

    pub fn apply_settings(&mut self, patch: ReadingSettingsPatch) {
        if let Some(voice) = patch.voice {
            self.settings.voice = voice;
        }
        if let Some(font_size) = patch.font_size {
            self.settings.font_size = clamp_font_size(font_size);
        }
        if let Some(line_height) = patch.line_height {
            self.settings.line_height = snap_line_height(line_height);
        }
        if let Some(serif) = patch.serif {
            self.settings.serif = serif;
        }
        debug!(settings = ?self.settings, "Applied reading settings");
    }

    pub fn dismiss_notification(&mut self) {
        self.notification = None;
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        let page = self
            .book
            .as_ref()
            .and_then(|book| book.page(self.current_page));
        ReaderSnapshot {
            title: self.book.as_ref().map(|book| book.title.clone()),
            author: self.book.as_ref().map(|book| book.author.clone()),
            format: self.book.as_ref().map(|book| book.format),
            page_number: page.map(|page| page.number).unwrap_or(0),
            total_pages: self.total_pages(),
            page_text: page.map(|page| page.text.clone()).unwrap_or_default(),
            is_blank: page.is_some_and(|page| page.is_blank()),
            is_reading: self.is_reading(),
            settings: self.settings,
            notification: self.notification.clone(),
        }
    }

    pub async fn apply_command(&mut self, command: SessionCommand) -> SessionEvent {
        let action = command.action();
        let mut completion = None;
        match command {
            SessionCommand::GetSnapshot => {}
            SessionCommand::Open { path } => {
                let _ = self.open(&path);
            }
            SessionCommand::NextPage => self.next_page(),
            SessionCommand::PrevPage => self.prev_page(),
            SessionCommand::CloseBook => self.close_book(),
            SessionCommand::ReadAloud => completion = self.read_aloud().await,
            SessionCommand::StopReading => self.stop_reading(),
            SessionCommand::ApplySettings { patch } => self.apply_settings(patch),
            SessionCommand::DismissNotification => self.dismiss_notification(),
        }
        SessionEvent {
            action,
            snapshot: self.snapshot(),
            completion,
        }
    }

    fn total_pages(&self) -> usize {
        self.book.as_ref().map_or(0, Book::total_pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book_loader::ExtractedPage;
    use crate::error::{LOAD_FAILED_MESSAGE, SPEECH_FAILED_MESSAGE};
    use crate::playback::test_support::{FakeOutput, FakeSynthesizer};
    use crate::playback::{PlaybackOutcome, PlaybackState};
    use std::fs;

    struct NoPdf;

    impl PdfExtractor for NoPdf {
        fn extract_pages(&self, _data: &[u8]) -> Result<Vec<ExtractedPage>, LoadError> {
            Err(LoadError::Extraction("no pdf support in tests".into()))
        }
    }

    struct Harness {
        session: ReaderSession,
        synth: Arc<FakeSynthesizer>,
        output: Arc<FakeOutput>,
        playback: Arc<PlaybackController>,
        dir: tempfile::TempDir,
    }

    fn harness(synth: FakeSynthesizer, page_size: usize) -> Harness {
        let synth = Arc::new(synth);
        let output = Arc::new(FakeOutput::default());
        let playback = Arc::new(PlaybackController::new(synth.clone(), output.clone()));
        let session = ReaderSession::new(
            ReadingSettings::default(),
            page_size,
            playback.clone(),
            Arc::new(NoPdf),
        );
        Harness {
            session,
            synth,
            output,
            playback,
            dir: tempfile::tempdir().unwrap(),
        }
    }

    impl Harness {
        fn open_text(&mut self, name: &str, text: &str) {
            let path = self.dir.path().join(name);
            fs::write(&path, text).unwrap();
            self.session.open(&path).unwrap();
        }
    }

    #[test]
    fn navigation_stays_within_bounds() {
        let mut h = harness(FakeSynthesizer::ok(), 3);
        h.open_text("abc.txt", "aaabbbccc");
        assert_eq!(h.session.snapshot().page_text, "aaa");

        h.session.prev_page();
        assert_eq!(h.session.current_page(), 0);
        h.session.next_page();
        h.session.next_page();
        h.session.next_page();
        let snap = h.session.snapshot();
        assert_eq!(snap.page_number, 3);
        assert_eq!(snap.total_pages, 3);
        assert_eq!(snap.page_text, "ccc");
        assert_eq!(snap.title.as_deref(), Some("abc"));
    }

    #[test]
    fn zero_page_book_is_inert() {
        let mut h = harness(FakeSynthesizer::ok(), 2000);
        h.open_text("empty.txt", "");
        h.session.next_page();
        h.session.prev_page();
        let snap = h.session.snapshot();
        assert_eq!(snap.total_pages, 0);
        assert_eq!(snap.page_number, 0);
        assert!(snap.title.is_some());
        assert!(h.session.begin_read_aloud().is_none());
    }

    #[tokio::test]
    async fn read_aloud_speaks_current_page_with_selected_voice() {
        let mut h = harness(FakeSynthesizer::ok(), 5);
        h.open_text("two.txt", "firstsecond");
        h.session.next_page();
        h.session.apply_settings(ReadingSettingsPatch {
            voice: Some(Voice::Fenrir),
            ..ReadingSettingsPatch::default()
        });

        let completion = h.session.read_aloud().await.unwrap();
        assert!(h.session.snapshot().is_reading);
        assert_eq!(
            h.synth.calls.lock().as_slice(),
            &[("secon".to_string(), Voice::Fenrir)]
        );

        assert!(h.output.drain());
        assert_eq!(completion.finished().await, PlaybackOutcome::Finished);
        assert!(!h.session.is_reading());
    }

    #[tokio::test]
    async fn read_aloud_is_ignored_while_reading_or_without_book() {
        let mut h = harness(FakeSynthesizer::ok(), 2000);
        assert!(h.session.read_aloud().await.is_none());

        h.open_text("a.txt", "hello");
        let _first = h.session.read_aloud().await.unwrap();
        assert!(h.session.read_aloud().await.is_none());
        assert_eq!(h.synth.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn navigation_stops_playback() {
        let mut h = harness(FakeSynthesizer::ok(), 1);
        h.open_text("ab.txt", "ab");
        let completion = h.session.read_aloud().await.unwrap();

        h.session.next_page();
        assert_eq!(h.playback.state(), PlaybackState::Idle);
        assert_eq!(*h.output.stopped.lock(), 1);
        assert_eq!(completion.finished().await, PlaybackOutcome::Stopped);
        assert_eq!(h.session.snapshot().page_text, "b");
    }

    #[tokio::test]
    async fn boundary_navigation_leaves_playback_alone() {
        let mut h = harness(FakeSynthesizer::ok(), 1);
        h.open_text("ab.txt", "ab");
        let _completion = h.session.read_aloud().await.unwrap();

        h.session.prev_page();
        assert_eq!(h.playback.state(), PlaybackState::Playing);
        assert_eq!(*h.output.stopped.lock(), 0);
    }

    #[tokio::test]
    async fn speech_failure_keeps_book_and_notifies() {
        let mut h = harness(FakeSynthesizer::failing(), 2000);
        h.open_text("a.txt", "hello");
        assert!(h.session.read_aloud().await.is_none());

        let snap = h.session.snapshot();
        assert_eq!(snap.notification.as_deref(), Some(SPEECH_FAILED_MESSAGE));
        assert_eq!(snap.page_text, "hello");
        assert!(!snap.is_reading);

        h.session.dismiss_notification();
        assert!(h.session.notification().is_none());
    }

    #[tokio::test]
    async fn failed_open_clears_book_and_stops_playback() {
        let mut h = harness(FakeSynthesizer::ok(), 2000);
        h.open_text("a.txt", "hello");
        let completion = h.session.read_aloud().await.unwrap();

        let bad = h.dir.path().join("scan.pdf");
        fs::write(&bad, b"%PDF").unwrap();
        assert!(h.session.open(&bad).is_err());

        let snap = h.session.snapshot();
        assert!(snap.title.is_none());
        assert_eq!(snap.notification.as_deref(), Some(LOAD_FAILED_MESSAGE));
        assert_eq!(completion.finished().await, PlaybackOutcome::Stopped);
    }

    #[tokio::test]
    async fn close_book_stops_and_resets() {
        let mut h = harness(FakeSynthesizer::ok(), 1);
        h.open_text("ab.txt", "ab");
        h.session.next_page();
        let _completion = h.session.read_aloud().await.unwrap();

        h.session.close_book();
        assert!(h.session.book().is_none());
        assert_eq!(h.session.current_page(), 0);
        assert!(!h.session.is_reading());
    }

    #[test]
    fn settings_patch_is_clamped() {
        let mut h = harness(FakeSynthesizer::ok(), 2000);
        h.session.apply_settings(ReadingSettingsPatch {
            font_size: Some(40),
            line_height: Some(1.9),
            serif: Some(false),
            ..ReadingSettingsPatch::default()
        });
        let settings = h.session.settings();
        assert_eq!(settings.font_size, 32);
        assert_eq!(settings.line_height, 2.0);
        assert!(!settings.serif);
        assert_eq!(settings.voice, Voice::Kore);
    }

    #[tokio::test]
    async fn session_command_dispatch_emits_expected_action_and_snapshot() {
        let mut h = harness(FakeSynthesizer::ok(), 1);
        let path = h.dir.path().join("xyz.txt");
        fs::write(&path, "xyz").unwrap();

        let event = h
            .session
            .apply_command(SessionCommand::Open { path })
            .await;
        assert_eq!(event.action, "reader_open");
        assert_eq!(event.snapshot.total_pages, 3);

        let event = h.session.apply_command(SessionCommand::NextPage).await;
        assert_eq!(event.action, "reader_next_page");
        assert_eq!(event.snapshot.page_number, 2);

        let event = h.session.apply_command(SessionCommand::ReadAloud).await;
        assert_eq!(event.action, "reader_read_aloud");
        assert!(event.snapshot.is_reading);
        assert!(event.completion.is_some());

        let event = h.session.apply_command(SessionCommand::StopReading).await;
        assert_eq!(event.action, "reader_stop_reading");
        assert!(!event.snapshot.is_reading);
        assert!(event.completion.is_none());
    }
}
