//! The application state controller.
//!
//! `Session` owns the load -> parse -> analyze -> chat -> playback lifecycle
//! and every piece of in-memory state: the current table, the current
//! analysis, the open chat session, the transcript, and the playback
//! controller. Nothing is persisted; loading a new file discards everything
//! from the previous one. All failures are terminal for that one operation
//! and leave the rest of the session usable.

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::TabletalkConfig;
use crate::error::{Result, TableError, TabletalkError};
use crate::export;
use crate::gemini::analysis::AnalysisResult;
use crate::gemini::chat::ChatSession;
use crate::gemini::GeminiClient;
use crate::playback::PlaybackController;
use crate::table::Table;
use crate::types::Message;

/// Owns the upload -> analyze -> chat pipeline state.
pub struct Session {
    config: TabletalkConfig,
    client: GeminiClient,
    table: Option<Table>,
    analysis: Option<AnalysisResult>,
    chat: Option<ChatSession>,
    transcript: Vec<Message>,
    playback: PlaybackController,
}

impl Session {
    /// Create a session from configuration. Fails when no API key can be
    /// resolved.
    pub fn new(config: TabletalkConfig) -> Result<Self> {
        let client = GeminiClient::new(&config.gemini)?;
        Ok(Self {
            config,
            client,
            table: None,
            analysis: None,
            chat: None,
            transcript: Vec::new(),
            playback: PlaybackController::new(),
        })
    }

    /// The currently loaded table, if any.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// The current analysis result, if any.
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.analysis.as_ref()
    }

    /// The chat transcript in order.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Whether the given message is currently playing.
    pub fn is_playing(&self, id: Uuid) -> bool {
        self.playback.playing() == Some(id)
    }

    /// Load a CSV file and run the full pipeline: size gate, parse,
    /// analyze, open a fresh chat session.
    ///
    /// Rejections by the extension filter or the size ceiling happen before
    /// any previous state is touched. Once the new file parses, the old
    /// table, analysis, chat session, and transcript are discarded; an
    /// analysis failure then leaves the new table loaded with no analysis.
    #[instrument(skip(self))]
    pub async fn load_file(&mut self, path: &Path) -> Result<&AnalysisResult> {
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            return Err(TableError::NotCsv {
                path: path.to_path_buf(),
            }
            .into());
        }

        let size = tokio::fs::metadata(path).await?.len();
        let limit = self.config.limits.max_file_bytes;
        if size > limit {
            return Err(TableError::TooLarge { size, limit }.into());
        }

        let text = tokio::fs::read_to_string(path).await?;
        let table = Table::parse(&text)?;
        info!(rows = table.row_count(), cols = table.headers.len(), "File parsed");

        // The new file is accepted: discard everything from the old one.
        self.stop_playback();
        self.analysis = None;
        self.chat = None;
        self.transcript.clear();

        let outcome = self.client.analyze(&table, self.config.limits.sample_rows).await;
        self.table = Some(table);
        let result = outcome?;
        info!(
            insights = result.key_insights.len(),
            charts = result.chart_parameters.len(),
            "Analysis complete"
        );

        self.chat = Some(ChatSession::open(
            self.client.clone(),
            &result.chat_context(),
        ));
        Ok(self.analysis.insert(result))
    }

    /// Send one chat message and return the assistant reply.
    ///
    /// The user message is appended optimistically and removed again if the
    /// exchange fails, so a failed send leaves the transcript exactly as it
    /// was. The reply is returned by value so callers can keep using the
    /// session while holding it.
    #[instrument(skip(self, text))]
    pub async fn send_chat(&mut self, text: &str) -> Result<Message> {
        let chat = self.chat.as_mut().ok_or(TabletalkError::NoChatSession)?;

        self.transcript.push(Message::user(text));

        match chat.send(text).await {
            Ok(reply) => {
                debug!(
                    input_tokens = reply.usage.input_tokens,
                    output_tokens = reply.usage.output_tokens,
                    "Chat exchange complete"
                );
                let message = Message::assistant(reply.text);
                self.transcript.push(message.clone());
                Ok(message)
            }
            Err(e) => {
                warn!(error = %e, "Chat send failed; rolling back user message");
                self.transcript.pop();
                Err(e.into())
            }
        }
    }

    /// Synthesize and play one assistant message. Any current playback is
    /// stopped first.
    pub async fn play_message(&mut self, id: Uuid) -> Result<()> {
        let message = self
            .transcript
            .iter()
            .find(|m| m.id == id)
            .ok_or(TabletalkError::UnknownMessage { id })?;
        if !message.is_speakable() {
            return Err(TabletalkError::NotSpeakable { id });
        }

        let text = message.text.clone();
        self.playback.play(id, &text, &self.client).await?;
        Ok(())
    }

    /// Stop playback, if any.
    pub fn stop_playback(&mut self) {
        self.playback.stop();
    }

    /// Export the current analysis as a PDF report. Returns the path
    /// written.
    pub fn export_report(&self, path: Option<&Path>) -> Result<PathBuf> {
        let analysis = self.analysis.as_ref().ok_or(TabletalkError::NoAnalysis)?;
        let table = self.table.as_ref().ok_or(TabletalkError::NoTable)?;

        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(export::DEFAULT_REPORT_NAME));
        export::write_report(&path, analysis, table, self.config.limits.preview_rows)?;
        info!(path = %path.display(), "Report exported");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeminiConfig;
    use crate::types::Sender;
    use std::io::Write;

    /// A session wired to a closed local port: construction succeeds, every
    /// network call fails fast.
    fn offline_session() -> Session {
        let config = TabletalkConfig {
            gemini: GeminiConfig {
                api_key: Some("test-key".to_string()),
                base_url: Some("http://127.0.0.1:9".to_string()),
                ..GeminiConfig::default()
            },
            ..TabletalkConfig::default()
        };
        Session::new(config).unwrap()
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_rejects_non_csv() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_file(&dir, "data.txt", b"a,b\n1,2");

        let mut session = offline_session();
        let result = session.load_file(&path).await;
        assert!(matches!(
            result,
            Err(TabletalkError::Table(TableError::NotCsv { .. }))
        ));
    }

    #[tokio::test]
    async fn test_oversize_file_rejected_before_parse_and_state_untouched() {
        let dir = tempfile::TempDir::new().unwrap();
        let big = vec![b'a'; 21 * 1024 * 1024];
        let path = write_file(&dir, "big.csv", &big);

        let mut session = offline_session();
        // Seed prior state to prove it survives the rejection.
        session.table = Some(Table::parse("old\n1").unwrap());
        session.transcript.push(Message::user("earlier question"));

        let result = session.load_file(&path).await;
        assert!(matches!(
            result,
            Err(TabletalkError::Table(TableError::TooLarge { .. }))
        ));
        assert_eq!(session.table().unwrap().headers, vec!["old"]);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_file_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_file(&dir, "empty.csv", b"\n  \n");

        let mut session = offline_session();
        let result = session.load_file(&path).await;
        assert!(matches!(
            result,
            Err(TabletalkError::Table(TableError::Empty))
        ));
    }

    #[tokio::test]
    async fn test_parse_commits_then_analysis_failure_surfaces() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_file(&dir, "data.csv", b"a,b\n1,2\n3,4");

        let mut session = offline_session();
        session.transcript.push(Message::user("stale"));

        // Parses fine, then the analysis call fails (no server).
        let result = session.load_file(&path).await;
        assert!(matches!(result, Err(TabletalkError::Gemini(_))));

        // The new table replaced the old state; no analysis, no chat.
        assert_eq!(session.table().unwrap().row_count(), 2);
        assert!(session.analysis().is_none());
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_send_chat_without_session_fails_cleanly() {
        let mut session = offline_session();
        let result = session.send_chat("hello").await;
        assert!(matches!(result, Err(TabletalkError::NoChatSession)));
        assert!(session.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_failed_chat_send_rolls_back_transcript() {
        let mut session = offline_session();
        session.chat = Some(ChatSession::open(session.client.clone(), "context"));
        session.transcript.push(Message::assistant("prior reply"));

        let result = session.send_chat("follow-up?").await;
        assert!(result.is_err());

        // Exactly the pre-send transcript, no provisional leftovers.
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.transcript()[0].text, "prior reply");
        // The session object itself is still there for the next attempt.
        assert!(session.chat.is_some());
    }

    #[tokio::test]
    async fn test_send_chat_reply_is_owned() {
        // Callers hold the reply while continuing to use the session, so
        // the returned message must not borrow the transcript.
        let mut session = offline_session();
        session.chat = Some(ChatSession::open(session.client.clone(), "context"));

        let result = session.send_chat("q").await;
        let len = session.transcript().len();
        assert!(result.is_err());
        assert_eq!(len, 0);
    }

    #[tokio::test]
    async fn test_play_unknown_message() {
        let mut session = offline_session();
        let id = Uuid::new_v4();
        let result = session.play_message(id).await;
        assert!(matches!(
            result,
            Err(TabletalkError::UnknownMessage { .. })
        ));
    }

    #[tokio::test]
    async fn test_play_user_message_refused() {
        let mut session = offline_session();
        session.transcript.push(Message::user("me"));
        let id = session.transcript[0].id;

        let result = session.play_message(id).await;
        assert!(matches!(result, Err(TabletalkError::NotSpeakable { .. })));
        assert_eq!(session.transcript[0].sender, Sender::User);
    }

    #[tokio::test]
    async fn test_play_failure_resets_marker() {
        let mut session = offline_session();
        session.transcript.push(Message::assistant("speak me"));
        let id = session.transcript[0].id;

        // Synthesis hits the closed port and fails; marker must be clear.
        let result = session.play_message(id).await;
        assert!(matches!(result, Err(TabletalkError::Playback(_))));
        assert!(!session.is_playing(id));
    }

    #[tokio::test]
    async fn test_export_without_analysis_fails() {
        let session = offline_session();
        let result = session.export_report(None);
        assert!(matches!(result, Err(TabletalkError::NoAnalysis)));
    }
}
