//! One chat session: the transcript plus the client that fills it.

use std::io::Cursor;

use manifest_core::{ImageContent, Transcript, TranscriptEntry};
use tracing::warn;

use crate::client::{QueryClient, QueryReply};
use crate::error::{ChatError, ClientError};
use crate::render::Render;

/// Caption attached to every image reply.
pub const IMAGE_CAPTION: &str = "Generated Visualization";

/// Session state for the chat client.
///
/// `ask` borrows the session mutably for the whole round trip, so a second
/// question cannot be submitted while one is in flight.
pub struct ChatSession {
    transcript: Transcript,
    client: QueryClient,
}

impl ChatSession {
    pub fn new(client: QueryClient) -> Self {
        Self {
            transcript: Transcript::new(),
            client,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    /// Record `question`, query the service and record exactly one reply.
    ///
    /// Service and transport failures become assistant text entries; only a
    /// rendering failure is returned as an error.
    pub async fn ask<R: Render + ?Sized>(
        &mut self,
        question: &str,
        renderer: &mut R,
    ) -> Result<&TranscriptEntry, ChatError> {
        let entry = self.transcript.push_user(question);
        renderer.render(entry)?;
        renderer.waiting()?;

        let reply = self.client.query(question).await;
        let entry = match reply {
            Ok(QueryReply::Answer(answer)) => self.transcript.push_assistant_text(answer),
            Ok(QueryReply::Image(bytes)) => match png_dimensions(&bytes) {
                Ok((width, height)) => self.transcript.push_assistant_image(ImageContent {
                    bytes,
                    width,
                    height,
                    caption: IMAGE_CAPTION.to_string(),
                }),
                Err(e) => {
                    warn!(error = %e, "image reply is not a decodable PNG");
                    self.transcript
                        .push_assistant_text(format!("Error decoding response: {e}"))
                }
            },
            Err(ClientError::Status(status)) => {
                warn!(%status, "query failed");
                self.transcript.push_assistant_text(format!(
                    "Error {}: Unable to process request.",
                    status.as_u16()
                ))
            }
            Err(ClientError::Network(e)) => {
                warn!(error = %e, "query did not reach the server");
                self.transcript
                    .push_assistant_text(format!("Network Error: {e}"))
            }
            Err(ClientError::Decode(e)) => {
                warn!(error = %e, "undecodable reply");
                self.transcript
                    .push_assistant_text(format!("Error decoding response: {e}"))
            }
        };
        renderer.render(entry)?;
        Ok(entry)
    }
}

fn png_dimensions(bytes: &[u8]) -> Result<(u32, u32), png::DecodingError> {
    let reader = png::Decoder::new(Cursor::new(bytes)).read_info()?;
    let info = reader.info();
    Ok((info.width, info.height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use manifest_chart::{Canvas, Rgb};
    use manifest_core::{EntryContent, Role};

    use crate::render::TerminalRenderer;

    /// Renderer that records what it was asked to show.
    #[derive(Default)]
    struct Recorder {
        shown: Vec<TranscriptEntry>,
        /// `shown.len()` at each `waiting` call.
        waited_after: Vec<usize>,
    }

    impl Render for Recorder {
        fn render(&mut self, entry: &TranscriptEntry) -> Result<(), ChatError> {
            self.shown.push(entry.clone());
            Ok(())
        }

        fn waiting(&mut self) -> Result<(), ChatError> {
            self.waited_after.push(self.shown.len());
            Ok(())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        Canvas::new(width, height, Rgb::SKY_BLUE).encode_png().unwrap()
    }

    fn session_for(server: &mockito::ServerGuard) -> ChatSession {
        let client = QueryClient::new(
            format!("{}/query/", server.url()),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        ChatSession::new(client)
    }

    fn last_text(session: &ChatSession) -> String {
        session
            .transcript()
            .last()
            .and_then(|e| e.content.as_text())
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_ask_records_answer() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer":"29.7"}"#)
            .create_async()
            .await;

        let mut session = session_for(&server);
        let mut recorder = Recorder::default();
        session.ask("average age?", &mut recorder).await.unwrap();

        let entries = session.transcript().entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].role, Role::User);
        assert_eq!(entries[0].content.as_text(), Some("average age?"));
        assert_eq!(entries[1].role, Role::Assistant);
        assert_eq!(entries[1].content.as_text(), Some("29.7"));
        assert_eq!(recorder.shown.len(), 2);
        assert_eq!(recorder.waited_after, vec![1]);
    }

    #[tokio::test]
    async fn test_ask_submits_question_as_typed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query/")
            .match_body(mockito::Matcher::Json(
                serde_json::json!({ "question": "  How many SURVIVED?  " }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer":"342"}"#)
            .create_async()
            .await;

        let mut session = session_for(&server);
        session
            .ask("  How many SURVIVED?  ", &mut Recorder::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(
            session.transcript().entries()[0].content.as_text(),
            Some("  How many SURVIVED?  ")
        );
    }

    #[tokio::test]
    async fn test_network_failure_keeps_earlier_entries() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer":"891"}"#)
            .create_async()
            .await;

        let mut session = session_for(&server);
        session.ask("how many rows?", &mut Recorder::default()).await.unwrap();
        let before: Vec<TranscriptEntry> = session.transcript().entries().to_vec();
        assert_eq!(before.len(), 2);

        // Same transcript, now pointed at a port nothing listens on.
        let ChatSession { transcript, .. } = session;
        let client =
            QueryClient::new("http://127.0.0.1:1/query/", Some(Duration::from_secs(2))).unwrap();
        let mut session = ChatSession { transcript, client };
        session.ask("and now?", &mut Recorder::default()).await.unwrap();

        let entries = session.transcript().entries();
        assert_eq!(entries.len(), before.len() + 2);
        for (kept, old) in entries.iter().zip(&before) {
            assert_eq!(kept.id, old.id);
            assert_eq!(kept.role, old.role);
            assert_eq!(kept.content.as_text(), old.content.as_text());
        }
        assert_eq!(entries[2].content.as_text(), Some("and now?"));
        let assistant: Vec<_> = entries[2..]
            .iter()
            .filter(|e| e.role == Role::Assistant)
            .collect();
        assert_eq!(assistant.len(), 1);
        assert!(last_text(&session).starts_with("Network Error: "));
    }

    #[tokio::test]
    async fn test_ask_image_survives_unwritable_image_dir() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png(8, 6))
            .create_async()
            .await;

        let file = tempfile::NamedTempFile::new().unwrap();
        let mut renderer = TerminalRenderer::new(Vec::new(), file.path().join("images"));
        let mut session = session_for(&server);
        let entry = session.ask("plot fares", &mut renderer).await.unwrap();
        assert!(entry.content.is_image());
        assert_eq!(session.transcript().len(), 2);

        let text = String::from_utf8(renderer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "user: plot fares");
        assert_eq!(lines[1], "Thinking...");
        assert!(lines[2].contains("8x6 image could not be saved: "));
    }

    #[tokio::test]
    async fn test_ask_records_image_with_dimensions() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png(16, 9))
            .create_async()
            .await;

        let mut session = session_for(&server);
        let mut recorder = Recorder::default();
        let entry = session.ask("plot ages", &mut recorder).await.unwrap();

        match &entry.content {
            EntryContent::Image(image) => {
                assert_eq!((image.width, image.height), (16, 9));
                assert_eq!(image.caption, IMAGE_CAPTION);
                assert_eq!(&image.bytes[1..4], b"PNG");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ask_status_error_entry() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .with_status(500)
            .with_body(r#"{"detail":"Error processing query: boom"}"#)
            .create_async()
            .await;

        let mut session = session_for(&server);
        session.ask("q", &mut Recorder::default()).await.unwrap();
        assert_eq!(last_text(&session), "Error 500: Unable to process request.");
    }

    #[tokio::test]
    async fn test_ask_corrupt_image_entry() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body("definitely not a png")
            .create_async()
            .await;

        let mut session = session_for(&server);
        session.ask("chart", &mut Recorder::default()).await.unwrap();
        assert_eq!(session.transcript().len(), 2);
        assert!(last_text(&session).starts_with("Error decoding response: "));
    }

    #[tokio::test]
    async fn test_ask_network_error_single_entry() {
        let client =
            QueryClient::new("http://127.0.0.1:1/query/", Some(Duration::from_secs(2))).unwrap();
        let mut session = ChatSession::new(client);
        let mut recorder = Recorder::default();
        session.ask("anyone there?", &mut recorder).await.unwrap();

        let entries = session.transcript().entries();
        assert_eq!(entries.len(), 2);
        assert!(last_text(&session).starts_with("Network Error: "));
        assert_eq!(recorder.shown.len(), 2);
    }

    #[tokio::test]
    async fn test_transcript_has_two_entries_per_question() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .match_body(mockito::Matcher::Regex("plot".to_string()))
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png(4, 4))
            .create_async()
            .await;
        server
            .mock("POST", "/query/")
            .match_body(mockito::Matcher::Regex("fail".to_string()))
            .with_status(503)
            .create_async()
            .await;
        server
            .mock("POST", "/query/")
            .match_body(mockito::Matcher::Regex("hello|bye".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"answer":"ok"}"#)
            .create_async()
            .await;

        let questions = ["plot ages", "fail please", "hello", "plot again", "bye"];
        let mut session = session_for(&server);
        let mut recorder = Recorder::default();
        for q in questions {
            session.ask(q, &mut recorder).await.unwrap();
        }

        let entries = session.transcript().entries();
        assert_eq!(entries.len(), 2 * questions.len());
        for (i, pair) in entries.chunks(2).enumerate() {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[0].content.as_text(), Some(questions[i]));
            assert_eq!(pair[1].role, Role::Assistant);
        }
        assert!(entries[1].content.is_image());
        assert_eq!(
            entries[3].content.as_text(),
            Some("Error 503: Unable to process request.")
        );
        assert_eq!(entries[5].content.as_text(), Some("ok"));
    }
}
