//! # Connection Handler
//!
//! Drives one client through the line protocol. States run strictly in
//! order and never go back:
//!
//! ```text
//! Greeting -> Identify -> CatalogReady -> MenuOffer -> Selection -> Recommend -> Close
//!                                                          |
//!                                                          +-> (invalid index) Close
//! ```
//!
//! Reads have no timeout. A silent client only holds its own task: the
//! aggregation store is locked just for the merge and the read-back, never
//! while waiting on the network.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::error::SessionError;
use crate::protocol;
use crate::service::RecommendationService;

/// Longest input line kept; anything longer reads as an empty line
pub const MAX_LINE_BYTES: u64 = 1024;

/// Protocol state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Greeting,
    Identify,
    CatalogReady,
    MenuOffer,
    Selection,
    Recommend,
    Close,
}

/// One client connection
///
/// Generic over the transport so the same state machine runs on TCP halves
/// and on in-memory pipes.
pub struct Session<R, W> {
    reader: R,
    writer: W,
    service: RecommendationService,
    state: SessionState,
    menu: Vec<String>,
    selected: Option<String>,
}

impl<R, W> Session<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, service: RecommendationService) -> Self {
        Self {
            reader,
            writer,
            service,
            state: SessionState::Greeting,
            menu: Vec::new(),
            selected: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion and close the write side.
    ///
    /// Returns `InvalidSelection` after the client has been told, and
    /// `Transport` when the connection fails. The write side is shut down
    /// on every path that still has a working connection.
    pub async fn run(mut self) -> Result<(), SessionError> {
        let result = self.drive().await;
        if !matches!(result, Err(SessionError::Transport(_))) {
            self.writer.shutdown().await?;
        }
        result
    }

    async fn drive(&mut self) -> Result<(), SessionError> {
        while self.state != SessionState::Close {
            self.state = self.step().await?;
        }
        Ok(())
    }

    /// Perform the current state's work and return the next state
    async fn step(&mut self) -> Result<SessionState, SessionError> {
        let next = match self.state {
            SessionState::Greeting => {
                self.send(protocol::WELCOME).await?;
                SessionState::Identify
            }
            SessionState::Identify => {
                self.send(protocol::USER_ID_PROMPT).await?;
                let user_id = protocol::parse_integer(&self.read_line().await?);
                debug!(user_id, "Client identified");
                SessionState::CatalogReady
            }
            SessionState::CatalogReady => {
                self.send(protocol::CATALOG_READY).await?;
                SessionState::MenuOffer
            }
            SessionState::MenuOffer => {
                self.offer_menu().await?;
                SessionState::Selection
            }
            SessionState::Selection => {
                self.read_selection().await?;
                SessionState::Recommend
            }
            SessionState::Recommend => {
                self.send_recommendations().await?;
                SessionState::Close
            }
            SessionState::Close => SessionState::Close,
        };
        Ok(next)
    }

    async fn offer_menu(&mut self) -> Result<(), SessionError> {
        self.menu = self.service.genre_menu();

        self.writer
            .write_all(format!("{}\n", protocol::GENRE_PROMPT).as_bytes())
            .await?;
        for (i, genre) in self.menu.iter().enumerate() {
            let line = protocol::format_genre_line(i + 1, genre);
            self.writer.write_all(format!("{}\n", line).as_bytes()).await?;
        }
        self.writer.flush().await?;

        self.send(protocol::END_OF_GENRES).await
    }

    async fn read_selection(&mut self) -> Result<(), SessionError> {
        let index = protocol::parse_integer(&self.read_line().await?);
        let menu_len = self.menu.len();

        let genre = usize::try_from(index)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.menu.get(i));

        match genre {
            Some(genre) => {
                info!(index, genre = %genre, "Genre selected");
                self.selected = Some(genre.clone());
                Ok(())
            }
            None => {
                info!(index, menu_len, "Invalid genre selection");
                self.send(protocol::INVALID_GENRE_INDEX).await?;
                self.state = SessionState::Close;
                Err(SessionError::InvalidSelection { index, menu_len })
            }
        }
    }

    async fn send_recommendations(&mut self) -> Result<(), SessionError> {
        // Only reachable after a successful selection
        let Some(genre) = self.selected.clone() else {
            return Ok(());
        };

        match self.service.recommend(&genre) {
            Some(records) => {
                let mut reply = format!("{}\n", protocol::format_recommendations_header(&genre));
                for (i, record) in records.iter().enumerate() {
                    reply.push_str(&protocol::format_recommendation_line(i + 1, record));
                    reply.push('\n');
                }
                self.writer.write_all(reply.as_bytes()).await?;
                self.writer.flush().await?;
            }
            None => self.send(protocol::NO_RECOMMENDATIONS).await?,
        }
        Ok(())
    }

    /// Write one line and flush it
    async fn send(&mut self, line: &str) -> Result<(), SessionError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read one line; end of stream reads as an empty line.
    ///
    /// Invalid UTF-8 is replaced rather than rejected, and a line longer than
    /// `MAX_LINE_BYTES` is drained and read as empty, so bad input only ever
    /// parses to 0.
    async fn read_line(&mut self) -> Result<String, SessionError> {
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut buf)
            .await?;

        if read as u64 == MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            debug!(limit = MAX_LINE_BYTES, "Discarding oversized input line");
            self.discard_line().await?;
            return Ok(String::new());
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Skip the rest of the current line without buffering it
    async fn discard_line(&mut self) -> Result<(), SessionError> {
        let mut chunk = Vec::new();
        loop {
            chunk.clear();
            let read = (&mut self.reader)
                .take(MAX_LINE_BYTES)
                .read_until(b'\n', &mut chunk)
                .await?;
            if read == 0 || chunk.last() == Some(&b'\n') {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use catalog::{Catalog, Movie, Rating};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, duplex, split};

    fn build_service() -> RecommendationService {
        let mut catalog = Catalog::new();
        catalog.insert_movie(Movie {
            id: 1,
            title: "A".to_string(),
            genres: vec!["Comedy".to_string()],
        });
        catalog.insert_movie(Movie {
            id: 2,
            title: "B".to_string(),
            genres: vec!["Comedy".to_string(), "Drama".to_string()],
        });
        for (movie_id, rating) in [(1, 4.0), (1, 5.0), (2, 3.0)] {
            catalog.insert_rating(Rating {
                user_id: 7,
                movie_id,
                rating,
            });
        }
        catalog.compute_movie_stats();
        RecommendationService::new(Arc::new(catalog), 15, 5)
    }

    /// Feed `input` to a session and collect everything it writes
    async fn transcript(
        service: RecommendationService,
        input: impl AsRef<[u8]>,
    ) -> (String, Result<(), SessionError>) {
        let (mut client, server) = duplex(64 * 1024);
        let (read_half, write_half) = split(server);
        let session = Session::new(BufReader::new(read_half), write_half, service);
        let handle = tokio::spawn(session.run());

        client.write_all(input.as_ref()).await.unwrap();
        client.shutdown().await.unwrap();
        let mut output = String::new();
        client.read_to_string(&mut output).await.unwrap();

        (output, handle.await.unwrap())
    }

    #[tokio::test]
    async fn test_full_transcript() {
        let (output, result) = transcript(build_service(), "42\n1\n").await;
        assert!(result.is_ok());

        let expected = [
            protocol::WELCOME,
            protocol::USER_ID_PROMPT,
            protocol::CATALOG_READY,
            protocol::GENRE_PROMPT,
            "1. Comedy",
            "2. Drama",
            protocol::END_OF_GENRES,
            "Películas recomendadas combinadas para el género: Comedy",
            "1. Título: A, Géneros: Comedy, Calificación Promedio Combinada: 4.50",
            "2. Título: B, Géneros: Comedy, Drama, Calificación Promedio Combinada: 3.00",
        ];
        assert_eq!(output, format!("{}\n", expected.join("\n")));
    }

    #[tokio::test]
    async fn test_bad_user_id_is_ignored() {
        let (output, result) = transcript(build_service(), "not-a-number\n2\n").await;
        assert!(result.is_ok());
        assert!(output.contains("Películas recomendadas combinadas para el género: Drama"));
    }

    #[tokio::test]
    async fn test_invalid_selection_closes_without_recommending() {
        let service = build_service();

        for input in ["1\n0\n", "1\n3\n", "1\n-4\n", "1\nx\n"] {
            let (output, result) = transcript(service.clone(), input).await;

            assert!(matches!(
                result,
                Err(SessionError::InvalidSelection { menu_len: 2, .. })
            ));
            assert!(output.ends_with(&format!("{}\n", protocol::INVALID_GENRE_INDEX)));
            assert!(!output.contains(protocol::RECOMMENDATIONS_HEADER));
        }
        assert_eq!(service.store().genre_count(), 0);
    }

    #[tokio::test]
    async fn test_non_utf8_user_id_reads_as_zero() {
        let (output, result) = transcript(build_service(), b"\xff\n1\n").await;

        assert!(result.is_ok());
        assert!(output.contains(protocol::END_OF_GENRES));
        assert!(output.contains("Películas recomendadas combinadas para el género: Comedy"));
    }

    #[tokio::test]
    async fn test_non_utf8_selection_is_invalid() {
        let service = build_service();
        let (output, result) = transcript(service.clone(), b"42\n\xff\xfe\n").await;

        assert!(matches!(
            result,
            Err(SessionError::InvalidSelection { index: 0, menu_len: 2 })
        ));
        assert!(output.ends_with(&format!("{}\n", protocol::INVALID_GENRE_INDEX)));
        assert_eq!(service.store().genre_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_user_id_is_drained() {
        // The overflow must not leak into the selection read
        let input = format!("{}\n2\n", "7".repeat(MAX_LINE_BYTES as usize * 3));
        let (output, result) = transcript(build_service(), input).await;

        assert!(result.is_ok());
        assert!(output.contains("Películas recomendadas combinadas para el género: Drama"));
    }

    #[tokio::test]
    async fn test_oversized_selection_is_invalid() {
        let service = build_service();
        let input = format!("1\n{}\n", "1".repeat(MAX_LINE_BYTES as usize + 1));
        let (output, result) = transcript(service.clone(), input).await;

        assert!(matches!(result, Err(SessionError::InvalidSelection { index: 0, .. })));
        assert!(output.ends_with(&format!("{}\n", protocol::INVALID_GENRE_INDEX)));
        assert_eq!(service.store().genre_count(), 0);
    }

    #[tokio::test]
    async fn test_client_hangs_up_before_selecting() {
        // End of stream reads as an empty line, which is not a valid index
        let (output, result) = transcript(build_service(), "5\n").await;

        assert!(matches!(result, Err(SessionError::InvalidSelection { index: 0, .. })));
        assert!(output.contains(protocol::END_OF_GENRES));
    }

    #[tokio::test]
    async fn test_empty_catalog_has_empty_menu() {
        let service = RecommendationService::new(Arc::new(Catalog::new()), 15, 5);
        let (output, result) = transcript(service, "1\n1\n").await;

        assert!(matches!(result, Err(SessionError::InvalidSelection { index: 1, menu_len: 0 })));
        assert!(output.contains(&format!(
            "{}\n{}\n",
            protocol::GENRE_PROMPT,
            protocol::END_OF_GENRES
        )));
    }

    #[tokio::test]
    async fn test_session_starts_in_greeting() {
        let (_client, server) = duplex(1024);
        let (read_half, write_half) = split(server);
        let session = Session::new(BufReader::new(read_half), write_half, build_service());
        assert_eq!(session.state(), SessionState::Greeting);
    }
}
