//! Client side of the line protocol.
//!
//! Each method consumes exactly the lines the server sends for one state.
//! The final reply is read until the server closes the connection, so the
//! client never depends on a terminator line that the server doesn't send.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tracing::debug;

use crate::error::ClientError;
use crate::protocol::{self, RecommendationLine};

/// What the server answered to a genre selection
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Recommendations {
        genre: String,
        lines: Vec<String>,
    },
    NoRecommendations,
    InvalidSelection,
}

impl Reply {
    /// Parsed recommendation lines; empty for the other replies
    pub fn recommendations(&self) -> Vec<RecommendationLine> {
        match self {
            Reply::Recommendations { lines, .. } => lines
                .iter()
                .filter_map(|line| protocol::parse_recommendation_line(line))
                .collect(),
            _ => Vec::new(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        debug!("Connected to {}", addr);
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }

    /// Read the welcome line
    pub async fn read_greeting(&mut self) -> Result<String> {
        self.expect_line(protocol::WELCOME, "welcome line").await
    }

    /// Read the prompt asking for a user id
    pub async fn read_id_prompt(&mut self) -> Result<String> {
        self.expect_line(protocol::USER_ID_PROMPT, "user id prompt").await
    }

    /// Send the user id and read the confirmation that follows
    pub async fn send_user_id(&mut self, user_id: &str) -> Result<String> {
        self.send_line(user_id).await?;
        self.expect_line(protocol::CATALOG_READY, "catalog confirmation")
            .await
    }

    /// Read the instruction line and the genre list up to `[END_OF_GENRES]`
    pub async fn read_menu(&mut self) -> Result<Vec<String>> {
        self.expect_line(protocol::GENRE_PROMPT, "genre prompt").await?;

        let mut genres = Vec::new();
        loop {
            let line = self.next_line("genre list").await?;
            if line == protocol::END_OF_GENRES {
                return Ok(genres);
            }
            match protocol::parse_genre_line(&line) {
                Some((_, genre)) => genres.push(genre),
                None => {
                    return Err(ClientError::UnexpectedLine {
                        expected: "genre line",
                        line,
                    });
                }
            }
        }
    }

    /// Send the selection and read everything until the server hangs up
    pub async fn select(mut self, selection: &str) -> Result<Reply> {
        self.send_line(selection).await?;

        let mut rest = String::new();
        self.reader.read_to_string(&mut rest).await?;
        let mut lines = rest.lines().map(str::to_string);

        let first = lines.next().ok_or(ClientError::UnexpectedEof {
            expected: "reply",
        })?;
        if first == protocol::INVALID_GENRE_INDEX {
            return Ok(Reply::InvalidSelection);
        }
        if first == protocol::NO_RECOMMENDATIONS {
            return Ok(Reply::NoRecommendations);
        }
        if let Some(genre) = first
            .strip_prefix(protocol::RECOMMENDATIONS_HEADER)
            .and_then(|genre| genre.strip_prefix(' '))
        {
            return Ok(Reply::Recommendations {
                genre: genre.to_string(),
                lines: lines.collect(),
            });
        }
        Err(ClientError::UnexpectedLine {
            expected: "reply header",
            line: first,
        })
    }

    /// Run the whole exchange in one go
    pub async fn request(addr: SocketAddr, user_id: &str, selection: &str) -> Result<Reply> {
        let mut client = Self::connect(addr).await?;
        client.read_greeting().await?;
        client.read_id_prompt().await?;
        client.send_user_id(user_id).await?;
        client.read_menu().await?;
        client.select(selection).await
    }

    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(format!("{}\n", line).as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Next line without its terminator
    async fn next_line(&mut self, expected: &'static str) -> Result<String> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::UnexpectedEof { expected });
        }
        let trimmed = line.trim_end_matches(['\r', '\n']).len();
        line.truncate(trimmed);
        Ok(line)
    }

    async fn expect_line(&mut self, text: &str, expected: &'static str) -> Result<String> {
        let line = self.next_line(expected).await?;
        if line != text {
            return Err(ClientError::UnexpectedLine { expected, line });
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_recommendations_parses_lines() {
        let reply = Reply::Recommendations {
            genre: "Comedy".to_string(),
            lines: vec![
                "1. Título: A, Géneros: Comedy, Calificación Promedio Combinada: 4.50".to_string(),
                "garbage".to_string(),
            ],
        };

        let parsed = reply.recommendations();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title, "A");
        assert_eq!(parsed[0].combined_avg, 4.5);

        assert!(Reply::InvalidSelection.recommendations().is_empty());
    }
}
