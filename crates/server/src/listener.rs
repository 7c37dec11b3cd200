//! TCP listener: one task per accepted connection.

use std::future::Future;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use tokio::io::{BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::SessionError;
use crate::service::RecommendationService;
use crate::session::Session;

/// Accepts clients and hands each one its own session task
pub struct Server {
    listener: TcpListener,
    service: RecommendationService,
}

impl Server {
    /// Bind the listening socket
    pub async fn bind(addr: SocketAddr, service: RecommendationService) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        Ok(Self { listener, service })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read local address")
    }

    /// Accept connections forever
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` completes.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        info!("Listening on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_session(stream, peer),
                    // Typically a per-connection failure (e.g. reset before accept)
                    Err(e) => error!("Connection error: {}", e),
                },
            }
        }
    }

    fn spawn_session(&self, stream: TcpStream, peer: SocketAddr) {
        let service = self.service.clone();
        let span = info_span!("session", %peer);

        tokio::spawn(
            async move {
                debug!("Connection accepted");
                let (read_half, write_half) = stream.into_split();
                let session = Session::new(
                    BufReader::new(read_half),
                    BufWriter::new(write_half),
                    service,
                );

                match session.run().await {
                    Ok(()) => debug!("Session finished"),
                    Err(SessionError::InvalidSelection { .. }) => {
                        debug!("Session closed after invalid selection")
                    }
                    Err(e) => warn!("Session ended with error: {}", e),
                }
            }
            .instrument(span),
        );
    }
}
