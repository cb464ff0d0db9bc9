//! # TCP Server
//!
//! Line-delimited JSON over TCP. Each connection is one session: the
//! handler is created on accept and dropped on disconnect, which releases
//! whatever lock the client still holds.
//!
//! Requests run on the blocking pool since `lock` parks the calling thread
//! until the slot frees up.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use super::config::ServerConfig;
use crate::api::SessionHandler;
use crate::observability::{log_event_at, log_event_with_fields, Event, Severity};
use crate::session::SessionCoordinator;

pub struct Server {
    config: ServerConfig,
    coordinator: Arc<SessionCoordinator>,
}

impl Server {
    pub fn new(config: ServerConfig, coordinator: Arc<SessionCoordinator>) -> Self {
        Self { config, coordinator }
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Bind the configured address
    pub async fn bind(&self) -> io::Result<TcpListener> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("Invalid socket address: {}", e)))?;
        TcpListener::bind(addr).await
    }

    /// Bind and serve until the listener fails
    pub async fn start(self) -> io::Result<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accept connections on an already-bound listener
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        let local = listener.local_addr()?.to_string();
        log_event_with_fields(Event::ServerListening, &[("addr", local.as_str())]);

        loop {
            let (stream, peer) = listener.accept().await?;
            let coordinator = self.coordinator.clone();
            tokio::spawn(async move {
                let peer = peer.to_string();
                if let Err(e) = handle_connection(stream, coordinator).await {
                    let error = e.to_string();
                    log_event_at(
                        Severity::Warn,
                        Event::ConnectionFailed,
                        &[("peer", peer.as_str()), ("error", error.as_str())],
                    );
                }
            });
        }
    }
}

/// Serve one client until it disconnects
pub async fn handle_connection(stream: TcpStream, coordinator: Arc<SessionCoordinator>) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();
    let handler = Arc::new(SessionHandler::new(coordinator));

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let worker = handler.clone();
        let response = tokio::task::spawn_blocking(move || worker.handle(&line).to_json())
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Request task failed: {}", e)))?;

        write_half.write_all(response.as_bytes()).await?;
        write_half.write_all(b"\n").await?;
        write_half.flush().await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::Unrestricted;
    use crate::schema::Schema;
    use crate::store::{MemoryPersistence, RecordStore};
    use serde_json::Value;

    fn coordinator() -> Arc<SessionCoordinator> {
        let store = RecordStore::open(
            Schema::hotel_rooms(),
            Arc::new(MemoryPersistence::new()),
            Arc::new(Unrestricted),
        )
        .unwrap();
        Arc::new(SessionCoordinator::new(Arc::new(store)))
    }

    #[test]
    fn test_server_socket_addr() {
        let server = Server::new(ServerConfig::with_port(8080), coordinator());
        assert_eq!(server.socket_addr(), "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn test_connection_is_a_session() {
        let coordinator = coordinator();
        let server = Server::new(ServerConfig::with_port(0), coordinator.clone());
        let listener = server.bind().await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server.serve(listener));

        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        write_half
            .write_all(b"{\"op\":\"create\",\"fields\":[\"Palace\",\"Smallville\",\"2\",\"Y\",\"$150.00\",\"2026/11/01\",\"\"]}\n")
            .await
            .unwrap();
        let reply: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply["status"], "ok");
        assert_eq!(reply["data"]["slot"], 0);

        write_half.write_all(b"{\"op\":\"lock\",\"slot\":0}\n").await.unwrap();
        let reply: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply["status"], "ok");
        assert_eq!(coordinator.session_count(), 1);
        assert!(coordinator.store().lock_holder(0).is_some());

        drop(write_half);
        assert!(lines.next_line().await.unwrap().is_none());

        for _ in 0..100 {
            if coordinator.session_count() == 0 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert_eq!(coordinator.session_count(), 0);
        assert_eq!(coordinator.store().lock_holder(0), None);
    }
}
