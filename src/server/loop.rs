// Server loop module
// Accepts connections until a shutdown signal arrives

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::SignalHandler;
use crate::config::AppState;
use crate::logger;

/// Accept loop
///
/// Each accepted connection is served on its own task. When `shutdown` fires
/// the listener is dropped; connections already in flight keep running on
/// their tasks until they finish or hit their deadline.
pub async fn run(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<SignalHandler>,
) -> std::io::Result<()> {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = shutdown.wait_for_shutdown() => {
                logger::log_shutdown();
                logger::log_info(&format!(
                    "{} connection(s) still in flight",
                    active_connections.load(Ordering::SeqCst)
                ));
                break;
            }
        }
    }

    drop(listener);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_reusable_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_serves_over_tcp_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::defaults();
        config.logging.access_log = false;
        config.storage.public_dir = dir.path().join("public").display().to_string();
        config.storage.upload_dir = dir.path().join("uploads").display().to_string();
        config.storage.staging_dir = dir.path().join("staging").display().to_string();
        let state = Arc::new(AppState::bootstrap(config).unwrap());

        let listener = create_reusable_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(SignalHandler::new());
        let server = tokio::spawn(run(listener, state, Arc::clone(&shutdown)));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /files HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        assert!(raw.to_ascii_lowercase().contains("server: upload-server"));
        assert!(raw.ends_with("[]"));

        shutdown.shutdown.notify_one();
        server.await.unwrap().unwrap();
    }
}
