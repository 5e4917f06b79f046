//! HTTP execute/poll action.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;

use sluice_core::action::Action;
use sluice_core::param::ConfigParameter;
use sluice_core::token::Token;
use sluice_core::types::ExecutionStatus;

use crate::registry::ActionBuildError;
use crate::timer::required_param;

/// Drives an action hosted by a remote entity over HTTP GET.
///
/// The first request for a target hits `execute_path` to start the remote
/// execution; while the remote side reports `IN_PROGRESS`, subsequent
/// epochs query `get_status_path` instead. The response body carries the
/// outcome kind name (`SUCCESS`, `IN_PROGRESS`, ...); transport errors,
/// non-2xx responses, and unrecognized bodies all count as `ERROR`.
///
/// Params (each accepts an `@token{...}` reference):
///   - `host`            (string, required)
///   - `port`            (u16, required)
///   - `execute_path`    (string, required)
///   - `get_status_path` (string, required)
pub struct HttpPollAction {
    host: ConfigParameter<String>,
    port: ConfigParameter<u16>,
    execute_path: ConfigParameter<String>,
    status_path: ConfigParameter<String>,
    client: reqwest::Client,
    /// Targets whose remote execution has been started and not yet
    /// reported complete.
    in_flight: Mutex<HashSet<String>>,
}

impl HttpPollAction {
    pub fn from_params(params: &Value) -> Result<Arc<dyn Action>, ActionBuildError> {
        Ok(Arc::new(Self {
            host: required_param("http_poll", params, "host")?,
            port: required_param("http_poll", params, "port")?,
            execute_path: required_param("http_poll", params, "execute_path")?,
            status_path: required_param("http_poll", params, "get_status_path")?,
            client: reqwest::Client::new(),
            in_flight: Mutex::new(HashSet::new()),
        }))
    }

    fn lock_in_flight(&self) -> MutexGuard<'_, HashSet<String>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn request(&self, url: &str) -> ExecutionStatus {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(%url, %error, "http_poll request failed");
                return ExecutionStatus::Error;
            }
        };

        let http_status = response.status();
        if !http_status.is_success() {
            tracing::warn!(%url, %http_status, "http_poll received non-success status");
            return ExecutionStatus::Error;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!(%url, %error, "http_poll failed to read response body");
                return ExecutionStatus::Error;
            }
        };

        match ExecutionStatus::from_str(body.trim()) {
            Some(status) => {
                tracing::debug!(%url, %status, "http_poll response");
                status
            }
            None => {
                tracing::warn!(%url, body = %body, "http_poll received unrecognized body");
                ExecutionStatus::Error
            }
        }
    }
}

#[async_trait]
impl Action for HttpPollAction {
    fn kind(&self) -> &str {
        "http_poll"
    }

    async fn execute(&self, token: Arc<Token>) -> ExecutionStatus {
        let resolved = (
            self.host.resolve(&token),
            self.port.resolve(&token),
            self.execute_path.resolve(&token),
            self.status_path.resolve(&token),
        );
        let (host, port, execute_path, status_path) = match resolved {
            (Ok(host), Ok(port), Ok(execute_path), Ok(status_path)) => {
                (host, port, execute_path, status_path)
            }
            _ => {
                tracing::warn!(token_id = %token.id(), "http_poll parameter resolution failed");
                return ExecutionStatus::Error;
            }
        };

        let target = format!("{host}:{port}{execute_path}");
        let polling = self.lock_in_flight().contains(&target);

        let path = if polling { &status_path } else { &execute_path };
        let url = format!("http://{host}:{port}{path}");
        let status = self.request(&url).await;

        let mut in_flight = self.lock_in_flight();
        if polling {
            if status != ExecutionStatus::InProgress {
                in_flight.remove(&target);
            }
        } else if status == ExecutionStatus::InProgress {
            in_flight.insert(target);
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn poll_action(port: u16) -> Arc<dyn Action> {
        HttpPollAction::from_params(&json!({
            "host": "127.0.0.1",
            "port": port,
            "execute_path": "/execute",
            "get_status_path": "/status"
        }))
        .expect("action")
    }

    /// Minimal one-shot HTTP responder for exercising the client.
    fn respond_once(listener: TcpListener, body: &'static str) -> std::thread::JoinHandle<String> {
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buffer = [0u8; 1024];
            let read = stream.read(&mut buffer).expect("read");
            let request = String::from_utf8_lossy(&buffer[..read]).to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).expect("write");
            request
        })
    }

    #[tokio::test]
    async fn test_execute_then_status_paths() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let action = poll_action(port);
        let token = Arc::new(Token::new());

        // First request starts execution and the remote reports progress.
        let server = respond_once(listener.try_clone().expect("clone"), "IN_PROGRESS");
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::InProgress
        );
        let request = server.join().expect("join");
        assert!(request.starts_with("GET /execute"));

        // Second request polls the status path and completes.
        let server = respond_once(listener, "SUCCESS");
        assert_eq!(
            action.execute(Arc::clone(&token)).await,
            ExecutionStatus::Success
        );
        let request = server.join().expect("join");
        assert!(request.starts_with("GET /status"));
    }

    #[tokio::test]
    async fn test_unrecognized_body_is_an_error() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        let action = poll_action(port);

        let server = respond_once(listener, "ALMOST DONE");
        assert_eq!(
            action.execute(Arc::new(Token::new())).await,
            ExecutionStatus::Error
        );
        server.join().expect("join");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        // Bind then drop, so the port refuses connections.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let action = poll_action(port);
        assert_eq!(
            action.execute(Arc::new(Token::new())).await,
            ExecutionStatus::Error
        );
    }

    #[tokio::test]
    async fn test_unresolvable_params_are_an_error_outcome() {
        let action = HttpPollAction::from_params(&json!({
            "host": "@token{endpoint.host}",
            "port": 80,
            "execute_path": "/execute",
            "get_status_path": "/status"
        }))
        .expect("action");
        assert_eq!(
            action.execute(Arc::new(Token::new())).await,
            ExecutionStatus::Error
        );
    }
}
