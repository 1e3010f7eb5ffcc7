//! Single-use loopback listener for the authorization redirect
//!
//! The provider sends the browser back to `http://localhost:{port}` with
//! `code` and `state` in the query string. Exactly one listener is active
//! per authorization attempt; the socket is dropped as soon as one
//! qualifying request has been captured.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use super::AuthError;

const CONFIRM_PAGE: &str =
    "<h2>Authorization code received! You can close this window.</h2>";

/// Query parameters captured from the one qualifying redirect request.
///
/// Written once by the redirect, read once by the lifecycle manager.
#[derive(Debug, Clone)]
pub struct RedirectCapture {
    pub code: String,
    pub state: String,
}

/// One-shot HTTP endpoint bound to the redirect URI's port.
pub struct RedirectListener {
    listener: TcpListener,
}

impl RedirectListener {
    /// Bind the redirect URI's pre-registered port on loopback.
    pub async fn bind(port: u16) -> Result<Self, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(|source| AuthError::PortUnavailable { port, source })?;
        Ok(Self { listener })
    }

    /// Port actually bound (differs from the requested one only for port 0).
    pub fn local_port(&self) -> u16 {
        self.listener
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(0)
    }

    /// Block until one request carrying both `code` and `state` arrives.
    ///
    /// Requests missing either parameter (stray probes, favicon fetches)
    /// are answered with 400 and the wait continues. With a deadline, the
    /// wait fails with [`AuthError::AuthorizationTimeout`] and the socket
    /// is released.
    pub async fn await_redirect(
        self,
        deadline: Option<Duration>,
    ) -> Result<RedirectCapture, AuthError> {
        match deadline {
            Some(limit) => tokio::time::timeout(limit, self.accept_loop())
                .await
                .map_err(|_| AuthError::AuthorizationTimeout)?,
            None => self.accept_loop().await,
        }
    }

    async fn accept_loop(self) -> Result<RedirectCapture, AuthError> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            tracing::debug!("Redirect connection from {}", peer);
            match serve_connection(stream).await {
                Ok(Some(capture)) => return Ok(capture),
                // Malformed request: answered 400, keep waiting.
                Ok(None) => continue,
                // A broken connection must not abort the whole wait.
                Err(e) => tracing::debug!("Redirect connection error: {}", e),
            }
        }
    }
}

/// Service one connection; `Some` when it carried a full capture.
async fn serve_connection(stream: TcpStream) -> std::io::Result<Option<RedirectCapture>> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let capture = parse_request_line(&request_line);
    let response = match capture {
        Some(_) => format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            CONFIRM_PAGE.len(),
            CONFIRM_PAGE
        ),
        None => {
            "HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                .to_string()
        }
    };
    write_half.write_all(response.as_bytes()).await?;
    write_half.shutdown().await?;
    Ok(capture)
}

/// Extract `code` and `state` from `GET /?code=...&state=... HTTP/1.1`.
fn parse_request_line(request_line: &str) -> Option<RedirectCapture> {
    let path = request_line.split_whitespace().nth(1)?;
    let url = Url::parse(&format!("http://localhost{}", path)).ok()?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            _ => {}
        }
    }
    Some(RedirectCapture {
        code: code?,
        state: state?,
    })
}
