//! HTTP transfers: streaming download to disk and raw-body upload.
//!
//! Uses async reqwest internally with tokio::time::timeout for stall detection,
//! but presents a blocking interface so the pipeline stays strictly sequential.

use std::io::Write;
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use futures_util::StreamExt;
use indicatif::ProgressBar;

use crate::progress::upgrade_to_bar;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum bytes of a failed response body kept for diagnostics
const BODY_EXCERPT_LIMIT: usize = 2048;

/// Error types for transfer operations
#[derive(Debug)]
pub enum StreamError {
    /// Transport-level failure (DNS, TLS, connect, timeout) with optional status
    Http {
        status: Option<u16>,
        message: String,
        timed_out: bool,
    },
    /// Server answered with a non-success status
    Status {
        status: u16,
        headers: Vec<(String, String)>,
        body: String,
    },
    /// No data arrived within the stall timeout
    Stalled(Duration),
    /// Local I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
                ..
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
                ..
            } => write!(f, "HTTP error: {message}"),
            Self::Status { status, body, .. } => {
                let first = body.lines().next().unwrap_or("").trim();
                if first.is_empty() {
                    write!(f, "HTTP {status}")
                } else {
                    write!(f, "HTTP {status}: {first}")
                }
            }
            Self::Stalled(d) => write!(f, "read stalled ({}s with no data)", d.as_secs()),
            Self::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for StreamError {}

impl StreamError {
    /// Create HTTP error from reqwest error.
    ///
    /// The URL is stripped so query-string credentials never reach the logs.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let timed_out = e.is_timeout();
        let status = e.status().map(|s| s.as_u16());
        let message = if timed_out {
            "request timed out".to_string()
        } else {
            e.without_url().to_string()
        };
        Self::Http {
            status,
            message,
            timed_out,
        }
    }

    /// No response headers arrived within `limit`.
    pub fn no_response(limit: Duration) -> Self {
        Self::Http {
            status: None,
            message: format!("no response within {:.1}s", limit.as_secs_f64()),
            timed_out: true,
        }
    }

    /// Whether the failure was a timeout (connect, response deadline or stall).
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Stalled(_) => true,
            Self::Http { timed_out, .. } => *timed_out,
            Self::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            Self::Status { .. } => false,
        }
    }

    /// Log response headers and body of a rejected request at error level.
    pub fn log_details(&self, label: &str) {
        if let Self::Status {
            status,
            headers,
            body,
        } = self
        {
            log::error!("{label}: status {status}");
            for (name, value) in headers {
                log::error!("{label}:   {name}: {value}");
            }
            if !body.is_empty() {
                log::error!("{label}: body: {body}");
            }
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Shared async HTTP client.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(5))
        .user_agent(concat!("geomirror/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("failed to build HTTP client")
});

/// Get shared HTTP client.
pub fn http_client() -> &'static reqwest::Client {
    &SHARED_CLIENT
}

/// Shared tokio runtime for HTTP operations.
static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Timeouts applied to a single download.
///
/// Neither bounds the total transfer time: a slow body that keeps arriving
/// is never cut off.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    /// Deadline for the response headers
    pub response: Duration,
    /// Maximum gap between two received chunks
    pub stall: Duration,
}

/// Turn a non-success response into [`StreamError::Status`], keeping headers
/// and a body excerpt for diagnostics.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                v.to_str().unwrap_or("<binary>").to_string(),
            )
        })
        .collect();
    let mut body = response.text().await.unwrap_or_default();
    if body.len() > BODY_EXCERPT_LIMIT {
        let mut cut = BODY_EXCERPT_LIMIT;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
        body.push_str("...");
    }

    Err(StreamError::Status {
        status: status.as_u16(),
        headers,
        body,
    })
}

/// Send `request` and stream the response body into `dest`.
///
/// Progress is reported on `pb` (upgraded to a byte bar once the content
/// length is known). Returns the number of bytes written. On failure the
/// partially written file is removed.
pub fn download_to_file(
    request: reqwest::RequestBuilder,
    dest: &Path,
    timeouts: Timeouts,
    pb: &ProgressBar,
) -> Result<u64, StreamError> {
    let result = SHARED_RUNTIME.handle().block_on(async {
        let response = tokio::time::timeout(timeouts.response, request.send())
            .await
            .map_err(|_| StreamError::no_response(timeouts.response))?
            .map_err(StreamError::from_reqwest)?;
        let response = check_status(response).await?;

        if let Some(total) = response.content_length() {
            upgrade_to_bar(pb, total);
        }

        let mut file = std::io::BufWriter::new(std::fs::File::create(dest)?);
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        loop {
            let chunk = match tokio::time::timeout(timeouts.stall, body.next()).await {
                Ok(Some(chunk)) => chunk.map_err(StreamError::from_reqwest)?,
                Ok(None) => break,
                Err(_) => return Err(StreamError::Stalled(timeouts.stall)),
            };
            file.write_all(&chunk)?;
            written += chunk.len() as u64;
            pb.inc(chunk.len() as u64);
        }
        file.flush()?;

        Ok::<_, StreamError>(written)
    });

    if result.is_err() {
        let _ = std::fs::remove_file(dest);
    }
    result
}

/// Send `request` carrying a raw body and require a success status.
///
/// Returns the status code on success.
pub fn send_upload(request: reqwest::RequestBuilder, timeout: Duration) -> Result<u16, StreamError> {
    SHARED_RUNTIME.handle().block_on(async {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(StreamError::from_reqwest)?;
        let response = check_status(response).await?;
        Ok(response.status().as_u16())
    })
}

/// Replace the value of sensitive query parameters in `url` with `***`.
pub fn redact_query(url: &str, sensitive: &[&str]) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };
    let redacted: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((k, _)) if sensitive.contains(&k) => format!("{k}=***"),
            _ => pair.to_string(),
        })
        .collect();
    format!("{base}?{}", redacted.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn status_err(status: u16, body: &str) -> StreamError {
        StreamError::Status {
            status,
            headers: vec![("content-type".to_string(), "text/plain".to_string())],
            body: body.to_string(),
        }
    }

    #[test]
    fn display_status_uses_first_body_line() {
        let err = status_err(401, "Invalid account ID or license key\nmore");
        assert_eq!(
            format!("{err}"),
            "HTTP 401: Invalid account ID or license key"
        );
    }

    #[test]
    fn display_status_empty_body() {
        assert_eq!(format!("{}", status_err(503, "")), "HTTP 503");
    }

    #[test]
    fn display_http_without_status() {
        let err = StreamError::Http {
            status: None,
            message: "connection refused".to_string(),
            timed_out: false,
        };
        assert_eq!(format!("{err}"), "HTTP error: connection refused");
    }

    #[test]
    fn display_stalled() {
        let err = StreamError::Stalled(Duration::from_secs(30));
        assert_eq!(format!("{err}"), "read stalled (30s with no data)");
    }

    #[test]
    fn display_io_error() {
        let err = StreamError::Io(io::Error::new(io::ErrorKind::NotFound, "file not found"));
        assert!(format!("{err}").contains("IO error"));
    }

    #[test]
    fn timeouts_detected() {
        assert!(StreamError::Stalled(Duration::from_secs(1)).is_timeout());
        assert!(StreamError::no_response(Duration::from_secs(60)).is_timeout());
        assert!(
            !StreamError::Http {
                status: None,
                message: "request timed out".to_string(),
                timed_out: false,
            }
            .is_timeout()
        );
        assert!(StreamError::Io(io::Error::new(io::ErrorKind::TimedOut, "t")).is_timeout());
        assert!(!status_err(500, "").is_timeout());
    }

    #[test]
    fn redact_license_key() {
        let url = "https://example.com/app/geoip_download?edition_id=GeoLite2-City&license_key=secret&suffix=tar.gz";
        assert_eq!(
            redact_query(url, &["license_key"]),
            "https://example.com/app/geoip_download?edition_id=GeoLite2-City&license_key=***&suffix=tar.gz"
        );
    }

    #[test]
    fn redact_without_query() {
        assert_eq!(
            redact_query("https://example.com/a", &["license_key"]),
            "https://example.com/a"
        );
    }

    mod transport {
        use super::*;
        use std::io::{Read, Write};
        use std::net::{TcpListener, TcpStream};
        use std::sync::mpsc;
        use std::thread;

        /// Accept one connection on a local port, hand the raw request text to
        /// the returned receiver, then let `respond` write the reply.
        fn serve_once(
            respond: impl FnOnce(&mut TcpStream) + Send + 'static,
        ) -> (String, mpsc::Receiver<String>) {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                let (mut stream, _) = listener.accept().unwrap();
                let _ = tx.send(read_request(&mut stream));
                respond(&mut stream);
            });
            (format!("http://{addr}"), rx)
        }

        /// Read the request head plus a `content-length` body.
        fn read_request(stream: &mut TcpStream) -> String {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let mut expected: Option<usize> = None;
            loop {
                if let Some(total) = expected {
                    if buf.len() >= total {
                        break;
                    }
                }
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                if expected.is_none() {
                    if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                        let body_len = head
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok())
                            .unwrap_or(0);
                        expected = Some(end + 4 + body_len);
                    }
                }
            }
            String::from_utf8_lossy(&buf).into_owned()
        }

        fn write_all(stream: &mut TcpStream, data: &[u8]) {
            stream.write_all(data).unwrap();
            stream.flush().unwrap();
        }

        fn timeouts(response_ms: u64, stall_ms: u64) -> Timeouts {
            Timeouts {
                response: Duration::from_millis(response_ms),
                stall: Duration::from_millis(stall_ms),
            }
        }

        #[test]
        fn rejected_download_keeps_status_headers_and_body() {
            let (url, _rx) = serve_once(|s| {
                write_all(
                    s,
                    b"HTTP/1.1 401 Unauthorized\r\nContent-Length: 19\r\nX-Id: 7\r\nConnection: close\r\n\r\nInvalid license key",
                )
            });
            let tmp = tempfile::TempDir::new().unwrap();
            let dest = tmp.path().join("GeoLite2-City.tar.gz");

            let err = download_to_file(
                http_client().get(format!("{url}/download")),
                &dest,
                timeouts(5_000, 5_000),
                &ProgressBar::hidden(),
            )
            .unwrap_err();

            match &err {
                StreamError::Status {
                    status,
                    headers,
                    body,
                } => {
                    assert_eq!(*status, 401);
                    assert_eq!(body, "Invalid license key");
                    assert!(headers.contains(&("x-id".to_string(), "7".to_string())));
                }
                other => panic!("unexpected error {other:?}"),
            }
            assert!(!err.is_timeout());
            assert!(!dest.exists());
        }

        #[test]
        fn stalled_body_removes_partial_file() {
            let (url, _rx) = serve_once(|s| {
                write_all(s, b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n0123456789");
                thread::sleep(Duration::from_secs(2));
            });
            let tmp = tempfile::TempDir::new().unwrap();
            let dest = tmp.path().join("partial.tar.gz");

            let err = download_to_file(
                http_client().get(url),
                &dest,
                timeouts(5_000, 300),
                &ProgressBar::hidden(),
            )
            .unwrap_err();

            assert!(matches!(err, StreamError::Stalled(_)));
            assert!(err.is_timeout());
            assert!(!dest.exists());
        }

        #[test]
        fn slow_steady_body_outlives_response_deadline() {
            let (url, _rx) = serve_once(|s| {
                write_all(s, b"HTTP/1.1 200 OK\r\nContent-Length: 8\r\n\r\n");
                for byte in b"abcdefgh" {
                    write_all(s, &[*byte]);
                    thread::sleep(Duration::from_millis(100));
                }
            });
            let tmp = tempfile::TempDir::new().unwrap();
            let dest = tmp.path().join("slow.tar.gz");

            let written = download_to_file(
                http_client().get(url),
                &dest,
                timeouts(300, 2_000),
                &ProgressBar::hidden(),
            )
            .unwrap();

            assert_eq!(written, 8);
            assert_eq!(std::fs::read(&dest).unwrap(), b"abcdefgh");
        }

        #[test]
        fn missing_response_headers_hit_the_deadline() {
            let (url, _rx) = serve_once(|_| thread::sleep(Duration::from_secs(2)));
            let tmp = tempfile::TempDir::new().unwrap();

            let err = download_to_file(
                http_client().get(url),
                &tmp.path().join("never.tar.gz"),
                timeouts(300, 5_000),
                &ProgressBar::hidden(),
            )
            .unwrap_err();

            assert!(err.is_timeout());
            assert_eq!(err.to_string(), "HTTP error: no response within 0.3s");
        }

        #[test]
        fn upload_sends_body_and_rejects_server_error() {
            let (url, rx) = serve_once(|s| {
                write_all(
                    s,
                    b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 4\r\nConnection: close\r\n\r\noops",
                )
            });

            let err = send_upload(
                http_client().put(format!("{url}/objects/key")).body(b"payload".to_vec()),
                Duration::from_secs(5),
            )
            .unwrap_err();

            assert!(matches!(err, StreamError::Status { status: 500, .. }));
            let request = rx.recv().unwrap();
            assert!(request.starts_with("PUT /objects/key HTTP/1.1"));
            assert!(request.ends_with("payload"));
        }

        #[test]
        fn upload_success_returns_status() {
            let (url, _rx) = serve_once(|s| {
                write_all(s, b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n")
            });
            let status = send_upload(
                http_client().put(url).body(b"x".to_vec()),
                Duration::from_secs(5),
            )
            .unwrap();
            assert_eq!(status, 201);
        }
    }
}
