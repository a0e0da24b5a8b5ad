use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use tempfile::NamedTempFile;

use crate::config::TransportConfig;
use crate::error::{body_preview, ProviderApiError};
use crate::payload::PreparedRequest;
use crate::retry::{is_transient_status, retry_delay};

/// Outcome of one HTTP round-trip, successful or not at the HTTP level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub stderr: String,
    pub exit: i32,
}

static CAPTURE_SEQ: AtomicU64 = AtomicU64::new(0);

/// POST with the configured retry policy.
///
/// Transient failures (curl exit non-zero, or a status in the transient set)
/// are retried with exponential backoff up to `config.max_retries` extra
/// attempts. Anything else is returned as-is; HTTP-level classification is
/// the caller's job via [`classify_response`].
pub fn post_with_retry(
    request: &PreparedRequest,
    config: &TransportConfig,
) -> Result<HttpResponse, ProviderApiError> {
    let mut last_error = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = retry_delay(attempt - 1);
            tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying request");
            thread::sleep(delay);
        }

        match post(request, config) {
            Ok(response) => {
                let transient = is_transient_status(response.status);
                if !transient || attempt == config.max_retries {
                    return Ok(response);
                }
                tracing::debug!(status = response.status, "transient HTTP status");
            }
            Err(error @ ProviderApiError::Transport { .. }) => {
                if attempt == config.max_retries {
                    return Err(error);
                }
                tracing::debug!(error = %error, "transient transport failure");
                last_error = Some(error);
            }
            Err(error) => return Err(error),
        }
    }

    // Reachable only when max_retries is 0 and the single attempt failed,
    // which the loop already returned; kept for totality.
    Err(last_error.unwrap_or(ProviderApiError::Transport {
        exit: -1,
        stderr: "no attempt was made".to_string(),
    }))
}

/// One HTTP round-trip via the external `curl` tool.
pub fn post(
    request: &PreparedRequest,
    config: &TransportConfig,
) -> Result<HttpResponse, ProviderApiError> {
    if let Some(dir) = config.capture_dir.as_deref() {
        capture_request(dir, request)?;
    }

    if let Some(stub) = config.stub_path.as_deref() {
        let body = fs::read_to_string(stub)
            .map_err(|error| ProviderApiError::io("reading curl stub file", error))?;
        return Ok(HttpResponse {
            status: 200,
            body,
            stderr: String::new(),
            exit: 0,
        });
    }

    let mut body_file = NamedTempFile::new()
        .map_err(|error| ProviderApiError::io("creating request body temp file", error))?;
    body_file
        .write_all(request.body.as_bytes())
        .map_err(|error| ProviderApiError::io("writing request body temp file", error))?;
    body_file
        .flush()
        .map_err(|error| ProviderApiError::io("flushing request body temp file", error))?;

    let output_file = NamedTempFile::new()
        .map_err(|error| ProviderApiError::io("creating response temp file", error))?;

    let timeout_secs = config.timeout.as_secs().max(1).to_string();
    let mut command = Command::new("curl");
    command
        .arg("-sS")
        .arg("-X")
        .arg("POST")
        .arg(&request.url);
    for (key, value) in &request.headers {
        command.arg("-H").arg(format!("{key}: {value}"));
    }
    command
        .arg("--data-binary")
        .arg(format!("@{}", body_file.path().display()))
        .arg("--output")
        .arg(output_file.path())
        .arg("--write-out")
        .arg("%{http_code}")
        .arg("--connect-timeout")
        .arg(&timeout_secs)
        .arg("--max-time")
        .arg(&timeout_secs);

    tracing::debug!(url = %request.url, "dispatching curl");
    let output = command
        .output()
        .map_err(|error| ProviderApiError::io("spawning curl", error))?;

    let exit = output.status.code().unwrap_or(-1);
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        return Err(ProviderApiError::Transport { exit, stderr });
    }

    // curl echoes the status as the last bytes on stdout after the transfer.
    let stdout = String::from_utf8_lossy(&output.stdout);
    let status = parse_trailing_status(&stdout).ok_or_else(|| ProviderApiError::Transport {
        exit,
        stderr: format!("could not parse HTTP status from curl output '{}'", stdout.trim()),
    })?;

    let body = fs::read_to_string(output_file.path())
        .map_err(|error| ProviderApiError::io("reading response temp file", error))?;

    Ok(HttpResponse {
        status,
        body,
        stderr,
        exit,
    })
}

/// Map a transport-level success to the response body or an HTTP error with
/// a bounded body preview.
pub fn classify_response(response: HttpResponse) -> Result<String, ProviderApiError> {
    if (200..300).contains(&response.status) {
        Ok(response.body)
    } else {
        Err(ProviderApiError::Http {
            status: response.status,
            body_prefix: body_preview(&response.body),
        })
    }
}

fn parse_trailing_status(stdout: &str) -> Option<u16> {
    let digits: String = stdout
        .trim_end()
        .chars()
        .rev()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .chars()
        .rev()
        .collect();

    if digits.is_empty() || digits.len() > 3 {
        return None;
    }
    digits.parse().ok()
}

fn capture_request(dir: &Path, request: &PreparedRequest) -> Result<(), ProviderApiError> {
    fs::create_dir_all(dir)
        .map_err(|error| ProviderApiError::io("creating capture directory", error))?;

    let seq = CAPTURE_SEQ.fetch_add(1, Ordering::SeqCst);
    let stem = format!("request-{seq:04}");

    let headers = request
        .headers
        .iter()
        .map(|(key, value)| format!("{key}: {value}\n"))
        .collect::<String>();

    fs::write(dir.join(format!("{stem}.url")), &request.url)
        .and_then(|_| fs::write(dir.join(format!("{stem}.headers")), headers))
        .and_then(|_| fs::write(dir.join(format!("{stem}.body")), &request.body))
        .map_err(|error| ProviderApiError::io("writing request capture", error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_status_parses_from_curl_stdout() {
        assert_eq!(parse_trailing_status("200"), Some(200));
        assert_eq!(parse_trailing_status("  500\n"), Some(500));
        assert_eq!(parse_trailing_status("junk then 404"), Some(404));
    }

    #[test]
    fn trailing_status_rejects_garbage() {
        assert_eq!(parse_trailing_status(""), None);
        assert_eq!(parse_trailing_status("no digits"), None);
        assert_eq!(parse_trailing_status("123456"), None);
    }

    #[test]
    fn classify_passes_2xx_bodies_through() {
        let body = classify_response(HttpResponse {
            status: 200,
            body: "payload".to_string(),
            stderr: String::new(),
            exit: 0,
        })
        .expect("2xx should classify as success");
        assert_eq!(body, "payload");
    }

    #[test]
    fn classify_previews_error_bodies_at_400_chars() {
        let error = classify_response(HttpResponse {
            status: 500,
            body: "x".repeat(600),
            stderr: String::new(),
            exit: 0,
        })
        .expect_err("5xx should classify as error");

        match error {
            ProviderApiError::Http { status, body_prefix } => {
                assert_eq!(status, 500);
                assert_eq!(body_prefix.chars().count(), 400);
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }
}
