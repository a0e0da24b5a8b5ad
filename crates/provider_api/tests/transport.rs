use std::fs;

use provider_api::payload::PreparedRequest;
use provider_api::transport::post;
use provider_api::TransportConfig;

fn request() -> PreparedRequest {
    PreparedRequest {
        url: "https://example.invalid/v1/chat".to_string(),
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: r#"{"model":"m"}"#.to_string(),
    }
}

#[test]
fn stub_file_contents_become_the_response_body() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stub = dir.path().join("stub.json");
    fs::write(&stub, r#"{"choices":[{"message":{"content":"stubbed"}}]}"#).expect("write stub");

    let config = TransportConfig::default().with_stub_path(&stub);
    let response = post(&request(), &config).expect("stubbed post succeeds");

    assert_eq!(response.status, 200);
    assert!(response.body.contains("stubbed"));
    assert_eq!(response.exit, 0);
}

#[test]
fn capture_dir_receives_url_headers_and_body() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stub = dir.path().join("stub.json");
    fs::write(&stub, "{}").expect("write stub");
    let captures = dir.path().join("captures");

    let config = TransportConfig::default()
        .with_stub_path(&stub)
        .with_capture_dir(&captures);
    post(&request(), &config).expect("stubbed post succeeds");

    let mut names: Vec<String> = fs::read_dir(&captures)
        .expect("capture dir exists")
        .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();

    let url_file = names
        .iter()
        .find(|name| name.ends_with(".url"))
        .expect("a url capture exists");
    let stem = url_file.trim_end_matches(".url");
    assert!(names.contains(&format!("{stem}.headers")));
    assert!(names.contains(&format!("{stem}.body")));

    let captured_url =
        fs::read_to_string(captures.join(url_file)).expect("read captured url");
    assert_eq!(captured_url, "https://example.invalid/v1/chat");
    let captured_headers =
        fs::read_to_string(captures.join(format!("{stem}.headers"))).expect("read headers");
    assert!(captured_headers.contains("Content-Type: application/json"));
}

#[test]
fn offline_reply_is_exposed_without_any_transport_call() {
    let config = TransportConfig::default().with_offline_response("canned answer");
    assert_eq!(config.offline_reply(), Some("canned answer"));
}
