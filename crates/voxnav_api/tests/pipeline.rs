//! Pipeline tests against a scripted local HTTP stub.
//!
//! Each scripted response serves exactly one connection and closes it, so the
//! accept count equals the number of transport attempts.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use voxnav_api::payload::RegisterScreensData;
use voxnav_api::{
    ApiClient, ApiConfig, ApiError, CancellationSignal, Operation, OperationOutput, ScreenPayload,
};

fn epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

fn response_500() -> String {
    "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
        .to_owned()
}

fn response_200(extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n{extra_headers}Connection: close\r\n\r\n{body}",
        body.len()
    )
}

fn signed_headers() -> String {
    format!(
        "X-Response-Signature: c2lnbmF0dXJl\r\nX-Timestamp: {}\r\n",
        epoch_ms()
    )
}

async fn serve_one(mut stream: TcpStream, response: String) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return buf;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|window| window == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    stream.write_all(response.as_bytes()).await.unwrap();
    let _ = stream.shutdown().await;
    buf
}

/// Serves the scripted responses one connection each. Returns the base URL,
/// the accept counter, and the raw requests as the stub saw them.
async fn spawn_stub(
    responses: Vec<String>,
) -> (String, Arc<AtomicUsize>, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepts);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&requests);

    tokio::spawn(async move {
        for response in responses {
            let (stream, _) = listener.accept().await.unwrap();
            counter.fetch_add(1, Ordering::SeqCst);
            let request = serve_one(stream, response).await;
            recorder
                .lock()
                .unwrap()
                .push(String::from_utf8_lossy(&request).into_owned());
        }
    });

    (format!("http://{addr}"), accepts, requests)
}

/// Waits for the stub to finish recording request `index`.
async fn recorded_request(requests: &Arc<Mutex<Vec<String>>>, index: usize) -> String {
    for _ in 0..200 {
        if let Some(request) = requests.lock().unwrap().get(index).cloned() {
            return request;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("request {index} never recorded");
}

fn fast_config(base_url: String, max_retries: u32) -> ApiConfig {
    ApiConfig::new("vx_test_key", "com.example.app")
        .with_base_url(base_url)
        .with_max_retries(max_retries)
        .with_initial_retry_delay(Duration::from_millis(10))
        .with_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn initialize_round_trips_a_signed_success_response() {
    let body = r#"{"status":true,"data":{"session_id":"sess-9","expires_at":32503680000000}}"#;
    let (base_url, accepts, _requests) =
        spawn_stub(vec![response_200(&signed_headers(), body)]).await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let data = client.initialize(None).await.expect("initialize");

    assert_eq!(data.session_id, "sess-9");
    assert_eq!(data.expires_at, Some(32_503_680_000_000));
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn permanently_failing_transport_makes_exactly_max_retries_attempts() {
    let (base_url, accepts, _requests) =
        spawn_stub(vec![response_500(), response_500(), response_500()]).await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let error = client.initialize(None).await.expect_err("must exhaust");

    let ApiError::RetryExhausted { status, .. } = error else {
        panic!("expected RetryExhausted, got {error}");
    };
    assert_eq!(status.map(|status| status.as_u16()), Some(500));
    assert_eq!(accepts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retryable_failure_recovers_transparently() {
    let body = r#"{"status":true,"data":{"session_id":"sess-1"}}"#;
    let (base_url, accepts, _requests) = spawn_stub(vec![
        response_500(),
        response_200(&signed_headers(), body),
    ])
    .await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let data = client.initialize(None).await.expect("second attempt wins");

    assert_eq!(data.session_id, "sess-1");
    assert_eq!(accepts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn non_retryable_status_fails_after_one_attempt() {
    let response = format!(
        "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: 44\r\nConnection: close\r\n\r\n{}",
        r#"{"status":false,"message":"invalid API key"}"#
    );
    let (base_url, accepts, _requests) = spawn_stub(vec![response]).await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let error = client.initialize(None).await.expect_err("must fail");

    let ApiError::Status(status, message) = error else {
        panic!("expected Status, got {error}");
    };
    assert_eq!(status.as_u16(), 401);
    assert_eq!(message, "invalid API key");
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsigned_success_response_is_rejected_without_retry() {
    let body = r#"{"status":true,"data":{"session_id":"sess-1"}}"#;
    let (base_url, accepts, _requests) = spawn_stub(vec![response_200("", body)]).await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let error = client.initialize(None).await.expect_err("must fail");

    assert!(matches!(error, ApiError::MissingResponseSignature));
    assert!(error.is_security());
    assert_eq!(accepts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn zero_max_retries_never_touches_the_transport() {
    let (base_url, accepts, _requests) = spawn_stub(vec![]).await;

    let client = ApiClient::new(fast_config(base_url, 0)).unwrap();
    let error = client.initialize(None).await.expect_err("must fail");

    assert!(matches!(error, ApiError::RetryExhausted { status: None, .. }));
    assert_eq!(accepts.load(Ordering::SeqCst), 0);
}

fn screen(id: &str) -> ScreenPayload {
    ScreenPayload {
        screen_id: id.to_owned(),
        screen_name: id.to_owned(),
        description: format!("{id} screen"),
        deep_link: format!("app://{id}"),
        keywords: Vec::new(),
    }
}

#[tokio::test]
async fn register_screens_round_trips_through_execute() {
    let body = r#"{"status":true,"data":{"registered_count":2}}"#;
    let (base_url, accepts, requests) =
        spawn_stub(vec![response_200(&signed_headers(), body)]).await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let output = client
        .execute(
            Operation::RegisterScreens(vec![screen("home"), screen("settings")]),
            Some("sess-1"),
            None,
        )
        .await
        .expect("register screens");

    assert_eq!(
        output,
        OperationOutput::ScreensRegistered(RegisterScreensData {
            registered_count: 2
        })
    );
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    let request = recorded_request(&requests, 0).await;
    assert!(request.starts_with("POST /register-screens"));
    assert!(request.contains("authorization: Bearer sess-1") || request.contains("Authorization: Bearer sess-1"));
    assert!(request.contains("x-signature:") || request.contains("X-Signature:"));
    assert!(request.contains(r#""screen_id":"home""#));
}

#[tokio::test]
async fn submit_audio_round_trips_the_multipart_form() {
    let body = r#"{"status":true,"data":{"conversation_id":"conv-5"}}"#;
    let (base_url, accepts, requests) =
        spawn_stub(vec![response_200(&signed_headers(), body)]).await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let output = client
        .execute(
            Operation::SubmitAudio {
                audio: vec![1, 2, 3, 4],
                file_name: "clip.wav".to_owned(),
            },
            Some("sess-1"),
            None,
        )
        .await
        .expect("submit audio");

    let OperationOutput::AudioSubmitted(data) = output else {
        panic!("expected AudioSubmitted");
    };
    assert_eq!(data.conversation_id.as_deref(), Some("conv-5"));
    assert_eq!(accepts.load(Ordering::SeqCst), 1);

    let request = recorded_request(&requests, 0).await;
    assert!(request.starts_with("POST /submit-audio"));
    assert!(request.contains("multipart/form-data"));
    assert!(request.contains(r#"filename="clip.wav""#));
    assert!(request.contains("audio/wav"));
}

#[tokio::test]
async fn execute_requires_a_bearer_for_privileged_operations() {
    let (base_url, accepts, _requests) = spawn_stub(vec![]).await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let error = client
        .execute(Operation::RegisterScreens(vec![screen("home")]), None, None)
        .await
        .expect_err("must fail");

    assert!(matches!(error, ApiError::MissingSessionToken));
    assert_eq!(accepts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn pre_cancelled_register_screens_never_touches_the_transport() {
    let (base_url, accepts, _requests) = spawn_stub(vec![]).await;

    let client = ApiClient::new(fast_config(base_url, 3)).unwrap();
    let cancel: CancellationSignal = Arc::new(AtomicBool::new(true));
    let error = client
        .register_screens("sess-1", &[screen("home")], Some(&cancel))
        .await
        .expect_err("must fail");

    assert!(matches!(error, ApiError::Cancelled));
    assert_eq!(accepts.load(Ordering::SeqCst), 0);
}
