use serde_json::json;
use std::time::Duration;
use tether_core::api::{ApiRequest, ApiTransport};
use tether_infrastructure::HttpTransport;
use tether_infrastructure::http_transport::{NETWORK_ERROR, TIMEOUT_ERROR};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

fn http_response(status_line: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_line,
        body.len(),
        body
    )
}

/// Reads one HTTP request (headers plus Content-Length body) as text.
async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw).to_string();
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if raw.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&raw).to_string()
}

/// Serves a single canned response and hands back the request it received.
async fn serve_once(response: String) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_request(&mut socket).await;
        let _ = tx.send(request);
        socket.write_all(response.as_bytes()).await.unwrap();
        let _ = socket.shutdown().await;
    });

    (format!("http://{}", addr), rx)
}

#[tokio::test]
async fn test_get_success_parses_json() {
    let (base_url, request_rx) =
        serve_once(http_response("200 OK", r#"[{"id":"bot-1"}]"#)).await;
    let transport = HttpTransport::new(base_url, Duration::from_secs(5), None);

    let response = transport.request(ApiRequest::get("/admin/bots")).await;

    assert!(response.success);
    assert_eq!(response.data, Some(json!([{"id": "bot-1"}])));
    let request = request_rx.await.unwrap();
    assert!(request.starts_with("GET /admin/bots HTTP/1.1"));
}

#[tokio::test]
async fn test_post_sends_json_body_and_bearer_token() {
    let (base_url, request_rx) = serve_once(http_response("201 Created", r#"{"id":7}"#)).await;
    let transport = HttpTransport::new(base_url, Duration::from_secs(5), Some("tok".to_string()));

    let response = transport
        .request(ApiRequest::post(
            "/admin/commands",
            json!({"bot_id": "bot-1", "command": "sysinfo"}),
        ))
        .await;

    assert!(response.success);
    let request = request_rx.await.unwrap();
    assert!(request.starts_with("POST /admin/commands HTTP/1.1"));
    assert!(request.to_lowercase().contains("authorization: bearer tok"));
    assert!(request.contains(r#""bot_id":"bot-1""#));
}

#[tokio::test]
async fn test_error_status_uses_body_error_field() {
    let (base_url, _request_rx) = serve_once(http_response(
        "400 Bad Request",
        r#"{"error":"Invalid command"}"#,
    ))
    .await;
    let transport = HttpTransport::new(base_url, Duration::from_secs(5), None);

    let response = transport.request(ApiRequest::get("/admin/tasks")).await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Invalid command"));
}

#[tokio::test]
async fn test_error_status_without_body_uses_status_line() {
    let (base_url, _request_rx) = serve_once(http_response("503 Service Unavailable", "")).await;
    let transport = HttpTransport::new(base_url, Duration::from_secs(5), None);

    let response = transport.request(ApiRequest::get("/admin/stats")).await;

    assert_eq!(
        response.error.as_deref(),
        Some("HTTP 503: Service Unavailable")
    );
}

#[tokio::test]
async fn test_timeout_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let _ = read_request(&mut socket).await;
        tokio::time::sleep(Duration::from_secs(5)).await;
    });
    let transport = HttpTransport::new(
        format!("http://{}", addr),
        Duration::from_millis(100),
        None,
    );

    let response = transport.request(ApiRequest::get("/admin/bots")).await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(TIMEOUT_ERROR));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let transport = HttpTransport::new(format!("http://{}", addr), Duration::from_secs(2), None);

    let response = transport.request(ApiRequest::get("/admin/bots")).await;

    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some(NETWORK_ERROR));
}
