use jtv::error::{AuthError, LoadError};
use jtv::paginator::{LoadMode, PaginationCursor};
use jtv::transport::{login, Credentials};
use jtv::{load, HttpFetcher, TableState};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc::{channel, Receiver};
use std::thread;
use std::time::Duration;

/// Request as seen by the test server
struct Seen {
    request_line: String,
    headers: Vec<String>,
    body: String,
}

/// Serve one canned response per entry, then stop. Returns the base URL and the
/// requests the server saw.
fn serve(responses: Vec<(u16, &'static str)>) -> (String, Receiver<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = channel();

    thread::spawn(move || {
        for (status, body) in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end().to_string();
                if line.is_empty() {
                    break;
                }
                if let Some(len) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = len.trim().parse().unwrap();
                }
                headers.push(line);
            }
            let mut request_body = vec![0; content_length];
            reader.read_exact(&mut request_body).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            )
            .unwrap();
            stream.flush().unwrap();

            tx.send(Seen {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8(request_body).unwrap(),
            })
            .unwrap();
        }
    });

    (base, rx)
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5))
}

#[test]
fn page_request_carries_window_and_token() {
    let (base, seen) = serve(vec![(200, r#"{"data":[{"id":1,"tags":{"a":"x"}}],"meta":{"total":1}}"#)]);
    let mut state = TableState::new(0, "Tab 1", PaginationCursor::with_limit(5))
        .with_endpoint(format!("{base}/items"));

    load(&mut state, LoadMode::Single, &fetcher(), Some("tok123")).unwrap();

    let request = seen.recv().unwrap();
    assert_eq!(request.request_line, "GET /items?offset=0&limit=5 HTTP/1.1");
    assert!(request
        .headers
        .iter()
        .any(|h| h.eq_ignore_ascii_case("authorization: Bearer tok123")));
    assert_eq!(state.visible_columns(), vec!["id", "tags.a"]);
    assert_eq!(state.meta["total"], 1);
    assert_eq!(state.cursor.offset, 5);
}

#[test]
fn no_token_means_no_authorization_header() {
    let (base, seen) = serve(vec![(200, r#"{"data":[]}"#)]);
    let mut state =
        TableState::new(0, "Tab 1", PaginationCursor::default()).with_endpoint(format!("{base}/x"));

    load(&mut state, LoadMode::Single, &fetcher(), None).unwrap();

    let request = seen.recv().unwrap();
    assert!(!request
        .headers
        .iter()
        .any(|h| h.to_ascii_lowercase().starts_with("authorization:")));
}

#[test]
fn server_error_becomes_status_message() {
    let (base, _seen) = serve(vec![(500, r#"{"error":"boom"}"#)]);
    let mut state =
        TableState::new(0, "Tab 1", PaginationCursor::default()).with_endpoint(format!("{base}/x"));

    let err = load(&mut state, LoadMode::Single, &fetcher(), None).unwrap_err();

    assert!(matches!(err, LoadError::HttpStatus { status: 500, .. }));
    assert_eq!(err.user_message(), "HTTP error! status: 500");
    assert!(state.rows.is_empty());
}

#[test]
fn invalid_json_is_malformed() {
    let (base, _seen) = serve(vec![(200, "not json")]);
    let mut state =
        TableState::new(0, "Tab 1", PaginationCursor::default()).with_endpoint(format!("{base}/x"));

    let err = load(&mut state, LoadMode::Single, &fetcher(), None).unwrap_err();

    assert!(matches!(err, LoadError::MalformedResponse(_)));
}

#[test]
fn login_posts_credentials_and_returns_token() {
    let (base, seen) = serve(vec![(200, r#"{"token":"abc.def"}"#)]);
    let credentials = Credentials {
        username: "ada".to_string(),
        password: "pw".to_string(),
    };

    let token = login(fetcher().agent(), &format!("{base}/login"), &credentials).unwrap();

    assert_eq!(token, "abc.def");
    let request = seen.recv().unwrap();
    assert_eq!(request.request_line, "POST /login HTTP/1.1");
    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["username"], "ada");
    assert_eq!(body["password"], "pw");
}

#[test]
fn rejected_login() {
    let (base, _seen) = serve(vec![(401, r#"{"error":"nope"}"#)]);
    let credentials = Credentials {
        username: "ada".to_string(),
        password: "wrong".to_string(),
    };

    let err = login(fetcher().agent(), &format!("{base}/login"), &credentials).unwrap_err();

    assert!(matches!(err, AuthError::HttpStatus { status: 401 }));
}
