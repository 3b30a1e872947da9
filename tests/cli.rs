use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread::JoinHandle;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Answer one connection per `(status, body)`, in order; the handle yields
/// the raw requests.
fn serve_sequence(responses: Vec<(u16, &str)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let responses: Vec<(u16, String)> = responses
        .into_iter()
        .map(|(status, body)| (status, body.to_string()))
        .collect();
    let handle = std::thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            let mut content_length = 0usize;
            let mut chunked = false;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let lower = line.to_ascii_lowercase();
                if let Some(v) = lower.strip_prefix("content-length:") {
                    content_length = v.trim().parse().unwrap_or(0);
                }
                if lower.starts_with("transfer-encoding:") && lower.contains("chunked") {
                    chunked = true;
                }
                request.push_str(&line);
                if line == "\r\n" || line.is_empty() {
                    break;
                }
            }
            if chunked {
                loop {
                    let mut size = String::new();
                    reader.read_line(&mut size).unwrap();
                    let n = usize::from_str_radix(size.trim(), 16).unwrap_or(0);
                    let mut chunk = vec![0u8; n + 2];
                    reader.read_exact(&mut chunk).unwrap();
                    request.push_str(&String::from_utf8_lossy(&chunk[..n]));
                    if n == 0 {
                        break;
                    }
                }
            } else {
                let mut buf = vec![0u8; content_length];
                reader.read_exact(&mut buf).unwrap();
                request.push_str(&String::from_utf8_lossy(&buf));
            }
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            requests.push(request);
        }
        requests
    });
    (url, handle)
}

/// Answer one HTTP request with `status`/`body`; the handle yields the raw request.
fn serve_once(status: u16, body: &str) -> (String, JoinHandle<String>) {
    let (url, handle) = serve_sequence(vec![(status, body)]);
    let handle = std::thread::spawn(move || handle.join().unwrap().remove(0));
    (url, handle)
}

/// A URL nothing listens on.
fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    format!("http://{}", listener.local_addr().unwrap())
}

fn ssrf(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("ssrf").unwrap();
    cmd.env("HOME", home)
        .env_remove("SSRF_API_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn session_file(home: &Path) -> std::path::PathBuf {
    home.join(".config").join("ssrf").join("session.json")
}

#[test]
fn help_lists_commands() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("transactions"))
        .stdout(predicate::str::contains("portfolio"));
}

#[test]
fn config_set_url_persists() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .args(["config", "set-url", "https://books.example.org/"])
        .assert()
        .success();
    ssrf(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://books.example.org"));
}

#[test]
fn config_rejects_bad_url() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .args(["config", "set-url", "books.example.org"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Settings error"));
}

#[test]
fn projects_list_prints_table() {
    let home = TempDir::new().unwrap();
    let (url, handle) = serve_once(
        200,
        r#"[{"id": 1, "name": "Roof repair", "description": null, "created_at": "2025-01-01T08:00:00"}]"#,
    );
    ssrf(home.path())
        .args(["--api-url", url.as_str(), "projects", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Roof repair"));
    let request = handle.join().unwrap();
    assert!(request.starts_with("GET /api/projects HTTP/1.1"));
}

#[test]
fn server_error_is_printed_verbatim() {
    let home = TempDir::new().unwrap();
    let (url, handle) = serve_once(404, r#"{"detail": "Project not found"}"#);
    ssrf(home.path())
        .args(["--api-url", url.as_str(), "projects", "show", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Project not found"));
    handle.join().unwrap();
}

#[test]
fn unreachable_backend() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .args(["--api-url", dead_url().as_str(), "projects", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "No response from server. Please check if the backend is running.",
        ));
}

#[test]
fn bank_transaction_delete_is_refused() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .args(["--api-url", dead_url().as_str(), "transactions", "delete", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Bank transactions cannot be deleted"));
}

#[test]
fn delete_all_declined_sends_nothing() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .args(["--api-url", dead_url().as_str(), "transactions", "delete-all"])
        .write_stdin("y\nn\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled."));
}

#[test]
fn csv_import_rejects_incomplete_mapping() {
    let home = TempDir::new().unwrap();
    let csv = home.path().join("statement.csv");
    std::fs::write(&csv, "Booked,Amount\n01.02.2025,12.00\n").unwrap();
    let (url, handle) = serve_once(
        200,
        r#"{"columns": ["Booked", "Amount"], "sample_rows": [{"Booked": "01.02.2025", "Amount": "12.00"}]}"#,
    );
    ssrf(home.path())
        .args(["--api-url", url.as_str(), "import", "csv", "--yes"])
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("a Date column is required"));
    let request = handle.join().unwrap();
    assert!(request.starts_with("POST /api/preview-csv"));
}

#[test]
fn csv_preview_failure_shows_server_message() {
    let home = TempDir::new().unwrap();
    let csv = home.path().join("statement.csv");
    std::fs::write(&csv, "Date,Amount\n2025-02-01,12.00\n").unwrap();
    let (url, handle) = serve_once(400, r#"{"detail": "Could not read CSV file"}"#);
    ssrf(home.path())
        .args(["--api-url", url.as_str(), "import", "csv", "--yes"])
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Could not read CSV file"));
    handle.join().unwrap();
}

#[test]
fn csv_upload_failure_names_file_and_reason() {
    let home = TempDir::new().unwrap();
    let csv = home.path().join("statement.csv");
    std::fs::write(&csv, "Date,Amount\n2025-02-01,12.00\n").unwrap();
    let (url, handle) = serve_sequence(vec![
        (
            200,
            r#"{"columns": ["Date", "Amount"], "sample_rows": [{"Date": "2025-02-01", "Amount": "12.00"}]}"#,
        ),
        (400, r#"{"detail": "Invalid date format in row 1"}"#),
    ]);
    ssrf(home.path())
        .args(["--api-url", url.as_str(), "import", "csv", "--yes"])
        .arg(&csv)
        .assert()
        .failure()
        .stderr(predicate::str::contains("statement.csv failed: Invalid date format in row 1"));
    let requests = handle.join().unwrap();
    assert!(requests[1].starts_with("POST /api/upload-csv"));
    assert!(requests[1].contains("column_mapping"));
}

#[test]
fn cash_add_rejects_nan() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .args(["--api-url", dead_url().as_str(), "cash", "add", "--amount", "NaN"])
        .args(["--project", "1", "--project", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a finite amount"));
}

#[test]
fn csv_import_missing_file() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .args(["--api-url", dead_url().as_str(), "import", "csv", "--yes", "nope.csv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("File not found"));
}

#[test]
fn portfolio_unauthorized_clears_session() {
    let home = TempDir::new().unwrap();
    let session = session_file(home.path());
    std::fs::create_dir_all(session.parent().unwrap()).unwrap();
    std::fs::write(&session, r#"{"portfolio_token": "stale-token"}"#).unwrap();

    let (url, handle) = serve_once(401, r#"{"detail": "Could not validate credentials"}"#);
    ssrf(home.path())
        .args(["--api-url", url.as_str(), "portfolio", "portfolios", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Session expired"))
        .stderr(predicate::str::contains("Could not validate credentials"));

    let request = handle.join().unwrap().to_ascii_lowercase();
    assert!(request.contains("authorization: bearer stale-token"));
    assert!(!session.exists());
}

#[test]
fn portfolio_me_requires_login() {
    let home = TempDir::new().unwrap();
    ssrf(home.path())
        .args(["--api-url", dead_url().as_str(), "portfolio", "me"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ssrf portfolio login"));
}

#[test]
fn logout_removes_session() {
    let home = TempDir::new().unwrap();
    let session = session_file(home.path());
    std::fs::create_dir_all(session.parent().unwrap()).unwrap();
    std::fs::write(&session, r#"{"portfolio_token": "t"}"#).unwrap();
    ssrf(home.path())
        .args(["portfolio", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Signed out"));
    assert!(!session.exists());
}
