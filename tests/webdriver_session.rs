use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use kira_deadlineqc::fetch::{ContractStateFetcher, Phase, RetryPolicy};
use kira_deadlineqc::session::webdriver::{Selectors, SessionSettings, WebDriverConnector};
use kira_deadlineqc::session::{Connector, ContractSystem, Credentials};
use kira_deadlineqc::source::ContractId;
use secrecy::SecretString;
use serde_json::{Value, json};

const ELEMENT_KEY: &str = "element-6066-11e4-a07c-4f0b9b9d05c5";
const RERENDER_AFTER: Duration = Duration::from_millis(150);

/// Result page whose table is replaced some time after each filter click;
/// until then the previous rows stay attached.
struct Page {
    sel: Selectors,
    phases: Vec<&'static str>,
    generation: usize,
    clicked_at: Option<Instant>,
    name_polls: usize,
    /// First history entry shown in the contract modal, when one opens.
    history: Option<&'static str>,
    close_clicks: usize,
}

impl Page {
    fn new(phases: Vec<&'static str>) -> Self {
        Self {
            sel: Selectors::default(),
            phases,
            generation: 0,
            clicked_at: None,
            name_polls: 0,
            history: None,
            close_clicks: 0,
        }
    }

    fn with_history(mut self, entry: &'static str) -> Self {
        self.history = Some(entry);
        self
    }

    fn visible_generation(&mut self) -> usize {
        if let Some(at) = self.clicked_at {
            if at.elapsed() >= RERENDER_AFTER {
                self.generation += 1;
                self.clicked_at = None;
            }
        }
        self.generation
    }
}

fn element(id: &str) -> (u16, Value) {
    (200, json!({ ELEMENT_KEY: id }))
}

fn missing(what: &str) -> (u16, Value) {
    (404, json!({ "error": "no such element", "message": what }))
}

fn respond(page: &mut Page, method: &str, path: &str, body: &Value) -> (u16, Value) {
    if method == "POST" && path == "/session" {
        return (200, json!({ "sessionId": "s1", "capabilities": {} }));
    }
    let Some(rest) = path.strip_prefix("/session/s1") else {
        return (404, json!({ "error": "invalid session id", "message": path }));
    };
    let generation = page.visible_generation();

    match (method, rest) {
        ("DELETE", "") => (200, Value::Null),
        ("POST", "/elements") => (200, json!([])),
        ("GET", "/element/active") => element("body"),
        ("POST", "/element") => {
            let xpath = body["value"].as_str().unwrap_or_default();
            let sel = &page.sel;
            if xpath == sel.username {
                element("user")
            } else if xpath == sel.password {
                element("pass")
            } else if xpath == sel.submit {
                element("submit")
            } else if xpath == sel.search_input {
                element("search")
            } else if xpath == sel.filter_button {
                element("filter")
            } else if xpath == sel.result_row && generation > 0 {
                element(&format!("row-{generation}"))
            } else if xpath == sel.phase_cell && generation > 0 {
                element(&format!("cell-{generation}"))
            } else if page.history.is_some() && in_modal(sel, xpath) {
                element(modal_element(sel, xpath))
            } else {
                missing(xpath)
            }
        }
        ("POST", "/element/filter/click") => {
            page.clicked_at = Some(Instant::now());
            (200, Value::Null)
        }
        ("POST", "/element/entry/element") if page.history.is_some() => element("date"),
        ("POST", "/execute/sync") if body["args"][0][ELEMENT_KEY] == "close" => {
            page.close_clicks += 1;
            (500, json!({ "error": "unknown error", "message": "modal backdrop intercepted click" }))
        }
        ("POST", _) => (200, Value::Null),
        ("GET", r) if r.ends_with("/name") => {
            page.name_polls += 1;
            let id = r.trim_start_matches("/element/").trim_end_matches("/name");
            if id == format!("row-{generation}") {
                (200, json!("tr"))
            } else {
                (404, json!({ "error": "stale element reference", "message": id }))
            }
        }
        ("GET", r) if r.ends_with("/text") => {
            let id = r.trim_start_matches("/element/").trim_end_matches("/text");
            if id == "date" {
                return (200, json!(page.history.unwrap_or_default()));
            }
            let n: usize = id.trim_start_matches("cell-").parse().unwrap_or(0);
            let text = n
                .checked_sub(1)
                .and_then(|i| page.phases.get(i))
                .copied()
                .unwrap_or_default();
            (200, json!(text))
        }
        _ => missing(rest),
    }
}

fn in_modal(sel: &Selectors, xpath: &str) -> bool {
    sel.expand_row.first().is_some_and(|x| x == xpath)
        || sel.deadline_step.first().is_some_and(|x| x == xpath)
        || sel.close_modal.first().is_some_and(|x| x == xpath)
        || xpath == sel.history_marker
        || xpath == sel.history_entry
}

fn modal_element(sel: &Selectors, xpath: &str) -> &'static str {
    if sel.close_modal.first().is_some_and(|x| x == xpath) {
        "close"
    } else if xpath == sel.history_entry {
        "entry"
    } else {
        "modal"
    }
}

fn serve(stream: TcpStream, page: &Mutex<Page>) {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).unwrap_or(0) == 0 {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        reader.read_line(&mut header).unwrap();
        let header = header.trim_end();
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    let (status, value) = respond(&mut page.lock().unwrap(), &method, &path, &body);
    let payload = json!({ "value": value }).to_string();
    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {status} WD\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        payload.len()
    )
    .unwrap();
    stream.flush().unwrap();
}

fn spawn_driver(page: Page) -> (String, Arc<Mutex<Page>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let page = Arc::new(Mutex::new(page));
    let shared = Arc::clone(&page);
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            serve(stream, &shared);
        }
    });
    (url, page)
}

fn settings(webdriver_url: String) -> SessionSettings {
    SessionSettings {
        webdriver_url,
        system_url: "http://system.invalid/login".to_string(),
        wait_timeout_ms: 2_000,
        step_timeout_ms: 20,
        poll_interval_ms: 10,
        settle_ms: 2_000,
        ..SessionSettings::default()
    }
}

fn credentials() -> Credentials {
    Credentials {
        user: "operator".to_string(),
        password: SecretString::from("secret".to_string()),
    }
}

#[test]
fn second_search_reads_the_refreshed_table() {
    let (url, page) = spawn_driver(Page::new(vec!["Averbação", "Pago"]));
    let connector = WebDriverConnector::new(settings(url));
    let mut system = connector.login(Some(&credentials())).unwrap();

    let fetcher = ContractStateFetcher::new(
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        RetryPolicy {
            max_attempts: 1,
            base_backoff_ms: 0,
        },
    );
    let first = fetcher
        .fetch(system.as_mut(), &ContractId::parse("101").unwrap())
        .unwrap();
    assert_eq!(first.phase, Phase::Averbacao);

    let second = fetcher
        .fetch(system.as_mut(), &ContractId::parse("202").unwrap())
        .unwrap();
    assert_eq!(second.phase, Phase::Pago);
    assert_eq!(second.deadline_start, None);
    assert!(page.lock().unwrap().name_polls > 0);

    system.close().unwrap();
}

#[test]
fn deadline_date_survives_a_failed_modal_close() {
    let (url, page) = spawn_driver(Page::new(vec!["Averbação"]).with_history("12/03/2024 14:22"));
    let connector = WebDriverConnector::new(settings(url));
    let mut system = connector.login(Some(&credentials())).unwrap();

    let fetcher = ContractStateFetcher::new(
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        RetryPolicy {
            max_attempts: 1,
            base_backoff_ms: 0,
        },
    );
    let snapshot = fetcher
        .fetch(system.as_mut(), &ContractId::parse("101").unwrap())
        .unwrap();
    assert_eq!(snapshot.phase, Phase::Averbacao);
    assert_eq!(snapshot.deadline_start, NaiveDate::from_ymd_opt(2024, 3, 12));
    assert_eq!(snapshot.elapsed_days, Some(95));
    assert_eq!(page.lock().unwrap().close_clicks, 1);

    system.close().unwrap();
}

#[test]
fn login_without_credentials_is_rejected() {
    let connector = WebDriverConnector::new(settings("http://127.0.0.1:9".to_string()));
    assert!(connector.login(None).is_err());
}
