use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use reqwest::Method;
use reqwest::blocking::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{SessionAuthError, SessionError};
use crate::session::{
    Connector, ContractSystem, Credentials, PageState, parse_history_date, pick_phase_label,
};
use crate::source::ContractId;

const ELEMENT_KEY: &str = "element-6066-11e4-a07c-4f0b9b9d05c5";
const KEY_ENTER: &str = "\u{E007}";
const KEY_ESCAPE: &str = "\u{E00C}";

/// XPath selectors for the system of record's UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub username: String,
    pub password: String,
    pub submit: String,
    pub search_input: String,
    pub filter_button: String,
    pub no_results: String,
    pub result_row: String,
    pub phase_cell: String,
    pub expand_row: Vec<String>,
    pub deadline_step: Vec<String>,
    pub history_marker: String,
    pub history_tab: String,
    pub history_entry: String,
    pub history_date_cell: Vec<String>,
    pub close_modal: Vec<String>,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            username: "//*[@id='login_username']".to_string(),
            password: "//*[@id='login_password']".to_string(),
            submit: "//button[.//span[contains(text(),'Entrar') or contains(text(),'Login')]] | //form//button[@type='submit']".to_string(),
            search_input: "//input[@placeholder='Pesquisa' or contains(@placeholder,'esquisa')]".to_string(),
            filter_button: "//button[contains(.,'Filtrar')]".to_string(),
            no_results: "//*[contains(text(),'Nenhum') or contains(text(),'nenhum')][contains(text(),'registro') or contains(text(),'resultado') or contains(text(),'encontrado')]".to_string(),
            result_row: "//tbody/tr[td] | //div[contains(@class,'list')]//div[contains(@class,'item')]".to_string(),
            phase_cell: "(//tbody/tr)[1]/td[2]".to_string(),
            expand_row: vec![
                "(//tbody/tr)[1]/td[last()]//button".to_string(),
                "(//tbody/tr)[1]/td[last()]".to_string(),
                "(//tbody/tr)[1]//button[last()]".to_string(),
                "(//tbody/tr)[1]//*[contains(@class,'chevron') or contains(@class,'expand') or contains(@class,'arrow')]/..".to_string(),
            ],
            deadline_step: vec![
                "//*[normalize-space(text())='Averbação']/following::button[1]".to_string(),
                "//*[normalize-space(text())='Averbação']/ancestor::div[1]//button".to_string(),
                "//*[normalize-space(text())='Averbação']/ancestor::td[1]//button".to_string(),
                "//*[contains(text(),'Averbação')]/following-sibling::button".to_string(),
            ],
            history_marker: "//*[contains(text(),'Histórico')]".to_string(),
            history_tab: "//button[contains(text(),'Histórico')] | //div[contains(@class,'tab')][contains(text(),'Histórico')]".to_string(),
            history_entry: "//*[contains(text(),'aprovada ao realizar averba') or contains(text(),'averbação na Dataprev')]".to_string(),
            history_date_cell: vec![
                "./ancestor::tr[1]/td[1]".to_string(),
                "./preceding-sibling::td[1]".to_string(),
                "../preceding-sibling::tr[1]/td[1]".to_string(),
            ],
            close_modal: vec![
                "//button[contains(@class,'ant-modal-close')]".to_string(),
                "//button[contains(normalize-space(.),'Fechar')]".to_string(),
                "//button[contains(@aria-label,'fechar') or contains(@aria-label,'close')]".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub webdriver_url: String,
    pub system_url: String,
    pub capabilities: Value,
    pub wait_timeout_ms: u64,
    pub step_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub http_timeout_ms: u64,
    /// Upper bound on waiting for the previous result table to be replaced.
    pub settle_ms: u64,
    pub selectors: Selectors,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            webdriver_url: "http://127.0.0.1:9515".to_string(),
            system_url: String::new(),
            capabilities: json!({
                "browserName": "MicrosoftEdge",
                "ms:edgeOptions": {
                    "args": ["--start-maximized", "--disable-notifications"]
                }
            }),
            wait_timeout_ms: 15_000,
            step_timeout_ms: 5_000,
            poll_interval_ms: 250,
            http_timeout_ms: 30_000,
            settle_ms: 2_000,
            selectors: Selectors::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebDriverConnector {
    settings: SessionSettings,
}

impl WebDriverConnector {
    pub fn new(settings: SessionSettings) -> Self {
        Self { settings }
    }
}

impl Connector for WebDriverConnector {
    fn login(
        &self,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn ContractSystem>, SessionAuthError> {
        let credentials =
            credentials.ok_or(SessionAuthError::MissingCredentials(super::USER_ENV))?;
        if self.settings.system_url.trim().is_empty() {
            return Err(SessionAuthError::Driver(
                "session.system_url is not configured".to_string(),
            ));
        }

        let driver = WebDriver::open(&self.settings)
            .map_err(|e| SessionAuthError::Driver(e.to_string()))?;
        let sel = &self.settings.selectors;
        let wait = Duration::from_millis(self.settings.wait_timeout_ms);

        let login = || -> Result<(), SessionError> {
            driver.navigate(&self.settings.system_url)?;
            let user = driver.wait_for(&sel.username, wait)?;
            driver.send_keys(&user, &credentials.user)?;
            let pass = driver.wait_for(&sel.password, wait)?;
            driver.send_keys(&pass, credentials.password.expose_secret())?;
            let submit = driver.wait_for(&sel.submit, wait)?;
            driver.click(&submit)?;
            driver.wait_for(&sel.search_input, wait)?;
            Ok(())
        };

        if let Err(err) = login() {
            let _ = driver.delete_session();
            return Err(SessionAuthError::Rejected(err.to_string()));
        }

        info!(system_url = %self.settings.system_url, "session_login_ok");
        Ok(Box::new(WebDriverSystem {
            driver,
            settings: self.settings.clone(),
            closed: false,
        }))
    }
}

/// Minimal W3C WebDriver client bound to one browser session.
#[derive(Debug)]
struct WebDriver {
    http: Client,
    session_url: String,
    poll: Duration,
}

impl WebDriver {
    fn open(settings: &SessionSettings) -> Result<Self, SessionError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(settings.http_timeout_ms))
            .no_proxy()
            .build()
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        let base = settings.webdriver_url.trim_end_matches('/').to_string();
        let body = json!({ "capabilities": { "alwaysMatch": settings.capabilities } });
        let value = send(&http, Method::POST, &format!("{base}/session"), Some(body))?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| SessionError::Transport("new session response lacks sessionId".into()))?;
        debug!(session_id = session_id, "webdriver_session_opened");
        Ok(Self {
            http,
            session_url: format!("{base}/session/{session_id}"),
            poll: Duration::from_millis(settings.poll_interval_ms.max(10)),
        })
    }

    fn command(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, SessionError> {
        send(&self.http, method, &format!("{}{}", self.session_url, path), body)
    }

    fn navigate(&self, url: &str) -> Result<(), SessionError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))?;
        Ok(())
    }

    fn find(&self, xpath: &str) -> Result<Option<String>, SessionError> {
        let body = json!({ "using": "xpath", "value": xpath });
        match self.command(Method::POST, "/element", Some(body)) {
            Ok(value) => Ok(element_id(&value)),
            Err(SessionError::Driver { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn find_from(&self, element: &str, xpath: &str) -> Result<Option<String>, SessionError> {
        let body = json!({ "using": "xpath", "value": xpath });
        match self.command(Method::POST, &format!("/element/{element}/element"), Some(body)) {
            Ok(value) => Ok(element_id(&value)),
            Err(SessionError::Driver { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn find_all(&self, xpath: &str) -> Result<Vec<String>, SessionError> {
        let body = json!({ "using": "xpath", "value": xpath });
        let value = self.command(Method::POST, "/elements", Some(body))?;
        Ok(value
            .as_array()
            .map(|items| items.iter().filter_map(element_id).collect())
            .unwrap_or_default())
    }

    fn wait_for(&self, xpath: &str, timeout: Duration) -> Result<String, SessionError> {
        let start = Instant::now();
        loop {
            if let Some(id) = self.find(xpath)? {
                return Ok(id);
            }
            if start.elapsed() >= timeout {
                return Err(SessionError::Timeout {
                    what: xpath.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
            thread::sleep(self.poll);
        }
    }

    /// Returns the first selector that resolves within `timeout`, trying them in order.
    fn wait_any(&self, xpaths: &[String], timeout: Duration) -> Result<Option<String>, SessionError> {
        for xpath in xpaths {
            match self.wait_for(xpath, timeout) {
                Ok(id) => return Ok(Some(id)),
                Err(SessionError::Timeout { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(None)
    }

    /// True once `element` is detached from the document, false if it is
    /// still attached after `timeout`.
    fn wait_stale(&self, element: &str, timeout: Duration) -> Result<bool, SessionError> {
        let start = Instant::now();
        loop {
            match self.command(Method::GET, &format!("/element/{element}/name"), None) {
                Err(SessionError::Driver { status: 404, .. }) => return Ok(true),
                Err(err) => return Err(err),
                Ok(_) if start.elapsed() >= timeout => return Ok(false),
                Ok(_) => thread::sleep(self.poll),
            }
        }
    }

    fn click(&self, element: &str) -> Result<(), SessionError> {
        self.command(Method::POST, &format!("/element/{element}/click"), Some(json!({})))?;
        Ok(())
    }

    fn js_click(&self, element: &str) -> Result<(), SessionError> {
        self.execute("arguments[0].scrollIntoView(true); arguments[0].click();", element)
    }

    fn clear(&self, element: &str) -> Result<(), SessionError> {
        self.command(Method::POST, &format!("/element/{element}/clear"), Some(json!({})))?;
        Ok(())
    }

    fn send_keys(&self, element: &str, text: &str) -> Result<(), SessionError> {
        self.command(
            Method::POST,
            &format!("/element/{element}/value"),
            Some(json!({ "text": text })),
        )?;
        Ok(())
    }

    fn text(&self, element: &str) -> Result<String, SessionError> {
        let value = self.command(Method::GET, &format!("/element/{element}/text"), None)?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn execute(&self, script: &str, element: &str) -> Result<(), SessionError> {
        let body = json!({ "script": script, "args": [{ ELEMENT_KEY: element }] });
        self.command(Method::POST, "/execute/sync", Some(body))?;
        Ok(())
    }

    fn press_escape(&self) -> Result<(), SessionError> {
        let value = self.command(Method::GET, "/element/active", None)?;
        if let Some(active) = element_id(&value) {
            self.send_keys(&active, KEY_ESCAPE)?;
        }
        Ok(())
    }

    fn delete_session(&self) -> Result<(), SessionError> {
        self.command(Method::DELETE, "", None)?;
        Ok(())
    }
}

fn send(http: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value, SessionError> {
    let mut req = http.request(method, url);
    if let Some(body) = body {
        req = req.json(&body);
    }
    let resp = req
        .send()
        .map_err(|e| SessionError::Transport(e.to_string()))?;
    let status = resp.status();
    let payload: Value = resp
        .json()
        .map_err(|e| SessionError::Transport(e.to_string()))?;
    let value = payload.get("value").cloned().unwrap_or(Value::Null);
    if !status.is_success() {
        let message = value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
            .unwrap_or("unknown error")
            .to_string();
        return Err(SessionError::Driver {
            status: status.as_u16(),
            message,
        });
    }
    Ok(value)
}

fn element_id(value: &Value) -> Option<String> {
    value.get(ELEMENT_KEY).and_then(Value::as_str).map(str::to_string)
}

#[derive(Debug)]
struct WebDriverSystem {
    driver: WebDriver,
    settings: SessionSettings,
    closed: bool,
}

impl WebDriverSystem {
    fn wait(&self) -> Duration {
        Duration::from_millis(self.settings.wait_timeout_ms)
    }

    fn step_wait(&self) -> Duration {
        Duration::from_millis(self.settings.step_timeout_ms)
    }

    fn dismiss_modals(&self) -> Result<(), SessionError> {
        for xpath in &self.settings.selectors.close_modal {
            for button in self.driver.find_all(xpath)? {
                let _ = self.driver.js_click(&button);
            }
        }
        let _ = self.driver.press_escape();
        Ok(())
    }

    fn close_modal(&self) -> Result<(), SessionError> {
        let short = Duration::from_millis(self.settings.step_timeout_ms.min(3_000));
        if let Some(button) = self.driver.wait_any(&self.settings.selectors.close_modal, short)? {
            self.driver.js_click(&button)?;
        } else {
            self.driver.press_escape()?;
        }
        Ok(())
    }

    fn read_history_date(&self) -> Result<Option<NaiveDate>, SessionError> {
        let sel = &self.settings.selectors;
        if let Err(err) = self.driver.wait_for(&sel.history_marker, self.wait()) {
            return match err {
                SessionError::Timeout { .. } => Ok(None),
                other => Err(other),
            };
        }
        if let Some(tab) = self.driver.find(&sel.history_tab)? {
            self.driver.click(&tab)?;
        }
        let entry = match self.driver.wait_for(&sel.history_entry, self.wait()) {
            Ok(entry) => entry,
            Err(SessionError::Timeout { .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        for xpath in &sel.history_date_cell {
            if let Some(cell) = self.driver.find_from(&entry, xpath)? {
                let text = self.driver.text(&cell)?;
                return parse_history_date(&text);
            }
        }
        Ok(None)
    }
}

impl ContractSystem for WebDriverSystem {
    fn search(&mut self, id: &ContractId) -> Result<PageState, SessionError> {
        let sel = &self.settings.selectors;
        self.dismiss_modals()?;

        // Rows left over from the previous search must not be read as this one's.
        let previous_row = self.driver.find(&sel.result_row)?;

        let field = self.driver.wait_for(&sel.search_input, self.wait())?;
        self.driver.clear(&field)?;
        self.driver.send_keys(&field, &format!("{id}{KEY_ENTER}"))?;
        let filter = self.driver.wait_for(&sel.filter_button, self.wait())?;
        self.driver.click(&filter)?;

        if let Some(previous) = previous_row {
            let settle = Duration::from_millis(self.settings.settle_ms);
            if !self.driver.wait_stale(&previous, settle)? {
                debug!(id = %id, "previous result row still attached after settle wait");
            }
        }

        let start = Instant::now();
        loop {
            if self.driver.find(&sel.no_results)?.is_some() {
                return Ok(PageState::NotFound);
            }
            if self.driver.find(&sel.result_row)?.is_some() {
                break;
            }
            if start.elapsed() >= self.wait() {
                warn!(id = %id, "no result rows returned");
                return Ok(PageState::NotFound);
            }
            thread::sleep(self.driver.poll);
        }

        let cell = self.driver.wait_for(&sel.phase_cell, self.step_wait())?;
        let row_text = self.driver.text(&cell)?;
        Ok(PageState::Found {
            id: id.clone(),
            row_text,
        })
    }

    fn read_phase(&mut self, page: &PageState) -> Result<Option<String>, SessionError> {
        match page {
            PageState::NotFound => Ok(None),
            PageState::Found { row_text, .. } => Ok(pick_phase_label(row_text)),
        }
    }

    fn read_deadline_start(
        &mut self,
        page: &PageState,
    ) -> Result<Option<NaiveDate>, SessionError> {
        let PageState::Found { id, .. } = page else {
            return Ok(None);
        };
        let sel = &self.settings.selectors;

        let Some(expand) = self.driver.wait_any(&sel.expand_row, self.step_wait())? else {
            warn!(id = %id, "expand control not found");
            return Ok(None);
        };
        self.driver.js_click(&expand)?;

        let Some(step) = self.driver.wait_any(&sel.deadline_step, self.step_wait())? else {
            warn!(id = %id, "deadline step control not found");
            return Ok(None);
        };
        self.driver.js_click(&step)?;

        let date = self.read_history_date();
        if let Err(err) = self.close_modal() {
            warn!(id = %id, error = %err, "failed to close contract modal");
        }
        date
    }

    fn close(&mut self) -> Result<(), SessionError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.driver.delete_session()
    }
}

impl Drop for WebDriverSystem {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.driver.delete_session();
        }
    }
}
