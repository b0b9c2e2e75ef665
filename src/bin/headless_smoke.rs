//! Loads the served frontend in headless Chromium, submits the login form with
//! bad credentials and dumps everything the page logged.
//!
//! Exit status is 0 when the run completes and 2 when launching, navigating or
//! interacting with the page fails. The captured logs are not judged.
//!
//! CDP offers no network-idle wait, so "idle" is approximated: `goto` waits
//! for the load event and a fixed settle delay covers late requests.

use chromiumoxide::cdp::js_protocol::runtime::{
    EventConsoleApiCalled, EventExceptionThrown, RemoteObject,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Handler, Page};
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::process::ExitCode;
use std::time::Duration;
use thiserror::Error as ThisError;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
const SETTLE_DELAY: Duration = Duration::from_secs(2);
const OBSERVATION_WINDOW: Duration = Duration::from_secs(5);

const LOGIN_EMAIL: &str = "invalid@example.com";
const LOGIN_PASSWORD: &str = "badpass";

#[derive(Debug, Serialize, Deserialize)]
struct SmokeConfig {
    test_url: String,
}

impl Default for SmokeConfig {
    fn default() -> Self {
        Self {
            test_url: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, ThisError)]
enum SmokeError {
    #[error("config error: {0}")]
    Config(#[from] figment::Error),

    #[error("browser config error: {0}")]
    BrowserConfig(String),

    #[error("browser error: {0}")]
    Cdp(#[from] CdpError),

    #[error("navigation to {0} timed out")]
    NavigationTimeout(String),
}

#[derive(Debug, Serialize)]
struct PageLogEntry {
    #[serde(rename = "type")]
    kind: String,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<Value>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    match run().await {
        Ok(logs) => {
            println!("\n--- COLLECTED PAGE LOGS (JSON) ---");
            match serde_json::to_string_pretty(&logs) {
                Ok(dump) => println!("{dump}"),
                Err(e) => error!(error = %e, "failed to serialize page logs"),
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Test failed: {e}");
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<Vec<PageLogEntry>, SmokeError> {
    let cfg: SmokeConfig = Figment::from(Serialized::defaults(SmokeConfig::default()))
        .merge(Env::raw().only(&["TEST_URL"]))
        .extract()?;

    info!("Launching headless browser, opening {}", cfg.test_url);
    let (mut browser, handler) = launch().await?;
    let handler_task = tokio::spawn(drive(handler));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = exercise_login(&browser, &cfg.test_url, tx).await;

    if let Err(e) = browser.close().await {
        error!(error = %e, "failed to close browser");
    }
    let _ = browser.wait().await;
    handler_task.abort();

    outcome?;
    let mut logs = Vec::new();
    while let Ok(entry) = rx.try_recv() {
        logs.push(entry);
    }
    Ok(logs)
}

async fn launch() -> Result<(Browser, Handler), SmokeError> {
    let config = BrowserConfig::builder()
        .no_sandbox()
        .arg("--disable-setuid-sandbox")
        .build()
        .map_err(SmokeError::BrowserConfig)?;
    Ok(Browser::launch(config).await?)
}

/// The CDP connection only makes progress while its handler is polled.
async fn drive(mut handler: Handler) {
    while let Some(event) = handler.next().await {
        if event.is_err() {
            break;
        }
    }
}

async fn exercise_login(
    browser: &Browser,
    url: &str,
    tx: mpsc::UnboundedSender<PageLogEntry>,
) -> Result<(), SmokeError> {
    let page = browser.new_page("about:blank").await?;
    let collectors = spawn_collectors(&page, tx).await?;

    let result = async {
        tokio::time::timeout(NAVIGATION_TIMEOUT, page.goto(url))
            .await
            .map_err(|_| SmokeError::NavigationTimeout(url.to_string()))??;
        tokio::time::sleep(SETTLE_DELAY).await;

        page.evaluate(fill_form_script()).await?;
        page.find_element("#loginBtn").await?.click().await?;

        tokio::time::sleep(OBSERVATION_WINDOW).await;
        Ok::<(), SmokeError>(())
    }
    .await;

    for task in collectors {
        task.abort();
    }
    result
}

fn fill_form_script() -> String {
    format!(
        "(() => {{ const e = document.getElementById('email'); const p = document.getElementById('password'); if (e) e.value = {email}; if (p) p.value = {password}; }})()",
        email = Value::from(LOGIN_EMAIL),
        password = Value::from(LOGIN_PASSWORD),
    )
}

async fn spawn_collectors(
    page: &Page,
    tx: mpsc::UnboundedSender<PageLogEntry>,
) -> Result<Vec<tokio::task::JoinHandle<()>>, SmokeError> {
    let mut console = page.event_listener::<EventConsoleApiCalled>().await?;
    let mut exceptions = page.event_listener::<EventExceptionThrown>().await?;

    let console_tx = tx.clone();
    let console_task = tokio::spawn(async move {
        while let Some(event) = console.next().await {
            let entry = console_entry(&event);
            println!("[PAGE] {} {}", entry.kind, entry.text);
            if console_tx.send(entry).is_err() {
                break;
            }
        }
    });

    let exception_task = tokio::spawn(async move {
        while let Some(event) = exceptions.next().await {
            let details = &event.exception_details;
            let text = details
                .exception
                .as_ref()
                .and_then(|ex| ex.description.clone())
                .unwrap_or_else(|| details.text.clone());
            eprintln!("[PAGE ERROR] {text}");
            let entry = PageLogEntry {
                kind: "pageerror".to_string(),
                text,
                location: None,
            };
            if tx.send(entry).is_err() {
                break;
            }
        }
    });

    Ok(vec![console_task, exception_task])
}

fn console_entry(event: &EventConsoleApiCalled) -> PageLogEntry {
    let text = event
        .args
        .iter()
        .map(remote_object_text)
        .collect::<Vec<_>>()
        .join(" ");
    let location = event
        .stack_trace
        .as_ref()
        .and_then(|trace| trace.call_frames.first())
        .map(|frame| {
            json!({
                "url": frame.url,
                "lineNumber": frame.line_number,
                "columnNumber": frame.column_number,
            })
        });
    PageLogEntry {
        kind: format!("{:?}", event.r#type).to_lowercase(),
        text,
        location,
    }
}

fn remote_object_text(obj: &RemoteObject) -> String {
    match (&obj.value, &obj.description) {
        (Some(Value::String(s)), _) => s.clone(),
        (Some(v), _) => v.to_string(),
        (None, Some(desc)) => desc.clone(),
        (None, None) => String::new(),
    }
}
