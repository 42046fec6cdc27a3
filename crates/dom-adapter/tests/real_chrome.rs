//! DevTools backend checks against a running browser.
//!
//! These tests require NICE_AUTOFILL_USE_REAL_CHROME=1 and a Chromium started with
//! `--remote-debugging-port=9222` (override with NICE_AUTOFILL_DEBUGGER_URL).
//! Run with: NICE_AUTOFILL_USE_REAL_CHROME=1 cargo test -p dom-adapter --test real_chrome

use dom_adapter::cdp::{CdpDom, CdpSession};
use dom_adapter::{DomError, DomPort, NodeId, ScrollBlock};

fn should_run_chrome_tests() -> bool {
    std::env::var("NICE_AUTOFILL_USE_REAL_CHROME")
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

macro_rules! skip_without_chrome {
    () => {
        if !should_run_chrome_tests() {
            eprintln!("Skipping test: NICE_AUTOFILL_USE_REAL_CHROME not set");
            return Ok(());
        }
    };
}

fn debugger_url() -> String {
    std::env::var("NICE_AUTOFILL_DEBUGGER_URL")
        .unwrap_or_else(|_| "http://127.0.0.1:9222".to_string())
}

#[tokio::test]
async fn handles_survive_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    skip_without_chrome!();

    let mut session = CdpSession::connect(&debugger_url()).await?;
    let pages = session.matching_pages("").await?;
    let Some(page) = pages.into_iter().next() else {
        eprintln!("No pages available, skipping test");
        return Ok(());
    };
    let dom = CdpDom::new(page);

    let body = dom.body().await?.ok_or("page has no body")?;
    assert!(dom.is_connected(body).await?);
    assert_eq!(dom.body().await?, Some(body));
    assert_eq!(dom.describe(body).await?.tag, "BODY");
    dom.scroll_into_view(body, ScrollBlock::Start).await?;
    assert!(dom.query(None, "#definitely-not-present-42").await?.is_none());
    assert!(!dom.location().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_handles_read_as_disconnected() -> Result<(), Box<dyn std::error::Error>> {
    skip_without_chrome!();

    let mut session = CdpSession::connect(&debugger_url()).await?;
    let Some(page) = session.matching_pages("").await?.into_iter().next() else {
        eprintln!("No pages available, skipping test");
        return Ok(());
    };
    let dom = CdpDom::new(page);

    let gone = NodeId(987_654_321);
    assert!(!dom.is_connected(gone).await?);
    assert!(matches!(dom.parent(gone).await, Err(DomError::StaleNode(_))));
    Ok(())
}
