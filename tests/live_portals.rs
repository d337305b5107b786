//! Live runs against real portals and a real browser.
//!
//! Ignored by default, run manually with `cargo test -- --ignored`. Needs the
//! same environment as the binary (`.env` or `PAYCHECK_CONFIG`).

use paycheck_mailer::browser::open_session;
use paycheck_mailer::config::Config;
use paycheck_mailer::infrastructure::PortalDriver;
use paycheck_mailer::portals::{adapter_for, ProviderAdapter};
use paycheck_mailer::services::{Decryptor, QpdfDecryptor, WorkspaceManager};
use paycheck_mailer::utils::logging;
use paycheck_mailer::{Period, RetrievalOutcome};

#[tokio::test]
#[ignore] // needs a browser: cargo test -- --ignored
async fn test_browser_session_opens_and_closes() {
    logging::init();
    let config = Config::from_env().expect("load config");

    let mut driver = open_session(&config.browser, &config.wait)
        .await
        .expect("open browser session");

    driver.navigate("about:blank").await.expect("navigate");
    driver.reset().await.expect("reset page");
    driver.close().await.expect("close browser");
}

#[tokio::test]
#[ignore]
async fn test_qpdf_is_installed() {
    let decryptor = QpdfDecryptor::new();
    assert!(decryptor.ensure_available().await.is_ok(), "qpdf should be on PATH");
}

#[tokio::test]
#[ignore] // needs portal credentials
async fn test_retrieve_last_month_from_every_provider() {
    logging::init();
    let config = Config::from_env().expect("load config");
    let period = Period::previous_month_of(chrono::Local::now().date_naive());
    let workspaces = WorkspaceManager::new(std::env::temp_dir().join("paycheck-live"));

    let mut driver = open_session(&config.browser, &config.wait)
        .await
        .expect("open browser session");

    for provider in config.providers.iter().cloned() {
        let adapter = adapter_for(provider, config.wait);
        let workspace = workspaces
            .acquire(adapter.provider().kind.slug())
            .await
            .expect("workspace");
        driver.reset().await.expect("reset page");

        let outcome = adapter.retrieve(&mut driver, period, &workspace).await;
        assert!(
            !matches!(outcome, RetrievalOutcome::Failure(_)),
            "{} failed: {:?}",
            adapter.provider().kind,
            outcome
        );
        paycheck_mailer::services::workspace::destroy(workspace.path())
            .await
            .expect("destroy workspace");
    }

    driver.close().await.expect("close browser");
}
