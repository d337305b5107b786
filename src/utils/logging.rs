//! Logging helpers
//!
//! Subscriber setup plus the banner style log lines of a run
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::orchestrator::RunSummary;

/// Install the global fmt subscriber
///
/// `RUST_LOG` overrides the default `info` level. Calling it twice is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Human readable elapsed time: `850ms`, `12.3s`, `1m 4s`
pub fn format_duration(elapsed: Duration) -> String {
    let millis = elapsed.as_millis();
    if millis < 1_000 {
        return format!("{}ms", millis);
    }
    let secs = elapsed.as_secs_f64();
    if secs < 60.0 {
        return format!("{:.1}s", secs);
    }
    let whole = elapsed.as_secs();
    format!("{}m {}s", whole / 60, whole % 60)
}

/// Log program start
///
/// # Arguments
/// - `config`: run configuration
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 Paycheck run started");
    info!("📋 Providers: {}", config.providers.len());
    for provider in &config.providers {
        info!("   - {} ({})", provider.kind, provider.company_name);
    }
    info!("📁 Workspace root: {}", config.workspace_dir.display());
    info!("{}", "=".repeat(60));
}

/// Print the per-provider summary table
pub fn print_final_stats(summary: &RunSummary) {
    info!("{}", "=".repeat(60));
    info!("📊 Run summary for {}", summary.period);
    info!(
        "Finished at: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    for report in &summary.reports {
        if report.status.is_error() {
            warn!("❌ {}: {}", report.label, report.status);
        } else {
            info!("✅ {}: {}", report.label, report.status);
        }
    }
    info!("{}", "─".repeat(60));
    info!("Delivered: {}", summary.delivered());
    info!("Not published yet: {}", summary.missing());
    info!("Failed: {}", summary.failed());
    info!("{}", "=".repeat(60));
}
