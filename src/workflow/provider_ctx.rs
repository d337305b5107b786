//! Provider run context
//!
//! Identifies "whose paycheck for which month" in log lines.

use std::fmt::Display;

use crate::models::{Period, ProviderConfig};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCtx {
    pub provider: &'static str,
    pub company: String,
    pub worker: Option<String>,
    pub period: Period,
}

impl ProviderCtx {
    pub fn new(config: &ProviderConfig, period: Period) -> Self {
        Self {
            provider: config.kind.name(),
            company: config.company_name.clone(),
            worker: config.worker().map(str::to_string),
            period,
        }
    }
}

impl Display for ProviderCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.provider)?;
        if let Some(worker) = &self.worker {
            write!(f, " [{}]", worker)?;
        }
        write!(f, " [{}]", self.company)
    }
}
