use std::path::Path;

use async_trait::async_trait;
use prace_model::Instance;

/// Secondary validator consulted when the job set produced both a certificate and a
/// counterexample.
#[async_trait]
pub trait CrossCheck: Send + Sync {
    fn name(&self) -> &'static str;

    /// `true` if `counterexample` really falsifies the property of `instance`.
    async fn confirms_counterexample(&self, instance: &Instance, counterexample: &Path) -> bool;
}

/// Cross check with a fixed answer.
///
/// The default rejects every counterexample, so conflicts resolve to the certificate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCrossCheck {
    confirm: bool,
}

impl FixedCrossCheck {
    pub fn confirm() -> Self {
        Self { confirm: true }
    }

    pub fn reject() -> Self {
        Self { confirm: false }
    }
}

#[async_trait]
impl CrossCheck for FixedCrossCheck {
    fn name(&self) -> &'static str {
        if self.confirm { "fixed-confirm" } else { "fixed-reject" }
    }

    async fn confirms_counterexample(&self, _instance: &Instance, _counterexample: &Path) -> bool {
        self.confirm
    }
}
