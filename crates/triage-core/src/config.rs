//! Configuration for pipeline latencies and narrowing widths.

use std::time::Duration;

/// Tunable parameters for the triage workflow.
///
/// All delays are simulated latencies with no data-dependent
/// computation behind them; tests run the whole workflow with
/// [`TriageConfig::zero_latency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriageConfig {
    /// Simulated latency of the broad ranking stage.
    pub broad_rank_delay: Duration,

    /// Simulated latency of the tailored ranking stage.
    pub tailored_rank_delay: Duration,

    /// Removal transition window between a reject call and the
    /// permanent rejected status.
    pub removal_delay: Duration,

    /// Settle window between full review and finalization.
    pub settle_delay: Duration,

    /// Working-set width after the broad stage.
    pub broad_keep: usize,

    /// Working-set width after the tailored stage.
    pub tailored_keep: usize,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            broad_rank_delay: Duration::from_millis(1500),
            tailored_rank_delay: Duration::from_millis(2000),
            removal_delay: Duration::from_millis(300),
            settle_delay: Duration::from_millis(600),
            broad_keep: 10,
            tailored_keep: 5,
        }
    }
}

impl TriageConfig {
    /// Configuration with every delay set to zero, for synchronous-style
    /// tests.
    pub fn zero_latency() -> Self {
        Self {
            broad_rank_delay: Duration::ZERO,
            tailored_rank_delay: Duration::ZERO,
            removal_delay: Duration::ZERO,
            settle_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}
