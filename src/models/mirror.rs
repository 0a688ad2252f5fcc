use rust_decimal::Decimal;
use serde::Serialize;

use super::{CopySubscription, Trade};

// ---------------------------------------------------------------------------
// MirrorOutcome
// ---------------------------------------------------------------------------

/// How one mirror attempt ended.
///
/// `Skipped` counts as success for cursor purposes: the source trade was too
/// small to replicate and retrying it forever would stall the stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MirrorOutcome {
    Executed { notional: Decimal },
    Skipped { reason: String },
    Failed { error: String },
}

// ---------------------------------------------------------------------------
// MirrorResult
// ---------------------------------------------------------------------------

/// Outcome record for one attempted mirror. Ephemeral: consumed by the
/// notifier and the cursor-advance decision, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorResult {
    pub trade: Trade,
    pub subscription: CopySubscription,
    pub outcome: MirrorOutcome,
}

impl MirrorResult {
    pub fn executed(trade: &Trade, subscription: &CopySubscription, notional: Decimal) -> Self {
        Self {
            trade: trade.clone(),
            subscription: subscription.clone(),
            outcome: MirrorOutcome::Executed { notional },
        }
    }

    pub fn skipped(trade: &Trade, subscription: &CopySubscription, reason: impl Into<String>) -> Self {
        Self {
            trade: trade.clone(),
            subscription: subscription.clone(),
            outcome: MirrorOutcome::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn failed(trade: &Trade, subscription: &CopySubscription, error: impl Into<String>) -> Self {
        Self {
            trade: trade.clone(),
            subscription: subscription.clone(),
            outcome: MirrorOutcome::Failed {
                error: error.into(),
            },
        }
    }

    /// True when the cursor should advance past this trade.
    pub fn success(&self) -> bool {
        !matches!(self.outcome, MirrorOutcome::Failed { .. })
    }

    /// Quote currency actually put to work; zero for skips and failures.
    pub fn executed_notional(&self) -> Decimal {
        match &self.outcome {
            MirrorOutcome::Executed { notional } => *notional,
            _ => Decimal::ZERO,
        }
    }

    pub fn error_text(&self) -> Option<&str> {
        match &self.outcome {
            MirrorOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }
}
