//! Synchronization status lifecycle of a queued order.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use ordersync_core::{DomainError, DomainResult};

/// Where a local order stands relative to the remote fulfillment service.
///
/// `Processing` is the claim marker: a worker moved the order out of
/// `Pending` and owns the submission attempt until it writes `Submitted` or
/// `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Processing,
    Submitted,
    Failed,
    Cancelled,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Processing => "processing",
            SyncStatus::Submitted => "submitted",
            SyncStatus::Failed => "failed",
            SyncStatus::Cancelled => "cancelled",
        }
    }

    /// Whether `self -> next` is a legal move.
    ///
    /// Writing the status an order already has is accepted for the outcome
    /// statuses so that status writers stay idempotent.
    pub fn can_transition_to(&self, next: SyncStatus) -> bool {
        use SyncStatus::*;

        match (*self, next) {
            (Pending, Processing) => true,
            (Pending | Processing, Submitted | Failed) => true,
            (Submitted, Cancelled) => true,
            (Submitted, Submitted) | (Failed, Failed) | (Cancelled, Cancelled) => true,
            _ => false,
        }
    }

    /// Validate and perform a transition.
    pub fn transition(self, next: SyncStatus) -> DomainResult<SyncStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::invalid_transition(self, next))
        }
    }
}

impl core::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SyncStatus::Pending),
            "processing" => Ok(SyncStatus::Processing),
            "submitted" => Ok(SyncStatus::Submitted),
            "failed" => Ok(SyncStatus::Failed),
            "cancelled" => Ok(SyncStatus::Cancelled),
            other => Err(DomainError::validation(format!("unknown sync status: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SyncStatus; 5] = [
        SyncStatus::Pending,
        SyncStatus::Processing,
        SyncStatus::Submitted,
        SyncStatus::Failed,
        SyncStatus::Cancelled,
    ];

    #[test]
    fn claim_then_outcome_is_legal() {
        let claimed = SyncStatus::Pending.transition(SyncStatus::Processing).unwrap();
        assert_eq!(claimed.transition(SyncStatus::Submitted), Ok(SyncStatus::Submitted));
        assert_eq!(claimed.transition(SyncStatus::Failed), Ok(SyncStatus::Failed));
    }

    #[test]
    fn only_submitted_orders_can_be_cancelled() {
        for from in ALL {
            let allowed = from.can_transition_to(SyncStatus::Cancelled);
            let expected = matches!(from, SyncStatus::Submitted | SyncStatus::Cancelled);
            assert_eq!(allowed, expected, "{from} -> cancelled");
        }
    }

    #[test]
    fn nothing_returns_to_pending() {
        for from in ALL {
            assert!(!from.can_transition_to(SyncStatus::Pending), "{from} -> pending");
        }
    }

    #[test]
    fn a_second_claim_is_rejected() {
        let err = SyncStatus::Processing
            .transition(SyncStatus::Processing)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "processing".to_string(),
                to: "processing".to_string(),
            }
        );
    }

    #[test]
    fn failed_orders_stay_failed() {
        assert!(!SyncStatus::Failed.can_transition_to(SyncStatus::Submitted));
        assert!(SyncStatus::Failed.can_transition_to(SyncStatus::Failed));
    }

    #[test]
    fn parses_its_own_representation() {
        for status in ALL {
            assert_eq!(status.as_str().parse::<SyncStatus>().unwrap(), status);
        }
        assert!("PENDING".parse::<SyncStatus>().is_err());
    }
}
