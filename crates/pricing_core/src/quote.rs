//! Quote lifecycle state machine: transitions, timestamps, auto-Order
//! creation, and audit log (spec §4.11).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ErrorKey};
use crate::model::VehicleAssignment;
use crate::pricing::PricingResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Rejected,
    Expired,
    Cancelled,
}

impl QuoteStatus {
    /// Transitions allowed from this status (spec §4.11).
    fn allowed_transitions(self) -> &'static [QuoteStatus] {
        use QuoteStatus::*;
        match self {
            Draft => &[Sent, Accepted, Rejected, Expired, Cancelled],
            Sent => &[Viewed, Accepted, Rejected, Expired, Cancelled],
            Viewed => &[Accepted, Rejected, Expired, Cancelled],
            Accepted => &[Cancelled],
            Rejected | Expired | Cancelled => &[],
        }
    }

    fn is_terminal(self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteStatusAuditLog {
    pub previous_status: QuoteStatus,
    pub new_status: QuoteStatus,
    pub user_id: Option<String>,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub contact_id: String,
    pub status: QuoteStatus,
    pub valid_until: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub order_id: Option<String>,
    pub pricing_result: PricingResult,
    pub is_subcontracted: bool,
    pub subcontractor_id: Option<String>,
    pub assigned_vehicle: Option<VehicleAssignment>,
    pub notes: Option<String>,
    pub audit_log: Vec<QuoteStatusAuditLog>,
}

impl Quote {
    pub fn is_editable(&self) -> bool {
        self.status == QuoteStatus::Draft
    }

    pub fn is_commercially_frozen(&self) -> bool {
        self.status != QuoteStatus::Draft
    }

    pub fn notes_editable(&self) -> bool {
        !matches!(self.status, QuoteStatus::Expired | QuoteStatus::Cancelled)
    }

    pub fn can_convert_to_invoice(&self) -> bool {
        self.status == QuoteStatus::Accepted
    }

    pub fn should_auto_expire(&self, now: DateTime<Utc>) -> bool {
        matches!(self.status, QuoteStatus::Draft | QuoteStatus::Sent | QuoteStatus::Viewed)
            && self.valid_until.is_some_and(|v| v < now)
    }

    fn set_status_timestamp(&mut self, status: QuoteStatus, at: DateTime<Utc>) {
        match status {
            QuoteStatus::Sent => self.sent_at = Some(at),
            QuoteStatus::Viewed => self.viewed_at = Some(at),
            QuoteStatus::Accepted => self.accepted_at = Some(at),
            QuoteStatus::Rejected => self.rejected_at = Some(at),
            QuoteStatus::Expired => self.expired_at = Some(at),
            QuoteStatus::Cancelled => self.cancelled_at = Some(at),
            QuoteStatus::Draft => {}
        }
    }
}

/// Generates `ORD-YYYY-NNN` references, retrying a sequence bump on
/// collision (spec §4.11). Callers (e.g. `testkit`) provide the "does this
/// reference already exist" check since that requires a repository lookup.
pub fn generate_order_reference(
    year: i32,
    starting_sequence: u32,
    max_attempts: u8,
    exists: impl Fn(&str) -> bool,
) -> CoreResult<String> {
    for attempt in 0..max_attempts {
        let sequence = starting_sequence + attempt as u32;
        let reference = format!("ORD-{year}-{sequence:03}");
        if !exists(&reference) {
            return Ok(reference);
        }
    }
    Err(CoreError::DuplicateReference { attempts: max_attempts })
}

#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub quote: Quote,
    pub should_create_order: bool,
}

/// Apply a single state transition atomically: set the timestamp, decide
/// whether an Order must be created (caller performs the actual creation and
/// mission relinking, since those need repository access), and append the
/// audit log entry.
pub fn transition(
    mut quote: Quote,
    new_status: QuoteStatus,
    user_id: Option<String>,
    reason: Option<String>,
    at: DateTime<Utc>,
) -> CoreResult<TransitionOutcome> {
    let current = quote.status;

    if current == new_status {
        return Err(CoreError::Transition { key: ErrorKey::AlreadyInStatus });
    }
    if current.is_terminal() {
        return Err(CoreError::Transition { key: ErrorKey::TerminalState });
    }
    if !current.allowed_transitions().contains(&new_status) {
        return Err(CoreError::Transition { key: ErrorKey::InvalidTransition });
    }

    quote.set_status_timestamp(new_status, at);
    let should_create_order = new_status == QuoteStatus::Accepted && quote.order_id.is_none();

    quote.audit_log.push(QuoteStatusAuditLog {
        previous_status: current,
        new_status,
        user_id,
        reason,
        timestamp: at,
    });
    quote.status = new_status;

    Ok(TransitionOutcome { quote, should_create_order })
}

/// Apply auto-expiry to every quote for which `should_auto_expire` holds,
/// using the fixed `"Auto-expired"` reason (spec §4.11).
pub fn auto_expire_batch(quotes: Vec<Quote>, now: DateTime<Utc>) -> Vec<CoreResult<TransitionOutcome>> {
    quotes
        .into_iter()
        .filter(|q| q.should_auto_expire(now))
        .map(|q| transition(q, QuoteStatus::Expired, None, Some("Auto-expired".into()), now))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{shadow_cost, OrganizationPricingSettings, ProfitabilityIndicator};
    use crate::pricing::{FallbackReason, PricingMode};
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn dummy_quote(status: QuoteStatus) -> Quote {
        let settings = OrganizationPricingSettings::default();
        let shadow = shadow_cost(10.0, 10.0, &settings, None);
        Quote {
            id: "q1".into(),
            contact_id: "c1".into(),
            status,
            valid_until: None,
            sent_at: None,
            viewed_at: None,
            accepted_at: None,
            rejected_at: None,
            expired_at: None,
            cancelled_at: None,
            order_id: None,
            pricing_result: PricingResult {
                mode: PricingMode::Dynamic,
                price: dec!(100),
                internal_cost: shadow.total_internal_cost,
                margin: dec!(50),
                margin_percent: dec!(50),
                profitability: ProfitabilityIndicator::Green,
                matched_grid_id: None,
                applied_rules: vec![],
                is_contract_price: false,
                fallback_reason: Some(FallbackReason::PrivateClient),
                grid_search_details: None,
                commission: None,
                shadow_cost: shadow,
            },
            is_subcontracted: false,
            subcontractor_id: None,
            assigned_vehicle: Some(VehicleAssignment {
                vehicle_id: "v1".into(),
                driver_id: "drv1".into(),
            }),
            notes: None,
            audit_log: vec![],
        }
    }

    #[test]
    fn same_state_transition_fails() {
        let quote = dummy_quote(QuoteStatus::Draft);
        let err = transition(quote, QuoteStatus::Draft, None, None, Utc::now());
        assert!(matches!(err, Err(CoreError::Transition { key: ErrorKey::AlreadyInStatus })));
    }

    #[test]
    fn terminal_state_rejects_transition() {
        let quote = dummy_quote(QuoteStatus::Cancelled);
        let err = transition(quote, QuoteStatus::Draft, None, None, Utc::now());
        assert!(matches!(err, Err(CoreError::Transition { key: ErrorKey::TerminalState })));
    }

    #[test]
    fn invalid_transition_is_rejected() {
        let quote = dummy_quote(QuoteStatus::Accepted);
        let err = transition(quote, QuoteStatus::Sent, None, None, Utc::now());
        assert!(matches!(err, Err(CoreError::Transition { key: ErrorKey::InvalidTransition })));
    }

    #[test]
    fn accept_sets_timestamp_and_requests_order() {
        let quote = dummy_quote(QuoteStatus::Sent);
        let now = Utc::now();
        let outcome = transition(quote, QuoteStatus::Accepted, Some("u1".into()), None, now).unwrap();
        assert_eq!(outcome.quote.accepted_at, Some(now));
        assert!(outcome.should_create_order);
        assert_eq!(outcome.quote.audit_log.len(), 1);
    }

    #[test]
    fn auto_expire_only_applies_to_eligible_statuses() {
        let mut draft = dummy_quote(QuoteStatus::Draft);
        draft.valid_until = Some(Utc::now() - Duration::hours(1));
        let mut accepted = dummy_quote(QuoteStatus::Accepted);
        accepted.valid_until = Some(Utc::now() - Duration::hours(1));

        let results = auto_expire_batch(vec![draft, accepted], Utc::now());
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());
    }

    #[test]
    fn order_reference_retries_on_collision() {
        let taken = ["ORD-2024-001", "ORD-2024-002"];
        let reference = generate_order_reference(2024, 1, 3, |r| taken.contains(&r)).unwrap();
        assert_eq!(reference, "ORD-2024-003");
    }
}
