//! Onboarding step state machine: tracks which step of the funnel a
//! prospect is in.

use serde::{Deserialize, Serialize};

use crate::error::OnboardingError;

/// The steps of the onboarding funnel.
///
/// Progresses linearly: Form → Quote → CustomerDetails → Payment →
/// Processing → Success. Any failure during Processing reverts to Payment
/// (never back to Form) with all captured data preserved; the failed attempt
/// is recorded on the submission, not as a resting step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Form,
    Quote,
    CustomerDetails,
    Payment,
    Processing,
    Success,
}

impl OnboardingStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: OnboardingStep) -> bool {
        use OnboardingStep::*;
        matches!(
            (self, target),
            (Form, Quote)
                | (Quote, CustomerDetails)
                | (CustomerDetails, Payment)
                | (Payment, Processing)
                | (Processing, Success)
                // Error leg: processing failures return to the last safe step.
                | (Processing, Payment)
        )
    }

    /// Checked transition. Errors on anything `can_transition_to` rejects.
    pub fn transition_to(
        &self,
        target: OnboardingStep,
    ) -> Result<OnboardingStep, OnboardingError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(OnboardingError::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
            })
        }
    }

    /// The next step in the happy-path progression, if any.
    pub fn next(&self) -> Option<OnboardingStep> {
        use OnboardingStep::*;
        match self {
            Form => Some(Quote),
            Quote => Some(CustomerDetails),
            CustomerDetails => Some(Payment),
            Payment => Some(Processing),
            Processing => Some(Success),
            Success => None,
        }
    }

    /// Where control lands after a processing failure.
    pub fn revert_on_failure(&self) -> OnboardingStep {
        match self {
            Self::Processing => Self::Payment,
            other => *other,
        }
    }

    /// Whether this step is terminal (the funnel is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl Default for OnboardingStep {
    fn default() -> Self {
        Self::Form
    }
}

impl std::fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Form => "form",
            Self::Quote => "quote",
            Self::CustomerDetails => "customer_details",
            Self::Payment => "payment",
            Self::Processing => "processing",
            Self::Success => "success",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions() {
        use OnboardingStep::*;
        let transitions = [
            (Form, Quote),
            (Quote, CustomerDetails),
            (CustomerDetails, Payment),
            (Payment, Processing),
            (Processing, Success),
        ];
        for (from, to) in transitions {
            assert!(from.can_transition_to(to), "{from} should transition to {to}");
        }
    }

    #[test]
    fn failure_returns_to_payment_never_form() {
        use OnboardingStep::*;
        assert!(Processing.can_transition_to(Payment));
        assert!(!Processing.can_transition_to(Form));
        assert_eq!(Processing.revert_on_failure(), Payment);
    }

    #[test]
    fn checked_transition_reports_both_ends() {
        use OnboardingStep::*;
        assert_eq!(Form.transition_to(Quote).unwrap(), Quote);
        let err = Form.transition_to(Payment).unwrap_err();
        assert!(err.to_string().contains("form"));
        assert!(err.to_string().contains("payment"));
    }

    #[test]
    fn no_skipping_or_going_backward() {
        use OnboardingStep::*;
        assert!(!Form.can_transition_to(Payment));
        assert!(!Quote.can_transition_to(Processing));
        assert!(!Payment.can_transition_to(Quote));
        assert!(!Success.can_transition_to(Form));
        assert!(!Payment.can_transition_to(Payment));
    }

    #[test]
    fn next_walks_the_funnel() {
        use OnboardingStep::*;
        let mut step = Form;
        let expected = [Quote, CustomerDetails, Payment, Processing, Success];
        for want in expected {
            step = step.next().unwrap();
            assert_eq!(step, want);
        }
        assert!(step.next().is_none());
        assert!(step.is_terminal());
    }

    #[test]
    fn display_matches_serde() {
        use OnboardingStep::*;
        for step in [Form, Quote, CustomerDetails, Payment, Processing, Success] {
            let json = serde_json::to_string(&step).unwrap();
            assert_eq!(json, format!("\"{step}\""));
        }
    }
}
