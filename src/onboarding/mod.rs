//! Onboarding: the multi-step flow that converts a prospect into a paying,
//! scheduled customer, culminating in a hosted checkout redirect.
//!
//! The funnel is a linear step machine; the Processing step chains three
//! independently failing external systems (auth account, payment capture,
//! hosted checkout) with no shared transaction. The orchestrator makes that
//! chain retry-safe and timeout-bounded.

pub mod model;
pub mod orchestrator;
pub mod state;

pub use model::OnboardingRequest;
pub use orchestrator::{
    AccountRef, AuthProvider, CheckoutOutcome, CheckoutProvider, CheckoutSession,
    CheckoutSessionRequest, Orchestrator, TimeoutBudgets,
};
pub use state::OnboardingStep;
