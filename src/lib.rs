//! Scooped backend: waitlist capture, service-area checks, quote
//! calculation, coupon validation, and the paid onboarding flow for a
//! recurring yard-cleanup service.

pub mod config;
pub mod coupons;
pub mod error;
pub mod http;
pub mod integrations;
pub mod locations;
pub mod notify;
pub mod onboarding;
pub mod pricing;
pub mod store;

pub use error::{Error, Result};
