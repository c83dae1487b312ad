//! External SaaS clients. Each degrades to a fallback when its credentials
//! are absent rather than failing hard.

pub mod stripe;
pub mod supabase;
pub mod sweepandgo;

pub use stripe::{StripeClient, UnconfiguredCheckout};
pub use supabase::{OfflineAuth, SupabaseClient};
pub use sweepandgo::SweepAndGoClient;
