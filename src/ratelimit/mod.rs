pub mod store;
pub mod types;


pub use store::{FixedWindowStore, RateLimitStore};
pub use types::{RateDecision, RateLimitConfig};
