//! Business logic services.
//!
//! Property parsing and merging, the tag index, rate limiting and response
//! budgeting. The MCP layer composes these per tool call.

mod properties;
mod rate_limit;
mod tag_cache;
mod token_budget;

pub use properties::PropertyManager;
pub use rate_limit::{RateLimiter, SWEEP_INTERVAL};
pub use tag_cache::{DEFAULT_STALENESS, TagCache};
pub use token_budget::{Budgeted, TRUNCATION_NOTICE, TokenBudgeter, estimate_tokens};
