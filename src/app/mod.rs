mod phase;
mod state;

pub use phase::FetchPhase;
pub use state::{RefreshOutcome, RuleStore};
