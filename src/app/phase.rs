/// Progress of a rule fetch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FetchPhase {
    #[default]
    Idle,
    Authenticating,
    FetchingRules,
    /// Number of valid rules parsed
    Parsed(usize),
    Failed(String),
}

impl FetchPhase {
    pub fn as_str(&self) -> &str {
        match self {
            FetchPhase::Idle => "idle",
            FetchPhase::Authenticating => "authenticating",
            FetchPhase::FetchingRules => "fetching rules",
            FetchPhase::Parsed(_) => "parsed",
            FetchPhase::Failed(_) => "failed",
        }
    }
}
