use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use super::FetchPhase;
use crate::error::DashResult;
use crate::luci::{RpcTransport, RuleListFetcher};
use crate::openclash::RulesDocument;

/// Result of a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Document replaced; number of valid rules
    Updated(usize),
    /// Another refresh was in flight, nothing was done
    AlreadyRunning,
}

/// Clears the in-flight flag even when a refresh future is dropped early
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// In-memory copy of the router's rule file.
///
/// The document is only ever replaced whole, on a successful fetch.
/// Refresh requests that arrive while one is running are dropped.
pub struct RuleStore<T> {
    fetcher: RuleListFetcher<T>,
    document: RwLock<Arc<RulesDocument>>,
    in_flight: AtomicBool,
    phase: watch::Sender<FetchPhase>,
}

impl<T: RpcTransport> RuleStore<T> {
    pub fn new(fetcher: RuleListFetcher<T>) -> Self {
        let (phase, _) = watch::channel(FetchPhase::Idle);
        Self {
            fetcher,
            document: RwLock::new(Arc::new(RulesDocument::default())),
            in_flight: AtomicBool::new(false),
            phase,
        }
    }

    pub fn fetcher(&self) -> &RuleListFetcher<T> {
        &self.fetcher
    }

    /// Watch fetch progress
    pub fn subscribe(&self) -> watch::Receiver<FetchPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> FetchPhase {
        self.phase.borrow().clone()
    }

    /// Current snapshot
    pub async fn document(&self) -> Arc<RulesDocument> {
        self.document.read().await.clone()
    }

    /// Fetch the rule file and swap it in.
    ///
    /// On failure the previous document stays and the phase ends in `Failed`.
    pub async fn refresh(&self) -> DashResult<RefreshOutcome> {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            log::debug!("refresh already running, ignoring request");
            return Ok(RefreshOutcome::AlreadyRunning);
        }
        let _guard = InFlight(&self.in_flight);

        let document = self
            .fetcher
            .fetch(|phase| {
                self.phase.send_replace(phase);
            })
            .await?;

        let count = document.len();
        *self.document.write().await = Arc::new(document);
        Ok(RefreshOutcome::Updated(count))
    }

    /// Write a modified document to the router and keep it as the current one
    pub async fn commit(&self, document: RulesDocument) -> DashResult<()> {
        self.fetcher.store(&document).await?;
        *self.document.write().await = Arc::new(document);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashError;
    use crate::luci::testing::ScriptedTransport;
    use crate::luci::{Credentials, LuciClient};
    use crate::openclash::Rule;

    fn store(transport: ScriptedTransport) -> RuleStore<ScriptedTransport> {
        let base = LuciClient::<ScriptedTransport>::base_url("10.0.0.1", 80, false).unwrap();
        RuleStore::new(RuleListFetcher::new(
            LuciClient::new(base, transport),
            Credentials {
                username: "root".to_string(),
                password: "password".to_string(),
            },
        ))
    }

    fn login_ok() -> DashResult<String> {
        Ok(r#"{"id":1,"result":"TOK"}"#.to_string())
    }

    fn rules_ok(text: &str) -> DashResult<String> {
        Ok(serde_json::json!({ "result": text }).to_string())
    }

    #[tokio::test]
    async fn test_refresh_replaces_document() {
        let store = store(ScriptedTransport::new(vec![
            login_ok(),
            rules_ok("rules:\n- DOMAIN,a.com,DIRECT\n- DOMAIN,b.com,REJECT\n"),
        ]));
        let mut phases = store.subscribe();

        assert_eq!(store.refresh().await, Ok(RefreshOutcome::Updated(2)));
        assert_eq!(store.document().await.len(), 2);
        assert_eq!(store.phase(), FetchPhase::Parsed(2));
        assert!(phases.has_changed().unwrap());
        assert_eq!(*phases.borrow_and_update(), FetchPhase::Parsed(2));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_document() {
        let store = store(ScriptedTransport::new(vec![
            login_ok(),
            rules_ok("rules:\n- DOMAIN,a.com,DIRECT\n"),
            Ok(r#"{"result":null,"error":"bad password"}"#.to_string()),
        ]));

        store.refresh().await.unwrap();
        let err = store.refresh().await.unwrap_err();

        assert_eq!(err, DashError::Auth("bad password".to_string()));
        assert_eq!(store.document().await.len(), 1);
        assert!(matches!(store.phase(), FetchPhase::Failed(_)));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_is_deduplicated() {
        let transport = ScriptedTransport::new(vec![
            login_ok(),
            rules_ok("rules:\n- DOMAIN,a.com,DIRECT\n"),
        ]);
        let store = store(transport.clone());

        let (first, second) = tokio::join!(store.refresh(), store.refresh());

        assert_eq!(first, Ok(RefreshOutcome::Updated(1)));
        assert_eq!(second, Ok(RefreshOutcome::AlreadyRunning));
        assert_eq!(transport.requests().len(), 2);

        // The flag is released once the first refresh completes.
        assert!(!store.in_flight.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_commit_updates_snapshot() {
        let store = store(ScriptedTransport::new(vec![
            login_ok(),
            Ok(r#"{"result":true}"#.to_string()),
        ]));

        let mut document = RulesDocument::default();
        document.push(Rule::new("GEOIP", "CN", "DIRECT"));
        store.commit(document).await.unwrap();

        let snapshot = store.document().await;
        assert_eq!(snapshot.render(), "rules:\n- GEOIP,CN,DIRECT\n");
    }
}
