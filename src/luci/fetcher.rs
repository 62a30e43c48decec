use super::rpc::{Credentials, LuciClient};
use super::transport::RpcTransport;
use crate::app::FetchPhase;
use crate::error::DashResult;
use crate::openclash::{RulesDocument, CUSTOM_RULES_PATH};

/// Retrieves and stores the OpenClash custom rules file over LuCI RPC.
///
/// Each call logs in again; tokens are never cached between calls.
#[derive(Debug, Clone)]
pub struct RuleListFetcher<T> {
    client: LuciClient<T>,
    credentials: Credentials,
    path: String,
}

impl<T: RpcTransport> RuleListFetcher<T> {
    pub fn new(client: LuciClient<T>, credentials: Credentials) -> Self {
        Self {
            client,
            credentials,
            path: CUSTOM_RULES_PATH.to_string(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Login, `cat` the rules file and parse it.
    ///
    /// `report` sees every phase, ending in `Parsed` or `Failed`.
    pub async fn fetch<F: Fn(FetchPhase)>(&self, report: F) -> DashResult<RulesDocument> {
        let result = self.fetch_inner(&report).await;
        match &result {
            Ok(document) => report(FetchPhase::Parsed(document.len())),
            Err(err) => {
                log::debug!("rule fetch failed: {}", err);
                report(FetchPhase::Failed(err.to_string()));
            }
        }
        result
    }

    async fn fetch_inner<F: Fn(FetchPhase)>(&self, report: &F) -> DashResult<RulesDocument> {
        report(FetchPhase::Authenticating);
        log::debug!("logging in as {}", self.credentials.username);
        let token = self.client.login(&self.credentials).await?;

        report(FetchPhase::FetchingRules);
        let text = self
            .client
            .exec(&token, &format!("cat {}", self.path))
            .await?;

        let document = RulesDocument::parse(&text);
        log::info!("fetched {} rules from {}", document.len(), self.path);
        Ok(document)
    }

    /// Login and replace the rules file with the rendered document
    pub async fn store(&self, document: &RulesDocument) -> DashResult<()> {
        let token = self.client.login(&self.credentials).await?;
        self.client
            .write_file(&token, &self.path, &document.render())
            .await?;
        log::info!("wrote {} rules to {}", document.len(), self.path);
        Ok(())
    }

    /// Check the credentials without touching any file
    pub async fn verify_login(&self) -> DashResult<()> {
        self.client.login(&self.credentials).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashError;
    use crate::luci::testing::ScriptedTransport;
    use serde_json::json;
    use std::sync::Mutex;

    fn fetcher(transport: ScriptedTransport) -> RuleListFetcher<ScriptedTransport> {
        let base = LuciClient::<ScriptedTransport>::base_url("192.168.1.1", 80, false).unwrap();
        RuleListFetcher::new(
            LuciClient::new(base, transport),
            Credentials {
                username: "root".to_string(),
                password: "secret".to_string(),
            },
        )
    }

    fn exec_response(text: &str) -> String {
        json!({ "result": text, "error": null }).to_string()
    }

    #[tokio::test]
    async fn test_fetch_example_file() {
        let text = "rules:\n- DOMAIN-SUFFIX,example.com,DIRECT\n##- DOMAIN,ads.com,REJECT#blocked\n";
        let transport = ScriptedTransport::new(vec![
            Ok(r#"{"id":1,"result":"TOK","error":null}"#.to_string()),
            Ok(exec_response(text)),
        ]);
        let phases = Mutex::new(Vec::new());

        let document = fetcher(transport.clone())
            .fetch(|phase| phases.lock().unwrap().push(phase))
            .await
            .unwrap();

        let rules: Vec<_> = document.rules().collect();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].match_type, "DOMAIN-SUFFIX");
        assert!(rules[0].enabled);
        assert_eq!(rules[1].comment.as_deref(), Some("blocked"));
        assert!(!rules[1].enabled);

        assert_eq!(
            phases.into_inner().unwrap(),
            vec![
                FetchPhase::Authenticating,
                FetchPhase::FetchingRules,
                FetchPhase::Parsed(2),
            ]
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[1].0.as_str().contains("auth=TOK"));
        assert_eq!(
            requests[1].1,
            json!({
                "method": "exec",
                "params": ["cat /etc/openclash/custom/openclash_custom_rules.list"],
            })
        );
    }

    #[tokio::test]
    async fn test_auth_error_stops_before_exec() {
        let transport = ScriptedTransport::new(vec![Ok(
            r#"{"id":1,"result":null,"error":"bad password"}"#.to_string(),
        )]);
        let phases = Mutex::new(Vec::new());

        let err = fetcher(transport.clone())
            .fetch(|phase| phases.lock().unwrap().push(phase))
            .await
            .unwrap_err();

        assert_eq!(err, DashError::Auth("bad password".to_string()));
        assert_eq!(transport.requests().len(), 1);

        let phases = phases.into_inner().unwrap();
        match phases.last() {
            Some(FetchPhase::Failed(message)) => assert!(message.contains("bad password")),
            other => panic!("unexpected final phase: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_token() {
        let transport = ScriptedTransport::new(vec![Ok(r#"{"id":1,"result":""}"#.to_string())]);
        let err = fetcher(transport).fetch(|_| {}).await.unwrap_err();
        assert!(matches!(err, DashError::Auth(_)));
    }

    #[tokio::test]
    async fn test_exec_error_is_server_error() {
        let transport = ScriptedTransport::new(vec![
            Ok(r#"{"result":"TOK"}"#.to_string()),
            Ok(r#"{"result":"","error":"No such file"}"#.to_string()),
        ]);
        let err = fetcher(transport).fetch(|_| {}).await.unwrap_err();
        assert_eq!(err, DashError::Server("No such file".to_string()));
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let transport = ScriptedTransport::new(vec![Err(DashError::Network(
            "connection refused".to_string(),
        ))]);
        let err = fetcher(transport).fetch(|_| {}).await.unwrap_err();
        assert!(matches!(err, DashError::Network(_)));
    }

    #[tokio::test]
    async fn test_store_writes_rendered_document() {
        let transport = ScriptedTransport::new(vec![
            Ok(r#"{"result":"TOK2"}"#.to_string()),
            Ok(r#"{"result":true}"#.to_string()),
        ]);
        let document = RulesDocument::parse("rules:\n- GEOIP,CN,DIRECT\n");

        fetcher(transport.clone()).store(&document).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].0.path(), "/cgi-bin/luci/rpc/fs");
        assert_eq!(requests[1].0.query(), Some("auth=TOK2"));
        assert_eq!(
            requests[1].1["params"][0],
            json!("/etc/openclash/custom/openclash_custom_rules.list")
        );
    }
}
