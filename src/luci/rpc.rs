use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use url::Url;

use super::transport::RpcTransport;
use crate::error::{DashError, DashResult};

const RPC_PATH: &str = "/cgi-bin/luci/rpc";
const NO_TOKEN: &str = "the router did not return a valid token";

/// LuCI login credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Raw body of `rpc/auth` login responses
#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Login outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    Token(String),
    Rejected(String),
}

impl From<AuthResponse> for AuthResult {
    fn from(response: AuthResponse) -> Self {
        if let Some(message) = error_message(response.error.as_ref()) {
            return AuthResult::Rejected(message);
        }

        match response.result {
            Some(token) if !token.is_empty() => AuthResult::Token(token),
            _ => AuthResult::Rejected(NO_TOKEN.to_string()),
        }
    }
}

/// Raw body of `rpc/sys` exec responses
#[derive(Debug, Clone, Deserialize)]
pub struct ExecResponse {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// Remote command outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecResult {
    Output(String),
    Failed(String),
}

impl TryFrom<ExecResponse> for ExecResult {
    type Error = DashError;

    fn try_from(response: ExecResponse) -> DashResult<Self> {
        if let Some(message) = error_message(response.error.as_ref()) {
            return Ok(ExecResult::Failed(message));
        }

        response
            .result
            .map(ExecResult::Output)
            .ok_or_else(|| DashError::Network("Router response is missing 'result'".to_string()))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WriteResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

/// `null` and empty strings count as "no error"
fn error_message(error: Option<&Value>) -> Option<String> {
    match error? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Client for OpenWRT's LuCI JSON-RPC API
#[derive(Debug, Clone)]
pub struct LuciClient<T> {
    base_url: Url,
    transport: T,
}

impl<T: RpcTransport> LuciClient<T> {
    pub fn new(base_url: Url, transport: T) -> Self {
        Self {
            base_url,
            transport,
        }
    }

    /// `{http|https}://{host}:{port}`
    pub fn base_url(host: &str, port: u16, use_tls: bool) -> DashResult<Url> {
        let scheme = if use_tls { "https" } else { "http" };
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        Ok(Url::parse(&format!("{}://{}:{}", scheme, host, port))?)
    }

    fn endpoint(&self, module: &str, token: Option<&str>) -> DashResult<Url> {
        let mut url = self.base_url.join(&format!("{}/{}", RPC_PATH, module))?;
        if let Some(token) = token {
            url.query_pairs_mut().append_pair("auth", token);
        }
        Ok(url)
    }

    async fn call<R: DeserializeOwned>(&self, url: &Url, body: Value) -> DashResult<R> {
        let text = self.transport.post_json(url, &body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Exchange credentials for a session token
    pub async fn login(&self, credentials: &Credentials) -> DashResult<String> {
        let url = self.endpoint("auth", None)?;
        let body = json!({
            "id": 1,
            "method": "login",
            "params": [credentials.username, credentials.password],
        });

        let response: AuthResponse = self.call(&url, body).await?;
        match AuthResult::from(response) {
            AuthResult::Token(token) => Ok(token),
            AuthResult::Rejected(message) => Err(DashError::Auth(message)),
        }
    }

    /// Run a shell command on the router and return its output
    pub async fn exec(&self, token: &str, command: &str) -> DashResult<String> {
        let url = self.endpoint("sys", Some(token))?;
        let body = json!({
            "method": "exec",
            "params": [command],
        });

        let response: ExecResponse = self.call(&url, body).await?;
        match ExecResult::try_from(response)? {
            ExecResult::Output(text) => Ok(text),
            ExecResult::Failed(message) => Err(DashError::Server(message)),
        }
    }

    /// Replace a file on the router through the `fs` module
    pub async fn write_file(&self, token: &str, path: &str, contents: &str) -> DashResult<()> {
        let url = self.endpoint("fs", Some(token))?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(contents.as_bytes());
        let body = json!({
            "method": "writefile",
            "params": [path, encoded],
        });

        let response: WriteResponse = self.call(&url, body).await?;
        if let Some(message) = error_message(response.error.as_ref()) {
            return Err(DashError::Server(message));
        }

        match response.result {
            Some(Value::Bool(true)) => Ok(()),
            _ => Err(DashError::Server(format!("Failed to write {}", path))),
        }
    }
}
