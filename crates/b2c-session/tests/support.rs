#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use b2c_core::{
    Account, Authority, AuthorityResolver, B2cConfig, Policy, ProviderError, ScopeSet, TokenResult,
};
use b2c_keystore::MemoryTokenCache;
use b2c_session::{
    InteractiveRequest, InteractiveSurface, RefreshRequest, SurfaceError, TokenRefresher,
};
use chrono::Utc;
use serde_json::{json, Map, Value};

pub const SCOPE: &str = "https://fabrikamb2c.onmicrosoft.com/demoapi/demo.read";
pub const EMAIL: &str = "alice@example.com";

pub fn config() -> B2cConfig {
    B2cConfig::from_yaml_str(
        r#"
tenant: fabrikamb2c.onmicrosoft.com
client_id: 90c0fe63-bcf2-44d5-8fb7-b8bbc0b29dc6
redirect_uri: "msal90c0fe63-bcf2-44d5-8fb7-b8bbc0b29dc6://auth"
policies:
  sign_in: b2c_1_susi
  edit_profile: b2c_1_edit_profile
  reset_password: b2c_1_reset
scopes:
  - https://fabrikamb2c.onmicrosoft.com/demoapi/demo.read
"#,
    )
    .expect("config")
}

pub fn resolver() -> Arc<AuthorityResolver> {
    Arc::new(AuthorityResolver::from_config(&config()))
}

pub fn authority(policy: Policy) -> Authority {
    resolver().for_policy(policy).expect("authority")
}

pub fn scopes() -> ScopeSet {
    ScopeSet::new([SCOPE])
}

pub fn account_id(object: &str, policy_name: &str) -> String {
    format!("{object}-{policy_name}.f00dcafe")
}

pub fn account(id: &str) -> Account {
    let mut claims = Map::new();
    claims.insert("emails".to_string(), json!([EMAIL]));
    claims.insert("name".to_string(), Value::String("Alice".to_string()));
    Account {
        home_account_id: id.into(),
        display_name: Some("Alice".to_string()),
        id_token_claims: claims,
    }
}

pub fn token(
    authority: &Authority,
    scopes: &ScopeSet,
    id: &str,
    access: &str,
    expires_in_seconds: i64,
) -> TokenResult {
    TokenResult {
        access_token: access.to_string(),
        expires_on: Utc::now() + chrono::Duration::seconds(expires_in_seconds),
        account: account(id),
        scopes: scopes.clone(),
        authority: authority.clone(),
        id_token: Some("header.payload.signature".to_string()),
        refresh_token: Some(format!("refresh-{id}")),
    }
}

pub fn memory_cache() -> Arc<MemoryTokenCache> {
    Arc::new(MemoryTokenCache::new())
}

/// Scripted behaviour for one `present` call.
pub enum Step {
    /// Complete the flow as the given account id.
    SignIn(String),
    Fail(SurfaceError),
    /// Never complete.
    Hang,
}

/// Interactive surface that replays scripted steps and records requests.
#[derive(Default)]
pub struct ScriptedSurface {
    steps: Mutex<VecDeque<Step>>,
    requests: Mutex<Vec<InteractiveRequest>>,
}

impl ScriptedSurface {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn push(&self, step: Step) {
        self.steps.lock().expect("steps").push_back(step);
    }

    pub fn requests(&self) -> Vec<InteractiveRequest> {
        self.requests.lock().expect("requests").clone()
    }

    pub fn presented(&self) -> usize {
        self.requests.lock().expect("requests").len()
    }
}

#[async_trait]
impl InteractiveSurface for ScriptedSurface {
    async fn present(&self, request: InteractiveRequest) -> Result<TokenResult, SurfaceError> {
        let count = {
            let mut requests = self.requests.lock().expect("requests");
            requests.push(request.clone());
            requests.len()
        };
        let step = self.steps.lock().expect("steps").pop_front();
        match step {
            Some(Step::SignIn(id)) => Ok(token(
                &request.authority,
                &request.scopes,
                &id,
                &format!("interactive-{count}"),
                3600,
            )),
            Some(Step::Fail(err)) => Err(err),
            Some(Step::Hang) => {
                std::future::pending::<()>().await;
                Err(SurfaceError::Unavailable("unreachable".to_string()))
            }
            None => Err(SurfaceError::Unavailable("no scripted step".to_string())),
        }
    }
}

/// Refresher that replays scripted results; `Ok` carries the new access token.
#[derive(Default)]
pub struct ScriptedRefresher {
    results: Mutex<VecDeque<Result<String, ProviderError>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRefresher {
    pub fn new(results: impl IntoIterator<Item = Result<String, ProviderError>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Refresh credentials seen so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }
}

#[async_trait]
impl TokenRefresher for ScriptedRefresher {
    async fn refresh(&self, request: RefreshRequest) -> Result<TokenResult, ProviderError> {
        self.calls
            .lock()
            .expect("calls")
            .push(request.refresh_token.clone());
        tokio::time::sleep(Duration::from_millis(1)).await;
        let next = self
            .results
            .lock()
            .expect("results")
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::transport("no scripted result")));
        next.map(|access| {
            let mut result = token(
                &request.authority,
                &request.scopes,
                request.account.home_account_id.as_str(),
                &access,
                3600,
            );
            result.refresh_token = None;
            result
        })
    }
}
