use std::collections::HashMap;

use b2c_core::{Account, ProviderError, TokenResult};
use b2c_session::{InteractiveRequest, SurfaceError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tracing::warn;
use url::Url;

const DEFAULT_EXPIRES_IN_SECONDS: i64 = 3600;
const OIDC_SCOPES: &str = "openid offline_access";

/// Authorize URL for the implicit `id_token token` flow against the request's authority.
pub(crate) fn authorize_url(
    request: &InteractiveRequest,
    client_id: &str,
    redirect_uri: &str,
    nonce: &str,
) -> Result<Url, SurfaceError> {
    let mut url = Url::parse(&request.authority.authorize_endpoint())
        .map_err(|err| SurfaceError::Unavailable(err.to_string()))?;
    let scope = format!("{OIDC_SCOPES} {}", request.scopes.to_scope_string());
    let state = request.correlation_id.to_string();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("client_id", client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "id_token token")
            .append_pair("response_mode", "fragment")
            .append_pair("scope", scope.trim())
            .append_pair("state", &state)
            .append_pair("nonce", nonce)
            .append_pair("prompt", request.prompt.as_str());
        if let Some(hint) = request.login_hint.as_deref() {
            query.append_pair("login_hint", hint);
        }
    }
    Ok(url)
}

/// Turns the redirect URL pasted by the user into a token result.
///
/// An empty input means the user gave up. The id token signature is not
/// verified; the result only ever reaches the local cache.
pub(crate) fn parse_redirect(
    input: &str,
    request: &InteractiveRequest,
    nonce: &str,
) -> Result<TokenResult, SurfaceError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SurfaceError::Cancelled);
    }
    let url = Url::parse(input)
        .map_err(|err| invalid("invalid_redirect", format!("not a url: {err}")))?;
    let raw = url.fragment().or_else(|| url.query()).unwrap_or_default();
    let params: HashMap<String, String> = url::form_urlencoded::parse(raw.as_bytes())
        .into_owned()
        .collect();

    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(String::as_str)
            .unwrap_or_default();
        return Err(ProviderError::from_oauth(error, description).into());
    }
    match params.get("state") {
        Some(state) if *state != request.correlation_id.to_string() => {
            return Err(invalid("invalid_state", "state does not match the request"));
        }
        Some(_) => {}
        None => warn!(event = "redirect_state_missing", correlation_id = %request.correlation_id),
    }

    let access_token = params
        .get("access_token")
        .filter(|token| !token.is_empty())
        .ok_or_else(|| invalid("invalid_response", "missing access_token"))?;
    let id_token = params
        .get("id_token")
        .ok_or_else(|| invalid("invalid_response", "missing id_token"))?;
    let expires_on = expires_on(params.get("expires_in").map(String::as_str))?;

    let claims = decode_claims(id_token)?;
    if let Some(claimed) = claims.get("nonce").and_then(Value::as_str) {
        if claimed != nonce {
            return Err(invalid("invalid_nonce", "id token nonce does not match"));
        }
    }
    let account = account_from_claims(claims)?;

    Ok(TokenResult {
        access_token: access_token.clone(),
        expires_on,
        account,
        scopes: request.scopes.clone(),
        authority: request.authority.clone(),
        id_token: Some(id_token.clone()),
        refresh_token: params.get("refresh_token").cloned(),
    })
}

/// Absolute expiry for a relative `expires_in`, defaulting when absent.
fn expires_on(expires_in: Option<&str>) -> Result<DateTime<Utc>, SurfaceError> {
    let seconds = match expires_in {
        Some(value) => value
            .parse::<i64>()
            .ok()
            .filter(|seconds| *seconds >= 0)
            .ok_or_else(|| invalid("invalid_response", format!("invalid expires_in {value}")))?,
        None => DEFAULT_EXPIRES_IN_SECONDS,
    };
    Duration::try_seconds(seconds)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| {
            invalid(
                "invalid_response",
                format!("expires_in out of range: {seconds}"),
            )
        })
}

pub(crate) fn decode_claims(id_token: &str) -> Result<Map<String, Value>, SurfaceError> {
    let payload = id_token
        .split('.')
        .nth(1)
        .ok_or_else(|| invalid("invalid_id_token", "expected three segments"))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|err| invalid("invalid_id_token", err.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|err| invalid("invalid_id_token", err.to_string()))
}

/// Builds the account as `<oid>-<policy>.<tid>` from the id token claims.
pub(crate) fn account_from_claims(claims: Map<String, Value>) -> Result<Account, SurfaceError> {
    let claim = |name: &str| claims.get(name).and_then(Value::as_str).map(str::to_string);
    let object_id = claim("oid")
        .or_else(|| claim("sub"))
        .ok_or_else(|| invalid("invalid_id_token", "missing oid and sub claims"))?;
    let policy = claim("tfp")
        .or_else(|| claim("acr"))
        .ok_or_else(|| invalid("invalid_id_token", "missing tfp and acr claims"))?
        .to_ascii_lowercase();
    let home_account_id = match claim("tid") {
        Some(tenant_id) => format!("{object_id}-{policy}.{tenant_id}"),
        None => format!("{object_id}-{policy}"),
    };
    let display_name = claim("name");
    Ok(Account {
        home_account_id: home_account_id.as_str().into(),
        display_name,
        id_token_claims: claims,
    })
}

fn invalid(error: &str, description: impl Into<String>) -> SurfaceError {
    SurfaceError::Provider(ProviderError::new(error, description))
}
