//! HTTP implementation of [`GrafanaApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use tracing::debug;
use url::Url;

use super::ClientResult;
use super::GrafanaApi;
use super::types::*;
use crate::constants::MAX_ERROR_BODY_LENGTH;
use crate::constants::REQUEST_TIMEOUT;
use crate::error::BuildClientSnafu;
use crate::error::ClientError;
use crate::error::EncodeSnafu;
use crate::error::RequestSnafu;

const ACCESS_POLICIES_PATH: &str = "/api/v1/accesspolicies";
const ACCESS_POLICY_TOKENS_PATH: &str = "/api/v1/tokens";
const SERVICE_ACCOUNTS_PATH: &str = "/api/serviceaccounts";
const ROLES_PATH: &str = "/api/access-control/roles";
const HOME_DASHBOARD_PATH: &str = "/api/dashboards/home";

/// HTTP client for one Grafana Cloud or Grafana base URL and one bearer token.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct GrafanaClient {
    http: reqwest::Client,
    base_url: Url,
    token: String,
}

impl std::fmt::Debug for GrafanaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrafanaClient")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

impl GrafanaClient {
    /// Create a client with the default request timeout.
    pub fn new(base_url: &str, token: impl Into<String>) -> ClientResult<Self> {
        Self::with_timeout(base_url, token, REQUEST_TIMEOUT)
    }

    /// Create a client with a custom request timeout.
    pub fn with_timeout(base_url: &str, token: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let http = reqwest::Client::builder().timeout(timeout).build().context(BuildClientSnafu)?;

        Ok(Self {
            http,
            base_url,
            token: token.into(),
        })
    }

    /// Base URL all request paths are joined onto.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Join a request path onto the base URL path, keeping any path prefix the
    /// base URL carries (e.g. a Grafana instance served under `/grafana`).
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}/{}", url.path().trim_end_matches('/'), path.trim_start_matches('/'));
        url.set_path(&joined);
        if query.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(query);
        }
        url
    }

    /// Issue a request and return the raw body of a successful response.
    async fn send<B>(&self, method: Method, path: &str, query: &[(&str, &str)], body: Option<&B>) -> ClientResult<Vec<u8>>
    where B: Serialize + ?Sized {
        let url = self.endpoint(path, query);
        debug!(method = %method, path = %path, "grafana api request");

        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body).context(EncodeSnafu)?;
            request = request.body(bytes);
        }

        let response = request.send().await.context(RequestSnafu {
            method: method.as_str(),
            path,
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| ClientError::Decode {
            reason: format!("error reading response body: {e}"),
        })?;

        if status.as_u16() > 299 {
            debug!(method = %method, path = %path, status = status.as_u16(), "grafana api error response");
            return Err(ClientError::Api {
                status: status.as_u16(),
                body: truncate_body(&bytes),
            });
        }

        Ok(bytes.to_vec())
    }

    async fn call<B, T>(&self, method: Method, path: &str, query: &[(&str, &str)], body: Option<&B>) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let bytes = self.send(method, path, query, body).await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode {
            reason: format!("error decoding json response: {e}"),
        })
    }

    async fn call_empty<B>(&self, method: Method, path: &str, query: &[(&str, &str)], body: Option<&B>) -> ClientResult<()>
    where B: Serialize + ?Sized {
        self.send(method, path, query, body).await.map(|_| ())
    }
}

/// Lossy UTF-8 view of an error body, capped at `MAX_ERROR_BODY_LENGTH` bytes.
fn truncate_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    if text.len() <= MAX_ERROR_BODY_LENGTH {
        return text.into_owned();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

fn stack_service_accounts_path(stack: &str) -> String {
    format!("/api/instances/{stack}{SERVICE_ACCOUNTS_PATH}")
}

#[async_trait]
impl GrafanaApi for GrafanaClient {
    async fn create_access_policy(
        &self,
        region: &str,
        input: &CreateCloudAccessPolicyInput,
    ) -> ClientResult<CloudAccessPolicy> {
        self.call(Method::POST, ACCESS_POLICIES_PATH, &[("region", region)], Some(input)).await
    }

    async fn delete_access_policy(&self, region: &str, access_policy_id: &str) -> ClientResult<()> {
        let path = format!("{ACCESS_POLICIES_PATH}/{access_policy_id}");
        self.call_empty::<()>(Method::DELETE, &path, &[("region", region)], None).await
    }

    async fn create_access_policy_token(
        &self,
        region: &str,
        input: &CreateCloudAccessPolicyTokenInput,
    ) -> ClientResult<CloudAccessPolicyToken> {
        self.call(Method::POST, ACCESS_POLICY_TOKENS_PATH, &[("region", region)], Some(input)).await
    }

    async fn create_cloud_service_account(
        &self,
        stack: &str,
        input: &CreateServiceAccountInput,
    ) -> ClientResult<ServiceAccount> {
        self.call(Method::POST, &stack_service_accounts_path(stack), &[], Some(input)).await
    }

    async fn create_cloud_service_account_token(
        &self,
        stack: &str,
        input: &CreateServiceAccountTokenInput,
    ) -> ClientResult<ServiceAccountToken> {
        let path = format!("{}/{}/tokens", stack_service_accounts_path(stack), input.service_account_id);
        self.call(Method::POST, &path, &[], Some(input)).await
    }

    async fn delete_cloud_service_account(&self, stack: &str, service_account_id: i64) -> ClientResult<()> {
        let path = format!("{}/{}", stack_service_accounts_path(stack), service_account_id);
        self.call_empty::<()>(Method::DELETE, &path, &[], None).await
    }

    async fn create_service_account(&self, input: &CreateServiceAccountInput) -> ClientResult<ServiceAccount> {
        self.call(Method::POST, SERVICE_ACCOUNTS_PATH, &[], Some(input)).await
    }

    async fn create_service_account_token(
        &self,
        input: &CreateServiceAccountTokenInput,
    ) -> ClientResult<ServiceAccountToken> {
        let path = format!("{SERVICE_ACCOUNTS_PATH}/{}/tokens", input.service_account_id);
        self.call(Method::POST, &path, &[], Some(input)).await
    }

    async fn delete_service_account(&self, service_account_id: i64) -> ClientResult<()> {
        let path = format!("{SERVICE_ACCOUNTS_PATH}/{service_account_id}");
        self.call_empty::<()>(Method::DELETE, &path, &[], None).await
    }

    async fn set_service_account_role_assignments(
        &self,
        input: &ServiceAccountRoleAssignmentsInput,
    ) -> ClientResult<()> {
        let path = format!("/api/access-control/users/{}/roles", input.service_account_id);
        self.call_empty(Method::PUT, &path, &[], Some(input)).await
    }

    async fn list_roles(&self) -> ClientResult<Vec<RbacRole>> {
        self.call::<(), _>(Method::GET, ROLES_PATH, &[], None).await
    }

    async fn create_custom_role(&self, input: &RbacRole) -> ClientResult<RbacRole> {
        self.call(Method::POST, ROLES_PATH, &[], Some(input)).await
    }

    async fn delete_custom_role(&self, role_uid: &str) -> ClientResult<()> {
        let path = format!("{ROLES_PATH}/{role_uid}");
        self.call_empty::<()>(Method::DELETE, &path, &[("force", "true")], None).await
    }

    async fn home_dashboard(&self) -> ClientResult<Dashboard> {
        self.call::<(), _>(Method::GET, HOME_DASHBOARD_PATH, &[], None).await
    }
}
