//! Shopify Admin API GraphQL client.
//!
//! Authenticates with a static Admin API access token. Operations live in
//! submodules as `impl AdminClient` blocks, and the `store` submodule adapts them to
//! [`crate::store::RemoteStore`].

use std::sync::Arc;
use std::time::Duration;

use graphql_client::{GraphQLQuery, PathFragment, Response};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::config::ShopifyAdminConfig;

use super::{AdminShopifyError, GraphQLError, GraphQLErrorLocation};

mod conversions;
mod discounts;
mod metafields;
pub mod queries;
mod store;

use queries::{GetShopId, UserError};

/// Page size for connection queries.
const PAGE_SIZE: i64 = 100;

/// Shopify Admin API GraphQL client.
///
/// Cheap to clone; clones share the HTTP connection pool and the cached
/// shop ID.
///
/// # Security
///
/// The access token has HIGH PRIVILEGE access to the store. It is never
/// logged.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    client: reqwest::Client,
    store: String,
    api_version: String,
    access_token: SecretString,
    /// Owner ID for shop metafields, fetched once.
    shop_id: OnceCell<String>,
}

impl From<graphql_client::Error> for GraphQLError {
    fn from(e: graphql_client::Error) -> Self {
        let locations = e
            .locations
            .unwrap_or_default()
            .into_iter()
            .map(|l| GraphQLErrorLocation {
                line: i64::from(l.line),
                column: i64::from(l.column),
            })
            .collect();
        let path = e
            .path
            .unwrap_or_default()
            .into_iter()
            .map(|fragment| match fragment {
                PathFragment::Key(key) => serde_json::Value::String(key),
                PathFragment::Index(index) => serde_json::Value::from(index),
            })
            .collect();
        Self {
            message: e.message,
            locations,
            path,
        }
    }
}

/// Whether Shopify throttled the query (cost limit exceeded).
fn is_throttled(error: &graphql_client::Error) -> bool {
    error
        .extensions
        .as_ref()
        .and_then(|x| x.get("code"))
        .and_then(serde_json::Value::as_str)
        == Some("THROTTLED")
}

impl AdminClient {
    /// Create a new Admin API client.
    ///
    /// `timeout` bounds each HTTP request, independently of the pipeline's
    /// own per-call deadline.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ShopifyAdminConfig, timeout: Duration) -> Result<Self, AdminShopifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            inner: Arc::new(AdminClientInner {
                client,
                store: config.store.clone(),
                api_version: config.api_version.clone(),
                access_token: config.access_token.clone(),
                shop_id: OnceCell::new(),
            }),
        })
    }

    /// Get the store domain.
    #[must_use]
    pub fn store(&self) -> &str {
        &self.inner.store
    }

    fn endpoint(&self) -> String {
        format!(
            "https://{}/admin/api/{}/graphql.json",
            self.inner.store, self.inner.api_version
        )
    }

    // =========================================================================
    // GraphQL Execution
    // =========================================================================

    /// Execute a GraphQL operation.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, AdminShopifyError> {
        let body = Q::build_query(variables);

        let response = self
            .inner
            .client
            .post(self.endpoint())
            .header("X-Shopify-Access-Token", self.inner.access_token.expose_secret())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        // Check for rate limiting
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(AdminShopifyError::RateLimited(retry_after));
        }

        // Check for unauthorized
        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AdminShopifyError::Unauthorized(
                "Invalid or revoked access token".to_string(),
            ));
        }

        if response.status().is_server_error() {
            return Err(AdminShopifyError::Server(response.status().as_u16()));
        }

        let text = response.text().await?;
        let graphql_response: Response<Q::ResponseData> = serde_json::from_str(&text)?;

        if let Some(errors) = graphql_response.errors
            && !errors.is_empty()
        {
            if errors.iter().any(is_throttled) {
                return Err(AdminShopifyError::RateLimited(1));
            }

            return Err(AdminShopifyError::GraphQL(
                errors.into_iter().map(GraphQLError::from).collect(),
            ));
        }

        graphql_response.data.ok_or_else(|| {
            AdminShopifyError::GraphQL(vec![GraphQLError {
                message: "No data in response".to_string(),
                locations: vec![],
                path: vec![],
            }])
        })
    }

    /// The shop's GID, which owns the shop-level metafields.
    ///
    /// # Errors
    ///
    /// Returns an error if the lookup fails; a later call retries it.
    #[instrument(skip(self))]
    pub async fn shop_id(&self) -> Result<&str, AdminShopifyError> {
        let id = self
            .inner
            .shop_id
            .get_or_try_init(|| async {
                let response = self
                    .execute::<GetShopId>(queries::get_shop_id::Variables {})
                    .await?;
                debug!(shop_id = %response.shop.id, "Resolved shop ID");
                Ok::<_, AdminShopifyError>(response.shop.id)
            })
            .await?;
        Ok(id.as_str())
    }
}

/// Fail with `UserError` if a mutation reported any user errors.
fn check_user_errors(errors: &[UserError]) -> Result<(), AdminShopifyError> {
    if errors.is_empty() {
        return Ok(());
    }
    let message = errors
        .iter()
        .map(|e| match &e.field {
            Some(field) if !field.is_empty() => format!("{}: {}", field.join("."), e.message),
            _ => e.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Err(AdminShopifyError::UserError(message))
}
