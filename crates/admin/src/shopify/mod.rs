//! Shopify Admin API client (HIGH PRIVILEGE).
//!
//! # Security
//!
//! **This module holds the high-privilege Shopify Admin API token.**
//!
//! The client reads and writes:
//! - Discount nodes (list, look up, create app discounts, delete)
//! - Shop metafields (the persisted discount configuration)
//!
//! # Architecture
//!
//! - GraphQL documents live in `graphql/admin/`, one typed operation per
//!   query or mutation
//! - Direct API calls to Shopify (no local database)
//! - Errors map onto [`crate::store::StoreError`] so the sync pipeline can
//!   tell a confirmed absence from a transient failure
//!
//! # Example
//!
//! ```rust,ignore
//! use discount_sync_admin::shopify::AdminClient;
//!
//! let client = AdminClient::new(&config.shopify, config.sync.request_timeout)?;
//!
//! let discounts = client.list_discount_nodes().await?;
//! let records = client.get_shop_metafield("config", "records").await?;
//! ```

mod admin;

pub use admin::AdminClient;
pub use admin::queries;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur when interacting with Shopify Admin API.
#[derive(Debug, Error)]
pub enum AdminShopifyError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Shopify returned a 5xx status.
    #[error("Server error: HTTP {0}")]
    Server(u16),

    /// GraphQL query returned errors.
    #[error("GraphQL errors: {}", format_graphql_errors(.0))]
    GraphQL(Vec<GraphQLError>),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by Shopify.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Authentication/authorization failed.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User error from mutation (e.g., invalid input).
    #[error("User error: {0}")]
    UserError(String),
}

impl AdminShopifyError {
    /// Whether Shopify rejected an ID as malformed or unknown.
    #[must_use]
    pub fn is_invalid_id(&self) -> bool {
        match self {
            Self::GraphQL(errors) => errors.iter().any(|e| {
                let message = e.message.to_lowercase();
                message.contains("invalid id") || message.contains("invalid global id")
            }),
            _ => false,
        }
    }
}

impl From<AdminShopifyError> for StoreError {
    fn from(err: AdminShopifyError) -> Self {
        if err.is_invalid_id() {
            return Self::NotFound(err.to_string());
        }
        match err {
            AdminShopifyError::NotFound(id) => Self::NotFound(id),
            AdminShopifyError::RateLimited(secs) => Self::RateLimited(secs),
            AdminShopifyError::Unauthorized(msg) => Self::Unauthorized(msg),
            AdminShopifyError::Http(e) => Self::Transient(e.to_string()),
            e @ AdminShopifyError::Server(_) => Self::Transient(e.to_string()),
            e @ (AdminShopifyError::GraphQL(_) | AdminShopifyError::UserError(_)) => {
                Self::Rejected(e.to_string())
            }
            AdminShopifyError::Parse(e) => Self::Serialization(e.to_string()),
        }
    }
}

/// A GraphQL error returned by the Shopify Admin API.
#[derive(Debug, Clone)]
pub struct GraphQLError {
    /// Error message.
    pub message: String,
    /// Source locations in the query.
    pub locations: Vec<GraphQLErrorLocation>,
    /// Path to the error in the response.
    pub path: Vec<serde_json::Value>,
}

/// Location in a GraphQL query where an error occurred.
#[derive(Debug, Clone)]
pub struct GraphQLErrorLocation {
    /// Line number (1-indexed).
    pub line: i64,
    /// Column number (1-indexed).
    pub column: i64,
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.clone())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graphql(message: &str) -> AdminShopifyError {
        AdminShopifyError::GraphQL(vec![GraphQLError {
            message: message.to_string(),
            locations: vec![],
            path: vec![],
        }])
    }

    #[test]
    fn test_graphql_error_formatting() {
        let err = AdminShopifyError::GraphQL(vec![
            GraphQLError {
                message: "Field not found".to_string(),
                locations: vec![],
                path: vec![],
            },
            GraphQLError {
                message: "Access denied".to_string(),
                locations: vec![],
                path: vec![],
            },
        ]);
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Field not found; Access denied"
        );
    }

    #[test]
    fn test_invalid_id_maps_to_not_found() {
        let err = graphql("Invalid id: gid://shopify/DiscountAutomaticNode/abc");
        assert!(err.is_invalid_id());
        assert!(StoreError::from(err).is_confirmed_absent());
    }

    #[test]
    fn test_other_graphql_errors_are_rejections() {
        let err = StoreError::from(graphql("Field 'foo' doesn't exist on type 'Shop'"));
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(!err.is_confirmed_absent());
    }

    #[test]
    fn test_transient_mappings() {
        assert!(StoreError::from(AdminShopifyError::RateLimited(2)).is_transient());
        assert!(StoreError::from(AdminShopifyError::Server(502)).is_transient());
        assert!(!StoreError::from(AdminShopifyError::Unauthorized("x".into())).is_transient());
    }

    #[test]
    fn test_not_found_maps_through() {
        let err = StoreError::from(AdminShopifyError::NotFound("gid://1".to_string()));
        assert!(err.is_confirmed_absent());
    }

    #[test]
    fn test_rate_limited_error() {
        let err = AdminShopifyError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
