//! Remote discount objects as listed by the platform.
//!
//! These are produced by listing the remote registry during a reconciliation
//! pass and are never persisted locally.

use serde::{Deserialize, Serialize};

use super::id::RemoteRef;
use super::record::{Activation, Classification, CombineFlags, DiscountRecord};
use super::status::{DiscountMethod, RemoteStatus};

/// App attribution attached to app-extension discounts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppMetadata {
    /// App handle (e.g. `tiered-discounts`).
    pub handle: Option<String>,
    /// App title as shown in the admin.
    pub title: Option<String>,
    /// Shopify Function ID backing the discount.
    pub function_id: Option<String>,
}

impl AppMetadata {
    /// Whether any attribution field carries a non-blank value.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        [&self.handle, &self.title, &self.function_id]
            .into_iter()
            .any(|f| f.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }
}

/// Shape of a remote discount object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteObjectKind {
    /// Amount-off discount (percentage or fixed).
    Basic,
    /// Buy X get Y.
    Bxgy,
    /// Free shipping.
    FreeShipping,
    /// Discount backed by an app function.
    App {
        /// Attribution, when the platform resolved it.
        metadata: Option<AppMetadata>,
    },
    /// A type name this build does not recognise.
    Unknown { type_name: String },
}

/// Plain (non-app) discount kinds, used by ownership policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlainKind {
    Basic,
    Bxgy,
    FreeShipping,
}

impl RemoteObjectKind {
    /// The plain kind, if this is not an app or unrecognised discount.
    #[must_use]
    pub const fn plain_kind(&self) -> Option<PlainKind> {
        match self {
            Self::Basic => Some(PlainKind::Basic),
            Self::Bxgy => Some(PlainKind::Bxgy),
            Self::FreeShipping => Some(PlainKind::FreeShipping),
            Self::App { .. } | Self::Unknown { .. } => None,
        }
    }

    /// Attribution, for app discounts.
    #[must_use]
    pub const fn app_metadata(&self) -> Option<&AppMetadata> {
        match self {
            Self::App { metadata } => metadata.as_ref(),
            _ => None,
        }
    }
}

/// A discount object listed from the remote registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteObjectRef {
    /// Remote ID (Shopify discount node GID).
    pub id: RemoteRef,
    /// Discount title.
    pub title: String,
    /// Remote status.
    pub status: RemoteStatus,
    /// Automatic or code.
    pub method: DiscountMethod,
    /// Shape and per-kind payload.
    pub kind: RemoteObjectKind,
}

/// Input for creating a remote discount object from a local record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteObjectSpec {
    /// Title; matches the record name so ownership can be proven by title.
    pub title: String,
    /// Automatic or code.
    pub method: DiscountMethod,
    /// Redeem code for code discounts.
    pub code: Option<String>,
    /// Discount class.
    pub classification: Classification,
    /// Stacking rules.
    pub combine_flags: CombineFlags,
    /// Function that executes the discount.
    pub function_id: Option<String>,
    /// Start time (ISO 8601).
    pub starts_at: String,
}

impl RemoteObjectSpec {
    /// Build the creation input for `record`.
    #[must_use]
    pub fn from_record(record: &DiscountRecord, function_id: Option<&str>) -> Self {
        let method = match record.activation {
            Activation::Automatic => DiscountMethod::Automatic,
            Activation::Code => DiscountMethod::Code,
        };
        Self {
            title: record.name.clone(),
            method,
            code: record.code.clone(),
            classification: record.classification,
            combine_flags: record.combine_flags,
            function_id: function_id.map(String::from),
            starts_at: record.created_at.to_rfc3339(),
        }
    }
}
