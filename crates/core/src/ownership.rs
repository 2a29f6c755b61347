//! Ownership classification for remote discount objects.
//!
//! Decides whether a remote object was created by this application. The
//! decision is a pure function of the object, the set of local record titles
//! and an [`OwnershipPolicy`], so deletion decisions can be audited and tested
//! without the network.
//!
//! # Decision order (first match wins)
//!
//! 1. Title matches a local record: [`OwnershipReason::TitleMatch`].
//! 2. App metadata names this app (handle/title substring, case-insensitive,
//!    or exact function ID): [`OwnershipReason::AppMetadata`].
//! 3. App discount without resolvable metadata:
//!    [`OwnershipReason::UnattributedAppDiscount`].
//! 4. A plain kind this app is known to create:
//!    [`OwnershipReason::KnownPlainKind`].
//! 5. Otherwise [`Ownership::NotOwned`].
//!
//! Rules 3 and 4 are heuristics. They are only applied when
//! [`OwnershipPolicy::heuristic_fallbacks`] is set.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{AppMetadata, PlainKind, RemoteObjectKind, RemoteObjectRef};

/// Why an object was classified as owned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipReason {
    /// The title matches a local record.
    TitleMatch,
    /// App metadata identifies this application.
    AppMetadata,
    /// App-extension discount with no attribution (heuristic).
    UnattributedAppDiscount,
    /// Plain discount kind this application creates (heuristic).
    KnownPlainKind,
}

impl OwnershipReason {
    /// Whether the reason ties the object to a specific local record.
    #[must_use]
    pub const fn has_local_counterpart(self) -> bool {
        matches!(self, Self::TitleMatch)
    }

    /// Whether the reason is one of the liberal fallbacks.
    #[must_use]
    pub const fn is_heuristic(self) -> bool {
        matches!(self, Self::UnattributedAppDiscount | Self::KnownPlainKind)
    }
}

/// Outcome of classifying one remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "ownership", content = "reason", rename_all = "snake_case")]
pub enum Ownership {
    Owned(OwnershipReason),
    NotOwned,
}

impl Ownership {
    /// Whether the object belongs to this application.
    #[must_use]
    pub const fn is_owned(self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Whether the object is ours but has no local counterpart.
    #[must_use]
    pub const fn is_orphan(self) -> bool {
        matches!(self, Self::Owned(reason) if !reason.has_local_counterpart())
    }
}

/// What this application knows about its own remote footprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipPolicy {
    /// This app's handle.
    pub app_handle: String,
    /// This app's title, if different from the handle.
    pub app_title: Option<String>,
    /// Function ID the app's discounts run on.
    pub function_id: Option<String>,
    /// Plain kinds this app has been known to create.
    pub known_plain_kinds: HashSet<PlainKind>,
    /// Apply rules 3 and 4.
    pub heuristic_fallbacks: bool,
}

impl OwnershipPolicy {
    /// Policy for `app_handle` with the default fallbacks enabled.
    #[must_use]
    pub fn new(app_handle: impl Into<String>) -> Self {
        Self {
            app_handle: app_handle.into(),
            app_title: None,
            function_id: None,
            known_plain_kinds: [PlainKind::Basic, PlainKind::FreeShipping]
                .into_iter()
                .collect(),
            heuristic_fallbacks: true,
        }
    }

    fn names_this_app(&self, metadata: &AppMetadata) -> bool {
        let contains = |field: Option<&str>, needle: &str| {
            let needle = needle.trim().to_lowercase();
            !needle.is_empty()
                && field.is_some_and(|value| value.to_lowercase().contains(&needle))
        };

        let handle = metadata.handle.as_deref();
        let title = metadata.title.as_deref();
        let by_handle = contains(handle, &self.app_handle) || contains(title, &self.app_handle);
        let by_title = self
            .app_title
            .as_deref()
            .is_some_and(|t| contains(title, t) || contains(handle, t));
        let by_function = match (&self.function_id, &metadata.function_id) {
            (Some(ours), Some(theirs)) => !ours.is_empty() && ours == theirs,
            _ => false,
        };

        by_handle || by_title || by_function
    }
}

/// Classify `remote` against the titles of the surviving local records.
#[must_use]
pub fn classify(
    remote: &RemoteObjectRef,
    local_titles: &HashSet<String>,
    policy: &OwnershipPolicy,
) -> Ownership {
    if local_titles.contains(&remote.title) {
        return Ownership::Owned(OwnershipReason::TitleMatch);
    }

    let metadata = remote.kind.app_metadata().filter(|m| m.is_resolvable());
    if let Some(metadata) = metadata {
        // Resolvable metadata is authoritative: another app's discount is
        // never claimed by the fallbacks below.
        return if policy.names_this_app(metadata) {
            Ownership::Owned(OwnershipReason::AppMetadata)
        } else {
            Ownership::NotOwned
        };
    }

    if !policy.heuristic_fallbacks {
        return Ownership::NotOwned;
    }

    match &remote.kind {
        RemoteObjectKind::App { .. } => Ownership::Owned(OwnershipReason::UnattributedAppDiscount),
        kind => match kind.plain_kind() {
            Some(plain) if policy.known_plain_kinds.contains(&plain) => {
                Ownership::Owned(OwnershipReason::KnownPlainKind)
            }
            _ => Ownership::NotOwned,
        },
    }
}

/// Shorthand for `classify(..).is_owned()`.
#[must_use]
pub fn is_owned(
    remote: &RemoteObjectRef,
    local_titles: &HashSet<String>,
    policy: &OwnershipPolicy,
) -> bool {
    classify(remote, local_titles, policy).is_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DiscountMethod, RemoteRef, RemoteStatus};

    fn remote(title: &str, kind: RemoteObjectKind) -> RemoteObjectRef {
        RemoteObjectRef {
            id: RemoteRef::new(format!("gid://shopify/DiscountAutomaticNode/{title}")),
            title: title.to_string(),
            status: RemoteStatus::Active,
            method: DiscountMethod::Automatic,
            kind,
        }
    }

    fn app(handle: Option<&str>, title: Option<&str>) -> RemoteObjectKind {
        RemoteObjectKind::App {
            metadata: Some(AppMetadata {
                handle: handle.map(String::from),
                title: title.map(String::from),
                function_id: None,
            }),
        }
    }

    fn titles(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn policy() -> OwnershipPolicy {
        let mut policy = OwnershipPolicy::new("tiered-discounts");
        policy.app_title = Some("Tiered Discounts".to_string());
        policy.function_id = Some("fn-123".to_string());
        policy
    }

    #[test]
    fn test_title_match_wins_over_everything() {
        let obj = remote("Spring", app(Some("someone-else"), None));
        assert_eq!(
            classify(&obj, &titles(&["Spring"]), &policy()),
            Ownership::Owned(OwnershipReason::TitleMatch)
        );
        assert!(!classify(&obj, &titles(&["Spring"]), &policy()).is_orphan());
    }

    #[test]
    fn test_metadata_handle_substring_case_insensitive() {
        let obj = remote("Old", app(Some("Tiered-Discounts-Staging"), None));
        let ownership = classify(&obj, &titles(&[]), &policy());
        assert_eq!(ownership, Ownership::Owned(OwnershipReason::AppMetadata));
        assert!(ownership.is_orphan());
    }

    #[test]
    fn test_metadata_title_match() {
        let obj = remote("Old", app(None, Some("tiered discounts")));
        assert!(is_owned(&obj, &titles(&[]), &policy()));
    }

    #[test]
    fn test_metadata_function_id_match() {
        let obj = remote(
            "Old",
            RemoteObjectKind::App {
                metadata: Some(AppMetadata {
                    handle: Some("renamed".to_string()),
                    title: None,
                    function_id: Some("fn-123".to_string()),
                }),
            },
        );
        assert!(is_owned(&obj, &titles(&[]), &policy()));
    }

    #[test]
    fn test_other_apps_discount_is_not_owned() {
        let obj = remote("Theirs", app(Some("bundle-builder"), Some("Bundle Builder")));
        assert_eq!(classify(&obj, &titles(&[]), &policy()), Ownership::NotOwned);
    }

    #[test]
    fn test_unattributed_app_discount_is_owned_by_fallback() {
        let obj = remote("Mystery", RemoteObjectKind::App { metadata: None });
        assert_eq!(
            classify(&obj, &titles(&[]), &policy()),
            Ownership::Owned(OwnershipReason::UnattributedAppDiscount)
        );

        let blank = remote("Blank", app(Some(""), Some(" ")));
        assert_eq!(
            classify(&blank, &titles(&[]), &policy()),
            Ownership::Owned(OwnershipReason::UnattributedAppDiscount)
        );
    }

    #[test]
    fn test_known_plain_kinds() {
        assert_eq!(
            classify(&remote("b", RemoteObjectKind::Basic), &titles(&[]), &policy()),
            Ownership::Owned(OwnershipReason::KnownPlainKind)
        );
        assert_eq!(
            classify(&remote("x", RemoteObjectKind::Bxgy), &titles(&[]), &policy()),
            Ownership::NotOwned
        );
        let unknown = RemoteObjectKind::Unknown {
            type_name: "DiscountFuture".to_string(),
        };
        assert_eq!(
            classify(&remote("u", unknown), &titles(&[]), &policy()),
            Ownership::NotOwned
        );
    }

    #[test]
    fn test_fallbacks_can_be_disabled() {
        let mut strict = policy();
        strict.heuristic_fallbacks = false;
        assert!(!is_owned(
            &remote("Mystery", RemoteObjectKind::App { metadata: None }),
            &titles(&[]),
            &strict
        ));
        assert!(!is_owned(
            &remote("b", RemoteObjectKind::Basic),
            &titles(&[]),
            &strict
        ));
        assert!(is_owned(
            &remote("Old", app(Some("tiered-discounts"), None)),
            &titles(&[]),
            &strict
        ));
    }

    #[test]
    fn test_blank_app_handle_never_matches() {
        let mut blank = policy();
        blank.app_handle = String::new();
        blank.app_title = None;
        blank.function_id = None;
        let obj = remote("Old", app(Some("anything"), None));
        assert_eq!(classify(&obj, &titles(&[]), &blank), Ownership::NotOwned);
    }
}
