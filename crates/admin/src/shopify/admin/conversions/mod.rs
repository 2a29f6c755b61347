//! Conversions from GraphQL response types to domain types.

use discount_sync_core::{
    AppMetadata, DiscountMethod, RemoteObjectKind, RemoteObjectRef, RemoteRef, RemoteStatus,
};

use super::queries::{AppDiscountType, DiscountNode};

/// Which delete mutation applies to a discount node ID.
#[must_use]
pub fn method_from_gid(id: &str) -> DiscountMethod {
    if id.contains("/DiscountCodeNode/") {
        DiscountMethod::Code
    } else {
        DiscountMethod::Automatic
    }
}

fn convert_app_metadata(app_type: Option<AppDiscountType>) -> Option<AppMetadata> {
    app_type.map(|t| {
        let (handle, title) = t.app.map_or((None, None), |a| (a.handle, a.title));
        AppMetadata {
            handle,
            title,
            function_id: t.function_id,
        }
    })
}

/// Convert a discount node into a remote object.
#[must_use]
pub fn convert_discount_node(node: DiscountNode) -> RemoteObjectRef {
    let discount = node.discount;
    let typename = discount.typename.as_str();

    let method = if typename.starts_with("DiscountCode") {
        DiscountMethod::Code
    } else if typename.starts_with("DiscountAutomatic") {
        DiscountMethod::Automatic
    } else {
        method_from_gid(&node.id)
    };

    let kind = match typename {
        "DiscountAutomaticApp" | "DiscountCodeApp" => RemoteObjectKind::App {
            metadata: convert_app_metadata(discount.app_discount_type),
        },
        "DiscountAutomaticBasic" | "DiscountCodeBasic" => RemoteObjectKind::Basic,
        "DiscountAutomaticBxgy" | "DiscountCodeBxgy" => RemoteObjectKind::Bxgy,
        "DiscountAutomaticFreeShipping" | "DiscountCodeFreeShipping" => {
            RemoteObjectKind::FreeShipping
        }
        other => RemoteObjectKind::Unknown {
            type_name: other.to_string(),
        },
    };

    RemoteObjectRef {
        id: RemoteRef::new(node.id),
        title: discount.title.unwrap_or_default(),
        status: discount
            .status
            .unwrap_or_else(|| RemoteStatus::Other("UNKNOWN".to_string())),
        method,
        kind,
    }
}
