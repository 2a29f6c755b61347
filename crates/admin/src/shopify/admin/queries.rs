//! GraphQL operation definitions for the Shopify Admin API.
//!
//! Each operation is a unit struct implementing [`GraphQLQuery`], pairing
//! the document from `graphql/admin/` with hand-typed `Variables` and
//! `ResponseData` in the module of the same name.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

use discount_sync_core::RemoteStatus;

const DISCOUNTS_DOCUMENT: &str = include_str!("../../../graphql/admin/discounts.graphql");
const METAFIELDS_DOCUMENT: &str = include_str!("../../../graphql/admin/metafields.graphql");

macro_rules! admin_query {
    ($name:ident, $document:expr, $module:ident) => {
        pub struct $name;

        impl $name {
            /// Operation to run within [`Self::DOCUMENT`].
            pub const OPERATION_NAME: &'static str = stringify!($name);
            /// Full GraphQL document, fragments included.
            pub const DOCUMENT: &'static str = $document;
        }

        impl GraphQLQuery for $name {
            type Variables = $module::Variables;
            type ResponseData = $module::ResponseData;

            fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
                QueryBody {
                    variables,
                    query: Self::DOCUMENT,
                    operation_name: Self::OPERATION_NAME,
                }
            }
        }
    };
}

// =============================================================================
// Shared response types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

/// Mutation user error.
#[derive(Debug, Clone, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

/// `DiscountFields` fragment.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscountNode {
    pub id: String,
    pub discount: DiscountFields,
}

/// The `discount` union, flattened across the selected members.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountFields {
    #[serde(rename = "__typename")]
    pub typename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<RemoteStatus>,
    #[serde(default)]
    pub app_discount_type: Option<AppDiscountType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDiscountType {
    #[serde(default)]
    pub function_id: Option<String>,
    #[serde(default)]
    pub app: Option<App>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct App {
    #[serde(default)]
    pub handle: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

// =============================================================================
// Discount operations
// =============================================================================

admin_query!(GetDiscountNodes, DISCOUNTS_DOCUMENT, get_discount_nodes);
admin_query!(GetDiscountNode, DISCOUNTS_DOCUMENT, get_discount_node);
admin_query!(DiscountAutomaticAppCreate, DISCOUNTS_DOCUMENT, discount_automatic_app_create);
admin_query!(DiscountCodeAppCreate, DISCOUNTS_DOCUMENT, discount_code_app_create);
admin_query!(DiscountAutomaticDelete, DISCOUNTS_DOCUMENT, discount_automatic_delete);
admin_query!(DiscountCodeDelete, DISCOUNTS_DOCUMENT, discount_code_delete);

pub mod get_discount_nodes {
    use super::{DiscountNode, PageInfo};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub first: i64,
        pub after: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub discount_nodes: Connection,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Connection {
        pub page_info: PageInfo,
        pub nodes: Vec<DiscountNode>,
    }
}

pub mod get_discount_node {
    use super::DiscountNode;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub id: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub discount_node: Option<DiscountNode>,
    }
}

/// Inputs shared by the app discount create mutations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinesWithInput {
    pub order_discounts: bool,
    pub product_discounts: bool,
    pub shipping_discounts: bool,
}

pub mod discount_automatic_app_create {
    use super::{CombinesWithInput, UserError};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub automatic_app_discount: Input,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Input {
        pub title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub function_id: Option<String>,
        pub starts_at: String,
        pub combines_with: CombinesWithInput,
        pub discount_classes: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub discount_automatic_app_create: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub automatic_app_discount: Option<Created>,
        pub user_errors: Vec<UserError>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Created {
        pub discount_id: String,
    }
}

pub mod discount_code_app_create {
    use super::{CombinesWithInput, UserError};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Variables {
        pub code_app_discount: Input,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Input {
        pub title: String,
        pub code: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub function_id: Option<String>,
        pub starts_at: String,
        pub combines_with: CombinesWithInput,
        pub discount_classes: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub discount_code_app_create: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub code_app_discount: Option<Created>,
        pub user_errors: Vec<UserError>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Created {
        pub discount_id: String,
    }
}

pub mod discount_automatic_delete {
    use super::UserError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub id: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub discount_automatic_delete: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub deleted_automatic_discount_id: Option<String>,
        pub user_errors: Vec<UserError>,
    }
}

pub mod discount_code_delete {
    use super::UserError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub id: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub discount_code_delete: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub deleted_code_discount_id: Option<String>,
        pub user_errors: Vec<UserError>,
    }
}

// =============================================================================
// Metafield operations
// =============================================================================

admin_query!(GetShopId, METAFIELDS_DOCUMENT, get_shop_id);
admin_query!(GetShopMetafield, METAFIELDS_DOCUMENT, get_shop_metafield);
admin_query!(GetShopMetafields, METAFIELDS_DOCUMENT, get_shop_metafields);
admin_query!(MetafieldsSet, METAFIELDS_DOCUMENT, metafields_set);
admin_query!(MetafieldsDelete, METAFIELDS_DOCUMENT, metafields_delete);

pub mod get_shop_id {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {}

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub shop: Shop,
    }

    #[derive(Debug, Deserialize)]
    pub struct Shop {
        pub id: String,
    }
}

pub mod get_shop_metafield {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub namespace: String,
        pub key: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub shop: Shop,
    }

    #[derive(Debug, Deserialize)]
    pub struct Shop {
        pub id: String,
        pub metafield: Option<Metafield>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Metafield {
        pub value: String,
    }
}

pub mod get_shop_metafields {
    use super::PageInfo;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub namespace: String,
        pub first: i64,
        pub after: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ResponseData {
        pub shop: Shop,
    }

    #[derive(Debug, Deserialize)]
    pub struct Shop {
        pub id: String,
        pub metafields: Connection,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Connection {
        pub page_info: PageInfo,
        pub nodes: Vec<Metafield>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Metafield {
        pub namespace: String,
        pub key: String,
        pub value: String,
    }
}

pub mod metafields_set {
    use super::UserError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub metafields: Vec<MetafieldsSetInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MetafieldsSetInput {
        pub owner_id: String,
        pub namespace: String,
        pub key: String,
        pub value: String,
        #[serde(rename = "type")]
        pub value_type: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub metafields_set: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub user_errors: Vec<UserError>,
    }
}

pub mod metafields_delete {
    use super::UserError;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize)]
    pub struct Variables {
        pub metafields: Vec<MetafieldIdentifierInput>,
    }

    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MetafieldIdentifierInput {
        pub owner_id: String,
        pub namespace: String,
        pub key: String,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ResponseData {
        pub metafields_delete: Option<Payload>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Payload {
        pub user_errors: Vec<UserError>,
    }
}
