//! Shop metafield operations for the Admin API.

use tracing::{debug, instrument};

use super::{
    AdminClient, AdminShopifyError, PAGE_SIZE, check_user_errors,
    queries::{
        GetShopMetafield, GetShopMetafields, MetafieldsDelete, MetafieldsSet,
        get_shop_metafield, get_shop_metafields,
        metafields_delete::{self, MetafieldIdentifierInput},
        metafields_set::{self, MetafieldsSetInput},
    },
};

/// A shop metafield as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShopMetafield {
    pub namespace: String,
    pub key: String,
    pub value: String,
}

/// A metafield value to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetafieldWrite<'a> {
    pub namespace: &'a str,
    pub key: &'a str,
    pub value: &'a str,
    /// Shopify metafield type (e.g. `json`).
    pub value_type: &'a str,
}

impl AdminClient {
    /// Get one shop metafield value.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn get_shop_metafield(
        &self,
        namespace: &str,
        key: &str,
    ) -> Result<Option<String>, AdminShopifyError> {
        let variables = get_shop_metafield::Variables {
            namespace: namespace.to_string(),
            key: key.to_string(),
        };
        let response = self.execute::<GetShopMetafield>(variables).await?;
        Ok(response.shop.metafield.map(|m| m.value))
    }

    /// List every shop metafield in `namespace`, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self))]
    pub async fn list_shop_metafields(
        &self,
        namespace: &str,
    ) -> Result<Vec<ShopMetafield>, AdminShopifyError> {
        let mut fields = Vec::new();
        let mut after = None;

        loop {
            let variables = get_shop_metafields::Variables {
                namespace: namespace.to_string(),
                first: PAGE_SIZE,
                after,
            };
            let connection = self
                .execute::<GetShopMetafields>(variables)
                .await?
                .shop
                .metafields;

            fields.extend(connection.nodes.into_iter().map(|m| ShopMetafield {
                namespace: m.namespace,
                key: m.key,
                value: m.value,
            }));

            match connection.page_info.end_cursor {
                Some(cursor) if connection.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        debug!(count = fields.len(), "Listed shop metafields");
        Ok(fields)
    }

    /// Write shop metafields in a single `metafieldsSet` call.
    ///
    /// Shopify accepts at most 25 metafields per call; callers chunk.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects any value.
    /// The call is atomic on Shopify's side.
    #[instrument(skip(self, writes), fields(count = writes.len()))]
    pub async fn set_shop_metafields(
        &self,
        writes: &[MetafieldWrite<'_>],
    ) -> Result<(), AdminShopifyError> {
        let owner_id = self.shop_id().await?.to_string();
        let variables = metafields_set::Variables {
            metafields: writes
                .iter()
                .map(|w| MetafieldsSetInput {
                    owner_id: owner_id.clone(),
                    namespace: w.namespace.to_string(),
                    key: w.key.to_string(),
                    value: w.value.to_string(),
                    value_type: w.value_type.to_string(),
                })
                .collect(),
        };

        let payload = self
            .execute::<MetafieldsSet>(variables)
            .await?
            .metafields_set
            .ok_or_else(|| AdminShopifyError::UserError("No payload returned".to_string()))?;
        check_user_errors(&payload.user_errors)
    }

    /// Delete shop metafields in a single `metafieldsDelete` call.
    ///
    /// Deleting a metafield that does not exist is not an error.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the request.
    #[instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn delete_shop_metafields(
        &self,
        keys: &[(&str, &str)],
    ) -> Result<(), AdminShopifyError> {
        let owner_id = self.shop_id().await?.to_string();
        let variables = metafields_delete::Variables {
            metafields: keys
                .iter()
                .map(|(namespace, key)| MetafieldIdentifierInput {
                    owner_id: owner_id.clone(),
                    namespace: (*namespace).to_string(),
                    key: (*key).to_string(),
                })
                .collect(),
        };

        let payload = self
            .execute::<MetafieldsDelete>(variables)
            .await?
            .metafields_delete
            .ok_or_else(|| AdminShopifyError::UserError("No payload returned".to_string()))?;
        check_user_errors(&payload.user_errors)
    }
}
