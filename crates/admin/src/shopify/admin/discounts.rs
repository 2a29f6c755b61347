//! Discount registry operations for the Admin API.

use tracing::{debug, instrument};

use discount_sync_core::{Classification, DiscountMethod, RemoteObjectRef, RemoteObjectSpec};

use super::{
    AdminClient, AdminShopifyError, PAGE_SIZE, check_user_errors,
    conversions::{convert_discount_node, method_from_gid},
    queries::{
        CombinesWithInput, DiscountAutomaticAppCreate, DiscountAutomaticDelete,
        DiscountCodeAppCreate, DiscountCodeDelete, GetDiscountNode, GetDiscountNodes,
        discount_automatic_app_create, discount_code_app_create, discount_automatic_delete,
        discount_code_delete, get_discount_node, get_discount_nodes,
    },
};

const fn discount_class(classification: Classification) -> &'static str {
    match classification {
        Classification::Order => "ORDER",
        Classification::Shipping => "SHIPPING",
    }
}

impl AdminClient {
    /// List every discount node, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails.
    #[instrument(skip(self))]
    pub async fn list_discount_nodes(&self) -> Result<Vec<RemoteObjectRef>, AdminShopifyError> {
        let mut objects = Vec::new();
        let mut after = None;

        loop {
            let variables = get_discount_nodes::Variables {
                first: PAGE_SIZE,
                after,
            };
            let response = self.execute::<GetDiscountNodes>(variables).await?;
            let connection = response.discount_nodes;

            objects.extend(connection.nodes.into_iter().map(convert_discount_node));

            match connection.page_info.end_cursor {
                Some(cursor) if connection.page_info.has_next_page => after = Some(cursor),
                _ => break,
            }
        }

        debug!(count = objects.len(), "Listed discount nodes");
        Ok(objects)
    }

    /// Get one discount node.
    ///
    /// Returns `Ok(None)` when Shopify reports no such node.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::GraphQL` for a malformed ID, which
    /// [`AdminShopifyError::is_invalid_id`] recognises.
    #[instrument(skip(self), fields(discount_id = %id))]
    pub async fn get_discount_node(
        &self,
        id: &str,
    ) -> Result<Option<RemoteObjectRef>, AdminShopifyError> {
        let variables = get_discount_node::Variables { id: id.to_string() };
        let response = self.execute::<GetDiscountNode>(variables).await?;
        Ok(response.discount_node.map(convert_discount_node))
    }

    /// Create an app discount for `spec`, returning the new node ID.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::UserError` if Shopify rejects the input.
    #[instrument(skip(self, spec), fields(title = %spec.title, method = ?spec.method))]
    pub async fn create_app_discount(
        &self,
        spec: &RemoteObjectSpec,
    ) -> Result<String, AdminShopifyError> {
        let combines_with = CombinesWithInput {
            order_discounts: spec.combine_flags.order_discounts,
            product_discounts: spec.combine_flags.product_discounts,
            shipping_discounts: spec.combine_flags.shipping_discounts,
        };
        let discount_classes = vec![discount_class(spec.classification).to_string()];

        let created = match spec.method {
            DiscountMethod::Automatic => {
                let variables = discount_automatic_app_create::Variables {
                    automatic_app_discount: discount_automatic_app_create::Input {
                        title: spec.title.clone(),
                        function_id: spec.function_id.clone(),
                        starts_at: spec.starts_at.clone(),
                        combines_with,
                        discount_classes,
                    },
                };
                let payload = self
                    .execute::<DiscountAutomaticAppCreate>(variables)
                    .await?
                    .discount_automatic_app_create
                    .ok_or_else(|| AdminShopifyError::UserError("No payload returned".to_string()))?;
                check_user_errors(&payload.user_errors)?;
                payload.automatic_app_discount.map(|d| d.discount_id)
            }
            DiscountMethod::Code => {
                let code = spec.code.clone().ok_or_else(|| {
                    AdminShopifyError::UserError("Code discount requires a code".to_string())
                })?;
                let variables = discount_code_app_create::Variables {
                    code_app_discount: discount_code_app_create::Input {
                        title: spec.title.clone(),
                        code,
                        function_id: spec.function_id.clone(),
                        starts_at: spec.starts_at.clone(),
                        combines_with,
                        discount_classes,
                    },
                };
                let payload = self
                    .execute::<DiscountCodeAppCreate>(variables)
                    .await?
                    .discount_code_app_create
                    .ok_or_else(|| AdminShopifyError::UserError("No payload returned".to_string()))?;
                check_user_errors(&payload.user_errors)?;
                payload.code_app_discount.map(|d| d.discount_id)
            }
        };

        created.ok_or_else(|| AdminShopifyError::UserError("No discount ID returned".to_string()))
    }

    /// Delete a discount node, picking the mutation from its ID.
    ///
    /// # Errors
    ///
    /// Returns `AdminShopifyError::NotFound` if Shopify reports the discount
    /// does not exist, and `UserError` for other rejections.
    #[instrument(skip(self), fields(discount_id = %id))]
    pub async fn delete_discount(&self, id: &str) -> Result<(), AdminShopifyError> {
        let (deleted, user_errors) = match method_from_gid(id) {
            DiscountMethod::Automatic => {
                let variables = discount_automatic_delete::Variables { id: id.to_string() };
                let payload = self
                    .execute::<DiscountAutomaticDelete>(variables)
                    .await?
                    .discount_automatic_delete
                    .ok_or_else(|| AdminShopifyError::UserError("No payload returned".to_string()))?;
                (payload.deleted_automatic_discount_id, payload.user_errors)
            }
            DiscountMethod::Code => {
                let variables = discount_code_delete::Variables { id: id.to_string() };
                let payload = self
                    .execute::<DiscountCodeDelete>(variables)
                    .await?
                    .discount_code_delete
                    .ok_or_else(|| AdminShopifyError::UserError("No payload returned".to_string()))?;
                (payload.deleted_code_discount_id, payload.user_errors)
            }
        };

        if user_errors.iter().any(|e| {
            let message = e.message.to_lowercase();
            message.contains("does not exist") || message.contains("not found")
        }) {
            return Err(AdminShopifyError::NotFound(id.to_string()));
        }
        check_user_errors(&user_errors)?;

        deleted
            .map(|_| ())
            .ok_or_else(|| AdminShopifyError::UserError("No deleted ID returned".to_string()))
    }
}
