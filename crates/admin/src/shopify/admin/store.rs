//! [`RemoteStore`] implementation backed by the Admin API.
//!
//! Discount objects map to discount nodes; documents map to shop metafields.

use async_trait::async_trait;

use discount_sync_core::{RemoteObjectRef, RemoteObjectSpec, RemoteRef};

use super::AdminClient;
use super::metafields::MetafieldWrite;
use crate::store::{DocumentKey, DocumentWrite, RemoteStore, StoreError};

#[async_trait]
impl RemoteStore for AdminClient {
    async fn list_remote_objects(&self) -> Result<Vec<RemoteObjectRef>, StoreError> {
        Ok(self.list_discount_nodes().await?)
    }

    async fn get_remote_object(
        &self,
        id: &RemoteRef,
    ) -> Result<Option<RemoteObjectRef>, StoreError> {
        Ok(self.get_discount_node(id.as_str()).await?)
    }

    async fn create_object(&self, spec: &RemoteObjectSpec) -> Result<RemoteRef, StoreError> {
        Ok(RemoteRef::new(self.create_app_discount(spec).await?))
    }

    async fn delete_object(&self, id: &RemoteRef) -> Result<(), StoreError> {
        Ok(self.delete_discount(id.as_str()).await?)
    }

    async fn get_document(&self, key: &DocumentKey) -> Result<Option<String>, StoreError> {
        Ok(self.get_shop_metafield(&key.namespace, &key.key).await?)
    }

    async fn list_documents(
        &self,
        namespace: &str,
    ) -> Result<Vec<(DocumentKey, String)>, StoreError> {
        let fields = self.list_shop_metafields(namespace).await?;
        Ok(fields
            .into_iter()
            .map(|m| (DocumentKey::new(m.namespace, m.key), m.value))
            .collect())
    }

    async fn set_documents(&self, writes: &[DocumentWrite]) -> Result<(), StoreError> {
        let writes: Vec<MetafieldWrite<'_>> = writes
            .iter()
            .map(|w| MetafieldWrite {
                namespace: &w.key.namespace,
                key: &w.key.key,
                value: &w.value,
                value_type: w.value_type.as_str(),
            })
            .collect();
        Ok(self.set_shop_metafields(&writes).await?)
    }

    async fn delete_documents(&self, keys: &[DocumentKey]) -> Result<(), StoreError> {
        let keys: Vec<(&str, &str)> = keys
            .iter()
            .map(|k| (k.namespace.as_str(), k.key.as_str()))
            .collect();
        Ok(self.delete_shop_metafields(&keys).await?)
    }
}
