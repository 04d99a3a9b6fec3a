use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::model::{ProductEdit, ProductRecord};

/// Outcome of [`ProductStore::create_if_absent`].
#[derive(Debug, Clone)]
pub struct Stored {
    pub record: ProductRecord,
    /// `false` when a record with the same barcode already existed and was
    /// returned unchanged.
    pub created: bool,
}

/// Persistence for product records, unique by barcode.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create_if_absent(&self, candidate: ProductRecord) -> anyhow::Result<Stored>;
    async fn find_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<ProductRecord>>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ProductRecord>>;
    /// Newest first.
    async fn recent(&self, limit: i64) -> anyhow::Result<Vec<ProductRecord>>;
    async fn update(&self, id: Uuid, edit: ProductEdit) -> anyhow::Result<Option<ProductRecord>>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// In-process store; records are kept in insertion order.
#[derive(Default)]
pub struct MemoryProductStore {
    records: RwLock<Vec<ProductRecord>>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn create_if_absent(&self, candidate: ProductRecord) -> anyhow::Result<Stored> {
        let mut records = self.records.write().await;
        if let Some(existing) = records.iter().find(|r| r.barcode == candidate.barcode) {
            return Ok(Stored {
                record: existing.clone(),
                created: false,
            });
        }
        records.push(candidate.clone());
        Ok(Stored {
            record: candidate,
            created: true,
        })
    }

    async fn find_by_barcode(&self, barcode: &str) -> anyhow::Result<Option<ProductRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.barcode == barcode).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<ProductRecord>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn recent(&self, limit: i64) -> anyhow::Result<Vec<ProductRecord>> {
        let limit = usize::try_from(limit).unwrap_or(0);
        let records = self.records.read().await;
        Ok(records.iter().rev().take(limit).cloned().collect())
    }

    async fn update(&self, id: Uuid, edit: ProductEdit) -> anyhow::Result<Option<ProductRecord>> {
        let mut records = self.records.write().await;
        let Some(record) = records.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        record.apply_edit(edit, OffsetDateTime::now_utc());
        Ok(Some(record.clone()))
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok(records.len() != before)
    }
}

#[cfg(test)]
mod store_tests {
    use super::*;
    use crate::derive::DerivedAttributes;
    use crate::products::model::RawProduct;

    fn record(barcode: &str, name: &str) -> ProductRecord {
        ProductRecord::from_raw(
            RawProduct {
                barcode: barcode.into(),
                name: Some(name.into()),
                ..Default::default()
            },
            DerivedAttributes::default(),
            OffsetDateTime::now_utc(),
        )
    }

    #[tokio::test]
    async fn create_if_absent_is_idempotent_per_barcode() {
        let store = MemoryProductStore::new();

        let first = store.create_if_absent(record("111", "First")).await.unwrap();
        assert!(first.created);
        let second = store.create_if_absent(record("111", "Second")).await.unwrap();
        assert!(!second.created);

        assert_eq!(first.record, second.record);
        assert_eq!(second.record.name, "First");
        assert_eq!(store.recent(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let store = MemoryProductStore::new();
        for (code, name) in [("1", "a"), ("2", "b"), ("3", "c")] {
            store.create_if_absent(record(code, name)).await.unwrap();
        }
        let names: Vec<_> = store
            .recent(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["c", "b"]);
        assert!(store.recent(-1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_by_id() {
        let store = MemoryProductStore::new();
        let stored = store.create_if_absent(record("5", "Tea")).await.unwrap().record;

        let updated = store
            .update(
                stored.id,
                ProductEdit {
                    name: Some("Green tea".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.name, "Green tea");
        assert_eq!(updated.created_at, stored.created_at);
        assert!(updated.updated_at >= stored.updated_at);

        assert!(store.update(Uuid::new_v4(), ProductEdit::default()).await.unwrap().is_none());
        assert!(store.delete(stored.id).await.unwrap());
        assert!(!store.delete(stored.id).await.unwrap());
        assert!(store.find_by_barcode("5").await.unwrap().is_none());
    }
}
