//! In-memory batch store for development and testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;
use venue_common::SearchType;

use super::store::{
    check_settlement, check_terminal, lease_delta, ImportStore, ItemStore, StoreError,
};
use super::types::{
    abandoned_message, Claim, Import, ImportStatus, Item, ItemCounts, ItemStatus, ReclaimedItem,
};

#[derive(Default)]
struct State {
    imports: HashMap<Uuid, Import>,
    items: HashMap<Uuid, Item>,
    /// Item ids in creation order
    item_order: Vec<Uuid>,
    last_created_at: Option<DateTime<Utc>>,
}

impl State {
    /// Strictly increasing timestamps, even within one clock tick
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created_at {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(ts);
        ts
    }

    fn items_of(&self, import_id: Uuid) -> impl Iterator<Item = &Item> {
        self.item_order
            .iter()
            .filter_map(|id| self.items.get(id))
            .filter(move |item| item.import_id == import_id)
    }

    fn insert_import(&mut self, filename: &str, search_type: SearchType) -> Import {
        let import = Import {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            search_type,
            status: ImportStatus::Pending,
            created_at: self.next_timestamp(),
            completed_at: None,
        };
        self.imports.insert(import.id, import.clone());
        import
    }

    fn insert_items(&mut self, import_id: Uuid, names: &[String]) -> Result<Vec<Item>, StoreError> {
        let search_type = self
            .imports
            .get(&import_id)
            .map(|import| import.search_type)
            .ok_or(StoreError::ImportNotFound(import_id))?;

        let mut created = Vec::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            let item = Item {
                id: Uuid::new_v4(),
                import_id,
                venue_name: name.clone(),
                search_type,
                status: ItemStatus::Pending,
                error_message: None,
                search_id: None,
                position: position as i32,
                attempts: 0,
                lease_owner: None,
                lease_expires_at: None,
                started_at: None,
                finished_at: None,
                created_at: self.next_timestamp(),
            };
            self.item_order.push(item.id);
            self.items.insert(item.id, item.clone());
            created.push(item);
        }
        Ok(created)
    }
}

/// Batch store kept entirely in process memory
///
/// One mutex guards all state, so every operation is atomic with respect to
/// every other.
#[derive(Default)]
pub struct InMemoryBatchStore {
    state: Mutex<State>,
}

impl InMemoryBatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Internal(e.to_string()))
    }
}

#[async_trait]
impl ImportStore for InMemoryBatchStore {
    async fn create_import(
        &self,
        filename: &str,
        search_type: SearchType,
    ) -> Result<Import, StoreError> {
        let mut state = self.lock()?;
        Ok(state.insert_import(filename, search_type))
    }

    async fn create_import_with_items(
        &self,
        filename: &str,
        search_type: SearchType,
        names: &[String],
    ) -> Result<(Import, Vec<Item>), StoreError> {
        let mut state = self.lock()?;
        let import = state.insert_import(filename, search_type);
        let items = state.insert_items(import.id, names)?;
        Ok((import, items))
    }

    async fn mark_completed(&self, import_id: Uuid) -> Result<Import, StoreError> {
        let mut state = self.lock()?;
        if state.items_of(import_id).any(|item| !item.status.is_terminal()) {
            return Err(StoreError::NotDrained(import_id));
        }
        let import = state
            .imports
            .get_mut(&import_id)
            .ok_or(StoreError::ImportNotFound(import_id))?;

        if import.status != ImportStatus::Completed {
            import.status = ImportStatus::Completed;
            import.completed_at = Some(Utc::now());
        }
        Ok(import.clone())
    }

    async fn get_import(&self, import_id: Uuid) -> Result<Import, StoreError> {
        let state = self.lock()?;
        state
            .imports
            .get(&import_id)
            .cloned()
            .ok_or(StoreError::ImportNotFound(import_id))
    }

    async fn list_recent_imports(&self, limit: i64) -> Result<Vec<Import>, StoreError> {
        let state = self.lock()?;
        let mut imports: Vec<Import> = state.imports.values().cloned().collect();
        imports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        imports.truncate(limit.max(0) as usize);
        Ok(imports)
    }

    async fn pending_imports(&self) -> Result<Vec<Uuid>, StoreError> {
        let state = self.lock()?;
        let mut pending: Vec<&Import> = state
            .imports
            .values()
            .filter(|import| import.status == ImportStatus::Pending)
            .collect();
        pending.sort_by_key(|import| import.created_at);
        Ok(pending.into_iter().map(|import| import.id).collect())
    }
}

#[async_trait]
impl ItemStore for InMemoryBatchStore {
    async fn create_items(
        &self,
        import_id: Uuid,
        names: &[String],
    ) -> Result<Vec<Item>, StoreError> {
        let mut state = self.lock()?;
        state.insert_items(import_id, names)
    }

    async fn set_status(
        &self,
        item_id: Uuid,
        status: ItemStatus,
        error_message: Option<&str>,
        search_id: Option<Uuid>,
    ) -> Result<Item, StoreError> {
        check_settlement(status, error_message, search_id)?;

        let mut state = self.lock()?;
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;

        if !item.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                item_id,
                from: item.status,
                to: status,
            });
        }

        let now = Utc::now();
        item.status = status;
        match status {
            ItemStatus::Processing => {
                item.attempts += 1;
                item.started_at = Some(now);
            }
            ItemStatus::Completed => {
                item.search_id = search_id;
                item.error_message = None;
                item.finished_at = Some(now);
                item.lease_owner = None;
                item.lease_expires_at = None;
            }
            ItemStatus::Error => {
                item.error_message = error_message.map(str::to_string);
                item.finished_at = Some(now);
                item.lease_owner = None;
                item.lease_expires_at = None;
            }
            ItemStatus::Pending => {}
        }
        Ok(item.clone())
    }

    async fn settle(
        &self,
        item_id: Uuid,
        owner: &str,
        status: ItemStatus,
        error_message: Option<&str>,
        search_id: Option<Uuid>,
    ) -> Result<Item, StoreError> {
        check_terminal(status)?;
        check_settlement(status, error_message, search_id)?;

        let mut state = self.lock()?;
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;

        if item.status != ItemStatus::Processing || item.lease_owner.as_deref() != Some(owner) {
            return Err(StoreError::LeaseLost(item_id));
        }

        item.status = status;
        item.finished_at = Some(Utc::now());
        item.lease_owner = None;
        item.lease_expires_at = None;
        if status == ItemStatus::Completed {
            item.search_id = search_id;
            item.error_message = None;
        } else {
            item.error_message = error_message.map(str::to_string);
        }
        Ok(item.clone())
    }

    async fn next_pending(&self, import_id: Uuid) -> Result<Option<Item>, StoreError> {
        let state = self.lock()?;
        let next = state
            .items_of(import_id)
            .find(|item| item.status == ItemStatus::Pending)
            .cloned();
        Ok(next)
    }

    async fn claim_next(
        &self,
        import_id: Uuid,
        owner: &str,
        lease: Duration,
    ) -> Result<Claim, StoreError> {
        let lease = lease_delta(lease)?;
        let mut state = self.lock()?;
        if !state.imports.contains_key(&import_id) {
            return Err(StoreError::ImportNotFound(import_id));
        }

        if state
            .items_of(import_id)
            .any(|item| item.status == ItemStatus::Processing)
        {
            return Ok(Claim::Busy);
        }

        let next_id = state
            .items_of(import_id)
            .find(|item| item.status == ItemStatus::Pending)
            .map(|item| item.id);

        let Some(item_id) = next_id else {
            return Ok(Claim::Drained);
        };

        let now = Utc::now();
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;
        item.status = ItemStatus::Processing;
        item.attempts += 1;
        item.lease_owner = Some(owner.to_string());
        item.lease_expires_at = Some(now + lease);
        item.started_at = Some(now);
        Ok(Claim::Claimed(item.clone()))
    }

    async fn renew_lease(
        &self,
        item_id: Uuid,
        owner: &str,
        lease: Duration,
    ) -> Result<(), StoreError> {
        let lease = lease_delta(lease)?;
        let mut state = self.lock()?;
        let item = state
            .items
            .get_mut(&item_id)
            .ok_or(StoreError::ItemNotFound(item_id))?;

        if item.status != ItemStatus::Processing || item.lease_owner.as_deref() != Some(owner) {
            return Err(StoreError::LeaseLost(item_id));
        }
        item.lease_expires_at = Some(Utc::now() + lease);
        Ok(())
    }

    async fn reclaim_expired(&self, max_attempts: i32) -> Result<Vec<ReclaimedItem>, StoreError> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let mut reclaimed = Vec::new();

        for item in state.items.values_mut() {
            let expired = item.status == ItemStatus::Processing
                && item.lease_expires_at.is_some_and(|expires| expires < now);
            if !expired {
                continue;
            }

            let requeued = item.attempts < max_attempts;
            if requeued {
                item.status = ItemStatus::Pending;
                item.started_at = None;
            } else {
                item.status = ItemStatus::Error;
                item.error_message = Some(abandoned_message(item.attempts));
                item.finished_at = Some(now);
            }
            item.lease_owner = None;
            item.lease_expires_at = None;

            reclaimed.push(ReclaimedItem {
                item_id: item.id,
                import_id: item.import_id,
                requeued,
            });
        }
        Ok(reclaimed)
    }

    async fn list_recent_items(&self, limit: i64) -> Result<Vec<Item>, StoreError> {
        let state = self.lock()?;
        Ok(state
            .item_order
            .iter()
            .rev()
            .filter_map(|id| state.items.get(id))
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_items(&self, import_id: Uuid) -> Result<Vec<Item>, StoreError> {
        let state = self.lock()?;
        Ok(state.items_of(import_id).cloned().collect())
    }

    async fn item_counts(&self, import_id: Uuid) -> Result<ItemCounts, StoreError> {
        let state = self.lock()?;
        let mut counts = ItemCounts::default();
        for item in state.items_of(import_id) {
            counts.add(item.status);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn store_with_import(list: &[&str]) -> (InMemoryBatchStore, Import, Vec<Item>) {
        let store = InMemoryBatchStore::new();
        let import = store.create_import("venues.csv", SearchType::Venue).await.unwrap();
        let items = store.create_items(import.id, &names(list)).await.unwrap();
        (store, import, items)
    }

    #[tokio::test]
    async fn test_create_items_keeps_input_order() {
        let (_, import, items) = store_with_import(&["A", "B", "C"]).await;

        assert_eq!(items.len(), 3);
        assert!(items.iter().all(|i| i.status == ItemStatus::Pending));
        assert!(items.iter().all(|i| i.import_id == import.id));
        assert!(items[0].created_at < items[1].created_at);
        assert!(items[1].created_at < items[2].created_at);
        assert_eq!(
            items.iter().map(|i| i.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[tokio::test]
    async fn test_create_items_inherits_search_type() {
        let store = InMemoryBatchStore::new();
        let import = store.create_import("api", SearchType::Vendor).await.unwrap();
        let items = store.create_items(import.id, &names(&["Bloom"])).await.unwrap();
        assert_eq!(items[0].search_type, SearchType::Vendor);
    }

    #[tokio::test]
    async fn test_create_items_for_unknown_import() {
        let store = InMemoryBatchStore::new();
        let err = store.create_items(Uuid::new_v4(), &names(&["A"])).await.unwrap_err();
        assert!(matches!(err, StoreError::ImportNotFound(_)));
    }

    #[tokio::test]
    async fn test_next_pending_is_oldest() {
        let (store, import, items) = store_with_import(&["A", "B"]).await;
        let next = store.next_pending(import.id).await.unwrap().unwrap();
        assert_eq!(next.id, items[0].id);
    }

    #[tokio::test]
    async fn test_claim_is_busy_while_item_in_flight() {
        let (store, import, items) = store_with_import(&["A", "B"]).await;
        let lease = Duration::from_secs(60);

        let first = store.claim_next(import.id, "w1", lease).await.unwrap();
        match first {
            Claim::Claimed(item) => {
                assert_eq!(item.id, items[0].id);
                assert_eq!(item.status, ItemStatus::Processing);
                assert_eq!(item.attempts, 1);
                assert_eq!(item.lease_owner.as_deref(), Some("w1"));
            }
            other => panic!("expected a claim, got {:?}", other),
        }

        assert_eq!(store.claim_next(import.id, "w2", lease).await.unwrap(), Claim::Busy);
    }

    #[tokio::test]
    async fn test_claim_drained_when_nothing_left() {
        let (store, import, items) = store_with_import(&["A"]).await;
        let lease = Duration::from_secs(60);

        store.claim_next(import.id, "w1", lease).await.unwrap();
        store
            .set_status(items[0].id, ItemStatus::Error, Some("boom"), None)
            .await
            .unwrap();

        assert_eq!(store.claim_next(import.id, "w1", lease).await.unwrap(), Claim::Drained);
    }

    #[tokio::test]
    async fn test_set_status_rejects_illegal_transition() {
        let (store, _, items) = store_with_import(&["A"]).await;

        let err = store
            .set_status(items[0].id, ItemStatus::Completed, None, Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition {
                from: ItemStatus::Pending,
                to: ItemStatus::Completed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_set_status_requires_payload() {
        let (store, _, items) = store_with_import(&["A"]).await;
        store
            .set_status(items[0].id, ItemStatus::Processing, None, None)
            .await
            .unwrap();

        let err = store
            .set_status(items[0].id, ItemStatus::Completed, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdate(_)));

        let err = store
            .set_status(items[0].id, ItemStatus::Error, Some("  "), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdate(_)));
    }

    #[tokio::test]
    async fn test_set_status_touches_only_one_item() {
        let (store, import, items) = store_with_import(&["A", "B"]).await;
        let search_id = Uuid::new_v4();

        store
            .set_status(items[0].id, ItemStatus::Processing, None, None)
            .await
            .unwrap();
        let done = store
            .set_status(items[0].id, ItemStatus::Completed, None, Some(search_id))
            .await
            .unwrap();
        assert_eq!(done.search_id, Some(search_id));
        assert!(done.finished_at.is_some());

        let listed = store.list_items(import.id).await.unwrap();
        assert_eq!(listed[1].status, ItemStatus::Pending);
        assert_eq!(listed[1].search_id, None);
    }

    #[tokio::test]
    async fn test_mark_completed_is_idempotent() {
        let (store, import, _) = store_with_import(&[]).await;

        let first = store.mark_completed(import.id).await.unwrap();
        let second = store.mark_completed(import.id).await.unwrap();

        assert_eq!(first.status, ImportStatus::Completed);
        assert_eq!(first.completed_at, second.completed_at);
        assert!(store.pending_imports().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_completed_refuses_unsettled_items() {
        let (store, import, _) = store_with_import(&["A"]).await;
        let err = store.mark_completed(import.id).await.unwrap_err();
        assert!(matches!(err, StoreError::NotDrained(_)));
    }

    #[tokio::test]
    async fn test_renew_lease_requires_owner() {
        let (store, import, items) = store_with_import(&["A"]).await;
        let lease = Duration::from_secs(60);
        store.claim_next(import.id, "w1", lease).await.unwrap();

        store.renew_lease(items[0].id, "w1", lease).await.unwrap();
        let err = store.renew_lease(items[0].id, "w2", lease).await.unwrap_err();
        assert!(matches!(err, StoreError::LeaseLost(_)));
    }

    #[tokio::test]
    async fn test_reclaim_expired_requeues_then_gives_up() {
        let (store, import, items) = store_with_import(&["A"]).await;
        let short = Duration::from_millis(1);

        store.claim_next(import.id, "w1", short).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let reclaimed = store.reclaim_expired(2).await.unwrap();
        assert_eq!(reclaimed.len(), 1);
        assert!(reclaimed[0].requeued);
        let item = store.next_pending(import.id).await.unwrap().unwrap();
        assert_eq!(item.id, items[0].id);
        assert!(item.lease_owner.is_none());

        store.claim_next(import.id, "w1", short).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let reclaimed = store.reclaim_expired(2).await.unwrap();
        assert!(!reclaimed[0].requeued);
        let listed = store.list_items(import.id).await.unwrap();
        assert_eq!(listed[0].status, ItemStatus::Error);
        assert_eq!(listed[0].error_message.as_deref(), Some("Search did not finish after 2 attempts"));
    }

    #[tokio::test]
    async fn test_reclaim_ignores_live_leases() {
        let (store, import, _) = store_with_import(&["A"]).await;
        store.claim_next(import.id, "w1", Duration::from_secs(60)).await.unwrap();
        assert!(store.reclaim_expired(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_listings_newest_first() {
        let store = InMemoryBatchStore::new();
        let first = store.create_import("one.csv", SearchType::Venue).await.unwrap();
        let second = store.create_import("two.csv", SearchType::Venue).await.unwrap();
        store.create_items(first.id, &names(&["A", "B"])).await.unwrap();
        store.create_items(second.id, &names(&["C"])).await.unwrap();

        let imports = store.list_recent_imports(50).await.unwrap();
        assert_eq!(imports[0].id, second.id);

        let items = store.list_recent_items(2).await.unwrap();
        assert_eq!(
            items.iter().map(|i| i.venue_name.as_str()).collect::<Vec<_>>(),
            vec!["C", "B"]
        );
    }

    #[tokio::test]
    async fn test_settle_refused_after_lease_moves_to_another_worker() {
        let (store, import, items) = store_with_import(&["A"]).await;

        store.claim_next(import.id, "w1", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        store.reclaim_expired(3).await.unwrap();
        let claim = store.claim_next(import.id, "w2", Duration::from_secs(60)).await.unwrap();
        assert!(matches!(claim, Claim::Claimed(ref item) if item.id == items[0].id));

        let err = store
            .settle(items[0].id, "w1", ItemStatus::Completed, None, Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LeaseLost(id) if id == items[0].id));

        // w2 still holds the item and can finish it.
        let listed = store.list_items(import.id).await.unwrap();
        assert_eq!(listed[0].status, ItemStatus::Processing);
        assert_eq!(listed[0].lease_owner.as_deref(), Some("w2"));

        let done = store
            .settle(items[0].id, "w2", ItemStatus::Error, Some("boom"), None)
            .await
            .unwrap();
        assert_eq!(done.status, ItemStatus::Error);
        assert_eq!(done.error_message.as_deref(), Some("boom"));
        assert!(done.lease_owner.is_none());
    }

    #[tokio::test]
    async fn test_settle_requires_terminal_status() {
        let (store, import, items) = store_with_import(&["A"]).await;
        store.claim_next(import.id, "w1", Duration::from_secs(60)).await.unwrap();

        let err = store
            .settle(items[0].id, "w1", ItemStatus::Pending, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidUpdate(_)));
    }

    #[tokio::test]
    async fn test_settle_unclaimed_item_is_lease_lost() {
        let (store, _, items) = store_with_import(&["A"]).await;
        let err = store
            .settle(items[0].id, "w1", ItemStatus::Error, Some("boom"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LeaseLost(_)));
    }

    #[tokio::test]
    async fn test_create_import_with_items() {
        let store = InMemoryBatchStore::new();
        let (import, items) = store
            .create_import_with_items("venues.csv", SearchType::Vendor, &names(&["A", "B"]))
            .await
            .unwrap();

        assert_eq!(import.status, ImportStatus::Pending);
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.import_id == import.id));
        assert!(items.iter().all(|i| i.search_type == SearchType::Vendor));
        assert_eq!(store.item_counts(import.id).await.unwrap().pending, 2);
    }
}
