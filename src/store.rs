//! UserRecord store: one document per `OCId`, single-field atomic operations.
//!
//! Every operation takes the collection write lock for its whole duration, so a
//! single increment/append/overwrite is atomic. Nothing spans two operations;
//! callers sequencing several steps get no transaction.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::domain::{ArrayItem, Counter, FieldValue, InitialData, UserData, UserRecord};
use crate::error::{StoreError, StoreResult};
use crate::snapshot;

type Users = BTreeMap<String, UserRecord>;

/// Result of an achievement union: ids this call added, and the set size after it.
#[derive(Debug, Clone, PartialEq)]
pub struct Granted {
    pub added: Vec<String>,
    pub total: usize,
}

#[derive(Clone, Default)]
pub struct UserStore {
    users: Arc<RwLock<Users>>,
    snapshot: Option<PathBuf>,
}

impl UserStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`, loading existing documents if the file exists.
    pub async fn open(path: PathBuf) -> StoreResult<Self> {
        let users: Users = snapshot::load(&path).await?;
        info!(target: "store", users = users.len(), path = %path.display(), "User store opened");
        Ok(Self { users: Arc::new(RwLock::new(users)), snapshot: Some(path) })
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, ocid: &str) -> Option<UserRecord> {
        self.users.read().await.get(ocid).cloned()
    }

    pub async fn count(&self) -> u64 {
        self.users.read().await.len() as u64
    }

    /// Register a new user with default counters. Never overwrites an existing record.
    #[instrument(level = "info", skip(self, initial))]
    pub async fn create(&self, ocid: &str, initial: InitialData) -> StoreResult<UserRecord> {
        let mut users = self.users.write().await;
        if users.contains_key(ocid) {
            return Err(StoreError::AlreadyExists(ocid.to_string()));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            ocid: ocid.to_string(),
            data: UserData {
                ocid: ocid.to_string(),
                eth_address: initial.eth_address,
                image: initial.image,
                ..UserData::default()
            },
            created_at: now,
            updated_at: now,
        };
        users.insert(ocid.to_string(), record.clone());
        self.persist(&users).await?;
        info!(target: "store", %ocid, id = %record.id, "User created");
        Ok(record)
    }

    /// Overwrite exactly one field.
    #[instrument(level = "debug", skip(self, value), fields(field = value.name()))]
    pub async fn set_field(&self, ocid: &str, value: FieldValue) -> StoreResult<()> {
        let field = value.name();
        self.mutate(ocid, move |data| value.apply(data)).await?;
        debug!(target: "store", %ocid, field, "Field set");
        Ok(())
    }

    /// Add `delta` to a counter relative to its stored value.
    #[instrument(level = "debug", skip(self), fields(field = counter.name()))]
    pub async fn increment(&self, ocid: &str, counter: Counter, delta: u64) -> StoreResult<u64> {
        let now = self
            .mutate(ocid, move |data| {
                let slot = counter.slot(data);
                *slot = slot.saturating_add(delta);
                *slot
            })
            .await?;
        debug!(target: "store", %ocid, field = counter.name(), value = now, "Counter incremented");
        Ok(now)
    }

    /// Push one item at the end of an array field. No deduplication.
    #[instrument(level = "debug", skip(self, item), fields(field = item.name()))]
    pub async fn append(&self, ocid: &str, item: ArrayItem) -> StoreResult<()> {
        let field = item.name();
        self.mutate(ocid, move |data| item.push_into(data)).await?;
        debug!(target: "store", %ocid, field, "Array item appended");
        Ok(())
    }

    /// Union `ids` into the achievement set under one write lock.
    #[instrument(level = "debug", skip(self, ids), fields(candidates = ids.len()))]
    pub async fn add_achievements(&self, ocid: &str, ids: &[String]) -> StoreResult<Granted> {
        let ids = ids.to_vec();
        self.mutate(ocid, move |data| {
            let mut added = Vec::new();
            for id in ids {
                if !data.has_achievement(&id) {
                    data.achievements.push(id.clone());
                    added.push(id);
                }
            }
            Granted { added, total: data.achievements.len() }
        })
        .await
    }

    async fn mutate<R, F>(&self, ocid: &str, f: F) -> StoreResult<R>
    where
        F: FnOnce(&mut UserData) -> R,
    {
        let mut users = self.users.write().await;
        let record = users
            .get_mut(ocid)
            .ok_or_else(|| StoreError::NotFound(ocid.to_string()))?;
        let out = f(&mut record.data);
        record.updated_at = Utc::now();
        self.persist(&users).await?;
        Ok(out)
    }

    async fn persist(&self, users: &Users) -> StoreResult<()> {
        match &self.snapshot {
            Some(path) => snapshot::save(path, users).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CompletedCourse;

    async fn store_with(ocid: &str) -> UserStore {
        let store = UserStore::in_memory();
        store.create(ocid, InitialData::default()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn create_starts_from_defaults_and_rejects_duplicates() {
        let store = UserStore::in_memory();
        let rec = store
            .create("oc-1", InitialData { eth_address: "0xabc".into(), image: String::new() })
            .await
            .unwrap();
        assert_eq!(rec.data.ocid, "oc-1");
        assert_eq!(rec.data.eth_address, "0xabc");
        assert_eq!(rec.data.level, 0);
        assert!(rec.data.achievements.is_empty());
        assert_eq!(rec.created_at, rec.updated_at);

        let dup = store.create("oc-1", InitialData::default()).await;
        assert!(matches!(dup, Err(StoreError::AlreadyExists(_))));
        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn mutations_on_unknown_user_fail_without_creating() {
        let store = UserStore::in_memory();
        assert!(matches!(
            store.increment("ghost", Counter::Submissions, 1).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.set_field("ghost", FieldValue::Level(2)).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.append("ghost", ArrayItem::AiScore(50.0)).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.get("ghost").await.is_none());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn increments_are_relative_to_stored_value() {
        let store = store_with("oc-1").await;
        store.increment("oc-1", Counter::Submissions, 1).await.unwrap();
        let v = store.increment("oc-1", Counter::Submissions, 3).await.unwrap();
        assert_eq!(v, 4);
        let rec = store.get("oc-1").await.unwrap();
        assert_eq!(rec.data.submissions, 4);
        assert_eq!(rec.data.accepted_submissions, 0);
        assert!(rec.updated_at >= rec.created_at);
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let store = store_with("oc-1").await;
        let mut handles = Vec::new();
        for _ in 0..20 {
            let s = store.clone();
            handles.push(tokio::spawn(async move {
                s.increment("oc-1", Counter::AcceptedSubmissions, 1).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.get("oc-1").await.unwrap().data.accepted_submissions, 20);
    }

    #[tokio::test]
    async fn append_keeps_order_and_duplicates() {
        let store = store_with("oc-1").await;
        let course = CompletedCourse { course_id: "c1".into(), course: serde_json::json!({"title": "Intro"}) };
        store.append("oc-1", ArrayItem::CompletedCourse(course.clone())).await.unwrap();
        store.append("oc-1", ArrayItem::CompletedCourse(course)).await.unwrap();
        store.append("oc-1", ArrayItem::AiScore(70.0)).await.unwrap();
        store.append("oc-1", ArrayItem::AiScore(95.0)).await.unwrap();
        let data = store.get("oc-1").await.unwrap().data;
        assert_eq!(data.completed_courses.len(), 2);
        assert_eq!(data.ai_scores, vec![70.0, 95.0]);
    }

    #[tokio::test]
    async fn achievement_union_is_idempotent() {
        let store = store_with("oc-1").await;
        let first = store
            .add_achievements("oc-1", &["Rising Star".into(), "Rising Star".into()])
            .await
            .unwrap();
        assert_eq!(first.added, vec!["Rising Star".to_string()]);
        assert_eq!(first.total, 1);
        let second = store
            .add_achievements("oc-1", &["Rising Star".into(), "Quality Coder".into()])
            .await
            .unwrap();
        assert_eq!(second.added, vec!["Quality Coder".to_string()]);
        assert_eq!(second.total, 2);
        let data = store.get("oc-1").await.unwrap().data;
        assert_eq!(data.achievements, vec!["Rising Star".to_string(), "Quality Coder".to_string()]);
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let path = std::env::temp_dir().join(format!("sensaylabs-users-{}.json", Uuid::new_v4()));
        {
            let store = UserStore::open(path.clone()).await.unwrap();
            store.create("oc-1", InitialData::default()).await.unwrap();
            store.increment("oc-1", Counter::CourseCompleted, 2).await.unwrap();
        }
        let reopened = UserStore::open(path.clone()).await.unwrap();
        assert_eq!(reopened.get("oc-1").await.unwrap().data.course_completed, 2);
        let _ = std::fs::remove_file(&path);
    }
}
