//! libSQL backend — async `Store` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::goals::{Goal, GoalDirection};
use crate::milestones::Milestone;
use crate::profile::{BmiCategory, Gender, UserProfile};
use crate::store::migrations;
use crate::store::traits::Store;
use crate::weight::WeightEntry;

/// libSQL session store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

/// Convert `Option<&str>` to libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<f64>` to libsql Value.
fn opt_real(v: Option<f64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Real(v),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<u32>` to libsql Value.
fn opt_int(v: Option<u32>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Integer(i64::from(v)),
        None => libsql::Value::Null,
    }
}

const PROFILE_COLUMNS: &str =
    "age, height_cm, weight_kg, gender, completed, bmi, bmi_category, daily_calories, target_weight, completed_at";

/// Map a libsql Row (PROFILE_COLUMNS order) to a UserProfile.
fn row_to_profile(row: &libsql::Row) -> UserProfile {
    let age: Option<i64> = row.get(0).ok();
    let gender: Option<String> = row.get(3).ok();
    let completed: i64 = row.get(4).unwrap_or(0);
    let bmi_category: Option<String> = row.get(6).ok();
    let completed_at: Option<String> = row.get(9).ok();

    UserProfile {
        age: age.and_then(|a| u32::try_from(a).ok()),
        height_cm: row.get(1).ok(),
        weight_kg: row.get(2).ok(),
        gender: gender.map(|g| Gender::parse(&g)),
        completed: completed != 0,
        bmi: row.get(5).ok(),
        bmi_category: bmi_category.as_deref().and_then(BmiCategory::parse),
        daily_calories: row.get(7).ok(),
        target_weight: row.get(8).ok(),
        completed_at: completed_at.as_deref().map(parse_datetime),
    }
}

/// Map a libsql Row to a WeightEntry.
fn row_to_entry(row: &libsql::Row) -> Result<WeightEntry, StoreError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("Failed to read entry id: {e}")))?;
    let logged_str: String = row
        .get(4)
        .map_err(|e| StoreError::Query(format!("Failed to read entry timestamp: {e}")))?;

    Ok(WeightEntry {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        weight_kg: row
            .get(1)
            .map_err(|e| StoreError::Query(format!("Failed to read entry weight: {e}")))?,
        bmi: row.get(2).ok(),
        notes: row.get(3).ok(),
        logged_at: parse_datetime(&logged_str),
    })
}

/// Map a libsql Row to a Milestone.
fn row_to_milestone(row: &libsql::Row) -> Result<Milestone, StoreError> {
    let unlocked_str: String = row
        .get(4)
        .map_err(|e| StoreError::Query(format!("Failed to read milestone timestamp: {e}")))?;
    Ok(Milestone {
        id: row
            .get(0)
            .map_err(|e| StoreError::Query(format!("Failed to read milestone id: {e}")))?,
        title: row
            .get(1)
            .map_err(|e| StoreError::Query(format!("Failed to read milestone title: {e}")))?,
        description: row
            .get(2)
            .map_err(|e| StoreError::Query(format!("Failed to read milestone description: {e}")))?,
        icon: row
            .get(3)
            .map_err(|e| StoreError::Query(format!("Failed to read milestone icon: {e}")))?,
        unlocked_at: parse_datetime(&unlocked_str),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Store for LibSqlStore {
    async fn run_migrations(&self) -> Result<(), StoreError> {
        migrations::run_migrations(self.conn()).await
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(Some(row_to_profile(&row))),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("Failed to read profile: {e}"))),
        }
    }

    async fn upsert_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError> {
        let now = Utc::now().to_rfc3339();
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO profiles \
                 (user_id, age, height_cm, weight_kg, gender, completed, bmi, bmi_category, daily_calories, target_weight, completed_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    user_id,
                    opt_int(profile.age),
                    opt_real(profile.height_cm),
                    opt_real(profile.weight_kg),
                    opt_text(profile.gender.as_ref().map(Gender::as_str)),
                    i64::from(profile.completed),
                    opt_real(profile.bmi),
                    opt_text(profile.bmi_category.map(|c| c.as_str())),
                    opt_real(profile.daily_calories),
                    opt_real(profile.target_weight),
                    opt_text(profile.completed_at.map(|t| t.to_rfc3339()).as_deref()),
                    now,
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to upsert profile: {e}")))?;
        Ok(())
    }

    async fn append_weight_entry(
        &self,
        user_id: &str,
        entry: &WeightEntry,
    ) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO weight_entries (id, user_id, weight_kg, bmi, notes, logged_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    entry.id.to_string(),
                    user_id,
                    entry.weight_kg,
                    opt_real(entry.bmi),
                    opt_text(entry.notes.as_deref()),
                    entry.logged_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to append weight entry: {e}")))?;
        Ok(())
    }

    async fn list_weight_entries(&self, user_id: &str) -> Result<Vec<WeightEntry>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT id, weight_kg, bmi, notes, logged_at FROM weight_entries \
                 WHERE user_id = ?1 ORDER BY rowid",
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query weight entries: {e}")))?;

        let mut entries = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            entries.push(row_to_entry(&row)?);
        }
        Ok(entries)
    }

    async fn set_goal(&self, user_id: &str, goal: &Goal) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO goals (user_id, direction, target_weight, start_weight, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user_id,
                    goal.direction.as_str(),
                    goal.target_weight,
                    goal.start_weight,
                    goal.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to set goal: {e}")))?;
        Ok(())
    }

    async fn get_goal(&self, user_id: &str) -> Result<Option<Goal>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT direction, target_weight, start_weight, created_at FROM goals WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query goal: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let direction_str: String = row
                    .get(0)
                    .map_err(|e| StoreError::Query(format!("Failed to read goal direction: {e}")))?;
                let created_str: String = row
                    .get(3)
                    .map_err(|e| StoreError::Query(format!("Failed to read goal timestamp: {e}")))?;
                let direction = GoalDirection::parse(&direction_str).ok_or_else(|| {
                    StoreError::Serialization(format!("Unknown goal direction: {direction_str}"))
                })?;
                Ok(Some(Goal {
                    direction,
                    target_weight: row.get(1).map_err(|e| {
                        StoreError::Query(format!("Failed to read goal target: {e}"))
                    })?,
                    start_weight: row.get(2).map_err(|e| {
                        StoreError::Query(format!("Failed to read goal start: {e}"))
                    })?,
                    created_at: parse_datetime(&created_str),
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::Query(format!("Failed to read goal: {e}"))),
        }
    }

    async fn insert_milestone(
        &self,
        user_id: &str,
        milestone: &Milestone,
    ) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT OR IGNORE INTO milestones (user_id, milestone_id, title, description, icon, unlocked_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user_id,
                    milestone.id.as_str(),
                    milestone.title.as_str(),
                    milestone.description.as_str(),
                    milestone.icon.as_str(),
                    milestone.unlocked_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to insert milestone: {e}")))?;
        Ok(())
    }

    async fn list_milestones(&self, user_id: &str) -> Result<Vec<Milestone>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT milestone_id, title, description, icon, unlocked_at FROM milestones \
                 WHERE user_id = ?1 ORDER BY unlocked_at, milestone_id",
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query milestones: {e}")))?;

        let mut milestones = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            milestones.push(row_to_milestone(&row)?);
        }
        Ok(milestones)
    }

    async fn add_grocery_items(&self, user_id: &str, names: &[String]) -> Result<(), StoreError> {
        for name in names {
            self.conn()
                .execute(
                    "INSERT INTO grocery_items (user_id, name) VALUES (?1, ?2)",
                    params![user_id, name.as_str()],
                )
                .await
                .map_err(|e| StoreError::Query(format!("Failed to add grocery item: {e}")))?;
        }
        Ok(())
    }

    async fn list_grocery_items(&self, user_id: &str) -> Result<Vec<String>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT name FROM grocery_items WHERE user_id = ?1 ORDER BY rowid_alias",
                params![user_id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query grocery items: {e}")))?;

        let mut names = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let name: String = row
                .get(0)
                .map_err(|e| StoreError::Query(format!("Failed to read grocery item: {e}")))?;
            names.push(name);
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::GoalDirection;
    use crate::milestones;

    #[tokio::test]
    async fn profile_roundtrip() {
        let store = LibSqlStore::new_memory().await.unwrap();
        assert!(store.get_profile("u1").await.unwrap().is_none());

        let mut profile = UserProfile {
            age: Some(30),
            height_cm: Some(175.0),
            weight_kg: Some(70.0),
            gender: Some(Gender::Male),
            completed: true,
            completed_at: Some(Utc::now()),
            ..Default::default()
        };
        profile.refresh_derived();
        store.upsert_profile("u1", &profile).await.unwrap();

        let loaded = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(loaded.age, Some(30));
        assert_eq!(loaded.gender, Some(Gender::Male));
        assert!(loaded.completed);
        assert_eq!(loaded.bmi, Some(22.86));
        assert_eq!(loaded.bmi_category, Some(BmiCategory::Normal));
    }

    #[tokio::test]
    async fn partial_profile_roundtrip() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let profile = UserProfile {
            age: Some(25),
            ..Default::default()
        };
        store.upsert_profile("u1", &profile).await.unwrap();

        let loaded = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(loaded.age, Some(25));
        assert_eq!(loaded.height_cm, None);
        assert!(!loaded.completed);
    }

    #[tokio::test]
    async fn weight_entries_keep_insertion_order() {
        let store = LibSqlStore::new_memory().await.unwrap();
        for w in [80.0, 79.0, 78.0] {
            let entry = WeightEntry::new(w, Some(175.0), None);
            store.append_weight_entry("u1", &entry).await.unwrap();
        }
        let entries = store.list_weight_entries("u1").await.unwrap();
        let weights: Vec<f64> = entries.iter().map(|e| e.weight_kg).collect();
        assert_eq!(weights, vec![80.0, 79.0, 78.0]);
        // Other users see nothing
        assert!(store.list_weight_entries("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn new_goal_replaces_prior() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let first = Goal::new(GoalDirection::Lose, 70.0, 80.0).unwrap();
        store.set_goal("u1", &first).await.unwrap();

        let second = Goal::new(GoalDirection::Gain, 85.0, 80.0).unwrap();
        store.set_goal("u1", &second).await.unwrap();

        let loaded = store.get_goal("u1").await.unwrap().unwrap();
        assert_eq!(loaded.direction, GoalDirection::Gain);
        assert_eq!(loaded.target_weight, 85.0);
    }

    #[tokio::test]
    async fn milestone_insert_is_idempotent() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let milestone = Milestone {
            id: milestones::FIRST_LOG.to_string(),
            title: "First log".into(),
            description: "desc".into(),
            icon: "seedling".into(),
            unlocked_at: Utc::now(),
        };
        store.insert_milestone("u1", &milestone).await.unwrap();
        store.insert_milestone("u1", &milestone).await.unwrap();
        assert_eq!(store.list_milestones("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn grocery_items_append() {
        let store = LibSqlStore::new_memory().await.unwrap();
        store
            .add_grocery_items("u1", &["milk".into(), "oats".into()])
            .await
            .unwrap();
        store.add_grocery_items("u1", &["eggs".into()]).await.unwrap();
        assert_eq!(
            store.list_grocery_items("u1").await.unwrap(),
            vec!["milk", "oats", "eggs"]
        );
    }

    #[tokio::test]
    async fn local_file_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nutri.db");
        {
            let store = LibSqlStore::new_local(&path).await.unwrap();
            let profile = UserProfile {
                age: Some(40),
                ..Default::default()
            };
            store.upsert_profile("u1", &profile).await.unwrap();
        }
        let store = LibSqlStore::new_local(&path).await.unwrap();
        let loaded = store.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(loaded.age, Some(40));
    }

    #[tokio::test]
    async fn load_record_aggregates() {
        let store = LibSqlStore::new_memory().await.unwrap();
        let entry = WeightEntry::new(80.0, None, None);
        store.append_weight_entry("u1", &entry).await.unwrap();
        let record = store.load_record("u1").await.unwrap();
        assert!(!record.profile.completed);
        assert_eq!(record.entries.len(), 1);
        assert!(record.goal.is_none());
        assert!(record.milestones.is_empty());
    }
}
