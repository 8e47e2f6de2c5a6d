//! `Store` trait — single async interface for the per-user record.
//!
//! The engine treats this as a key-value document store keyed by user id:
//! profile, weight history, goal, milestones, grocery items. How it is
//! persisted is the backend's business.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::goals::Goal;
use crate::milestones::Milestone;
use crate::profile::UserProfile;
use crate::weight::WeightEntry;

/// Everything on record for one user, loaded in one shot for a turn.
#[derive(Debug, Clone, Default)]
pub struct UserRecord {
    pub profile: UserProfile,
    /// Chronological, append-only.
    pub entries: Vec<WeightEntry>,
    pub goal: Option<Goal>,
    pub milestones: Vec<Milestone>,
}

/// Backend-agnostic session store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), StoreError>;

    // ── Profiles ────────────────────────────────────────────────────

    /// Get a user's profile, if one exists.
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    /// Insert or replace a user's profile.
    async fn upsert_profile(&self, user_id: &str, profile: &UserProfile) -> Result<(), StoreError>;

    // ── Weight history ──────────────────────────────────────────────

    /// Append a weight entry. Entries are immutable once written.
    async fn append_weight_entry(
        &self,
        user_id: &str,
        entry: &WeightEntry,
    ) -> Result<(), StoreError>;

    /// List a user's weight entries in chronological (insertion) order.
    async fn list_weight_entries(&self, user_id: &str) -> Result<Vec<WeightEntry>, StoreError>;

    // ── Goals ───────────────────────────────────────────────────────

    /// Set the active goal, replacing any prior one.
    async fn set_goal(&self, user_id: &str, goal: &Goal) -> Result<(), StoreError>;

    /// Get the active goal, if any.
    async fn get_goal(&self, user_id: &str) -> Result<Option<Goal>, StoreError>;

    // ── Milestones ──────────────────────────────────────────────────

    /// Insert an unlocked milestone. Inserting the same catalog id twice
    /// for a user is a no-op.
    async fn insert_milestone(
        &self,
        user_id: &str,
        milestone: &Milestone,
    ) -> Result<(), StoreError>;

    /// List unlocked milestones in unlock order.
    async fn list_milestones(&self, user_id: &str) -> Result<Vec<Milestone>, StoreError>;

    // ── Grocery items ───────────────────────────────────────────────

    /// Append detected grocery item names.
    async fn add_grocery_items(&self, user_id: &str, names: &[String]) -> Result<(), StoreError>;

    /// List grocery items in insertion order.
    async fn list_grocery_items(&self, user_id: &str) -> Result<Vec<String>, StoreError>;

    // ── Aggregate load ──────────────────────────────────────────────

    /// Load the whole per-user record for one conversation turn.
    async fn load_record(&self, user_id: &str) -> Result<UserRecord, StoreError> {
        Ok(UserRecord {
            profile: self.get_profile(user_id).await?.unwrap_or_default(),
            entries: self.list_weight_entries(user_id).await?,
            goal: self.get_goal(user_id).await?,
            milestones: self.list_milestones(user_id).await?,
        })
    }
}
