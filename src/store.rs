//! The injected user-state store.
//!
//! All per-user state hangs off one map of userId -> Arc<Mutex<UserState>>.
//! Handlers clone the Arc out of the map and lock it for the duration of the
//! request, so two concurrent requests for the same user serialize and the
//! conversation count never loses an update.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::engine::context::ConversationContext;
use crate::engine::reflection::RotationState;
use crate::engine::variation::ResponseHistory;
use crate::profile::UserProfile;

/// Everything the engine tracks for one user.
#[derive(Debug, Clone)]
pub struct UserState {
    pub profile: UserProfile,
    pub context: ConversationContext,
    pub history: ResponseHistory,
    pub rotation: RotationState,
}

impl UserState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            profile: UserProfile::new(now),
            context: ConversationContext::default(),
            history: ResponseHistory::default(),
            rotation: RotationState::default(),
        }
    }
}

pub struct UserStore {
    users: RwLock<HashMap<String, Arc<Mutex<UserState>>>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: &str) -> Option<Arc<Mutex<UserState>>> {
        self.users.read().await.get(user_id).cloned()
    }

    /// Profiles are created lazily on first contact.
    pub async fn get_or_create(&self, user_id: &str, now: DateTime<Utc>) -> Arc<Mutex<UserState>> {
        if let Some(existing) = self.get(user_id).await {
            return existing;
        }
        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(user_id, "creating profile");
                Arc::new(Mutex::new(UserState::new(now)))
            })
            .clone()
    }

    /// Full user-data reset; the only way state is ever dropped.
    pub async fn delete(&self, user_id: &str) -> bool {
        self.users.write().await.remove(user_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn profiles_are_created_lazily_and_shared() {
        let store = UserStore::new();
        assert!(store.get("u1").await.is_none());

        let first = store.get_or_create("u1", Utc::now()).await;
        let second = store.get_or_create("u1", Utc::now()).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn concurrent_same_user_updates_are_not_lost() {
        let store = Arc::new(UserStore::new());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let entry = store.get_or_create("u1", Utc::now()).await;
                let mut state = entry.lock().await;
                state.profile.conversation_count += 1;
            }));
        }
        for handle in handles {
            handle.await.expect("task panicked");
        }
        let entry = store.get("u1").await.expect("state exists");
        assert_eq!(entry.lock().await.profile.conversation_count, 20);
    }

    #[tokio::test]
    async fn delete_removes_all_user_state() {
        let store = UserStore::new();
        store.get_or_create("u1", Utc::now()).await;
        assert!(store.delete("u1").await);
        assert!(!store.delete("u1").await);
        assert!(store.get("u1").await.is_none());
    }
}
