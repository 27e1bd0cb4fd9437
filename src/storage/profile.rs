//! Durable store for the user's preference profile.

use std::sync::Arc;

use crate::errors::AppError;
use crate::models::{Profile, SessionGoal};
use crate::storage::kv::KeyValueStore;

/// Storage key for the serialized profile.
pub const PROFILE_KEY: &str = "userProfile";

#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Read the stored profile. Missing or unreadable profiles yield `None`.
    pub fn load(&self) -> Option<Profile> {
        let raw = match self.store.get(PROFILE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::error!("Error loading profile: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("Stored profile is unreadable, ignoring it: {}", e);
                None
            }
        }
    }

    /// Replace the stored profile.
    pub fn save(&self, profile: &Profile) -> Result<(), AppError> {
        let json = serde_json::to_string(profile)?;
        self.store.set(PROFILE_KEY, &json)?;
        tracing::debug!("Profile saved");
        Ok(())
    }

    /// Persist a new session goal, keeping the rest of the stored profile.
    ///
    /// Returns the updated profile, or `None` if there is no profile to update.
    pub fn update_session_goal(&self, goal: SessionGoal) -> Result<Option<Profile>, AppError> {
        let Some(current) = self.load() else {
            return Ok(None);
        };
        let updated = current.with_session_goal(goal);
        self.save(&updated)?;
        Ok(Some(updated))
    }

    pub fn clear(&self) -> Result<(), AppError> {
        self.store.remove(PROFILE_KEY)
    }

    pub fn has_profile(&self) -> bool {
        self.load().is_some()
    }
}
