// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Favorite cache - optimistic likes with rollback
//!
//! The remote favorite rows are the source of truth. The cache is seeded by a
//! single bulk load per session and then kept in step by [`FavoriteCache::toggle`],
//! which flips the displayed state before the remote write resolves and
//! restores it if the write fails.

use crate::error::{StoreError, ToggleError};
use crate::store::{value_text, Entity, Filter, Query, RemoteStore, Row};
use crate::types::{FavoriteEntry, Session, UserId};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Favorite status of one meal for the session's user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteState {
    /// Not a favorite
    Unliked,
    /// A favorite
    Liked,
    /// Shown as liked while the insert is in flight
    TogglingToLiked,
    /// Shown as not liked while the delete is in flight
    TogglingToUnliked,
}

impl FavoriteState {
    /// What the heart shows right now
    #[must_use]
    pub fn is_displayed_liked(self) -> bool {
        matches!(self, Self::Liked | Self::TogglingToLiked)
    }

    /// A remote write is outstanding
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, Self::TogglingToLiked | Self::TogglingToUnliked)
    }
}

#[derive(Debug, Default)]
struct Inner {
    session: Session,
    states: HashMap<String, FavoriteState>,
    loaded: bool,
    epoch: u64,
}

impl Inner {
    fn state_of(&self, menu_id: &str) -> FavoriteState {
        self.states
            .get(menu_id)
            .copied()
            .unwrap_or(FavoriteState::Unliked)
    }
}

/// Per-session set of favorited meal ids
#[derive(Debug)]
pub struct FavoriteCache<S> {
    store: Arc<S>,
    inner: Mutex<Inner>,
}

impl<S: RemoteStore> FavoriteCache<S> {
    /// Cache for `session`, not yet loaded
    pub fn new(store: Arc<S>, session: Session) -> Self {
        Self {
            store,
            inner: Mutex::new(Inner {
                session,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Identity the cache acts for
    pub fn session(&self) -> Session {
        self.lock().session.clone()
    }

    /// Replace the identity. All state is dropped, and toggles still in
    /// flight for the previous identity will not write into the new one.
    pub fn switch_session(&self, session: Session) {
        let mut inner = self.lock();
        inner.session = session;
        inner.states.clear();
        inner.loaded = false;
        inner.epoch += 1;
    }

    /// Seed the cache from the user's favorite rows, once per session.
    ///
    /// Returns the number of liked meals. Anonymous sessions load nothing.
    pub async fn load(&self) -> Result<usize, StoreError> {
        self.fill(false).await
    }

    /// Re-read the favorite rows even if already loaded. Meals with a toggle
    /// in flight keep their pending state.
    pub async fn reload(&self) -> Result<usize, StoreError> {
        self.fill(true).await
    }

    async fn fill(&self, force: bool) -> Result<usize, StoreError> {
        let (user, epoch) = {
            let inner = self.lock();
            if inner.loaded && !force {
                return Ok(liked_count(&inner));
            }
            (inner.session.user().cloned(), inner.epoch)
        };
        let Some(user) = user else {
            return Ok(0);
        };

        let query = Query::new(Entity::Favorites).filter(Filter::eq("user_id", user.0.as_str()));
        let rows = self.store.query(&query).await?;
        let liked: HashSet<String> = rows
            .iter()
            .filter_map(|row| row.get("menu_id"))
            .map(value_text)
            .collect();

        let mut inner = self.lock();
        if inner.epoch != epoch {
            debug!("Session changed during favorite load, discarding");
            return Ok(0);
        }
        if force {
            inner.states.retain(|_, state| state.is_pending());
        }
        for id in liked {
            inner.states.entry(id).or_insert(FavoriteState::Liked);
        }
        inner.loaded = true;

        let count = liked_count(&inner);
        debug!("Loaded {} favorites for {}", count, user);
        Ok(count)
    }

    /// Current state of a meal; unknown meals are unliked
    pub fn state(&self, menu_id: &str) -> FavoriteState {
        self.lock().state_of(menu_id)
    }

    /// Whether the heart for `menu_id` shows as filled
    pub fn is_liked(&self, menu_id: &str) -> bool {
        self.state(menu_id).is_displayed_liked()
    }

    /// Snapshot of the meal ids currently shown as liked
    pub fn liked_ids(&self) -> HashSet<String> {
        self.lock()
            .states
            .iter()
            .filter(|(_, state)| state.is_displayed_liked())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Flip the favorite status of `menu_id`.
    ///
    /// The displayed state changes immediately; the remote write follows.
    /// `snapshot` is stored with a new favorite so it can be listed even if
    /// the meal changes later. Returns the committed state, or the reason the
    /// toggle did not happen (in which case the state is what it was before).
    pub async fn toggle(&self, menu_id: &str, snapshot: &str) -> Result<FavoriteState, ToggleError> {
        let (user, prior, epoch) = {
            let mut inner = self.lock();
            let user = inner
                .session
                .user()
                .cloned()
                .ok_or(ToggleError::AuthRequired)?;
            let prior = inner.state_of(menu_id);
            if prior.is_pending() {
                debug!("Dropping toggle for {}: already in flight", menu_id);
                return Err(ToggleError::Busy(menu_id.to_string()));
            }
            let pending = if prior == FavoriteState::Liked {
                FavoriteState::TogglingToUnliked
            } else {
                FavoriteState::TogglingToLiked
            };
            inner.states.insert(menu_id.to_string(), pending);
            (user, prior, inner.epoch)
        };

        let (result, target) = if prior == FavoriteState::Liked {
            (self.remove(&user, menu_id).await, FavoriteState::Unliked)
        } else {
            (self.add(&user, menu_id, snapshot).await, FavoriteState::Liked)
        };
        let settled = if result.is_ok() { target } else { prior };

        {
            let mut inner = self.lock();
            if inner.epoch == epoch {
                inner.states.insert(menu_id.to_string(), settled);
            } else {
                debug!("Session changed while toggling {}, not committing", menu_id);
            }
        }

        match result {
            Ok(()) => {
                debug!("Favorite {} is now {:?}", menu_id, settled);
                Ok(settled)
            }
            Err(source) => {
                warn!(
                    "Favorite toggle for {} failed [{:?}], restored {:?}: {}",
                    menu_id,
                    source.kind(),
                    prior,
                    source
                );
                Err(ToggleError::Store {
                    menu_id: menu_id.to_string(),
                    restored: prior,
                    source,
                })
            }
        }
    }

    async fn add(&self, user: &UserId, menu_id: &str, snapshot: &str) -> Result<(), StoreError> {
        let mut row = Row::new();
        row.insert("user_id".into(), Value::String(user.0.clone()));
        row.insert("menu_id".into(), Value::String(menu_id.to_string()));
        row.insert("food_name".into(), Value::String(snapshot.to_string()));

        match self.store.insert(Entity::Favorites, row).await {
            Ok(_) => Ok(()),
            // Another session already liked it; the remote state is what we want.
            Err(StoreError::Conflict(message)) => {
                debug!("Favorite {} already present: {}", menu_id, message);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    async fn remove(&self, user: &UserId, menu_id: &str) -> Result<(), StoreError> {
        let filters = [
            Filter::eq("user_id", user.0.as_str()),
            Filter::eq("menu_id", menu_id),
        ];
        let removed = self.store.delete(Entity::Favorites, &filters).await?;
        if removed == 0 {
            debug!("Favorite {} was already gone", menu_id);
        }
        Ok(())
    }

    /// The user's favorites, newest first. Anonymous sessions have none.
    pub async fn recent(&self) -> Result<Vec<FavoriteEntry>, StoreError> {
        let Some(user) = self.session().user().cloned() else {
            return Ok(Vec::new());
        };
        let query = Query::new(Entity::Favorites)
            .filter(Filter::eq("user_id", user.0.as_str()))
            .order_by("created_at", false);

        let rows = self.store.query(&query).await?;
        Ok(rows.iter().filter_map(parse_entry).collect())
    }
}

fn liked_count(inner: &Inner) -> usize {
    inner
        .states
        .values()
        .filter(|state| state.is_displayed_liked())
        .count()
}

/// Parse a favorite row; rows missing a key or a readable timestamp are skipped
#[must_use]
pub fn parse_entry(row: &Row) -> Option<FavoriteEntry> {
    let user_id = row.get("user_id").map(value_text)?;
    let menu_id = row.get("menu_id").map(value_text)?;
    let created_at = row
        .get("created_at")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    let Some(created_at) = created_at else {
        debug!("Skipping favorite {} without a readable created_at", menu_id);
        return None;
    };

    Some(FavoriteEntry {
        user_id: UserId(user_id),
        menu_id,
        snapshot_name: row.get("food_name").map(value_text).unwrap_or_default(),
        created_at,
    })
}

/// Parse a stored timestamp. Values without an offset are read as UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Some(t.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|t| t.and_utc())
}
