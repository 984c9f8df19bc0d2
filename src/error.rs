// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Error types shared by the store clients and the core components

use crate::favorites::FavoriteState;
use thiserror::Error;

/// Classification of a remote store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorKind {
    /// Transport failure, timeout or a transient server error
    Network,
    /// The access policy denied the operation
    Permission,
    /// The referenced entity or table does not exist
    NotFound,
    /// An insert violated a uniqueness constraint
    Conflict,
    /// The store answered with a body the client could not interpret
    Decode,
}

/// A classified failure reported by a [`crate::store::RemoteStore`]
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Transport failure, timeout or a transient server error
    #[error("network error: {0}")]
    Network(String),
    /// The access policy denied the operation
    #[error("permission denied: {0}")]
    Permission(String),
    /// The referenced entity or table does not exist
    #[error("not found: {0}")]
    NotFound(String),
    /// An insert violated a uniqueness constraint
    #[error("conflict: {0}")]
    Conflict(String),
    /// The store answered with a body the client could not interpret
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl StoreError {
    /// The classification of this error
    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        match self {
            Self::Network(_) => StoreErrorKind::Network,
            Self::Permission(_) => StoreErrorKind::Permission,
            Self::NotFound(_) => StoreErrorKind::NotFound,
            Self::Conflict(_) => StoreErrorKind::Conflict,
            Self::Decode(_) => StoreErrorKind::Decode,
        }
    }

    /// Build an error of the given class
    #[must_use]
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            StoreErrorKind::Network => Self::Network(message),
            StoreErrorKind::Permission => Self::Permission(message),
            StoreErrorKind::NotFound => Self::NotFound(message),
            StoreErrorKind::Conflict => Self::Conflict(message),
            StoreErrorKind::Decode => Self::Decode(message),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Why a favorite toggle did not go through
#[derive(Debug, Clone, Error)]
pub enum ToggleError {
    /// No user is signed in; nothing was changed
    #[error("sign in to keep favorites")]
    AuthRequired,
    /// A toggle for this meal is already in flight; the request was dropped
    #[error("a favorite change for {0} is already in progress")]
    Busy(String),
    /// The remote write failed and the displayed state was reverted
    #[error("could not update favorite {menu_id}: {source}")]
    Store {
        /// Meal whose toggle failed
        menu_id: String,
        /// State the cache was restored to
        restored: FavoriteState,
        /// Underlying store failure
        #[source]
        source: StoreError,
    },
}
