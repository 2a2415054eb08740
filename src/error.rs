//! Typed failures returned by every forum operation.
//!
//! Each variant carries the identifier that caused it so callers can report
//! precisely which user, thread, or post was missing or duplicated. Store
//! faults that do not map to one of the domain kinds collapse into
//! [`ForumError::Internal`].

use std::fmt;

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

use crate::post_path::PathDecodeError;

/// Kind of record an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// A user, keyed by nickname.
    User,
    /// A forum, keyed by slug.
    Forum,
    /// A thread, keyed by slug or id.
    Thread,
    /// A post, keyed by id.
    Post,
    /// The parent named by a new post.
    Parent,
    /// The `since` post of a paginated listing.
    Cursor,
    /// A vote row.
    Vote,
    /// A row whose kind the store did not report.
    Record,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Forum => "forum",
            Self::Thread => "thread",
            Self::Post => "post",
            Self::Parent => "parent post",
            Self::Cursor => "cursor post",
            Self::Vote => "vote",
            Self::Record => "record",
        })
    }
}

/// Failure of a forum operation.
#[derive(Debug, Error)]
pub enum ForumError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of the missing record.
        entity: Entity,
        /// Identifier supplied by the caller.
        key: String,
    },
    /// A uniqueness constraint rejected the write.
    #[error("{entity} already exists: {key}")]
    Conflict {
        /// Kind of the duplicated record.
        entity: Entity,
        /// Identifier that collided.
        key: String,
    },
    /// A request parameter was missing or out of range.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument {
        /// Parameter name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// Unexpected store fault.
    #[error("internal store fault: {0}")]
    Internal(String),
}

impl ForumError {
    /// Build a [`ForumError::NotFound`].
    pub fn not_found(entity: Entity, key: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    /// Build a [`ForumError::Conflict`].
    pub fn conflict(entity: Entity, key: impl fmt::Display) -> Self {
        Self::Conflict {
            entity,
            key: key.to_string(),
        }
    }

    /// Build a [`ForumError::InvalidArgument`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Wrap an unexpected fault.
    pub fn internal(err: impl fmt::Display) -> Self { Self::Internal(err.to_string()) }

    /// Re-tag a unique violation with the entity and key being written.
    ///
    /// Any other error is returned unchanged.
    #[must_use]
    pub fn on_conflict(self, entity: Entity, key: impl fmt::Display) -> Self {
        match self {
            Self::Conflict { .. } => Self::conflict(entity, key),
            other => other,
        }
    }

    /// Whether this is a [`ForumError::NotFound`] for `entity`.
    #[must_use]
    pub fn is_not_found(&self, entity: Entity) -> bool {
        matches!(self, Self::NotFound { entity: e, .. } if *e == entity)
    }
}

/// `SQLite` reports a writer that lost the race for the database lock as
/// `SQLITE_BUSY` or `SQLITE_LOCKED` without a dedicated error kind.
fn is_lock_contention(message: &str) -> bool {
    message.contains("database is locked") || message.contains("database table is locked")
}

impl From<DieselError> for ForumError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                Self::conflict(Entity::Record, info.message())
            }
            DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, info) => {
                Self::conflict(Entity::Record, info.message())
            }
            DieselError::DatabaseError(DatabaseErrorKind::Unknown, info)
                if is_lock_contention(info.message()) =>
            {
                Self::conflict(Entity::Record, info.message())
            }
            other => Self::internal(other),
        }
    }
}

impl From<PathDecodeError> for ForumError {
    fn from(err: PathDecodeError) -> Self { Self::internal(err) }
}
