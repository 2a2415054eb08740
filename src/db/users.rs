//! User registration and profile queries.

use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_async::RunQueryDsl;

use super::{connection::DbConnection, lower};
use crate::{
    api::{User, UserProfile, UserUpdate},
    error::{Entity, ForumError},
    models::{NewUserRow, UserChanges, UserRow},
    schema::users::dsl as u,
};

/// Whether a failed write collided on the email index rather than the
/// nickname one.
fn collided_on_email(err: &DieselError) -> bool {
    matches!(
        err,
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info)
            if info.constraint_name().unwrap_or_else(|| info.message()).contains("email")
    )
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            nickname: row.nickname,
            fullname: row.fullname,
            about: row.about,
            email: row.email,
        }
    }
}

/// Look up a user by nickname, ignoring case.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown nickname.
pub async fn user_by_nickname(conn: &mut DbConnection, nickname: &str) -> Result<UserRow, ForumError> {
    u::users
        .filter(lower(u::nickname).eq(lower(nickname)))
        .select(UserRow::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ForumError::not_found(Entity::User, nickname))
}

/// Register a user.
///
/// # Errors
/// Returns [`ForumError::Conflict`] when the nickname or email is already
/// taken, compared case-insensitively.
#[must_use = "handle the result"]
pub async fn create_user(
    conn: &mut DbConnection,
    nickname: &str,
    profile: &UserProfile,
) -> Result<User, ForumError> {
    let row = NewUserRow {
        nickname,
        fullname: &profile.fullname,
        about: &profile.about,
        email: &profile.email,
    };
    diesel::insert_into(u::users)
        .values(&row)
        .returning(UserRow::as_returning())
        .get_result(conn)
        .await
        .map(User::from)
        .map_err(|e| {
            let key = if collided_on_email(&e) { profile.email.as_str() } else { nickname };
            ForumError::from(e).on_conflict(Entity::User, key)
        })
}

/// Fetch a user's profile.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown nickname.
#[must_use = "handle the result"]
pub async fn get_user(conn: &mut DbConnection, nickname: &str) -> Result<User, ForumError> {
    user_by_nickname(conn, nickname).await.map(User::from)
}

/// Overwrite the supplied profile fields.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown nickname and
/// [`ForumError::Conflict`] when the new email belongs to another user.
#[must_use = "handle the result"]
pub async fn update_user(
    conn: &mut DbConnection,
    nickname: &str,
    update: &UserUpdate,
) -> Result<User, ForumError> {
    let current = user_by_nickname(conn, nickname).await?;
    let changes = UserChanges {
        fullname: update.fullname.as_deref(),
        about: update.about.as_deref(),
        email: update.email.as_deref(),
    };
    if changes.fullname.is_none() && changes.about.is_none() && changes.email.is_none() {
        return Ok(current.into());
    }
    diesel::update(u::users.find(current.id))
        .set(&changes)
        .returning(UserRow::as_returning())
        .get_result(conn)
        .await
        .map(User::from)
        .map_err(|e| {
            ForumError::from(e).on_conflict(Entity::User, changes.email.unwrap_or(nickname))
        })
}
