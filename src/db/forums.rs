//! Forum records, their counters, and the forum membership set.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::{connection::DbConnection, lower, users::user_by_nickname};
use crate::{
    api::{Forum, ForumThreadsQuery, ForumUsersQuery, NewForum, Thread, User, positive_limit},
    error::{Entity, ForumError},
    models::{ForumRow, ForumUserRow, NewForumRow, ThreadRow, UserRow},
    schema::{forum_users::dsl as fu, forums::dsl as f, threads::dsl as t, users::dsl as u},
};

impl ForumRow {
    pub(crate) fn into_api(self, owner: String) -> Forum {
        Forum {
            slug: self.slug,
            title: self.title,
            user: owner,
            posts: self.posts,
            threads: self.threads,
        }
    }
}

/// Look up a forum by slug, ignoring case.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown slug.
pub async fn forum_by_slug(conn: &mut DbConnection, slug: &str) -> Result<ForumRow, ForumError> {
    f::forums
        .filter(lower(f::slug).eq(lower(slug)))
        .select(ForumRow::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ForumError::not_found(Entity::Forum, slug))
}

/// Open a forum owned by an existing user.
///
/// The stored owner is the user's canonical nickname, whatever case the
/// request used.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown owner and
/// [`ForumError::Conflict`] for a slug already in use.
#[must_use = "handle the result"]
pub async fn create_forum(conn: &mut DbConnection, new: &NewForum) -> Result<Forum, ForumError> {
    let owner = user_by_nickname(conn, &new.user).await?;
    let row = NewForumRow {
        slug: &new.slug,
        title: &new.title,
        user_id: owner.id,
    };
    let inserted = diesel::insert_into(f::forums)
        .values(&row)
        .returning(ForumRow::as_returning())
        .get_result(conn)
        .await
        .map_err(|e| ForumError::from(e).on_conflict(Entity::Forum, &new.slug))?;
    Ok(inserted.into_api(owner.nickname))
}

/// Fetch a forum together with its owner's nickname.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown slug.
#[must_use = "handle the result"]
pub async fn get_forum(conn: &mut DbConnection, slug: &str) -> Result<Forum, ForumError> {
    let (row, owner) = f::forums
        .inner_join(u::users)
        .filter(lower(f::slug).eq(lower(slug)))
        .select((ForumRow::as_select(), u::nickname))
        .first::<(ForumRow, String)>(conn)
        .await
        .optional()?
        .ok_or_else(|| ForumError::not_found(Entity::Forum, slug))?;
    Ok(row.into_api(owner))
}

/// List a forum's threads by creation time.
///
/// `since` is inclusive: threads created exactly at the bound are returned.
///
/// # Errors
/// Returns [`ForumError::InvalidArgument`] for a non-positive limit and
/// [`ForumError::NotFound`] for an unknown forum.
#[must_use = "handle the result"]
pub async fn forum_threads(
    conn: &mut DbConnection,
    slug: &str,
    query: &ForumThreadsQuery,
) -> Result<Vec<Thread>, ForumError> {
    let limit = positive_limit(query.limit)?;
    let forum = forum_by_slug(conn, slug).await?;

    let mut q = t::threads
        .inner_join(u::users)
        .filter(t::forum_id.eq(forum.id))
        .select((ThreadRow::as_select(), u::nickname))
        .into_boxed();
    if let Some(since) = query.since.map(|s| s.naive_utc()) {
        q = if query.desc {
            q.filter(t::created.le(since))
        } else {
            q.filter(t::created.ge(since))
        };
    }
    q = if query.desc {
        q.order((t::created.desc(), t::id.desc()))
    } else {
        q.order((t::created.asc(), t::id.asc()))
    };
    if let Some(limit) = limit {
        q = q.limit(limit);
    }

    let rows: Vec<(ThreadRow, String)> = q.load(conn).await?;
    Ok(rows
        .into_iter()
        .map(|(row, author)| row.into_api(forum.slug.clone(), author))
        .collect())
}

/// List the users who started a thread or posted in a forum.
///
/// Users are ordered by nickname, compared case-insensitively, and `since`
/// is an exclusive bound on that order.
///
/// # Errors
/// Returns [`ForumError::InvalidArgument`] for a non-positive limit and
/// [`ForumError::NotFound`] for an unknown forum.
#[must_use = "handle the result"]
pub async fn forum_users(
    conn: &mut DbConnection,
    slug: &str,
    query: &ForumUsersQuery,
) -> Result<Vec<User>, ForumError> {
    let limit = positive_limit(query.limit)?;
    let forum = forum_by_slug(conn, slug).await?;

    let mut q = fu::forum_users
        .inner_join(u::users)
        .filter(fu::forum_id.eq(forum.id))
        .select(UserRow::as_select())
        .into_boxed();
    if let Some(since) = query.since.clone() {
        q = if query.desc {
            q.filter(lower(u::nickname).lt(lower(since)))
        } else {
            q.filter(lower(u::nickname).gt(lower(since)))
        };
    }
    q = if query.desc {
        q.order(lower(u::nickname).desc())
    } else {
        q.order(lower(u::nickname).asc())
    };
    if let Some(limit) = limit {
        q = q.limit(limit);
    }

    let rows: Vec<UserRow> = q.load(conn).await?;
    Ok(rows.into_iter().map(User::from).collect())
}

/// Add users to a forum's membership set, skipping existing members.
///
/// # Errors
/// Returns any error produced by the insert.
pub async fn add_forum_members(
    conn: &mut DbConnection,
    forum_id: i32,
    user_ids: &[i32],
) -> Result<(), ForumError> {
    for &user_id in user_ids {
        diesel::insert_into(fu::forum_users)
            .values(&ForumUserRow { forum_id, user_id })
            .on_conflict_do_nothing()
            .execute(conn)
            .await?;
    }
    Ok(())
}

/// Add `count` to a forum's post counter.
///
/// # Errors
/// Returns any error produced by the update.
pub async fn add_forum_posts(
    conn: &mut DbConnection,
    forum_id: i32,
    count: i64,
) -> Result<(), ForumError> {
    diesel::update(f::forums.find(forum_id))
        .set(f::posts.eq(f::posts + count))
        .execute(conn)
        .await?;
    Ok(())
}

/// Increment a forum's thread counter.
///
/// # Errors
/// Returns any error produced by the update.
pub async fn add_forum_thread(conn: &mut DbConnection, forum_id: i32) -> Result<(), ForumError> {
    diesel::update(f::forums.find(forum_id))
        .set(f::threads.eq(f::threads + 1))
        .execute(conn)
        .await?;
    Ok(())
}
