//! Ordered, paginated listing of a thread's posts.
//!
//! Three orders are supported:
//!
//! - `flat` sorts by post id, i.e. creation order.
//! - `tree` sorts by materialized path, a depth-first walk of the reply tree.
//! - `parent_tree` pages over top-level posts by id and expands each selected
//!   root into its whole subtree, emitted in path order.
//!
//! The `since` cursor names a post of the same thread and is always
//! exclusive. In `flat` mode it bounds the id, in `tree` mode the path, and
//! in `parent_tree` mode the id of the cursor's top-level ancestor.

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::{connection::DbConnection, threads::resolve_thread};
use crate::{
    api::{Post, SortMode, ThreadPostsQuery, positive_limit},
    error::{Entity, ForumError},
    models::PostRow,
    schema::{forums::dsl as f, posts::dsl as p, users::dsl as u},
};

/// Direction and window shared by every sort mode.
#[derive(Debug, Clone, Copy)]
struct Window<'a> {
    thread_id: i32,
    desc: bool,
    cursor: Option<&'a PostRow>,
    limit: Option<i64>,
}

type Rows = Vec<(PostRow, String)>;

/// List a thread's posts in the requested order.
///
/// # Errors
/// Returns [`ForumError::InvalidArgument`] when no sort mode is given or the
/// limit is not positive, and [`ForumError::NotFound`] when the thread does
/// not resolve or the cursor is not a post of that thread.
#[must_use = "handle the result"]
pub async fn thread_posts(
    conn: &mut DbConnection,
    query: &ThreadPostsQuery,
) -> Result<Vec<Post>, ForumError> {
    let sort = query
        .sort
        .ok_or_else(|| ForumError::invalid("sort", "a sort mode is required"))?;
    let limit = positive_limit(query.limit)?;
    let thread = resolve_thread(conn, &query.thread).await?;
    let cursor = match query.since {
        Some(since) => Some(cursor_post(conn, thread.id, since).await?),
        None => None,
    };
    let window = Window {
        thread_id: thread.id,
        desc: query.desc,
        cursor: cursor.as_ref(),
        limit,
    };

    let rows = match sort {
        SortMode::Flat => flat(conn, window).await?,
        SortMode::Tree => tree(conn, window).await?,
        SortMode::ParentTree => parent_tree(conn, window).await?,
    };
    debug!(thread = thread.id, %sort, desc = query.desc, returned = rows.len(), "listed posts");

    let forum: String = f::forums
        .find(thread.forum_id)
        .select(f::slug)
        .first(conn)
        .await?;
    rows.into_iter()
        .map(|(row, author)| row.into_api(author, forum.clone()))
        .collect()
}

async fn cursor_post(
    conn: &mut DbConnection,
    thread_id: i32,
    since: i32,
) -> Result<PostRow, ForumError> {
    p::posts
        .filter(p::id.eq(since))
        .filter(p::thread_id.eq(thread_id))
        .select(PostRow::as_select())
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ForumError::not_found(Entity::Cursor, since))
}

async fn flat(conn: &mut DbConnection, window: Window<'_>) -> Result<Rows, ForumError> {
    let mut q = p::posts
        .inner_join(u::users)
        .filter(p::thread_id.eq(window.thread_id))
        .select((PostRow::as_select(), u::nickname))
        .into_boxed();
    if let Some(cursor) = window.cursor {
        q = if window.desc {
            q.filter(p::id.lt(cursor.id))
        } else {
            q.filter(p::id.gt(cursor.id))
        };
    }
    q = if window.desc {
        q.order(p::id.desc())
    } else {
        q.order(p::id.asc())
    };
    if let Some(limit) = window.limit {
        q = q.limit(limit);
    }
    Ok(q.load(conn).await?)
}

async fn tree(conn: &mut DbConnection, window: Window<'_>) -> Result<Rows, ForumError> {
    let mut q = p::posts
        .inner_join(u::users)
        .filter(p::thread_id.eq(window.thread_id))
        .select((PostRow::as_select(), u::nickname))
        .into_boxed();
    if let Some(cursor) = window.cursor {
        let boundary = cursor.path.clone();
        q = if window.desc {
            q.filter(p::path.lt(boundary))
        } else {
            q.filter(p::path.gt(boundary))
        };
    }
    q = if window.desc {
        q.order(p::path.desc())
    } else {
        q.order(p::path.asc())
    };
    if let Some(limit) = window.limit {
        q = q.limit(limit);
    }
    Ok(q.load(conn).await?)
}

async fn parent_tree(conn: &mut DbConnection, window: Window<'_>) -> Result<Rows, ForumError> {
    let mut roots = p::posts
        .filter(p::thread_id.eq(window.thread_id))
        .filter(p::parent_id.is_null())
        .select(p::id)
        .into_boxed();
    if let Some(cursor) = window.cursor {
        roots = if window.desc {
            roots.filter(p::id.lt(cursor.root_id))
        } else {
            roots.filter(p::id.gt(cursor.root_id))
        };
    }
    roots = if window.desc {
        roots.order(p::id.desc())
    } else {
        roots.order(p::id.asc())
    };
    if let Some(limit) = window.limit {
        roots = roots.limit(limit);
    }
    let root_ids: Vec<i32> = roots.load(conn).await?;
    if root_ids.is_empty() {
        return Ok(Vec::new());
    }

    let q = p::posts
        .inner_join(u::users)
        .filter(p::thread_id.eq(window.thread_id))
        .filter(p::root_id.eq_any(root_ids))
        .select((PostRow::as_select(), u::nickname))
        .into_boxed();
    let q = if window.desc {
        q.order(p::path.desc())
    } else {
        q.order(p::path.asc())
    };
    Ok(q.load(conn).await?)
}
