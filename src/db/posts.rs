//! Post creation with materialized path allocation, lookup, and editing.
//!
//! Every post stores its position in the thread's reply tree as a
//! [`PostPath`]: the parent's path extended by the post's index among its
//! siblings. Sibling indexes are handed out in creation order starting at
//! [`BASE_INDEX`](crate::post_path::BASE_INDEX), so ordering posts by path
//! yields a depth-first walk of the tree.
//!
//! Two writers must never compute the same index under one parent. The
//! `(thread_id, path)` unique constraint rejects a collision outright; on
//! PostgreSQL the allocator additionally locks the parent post (or the thread
//! row, for top-level posts) before counting siblings. SQLite admits a single
//! writer at a time.

use std::collections::{BTreeSet, HashMap};

use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use super::{
    connection::DbConnection,
    forums::{add_forum_members, add_forum_posts, get_forum},
    threads::{resolve_thread, thread_by_id},
    users::user_by_nickname,
};
use crate::{
    api::{NewPost, Post, PostDetails, Related, ThreadRef, User},
    error::{Entity, ForumError},
    models::{NewPostRow, PostRow, ThreadRow, UserRow},
    post_path::{BASE_INDEX, PostPath},
    schema::{forums::dsl as f, posts::dsl as p, users::dsl as u},
};

impl PostRow {
    /// Convert to the caller-facing payload.
    ///
    /// # Errors
    /// Returns [`ForumError::Internal`] when the stored path is malformed.
    pub(crate) fn into_api(self, author: String, forum: String) -> Result<Post, ForumError> {
        Ok(Post {
            id: self.id,
            parent: self.parent_id.unwrap_or(0),
            author,
            message: self.message,
            is_edited: self.is_edited,
            forum,
            thread: self.thread_id,
            created: self.created.and_utc(),
            path: PostPath::decode(&self.path)?,
        })
    }
}

/// Fetch the parent named by a new post, locking it on PostgreSQL.
///
/// # Errors
/// Returns [`ForumError::NotFound`] when the post does not exist or belongs
/// to another thread.
async fn find_parent(
    conn: &mut DbConnection,
    thread_id: i32,
    parent_id: i32,
) -> Result<PostRow, ForumError> {
    let query = p::posts
        .filter(p::id.eq(parent_id))
        .filter(p::thread_id.eq(thread_id))
        .select(PostRow::as_select());
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    let query = query.for_update();
    query
        .first(conn)
        .await
        .optional()?
        .ok_or_else(|| ForumError::not_found(Entity::Parent, parent_id))
}

/// Serialise top-level allocation within a thread.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
async fn lock_thread_roots(conn: &mut DbConnection, thread_id: i32) -> Result<(), ForumError> {
    use crate::schema::threads::dsl as t;

    t::threads
        .find(thread_id)
        .select(t::id)
        .for_update()
        .first::<i32>(conn)
        .await?;
    Ok(())
}

#[cfg(feature = "sqlite")]
async fn lock_thread_roots(_conn: &mut DbConnection, _thread_id: i32) -> Result<(), ForumError> {
    Ok(())
}

/// Compute the path of a new post under `parent`, or of a new top-level post
/// when `parent` is `None`.
///
/// The local index is the number of existing siblings plus
/// [`BASE_INDEX`]. Callers must hold the sibling scope (see the module
/// docs) until the post is inserted.
///
/// # Errors
/// Returns [`ForumError::Internal`] when the parent's stored path is
/// malformed or the sibling count overflows.
pub async fn allocate_path(
    conn: &mut DbConnection,
    thread_id: i32,
    parent: Option<&PostRow>,
) -> Result<PostPath, ForumError> {
    let siblings = p::posts.filter(p::thread_id.eq(thread_id)).into_boxed();
    let siblings = match parent {
        Some(parent) => siblings.filter(p::parent_id.eq(parent.id)),
        None => siblings.filter(p::parent_id.is_null()),
    };
    let count: i64 = siblings.count().get_result(conn).await?;
    let index = u32::try_from(count)
        .ok()
        .and_then(|c| c.checked_add(BASE_INDEX))
        .ok_or_else(|| ForumError::internal(format!("sibling index overflow after {count}")))?;

    match parent {
        Some(parent) => Ok(PostPath::decode(&parent.path)?.child(index)),
        None => Ok(PostPath::root(index)),
    }
}

async fn insert_post(
    conn: &mut DbConnection,
    thread: &ThreadRow,
    author: &UserRow,
    new: &NewPost,
    batch_created: NaiveDateTime,
) -> Result<PostRow, ForumError> {
    let created = new.created.map_or(batch_created, |at| at.naive_utc());
    let parent = match new.parent_id() {
        Some(parent_id) => Some(find_parent(conn, thread.id, parent_id).await?),
        None => None,
    };
    let path = allocate_path(conn, thread.id, parent.as_ref()).await?;
    let encoded = path.encode();
    let row = NewPostRow {
        thread_id: thread.id,
        forum_id: thread.forum_id,
        author_id: author.id,
        parent_id: parent.as_ref().map(|parent| parent.id),
        root_id: parent.as_ref().map_or(0, |parent| parent.root_id),
        path: &encoded,
        message: &new.message,
        created,
    };
    let inserted = diesel::insert_into(p::posts)
        .values(&row)
        .returning(PostRow::as_returning())
        .get_result(conn)
        .await
        .map_err(|e| {
            ForumError::from(e).on_conflict(Entity::Post, format!("thread {} path {path}", thread.id))
        })?;

    if parent.is_some() {
        return Ok(inserted);
    }
    Ok(diesel::update(p::posts.find(inserted.id))
        .set(p::root_id.eq(inserted.id))
        .returning(PostRow::as_returning())
        .get_result(conn)
        .await?)
}

/// Insert a batch of posts into one thread.
///
/// The batch is all-or-nothing: an unknown author or a parent missing from
/// the thread rejects every post. Posts without an explicit `created` share
/// one creation timestamp, and a post may reply to one inserted earlier in
/// the same batch. The
/// forum's post counter and membership set are updated once per batch.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown thread, author, or
/// parent, and [`ForumError::Conflict`] when a concurrent writer claimed the
/// same path.
#[must_use = "handle the result"]
pub async fn create_posts(
    conn: &mut DbConnection,
    thread: &ThreadRef,
    batch: &[NewPost],
) -> Result<Vec<Post>, ForumError> {
    conn.transaction::<_, ForumError, _>(|conn| {
        Box::pin(async move {
            let thread = resolve_thread(conn, thread).await?;
            if batch.is_empty() {
                return Ok(Vec::new());
            }
            let forum: String = f::forums
                .find(thread.forum_id)
                .select(f::slug)
                .first(conn)
                .await?;
            if batch.iter().any(|new| new.parent_id().is_none()) {
                lock_thread_roots(conn, thread.id).await?;
            }

            let created = Utc::now().naive_utc();
            let mut authors: HashMap<&str, UserRow> = HashMap::new();
            let mut members = BTreeSet::new();
            let mut posts = Vec::with_capacity(batch.len());
            for new in batch {
                let author = if let Some(author) = authors.get(new.author.as_str()) {
                    author.clone()
                } else {
                    let author = user_by_nickname(conn, &new.author).await?;
                    authors.insert(new.author.as_str(), author.clone());
                    author
                };
                let row = insert_post(conn, &thread, &author, new, created).await?;
                members.insert(author.id);
                posts.push(row.into_api(author.nickname, forum.clone())?);
            }

            let count = i64::try_from(posts.len()).map_err(ForumError::internal)?;
            add_forum_posts(conn, thread.forum_id, count).await?;
            let members: Vec<i32> = members.into_iter().collect();
            add_forum_members(conn, thread.forum_id, &members).await?;
            debug!(thread = thread.id, count, "posts created");
            Ok(posts)
        })
    })
    .await
}

async fn post_with_names(
    conn: &mut DbConnection,
    id: i32,
) -> Result<(PostRow, String, String), ForumError> {
    p::posts
        .inner_join(u::users)
        .inner_join(f::forums)
        .filter(p::id.eq(id))
        .select((PostRow::as_select(), u::nickname, f::slug))
        .first::<(PostRow, String, String)>(conn)
        .await
        .optional()?
        .ok_or_else(|| ForumError::not_found(Entity::Post, id))
}

/// Fetch a post, optionally with its author, thread, and forum.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown post id.
#[must_use = "handle the result"]
pub async fn get_post(
    conn: &mut DbConnection,
    id: i32,
    related: &[Related],
) -> Result<PostDetails, ForumError> {
    let (row, author_name, forum_slug) = post_with_names(conn, id).await?;
    let (author_id, thread_id) = (row.author_id, row.thread_id);

    let author = if related.contains(&Related::User) {
        let row: UserRow = u::users
            .find(author_id)
            .select(UserRow::as_select())
            .first(conn)
            .await?;
        Some(User::from(row))
    } else {
        None
    };
    let thread = if related.contains(&Related::Thread) {
        Some(thread_by_id(conn, thread_id).await?)
    } else {
        None
    };
    let forum = if related.contains(&Related::Forum) {
        Some(get_forum(conn, &forum_slug).await?)
    } else {
        None
    };

    Ok(PostDetails {
        post: row.into_api(author_name, forum_slug)?,
        author,
        thread,
        forum,
    })
}

/// Replace a post's message.
///
/// The post is flagged as edited only when the message actually changes;
/// `None` or an identical message returns the post untouched.
///
/// # Errors
/// Returns [`ForumError::NotFound`] for an unknown post id.
#[must_use = "handle the result"]
pub async fn update_post(
    conn: &mut DbConnection,
    id: i32,
    message: Option<&str>,
) -> Result<Post, ForumError> {
    let (row, author, forum) = post_with_names(conn, id).await?;
    let Some(message) = message.filter(|m| *m != row.message) else {
        return row.into_api(author, forum);
    };
    let updated = diesel::update(p::posts.find(id))
        .set((p::message.eq(message), p::is_edited.eq(true)))
        .returning(PostRow::as_returning())
        .get_result(conn)
        .await?;
    updated.into_api(author, forum)
}
