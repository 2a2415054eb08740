//! Parameter records and payloads exchanged with the request layer.
//!
//! Every forum operation takes one of these plain records and returns either
//! a payload defined here or a [`ForumError`](crate::error::ForumError). The
//! field names follow the forum API's JSON shape so a transport adapter can
//! serialise them as-is.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::ForumError, post_path::PostPath};

/// How a thread is addressed: by numeric id or by its slug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThreadRef {
    /// Numeric thread id.
    Id(i32),
    /// Case-insensitive slug.
    Slug(String),
}

impl ThreadRef {
    /// Interpret a `slug_or_id` path segment. All-digit input is an id.
    #[must_use]
    pub fn parse(slug_or_id: &str) -> Self {
        slug_or_id
            .parse::<i32>()
            .map_or_else(|_| Self::Slug(slug_or_id.to_owned()), Self::Id)
    }
}

impl From<i32> for ThreadRef {
    fn from(id: i32) -> Self { Self::Id(id) }
}

impl fmt::Display for ThreadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Slug(slug) => f.write_str(slug),
        }
    }
}

/// Profile fields supplied when registering a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Display name.
    pub fullname: String,
    /// Free-form self-description.
    pub about: String,
    /// Contact address, unique ignoring case.
    pub email: String,
}

/// Partial profile update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    /// New display name.
    pub fullname: Option<String>,
    /// New self-description.
    pub about: Option<String>,
    /// New contact address; must not belong to another user.
    pub email: Option<String>,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Nickname as registered, in its original case.
    pub nickname: String,
    /// Display name.
    pub fullname: String,
    /// Free-form self-description.
    pub about: String,
    /// Contact address.
    pub email: String,
}

/// Request to open a forum owned by `user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewForum {
    /// Unique slug, compared ignoring case.
    pub slug: String,
    /// Human-readable title.
    pub title: String,
    /// Nickname of the owner.
    pub user: String,
}

/// A forum with its denormalised counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forum {
    /// Slug as created.
    pub slug: String,
    /// Human-readable title.
    pub title: String,
    /// Owner's canonical nickname.
    pub user: String,
    /// Posts across all threads.
    pub posts: i64,
    /// Threads in the forum.
    pub threads: i32,
}

/// Request to start a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewThread {
    /// Slug of the forum to post in.
    pub forum: String,
    /// Author's nickname.
    pub author: String,
    /// Thread title.
    pub title: String,
    /// Opening message.
    pub message: String,
    /// Optional unique slug; empty counts as none.
    #[serde(default)]
    pub slug: Option<String>,
    /// Defaults to the insertion time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

/// A thread with its running vote total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Generated id.
    pub id: i32,
    /// Slug, if the thread has one.
    pub slug: Option<String>,
    /// Slug of the owning forum.
    pub forum: String,
    /// Author's nickname.
    pub author: String,
    /// Thread title.
    pub title: String,
    /// Opening message.
    pub message: String,
    /// Sum of every vote's voice.
    pub votes: i32,
    /// Creation time.
    pub created: DateTime<Utc>,
}

/// Partial thread update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadUpdate {
    /// New title.
    pub title: Option<String>,
    /// New opening message.
    pub message: Option<String>,
}

/// One post of a batch submitted to a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    /// Author's nickname.
    pub author: String,
    /// Post body.
    pub message: String,
    /// Parent post id; absent or `0` makes the post a root.
    #[serde(default)]
    pub parent: Option<i32>,
    /// Defaults to the batch's insertion time.
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Parent id, treating `0` as "no parent".
    #[must_use]
    pub fn parent_id(&self) -> Option<i32> { self.parent.filter(|id| *id != 0) }
}

/// A stored post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Generated id, increasing in creation order.
    pub id: i32,
    /// Parent post id, `0` for a root post.
    pub parent: i32,
    /// Author's nickname.
    pub author: String,
    /// Post body.
    pub message: String,
    /// Set once the message has been changed.
    pub is_edited: bool,
    /// Slug of the forum the thread belongs to.
    pub forum: String,
    /// Id of the thread.
    pub thread: i32,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Position in the thread's reply tree.
    pub path: PostPath,
}

/// Post listing order for a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// By id, i.e. creation order.
    Flat,
    /// Depth-first over the reply tree.
    Tree,
    /// Depth-first, paginated by top-level post.
    ParentTree,
}

impl SortMode {
    /// Name used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Tree => "tree",
            Self::ParentTree => "parent_tree",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for SortMode {
    type Err = ForumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flat" => Ok(Self::Flat),
            "tree" => Ok(Self::Tree),
            "parent_tree" => Ok(Self::ParentTree),
            other => Err(ForumError::invalid(
                "sort",
                format!("unknown sort mode {other:?}, expected flat, tree or parent_tree"),
            )),
        }
    }
}

/// Parameters for listing a thread's posts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPostsQuery {
    /// Thread to list.
    pub thread: ThreadRef,
    /// Required; `None` is rejected as an invalid argument.
    pub sort: Option<SortMode>,
    /// Reverse the order.
    pub desc: bool,
    /// Exclusive cursor: id of a post of the same thread.
    pub since: Option<i32>,
    /// Page size; for `parent_tree` the number of root posts.
    pub limit: Option<i64>,
}

impl ThreadPostsQuery {
    /// Unpaginated ascending query in the given mode.
    #[must_use]
    pub const fn new(thread: ThreadRef, sort: SortMode) -> Self {
        Self {
            thread,
            sort: Some(sort),
            desc: false,
            since: None,
            limit: None,
        }
    }
}

/// Parameters for listing a forum's threads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumThreadsQuery {
    /// Page size.
    pub limit: Option<i64>,
    /// Inclusive bound on `created`.
    pub since: Option<DateTime<Utc>>,
    /// Newest first.
    pub desc: bool,
}

/// Parameters for listing a forum's participants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForumUsersQuery {
    /// Page size.
    pub limit: Option<i64>,
    /// Exclusive bound on nickname, compared case-insensitively.
    pub since: Option<String>,
    /// Reverse nickname order.
    pub desc: bool,
}

/// A vote cast on a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// Voter's nickname.
    pub nickname: String,
    /// `1` or `-1`.
    pub voice: i32,
}

/// Records that can accompany a single post lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Related {
    /// The post's author.
    User,
    /// The forum the post belongs to.
    Forum,
    /// The thread the post belongs to.
    Thread,
}

/// A post together with any requested related records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetails {
    /// The post itself.
    pub post: Post,
    /// Author, when [`Related::User`] was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<User>,
    /// Thread, when [`Related::Thread`] was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,
    /// Forum, when [`Related::Forum`] was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forum: Option<Forum>,
}

/// Row counts across the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Registered users.
    pub user: i64,
    /// Forums.
    pub forum: i64,
    /// Threads.
    pub thread: i64,
    /// Posts.
    pub post: i64,
}

/// Reject a non-positive page size.
pub(crate) fn positive_limit(limit: Option<i64>) -> Result<Option<i64>, ForumError> {
    match limit {
        Some(n) if n <= 0 => Err(ForumError::invalid("limit", format!("must be positive, got {n}"))),
        other => Ok(other),
    }
}
