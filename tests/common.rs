//! Shared helpers for integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use forumdb::{
    api::{NewForum, NewPost, NewThread, Post, Thread, ThreadRef, UserProfile},
    service::ForumService,
};
use tempfile::TempDir;

/// A file-backed store that lives as long as its temporary directory.
pub struct Store {
    pub service: ForumService,
    pub database: String,
    _dir: TempDir,
}

/// Open a migrated SQLite store in a fresh temporary directory.
#[cfg(feature = "sqlite")]
pub async fn sqlite_store(pool_size: u32) -> Store {
    let dir = TempDir::new().expect("failed to create temp dir");
    let database = format!("sqlite:{}", dir.path().join("forum.db").display());
    let service = ForumService::open(&database, pool_size)
        .await
        .expect("failed to open store");
    Store {
        service,
        database,
        _dir: dir,
    }
}

/// Register `nicknames`, open forum `rust` owned by the first, and start a
/// thread in it.
pub async fn seed(service: &ForumService, nicknames: &[&str], thread_slug: &str) -> Thread {
    for nickname in nicknames {
        service
            .create_user(nickname, &UserProfile {
                fullname: format!("{nickname} Example"),
                about: String::new(),
                email: format!("{nickname}@example.org"),
            })
            .await
            .expect("failed to create user");
    }
    let owner = nicknames.first().copied().unwrap_or("alice");
    service
        .create_forum(&NewForum {
            slug: "rust".to_owned(),
            title: "Rust".to_owned(),
            user: owner.to_owned(),
        })
        .await
        .expect("failed to create forum");
    service
        .create_thread(&NewThread {
            forum: "rust".to_owned(),
            author: owner.to_owned(),
            title: "Ownership".to_owned(),
            message: "Discuss.".to_owned(),
            slug: Some(thread_slug.to_owned()),
            created: None,
        })
        .await
        .expect("failed to create thread")
}

/// Post one reply by `author`.
pub async fn post(service: &ForumService, thread: i32, author: &str, parent: Option<i32>) -> Post {
    service
        .create_posts(&ThreadRef::Id(thread), &[NewPost {
            author: author.to_owned(),
            message: format!("{author} replies to {parent:?}"),
            parent,
            created: None,
        }])
        .await
        .expect("failed to create post")
        .pop()
        .expect("one post created")
}

/// Ids of `posts`, in order.
pub fn ids(posts: &[Post]) -> Vec<i32> { posts.iter().map(|p| p.id).collect() }
