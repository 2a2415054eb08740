//! Diesel row types mirroring [`crate::schema`].
//!
//! These structs are storage-facing; the payloads handed to callers live in
//! [`crate::api`].

#![expect(missing_docs, reason = "row fields mirror the columns declared in crate::schema")]

use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct UserRow {
    pub id: i32,
    pub nickname: String,
    pub fullname: String,
    pub about: String,
    pub email: String,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUserRow<'a> {
    pub nickname: &'a str,
    pub fullname: &'a str,
    pub about: &'a str,
    pub email: &'a str,
}

/// Profile columns to overwrite; `None` leaves a column untouched.
#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::users)]
pub struct UserChanges<'a> {
    pub fullname: Option<&'a str>,
    pub about: Option<&'a str>,
    pub email: Option<&'a str>,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::forums)]
pub struct ForumRow {
    pub id: i32,
    pub slug: String,
    pub title: String,
    pub user_id: i32,
    pub posts: i64,
    pub threads: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::forums)]
pub struct NewForumRow<'a> {
    pub slug: &'a str,
    pub title: &'a str,
    pub user_id: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::threads)]
pub struct ThreadRow {
    pub id: i32,
    pub slug: Option<String>,
    pub forum_id: i32,
    pub author_id: i32,
    pub title: String,
    pub message: String,
    pub votes: i32,
    pub created: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::threads)]
pub struct NewThreadRow<'a> {
    pub slug: Option<&'a str>,
    pub forum_id: i32,
    pub author_id: i32,
    pub title: &'a str,
    pub message: &'a str,
    pub created: NaiveDateTime,
}

#[derive(AsChangeset, Default)]
#[diesel(table_name = crate::schema::threads)]
pub struct ThreadChanges<'a> {
    pub title: Option<&'a str>,
    pub message: Option<&'a str>,
}

/// A stored post. `path` holds the encoded form of
/// [`PostPath`](crate::post_path::PostPath).
#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::posts)]
pub struct PostRow {
    pub id: i32,
    pub thread_id: i32,
    pub forum_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    pub root_id: i32,
    pub path: String,
    pub message: String,
    pub is_edited: bool,
    pub created: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::posts)]
pub struct NewPostRow<'a> {
    pub thread_id: i32,
    pub forum_id: i32,
    pub author_id: i32,
    pub parent_id: Option<i32>,
    pub root_id: i32,
    pub path: &'a str,
    pub message: &'a str,
    pub created: NaiveDateTime,
}

#[derive(Queryable, Selectable, Insertable, Debug, Clone, Copy)]
#[diesel(table_name = crate::schema::votes)]
pub struct VoteRow {
    pub user_id: i32,
    pub thread_id: i32,
    pub voice: i32,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::forum_users)]
pub struct ForumUserRow {
    pub forum_id: i32,
    pub user_id: i32,
}
