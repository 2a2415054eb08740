//! Command-line interface definitions for `forumd`.
//!
//! Keeping these types in the library lets tests and alternative front-ends
//! build the same configuration surface the binary exposes.

#![expect(
    non_snake_case,
    reason = "Clap/OrthoConfig derive macros generate helper modules with uppercase names"
)]
#![allow(
    missing_docs,
    reason = "OrthoConfig and Clap derive macros generate items that cannot be documented"
)]
#![allow(
    unfulfilled_lint_expectations,
    reason = "derive macros conditionally generate items"
)]

use clap::{Args, Parser, Subcommand};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::db::DEFAULT_POOL_SIZE;

/// Connection string used when none is configured.
#[cfg(feature = "sqlite")]
pub const DEFAULT_DATABASE: &str = "sqlite:forumdb.db";
/// Connection string used when none is configured.
#[cfg(not(feature = "sqlite"))]
pub const DEFAULT_DATABASE: &str = "postgres://localhost/forum";

/// Arguments for the `create-user` administrative subcommand.
#[expect(
    missing_docs,
    reason = "OrthoConfig derive macro generates items that cannot be documented"
)]
#[derive(Parser, OrthoConfig, Deserialize, Serialize, Default, Debug, Clone)]
#[ortho_config(prefix = "FORUMDB_")]
pub struct CreateUserArgs {
    /// Unique nickname for the new user.
    pub nickname: Option<String>,
    /// Full name.
    #[arg(long)]
    pub fullname: Option<String>,
    /// Unique email address.
    #[arg(long)]
    pub email: Option<String>,
    /// Free-form profile text.
    #[arg(long)]
    pub about: Option<String>,
}

/// Arguments for `create-forum`.
#[derive(Args, Debug, Clone)]
pub struct CreateForumArgs {
    /// Unique forum slug.
    #[arg(long)]
    pub slug: String,
    /// Forum title.
    #[arg(long)]
    pub title: String,
    /// Nickname of the owning user.
    #[arg(long)]
    pub user: String,
}

/// Arguments for `create-thread`.
#[derive(Args, Debug, Clone)]
pub struct CreateThreadArgs {
    /// Slug of the forum to post in.
    #[arg(long)]
    pub forum: String,
    /// Nickname of the author.
    #[arg(long)]
    pub author: String,
    /// Thread title.
    #[arg(long)]
    pub title: String,
    /// Opening message.
    #[arg(long)]
    pub message: String,
    /// Optional unique slug.
    #[arg(long)]
    pub slug: Option<String>,
}

/// Arguments for `create-post`.
#[derive(Args, Debug, Clone)]
pub struct CreatePostArgs {
    /// Thread slug or id.
    #[arg(long)]
    pub thread: String,
    /// Nickname of the author.
    #[arg(long)]
    pub author: String,
    /// Post body.
    #[arg(long)]
    pub message: String,
    /// Id of the post being answered.
    #[arg(long)]
    pub parent: Option<i32>,
}

/// Arguments for `thread-posts`.
#[derive(Args, Debug, Clone)]
pub struct ThreadPostsArgs {
    /// Thread slug or id.
    #[arg(long)]
    pub thread: String,
    /// `flat`, `tree`, or `parent_tree`.
    #[arg(long)]
    pub sort: Option<String>,
    /// Reverse the order.
    #[arg(long)]
    pub desc: bool,
    /// Exclusive cursor post id.
    #[arg(long)]
    pub since: Option<i32>,
    /// Page size.
    #[arg(long, allow_negative_numbers = true)]
    pub limit: Option<i64>,
}

/// Arguments for `vote`.
#[derive(Args, Debug, Clone)]
pub struct VoteArgs {
    /// Thread slug or id.
    #[arg(long)]
    pub thread: String,
    /// Nickname of the voter.
    #[arg(long)]
    pub nickname: String,
    /// `1` or `-1`.
    #[arg(long, allow_negative_numbers = true)]
    pub voice: i32,
}

/// CLI subcommands exposed by `forumd`.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print record counts.
    Status,
    /// Delete every record.
    Clear,
    /// Register a user.
    #[command(name = "create-user")]
    CreateUser(CreateUserArgs),
    /// Open a forum.
    #[command(name = "create-forum")]
    CreateForum(CreateForumArgs),
    /// Start a thread.
    #[command(name = "create-thread")]
    CreateThread(CreateThreadArgs),
    /// Add a post to a thread.
    #[command(name = "create-post")]
    CreatePost(CreatePostArgs),
    /// List a thread's posts.
    #[command(name = "thread-posts")]
    ThreadPosts(ThreadPostsArgs),
    /// Vote on a thread.
    Vote(VoteArgs),
}

/// Runtime configuration shared by all commands.
#[expect(
    missing_docs,
    reason = "OrthoConfig derive macro generates items that cannot be documented"
)]
#[derive(Args, OrthoConfig, Serialize, Deserialize, Debug, Clone)]
#[ortho_config(prefix = "FORUMDB_")]
pub struct AppConfig {
    /// Database connection string, e.g. `sqlite:forum.db`.
    #[ortho_config(default = DEFAULT_DATABASE.to_owned())]
    #[arg(long, default_value_t = DEFAULT_DATABASE.to_owned())]
    pub database: String,
    /// Maximum number of pooled connections.
    #[ortho_config(default = DEFAULT_POOL_SIZE)]
    #[arg(long, default_value_t = DEFAULT_POOL_SIZE)]
    pub pool_size: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_owned(),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Top-level CLI entry point consumed by the binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "forumd", version, about = "Forum storage administration")]
pub struct Cli {
    /// Application configuration.
    #[command(flatten)]
    pub config: AppConfig,
    /// Optional subcommand; without one the store is migrated and its
    /// status printed.
    #[command(subcommand)]
    pub command: Option<Commands>,
}
