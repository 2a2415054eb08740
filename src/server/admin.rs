//! Administrative command handlers.
//!
//! Each subcommand maps onto one [`ForumService`] operation and prints the
//! resulting payload as JSON.

#![allow(
    clippy::print_stdout,
    reason = "intentional user output for CLI commands"
)]

use anyhow::{Context, Result, anyhow};
use ortho_config::load_and_merge_subcommand_for;
use serde::Serialize;

use super::{
    Commands,
    CreateUserArgs,
    cli::{CreatePostArgs, ThreadPostsArgs},
};
use crate::{
    api::{NewForum, NewPost, NewThread, SortMode, ThreadPostsQuery, ThreadRef, UserProfile, Vote},
    service::ForumService,
};

fn emit<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to encode output")?;
    println!("{json}");
    Ok(())
}

/// Execute an administrative command against `service`.
///
/// # Errors
///
/// Propagates failures from configuration merging or forum operations.
pub async fn run_command(command: Commands, service: &ForumService) -> Result<()> {
    match command {
        Commands::Status => emit(&service.status().await?),
        Commands::Clear => {
            service.clear().await?;
            println!("Forum store cleared");
            Ok(())
        }
        Commands::CreateUser(args) => {
            let args = load_and_merge_subcommand_for::<CreateUserArgs>(&args)?;
            run_create_user(args, service).await
        }
        Commands::CreateForum(args) => {
            let forum = service
                .create_forum(&NewForum {
                    slug: args.slug,
                    title: args.title,
                    user: args.user,
                })
                .await?;
            emit(&forum)
        }
        Commands::CreateThread(args) => {
            let thread = service
                .create_thread(&NewThread {
                    forum: args.forum,
                    author: args.author,
                    title: args.title,
                    message: args.message,
                    slug: args.slug,
                    created: None,
                })
                .await?;
            emit(&thread)
        }
        Commands::CreatePost(args) => run_create_post(args, service).await,
        Commands::ThreadPosts(args) => run_thread_posts(args, service).await,
        Commands::Vote(args) => {
            let thread = service
                .vote(&ThreadRef::parse(&args.thread), &Vote {
                    nickname: args.nickname,
                    voice: args.voice,
                })
                .await?;
            emit(&thread)
        }
    }
}

async fn run_create_user(args: CreateUserArgs, service: &ForumService) -> Result<()> {
    let nickname = args.nickname.ok_or_else(|| anyhow!("missing nickname"))?;
    let email = args.email.ok_or_else(|| anyhow!("missing email"))?;
    let profile = UserProfile {
        fullname: args.fullname.unwrap_or_default(),
        about: args.about.unwrap_or_default(),
        email,
    };
    let user = service
        .create_user(&nickname, &profile)
        .await
        .with_context(|| format!("failed to create user '{nickname}'"))?;
    emit(&user)
}

async fn run_create_post(args: CreatePostArgs, service: &ForumService) -> Result<()> {
    let batch = [NewPost {
        author: args.author,
        message: args.message,
        parent: args.parent,
        created: None,
    }];
    let posts = service
        .create_posts(&ThreadRef::parse(&args.thread), &batch)
        .await
        .with_context(|| format!("failed to post in thread '{}'", args.thread))?;
    emit(&posts)
}

async fn run_thread_posts(args: ThreadPostsArgs, service: &ForumService) -> Result<()> {
    let sort = args.sort.as_deref().map(str::parse::<SortMode>).transpose()?;
    let query = ThreadPostsQuery {
        thread: ThreadRef::parse(&args.thread),
        sort,
        desc: args.desc,
        since: args.since,
        limit: args.limit,
    };
    emit(&service.thread_posts(&query).await?)
}
