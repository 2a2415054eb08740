//! Thread voting with a cached running total.
//!
//! A first vote by a user adds its voice to `threads.votes`. A repeat vote
//! overwrites the stored voice and recomputes the total from every vote row,
//! which also repairs any drift left by earlier increments.

use diesel::{dsl::sum, prelude::*};
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::debug;

use super::{
    connection::DbConnection,
    threads::{resolve_thread, thread_by_id},
    users::user_by_nickname,
};
use crate::{
    api::{Thread, ThreadRef, Vote},
    error::{Entity, ForumError},
    models::VoteRow,
    schema::{threads::dsl as t, votes::dsl as v},
};

/// Record `vote` on a thread and return the thread with its new total.
///
/// # Errors
/// Returns [`ForumError::InvalidArgument`] for a voice other than `1` or
/// `-1`, and [`ForumError::NotFound`] for an unknown thread or voter.
#[must_use = "handle the result"]
pub async fn vote(
    conn: &mut DbConnection,
    thread: &ThreadRef,
    vote: &Vote,
) -> Result<Thread, ForumError> {
    if !matches!(vote.voice, -1 | 1) {
        return Err(ForumError::invalid(
            "voice",
            format!("must be 1 or -1, got {}", vote.voice),
        ));
    }
    conn.transaction::<_, ForumError, _>(|conn| {
        Box::pin(async move {
            let thread = resolve_thread(conn, thread).await?;
            let user = user_by_nickname(conn, &vote.nickname).await?;
            let previous: Option<i32> = v::votes
                .find((user.id, thread.id))
                .select(v::voice)
                .first(conn)
                .await
                .optional()?;

            if previous.is_none() {
                let row = VoteRow {
                    user_id: user.id,
                    thread_id: thread.id,
                    voice: vote.voice,
                };
                diesel::insert_into(v::votes)
                    .values(&row)
                    .execute(conn)
                    .await
                    .map_err(|e| {
                        ForumError::from(e)
                            .on_conflict(Entity::Vote, format!("{} on thread {}", user.nickname, thread.id))
                    })?;
                diesel::update(t::threads.find(thread.id))
                    .set(t::votes.eq(t::votes + vote.voice))
                    .execute(conn)
                    .await?;
            } else {
                diesel::update(v::votes.find((user.id, thread.id)))
                    .set(v::voice.eq(vote.voice))
                    .execute(conn)
                    .await?;
                recount_votes(conn, thread.id).await?;
            }
            debug!(thread = thread.id, voter = %user.nickname, voice = vote.voice, "vote applied");
            thread_by_id(conn, thread.id).await
        })
    })
    .await
}

/// Overwrite a thread's cached total with the sum of its vote rows.
///
/// # Errors
/// Returns any error produced by the queries, or
/// [`ForumError::Internal`] when the sum does not fit the counter.
pub async fn recount_votes(conn: &mut DbConnection, thread_id: i32) -> Result<i32, ForumError> {
    let total: Option<i64> = v::votes
        .filter(v::thread_id.eq(thread_id))
        .select(sum(v::voice))
        .first(conn)
        .await?;
    let total = i32::try_from(total.unwrap_or(0)).map_err(ForumError::internal)?;
    diesel::update(t::threads.find(thread_id))
        .set(t::votes.eq(total))
        .execute(conn)
        .await?;
    Ok(total)
}
