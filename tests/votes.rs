//! Vote aggregation through [`ForumService`].

#![cfg(feature = "sqlite")]

use forumdb::{
    api::{NewThread, ThreadRef, Vote},
    error::{Entity, ForumError},
};
use rstest::rstest;

mod common;
use common::{seed, sqlite_store};

fn ballot(nickname: &str, voice: i32) -> Vote {
    Vote {
        nickname: nickname.to_owned(),
        voice,
    }
}

#[rstest]
#[tokio::test]
async fn changing_a_vote_keeps_one_row_per_voter() {
    let store = sqlite_store(2).await;
    let service = &store.service;
    let thread = seed(service, &["u", "v", "w"], "x").await;
    let by_slug = ThreadRef::parse("X");

    let up = service.vote(&by_slug, &ballot("u", 1)).await.expect("vote failed");
    assert_eq!(up.votes, 1);
    let down = service.vote(&by_slug, &ballot("u", -1)).await.expect("vote failed");
    assert_eq!(down.votes, -1);
    assert_eq!(down.id, thread.id);

    service.vote(&thread.id.into(), &ballot("v", 1)).await.expect("vote failed");
    service.vote(&thread.id.into(), &ballot("w", 1)).await.expect("vote failed");
    let again = service.vote(&thread.id.into(), &ballot("W", 1)).await.expect("vote failed");
    assert_eq!(again.votes, 1);

    let fetched = service.get_thread(&by_slug).await.expect("thread lookup failed");
    assert_eq!(fetched.votes, 1);
}

#[rstest]
#[case("missing", "u", Entity::Thread)]
#[case("x", "nobody", Entity::User)]
#[tokio::test]
async fn votes_need_existing_records(
    #[case] thread: &str,
    #[case] voter: &str,
    #[case] missing: Entity,
) {
    let store = sqlite_store(1).await;
    seed(&store.service, &["u"], "x").await;

    let err = store
        .service
        .vote(&ThreadRef::parse(thread), &ballot(voter, 1))
        .await
        .expect_err("vote must be rejected");
    assert!(err.is_not_found(missing), "unexpected {err:?}");
}

#[rstest]
#[tokio::test]
async fn zero_voice_is_rejected_before_touching_the_store() {
    let store = sqlite_store(1).await;
    let thread = seed(&store.service, &["u"], "x").await;

    let err = store
        .service
        .vote(&thread.id.into(), &ballot("u", 0))
        .await
        .expect_err("voice 0 is invalid");
    assert!(matches!(err, ForumError::InvalidArgument { name: "voice", .. }));
    let fetched = store
        .service
        .get_thread(&thread.id.into())
        .await
        .expect("thread lookup failed");
    assert_eq!(fetched.votes, 0);
}

#[rstest]
#[tokio::test]
async fn concurrent_votes_on_separate_threads_all_commit() {
    let store = sqlite_store(4).await;
    let voters = ["u", "v", "w", "x"];
    let first = seed(&store.service, &voters, "t0").await;
    let mut threads = vec![first.id];
    for n in 1..4 {
        let thread = store
            .service
            .create_thread(&NewThread {
                forum: "rust".to_owned(),
                author: "u".to_owned(),
                title: format!("Thread {n}"),
                message: "Vote here.".to_owned(),
                slug: Some(format!("t{n}")),
                created: None,
            })
            .await
            .expect("failed to create thread");
        threads.push(thread.id);
    }

    let mut tasks = tokio::task::JoinSet::new();
    for &thread in &threads {
        for voter in voters {
            let service = store.service.clone();
            tasks.spawn(async move { service.vote(&thread.into(), &ballot(voter, 1)).await });
        }
    }
    while let Some(joined) = tasks.join_next().await {
        joined.expect("task panicked").expect("writers wait for the lock");
    }

    for thread in threads {
        let fetched = store
            .service
            .get_thread(&thread.into())
            .await
            .expect("thread lookup failed");
        assert_eq!(fetched.votes, 4);
    }
}
