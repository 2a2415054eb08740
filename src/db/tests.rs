#[cfg(feature = "sqlite")]
use chrono::{DateTime, Utc};
use diesel_async::AsyncConnection;
#[cfg(feature = "sqlite")]
use rstest::{fixture, rstest};

use super::*;
#[cfg(feature = "sqlite")]
use crate::{
    api::{
        ForumThreadsQuery,
        ForumUsersQuery,
        NewForum,
        NewPost,
        NewThread,
        Post,
        Related,
        SortMode,
        Thread,
        ThreadPostsQuery,
        ThreadRef,
        UserProfile,
        UserUpdate,
        Vote,
    },
    error::{Entity, ForumError},
    post_path::PostPath,
};

#[cfg(feature = "sqlite")]
#[fixture]
async fn migrated_conn() -> DbConnection {
    let mut conn = DbConnection::establish(":memory:")
        .await
        .expect("failed to create in-memory connection");
    apply_migrations(&mut conn, "")
        .await
        .expect("failed to apply migrations");
    conn
}

#[cfg(feature = "sqlite")]
fn profile(nickname: &str) -> UserProfile {
    UserProfile {
        fullname: format!("{nickname} Example"),
        about: String::new(),
        email: format!("{nickname}@example.org"),
    }
}

/// Users `alice` and `bob`, forum `rust`, and thread `ownership`.
#[cfg(feature = "sqlite")]
async fn seed(conn: &mut DbConnection) -> Thread {
    for nickname in ["alice", "bob"] {
        create_user(conn, nickname, &profile(nickname))
            .await
            .expect("failed to create user");
    }
    create_forum(
        conn,
        &NewForum {
            slug: "rust".to_owned(),
            title: "Rust".to_owned(),
            user: "alice".to_owned(),
        },
    )
    .await
    .expect("failed to create forum");
    new_thread(conn, "ownership").await
}

#[cfg(feature = "sqlite")]
async fn new_thread(conn: &mut DbConnection, slug: &str) -> Thread {
    create_thread(
        conn,
        &NewThread {
            forum: "rust".to_owned(),
            author: "alice".to_owned(),
            title: format!("About {slug}"),
            message: "Discuss.".to_owned(),
            slug: Some(slug.to_owned()),
            created: None,
        },
    )
    .await
    .expect("failed to create thread")
}

#[cfg(feature = "sqlite")]
fn new_post(author: &str, parent: Option<i32>) -> NewPost {
    NewPost {
        author: author.to_owned(),
        message: format!("reply to {parent:?}"),
        parent,
        created: None,
    }
}

#[cfg(feature = "sqlite")]
async fn reply(conn: &mut DbConnection, thread: i32, parent: Option<i32>) -> Post {
    create_posts(conn, &ThreadRef::Id(thread), &[new_post("bob", parent)])
        .await
        .expect("failed to create post")
        .pop()
        .expect("one post created")
}

/// Root `a`, replies `b` and `c` to `a`, reply `d` to `b`.
#[cfg(feature = "sqlite")]
async fn scenario(conn: &mut DbConnection) -> (Thread, [i32; 4]) {
    let thread = seed(conn).await;
    let a = reply(conn, thread.id, None).await.id;
    let b = reply(conn, thread.id, Some(a)).await.id;
    let c = reply(conn, thread.id, Some(a)).await.id;
    let d = reply(conn, thread.id, Some(b)).await.id;
    (thread, [a, b, c, d])
}

#[cfg(feature = "sqlite")]
async fn listed(conn: &mut DbConnection, query: &ThreadPostsQuery) -> Vec<i32> {
    thread_posts(conn, query)
        .await
        .expect("failed to list posts")
        .iter()
        .map(|post| post.id)
        .collect()
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn tree_order_is_depth_first(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let (thread, [a, b, c, d]) = scenario(&mut conn).await;

    let query = ThreadPostsQuery::new(thread.id.into(), SortMode::Tree);
    assert_eq!(listed(&mut conn, &query).await, vec![a, b, d, c]);

    let desc = ThreadPostsQuery { desc: true, ..query };
    assert_eq!(listed(&mut conn, &desc).await, vec![c, d, b, a]);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn stored_paths_extend_the_parent_path(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let (thread, _) = scenario(&mut conn).await;

    let posts = thread_posts(&mut conn, &ThreadPostsQuery::new(thread.id.into(), SortMode::Flat))
        .await
        .expect("failed to list posts");
    let paths: Vec<PostPath> = posts.iter().map(|post| post.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            PostPath::root(1),
            PostPath::root(1).child(1),
            PostPath::root(1).child(2),
            PostPath::root(1).child(1).child(1),
        ]
    );
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn parent_tree_limit_selects_whole_subtrees(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let (thread, [a, b, c, d]) = scenario(&mut conn).await;
    let e = reply(&mut conn, thread.id, None).await.id;
    let f = reply(&mut conn, thread.id, Some(e)).await.id;

    let query = ThreadPostsQuery {
        limit: Some(1),
        ..ThreadPostsQuery::new(thread.id.into(), SortMode::ParentTree)
    };
    assert_eq!(listed(&mut conn, &query).await, vec![a, b, d, c]);

    let second_page = ThreadPostsQuery {
        since: Some(d),
        ..query.clone()
    };
    assert_eq!(listed(&mut conn, &second_page).await, vec![e, f]);

    let desc = ThreadPostsQuery { desc: true, ..query };
    assert_eq!(listed(&mut conn, &desc).await, vec![f, e]);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[case(1, 1)]
#[case(2, 2)]
#[case(5, 3)]
#[tokio::test]
async fn parent_tree_limit_bounds_roots_not_posts(
    #[future] migrated_conn: DbConnection,
    #[case] limit: i64,
    #[case] expected_roots: usize,
) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    for _ in 0..3 {
        let root = reply(&mut conn, thread.id, None).await.id;
        let child = reply(&mut conn, thread.id, Some(root)).await.id;
        reply(&mut conn, thread.id, Some(child)).await;
    }

    let posts = thread_posts(
        &mut conn,
        &ThreadPostsQuery {
            limit: Some(limit),
            ..ThreadPostsQuery::new(thread.id.into(), SortMode::ParentTree)
        },
    )
    .await
    .expect("failed to list posts");
    let roots = posts.iter().filter(|post| post.parent == 0).count();
    assert_eq!(roots, expected_roots);
    assert_eq!(posts.len(), expected_roots * 3);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn flat_pages_by_id(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let (thread, [a, b, c, d]) = scenario(&mut conn).await;

    let query = ThreadPostsQuery {
        since: Some(b),
        limit: Some(1),
        ..ThreadPostsQuery::new(thread.id.into(), SortMode::Flat)
    };
    assert_eq!(listed(&mut conn, &query).await, vec![c]);

    let desc = ThreadPostsQuery {
        since: Some(d),
        desc: true,
        limit: None,
        ..query
    };
    assert_eq!(listed(&mut conn, &desc).await, vec![c, b, a]);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[case(SortMode::Flat)]
#[case(SortMode::Tree)]
#[case(SortMode::ParentTree)]
#[tokio::test]
async fn paging_with_since_never_repeats_a_post(
    #[future] migrated_conn: DbConnection,
    #[case] sort: SortMode,
    #[values(false, true)] desc: bool,
) {
    let mut conn = migrated_conn.await;
    let (thread, _) = scenario(&mut conn).await;
    let e = reply(&mut conn, thread.id, None).await.id;
    reply(&mut conn, thread.id, Some(e)).await;

    let all = ThreadPostsQuery {
        desc,
        ..ThreadPostsQuery::new(thread.id.into(), sort)
    };
    let full = listed(&mut conn, &all).await;
    assert_eq!(full.len(), 6);
    let mut seen = Vec::new();
    let mut since = None;
    loop {
        let page = listed(
            &mut conn,
            &ThreadPostsQuery {
                since,
                limit: Some(1),
                ..all.clone()
            },
        )
        .await;
        let Some(&last) = page.last() else { break };
        assert!(page.iter().all(|id| !seen.contains(id)), "page {page:?} repeats {seen:?}");
        seen.extend(page);
        since = Some(last);
    }
    assert_eq!(seen, full);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn sibling_indexes_compare_numerically(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let root = reply(&mut conn, thread.id, None).await.id;
    let mut expected = vec![root];
    for _ in 0..12 {
        expected.push(reply(&mut conn, thread.id, Some(root)).await.id);
    }

    let query = ThreadPostsQuery::new(thread.id.into(), SortMode::Tree);
    assert_eq!(listed(&mut conn, &query).await, expected);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn flat_and_tree_return_the_same_posts(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let (thread, _) = scenario(&mut conn).await;
    let extra = reply(&mut conn, thread.id, None).await.id;
    reply(&mut conn, thread.id, Some(extra)).await;

    let mut flat = listed(&mut conn, &ThreadPostsQuery::new(thread.id.into(), SortMode::Flat)).await;
    let mut tree = listed(&mut conn, &ThreadPostsQuery::new(thread.id.into(), SortMode::Tree)).await;
    assert_ne!(flat, tree);
    flat.sort_unstable();
    tree.sort_unstable();
    assert_eq!(flat, tree);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn listing_rejects_bad_arguments(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;

    let missing_sort = ThreadPostsQuery {
        sort: None,
        ..ThreadPostsQuery::new(thread.id.into(), SortMode::Flat)
    };
    let err = thread_posts(&mut conn, &missing_sort).await.expect_err("sort is required");
    assert!(matches!(err, ForumError::InvalidArgument { name: "sort", .. }));

    let zero_limit = ThreadPostsQuery {
        limit: Some(0),
        ..ThreadPostsQuery::new(thread.id.into(), SortMode::Tree)
    };
    let err = thread_posts(&mut conn, &zero_limit).await.expect_err("limit must be positive");
    assert!(matches!(err, ForumError::InvalidArgument { name: "limit", .. }));

    let unknown = ThreadPostsQuery::new(ThreadRef::Slug("nope".to_owned()), SortMode::Flat);
    let err = thread_posts(&mut conn, &unknown).await.expect_err("thread must exist");
    assert!(err.is_not_found(Entity::Thread));
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn cursor_must_belong_to_the_thread(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let (thread, _) = scenario(&mut conn).await;
    let other = new_thread(&mut conn, "borrowing").await;
    let foreign = reply(&mut conn, other.id, None).await.id;

    for since in [foreign, 999] {
        let query = ThreadPostsQuery {
            since: Some(since),
            ..ThreadPostsQuery::new(thread.id.into(), SortMode::Flat)
        };
        let err = thread_posts(&mut conn, &query).await.expect_err("cursor must resolve");
        assert!(err.is_not_found(Entity::Cursor), "unexpected {err:?}");
    }
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn threads_resolve_by_slug_ignoring_case(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let (thread, [a, ..]) = scenario(&mut conn).await;

    let query = ThreadPostsQuery {
        limit: Some(1),
        ..ThreadPostsQuery::new(ThreadRef::Slug("OwnerShip".to_owned()), SortMode::Flat)
    };
    assert_eq!(listed(&mut conn, &query).await, vec![a]);
    let found = get_thread(&mut conn, &ThreadRef::parse("OWNERSHIP"))
        .await
        .expect("thread lookup failed");
    assert_eq!(found.id, thread.id);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn missing_parent_rejects_the_whole_batch(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;

    let batch = [new_post("alice", None), new_post("bob", Some(999))];
    let err = create_posts(&mut conn, &thread.id.into(), &batch)
        .await
        .expect_err("parent 999 does not exist");
    assert!(err.is_not_found(Entity::Parent));

    let counts = status(&mut conn).await.expect("status failed");
    assert_eq!(counts.post, 0);
    let forum = get_forum(&mut conn, "rust").await.expect("forum lookup failed");
    assert_eq!(forum.posts, 0);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn unknown_author_rejects_the_whole_batch(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;

    let batch = [new_post("alice", None), new_post("mallory", None)];
    let err = create_posts(&mut conn, &thread.id.into(), &batch)
        .await
        .expect_err("mallory is not registered");
    assert!(err.is_not_found(Entity::User));
    assert_eq!(status(&mut conn).await.expect("status failed").post, 0);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn parent_in_another_thread_is_not_found(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let other = new_thread(&mut conn, "lifetimes").await;
    let foreign = reply(&mut conn, other.id, None).await.id;

    let err = create_posts(&mut conn, &thread.id.into(), &[new_post("bob", Some(foreign))])
        .await
        .expect_err("parent lives in another thread");
    assert!(err.is_not_found(Entity::Parent));
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn batch_shares_timestamp_and_updates_forum_once(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let root = reply(&mut conn, thread.id, None).await.id;

    // The second post answers the first post of the same batch.
    let batch = [new_post("bob", Some(root)), new_post("alice", Some(root + 1))];
    let posts = create_posts(&mut conn, &thread.id.into(), &batch)
        .await
        .expect("failed to create batch");
    assert_eq!(posts.len(), 2);
    assert!(posts.iter().all(|post| post.created == posts[0].created));
    assert_eq!(posts[1].path, PostPath::root(1).child(1).child(1));
    assert!(posts.iter().all(|post| post.forum == "rust" && post.thread == thread.id));

    let forum = get_forum(&mut conn, "rust").await.expect("forum lookup failed");
    assert_eq!(forum.posts, 3);
    assert_eq!(forum.threads, 1);

    let members = forum_users(&mut conn, "rust", &ForumUsersQuery::default())
        .await
        .expect("failed to list members");
    let names: Vec<_> = members.iter().map(|user| user.nickname.as_str()).collect();
    assert_eq!(names, ["alice", "bob"]);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn explicit_created_overrides_the_batch_timestamp(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let imported = DateTime::parse_from_rfc3339("2019-06-01T12:30:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc);

    let before = Utc::now();
    let batch = [
        NewPost {
            created: Some(imported),
            ..new_post("alice", None)
        },
        new_post("bob", None),
    ];
    let posts = create_posts(&mut conn, &thread.id.into(), &batch)
        .await
        .expect("failed to create batch");
    assert_eq!(posts[0].created, imported);
    assert!(posts[1].created >= before - chrono::Duration::seconds(1));

    let stored = get_post(&mut conn, posts[0].id, &[])
        .await
        .expect("post lookup failed");
    assert_eq!(stored.post.created, imported);
}

#[cfg(feature = "sqlite")]
async fn member_names(conn: &mut DbConnection, query: ForumUsersQuery) -> Vec<String> {
    forum_users(conn, "RUST", &query)
        .await
        .expect("failed to list members")
        .into_iter()
        .map(|user| user.nickname)
        .collect()
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn forum_users_page_by_nickname_ignoring_case(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    for nickname in ["Carol", "dave", "Eve", "zed"] {
        create_user(&mut conn, nickname, &profile(nickname))
            .await
            .expect("failed to create user");
    }
    let batch: Vec<_> = ["bob", "Carol", "dave", "Eve"]
        .into_iter()
        .map(|author| new_post(author, None))
        .collect();
    create_posts(&mut conn, &thread.id.into(), &batch)
        .await
        .expect("failed to create batch");

    assert_eq!(member_names(&mut conn, ForumUsersQuery::default()).await, ["alice", "bob", "Carol", "dave", "Eve"]);
    assert_eq!(
        member_names(&mut conn, ForumUsersQuery {
            since: Some("BOB".to_owned()),
            limit: Some(2),
            desc: false,
        })
        .await,
        ["Carol", "dave"]
    );
    assert_eq!(
        member_names(&mut conn, ForumUsersQuery {
            since: Some("carol".to_owned()),
            limit: None,
            desc: true,
        })
        .await,
        ["bob", "alice"]
    );
    assert_eq!(
        member_names(&mut conn, ForumUsersQuery {
            since: None,
            limit: Some(2),
            desc: true,
        })
        .await,
        ["Eve", "dave"]
    );
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn empty_batch_still_requires_the_thread(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;

    let posts = create_posts(&mut conn, &thread.id.into(), &[])
        .await
        .expect("empty batch is accepted");
    assert!(posts.is_empty());

    let err = create_posts(&mut conn, &ThreadRef::Id(thread.id + 100), &[])
        .await
        .expect_err("thread must exist");
    assert!(err.is_not_found(Entity::Thread));
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn revote_overwrites_and_recounts(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let target = ThreadRef::Id(thread.id);
    let cast = |nickname: &str, voice: i32| Vote {
        nickname: nickname.to_owned(),
        voice,
    };

    let after_first = vote(&mut conn, &target, &cast("alice", 1)).await.expect("vote failed");
    assert_eq!(after_first.votes, 1);
    let after_second = vote(&mut conn, &target, &cast("ALICE", -1)).await.expect("vote failed");
    assert_eq!(after_second.votes, -1);
    let after_bob = vote(&mut conn, &target, &cast("bob", -1)).await.expect("vote failed");
    assert_eq!(after_bob.votes, -2);

    let rows: i64 = {
        use diesel::prelude::*;
        use diesel_async::RunQueryDsl;

        use crate::schema::votes::dsl as v;
        v::votes
            .filter(v::thread_id.eq(thread.id))
            .count()
            .get_result(&mut conn)
            .await
            .expect("count failed")
    };
    assert_eq!(rows, 2);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn revote_repairs_a_drifted_total(#[future] migrated_conn: DbConnection) {
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;

    use crate::schema::threads::dsl as t;

    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let target = ThreadRef::Id(thread.id);
    let up = Vote {
        nickname: "alice".to_owned(),
        voice: 1,
    };
    vote(&mut conn, &target, &up).await.expect("vote failed");
    diesel::update(t::threads.find(thread.id))
        .set(t::votes.eq(40))
        .execute(&mut conn)
        .await
        .expect("failed to corrupt total");

    let repaired = vote(&mut conn, &target, &up).await.expect("vote failed");
    assert_eq!(repaired.votes, 1);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[case(0)]
#[case(2)]
#[case(-5)]
#[tokio::test]
async fn votes_must_be_unit(#[future] migrated_conn: DbConnection, #[case] voice: i32) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let err = vote(
        &mut conn,
        &thread.id.into(),
        &Vote {
            nickname: "alice".to_owned(),
            voice,
        },
    )
    .await
    .expect_err("voice out of range");
    assert!(matches!(err, ForumError::InvalidArgument { name: "voice", .. }));
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn vote_needs_known_thread_and_voter(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let ballot = |nickname: &str| Vote {
        nickname: nickname.to_owned(),
        voice: 1,
    };

    let err = vote(&mut conn, &ThreadRef::Slug("missing".to_owned()), &ballot("alice"))
        .await
        .expect_err("thread must exist");
    assert!(err.is_not_found(Entity::Thread));
    let err = vote(&mut conn, &thread.id.into(), &ballot("mallory"))
        .await
        .expect_err("voter must exist");
    assert!(err.is_not_found(Entity::User));
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn duplicate_users_conflict_ignoring_case(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    seed(&mut conn).await;

    let err = create_user(&mut conn, "Alice", &profile("someone"))
        .await
        .expect_err("nickname taken");
    assert!(matches!(err, ForumError::Conflict { entity: Entity::User, ref key } if key == "Alice"));
    let err = create_user(&mut conn, "carol", &profile("BOB"))
        .await
        .expect_err("email taken");
    assert!(
        matches!(err, ForumError::Conflict { entity: Entity::User, ref key } if key == "BOB@example.org"),
        "{err:?}"
    );

    let update = UserUpdate {
        email: Some("bob@example.org".to_owned()),
        ..UserUpdate::default()
    };
    let err = update_user(&mut conn, "alice", &update).await.expect_err("email taken");
    assert!(matches!(err, ForumError::Conflict { entity: Entity::User, .. }));

    let update = UserUpdate {
        about: Some("Writes Rust.".to_owned()),
        ..UserUpdate::default()
    };
    let alice = update_user(&mut conn, "ALICE", &update).await.expect("update failed");
    assert_eq!(alice.nickname, "alice");
    assert_eq!(alice.about, "Writes Rust.");
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn forum_reports_canonical_owner_and_conflicts(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    seed(&mut conn).await;

    let forum = create_forum(
        &mut conn,
        &NewForum {
            slug: "go".to_owned(),
            title: "Go".to_owned(),
            user: "BOB".to_owned(),
        },
    )
    .await
    .expect("failed to create forum");
    assert_eq!(forum.user, "bob");

    let err = create_forum(
        &mut conn,
        &NewForum {
            slug: "RUST".to_owned(),
            title: "Again".to_owned(),
            user: "bob".to_owned(),
        },
    )
    .await
    .expect_err("slug taken");
    assert!(matches!(err, ForumError::Conflict { entity: Entity::Forum, .. }));

    let err = create_forum(
        &mut conn,
        &NewForum {
            slug: "zig".to_owned(),
            title: "Zig".to_owned(),
            user: "nobody".to_owned(),
        },
    )
    .await
    .expect_err("owner must exist");
    assert!(err.is_not_found(Entity::User));
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn forum_threads_filter_by_created(#[future] migrated_conn: DbConnection) {
    use chrono::{TimeZone, Utc};

    let mut conn = migrated_conn.await;
    seed(&mut conn).await;
    let at = |day: u32| Utc.with_ymd_and_hms(2024, 1, day, 12, 0, 0).single();
    for day in [3, 1, 2] {
        create_thread(
            &mut conn,
            &NewThread {
                forum: "RUST".to_owned(),
                author: "bob".to_owned(),
                title: format!("Day {day}"),
                message: "Hello".to_owned(),
                slug: None,
                created: at(day),
            },
        )
        .await
        .expect("failed to create thread");
    }

    let threads = forum_threads(
        &mut conn,
        "rust",
        &ForumThreadsQuery {
            limit: Some(2),
            since: at(2),
            desc: true,
        },
    )
    .await
    .expect("failed to list threads");
    let titles: Vec<_> = threads.iter().map(|thread| thread.title.as_str()).collect();
    assert_eq!(titles, ["Day 2", "Day 1"]);
    assert!(threads.iter().all(|thread| thread.author == "bob" && thread.slug.is_none()));

    let forum = get_forum(&mut conn, "rust").await.expect("forum lookup failed");
    assert_eq!(forum.threads, 4);
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn editing_flags_only_real_changes(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let post = reply(&mut conn, thread.id, None).await;

    let same = update_post(&mut conn, post.id, Some(post.message.as_str()))
        .await
        .expect("update failed");
    assert!(!same.is_edited);
    let edited = update_post(&mut conn, post.id, Some("Rewritten."))
        .await
        .expect("update failed");
    assert!(edited.is_edited);
    assert_eq!(edited.message, "Rewritten.");
    assert_eq!(edited.path, post.path);

    let err = update_post(&mut conn, 999, None).await.expect_err("post must exist");
    assert!(err.is_not_found(Entity::Post));
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn post_details_include_requested_records(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let thread = seed(&mut conn).await;
    let post = reply(&mut conn, thread.id, None).await;

    let bare = get_post(&mut conn, post.id, &[]).await.expect("lookup failed");
    assert_eq!(bare.post, post);
    assert!(bare.author.is_none() && bare.thread.is_none() && bare.forum.is_none());

    let full = get_post(&mut conn, post.id, &[Related::User, Related::Thread, Related::Forum])
        .await
        .expect("lookup failed");
    assert_eq!(full.author.map(|user| user.nickname), Some("bob".to_owned()));
    assert_eq!(full.thread.map(|t| t.id), Some(thread.id));
    assert_eq!(full.forum.map(|f| f.posts), Some(1));
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn clear_empties_every_table(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    let (thread, _) = scenario(&mut conn).await;
    vote(
        &mut conn,
        &thread.id.into(),
        &Vote {
            nickname: "bob".to_owned(),
            voice: 1,
        },
    )
    .await
    .expect("vote failed");

    let before = status(&mut conn).await.expect("status failed");
    assert_eq!((before.user, before.forum, before.thread, before.post), (2, 1, 1, 4));

    clear(&mut conn).await.expect("clear failed");
    assert_eq!(status(&mut conn).await.expect("status failed"), crate::api::Status::default());
}

#[cfg(feature = "sqlite")]
#[rstest]
#[tokio::test]
async fn audit_accepts_bundled_sqlite(#[future] migrated_conn: DbConnection) {
    let mut conn = migrated_conn.await;
    audit_sqlite_features(&mut conn)
        .await
        .expect("sqlite supports RETURNING");
}
