//! Diesel table definitions shared by both database backends.

diesel::table! {
    users (id) {
        id -> Integer,
        nickname -> Text,
        fullname -> Text,
        about -> Text,
        email -> Text,
    }
}

diesel::table! {
    forums (id) {
        id -> Integer,
        slug -> Text,
        title -> Text,
        user_id -> Integer,
        posts -> BigInt,
        threads -> Integer,
    }
}

diesel::table! {
    threads (id) {
        id -> Integer,
        slug -> Nullable<Text>,
        forum_id -> Integer,
        author_id -> Integer,
        title -> Text,
        message -> Text,
        votes -> Integer,
        created -> Timestamp,
    }
}

diesel::table! {
    posts (id) {
        id -> Integer,
        thread_id -> Integer,
        forum_id -> Integer,
        author_id -> Integer,
        parent_id -> Nullable<Integer>,
        root_id -> Integer,
        path -> Text,
        message -> Text,
        is_edited -> Bool,
        created -> Timestamp,
    }
}

diesel::table! {
    votes (user_id, thread_id) {
        user_id -> Integer,
        thread_id -> Integer,
        voice -> Integer,
    }
}

diesel::table! {
    forum_users (forum_id, user_id) {
        forum_id -> Integer,
        user_id -> Integer,
    }
}

diesel::joinable!(forums -> users (user_id));
diesel::joinable!(threads -> forums (forum_id));
diesel::joinable!(threads -> users (author_id));
diesel::joinable!(posts -> forums (forum_id));
diesel::joinable!(posts -> users (author_id));
diesel::joinable!(posts -> threads (thread_id));
diesel::joinable!(votes -> threads (thread_id));
diesel::joinable!(votes -> users (user_id));
diesel::joinable!(forum_users -> forums (forum_id));
diesel::joinable!(forum_users -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(users, forums, threads, posts, votes, forum_users);
