mod common;

use common::{mk_user, notification_count, test_pool};
use ripple::{
    db,
    users::follow::{follow, follow_back, unfollow},
    ApiError,
};
use uuid::Uuid;

#[tokio::test]
async fn follow_links_both_sides_and_notifies() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;

    let outcome = follow(&pool, &a, &b).await.unwrap();

    let a_row = db::load_user(&pool, &a).await.unwrap().unwrap();
    let b_row = db::load_user(&pool, &b).await.unwrap().unwrap();
    assert_eq!(a_row.followings(), vec![b.clone()]);
    assert_eq!(b_row.followers(), vec![a.clone()]);
    assert!(a_row.followers().is_empty());
    assert!(b_row.followings().is_empty());

    assert_eq!(notification_count(&pool, &b).await, 1);
    assert_eq!(notification_count(&pool, &a).await, 0);

    assert_eq!(outcome.lists.followings.len(), 1);
    assert_eq!(outcome.lists.followings[0].username, "brendan");
    assert_eq!(outcome.updated_user.followings, vec![b]);
}

#[tokio::test]
async fn repeated_follow_is_idempotent() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;

    follow(&pool, &a, &b).await.unwrap();
    follow(&pool, &a, &b).await.unwrap();

    let a_row = db::load_user(&pool, &a).await.unwrap().unwrap();
    let b_row = db::load_user(&pool, &b).await.unwrap().unwrap();
    assert_eq!(a_row.followings().len(), 1);
    assert_eq!(b_row.followers().len(), 1);

    // Only the first edge creation tells anyone anything.
    assert_eq!(notification_count(&pool, &b).await, 1);
}

#[tokio::test]
async fn follow_unfollow_round_trips() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;

    follow(&pool, &a, &b).await.unwrap();
    unfollow(&pool, &a, &b).await.unwrap();

    let a_row = db::load_user(&pool, &a).await.unwrap().unwrap();
    let b_row = db::load_user(&pool, &b).await.unwrap().unwrap();
    assert!(a_row.followings().is_empty());
    assert!(b_row.followers().is_empty());
}

#[tokio::test]
async fn unfollow_of_absent_edge_is_a_noop() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;

    unfollow(&pool, &a, &b).await.unwrap();

    let a_row = db::load_user(&pool, &a).await.unwrap().unwrap();
    assert!(a_row.followings().is_empty());
}

#[tokio::test]
async fn follow_back_mutates_like_follow_but_stays_silent() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;

    follow(&pool, &a, &b).await.unwrap();
    follow_back(&pool, &b, &a).await.unwrap();

    let a_row = db::load_user(&pool, &a).await.unwrap().unwrap();
    let b_row = db::load_user(&pool, &b).await.unwrap().unwrap();
    assert_eq!(a_row.followers(), vec![b.clone()]);
    assert_eq!(b_row.followings(), vec![a.clone()]);

    // The reciprocation must not notify anyone; only ada's original follow
    // left a record, addressed to brendan.
    assert_eq!(notification_count(&pool, &a).await, 0);
    assert_eq!(notification_count(&pool, &b).await, 1);
}

#[tokio::test]
async fn follow_missing_user_is_not_found() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let ghost = Uuid::now_v7().to_string();

    let err = follow(&pool, &a, &ghost).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));

    let err = follow(&pool, &ghost, &a).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn reverse_counts_read_the_opposite_arrays() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;
    let c = mk_user(&pool, "grace").await;

    follow(&pool, &a, &b).await.unwrap();
    follow(&pool, &a, &c).await.unwrap();
    follow(&pool, &b, &a).await.unwrap();

    // ada follows two people and is followed by one.
    let (following, followers) = ripple::users::reverse_counts(&pool, &a).await.unwrap();
    assert_eq!(following, 2);
    assert_eq!(followers, 1);

    let (following, followers) = ripple::users::reverse_counts(&pool, &c).await.unwrap();
    assert_eq!(following, 0);
    assert_eq!(followers, 1);
}

#[tokio::test]
async fn follow_notification_hydrates_actor() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;

    follow(&pool, &a, &b).await.unwrap();

    let feed = ripple::notify::for_user(&pool, &b).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].kind, "follow");
    assert_eq!(feed[0].friend.id, a);
    assert_eq!(feed[0].friend.username, "ada");
    assert!(feed[0].post.is_none());
    assert_eq!(feed[0].content, "Started Following You");
}

#[tokio::test]
async fn suggestions_exclude_self_and_followings() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let _b = mk_user(&pool, "brendan").await;
    let c = mk_user(&pool, "grace").await;

    let outcome = follow(&pool, &a, &c).await.unwrap();

    let names: Vec<&str> = outcome.lists.suggestions.iter().map(|s| s.username.as_str()).collect();
    assert_eq!(names, vec!["brendan"]);
}
