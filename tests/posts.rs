mod common;

use std::collections::BTreeSet;

use common::{mk_post, mk_user, notification_count, test_pool};
use ripple::{
    db,
    posts::{comment::add_comment, delete_post, feed, like::toggle_like, new::create_post},
    services::MediaStore,
    users::follow::follow,
    ApiError,
};

#[tokio::test]
async fn feed_is_exactly_self_plus_followings() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;
    let c = mk_user(&pool, "grace").await;

    follow(&pool, &a, &b).await.unwrap();

    let own = mk_post(&pool, &a, "mine").await;
    let followed = mk_post(&pool, &b, "followed").await;
    let _stranger = mk_post(&pool, &c, "stranger").await;

    let posts = feed::feed(&pool, &a).await.unwrap();
    let ids: BTreeSet<String> = posts.iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, BTreeSet::from([own, followed]));
}

#[tokio::test]
async fn feed_orders_by_descending_creation_time() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;

    let first = mk_post(&pool, &a, "first").await;
    let second = mk_post(&pool, &a, "second").await;
    let third = mk_post(&pool, &a, "third").await;

    // Pin timestamps so the contract is what's under test, not the clock.
    for (id, stamp) in [
        (&first, "2026-01-01T10:00:00.000000+00:00"),
        (&second, "2026-01-02T10:00:00.000000+00:00"),
        (&third, "2026-01-03T10:00:00.000000+00:00"),
    ] {
        sqlx::query("UPDATE posts SET created_at=? WHERE id=?")
            .bind(stamp)
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();
    }

    let posts = feed::feed(&pool, &a).await.unwrap();
    let ids: Vec<String> = posts.into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![third, second, first]);
}

#[tokio::test]
async fn feed_hydrates_authors() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    mk_post(&pool, &a, "hello").await;

    let posts = feed::feed(&pool, &a).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].author.username, "ada");
    assert_eq!(posts[0].author.id, a);
}

#[tokio::test]
async fn like_toggle_round_trips_with_one_notification() {
    let pool = test_pool().await;
    let author = mk_user(&pool, "ada").await;
    let fan = mk_user(&pool, "brendan").await;
    let post_id = mk_post(&pool, &author, "likeable").await;

    let posts = toggle_like(&pool, &post_id, &fan).await.unwrap();
    let liked = posts.iter().find(|p| p.id == post_id).unwrap();
    assert_eq!(liked.likes.get(&fan), Some(&true));
    assert_eq!(notification_count(&pool, &author).await, 1);

    let posts = toggle_like(&pool, &post_id, &fan).await.unwrap();
    let unliked = posts.iter().find(|p| p.id == post_id).unwrap();
    assert!(unliked.likes.is_empty());
    // Unliking is silent: no extra record, no retraction.
    assert_eq!(notification_count(&pool, &author).await, 1);
}

#[tokio::test]
async fn comments_prepend_and_always_notify() {
    let pool = test_pool().await;
    let author = mk_user(&pool, "ada").await;
    let commenter = mk_user(&pool, "brendan").await;
    let post_id = mk_post(&pool, &author, "discuss").await;

    add_comment(&pool, &post_id, &commenter, "first!").await.unwrap();
    let view = add_comment(&pool, &post_id, &commenter, "second!").await.unwrap();

    assert_eq!(view.comments.len(), 2);
    assert_eq!(view.comments[0].text, "second!");
    assert_eq!(view.comments[1].text, "first!");
    assert_eq!(view.comments[0].author.username, "brendan");

    assert_eq!(notification_count(&pool, &author).await, 2);
}

#[tokio::test]
async fn like_notification_carries_the_post_reference() {
    let pool = test_pool().await;
    let author = mk_user(&pool, "ada").await;
    let fan = mk_user(&pool, "brendan").await;
    let post_id = mk_post(&pool, &author, "likeable").await;

    toggle_like(&pool, &post_id, &fan).await.unwrap();

    let feed = ripple::notify::for_user(&pool, &author).await.unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].kind, "like");
    assert_eq!(feed[0].friend.username, "brendan");
    let post = feed[0].post.as_ref().unwrap();
    assert_eq!(post.id, post_id);
    assert_eq!(post.content.as_deref(), Some("likeable"));
}

#[tokio::test]
async fn delete_is_soft_and_author_only() {
    let pool = test_pool().await;
    let author = mk_user(&pool, "ada").await;
    let stranger = mk_user(&pool, "brendan").await;
    let post_id = mk_post(&pool, &author, "ephemeral").await;

    let err = delete_post(&pool, &post_id, &stranger).await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));

    delete_post(&pool, &post_id, &author).await.unwrap();

    assert!(feed::user_posts(&pool, &author).await.unwrap().is_empty());
    assert!(feed::feed(&pool, &author).await.unwrap().is_empty());

    // Soft delete: the record survives, flagged.
    let row = db::load_post(&pool, &post_id).await.unwrap().unwrap();
    assert!(row.is_deleted);
}

#[tokio::test]
async fn create_post_stores_image_and_hydrates() {
    let pool = test_pool().await;
    let author = mk_user(&pool, "ada").await;
    let media = MediaStore::Local;

    let view = create_post(&pool, &media, &author, Some("caption".to_owned()), Some("bytes".to_owned()))
        .await
        .unwrap();

    assert_eq!(view.content.as_deref(), Some("caption"));
    assert!(view.image.as_deref().unwrap().starts_with("/assets/posts/"));
    assert_eq!(view.author.username, "ada");
    assert!(view.likes.is_empty());
    assert!(view.comments.is_empty());
}
