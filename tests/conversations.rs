mod common;

use common::{mk_user, test_pool};
use ripple::{
    chat::{convo, msg},
    ApiError,
};
use uuid::Uuid;

#[tokio::test]
async fn get_or_create_returns_the_same_conversation() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;

    let first = convo::get_or_create(&pool, &a, &b).await.unwrap();
    let second = convo::get_or_create(&pool, &a, &b).await.unwrap();
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn pair_lookup_is_order_independent() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;

    let forward = convo::get_or_create(&pool, &a, &b).await.unwrap();
    let reverse = convo::get_or_create(&pool, &b, &a).await.unwrap();
    assert_eq!(forward.id, reverse.id);
}

#[tokio::test]
async fn conversations_list_covers_both_membership_slots() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;
    let c = mk_user(&pool, "grace").await;

    convo::get_or_create(&pool, &a, &b).await.unwrap();
    convo::get_or_create(&pool, &c, &a).await.unwrap();

    assert_eq!(convo::for_user(&pool, &a).await.unwrap().len(), 2);
    assert_eq!(convo::for_user(&pool, &b).await.unwrap().len(), 1);
}

#[tokio::test]
async fn messages_require_membership() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;
    let b = mk_user(&pool, "brendan").await;
    let outsider = mk_user(&pool, "grace").await;

    let convo = convo::get_or_create(&pool, &a, &b).await.unwrap();

    let err = msg::post_message(&pool, &convo.id, &outsider, "let me in").await.unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized(_)));

    msg::post_message(&pool, &convo.id, &a, "hi").await.unwrap();
    msg::post_message(&pool, &convo.id, &b, "hey").await.unwrap();

    let transcript = msg::for_conversation(&pool, &convo.id).await.unwrap();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].text, "hi");
    assert_eq!(transcript[1].text, "hey");
}

#[tokio::test]
async fn message_to_missing_conversation_is_not_found() {
    let pool = test_pool().await;
    let a = mk_user(&pool, "ada").await;

    let err = msg::post_message(&pool, &Uuid::now_v7().to_string(), &a, "hello?")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}
