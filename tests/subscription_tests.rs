mod common;

use rust_decimal::Decimal;

use copybot::db::{self, subscription_repo};
use copybot::models::TradePosition;

use common::setup_test_db;

#[tokio::test]
async fn test_subscribe_lowercases_wallet_and_seeds_cursor_at_now() {
    let pool = setup_test_db().await;

    let sub = subscription_repo::subscribe(&pool, 1, " 0xABCDEF ", "whale", Decimal::ONE)
        .await
        .unwrap();

    assert_eq!(sub.source_wallet, "0xabcdef");
    assert!(sub.enabled);
    assert!(sub.created_at > 0);
    // Cursor starts at the subscribe instant, not at zero: only trades made
    // after subscribing are mirrored
    assert!(sub.cursor.timestamp >= sub.created_at);
    assert!(sub.cursor.tx_hash.is_empty());
}

#[tokio::test]
async fn test_resubscribe_overwrites_and_resets_cursor() {
    let pool = setup_test_db().await;

    let first = subscription_repo::subscribe(&pool, 1, "0xwallet", "old-name", Decimal::ONE)
        .await
        .unwrap();

    let progress = TradePosition::new(first.cursor.timestamp + 5, "0xa", 1);
    assert!(subscription_repo::set_cursor(&pool, 1, "0xwallet", &progress).await.unwrap());
    subscription_repo::set_enabled(&pool, 1, "0xwallet", false)
        .await
        .unwrap();

    let second = subscription_repo::subscribe(
        &pool,
        1,
        "0xwallet",
        "new-name",
        Decimal::new(50, 2),
    )
    .await
    .unwrap();

    // Last write wins on name/scale, re-enabled, creation time preserved
    assert_eq!(second.display_name, "new-name");
    assert_eq!(second.scale_factor, Decimal::new(50, 2));
    assert!(second.enabled);
    assert_eq!(second.created_at, first.created_at);

    // Re-subscribing restarts copying from now; old progress is discarded
    assert!(second.cursor.tx_hash.is_empty());
    assert!(second.cursor.timestamp >= first.created_at);
    assert_ne!(second.cursor, progress);
}

#[tokio::test]
async fn test_unsubscribe_reports_presence() {
    let pool = setup_test_db().await;
    subscription_repo::subscribe(&pool, 1, "0xwallet", "w", Decimal::ONE)
        .await
        .unwrap();

    assert!(subscription_repo::unsubscribe(&pool, 1, "0xwallet").await.unwrap());
    assert!(!subscription_repo::unsubscribe(&pool, 1, "0xwallet").await.unwrap());
    assert!(subscription_repo::get(&pool, 1, "0xwallet").await.unwrap().is_none());
}

#[tokio::test]
async fn test_disable_hides_from_enabled_listing_only() {
    let pool = setup_test_db().await;
    subscription_repo::subscribe(&pool, 1, "0xaaa", "a", Decimal::ONE).await.unwrap();
    subscription_repo::subscribe(&pool, 1, "0xbbb", "b", Decimal::ONE).await.unwrap();

    assert!(subscription_repo::set_enabled(&pool, 1, "0xaaa", false).await.unwrap());

    let enabled = subscription_repo::list_enabled(&pool).await.unwrap();
    assert_eq!(enabled.len(), 1);
    assert_eq!(enabled[0].source_wallet, "0xbbb");

    let all = subscription_repo::list_for_subscriber(&pool, 1).await.unwrap();
    assert_eq!(all.len(), 2);

    // Disabling never touches the cursor; re-enabling resumes where it left off
    let disabled = subscription_repo::get(&pool, 1, "0xaaa").await.unwrap().unwrap();
    assert!(!disabled.enabled);
}

#[tokio::test]
async fn test_mutations_on_unknown_pair_return_false() {
    let pool = setup_test_db().await;

    assert!(!subscription_repo::set_enabled(&pool, 9, "0xnope", true).await.unwrap());
    assert!(!subscription_repo::set_scale(&pool, 9, "0xnope", Decimal::ONE).await.unwrap());
    assert!(
        !subscription_repo::set_cursor(&pool, 9, "0xnope", &TradePosition::zero())
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_cursor_roundtrip() {
    let pool = setup_test_db().await;
    let sub = subscription_repo::subscribe(&pool, 1, "0xwallet", "w", Decimal::ONE)
        .await
        .unwrap();

    let position = TradePosition::new(sub.cursor.timestamp + 60, "0xdeadbeef", 7);
    assert!(subscription_repo::set_cursor(&pool, 1, "0xwallet", &position).await.unwrap());

    let sub = subscription_repo::get(&pool, 1, "0xwallet").await.unwrap().unwrap();
    assert_eq!(sub.cursor, position);
}

#[tokio::test]
async fn test_cursor_store_rejects_writes_behind_the_stored_value() {
    let pool = setup_test_db().await;
    let sub = subscription_repo::subscribe(&pool, 1, "0xwallet", "w", Decimal::ONE)
        .await
        .unwrap();

    // A sweep that took its snapshot before this subscribe must not be able
    // to drag the fresh cursor back to pre-subscribe history
    let stale = TradePosition::new(sub.cursor.timestamp - 3600, "0xold", 0);
    assert!(!subscription_repo::set_cursor(&pool, 1, "0xwallet", &stale).await.unwrap());
    let after = subscription_repo::get(&pool, 1, "0xwallet").await.unwrap().unwrap();
    assert_eq!(after.cursor, sub.cursor);

    // Forward writes still land
    let ahead = TradePosition::new(sub.cursor.timestamp + 60, "0xnew", 1);
    assert!(subscription_repo::set_cursor(&pool, 1, "0xwallet", &ahead).await.unwrap());
    let after = subscription_repo::get(&pool, 1, "0xwallet").await.unwrap().unwrap();
    assert_eq!(after.cursor, ahead);

    // Re-writing the same position is a no-op, not an error
    assert!(!subscription_repo::set_cursor(&pool, 1, "0xwallet", &ahead).await.unwrap());
}

#[tokio::test]
async fn test_cursor_guard_breaks_ties_like_the_position_order() {
    let pool = setup_test_db().await;
    let sub = subscription_repo::subscribe(&pool, 1, "0xwallet", "w", Decimal::ONE)
        .await
        .unwrap();

    let ts = sub.cursor.timestamp + 10;
    let stored = TradePosition::new(ts, "0xbb", 5);
    assert!(subscription_repo::set_cursor(&pool, 1, "0xwallet", &stored).await.unwrap());

    // Behind on tx hash within the same second
    let behind_tx = TradePosition::new(ts, "0xaa", 9);
    assert!(!subscription_repo::set_cursor(&pool, 1, "0xwallet", &behind_tx).await.unwrap());

    // Behind on log index within the same transaction
    let behind_li = TradePosition::new(ts, "0xbb", 4);
    assert!(!subscription_repo::set_cursor(&pool, 1, "0xwallet", &behind_li).await.unwrap());

    // Ahead on log index alone, then ahead on tx hash alone
    let ahead_li = TradePosition::new(ts, "0xbb", 6);
    assert!(subscription_repo::set_cursor(&pool, 1, "0xwallet", &ahead_li).await.unwrap());
    let ahead_tx = TradePosition::new(ts, "0xcc", 0);
    assert!(subscription_repo::set_cursor(&pool, 1, "0xwallet", &ahead_tx).await.unwrap());

    let sub = subscription_repo::get(&pool, 1, "0xwallet").await.unwrap().unwrap();
    assert_eq!(sub.cursor, ahead_tx);
}

#[tokio::test]
async fn test_wallet_identity_is_case_insensitive() {
    let pool = setup_test_db().await;
    subscription_repo::subscribe(&pool, 1, "0xAbCd", "w", Decimal::ONE)
        .await
        .unwrap();

    assert!(subscription_repo::get(&pool, 1, "0XABCD").await.unwrap().is_some());
    assert!(subscription_repo::set_scale(&pool, 1, "0xABcd", Decimal::TWO).await.unwrap());
    assert!(subscription_repo::unsubscribe(&pool, 1, "0xabcd").await.unwrap());
}

#[tokio::test]
async fn test_cursor_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("copybot-test.db");
    let path = path.to_str().unwrap();

    let position;
    {
        let pool = db::init_pool(path).await.unwrap();
        let sub = subscription_repo::subscribe(&pool, 5, "0xwallet", "w", Decimal::ONE)
            .await
            .unwrap();
        position = TradePosition::new(sub.cursor.timestamp + 60, "0xpersisted", 2);
        assert!(subscription_repo::set_cursor(&pool, 5, "0xwallet", &position).await.unwrap());
        pool.close().await;
    }

    let pool = db::init_pool(path).await.unwrap();
    let sub = subscription_repo::get(&pool, 5, "0xwallet").await.unwrap().unwrap();
    assert_eq!(sub.cursor, position);
    assert_eq!(sub.scale_factor, Decimal::ONE);
}
