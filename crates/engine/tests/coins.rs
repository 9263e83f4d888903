use std::{path::PathBuf, sync::Arc, time::Duration};

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement, TransactionTrait,
};
use uuid::Uuid;

use engine::{
    BuyItemCmd, Engine, EngineError, ErrorKind, InventoryEntry, Principal, Received,
    STARTING_BALANCE, SendCoinsCmd, Sent,
};
use migration::MigratorTrait;

const PASSWORD: &str = "11111!Aa";

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .token_secret("test-secret")
        .build()
        .await
        .unwrap();
    (engine, db)
}

/// A pooled engine over a fresh SQLite file, so units really run on
/// separate connections.
async fn engine_with_file_db(
    max_connections: u32,
) -> (Engine, DatabaseConnection, String, PathBuf) {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let mut options = ConnectOptions::new(url.clone());
    options.max_connections(max_connections);
    let db = Database::connect(options).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .token_secret("test-secret")
        .build()
        .await
        .unwrap();
    (engine, db, url, path)
}

fn remove_db_file(path: PathBuf) {
    for suffix in ["", "-wal", "-shm", "-journal"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}

async fn register(engine: &Engine, username: &str) -> Principal {
    let token = engine.authenticate(username, PASSWORD).await.unwrap();
    engine.verify_token(&token).unwrap()
}

async fn total_coins(db: &DatabaseConnection) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            "SELECT SUM(amount) AS total FROM balances",
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "total").unwrap()
}

async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

async fn balance_id_of(db: &DatabaseConnection, username: &str) -> String {
    let row = db
        .query_one(Statement::from_string(
            db.get_database_backend(),
            format!("SELECT balance_id FROM users WHERE username = '{username}'"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "balance_id").unwrap()
}

#[tokio::test]
async fn new_user_starts_with_starting_balance() {
    let (engine, _) = engine_with_db().await;
    let user = register(&engine, "user1").await;

    let info = engine.user_info(&user).await.unwrap();

    assert_eq!(info.coins, STARTING_BALANCE);
    assert!(info.inventory.is_empty());
    assert!(info.coin_history.received.is_empty());
    assert!(info.coin_history.sent.is_empty());
}

#[tokio::test]
async fn buying_until_broke() {
    let (engine, _) = engine_with_db().await;
    let user = register(&engine, "user1").await;

    engine
        .buy_item(BuyItemCmd::new(user.clone(), "pink-hoody"))
        .await
        .unwrap();
    let info = engine.user_info(&user).await.unwrap();
    assert_eq!(info.coins, 500);
    assert_eq!(
        info.inventory,
        vec![InventoryEntry {
            name: "pink-hoody".to_string(),
            count: 1
        }]
    );

    engine
        .buy_item(BuyItemCmd::new(user.clone(), "pink-hoody"))
        .await
        .unwrap();
    let info = engine.user_info(&user).await.unwrap();
    assert_eq!(info.coins, 0);
    assert_eq!(info.inventory[0].count, 2);

    let err = engine
        .buy_item(BuyItemCmd::new(user.clone(), "pink-hoody"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let info = engine.user_info(&user).await.unwrap();
    assert_eq!(info.coins, 0);
    assert_eq!(info.inventory[0].count, 2);
    assert_eq!(
        info.coin_history.sent,
        vec![
            Sent {
                to_user: "shop".to_string(),
                amount: 500
            },
            Sent {
                to_user: "shop".to_string(),
                amount: 500
            },
        ]
    );
}

#[tokio::test]
async fn inventory_is_ordered_by_name() {
    let (engine, _) = engine_with_db().await;
    let user = register(&engine, "user1").await;

    for item in ["umbrella", "cup", "cup", "book"] {
        engine
            .buy_item(BuyItemCmd::new(user.clone(), item))
            .await
            .unwrap();
    }

    let inventory = engine.inventory_of(user.user_id).await.unwrap();
    let inventory: Vec<(&str, i64)> = inventory
        .iter()
        .map(|entry| (entry.name.as_str(), entry.count))
        .collect();
    assert_eq!(inventory, vec![("book", 1), ("cup", 2), ("umbrella", 1)]);
    assert_eq!(engine.balance_of(user.user_id).await.unwrap(), 1000 - 200 - 40 - 50);
}

#[tokio::test]
async fn unknown_item_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let user = register(&engine, "user1").await;

    let err = engine
        .buy_item(BuyItemCmd::new(user.clone(), "spaceship"))
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::ItemNotFound("spaceship".to_string()));
    assert_eq!(engine.balance_of(user.user_id).await.unwrap(), STARTING_BALANCE);
    assert_eq!(count_rows(&db, "balance_history").await, 0);
}

#[tokio::test]
async fn catalog_is_seeded() {
    let (engine, _) = engine_with_db().await;

    let catalog = engine.catalog().await.unwrap();
    assert_eq!(catalog.len(), migration::CATALOG.len());

    let pen = engine.item_by_name("pen").await.unwrap().unwrap();
    assert_eq!(pen.price, 10);
    assert!(engine.item_by_name("Pen").await.unwrap().is_none());
}

#[tokio::test]
async fn send_coins_moves_balance_and_records_both_sides() {
    let (engine, db) = engine_with_db().await;
    let user2 = register(&engine, "user2").await;
    let user3 = register(&engine, "user3").await;

    engine
        .send_coins(SendCoinsCmd::new(user2.clone(), "user3", 69))
        .await
        .unwrap();

    let info2 = engine.user_info(&user2).await.unwrap();
    let info3 = engine.user_info(&user3).await.unwrap();
    assert_eq!(info2.coins, 931);
    assert_eq!(info3.coins, 1069);
    assert_eq!(
        info2.coin_history.sent,
        vec![Sent {
            to_user: "user3".to_string(),
            amount: 69
        }]
    );
    assert!(info2.coin_history.received.is_empty());
    assert_eq!(
        info3.coin_history.received,
        vec![Received {
            from_user: "user2".to_string(),
            amount: 69
        }]
    );
    assert!(info3.coin_history.sent.is_empty());

    let history2 = engine.history_of(user2.user_id).await.unwrap();
    let history3 = engine.history_of(user3.user_id).await.unwrap();
    assert_eq!(history2.len(), 1);
    assert_eq!(history3.len(), 1);
    assert_eq!(history2[0].amount, history3[0].amount);
    assert_eq!(history2[0].sender, history3[0].sender);
    assert_eq!(history2[0].recipient, history3[0].recipient);
    assert_eq!(total_coins(&db).await, 2 * STARTING_BALANCE);
}

#[tokio::test]
async fn sending_to_yourself_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let user = register(&engine, "user1").await;

    let err = engine
        .send_coins(SendCoinsCmd::new(user.clone(), " user1 ", 10))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InvalidRecipient(_)));
    assert_eq!(engine.balance_of(user.user_id).await.unwrap(), STARTING_BALANCE);
    assert_eq!(count_rows(&db, "balance_history").await, 0);
}

#[tokio::test]
async fn unknown_recipient_is_rejected() {
    let (engine, db) = engine_with_db().await;
    let user = register(&engine, "user1").await;

    let err = engine
        .send_coins(SendCoinsCmd::new(user.clone(), "ghost", 10))
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::RecipientNotFound("ghost".to_string()));
    assert_eq!(engine.balance_of(user.user_id).await.unwrap(), STARTING_BALANCE);
    assert_eq!(count_rows(&db, "balance_history").await, 0);
}

#[tokio::test]
async fn invalid_amounts_are_rejected() {
    let (engine, _) = engine_with_db().await;
    let user = register(&engine, "user1").await;
    register(&engine, "user2").await;

    for amount in [0, -5] {
        let err = engine
            .send_coins(SendCoinsCmd::new(user.clone(), "user2", amount))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidAmount(_)));
    }
}

#[tokio::test]
async fn overdraft_leaves_state_unchanged() {
    let (engine, db) = engine_with_db().await;
    let user1 = register(&engine, "user1").await;
    let user2 = register(&engine, "user2").await;

    let err = engine
        .send_coins(SendCoinsCmd::new(user1.clone(), "user2", STARTING_BALANCE + 1))
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(engine.balance_of(user1.user_id).await.unwrap(), STARTING_BALANCE);
    assert_eq!(engine.balance_of(user2.user_id).await.unwrap(), STARTING_BALANCE);
    assert_eq!(count_rows(&db, "balance_history").await, 0);

    // Spending exactly everything is fine.
    engine
        .send_coins(SendCoinsCmd::new(user1.clone(), "user2", STARTING_BALANCE))
        .await
        .unwrap();
    assert_eq!(engine.balance_of(user1.user_id).await.unwrap(), 0);
}

#[tokio::test]
async fn withdrawn_items_leave_inventory_and_catalog() {
    let (engine, db) = engine_with_db().await;
    let user = register(&engine, "user1").await;
    for item in ["cup", "pen"] {
        engine
            .buy_item(BuyItemCmd::new(user.clone(), item))
            .await
            .unwrap();
    }

    db.execute_unprepared("UPDATE merch SET deleted = 1 WHERE name = 'cup'")
        .await
        .unwrap();

    let only_pen = vec![InventoryEntry {
        name: "pen".to_string(),
        count: 1,
    }];
    assert_eq!(engine.inventory_of(user.user_id).await.unwrap(), only_pen);
    assert_eq!(engine.user_info(&user).await.unwrap().inventory, only_pen);
    assert!(engine.item_by_name("cup").await.unwrap().is_none());
    let err = engine
        .buy_item(BuyItemCmd::new(user.clone(), "cup"))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ItemNotFound("cup".to_string()));
}

#[tokio::test]
async fn failed_write_rolls_back_the_whole_transfer() {
    let (engine, db) = engine_with_db().await;
    let user1 = register(&engine, "user1").await;
    let user2 = register(&engine, "user2").await;

    // The recipient-side history row is the last write of a transfer.
    let recipient_balance = balance_id_of(&db, "user2").await;
    db.execute_unprepared(&format!(
        "CREATE TRIGGER reject_recipient_entry BEFORE INSERT ON balance_history \
         WHEN NEW.balance_id = '{recipient_balance}' \
         BEGIN SELECT RAISE(ABORT, 'history unavailable'); END"
    ))
    .await
    .unwrap();

    let err = engine
        .send_coins(SendCoinsCmd::new(user1.clone(), "user2", 100))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(engine.balance_of(user1.user_id).await.unwrap(), STARTING_BALANCE);
    assert_eq!(engine.balance_of(user2.user_id).await.unwrap(), STARTING_BALANCE);
    assert_eq!(count_rows(&db, "balance_history").await, 0);

    db.execute_unprepared("DROP TRIGGER reject_recipient_entry")
        .await
        .unwrap();
    engine
        .send_coins(SendCoinsCmd::new(user1.clone(), "user2", 100))
        .await
        .unwrap();
    assert_eq!(engine.balance_of(user2.user_id).await.unwrap(), STARTING_BALANCE + 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_transfers_are_all_or_nothing() {
    let (engine, db, _, path) = engine_with_file_db(4).await;
    let user1 = register(&engine, "user1").await;
    let user2 = register(&engine, "user2").await;

    // Deadlines from "immediately" upwards cut units off at every stage.
    for step in 0..150u64 {
        let _ = tokio::time::timeout(
            Duration::from_micros(step * 20),
            engine.send_coins(SendCoinsCmd::new(user1.clone(), "user2", 5)),
        )
        .await;
    }
    engine
        .send_coins(SendCoinsCmd::new(user1.clone(), "user2", 5))
        .await
        .unwrap();

    let sent = STARTING_BALANCE - engine.balance_of(user1.user_id).await.unwrap();
    assert_eq!(sent % 5, 0);
    let transfers = sent / 5;
    assert_eq!(
        engine.balance_of(user2.user_id).await.unwrap(),
        STARTING_BALANCE + sent
    );
    assert_eq!(
        engine.history_of(user1.user_id).await.unwrap().len() as i64,
        transfers
    );
    assert_eq!(
        engine.history_of(user2.user_id).await.unwrap().len() as i64,
        transfers
    );
    assert_eq!(total_coins(&db).await, 2 * STARTING_BALANCE);

    drop(engine);
    db.close().await.unwrap();
    remove_db_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn busy_database_is_retried() {
    let (engine, db, url, path) = engine_with_file_db(1).await;
    let user1 = register(&engine, "user1").await;
    let user2 = register(&engine, "user2").await;
    // Fail fast on the lock so the unit has to go around the retry loop.
    db.execute_unprepared("PRAGMA busy_timeout = 0").await.unwrap();

    let other = Database::connect(&url).await.unwrap();
    let holder = other.begin().await.unwrap();
    holder
        .execute_unprepared("UPDATE balances SET amount = amount WHERE 0")
        .await
        .unwrap();
    let release = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        holder.commit().await.unwrap();
    });

    engine
        .send_coins(SendCoinsCmd::new(user1.clone(), "user2", 42))
        .await
        .unwrap();
    release.await.unwrap();

    assert_eq!(engine.balance_of(user1.user_id).await.unwrap(), STARTING_BALANCE - 42);
    assert_eq!(engine.balance_of(user2.user_id).await.unwrap(), STARTING_BALANCE + 42);
    assert_eq!(count_rows(&db, "balance_history").await, 2);

    drop(engine);
    other.close().await.unwrap();
    db.close().await.unwrap();
    remove_db_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn database_that_stays_busy_gives_up_cleanly() {
    let (engine, db, url, path) = engine_with_file_db(1).await;
    let user1 = register(&engine, "user1").await;
    register(&engine, "user2").await;
    db.execute_unprepared("PRAGMA busy_timeout = 0").await.unwrap();

    let other = Database::connect(&url).await.unwrap();
    let holder = other.begin().await.unwrap();
    holder
        .execute_unprepared("UPDATE balances SET amount = amount WHERE 0")
        .await
        .unwrap();

    let err = engine
        .send_coins(SendCoinsCmd::new(user1.clone(), "user2", 42))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    holder.rollback().await.unwrap();
    assert_eq!(engine.balance_of(user1.user_id).await.unwrap(), STARTING_BALANCE);
    assert_eq!(count_rows(&db, "balance_history").await, 0);

    drop(engine);
    other.close().await.unwrap();
    db.close().await.unwrap();
    remove_db_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_conserve_coins() {
    let (engine, db, _, path) = engine_with_file_db(8).await;
    let engine = Arc::new(engine);
    let users = vec![
        register(&engine, "alice").await,
        register(&engine, "bob").await,
        register(&engine, "carol").await,
    ];

    // Every sender can afford all of its transfers, so each one must land.
    let mut tasks = tokio::task::JoinSet::new();
    for round in 0..60 {
        let engine = engine.clone();
        let sender = users[round % users.len()].clone();
        let recipient = users[(round + 1) % users.len()].username.clone();
        tasks.spawn(async move {
            engine
                .send_coins(SendCoinsCmd::new(sender, recipient, 7))
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    assert_eq!(total_coins(&db).await, 3 * STARTING_BALANCE);
    assert_eq!(count_rows(&db, "balance_history").await, 2 * 60);
    // Each user sent 20 and received 20 transfers of 7.
    for user in &users {
        assert_eq!(engine.balance_of(user.user_id).await.unwrap(), STARTING_BALANCE);
        assert_eq!(engine.history_of(user.user_id).await.unwrap().len(), 40);
    }

    drop(engine);
    db.close().await.unwrap();
    remove_db_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_affordable_purchases_all_succeed() {
    let (engine, db, _, path) = engine_with_file_db(8).await;
    let engine = Arc::new(engine);
    let user = register(&engine, "user1").await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let engine = engine.clone();
        let user = user.clone();
        tasks.spawn(async move { engine.buy_item(BuyItemCmd::new(user, "pen")).await });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let info = engine.user_info(&user).await.unwrap();
    assert_eq!(info.coins, STARTING_BALANCE - 20 * 10);
    assert_eq!(
        info.inventory,
        vec![InventoryEntry {
            name: "pen".to_string(),
            count: 20
        }]
    );
    assert_eq!(count_rows(&db, "balance_history").await, 20);

    drop(engine);
    db.close().await.unwrap();
    remove_db_file(path);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_purchases_never_overdraw() {
    let (engine, db, _, path) = engine_with_file_db(8).await;
    let engine = Arc::new(engine);
    let user = register(&engine, "user1").await;

    // 1000 coins buy exactly five powerbanks.
    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..8 {
        let engine = engine.clone();
        let user = user.clone();
        tasks.spawn(async move { engine.buy_item(BuyItemCmd::new(user, "powerbank")).await });
    }
    let mut succeeded = 0;
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Ok(()) => succeeded += 1,
            Err(EngineError::InsufficientFunds(_)) => {}
            Err(err) => panic!("unexpected error: {err}"),
        }
    }

    assert_eq!(succeeded, 5);
    let info = engine.user_info(&user).await.unwrap();
    assert_eq!(info.coins, 0);
    assert_eq!(
        info.inventory,
        vec![InventoryEntry {
            name: "powerbank".to_string(),
            count: 5
        }]
    );
    assert_eq!(count_rows(&db, "balance_history").await, 5);

    drop(engine);
    db.close().await.unwrap();
    remove_db_file(path);
}
