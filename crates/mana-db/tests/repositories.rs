//! Repository behavior against in-memory SQLite.

use chrono::Utc;
use uuid::Uuid;

use mana_core::{
    BalanceMethod, Buyer, InventoryItem, ItemSnapshot, Role, Transaction, TransactionKind, User,
};
use mana_db::{
    BuyerRepo, Database, DbConfig, DbError, InventoryRepo, TransactionRepo, UserRepo,
};

async fn db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

fn user(role: Role) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4().to_string(),
        created_by: None,
        role,
        name: "Test".into(),
        cash_balance_cents: 0,
        created_at: now,
        updated_at: now,
    }
}

fn buyer(user_id: &str) -> Buyer {
    let now = Utc::now();
    Buyer {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        admin_id: None,
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: None,
        phone: None,
        starting_balance_cents: 1000,
        current_balance_cents: 1000,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

fn item(user_id: &str, qty: f64) -> InventoryItem {
    let now = Utc::now();
    InventoryItem {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        buyer_id: None,
        category: "flower".into(),
        name: "Blue Dream".into(),
        unit: "gram".into(),
        qty,
        price_cents: 1200,
        shipping_cost_cents: 100,
        product_id: None,
        reference_number: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}

#[tokio::test]
async fn deduct_checked_takes_stock_or_refuses() {
    let db = db().await;
    let mut tx = db.begin().await.unwrap();
    let admin = user(Role::Admin);
    UserRepo::new(&mut tx).insert(&admin).await.unwrap();
    let inv = item(&admin.id, 5.0);
    InventoryRepo::new(&mut tx).insert(&inv).await.unwrap();

    // Enough stock: decrements and returns the new qty
    let taken = InventoryRepo::new(&mut tx)
        .deduct_checked(&inv.id, 3.0)
        .await
        .unwrap();
    assert_eq!(taken, Some(2.0));

    // Not enough: refuses, qty untouched
    let refused = InventoryRepo::new(&mut tx)
        .deduct_checked(&inv.id, 3.0)
        .await
        .unwrap();
    assert_eq!(refused, None);
    let row = InventoryRepo::new(&mut tx).get_required(&inv.id).await.unwrap();
    assert_eq!(row.qty, 2.0);

    // Missing row is NotFound, not "insufficient"
    let missing = InventoryRepo::new(&mut tx).deduct_checked("ghost", 1.0).await;
    assert!(matches!(missing, Err(DbError::NotFound { .. })));

    tx.commit().await.unwrap();
}

#[tokio::test]
async fn adjust_qty_is_signed_and_can_go_negative() {
    let db = db().await;
    let mut tx = db.begin().await.unwrap();
    let admin = user(Role::Admin);
    UserRepo::new(&mut tx).insert(&admin).await.unwrap();
    let inv = item(&admin.id, 1.0);
    InventoryRepo::new(&mut tx).insert(&inv).await.unwrap();

    assert_eq!(
        InventoryRepo::new(&mut tx).adjust_qty(&inv.id, -3.0).await.unwrap(),
        -2.0
    );
    assert_eq!(
        InventoryRepo::new(&mut tx).adjust_qty(&inv.id, 10.0).await.unwrap(),
        8.0
    );
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn soft_deleted_inventory_is_invisible() {
    let db = db().await;
    let mut tx = db.begin().await.unwrap();
    let admin = user(Role::Admin);
    UserRepo::new(&mut tx).insert(&admin).await.unwrap();
    let inv = item(&admin.id, 5.0);
    InventoryRepo::new(&mut tx).insert(&inv).await.unwrap();

    InventoryRepo::new(&mut tx).soft_delete(&inv.id).await.unwrap();
    assert!(InventoryRepo::new(&mut tx).get(&inv.id).await.unwrap().is_none());
    assert!(matches!(
        InventoryRepo::new(&mut tx).adjust_qty(&inv.id, 1.0).await,
        Err(DbError::NotFound { .. })
    ));
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn duplicate_reference_number_is_a_unique_violation() {
    let db = db().await;
    let mut tx = db.begin().await.unwrap();
    let admin = user(Role::Admin);
    UserRepo::new(&mut tx).insert(&admin).await.unwrap();

    let mut first = item(&admin.id, 1.0);
    first.reference_number = Some("FL-0001".into());
    InventoryRepo::new(&mut tx).insert(&first).await.unwrap();

    let mut second = item(&admin.id, 1.0);
    second.reference_number = Some("FL-0001".into());
    let err = InventoryRepo::new(&mut tx).insert(&second).await.unwrap_err();
    assert!(err.is_unique_violation());

    // NULL references are exempt from the unique index
    InventoryRepo::new(&mut tx).insert(&item(&admin.id, 1.0)).await.unwrap();
    InventoryRepo::new(&mut tx).insert(&item(&admin.id, 1.0)).await.unwrap();
}

#[tokio::test]
async fn buyer_balance_is_a_running_signed_increment() {
    let db = db().await;
    let mut tx = db.begin().await.unwrap();
    let admin = user(Role::Admin);
    UserRepo::new(&mut tx).insert(&admin).await.unwrap();
    let b = buyer(&admin.id);
    BuyerRepo::new(&mut tx).insert(&b).await.unwrap();

    assert_eq!(
        BuyerRepo::new(&mut tx).adjust_balance(&b.id, 2500).await.unwrap(),
        3500
    );
    assert_eq!(
        BuyerRepo::new(&mut tx).adjust_balance(&b.id, -6000).await.unwrap(),
        -2500
    );
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn method_balance_upserts_from_absent() {
    let db = db().await;
    let mut tx = db.begin().await.unwrap();
    let admin = user(Role::Admin);
    UserRepo::new(&mut tx).insert(&admin).await.unwrap();

    // Absent key reads as zero
    assert_eq!(
        UserRepo::new(&mut tx)
            .method_balance(&admin.id, BalanceMethod::Crypto)
            .await
            .unwrap(),
        0
    );

    // First increment creates the row at the delta
    assert_eq!(
        UserRepo::new(&mut tx)
            .upsert_method_balance(&admin.id, BalanceMethod::Crypto, 4000)
            .await
            .unwrap(),
        4000
    );

    // Second one accumulates
    assert_eq!(
        UserRepo::new(&mut tx)
            .upsert_method_balance(&admin.id, BalanceMethod::Crypto, -1500)
            .await
            .unwrap(),
        2500
    );

    // Other methods are independent keys
    assert_eq!(
        UserRepo::new(&mut tx)
            .method_balance(&admin.id, BalanceMethod::Eft)
            .await
            .unwrap(),
        0
    );
    tx.commit().await.unwrap();
}

#[tokio::test]
async fn sale_reference_is_write_once_and_unique() {
    let db = db().await;
    let mut tx = db.begin().await.unwrap();
    let admin = user(Role::Admin);
    UserRepo::new(&mut tx).insert(&admin).await.unwrap();

    let now = Utc::now();
    let header = |id: &str| Transaction {
        id: id.to_string(),
        user_id: admin.id.clone(),
        buyer_id: None,
        worker_id: None,
        admin_id: None,
        created_by_role: Role::Admin,
        tx_type: TransactionKind::Sale,
        payment_method: None,
        payment_direction: None,
        price_cents: 0,
        sale_price_cents: 0,
        total_shipping_cents: 0,
        profit_cents: 0,
        sale_reference_id: None,
        payment_id: None,
        notes: None,
        edited: false,
        created_at: now,
        updated_at: now,
    };

    TransactionRepo::new(&mut tx).insert_header(&header("t1")).await.unwrap();
    TransactionRepo::new(&mut tx).insert_header(&header("t2")).await.unwrap();

    TransactionRepo::new(&mut tx)
        .assign_sale_reference("t1", "ABCD2345")
        .await
        .unwrap();

    // Same code on another header collides on the partial unique index
    let err = TransactionRepo::new(&mut tx)
        .assign_sale_reference("t2", "ABCD2345")
        .await
        .unwrap_err();
    assert!(err.is_unique_violation());

    // Already-assigned headers refuse a second write
    assert!(TransactionRepo::new(&mut tx)
        .assign_sale_reference("t1", "WXYZ6789")
        .await
        .is_err());

    let stored = TransactionRepo::new(&mut tx).get_required("t1").await.unwrap();
    assert_eq!(stored.sale_reference_id.as_deref(), Some("ABCD2345"));
}

#[tokio::test]
async fn revisions_round_trip_their_json_snapshots() {
    let db = db().await;
    let mut tx = db.begin().await.unwrap();
    let admin = user(Role::Admin);
    UserRepo::new(&mut tx).insert(&admin).await.unwrap();

    let now = Utc::now();
    TransactionRepo::new(&mut tx)
        .insert_header(&Transaction {
            id: "t1".into(),
            user_id: admin.id.clone(),
            buyer_id: None,
            worker_id: None,
            admin_id: None,
            created_by_role: Role::Admin,
            tx_type: TransactionKind::InventoryAddition,
            payment_method: None,
            payment_direction: None,
            price_cents: 0,
            sale_price_cents: 0,
            total_shipping_cents: 0,
            profit_cents: 0,
            sale_reference_id: None,
            payment_id: None,
            notes: None,
            edited: false,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();

    let before = ItemSnapshot {
        transaction_item_id: "ti-1".into(),
        inventory_id: "inv-1".into(),
        qty: 3.0,
        measurement: 1.0,
        unit: "gram".into(),
        price_cents: 1200,
        sale_price_cents: None,
        shipping_cents: 0,
    };
    let mut after = before.clone();
    after.qty = 5.0;

    TransactionRepo::new(&mut tx)
        .append_revision("t1", std::slice::from_ref(&before), std::slice::from_ref(&after))
        .await
        .unwrap();

    let revisions = TransactionRepo::new(&mut tx).revisions("t1").await.unwrap();
    assert_eq!(revisions.len(), 1);
    assert_eq!(revisions[0].original_items[0], before);
    assert_eq!(revisions[0].items[0], after);
}

#[tokio::test]
async fn transaction_rollback_discards_everything() {
    let db = db().await;
    let admin = user(Role::Admin);

    {
        let mut tx = db.begin().await.unwrap();
        UserRepo::new(&mut tx).insert(&admin).await.unwrap();
        InventoryRepo::new(&mut tx).insert(&item(&admin.id, 5.0)).await.unwrap();
        // Dropped without commit
    }

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(db.pool())
        .await
        .unwrap();
    let items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_items")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(users, 0);
    assert_eq!(items, 0);
}
