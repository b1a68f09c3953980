use chrono::{Duration, Utc};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

use engine::{
    Category, Engine, EngineError, NewTransactionCmd, NewWalletCmd, TransactionKind,
    TransactionListFilter, UpdateTransactionCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn strict_engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .forbid_negative_balance(true)
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn wallet_for(engine: &Engine, user: &str) -> Uuid {
    engine
        .new_wallet(NewWalletCmd::new(user, "Cash"))
        .await
        .unwrap()
}

#[tokio::test]
async fn income_moves_balance_and_total_income_together() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;

    engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            50_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, 50_000);
    assert_eq!(wallet.total_income, 50_000);
    assert_eq!(wallet.total_expenses, 0);
    assert!(wallet.is_consistent());
}

#[tokio::test]
async fn expense_moves_balance_and_total_expenses_together() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            50_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    engine
        .add_transaction(
            NewTransactionCmd::new(
                "alice",
                wallet_id,
                TransactionKind::Expense,
                12_500,
                Utc::now(),
            )
            .category(Category::Groceries),
        )
        .await
        .unwrap();

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, 37_500);
    assert_eq!(wallet.total_income, 50_000);
    assert_eq!(wallet.total_expenses, 12_500);
    assert!(wallet.is_consistent());
}

#[tokio::test]
async fn stored_fields_round_trip() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    let occurred_at = Utc::now() - Duration::days(2);

    let tx_id = engine
        .add_transaction(
            NewTransactionCmd::new(
                "alice",
                wallet_id,
                TransactionKind::Expense,
                8_000,
                occurred_at,
            )
            .category(Category::Dining)
            .note("lunch with Sam")
            .receipt_ref("receipts/2026/lunch.jpg"),
        )
        .await
        .unwrap();

    let tx = engine.transaction("alice", tx_id).await.unwrap();
    assert_eq!(tx.wallet_id, wallet_id);
    assert_eq!(tx.kind, TransactionKind::Expense);
    assert_eq!(tx.amount, 8_000);
    assert_eq!(tx.category, Some(Category::Dining));
    assert_eq!(tx.occurred_at, occurred_at);
    assert_eq!(tx.note.as_deref(), Some("lunch with Sam"));
    assert_eq!(tx.receipt_ref.as_deref(), Some("receipts/2026/lunch.jpg"));
}

#[tokio::test]
async fn create_against_missing_wallet_writes_nothing() {
    let (engine, _db) = engine_with_db().await;
    wallet_for(&engine, "alice").await;

    let result = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            Uuid::new_v4(),
            TransactionKind::Income,
            100,
            Utc::now(),
        ))
        .await;
    assert_eq!(
        result.unwrap_err(),
        EngineError::NotFound("wallet not exists".to_string())
    );

    let txs = engine
        .transactions("alice", &TransactionListFilter::new(), None)
        .await
        .unwrap();
    assert!(txs.is_empty());
}

#[tokio::test]
async fn invalid_commands_leave_the_wallet_untouched() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;

    let zero = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            0,
            Utc::now(),
        ))
        .await;
    assert!(matches!(zero, Err(EngineError::Validation(_))));

    let uncategorized = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Expense,
            100,
            Utc::now(),
        ))
        .await;
    assert_eq!(
        uncategorized.unwrap_err(),
        EngineError::Validation("expense requires a category".to_string())
    );

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, 0);
    assert_eq!(wallet.total_income, 0);
    assert_eq!(wallet.total_expenses, 0);
}

#[tokio::test]
async fn amount_update_adjusts_the_wallet_by_the_difference() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    let tx_id = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    engine
        .update_transaction(UpdateTransactionCmd::new("alice", tx_id).amount(1_500))
        .await
        .unwrap();

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, 1_500);
    assert_eq!(wallet.total_income, 1_500);
    assert!(wallet.is_consistent());
}

#[tokio::test]
async fn kind_flip_rebooks_both_totals() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    let tx_id = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    let updated = engine
        .update_transaction(
            UpdateTransactionCmd::new("alice", tx_id)
                .kind(TransactionKind::Expense)
                .category(Category::Rent),
        )
        .await
        .unwrap();
    assert_eq!(updated.kind, TransactionKind::Expense);
    assert_eq!(updated.category, Some(Category::Rent));

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, -1_000);
    assert_eq!(wallet.total_income, 0);
    assert_eq!(wallet.total_expenses, 1_000);
    assert!(wallet.is_consistent());
}

#[tokio::test]
async fn kind_flip_to_expense_needs_a_category() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    let tx_id = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    let result = engine
        .update_transaction(UpdateTransactionCmd::new("alice", tx_id).kind(TransactionKind::Expense))
        .await;
    assert_eq!(
        result.unwrap_err(),
        EngineError::Validation("expense requires a category".to_string())
    );

    // Rejected update must leave both the row and the wallet as they were.
    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, 1_000);
    let tx = engine.transaction("alice", tx_id).await.unwrap();
    assert_eq!(tx.kind, TransactionKind::Income);
}

#[tokio::test]
async fn wallet_reassignment_moves_the_effect_atomically() {
    let (engine, _db) = engine_with_db().await;
    let source = wallet_for(&engine, "alice").await;
    let target = engine
        .new_wallet(NewWalletCmd::new("alice", "Savings"))
        .await
        .unwrap();
    let tx_id = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            source,
            TransactionKind::Income,
            2_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    engine
        .update_transaction(UpdateTransactionCmd::new("alice", tx_id).wallet_id(target))
        .await
        .unwrap();

    let old = engine.wallet("alice", source).await.unwrap();
    assert_eq!(old.balance, 0);
    assert_eq!(old.total_income, 0);
    let new = engine.wallet("alice", target).await.unwrap();
    assert_eq!(new.balance, 2_000);
    assert_eq!(new.total_income, 2_000);
    assert!(old.is_consistent() && new.is_consistent());
}

#[tokio::test]
async fn removing_an_income_may_leave_the_balance_negative() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    let income_id = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .add_transaction(
            NewTransactionCmd::new(
                "alice",
                wallet_id,
                TransactionKind::Expense,
                400,
                Utc::now(),
            )
            .category(Category::Utilities),
        )
        .await
        .unwrap();

    engine.remove_transaction("alice", income_id).await.unwrap();

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, -400);
    assert_eq!(wallet.total_income, 0);
    assert_eq!(wallet.total_expenses, 400);
    assert!(wallet.is_consistent());

    assert!(matches!(
        engine.transaction("alice", income_id).await,
        Err(EngineError::NotFound(_))
    ));
}

#[tokio::test]
async fn removing_a_missing_transaction_is_not_found() {
    let (engine, _db) = engine_with_db().await;
    wallet_for(&engine, "alice").await;

    let result = engine.remove_transaction("alice", Uuid::new_v4()).await;
    assert_eq!(
        result.unwrap_err(),
        EngineError::NotFound("transaction not exists".to_string())
    );
}

#[tokio::test]
async fn users_cannot_touch_each_others_transactions() {
    let (engine, _db) = engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    let tx_id = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    let result = engine.remove_transaction("bob", tx_id).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, 1_000);
}

#[tokio::test]
async fn strict_policy_rejects_overdraft_on_create() {
    let (engine, _db) = strict_engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            300,
            Utc::now(),
        ))
        .await
        .unwrap();

    let result = engine
        .add_transaction(
            NewTransactionCmd::new(
                "alice",
                wallet_id,
                TransactionKind::Expense,
                500,
                Utc::now(),
            )
            .category(Category::Shopping),
        )
        .await;
    assert!(matches!(result, Err(EngineError::InsufficientFunds(_))));

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, 300);
    assert_eq!(wallet.total_expenses, 0);
}

#[tokio::test]
async fn strict_policy_still_allows_deleting_income() {
    let (engine, _db) = strict_engine_with_db().await;
    let wallet_id = wallet_for(&engine, "alice").await;
    let income_id = engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap();
    engine
        .add_transaction(
            NewTransactionCmd::new(
                "alice",
                wallet_id,
                TransactionKind::Expense,
                400,
                Utc::now(),
            )
            .category(Category::Health),
        )
        .await
        .unwrap();

    engine.remove_transaction("alice", income_id).await.unwrap();

    let wallet = engine.wallet("alice", wallet_id).await.unwrap();
    assert_eq!(wallet.balance, -400);
}

#[tokio::test]
async fn list_filters_compose() {
    let (engine, _db) = engine_with_db().await;
    let cash = wallet_for(&engine, "alice").await;
    let savings = engine
        .new_wallet(NewWalletCmd::new("alice", "Savings"))
        .await
        .unwrap();
    let now = Utc::now();

    engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            cash,
            TransactionKind::Income,
            1_000,
            now - Duration::days(10),
        ))
        .await
        .unwrap();
    engine
        .add_transaction(
            NewTransactionCmd::new("alice", cash, TransactionKind::Expense, 200, now)
                .category(Category::Transportation),
        )
        .await
        .unwrap();
    engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            savings,
            TransactionKind::Income,
            5_000,
            now,
        ))
        .await
        .unwrap();

    let recent = engine
        .transactions(
            "alice",
            &TransactionListFilter::new().from(now - Duration::days(1)),
            None,
        )
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);

    let cash_only = engine
        .transactions("alice", &TransactionListFilter::new().wallet_id(cash), None)
        .await
        .unwrap();
    assert_eq!(cash_only.len(), 2);

    let expenses = engine
        .transactions(
            "alice",
            &TransactionListFilter::new().kinds(vec![TransactionKind::Expense]),
            None,
        )
        .await
        .unwrap();
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].amount, 200);

    let limited = engine
        .transactions("alice", &TransactionListFilter::new(), Some(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    // Newest effective date first.
    assert_ne!(limited[0].occurred_at, now - Duration::days(10));
}

#[tokio::test]
async fn empty_date_range_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let now = Utc::now();

    let result = engine
        .transactions(
            "alice",
            &TransactionListFilter::new().from(now).to(now),
            None,
        )
        .await;
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[tokio::test]
async fn mutations_broadcast_post_commit_events() {
    let (engine, _db) = engine_with_db().await;
    let mut events = engine.subscribe();

    let wallet_id = wallet_for(&engine, "alice").await;
    engine
        .add_transaction(NewTransactionCmd::new(
            "alice",
            wallet_id,
            TransactionKind::Income,
            1_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    let first = events.recv().await.unwrap();
    assert_eq!(
        first,
        engine::ChangeEvent::Wallets {
            user_id: "alice".to_string()
        }
    );
    let second = events.recv().await.unwrap();
    assert_eq!(
        second,
        engine::ChangeEvent::Wallets {
            user_id: "alice".to_string()
        }
    );
    let third = events.recv().await.unwrap();
    assert_eq!(
        third,
        engine::ChangeEvent::Transactions {
            user_id: "alice".to_string(),
            wallet_id
        }
    );
}
