//! Transaction write and read operations.
//!
//! Every mutation pairs a ledger row change with relative increments on the
//! owning wallet's denormalized totals, inside one database transaction.
//! Increments are expressed as SQL column arithmetic rather than
//! read-modify-write from a snapshot, so concurrent writers cannot clobber
//! each other's totals.

use sea_orm::{DatabaseTransaction, QueryFilter, prelude::*, sea_query::Expr};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, Transaction, TransactionKind, wallets};

mod list;
mod write;

pub use list::TransactionListFilter;

/// Relative change to a wallet's three denormalized fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct WalletDelta {
    pub balance: i64,
    pub income: i64,
    pub expenses: i64,
}

impl WalletDelta {
    /// The increments recording `tx` adds to its wallet.
    pub fn apply_of(tx: &Transaction) -> Self {
        match tx.kind {
            TransactionKind::Income => Self {
                balance: tx.amount,
                income: tx.amount,
                expenses: 0,
            },
            TransactionKind::Expense => Self {
                balance: -tx.amount,
                income: 0,
                expenses: tx.amount,
            },
        }
    }

    /// The increments that undo `tx`'s recorded effect.
    pub fn reverse_of(tx: &Transaction) -> Self {
        let applied = Self::apply_of(tx);
        Self {
            balance: -applied.balance,
            income: -applied.income,
            expenses: -applied.expenses,
        }
    }
}

/// Adds `delta` to the wallet's stored fields with in-database arithmetic.
///
/// Zero rows touched means the wallet does not exist for this user, which
/// rolls the enclosing transaction back before any ledger row lands.
pub(crate) async fn apply_wallet_delta(
    db_tx: &DatabaseTransaction,
    user_id: &str,
    wallet_id: Uuid,
    delta: WalletDelta,
) -> ResultEngine<()> {
    let result = wallets::Entity::update_many()
        .col_expr(
            wallets::Column::Balance,
            Expr::col(wallets::Column::Balance).add(delta.balance),
        )
        .col_expr(
            wallets::Column::TotalIncome,
            Expr::col(wallets::Column::TotalIncome).add(delta.income),
        )
        .col_expr(
            wallets::Column::TotalExpenses,
            Expr::col(wallets::Column::TotalExpenses).add(delta.expenses),
        )
        .filter(wallets::Column::Id.eq(wallet_id.to_string()))
        .filter(wallets::Column::UserId.eq(user_id))
        .exec(db_tx)
        .await?;

    if result.rows_affected == 0 {
        return Err(EngineError::NotFound("wallet not exists".to_string()));
    }
    Ok(())
}

/// Enforces the non-negative balance policy, when enabled, by re-reading the
/// wallet inside the same transaction after its delta landed.
pub(crate) async fn ensure_non_negative(
    db_tx: &DatabaseTransaction,
    user_id: &str,
    wallet_id: Uuid,
) -> ResultEngine<()> {
    let model = wallets::Entity::find_by_id(wallet_id.to_string())
        .filter(wallets::Column::UserId.eq(user_id))
        .one(db_tx)
        .await?
        .ok_or_else(|| EngineError::NotFound("wallet not exists".to_string()))?;

    if model.balance < 0 {
        return Err(EngineError::InsufficientFunds(format!(
            "wallet {wallet_id} balance would drop below zero"
        )));
    }
    Ok(())
}
