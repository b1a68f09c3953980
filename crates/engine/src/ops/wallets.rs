use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    prelude::*,
};

use crate::{
    ChangeEvent, EngineError, NewWalletCmd, ResultEngine, Transaction, TransactionKind,
    UpdateWalletCmd, Wallet, transactions, wallets,
};

use super::{Engine, normalize_optional_text, normalize_required_name, with_tx};

/// Stored vs replayed totals for one wallet.
///
/// Produced by the integrity check; `replayed_*` values are derived from the
/// transaction ledger inside the same atomic read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TotalsReport {
    pub wallet_id: Uuid,
    pub stored_balance: i64,
    pub stored_income: i64,
    pub stored_expenses: i64,
    pub replayed_balance: i64,
    pub replayed_income: i64,
    pub replayed_expenses: i64,
}

impl TotalsReport {
    /// Whether the stored fields match the ledger.
    #[must_use]
    pub fn consistent(&self) -> bool {
        self.stored_balance == self.replayed_balance
            && self.stored_income == self.replayed_income
            && self.stored_expenses == self.replayed_expenses
    }
}

impl Engine {
    /// Creates a wallet with balance, income, and expense totals seeded to
    /// zero.
    pub async fn new_wallet(&self, cmd: NewWalletCmd) -> ResultEngine<Uuid> {
        let name = normalize_required_name(&cmd.name, "wallet")?;
        let wallet = Wallet::new(
            cmd.user_id.clone(),
            name,
            cmd.currency,
            normalize_optional_text(cmd.image_ref.as_deref()),
            Utc::now(),
        );
        let wallet_id = wallet.id;

        with_tx!(self, |db_tx| {
            wallets::ActiveModel::from(&wallet).insert(&db_tx).await?;
            Ok(())
        })?;

        tracing::debug!(wallet = %wallet_id, user = %cmd.user_id, "wallet created");
        self.publish(ChangeEvent::Wallets {
            user_id: cmd.user_id,
        });
        Ok(wallet_id)
    }

    /// Return a wallet snapshot from DB.
    pub async fn wallet(&self, user_id: &str, wallet_id: Uuid) -> ResultEngine<Wallet> {
        with_tx!(self, |db_tx| {
            let model = wallets::Entity::find_by_id(wallet_id.to_string())
                .filter(wallets::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("wallet not exists".to_string()))?;
            Wallet::try_from(model)
        })
    }

    /// Lists a user's wallets, newest first.
    pub async fn wallets(&self, user_id: &str) -> ResultEngine<Vec<Wallet>> {
        with_tx!(self, |db_tx| {
            let models = wallets::Entity::find()
                .filter(wallets::Column::UserId.eq(user_id))
                .order_by_desc(wallets::Column::CreatedAt)
                .all(&db_tx)
                .await?;
            models.into_iter().map(Wallet::try_from).collect()
        })
    }

    /// Patches a wallet's display fields.
    ///
    /// Balance, income, and expense totals are owned by the transaction
    /// writes and never change here.
    pub async fn update_wallet(&self, cmd: UpdateWalletCmd) -> ResultEngine<()> {
        let name = cmd
            .name
            .as_deref()
            .map(|n| normalize_required_name(n, "wallet"))
            .transpose()?;

        with_tx!(self, |db_tx| {
            wallets::Entity::find_by_id(cmd.wallet_id.to_string())
                .filter(wallets::Column::UserId.eq(cmd.user_id.as_str()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("wallet not exists".to_string()))?;

            let active = wallets::ActiveModel {
                id: ActiveValue::Set(cmd.wallet_id.to_string()),
                name: name
                    .clone()
                    .map_or(ActiveValue::NotSet, ActiveValue::Set),
                image_ref: cmd
                    .image_ref
                    .clone()
                    .map_or(ActiveValue::NotSet, |r| ActiveValue::Set(Some(r))),
                ..Default::default()
            };
            active.update(&db_tx).await?;
            Ok(())
        })?;

        self.publish(ChangeEvent::Wallets {
            user_id: cmd.user_id,
        });
        Ok(())
    }

    /// Deletes a wallet and cascades over its transactions in bounded
    /// batches.
    ///
    /// The wallet row goes first: a crash mid-cascade leaves orphan
    /// transactions pointing at a missing wallet, and re-running the same
    /// cascade still finds them because the paging query only filters on
    /// `wallet_id`. Each page is atomic on its own; the cascade as a whole is
    /// resumable rather than atomic. Running the cascade twice is a no-op the
    /// second time.
    pub async fn delete_wallet(&self, user_id: &str, wallet_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            wallets::Entity::delete_many()
                .filter(wallets::Column::Id.eq(wallet_id.to_string()))
                .filter(wallets::Column::UserId.eq(user_id))
                .exec(&db_tx)
                .await?;
            Ok(())
        })?;

        loop {
            let deleted = with_tx!(self, |db_tx| {
                let ids: Vec<String> = transactions::Entity::find()
                    .filter(transactions::Column::WalletId.eq(wallet_id.to_string()))
                    .filter(transactions::Column::UserId.eq(user_id))
                    .limit(self.cascade_page_size)
                    .all(&db_tx)
                    .await?
                    .into_iter()
                    .map(|model| model.id)
                    .collect();

                if !ids.is_empty() {
                    transactions::Entity::delete_many()
                        .filter(transactions::Column::Id.is_in(ids.clone()))
                        .exec(&db_tx)
                        .await?;
                }
                Ok(ids.len())
            })?;

            if deleted == 0 {
                break;
            }
            tracing::debug!(wallet = %wallet_id, count = deleted, "cascade page deleted");
        }

        self.publish(ChangeEvent::Wallets {
            user_id: user_id.to_string(),
        });
        self.publish(ChangeEvent::Transactions {
            user_id: user_id.to_string(),
            wallet_id,
        });
        Ok(())
    }

    /// Compares a wallet's stored totals against its replayed ledger without
    /// writing.
    pub async fn check_wallet_totals(
        &self,
        user_id: &str,
        wallet_id: Uuid,
    ) -> ResultEngine<TotalsReport> {
        with_tx!(self, |db_tx| {
            self.totals_report(&db_tx, user_id, wallet_id).await
        })
    }

    /// Replays a wallet's ledger and rewrites the three denormalized fields
    /// if they drifted.
    ///
    /// The absolute write is safe here because replay and write share one
    /// atomic transaction.
    pub async fn recompute_wallet_totals(
        &self,
        user_id: &str,
        wallet_id: Uuid,
    ) -> ResultEngine<TotalsReport> {
        let report = with_tx!(self, |db_tx| {
            let report = self.totals_report(&db_tx, user_id, wallet_id).await?;
            if !report.consistent() {
                tracing::warn!(
                    wallet = %wallet_id,
                    stored_balance = report.stored_balance,
                    replayed_balance = report.replayed_balance,
                    "stored totals drifted from ledger; repairing"
                );
                let active = wallets::ActiveModel {
                    id: ActiveValue::Set(wallet_id.to_string()),
                    balance: ActiveValue::Set(report.replayed_balance),
                    total_income: ActiveValue::Set(report.replayed_income),
                    total_expenses: ActiveValue::Set(report.replayed_expenses),
                    ..Default::default()
                };
                active.update(&db_tx).await?;
            }
            Ok(report)
        })?;

        if !report.consistent() {
            self.publish(ChangeEvent::Wallets {
                user_id: user_id.to_string(),
            });
        }
        Ok(report)
    }

    async fn totals_report(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        wallet_id: Uuid,
    ) -> ResultEngine<TotalsReport> {
        let model = wallets::Entity::find_by_id(wallet_id.to_string())
            .filter(wallets::Column::UserId.eq(user_id))
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("wallet not exists".to_string()))?;

        let tx_models = transactions::Entity::find()
            .filter(transactions::Column::WalletId.eq(wallet_id.to_string()))
            .filter(transactions::Column::UserId.eq(user_id))
            .all(db_tx)
            .await?;

        let mut income = 0i64;
        let mut expenses = 0i64;
        for tx_model in tx_models {
            let tx = Transaction::try_from(tx_model)?;
            match tx.kind {
                TransactionKind::Income => income += tx.amount,
                TransactionKind::Expense => expenses += tx.amount,
            }
        }

        Ok(TotalsReport {
            wallet_id,
            stored_balance: model.balance,
            stored_income: model.total_income,
            stored_expenses: model.total_expenses,
            replayed_balance: income - expenses,
            replayed_income: income,
            replayed_expenses: expenses,
        })
    }
}
