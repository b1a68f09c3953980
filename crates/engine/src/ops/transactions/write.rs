use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    ChangeEvent, EngineError, NewTransactionCmd, ResultEngine, Transaction, TransactionKind,
    UpdateTransactionCmd, transactions, transactions::validate_fields,
};

use super::super::{Engine, normalize_optional_text, with_tx};
use super::{WalletDelta, apply_wallet_delta, ensure_non_negative};

impl Engine {
    /// Records a transaction and moves its wallet's totals in the same atomic
    /// unit.
    ///
    /// Field validation happens before any I/O; a rejected command leaves the
    /// store untouched. The wallet delta lands first so a missing wallet is
    /// caught before the ledger row is written.
    pub async fn add_transaction(&self, cmd: NewTransactionCmd) -> ResultEngine<Uuid> {
        let tx = Transaction::new(
            cmd.user_id.clone(),
            cmd.wallet_id,
            cmd.kind,
            cmd.amount,
            cmd.category,
            cmd.occurred_at,
            normalize_optional_text(cmd.note.as_deref()),
            normalize_optional_text(cmd.receipt_ref.as_deref()),
        )?;
        let tx_id = tx.id;
        let delta = WalletDelta::apply_of(&tx);

        with_tx!(self, |db_tx| {
            apply_wallet_delta(&db_tx, &cmd.user_id, cmd.wallet_id, delta).await?;
            if self.forbid_negative_balance {
                ensure_non_negative(&db_tx, &cmd.user_id, cmd.wallet_id).await?;
            }
            transactions::ActiveModel::from(&tx).insert(&db_tx).await?;
            Ok(())
        })?;

        tracing::debug!(
            transaction = %tx_id,
            wallet = %cmd.wallet_id,
            kind = cmd.kind.as_str(),
            amount = cmd.amount,
            "transaction recorded"
        );
        self.publish(ChangeEvent::Wallets {
            user_id: cmd.user_id.clone(),
        });
        self.publish(ChangeEvent::Transactions {
            user_id: cmd.user_id,
            wallet_id: cmd.wallet_id,
        });
        Ok(tx_id)
    }

    /// Rewrites a stored transaction, adjusting every affected wallet.
    ///
    /// The stored transaction's effect is reversed on its original wallet and
    /// the patched transaction's effect applied to its target wallet, which
    /// may be a different one. Both sides share one database transaction, so
    /// amount, kind, and wallet changes are equivalent to delete-then-create
    /// without the intermediate state ever being visible.
    pub async fn update_transaction(&self, cmd: UpdateTransactionCmd) -> ResultEngine<Transaction> {
        let (old_wallet, updated) = with_tx!(self, |db_tx| {
            let stored = transactions::Entity::find_by_id(cmd.transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(cmd.user_id.as_str()))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("transaction not exists".to_string()))?;
            let old = Transaction::try_from(stored)?;

            let kind = cmd.kind.unwrap_or(old.kind);
            let amount = cmd.amount.unwrap_or(old.amount);
            let wallet_id = cmd.wallet_id.unwrap_or(old.wallet_id);
            // A kind flip to expense needs a category from the patch; the old
            // one only carries over while the kind stays expense.
            let carried = (old.kind == TransactionKind::Expense)
                .then_some(old.category)
                .flatten();
            let category = match kind {
                TransactionKind::Expense => cmd.category.or(carried),
                TransactionKind::Income => None,
            };
            validate_fields(kind, amount, category)?;

            let updated = Transaction {
                id: old.id,
                user_id: old.user_id.clone(),
                wallet_id,
                kind,
                amount,
                category,
                occurred_at: cmd.occurred_at.unwrap_or(old.occurred_at),
                note: cmd
                    .note
                    .as_deref()
                    .map_or_else(|| old.note.clone(), |n| normalize_optional_text(Some(n))),
                receipt_ref: cmd.receipt_ref.as_deref().map_or_else(
                    || old.receipt_ref.clone(),
                    |r| normalize_optional_text(Some(r)),
                ),
            };

            apply_wallet_delta(
                &db_tx,
                &cmd.user_id,
                old.wallet_id,
                WalletDelta::reverse_of(&old),
            )
            .await?;
            apply_wallet_delta(
                &db_tx,
                &cmd.user_id,
                updated.wallet_id,
                WalletDelta::apply_of(&updated),
            )
            .await?;
            if self.forbid_negative_balance {
                ensure_non_negative(&db_tx, &cmd.user_id, old.wallet_id).await?;
                if updated.wallet_id != old.wallet_id {
                    ensure_non_negative(&db_tx, &cmd.user_id, updated.wallet_id).await?;
                }
            }

            transactions::ActiveModel::from(&updated).update(&db_tx).await?;
            Ok((old.wallet_id, updated))
        })?;

        tracing::debug!(transaction = %updated.id, wallet = %updated.wallet_id, "transaction updated");
        self.publish(ChangeEvent::Wallets {
            user_id: cmd.user_id.clone(),
        });
        self.publish(ChangeEvent::Transactions {
            user_id: cmd.user_id.clone(),
            wallet_id: old_wallet,
        });
        if updated.wallet_id != old_wallet {
            self.publish(ChangeEvent::Transactions {
                user_id: cmd.user_id,
                wallet_id: updated.wallet_id,
            });
        }
        Ok(updated)
    }

    /// Deletes a transaction and gives its effect back to the wallet.
    ///
    /// Removal is exempt from the non-negative policy: deleting an income may
    /// legitimately leave the balance negative, and the record must still go.
    pub async fn remove_transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<()> {
        let wallet_id = with_tx!(self, |db_tx| {
            let stored = transactions::Entity::find_by_id(transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("transaction not exists".to_string()))?;
            let tx = Transaction::try_from(stored)?;

            apply_wallet_delta(&db_tx, user_id, tx.wallet_id, WalletDelta::reverse_of(&tx))
                .await?;
            transactions::Entity::delete_by_id(transaction_id.to_string())
                .exec(&db_tx)
                .await?;
            Ok(tx.wallet_id)
        })?;

        tracing::debug!(transaction = %transaction_id, wallet = %wallet_id, "transaction removed");
        self.publish(ChangeEvent::Wallets {
            user_id: user_id.to_string(),
        });
        self.publish(ChangeEvent::Transactions {
            user_id: user_id.to_string(),
            wallet_id,
        });
        Ok(())
    }
}
