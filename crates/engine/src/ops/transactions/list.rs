use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, ResultEngine, Transaction, TransactionKind, transactions,
};

use super::super::{Engine, with_tx};

/// Filter for the transaction list query. An empty filter matches every
/// transaction of the user.
#[derive(Clone, Debug, Default)]
pub struct TransactionListFilter {
    /// Inclusive lower bound on the effective date.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on the effective date.
    pub to: Option<DateTime<Utc>>,
    pub wallet_id: Option<Uuid>,
    /// Kinds to keep. `None` means both.
    pub kinds: Option<Vec<TransactionKind>>,
}

impl TransactionListFilter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    #[must_use]
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    #[must_use]
    pub fn wallet_id(mut self, wallet_id: Uuid) -> Self {
        self.wallet_id = Some(wallet_id);
        self
    }

    #[must_use]
    pub fn kinds(mut self, kinds: Vec<TransactionKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    fn validate(&self) -> ResultEngine<()> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from >= to
        {
            return Err(EngineError::Validation(
                "date range is empty".to_string(),
            ));
        }
        if let Some(kinds) = &self.kinds
            && kinds.is_empty()
        {
            return Err(EngineError::Validation(
                "kinds filter must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Engine {
    /// Return a single transaction owned by `user_id`.
    pub async fn transaction(
        &self,
        user_id: &str,
        transaction_id: Uuid,
    ) -> ResultEngine<Transaction> {
        with_tx!(self, |db_tx| {
            let model = transactions::Entity::find_by_id(transaction_id.to_string())
                .filter(transactions::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::NotFound("transaction not exists".to_string()))?;
            Transaction::try_from(model)
        })
    }

    /// Lists a user's transactions, newest effective date first, ties broken
    /// by id for a stable order.
    pub async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionListFilter,
        limit: Option<u64>,
    ) -> ResultEngine<Vec<Transaction>> {
        filter.validate()?;

        let mut query = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::OccurredAt)
            .order_by_desc(transactions::Column::Id);

        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::OccurredAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::OccurredAt.lt(to));
        }
        if let Some(wallet_id) = filter.wallet_id {
            query = query.filter(transactions::Column::WalletId.eq(wallet_id.to_string()));
        }
        if let Some(kinds) = &filter.kinds {
            let kinds: Vec<&str> = kinds.iter().map(|k| k.as_str()).collect();
            query = query.filter(transactions::Column::Kind.is_in(kinds));
        }
        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        with_tx!(self, |db_tx| {
            let models = query.all(&db_tx).await?;
            models.into_iter().map(Transaction::try_from).collect()
        })
    }
}
