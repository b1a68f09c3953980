use chrono::{DateTime, Utc};
use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, Granularity, ResultEngine, StatsReport, Transaction, stats, transactions,
};

use super::{Engine, with_tx};

impl Engine {
    /// Aggregates the user's transactions over the current window for
    /// `granularity`.
    pub async fn stats(&self, user_id: &str, granularity: Granularity) -> ResultEngine<StatsReport> {
        self.stats_at(user_id, granularity, Utc::now()).await
    }

    /// Same as [`stats`](Engine::stats) with an explicit reference instant,
    /// which pins the window in tests.
    ///
    /// One range query feeds both outputs: the bucket sums and the flat
    /// newest-first transaction list, so they always describe the same
    /// committed snapshot.
    pub async fn stats_at(
        &self,
        user_id: &str,
        granularity: Granularity,
        now: DateTime<Utc>,
    ) -> ResultEngine<StatsReport> {
        let mut buckets = stats::window(granularity, now)?;
        let (from, to) = match (buckets.first(), buckets.last()) {
            (Some(first), Some(last)) => (first.period_start, last.period_end),
            _ => {
                return Err(EngineError::Validation(
                    "empty statistics window".to_string(),
                ));
            }
        };

        let in_window = with_tx!(self, |db_tx| {
            let models = transactions::Entity::find()
                .filter(transactions::Column::UserId.eq(user_id))
                .filter(transactions::Column::OccurredAt.gte(from))
                .filter(transactions::Column::OccurredAt.lt(to))
                .order_by_desc(transactions::Column::OccurredAt)
                .order_by_desc(transactions::Column::Id)
                .all(&db_tx)
                .await?;
            models
                .into_iter()
                .map(Transaction::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })?;

        for tx in &in_window {
            stats::assign(&mut buckets, tx);
        }

        tracing::debug!(
            user = user_id,
            granularity = granularity.as_str(),
            transactions = in_window.len(),
            "statistics computed"
        );
        Ok(StatsReport {
            granularity,
            buckets,
            transactions: in_window,
        })
    }
}
