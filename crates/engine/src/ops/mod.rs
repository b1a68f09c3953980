use sea_orm::DatabaseConnection;
use tokio::sync::broadcast;

use crate::{ChangeEvent, EngineError, ResultEngine};

mod stats;
mod transactions;
mod wallets;

pub use transactions::TransactionListFilter;
pub use wallets::TotalsReport;

/// Run a block inside a DB transaction, committing on success and rolling
/// back on error. Lock-contention failures surface as
/// [`EngineError::Conflict`].
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let outcome = async {
            let $tx = $self.database.begin().await?;
            let result = $body;
            match result {
                Ok(value) => {
                    $tx.commit().await?;
                    Ok(value)
                }
                Err(err) => Err(err),
            }
        }
        .await;
        outcome.map_err(crate::EngineError::classify)
    }};
}

pub(crate) use with_tx;

const DEFAULT_CASCADE_PAGE_SIZE: u64 = 500;
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// The engine owns the injected store handle and every rule that keeps wallet
/// totals consistent with their ledgers.
///
/// Constructed once at process start via [`Engine::builder`] and shared by
/// reference; tests inject an in-memory SQLite connection the same way.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    events: broadcast::Sender<ChangeEvent>,
    forbid_negative_balance: bool,
    cascade_page_size: u64,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Subscribes to post-commit change notifications.
    ///
    /// The receiver only ever observes committed state; a lagging receiver
    /// drops the oldest events instead of blocking writers.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.events.subscribe()
    }

    pub(crate) fn publish(&self, event: ChangeEvent) {
        // No receivers is fine; the send result only reports that.
        let _ = self.events.send(event);
    }
}

fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!(
            "{label} name must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// The builder for `Engine`
pub struct EngineBuilder {
    database: DatabaseConnection,
    forbid_negative_balance: bool,
    cascade_page_size: u64,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            database: DatabaseConnection::default(),
            forbid_negative_balance: false,
            cascade_page_size: DEFAULT_CASCADE_PAGE_SIZE,
        }
    }
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Reject mutations that would drive a wallet balance below zero.
    ///
    /// Off by default: expenses may exceed recorded income and the balance
    /// goes negative.
    pub fn forbid_negative_balance(mut self, forbid: bool) -> EngineBuilder {
        self.forbid_negative_balance = forbid;
        self
    }

    /// Maximum transactions deleted per cascade batch (default 500).
    pub fn cascade_page_size(mut self, page_size: u64) -> EngineBuilder {
        self.cascade_page_size = page_size.max(1);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Engine {
            database: self.database,
            events,
            forbid_negative_balance: self.forbid_negative_balance,
            cascade_page_size: self.cascade_page_size,
        })
    }
}
