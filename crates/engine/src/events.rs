//! Post-commit change notifications.
//!
//! The live-query delivery layer is an external collaborator; the engine only
//! provides the hook it consumes. After every committed mutation the engine
//! broadcasts a [`ChangeEvent`] describing which collection changed, so a
//! subscriber can re-run its query and push a fresh snapshot. Events are
//! published strictly after commit; a subscriber never observes a partial
//! write. Lagging receivers drop old events instead of blocking writers.

use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A wallet for this user was created, updated, or deleted.
    Wallets { user_id: String },
    /// A transaction touching this wallet was created, updated, or deleted.
    Transactions { user_id: String, wallet_id: Uuid },
}
