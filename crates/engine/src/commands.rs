//! Command structs for engine operations.
//!
//! These types group parameters for write operations, keeping call sites
//! readable and avoiding long argument lists. Optional fields on the update
//! commands are patches: `None` means "keep the stored value".

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Category, Currency, TransactionKind};

/// Create a wallet.
#[derive(Clone, Debug)]
pub struct NewWalletCmd {
    pub user_id: String,
    pub name: String,
    pub currency: Currency,
    pub image_ref: Option<String>,
}

impl NewWalletCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            currency: Currency::default(),
            image_ref: None,
        }
    }

    #[must_use]
    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    #[must_use]
    pub fn image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// Patch a wallet's display fields (never its balance fields).
#[derive(Clone, Debug)]
pub struct UpdateWalletCmd {
    pub user_id: String,
    pub wallet_id: Uuid,
    pub name: Option<String>,
    pub image_ref: Option<String>,
}

impl UpdateWalletCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, wallet_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            wallet_id,
            name: None,
            image_ref: None,
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// Create a transaction.
#[derive(Clone, Debug)]
pub struct NewTransactionCmd {
    pub user_id: String,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    /// Positive magnitude in minor units.
    pub amount: i64,
    pub category: Option<Category>,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub receipt_ref: Option<String>,
}

impl NewTransactionCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        wallet_id: Uuid,
        kind: TransactionKind,
        amount: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            wallet_id,
            kind,
            amount,
            category: None,
            occurred_at,
            note: None,
            receipt_ref: None,
        }
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn receipt_ref(mut self, receipt_ref: impl Into<String>) -> Self {
        self.receipt_ref = Some(receipt_ref.into());
        self
    }
}

/// Update an existing transaction.
///
/// Any combination of amount, kind, wallet, category, date, and text fields
/// may change in one call; the engine reverses the stored transaction's effect
/// on its original wallet and applies the patched one to its (possibly
/// different) target wallet as a single atomic unit.
#[derive(Clone, Debug)]
pub struct UpdateTransactionCmd {
    pub user_id: String,
    pub transaction_id: Uuid,
    pub amount: Option<i64>,
    pub kind: Option<TransactionKind>,
    /// Reassigns the transaction to another wallet.
    pub wallet_id: Option<Uuid>,
    pub category: Option<Category>,
    pub occurred_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
    pub receipt_ref: Option<String>,
}

impl UpdateTransactionCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, transaction_id: Uuid) -> Self {
        Self {
            user_id: user_id.into(),
            transaction_id,
            amount: None,
            kind: None,
            wallet_id: None,
            category: None,
            occurred_at: None,
            note: None,
            receipt_ref: None,
        }
    }

    #[must_use]
    pub fn amount(mut self, amount: i64) -> Self {
        self.amount = Some(amount);
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn wallet_id(mut self, wallet_id: Uuid) -> Self {
        self.wallet_id = Some(wallet_id);
        self
    }

    #[must_use]
    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(occurred_at);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn receipt_ref(mut self, receipt_ref: impl Into<String>) -> Self {
        self.receipt_ref = Some(receipt_ref.into());
        self
    }
}
