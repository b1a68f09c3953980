//! Transaction primitives.
//!
//! A `Transaction` is a single income or expense event against exactly one
//! wallet. The amount is a positive magnitude; the direction is carried by
//! [`TransactionKind`], never by the sign of the stored value.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(EngineError::Validation(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

/// Fixed set of expense categories.
///
/// Income has an implicit single category, so `Category` only applies to
/// expenses. Display metadata (icons, colors) is presentation concern and
/// lives outside the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Groceries,
    Rent,
    Utilities,
    Transportation,
    Entertainment,
    Dining,
    Health,
    Shopping,
    School,
    Wages,
    Support,
    Savings,
    Transfers,
    Personal,
    Clothing,
    Homecash,
    Others,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groceries => "groceries",
            Self::Rent => "rent",
            Self::Utilities => "utilities",
            Self::Transportation => "transportation",
            Self::Entertainment => "entertainment",
            Self::Dining => "dining",
            Self::Health => "health",
            Self::Shopping => "shopping",
            Self::School => "school",
            Self::Wages => "wages",
            Self::Support => "support",
            Self::Savings => "savings",
            Self::Transfers => "transfers",
            Self::Personal => "personal",
            Self::Clothing => "clothing",
            Self::Homecash => "homecash",
            Self::Others => "others",
        }
    }
}

impl TryFrom<&str> for Category {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "groceries" => Ok(Self::Groceries),
            "rent" => Ok(Self::Rent),
            "utilities" => Ok(Self::Utilities),
            "transportation" => Ok(Self::Transportation),
            "entertainment" => Ok(Self::Entertainment),
            "dining" => Ok(Self::Dining),
            "health" => Ok(Self::Health),
            "shopping" => Ok(Self::Shopping),
            "school" => Ok(Self::School),
            "wages" => Ok(Self::Wages),
            "support" => Ok(Self::Support),
            "savings" => Ok(Self::Savings),
            "transfers" => Ok(Self::Transfers),
            "personal" => Ok(Self::Personal),
            "clothing" => Ok(Self::Clothing),
            "homecash" => Ok(Self::Homecash),
            "others" => Ok(Self::Others),
            other => Err(EngineError::Validation(format!(
                "invalid category: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: String,
    pub wallet_id: Uuid,
    pub kind: TransactionKind,
    /// Positive magnitude in minor units; direction comes from `kind`.
    pub amount: i64,
    /// Required for expenses, absent for income.
    pub category: Option<Category>,
    /// User-assigned effective date, independent of write time. Used for
    /// statistics bucketing.
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    /// Opaque reference to an uploaded receipt image, if any.
    pub receipt_ref: Option<String>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: String,
        wallet_id: Uuid,
        kind: TransactionKind,
        amount: i64,
        category: Option<Category>,
        occurred_at: DateTime<Utc>,
        note: Option<String>,
        receipt_ref: Option<String>,
    ) -> ResultEngine<Self> {
        validate_fields(kind, amount, category)?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            wallet_id,
            kind,
            amount,
            category: match kind {
                TransactionKind::Expense => category,
                TransactionKind::Income => None,
            },
            occurred_at,
            note,
            receipt_ref,
        })
    }

    /// The transaction's contribution to its wallet's balance: `+amount` for
    /// income, `-amount` for expense.
    #[must_use]
    pub fn signed_amount(&self) -> i64 {
        match self.kind {
            TransactionKind::Income => self.amount,
            TransactionKind::Expense => -self.amount,
        }
    }
}

/// Checks the kind/amount/category constraints shared by create and update.
pub(crate) fn validate_fields(
    kind: TransactionKind,
    amount: i64,
    category: Option<Category>,
) -> ResultEngine<()> {
    if amount <= 0 {
        return Err(EngineError::Validation(
            "amount must be > 0".to_string(),
        ));
    }
    if kind == TransactionKind::Expense && category.is_none() {
        return Err(EngineError::Validation(
            "expense requires a category".to_string(),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub wallet_id: String,
    pub kind: String,
    pub amount: i64,
    pub category: Option<String>,
    pub occurred_at: DateTimeUtc,
    pub note: Option<String>,
    pub receipt_ref: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallets::Entity",
        from = "Column::WalletId",
        to = "super::wallets::Column::Id",
        on_update = "NoAction",
        on_delete = "NoAction"
    )]
    Wallets,
}

impl Related<super::wallets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallets.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            user_id: ActiveValue::Set(tx.user_id.clone()),
            wallet_id: ActiveValue::Set(tx.wallet_id.to_string()),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            amount: ActiveValue::Set(tx.amount),
            category: ActiveValue::Set(tx.category.map(|c| c.as_str().to_string())),
            occurred_at: ActiveValue::Set(tx.occurred_at),
            note: ActiveValue::Set(tx.note.clone()),
            receipt_ref: ActiveValue::Set(tx.receipt_ref.clone()),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("transaction not exists".to_string()))?,
            user_id: model.user_id,
            wallet_id: Uuid::parse_str(&model.wallet_id)
                .map_err(|_| EngineError::NotFound("wallet not exists".to_string()))?,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            amount: model.amount,
            category: model
                .category
                .as_deref()
                .map(Category::try_from)
                .transpose()?,
            occurred_at: model.occurred_at,
            note: model.note,
            receipt_ref: model.receipt_ref,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn expense_requires_category() {
        let result = Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            TransactionKind::Expense,
            100,
            None,
            Utc.timestamp_opt(0, 0).unwrap(),
            None,
            None,
        );
        assert_eq!(
            result.unwrap_err(),
            EngineError::Validation("expense requires a category".to_string())
        );
    }

    #[test]
    fn income_drops_category() {
        let tx = Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            TransactionKind::Income,
            100,
            Some(Category::Groceries),
            Utc.timestamp_opt(0, 0).unwrap(),
            None,
            None,
        )
        .unwrap();
        assert_eq!(tx.category, None);
        assert_eq!(tx.signed_amount(), 100);
    }

    #[test]
    fn non_positive_amount_rejected() {
        for amount in [0, -5] {
            let result = Transaction::new(
                "alice".to_string(),
                Uuid::new_v4(),
                TransactionKind::Income,
                amount,
                None,
                Utc.timestamp_opt(0, 0).unwrap(),
                None,
                None,
            );
            assert!(result.is_err());
        }
    }

    #[test]
    fn expense_contribution_is_negative() {
        let tx = Transaction::new(
            "alice".to_string(),
            Uuid::new_v4(),
            TransactionKind::Expense,
            250,
            Some(Category::Dining),
            Utc.timestamp_opt(0, 0).unwrap(),
            None,
            None,
        )
        .unwrap();
        assert_eq!(tx.signed_amount(), -250);
    }
}
