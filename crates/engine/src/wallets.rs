//! The module contains the `Wallet` struct and its persistence model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use uuid::Uuid;

use crate::{Currency, EngineError};

/// A wallet.
///
/// A wallet is a money container owned by a single user: a physical wallet, a
/// bank account, or anything else money flows in and out of. Besides its
/// identity it carries three denormalized fields derived from its
/// transactions: the running `balance` and the cumulative `total_income` /
/// `total_expenses`. The engine's write operations are the only code allowed
/// to touch those three fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wallet {
    /// Stable identifier, generated once and persisted.
    pub id: Uuid,
    /// Owner identifier, assigned by the external identity provider.
    pub user_id: String,
    pub name: String,
    /// Opaque reference to an uploaded icon, if any.
    pub image_ref: Option<String>,
    pub currency: Currency,
    /// Running net balance in minor units.
    ///
    /// Always equals `total_income - total_expenses` after a committed
    /// mutation.
    pub balance: i64,
    pub total_income: i64,
    pub total_expenses: i64,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// Creates a wallet with all balance fields seeded to zero.
    pub fn new(
        user_id: String,
        name: String,
        currency: Currency,
        image_ref: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            image_ref,
            currency,
            balance: 0,
            total_income: 0,
            total_expenses: 0,
            created_at,
        }
    }

    /// Whether the denormalized fields satisfy the ledger invariant.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.balance == self.total_income - self.total_expenses
            && self.total_income >= 0
            && self.total_expenses >= 0
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "wallets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub image_ref: Option<String>,
    pub currency: String,
    pub balance: i64,
    pub total_income: i64,
    pub total_expenses: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Wallet> for ActiveModel {
    fn from(value: &Wallet) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            user_id: ActiveValue::Set(value.user_id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            image_ref: ActiveValue::Set(value.image_ref.clone()),
            currency: ActiveValue::Set(value.currency.code().to_string()),
            balance: ActiveValue::Set(value.balance),
            total_income: ActiveValue::Set(value.total_income),
            total_expenses: ActiveValue::Set(value.total_expenses),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl TryFrom<Model> for Wallet {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::NotFound("wallet not exists".to_string()))?,
            user_id: model.user_id,
            name: model.name,
            image_ref: model.image_ref,
            currency: Currency::try_from(model.currency.as_str()).unwrap_or_default(),
            balance: model.balance,
            total_income: model.total_income,
            total_expenses: model.total_expenses,
            created_at: model.created_at,
        })
    }
}
