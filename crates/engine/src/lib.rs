//! Core ledger engine for Centavo.
//!
//! The engine owns the canonical record of wallets and their transactions and
//! keeps each wallet's denormalized totals (`balance`, `total_income`,
//! `total_expenses`) consistent with its ledger across creates, updates, and
//! deletes. It also rolls raw transactions into weekly/monthly/yearly bucket
//! series and shapes them for bar-chart rendering.
//!
//! All monetary values are `i64` minor units (see [`Money`]); the ledger never
//! touches floating point.

pub use chart::{Bar, BarRole, Spacing, YAxis, build_nice_y_axis, normalize_bar_series};
pub use commands::{NewTransactionCmd, NewWalletCmd, UpdateTransactionCmd, UpdateWalletCmd};
pub use currency::Currency;
pub use error::EngineError;
pub use events::ChangeEvent;
pub use money::Money;
pub use ops::{Engine, EngineBuilder, TotalsReport, TransactionListFilter};
pub use stats::{Bucket, Granularity, StatsReport, StatsSession, StatsTicket};
pub use transactions::{Category, Transaction, TransactionKind};
pub use wallets::Wallet;

mod chart;
mod commands;
mod currency;
mod error;
mod events;
mod money;
mod ops;
mod stats;
mod transactions;
mod wallets;

type ResultEngine<T> = Result<T, EngineError>;
