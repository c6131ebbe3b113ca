//! Synthetic transaction generation.
//!
//! Produces transactions with:
//! - A uniformly chosen type and a type-dependent amount
//! - Random person or organization counterparties
//! - A crude fraud score that grows with the amount

use chrono::{DateTime, Utc};
use paysim_model::{Transaction, TransactionType};
use rand::prelude::*;

const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ID_SUFFIX_LEN: usize = 9;

/// Upper bound of the random part of the fraud score.
const FRAUD_BASE_MAX: f64 = 30.0;
/// Weight of the amount-proportional part of the fraud score.
const FRAUD_AMOUNT_WEIGHT: f64 = 20.0;

/// Inclusive amount range for one transaction type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountRange {
    /// Smallest amount.
    pub min: f64,
    /// Largest amount.
    pub max: f64,
}

impl AmountRange {
    /// Creates a new range.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draws an amount rounded to cents.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let raw = if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        };
        (raw * 100.0).round() / 100.0
    }
}

/// Configurable generator of synthetic transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFactory {
    /// Currency of every generated transaction.
    pub currency: String,
    /// Amount range for transfers.
    pub transfer: AmountRange,
    /// Amount range for payments.
    pub payment: AmountRange,
    /// Amount range for deposits.
    pub deposit: AmountRange,
    /// Amount range for withdrawals.
    pub withdrawal: AmountRange,
    /// First names for person counterparties.
    pub first_names: Vec<String>,
    /// Last names for person counterparties.
    pub last_names: Vec<String>,
    /// Organization names used as payment recipients.
    pub companies: Vec<String>,
}

impl Default for TransactionFactory {
    fn default() -> Self {
        Self {
            currency: paysim_model::transaction::DEFAULT_CURRENCY.to_string(),
            transfer: AmountRange::new(100.0, 10_000.0),
            payment: AmountRange::new(10.0, 500.0),
            deposit: AmountRange::new(500.0, 25_000.0),
            withdrawal: AmountRange::new(50.0, 2_000.0),
            first_names: to_strings(&[
                "James", "Sarah", "Michael", "Emma", "David", "Olivia", "John", "Sophia",
                "Robert", "Ava",
            ]),
            last_names: to_strings(&[
                "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis",
                "Rodriguez", "Martinez",
            ]),
            companies: to_strings(&[
                "TechCorp",
                "GlobalBank",
                "RetailMax",
                "FoodMart",
                "AutoDrive",
                "HealthPlus",
                "EduLearn",
                "TravelNow",
            ]),
        }
    }
}

impl TransactionFactory {
    /// Creates a factory with the default ranges and name pools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the currency.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Replaces the amount range for one transaction type.
    #[must_use]
    pub fn with_amount_range(mut self, kind: TransactionType, range: AmountRange) -> Self {
        match kind {
            TransactionType::Transfer => self.transfer = range,
            TransactionType::Payment => self.payment = range,
            TransactionType::Deposit => self.deposit = range,
            TransactionType::Withdrawal => self.withdrawal = range,
        }
        self
    }

    /// Returns the amount range for `kind`.
    #[must_use]
    pub const fn amount_range(&self, kind: TransactionType) -> AmountRange {
        match kind {
            TransactionType::Transfer => self.transfer,
            TransactionType::Payment => self.payment,
            TransactionType::Deposit => self.deposit,
            TransactionType::Withdrawal => self.withdrawal,
        }
    }

    /// Generates a new transaction created at `now`.
    pub fn create<R: Rng + ?Sized>(&self, rng: &mut R, now: DateTime<Utc>) -> Transaction {
        let kind = *TransactionType::ALL
            .choose(rng)
            .unwrap_or(&TransactionType::Transfer);
        let range = self.amount_range(kind);
        let amount = range.sample(rng);
        let sender = self.person_name(rng);
        let recipient = if kind == TransactionType::Payment {
            pick(&self.companies, rng)
        } else {
            self.person_name(rng)
        };
        let base = rng.gen_range(0.0..FRAUD_BASE_MAX);
        let fraud_score = fraud_score(base, amount, range.max);
        let id = mint_id(rng, now);

        Transaction::new(id, kind, amount, now)
            .with_currency(&self.currency)
            .with_sender(sender)
            .with_recipient(recipient)
            .with_fraud_score(fraud_score)
    }

    fn person_name<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        format!(
            "{} {}",
            pick(&self.first_names, rng),
            pick(&self.last_names, rng)
        )
    }
}

/// Combines a random base and an amount-proportional component into a 0-100 score.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn fraud_score(base: f64, amount: f64, range_max: f64) -> u8 {
    let amount_factor = if range_max > 0.0 {
        (amount / range_max) * FRAUD_AMOUNT_WEIGHT
    } else {
        0.0
    };
    (base + amount_factor).round().clamp(0.0, 100.0) as u8
}

/// Mints a transaction id of the form `TXN-<unix millis>-<9 base-36 chars>`.
pub fn mint_id<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("TXN-{}-{suffix}", now.timestamp_millis())
}

fn pick<R: Rng + ?Sized>(pool: &[String], rng: &mut R) -> String {
    pool.choose(rng).cloned().unwrap_or_default()
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}
