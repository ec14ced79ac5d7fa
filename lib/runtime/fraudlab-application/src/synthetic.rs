//! Deterministic synthetic transactions for demos and end-to-end checks.
//!
//! Fraud rows are a fixed share of the table and always carry an amount at
//! or above `fraud_amount_floor`; legitimate rows stay well below it.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fraudlab_domain::TransactionRecord;

const DEVICES: [&str; 3] = ["mobile", "web", "pos"];
const COUNTRIES: [&str; 5] = ["US", "GB", "DE", "IN", "BR"];
const USERS: usize = 200;
const MERCHANTS: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSpec {
    pub rows: usize,
    pub fraud_rate: f64,
    pub fraud_amount_floor: f64,
    pub seed: u64,
    pub start: NaiveDateTime,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            rows: 1000,
            fraud_rate: 0.03,
            fraud_amount_floor: 5000.0,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2025, 8, 1)
                .unwrap_or_default()
                .and_time(NaiveTime::MIN),
        }
    }
}

impl SyntheticSpec {
    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn fraud_rows(&self) -> usize {
        ((self.rows as f64) * self.fraud_rate).round() as usize
    }
}

pub fn generate(spec: &SyntheticSpec) -> Vec<TransactionRecord> {
    let mut rng = StdRng::seed_from_u64(spec.seed);
    let fraud_rows = spec.fraud_rows().min(spec.rows);
    let fraud: HashSet<usize> = rand::seq::index::sample(&mut rng, spec.rows, fraud_rows)
        .into_iter()
        .collect();
    let legit_ceiling = (spec.fraud_amount_floor * 0.6).max(2.0);

    (0..spec.rows)
        .map(|i| {
            let is_fraud = fraud.contains(&i);
            let (amount, merchant_risk, txn_count_24h) = if is_fraud {
                (
                    rng.gen_range(spec.fraud_amount_floor..spec.fraud_amount_floor * 3.0),
                    rng.gen_range(0.3_f64..1.0),
                    rng.gen_range(3..15),
                )
            } else {
                (
                    rng.gen_range(1.0..legit_ceiling),
                    rng.gen_range(0.0_f64..0.6),
                    rng.gen_range(0..8),
                )
            };
            TransactionRecord {
                txn_id: format!("T{i:06}"),
                timestamp: spec.start + Duration::seconds(i as i64 * 97),
                user_id: format!("U{:04}", rng.gen_range(0..USERS)),
                merchant_id: format!("M{:03}", rng.gen_range(0..MERCHANTS)),
                amount: (amount * 100.0).round() / 100.0,
                merchant_risk: (merchant_risk * 1000.0).round() / 1000.0,
                txn_count_24h,
                device_type: DEVICES[rng.gen_range(0..DEVICES.len())].to_string(),
                country: COUNTRIES[rng.gen_range(0..COUNTRIES.len())].to_string(),
                label_fraud: is_fraud,
            }
        })
        .collect()
}
