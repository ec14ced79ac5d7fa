//! Column names of the transaction tables and the fixed non-feature list.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

pub const TXN_ID: &str = "txn_id";
pub const TIMESTAMP: &str = "timestamp";
pub const USER_ID: &str = "user_id";
pub const MERCHANT_ID: &str = "merchant_id";
pub const AMOUNT: &str = "amount";
pub const DEVICE_TYPE: &str = "device_type";
pub const COUNTRY: &str = "country";
pub const LABEL: &str = "label_fraud";

pub const FRAUD_PROB: &str = "fraud_prob";
pub const FRAUD_PRED: &str = "fraud_pred";
pub const ANOMALY_FLAG: &str = "anomaly_flag";
pub const ANOMALY_SCORE: &str = "anomaly_score";

pub const HOUR_OF_DAY: &str = "hour_of_day";
pub const LOG_AMOUNT: &str = "log_amount";

/// Columns that never enter a model, in the order they are checked.
pub const EXCLUDED_COLUMNS: [&str; 7] = [
    TXN_ID,
    TIMESTAMP,
    USER_ID,
    MERCHANT_ID,
    DEVICE_TYPE,
    COUNTRY,
    LABEL,
];

/// Pass-through columns copied into both prediction and anomaly tables.
pub const OUTPUT_KEY_COLUMNS: [&str; 6] = [TXN_ID, TIMESTAMP, USER_ID, MERCHANT_ID, AMOUNT, LABEL];

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

/// Parses the timestamp layouts accepted in input tables.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
