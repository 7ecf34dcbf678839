use chrono::NaiveDateTime;
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::Serialize;
use std::{fmt, path::PathBuf};
use thiserror::Error;

pub const DATA_DIR: &str = "data";
pub const OKX_FILE: &str = "OKX_account_statement.csv";
pub const BINANCE_FILE: &str = "Binance_account_statement.csv";
pub const OUTPUT_FILE: &str = "account_statement.csv";
pub const DEFAULT_OUTPUT_FILE: &str = "combined_account_statement.csv";

/// Decimal places kept on derived prices.
pub const PRICE_DIGITS: u32 = 8;

/// Output dates are written in this shape.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column order of the combined statement.
pub const HEADER: [&str; 10] = [
    "trade_number",
    "date",
    "platform",
    "transaction_type",
    "amount",
    "price",
    "currency",
    "transfer_method",
    "order_invoice_number",
    "platform_fee",
];

/// A platform export as read from disk: the header line plus every data line,
/// untyped. Columns are looked up by name when mapping.
#[derive(Debug, Clone)]
pub(crate) struct Table {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
}

impl Table {
    pub fn column_index(&self, name: &str) -> Result<usize, Error> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Platform {
    #[serde(rename = "OKX")]
    Okx,
    Binance,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Okx => "OKX",
            Platform::Binance => "Binance",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the unified account statement. `D` is the date representation:
/// the mapper produces the raw platform string, the combiner turns it into a
/// `NaiveDateTime` before sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AccountStatementRecord<D = NaiveDateTime> {
    /// Never filled by any platform; kept so the output has a stable layout.
    pub trade_number: Option<String>,
    pub date: D,
    pub platform: Platform,
    pub transaction_type: String,
    pub amount: Decimal,
    pub price: Decimal,
    pub currency: String,
    pub transfer_method: String,
    pub order_invoice_number: String,
    pub platform_fee: Decimal,
}

pub(crate) type MappedRecord = AccountStatementRecord<String>;

impl MappedRecord {
    pub fn with_date(self, date: NaiveDateTime) -> AccountStatementRecord {
        AccountStatementRecord {
            trade_number: self.trade_number,
            date,
            platform: self.platform,
            transaction_type: self.transaction_type,
            amount: self.amount,
            price: self.price,
            currency: self.currency,
            transfer_method: self.transfer_method,
            order_invoice_number: self.order_invoice_number,
            platform_fee: self.platform_fee,
        }
    }
}

/// Combined statement, sorted ascending by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AccountStatementTable {
    pub records: Vec<AccountStatementRecord>,
}

/// Serialization proxy for `AccountStatementRecord`: formats the date and
/// borrows the strings. Field order must follow `HEADER`.
#[derive(Serialize)]
pub(crate) struct AccountStatementRow<'a> {
    pub trade_number: Option<&'a str>,
    pub date: String,
    pub platform: Platform,
    pub transaction_type: &'a str,
    pub amount: Decimal,
    pub price: Decimal,
    pub currency: &'a str,
    pub transfer_method: &'a str,
    pub order_invoice_number: &'a str,
    pub platform_fee: Decimal,
}

impl<'a> From<&'a AccountStatementRecord> for AccountStatementRow<'a> {
    fn from(record: &'a AccountStatementRecord) -> Self {
        Self {
            trade_number: record.trade_number.as_deref(),
            date: record.date.format(DATE_FORMAT).to_string(),
            platform: record.platform,
            transaction_type: &record.transaction_type,
            amount: record.amount,
            price: record.price,
            currency: &record.currency,
            transfer_method: &record.transfer_method,
            order_invoice_number: &record.order_invoice_number,
            platform_fee: record.platform_fee,
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column `{0}` is missing")]
    MissingColumn(String),
    #[error("Invalid number `{value}` in column `{column}` (line {line})")]
    InvalidNumber {
        column: String,
        line: u64,
        value: String,
    },
    #[error("Unparseable date `{0}`")]
    InvalidDate(String),
    #[error("Division by zero: column `{column}` is 0 (line {line})")]
    ZeroDivision { column: String, line: u64 },
    #[error("Numeric overflow computing `{column}` (line {line})")]
    Overflow { column: String, line: u64 },
}

#[cfg(test)]
mod tests {
    use super::{Error, Platform, Table};
    use csv::StringRecord;

    #[test]
    fn platform_tags() {
        assert_eq!(Platform::Okx.to_string(), "OKX");
        assert_eq!(Platform::Binance.to_string(), "Binance");
    }

    #[test]
    fn missing_column() {
        let table = Table {
            headers: StringRecord::from(vec!["Status", "Volume"]),
            rows: vec![],
        };
        assert_eq!(table.column_index("Volume").unwrap(), 1);
        assert!(matches!(
            table.column_index("Amount"),
            Err(Error::MissingColumn(column)) if column == "Amount"
        ));
    }
}
