use crate::data::{Error, MappedRecord, Platform, Table, PRICE_DIGITS};
use csv::StringRecord;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

/// How a text field of the statement is derived from a platform row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Text {
    Column(&'static str),
    /// `then` when `column` equals `value`, the column's own value otherwise.
    Replace {
        column: &'static str,
        value: &'static str,
        then: &'static str,
    },
    /// `then` when `column` equals `value`, `otherwise` otherwise.
    Choose {
        column: &'static str,
        value: &'static str,
        then: &'static str,
        otherwise: &'static str,
    },
}

/// How a decimal field of the statement is derived from a platform row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Number {
    Column(&'static str),
    /// Like `Column`, but a blank cell reads as zero.
    ColumnOrZero(&'static str),
    /// `numerator / denominator`, rounded to `PRICE_DIGITS`.
    Ratio {
        numerator: &'static str,
        denominator: &'static str,
    },
    Zero,
}

/// Everything that differs between two platform exports. One generic function,
/// `create_account_statement`, consumes it; adding a platform means adding a
/// descriptor, not a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlatformMapping {
    pub platform: Platform,
    pub status_column: &'static str,
    pub completed: &'static [&'static str],
    pub date: &'static str,
    pub transaction_type: Text,
    pub amount: Number,
    pub price: Number,
    pub currency: Text,
    pub transfer_method: Text,
    pub platform_fee: Number,
    pub order_invoice_number: Text,
}

pub(crate) const OKX: PlatformMapping = PlatformMapping {
    platform: Platform::Okx,
    status_column: "Status",
    completed: &["Fulfilled"],
    date: "Created date",
    transaction_type: Text::Column("Order type"),
    amount: Number::Column("Volume"),
    price: Number::Ratio {
        numerator: "Amount",
        denominator: "Volume",
    },
    currency: Text::Column("Currency"),
    transfer_method: Text::Replace {
        column: "Payment method",
        value: "Bank Transfer",
        then: "SEPA",
    },
    platform_fee: Number::Zero,
    order_invoice_number: Text::Column("Order No"),
};

pub(crate) const BINANCE: PlatformMapping = PlatformMapping {
    platform: Platform::Binance,
    status_column: "Status",
    completed: &["Completed", "Paid"],
    date: "Created Time",
    transaction_type: Text::Column("Order Type"),
    amount: Number::Column("Quantity"),
    price: Number::Column("Price"),
    currency: Text::Column("Fiat Type"),
    transfer_method: Text::Choose {
        column: "Fiat Type",
        value: "EUR",
        then: "SEPA",
        otherwise: "ZEN",
    },
    platform_fee: Number::ColumnOrZero("Fee Amount"),
    order_invoice_number: Text::Column("Order Number"),
};

pub(crate) fn mapping_for(platform: Platform) -> &'static PlatformMapping {
    match platform {
        Platform::Okx => &OKX,
        Platform::Binance => &BINANCE,
    }
}

impl Text {
    fn column(&self) -> &'static str {
        match *self {
            Text::Column(column)
            | Text::Replace { column, .. }
            | Text::Choose { column, .. } => column,
        }
    }

    fn derive(&self, row: &Row) -> Result<String, Error> {
        let cell = row.get(self.column())?;
        Ok(match *self {
            Text::Column(_) => cell.to_string(),
            Text::Replace { value, then, .. } => (if cell == value { then } else { cell }).to_string(),
            Text::Choose {
                value,
                then,
                otherwise,
                ..
            } => (if cell == value { then } else { otherwise }).to_string(),
        })
    }
}

impl Number {
    fn columns(&self) -> Vec<&'static str> {
        match *self {
            Number::Column(column) | Number::ColumnOrZero(column) => vec![column],
            Number::Ratio {
                numerator,
                denominator,
            } => vec![numerator, denominator],
            Number::Zero => vec![],
        }
    }

    /// Equal values come out with the same scale (`200.00 / 2.0` and `200 / 2`
    /// both give `100`).
    fn derive(&self, row: &Row) -> Result<Decimal, Error> {
        let value = match *self {
            Number::Column(column) => row.decimal(column)?,
            Number::ColumnOrZero(column) if row.get(column)?.is_empty() => Decimal::ZERO,
            Number::ColumnOrZero(column) => row.decimal(column)?,
            Number::Ratio {
                numerator,
                denominator,
            } => {
                let divisor = row.decimal(denominator)?;
                if divisor.is_zero() {
                    return Err(Error::ZeroDivision {
                        column: denominator.to_string(),
                        line: row.line(),
                    });
                }
                let ratio = row
                    .decimal(numerator)?
                    .checked_div(divisor)
                    .ok_or_else(|| Error::Overflow {
                        column: numerator.to_string(),
                        line: row.line(),
                    })?;
                ratio.round_dp(PRICE_DIGITS)
            }
            Number::Zero => Decimal::ZERO,
        };
        Ok(value.normalize())
    }
}

impl PlatformMapping {
    /// Every source column the descriptor reads.
    fn columns(&self) -> Vec<&'static str> {
        let mut columns = vec![
            self.date,
            self.transaction_type.column(),
            self.currency.column(),
            self.transfer_method.column(),
            self.order_invoice_number.column(),
        ];
        columns.extend(self.amount.columns());
        columns.extend(self.price.columns());
        columns.extend(self.platform_fee.columns());
        columns
    }
}

/// A platform row with its column positions resolved.
struct Row<'a> {
    record: &'a StringRecord,
    index: &'a HashMap<&'static str, usize>,
}

impl Row<'_> {
    fn get(&self, column: &str) -> Result<&str, Error> {
        let position = self
            .index
            .get(column)
            .ok_or_else(|| Error::MissingColumn(column.to_string()))?;
        Ok(self.record.get(*position).unwrap_or_default())
    }

    fn decimal(&self, column: &str) -> Result<Decimal, Error> {
        let cell = self.get(column)?;
        cell.parse::<Decimal>()
            .or_else(|_| Decimal::from_scientific(cell))
            .map_err(|_| Error::InvalidNumber {
                column: column.to_string(),
                line: self.line(),
                value: cell.to_string(),
            })
    }

    fn line(&self) -> u64 {
        self.record.position().map_or(0, |position| position.line())
    }
}

/// Maps every row of a (filtered) platform export to one statement record.
/// Every column the descriptor names must be present, even when the table has
/// no rows.
pub(crate) fn create_account_statement(
    table: &Table,
    mapping: &PlatformMapping,
) -> Result<Vec<MappedRecord>, Error> {
    let index = mapping
        .columns()
        .into_iter()
        .map(|column| Ok((column, table.column_index(column)?)))
        .collect::<Result<HashMap<_, _>, Error>>()?;
    let records = table
        .rows
        .iter()
        .map(|record| {
            let row = Row {
                record,
                index: &index,
            };
            Ok(MappedRecord {
                trade_number: None,
                date: row.get(mapping.date)?.to_string(),
                platform: mapping.platform,
                transaction_type: mapping.transaction_type.derive(&row)?,
                amount: mapping.amount.derive(&row)?,
                price: mapping.price.derive(&row)?,
                currency: mapping.currency.derive(&row)?,
                transfer_method: mapping.transfer_method.derive(&row)?,
                order_invoice_number: mapping.order_invoice_number.derive(&row)?,
                platform_fee: mapping.platform_fee.derive(&row)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    debug!(platform = %mapping.platform, records = records.len(), "mapped");
    Ok(records)
}
