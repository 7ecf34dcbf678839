use crate::data::{
    AccountStatementRow, AccountStatementTable, Error, MappedRecord, DEFAULT_OUTPUT_FILE, HEADER,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use tracing::info;

const DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parses the date shapes the platform exports use. Offsets are normalised to UTC.
pub(crate) fn parse_timestamp(timestamp: &str) -> Result<NaiveDateTime, Error> {
    for format in DATE_TIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(timestamp, format) {
            return Ok(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return Ok(parsed.naive_utc());
    }
    NaiveDate::parse_from_str(timestamp, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN))
        .map_err(|_| Error::InvalidDate(timestamp.to_string()))
}

/// Concatenates the mapped tables, parses their dates and sorts ascending by
/// date. The sort is stable, so equal dates keep their input order.
pub(crate) fn combine<I>(tables: I) -> Result<AccountStatementTable, Error>
where
    I: IntoIterator<Item = Vec<MappedRecord>>,
{
    let mut records = tables
        .into_iter()
        .flatten()
        .map(|record| {
            let date = parse_timestamp(&record.date)?;
            Ok(record.with_date(date))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    records.sort_by_key(|record| record.date);
    Ok(AccountStatementTable { records })
}

/// Basic CSV exporter for the combined statement. The header is written even
/// when there are no records.
pub(crate) fn write_statement<W: std::io::Write>(
    writer: W,
    statement: &AccountStatementTable,
) -> Result<(), Error> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(HEADER)?;
    for record in &statement.records {
        wtr.serialize(AccountStatementRow::from(record))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the statement to `dir/file_name` (`DEFAULT_OUTPUT_FILE` when no name
/// is given), replacing any existing file. Returns the written path.
pub(crate) fn export_account_statement(
    statement: &AccountStatementTable,
    dir: &Path,
    file_name: Option<&str>,
) -> Result<PathBuf, Error> {
    let path = dir.join(file_name.unwrap_or(DEFAULT_OUTPUT_FILE));
    write_statement(File::create(&path)?, statement)?;
    info!(file = %path.display(), records = statement.records.len(), "statement written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::{combine, export_account_statement, parse_timestamp, write_statement};
    use crate::data::{
        AccountStatementTable, Error, MappedRecord, Platform, DEFAULT_OUTPUT_FILE,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record(platform: Platform, date: &str, order: &str) -> MappedRecord {
        MappedRecord {
            trade_number: None,
            date: date.to_string(),
            platform,
            transaction_type: "buy".to_string(),
            amount: dec!(2),
            price: dec!(100),
            currency: "EUR".to_string(),
            transfer_method: "SEPA".to_string(),
            order_invoice_number: order.to_string(),
            platform_fee: dec!(0),
        }
    }

    #[test]
    fn test_parse_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-01-05 10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-05T10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-05 10:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-01-05T12:30:00+02:00").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2024-01-05").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert!(matches!(
            parse_timestamp("yesterday"),
            Err(Error::InvalidDate(date)) if date == "yesterday"
        ));
    }

    #[test]
    fn test_combine_sorts_and_keeps_every_row() {
        let okx = vec![
            record(Platform::Okx, "2024-01-07", "O1"),
            record(Platform::Okx, "2024-01-05 12:00:00", "O2"),
        ];
        let binance = vec![
            record(Platform::Binance, "2024-01-06 08:00:00", "B1"),
            record(Platform::Binance, "2024-01-05 12:00:00", "B2"),
            record(Platform::Binance, "2024-01-01 00:00:01", "B3"),
        ];
        let statement = combine([okx, binance]).unwrap();
        let orders: Vec<_> = statement
            .records
            .iter()
            .map(|r| r.order_invoice_number.as_str())
            .collect();
        // O2 and B2 share a date: input order wins.
        assert_eq!(orders, ["B3", "O2", "B2", "B1", "O1"]);
        assert!(statement
            .records
            .windows(2)
            .all(|pair| pair[0].date <= pair[1].date));

        let resorted = combine([statement
            .records
            .iter()
            .map(|r| record(r.platform, &r.date.to_string(), &r.order_invoice_number))
            .collect::<Vec<_>>()])
        .unwrap();
        assert_eq!(resorted, statement);
    }

    #[test]
    fn test_combine_bad_date() {
        let tables = [vec![record(Platform::Okx, "05/01/2024", "O1")]];
        assert!(matches!(combine(tables), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_write_statement() {
        let statement = combine([vec![
            record(Platform::Binance, "2024-01-06 08:00:00", "B1"),
            record(Platform::Okx, "2024-01-05", "OKX123"),
        ]])
        .unwrap();
        let mut out = Vec::new();
        write_statement(&mut out, &statement).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\
trade_number,date,platform,transaction_type,amount,price,currency,transfer_method,order_invoice_number,platform_fee
,2024-01-05 00:00:00,OKX,buy,2,100,EUR,SEPA,OKX123,0
,2024-01-06 08:00:00,Binance,buy,2,100,EUR,SEPA,B1,0
"
        );
    }

    #[test]
    fn test_write_empty_statement() {
        let mut out = Vec::new();
        write_statement(&mut out, &AccountStatementTable::default()).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "trade_number,date,platform,transaction_type,amount,price,currency,transfer_method,order_invoice_number,platform_fee\n"
        );
    }

    #[test]
    fn test_export_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_OUTPUT_FILE);
        std::fs::write(&path, "stale").unwrap();
        let written =
            export_account_statement(&AccountStatementTable::default(), dir.path(), None).unwrap();
        assert_eq!(written, path);
        assert!(std::fs::read_to_string(&path)
            .unwrap()
            .starts_with("trade_number,date,"));
    }
}
