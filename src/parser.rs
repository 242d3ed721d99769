use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
};

use anyhow::Context;
use csv::{ByteRecord, ReaderBuilder, StringRecord};
use log::{debug, info, warn};
use thiserror::Error;
use time::Date;

use crate::{Result, EXPECTED_FIELDS, HEADER_TOKEN, STATEMENT_DATE_FMT};

const SECURITY: usize = 0;
const QUANTITY: usize = 1;
const SALE_DATE: usize = 2;
const SALE_RATE: usize = 3;
const SALE_VALUE: usize = 4;
const SALE_EXPENSE: usize = 5;
const PURCHASE_DATE: usize = 6;
const PURCHASE_RATE: usize = 7;
const PURCHASE_VALUE: usize = 8;
const PURCHASE_EXPENSE: usize = 9;
const INDEXED_COST: usize = 10;
const PROFIT_LOSS: usize = 11;

static COLUMN_NAMES: [&str; EXPECTED_FIELDS] = [
    "security",
    "quantity",
    "sale date",
    "sale rate",
    "sale value",
    "sale expense",
    "purchase date",
    "purchase rate",
    "purchase value",
    "purchase expense",
    "indexed cost",
    "profit/loss",
];

/// Reasons a statement row is left out of the conversion.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("expected 12 fields, found {0}")]
    FieldCount(usize),
    #[error("security name is empty")]
    EmptySecurity,
    #[error("invalid {column} {value:?}: {source}")]
    Date {
        column: &'static str,
        value: String,
        #[source]
        source: time::error::Parse,
    },
    #[error("invalid {column} {value:?}")]
    Amount { column: &'static str, value: String },
    #[error("row is not valid UTF-8")]
    NotUtf8,
}

/// One sale line of the broker's capital gain statement.
///
/// Monetary columns are truncated toward zero; quantity and profit/loss are
/// kept as the broker wrote them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapitalGainRecord {
    pub security: String,
    pub quantity: String,
    pub sale_date: Date,
    pub sale_rate: i64,
    pub sale_value: i64,
    pub sale_expense: i64,
    pub purchase_date: Date,
    pub purchase_rate: i64,
    pub purchase_value: i64,
    pub purchase_expense: i64,
    pub indexed_cost: i64,
    pub profit_loss: String,
}

impl CapitalGainRecord {
    fn from_row(row: &StringRecord) -> std::result::Result<Self, RowError> {
        if row.len() != EXPECTED_FIELDS {
            return Err(RowError::FieldCount(row.len()));
        }
        let security = field(row, SECURITY);
        if security.is_empty() {
            return Err(RowError::EmptySecurity);
        }
        Ok(Self {
            security: security.to_string(),
            quantity: field(row, QUANTITY).to_string(),
            sale_date: parse_date(row, SALE_DATE)?,
            sale_rate: parse_amount(row, SALE_RATE)?,
            sale_value: parse_amount(row, SALE_VALUE)?,
            sale_expense: parse_amount(row, SALE_EXPENSE)?,
            purchase_date: parse_date(row, PURCHASE_DATE)?,
            purchase_rate: parse_amount(row, PURCHASE_RATE)?,
            purchase_value: parse_amount(row, PURCHASE_VALUE)?,
            purchase_expense: parse_amount(row, PURCHASE_EXPENSE)?,
            indexed_cost: parse_amount(row, INDEXED_COST)?,
            profit_loss: field(row, PROFIT_LOSS).to_string(),
        })
    }
}

#[derive(Debug)]
pub struct SkippedRow {
    /// 1-based line number in the input file.
    pub line: u64,
    pub text: String,
    pub reason: RowError,
}

/// Records accepted from a statement, in input order, plus the rows that were dropped.
#[derive(Debug, Default)]
pub struct ParsedStatement {
    pub records: Vec<CapitalGainRecord>,
    pub skipped: Vec<SkippedRow>,
}

impl ParsedStatement {
    fn skip(&mut self, line: u64, text: String, reason: RowError) {
        warn!("Skipping {text} (line {line}: {reason})");
        self.skipped.push(SkippedRow { line, text, reason });
    }
}

fn field(row: &StringRecord, index: usize) -> &str {
    row[index].trim()
}

fn parse_date(row: &StringRecord, index: usize) -> std::result::Result<Date, RowError> {
    let value = field(row, index);
    Date::parse(value, &STATEMENT_DATE_FMT).map_err(|source| RowError::Date {
        column: COLUMN_NAMES[index],
        value: value.to_string(),
        source,
    })
}

fn parse_amount(row: &StringRecord, index: usize) -> std::result::Result<i64, RowError> {
    let value = field(row, index);
    match value.parse::<f64>() {
        Ok(amount) if amount.is_finite() => Ok(amount.trunc() as i64),
        _ => Err(RowError::Amount {
            column: COLUMN_NAMES[index],
            value: value.to_string(),
        }),
    }
}

fn raw_text(row: &ByteRecord) -> String {
    row.iter()
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join(",")
        .trim()
        .to_string()
}

/// Reads a capital gain statement. The first line is always treated as the
/// header and discarded; malformed rows are logged and skipped.
pub fn read_records<R: io::Read>(reader: R) -> Result<ParsedStatement> {
    let mut reader = BufReader::new(reader);
    reader
        .read_until(b'\n', &mut Vec::new())
        .context("failed to read statement header")?;

    // Rows are plain comma-split lines: quotes carry no meaning.
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut statement = ParsedStatement::default();
    for row in rdr.byte_records() {
        let row = row.context("failed to read statement row")?;
        let line = row.position().map_or(0, |p| p.line() + 1);
        let text = raw_text(&row);
        let Ok(row) = StringRecord::from_byte_record(row) else {
            statement.skip(line, text, RowError::NotUtf8);
            continue;
        };
        if row
            .get(SECURITY)
            .is_some_and(|s| s.trim_start().starts_with(HEADER_TOKEN))
        {
            debug!("ignoring repeated header on line {line}");
            continue;
        }
        match CapitalGainRecord::from_row(&row) {
            Ok(record) => statement.records.push(record),
            Err(reason) => statement.skip(line, text, reason),
        }
    }
    info!(
        "Read {} records, skipped {} rows",
        statement.records.len(),
        statement.skipped.len()
    );
    Ok(statement)
}

pub fn get_records<P: AsRef<Path>>(file_path: P) -> Result<ParsedStatement> {
    let file_path = file_path.as_ref();
    let file = File::open(file_path)
        .with_context(|| format!("failed to open statement {}", file_path.display()))?;
    read_records(file)
        .with_context(|| format!("failed to read statement {}", file_path.display()))
}
