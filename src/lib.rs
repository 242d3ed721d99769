use anyhow::Error;
use time::{format_description::BorrowedFormatItem, macros::format_description};

mod document;
mod parser;

pub use document::{build_xml, write_xml, CapitalGainEntry, DateOfSale, OutputDocument};
pub use parser::{
    get_records, read_records, CapitalGainRecord, ParsedStatement, RowError, SkippedRow,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Label written into every `Type` element.
pub const TRANSACTION_TYPE: &str = "Equity shares in listed companies in India - equity oriented mutual funds(listed - unlisted)in India";
/// Every row in the broker statement has had securities transaction tax deducted.
pub const STT_PAID: &str = "Yes";

const HEADER_TOKEN: &str = "Stock";
const EXPECTED_FIELDS: usize = 12;

static STATEMENT_DATE_FMT: &[BorrowedFormatItem] =
    format_description!("[day padding:none]-[month repr:short case_sensitive:false]-[year]");
static OUTPUT_DATE_FMT: &[BorrowedFormatItem] = format_description!("[day]/[month]/[year]");
