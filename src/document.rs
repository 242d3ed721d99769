use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Context;
use clap::ValueEnum;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use time::Date;

use crate::{CapitalGainRecord, Result, OUTPUT_DATE_FMT, STT_PAID, TRANSACTION_TYPE};

const INDENT: usize = 4;

const ROOT_TAG: &str = "CG_Details";
const PAN_TAG: &str = "PAN";
const AY_TAG: &str = "AY";
const IN_INR_TAG: &str = "In_INR";
const CG_INR_TAG: &str = "cg_INR";
const ENTRY_TAG: &str = "CG";

const ENTRY_FIELD_TAGS: [&str; 9] = [
    "Type",
    "Particulars",
    "DateOfSale",
    "SaleValue",
    // The importer expects this spelling.
    "SaleExpences",
    "DateOfPurchase",
    "PurchaseCost",
    "PurchaseExpenses",
    "STT_Paid",
];

/// What goes into the `DateOfSale` element.
///
/// Files produced so far carry the sale value there, and the importer has
/// accepted them, so that stays the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DateOfSale {
    #[default]
    SaleValue,
    SaleDate,
}

/// One `CG` element, with every child already rendered to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapitalGainEntry {
    pub transaction_type: String,
    pub particulars: String,
    pub date_of_sale: String,
    pub sale_value: String,
    pub sale_expenses: String,
    pub date_of_purchase: String,
    pub purchase_cost: String,
    pub purchase_expenses: String,
    pub stt_paid: String,
}

impl CapitalGainEntry {
    fn from_record(record: &CapitalGainRecord, date_of_sale: DateOfSale) -> Result<Self> {
        let date_of_sale = match date_of_sale {
            DateOfSale::SaleValue => record.sale_value.to_string(),
            DateOfSale::SaleDate => format_date(record.sale_date)?,
        };
        Ok(Self {
            transaction_type: TRANSACTION_TYPE.to_string(),
            particulars: record.security.clone(),
            date_of_sale,
            sale_value: record.sale_value.to_string(),
            sale_expenses: record.sale_expense.to_string(),
            date_of_purchase: format_date(record.purchase_date)?,
            purchase_cost: record.indexed_cost.to_string(),
            purchase_expenses: record.purchase_expense.to_string(),
            stt_paid: STT_PAID.to_string(),
        })
    }

    fn values(&self) -> [&str; 9] {
        [
            &self.transaction_type,
            &self.particulars,
            &self.date_of_sale,
            &self.sale_value,
            &self.sale_expenses,
            &self.date_of_purchase,
            &self.purchase_cost,
            &self.purchase_expenses,
            &self.stt_paid,
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    pub pan: String,
    pub assessment_year: String,
    pub entries: Vec<CapitalGainEntry>,
}

impl OutputDocument {
    pub fn new(
        records: &[CapitalGainRecord],
        pan: &str,
        assessment_year: &str,
        date_of_sale: DateOfSale,
    ) -> Result<Self> {
        let entries = records
            .iter()
            .map(|r| CapitalGainEntry::from_record(r, date_of_sale))
            .collect::<Result<_>>()?;
        Ok(Self {
            pan: pan.to_string(),
            assessment_year: assessment_year.to_string(),
            entries,
        })
    }

    /// Serializes the document with a 4-space indent. The two summary
    /// sections are always written empty.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', INDENT);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;
        writer.write_event(Event::Start(BytesStart::new(ROOT_TAG)))?;
        write_text_element(&mut writer, PAN_TAG, &self.pan)?;
        write_text_element(&mut writer, AY_TAG, &self.assessment_year)?;
        writer.write_event(Event::Empty(BytesStart::new(IN_INR_TAG)))?;
        writer.write_event(Event::Empty(BytesStart::new(CG_INR_TAG)))?;
        for entry in &self.entries {
            writer.write_event(Event::Start(BytesStart::new(ENTRY_TAG)))?;
            for (tag, value) in ENTRY_FIELD_TAGS.iter().zip(entry.values()) {
                write_text_element(&mut writer, tag, value)?;
            }
            writer.write_event(Event::End(BytesEnd::new(ENTRY_TAG)))?;
        }
        writer.write_event(Event::End(BytesEnd::new(ROOT_TAG)))?;

        let mut xml =
            String::from_utf8(writer.into_inner()).context("serialized document is not UTF-8")?;
        xml.push('\n');
        Ok(xml)
    }
}

fn format_date(date: Date) -> Result<String> {
    Ok(date.format(OUTPUT_DATE_FMT)?)
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, tag: &str, value: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

pub fn build_xml(
    records: &[CapitalGainRecord],
    pan: &str,
    assessment_year: &str,
    date_of_sale: DateOfSale,
) -> Result<String> {
    OutputDocument::new(records, pan, assessment_year, date_of_sale)?.to_xml()
}

/// Writes the document to `file_path`, replacing any existing file, and
/// returns the absolute path written.
pub fn write_xml<P: AsRef<Path>>(xml: &str, file_path: P) -> Result<PathBuf> {
    let file_path = file_path.as_ref();
    fs::write(file_path, xml)
        .with_context(|| format!("failed to write {}", file_path.display()))?;
    let saved = fs::canonicalize(file_path)
        .with_context(|| format!("failed to resolve {}", file_path.display()))?;
    println!("File saved!.. {}", saved.display());
    Ok(saved)
}
