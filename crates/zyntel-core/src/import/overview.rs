// Entities of the `overview` profile: test catalog, encounters, time-outs.

use chrono::{NaiveDateTime, NaiveTime};
use serde::Deserialize;
use sqlx::{Postgres, Transaction};
use tracing::debug;

use super::{ConflictPolicy, Entity, PgQuery};
use crate::dates::{self, DateParse};
use crate::error::Result;
use crate::parse::loose;

/// Sentinel stored when an encounter carries no `HospitalID`.
pub const DEFAULT_HOSPITAL_ID: &str = "default";

/// One line of `meta.csv` (`TestName,TAT,LabSection,Price`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogRow {
    #[serde(rename = "TestName", default, deserialize_with = "loose::text")]
    pub test_name: Option<String>,
    #[serde(rename = "TAT", default, deserialize_with = "loose::int_or_zero")]
    pub tat: i64,
    #[serde(rename = "LabSection", default, deserialize_with = "loose::text")]
    pub lab_section: Option<String>,
    #[serde(rename = "Price", default, deserialize_with = "loose::int_or_zero")]
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub test_name: String,
    pub tat_minutes: i64,
    pub lab_section: Option<String>,
    pub price: i64,
}

impl Entity for CatalogEntry {
    type Row = CatalogRow;

    const TABLE: &'static str = "LabTestsOverview";
    const COLUMNS: &'static [&'static str] = &["test_name", "tat", "lab_section", "price"];
    const KEY: &'static [&'static str] = &["test_name"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["tat", "lab_section", "price"];
    const POLICY: ConflictPolicy = ConflictPolicy::IgnoreOnConflict;

    fn from_row(row: CatalogRow) -> Option<Self> {
        let Some(test_name) = row.test_name else {
            debug!("Skipping catalog row without TestName");
            return None;
        };
        Some(Self {
            test_name,
            tat_minutes: row.tat,
            lab_section: row.lab_section,
            price: row.price,
        })
    }

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.test_name)
            .bind(self.tat_minutes)
            .bind(&self.lab_section)
            .bind(self.price)
    }
}

/// One object of `data.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EncounterRow {
    #[serde(rename = "LabNo", default, deserialize_with = "loose::text")]
    pub lab_no: Option<String>,
    #[serde(rename = "TestName", default, deserialize_with = "loose::text")]
    pub test_name: Option<String>,
    #[serde(rename = "Patient", default, deserialize_with = "loose::text")]
    pub patient: Option<String>,
    #[serde(rename = "EncounterDate", default, deserialize_with = "loose::text")]
    pub encounter_date: Option<String>,
    #[serde(rename = "Src", default, deserialize_with = "loose::text")]
    pub src: Option<String>,
    #[serde(rename = "InvoiceNo", default, deserialize_with = "loose::text")]
    pub invoice_no: Option<String>,
    #[serde(rename = "HospitalID", default, deserialize_with = "loose::text")]
    pub hospital_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encounter {
    pub lab_no: String,
    pub test_name: String,
    pub patient: Option<String>,
    pub encounter_date: NaiveDateTime,
    pub hospital_unit: Option<String>,
    pub invoice_no: Option<String>,
    pub hospital_id: String,
}

impl Entity for Encounter {
    type Row = EncounterRow;

    const TABLE: &'static str = "LabEncounters";
    const COLUMNS: &'static [&'static str] = &[
        "lab_no",
        "test_name",
        "patient",
        "encounter_date",
        "hospital_unit",
        "invoice_no",
        "hospital_id",
    ];
    const KEY: &'static [&'static str] = &["lab_no"];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "test_name",
        "patient",
        "encounter_date",
        "hospital_unit",
        "invoice_no",
        "hospital_id",
    ];
    const POLICY: ConflictPolicy = ConflictPolicy::IgnoreOnConflict;

    fn from_row(row: EncounterRow) -> Option<Self> {
        let lab_no = row.lab_no?;
        let Some(test_name) = row.test_name else {
            debug!(%lab_no, "Skipping encounter without TestName");
            return None;
        };
        let raw_date = row.encounter_date.unwrap_or_default();
        let encounter_date = match dates::parse_date(&raw_date) {
            DateParse::Parsed(date) => date.and_time(NaiveTime::MIN),
            DateParse::Unparsable(raw) => {
                debug!(%lab_no, raw = %raw, "Skipping encounter with unparsable EncounterDate");
                return None;
            }
        };

        Some(Self {
            lab_no,
            test_name,
            patient: row.patient,
            encounter_date,
            hospital_unit: row.src,
            invoice_no: row.invoice_no,
            hospital_id: row
                .hospital_id
                .unwrap_or_else(|| DEFAULT_HOSPITAL_ID.to_string()),
        })
    }

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.lab_no)
            .bind(&self.test_name)
            .bind(&self.patient)
            .bind(self.encounter_date)
            .bind(&self.hospital_unit)
            .bind(&self.invoice_no)
            .bind(&self.hospital_id)
    }
}

/// One line of `TimeOut.csv` (`Lab_No,Time_Out`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeOutRow {
    #[serde(rename = "Lab_No", default, deserialize_with = "loose::text")]
    pub lab_no: Option<String>,
    #[serde(rename = "Time_Out", default, deserialize_with = "loose::text")]
    pub time_out: Option<String>,
}

/// Completion timestamp applied to an existing encounter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeOutUpdate {
    pub lab_no: String,
    pub time_out: NaiveDateTime,
}

impl TimeOutUpdate {
    pub fn from_row(row: TimeOutRow) -> Option<Self> {
        let lab_no = row.lab_no?;
        match dates::parse_datetime(&row.time_out.unwrap_or_default()) {
            DateParse::Parsed(time_out) => Some(Self { lab_no, time_out }),
            DateParse::Unparsable(raw) => {
                debug!(%lab_no, raw = %raw, "Skipping time-out with unparsable Time_Out");
                None
            }
        }
    }
}

/// Sets `time_out` on matching encounters. Unknown lab numbers update nothing.
pub async fn apply_time_outs(
    tx: &mut Transaction<'_, Postgres>,
    updates: &[TimeOutUpdate],
) -> Result<u64> {
    let mut written = 0;
    for update in updates {
        let result = sqlx::query("UPDATE LabEncounters SET time_out = $1 WHERE lab_no = $2")
            .bind(update.time_out)
            .bind(&update.lab_no)
            .execute(&mut **tx)
            .await?;
        written += result.rows_affected();
    }
    Ok(written)
}
