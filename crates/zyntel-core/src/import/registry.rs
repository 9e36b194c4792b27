// Entities of the `registry` profile. Every table here overwrites on conflict.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use super::{ConflictPolicy, Entity, PgQuery};
use crate::dates;
use crate::parse::loose;

/// One line of `meta.csv` (`id,description,value`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaRow {
    #[serde(default, deserialize_with = "loose::text")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEntry {
    pub id: String,
    pub description: Option<String>,
    pub value: Option<String>,
}

impl Entity for MetaEntry {
    type Row = MetaRow;

    const TABLE: &'static str = "meta_data";
    const COLUMNS: &'static [&'static str] = &["id", "description", "value"];
    const KEY: &'static [&'static str] = &["id"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["description", "value"];
    const POLICY: ConflictPolicy = ConflictPolicy::OverwriteOnConflict;

    fn from_row(row: MetaRow) -> Option<Self> {
        Some(Self {
            id: row.id?,
            description: row.description,
            value: row.value,
        })
    }

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.id)
            .bind(&self.description)
            .bind(&self.value)
    }
}

/// One line of the registry `TimeOut.csv`. Stage times stay raw text until
/// [`TimeoutRecord::from_row`] parses them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TimeoutRow {
    #[serde(default, deserialize_with = "loose::text")]
    pub lab_id: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub patient_id: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub test_name: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub collection_time: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub reception_time: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub analysis_time: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub validation_time: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub result_time: Option<String>,
    #[serde(default, deserialize_with = "loose::int")]
    pub tat_minutes: Option<i64>,
    #[serde(default, deserialize_with = "loose::text")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutRecord {
    pub lab_id: Option<String>,
    pub patient_id: String,
    pub test_name: String,
    pub collection_time: Option<NaiveDateTime>,
    pub reception_time: Option<NaiveDateTime>,
    pub analysis_time: Option<NaiveDateTime>,
    pub validation_time: Option<NaiveDateTime>,
    pub result_time: Option<NaiveDateTime>,
    pub tat_minutes: Option<i64>,
    pub status: Option<String>,
}

/// Stage timestamps are optional; unparsable ones are stored as NULL.
fn stage(raw: Option<String>) -> Option<NaiveDateTime> {
    dates::parse_datetime(raw.as_deref()?).ok()
}

impl Entity for TimeoutRecord {
    type Row = TimeoutRow;

    const TABLE: &'static str = "timeout_data";
    const COLUMNS: &'static [&'static str] = &[
        "lab_id",
        "patient_id",
        "test_name",
        "collection_time",
        "reception_time",
        "analysis_time",
        "validation_time",
        "result_time",
        "tat_minutes",
        "status",
    ];
    const KEY: &'static [&'static str] = &["patient_id", "test_name"];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "collection_time",
        "reception_time",
        "analysis_time",
        "validation_time",
        "result_time",
        "tat_minutes",
        "status",
    ];
    const POLICY: ConflictPolicy = ConflictPolicy::OverwriteOnConflict;

    fn from_row(row: TimeoutRow) -> Option<Self> {
        let (Some(patient_id), Some(test_name)) = (row.patient_id, row.test_name) else {
            debug!("Skipping timeout row without patient_id/test_name");
            return None;
        };

        Some(Self {
            lab_id: row.lab_id,
            patient_id,
            test_name,
            collection_time: stage(row.collection_time),
            reception_time: stage(row.reception_time),
            analysis_time: stage(row.analysis_time),
            validation_time: stage(row.validation_time),
            result_time: stage(row.result_time),
            tat_minutes: row.tat_minutes,
            status: row.status,
        })
    }

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.lab_id)
            .bind(&self.patient_id)
            .bind(&self.test_name)
            .bind(self.collection_time)
            .bind(self.reception_time)
            .bind(self.analysis_time)
            .bind(self.validation_time)
            .bind(self.result_time)
            .bind(self.tat_minutes)
            .bind(&self.status)
    }
}

/// One object of the registry `data.json`; keys match the column names.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatientRow {
    #[serde(default, deserialize_with = "loose::text")]
    pub patient_id: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "loose::int")]
    pub age: Option<i64>,
    #[serde(default, deserialize_with = "loose::text")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub admission_date: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub diagnosis: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub attending_doctor: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub insurance_provider: Option<String>,
    #[serde(default, deserialize_with = "loose::text")]
    pub medical_history: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    pub patient_id: String,
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub address: Option<String>,
    pub phone_number: Option<String>,
    pub admission_date: Option<NaiveDate>,
    pub diagnosis: Option<String>,
    pub attending_doctor: Option<String>,
    pub insurance_provider: Option<String>,
    pub medical_history: Option<String>,
}

impl Entity for PatientRecord {
    type Row = PatientRow;

    const TABLE: &'static str = "patients";
    const COLUMNS: &'static [&'static str] = &[
        "patient_id",
        "name",
        "age",
        "gender",
        "address",
        "phone_number",
        "admission_date",
        "diagnosis",
        "attending_doctor",
        "insurance_provider",
        "medical_history",
    ];
    const KEY: &'static [&'static str] = &["patient_id"];
    const UPDATE_COLUMNS: &'static [&'static str] = &[
        "name",
        "age",
        "gender",
        "address",
        "phone_number",
        "admission_date",
        "diagnosis",
        "attending_doctor",
        "insurance_provider",
        "medical_history",
    ];
    const POLICY: ConflictPolicy = ConflictPolicy::OverwriteOnConflict;

    fn from_row(row: PatientRow) -> Option<Self> {
        let Some(patient_id) = row.patient_id else {
            debug!("Skipping patient without patient_id");
            return None;
        };
        let admission_date = row
            .admission_date
            .and_then(|raw| dates::parse_date(&raw).ok());

        Some(Self {
            patient_id,
            name: row.name,
            age: row.age,
            gender: row.gender,
            address: row.address,
            phone_number: row.phone_number,
            admission_date,
            diagnosis: row.diagnosis,
            attending_doctor: row.attending_doctor,
            insurance_provider: row.insurance_provider,
            medical_history: row.medical_history,
        })
    }

    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q> {
        query
            .bind(&self.patient_id)
            .bind(&self.name)
            .bind(self.age)
            .bind(&self.gender)
            .bind(&self.address)
            .bind(&self.phone_number)
            .bind(self.admission_date)
            .bind(&self.diagnosis)
            .bind(&self.attending_doctor)
            .bind(&self.insurance_provider)
            .bind(&self.medical_history)
    }
}
