//! Daily progress rollup derived from `LabEncounters`.
//!
//! The table is never updated incrementally: every run reads the current
//! encounters, recounts, and swaps the whole table inside one transaction.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::db::DbPool;
use crate::error::Result;

/// The three encounter columns the rollup depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterDay {
    pub hospital_id: String,
    pub encounter_date: NaiveDateTime,
    pub test_name: String,
}

impl EncounterDay {
    /// `None` when any grouping column is NULL; such rows are not counted.
    pub fn from_columns(
        hospital_id: Option<String>,
        encounter_date: Option<NaiveDateTime>,
        test_name: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            hospital_id: hospital_id?,
            encounter_date: encounter_date?,
            test_name: test_name?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgressRow {
    pub hospital_id: String,
    pub date: NaiveDate,
    pub test_name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupSummary {
    pub encounters: usize,
    pub rows_written: u64,
}

/// Groups by `(hospital_id, day, test_name)` and counts. Output is sorted by
/// that key, so identical input always produces identical output.
pub fn compute_rollup(encounters: &[EncounterDay]) -> Vec<ProgressRow> {
    let mut counts: BTreeMap<(&str, NaiveDate, &str), i64> = BTreeMap::new();
    for encounter in encounters {
        let key = (
            encounter.hospital_id.as_str(),
            encounter.encounter_date.date(),
            encounter.test_name.as_str(),
        );
        *counts.entry(key).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|((hospital_id, date, test_name), count)| ProgressRow {
            hospital_id: hospital_id.to_string(),
            date,
            test_name: test_name.to_string(),
            count,
        })
        .collect()
}

/// Clears `Progress` and repopulates it from the encounters visible to the
/// same transaction. Encounters with a NULL date, hospital or test are not
/// counted.
pub async fn regenerate(pool: &DbPool) -> Result<RollupSummary> {
    let mut tx = pool.begin().await?;

    // Tables adopted from an existing deployment may lack the NOT NULL
    // constraints, so every grouping column is read as nullable.
    let encounters: Vec<EncounterDay> =
        sqlx::query_as::<_, (Option<String>, Option<NaiveDateTime>, Option<String>)>(
            r#"
            SELECT hospital_id, encounter_date, test_name
            FROM LabEncounters
            WHERE encounter_date IS NOT NULL
              AND hospital_id IS NOT NULL
              AND test_name IS NOT NULL
            "#,
        )
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .filter_map(|(hospital_id, encounter_date, test_name)| {
            EncounterDay::from_columns(hospital_id, encounter_date, test_name)
        })
        .collect();

    let rows = compute_rollup(&encounters);

    sqlx::query("DELETE FROM Progress").execute(&mut *tx).await?;

    let mut rows_written = 0;
    for row in &rows {
        let result = sqlx::query(
            "INSERT INTO Progress (hospital_id, date, test_name, count) VALUES ($1, $2, $3, $4)",
        )
        .bind(&row.hospital_id)
        .bind(row.date)
        .bind(&row.test_name)
        .bind(row.count)
        .execute(&mut *tx)
        .await?;
        rows_written += result.rows_affected();
    }

    tx.commit().await?;
    info!(encounters = encounters.len(), rows = rows_written, "Regenerated progress rollup");

    Ok(RollupSummary {
        encounters: encounters.len(),
        rows_written,
    })
}
