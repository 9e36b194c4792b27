//! Upsert executor for the seed files.
//!
//! Two schema profiles are supported side by side. Each entity carries its
//! own natural key and conflict policy; the catalog step is the only one
//! whose policy can be changed per deployment, because the two profiles
//! historically disagreed on it.

pub mod overview;
pub mod registry;

use std::fmt;

use serde::de::DeserializeOwned;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};

use crate::db::DbPool;
use crate::error::Result;
use crate::parse::{self, SourceFormat};
use crate::rollup;
use crate::source::SourceReader;

pub use overview::{
    CatalogEntry, CatalogRow, Encounter, EncounterRow, TimeOutRow, TimeOutUpdate,
};
pub use registry::{
    MetaEntry, MetaRow, PatientRecord, PatientRow, TimeoutRecord, TimeoutRow,
};

pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictPolicy {
    /// First write wins; later duplicates are dropped by the database.
    IgnoreOnConflict,
    /// Last write wins for the entity's update columns.
    OverwriteOnConflict,
}

impl ConflictPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictPolicy::IgnoreOnConflict => "ignore",
            ConflictPolicy::OverwriteOnConflict => "overwrite",
        }
    }
}

impl fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table row built from a decoded file row and upserted by natural key.
pub trait Entity: Sized {
    /// Serde shape of one line or object in the seed file.
    type Row: DeserializeOwned;

    const TABLE: &'static str;
    const COLUMNS: &'static [&'static str];
    const KEY: &'static [&'static str];
    /// Columns rewritten under [`ConflictPolicy::OverwriteOnConflict`].
    const UPDATE_COLUMNS: &'static [&'static str];
    const POLICY: ConflictPolicy;

    /// `None` means the record is skipped (missing key, unparsable date).
    fn from_row(row: Self::Row) -> Option<Self>;

    /// Binds values in `COLUMNS` order.
    fn bind<'q>(&'q self, query: PgQuery<'q>) -> PgQuery<'q>;

    fn upsert_statement(policy: ConflictPolicy) -> String {
        upsert_sql(Self::TABLE, Self::COLUMNS, Self::KEY, Self::UPDATE_COLUMNS, policy)
    }
}

pub fn upsert_sql(
    table: &str,
    columns: &[&str],
    key: &[&str],
    update_columns: &[&str],
    policy: ConflictPolicy,
) -> String {
    let placeholders = (1..=columns.len())
        .map(|i| format!("${i}"))
        .collect::<Vec<_>>()
        .join(", ");

    let action = match policy {
        ConflictPolicy::OverwriteOnConflict if !update_columns.is_empty() => {
            let assignments = update_columns
                .iter()
                .map(|column| format!("{column} = EXCLUDED.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("DO UPDATE SET {assignments}")
        }
        _ => "DO NOTHING".to_string(),
    };

    format!(
        "INSERT INTO {table} ({}) VALUES ({placeholders}) ON CONFLICT ({}) {action}",
        columns.join(", "),
        key.join(", "),
    )
}

/// Upserts every row inside the caller's transaction. Returns rows affected.
pub async fn upsert_all<E: Entity>(
    tx: &mut Transaction<'_, Postgres>,
    rows: &[E],
    policy: ConflictPolicy,
) -> Result<u64> {
    let sql = E::upsert_statement(policy);
    let mut written = 0;
    for row in rows {
        let result = row.bind(sqlx::query(&sql)).execute(&mut **tx).await?;
        written += result.rows_affected();
    }
    Ok(written)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Profile {
    /// `LabTestsOverview` / `LabEncounters` / `Progress`.
    Overview,
    /// `meta_data` / `timeout_data` / `patients`.
    Registry,
}

impl Profile {
    pub fn steps(&self) -> &'static [ImportStep] {
        match self {
            Profile::Overview => &[
                ImportStep::Catalog,
                ImportStep::Encounters,
                ImportStep::EncounterTimeOuts,
                ImportStep::Rollup,
            ],
            Profile::Registry => &[
                ImportStep::Meta,
                ImportStep::Timeouts,
                ImportStep::Patients,
            ],
        }
    }

    pub fn default_catalog_policy(&self) -> ConflictPolicy {
        match self {
            Profile::Overview => CatalogEntry::POLICY,
            Profile::Registry => MetaEntry::POLICY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Overview => "overview",
            Profile::Registry => "registry",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStep {
    Catalog,
    Encounters,
    EncounterTimeOuts,
    Rollup,
    Meta,
    Timeouts,
    Patients,
}

impl ImportStep {
    pub fn name(&self) -> &'static str {
        match self {
            ImportStep::Catalog => "catalog",
            ImportStep::Encounters => "encounters",
            ImportStep::EncounterTimeOuts => "encounter_time_outs",
            ImportStep::Rollup => "rollup",
            ImportStep::Meta => "meta",
            ImportStep::Timeouts => "timeouts",
            ImportStep::Patients => "patients",
        }
    }

    pub fn source(&self) -> Option<(&'static str, SourceFormat)> {
        match self {
            ImportStep::Catalog | ImportStep::Meta => Some(("meta.csv", SourceFormat::Csv)),
            ImportStep::Encounters | ImportStep::Patients => {
                Some(("data.json", SourceFormat::Json))
            }
            ImportStep::EncounterTimeOuts | ImportStep::Timeouts => {
                Some(("TimeOut.csv", SourceFormat::Csv))
            }
            ImportStep::Rollup => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportPlan {
    pub profile: Profile,
    pub catalog_policy: ConflictPolicy,
}

impl ImportPlan {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            catalog_policy: profile.default_catalog_policy(),
        }
    }

    pub fn with_catalog_policy(mut self, policy: ConflictPolicy) -> Self {
        let default = self.profile.default_catalog_policy();
        if policy != default {
            warn!(
                profile = self.profile.as_str(),
                default = %default,
                selected = %policy,
                "Catalog conflict policy differs from the profile default"
            );
        }
        self.catalog_policy = policy;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub step: ImportStep,
    pub source_key: Option<&'static str>,
    /// Records decoded from the file (rollup: encounters considered).
    pub read: usize,
    /// Records rejected before reaching the database.
    pub skipped: usize,
    /// Rows inserted, updated or (rollup) regenerated.
    pub written: u64,
}

/// Runs every step of the plan in order. The first failure stops the run;
/// the failing file's transaction is rolled back, earlier files stay committed.
pub async fn run_plan(
    pool: &DbPool,
    source: &dyn SourceReader,
    plan: &ImportPlan,
) -> Result<Vec<ImportReport>> {
    info!(
        profile = plan.profile.as_str(),
        catalog_policy = %plan.catalog_policy,
        "Starting import"
    );
    let mut reports = Vec::new();
    for &step in plan.profile.steps() {
        let report = run_step(pool, source, plan, step).await?;
        info!(
            step = step.name(),
            key = report.source_key.unwrap_or("-"),
            read = report.read,
            skipped = report.skipped,
            written = report.written,
            "Import step finished"
        );
        reports.push(report);
    }
    Ok(reports)
}

pub async fn run_step(
    pool: &DbPool,
    source: &dyn SourceReader,
    plan: &ImportPlan,
    step: ImportStep,
) -> Result<ImportReport> {
    let Some((key, format)) = step.source() else {
        return regenerate_rollup(pool).await;
    };

    info!(step = step.name(), location = %source.location(key), "Importing");
    let bytes = source.read(key).await?;

    let (read, skipped, written) = match step {
        ImportStep::Catalog => {
            import_file::<CatalogEntry>(pool, key, format, &bytes, plan.catalog_policy).await?
        }
        ImportStep::Meta => {
            import_file::<MetaEntry>(pool, key, format, &bytes, plan.catalog_policy).await?
        }
        ImportStep::Encounters => {
            import_file::<Encounter>(pool, key, format, &bytes, Encounter::POLICY).await?
        }
        ImportStep::Timeouts => {
            let policy = TimeoutRecord::POLICY;
            import_file::<TimeoutRecord>(pool, key, format, &bytes, policy).await?
        }
        ImportStep::Patients => {
            let policy = PatientRecord::POLICY;
            import_file::<PatientRecord>(pool, key, format, &bytes, policy).await?
        }
        ImportStep::EncounterTimeOuts => import_time_outs(pool, key, format, &bytes).await?,
        ImportStep::Rollup => return regenerate_rollup(pool).await,
    };

    Ok(ImportReport {
        step,
        source_key: Some(key),
        read,
        skipped,
        written,
    })
}

async fn regenerate_rollup(pool: &DbPool) -> Result<ImportReport> {
    let summary = rollup::regenerate(pool).await?;
    Ok(ImportReport {
        step: ImportStep::Rollup,
        source_key: None,
        read: summary.encounters,
        skipped: 0,
        written: summary.rows_written,
    })
}

/// Decodes one file and upserts its rows in a single transaction.
/// Returns `(read, skipped, written)`.
async fn import_file<E: Entity>(
    pool: &DbPool,
    key: &str,
    format: SourceFormat,
    bytes: &[u8],
    policy: ConflictPolicy,
) -> Result<(usize, usize, u64)> {
    let decoded: Vec<E::Row> = parse::decode(format, key, bytes)?;
    let read = decoded.len();
    let rows: Vec<E> = decoded.into_iter().filter_map(E::from_row).collect();

    let mut tx = pool.begin().await?;
    let written = upsert_all(&mut tx, &rows, policy).await?;
    tx.commit().await?;

    Ok((read, read - rows.len(), written))
}

async fn import_time_outs(
    pool: &DbPool,
    key: &str,
    format: SourceFormat,
    bytes: &[u8],
) -> Result<(usize, usize, u64)> {
    let decoded: Vec<TimeOutRow> = parse::decode(format, key, bytes)?;
    let read = decoded.len();
    let updates: Vec<TimeOutUpdate> = decoded
        .into_iter()
        .filter_map(TimeOutUpdate::from_row)
        .collect();

    let mut tx = pool.begin().await?;
    let written = overview::apply_time_outs(&mut tx, &updates).await?;
    tx.commit().await?;

    Ok((read, read - updates.len(), written))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignore_policy_does_nothing_on_conflict() {
        let sql = upsert_sql(
            "LabTestsOverview",
            &["test_name", "tat", "lab_section", "price"],
            &["test_name"],
            &["tat", "lab_section", "price"],
            ConflictPolicy::IgnoreOnConflict,
        );
        assert_eq!(
            sql,
            "INSERT INTO LabTestsOverview (test_name, tat, lab_section, price) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (test_name) DO NOTHING"
        );
    }

    #[test]
    fn overwrite_policy_updates_named_columns() {
        let sql = upsert_sql(
            "meta_data",
            &["id", "description", "value"],
            &["id"],
            &["description", "value"],
            ConflictPolicy::OverwriteOnConflict,
        );
        assert_eq!(
            sql,
            "INSERT INTO meta_data (id, description, value) VALUES ($1, $2, $3) \
             ON CONFLICT (id) DO UPDATE SET description = EXCLUDED.description, \
             value = EXCLUDED.value"
        );
    }

    #[test]
    fn overwrite_without_update_columns_degrades_to_ignore() {
        let sql = upsert_sql("t", &["k"], &["k"], &[], ConflictPolicy::OverwriteOnConflict);
        assert!(sql.ends_with("ON CONFLICT (k) DO NOTHING"));
    }

    #[test]
    fn composite_keys_are_listed_in_order() {
        let sql = TimeoutRecord::upsert_statement(ConflictPolicy::OverwriteOnConflict);
        assert!(sql.contains("ON CONFLICT (patient_id, test_name) DO UPDATE SET"));
        assert!(!sql.contains("lab_id = EXCLUDED.lab_id"));
    }

    #[test]
    fn entity_policies_follow_their_profile() {
        assert_eq!(CatalogEntry::POLICY, ConflictPolicy::IgnoreOnConflict);
        assert_eq!(Encounter::POLICY, ConflictPolicy::IgnoreOnConflict);
        assert_eq!(MetaEntry::POLICY, ConflictPolicy::OverwriteOnConflict);
        assert_eq!(TimeoutRecord::POLICY, ConflictPolicy::OverwriteOnConflict);
        assert_eq!(PatientRecord::POLICY, ConflictPolicy::OverwriteOnConflict);
    }

    #[test]
    fn profiles_list_their_steps_in_run_order() {
        assert_eq!(
            Profile::Overview.steps(),
            &[
                ImportStep::Catalog,
                ImportStep::Encounters,
                ImportStep::EncounterTimeOuts,
                ImportStep::Rollup
            ]
        );
        assert_eq!(
            Profile::Registry.steps(),
            &[ImportStep::Meta, ImportStep::Timeouts, ImportStep::Patients]
        );
    }

    #[test]
    fn plan_defaults_to_profile_catalog_policy() {
        assert_eq!(
            ImportPlan::new(Profile::Overview).catalog_policy,
            ConflictPolicy::IgnoreOnConflict
        );
        let plan = ImportPlan::new(Profile::Registry)
            .with_catalog_policy(ConflictPolicy::IgnoreOnConflict);
        assert_eq!(plan.catalog_policy, ConflictPolicy::IgnoreOnConflict);
    }

    #[test]
    fn steps_map_to_seed_files() {
        assert_eq!(ImportStep::Catalog.source(), Some(("meta.csv", SourceFormat::Csv)));
        assert_eq!(ImportStep::Patients.source(), Some(("data.json", SourceFormat::Json)));
        assert_eq!(
            ImportStep::EncounterTimeOuts.source(),
            Some(("TimeOut.csv", SourceFormat::Csv))
        );
        assert_eq!(ImportStep::Rollup.source(), None);
    }
}
