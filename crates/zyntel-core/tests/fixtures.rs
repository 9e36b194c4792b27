use std::path::PathBuf;

use serde::de::DeserializeOwned;
use zyntel_core::import::{
    CatalogEntry, CatalogRow, Encounter, EncounterRow, Entity, PatientRecord, PatientRow,
    TimeOutRow, TimeOutUpdate, TimeoutRecord, TimeoutRow,
};
use zyntel_core::parse::{decode, SourceFormat};
use zyntel_core::rollup::{compute_rollup, EncounterDay};

fn fixture(name: &str) -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name);
    std::fs::read(&path)
        .unwrap_or_else(|err| panic!("failed to read fixture {}: {}", path.display(), err))
}

fn rows<T: DeserializeOwned>(name: &str, format: SourceFormat) -> Vec<T> {
    decode(format, name, &fixture(name)).expect("fixture should decode")
}

#[test]
fn catalog_fixture_skips_unnamed_tests() {
    let entries: Vec<CatalogEntry> = rows::<CatalogRow>("meta.csv", SourceFormat::Csv)
        .into_iter()
        .filter_map(CatalogEntry::from_row)
        .collect();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].test_name, "Malaria RDT");
    assert_eq!(entries[2].price, 0);
}

#[test]
fn encounter_fixture_drops_rows_without_lab_number_or_date() {
    let decoded: Vec<EncounterRow> = rows("data.json", SourceFormat::Json);
    assert_eq!(decoded.len(), 6);

    let encounters: Vec<Encounter> = decoded.into_iter().filter_map(Encounter::from_row).collect();
    assert_eq!(encounters.len(), 4);
    assert_eq!(encounters[3].hospital_id, "default");
    assert_eq!(encounters[2].invoice_no.as_deref(), Some("12"));
}

#[test]
fn encounter_fixture_rolls_up_by_day() {
    let encounters: Vec<EncounterDay> = rows::<EncounterRow>("data.json", SourceFormat::Json)
        .into_iter()
        .filter_map(Encounter::from_row)
        .map(|e| EncounterDay {
            hospital_id: e.hospital_id,
            encounter_date: e.encounter_date,
            test_name: e.test_name,
        })
        .collect();

    let rollup: Vec<(String, String, String, i64)> = compute_rollup(&encounters)
        .into_iter()
        .map(|r| (r.hospital_id, r.date.to_string(), r.test_name, r.count))
        .collect();

    assert_eq!(
        rollup,
        vec![
            ("default".into(), "2024-01-13".into(), "LFT".into(), 1),
            ("hospitalA".into(), "2024-01-01".into(), "CBC".into(), 2),
            ("hospitalA".into(), "2024-01-02".into(), "CBC".into(), 1),
        ]
    );
}

#[test]
fn time_out_fixture_skips_pending_rows() {
    let updates: Vec<TimeOutUpdate> = rows::<TimeOutRow>("TimeOut.csv", SourceFormat::Csv)
        .into_iter()
        .filter_map(TimeOutUpdate::from_row)
        .collect();

    assert_eq!(updates.len(), 4);
    assert!(updates.iter().all(|u| u.lab_no != "2401-0004"));
}

#[test]
fn registry_fixtures_decode_into_entities() {
    let timeout_rows: Vec<TimeoutRow> = rows("registry_timeouts.csv", SourceFormat::Csv);
    let timeouts: Vec<TimeoutRecord> = timeout_rows
        .into_iter()
        .filter_map(TimeoutRecord::from_row)
        .collect();
    assert_eq!(timeouts.len(), 2);
    assert_eq!(timeouts[0].tat_minutes, Some(60));
    assert_eq!(timeouts[1].reception_time, None);

    let patient_rows: Vec<PatientRow> = rows("registry_patients.json", SourceFormat::Json);
    let patients: Vec<PatientRecord> = patient_rows
        .into_iter()
        .filter_map(PatientRecord::from_row)
        .collect();
    assert_eq!(patients.len(), 2);
    assert_eq!(patients[1].age, Some(58));
    assert_eq!(patients[1].admission_date, None);
}
