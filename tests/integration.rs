//! Integration tests for churnlens

use churnlens::analysis::{analyze_segments, compare_numeric, profile};
use churnlens::viz::font_available;
use churnlens::{clean_dataset, load_dataset, run_eda, EdaConfig, EdaError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

const HEADER: &str = "customerID,gender,SeniorCitizen,Partner,Dependents,tenure,InternetService,OnlineSecurity,TechSupport,Contract,PaperlessBilling,PaymentMethod,MonthlyCharges,TotalCharges,Churn";

/// Ten customers, three churners, all churners on month-to-month contracts.
/// Two TotalCharges values are placeholders ("N/A" and a blank).
const ROWS: [&str; 10] = [
    "C1,Female,0,Yes,No,1,DSL,No,No,Month-to-month,Yes,Electronic check,29.85,29.85,Yes",
    "C2,Male,0,No,No,34,DSL,Yes,No,One year,No,Mailed check,56.95,1889.5,No",
    "C3,Male,0,No,No,2,DSL,Yes,No,Month-to-month,Yes,Mailed check,53.85,108.15,Yes",
    "C4,Male,0,No,No,45,DSL,Yes,Yes,One year,No,Bank transfer (automatic),42.30,1840.75,No",
    "C5,Female,0,No,No,2,Fiber optic,No,No,Month-to-month,Yes,Electronic check,70.70,151.65,Yes",
    "C6,Female,0,No,No,8,Fiber optic,No,No,Month-to-month,Yes,Electronic check,99.65,N/A,No",
    "C7,Male,0,No,Yes,22,Fiber optic,No,No,Month-to-month,Yes,Credit card (automatic),89.10,1949.4,No",
    "C8,Female,0,No,No,10,DSL,Yes,No,Two year,No,Mailed check,29.75,301.9,No",
    "C9,Female,1,Yes,No,0,DSL,No,Yes,Two year,Yes,Bank transfer (automatic),52.55, ,No",
    "C10,Male,0,No,Yes,62,DSL,Yes,No,One year,No,Bank transfer (automatic),56.15,3487.95,No",
];

/// Charts written with the default configuration for this schema
const EXPECTED_ARTIFACTS: usize = 1 + 2 * 10 + 2 * 3 + 1;

fn write_csv(dir: &Path, name: &str, header: &str, rows: &[&str]) -> PathBuf {
    let path = dir.join(name);
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(&path, text).unwrap();
    path
}

fn setup() -> (TempDir, EdaConfig) {
    let dir = tempdir().unwrap();
    let data_path = write_csv(dir.path(), "telco_churn.csv", HEADER, &ROWS);
    let mut config = EdaConfig::default().with_reports_dir(dir.path().join("reports"));
    config.data_path = data_path;
    (dir, config)
}

#[test]
fn test_end_to_end_pipeline() {
    let (_dir, config) = setup();

    let outcome = run_eda(&config).unwrap();

    assert_eq!(outcome.profile.rows, 10);
    assert_eq!(outcome.profile.positives, 3);
    assert_eq!(
        outcome.figures.saved.len() + outcome.figures.failed.len(),
        EXPECTED_ARTIFACTS
    );
    for name in &outcome.figures.saved {
        assert!(config.figures_dir.join(name).exists(), "{name} missing");
    }
    if font_available() {
        assert!(outcome.figures.failed.is_empty(), "{:?}", outcome.figures.failed);
    } else {
        eprintln!("no sans-serif font for plotters; chart output not checked");
    }

    let report = fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains("- Rows: **10**"));
    // customerID is dropped during cleaning
    assert!(report.contains("- Columns: **14**"));
    assert!(report.contains("- Target: **Churn**"));
    assert!(report.contains("- Churn Rate: **30.00%**"));
    assert!(report.contains("### Missing Values (after cleaning)\n- `TotalCharges`: 2\n"));
    assert!(report.contains("- Highest churn by **Contract**: `Month-to-month` (~60.0%)."));
    assert!(report.contains("- Highest churn by **Payment Method**: `Electronic check` (~66.7%)."));
    assert!(report.contains("- Highest churn by **Internet Service**: `Fiber optic` (~33.3%)."));
    assert!(report.contains("- Mean **tenure**: churn=**1.67**, non-churn=**25.86**"));
    // The two placeholder charges are excluded, not counted as zero
    assert!(report.contains("- Mean **TotalCharges**: churn=**96.55**, non-churn=**1893.90**"));
    assert!(report.contains("01_churn_distribution.png"));
    assert!(report.contains("corr_heatmap_numeric.png"));
}

#[test]
fn test_report_is_idempotent() {
    let (_dir, config) = setup();

    let first = run_eda(&config).unwrap();
    let first_report = fs::read(&first.report_path).unwrap();
    let second = run_eda(&config).unwrap();
    let second_report = fs::read(&second.report_path).unwrap();

    assert_eq!(first_report, second_report);
}

#[test]
fn test_statistics_are_invariant_to_row_order() {
    let (dir, config) = setup();
    let mut reversed_rows = ROWS;
    reversed_rows.reverse();
    let reversed_path = write_csv(dir.path(), "reversed.csv", HEADER, &reversed_rows);

    let summarize = |path: &Path| {
        let raw = load_dataset(path, &config).unwrap();
        let cleaned = clean_dataset(&raw, &config).unwrap();
        let dataset = cleaned.dataset;
        (
            profile(&dataset, &config.target).unwrap(),
            analyze_segments(&dataset, &config.target, &config.categorical).unwrap(),
            compare_numeric(&dataset, &config.target, &config.numeric).unwrap(),
        )
    };

    let (profile_a, segments_a, numeric_a) = summarize(&config.data_path);
    let (profile_b, segments_b, numeric_b) = summarize(&reversed_path);

    assert_eq!(profile_a, profile_b);
    assert_eq!(segments_a, segments_b);
    assert_eq!(numeric_a, numeric_b);

    assert!((0.0..=1.0).contains(&profile_a.churn_rate));
    for segment in &segments_a {
        assert_eq!(segment.total_count(), profile_a.rows, "{}", segment.column);
    }
}

#[test]
fn test_missing_file_is_fatal() {
    let (dir, mut config) = setup();
    config.data_path = dir.path().join("absent.csv");

    let result = run_eda(&config);
    assert!(matches!(result, Err(EdaError::Load { .. })));
    assert!(!config.report_path.exists());
}

#[test]
fn test_missing_column_is_fatal() {
    let (dir, mut config) = setup();
    let header = HEADER.replace(",Contract,", ",ContractType,");
    config.data_path = write_csv(dir.path(), "renamed.csv", &header, &ROWS);

    match run_eda(&config) {
        Err(EdaError::Schema { missing }) => assert_eq!(missing, vec!["Contract"]),
        other => panic!("expected schema error, got {other:?}"),
    }
    assert!(!config.report_path.exists());
}

#[test]
fn test_no_valid_targets_is_fatal() {
    let (dir, mut config) = setup();
    let rows: Vec<String> = ROWS
        .iter()
        .map(|row| {
            let (rest, _) = row.rsplit_once(',').unwrap();
            format!("{rest},unknown")
        })
        .collect();
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    config.data_path = write_csv(dir.path(), "unlabelled.csv", HEADER, &rows);

    let result = run_eda(&config);
    assert!(matches!(result, Err(EdaError::EmptyDataset)));
    assert!(!config.report_path.exists());
}

#[test]
fn test_chart_failures_do_not_stop_the_report() {
    let (dir, mut config) = setup();
    // A regular file where the figures directory should be
    let blocked = dir.path().join("blocked");
    fs::write(&blocked, "not a directory").unwrap();
    config.figures_dir = blocked;

    let outcome = run_eda(&config).unwrap();

    assert!(outcome.figures.saved.is_empty());
    assert_eq!(outcome.figures.failed.len(), EXPECTED_ARTIFACTS);
    let report = fs::read_to_string(&outcome.report_path).unwrap();
    assert!(report.contains("- 01_churn_distribution.png (not saved)"));
    assert!(report.contains("- Churn Rate: **30.00%**"));
}
