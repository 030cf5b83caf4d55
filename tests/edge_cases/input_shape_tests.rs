//! Edge case tests for malformed and unusual inputs

use crate::common::{CliTestRunner, TestFixture};
use tabalign::table::Table;
use tabalign::TabalignError;

#[test]
fn test_ragged_row_aborts_diff() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_raw("old.csv", "taxonID,scientificName\n1,Foo bar\n2,Foo baz,extra\n")
        .unwrap();
    fixture
        .create_raw("new.csv", "taxonID,scientificName\n1,Foo bar\n")
        .unwrap();

    let err = runner.expect_failure(&["diff", &runner.arg("old.csv"), &runner.arg("new.csv")]);
    match err {
        TabalignError::RaggedRow {
            line,
            expected,
            found,
            ..
        } => {
            assert_eq!(line, 3);
            assert_eq!(expected, 2);
            assert_eq!(found, 3);
        }
        other => panic!("Expected RaggedRow, got {other}"),
    }
}

#[test]
fn test_short_row_is_ragged_too() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw("t.tsv", "taxonID\tscientificName\trank\n1\tFoo\n")
        .unwrap();
    assert!(matches!(
        Table::load(&path, "taxonID"),
        Err(TabalignError::RaggedRow { found: 2, .. })
    ));
}

#[test]
fn test_duplicate_primary_key_aborts() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_raw("old.csv", "taxonID,scientificName\n1,a\n")
        .unwrap();
    fixture
        .create_raw("new.csv", "taxonID,scientificName\n7,a\n7,b\n")
        .unwrap();

    let err = runner.expect_failure(&["diff", &runner.arg("old.csv"), &runner.arg("new.csv")]);
    match err {
        TabalignError::DuplicateKey { key, .. } => assert_eq!(key, "7"),
        other => panic!("Expected DuplicateKey, got {other}"),
    }
}

#[test]
fn test_missing_primary_key_column() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_raw("old.csv", "id,scientificName\n1,a\n").unwrap();
    fixture.create_raw("new.csv", "id,scientificName\n1,a\n").unwrap();

    let err = runner.expect_failure(&["diff", &runner.arg("old.csv"), &runner.arg("new.csv")]);
    assert!(matches!(err, TabalignError::MissingColumn { ref column, .. } if column == "taxonID"));

    // Naming the key column fixes it
    runner.expect_success(&[
        "diff",
        &runner.arg("old.csv"),
        &runner.arg("new.csv"),
        "--pk",
        "id",
        "-o",
        &runner.arg("delta.csv"),
    ]);
}

#[test]
fn test_missing_key_value() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw("t.csv", "taxonID,scientificName\n1,a\n,b\n")
        .unwrap();
    assert!(matches!(
        Table::load(&path, "taxonID"),
        Err(TabalignError::MissingKey { line: 3, .. })
    ));
}

#[test]
fn test_empty_file_has_no_header() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_raw("empty.csv", "").unwrap();
    assert!(Table::load(&path, "taxonID").is_err());
}

#[test]
fn test_header_only_tables() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture.create_raw("old.csv", "taxonID,scientificName\n").unwrap();
    fixture.create_raw("new.csv", "taxonID,scientificName\n").unwrap();

    runner.expect_success(&[
        "diff",
        &runner.arg("old.csv"),
        &runner.arg("new.csv"),
        "-o",
        &runner.arg("delta.csv"),
    ]);
    assert_eq!(fixture.read("delta.csv"), "mode,taxonID,new_pk,scientificName\n");
}

#[test]
fn test_byte_order_mark_is_stripped() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw("bom.csv", "\u{feff}taxonID,scientificName\n1,a\n")
        .unwrap();
    let table = Table::load(&path, "taxonID").unwrap();
    assert_eq!(table.primary_key_column(), "taxonID");
}

#[test]
fn test_quoted_fields_in_csv() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw(
            "quoted.csv",
            "taxonID,scientificName\n1,\"Aus bus (Smith, 1900)\"\n2,\"Say \"\"hi\"\"\"\n",
        )
        .unwrap();
    let table = Table::load(&path, "taxonID").unwrap();
    assert_eq!(table.value(0, 1), Some("Aus bus (Smith, 1900)"));
    assert_eq!(table.value(1, 1), Some("Say \"hi\""));
}

#[test]
fn test_unicode_values_match() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_table(
            "old.csv",
            &[vec!["taxonID", "scientificName"], vec!["1", "Gymnothorax ﬁmbriatus 北"]],
        )
        .unwrap();
    fixture
        .create_table(
            "new.csv",
            &[vec!["taxonID", "scientificName"], vec!["2", "Gymnothorax ﬁmbriatus 北"]],
        )
        .unwrap();

    runner.expect_success(&[
        "diff",
        &runner.arg("old.csv"),
        &runner.arg("new.csv"),
        "-o",
        &runner.arg("delta.csv"),
    ]);
    assert_eq!(
        fixture.read("delta.csv"),
        "mode,taxonID,new_pk,scientificName\nupdate,1,2,Gymnothorax ﬁmbriatus 北\n"
    );
}

#[test]
fn test_values_differing_only_in_whitespace_are_distinct() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_table("old.csv", &[vec!["taxonID", "scientificName"], vec!["1", "Foo bar"]])
        .unwrap();
    fixture
        .create_table("new.csv", &[vec!["taxonID", "scientificName"], vec!["2", "Foo bar "]])
        .unwrap();

    runner.expect_success(&[
        "diff",
        &runner.arg("old.csv"),
        &runner.arg("new.csv"),
        "-o",
        &runner.arg("delta.csv"),
    ]);
    let (_, rows) = fixture.read_table("delta.csv").unwrap();
    let modes: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    assert_eq!(modes, vec!["remove", "add"]);
}
