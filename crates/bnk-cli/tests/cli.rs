use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

const STATEMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<statement>
  <bank-unit><bank-name>Santander Bank Polska</bank-name></bank-unit>
  <account><iban>PL61109010140000071219812874</iban></account>
  <stmt>
    <stmt-no>4/2025</stmt-no>
    <begin>01/04/2025</begin>
    <end>30/04/2025</end>
  </stmt>
  <transactions>
    <trn>
      <trn-code>X_01</trn-code>
      <exe-date>03/04/2025</exe-date>
      <value>450.00</value>
      <desc-base>FUNDUSZ REMONTOWY</desc-base>
      <desc-opt>EWA TERESA OSIECKA-CISOWSKA UL. JOLIOT-CURIE 3/27 02-646 WARSZAWA</desc-opt>
    </trn>
    <trn>
      <trn-code>X_01</trn-code>
      <exe-date>04/04/2025</exe-date>
      <value>120,00</value>
      <desc-base>PRZELEW</desc-base>
      <desc-opt>JAN KOWALSKI</desc-opt>
    </trn>
    <trn>
      <trn-code>X_02</trn-code>
      <exe-date>10/04/2025</exe-date>
      <value>-80.50</value>
      <desc-base>FAKTURA 12/2025</desc-base>
      <desc-opt>ENERGA OPERATOR</desc-opt>
    </trn>
    <trn>
      <trn-code>X_06</trn-code>
      <exe-date>30/04/2025</exe-date>
      <value>-12.50</value>
      <desc-base>OPLATA ZA PROWADZENIE RACHUNKU</desc-base>
    </trn>
  </transactions>
</statement>"#;

fn bnk() -> Command {
    Command::cargo_bin("bnk").unwrap()
}

fn write_inputs(dir: &Path) {
    fs::write(dir.join("config.json"), "{}").unwrap();
    fs::write(dir.join("wyciag_04.xml"), STATEMENT).unwrap();
    fs::write(
        dir.join("kontrahenci.csv"),
        "id;nazwa;konto\n1;ENERGA OPERATOR;201-0001\n2;ORANGE POLSKA;201-0002\n",
    )
    .unwrap();
}

#[test]
fn test_help_lists_commands() {
    bnk()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("convert"))
        .stdout(predicate::str::contains("cache"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    bnk()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));
    assert!(path.exists());

    bnk()
        .args(["config", "init", "--output"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_config_set_and_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");

    bnk()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "processing.address_batch_size", "5"])
        .assert()
        .success();

    bnk()
        .arg("--config")
        .arg(&path)
        .args(["config", "get", "processing.address_batch_size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5"));

    bnk()
        .arg("--config")
        .arg(&path)
        .args(["config", "set", "processing.no_such_key", "1"])
        .assert()
        .failure();
}

#[test]
fn test_convert_writes_ledger_and_audit() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let out = dir.path().join("out");

    bnk()
        .current_dir(dir.path())
        .args([
            "--config",
            "config.json",
            "convert",
            "wyciag_04.xml",
            "--no-ai",
            "--cache-file",
            "cache.json",
            "-k",
            "kontrahenci.csv",
            "--summary",
            "-o",
        ])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Converted 1 statement(s)"));

    let ledger = fs::read_to_string(out.join("wyciag_04.txt")).unwrap();
    let lines: Vec<&str> = ledger.lines().collect();
    assert_eq!(lines[0], "nr_dok\tnr_poz\tdata_p\ttresc\tkwota\tk_wn\tk_ma");
    assert_eq!(
        lines[1],
        "BNK/0004\t1\t4.04.2025\tNIEROZPOZNANE #2 PRZELEW\t120,00\t131-1\t   -"
    );
    assert_eq!(
        lines[3],
        "BNK/0004\t3\t3.04.2025\tFUNDUSZ REMONTOWY\t450,00\t   -\t204-000027"
    );
    assert_eq!(
        lines[4],
        "BNK/0004\t4\t10.04.2025\tFAKTURA 12/2025\t80,50\t201-0001\t131-1"
    );
    assert_eq!(lines.len(), 5);

    let audit = fs::read_to_string(out.join("wyciag_04_pomocniczy.txt")).unwrap();
    assert!(audit.contains("Nazwa najemcy: Ewa Teresa Osiecka-Cisowska"));
    assert!(audit.contains("Wskaźnik dopasowania: 100.0%"));

    let summary = fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.starts_with("filename,date,amount"));
    assert_eq!(summary.lines().count(), 4);

    assert!(dir.path().join("cache.json").exists());
}

#[test]
fn test_second_run_uses_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    for _ in 0..2 {
        bnk()
            .current_dir(dir.path())
            .args([
                "--config",
                "config.json",
                "convert",
                "wyciag_04.xml",
                "--no-ai",
                "--cache-file",
                "cache.json",
            ])
            .assert()
            .success();
    }

    bnk()
        .current_dir(dir.path())
        .args(["cache", "stats", "--file", "cache.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 1"))
        .stdout(predicate::str::contains("Hit rate: 50.0%"));
}

#[test]
fn test_missing_input_fails() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.json"), "{}").unwrap();

    bnk()
        .current_dir(dir.path())
        .args(["--config", "config.json", "convert", "*.xml", "--no-ai", "--no-cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No statement files found"));
}

#[test]
fn test_malformed_statement_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("config.json"), "{}").unwrap();
    fs::write(
        dir.path().join("broken.xml"),
        "<statement><transactions><trn><exe-date>31/02/2025</exe-date><value>1.00</value></trn></transactions></statement>",
    )
    .unwrap();

    bnk()
        .current_dir(dir.path())
        .args(["--config", "config.json", "convert", "broken.xml", "--no-ai", "--no-cache"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid statement"));

    assert!(!dir.path().join("broken.txt").exists());
}

#[test]
fn test_cache_clear_empties_cache() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());

    bnk()
        .current_dir(dir.path())
        .args([
            "--config",
            "config.json",
            "convert",
            "wyciag_04.xml",
            "--no-ai",
            "--cache-file",
            "cache.json",
        ])
        .assert()
        .success();

    bnk()
        .current_dir(dir.path())
        .args(["cache", "clear", "--file", "cache.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleared (1 entries removed)"));

    bnk()
        .current_dir(dir.path())
        .args(["cache", "stats", "--file", "cache.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Entries: 0"));
}

#[test]
fn test_cache_clear_replaces_unreadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("cache.json");
    fs::write(&cache, "{}").unwrap();

    bnk()
        .args(["cache", "clear", "--file"])
        .arg(&cache)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cache cleared"));
    assert_eq!(fs::read_to_string(&cache).unwrap().trim(), "[]");
}
