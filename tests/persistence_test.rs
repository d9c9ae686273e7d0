#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::io::Write;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn test_rocksdb_catalog_survives_restart() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: import one product
    let mut csv1 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv1, "name,description,price,available").unwrap();
    writeln!(csv1, "Morango,Fresco,8.00,true").unwrap();

    let mut cmd1 = Command::new(cargo_bin!("meu-cupcake"));
    cmd1.arg("import-products")
        .arg("--input")
        .arg(csv1.path())
        .arg("--db-path")
        .arg(&db_path);

    let output1 = cmd1.output().expect("Failed to execute command");
    assert!(output1.status.success());
    let stdout1 = String::from_utf8_lossy(&output1.stdout);
    assert!(stdout1.contains("1,Morango,8.00,true"));

    // 2. Second run: import another product into the same DB
    let mut csv2 = tempfile::NamedTempFile::new().unwrap();
    writeln!(csv2, "name,description,price,available").unwrap();
    writeln!(csv2, "Chocolate,Belga,9.50,false").unwrap();

    let mut cmd2 = Command::new(cargo_bin!("meu-cupcake"));
    cmd2.arg("import-products")
        .arg("--input")
        .arg(csv2.path())
        .arg("--db-path")
        .arg(&db_path);

    let output2 = cmd2.output().expect("Failed to execute command");
    assert!(output2.status.success());
    let stdout2 = String::from_utf8_lossy(&output2.stdout);

    // The first product was recovered and ids keep counting
    assert!(stdout2.contains("1,Morango,8.00,true"));
    assert!(stdout2.contains("2,Chocolate,9.50,false"));
}
