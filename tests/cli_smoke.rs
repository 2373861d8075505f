//! End-to-end smoke tests for the `cli` binary.

use assert_cmd::Command;
use tempfile::tempdir;

#[test]
fn generate_then_stats() {
    let dir = tempdir().unwrap();

    Command::cargo_bin("cli")
        .unwrap()
        .args(["generate", "--products", "20", "--sales", "60", "--seed", "7"])
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .success();

    let products = dir.path().join("products.txt");
    let sales = dir.path().join("sales.txt");
    assert!(products.exists());
    assert!(sales.exists());

    let output = Command::cargo_bin("cli")
        .unwrap()
        .arg("stats")
        .arg("--products")
        .arg(&products)
        .arg("--sales")
        .arg(&sales)
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("products"));
}

#[test]
fn generate_is_deterministic_for_a_seed() {
    let a = tempdir().unwrap();
    let b = tempdir().unwrap();
    for dir in [&a, &b] {
        Command::cargo_bin("cli")
            .unwrap()
            .args(["generate", "--products", "5", "--sales", "10", "--seed", "42"])
            .arg("--out-dir")
            .arg(dir.path())
            .assert()
            .success();
    }
    let left = std::fs::read(a.path().join("sales.txt")).unwrap();
    let right = std::fs::read(b.path().join("sales.txt")).unwrap();
    assert_eq!(left, right);
}

#[test]
fn tree_renders_generated_sales() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("cli")
        .unwrap()
        .args(["generate", "--products", "5", "--sales", "15", "--seed", "1"])
        .arg("--out-dir")
        .arg(dir.path())
        .assert()
        .success();

    Command::cargo_bin("cli")
        .unwrap()
        .arg("tree")
        .arg("--sales")
        .arg(dir.path().join("sales.txt"))
        .assert()
        .success();
}
