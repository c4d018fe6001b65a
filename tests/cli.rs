use std::path::Path;

use assert_cmd::Command;
use predicates::{prelude::PredicateBooleanExt, str::contains};
use tempfile::TempDir;

const BIN_NAME: &str = "tally";

fn tally(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin(BIN_NAME).expect("binary exists");
    cmd.env("HOME", home)
        .env("NO_COLOR", "1")
        .env("CLICOLOR", "0")
        .env_remove("RUST_LOG");
    cmd
}

/// A fresh home directory with an initialized data dir.
fn setup() -> TempDir {
    let home = tempfile::tempdir().unwrap();
    let data = home.path().join("data");
    tally(home.path())
        .args(["init", "--data-dir", data.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Initialized tally"));
    home
}

#[test]
fn init_seeds_categories() {
    let home = setup();
    tally(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("Categories:     12"))
        .stdout(contains("Subscriptions:  0 active, 0 inactive"));
    tally(home.path())
        .args(["categories", "list"])
        .assert()
        .success()
        .stdout(contains("Housing").and(contains("Needs")));
}

#[test]
fn apply_backfills_then_does_nothing() {
    let home = setup();
    tally(home.path())
        .args(["subs", "add", "Rent", "1200", "--category", "Housing", "--day", "31", "--start", "2024-01"])
        .assert()
        .success()
        .stdout(contains("Added subscription 1"));

    tally(home.path())
        .args(["apply", "--month", "2024-03"])
        .assert()
        .success()
        .stdout(contains("3 transaction(s) created"))
        .stdout(contains("2024-02-29"))
        .stdout(contains("-$1,200.00"));

    tally(home.path())
        .args(["apply", "--month", "2024-03"])
        .assert()
        .success()
        .stdout(contains("Nothing due through 2024-03."));

    tally(home.path())
        .args(["list", "--month", "2024-02"])
        .assert()
        .success()
        .stdout(contains("SUB: Rent"))
        .stdout(contains("1 transaction(s)"));
}

#[test]
fn apply_rejects_malformed_month() {
    let home = setup();
    for bad in ["2024-13", "24-01", "2024/01"] {
        tally(home.path())
            .args(["apply", "--month", bad])
            .assert()
            .failure()
            .stderr(contains("Invalid month"));
    }
}

#[test]
fn apply_without_database_is_unavailable() {
    let home = tempfile::tempdir().unwrap();
    let missing = home.path().join("nowhere").join("tally.db");
    tally(home.path())
        .args(["apply", "--month", "2024-01", "--db", missing.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(contains("Store unavailable"));
    assert!(!missing.exists());
}

#[test]
fn deactivated_subscription_stays_frozen() {
    let home = setup();
    tally(home.path())
        .args(["subs", "add", "Gym", "30", "--category", "Entertainment", "--start", "2024-01"])
        .assert()
        .success();
    tally(home.path()).args(["apply", "--month", "2024-01"]).assert().success();
    tally(home.path()).args(["subs", "deactivate", "1"]).assert().success();
    tally(home.path())
        .args(["apply", "--month", "2024-06"])
        .assert()
        .success()
        .stdout(contains("Nothing due"));

    tally(home.path())
        .args(["subs", "activate", "1", "--resume", "2024-05"])
        .assert()
        .success()
        .stdout(contains("posting again from 2024-05"));
    tally(home.path())
        .args(["apply", "--month", "2024-06"])
        .assert()
        .success()
        .stdout(contains("2 transaction(s) created"));
}

#[test]
fn subscription_transactions_cannot_be_deleted() {
    let home = setup();
    tally(home.path())
        .args(["subs", "add", "Paper", "12", "--category", "Subscriptions", "--start", "2024-01"])
        .assert()
        .success();
    tally(home.path()).args(["apply", "--month", "2024-01"]).assert().success();
    tally(home.path())
        .args(["delete", "1"])
        .assert()
        .failure()
        .stderr(contains("created by a subscription"));

    tally(home.path())
        .args(["add", "-12", "--category", "Other Income", "--description", "refund", "--date", "2024-01-20"])
        .assert()
        .success()
        .stdout(contains("Added transaction 2: $12.00"));
    tally(home.path()).args(["delete", "2"]).assert().success();
}

#[test]
fn budget_summary_reports_groups() {
    let home = setup();
    tally(home.path())
        .args(["budget", "targets", "--needs", "60", "--wants", "30", "--savings", "20"])
        .assert()
        .failure()
        .stderr(contains("must sum to 100"));
    tally(home.path())
        .args(["budget", "income", "2024-03", "4000"])
        .assert()
        .success();
    tally(home.path())
        .args(["add", "1000", "--category", "Housing", "--date", "2024-03-01"])
        .assert()
        .success();
    tally(home.path())
        .args(["summary", "--month", "2024-03"])
        .assert()
        .success()
        .stdout(contains("income $4,000.00"))
        .stdout(contains("$2,000.00"))
        .stdout(contains("Housing"));
}

#[test]
fn db_flag_bypasses_settings() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("custom").join("books.db");
    let db = db.to_str().unwrap();
    tally(home.path()).args(["--db", db, "init"]).assert().success();
    tally(home.path())
        .args(["categories", "add", "Pets", "--group", "wants", "--db", db])
        .assert()
        .success()
        .stdout(contains("Added category: Pets (expense)"));
    tally(home.path())
        .args(["categories", "delete", "Pets", "--db", db])
        .assert()
        .success();
    assert!(!home.path().join(".config").join("tally").join("settings.json").exists());
}

#[test]
fn search_finds_by_any_or_all_criteria() {
    let home = setup();
    tally(home.path())
        .args(["add", "4.50", "--category", "Dining Out", "--description", "Corner Coffee", "--date", "2024-03-01"])
        .assert()
        .success();
    tally(home.path())
        .args(["add", "62", "--category", "Groceries", "--description", "Farmers market", "--date", "2024-03-02"])
        .assert()
        .success();

    tally(home.path())
        .args(["search", "--description", "coffee", "--category", "grocer"])
        .assert()
        .success()
        .stdout(contains("Corner Coffee").and(contains("Farmers market")))
        .stdout(contains("2 transaction(s)"));
    tally(home.path())
        .args(["search", "--description", "coffee", "--amount", "62", "--all"])
        .assert()
        .success()
        .stdout(contains("No matching transactions."));
    tally(home.path())
        .args(["search", "--amount", "-4.50"])
        .assert()
        .success()
        .stdout(contains("Corner Coffee"))
        .stdout(contains("1 transaction(s)"));
}

#[test]
fn summary_shows_ungrouped_spending() {
    let home = setup();
    tally(home.path())
        .args(["add", "35", "--category", "Uncategorized", "--date", "2024-04-09"])
        .assert()
        .success();
    tally(home.path())
        .args(["summary", "--month", "2024-04"])
        .assert()
        .success()
        .stdout(contains("Budget for 2024-04"))
        .stdout(contains("Uncategorized"))
        .stdout(contains("$35.00"));
}

#[test]
fn apply_reports_unreadable_subscription_and_fails() {
    let home = tempfile::tempdir().unwrap();
    let db = home.path().join("books.db");
    let db = db.to_str().unwrap();
    tally(home.path()).args(["--db", db, "init"]).assert().success();
    for name in ["Broken", "Rent"] {
        tally(home.path())
            .args(["--db", db, "subs", "add", name, "10", "--category", "Housing", "--start", "2024-01"])
            .assert()
            .success();
    }
    rusqlite::Connection::open(db)
        .unwrap()
        .execute("UPDATE subscriptions SET last_applied_period = 'soon' WHERE name = 'Broken'", [])
        .unwrap();

    tally(home.path())
        .args(["--db", db, "apply", "--month", "2024-02"])
        .assert()
        .failure()
        .stdout(contains("2 transaction(s) created"))
        .stderr(contains("failed Broken"))
        .stderr(contains("1 subscription(s) could not be applied"));
}
