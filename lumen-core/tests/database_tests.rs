// Tests for database functionality

use lumen_core::data::Database;
use lumen_core::decode::{AffectedNode, ImpactLevel, Violation};
use lumen_core::error::StoreError;
use lumen_core::score::ImpactCounts;
use lumen_core::store::{ResultStore, ScanStatus, UserStore};
use tempfile::TempDir;

fn create_test_db() -> (TempDir, Database) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::new(&db_path).unwrap();
    (temp_dir, db)
}

fn sample_violation(rule_id: &str, impact: ImpactLevel) -> Violation {
    Violation {
        rule_id: rule_id.to_string(),
        impact,
        description: "Images must have alternate text".to_string(),
        help_text: "Provide alt text".to_string(),
        remediation: "Add an alt attribute".to_string(),
        affected_nodes: vec![AffectedNode {
            snippet: "<img src=\"logo.png\">".to_string(),
            problem: "Element has no alt attribute".to_string(),
        }],
        reference_links: vec!["https://dequeuniversity.com/rules/axe/4.8/image-alt".to_string()],
    }
}

// ============================================================================
// Database Creation Tests
// ============================================================================

#[test]
fn test_database_creation() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path);
    assert!(db.is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_database_exists() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    assert!(!Database::exists(&db_path));

    let _db = Database::new(&db_path).unwrap();
    assert!(Database::exists(&db_path));
}

#[test]
fn test_database_remove() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    let db = Database::new(&db_path).unwrap();
    drop(db);
    assert!(Database::exists(&db_path));

    Database::remove(&db_path).unwrap();
    assert!(!Database::exists(&db_path));
}

#[test]
fn test_database_reopen_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");

    {
        let db = Database::new(&db_path).unwrap();
        db.register_user("keep@example.com").unwrap();
    }

    let db = Database::new(&db_path).unwrap();
    assert!(db.find_user_by_email("keep@example.com").unwrap().is_some());
}

// ============================================================================
// User Tests
// ============================================================================

#[test]
fn test_register_user() {
    let (_temp_dir, db) = create_test_db();

    let user = db.register_user("  Alice@Example.com ").unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert!(user.id > 0);
}

#[test]
fn test_register_user_is_idempotent() {
    let (_temp_dir, db) = create_test_db();

    let first = db.register_user("bob@example.com").unwrap();
    let second = db.register_user("BOB@example.com").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_register_user_rejects_invalid_email() {
    let (_temp_dir, db) = create_test_db();

    let result = db.register_user("not-an-email");
    assert!(matches!(result, Err(StoreError::InvalidEmail(_))));
}

#[test]
fn test_find_by_email() {
    let (_temp_dir, db) = create_test_db();
    db.register_user("carol@example.com").unwrap();

    let found = db.find_by_email("Carol@Example.com").unwrap();
    assert_eq!(found.unwrap().email, "carol@example.com");
    assert!(db.find_by_email("nobody@example.com").unwrap().is_none());
}

// ============================================================================
// Scan Record Tests
// ============================================================================

#[test]
fn test_save_scan() {
    let (_temp_dir, db) = create_test_db();
    let user = db.register_user("dave@example.com").unwrap();

    let website = db
        .save_scan(&user, "https://example.com/", ScanStatus::Success)
        .unwrap();
    assert_eq!(website.id.len(), 36);
    assert_eq!(website.user_id, user.id);

    let loaded = db.get_scanned_website(&website.id).unwrap().unwrap();
    assert_eq!(loaded, website);
}

#[test]
fn test_get_missing_scanned_website() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_scanned_website("does-not-exist").unwrap().is_none());
}

#[test]
fn test_list_scanned_websites_newest_first() {
    let (_temp_dir, db) = create_test_db();
    let user = db.register_user("erin@example.com").unwrap();

    let first = db
        .save_scan(&user, "https://one.example/", ScanStatus::Success)
        .unwrap();
    let second = db
        .save_scan(&user, "https://two.example/", ScanStatus::Failed)
        .unwrap();

    let listed = db.list_scanned_websites().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);
    assert_eq!(listed[0].status, ScanStatus::Failed);
}

// ============================================================================
// Report Tests
// ============================================================================

#[test]
fn test_save_and_load_reports() {
    let (_temp_dir, db) = create_test_db();
    let user = db.register_user("frank@example.com").unwrap();
    let website = db
        .save_scan(&user, "https://example.com/", ScanStatus::Success)
        .unwrap();

    let violations = vec![
        sample_violation("image-alt", ImpactLevel::Critical),
        sample_violation("region", ImpactLevel::Moderate),
    ];
    db.save_report(
        &website.id,
        "https://example.com/",
        ScanStatus::Success,
        Some(violations.as_slice()),
    )
    .unwrap();
    db.save_report(
        &website.id,
        "https://example.com/about",
        ScanStatus::Success,
        Some(&[][..]),
    )
    .unwrap();

    let reports = db.get_reports(&website.id).unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].url, "https://example.com/");
    assert_eq!(reports[0].violations, violations);
    assert!(reports[1].violations.is_empty());
}

#[test]
fn test_failed_report_has_no_violations() {
    let (_temp_dir, db) = create_test_db();
    let user = db.register_user("gina@example.com").unwrap();
    let website = db
        .save_scan(&user, "https://blocked.example/", ScanStatus::Failed)
        .unwrap();

    db.save_report(
        &website.id,
        "https://blocked.example/",
        ScanStatus::Failed,
        None,
    )
    .unwrap();

    let reports = db.get_reports(&website.id).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].status, ScanStatus::Failed);
    assert!(reports[0].violations.is_empty());
}

#[test]
fn test_report_for_unknown_website_is_rejected() {
    let (_temp_dir, db) = create_test_db();

    let result = db.save_report("missing", "https://example.com/", ScanStatus::Success, None);
    assert!(matches!(result, Err(StoreError::Database(_))));
}

// ============================================================================
// Stats Tests
// ============================================================================

#[test]
fn test_save_and_load_stats() {
    let (_temp_dir, db) = create_test_db();
    let user = db.register_user("hank@example.com").unwrap();
    let website = db
        .save_scan(&user, "https://example.com/", ScanStatus::Success)
        .unwrap();

    let mut counts = ImpactCounts::default();
    counts.add(ImpactLevel::Critical, 3);
    counts.add(ImpactLevel::Serious, 2);
    db.save_stats(&website.id, &counts, 72.0).unwrap();

    let stats = db.get_stats(&website.id).unwrap().unwrap();
    assert_eq!(stats.counts, counts);
    assert_eq!(stats.score, 72.0);
}

#[test]
fn test_save_stats_replaces_previous() {
    let (_temp_dir, db) = create_test_db();
    let user = db.register_user("ivy@example.com").unwrap();
    let website = db
        .save_scan(&user, "https://example.com/", ScanStatus::Success)
        .unwrap();

    db.save_stats(&website.id, &ImpactCounts::default(), 100.0)
        .unwrap();
    let mut counts = ImpactCounts::default();
    counts.add(ImpactLevel::Minor, 1);
    db.save_stats(&website.id, &counts, 98.2).unwrap();

    let stats = db.get_stats(&website.id).unwrap().unwrap();
    assert_eq!(stats.counts.minor, 1);
    assert_eq!(stats.score, 98.2);
}

#[test]
fn test_missing_stats() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get_stats("nothing").unwrap().is_none());
}
