use crate::decode::Violation;
use crate::error::StoreError;
use crate::score::ImpactCounts;
use crate::store::{
    PageReport, ReportStats, ResultStore, ScanStatus, ScannedWebsite, User, UserStore,
    normalize_email,
};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

type Result<T> = std::result::Result<T, StoreError>;

pub struct Database {
    conn: Mutex<Connection>,
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

impl ToSql for ScanStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ScanStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl Database {
    pub fn remove(path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    pub fn exists(path: &Path) -> bool {
        path.exists()
    }

    pub fn new(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            ",
        )?;

        let db = Database {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        debug!("Opened database at {}", path.display());
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Database {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?.execute_batch(
            "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    created_at INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS scanned_websites (
    id TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    url TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('success', 'failed')),
    created_at INTEGER NOT NULL,
    FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_scanned_websites_user ON scanned_websites(user_id);

-- One row per audited page
CREATE TABLE IF NOT EXISTS reports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    website_id TEXT NOT NULL,
    url TEXT NOT NULL,
    status TEXT NOT NULL CHECK(status IN ('success', 'failed')),
    summary TEXT,             -- JSON array of decoded violations
    created_at INTEGER NOT NULL,
    FOREIGN KEY(website_id) REFERENCES scanned_websites(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_reports_website ON reports(website_id);

CREATE TABLE IF NOT EXISTS report_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    website_id TEXT NOT NULL UNIQUE,
    total_issues INTEGER NOT NULL,
    critical INTEGER NOT NULL,
    serious INTEGER NOT NULL,
    moderate INTEGER NOT NULL,
    minor INTEGER NOT NULL,
    none INTEGER NOT NULL,
    score REAL NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY(website_id) REFERENCES scanned_websites(id) ON DELETE CASCADE
);
            ",
        )?;
        Ok(())
    }

    // User management
    /// Registers `email`, or returns the existing user with that address.
    pub fn register_user(&self, email: &str) -> Result<User> {
        let email = normalize_email(email)?;
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO users (email, created_at) VALUES (?1, ?2)",
            params![&email, current_timestamp()],
        )?;
        if inserted > 0 {
            info!("Registered user {}", email);
        }

        let user = conn.query_row(
            "SELECT id, email, created_at FROM users WHERE email = ?1",
            params![&email],
            |row| {
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        )?;
        Ok(user)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = email.trim().to_lowercase();
        let user = self
            .conn()?
            .query_row(
                "SELECT id, email, created_at FROM users WHERE email = ?1",
                params![&email],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    // Scan records
    pub fn insert_scanned_website(
        &self,
        user_id: i64,
        url: &str,
        status: ScanStatus,
    ) -> Result<ScannedWebsite> {
        let website = ScannedWebsite {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            url: url.to_string(),
            status,
            created_at: current_timestamp(),
        };

        self.conn()?.execute(
            "INSERT INTO scanned_websites (id, user_id, url, status, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![&website.id, website.user_id, &website.url, website.status, website.created_at],
        )?;

        Ok(website)
    }

    pub fn get_scanned_website(&self, id: &str) -> Result<Option<ScannedWebsite>> {
        let website = self
            .conn()?
            .query_row(
                "SELECT id, user_id, url, status, created_at FROM scanned_websites WHERE id = ?1",
                params![id],
                |row| {
                    Ok(ScannedWebsite {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(website)
    }

    /// Every scan, newest first.
    pub fn list_scanned_websites(&self) -> Result<Vec<ScannedWebsite>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, url, status, created_at FROM scanned_websites
             ORDER BY created_at DESC, rowid DESC",
        )?;

        let websites = stmt
            .query_map([], |row| {
                Ok(ScannedWebsite {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    url: row.get(2)?,
                    status: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(websites)
    }

    // Page reports
    pub fn insert_report(
        &self,
        website_id: &str,
        page_url: &str,
        status: ScanStatus,
        violations: Option<&[Violation]>,
    ) -> Result<i64> {
        let summary = violations.map(serde_json::to_string).transpose()?;
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO reports (website_id, url, status, summary, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![website_id, page_url, status, summary, current_timestamp()],
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn get_reports(&self, website_id: &str) -> Result<Vec<PageReport>> {
        let rows = {
            let conn = self.conn()?;
            let mut stmt = conn.prepare(
                "SELECT id, website_id, url, status, summary, created_at FROM reports
                 WHERE website_id = ?1 ORDER BY id",
            )?;

            stmt.query_map(params![website_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, ScanStatus>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        rows.into_iter()
            .map(|(id, website_id, url, status, summary, created_at)| {
                let violations = match summary {
                    Some(json) => serde_json::from_str(&json)?,
                    None => Vec::new(),
                };
                Ok(PageReport {
                    id,
                    website_id,
                    url,
                    status,
                    violations,
                    created_at,
                })
            })
            .collect()
    }

    // Aggregate stats
    pub fn upsert_stats(&self, website_id: &str, counts: &ImpactCounts, score: f64) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO report_stats (
                website_id, total_issues, critical, serious, moderate, minor, none, score, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(website_id) DO UPDATE SET
                total_issues = excluded.total_issues,
                critical = excluded.critical,
                serious = excluded.serious,
                moderate = excluded.moderate,
                minor = excluded.minor,
                none = excluded.none,
                score = excluded.score",
            params![
                website_id,
                counts.total_issues as i64,
                counts.critical as i64,
                counts.serious as i64,
                counts.moderate as i64,
                counts.minor as i64,
                counts.none as i64,
                score,
                current_timestamp(),
            ],
        )?;
        Ok(())
    }

    pub fn get_stats(&self, website_id: &str) -> Result<Option<ReportStats>> {
        let stats = self
            .conn()?
            .query_row(
                "SELECT website_id, total_issues, critical, serious, moderate, minor, none, score, created_at
                 FROM report_stats WHERE website_id = ?1",
                params![website_id],
                |row| {
                    Ok(ReportStats {
                        website_id: row.get(0)?,
                        counts: ImpactCounts {
                            total_issues: row.get::<_, i64>(1)? as u64,
                            critical: row.get::<_, i64>(2)? as u64,
                            serious: row.get::<_, i64>(3)? as u64,
                            moderate: row.get::<_, i64>(4)? as u64,
                            minor: row.get::<_, i64>(5)? as u64,
                            none: row.get::<_, i64>(6)? as u64,
                        },
                        score: row.get(7)?,
                        created_at: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(stats)
    }
}

impl UserStore for Database {
    fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user_by_email(email)
    }
}

impl ResultStore for Database {
    fn save_scan(&self, user: &User, url: &str, status: ScanStatus) -> Result<ScannedWebsite> {
        self.insert_scanned_website(user.id, url, status)
    }

    fn save_report(
        &self,
        website_id: &str,
        page_url: &str,
        status: ScanStatus,
        violations: Option<&[Violation]>,
    ) -> Result<()> {
        self.insert_report(website_id, page_url, status, violations)
            .map(|_| ())
    }

    fn save_stats(&self, website_id: &str, counts: &ImpactCounts, score: f64) -> Result<()> {
        self.upsert_stats(website_id, counts, score)
    }
}
