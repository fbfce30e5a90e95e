use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, FromRow};

use crate::config::Config;
use crate::error::{Error, LogFailure, Result};
use crate::models::{Project, ProjectDraft, ProjectStatus};

const DATE_FORMAT: &str = "%Y-%m-%d";

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS projects (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT,
        estimated_hours REAL DEFAULT 0,
        actual_hours REAL DEFAULT 0,
        start_date TEXT NOT NULL,
        end_date TEXT,
        status TEXT DEFAULT 'Planned'
    )
"#;

const SELECT_COLUMNS: &str =
    "SELECT id, name, description, estimated_hours, actual_hours, start_date, end_date, status FROM projects";

/// Handle on the project store.
///
/// Holds only the connect options; every operation opens its own
/// connection and closes it before returning.
pub struct Database {
    path: PathBuf,
    options: SqliteConnectOptions,
}

/// Row as stored; dates and status are text until decoded.
#[derive(FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
    description: Option<String>,
    estimated_hours: f64,
    actual_hours: f64,
    start_date: String,
    end_date: Option<String>,
    status: String,
}

impl TryFrom<ProjectRow> for Project {
    type Error = Error;

    fn try_from(row: ProjectRow) -> Result<Self> {
        let start_date = decode_date(&row.start_date)?;
        let end_date = row.end_date.as_deref().map(decode_date).transpose()?;
        let status = row
            .status
            .parse::<ProjectStatus>()
            .map_err(|e| Error::StorageRead(e.into()))?;

        Ok(Project {
            id: row.id,
            name: row.name,
            description: row.description.unwrap_or_default(),
            estimated_hours: row.estimated_hours,
            actual_hours: row.actual_hours,
            start_date,
            end_date,
            status,
        })
    }
}

/// Accepts plain dates and the ISO date-times older databases contain.
///
/// Date-times with an offset or `Z` keep the calendar day as written.
fn decode_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .map_err(|e| Error::StorageRead(format!("malformed stored date '{raw}': {e}").into()))
}

fn encode_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let options = SqliteConnectOptions::new().filename(&path);

        Self { path, options }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn connect(&self) -> std::result::Result<SqliteConnection, sqlx::Error> {
        SqliteConnection::connect_with(&self.options).await
    }

    /// Create the database file and projects table if they are missing.
    pub async fn initialize(&self) -> Result<()> {
        let result: std::result::Result<(), sqlx::Error> = async {
            let options = self.options.clone().create_if_missing(true);
            let mut conn = SqliteConnection::connect_with(&options).await?;
            sqlx::query(CREATE_TABLE).execute(&mut conn).await?;
            conn.close().await
        }
        .await;

        result
            .map_err(|e| Error::StorageInit(e.into()))
            .log_failure("Database initialize")
    }

    pub async fn add_project(&self, draft: &ProjectDraft) -> Result<i64> {
        let result: std::result::Result<i64, sqlx::Error> = async {
            let mut conn = self.connect().await?;
            let done = sqlx::query(
                r#"
                INSERT INTO projects (name, description, estimated_hours, actual_hours, start_date, end_date, status)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&draft.name)
            .bind(&draft.description)
            .bind(draft.estimated_hours)
            .bind(draft.actual_hours)
            .bind(encode_date(draft.start_date))
            .bind(draft.end_date.map(encode_date))
            .bind(draft.status.as_str())
            .execute(&mut conn)
            .await?;
            conn.close().await?;

            Ok(done.last_insert_rowid())
        }
        .await;

        result
            .map_err(|e| Error::storage_write("added", e))
            .log_failure("AddProject")
    }

    /// Overwrite every field of the row with `project.id`.
    ///
    /// Returns `false` when no such row exists; nothing is written then.
    pub async fn update_project(&self, project: &Project) -> Result<bool> {
        let result: std::result::Result<u64, sqlx::Error> = async {
            let mut conn = self.connect().await?;
            let done = sqlx::query(
                r#"
                UPDATE projects
                SET name = ?, description = ?, estimated_hours = ?, actual_hours = ?,
                    start_date = ?, end_date = ?, status = ?
                WHERE id = ?
                "#,
            )
            .bind(&project.name)
            .bind(&project.description)
            .bind(project.estimated_hours)
            .bind(project.actual_hours)
            .bind(encode_date(project.start_date))
            .bind(project.end_date.map(encode_date))
            .bind(project.status.as_str())
            .bind(project.id)
            .execute(&mut conn)
            .await?;
            conn.close().await?;

            Ok(done.rows_affected())
        }
        .await;

        result
            .map(|rows| rows > 0)
            .map_err(|e| Error::storage_write("updated", e))
            .log_failure("UpdateProject")
    }

    /// Returns `false` when there was nothing to delete.
    pub async fn delete_project(&self, id: i64) -> Result<bool> {
        let result: std::result::Result<u64, sqlx::Error> = async {
            let mut conn = self.connect().await?;
            let done = sqlx::query("DELETE FROM projects WHERE id = ?")
                .bind(id)
                .execute(&mut conn)
                .await?;
            conn.close().await?;

            Ok(done.rows_affected())
        }
        .await;

        result
            .map(|rows| rows > 0)
            .map_err(|e| Error::storage_write("deleted", e))
            .log_failure("DeleteProject")
    }

    /// All projects, newest start date first. Equal dates keep insertion order.
    pub async fn load_projects(&self) -> Result<Vec<Project>> {
        // Legacy rows hold date-times; only the day part takes part in ordering.
        let rows = self
            .fetch_rows(
                &format!("{SELECT_COLUMNS} ORDER BY substr(start_date, 1, 10) DESC, id ASC"),
                None,
            )
            .await;

        rows.and_then(|rows| rows.into_iter().map(Project::try_from).collect::<Result<Vec<_>>>())
            .log_failure("GetAllProjects")
    }

    pub async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let rows = self
            .fetch_rows(&format!("{SELECT_COLUMNS} WHERE id = ?"), Some(id))
            .await;

        rows.and_then(|rows| rows.into_iter().next().map(Project::try_from).transpose())
            .log_failure("GetProject")
    }

    async fn fetch_rows(&self, sql: &str, id: Option<i64>) -> Result<Vec<ProjectRow>> {
        let result: std::result::Result<Vec<ProjectRow>, sqlx::Error> = async {
            let mut conn = self.connect().await?;
            let mut query = sqlx::query_as::<_, ProjectRow>(sql);
            if let Some(id) = id {
                query = query.bind(id);
            }
            let rows = query.fetch_all(&mut conn).await?;
            conn.close().await?;

            Ok(rows)
        }
        .await;

        result.map_err(|e| Error::StorageRead(e.into()))
    }
}

/// Open the store configured for this process and make sure it is usable
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(&config.database_path);
    db.initialize().await?;

    Ok(db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(name: &str, start: NaiveDate) -> ProjectDraft {
        ProjectDraft {
            name: name.to_string(),
            description: format!("{name} description"),
            estimated_hours: 12.5,
            actual_hours: 14.0,
            start_date: start,
            end_date: None,
            status: ProjectStatus::Active,
        }
    }

    async fn open() -> (TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("projects.db"));
        db.initialize().await.expect("initialize");
        (dir, db)
    }

    async fn insert_raw(db: &Database, name: &str, start_date: &str) {
        let mut conn = db.connect().await.expect("connect");
        sqlx::query(
            "INSERT INTO projects (name, estimated_hours, actual_hours, start_date, status) \
             VALUES (?, 4, 5, ?, 'Active')",
        )
        .bind(name)
        .bind(start_date)
        .execute(&mut conn)
        .await
        .expect("insert");
        conn.close().await.expect("close");
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let (_dir, db) = open().await;

        db.initialize().await.expect("second initialize");
        assert!(db.load_projects().await.expect("load").is_empty());
    }

    #[tokio::test]
    async fn initialize_fails_for_unreachable_location() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(dir.path().join("missing").join("projects.db"));

        assert!(matches!(db.initialize().await, Err(Error::StorageInit(_))));
    }

    #[tokio::test]
    async fn added_project_round_trips() {
        let (_dir, db) = open().await;
        let mut input = draft("Checkout", date(2026, 10, 3));
        input.end_date = Some(date(2026, 10, 17));
        input.description = "Payments, refunds and \"quoted\" text".to_string();

        let id = db.add_project(&input).await.expect("add");
        let projects = db.load_projects().await.expect("load");

        assert_eq!(projects, vec![input.into_project(id)]);
    }

    #[tokio::test]
    async fn update_overwrites_all_fields() {
        let (_dir, db) = open().await;
        let id = db.add_project(&draft("Search", date(2026, 9, 1))).await.expect("add");

        let updated = Project {
            id,
            name: "Search v2".to_string(),
            description: String::new(),
            estimated_hours: 40.0,
            actual_hours: 55.5,
            start_date: date(2026, 9, 2),
            end_date: Some(date(2026, 10, 1)),
            status: ProjectStatus::Completed,
        };
        assert!(db.update_project(&updated).await.expect("update"));

        assert_eq!(db.get_project(id).await.expect("get"), Some(updated.clone()));
        assert_eq!(db.load_projects().await.expect("load"), vec![updated]);
    }

    #[tokio::test]
    async fn update_of_missing_row_changes_nothing() {
        let (_dir, db) = open().await;
        let id = db.add_project(&draft("Reports", date(2026, 9, 1))).await.expect("add");
        let ghost = draft("Ghost", date(2026, 9, 1)).into_project(id + 100);

        assert!(!db.update_project(&ghost).await.expect("update"));
        let projects = db.load_projects().await.expect("load");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "Reports");
    }

    #[tokio::test]
    async fn delete_removes_only_that_row() {
        let (_dir, db) = open().await;
        let keep = db.add_project(&draft("Keep", date(2026, 8, 1))).await.expect("add");
        let drop = db.add_project(&draft("Drop", date(2026, 8, 2))).await.expect("add");

        assert!(db.delete_project(drop).await.expect("delete"));
        assert!(!db.delete_project(drop).await.expect("second delete"));

        let ids: Vec<i64> = db.load_projects().await.expect("load").iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![keep]);
        assert_eq!(db.get_project(drop).await.expect("get"), None);
    }

    #[tokio::test]
    async fn projects_are_listed_newest_first_with_stable_ties() {
        let (_dir, db) = open().await;
        let old = db.add_project(&draft("Old", date(2025, 12, 31))).await.expect("add");
        let tie_a = db.add_project(&draft("Tie A", date(2026, 3, 1))).await.expect("add");
        let new = db.add_project(&draft("New", date(2026, 10, 1))).await.expect("add");
        let tie_b = db.add_project(&draft("Tie B", date(2026, 3, 1))).await.expect("add");

        let ids: Vec<i64> = db.load_projects().await.expect("load").iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![new, tie_a, tie_b, old]);
    }

    #[tokio::test]
    async fn legacy_datetime_values_are_read_as_dates() {
        let (_dir, db) = open().await;
        let mut conn = db.connect().await.expect("connect");
        sqlx::query(
            "INSERT INTO projects (name, description, estimated_hours, actual_hours, start_date, end_date, status) \
             VALUES ('Legacy', NULL, 8, 9, '2024-03-01T00:00:00.0000000', NULL, 'Completed')",
        )
        .execute(&mut conn)
        .await
        .expect("insert");
        conn.close().await.expect("close");

        let projects = db.load_projects().await.expect("load");
        assert_eq!(projects[0].start_date, date(2024, 3, 1));
        assert_eq!(projects[0].description, "");
    }

    #[tokio::test]
    async fn legacy_datetimes_with_offsets_keep_their_day() {
        let (_dir, db) = open().await;
        insert_raw(&db, "Local", "2024-03-01T00:00:00.0000000+03:00").await;
        insert_raw(&db, "Utc", "2024-02-29T23:30:00.0000000Z").await;
        insert_raw(&db, "West", "2024-02-28T00:00:00.0000000-05:00").await;

        let dates: Vec<(String, NaiveDate)> = db
            .load_projects()
            .await
            .expect("load")
            .into_iter()
            .map(|p| (p.name, p.start_date))
            .collect();

        assert_eq!(
            dates,
            vec![
                ("Local".to_string(), date(2024, 3, 1)),
                ("Utc".to_string(), date(2024, 2, 29)),
                ("West".to_string(), date(2024, 2, 28)),
            ]
        );
    }

    #[tokio::test]
    async fn mixed_date_formats_on_one_day_are_ordered_by_id() {
        let (_dir, db) = open().await;
        let plain = db.add_project(&draft("Plain", date(2024, 3, 1))).await.expect("add");
        insert_raw(&db, "Legacy", "2024-03-01T00:00:00.0000000+01:00").await;

        let names: Vec<(i64, String)> = db
            .load_projects()
            .await
            .expect("load")
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();

        assert_eq!(names, vec![(plain, "Plain".to_string()), (plain + 1, "Legacy".to_string())]);
    }

    #[tokio::test]
    async fn malformed_date_is_a_read_error() {
        let (_dir, db) = open().await;
        let mut conn = db.connect().await.expect("connect");
        sqlx::query(
            "INSERT INTO projects (name, estimated_hours, actual_hours, start_date, status) \
             VALUES ('Broken', 1, 1, 'last tuesday', 'Planned')",
        )
        .execute(&mut conn)
        .await
        .expect("insert");
        conn.close().await.expect("close");

        assert!(matches!(db.load_projects().await, Err(Error::StorageRead(_))));
    }
}
