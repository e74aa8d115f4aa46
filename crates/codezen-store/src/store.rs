//! SQLite storage for CodeZen records.
//!
//! A single connection sits behind a mutex. Each method locks, runs its
//! statements, and returns owned records, so the guard never outlives the
//! call and is never held across an `.await` by callers.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use codezen_core::{Comment, CommentRole, CodezenError, Guideline, Project, Review, User};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROJECT_COLUMNS: &str = "p.id, p.name, p.language, p.created_at, p.owner_id, u.email";
const REVIEW_COLUMNS: &str =
    "id, timestamp, code_snapshot, llm_response, effort_estimation, project_id, user_id";
const COMMENT_COLUMNS: &str = "id, message, role, timestamp, review_id, user_id";

/// SQLite-backed record store.
///
/// # Examples
///
/// ```
/// use codezen_store::Store;
///
/// let store = Store::in_memory().unwrap();
/// let user = store.find_or_create_user("dev@example.com").unwrap();
/// let project = store.insert_project(&user, "api", "rust").unwrap();
/// assert_eq!(project.owner_email, "dev@example.com");
/// ```
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open or create a database at the given path.
    ///
    /// Creates parent directories and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] if the database cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use codezen_store::Store;
    ///
    /// let store = Store::open(Path::new(".codezen/codezen.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, CodezenError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CodezenError::Database(format!("failed to create database directory: {e}"))
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| CodezenError::Database(format!("failed to open database: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, CodezenError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            CodezenError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CodezenError> {
        self.conn
            .lock()
            .map_err(|_| CodezenError::Database("connection mutex poisoned".into()))
    }

    fn init_schema(&self) -> Result<(), CodezenError> {
        self.conn()?
            .execute_batch(
                "
                PRAGMA foreign_keys = ON;

                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    email TEXT NOT NULL UNIQUE,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    language TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS guidelines (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    rule_text TEXT NOT NULL,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS reviews (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    timestamp TEXT NOT NULL,
                    code_snapshot TEXT NOT NULL,
                    llm_response TEXT,
                    effort_estimation TEXT,
                    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    message TEXT NOT NULL,
                    role TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    review_id INTEGER NOT NULL REFERENCES reviews(id) ON DELETE CASCADE,
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
                );

                CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id);
                CREATE INDEX IF NOT EXISTS idx_guidelines_project ON guidelines(project_id);
                CREATE INDEX IF NOT EXISTS idx_reviews_project ON reviews(project_id);
                CREATE INDEX IF NOT EXISTS idx_comments_review ON comments(review_id);
                ",
            )
            .map_err(|e| CodezenError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    // --- Users ---

    /// Return the user with this email, creating it on first sight.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on insert or query failure.
    pub fn find_or_create_user(&self, email: &str) -> Result<User, CodezenError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO users (email, created_at) VALUES (?1, ?2)",
            params![email, now()],
        )
        .map_err(|e| CodezenError::Database(format!("failed to insert user: {e}")))?;

        conn.query_row(
            "SELECT id, email, created_at FROM users WHERE email = ?1",
            params![email],
            map_user,
        )
        .map_err(|e| CodezenError::Database(format!("failed to load user '{email}': {e}")))
    }

    /// Look up a user by email without creating it.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on query failure.
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, CodezenError> {
        self.conn()?
            .query_row(
                "SELECT id, email, created_at FROM users WHERE email = ?1",
                params![email],
                map_user,
            )
            .optional()
            .map_err(|e| CodezenError::Database(format!("failed to load user '{email}': {e}")))
    }

    // --- Projects ---

    /// Create a project owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on insert failure.
    pub fn insert_project(
        &self,
        owner: &User,
        name: &str,
        language: &str,
    ) -> Result<Project, CodezenError> {
        let created_at = current_time();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO projects (name, language, created_at, owner_id) VALUES (?1, ?2, ?3, ?4)",
            params![name, language, format_ts(created_at), owner.id],
        )
        .map_err(|e| CodezenError::Database(format!("failed to insert project: {e}")))?;

        Ok(Project {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            language: language.to_string(),
            created_at,
            owner_id: owner.id,
            owner_email: owner.email.clone(),
        })
    }

    /// All projects of an owner, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on query failure.
    pub fn list_projects(&self, owner_id: i64) -> Result<Vec<Project>, CodezenError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {PROJECT_COLUMNS} FROM projects p JOIN users u ON u.id = p.owner_id
                 WHERE p.owner_id = ?1
                 ORDER BY p.created_at DESC, p.id DESC"
            ))
            .map_err(|e| CodezenError::Database(format!("failed to prepare query: {e}")))?;

        let projects = stmt
            .query_map(params![owner_id], map_project)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| CodezenError::Database(format!("failed to list projects: {e}")))?;
        Ok(projects)
    }

    /// A project, only if it belongs to `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on query failure.
    pub fn find_project(
        &self,
        owner_id: i64,
        project_id: i64,
    ) -> Result<Option<Project>, CodezenError> {
        self.conn()?
            .query_row(
                &format!(
                    "SELECT {PROJECT_COLUMNS} FROM projects p JOIN users u ON u.id = p.owner_id
                     WHERE p.id = ?1 AND p.owner_id = ?2"
                ),
                params![project_id, owner_id],
                map_project,
            )
            .optional()
            .map_err(|e| CodezenError::Database(format!("failed to load project: {e}")))
    }

    /// Delete a project and everything under it. Returns `false` when no
    /// project with that id belongs to `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on delete failure.
    pub fn delete_project(&self, owner_id: i64, project_id: i64) -> Result<bool, CodezenError> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM projects WHERE id = ?1 AND owner_id = ?2",
                params![project_id, owner_id],
            )
            .map_err(|e| CodezenError::Database(format!("failed to delete project: {e}")))?;
        Ok(deleted > 0)
    }

    // --- Guidelines ---

    /// Attach a guideline to a project.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on insert failure.
    pub fn insert_guideline(
        &self,
        project_id: i64,
        rule_text: &str,
    ) -> Result<Guideline, CodezenError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO guidelines (rule_text, project_id) VALUES (?1, ?2)",
            params![rule_text, project_id],
        )
        .map_err(|e| CodezenError::Database(format!("failed to insert guideline: {e}")))?;

        Ok(Guideline {
            id: conn.last_insert_rowid(),
            rule_text: rule_text.to_string(),
            project_id,
        })
    }

    /// Guidelines of a project in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on query failure.
    pub fn list_guidelines(&self, project_id: i64) -> Result<Vec<Guideline>, CodezenError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, rule_text, project_id FROM guidelines
                 WHERE project_id = ?1 ORDER BY id ASC",
            )
            .map_err(|e| CodezenError::Database(format!("failed to prepare query: {e}")))?;

        let guidelines = stmt
            .query_map(params![project_id], map_guideline)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| CodezenError::Database(format!("failed to list guidelines: {e}")))?;
        Ok(guidelines)
    }

    /// A guideline, only if it belongs to `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on query failure.
    pub fn find_guideline(
        &self,
        project_id: i64,
        guideline_id: i64,
    ) -> Result<Option<Guideline>, CodezenError> {
        self.conn()?
            .query_row(
                "SELECT id, rule_text, project_id FROM guidelines
                 WHERE id = ?1 AND project_id = ?2",
                params![guideline_id, project_id],
                map_guideline,
            )
            .optional()
            .map_err(|e| CodezenError::Database(format!("failed to load guideline: {e}")))
    }

    /// Delete a guideline. Returns `false` when it is not part of `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on delete failure.
    pub fn delete_guideline(
        &self,
        project_id: i64,
        guideline_id: i64,
    ) -> Result<bool, CodezenError> {
        let deleted = self
            .conn()?
            .execute(
                "DELETE FROM guidelines WHERE id = ?1 AND project_id = ?2",
                params![guideline_id, project_id],
            )
            .map_err(|e| CodezenError::Database(format!("failed to delete guideline: {e}")))?;
        Ok(deleted > 0)
    }

    // --- Reviews ---

    /// Store a freshly submitted code snapshot with no feedback yet.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on insert failure.
    pub fn insert_review(
        &self,
        project_id: i64,
        user_id: i64,
        code: &str,
    ) -> Result<Review, CodezenError> {
        let timestamp = current_time();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reviews (timestamp, code_snapshot, project_id, user_id)
             VALUES (?1, ?2, ?3, ?4)",
            params![format_ts(timestamp), code, project_id, user_id],
        )
        .map_err(|e| CodezenError::Database(format!("failed to insert review: {e}")))?;

        Ok(Review {
            id: conn.last_insert_rowid(),
            timestamp,
            code_snapshot: code.to_string(),
            llm_response: None,
            effort_estimation: None,
            project_id,
            user_id,
        })
    }

    /// Record the model output and extracted effort on a review.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::NotFound`] if the review vanished (its project
    /// was deleted mid-flight), or [`CodezenError::Database`] on failure.
    pub fn update_review_response(
        &self,
        review_id: i64,
        llm_response: &str,
        effort_estimation: Option<&str>,
    ) -> Result<(), CodezenError> {
        let updated = self
            .conn()?
            .execute(
                "UPDATE reviews SET llm_response = ?1, effort_estimation = ?2 WHERE id = ?3",
                params![llm_response, effort_estimation, review_id],
            )
            .map_err(|e| CodezenError::Database(format!("failed to update review: {e}")))?;
        if updated == 0 {
            return Err(CodezenError::not_found("Review"));
        }
        Ok(())
    }

    /// Reviews of a project, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on query failure.
    pub fn list_reviews(&self, project_id: i64) -> Result<Vec<Review>, CodezenError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {REVIEW_COLUMNS} FROM reviews
                 WHERE project_id = ?1 ORDER BY timestamp DESC, id DESC"
            ))
            .map_err(|e| CodezenError::Database(format!("failed to prepare query: {e}")))?;

        let reviews = stmt
            .query_map(params![project_id], map_review)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| CodezenError::Database(format!("failed to list reviews: {e}")))?;
        Ok(reviews)
    }

    /// A review, only if it belongs to `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on query failure.
    pub fn find_review(
        &self,
        project_id: i64,
        review_id: i64,
    ) -> Result<Option<Review>, CodezenError> {
        self.conn()?
            .query_row(
                &format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = ?1 AND project_id = ?2"),
                params![review_id, project_id],
                map_review,
            )
            .optional()
            .map_err(|e| CodezenError::Database(format!("failed to load review: {e}")))
    }

    // --- Comments ---

    /// Append a message to a review's conversation.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on insert failure.
    pub fn insert_comment(
        &self,
        review_id: i64,
        user_id: i64,
        role: CommentRole,
        message: &str,
    ) -> Result<Comment, CodezenError> {
        let timestamp = current_time();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO comments (message, role, timestamp, review_id, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![message, role.as_str(), format_ts(timestamp), review_id, user_id],
        )
        .map_err(|e| CodezenError::Database(format!("failed to insert comment: {e}")))?;

        Ok(Comment {
            id: conn.last_insert_rowid(),
            message: message.to_string(),
            role,
            timestamp,
            review_id,
            user_id,
        })
    }

    /// The conversation of a review in chronological order.
    ///
    /// # Errors
    ///
    /// Returns [`CodezenError::Database`] on query failure.
    pub fn list_comments(&self, review_id: i64) -> Result<Vec<Comment>, CodezenError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COMMENT_COLUMNS} FROM comments
                 WHERE review_id = ?1 ORDER BY timestamp ASC, id ASC"
            ))
            .map_err(|e| CodezenError::Database(format!("failed to prepare query: {e}")))?;

        let comments = stmt
            .query_map(params![review_id], map_comment)
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(|e| CodezenError::Database(format!("failed to list comments: {e}")))?;
        Ok(comments)
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        created_at: parse_ts(row, 2)?,
    })
}

fn map_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        language: row.get(2)?,
        created_at: parse_ts(row, 3)?,
        owner_id: row.get(4)?,
        owner_email: row.get(5)?,
    })
}

fn map_guideline(row: &Row<'_>) -> rusqlite::Result<Guideline> {
    Ok(Guideline {
        id: row.get(0)?,
        rule_text: row.get(1)?,
        project_id: row.get(2)?,
    })
}

fn map_review(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        timestamp: parse_ts(row, 1)?,
        code_snapshot: row.get(2)?,
        llm_response: row.get(3)?,
        effort_estimation: row.get(4)?,
        project_id: row.get(5)?,
        user_id: row.get(6)?,
    })
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    let role: String = row.get(2)?;
    let role = role.parse::<CommentRole>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
    })?;
    Ok(Comment {
        id: row.get(0)?,
        message: row.get(1)?,
        role,
        timestamp: parse_ts(row, 3)?,
        review_id: row.get(4)?,
        user_id: row.get(5)?,
    })
}

// Fixed-width UTC so that lexical order in SQL matches chronological order.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current time at the precision timestamps are stored with, so returned
/// records compare equal to what a later read yields.
fn current_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

fn now() -> String {
    format_ts(current_time())
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
