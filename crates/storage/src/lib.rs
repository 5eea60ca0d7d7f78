use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;

use webapi_core::types::{Action, NewAction, NewProject, Project};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for reading and writing projects.
    pub fn projects(&self) -> ProjectRepository {
        ProjectRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for reading and writing actions.
    pub fn actions(&self) -> ActionRepository {
        ActionRepository {
            pool: self.pool.clone(),
        }
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
}

/// Errors surfaced by repository queries.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const PROJECT_COLUMNS: &str = "id, name, description, completed";
const ACTION_COLUMNS: &str = "id, project_id, description, notes, completed";

/// Repository responsible for the `projects` table.
#[derive(Clone)]
pub struct ProjectRepository {
    pool: SqlitePool,
}

impl ProjectRepository {
    /// Fetches a single project by id.
    pub async fn get(&self, id: i64) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProjectRow::into_domain))
    }

    /// Lists every project ordered by id.
    pub async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProjectRow>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ProjectRow::into_domain).collect())
    }

    /// Inserts a project and returns the stored row.
    pub async fn insert(&self, project: &NewProject) -> Result<Project, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "INSERT INTO projects (name, description, completed) \
             VALUES (?, ?, ?) \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(&project.name)
        .bind(&project.description)
        .bind(project.completed.unwrap_or(false))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_domain())
    }

    /// Replaces the project's fields, returning `None` when the id is unknown.
    pub async fn update(
        &self,
        id: i64,
        changes: &NewProject,
    ) -> Result<Option<Project>, RepositoryError> {
        let row = sqlx::query_as::<_, ProjectRow>(&format!(
            "UPDATE projects \
             SET name = ?, description = ?, completed = COALESCE(?, completed) \
             WHERE id = ? \
             RETURNING {PROJECT_COLUMNS}"
        ))
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.completed)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ProjectRow::into_domain))
    }

    /// Deletes the project and returns the number of rows removed.
    ///
    /// Actions that reference the project are left untouched.
    pub async fn remove(&self, id: i64) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Lists the actions that reference the project, ordered by id.
    pub async fn project_actions(&self, project_id: i64) -> Result<Vec<Action>, RepositoryError> {
        let rows = sqlx::query_as::<_, ActionRow>(&format!(
            "SELECT {ACTION_COLUMNS} FROM actions WHERE project_id = ? ORDER BY id"
        ))
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ActionRow::into_domain).collect())
    }
}

/// Repository responsible for the `actions` table.
#[derive(Clone)]
pub struct ActionRepository {
    pool: SqlitePool,
}

impl ActionRepository {
    /// Fetches a single action by id.
    pub async fn get(&self, id: i64) -> Result<Option<Action>, RepositoryError> {
        let row = sqlx::query_as::<_, ActionRow>(&format!(
            "SELECT {ACTION_COLUMNS} FROM actions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ActionRow::into_domain))
    }

    /// Lists every action ordered by id.
    pub async fn list(&self) -> Result<Vec<Action>, RepositoryError> {
        let rows = sqlx::query_as::<_, ActionRow>(&format!(
            "SELECT {ACTION_COLUMNS} FROM actions ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ActionRow::into_domain).collect())
    }

    /// Inserts an action and returns the stored row.
    pub async fn insert(&self, action: &NewAction) -> Result<Action, RepositoryError> {
        let row = sqlx::query_as::<_, ActionRow>(&format!(
            "INSERT INTO actions (project_id, description, notes, completed) \
             VALUES (?, ?, ?, ?) \
             RETURNING {ACTION_COLUMNS}"
        ))
        .bind(action.project_id)
        .bind(&action.description)
        .bind(&action.notes)
        .bind(action.completed.unwrap_or(false))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_domain())
    }

    /// Replaces the action's fields, returning `None` when the id is unknown.
    pub async fn update(
        &self,
        id: i64,
        changes: &NewAction,
    ) -> Result<Option<Action>, RepositoryError> {
        let row = sqlx::query_as::<_, ActionRow>(&format!(
            "UPDATE actions \
             SET project_id = ?, description = ?, notes = ?, completed = COALESCE(?, completed) \
             WHERE id = ? \
             RETURNING {ACTION_COLUMNS}"
        ))
        .bind(changes.project_id)
        .bind(&changes.description)
        .bind(&changes.notes)
        .bind(changes.completed)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ActionRow::into_domain))
    }

    /// Deletes the action and returns the number of rows removed.
    pub async fn remove(&self, id: i64) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM actions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: i64,
    name: String,
    description: String,
    completed: bool,
}

impl ProjectRow {
    fn into_domain(self) -> Project {
        Project {
            id: self.id,
            name: self.name,
            description: self.description,
            completed: self.completed,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ActionRow {
    id: i64,
    project_id: i64,
    description: String,
    notes: String,
    completed: bool,
}

impl ActionRow {
    fn into_domain(self) -> Action {
        Action {
            id: self.id,
            project_id: self.project_id,
            description: self.description,
            notes: self.notes,
            completed: self.completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup_db() -> Database {
        let db = Database::connect("sqlite::memory:")
            .await
            .expect("connect");
        db.run_migrations().await.expect("migrations");
        db
    }

    fn new_project(name: &str) -> NewProject {
        NewProject {
            name: name.to_string(),
            description: format!("{name} description"),
            completed: None,
        }
    }

    fn new_action(project_id: i64, description: &str) -> NewAction {
        NewAction {
            project_id,
            description: description.to_string(),
            notes: "notes".to_string(),
            completed: None,
        }
    }

    #[tokio::test]
    async fn migrations_apply() {
        let db = setup_db().await;

        let tables: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('projects', 'actions')",
        )
        .fetch_one(&db.pool)
        .await
        .expect("fetch tables");
        assert_eq!(tables.0, 2, "expected projects and actions tables");
    }

    #[tokio::test]
    async fn project_insert_then_get() {
        let db = setup_db().await;
        let repo = db.projects();

        let stored = repo.insert(&new_project("Garden")).await.expect("insert");
        assert_eq!(stored.name, "Garden");
        assert!(!stored.completed);

        let fetched = repo.get(stored.id).await.expect("get").expect("present");
        assert_eq!(fetched, stored);
        assert!(repo.get(stored.id + 100).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn project_list_is_ordered_by_id() {
        let db = setup_db().await;
        let repo = db.projects();
        let first = repo.insert(&new_project("one")).await.expect("insert");
        let second = repo.insert(&new_project("two")).await.expect("insert");

        let ids: Vec<i64> = repo
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|project| project.id)
            .collect();
        assert_eq!(ids, vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn project_update_keeps_completed_when_not_supplied() {
        let db = setup_db().await;
        let repo = db.projects();
        let stored = repo
            .insert(&NewProject {
                completed: Some(true),
                ..new_project("Garden")
            })
            .await
            .expect("insert");

        let updated = repo
            .update(stored.id, &new_project("Orchard"))
            .await
            .expect("update")
            .expect("present");
        assert_eq!(updated.name, "Orchard");
        assert!(updated.completed);

        let missing = repo
            .update(stored.id + 1, &new_project("Nowhere"))
            .await
            .expect("update");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn project_remove_leaves_actions_behind() {
        let db = setup_db().await;
        let project = db.projects().insert(&new_project("Garden")).await.expect("insert");
        let action = db
            .actions()
            .insert(&new_action(project.id, "Buy seeds"))
            .await
            .expect("insert action");

        assert_eq!(db.projects().remove(project.id).await.expect("remove"), 1);
        assert_eq!(db.projects().remove(project.id).await.expect("remove"), 0);
        assert!(db.projects().get(project.id).await.expect("get").is_none());

        let orphan = db.actions().get(action.id).await.expect("get").expect("kept");
        assert_eq!(orphan.project_id, project.id);
    }

    #[tokio::test]
    async fn project_actions_only_returns_matching_rows() {
        let db = setup_db().await;
        let garden = db.projects().insert(&new_project("Garden")).await.expect("insert");
        let kitchen = db.projects().insert(&new_project("Kitchen")).await.expect("insert");
        let actions = db.actions();
        actions.insert(&new_action(garden.id, "Buy seeds")).await.expect("insert");
        actions.insert(&new_action(kitchen.id, "Paint walls")).await.expect("insert");
        actions.insert(&new_action(garden.id, "Water")).await.expect("insert");

        let garden_actions = db
            .projects()
            .project_actions(garden.id)
            .await
            .expect("project actions");
        let descriptions: Vec<&str> = garden_actions
            .iter()
            .map(|action| action.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["Buy seeds", "Water"]);

        let empty = db.projects().project_actions(kitchen.id + 10).await.expect("empty");
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn action_update_and_remove() {
        let db = setup_db().await;
        let project = db.projects().insert(&new_project("Garden")).await.expect("insert");
        let repo = db.actions();
        let stored = repo
            .insert(&new_action(project.id, "Buy seeds"))
            .await
            .expect("insert");

        let updated = repo
            .update(
                stored.id,
                &NewAction {
                    completed: Some(true),
                    ..new_action(project.id, "Plant seeds")
                },
            )
            .await
            .expect("update")
            .expect("present");
        assert_eq!(updated.description, "Plant seeds");
        assert!(updated.completed);

        assert_eq!(repo.list().await.expect("list").len(), 1);
        assert_eq!(repo.remove(stored.id).await.expect("remove"), 1);
        assert!(repo.get(stored.id).await.expect("get").is_none());
        assert!(repo
            .update(stored.id, &new_action(project.id, "gone"))
            .await
            .expect("update")
            .is_none());
    }

    #[tokio::test]
    async fn file_database_persists_across_connections() {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("webapi.db").display()
        );

        let db = Database::connect(&url).await.expect("connect");
        db.run_migrations().await.expect("migrations");
        let stored = db.projects().insert(&new_project("Garden")).await.expect("insert");
        db.close().await;

        let reopened = Database::connect(&url).await.expect("reconnect");
        reopened.run_migrations().await.expect("migrations are idempotent");
        let fetched = reopened
            .projects()
            .get(stored.id)
            .await
            .expect("get")
            .expect("persisted");
        assert_eq!(fetched.name, "Garden");
        reopened.close().await;
    }
}
