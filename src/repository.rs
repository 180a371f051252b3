use crate::error::RepoError;
use crate::models::{
    Assignment, AssignmentFields, AssignmentPatch, AssignmentQuery, DeleteResult, GradeRequest,
    Submission, SubmissionFields, SubmissionQuery, UpdateResult,
};
use async_trait::async_trait;
use sqlx::{PgPool, types::Json};
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// The store adapters for the two collections, `assignment` and `submitted`.
/// Handlers only talk to this trait, so the Postgres store and the in-memory
/// store are interchangeable.
///
/// Every operation is atomic at the single-document level only.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Assignments ---
    async fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>, RepoError>;
    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>, RepoError>;
    // Multi-get used by the submission join. Unknown ids are skipped, order is unspecified.
    async fn get_assignments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Assignment>, RepoError>;
    async fn create_assignment(&self, fields: AssignmentFields) -> Result<Assignment, RepoError>;
    // Upsert: creates the document with `id` when it does not exist.
    async fn update_assignment(
        &self,
        id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<UpdateResult, RepoError>;
    async fn delete_assignment(&self, id: Uuid) -> Result<DeleteResult, RepoError>;

    // --- Submissions ---
    async fn list_submissions(&self, query: &SubmissionQuery) -> Result<Vec<Submission>, RepoError>;
    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, RepoError>;
    async fn create_submission(&self, fields: SubmissionFields) -> Result<Submission, RepoError>;
    // With `upsert`, grading an unknown id creates a document holding only the grade fields.
    async fn grade_submission(
        &self,
        id: Uuid,
        grade: &GradeRequest,
        upsert: bool,
    ) -> Result<UpdateResult, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

type AssignmentRow = (Uuid, Json<AssignmentFields>);
type SubmissionRow = (Uuid, Json<SubmissionFields>);

fn into_assignment((id, Json(fields)): AssignmentRow) -> Assignment {
    Assignment { id, fields }
}

fn into_submission((id, Json(fields)): SubmissionRow) -> Submission {
    Submission { id, fields }
}

/// PostgresRepository
///
/// Document store on PostgreSQL: one table per collection, each row holding the
/// store-native id and the document body as JSONB (see `migrations/`).
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    /// list_assignments
    ///
    /// `difficulty` is an exact match; the title match is a case-insensitive
    /// substring test done with `strpos`, so the search term is never interpreted
    /// as a pattern.
    async fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>, RepoError> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, doc
            FROM assignment
            WHERE ($1::text IS NULL OR doc->>'difficulty' = $1)
              AND ($2::text IS NULL OR strpos(lower(doc->>'title'), lower($2)) > 0)
            ORDER BY seq
            "#,
        )
        .bind(query.difficulty.as_deref())
        .bind(query.title_contains.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(into_assignment).collect())
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>, RepoError> {
        let row = sqlx::query_as::<_, AssignmentRow>("SELECT id, doc FROM assignment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(into_assignment))
    }

    async fn get_assignments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Assignment>, RepoError> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            "SELECT id, doc FROM assignment WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(into_assignment).collect())
    }

    async fn create_assignment(&self, fields: AssignmentFields) -> Result<Assignment, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO assignment (id, doc) VALUES ($1, $2)")
            .bind(id)
            .bind(Json(&fields))
            .execute(&self.pool)
            .await?;

        Ok(Assignment { id, fields })
    }

    /// update_assignment
    ///
    /// Read-modify-write under `SELECT ... FOR UPDATE`, so concurrent updates of the
    /// same document serialize and the last writer wins field by field.
    async fn update_assignment(
        &self,
        id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<UpdateResult, RepoError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, AssignmentRow>(
            "SELECT id, doc FROM assignment WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match current {
            Some((_, Json(mut fields))) => {
                let modified = patch.apply(&mut fields);
                if modified {
                    sqlx::query("UPDATE assignment SET doc = $2 WHERE id = $1")
                        .bind(id)
                        .bind(Json(&fields))
                        .execute(&mut *tx)
                        .await?;
                }
                UpdateResult::matched(modified)
            }
            None => {
                let mut fields = AssignmentFields::default();
                patch.apply(&mut fields);
                sqlx::query("INSERT INTO assignment (id, doc) VALUES ($1, $2)")
                    .bind(id)
                    .bind(Json(&fields))
                    .execute(&mut *tx)
                    .await?;
                UpdateResult::upserted(id)
            }
        };

        tx.commit().await?;
        Ok(result)
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<DeleteResult, RepoError> {
        let result = sqlx::query("DELETE FROM assignment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(DeleteResult::new(result.rows_affected()))
    }

    async fn list_submissions(&self, query: &SubmissionQuery) -> Result<Vec<Submission>, RepoError> {
        let rows = sqlx::query_as::<_, SubmissionRow>(
            r#"
            SELECT id, doc
            FROM submitted
            WHERE ($1::text IS NULL OR doc->>'email' = $1)
              AND ($2::text IS NULL OR COALESCE(doc->'status', to_jsonb('Pending'::text)) = to_jsonb($2::text))
            ORDER BY seq
            "#,
        )
        .bind(query.email.as_deref())
        .bind(query.status.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(into_submission).collect())
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, RepoError> {
        let row = sqlx::query_as::<_, SubmissionRow>("SELECT id, doc FROM submitted WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(into_submission))
    }

    async fn create_submission(&self, fields: SubmissionFields) -> Result<Submission, RepoError> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO submitted (id, doc) VALUES ($1, $2)")
            .bind(id)
            .bind(Json(&fields))
            .execute(&self.pool)
            .await?;

        Ok(Submission { id, fields })
    }

    /// grade_submission
    ///
    /// Same locking discipline as `update_assignment`. Without `upsert`, an unknown
    /// id leaves the table untouched and reports `UpdateResult::unmatched()`.
    async fn grade_submission(
        &self,
        id: Uuid,
        grade: &GradeRequest,
        upsert: bool,
    ) -> Result<UpdateResult, RepoError> {
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_as::<_, SubmissionRow>(
            "SELECT id, doc FROM submitted WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match current {
            Some((_, Json(mut fields))) => {
                let modified = fields.apply_grade(grade);
                if modified {
                    sqlx::query("UPDATE submitted SET doc = $2 WHERE id = $1")
                        .bind(id)
                        .bind(Json(&fields))
                        .execute(&mut *tx)
                        .await?;
                }
                UpdateResult::matched(modified)
            }
            None if upsert => {
                let mut fields = SubmissionFields::default();
                fields.apply_grade(grade);
                sqlx::query("INSERT INTO submitted (id, doc) VALUES ($1, $2)")
                    .bind(id)
                    .bind(Json(&fields))
                    .execute(&mut *tx)
                    .await?;
                UpdateResult::upserted(id)
            }
            None => UpdateResult::unmatched(),
        };

        tx.commit().await?;
        Ok(result)
    }
}
