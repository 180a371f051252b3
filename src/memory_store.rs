use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::RepoError,
    models::{
        Assignment, AssignmentFields, AssignmentPatch, AssignmentQuery, DeleteResult,
        GradeRequest, Submission, SubmissionFields, SubmissionQuery, UpdateResult,
    },
    repository::Repository,
};

#[derive(Default)]
struct Collections {
    // Insertion order is listing order, as in the Postgres store.
    assignments: Vec<Assignment>,
    submissions: Vec<Submission>,
}

/// MemoryRepository
///
/// In-process implementation of `Repository` with the same semantics as
/// `PostgresRepository`. Used when no `DATABASE_URL` is configured in local mode
/// and as the store behind handler and API tests.
#[derive(Default)]
pub struct MemoryRepository {
    collections: RwLock<Collections>,
    /// When true, all operations return a simulated store failure.
    pub should_fail: bool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    fn check(&self) -> Result<(), RepoError> {
        if self.should_fail {
            return Err(RepoError::Unavailable(
                "Mock Store Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn list_assignments(&self, query: &AssignmentQuery) -> Result<Vec<Assignment>, RepoError> {
        self.check()?;
        let collections = self.collections.read().await;
        Ok(collections
            .assignments
            .iter()
            .filter(|a| query.matches(&a.fields))
            .cloned()
            .collect())
    }

    async fn get_assignment(&self, id: Uuid) -> Result<Option<Assignment>, RepoError> {
        self.check()?;
        let collections = self.collections.read().await;
        Ok(collections.assignments.iter().find(|a| a.id == id).cloned())
    }

    async fn get_assignments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Assignment>, RepoError> {
        self.check()?;
        let collections = self.collections.read().await;
        Ok(collections
            .assignments
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }

    async fn create_assignment(&self, fields: AssignmentFields) -> Result<Assignment, RepoError> {
        self.check()?;
        let assignment = Assignment {
            id: Uuid::new_v4(),
            fields,
        };
        self.collections
            .write()
            .await
            .assignments
            .push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        id: Uuid,
        patch: &AssignmentPatch,
    ) -> Result<UpdateResult, RepoError> {
        self.check()?;
        let mut collections = self.collections.write().await;

        if let Some(existing) = collections.assignments.iter_mut().find(|a| a.id == id) {
            return Ok(UpdateResult::matched(patch.apply(&mut existing.fields)));
        }

        let mut fields = AssignmentFields::default();
        patch.apply(&mut fields);
        collections.assignments.push(Assignment { id, fields });
        Ok(UpdateResult::upserted(id))
    }

    async fn delete_assignment(&self, id: Uuid) -> Result<DeleteResult, RepoError> {
        self.check()?;
        let mut collections = self.collections.write().await;
        let before = collections.assignments.len();
        collections.assignments.retain(|a| a.id != id);
        Ok(DeleteResult::new((before - collections.assignments.len()) as u64))
    }

    async fn list_submissions(&self, query: &SubmissionQuery) -> Result<Vec<Submission>, RepoError> {
        self.check()?;
        let collections = self.collections.read().await;
        Ok(collections
            .submissions
            .iter()
            .filter(|s| query.matches(&s.fields))
            .cloned()
            .collect())
    }

    async fn get_submission(&self, id: Uuid) -> Result<Option<Submission>, RepoError> {
        self.check()?;
        let collections = self.collections.read().await;
        Ok(collections.submissions.iter().find(|s| s.id == id).cloned())
    }

    async fn create_submission(&self, fields: SubmissionFields) -> Result<Submission, RepoError> {
        self.check()?;
        let submission = Submission {
            id: Uuid::new_v4(),
            fields,
        };
        self.collections
            .write()
            .await
            .submissions
            .push(submission.clone());
        Ok(submission)
    }

    async fn grade_submission(
        &self,
        id: Uuid,
        grade: &GradeRequest,
        upsert: bool,
    ) -> Result<UpdateResult, RepoError> {
        self.check()?;
        let mut collections = self.collections.write().await;

        if let Some(existing) = collections.submissions.iter_mut().find(|s| s.id == id) {
            return Ok(UpdateResult::matched(existing.fields.apply_grade(grade)));
        }
        if !upsert {
            return Ok(UpdateResult::unmatched());
        }

        let mut fields = SubmissionFields::default();
        fields.apply_grade(grade);
        collections.submissions.push(Submission { id, fields });
        Ok(UpdateResult::upserted(id))
    }
}
