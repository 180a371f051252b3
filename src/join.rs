use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::RepoError,
    models::{Assignment, Submission},
    repository::Repository,
};

// Keys the join owns on an enriched record.
const JOINED_KEYS: [&str; 3] = ["title", "marks", "imgUrl"];

/// JoinedSubmission
///
/// A submission enriched with the denormalized fields of its assignment, so the
/// record is self-contained for the client. The submission's own `status`,
/// `obtainMarks` and `feedback` sit next to the assignment's `title`, `marks`
/// and `imgUrl`. The three assignment fields are absent when the referenced
/// assignment no longer exists.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedSubmission {
    #[serde(flatten)]
    pub submission: Submission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub marks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
}

/// enrich
///
/// Joins one submission with its assignment, if it was found.
pub fn enrich(mut submission: Submission, assignment: Option<&Assignment>) -> JoinedSubmission {
    let Some(assignment) = assignment else {
        return JoinedSubmission {
            submission,
            title: None,
            marks: None,
            img_url: None,
        };
    };

    // Submitter-supplied keys with the same names would otherwise be serialized twice.
    for key in JOINED_KEYS {
        submission.fields.extra.remove(key);
    }

    JoinedSubmission {
        submission,
        title: assignment.fields.title.clone(),
        marks: assignment.fields.marks.clone(),
        img_url: assignment.fields.img_url.clone(),
    }
}

/// join_submissions
///
/// Enriches every submission with its referenced assignment. All referenced ids
/// are fetched with one multi-get; the output keeps the input order.
///
/// A reference that is malformed or points at a deleted assignment only leaves
/// that record un-enriched. The submission and assignment reads are independent,
/// so an assignment deleted in between is simply treated as not found. A store
/// failure fails the whole batch.
pub async fn join_submissions(
    repo: &dyn Repository,
    submissions: Vec<Submission>,
) -> Result<Vec<JoinedSubmission>, RepoError> {
    let ids: Vec<Uuid> = submissions
        .iter()
        .filter_map(assignment_ref)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let assignments: HashMap<Uuid, Assignment> = if ids.is_empty() {
        HashMap::new()
    } else {
        repo.get_assignments_by_ids(&ids)
            .await?
            .into_iter()
            .map(|assignment| (assignment.id, assignment))
            .collect()
    };

    Ok(submissions
        .into_iter()
        .map(|submission| {
            let assignment = assignment_ref(&submission).and_then(|id| assignments.get(&id));
            enrich(submission, assignment)
        })
        .collect())
}

fn assignment_ref(submission: &Submission) -> Option<Uuid> {
    Uuid::parse_str(submission.fields.assignment_id.trim()).ok()
}
