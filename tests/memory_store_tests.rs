use assignment_hub::{
    MemoryRepository,
    models::{AssignmentFields, AssignmentPatch, AssignmentQuery, GradeRequest, SubmissionFields, UpdateResult},
    repository::Repository,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MemoryRepository::new_failing();

        let result = mock.list_assignments(&AssignmentQuery::default()).await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Simulation requested")
        );
        assert!(mock.create_submission(SubmissionFields::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_listing_keeps_insertion_order() {
        let mock = MemoryRepository::new();
        for title in ["c", "a", "b"] {
            mock.create_assignment(AssignmentFields {
                title: Some(title.to_string()),
                ..AssignmentFields::default()
            })
            .await
            .unwrap();
        }

        let titles: Vec<_> = mock
            .list_assignments(&AssignmentQuery::default())
            .await
            .unwrap()
            .into_iter()
            .filter_map(|a| a.fields.title)
            .collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_upsert_then_update() {
        let mock = MemoryRepository::new();
        let id = Uuid::new_v4();
        let patch = AssignmentPatch {
            marks: Some(json!(5)),
            ..AssignmentPatch::default()
        };

        assert_eq!(mock.update_assignment(id, &patch).await.unwrap(), UpdateResult::upserted(id));
        assert_eq!(mock.update_assignment(id, &patch).await.unwrap(), UpdateResult::matched(false));
        assert_eq!(mock.list_assignments(&AssignmentQuery::default()).await.unwrap().len(), 1);
    }
}

#[tokio::test]
async fn test_concurrent_grades_leave_one_consistent_grade() {
    let repo = Arc::new(MemoryRepository::new());
    let submission = repo
        .create_submission(SubmissionFields {
            assignment_id: Uuid::new_v4().to_string(),
            email: "s@example.com".to_string(),
            ..SubmissionFields::default()
        })
        .await
        .unwrap();

    let id = submission.id;
    let mut handles = Vec::new();
    for mark in 0..16u64 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            let grade = GradeRequest {
                status: json!("Completed"),
                obtain_marks: json!(mark),
                feedback: json!(format!("grader {mark}")),
            };
            repo.grade_submission(id, &grade, false).await.unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().matched_count, 1);
    }

    // The three grade fields always come from the same writer.
    let stored = repo.get_submission(id).await.unwrap().unwrap();
    let mark = stored.fields.obtain_marks.unwrap().as_u64().unwrap();
    assert_eq!(stored.fields.feedback, Some(json!(format!("grader {mark}"))));
    assert_eq!(stored.fields.email, "s@example.com");
}
