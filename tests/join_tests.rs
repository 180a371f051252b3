use assignment_hub::{
    MemoryRepository,
    join::{enrich, join_submissions},
    models::{Assignment, AssignmentFields, Submission, SubmissionFields},
    repository::Repository,
};
use serde_json::json;
use uuid::Uuid;

fn assignment(title: &str, marks: u64) -> AssignmentFields {
    AssignmentFields {
        title: Some(title.to_string()),
        marks: Some(json!(marks)),
        img_url: Some(format!("https://img.example.com/{title}.png")),
        ..AssignmentFields::default()
    }
}

fn submission(assignment_id: &str) -> Submission {
    Submission {
        id: Uuid::new_v4(),
        fields: SubmissionFields {
            assignment_id: assignment_id.to_string(),
            email: "s@example.com".to_string(),
            ..SubmissionFields::default()
        },
    }
}

#[tokio::test]
async fn test_join_preserves_order_and_tolerates_bad_references() {
    let repo = MemoryRepository::new();
    let a = repo.create_assignment(assignment("Arrays", 10)).await.unwrap();
    let b = repo.create_assignment(assignment("Bits", 20)).await.unwrap();

    let input = vec![
        submission(&b.id.to_string()),
        submission("not-an-id"),
        submission(&Uuid::new_v4().to_string()),
        submission(&a.id.to_string()),
        submission(&b.id.to_string()),
    ];
    let ids: Vec<Uuid> = input.iter().map(|s| s.id).collect();

    let joined = join_submissions(&repo, input).await.unwrap();

    assert_eq!(joined.iter().map(|j| j.submission.id).collect::<Vec<_>>(), ids);
    let titles: Vec<Option<&str>> = joined.iter().map(|j| j.title.as_deref()).collect();
    assert_eq!(
        titles,
        vec![Some("Bits"), None, None, Some("Arrays"), Some("Bits")]
    );
    assert_eq!(joined[3].marks, Some(json!(10)));
}

#[tokio::test]
async fn test_join_is_idempotent_over_unchanged_store() {
    let repo = MemoryRepository::new();
    let a = repo.create_assignment(assignment("Arrays", 10)).await.unwrap();
    let input = vec![submission(&a.id.to_string()), submission("")];

    let first = join_submissions(&repo, input.clone()).await.unwrap();
    let second = join_submissions(&repo, input).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_join_of_nothing_skips_the_store() {
    // A failing store proves no lookup happened.
    let repo = MemoryRepository::new_failing();
    assert!(join_submissions(&repo, vec![]).await.unwrap().is_empty());
    assert!(join_submissions(&repo, vec![submission("garbage")]).await.is_ok());
}

#[tokio::test]
async fn test_join_surfaces_store_failure() {
    let repo = MemoryRepository::new_failing();
    let result = join_submissions(&repo, vec![submission(&Uuid::new_v4().to_string())]).await;
    assert!(result.is_err());
}

#[test]
fn test_enriched_record_has_no_duplicate_keys() {
    let target = Assignment {
        id: Uuid::new_v4(),
        fields: assignment("Queues", 30),
    };
    let mut record = submission(&target.id.to_string());
    record.fields.extra.insert("title".to_string(), json!("submitter title"));
    record.fields.extra.insert("comment".to_string(), json!("kept"));

    let joined = enrich(record, Some(&target));
    let text = serde_json::to_string(&joined).unwrap();
    assert_eq!(text.matches("\"title\"").count(), 1);

    let value = serde_json::to_value(&joined).unwrap();
    assert_eq!(value["title"], "Queues");
    assert_eq!(value["marks"], 30);
    assert_eq!(value["imgUrl"], "https://img.example.com/Queues.png");
    assert_eq!(value["comment"], "kept");
    assert_eq!(value["status"], "Pending");
}

#[test]
fn test_unenriched_record_keeps_its_own_fields() {
    let mut record = submission("missing");
    record.fields.extra.insert("title".to_string(), json!("submitter title"));

    let joined = enrich(record, None);
    let value = serde_json::to_value(&joined).unwrap();
    assert_eq!(value["title"], "submitter title");
    assert!(value.get("marks").is_none());
}
