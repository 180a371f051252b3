use assignment_hub::models::{
    Assignment, AssignmentFields, AssignmentPatch, AssignmentQuery, GradeRequest, InsertResult,
    PENDING_STATUS, Submission, SubmissionFields, SubmissionQuery, UpdateResult,
};
use serde_json::json;
use uuid::Uuid;

// --- Document Shapes ---

#[test]
fn test_assignment_serializes_with_store_id_and_camel_case() {
    let id = Uuid::new_v4();
    let assignment = Assignment {
        id,
        fields: AssignmentFields {
            title: Some("Pointers".to_string()),
            img_url: Some("https://img.example.com/p.png".to_string()),
            due_date: Some("2024-12-01".to_string()),
            ..AssignmentFields::default()
        },
    };

    let value = serde_json::to_value(&assignment).unwrap();
    assert_eq!(value["_id"], id.to_string());
    assert_eq!(value["imgUrl"], "https://img.example.com/p.png");
    assert_eq!(value["dueDate"], "2024-12-01");
    // Absent optional fields are omitted, not null.
    assert!(value.get("description").is_none());
    assert!(value.get("id").is_none());
}

#[test]
fn test_unknown_assignment_fields_round_trip() {
    let body = json!({
        "title": "Closures",
        "marks": 12.5,
        "creatorName": "Ada",
        "tags": ["rust", "fp"],
    });

    let fields: AssignmentFields = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(fields.marks, Some(json!(12.5)));
    assert_eq!(fields.extra.len(), 2);
    assert_eq!(serde_json::to_value(&fields).unwrap(), body);
}

#[test]
fn test_submission_defaults_to_pending() {
    let fields: SubmissionFields =
        serde_json::from_value(json!({ "assignmentId": "abc", "email": "s@example.com" })).unwrap();
    assert_eq!(fields.status, PENDING_STATUS);
    assert_eq!(fields.obtain_marks, None);

    let submission = Submission {
        id: Uuid::new_v4(),
        fields,
    };
    let value = serde_json::to_value(&submission).unwrap();
    assert_eq!(value["status"], "Pending");
    assert_eq!(value["assignmentId"], "abc");
}

#[test]
fn test_client_id_is_dropped() {
    let fields: SubmissionFields = serde_json::from_value(json!({
        "_id": "client-chosen",
        "assignmentId": "abc",
        "email": "s@example.com",
    }))
    .unwrap();
    assert!(fields.extra.contains_key("_id"));
    assert!(!fields.without_id().extra.contains_key("_id"));
}

// --- Patch & Grade ---

#[test]
fn test_patch_only_touches_present_fields() {
    let mut fields = AssignmentFields {
        title: Some("Old".to_string()),
        description: Some("Keep me".to_string()),
        ..AssignmentFields::default()
    };
    let patch: AssignmentPatch = serde_json::from_value(json!({ "title": "New" })).unwrap();

    assert!(patch.apply(&mut fields));
    assert_eq!(fields.title.as_deref(), Some("New"));
    assert_eq!(fields.description.as_deref(), Some("Keep me"));

    // Applying the same patch again changes nothing.
    assert!(!patch.apply(&mut fields));
}

#[test]
fn test_grade_request_wire_shape() {
    let grade: GradeRequest = serde_json::from_value(json!({
        "status": "Completed",
        "obtainMarks": 42,
        "feedback": "Nice",
    }))
    .unwrap();

    let mut fields = SubmissionFields::default();
    assert!(fields.apply_grade(&grade));
    assert_eq!(fields.status, "Completed");
    assert_eq!(fields.obtain_marks, Some(json!(42)));
    assert!(!fields.apply_grade(&grade));
}

#[test]
fn test_marks_keep_the_type_they_were_posted_with() {
    let fields: AssignmentFields =
        serde_json::from_value(json!({ "title": "Forms", "marks": "10" })).unwrap();
    assert_eq!(fields.marks, Some(json!("10")));
    assert_eq!(serde_json::to_value(&fields).unwrap()["marks"], "10");

    let fields: SubmissionFields = serde_json::from_value(json!({
        "assignmentId": "a1",
        "email": "s@example.com",
        "obtainMarks": "",
    }))
    .unwrap();
    assert_eq!(serde_json::to_value(&fields).unwrap()["obtainMarks"], "");

    let grade: GradeRequest = serde_json::from_value(json!({
        "status": "Completed",
        "obtainMarks": "8",
    }))
    .unwrap();
    assert_eq!(grade.obtain_marks, json!("8"));
    assert!(grade.feedback.is_null());

    let mut graded = fields.clone();
    assert!(graded.apply_grade(&grade));
    assert_eq!(graded.obtain_marks, Some(json!("8")));
}

// --- Queries ---

#[test]
fn test_difficulty_query_normalization() {
    assert_eq!(AssignmentQuery::by_difficulty(None), AssignmentQuery::default());
    assert_eq!(AssignmentQuery::by_difficulty(Some(String::new())), AssignmentQuery::default());
    assert_eq!(AssignmentQuery::by_difficulty(Some("all".to_string())), AssignmentQuery::default());
    assert_eq!(
        AssignmentQuery::by_difficulty(Some("easy".to_string())).difficulty.as_deref(),
        Some("easy")
    );
}

#[test]
fn test_title_query_matching() {
    let query = AssignmentQuery::by_title(Some("tree".to_string()));
    let matching = AssignmentFields {
        title: Some("Binary TREES".to_string()),
        ..AssignmentFields::default()
    };
    let untitled = AssignmentFields::default();

    assert!(query.matches(&matching));
    assert!(!query.matches(&untitled));
    assert_eq!(AssignmentQuery::by_title(Some("   ".to_string())), AssignmentQuery::default());
}

#[test]
fn test_submission_query_matching() {
    let fields = SubmissionFields {
        email: "s@example.com".to_string(),
        ..SubmissionFields::default()
    };

    assert!(SubmissionQuery::owned_by("s@example.com").matches(&fields));
    assert!(!SubmissionQuery::owned_by("S@example.com").matches(&fields));
    assert!(SubmissionQuery::pending().matches(&fields));
    assert!(SubmissionQuery::default().matches(&fields));
}

// --- Write Results ---

#[test]
fn test_write_result_json_keys() {
    let id = Uuid::new_v4();

    let inserted = serde_json::to_value(InsertResult::new(id)).unwrap();
    assert_eq!(inserted, json!({ "acknowledged": true, "insertedId": id.to_string() }));

    let upserted = serde_json::to_value(UpdateResult::upserted(id)).unwrap();
    assert_eq!(
        upserted,
        json!({
            "acknowledged": true,
            "matchedCount": 0,
            "modifiedCount": 0,
            "upsertedCount": 1,
            "upsertedId": id.to_string(),
        })
    );

    assert!(UpdateResult::unmatched().wrote_nothing());
    assert!(!UpdateResult::matched(false).wrote_nothing());
}
