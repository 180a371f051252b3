use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

/// Status every submission starts in until it is graded.
pub const PENDING_STATUS: &str = "Pending";

/// Extra, client-defined document fields that are stored and returned untouched.
pub type ExtraFields = Map<String, Value>;

// --- Assignment Documents ---

/// AssignmentFields
///
/// The body of an assignment document. The six editable fields are named; any
/// other field the client posts on creation (creator name, creator email, ...)
/// lands in `extra` and round-trips verbatim. `marks` keeps whatever JSON value
/// the client sent (form inputs post numbers as strings).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub marks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: ExtraFields,
}

impl AssignmentFields {
    /// Drops a client-supplied `_id`; identifiers are always assigned by the store.
    pub fn without_id(mut self) -> Self {
        self.extra.remove("_id");
        self
    }
}

/// Assignment
///
/// An assignment document as stored in the `assignment` collection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Assignment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: AssignmentFields,
}

/// AssignmentPatch
///
/// Body of `PUT /update/{id}`. Only the fields that are present are written;
/// absent fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub marks: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl AssignmentPatch {
    /// apply
    ///
    /// Writes every present field onto `fields`. Returns whether anything changed,
    /// which is what distinguishes `modifiedCount` from `matchedCount`.
    pub fn apply(&self, fields: &mut AssignmentFields) -> bool {
        let mut changed = false;
        changed |= set_if_present(&mut fields.title, &self.title);
        changed |= set_if_present(&mut fields.description, &self.description);
        changed |= set_if_present(&mut fields.img_url, &self.img_url);
        changed |= set_if_present(&mut fields.marks, &self.marks);
        changed |= set_if_present(&mut fields.difficulty, &self.difficulty);
        changed |= set_if_present(&mut fields.due_date, &self.due_date);
        changed
    }
}

fn set_if_present<T: Clone + PartialEq>(slot: &mut Option<T>, value: &Option<T>) -> bool {
    match value {
        Some(value) if slot.as_ref() != Some(value) => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

// --- Submission Documents ---

fn pending() -> Value {
    Value::String(PENDING_STATUS.to_string())
}

/// SubmissionFields
///
/// The body of a submission document. `assignment_id` references
/// `Assignment::id` by its string value and `email` names the owner.
/// Both are empty only for documents created by a legacy grading upsert.
///
/// The grade fields hold the JSON values posted by the grader, unvalidated.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionFields {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub assignment_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default = "pending")]
    #[schema(value_type = Object)]
    pub status: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub obtain_marks: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub feedback: Option<Value>,
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: ExtraFields,
}

impl Default for SubmissionFields {
    fn default() -> Self {
        Self {
            assignment_id: String::new(),
            email: String::new(),
            status: pending(),
            obtain_marks: None,
            feedback: None,
            extra: ExtraFields::new(),
        }
    }
}

impl SubmissionFields {
    /// Drops a client-supplied `_id`; identifiers are always assigned by the store.
    pub fn without_id(mut self) -> Self {
        self.extra.remove("_id");
        self
    }

    /// Writes the three grade fields unconditionally. Returns whether anything changed.
    pub fn apply_grade(&mut self, grade: &GradeRequest) -> bool {
        let changed = self.status != grade.status
            || self.obtain_marks.as_ref() != Some(&grade.obtain_marks)
            || self.feedback.as_ref() != Some(&grade.feedback);

        self.status = grade.status.clone();
        self.obtain_marks = Some(grade.obtain_marks.clone());
        self.feedback = Some(grade.feedback.clone());
        changed
    }
}

/// Submission
///
/// A submission document as stored in the `submitted` collection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Submission {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: SubmissionFields,
}

/// GradeRequest
///
/// Body of `PATCH /giveMark/{id}`. No type, range or vocabulary checks are
/// applied: each value is stored exactly as posted, and an absent one as `null`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    #[serde(default)]
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub status: Value,
    #[serde(default)]
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub obtain_marks: Value,
    #[serde(default)]
    #[ts(type = "unknown")]
    #[schema(value_type = Object)]
    pub feedback: Value,
}

// --- Store Filters ---

/// AssignmentQuery
///
/// Filter for listing assignments. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentQuery {
    /// Exact match on `difficulty`.
    pub difficulty: Option<String>,
    /// Case-insensitive substring match on `title`.
    pub title_contains: Option<String>,
}

impl AssignmentQuery {
    /// An empty value or the literal `all` disables the difficulty filter.
    pub fn by_difficulty(difficulty: Option<String>) -> Self {
        let difficulty = difficulty.filter(|d| !d.is_empty() && d != "all");
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// A blank search term matches every assignment.
    pub fn by_title(term: Option<String>) -> Self {
        let title_contains = term.filter(|t| !t.trim().is_empty());
        Self {
            title_contains,
            ..Self::default()
        }
    }

    pub fn matches(&self, fields: &AssignmentFields) -> bool {
        if let Some(difficulty) = &self.difficulty {
            if fields.difficulty.as_deref() != Some(difficulty.as_str()) {
                return false;
            }
        }
        if let Some(term) = &self.title_contains {
            let title = fields.title.as_deref().unwrap_or_default().to_lowercase();
            if !title.contains(&term.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

/// SubmissionQuery
///
/// Filter for listing submissions. `None` means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionQuery {
    pub email: Option<String>,
    pub status: Option<String>,
}

impl SubmissionQuery {
    pub fn owned_by(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            status: None,
        }
    }

    pub fn pending() -> Self {
        Self {
            email: None,
            status: Some(PENDING_STATUS.to_string()),
        }
    }

    pub fn matches(&self, fields: &SubmissionFields) -> bool {
        self.email.as_ref().is_none_or(|email| &fields.email == email)
            && self
                .status
                .as_ref()
                .is_none_or(|status| fields.status.as_str() == Some(status.as_str()))
    }
}

// --- Write Results (Output Schemas) ---

/// InsertResult
///
/// Answer to a create request: the id the store assigned.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

impl InsertResult {
    pub fn new(inserted_id: Uuid) -> Self {
        Self {
            acknowledged: true,
            inserted_id,
        }
    }
}

/// UpdateResult
///
/// Answer to an update or grading request. `upserted_id` is set only when the
/// write created a new document.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<Uuid>,
}

impl UpdateResult {
    /// The target document existed; `modified` tells whether its content changed.
    pub fn matched(modified: bool) -> Self {
        Self {
            acknowledged: true,
            matched_count: 1,
            modified_count: u64::from(modified),
            upserted_count: 0,
            upserted_id: None,
        }
    }

    /// The target document did not exist and was created with `id`.
    pub fn upserted(id: Uuid) -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 1,
            upserted_id: Some(id),
        }
    }

    /// The target document did not exist and nothing was written.
    pub fn unmatched() -> Self {
        Self {
            acknowledged: true,
            matched_count: 0,
            modified_count: 0,
            upserted_count: 0,
            upserted_id: None,
        }
    }

    pub fn wrote_nothing(&self) -> bool {
        self.matched_count == 0 && self.upserted_count == 0
    }
}

/// DeleteResult
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

impl DeleteResult {
    pub fn new(deleted_count: u64) -> Self {
        Self {
            acknowledged: true,
            deleted_count,
        }
    }
}
