use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Empty,
    Valid,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    EmptyCode,
    Conceptual,
    General,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::EmptyCode => "empty_code",
            IssueType::Conceptual => "conceptual",
            IssueType::General => "general",
        }
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub enum ErrorKind {
    SyntaxError,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    #[serde(default)]
    pub line: Option<usize>,
    #[serde(default)]
    pub column: Option<usize>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    PotentialUndefinedVariable,
    TypeConversion,
    IterationPattern,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct IssueDetail {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StructureProfile {
    pub has_functions: bool,
    pub has_loops: bool,
    pub has_conditionals: bool,
    pub has_classes: bool,
    pub patterns_detected: Vec<String>,
}

/// Result of analysing one submission.
///
/// `errors` is non-empty exactly when `has_errors` is set, and any warning
/// implies `has_conceptual_issue`. Empty submissions are the one case where
/// `has_conceptual_issue` is set without warnings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct AnalysisRecord {
    pub status: AnalysisStatus,
    pub has_errors: bool,
    pub errors: Vec<ErrorDetail>,
    pub has_conceptual_issue: bool,
    pub issue_type: Option<IssueType>,
    pub warnings: Vec<IssueDetail>,
    pub structure: StructureProfile,
    pub looks_like_code: bool,
}

impl AnalysisRecord {
    pub fn empty() -> Self {
        AnalysisRecord {
            status: AnalysisStatus::Empty,
            has_errors: false,
            errors: vec![],
            has_conceptual_issue: true,
            issue_type: Some(IssueType::EmptyCode),
            warnings: vec![],
            structure: StructureProfile::default(),
            looks_like_code: false,
        }
    }
}

/// Stand-in returned when the analysis itself could not be produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct DegradedAnalysis {
    pub has_errors: bool,
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(untagged)]
pub enum AnalysisPayload {
    Complete(AnalysisRecord),
    Degraded(DegradedAnalysis),
}

fn get_default_language() -> Option<String> {
    Some("python".to_string())
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CodeUpdateRequest {
    pub code: String,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default = "get_default_language")]
    pub language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct TutorResponse {
    pub question: Option<String>,
    pub analysis: AnalysisPayload,
    pub needs_conceptual_help: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct AgentAnalysisResponse {
    pub question: Option<String>,
    pub analysis: AnalysisPayload,
    pub needs_conceptual_help: bool,
    pub agent_id: String,
}
