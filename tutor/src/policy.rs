use crate::llm::{CollaboratorError, GuidanceCollaborator, GuidanceRequest};
use code_analyzer::AnalysisError;
use common::models::{AnalysisPayload, AnalysisRecord, DegradedAnalysis, IssueType, TutorResponse};
use log::{debug, error, warn};
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use utoipa::ToSchema;

/// When a submission is forwarded to the language model.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EscalationMode {
    /// Every submission gets a guiding message.
    Always,
    /// Only submissions the analyzer flagged as a conceptual issue.
    GatedOnConceptualIssue,
}

#[derive(Error, Debug)]
pub enum AnalysisUnavailable {
    #[error(transparent)]
    Rejected(#[from] AnalysisError),
    #[error("analysis task panicked")]
    Panicked,
}

#[derive(Debug, Clone)]
pub struct PolicySettings {
    pub fallback_question: String,
    /// Used instead of `fallback_question` in gated mode.
    pub gated_fallback_question: String,
    pub timeout: Duration,
    pub max_concurrent: NonZeroUsize,
}

pub struct TutorPolicy {
    collaborator: Arc<dyn GuidanceCollaborator>,
    fallback_question: String,
    gated_fallback_question: String,
    timeout: Duration,
    permits: Semaphore,
}

impl TutorPolicy {
    pub fn new(collaborator: Arc<dyn GuidanceCollaborator>, settings: PolicySettings) -> Self {
        TutorPolicy {
            collaborator,
            fallback_question: settings.fallback_question,
            gated_fallback_question: settings.gated_fallback_question,
            timeout: settings.timeout,
            permits: Semaphore::new(settings.max_concurrent.get()),
        }
    }

    pub fn collaborator_enabled(&self) -> bool {
        self.collaborator.is_enabled()
    }

    /// Builds the response for one submission. Neither a missing analysis nor
    /// a failing collaborator is reported to the caller.
    pub async fn respond(
        &self,
        mode: EscalationMode,
        code: &str,
        context: Option<&str>,
        analysis: Result<AnalysisRecord, AnalysisUnavailable>,
    ) -> TutorResponse {
        let (analysis, issue_type, needs_conceptual_help) = match analysis {
            Ok(record) => {
                let issue_type = record.issue_type.unwrap_or(IssueType::General);
                let needs_conceptual_help = record.has_conceptual_issue;
                (
                    AnalysisPayload::Complete(record),
                    issue_type,
                    needs_conceptual_help,
                )
            }
            Err(e) => {
                warn!("continuing without analysis: {e}");
                (
                    AnalysisPayload::Degraded(DegradedAnalysis::default()),
                    IssueType::General,
                    false,
                )
            }
        };

        let escalate = match mode {
            EscalationMode::Always => true,
            EscalationMode::GatedOnConceptualIssue => needs_conceptual_help,
        };

        let question = if escalate {
            let request = GuidanceRequest {
                code,
                issue_type,
                context: context.unwrap_or_default(),
            };
            Some(self.ask(mode, &request).await)
        } else {
            debug!("no conceptual issue found, not escalating");
            None
        };

        TutorResponse {
            question,
            analysis,
            needs_conceptual_help,
        }
    }

    fn fallback(&self, mode: EscalationMode) -> String {
        match mode {
            EscalationMode::Always => self.fallback_question.clone(),
            EscalationMode::GatedOnConceptualIssue => self.gated_fallback_question.clone(),
        }
    }

    async fn ask(&self, mode: EscalationMode, request: &GuidanceRequest<'_>) -> String {
        match self.request_guidance(request).await {
            Ok(message) => message,
            Err(CollaboratorError::Disabled) => {
                debug!("guidance service disabled, using fallback question");
                self.fallback(mode)
            }
            Err(e) => {
                error!("error while requesting guidance: {e}");
                self.fallback(mode)
            }
        }
    }

    async fn request_guidance(
        &self,
        request: &GuidanceRequest<'_>,
    ) -> Result<String, CollaboratorError> {
        if !self.collaborator.is_enabled() {
            return Err(CollaboratorError::Disabled);
        }

        // The deadline covers waiting for a permit as well as the call itself.
        let guarded = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| CollaboratorError::Closed)?;
            self.collaborator.generate(request).await
        };
        let message = tokio::time::timeout(self.timeout, guarded)
            .await
            .map_err(|_| CollaboratorError::Timeout(self.timeout))??;

        if message.trim().is_empty() {
            return Err(CollaboratorError::Empty);
        }
        Ok(message)
    }
}
