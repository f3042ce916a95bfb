//! Per-user state that survives between submissions.
//!
//! The control panel keeps one `Session` per user and passes it into every
//! `StudioClient` call; nothing in the crate holds it globally.

use serde::Serialize;
use uuid::Uuid;

use crate::models::{JobSet, JobState, OperationKind, ResultRef, ResultSet};

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: String,
    original_prompt: String,
    enhanced_prompt: Option<String>,
    last_operation: Option<OperationKind>,
    /// Results of the latest submission, primary first.
    results: Vec<ResultRef>,
    /// References still awaited from the latest submission.
    unresolved: Vec<String>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            original_prompt: String::new(),
            enhanced_prompt: None,
            last_operation: None,
            results: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stores the user's prompt; a changed prompt drops its enhancement.
    pub fn set_prompt(&mut self, prompt: &str) {
        if self.original_prompt != prompt {
            self.original_prompt = prompt.to_string();
            self.enhanced_prompt = None;
        }
    }

    pub fn set_enhanced_prompt(&mut self, enhanced: impl Into<String>) {
        self.enhanced_prompt = Some(enhanced.into());
    }

    pub fn original_prompt(&self) -> &str {
        &self.original_prompt
    }

    pub fn enhanced_prompt(&self) -> Option<&str> {
        self.enhanced_prompt.as_deref()
    }

    /// The enhanced prompt when there is one, else the original.
    pub fn effective_prompt(&self) -> &str {
        self.enhanced_prompt.as_deref().unwrap_or(&self.original_prompt)
    }

    pub fn last_operation(&self) -> Option<OperationKind> {
        self.last_operation
    }

    /// The picture to display.
    pub fn current_result(&self) -> Option<&ResultRef> {
        self.results.first()
    }

    pub fn results(&self) -> ResultSet {
        ResultSet::new(self.results.clone(), self.results.len())
    }

    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    pub fn has_unresolved(&self) -> bool {
        !self.unresolved.is_empty()
    }

    /// Starts a new submission, forgetting the previous one's results.
    pub(crate) fn begin(&mut self, kind: OperationKind) {
        self.last_operation = Some(kind);
        self.results.clear();
        self.unresolved.clear();
    }

    pub(crate) fn record_results(&mut self, results: &ResultSet) {
        self.results.extend(results.iter().cloned());
    }

    /// Adds newly ready jobs and remembers what is still outstanding.
    pub(crate) fn record_jobs(&mut self, jobs: &JobSet) {
        let already: Vec<String> = self
            .results
            .iter()
            .filter_map(|r| r.as_url().map(str::to_string))
            .collect();
        for reference in jobs.references_in(JobState::Ready) {
            if !already.iter().any(|r| r == reference) {
                self.results.push(ResultRef::Url(reference.to_string()));
            }
        }

        self.unresolved = jobs
            .jobs()
            .iter()
            .filter(|job| matches!(job.state(), JobState::Pending | JobState::Expired))
            .map(|job| job.reference().to_string())
            .collect();
    }

    /// Fresh pending jobs for everything still outstanding.
    pub(crate) fn recheck_jobs(&self) -> JobSet {
        JobSet::submit(self.unresolved.iter().cloned())
    }
}
