use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Ready,
    /// The probe reported the reference can never become ready.
    Failed,
    /// Attempt budget ran out; the reference may still become ready later.
    Expired,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationJob {
    reference: String,
    state: JobState,
    attempts: u32,
}

impl GenerationJob {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            state: JobState::Pending,
            attempts: 0,
        }
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Number of probes issued for this job.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub(crate) fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Moves a pending job to `next`. Terminal jobs keep their state.
    pub(crate) fn transition(&mut self, next: JobState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.state = next;
        true
    }
}

/// Jobs of one submission, kept in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSet {
    jobs: Vec<GenerationJob>,
}

impl JobSet {
    pub fn submit<I, S>(references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            jobs: references.into_iter().map(GenerationJob::new).collect(),
        }
    }

    pub fn jobs(&self) -> &[GenerationJob] {
        &self.jobs
    }

    pub(crate) fn jobs_mut(&mut self) -> &mut [GenerationJob] {
        &mut self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn references_in(&self, state: JobState) -> Vec<&str> {
        self.jobs
            .iter()
            .filter(|job| job.state == state)
            .map(|job| job.reference())
            .collect()
    }

    pub fn count(&self, state: JobState) -> usize {
        self.jobs.iter().filter(|job| job.state == state).count()
    }

    pub fn has_pending(&self) -> bool {
        self.jobs.iter().any(|job| job.state == JobState::Pending)
    }

    /// Fresh pending jobs for every expired reference, for a manual re-check.
    /// The expired jobs themselves stay expired.
    pub fn resubmit_expired(&self) -> JobSet {
        JobSet::submit(self.references_in(JobState::Expired))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = GenerationJob::new("https://x/1.png");
        assert!(job.transition(JobState::Ready));
        assert!(!job.transition(JobState::Pending));
        assert!(!job.transition(JobState::Expired));
        assert_eq!(job.state(), JobState::Ready);
    }

    #[test]
    fn test_resubmit_expired() {
        let mut set = JobSet::submit(vec!["a", "b", "c"]);
        set.jobs_mut()[0].transition(JobState::Ready);
        set.jobs_mut()[1].transition(JobState::Expired);
        set.jobs_mut()[2].transition(JobState::Expired);

        let retry = set.resubmit_expired();
        assert_eq!(retry.references_in(JobState::Pending), vec!["b", "c"]);
        assert_eq!(set.count(JobState::Expired), 2);
    }
}
