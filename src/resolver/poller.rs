//! Bounded, cancellable polling of pending generation jobs.
//!
//! Each attempt probes every pending job of a submission concurrently (up
//! to `max_concurrency` in flight), then waits out the interval before the
//! next attempt. Probe errors count as "not ready yet". Jobs still pending
//! when the attempt budget runs out become `Expired`.

use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::probe::{ProbeStatus, ReadinessProbe};
use crate::{
    config::PollConfig,
    error::{Result, StudioError},
    logger::Timer,
    models::{JobSet, JobState, ResultRef, ResultSet},
};

/// Result of one probe round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollRound {
    /// Newly ready references, in submission order.
    pub ready: Vec<String>,
    pub newly_failed: Vec<String>,
    pub still_pending: usize,
}

/// Result of a budgeted poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Every ready job of the set, in submission order.
    pub ready: ResultSet,
    pub expired: Vec<String>,
    pub failed: Vec<String>,
    pub attempts: u32,
}

impl PollOutcome {
    pub fn is_complete(&self) -> bool {
        self.expired.is_empty()
    }

    /// The ready set, or the reason there is nothing to show yet.
    pub fn into_result_set(self) -> Result<ResultSet> {
        if !self.ready.is_empty() {
            Ok(self.ready)
        } else if !self.expired.is_empty() {
            Err(StudioError::PollingExpired {
                pending: self.expired.len(),
            })
        } else {
            Err(StudioError::JobsFailed(self.failed.len()))
        }
    }
}

/// Progress notifications from a spawned poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    AttemptFinished { attempt: u32, ready: usize, pending: usize },
    JobReady(String),
}

/// A poll running on its own task.
pub struct PollHandle {
    pub events: mpsc::Receiver<PollEvent>,
    cancel: CancellationToken,
    task: JoinHandle<(JobSet, Result<PollOutcome>)>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Waits for the task and hands back the job set with its final states.
    pub async fn join(self) -> (JobSet, Result<PollOutcome>) {
        match self.task.await {
            Ok(finished) => finished,
            Err(e) => (
                JobSet::default(),
                Err(StudioError::RequestError(format!("poll task failed: {}", e))),
            ),
        }
    }
}

#[derive(Clone)]
pub struct JobPoller {
    probe: Arc<dyn ReadinessProbe>,
    max_concurrency: usize,
}

impl JobPoller {
    pub fn new(probe: Arc<dyn ReadinessProbe>, max_concurrency: usize) -> Self {
        Self {
            probe,
            max_concurrency: max_concurrency.max(1),
        }
    }

    /// Probes every pending job exactly once.
    pub async fn poll_once(&self, jobs: &mut JobSet) -> PollRound {
        let pending: Vec<(usize, String)> = jobs
            .jobs()
            .iter()
            .enumerate()
            .filter(|(_, job)| job.state() == JobState::Pending)
            .map(|(i, job)| (i, job.reference().to_string()))
            .collect();

        // `buffered` yields in input order, keeping submission order.
        let probe = &self.probe;
        let results: Vec<(usize, Result<ProbeStatus>)> = stream::iter(pending)
            .map(|(i, reference)| async move { (i, probe.probe(&reference).await) })
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut round = PollRound::default();
        for (i, status) in results {
            let job = &mut jobs.jobs_mut()[i];
            job.record_attempt();
            match status {
                Ok(ProbeStatus::Ready) => {
                    job.transition(JobState::Ready);
                    round.ready.push(job.reference().to_string());
                }
                Ok(ProbeStatus::Rejected) => {
                    job.transition(JobState::Failed);
                    round.newly_failed.push(job.reference().to_string());
                }
                Ok(ProbeStatus::NotReady) => {}
                Err(e) => {
                    log::debug!("Probe for {} failed, still pending: {}", job.reference(), e);
                }
            }
        }
        round.still_pending = jobs.count(JobState::Pending);
        round
    }

    /// Polls until nothing is pending or `budget.max_attempts` rounds have
    /// run, sleeping between rounds. Cancellation leaves unfinished jobs
    /// `Pending` and returns `StudioError::Cancelled`.
    pub async fn poll_with_budget(
        &self,
        jobs: &mut JobSet,
        budget: &PollConfig,
        cancel: &CancellationToken,
    ) -> Result<PollOutcome> {
        self.run(jobs, budget, cancel, None).await
    }

    /// Runs `poll_with_budget` on a separate task, reporting progress
    /// through `PollHandle::events`.
    pub fn spawn(
        &self,
        mut jobs: JobSet,
        budget: PollConfig,
        cancel: CancellationToken,
    ) -> PollHandle {
        // One `JobReady` per job plus one `AttemptFinished` per attempt.
        let capacity = jobs.len() + budget.max_attempts as usize;
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let poller = self.clone();
        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let outcome = poller.run(&mut jobs, &budget, &task_cancel, Some(&tx)).await;
            (jobs, outcome)
        });
        PollHandle {
            events: rx,
            cancel,
            task,
        }
    }

    async fn run(
        &self,
        jobs: &mut JobSet,
        budget: &PollConfig,
        cancel: &CancellationToken,
        events: Option<&mpsc::Sender<PollEvent>>,
    ) -> Result<PollOutcome> {
        if budget.max_attempts == 0 {
            return Err(StudioError::invalid("polling needs at least one attempt"));
        }

        let _timer = Timer::new("poll jobs");
        let mut delay = budget.interval.min(budget.max_interval);
        let mut attempts = 0u32;

        while attempts < budget.max_attempts && jobs.has_pending() {
            if attempts > 0 {
                let woke = tokio::select! {
                    _ = cancel.cancelled() => false,
                    _ = tokio::time::sleep(delay) => true,
                };
                if !woke {
                    return Err(cancelled(jobs));
                }
                delay = budget.next_interval(delay);
            }

            // The round future borrows `jobs`, so report cancellation after
            // the select has dropped it.
            let round = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                round = self.poll_once(jobs) => Some(round),
            };
            let Some(round) = round else {
                return Err(cancelled(jobs));
            };
            attempts += 1;

            log::info!(
                "Poll attempt {}/{}: {} ready, {} pending",
                attempts,
                budget.max_attempts,
                round.ready.len(),
                round.still_pending
            );

            // The channel holds every event a run can produce, so `try_send`
            // only fails once the receiver is gone.
            if let Some(tx) = events {
                for reference in &round.ready {
                    let _ = tx.try_send(PollEvent::JobReady(reference.clone()));
                }
                let _ = tx.try_send(PollEvent::AttemptFinished {
                    attempt: attempts,
                    ready: round.ready.len(),
                    pending: round.still_pending,
                });
            }
        }

        for job in jobs.jobs_mut() {
            job.transition(JobState::Expired);
        }

        let outcome = PollOutcome {
            ready: ResultSet::new(
                jobs.references_in(JobState::Ready)
                    .into_iter()
                    .map(|r| ResultRef::Url(r.to_string()))
                    .collect(),
                jobs.len(),
            ),
            expired: owned(jobs.references_in(JobState::Expired)),
            failed: owned(jobs.references_in(JobState::Failed)),
            attempts,
        };

        if !outcome.expired.is_empty() {
            log::warn!(
                "Polling budget exhausted after {} attempt(s); {} job(s) expired",
                attempts,
                outcome.expired.len()
            );
        }
        Ok(outcome)
    }
}

fn cancelled(jobs: &JobSet) -> StudioError {
    log::info!(
        "Polling cancelled with {} job(s) pending",
        jobs.count(JobState::Pending)
    );
    StudioError::Cancelled
}

fn owned(refs: Vec<&str>) -> Vec<String> {
    refs.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers from a script per reference; the last answer repeats.
    struct ScriptedProbe {
        script: Mutex<HashMap<String, Vec<Result<ProbeStatus>>>>,
        calls: AtomicUsize,
    }

    impl ScriptedProbe {
        fn new(entries: Vec<(&str, Vec<Result<ProbeStatus>>)>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(
                    entries
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                ),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn repeat(answer: &Result<ProbeStatus>) -> Result<ProbeStatus> {
        match answer {
            Ok(status) => Ok(*status),
            Err(_) => Err(StudioError::ProbeTransientFailure("scripted".into())),
        }
    }

    #[async_trait]
    impl ReadinessProbe for ScriptedProbe {
        async fn probe(&self, reference: &str) -> Result<ProbeStatus> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut script = self.script.lock().unwrap();
            let answers = script.get_mut(reference).expect("unscripted reference");
            if answers.len() > 1 {
                answers.remove(0)
            } else {
                repeat(&answers[0])
            }
        }
    }

    fn transient() -> Result<ProbeStatus> {
        Err(StudioError::ProbeTransientFailure("connection reset".into()))
    }

    fn budget(attempts: u32) -> PollConfig {
        PollConfig::new()
            .with_attempts(attempts)
            .with_interval(Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_failing_probes_expire_after_exact_budget() {
        let probe = ScriptedProbe::new(vec![
            ("a", vec![transient()]),
            ("b", vec![Ok(ProbeStatus::NotReady)]),
        ]);
        let poller = JobPoller::new(probe.clone(), 4);
        let mut jobs = JobSet::submit(vec!["a", "b"]);

        let outcome = poller
            .poll_with_budget(&mut jobs, &budget(3), &CancellationToken::new())
            .await
            .unwrap();

        assert!(outcome.ready.is_empty());
        assert_eq!(outcome.expired, vec!["a", "b"]);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(probe.calls(), 6);
        assert!(jobs.jobs().iter().all(|j| j.state() == JobState::Expired && j.attempts() == 3));
        assert!(matches!(
            outcome.into_result_set(),
            Err(StudioError::PollingExpired { pending: 2 })
        ));
    }

    #[tokio::test]
    async fn test_stops_early_once_everything_is_ready() {
        let probe = ScriptedProbe::new(vec![
            ("a", vec![Ok(ProbeStatus::NotReady), Ok(ProbeStatus::Ready)]),
            ("b", vec![Ok(ProbeStatus::Ready)]),
        ]);
        let poller = JobPoller::new(probe.clone(), 2);
        let mut jobs = JobSet::submit(vec!["a", "b"]);

        let outcome = poller
            .poll_with_budget(&mut jobs, &budget(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(probe.calls(), 3);
        assert!(outcome.is_complete());
        // Submission order, not readiness order.
        let ready: Vec<_> = outcome.ready.iter().filter_map(|r| r.as_url()).collect();
        assert_eq!(ready, vec!["a", "b"]);
        assert_eq!(outcome.ready.primary().and_then(|r| r.as_url()), Some("a"));
    }

    #[tokio::test]
    async fn test_poll_once_partitions_jobs() {
        let probe = ScriptedProbe::new(vec![
            ("a", vec![Ok(ProbeStatus::Ready)]),
            ("b", vec![transient()]),
            ("c", vec![Ok(ProbeStatus::Rejected)]),
        ]);
        let poller = JobPoller::new(probe, 1);
        let mut jobs = JobSet::submit(vec!["a", "b", "c"]);

        let round = poller.poll_once(&mut jobs).await;
        assert_eq!(round.ready, vec!["a"]);
        assert_eq!(round.newly_failed, vec!["c"]);
        assert_eq!(round.still_pending, 1);

        // Terminal jobs are not probed again.
        let round = poller.poll_once(&mut jobs).await;
        assert!(round.ready.is_empty());
        assert_eq!(jobs.jobs()[0].attempts(), 1);
        assert_eq!(jobs.jobs()[1].attempts(), 2);
    }

    #[tokio::test]
    async fn test_partial_readiness_keeps_ready_and_expires_rest() {
        let probe = ScriptedProbe::new(vec![
            ("a", vec![Ok(ProbeStatus::NotReady)]),
            ("b", vec![Ok(ProbeStatus::Ready)]),
        ]);
        let poller = JobPoller::new(probe, 2);
        let mut jobs = JobSet::submit(vec!["a", "b"]);

        let outcome = poller
            .poll_with_budget(&mut jobs, &budget(2), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.expired, vec!["a"]);
        let set = outcome.into_result_set().unwrap();
        assert_eq!(set.primary().and_then(|r| r.as_url()), Some("b"));

        // A manual re-check starts over with fresh pending jobs.
        let retry = jobs.resubmit_expired();
        assert_eq!(retry.references_in(JobState::Pending), vec!["a"]);
    }

    #[tokio::test]
    async fn test_cancellation_leaves_jobs_pending() {
        let probe = ScriptedProbe::new(vec![("a", vec![Ok(ProbeStatus::NotReady)])]);
        let poller = JobPoller::new(probe.clone(), 1);
        let mut jobs = JobSet::submit(vec!["a"]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = poller
            .poll_with_budget(&mut jobs, &budget(3), &cancel)
            .await;
        assert!(matches!(result, Err(StudioError::Cancelled)));
        assert_eq!(jobs.jobs()[0].state(), JobState::Pending);
        assert_eq!(probe.calls(), 0);
    }

    #[tokio::test]
    async fn test_spawned_poll_reports_events_and_cancels() {
        let probe = ScriptedProbe::new(vec![
            ("a", vec![Ok(ProbeStatus::Ready)]),
            ("b", vec![Ok(ProbeStatus::NotReady)]),
        ]);
        let poller = JobPoller::new(probe, 2);
        let slow = PollConfig::new()
            .with_attempts(10)
            .with_interval(Duration::from_secs(60));

        let jobs = JobSet::submit(vec!["a", "b"]);
        let mut handle = poller.spawn(jobs, slow, CancellationToken::new());
        assert_eq!(handle.events.recv().await, Some(PollEvent::JobReady("a".into())));
        assert_eq!(
            handle.events.recv().await,
            Some(PollEvent::AttemptFinished {
                attempt: 1,
                ready: 1,
                pending: 1
            })
        );

        handle.cancel();
        let (jobs, result) = handle.join().await;
        assert!(matches!(result, Err(StudioError::Cancelled)));
        assert_eq!(jobs.jobs()[0].state(), JobState::Ready);
        assert_eq!(jobs.jobs()[1].state(), JobState::Pending);
    }

    #[tokio::test]
    async fn test_rejected_jobs_only() {
        let probe = ScriptedProbe::new(vec![("a", vec![Ok(ProbeStatus::Rejected)])]);
        let poller = JobPoller::new(probe, 1);
        let mut jobs = JobSet::submit(vec!["a"]);
        let outcome = poller
            .poll_with_budget(&mut jobs, &budget(3), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 1);
        assert!(matches!(
            outcome.into_result_set(),
            Err(StudioError::JobsFailed(1))
        ));
    }

    #[tokio::test]
    async fn test_zero_attempts_is_invalid() {
        let probe = ScriptedProbe::new(vec![("a", vec![Ok(ProbeStatus::Ready)])]);
        let poller = JobPoller::new(probe, 1);
        let mut jobs = JobSet::submit(vec!["a"]);
        let result = poller
            .poll_with_budget(&mut jobs, &budget(0), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(StudioError::InvalidParameter(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_attempt_is_immediate_then_interval_applies() {
        let probe = ScriptedProbe::new(vec![("a", vec![Ok(ProbeStatus::NotReady)])]);
        let poller = JobPoller::new(probe, 1);
        let fixed = PollConfig::new()
            .with_attempts(3)
            .with_interval(Duration::from_secs(2));

        let start = tokio::time::Instant::now();
        let mut single = JobSet::submit(vec!["a"]);
        let once = fixed.clone().with_attempts(1);
        poller
            .poll_with_budget(&mut single, &once, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);

        let start = tokio::time::Instant::now();
        let mut jobs = JobSet::submit(vec!["a"]);
        let outcome = poller
            .poll_with_budget(&mut jobs, &fixed, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(outcome.attempts, 3);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_grows_and_is_clamped() {
        let probe = ScriptedProbe::new(vec![("a", vec![Ok(ProbeStatus::NotReady)])]);
        let poller = JobPoller::new(probe, 1);

        // 2s, then 4s clamped to 3s.
        let growing = PollConfig::new()
            .with_attempts(3)
            .with_interval(Duration::from_secs(2))
            .with_backoff(2.0, Duration::from_secs(3));
        let start = tokio::time::Instant::now();
        let mut jobs = JobSet::submit(vec!["a"]);
        poller
            .poll_with_budget(&mut jobs, &growing, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(5));

        // The very first delay obeys the ceiling too.
        let oversized = PollConfig::new()
            .with_attempts(2)
            .with_interval(Duration::from_secs(10))
            .with_backoff(1.0, Duration::from_secs(3));
        let start = tokio::time::Instant::now();
        let mut jobs = JobSet::submit(vec!["a"]);
        poller
            .poll_with_budget(&mut jobs, &oversized, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unread_events_are_all_kept() {
        let probe = ScriptedProbe::new(vec![("a", vec![Ok(ProbeStatus::NotReady)])]);
        let poller = JobPoller::new(probe, 1);
        let many = PollConfig::new()
            .with_attempts(6)
            .with_interval(Duration::from_millis(10));

        let mut handle = poller.spawn(JobSet::submit(vec!["a"]), many, CancellationToken::new());
        // Let the whole run finish before reading anything.
        tokio::time::sleep(Duration::from_secs(1)).await;

        let mut attempts = Vec::new();
        while let Ok(event) = handle.events.try_recv() {
            if let PollEvent::AttemptFinished { attempt, .. } = event {
                attempts.push(attempt);
            }
        }
        assert_eq!(attempts, vec![1, 2, 3, 4, 5, 6]);

        let (_, result) = handle.join().await;
        assert_eq!(result.unwrap().expired, vec!["a"]);
    }
}
