pub mod dispatch;

use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::{
    assembler::{Operation, RequestAssembler},
    config::StudioConfig,
    error::{Result, StudioError},
    logger::Timer,
    models::{GenerationRequest, JobSet, JobState, ResultRef, ResultSet},
    resolver::{HttpProbe, JobPoller, ReadinessProbe, ResultNormalizer},
    session::Session,
};

pub use dispatch::{DispatchOutcome, Dispatcher, HttpDispatcher};

#[derive(Clone)]
pub struct StudioClient {
    config: StudioConfig,
    assembler: RequestAssembler,
    dispatcher: Arc<dyn Dispatcher>,
    normalizer: ResultNormalizer,
    poller: JobPoller,
    downloader: Client,
}

impl StudioClient {
    pub fn new(config: StudioConfig) -> Result<Self> {
        let dispatcher = Arc::new(HttpDispatcher::new(config.clone())?);
        let probe = Arc::new(HttpProbe::new(config.probe_timeout)?);
        Self::with_parts(config, dispatcher, probe)
    }

    /// Builds a client around custom collaborators.
    pub fn with_parts(
        config: StudioConfig,
        dispatcher: Arc<dyn Dispatcher>,
        probe: Arc<dyn ReadinessProbe>,
    ) -> Result<Self> {
        let downloader = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StudioError::ConfigError(format!("HTTP client: {}", e)))?;

        Ok(Self {
            poller: JobPoller::new(probe, config.max_concurrent_probes),
            config,
            assembler: RequestAssembler::new(),
            dispatcher,
            normalizer: ResultNormalizer::new(),
            downloader,
        })
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn poller(&self) -> &JobPoller {
        &self.poller
    }

    pub fn assemble(&self, operation: &Operation) -> Result<GenerationRequest> {
        self.assembler.assemble(operation)
    }

    /// Like `assemble`, but prompt-driven operations take the session's
    /// effective prompt when the session has one.
    pub fn assemble_for(
        &self,
        operation: &Operation,
        session: &Session,
    ) -> Result<GenerationRequest> {
        let prompt = session.effective_prompt();
        if operation.takes_prompt() && !prompt.trim().is_empty() {
            self.assembler.assemble(&operation.clone().with_prompt(prompt))
        } else {
            self.assembler.assemble(operation)
        }
    }

    /// Asks the service to enrich the session's prompt and stores the
    /// result as the session's enhanced prompt.
    pub async fn enhance_prompt(&self, session: &mut Session) -> Result<String> {
        let request = self.assembler.enhance_prompt(session.original_prompt())?;
        let response = self.dispatcher.dispatch(&request).await?;
        let enhanced = self.normalizer.enhanced_prompt(&response)?;
        log::info!("Prompt enhanced to {} chars", enhanced.len());
        session.set_enhanced_prompt(enhanced.clone());
        Ok(enhanced)
    }

    /// Sends the request and classifies the answer without polling.
    pub async fn dispatch(&self, request: &GenerationRequest) -> Result<DispatchOutcome> {
        let response = self.dispatcher.dispatch(request).await?;
        let results = self.normalizer.normalize(&response, request.num_results())?;

        let urls: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_url().map(str::to_string))
            .collect();
        if request.is_sync() || urls.is_empty() {
            return Ok(DispatchOutcome::Completed(results));
        }

        let jobs = JobSet::submit(urls);
        log::info!("{} answered with {} pending job(s)", request.kind(), jobs.len());
        Ok(DispatchOutcome::Pending { jobs, results })
    }

    /// Dispatches, polls pending jobs with the configured budget, and
    /// records the outcome in `session`.
    ///
    /// `StudioError::PollingExpired` means the jobs may still finish; the
    /// session keeps them for `recheck`.
    pub async fn submit(
        &self,
        request: &GenerationRequest,
        session: &mut Session,
        cancel: &CancellationToken,
    ) -> Result<ResultSet> {
        let _timer = Timer::new(&format!("{} [{}]", request.kind(), session.id()));
        session.begin(request.kind());

        match self.dispatch(request).await? {
            DispatchOutcome::Completed(results) => {
                session.record_results(&results);
                Ok(results)
            }
            DispatchOutcome::Pending { mut jobs, results } => {
                let budget = &self.config.poll;
                let polled = self.poller.poll_with_budget(&mut jobs, budget, cancel).await;
                let ready = ready_in_order(&results, &jobs);
                session.record_results(&ready);
                session.record_jobs(&jobs);
                let outcome = polled?;

                if ready.is_empty() {
                    outcome.into_result_set()
                } else {
                    Ok(ready)
                }
            }
        }
    }

    /// Polls the session's unfinished jobs again as fresh pending jobs.
    pub async fn recheck(
        &self,
        session: &mut Session,
        cancel: &CancellationToken,
    ) -> Result<ResultSet> {
        if !session.has_unresolved() {
            return Err(StudioError::invalid("no pending results to re-check"));
        }

        let mut jobs = session.recheck_jobs();
        log::info!("Re-checking {} job(s) for session {}", jobs.len(), session.id());
        let budget = &self.config.poll;
        let polled = self.poller.poll_with_budget(&mut jobs, budget, cancel).await;
        session.record_jobs(&jobs);
        let outcome = polled?;

        if session.results().is_empty() {
            outcome.into_result_set()
        } else {
            Ok(session.results())
        }
    }

    /// Fetches the bytes behind a result.
    pub async fn download(&self, reference: &ResultRef) -> Result<Vec<u8>> {
        let url = match reference {
            ResultRef::Inline(bytes) => return Ok(bytes.clone()),
            ResultRef::Url(url) => url,
        };

        let response = self
            .downloader
            .get(url)
            .send()
            .await
            .map_err(|e| StudioError::RequestError(format!("download failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StudioError::ResponseError {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StudioError::RequestError(format!("download failed: {}", e)))?;
        log::debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

/// Inline results and ready URLs, in the order the service listed them.
fn ready_in_order(results: &ResultSet, jobs: &JobSet) -> ResultSet {
    let ready: HashSet<&str> = jobs.references_in(JobState::Ready).into_iter().collect();
    let refs: Vec<ResultRef> = results
        .iter()
        .filter(|r| match r.as_url() {
            Some(url) => ready.contains(url),
            None => true,
        })
        .cloned()
        .collect();
    let len = refs.len();
    ResultSet::new(refs, len)
}
