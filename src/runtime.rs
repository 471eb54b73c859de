//! Composition root.
//!
//! Wires the state manager and the submission pipeline to the native event
//! stream as two independent subscribers:
//!
//! ```text
//!                       ┌─→ state task      → ExposureStateManager cache
//! native event stream ──┤
//!                       └─→ submission task → DiagnosisKeyApi → reports
//! ```
//!
//! Each task owns its own subscription and sees only the immutable event
//! payload. Nothing orders one task's reaction relative to the other's.
//! `shutdown` drops both subscriptions; a handler that is mid-flight is
//! dropped with its task, so no cache write or upload starts afterwards.
//! Dropping the runtime without calling `shutdown` stops the tasks the
//! same way, without waiting for them.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ExposureConfig;
use crate::events::ExposureSubscription;
use crate::native::ExposureNative;
use crate::state::ExposureStateManager;
use crate::submission::{DiagnosisKeyApi, DiagnosisKeySubmitter, SubmissionReport};
use crate::types::{AnalyticsSink, NoOpAnalytics};

/// Running exposure core.
pub struct ExposureRuntime<N: ExposureNative + 'static> {
    state: ExposureStateManager<N>,
    shutdown: watch::Sender<bool>,
    state_task: JoinHandle<()>,
    submission_task: JoinHandle<()>,
}

/// Builder for [`ExposureRuntime`].
pub struct ExposureRuntimeBuilder<N: ExposureNative + 'static, A: DiagnosisKeyApi + 'static> {
    native: Arc<N>,
    api: Arc<A>,
    config: ExposureConfig,
    analytics: Arc<dyn AnalyticsSink>,
    submitter: Option<DiagnosisKeySubmitter<N, A>>,
}

impl<N: ExposureNative + 'static, A: DiagnosisKeyApi + 'static> ExposureRuntimeBuilder<N, A> {
    /// Report notifications to an analytics sink.
    pub fn analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Use a preconfigured submitter instead of one built from the config.
    pub fn submitter(mut self, submitter: DiagnosisKeySubmitter<N, A>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    /// Subscribe both reactions and spawn their tasks.
    ///
    /// Must be called inside a tokio runtime. Returns the runtime and the
    /// receiving end of the submission report channel.
    ///
    /// The report channel is unbounded: drain the receiver or drop it.
    /// A receiver that is held but never read keeps every report in memory.
    /// Dropping it is fine; reports are then only logged.
    pub fn start(self) -> (ExposureRuntime<N>, mpsc::UnboundedReceiver<SubmissionReport>) {
        let state = ExposureStateManager::new(Arc::clone(&self.native));
        let submitter = self
            .submitter
            .unwrap_or_else(|| DiagnosisKeySubmitter::new(Arc::clone(&self.native), self.api, &self.config))
            .with_analytics(self.analytics);

        // Subscribe before spawning so no event emitted after `start` returns is missed.
        let state_events = self.native.subscribe_to_exposure_events();
        let submission_events = self.native.subscribe_to_exposure_events();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let (report_tx, report_rx) = mpsc::unbounded_channel();

        info!(
            submission_enabled = submitter.is_enabled(),
            regions = ?self.config.region_codes,
            "exposure runtime starting"
        );

        let state_task = tokio::spawn(run_state_listener(
            state.clone(),
            state_events,
            shutdown_rx.clone(),
        ));
        let submission_task = tokio::spawn(run_submission_listener(
            submitter,
            submission_events,
            report_tx,
            shutdown_rx,
        ));

        let runtime = ExposureRuntime {
            state,
            shutdown,
            state_task,
            submission_task,
        };
        (runtime, report_rx)
    }
}

impl<N: ExposureNative + 'static> ExposureRuntime<N> {
    /// Start building a runtime.
    pub fn builder<A: DiagnosisKeyApi + 'static>(
        native: Arc<N>,
        api: Arc<A>,
        config: ExposureConfig,
    ) -> ExposureRuntimeBuilder<N, A> {
        ExposureRuntimeBuilder {
            native,
            api,
            config,
            analytics: Arc::new(NoOpAnalytics),
            submitter: None,
        }
    }

    /// Start with default analytics.
    ///
    /// See [`ExposureRuntimeBuilder::start`] for the report channel contract.
    pub fn start<A: DiagnosisKeyApi + 'static>(
        native: Arc<N>,
        api: Arc<A>,
        config: ExposureConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SubmissionReport>) {
        Self::builder(native, api, config).start()
    }

    /// The state manager. Clones share the same cache.
    pub fn state(&self) -> &ExposureStateManager<N> {
        &self.state
    }

    /// Release both subscriptions and wait for the tasks to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);

        for (name, task) in [("state", self.state_task), ("submission", self.submission_task)] {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    warn!(task = name, error = %e, "exposure listener ended abnormally");
                }
            }
        }
        info!("exposure runtime stopped");
    }
}

/// Wait until shutdown is requested or the runtime handle is dropped.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

async fn run_state_listener<N: ExposureNative + 'static>(
    state: ExposureStateManager<N>,
    mut events: ExposureSubscription,
    mut shutdown: watch::Receiver<bool>,
) {
    let work = async {
        if let Err(e) = state.refresh_detection_timestamp().await {
            warn!(error = %e, "initial detection timestamp fetch failed");
        }
        while let Some(event) = events.next().await {
            state.apply_exposure_event(&event).await;
        }
        debug!("exposure event stream closed");
    };

    tokio::select! {
        _ = work => {}
        _ = shutdown_requested(&mut shutdown) => debug!("state listener shutting down"),
    }
}

async fn run_submission_listener<N: ExposureNative + 'static, A: DiagnosisKeyApi + 'static>(
    submitter: DiagnosisKeySubmitter<N, A>,
    mut events: ExposureSubscription,
    reports: mpsc::UnboundedSender<SubmissionReport>,
    mut shutdown: watch::Receiver<bool>,
) {
    let work = async {
        while let Some(event) = events.next().await {
            let report = submitter.handle_exposure_event(&event).await;
            // Nobody listening is fine; the report was already logged.
            let _ = reports.send(report);
        }
        debug!("exposure event stream closed");
    };

    tokio::select! {
        _ = work => {}
        _ = shutdown_requested(&mut shutdown) => debug!("submission listener shutting down"),
    }
}
