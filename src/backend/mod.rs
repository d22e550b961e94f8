pub mod api;
pub mod models;
pub mod notifications;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
#[cfg(target_arch = "wasm32")]
use futures::StreamExt;
use tokio::sync::mpsc;

use api::{ApiError, LearningApi, RestApi};
use models::{AttemptSummary, Question, Quiz, QuizSummary, SubmissionResult};
use notifications::{
    Notification, NotificationCenter, NotificationTransport, RestNotificationTransport,
};
use session::{AttemptSession, SubmitFailure, TickOutcome};

/// Seconds between notification feed polls.
const NOTIFY_POLL_SECS: u32 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub learner_id: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("LEARNHUB_API_BASE")
                .unwrap_or_else(|_| "http://127.0.0.1:4000".to_string()),
            learner_id: std::env::var("LEARNHUB_LEARNER")
                .unwrap_or_else(|_| "demo-learner".to_string()),
        }
    }
}

#[derive(Debug)]
pub enum AppCmd {
    FetchCatalog,
    OpenQuiz { quiz_id: String, enrollment_id: String },
    StartAttempt,
    SelectAnswer { question_index: usize, option_index: usize },
    GoToQuestion { question_index: usize },
    NextQuestion,
    PreviousQuestion,
    RequestSubmit,
    ConfirmSubmit,
    CancelSubmitPrompt,
    RetrySubmit,
    LeaveQuiz,
    FetchSubmissionResult { submission_id: String },
    MarkNotificationRead { notification_id: String },
    DeleteNotification { notification_id: String },

    // Completions reported back to the loop by spawned fetch tasks. The
    // generation stamp lets the loop drop results that arrive after the
    // learner already left the session they belong to.
    LoadFinished {
        generation: u64,
        outcome: Result<LoadOutcome, ApiError>,
    },
    SubmissionFinished {
        generation: u64,
        outcome: Result<SubmissionResult, ApiError>,
    },
}

#[derive(Debug)]
pub enum LoadOutcome {
    Ready {
        quiz: Quiz,
        questions: Vec<Question>,
    },
    Ineligible {
        attempts_used: Option<u32>,
        max_attempts: Option<u32>,
        latest: Option<AttemptSummary>,
    },
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    CatalogFetched(Vec<QuizSummary>),
    CatalogError(String),
    SessionChanged(AttemptSession),
    SessionClosed,
    ResultFetched(SubmissionResult),
    ResultError(String),
    NotificationsChanged(Vec<Notification>),
}

/// Owns the running attempt and is its single writer: commands and clock
/// ticks are multiplexed into one loop, so the `InProgress -> Submitting`
/// transition is serialized and a user submit racing a timer expiry can
/// never both fire a submission.
pub struct Backend {
    api: Arc<dyn LearningApi>,
    cmd_tx: mpsc::UnboundedSender<AppCmd>,
    cmd_rx: mpsc::UnboundedReceiver<AppCmd>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    learner_id: String,
    session: Option<AttemptSession>,
    generation: u64,
    notifications: NotificationCenter,
    notify_countdown: u32,
}

impl Backend {
    pub fn new(
        api: Arc<dyn LearningApi>,
        notification_transport: Arc<dyn NotificationTransport>,
        cmd_tx: mpsc::UnboundedSender<AppCmd>,
        cmd_rx: mpsc::UnboundedReceiver<AppCmd>,
        event_tx: mpsc::UnboundedSender<AppEvent>,
        learner_id: String,
    ) -> Self {
        let mut notifications =
            NotificationCenter::new(notification_transport, learner_id.clone());
        let notify_tx = event_tx.clone();
        notifications.connect(Box::new(move |items| {
            let _ = notify_tx.send(AppEvent::NotificationsChanged(items.to_vec()));
        }));

        Self {
            api,
            cmd_tx,
            cmd_rx,
            event_tx,
            learner_id,
            session: None,
            generation: 0,
            notifications,
            notify_countdown: 1,
        }
    }

    pub async fn run(&mut self) {
        #[cfg(not(target_arch = "wasm32"))]
        let mut tick_interval = tokio::time::interval(Duration::from_secs(1));

        #[cfg(target_arch = "wasm32")]
        let mut tick_interval = gloo_timers::future::IntervalStream::new(1000);

        loop {
            tokio::select! {
                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => break, // UI gone, shut down
                    }
                }
                _ = async {
                    #[cfg(not(target_arch = "wasm32"))]
                    {
                        tick_interval.tick().await;
                    }
                    #[cfg(target_arch = "wasm32")]
                    {
                        tick_interval.next().await;
                    }
                } => {
                    self.handle_tick().await;
                }
            }
        }
        self.notifications.disconnect();
    }

    /// The single ticking source. Drives the attempt countdown and, at a much
    /// coarser cadence, the notification poll.
    async fn handle_tick(&mut self) {
        let outcome = match &mut self.session {
            Some(session) => session.tick(),
            None => TickOutcome::Idle,
        };
        match outcome {
            TickOutcome::Expired => {
                tracing::info!("attempt time expired, submitting recorded answers");
                // Timeout path: no confirmation gate.
                self.begin_submission();
            }
            TickOutcome::Ticked(_) => self.publish_session(),
            TickOutcome::Idle => {}
        }

        self.notify_countdown = self.notify_countdown.saturating_sub(1);
        if self.notify_countdown == 0 {
            self.notify_countdown = NOTIFY_POLL_SECS;
            self.notifications.refresh().await;
        }
    }

    async fn handle_command(&mut self, cmd: AppCmd) {
        match cmd {
            AppCmd::FetchCatalog => {
                let api = self.api.clone();
                let event_tx = self.event_tx.clone();
                let learner_id = self.learner_id.clone();
                spawn_task(async move {
                    match api.list_quizzes(&learner_id).await {
                        Ok(quizzes) => {
                            let _ = event_tx.send(AppEvent::CatalogFetched(quizzes));
                        }
                        Err(e) => {
                            tracing::error!("catalog fetch failed: {e}");
                            let _ = event_tx.send(AppEvent::CatalogError(e.to_string()));
                        }
                    }
                });
            }

            AppCmd::OpenQuiz {
                quiz_id,
                enrollment_id,
            } => {
                tracing::info!("opening quiz {quiz_id}");
                self.generation += 1;
                self.session = Some(AttemptSession::new(
                    quiz_id.clone(),
                    enrollment_id,
                    self.learner_id.clone(),
                ));
                self.publish_session();

                let api = self.api.clone();
                let cmd_tx = self.cmd_tx.clone();
                let generation = self.generation;
                let learner_id = self.learner_id.clone();
                spawn_task(async move {
                    let outcome = load_quiz(api, &quiz_id, &learner_id).await;
                    let _ = cmd_tx.send(AppCmd::LoadFinished { generation, outcome });
                });
            }

            AppCmd::LoadFinished { generation, outcome } => {
                if generation != self.generation {
                    tracing::debug!("dropping stale load result");
                    return;
                }
                let Some(session) = &mut self.session else { return };
                match outcome {
                    Ok(LoadOutcome::Ready { quiz, questions }) => {
                        session.load_ready(quiz, questions);
                    }
                    Ok(LoadOutcome::Ineligible {
                        attempts_used,
                        max_attempts,
                        latest,
                    }) => {
                        tracing::info!(
                            "quiz {} not attemptable ({:?}/{:?} attempts)",
                            session.quiz_id(),
                            attempts_used,
                            max_attempts
                        );
                        session.mark_ineligible(attempts_used, max_attempts, latest);
                    }
                    Err(e) => {
                        tracing::error!("quiz load failed: {e}");
                        session.fail_load(e.to_string());
                    }
                }
                self.publish_session();
            }

            AppCmd::StartAttempt => {
                if let Some(session) = &mut self.session {
                    session.start(Utc::now());
                    tracing::info!(
                        "attempt started for quiz {} by {}, {:?}s on the clock",
                        session.quiz_id(),
                        session.learner_id(),
                        session.remaining_seconds()
                    );
                    self.publish_session();
                }
            }

            AppCmd::SelectAnswer {
                question_index,
                option_index,
            } => {
                if let Some(session) = &mut self.session {
                    session.select_answer(question_index, option_index);
                    self.publish_session();
                }
            }

            AppCmd::GoToQuestion { question_index } => {
                if let Some(session) = &mut self.session {
                    session.go_to(question_index);
                    self.publish_session();
                }
            }

            AppCmd::NextQuestion => {
                if let Some(session) = &mut self.session {
                    session.next_question();
                    self.publish_session();
                }
            }

            AppCmd::PreviousQuestion => {
                if let Some(session) = &mut self.session {
                    session.previous_question();
                    self.publish_session();
                }
            }

            AppCmd::RequestSubmit => {
                if let Some(session) = &mut self.session {
                    session.request_submit();
                    self.publish_session();
                }
            }

            AppCmd::CancelSubmitPrompt => {
                if let Some(session) = &mut self.session {
                    session.cancel_submit_prompt();
                    self.publish_session();
                }
            }

            AppCmd::ConfirmSubmit => {
                // If the countdown expired in the same instant, the session is
                // already Submitting and this is a no-op.
                self.begin_submission();
            }

            AppCmd::RetrySubmit => {
                let Some(session) = &mut self.session else { return };
                let Some(request) = session.retry_submission() else {
                    return;
                };
                tracing::info!("retrying submission with the original snapshot");
                self.publish_session();
                self.spawn_submit(request);
            }

            AppCmd::SubmissionFinished { generation, outcome } => {
                if generation != self.generation {
                    tracing::debug!("dropping stale submission result");
                    return;
                }
                let Some(session) = &mut self.session else { return };
                match outcome {
                    Ok(result) => {
                        tracing::info!(
                            "attempt scored: {}/{} ({}%)",
                            result.score,
                            result.max_score,
                            result.percentage
                        );
                        session.complete(result);
                    }
                    Err(e) => {
                        tracing::warn!("submission failed: {e}");
                        session.fail_submission(map_submit_error(e));
                    }
                }
                self.publish_session();
            }

            AppCmd::LeaveQuiz => {
                // Discard with no side effects: bump the generation so any
                // in-flight completion for this session lands in the void.
                if self.session.take().is_some() {
                    self.generation += 1;
                    let _ = self.event_tx.send(AppEvent::SessionClosed);
                }
            }

            AppCmd::FetchSubmissionResult { submission_id } => {
                let api = self.api.clone();
                let event_tx = self.event_tx.clone();
                spawn_task(async move {
                    match api.submission_result(&submission_id).await {
                        Ok(result) => {
                            let _ = event_tx.send(AppEvent::ResultFetched(result));
                        }
                        Err(e) => {
                            tracing::error!("result fetch failed: {e}");
                            let _ = event_tx.send(AppEvent::ResultError(e.to_string()));
                        }
                    }
                });
            }

            AppCmd::MarkNotificationRead { notification_id } => {
                let _ = self.notifications.mark_read(&notification_id).await;
            }

            AppCmd::DeleteNotification { notification_id } => {
                let _ = self.notifications.delete(&notification_id).await;
            }
        }
    }

    /// The one place a submission starts, for both the user-confirmed path
    /// and timer expiry. First caller wins; everyone else no-ops.
    fn begin_submission(&mut self) {
        let Some(session) = &mut self.session else { return };
        let Some(request) = session.begin_submission() else {
            return;
        };
        self.publish_session();
        self.spawn_submit(request);
    }

    fn spawn_submit(&self, request: models::SubmissionRequest) {
        let api = self.api.clone();
        let cmd_tx = self.cmd_tx.clone();
        let generation = self.generation;
        spawn_task(async move {
            let outcome = api.submit(&request).await;
            let _ = cmd_tx.send(AppCmd::SubmissionFinished { generation, outcome });
        });
    }

    fn publish_session(&self) {
        if let Some(session) = &self.session {
            let _ = self.event_tx.send(AppEvent::SessionChanged(session.clone()));
        }
    }
}

/// Load everything a new session needs. Quiz metadata and eligibility go out
/// together; the question list is requested only once eligibility allows the
/// attempt, so an ineligible learner never receives question content.
async fn load_quiz(
    api: Arc<dyn LearningApi>,
    quiz_id: &str,
    learner_id: &str,
) -> Result<LoadOutcome, ApiError> {
    let (quiz, eligibility) = futures::join!(
        api.get_quiz(quiz_id),
        api.check_eligibility(quiz_id, learner_id)
    );
    // An eligibility failure is a load error, never "ineligible".
    let quiz = quiz?;
    let eligibility = eligibility?;

    if !eligibility.can_attempt {
        // Display context only; losing it does not change the outcome.
        let latest = api.latest_attempt(quiz_id, learner_id).await.unwrap_or(None);
        return Ok(LoadOutcome::Ineligible {
            attempts_used: eligibility.attempts_used,
            max_attempts: eligibility.max_attempts,
            latest,
        });
    }

    let mut questions = api.get_questions(quiz_id).await?;
    questions.sort_by_key(|q| q.position);
    Ok(LoadOutcome::Ready { quiz, questions })
}

fn map_submit_error(err: ApiError) -> SubmitFailure {
    match err {
        ApiError::Validation(msg) => SubmitFailure::QuotaExceeded(msg),
        ApiError::Network(msg) | ApiError::Decode(msg) => SubmitFailure::Network(msg),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_task<F>(future: F)
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(future);
}

#[cfg(target_arch = "wasm32")]
fn spawn_task<F>(future: F)
where
    F: std::future::Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(future);
}

pub async fn init(
    cmd_tx: mpsc::UnboundedSender<AppCmd>,
    cmd_rx: mpsc::UnboundedReceiver<AppCmd>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    config: Config,
) {
    let api = Arc::new(RestApi::new(config.api_base.clone()));
    let transport = Arc::new(RestNotificationTransport::new(config.api_base));
    let mut backend = Backend::new(api, transport, cmd_tx, cmd_rx, event_tx, config.learner_id);
    backend.run().await;
}
