use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::{
    AnswerSelection, AttemptSummary, Question, Quiz, SubmissionRequest, SubmissionResult,
};

/// Discrete state of a quiz attempt. Transitions are one-way except for
/// `SubmitError`, which may re-enter `Submitting` on retry.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Loading,
    LoadError(String),
    Ineligible {
        attempts_used: Option<u32>,
        max_attempts: Option<u32>,
        latest: Option<AttemptSummary>,
    },
    Introduction,
    InProgress,
    Submitting,
    SubmitError(SubmitFailure),
    Result(SubmissionResult),
}

/// Why a submission attempt failed. Network failures are retryable with the
/// same snapshot; a quota rejection is not (another tab consumed the attempt).
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitFailure {
    Network(String),
    QuotaExceeded(String),
}

impl SubmitFailure {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SubmitFailure::Network(_))
    }
}

/// What a clock tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Not in progress, or untimed: nothing to do.
    Idle,
    /// One second consumed, this many remain.
    Ticked(u32),
    /// The countdown just hit zero. The caller must begin the submission.
    Expired,
}

/// Counts shown by the submission confirmation dialog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateSummary {
    pub answered: usize,
    pub unanswered: usize,
    pub remaining_seconds: Option<u32>,
}

/// One learner's run at one quiz, from load to a terminal scored result.
///
/// All mutation goes through the methods below and the caller is expected to
/// be a single writer (the backend loop); that is what makes the
/// `InProgress -> Submitting` transition race-free: the first caller of
/// [`AttemptSession::begin_submission`] wins and every later caller observes a
/// non-`InProgress` phase and gets `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptSession {
    quiz_id: String,
    enrollment_id: String,
    learner_id: String,
    phase: Phase,
    quiz: Option<Quiz>,
    questions: Vec<Question>,
    answers: AnswerSelection,
    current_question_index: usize,
    started_at: Option<DateTime<Utc>>,
    remaining_seconds: Option<u32>, // None = untimed or not yet started
    confirm_open: bool,
    request: Option<SubmissionRequest>, // built at most once
}

impl AttemptSession {
    pub fn new(quiz_id: String, enrollment_id: String, learner_id: String) -> Self {
        Self {
            quiz_id,
            enrollment_id,
            learner_id,
            phase: Phase::Loading,
            quiz: None,
            questions: Vec::new(),
            answers: AnswerSelection::new(0),
            current_question_index: 0,
            started_at: None,
            remaining_seconds: None,
            confirm_open: false,
            request: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn answers(&self) -> &AnswerSelection {
        &self.answers
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        self.remaining_seconds
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn confirm_open(&self) -> bool {
        self.confirm_open
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.phase,
            Phase::LoadError(_) | Phase::Ineligible { .. } | Phase::Result(_)
        )
    }

    // ---- Loading ----

    /// All load fetches succeeded: show the introduction screen.
    pub fn load_ready(&mut self, quiz: Quiz, questions: Vec<Question>) {
        if self.phase != Phase::Loading {
            return;
        }
        self.answers = AnswerSelection::new(questions.len());
        self.quiz = Some(quiz);
        self.questions = questions;
        self.phase = Phase::Introduction;
    }

    /// A load fetch rejected. Fatal: the only way out is back navigation.
    pub fn fail_load(&mut self, message: String) {
        if self.phase != Phase::Loading {
            return;
        }
        self.phase = Phase::LoadError(message);
    }

    /// Eligibility said no. Question content was never fetched for this
    /// session, so there is nothing to leak to the learner.
    pub fn mark_ineligible(
        &mut self,
        attempts_used: Option<u32>,
        max_attempts: Option<u32>,
        latest: Option<AttemptSummary>,
    ) {
        if self.phase != Phase::Loading {
            return;
        }
        self.phase = Phase::Ineligible {
            attempts_used,
            max_attempts,
            latest,
        };
    }

    // ---- Introduction ----

    /// The explicit "start" action: stamps the start time, arms the countdown
    /// and enters `InProgress` in one step.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.phase != Phase::Introduction {
            return;
        }
        let Some(quiz) = &self.quiz else { return };
        self.started_at = Some(now);
        self.remaining_seconds = quiz.time_limit_minutes.map(|m| m * 60);
        self.current_question_index = 0;
        self.phase = Phase::InProgress;
    }

    // ---- InProgress: answering and navigation ----

    /// Record a choice. Overwrites any previous choice for the question;
    /// out-of-range question or option indices are ignored.
    pub fn select_answer(&mut self, question_index: usize, option_index: usize) {
        if self.phase != Phase::InProgress {
            return;
        }
        let Some(question) = self.questions.get(question_index) else {
            return;
        };
        if option_index >= question.options.len() {
            return;
        }
        self.answers.select(question_index, option_index);
    }

    /// Free navigation: any in-bounds index is reachable directly. A pure
    /// cursor move that touches neither answers nor the clock.
    pub fn go_to(&mut self, question_index: usize) {
        if self.phase != Phase::InProgress {
            return;
        }
        if question_index < self.questions.len() {
            self.current_question_index = question_index;
        }
    }

    pub fn next_question(&mut self) {
        if self.phase != Phase::InProgress {
            return;
        }
        if self.current_question_index + 1 < self.questions.len() {
            self.current_question_index += 1;
        }
    }

    pub fn previous_question(&mut self) {
        if self.phase != Phase::InProgress {
            return;
        }
        self.current_question_index = self.current_question_index.saturating_sub(1);
    }

    // ---- Clock ----

    /// Consume one second. Only the `InProgress` phase of a timed quiz ticks;
    /// everything else is `Idle`. Returns `Expired` exactly once, on the tick
    /// that reaches zero; the caller then drives the automatic submission.
    pub fn tick(&mut self) -> TickOutcome {
        if self.phase != Phase::InProgress {
            return TickOutcome::Idle;
        }
        match self.remaining_seconds {
            Some(remaining) if remaining > 0 => {
                let remaining = remaining - 1;
                self.remaining_seconds = Some(remaining);
                if remaining == 0 {
                    TickOutcome::Expired
                } else {
                    TickOutcome::Ticked(remaining)
                }
            }
            _ => TickOutcome::Idle,
        }
    }

    // ---- Submission ----

    /// User-initiated submit: open the confirmation dialog. Timer expiry never
    /// comes through here.
    pub fn request_submit(&mut self) {
        if self.phase == Phase::InProgress {
            self.confirm_open = true;
        }
    }

    /// "Continue editing": back to answering, nothing else changes.
    pub fn cancel_submit_prompt(&mut self) {
        self.confirm_open = false;
    }

    pub fn gate_summary(&self) -> GateSummary {
        GateSummary {
            answered: self.answers.answered_count(),
            unanswered: self.answers.unanswered_count(),
            remaining_seconds: self.remaining_seconds,
        }
    }

    /// The guarded `InProgress -> Submitting` transition. The first caller
    /// (user confirmation or timer expiry, whichever lands first) builds the
    /// immutable snapshot and gets it back; any later caller observes a
    /// non-`InProgress` phase and gets `None`, so at most one
    /// `SubmissionRequest` ever exists per session.
    pub fn begin_submission(&mut self) -> Option<SubmissionRequest> {
        if self.phase != Phase::InProgress {
            return None;
        }
        let started_at = self.started_at?;
        self.confirm_open = false;
        self.phase = Phase::Submitting;
        let request = SubmissionRequest {
            quiz_id: self.quiz_id.clone(),
            enrollment_id: self.enrollment_id.clone(),
            attempt_token: Uuid::new_v4().to_string(),
            started_at,
            answers: self.answers.encode(&self.questions),
        };
        self.request = Some(request.clone());
        Some(request)
    }

    /// Retry after a transient failure: re-enter `Submitting` with the exact
    /// snapshot built before the failure. Quota rejections are not retryable.
    pub fn retry_submission(&mut self) -> Option<SubmissionRequest> {
        match &self.phase {
            Phase::SubmitError(failure) if failure.is_retryable() => {
                let request = self.request.clone()?;
                self.phase = Phase::Submitting;
                Some(request)
            }
            _ => None,
        }
    }

    pub fn complete(&mut self, result: SubmissionResult) {
        if self.phase != Phase::Submitting {
            return;
        }
        self.phase = Phase::Result(result);
    }

    pub fn fail_submission(&mut self, failure: SubmitFailure) {
        if self.phase != Phase::Submitting {
            return;
        }
        self.phase = Phase::SubmitError(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(time_limit_minutes: Option<u32>) -> Quiz {
        Quiz {
            id: "quiz1".to_string(),
            title: "Basics".to_string(),
            description: "Intro quiz".to_string(),
            question_count: 3,
            time_limit_minutes,
            passing_score_percent: 70,
            max_attempts: Some(3),
        }
    }

    fn questions() -> Vec<Question> {
        (0..3)
            .map(|i| Question {
                id: format!("q{}", i + 1),
                prompt: format!("Question {}", i + 1),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                position: i,
                points: 1,
            })
            .collect()
    }

    fn in_progress_session(time_limit_minutes: Option<u32>) -> AttemptSession {
        let mut session =
            AttemptSession::new("quiz1".into(), "enr1".into(), "learner1".into());
        session.load_ready(quiz(time_limit_minutes), questions());
        session.start(Utc::now());
        session
    }

    #[test]
    fn test_load_ready_enters_introduction() {
        let mut session =
            AttemptSession::new("quiz1".into(), "enr1".into(), "learner1".into());
        assert_eq!(*session.phase(), Phase::Loading);
        session.load_ready(quiz(Some(1)), questions());
        assert_eq!(*session.phase(), Phase::Introduction);
        assert_eq!(session.answers().len(), 3);
        // Clock is not armed until the explicit start action.
        assert_eq!(session.remaining_seconds(), None);
    }

    #[test]
    fn test_ineligible_short_circuits_from_loading() {
        let mut session =
            AttemptSession::new("quiz1".into(), "enr1".into(), "learner1".into());
        session.mark_ineligible(Some(3), Some(3), None);
        assert!(matches!(
            session.phase(),
            Phase::Ineligible { attempts_used: Some(3), max_attempts: Some(3), .. }
        ));
        assert!(session.is_terminal());
        // No further transitions out.
        session.load_ready(quiz(Some(1)), questions());
        assert!(matches!(session.phase(), Phase::Ineligible { .. }));
    }

    #[test]
    fn test_start_arms_clock_and_stamps_time() {
        let mut session =
            AttemptSession::new("quiz1".into(), "enr1".into(), "learner1".into());
        session.load_ready(quiz(Some(2)), questions());
        let now = Utc::now();
        session.start(now);
        assert_eq!(*session.phase(), Phase::InProgress);
        assert_eq!(session.started_at(), Some(now));
        assert_eq!(session.remaining_seconds(), Some(120));
    }

    #[test]
    fn test_untimed_quiz_never_ticks() {
        let mut session = in_progress_session(None);
        assert_eq!(session.remaining_seconds(), None);
        for _ in 0..100 {
            assert_eq!(session.tick(), TickOutcome::Idle);
        }
        assert_eq!(*session.phase(), Phase::InProgress);
    }

    #[test]
    fn test_tick_counts_down_and_expires_once() {
        let mut session = in_progress_session(Some(1));
        for expected in (1..60).rev() {
            assert_eq!(session.tick(), TickOutcome::Ticked(expected));
        }
        assert_eq!(session.tick(), TickOutcome::Expired);
        assert_eq!(session.remaining_seconds(), Some(0));
        // The caller transitions out on Expired; even if it didn't, zero never
        // goes negative and never expires twice.
        assert_eq!(session.tick(), TickOutcome::Idle);
        assert_eq!(session.remaining_seconds(), Some(0));
    }

    #[test]
    fn test_select_answer_is_idempotent_overwrite() {
        let mut session = in_progress_session(Some(1));
        session.select_answer(0, 1);
        session.select_answer(0, 1);
        assert_eq!(session.answers().choice(0), Some(1));
        assert_eq!(session.answers().answered_count(), 1);

        session.select_answer(0, 3);
        assert_eq!(session.answers().choice(0), Some(3));
        assert_eq!(session.answers().answered_count(), 1);

        // Out-of-range question or option: ignored.
        session.select_answer(9, 0);
        session.select_answer(1, 9);
        assert_eq!(session.answers().answered_count(), 1);
    }

    #[test]
    fn test_navigation_is_pure_and_clamped() {
        let mut session = in_progress_session(Some(1));
        session.select_answer(0, 2);
        let answers_before = session.answers().clone();
        let remaining_before = session.remaining_seconds();

        session.go_to(2);
        assert_eq!(session.current_question_index(), 2);
        session.go_to(99);
        assert_eq!(session.current_question_index(), 2);
        session.next_question();
        assert_eq!(session.current_question_index(), 2);
        session.previous_question();
        session.previous_question();
        session.previous_question();
        assert_eq!(session.current_question_index(), 0);

        assert_eq!(*session.answers(), answers_before);
        assert_eq!(session.remaining_seconds(), remaining_before);
    }

    #[test]
    fn test_navigation_only_in_progress() {
        let mut session =
            AttemptSession::new("quiz1".into(), "enr1".into(), "learner1".into());
        session.load_ready(quiz(Some(1)), questions());
        session.select_answer(0, 0);
        session.go_to(1);
        assert_eq!(session.answers().answered_count(), 0);
        assert_eq!(session.current_question_index(), 0);
    }

    #[test]
    fn test_timeout_submits_current_answers() {
        // Three questions, one minute, only question 1 answered, learner waits.
        let mut session = in_progress_session(Some(1));
        session.select_answer(0, 0);
        let mut expired = 0;
        for _ in 0..60 {
            if session.tick() == TickOutcome::Expired {
                expired += 1;
            }
        }
        assert_eq!(expired, 1);

        let request = session.begin_submission().expect("expiry submits");
        let selected: Vec<i32> = request.answers.iter().map(|a| a.selected_option).collect();
        assert_eq!(selected, vec![0, -1, -1]);
        assert_eq!(*session.phase(), Phase::Submitting);
    }

    #[test]
    fn test_begin_submission_first_caller_wins() {
        let mut session = in_progress_session(Some(1));
        // Timer expiry and a user click racing within the same tick: the
        // second caller observes Submitting and no-ops.
        let first = session.begin_submission();
        assert!(first.is_some());
        assert!(session.begin_submission().is_none());
        assert!(session.begin_submission().is_none());
    }

    #[test]
    fn test_confirmation_gate_counts_and_flow() {
        let mut session = in_progress_session(Some(1));
        session.select_answer(0, 0);
        session.select_answer(1, 1);
        session.select_answer(2, 2);

        session.request_submit();
        assert!(session.confirm_open());
        let summary = session.gate_summary();
        assert_eq!(summary.answered, 3);
        assert_eq!(summary.unanswered, 0);

        // "Continue editing" leaves everything unchanged.
        session.cancel_submit_prompt();
        assert!(!session.confirm_open());
        assert_eq!(*session.phase(), Phase::InProgress);

        // Confirming proceeds to Submitting with no further gate re-entry.
        session.request_submit();
        let request = session.begin_submission().expect("confirm submits");
        assert!(!session.confirm_open());
        assert_eq!(request.answers.len(), 3);
        session.request_submit();
        assert!(!session.confirm_open());
    }

    #[test]
    fn test_retry_reuses_exact_snapshot() {
        let mut session = in_progress_session(Some(1));
        session.select_answer(0, 3);
        let original = session.begin_submission().expect("submit");
        session.fail_submission(SubmitFailure::Network("connection reset".into()));

        // Answers collected before the failure survive; nothing is re-prompted.
        let retried = session.retry_submission().expect("retryable");
        assert_eq!(retried, original);
        assert_eq!(retried.attempt_token, original.attempt_token);
        assert_eq!(*session.phase(), Phase::Submitting);
    }

    #[test]
    fn test_quota_rejection_is_not_retryable() {
        let mut session = in_progress_session(Some(1));
        session.begin_submission().expect("submit");
        session.fail_submission(SubmitFailure::QuotaExceeded("attempt limit reached".into()));
        assert!(session.retry_submission().is_none());
        assert!(matches!(session.phase(), Phase::SubmitError(f) if !f.is_retryable()));
    }

    #[test]
    fn test_complete_is_terminal() {
        let mut session = in_progress_session(Some(1));
        session.begin_submission().expect("submit");
        let result = SubmissionResult {
            submission_id: "s1".into(),
            quiz_id: "quiz1".into(),
            quiz_title: "Basics".into(),
            attempt_number: 1,
            max_attempts: Some(3),
            score: 2,
            max_score: 3,
            percentage: 66.7,
            is_passed: false,
            passing_score_percent: 70,
            time_taken_seconds: 30,
            answers: vec![],
        };
        session.complete(result.clone());
        assert_eq!(*session.phase(), Phase::Result(result));
        assert!(session.is_terminal());

        // No way back: late ticks, edits and submits are all no-ops.
        assert_eq!(session.tick(), TickOutcome::Idle);
        session.select_answer(0, 0);
        assert!(session.begin_submission().is_none());
        assert!(matches!(session.phase(), Phase::Result(_)));
    }

    #[test]
    fn test_submitting_freezes_editing() {
        let mut session = in_progress_session(Some(5));
        session.select_answer(0, 1);
        session.begin_submission().expect("submit");

        session.select_answer(0, 2);
        session.go_to(2);
        assert_eq!(session.answers().choice(0), Some(1));
        assert_eq!(session.current_question_index(), 0);
        // Clock stops the moment the phase leaves InProgress.
        assert_eq!(session.tick(), TickOutcome::Idle);
    }
}
