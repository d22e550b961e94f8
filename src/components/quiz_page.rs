use dioxus::prelude::*;
use dioxus::core::use_drop;

use crate::backend::models::{format_clock, AttemptSummary, Quiz};
use crate::backend::session::{AttemptSession, Phase, SubmitFailure};
use crate::backend::AppCmd;
use crate::components::result_page::ResultCard;
use crate::Route;

#[component]
pub fn QuizPage(quiz_id: String, enrollment_id: String) -> Element {
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();
    let app_state = use_context::<crate::components::AppState>();

    // Open the session on mount; every visit restarts from Loading and
    // re-checks eligibility.
    let quiz_id_open = quiz_id.clone();
    let enrollment_id_open = enrollment_id.clone();
    let cmd_tx_open = cmd_tx.clone();
    use_effect(move || {
        let _ = cmd_tx_open.send(AppCmd::OpenQuiz {
            quiz_id: quiz_id_open.clone(),
            enrollment_id: enrollment_id_open.clone(),
        });
    });

    // Navigating away discards the session and stops the countdown, so no
    // orphaned timer can drive a submit after this page is gone.
    let cmd_tx_drop = cmd_tx.clone();
    use_drop(move || {
        let _ = cmd_tx_drop.send(AppCmd::LeaveQuiz);
    });

    let session = app_state.session.read().clone();
    let Some(session) = session else {
        return rsx! { LoadingPanel {} };
    };

    let content = match session.phase() {
        Phase::Loading => rsx! { LoadingPanel {} },
        Phase::LoadError(message) => rsx! {
            LoadErrorPanel { message: message.clone() }
        },
        Phase::Ineligible {
            attempts_used,
            max_attempts,
            latest,
        } => rsx! {
            IneligiblePanel {
                attempts_used: *attempts_used,
                max_attempts: *max_attempts,
                latest: latest.clone(),
            }
        },
        Phase::Introduction => {
            if let Some(quiz) = session.quiz() {
                rsx! { IntroPanel { quiz: quiz.clone() } }
            } else {
                rsx! { LoadingPanel {} }
            }
        }
        Phase::InProgress => {
            let gate = session.gate_summary();
            rsx! {
                QuestionPanel { session: session.clone(), frozen: false }
                if session.confirm_open() {
                    SubmitConfirmModal {
                        answered: gate.answered,
                        unanswered: gate.unanswered,
                        remaining_seconds: gate.remaining_seconds,
                    }
                }
            }
        }
        Phase::Submitting => rsx! {
            QuestionPanel { session: session.clone(), frozen: true }
            SubmittingOverlay {}
        },
        Phase::SubmitError(failure) => rsx! {
            SubmitErrorPanel { failure: failure.clone() }
        },
        Phase::Result(result) => {
            let cmd_tx_retry = cmd_tx.clone();
            let quiz_id_retry = quiz_id.clone();
            let enrollment_id_retry = enrollment_id.clone();
            rsx! {
                div { class: "page-container py-8 animate-fade-in",
                    ResultCard {
                        result: result.clone(),
                        // A fresh attempt re-enters Loading and re-checks
                        // eligibility server-side.
                        on_retry: Some(EventHandler::new(move |_| {
                            let _ = cmd_tx_retry.send(AppCmd::OpenQuiz {
                                quiz_id: quiz_id_retry.clone(),
                                enrollment_id: enrollment_id_retry.clone(),
                            });
                        })),
                    }
                }
            }
        }
    };

    rsx! {
        {content}
    }
}

#[component]
fn LoadingPanel() -> Element {
    rsx! {
        div { class: "page-container py-8",
            div { class: "empty-state py-12",
                div { class: "w-6 h-6 border-2 border-[var(--primary)] border-t-transparent rounded-full animate-spin" }
                p { class: "empty-state-title mt-4", "Loading quiz..." }
            }
        }
    }
}

#[component]
fn LoadErrorPanel(message: String) -> Element {
    rsx! {
        div { class: "page-container py-8 animate-fade-in",
            div { class: "panel border-[var(--danger)] text-center",
                div { class: "text-4xl mb-2", "⚠️" }
                h2 { class: "text-xl font-bold mb-2", "Could not load this quiz" }
                p { class: "text-[var(--text-secondary)] mb-6", "{message}" }
                Link { to: Route::CatalogPage {}, class: "btn btn-secondary", "← Back to catalog" }
            }
        }
    }
}

#[component]
fn IneligiblePanel(
    attempts_used: Option<u32>,
    max_attempts: Option<u32>,
    latest: Option<AttemptSummary>,
) -> Element {
    let attempts_line = match (attempts_used, max_attempts) {
        (Some(used), Some(max)) => format!("You have used all {used} of {max} allowed attempts."),
        _ => "You have no attempts left for this quiz.".to_string(),
    };

    rsx! {
        div { class: "page-container py-8 animate-fade-in",
            div { class: "panel text-center",
                div { class: "text-4xl mb-2", "🚫" }
                h2 { class: "text-xl font-bold mb-2", "No attempts remaining" }
                p { class: "text-[var(--text-secondary)]", "{attempts_line}" }

                if let Some(attempt) = latest {
                    {
                        let date_str = attempt.submitted_at.format("%Y-%m-%d").to_string();
                        let verdict = if attempt.is_passed { "Passed" } else { "Not passed" };
                        rsx! {
                            div { class: "mt-4 p-4 rounded-lg bg-[var(--bg-secondary)] inline-block",
                                p { class: "text-sm",
                                    "Last attempt (#{attempt.attempt_number}, {date_str}): {attempt.score}/{attempt.max_score}, {verdict}"
                                }
                            }
                        }
                    }
                }

                div { class: "mt-6",
                    Link { to: Route::CatalogPage {}, class: "btn btn-secondary", "← Back to catalog" }
                }
            }
        }
    }
}

#[component]
fn IntroPanel(quiz: Quiz) -> Element {
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();

    let time_line = match quiz.time_limit_minutes {
        Some(minutes) => format!("You will have {minutes} minutes once you start."),
        None => "This quiz has no time limit.".to_string(),
    };
    let attempts_line = match quiz.max_attempts {
        Some(max) => format!("{max} attempts allowed"),
        None => "Unlimited attempts".to_string(),
    };

    rsx! {
        div { class: "page-container py-8 animate-fade-in",
            div { class: "panel",
                div { class: "panel-header",
                    h1 { class: "text-2xl font-bold", "{quiz.title}" }
                    p { class: "text-[var(--text-secondary)] mt-1", "{quiz.description}" }
                }
                div { class: "grid gap-2 my-4 text-sm text-[var(--text-secondary)]",
                    p { "📝 {quiz.question_count} questions" }
                    p { "⏱ {time_line}" }
                    p { "🎯 {quiz.passing_score_percent}% needed to pass • {attempts_line}" }
                }
                div { class: "flex gap-2 justify-end",
                    Link { to: Route::CatalogPage {}, class: "btn btn-secondary", "Cancel" }
                    button {
                        class: "btn btn-primary",
                        onclick: move |_| {
                            // The clock starts now, not at page load.
                            let _ = cmd_tx.send(AppCmd::StartAttempt);
                        },
                        "Start Quiz"
                    }
                }
            }
        }
    }
}

#[component]
fn QuestionPanel(session: AttemptSession, frozen: bool) -> Element {
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();

    let questions = session.questions();
    let question_count = questions.len();
    let current_idx = session.current_question_index();
    if current_idx >= question_count {
        return rsx! { div {} };
    }

    let current_question = &questions[current_idx];
    let selected = session.answers().choice(current_idx);
    let answered_count = session.answers().answered_count();
    let is_first = current_idx == 0;
    let is_last = current_idx == question_count - 1;

    let title = session
        .quiz()
        .map(|q| q.title.clone())
        .unwrap_or_default();
    let prompt = current_question.prompt.clone();
    let options = current_question.options.clone();
    let points = current_question.points;

    let palette: Vec<(usize, bool, bool)> = (0..question_count)
        .map(|i| (i, session.answers().choice(i).is_some(), i == current_idx))
        .collect();

    rsx! {
        div { class: "page-container py-8 animate-fade-in",
            div { class: "panel",
                // Header: title, progress, countdown
                div { class: "flex justify-between items-center mb-4",
                    div {
                        h2 { class: "text-xl font-bold", "{title}" }
                        p { class: "text-sm text-[var(--text-secondary)]",
                            "Question {current_idx + 1} of {question_count} • {answered_count} answered"
                        }
                    }
                    if let Some(remaining) = session.remaining_seconds() {
                        {
                            let clock = format_clock(remaining);
                            let clock_class = if remaining < 60 {
                                "timer text-[var(--danger)] font-mono text-lg font-bold"
                            } else {
                                "timer font-mono text-lg font-bold"
                            };
                            rsx! {
                                span { class: "{clock_class}", "⏱ {clock}" }
                            }
                        }
                    }
                }

                // Progress bar
                div { class: "w-full bg-[var(--bg-secondary)] rounded-full h-2 mb-4",
                    div {
                        class: "bg-[var(--primary)] h-2 rounded-full transition-all",
                        style: "width: {((current_idx + 1) as f32 / question_count as f32 * 100.0)}%"
                    }
                }

                // Question palette: every question is directly reachable
                div { class: "flex flex-wrap gap-2 mb-6",
                    for (idx, answered, is_current) in palette {
                        {
                            let palette_class = if is_current {
                                "palette-cell current"
                            } else if answered {
                                "palette-cell answered"
                            } else {
                                "palette-cell"
                            };
                            let cmd_tx_jump = cmd_tx.clone();
                            rsx! {
                                button {
                                    key: "{idx}",
                                    class: "{palette_class}",
                                    disabled: frozen,
                                    onclick: move |_| {
                                        let _ = cmd_tx_jump.send(AppCmd::GoToQuestion { question_index: idx });
                                    },
                                    "{idx + 1}"
                                }
                            }
                        }
                    }
                }

                // Question + options
                div { class: "mb-6",
                    div { class: "flex justify-between items-baseline mb-4",
                        h3 { class: "text-lg font-semibold", "{prompt}" }
                        span { class: "text-xs text-[var(--text-muted)]", "{points} pts" }
                    }
                    div { class: "space-y-3",
                        for (option_idx, option_text) in options.iter().enumerate() {
                            {
                                let is_selected = selected == Some(option_idx);
                                let option_class = if is_selected {
                                    "option-row selected"
                                } else {
                                    "option-row"
                                };
                                let text = option_text.clone();
                                let cmd_tx_select = cmd_tx.clone();
                                rsx! {
                                    button {
                                        key: "{option_idx}",
                                        class: "{option_class}",
                                        disabled: frozen,
                                        onclick: move |_| {
                                            let _ = cmd_tx_select.send(AppCmd::SelectAnswer {
                                                question_index: current_idx,
                                                option_index: option_idx,
                                            });
                                        },
                                        span { "{text}" }
                                    }
                                }
                            }
                        }
                    }
                }

                // Navigation + submit
                div { class: "flex justify-between gap-4",
                    {
                        let cmd_tx_prev = cmd_tx.clone();
                        rsx! {
                            button {
                                class: "btn btn-secondary",
                                disabled: frozen || is_first,
                                onclick: move |_| {
                                    let _ = cmd_tx_prev.send(AppCmd::PreviousQuestion);
                                },
                                "← Previous"
                            }
                        }
                    }
                    div { class: "flex gap-2",
                        if !is_last {
                            {
                                let cmd_tx_next = cmd_tx.clone();
                                rsx! {
                                    button {
                                        class: "btn btn-secondary",
                                        disabled: frozen,
                                        onclick: move |_| {
                                            let _ = cmd_tx_next.send(AppCmd::NextQuestion);
                                        },
                                        "Next →"
                                    }
                                }
                            }
                        }
                        {
                            let cmd_tx_submit = cmd_tx.clone();
                            rsx! {
                                button {
                                    class: "btn btn-primary",
                                    disabled: frozen,
                                    onclick: move |_| {
                                        let _ = cmd_tx_submit.send(AppCmd::RequestSubmit);
                                    },
                                    "Submit Quiz"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Consent step before a user-initiated submission. Timer expiry never shows
/// this dialog.
#[component]
fn SubmitConfirmModal(
    answered: usize,
    unanswered: usize,
    remaining_seconds: Option<u32>,
) -> Element {
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();
    let cmd_tx_cancel = cmd_tx.clone();
    let cmd_tx_confirm = cmd_tx.clone();

    rsx! {
        div {
            class: "fixed inset-0 bg-black/60 flex items-center justify-center z-50 animate-fade-in",
            onclick: move |e| e.stop_propagation(),

            div {
                class: "panel max-w-md w-full mx-4",
                onclick: move |e| e.stop_propagation(),

                h2 { class: "text-xl font-bold mb-4", "Submit your answers?" }

                div { class: "grid gap-2 mb-6 text-sm",
                    p { "✅ {answered} answered" }
                    if unanswered > 0 {
                        p { class: "text-[var(--warning)] font-semibold",
                            "⚠ {unanswered} unanswered: these will be scored as incorrect"
                        }
                    }
                    if let Some(remaining) = remaining_seconds {
                        {
                            let clock = format_clock(remaining);
                            rsx! {
                                p { class: "text-[var(--text-secondary)]", "⏱ {clock} still on the clock" }
                            }
                        }
                    }
                }

                div { class: "flex justify-end gap-2",
                    button {
                        class: "btn btn-secondary",
                        onclick: move |_| {
                            let _ = cmd_tx_cancel.send(AppCmd::CancelSubmitPrompt);
                        },
                        "Continue editing"
                    }
                    button {
                        class: "btn btn-primary",
                        onclick: move |_| {
                            let _ = cmd_tx_confirm.send(AppCmd::ConfirmSubmit);
                        },
                        "Submit now"
                    }
                }
            }
        }
    }
}

#[component]
fn SubmittingOverlay() -> Element {
    rsx! {
        div { class: "fixed inset-0 bg-black/60 flex items-center justify-center z-50",
            div { class: "panel text-center",
                div { class: "w-6 h-6 border-2 border-[var(--primary)] border-t-transparent rounded-full animate-spin mx-auto mb-2" }
                p { "Submitting..." }
            }
        }
    }
}

#[component]
fn SubmitErrorPanel(failure: SubmitFailure) -> Element {
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();

    let (headline, message, retryable) = match &failure {
        SubmitFailure::Network(msg) => (
            "Submission failed",
            format!("We could not reach the server ({msg}). Your answers are safe, try again."),
            true,
        ),
        SubmitFailure::QuotaExceeded(_) => (
            "No attempts remaining",
            "Your attempt limit was reached, possibly from another window. This attempt cannot be scored.".to_string(),
            false,
        ),
    };

    rsx! {
        div { class: "page-container py-8 animate-fade-in",
            div { class: "panel border-[var(--danger)] text-center",
                div { class: "text-4xl mb-2", "⚠️" }
                h2 { class: "text-xl font-bold mb-2", "{headline}" }
                p { class: "text-[var(--text-secondary)] mb-6", "{message}" }
                div { class: "flex justify-center gap-2",
                    Link { to: Route::CatalogPage {}, class: "btn btn-secondary", "← Back to catalog" }
                    if retryable {
                        button {
                            class: "btn btn-primary",
                            onclick: move |_| {
                                let _ = cmd_tx.send(AppCmd::RetrySubmit);
                            },
                            "Retry submission"
                        }
                    }
                }
            }
        }
    }
}
