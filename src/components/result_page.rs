use dioxus::prelude::*;

use crate::backend::models::{format_clock, SubmissionResult};
use crate::backend::AppCmd;
use crate::Route;

/// Standalone result screen, reachable by direct navigation (e.g. a reload on
/// the result URL). Fetches the scored result by submission id.
#[component]
pub fn ResultPage(submission_id: String) -> Element {
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();
    let app_state = use_context::<crate::components::AppState>();

    let submission_id_fetch = submission_id.clone();
    let cmd_tx_fetch = cmd_tx.clone();
    use_effect(move || {
        let _ = cmd_tx_fetch.send(AppCmd::FetchSubmissionResult {
            submission_id: submission_id_fetch.clone(),
        });
    });

    let result = app_state.fetched_result.read().clone();
    let error = app_state.fetched_result_error.read().clone();

    rsx! {
        div { class: "page-container py-8 animate-fade-in",
            if let Some(message) = error {
                div { class: "panel border-[var(--danger)] text-center",
                    p { class: "text-[var(--danger)] mb-4", "Could not load this result: {message}" }
                    Link { to: Route::CatalogPage {}, class: "btn btn-secondary", "← Back to catalog" }
                }
            } else if let Some(result) = result {
                ResultCard { result: result }
            } else {
                div { class: "empty-state py-12",
                    div { class: "w-6 h-6 border-2 border-[var(--primary)] border-t-transparent rounded-full animate-spin" }
                    p { class: "empty-state-title mt-4", "Loading result..." }
                }
            }
        }
    }
}

/// Renders a scored result: verdict, score bar, and an expandable
/// per-question breakdown. The retry offer is derived from this result, not
/// from any earlier eligibility snapshot.
#[component]
pub fn ResultCard(result: SubmissionResult, on_retry: Option<EventHandler<()>>) -> Element {
    let mut show_breakdown = use_signal(|| false);

    let percent = result.percent_clamped();
    let percent_str = format!("{percent:.0}");
    let time_taken = format_clock(result.time_taken_seconds);
    let attempts_line = match result.max_attempts {
        Some(max) => format!("Attempt {} of {}", result.attempt_number, max),
        None => format!("Attempt {}", result.attempt_number),
    };
    let offer_retry = result.can_retry() && on_retry.is_some();

    rsx! {
        div { class: "panel max-w-2xl mx-auto text-center",
            // Verdict
            div { class: "text-6xl mb-4",
                if result.is_passed { "🎉" } else { "📚" }
            }
            h2 {
                class: if result.is_passed {
                    "text-2xl font-bold text-[var(--success)] mb-2"
                } else {
                    "text-2xl font-bold text-[var(--warning)] mb-2"
                },
                if result.is_passed { "Congratulations, you passed!" } else { "Not passed this time" }
            }
            p { class: "text-[var(--text-secondary)] mb-6",
                "{result.quiz_title} • {attempts_line} • took {time_taken}"
            }

            // Score
            div { class: "mb-6 p-6 rounded-xl bg-[var(--bg-secondary)]",
                div { class: "text-4xl font-bold mb-2", "{result.score}/{result.max_score}" }
                div { class: "text-sm text-[var(--text-secondary)] mb-3",
                    "{percent_str}% scored, {result.passing_score_percent}% needed to pass"
                }
                div { class: "w-full bg-[var(--bg-default)] rounded-full h-3",
                    div {
                        class: if result.is_passed {
                            "bg-[var(--success)] h-3 rounded-full transition-all"
                        } else {
                            "bg-[var(--warning)] h-3 rounded-full transition-all"
                        },
                        style: "width: {percent}%"
                    }
                }
            }

            // Per-question breakdown
            if !result.answers.is_empty() {
                button {
                    class: "btn btn-ghost btn-sm mb-4",
                    onclick: move |_| show_breakdown.set(!show_breakdown()),
                    if show_breakdown() { "Hide breakdown ▲" } else { "Show breakdown ▼" }
                }
            }
            if show_breakdown() {
                div { class: "grid gap-2 mb-6 text-left",
                    for answer in result.answers.iter() {
                        {
                            let selected = if answer.selected_option < 0 {
                                "Unanswered".to_string()
                            } else {
                                format!("Option {}", answer.selected_option + 1)
                            };
                            let correct = format!("Option {}", answer.correct_option + 1);
                            let row_class = if answer.is_correct {
                                "p-3 rounded-lg bg-[var(--bg-secondary)] border-l-4 border-[var(--success)]"
                            } else {
                                "p-3 rounded-lg bg-[var(--bg-secondary)] border-l-4 border-[var(--danger)]"
                            };
                            rsx! {
                                div {
                                    key: "{answer.question_id}",
                                    class: "{row_class}",
                                    p { class: "font-semibold text-sm", "{answer.prompt}" }
                                    p { class: "text-xs text-[var(--text-secondary)] mt-1",
                                        "Your answer: {selected} • Correct: {correct} • {answer.points_earned}/{answer.points_possible} pts"
                                    }
                                }
                            }
                        }
                    }
                }
            }

            // Exits
            div { class: "flex justify-center gap-2",
                Link { to: Route::CatalogPage {}, class: "btn btn-secondary", "Back to catalog" }
                if offer_retry {
                    button {
                        class: "btn btn-primary",
                        onclick: move |_| {
                            if let Some(handler) = &on_retry {
                                handler.call(());
                            }
                        },
                        "Try again"
                    }
                }
            }
        }
    }
}
