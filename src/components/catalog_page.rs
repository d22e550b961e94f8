use dioxus::prelude::*;
use crate::backend::AppCmd;
use crate::Route;

#[component]
pub fn CatalogPage() -> Element {
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();
    let app_state = use_context::<crate::components::AppState>();

    // Fetch on mount
    let cmd_tx_effect = cmd_tx.clone();
    use_effect(move || {
        let _ = cmd_tx_effect.send(AppCmd::FetchCatalog);
    });

    let quizzes = app_state.catalog.read().clone();
    let error = app_state.catalog_error.read().clone();

    rsx! {
        div { class: "page-container py-8 animate-fade-in",
            div { class: "page-header",
                h1 { class: "page-title", "📚 Quiz Catalog" }
                p { class: "text-[var(--text-secondary)] mt-1", "Pick a quiz and test yourself" }
            }

            if let Some(message) = error {
                div { class: "panel border-[var(--danger)]",
                    p { class: "text-[var(--danger)]", "Could not load the catalog: {message}" }
                }
            }

            div { class: "grid gap-4",
                if quizzes.is_empty() {
                    div { class: "empty-state py-12",
                        div { class: "empty-state-icon", "📝" }
                        p { class: "empty-state-title", "No quizzes available" }
                        p { class: "empty-state-text", "Check back once your courses publish quizzes." }
                    }
                } else {
                    for quiz in quizzes.iter() {
                        {
                            let time_limit = match quiz.time_limit_minutes {
                                Some(minutes) => format!("{minutes} min limit"),
                                None => "No time limit".to_string(),
                            };
                            let attempts = match quiz.max_attempts {
                                Some(max) => format!("{} of {} attempts used", quiz.attempts_used, max),
                                None => "Unlimited attempts".to_string(),
                            };
                            let exhausted = quiz
                                .max_attempts
                                .is_some_and(|max| quiz.attempts_used >= max);

                            rsx! {
                                div {
                                    key: "{quiz.id}",
                                    class: "panel",
                                    div { class: "flex justify-between items-center",
                                        div {
                                            h3 { class: "font-bold", "{quiz.title}" }
                                            p { class: "text-sm text-[var(--text-secondary)]", "{quiz.description}" }
                                            p { class: "text-xs text-[var(--text-muted)] mt-1",
                                                "{quiz.question_count} questions • {time_limit} • {quiz.passing_score_percent}% to pass"
                                            }
                                            p { class: "text-xs text-[var(--text-muted)]", "{attempts}" }
                                        }
                                        if exhausted {
                                            span { class: "badge badge-muted", "No attempts left" }
                                        } else {
                                            Link {
                                                to: Route::QuizPage {
                                                    quiz_id: quiz.id.clone(),
                                                    enrollment_id: quiz.enrollment_id.clone(),
                                                },
                                                class: "btn btn-primary btn-sm",
                                                "Start Quiz"
                                            }
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
