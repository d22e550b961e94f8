pub mod catalog_page;
pub mod nav_bar;
pub mod quiz_page;
pub mod result_page;

use dioxus::prelude::*;

use crate::backend::models::{QuizSummary, SubmissionResult};
use crate::backend::notifications::Notification;
use crate::backend::session::AttemptSession;
use crate::backend::AppEvent;

#[derive(Clone, Copy)]
pub struct AppState {
    pub catalog: Signal<Vec<QuizSummary>>,
    pub catalog_error: Signal<Option<String>>,
    pub session: Signal<Option<AttemptSession>>,
    pub fetched_result: Signal<Option<SubmissionResult>>,
    pub fetched_result_error: Signal<Option<String>>,
    pub notifications: Signal<Vec<Notification>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            catalog: use_signal(|| vec![]),
            catalog_error: use_signal(|| None),
            session: use_signal(|| None),
            fetched_result: use_signal(|| None),
            fetched_result_error: use_signal(|| None),
            notifications: use_signal(|| vec![]),
        }
    }
}

/// Apply one backend event to the UI signals. Runs in the event pump task.
pub fn apply_app_event(mut state: AppState, event: AppEvent) {
    match event {
        AppEvent::CatalogFetched(quizzes) => {
            state.catalog.set(quizzes);
            state.catalog_error.set(None);
        }
        AppEvent::CatalogError(message) => state.catalog_error.set(Some(message)),
        AppEvent::SessionChanged(session) => state.session.set(Some(session)),
        AppEvent::SessionClosed => state.session.set(None),
        AppEvent::ResultFetched(result) => {
            state.fetched_result.set(Some(result));
            state.fetched_result_error.set(None);
        }
        AppEvent::ResultError(message) => state.fetched_result_error.set(Some(message)),
        AppEvent::NotificationsChanged(items) => state.notifications.set(items),
    }
}
