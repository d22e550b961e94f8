mod backend;
mod components;

use components::catalog_page::CatalogPage;
use components::nav_bar::NavComponent;
use components::quiz_page::QuizPage;
use components::result_page::ResultPage;

use backend::{AppCmd, AppEvent, Config};
use dioxus::prelude::*;
use tokio::sync::mpsc;

#[derive(Routable, Clone, PartialEq)]
enum Route {
    #[layout(NavComponent)]
    #[route("/")]
    CatalogPage {},
    #[route("/quiz/:quiz_id/:enrollment_id")]
    QuizPage {
        quiz_id: String,
        enrollment_id: String,
    },
    #[route("/result/:submission_id")]
    ResultPage { submission_id: String },
}

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "learnhub=info".to_owned());
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    let app_state = components::AppState::new();
    use_context_provider(|| app_state);

    // One backend per app: commands flow down, events flow back up into the
    // signals. The sender is what every component grabs from context.
    use_context_provider(|| {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<AppCmd>();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();

        let config = Config::from_env();

        #[cfg(not(target_arch = "wasm32"))]
        tokio::spawn(backend::init(cmd_tx.clone(), cmd_rx, event_tx, config));

        #[cfg(target_arch = "wasm32")]
        wasm_bindgen_futures::spawn_local(backend::init(cmd_tx.clone(), cmd_rx, event_tx, config));

        spawn(async move {
            while let Some(event) = event_rx.recv().await {
                components::apply_app_event(app_state, event);
            }
        });

        cmd_tx
    });

    rsx! {
        document::Stylesheet { href: asset!("/assets/main.css") }
        Router::<Route> {}
    }
}
