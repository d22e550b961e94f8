use dioxus::prelude::*;
use crate::backend::AppCmd;
use crate::Route;

#[component]
pub fn NavComponent() -> Element {
    let app_state = use_context::<crate::components::AppState>();
    let notifications = app_state.notifications.read();
    let unread_count = notifications.iter().filter(|n| !n.read).count();
    drop(notifications);

    let mut show_notifications = use_signal(|| false);

    rsx! {
        div { class: "min-h-screen flex flex-col",
            nav { class: "nav-bar",
                div { class: "page-container",
                    // Logo section
                    div { class: "nav-logo",
                        div { class: "logo-icon" }
                        span { class: "logo-text", "LearnHub" }
                    }

                    // Navigation links
                    div { class: "nav-links",
                        Link {
                            to: Route::CatalogPage {},
                            class: "nav-link",
                            active_class: "active",
                            "Catalog"
                        }

                        // Notification bell
                        button {
                            class: "nav-link relative",
                            onclick: move |_| show_notifications.set(!show_notifications()),
                            "🔔"
                            if unread_count > 0 {
                                span { class: "badge badge-primary ml-1", "{unread_count}" }
                            }
                        }
                    }
                }
            }

            if show_notifications() {
                NotificationDropdown {}
            }

            div { class: "flex-1",
                Outlet::<Route> {}
            }
        }
    }
}

#[component]
fn NotificationDropdown() -> Element {
    let app_state = use_context::<crate::components::AppState>();
    let cmd_tx = use_context::<tokio::sync::mpsc::UnboundedSender<AppCmd>>();
    let notifications = app_state.notifications.read().clone();

    rsx! {
        div { class: "notification-dropdown panel",
            if notifications.is_empty() {
                p { class: "text-[var(--text-secondary)] text-sm p-4", "No notifications" }
            } else {
                for notification in notifications.iter() {
                    {
                        let id_read = notification.id.clone();
                        let id_delete = notification.id.clone();
                        let cmd_tx_read = cmd_tx.clone();
                        let cmd_tx_delete = cmd_tx.clone();
                        let row_class = if notification.read {
                            "notification-row"
                        } else {
                            "notification-row unread"
                        };
                        let time_str = notification.created_at.format("%H:%M").to_string();

                        rsx! {
                            div {
                                key: "{notification.id}",
                                class: "{row_class} flex items-start gap-2 p-3 border-b border-[var(--border)]",
                                div { class: "flex-1",
                                    div { class: "font-semibold text-sm", "{notification.title}" }
                                    p { class: "text-xs text-[var(--text-secondary)]", "{notification.body}" }
                                    span { class: "text-[10px] text-[var(--text-muted)]", "{time_str}" }
                                }
                                if !notification.read {
                                    button {
                                        class: "btn btn-ghost btn-sm",
                                        onclick: move |_| {
                                            let _ = cmd_tx_read.send(AppCmd::MarkNotificationRead {
                                                notification_id: id_read.clone(),
                                            });
                                        },
                                        "Mark read"
                                    }
                                }
                                button {
                                    class: "btn btn-ghost btn-sm",
                                    onclick: move |_| {
                                        let _ = cmd_tx_delete.send(AppCmd::DeleteNotification {
                                            notification_id: id_delete.clone(),
                                        });
                                    },
                                    "✕"
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
