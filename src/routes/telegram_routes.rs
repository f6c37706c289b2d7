use axum::{Router, routing::{get, post}};
use crate::{AppState, controllers::telegram_controller};

pub fn add_routes(router: Router<AppState>) -> Router<AppState> {
    router
        .route(
            "/api/telegram",
            get(telegram_controller::get_settings)
                .post(telegram_controller::post_settings)
                .delete(telegram_controller::delete_settings),
        )
        .route("/api/telegram/test", post(telegram_controller::post_test))
}
