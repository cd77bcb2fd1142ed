pub mod analytics;
pub mod content;
pub mod health;
pub mod qna;
pub mod quiz;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::middleware::rate_limit::{new_rps_state, rps_middleware};
use crate::AppState;

/// All API routes. `/health` sits outside the rate limit.
pub fn router(state: AppState, public_rps: u32) -> Router {
    let base_routes = Router::new().route("/health", get(health::health));

    let api = Router::new()
        .route("/api/mdx", post(content::get_mdx))
        .route("/api/ai-quiz", post(quiz::generate_quiz))
        .route("/api/generate-questions", post(qna::generate_questions))
        .route("/api/generate-answer", post(qna::generate_answer))
        .route("/api/quiz/sessions", post(quiz::create_session))
        .route(
            "/api/quiz/sessions/:id",
            get(quiz::get_session).delete(quiz::close_session),
        )
        .route("/api/quiz/sessions/:id/answer", put(quiz::answer))
        .route("/api/quiz/sessions/:id/advance", post(quiz::advance))
        .route("/api/quiz/sessions/:id/submit", post(quiz::submit))
        .route("/api/quiz/sessions/:id/visibility", post(quiz::visibility))
        .route("/api/analytics", get(analytics::overview))
        .route("/api/analytics/sessions", get(analytics::sessions))
        .layer(axum::middleware::from_fn_with_state(
            new_rps_state(public_rps),
            rps_middleware,
        ));

    base_routes.merge(api).with_state(state)
}
