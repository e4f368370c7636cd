use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    middleware::{Throttle, bearer_token_middleware, log_requests, throttle},
    routes::{auth, common, director, genre, movie, user},
};

/// multipart 边界和其他字段的额外空间
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// 使用 Basic 头的路由，不经过 Bearer 中间件
fn basic_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/token/access", post(auth::rotate_access_token))
        .route("/auth/token/block", post(auth::block_token))
        .route("/auth/private", get(auth::private))
}

fn movie_routes(state: &AppState) -> Router<AppState> {
    let list_throttle = Throttle::new(state.cache.clone(), state.config.movie_list_throttle);

    Router::new()
        .route(
            "/movie",
            get(movie::find_all)
                .route_layer(from_fn_with_state(list_throttle, throttle))
                .post(movie::create),
        )
        .route("/movie/recent", get(movie::find_recent))
        .route(
            "/movie/{id}",
            get(movie::find_one)
                .patch(movie::update)
                .delete(movie::remove),
        )
        .route("/movie/{id}/like", post(movie::like))
        .route("/movie/{id}/dislike", post(movie::dislike))
}

fn director_routes() -> Router<AppState> {
    Router::new()
        .route("/director", get(director::find_all).post(director::create))
        .route(
            "/director/{id}",
            get(director::find_one)
                .patch(director::update)
                .delete(director::remove),
        )
}

fn genre_routes() -> Router<AppState> {
    Router::new()
        .route("/genre", get(genre::find_all).post(genre::create))
        .route(
            "/genre/{id}",
            get(genre::find_one)
                .patch(genre::update)
                .delete(genre::remove),
        )
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/user", get(user::find_all).post(user::create))
        .route(
            "/user/{id}",
            get(user::find_one).patch(user::update).delete(user::remove),
        )
}

fn common_routes(state: &AppState) -> Router<AppState> {
    Router::new().route(
        "/common/video",
        post(common::upload_video).layer(DefaultBodyLimit::max(
            state.config.upload_max_bytes + MULTIPART_OVERHEAD,
        )),
    )
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let bearer_routes = Router::new()
        .merge(auth_routes())
        .merge(movie_routes(&state))
        .merge(director_routes())
        .merge(genre_routes())
        .merge(user_routes())
        .merge(common_routes(&state))
        .layer(from_fn_with_state(state.clone(), bearer_token_middleware));

    let router = Router::new()
        .merge(basic_routes())
        .merge(bearer_routes)
        .nest_service("/public", ServeDir::new(&state.config.public_dir))
        .layer(from_fn(log_requests));

    // 开发模式允许所有来源
    #[cfg(debug_assertions)]
    let router = router.layer(tower_http::cors::CorsLayer::permissive());

    router.with_state(state)
}
