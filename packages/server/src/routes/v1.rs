use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/users", user_routes())
        .nest("/photos", photo_routes())
        .nest("/comments", comment_routes())
        .nest("/tags", tag_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::signup))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::refresh_token))
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::confirmed_email))
        .routes(routes!(handlers::auth::me))
}

fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::user::current_user))
        .routes(routes!(handlers::user::update_avatar))
        .routes(routes!(handlers::user::get_user))
}

fn photo_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::photo::upload_photo,
            handlers::photo::list_own_photos
        ))
        .routes(routes!(handlers::photo::list_all_photos))
        .routes(routes!(handlers::photo::search_photos))
        .routes(routes!(handlers::photo::search_photos_by_owner))
        .routes(routes!(handlers::photo::delete_rating))
        .routes(routes!(handlers::photo::generate_qr))
        .routes(routes!(
            handlers::photo::get_photo,
            handlers::photo::update_photo,
            handlers::photo::delete_photo
        ))
        .routes(routes!(handlers::photo::transform_photo))
        .routes(routes!(
            handlers::photo::rate_photo,
            handlers::photo::list_photo_ratings
        ))
        .layer(handlers::photo::photo_upload_body_limit())
}

fn comment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::comment::add_comment))
        .routes(routes!(handlers::comment::list_photo_comments))
        .routes(routes!(
            handlers::comment::edit_comment,
            handlers::comment::remove_comment
        ))
}

fn tag_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::tag::list_tags))
        .routes(routes!(
            handlers::tag::create_or_get_tag,
            handlers::tag::delete_tag
        ))
}
