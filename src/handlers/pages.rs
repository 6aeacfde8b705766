use axum::response::{Html, Response};

use crate::models::errors;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Landing page with the upload form
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn not_found() -> Response {
    errors::not_found()
}
