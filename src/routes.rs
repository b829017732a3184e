use actix_web::{
    get,
    http::header::LOCATION,
    route,
    web::{self, Either},
    HttpResponse,
};
use askama::Template;
use serde::Deserialize;

use crate::{assets, board::StatusBoard, dispatch::Recipients, structures::errors::StatusBoardError};

const SUCCESS_REDIRECT: &str = "/?success=true";

/// Form fields from a urlencoded body, or from the query string when there
/// is none. Kept as pairs so repeated keys survive.
type Fields = Either<web::Form<Vec<(String, String)>>, web::Query<Vec<(String, String)>>>;

fn pairs(fields: Fields) -> Vec<(String, String)> {
    match fields {
        Either::Left(form) => form.into_inner(),
        Either::Right(query) => query.into_inner(),
    }
}

fn field<'a>(pairs: &'a [(String, String)], key: &str) -> &'a str {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
        .unwrap_or_default()
}

fn redirect_success() -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((LOCATION, SUCCESS_REDIRECT))
        .finish()
}

#[derive(Debug, Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    success: bool,
}

#[derive(Debug, Deserialize)]
struct IndexQuery {
    #[serde(default)]
    success: bool,
}

#[get("/")]
pub async fn index_handler(
    query: Option<web::Query<IndexQuery>>,
) -> Result<HttpResponse, StatusBoardError> {
    let success = query.map(|q| q.success).unwrap_or_default();
    Ok(HttpResponse::Ok()
        .content_type("text/html")
        .body(IndexTemplate { success }.render()?))
}

#[route("/status/set", method = "GET", method = "POST")]
pub async fn set_status_handler(
    board: web::Data<StatusBoard>,
    fields: Fields,
) -> Result<HttpResponse, StatusBoardError> {
    let fields = pairs(fields);
    board
        .submit(field(&fields, "site-name"), field(&fields, "status"))
        .await?;
    Ok(redirect_success())
}

#[get("/view/all")]
pub async fn view_all_handler(
    board: web::Data<StatusBoard>,
) -> Result<HttpResponse, StatusBoardError> {
    Ok(HttpResponse::Ok().json(board.list_all().await?))
}

#[route("/send/all", method = "GET", method = "POST")]
pub async fn send_all_handler(
    board: web::Data<StatusBoard>,
    fields: Fields,
) -> Result<HttpResponse, StatusBoardError> {
    let fields = pairs(fields);
    let recipients = Recipients::parse(
        fields
            .iter()
            .filter(|(k, _)| k == "email")
            .map(|(_, v)| v.as_str()),
    )?;
    // dropping the handle detaches the sends; their outcomes only reach the log
    let _ = board.report_and_send(recipients).await?;
    Ok(redirect_success())
}

#[route("/delete/all", method = "GET", method = "POST")]
pub async fn delete_all_handler(
    board: web::Data<StatusBoard>,
) -> Result<HttpResponse, StatusBoardError> {
    board.clear_all().await?;
    Ok(redirect_success())
}

#[get("/assets/{path:.*}")]
pub async fn assets_handler(path: web::Path<String>) -> HttpResponse {
    assets::serve(&path)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index_handler)
        .service(set_status_handler)
        .service(view_all_handler)
        .service(send_all_handler)
        .service(delete_all_handler)
        .service(assets_handler);
}
