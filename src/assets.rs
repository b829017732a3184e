use actix_web::HttpResponse;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Assets;

/// Serves an embedded file, or 404 when there is none at `path`.
pub fn serve(path: &str) -> HttpResponse {
    match Assets::get(path) {
        Some(file) => HttpResponse::Ok()
            .content_type(
                mime_guess::from_path(path)
                    .first_or_octet_stream()
                    .as_ref(),
            )
            .body(file.data.into_owned()),
        None => HttpResponse::NotFound().finish(),
    }
}
