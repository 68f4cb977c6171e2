//! `GET /playlist?url=<upstream>`: fetch an upstream playlist and serve it filtered.
//!
//! Master playlists are rewritten so that every variant is requested through this
//! route again; media playlists go through the ad filter and have all their URIs
//! made absolute, so segments and keys are loaded straight from the origin.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use hls_adfilter::{UriSite, absolutize_all, is_master_playlist, is_media_playlist, rewrite_uris};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::AppState;
use super::error::{ApiError, ApiResult};

const PLAYLIST_CONTENT_TYPE: &str = "application/vnd.apple.mpegurl";

#[derive(Debug, Deserialize)]
pub struct PlaylistQuery {
    pub url: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/playlist", get(proxy_playlist).options(playlist_options))
}

fn cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Range, Authorization"),
    );
}

async fn playlist_options() -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    cors_headers(&mut headers);
    (StatusCode::NO_CONTENT, headers)
}

pub async fn proxy_playlist(
    State(state): State<AppState>,
    Query(query): Query<PlaylistQuery>,
) -> ApiResult<Response> {
    let target =
        Url::parse(&query.url).map_err(|e| ApiError::bad_request(format!("Invalid url: {e}")))?;
    match target.scheme() {
        "http" | "https" => {}
        _ => return Err(ApiError::bad_request("Only http/https URLs are allowed")),
    }

    let fetched = state.fetcher.fetch(target.as_str()).await?;
    // Relative URIs resolve against where the playlist was finally served from.
    let served_from = Url::parse(&fetched.url).unwrap_or_else(|_| target.clone());

    let body = if is_master_playlist(&fetched.body) {
        debug!(url = %target, "Routing master playlist variants through proxy");
        route_variants_through_proxy(&fetched.body, &served_from)
    } else if is_media_playlist(&fetched.body) {
        let filtered = state
            .filter
            .process_playlist(target.as_str(), &fetched.body);
        absolutize_all(&filtered, &served_from)
    } else {
        return Err(ApiError::bad_gateway(format!(
            "Upstream did not return an HLS playlist: {target}"
        )));
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(PLAYLIST_CONTENT_TYPE),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    cors_headers(&mut headers);

    Ok((StatusCode::OK, headers, body).into_response())
}

/// Point variant stream lines back at `/playlist`; other URIs (renditions, keys) are
/// made absolute and fetched directly.
fn route_variants_through_proxy(master: &str, master_url: &Url) -> String {
    rewrite_uris(master, |uri, site| {
        let absolute = master_url.join(uri).ok()?;
        match site {
            UriSite::Line => {
                let encoded: String =
                    url::form_urlencoded::byte_serialize(absolute.as_str().as_bytes()).collect();
                Some(format!("/playlist?url={encoded}"))
            }
            UriSite::Attribute => Some(absolute.into()),
        }
    })
}
