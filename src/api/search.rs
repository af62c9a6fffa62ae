/// Full-text search endpoints
use crate::{
    context::AppContext,
    error::{BroadcasterError, BroadcasterResult},
    search::SearchRun,
};
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build search routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/search", post(run_search))
        .route("/api/search/:hash", get(get_search_page))
}

/// Search request; the page defaults to the first
#[derive(Debug, Deserialize)]
struct SearchBody {
    term: String,
    #[serde(default = "first_page")]
    page: u64,
}

fn first_page() -> u64 {
    1
}

/// Shape of a search that matched nothing
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmptySearchResponse {
    per_page: usize,
    total_results: usize,
    results: Vec<serde_json::Value>,
}

/// Shape of a page request beyond the result window
#[derive(Debug, Serialize)]
struct OutOfRangeResponse {
    results: Vec<serde_json::Value>,
}

/// A previously cached page, served without its page number
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredPageResponse {
    per_page: usize,
    total_results: usize,
    results: Vec<serde_json::Value>,
}

/// Run a search, serving from the page cache when the identical request has
/// been answered before.
async fn run_search(
    State(ctx): State<AppContext>,
    Json(body): Json<SearchBody>,
) -> BroadcasterResult<Response> {
    let run = ctx.search.run(&body.term, body.page).await?;

    let response = match run {
        SearchRun::Page(page) => Json(page).into_response(),
        SearchRun::Empty => Json(EmptySearchResponse {
            per_page: 0,
            total_results: 0,
            results: Vec::new(),
        })
        .into_response(),
        SearchRun::OutOfRange => Json(OutOfRangeResponse {
            results: Vec::new(),
        })
        .into_response(),
    };

    Ok(response)
}

/// Fetch a cached result page by its request hash
async fn get_search_page(
    State(ctx): State<AppContext>,
    Path(hash): Path<String>,
) -> BroadcasterResult<Json<StoredPageResponse>> {
    let page = ctx.search.lookup_page(&hash).await?.ok_or_else(|| {
        BroadcasterError::NotFound("Search results with given hash does not exist.".to_string())
    })?;

    Ok(Json(StoredPageResponse {
        per_page: page.per_page,
        total_results: page.total_results,
        results: page.results,
    }))
}
