use axum::body::Body;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::response::Response;
use futures_util::StreamExt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::metrics::{REQUEST_LATENCY, UPSTREAM_ERRORS};
use crate::state::AppState;

// Headers that describe a single connection and must not be forwarded
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    // the body is re-framed on each side
    headers.remove(header::CONTENT_LENGTH);
    headers
}

fn append_forwarded_for(headers: &mut HeaderMap, peer: SocketAddr) {
    let ip = peer.ip();
    let value = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        Some(prev) => format!("{prev}, {ip}"),
        None => ip.to_string(),
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert("x-forwarded-for", value);
    }
}

// Buffers the request body, refusing anything over `max` bytes
async fn read_body_capped(body: Body, max: usize) -> Result<Vec<u8>, ApiError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ApiError::BadRequest(format!("reading request body: {e}")))?;
        if buf.len() + chunk.len() > max {
            return Err(ApiError::PayloadTooLarge);
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

// Forwards an admitted request to the next healthy upstream
pub async fn proxy_handler(
    State(state): State<Arc<AppState>>,
    req: Request,
) -> Result<Response, ApiError> {
    let start_time = Instant::now();

    let upstream = state.pool.next_upstream().ok_or(ApiError::NoHealthyUpstream)?;

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let (parts, body) = req.into_parts();

    let declared_len = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared_len.is_some_and(|len| len > state.max_body_bytes) {
        return Err(ApiError::PayloadTooLarge);
    }
    let body = read_body_capped(body, state.max_body_bytes).await?;

    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = format!("{}{}", upstream.url, path_and_query);

    let mut headers = strip_hop_by_hop(parts.headers);
    headers.remove(header::HOST);
    if let Some(peer) = peer {
        append_forwarded_for(&mut headers, peer);
    }

    let is_head = parts.method == Method::HEAD;

    tracing::debug!(method = %parts.method, %url, "forwarding request");

    let result = state
        .client
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream_res = match result {
        Ok(res) => res,
        Err(e) => {
            UPSTREAM_ERRORS.inc();
            state.pool.mark_unhealthy(&upstream);
            return Err(ApiError::BadGateway(format!("{}: {}", upstream.url, e)));
        }
    };

    let status = upstream_res.status();
    let mut headers = strip_hop_by_hop(upstream_res.headers().clone());
    // a HEAD answer has no body to re-frame, so the upstream's length stands
    if is_head {
        if let Some(len) = upstream_res.headers().get(header::CONTENT_LENGTH) {
            headers.insert(header::CONTENT_LENGTH, len.clone());
        }
    }
    let bytes = upstream_res.bytes().await.map_err(|e| {
        UPSTREAM_ERRORS.inc();
        ApiError::BadGateway(format!("reading body from {}: {}", upstream.url, e))
    })?;

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    *response.headers_mut() = headers;

    REQUEST_LATENCY.observe(start_time.elapsed().as_secs_f64());

    Ok(response)
}
