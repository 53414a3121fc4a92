use axum::{
    body::Body,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlates one facade request with the engine operations it queues
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn from_header(request: &Request) -> Option<RequestId> {
    let value = request.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    Uuid::parse_str(value).ok().map(RequestId)
}

/// Reuses a caller-supplied `x-request-id` when it is a UUID, otherwise
/// mints one, and echoes it on the response
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = from_header(&request).unwrap_or_else(|| RequestId(Uuid::new_v4()));
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

pub fn make_span_with_request_id(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(ToString::to_string)
        .unwrap_or_default();

    tracing::info_span!(
        "wishlist_request",
        method = %request.method(),
        path = %request.uri().path(),
        request_id = %request_id,
    )
}
