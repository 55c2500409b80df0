use axum::{
    body::{Body, BodyDataStream, Bytes},
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use futures::{StreamExt, stream};
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap};

use kv_session::{RequestView, SessionManager};

use super::session::Session;

// Same rule as the usual `is_json` check: application/json or application/*+json
fn is_json(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// A body yielding the frames already read, then whatever `rest` still holds.
fn replay(read: Vec<Result<Bytes, axum::Error>>, rest: BodyDataStream) -> Body {
    Body::from_stream(stream::iter(read).chain(rest))
}

/// Read a JSON body into memory so the token field can be inspected.
///
/// Returns the body to forward to the handler plus the buffered bytes when
/// the whole body fit in `limit`. Non-JSON bodies, bodies larger than
/// `limit` and bodies that fail mid-read are not inspected; the handler
/// still receives every byte (or the read error) exactly as sent.
async fn buffer_json_body(headers: &HeaderMap, body: Body, limit: usize) -> (Body, Option<Bytes>) {
    if !is_json(headers) {
        return (body, None);
    }
    if declared_length(headers).is_some_and(|len| len > limit) {
        tracing::debug!("JSON body larger than {} bytes, not inspecting it", limit);
        return (body, None);
    }

    let mut rest = body.into_data_stream();
    let mut read = Vec::new();
    let mut size = 0usize;

    while let Some(frame) = rest.next().await {
        match frame {
            Ok(chunk) => {
                size = size.saturating_add(chunk.len());
                read.push(Ok(chunk));
                if size > limit {
                    tracing::debug!("JSON body grew past {} bytes, not inspecting it", limit);
                    return (replay(read, rest), None);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to read request body, not inspecting it: {}", e);
                read.push(Err(e));
                return (replay(read, rest), None);
            }
        }
    }

    let mut bytes = Vec::with_capacity(size);
    for chunk in read.iter().flatten() {
        bytes.extend_from_slice(chunk);
    }
    let bytes = Bytes::from(bytes);
    (Body::from(bytes.clone()), Some(bytes))
}

/// Open the request's session, run the handler, then save the session.
///
/// Install with `axum::middleware::from_fn_with_state(manager, with_session)`;
/// handlers then receive the session through the [`Session`] extractor.
/// Session handling never turns a request into an error response.
pub async fn with_session(
    State(manager): State<SessionManager>,
    req: Request,
    next: Next,
) -> Response {
    let (parts, body) = req.into_parts();

    let (body, json) =
        buffer_json_body(&parts.headers, body, manager.config().max_body_bytes()).await;

    let record = {
        let mut view = RequestView::new(&parts.headers);
        if let Some(json) = json.as_deref() {
            view = view.with_body(json);
        }
        manager.open(&view).await
    };

    let session = Session::new(record);
    let mut req = Request::from_parts(parts, body);
    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    let record = session.into_record().await;
    let outcome = manager.save(record, response.headers_mut()).await;
    tracing::debug!("Session saved: {:?}", outcome);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use http::HeaderValue;

    fn with_content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_is_json_content_types() {
        assert!(is_json(&with_content_type("application/json")));
        assert!(is_json(&with_content_type("application/json; charset=utf-8")));
        assert!(is_json(&with_content_type("application/vnd.api+json")));
        assert!(is_json(&with_content_type("Application/JSON")));
    }

    #[test]
    fn test_is_json_rejects_other_types() {
        assert!(!is_json(&HeaderMap::new()));
        assert!(!is_json(&with_content_type("text/plain")));
        assert!(!is_json(&with_content_type(
            "application/x-www-form-urlencoded"
        )));
        assert!(!is_json(&with_content_type("text/json+json")));
    }

    #[tokio::test]
    async fn test_buffer_json_body_keeps_body_for_handler() {
        // Given a small JSON body
        let headers = with_content_type("application/json");
        let body = Body::from(r#"{"token":"T1"}"#);

        // When buffering it
        let (forwarded, buffered) = buffer_json_body(&headers, body, 1024).await;

        // Then the bytes are both inspected and still available downstream
        assert_eq!(buffered.as_deref(), Some(&br#"{"token":"T1"}"#[..]));
        let forwarded = to_bytes(forwarded, 1024).await.unwrap();
        assert_eq!(&forwarded[..], br#"{"token":"T1"}"#);
    }

    #[tokio::test]
    async fn test_buffer_skips_non_json_body() {
        let headers = with_content_type("text/plain");

        let (forwarded, buffered) = buffer_json_body(&headers, Body::from("token"), 1024).await;

        assert!(buffered.is_none());
        assert_eq!(&to_bytes(forwarded, 1024).await.unwrap()[..], b"token");
    }

    #[tokio::test]
    async fn test_buffer_skips_declared_oversized_body() {
        let mut headers = with_content_type("application/json");
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("4096"));

        let (forwarded, buffered) = buffer_json_body(&headers, Body::from("{}"), 16).await;

        assert!(buffered.is_none());
        assert_eq!(&to_bytes(forwarded, 1024).await.unwrap()[..], b"{}");
    }

    #[tokio::test]
    async fn test_buffer_forwards_streamed_body_over_limit_intact() {
        // Given a JSON body streamed in chunks, with no length, that outgrows the limit
        let headers = with_content_type("application/json");
        let chunks = vec![
            Ok::<_, std::io::Error>(r#"{"token":"#.to_string()),
            Ok(r#""a very long "#.to_string()),
            Ok(r#"token value"}"#.to_string()),
        ];
        let body = Body::from_stream(futures::stream::iter(chunks));

        // When buffering it with a small limit
        let (forwarded, buffered) = buffer_json_body(&headers, body, 8).await;

        // Then it is not inspected but reaches the handler in full
        assert!(buffered.is_none());
        let forwarded = to_bytes(forwarded, 1024).await.unwrap();
        assert_eq!(&forwarded[..], br#"{"token":"a very long token value"}"#);
    }

    #[tokio::test]
    async fn test_buffer_concatenates_chunks_within_limit() {
        let headers = with_content_type("application/json");
        let chunks = vec![
            Ok::<_, std::io::Error>(r#"{"tok"#.to_string()),
            Ok(r#"en":"T1"}"#.to_string()),
        ];
        let body = Body::from_stream(futures::stream::iter(chunks));

        let (forwarded, buffered) = buffer_json_body(&headers, body, 1024).await;

        assert_eq!(buffered.as_deref(), Some(&br#"{"token":"T1"}"#[..]));
        assert_eq!(&to_bytes(forwarded, 1024).await.unwrap()[..], br#"{"token":"T1"}"#);
    }

    #[tokio::test]
    async fn test_buffer_passes_read_error_to_handler() {
        // Given a body that fails after its first chunk
        let headers = with_content_type("application/json");
        let chunks = vec![
            Ok(r#"{"token""#.to_string()),
            Err(std::io::Error::other("connection reset")),
        ];
        let body = Body::from_stream(futures::stream::iter(chunks));

        // When buffering it
        let (forwarded, buffered) = buffer_json_body(&headers, body, 1024).await;

        // Then it is not inspected and the handler sees the same failure
        assert!(buffered.is_none());
        assert!(to_bytes(forwarded, 1024).await.is_err());
    }
}
