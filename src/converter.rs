//! Adapters between `http` types and the engine's normalized exchange types.

use crate::types::{HttpRequest, HttpResponse, QueryParams};
use bytes::Bytes;
use http_body_util::Full;

/// A request body that can be drained into memory.
pub trait RequestBody: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    fn into_bytes(self) -> impl Future<Output = Result<Bytes, Self::Error>> + Send;
}

impl RequestBody for String {
    type Error = std::convert::Infallible;

    async fn into_bytes(self) -> Result<Bytes, Self::Error> {
        Ok(Bytes::from(self))
    }
}

impl RequestBody for Bytes {
    type Error = std::convert::Infallible;

    async fn into_bytes(self) -> Result<Bytes, Self::Error> {
        Ok(self)
    }
}

impl RequestBody for () {
    type Error = std::convert::Infallible;

    async fn into_bytes(self) -> Result<Bytes, Self::Error> {
        Ok(Bytes::new())
    }
}

/// Normalizes an `http::Request`, reading its whole body.
pub async fn from_http_request<B>(request: http::Request<B>) -> Result<HttpRequest, B::Error>
where
    B: RequestBody,
{
    let (parts, body) = request.into_parts();
    let body = body.into_bytes().await?;
    Ok(HttpRequest {
        method: parts.method,
        path: parts.uri.path().to_string(),
        query: parts
            .uri
            .query()
            .map(QueryParams::parse)
            .unwrap_or_default(),
        headers: parts.headers,
        body: if body.is_empty() { None } else { Some(body) },
    })
}

pub fn into_http_response(response: HttpResponse) -> http::Response<Full<Bytes>> {
    let mut converted = http::Response::new(Full::new(response.body));
    *converted.status_mut() = response.status;
    *converted.headers_mut() = response.headers;
    converted
}

#[cfg(feature = "hyper")]
pub mod hyper {
    use crate::converter::RequestBody;
    use bytes::Bytes;
    use http_body_util::BodyExt;

    impl RequestBody for hyper::body::Incoming {
        type Error = hyper::Error;

        async fn into_bytes(self) -> Result<Bytes, Self::Error> {
            Ok(self.collect().await?.to_bytes())
        }
    }
}

#[cfg(feature = "lambda_http")]
pub mod lambda_http {
    use crate::converter::RequestBody;
    use bytes::Bytes;
    use lambda_http::Body;

    impl RequestBody for Body {
        type Error = std::convert::Infallible;

        async fn into_bytes(self) -> Result<Bytes, Self::Error> {
            let raw: &[u8] = self.as_ref();
            Ok(Bytes::copy_from_slice(raw))
        }
    }
}
