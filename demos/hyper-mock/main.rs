use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oasmock::converter::{from_http_request, into_http_response};
use oasmock::{ContractEngine, Operation};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use tokio::net::TcpListener;

const OPERATIONS_FILE: &str = "demos/hyper-mock/operations.json";

fn problem(status: StatusCode, detail: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({"status": status.as_u16(), "detail": detail});
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/problem+json"),
    );
    response
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));

    let operations: Vec<Operation> =
        serde_json::from_str(&std::fs::read_to_string(OPERATIONS_FILE)?)?;
    let engine = ContractEngine::builder()
        .operations(operations)
        .version("3.1.0")
        .validate_mocked_response(true)
        .build()?;
    let service = MockService {
        engine: Arc::new(engine),
    };

    let listener = TcpListener::bind(addr).await?;
    println!("Mocking {} on http://{}", OPERATIONS_FILE, addr);
    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);

        let service = service.clone();
        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                println!("Error serving connection: {:?}", err);
            }
        });
    }
}

#[derive(Clone)]
pub struct MockService {
    pub engine: Arc<ContractEngine>,
}

impl Service<Request<Incoming>> for MockService {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let engine = Arc::clone(&self.engine);
        Box::pin(async move {
            let request = match from_http_request(req).await {
                Ok(request) => request,
                Err(err) => return Ok(problem(StatusCode::BAD_REQUEST, &err.to_string())),
            };
            match engine.mock(&request) {
                Ok(outcome) => {
                    for diagnostic in outcome
                        .request_diagnostics
                        .iter()
                        .chain(&outcome.response_diagnostics)
                    {
                        println!("{} {}: {}", request.method, request.path, diagnostic);
                    }
                    Ok(into_http_response(outcome.response))
                }
                Err(err) => {
                    let status = StatusCode::from_u16(err.status_hint())
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                    Ok(problem(status, &err.to_string()))
                }
            }
        })
    }
}
