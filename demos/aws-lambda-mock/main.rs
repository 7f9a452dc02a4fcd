use lambda_http::{Body, Error, Request, Response, service_fn};
use oasmock::converter::from_http_request;
use oasmock::{ContractEngine, Operation};
use std::sync::Arc;

const OPERATIONS_FILE: &str = "demos/hyper-mock/operations.json";

#[tokio::main]
async fn main() -> Result<(), Error> {
    let operations: Vec<Operation> =
        serde_json::from_str(&std::fs::read_to_string(OPERATIONS_FILE)?)?;
    let engine = Arc::new(
        ContractEngine::builder()
            .operations(operations)
            .version("3.1.0")
            .build()?,
    );
    lambda_http::run(service_fn(|request| mock_function(engine.clone(), request))).await?;
    Ok(())
}

async fn mock_function(engine: Arc<ContractEngine>, request: Request) -> Result<Response<Body>, Error> {
    let request = from_http_request(request).await?;
    let (status, headers, body) = match engine.mock(&request) {
        Ok(outcome) => (
            outcome.response.status,
            outcome.response.headers,
            outcome.response.body.to_vec(),
        ),
        Err(err) => (
            http::StatusCode::from_u16(err.status_hint())?,
            http::HeaderMap::new(),
            err.to_string().into_bytes(),
        ),
    };
    let mut response = Response::new(Body::Binary(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}
