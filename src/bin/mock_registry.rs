//! Local MLflow-compatible prompt registry backed by [`InMemoryRegistry`].
//!
//! State lives in memory and is lost on exit.

use actix_web::http::StatusCode;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use clap::Parser;
use serde_json::{json, Map, Value};
use tracing::debug;

use mlflow_prompts::memory::{AliasDeletePolicy, InMemoryRegistry};
use mlflow_prompts::transport::Method;
use mlflow_prompts::{init_logging, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "mock-registry")]
#[command(about = "In-memory MLflow prompt registry for local testing")]
struct Args {
    #[arg(long, env = "MOCK_REGISTRY_PORT", default_value_t = 5000)]
    port: u16,
    #[arg(long, env = "MOCK_REGISTRY_HOST", default_value = "127.0.0.1")]
    host: String,
    /// Make model-versions/search return nothing, like a lagging search index
    #[arg(long, env = "MOCK_REGISTRY_SEARCH_LAG")]
    search_lag: bool,
    /// Refuse to delete versions that still have aliases
    #[arg(long, env = "MOCK_REGISTRY_REJECT_ALIASED_DELETE")]
    reject_aliased_delete: bool,
}

/// Collect query pairs into an object, turning repeated keys into arrays.
fn query_object(pairs: Vec<(String, String)>) -> Value {
    let mut object = Map::new();
    for (key, value) in pairs {
        match object.get_mut(&key) {
            None => {
                object.insert(key, Value::String(value));
            }
            Some(Value::Array(items)) => items.push(Value::String(value)),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, Value::String(value)]);
            }
        }
    }
    Value::Object(object)
}

fn error_response(status: u16, code: &str, message: &str) -> HttpResponse {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    HttpResponse::build(status).json(json!({
        "error_code": code,
        "message": message,
    }))
}

async fn dispatch(
    req: HttpRequest,
    body: web::Bytes,
    registry: web::Data<InMemoryRegistry>,
) -> HttpResponse {
    let method = match req.method().as_str() {
        "GET" => Method::Get,
        "POST" => Method::Post,
        "DELETE" => Method::Delete,
        other => {
            return error_response(
                405,
                "ENDPOINT_NOT_FOUND",
                &format!("method {} is not supported", other),
            )
        }
    };

    let payload = if method == Method::Get {
        match web::Query::<Vec<(String, String)>>::from_query(req.query_string()) {
            Ok(pairs) => query_object(pairs.into_inner()),
            Err(e) => return error_response(400, "INVALID_PARAMETER_VALUE", &e.to_string()),
        }
    } else if body.is_empty() {
        Value::Object(Map::new())
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return error_response(
                    400,
                    "MALFORMED_REQUEST",
                    &format!("request body is not JSON: {}", e),
                )
            }
        }
    };

    let result = registry.handle(method, req.path(), &payload);
    debug!(method = %method, path = req.path(), ok = result.is_ok(), "Handled request");

    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(err) => error_response(
            err.status,
            err.code().unwrap_or_default(),
            &err.message,
        ),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    if LogConfig::requested() {
        if let Err(e) = init_logging(LogConfig::from_env()) {
            eprintln!("warning: {:#}", e);
        }
    }

    let policy = if args.reject_aliased_delete {
        AliasDeletePolicy::Reject
    } else {
        AliasDeletePolicy::Detach
    };
    let registry = InMemoryRegistry::new()
        .with_search_lag(args.search_lag)
        .with_alias_delete_policy(policy);

    println!("Mock MLflow registry on http://{}:{}", args.host, args.port);
    println!("Try:");
    println!(
        "  MLFLOW_TRACKING_URI=http://{}:{} MLFLOW_INSECURE_SKIP_TLS_VERIFY=true promptctl list",
        args.host, args.port
    );

    let data = web::Data::new(registry);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(web::PayloadConfig::new(16 * 1024 * 1024))
            .route(
                "/health",
                web::get().to(|| async { HttpResponse::Ok().body("OK") }),
            )
            .default_service(web::to(dispatch))
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await
}
