//! A small skein service: a few resources and env-driven config.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/
//!   curl http://localhost:3000/users/42?fields=name
//!   curl http://localhost:3000/users/active
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl -X PATCH http://localhost:3000/
//!   curl -X DELETE http://localhost:3000/

use http::StatusCode;
use skein::{BoxError, Chain, Config, HttpError, Request, Resource, Response, Server};

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;

    let chain = Chain::http([
        Resource::new(["/"]).get(hello).post(hello).delete(grumble),
        Resource::new(["/users/:id"]).get(get_user),
        Resource::new(["/users/active"]).get(active_users),
        Resource::new(["/users"]).post(create_user),
    ])?;

    Server::from_config(&config).serve(chain).await?;
    Ok(())
}

async fn hello(req: Request) -> Result<String, BoxError> {
    Ok(format!("Hello from {}.", req.method()))
}

// Plain errors surface as 500; SKEIN_EXPOSE_ERRORS=false hides the message.
async fn grumble(_req: Request) -> Result<Response, BoxError> {
    Err("Hey, I'm the DELETE endpoint. Errrr.".into())
}

async fn get_user(req: Request) -> Result<Response, BoxError> {
    let id = req.param("id").unwrap_or("unknown");
    let fields = req.query("fields").unwrap_or("*");
    Ok(Response::json(format!(r#"{{"id":"{id}","fields":"{fields}"}}"#)))
}

// Literal segments win over `:id`, regardless of registration order.
async fn active_users(_req: Request) -> Result<Response, BoxError> {
    Ok(Response::json(r#"[{"id":"1"},{"id":"7"}]"#))
}

async fn create_user(req: Request) -> Result<Response, HttpError> {
    if req.body().is_empty() {
        return Err(HttpError::new(StatusCode::BAD_REQUEST).with_message("empty body"));
    }
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header(http::header::LOCATION, "/users/99")
        .json(r#"{"id":"99"}"#))
}
