use std::sync::{Arc, Mutex};

use http::StatusCode;
use http::header::ALLOW;
use skein::builtin::RequestValidator;
use skein::{
    BoxError, Chain, ChainBuilder, Error, ErrorDetail, ErrorTranslator, Method, Request, Resource,
    Response,
};

type Log = Arc<Mutex<Vec<String>>>;

async fn hello(_req: Request) -> Result<Response, BoxError> {
    Ok(Response::text("Hello from GET."))
}

async fn created(_req: Request) -> Result<Response, BoxError> {
    Ok(Response::status(StatusCode::CREATED))
}

async fn grumble(_req: Request) -> Result<Response, BoxError> {
    Err("Hey, I'm the DELETE endpoint. Errrr.".into())
}

fn root() -> Resource {
    Resource::new(["/"]).get(hello).post(created).delete(grumble)
}

async fn send(chain: &Chain<Request, Response>, errors: &ErrorTranslator, method: &str, uri: &str) -> Response {
    let req = Request::new(method, uri).unwrap();
    match chain.handle(req).await {
        Ok(res) => res,
        Err(err) => errors.translate(err),
    }
}

#[tokio::test]
async fn get_reaches_the_resource() {
    let chain = Chain::http([root()]).unwrap();
    let res = send(&chain, &ErrorTranslator::default(), "GET", "/").await;
    assert_eq!(res.code(), StatusCode::OK);
    assert_eq!(res.body_text(), "Hello from GET.");
}

#[tokio::test]
async fn unimplemented_method_is_405() {
    let chain = Chain::http([root()]).unwrap();

    let err = chain.handle(Request::new("PATCH", "/").unwrap()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::METHOD_NOT_ALLOWED);

    let res = ErrorTranslator::default().translate(err);
    assert_eq!(res.code(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(res.body_text().contains("Method Not Allowed"));
    assert_eq!(res.header(ALLOW), Some("GET, POST, DELETE"));
}

#[tokio::test]
async fn unknown_path_is_404() {
    let chain = Chain::http([root()]).unwrap();
    let res = send(&chain, &ErrorTranslator::default(), "GET", "/test").await;
    assert_eq!(res.code(), StatusCode::NOT_FOUND);
    assert!(res.body_text().contains("Not Found"));
}

#[tokio::test]
async fn plain_errors_become_500() {
    let chain = Chain::http([root()]).unwrap();

    let exposed = send(&chain, &ErrorTranslator::new(ErrorDetail::Expose), "DELETE", "/").await;
    assert_eq!(exposed.code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(exposed.body_text(), "Hey, I'm the DELETE endpoint. Errrr.");

    let redacted = send(&chain, &ErrorTranslator::new(ErrorDetail::Redact), "DELETE", "/").await;
    assert_eq!(redacted.code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(redacted.body_text(), "Internal Server Error");
}

#[tokio::test]
async fn literal_paths_beat_parameters() {
    async fn by_id(req: Request) -> Result<String, BoxError> {
        Ok(format!("user {}", req.param("id").unwrap_or_default()))
    }
    async fn active(_req: Request) -> Result<&'static str, BoxError> {
        Ok("active users")
    }

    let chain = Chain::http([
        Resource::new(["/users/:id"]).get(by_id),
        Resource::new(["/users/active"]).get(active),
    ])
    .unwrap();
    let errors = ErrorTranslator::default();

    assert_eq!(send(&chain, &errors, "GET", "/users/active").await.body_text(), "active users");
    assert_eq!(send(&chain, &errors, "GET", "/users/42").await.body_text(), "user 42");
}

#[tokio::test]
async fn params_and_query_reach_the_request() {
    async fn search(req: Request) -> Result<String, BoxError> {
        let tags: Vec<_> = req.query_all("tag").collect();
        Ok(format!("{}:{}", req.param("rest").unwrap_or_default(), tags.join("+")))
    }

    let chain = Chain::http([Resource::new(["/files/*rest"]).get(search)]).unwrap();
    let res = send(&chain, &ErrorTranslator::default(), "GET", "/files/a/b%20c?tag=x&tag=y").await;
    assert_eq!(res.body_text(), "a/b c:x+y");
}

fn record(log: &Log, entry: &'static str) -> impl Fn(Request) -> std::future::Ready<Result<Request, Error>> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |req: Request| {
        log.lock().unwrap().push(entry.to_owned());
        std::future::ready(Ok(req))
    }
}

#[tokio::test]
async fn handlers_run_in_order_for_every_request() {
    let log: Log = Arc::default();

    let endpoint_log = Arc::clone(&log);
    let resource = Resource::new(["/"])
        .before(record(&log, "before"))
        .get(move |req: Request| {
            let log = Arc::clone(&endpoint_log);
            async move {
                log.lock().unwrap().push(format!("get {}", req.path()));
                Ok::<_, BoxError>("ok")
            }
        });

    let chain = ChainBuilder::<Request, Request>::new()
        .handler(record(&log, "first"))
        .handler(RequestValidator)
        .handler(record(&log, "second"))
        .context::<()>()
        .resources([resource])
        .build()
        .unwrap();

    for _ in 0..2 {
        chain.handle(Request::new("GET", "/").unwrap()).await.unwrap();
    }

    let expected: Vec<String> = ["first", "second", "before", "get /"]
        .repeat(2)
        .into_iter()
        .map(str::to_owned)
        .collect();
    assert_eq!(*log.lock().unwrap(), expected);
}

#[tokio::test]
async fn a_failing_handler_skips_the_rest() {
    let log: Log = Arc::default();
    let chain = ChainBuilder::<Request, Request>::new()
        .handler(|_req: Request| async { Err::<Request, _>(Error::invocation("rejected")) })
        .handler(record(&log, "unreachable"))
        .context::<()>()
        .resources([root()])
        .build()
        .unwrap();

    let err = chain.handle(Request::new("GET", "/").unwrap()).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn connect_reaches_a_root_resource() {
    async fn tunnel(req: Request) -> Result<String, BoxError> {
        Ok(format!("tunnel to {}", req.uri().authority().map_or("-", |a| a.as_str())))
    }

    let chain = Chain::http([Resource::new(["/"]).on(Method::Connect, tunnel)]).unwrap();
    let res = send(&chain, &ErrorTranslator::default(), "CONNECT", "example.com:443").await;
    assert_eq!(res.code(), StatusCode::OK);
    assert_eq!(res.body_text(), "tunnel to example.com:443");
}

#[tokio::test]
async fn concurrent_requests_share_one_chain() {
    let chain = Chain::http([root()]).unwrap();
    let errors = ErrorTranslator::default();

    let (a, b, c) = tokio::join!(
        send(&chain, &errors, "GET", "/"),
        send(&chain, &errors, "PATCH", "/"),
        send(&chain, &errors, "GET", "/missing"),
    );
    assert_eq!(a.code(), StatusCode::OK);
    assert_eq!(b.code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(c.code(), StatusCode::NOT_FOUND);
}
