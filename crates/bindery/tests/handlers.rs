//! Dispatching requests through registered handlers.

use bindery::prelude::*;
use bindery::{GenericError, Service};
use futures_executor::block_on;

fn serve(app: App, request: Request) -> bindery::Response {
    let service = app.build().unwrap();
    block_on(service.call(request))
}

#[derive(Debug, RequestShape)]
struct IdPath {
    #[bind("path=id")]
    id: u64,
}

#[derive(Debug, RequestShape)]
struct IdQuery {
    #[bind("query=id")]
    id: u64,
}

#[derive(Debug, RequestShape)]
struct IdHeader {
    #[bind("header=id")]
    id: u64,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct Hello {
    id: u64,
    message: String,
}

#[derive(Debug, Serialize, JsonSchema)]
#[allow(non_camel_case_types)]
struct responseApplicationXML {
    id: u64,
    message: String,
}

async fn hello_path(ctx: RequestContext<IdPath>) -> Result<Hello, Error> {
    let req = ctx.requests()?;
    Ok(Hello {
        id: req.id,
        message: "Hello World".to_string(),
    })
}

async fn hello_query(ctx: RequestContext<IdQuery>) -> Result<Hello, Error> {
    let req = ctx.requests()?;
    Ok(Hello {
        id: req.id,
        message: "Hello World".to_string(),
    })
}

async fn hello_header(ctx: RequestContext<IdHeader>) -> Result<Hello, Error> {
    let req = ctx.requests()?;
    Ok(Hello {
        id: req.id,
        message: "Hello World".to_string(),
    })
}

async fn hello_xml(ctx: RequestContext<IdPath>) -> Result<responseApplicationXML, Error> {
    let req = ctx.requests()?;
    ctx.set_content_type("application/xml");
    Ok(responseApplicationXML {
        id: req.id,
        message: "Hello World".to_string(),
    })
}

async fn always_fails(_ctx: RequestContext<IdPath>) -> Result<Hello, Error> {
    Err(Error::other("assert.AnError general error for testing"))
}

async fn nonzero(ctx: RequestContext<IdPath>) -> Result<(), Error> {
    let req = ctx.requests()?;
    if req.id == 0 {
        return Err(HttpError::bad_request("ID is required").into());
    }
    Ok(())
}

async fn nothing(_ctx: RequestContext<()>) -> Result<(), Error> {
    Ok(())
}

#[test]
fn test_path_binding_json_response() {
    let mut app = App::new();
    app.get("/foo/:id", hello_path);
    let response = serve(app, Request::new(Method::Get, "/foo/123"));

    assert_eq!(response.status(), 200);
    assert_eq!(response.content_type(), Some("application/json"));
    let body: serde_json::Value = response.json().unwrap();
    assert_eq!(body, serde_json::json!({"id": 123, "message": "Hello World"}));
}

#[test]
fn test_handler_sets_xml_content_type() {
    let mut app = App::new();
    app.get("/foo/:id", hello_xml);
    let response = serve(
        app,
        Request::new(Method::Get, "/foo/123").with_header("Content-Type", "application/xml"),
    );

    assert_eq!(response.status(), 200);
    assert_eq!(response.content_type(), Some("application/xml"));
    assert_eq!(
        response.text(),
        "<responseApplicationXML><id>123</id><message>Hello World</message></responseApplicationXML>"
    );
}

#[test]
fn test_handler_error_is_500() {
    let mut app = App::new();
    app.get("/foo/:id", always_fails);
    let response = serve(app, Request::new(Method::Get, "/foo/123"));

    assert_eq!(response.status(), 500);
    let body: GenericError = response.json().unwrap();
    assert_eq!(body.status, 500);
    assert!(!body.id.is_empty());
}

#[test]
fn test_path_coercion_failure_is_500() {
    let mut app = App::new();
    app.get("/foo/:id", nonzero);
    let response = serve(app, Request::new(Method::Get, "/foo/abc"));
    assert_eq!(response.status(), 500);
    let body: GenericError = response.json().unwrap();
    assert!(body.message.contains("abc"), "{}", body.message);
}

#[test]
fn test_query_binding() {
    let mut app = App::new();
    app.get("/foo", hello_query);
    let response = serve(app, Request::new(Method::Get, "/foo?id=123"));
    assert_eq!(response.status(), 200);
    let body: Hello = response.json().unwrap();
    assert_eq!(body.id, 123);
}

#[test]
fn test_missing_query_is_500() {
    let mut app = App::new();
    app.get("/foo", hello_query);
    let response = serve(app, Request::new(Method::Get, "/foo"));
    assert_eq!(response.status(), 500);
}

#[test]
fn test_header_binding() {
    let mut app = App::new();
    app.get("/foo", hello_header);
    let response = serve(app, Request::new(Method::Get, "/foo").with_header("id", "123"));
    assert_eq!(response.status(), 200);
    let body: Hello = response.json().unwrap();
    assert_eq!(body.id, 123);

    let mut app = App::new();
    app.get("/foo", hello_header);
    let response = serve(app, Request::new(Method::Get, "/foo").with_header("id", "abc"));
    assert_eq!(response.status(), 500);
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ReqBody {
    id: f64,
}

#[derive(Debug, RequestShape)]
struct BodyRequest {
    #[bind("req=body")]
    body: ReqBody,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
struct BodyResponse {
    id: f64,
    message: String,
}

async fn echo_body(ctx: RequestContext<BodyRequest>) -> Result<BodyResponse, Error> {
    let req = ctx.requests()?;
    Ok(BodyResponse {
        id: req.body.id,
        message: "Hello World".to_string(),
    })
}

fn post_body(method: Method, content_type: &str, body: &str) -> bindery::Response {
    let mut app = App::new();
    app.route(method, "/foo", echo_body);
    serve(
        app,
        Request::new(method, "/foo").with_body(content_type, body.as_bytes().to_vec()),
    )
}

#[test]
fn test_json_body_post_is_201() {
    let response = post_body(Method::Post, "application/json", r#"{"id":123}"#);
    assert_eq!(response.status(), 201);
    let body: BodyResponse = response.json().unwrap();
    assert!((body.id - 123.0).abs() < f64::EPSILON);
    assert_eq!(body.message, "Hello World");
}

#[test]
fn test_xml_body_post() {
    let response = post_body(Method::Post, "application/xml", "<request><id>123</id></request>");
    assert_eq!(response.status(), 201);
    let body: BodyResponse = response.json().unwrap();
    assert!((body.id - 123.0).abs() < f64::EPSILON);
}

#[test]
fn test_bad_bodies_are_500() {
    for (content_type, body) in [
        ("application/json", r#"{"id":"abc"}"#),
        ("application/xml", "<request><id>abc</id></request>"),
        ("application/xml", "<request><id>abc</id>"),
    ] {
        let response = post_body(Method::Post, content_type, body);
        assert_eq!(response.status(), 500, "{content_type}: {body}");
    }
}

#[test]
fn test_put_is_200() {
    let response = post_body(Method::Put, "application/json", r#"{"id":123}"#);
    assert_eq!(response.status(), 200);
}

#[test]
fn test_delete_is_204_without_body() {
    let mut app = App::new();
    app.delete("/foo/:id", nonzero);
    let response = serve(app, Request::new(Method::Delete, "/foo/123"));
    assert_eq!(response.status(), 204);
    assert!(response.body_bytes().is_empty());
}

#[test]
fn test_patch_domain_error() {
    let mut app = App::new();
    app.patch("/foo/:id", nonzero);
    let service = app.build().unwrap();

    let ok = block_on(service.call(Request::new(Method::Patch, "/foo/123")));
    assert_eq!(ok.status(), 200);

    let bad = block_on(service.call(Request::new(Method::Patch, "/foo/0")));
    assert_eq!(bad.status(), 400);
    let body: GenericError = bad.json().unwrap();
    assert_eq!(body.message, "ID is required");
    assert_eq!(body.status, 400);
}

#[test]
fn test_methods_without_request_shape() {
    for method in [Method::Head, Method::Options, Method::Trace, Method::Connect] {
        let mut app = App::new();
        app.route(method, "/foo/", nothing);
        let response = serve(app, Request::new(method, "/foo"));
        assert_eq!(response.status(), 200, "{method}");
    }
}

#[test]
fn test_handler_status_override() {
    async fn accepted(ctx: RequestContext<()>) -> Result<Hello, Error> {
        ctx.status(202);
        Ok(Hello {
            id: 1,
            message: "queued".to_string(),
        })
    }

    let mut app = App::new();
    app.post("/jobs", accepted);
    let service = app.build().unwrap();
    let response = block_on(service.call(Request::new(Method::Post, "/jobs")));
    assert_eq!(response.status(), 202);

    let op = service.document().operation("/jobs", Method::Post).unwrap();
    assert!(op.responses.contains_key("201"));
    assert!(!op.responses.contains_key("202"));
}

#[test]
fn test_unknown_route_is_404() {
    let mut app = App::new();
    app.get("/foo/:id", hello_path);
    let service = app.build().unwrap();

    let response = block_on(service.call(Request::new(Method::Get, "/bar")));
    assert_eq!(response.status(), 404);
    let body: GenericError = response.json().unwrap();
    assert_eq!(body.status, 404);

    let wrong_method = block_on(service.call(Request::new(Method::Post, "/foo/1")));
    assert_eq!(wrong_method.status(), 404);
}

#[test]
fn test_xml_route_errors_are_xml() {
    let mut app = App::new();
    app.get("/foo/:id", always_fails)
        .response_content_type("application/xml");
    let response = serve(app, Request::new(Method::Get, "/foo/1"));
    assert_eq!(response.status(), 500);
    assert_eq!(response.content_type(), Some("application/xml"));
    assert!(response.text().starts_with("<httpGenericError>"));
}

#[test]
fn test_closure_handlers() {
    let mut app = App::new();
    app.get("/ping", |_ctx: RequestContext<()>| async {
        Ok::<_, Error>("pong".to_string())
    });
    let response = serve(app, Request::new(Method::Get, "/ping"));
    assert_eq!(response.status(), 200);
    assert_eq!(response.text(), "\"pong\"");
}

#[test]
fn test_service_is_shareable() {
    fn assert_send_sync<T: Send + Sync + Clone>() {}
    assert_send_sync::<Service>();
    assert!(IdPath::fields().len() == 1);
}
