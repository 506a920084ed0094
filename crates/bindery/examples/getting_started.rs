//! Registers a few routes, serves one request and prints the document.
//!
//! ```text
//! RUST_LOG=bindery=debug cargo run -p bindery --example getting_started
//! ```

use bindery::prelude::*;
use futures_executor::block_on;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct Body {
    first_name: String,
    last_name: String,
}

#[derive(Debug, RequestShape)]
struct CreateReq {
    #[bind("path=id")]
    id: u64,
    #[bind("query=is_admin")]
    is_admin: Option<bool>,
    #[bind("header=Authorization;isauth;scheme=bearer")]
    token: Option<String>,
    #[bind("req=body")]
    body: Body,
}

#[derive(Debug, RequestShape)]
struct NameReq {
    #[bind("path=name")]
    name: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct Ret {
    message: String,
    embed: Option<Body>,
}

async fn hello(ctx: RequestContext<NameReq>) -> Result<Ret, Error> {
    let req = ctx.requests()?;
    Ok(Ret {
        message: format!("Hello {}", req.name),
        embed: None,
    })
}

async fn create(ctx: RequestContext<CreateReq>) -> Result<Ret, Error> {
    let req = ctx.requests()?;
    if req.token.is_none() {
        return Err(HttpError::unauthorized("missing token").into());
    }
    let role = if req.is_admin.unwrap_or(false) { "admin" } else { "user" };
    Ok(Ret {
        message: format!("created {} ({role})", req.id),
        embed: Some(req.body),
    })
}

async fn list(_ctx: RequestContext<()>) -> Result<Vec<Ret>, Error> {
    Ok(vec![Ret {
        message: "Hello World".to_string(),
        embed: None,
    }])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut app = App::new();
    app.add_server("http://localhost:6000", "example server");
    app.get("/example/:name", hello);
    app.post("/example/:id", create)
        .operation_id("createExample")
        .description("Create example")
        .tags(["example"]);
    app.get("/example", list);
    let service = app.build()?;

    let request = Request::new(Method::Post, "/example/42?is_admin=true")
        .with_header("Authorization", "Bearer secret")
        .with_body(
            "application/json",
            br#"{"first_name":"John","last_name":"Doe"}"#.to_vec(),
        );
    let response = block_on(service.call(request));
    println!("{} {}", response.status(), response.text());

    println!("{}", service.openapi_yaml()?);
    Ok(())
}
