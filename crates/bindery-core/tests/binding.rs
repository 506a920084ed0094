//! Binding derived request shapes against requests.

use bindery_core::{
    BindError, BindPlan, Binder, CodecError, MultipartConfig, RegistrationError, Request,
    RequestShape, UploadFile,
};
use bindery_macros::{JsonSchema, RequestShape};
use bindery_types::{Location, Method};
use serde::Deserialize;

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
struct Body {
    id: f64,
    #[schema(xml = "Title", form = "title")]
    name: String,
}

#[derive(Debug, PartialEq, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
enum Sort {
    Asc,
    Desc,
}

#[derive(Debug, RequestShape)]
struct Ids {
    #[bind("path=id")]
    id: u64,
    #[bind("query=is_admin")]
    is_admin: Option<bool>,
}

#[derive(Debug, RequestShape)]
struct CreateReq {
    ids: Ids,
    #[bind("query=filter")]
    filter: Option<String>,
    #[bind("query=sort")]
    sort: Option<Sort>,
    #[bind("query=tag")]
    tags: Vec<u32>,
    #[bind("header=Authorization;isauth;scheme=bearer")]
    token: String,
    #[bind("cookie=session")]
    session: Option<String>,
    #[bind("req=body")]
    body: Body,
}

fn bind<S: RequestShape>(request: &Request) -> Result<S, BindError> {
    let plan = BindPlan::for_shape::<S>().unwrap();
    Binder::new(&plan, request, &MultipartConfig::default()).bind::<S>()
}

fn create_request(content_type: &str, body: &str) -> Request {
    Request::new(Method::Post, "/items/123?is_admin=true&filter=test&tag=1&tag=2&sort=desc")
        .with_path_param("id", "123")
        .with_header("Authorization", "Bearer token")
        .with_header("Cookie", "session=abc; theme=dark")
        .with_body(content_type, body.as_bytes().to_vec())
}

#[test]
fn test_binds_every_location() {
    let req: CreateReq = bind(&create_request(
        "application/json",
        r#"{"id":1.5,"name":"John"}"#,
    ))
    .unwrap();

    assert_eq!(req.ids.id, 123);
    assert_eq!(req.ids.is_admin, Some(true));
    assert_eq!(req.filter.as_deref(), Some("test"));
    assert_eq!(req.sort, Some(Sort::Desc));
    assert_eq!(req.tags, vec![1, 2]);
    assert_eq!(req.token, "Bearer token");
    assert_eq!(req.session.as_deref(), Some("abc"));
    assert_eq!(
        req.body,
        Body {
            id: 1.5,
            name: "John".to_string()
        }
    );
}

#[test]
fn test_optional_fields_absent() {
    let request = Request::new(Method::Post, "/items/5")
        .with_path_param("id", "5")
        .with_header("Authorization", "Bearer t")
        .with_body("application/json", br#"{"id":1,"name":"x"}"#.to_vec());
    let req: CreateReq = bind(&request).unwrap();
    assert_eq!(req.ids.is_admin, None);
    assert_eq!(req.filter, None);
    assert_eq!(req.sort, None);
    assert!(req.tags.is_empty());
    assert_eq!(req.session, None);
}

#[test]
fn test_xml_body_uses_xml_names() {
    let req: CreateReq = bind(&create_request(
        "application/xml",
        "<body><id>123</id><Title>John</Title></body>",
    ))
    .unwrap();
    assert_eq!(req.body.name, "John");
}

#[test]
fn test_form_body_uses_form_names() {
    let req: CreateReq = bind(&create_request(
        "application/x-www-form-urlencoded",
        "id=2&title=Jane",
    ))
    .unwrap();
    assert_eq!(req.body.id, 2.0);
    assert_eq!(req.body.name, "Jane");
}

#[test]
fn test_missing_path_value() {
    let request = Request::new(Method::Get, "/items");
    let err = bind::<Ids>(&request).unwrap_err();
    let BindError::MissingRequiredField {
        field,
        location,
        key,
    } = err
    else {
        panic!("expected missing field, got {err}");
    };
    assert_eq!(field, "id");
    assert_eq!(location, Location::Path);
    assert_eq!(key, "id");
}

#[test]
fn test_nested_field_path_in_errors() {
    let request = create_request("application/json", r#"{"id":1,"name":"x"}"#)
        .with_path_param("id", "abc");
    let err = bind::<CreateReq>(&request).unwrap_err();
    let BindError::Coercion(coercion) = err else {
        panic!("expected coercion error, got {err}");
    };
    assert_eq!(coercion.field, "ids.id");
    assert_eq!(coercion.raw, "abc");
}

#[test]
fn test_binding_stops_at_first_failure() {
    // Both the path value and the body are bad; only the first is reported.
    let request = create_request("application/xml", "abc").with_path_param("id", "-1");
    let err = bind::<CreateReq>(&request).unwrap_err();
    assert!(matches!(err, BindError::Coercion(_)), "{err}");
}

#[test]
fn test_bad_xml_body() {
    let err = bind::<CreateReq>(&create_request("application/xml", "abc")).unwrap_err();
    assert!(
        matches!(err, BindError::Codec(CodecError::Decode { codec: "xml", .. })),
        "{err}"
    );
}

#[test]
fn test_unknown_enum_variant() {
    let request = create_request("application/json", r#"{"id":1,"name":"x"}"#);
    let mut request = request;
    request.set_query(Some("sort=sideways".to_string()));
    let err = bind::<CreateReq>(&request).unwrap_err();
    assert!(matches!(err, BindError::Coercion(_)), "{err}");
}

#[derive(Debug, Deserialize, JsonSchema)]
struct UploadBody {
    name: String,
    file: UploadFile,
}

#[derive(Debug, RequestShape)]
struct UploadReq {
    #[bind("req=body")]
    body: UploadBody,
}

#[test]
fn test_multipart_body() {
    let body = concat!(
        "--b\r\n",
        "Content-Disposition: form-data; name=\"name\"\r\n",
        "\r\n",
        "test\r\n",
        "--b\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n",
        "Content-Type: text/plain\r\n",
        "\r\n",
        "hello\r\n",
        "--b--\r\n",
    );
    let request = Request::new(Method::Post, "/upload")
        .with_body("multipart/form-data; boundary=b", body.as_bytes().to_vec());
    let req: UploadReq = bind(&request).unwrap();
    assert_eq!(req.body.name, "test");
    assert_eq!(req.body.file.file_name, "a.txt");
    assert_eq!(req.body.file.content, b"hello");
}

#[test]
fn test_multipart_limits_apply() {
    let body = concat!(
        "--b\r\n",
        "Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n",
        "\r\n",
        "0123456789\r\n",
        "--b--\r\n",
    );
    let request = Request::new(Method::Post, "/upload")
        .with_body("multipart/form-data; boundary=b", body.as_bytes().to_vec());
    let plan = BindPlan::for_shape::<UploadReq>().unwrap();
    let config = MultipartConfig::default().max_file_size(4);
    let err = Binder::new(&plan, &request, &config)
        .bind::<UploadReq>()
        .unwrap_err();
    assert!(
        matches!(err, BindError::Codec(CodecError::Multipart(_))),
        "{err}"
    );
}

#[derive(Debug, RequestShape)]
struct BadLocation {
    #[bind("unknown=id")]
    #[allow(dead_code)]
    id: u64,
}

#[test]
fn test_unknown_location_is_a_registration_error() {
    let err = BindPlan::for_shape::<BadLocation>().unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::UnknownParameterLocation { ref location, .. } if location == "unknown"
    ));
}

#[derive(Debug, RequestShape)]
struct Unit;

#[test]
fn test_unit_shape() {
    let request = Request::new(Method::Get, "/");
    assert!(bind::<Unit>(&request).is_ok());
}
