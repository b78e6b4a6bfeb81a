// Drives the plugin through the encoded protoc protocol.

use prost::Message;
use prost_types::compiler::CodeGeneratorResponse;
use protoroute::codegen::generate_from_bytes;
use protoroute::test_utils::{FileBuilder, get, message, method, order_file, request, service, with_http};

fn run(req: &protoroute::codegen::CodeGeneratorRequest) -> CodeGeneratorResponse {
    let bytes = generate_from_bytes(&req.encode_to_vec()).unwrap();
    CodeGeneratorResponse::decode(bytes.as_slice()).unwrap()
}

fn normalize(source: &str) -> String {
    prettyplease::unparse(&syn::parse_file(source).unwrap())
}

#[test]
fn order_file_matches_fixture() {
    let response = run(&request(vec![order_file()], &["shop/order.proto"]));
    assert_eq!(response.error, None);
    assert_eq!(response.file.len(), 1);

    let file = &response.file[0];
    assert_eq!(file.name(), "shop/order.route.rs");
    assert!(file.content().starts_with("// Code generated by protoc-gen-protoroute "));
    assert!(file.content().contains("// source: shop/order.proto\n"));
    assert_eq!(
        normalize(file.content()),
        normalize(include_str!("fixtures/order.route.rs"))
    );
}

#[test]
fn generation_is_byte_identical() {
    let req = request(vec![order_file()], &["shop/order.proto"]);
    let first = run(&req);
    let second = run(&req);
    assert_eq!(first, second);
}

#[test]
fn one_output_per_requested_file() {
    let billing = FileBuilder::new("shop/billing.proto", "shop.v1")
        .message(message("Invoice", &[]))
        .service(service(
            "Billing",
            vec![with_http(method("Invoice", ".shop.v1.Invoice", ".shop.v1.Invoice"), get("/invoices/{id}"))],
        ))
        .build();
    let response = run(&request(
        vec![billing, order_file()],
        &["shop/order.proto", "shop/billing.proto"],
    ));
    assert_eq!(response.error, None);
    let names: Vec<_> = response.file.iter().map(|f| f.name()).collect();
    assert_eq!(names, ["shop/order.route.rs", "shop/billing.route.rs"]);
}

#[test]
fn conflicting_routes_fail_the_run() {
    let file = FileBuilder::new("dup.proto", "dup")
        .message(message("Req", &[]))
        .service(service(
            "Dup",
            vec![
                with_http(method("First", ".dup.Req", ".dup.Req"), get("/things/{id}")),
                with_http(method("Second", ".dup.Req", ".dup.Req"), get("/things/{name}")),
            ],
        ))
        .build();
    let response = run(&request(vec![order_file(), file], &["shop/order.proto", "dup.proto"]));
    assert!(response.file.is_empty());
    assert_eq!(
        response.error.as_deref(),
        Some("route conflict: dup.Dup.First and dup.Dup.Second both bind GET /things/:name")
    );
}

#[test]
fn custom_verb_paths_fail_the_run() {
    let file = FileBuilder::new("batch.proto", "batch")
        .message(message("Req", &[]))
        .service(service(
            "Orders",
            vec![
                with_http(method("BatchGet", ".batch.Req", ".batch.Req"), get("/v1/orders:batchGet")),
                with_http(method("Stats", ".batch.Req", ".batch.Req"), get("/v1/orders:stats")),
            ],
        ))
        .build();
    let response = run(&request(vec![file], &["batch.proto"]));
    assert!(response.file.is_empty());
    let error = response.error.unwrap();
    assert!(
        error.starts_with("unsupported path template \"/v1/orders:batchGet\" on batch.Orders.BatchGet"),
        "{error}"
    );
}

#[test]
fn unknown_parameter_fails_the_run() {
    let mut req = request(vec![order_file()], &["shop/order.proto"]);
    req.parameter = Some("flavour=vanilla".to_string());
    let response = run(&req);
    assert!(response.file.is_empty());
    assert_eq!(response.error.as_deref(), Some("invalid plugin parameter \"flavour=vanilla\""));
}

#[test]
fn garbage_input_is_a_decode_error() {
    assert!(generate_from_bytes(b"\x0a\xff\xff\xff").is_err());
}
