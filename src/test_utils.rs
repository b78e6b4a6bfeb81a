//! Test utilities for protoroute - builders for plugin requests, usable by downstream crates
//! that want to drive the generator without running protoc.

use crate::codegen::descriptor::{
    CodeGeneratorRequest, DescriptorProto, FieldDescriptorProto, FieldOptions,
    FileDescriptorProto, HttpRule, Location, MethodDescriptorProto, MethodOptions,
    ServiceDescriptorProto, SourceCodeInfo, http_rule::Pattern,
};

pub fn field(name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        options: None,
    }
}

/// A field carrying `(gogoproto.moretags)`, e.g. `header:"x-trace-id"`.
pub fn tagged_field(name: &str, moretags: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_string()),
        options: Some(FieldOptions {
            moretags: Some(moretags.to_string()),
        }),
    }
}

pub fn message(name: &str, fields: &[FieldDescriptorProto]) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_string()),
        field: fields.to_vec(),
        nested_type: Vec::new(),
    }
}

pub fn method(name: &str, input_type: &str, output_type: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_string()),
        input_type: Some(input_type.to_string()),
        output_type: Some(output_type.to_string()),
        options: None,
        client_streaming: None,
        server_streaming: None,
    }
}

/// Attach a `google.api.http` rule, e.g. `with_http(m, Pattern::Get("/orders/{id}".into()))`.
pub fn with_http(mut method: MethodDescriptorProto, pattern: Pattern) -> MethodDescriptorProto {
    method.options = Some(MethodOptions {
        http: Some(HttpRule {
            pattern: Some(pattern),
            ..Default::default()
        }),
    });
    method
}

pub fn get(path: &str) -> Pattern {
    Pattern::Get(path.to_string())
}

pub fn post(path: &str) -> Pattern {
    Pattern::Post(path.to_string())
}

pub fn service(name: &str, methods: Vec<MethodDescriptorProto>) -> ServiceDescriptorProto {
    ServiceDescriptorProto {
        name: Some(name.to_string()),
        method: methods,
    }
}

/// Builds a FileDescriptorProto, recording leading comments the way protoc lays them out
/// in SourceCodeInfo.
pub struct FileBuilder {
    file: FileDescriptorProto,
    locations: Vec<Location>,
}

impl FileBuilder {
    pub fn new(name: &str, package: &str) -> Self {
        Self {
            file: FileDescriptorProto {
                name: Some(name.to_string()),
                package: (!package.is_empty()).then(|| package.to_string()),
                ..Default::default()
            },
            locations: Vec::new(),
        }
    }

    pub fn message(mut self, message: DescriptorProto) -> Self {
        self.file.message_type.push(message);
        self
    }

    pub fn service(mut self, service: ServiceDescriptorProto) -> Self {
        self.file.service.push(service);
        self
    }

    /// Leading comment for the `method`-th method of the `service`-th service.
    pub fn method_comment(mut self, service: i32, method: i32, comment: &str) -> Self {
        self.locations.push(comment_location(vec![6, service, 2, method], comment));
        self
    }

    /// Leading comment of the `syntax` statement, which describes the file.
    pub fn syntax_comment(mut self, comment: &str) -> Self {
        self.locations.push(comment_location(vec![12], comment));
        self
    }

    pub fn service_comment(mut self, service: i32, comment: &str) -> Self {
        self.locations.push(comment_location(vec![6, service], comment));
        self
    }

    /// Leading comment for the `field`-th field of the `message`-th top-level message.
    pub fn field_comment(mut self, message: i32, field: i32, comment: &str) -> Self {
        self.locations.push(comment_location(vec![4, message, 2, field], comment));
        self
    }

    pub fn build(mut self) -> FileDescriptorProto {
        if !self.locations.is_empty() {
            self.file.source_code_info = Some(SourceCodeInfo {
                location: self.locations,
            });
        }
        self.file
    }
}

fn comment_location(path: Vec<i32>, comment: &str) -> Location {
    // protoc keeps the space after `//` and a trailing newline per line
    let leading = comment
        .lines()
        .map(|line| format!(" {line}\n"))
        .collect::<String>();
    Location {
        path,
        leading_comments: Some(leading),
        trailing_comments: None,
    }
}

pub fn request(files: Vec<FileDescriptorProto>, generate: &[&str]) -> CodeGeneratorRequest {
    CodeGeneratorRequest {
        file_to_generate: generate.iter().map(|s| s.to_string()).collect(),
        parameter: None,
        proto_file: files,
    }
}

/// The `Order` service used throughout the tests: `Get`, `Create` with middleware `b,a`,
/// and a dynamic `Cancel`.
pub fn order_file() -> FileDescriptorProto {
    FileBuilder::new("shop/order.proto", "shop.v1")
        .message(message("GetOrderRequest", &[field("id")]))
        .message(message("CreateOrderRequest", &[field("sku"), field("count")]))
        .message(message("CancelOrderRequest", &[field("id")]))
        .message(message("OrderReply", &[field("id"), field("state")]))
        .service(service(
            "Order",
            vec![
                with_http(
                    method("Get", ".shop.v1.GetOrderRequest", ".shop.v1.OrderReply"),
                    get("/orders/{id}"),
                ),
                with_http(
                    method("Create", ".shop.v1.CreateOrderRequest", ".shop.v1.OrderReply"),
                    post("/orders"),
                ),
                method("Cancel", ".shop.v1.CancelOrderRequest", ".shop.v1.OrderReply"),
            ],
        ))
        .service_comment(0, "Order manages orders.")
        .method_comment(0, 0, "Get fetches an order.")
        .method_comment(0, 1, "Create places an order.\n`midware:\"b,a\"`")
        .method_comment(0, 2, "`dynamic:\"true\"`")
        .build()
}
