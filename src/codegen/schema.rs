// Resolved view of the request: services and methods of the files to generate, and a
// registry of every message protoc handed us.

use std::collections::HashMap;

use super::comments::{extract_comments, file_comment};
use super::descriptor::{DescriptorProto, FileDescriptorProto, HttpRule};
use super::tags::Tags;

#[derive(Debug, Clone)]
pub struct FileSchema {
    /// Schema file name as given by protoc, e.g. `shop/order.proto`.
    pub name: String,
    pub package: String,
    /// Leading comment of the file's `syntax` or `package` statement.
    pub comment: String,
    pub services: Vec<ServiceSchema>,
}

#[derive(Debug, Clone)]
pub struct ServiceSchema {
    pub name: String,
    /// `package.Service`
    pub full_name: String,
    pub comment: String,
    pub methods: Vec<MethodSchema>,
}

#[derive(Debug, Clone)]
pub struct MethodSchema {
    pub name: String,
    /// `package.Service.Method`, used in diagnostics.
    pub full_name: String,
    /// Fully qualified, with protoc's leading dot.
    pub input_type: String,
    pub output_type: String,
    pub comment: String,
    pub http: Option<HttpRule>,
    pub client_streaming: bool,
    pub server_streaming: bool,
}

impl FileSchema {
    pub fn from_descriptor(file: &FileDescriptorProto) -> Self {
        let comments = extract_comments(file);
        let package = file.package().to_string();
        let comment = |key: &str| comments.get(key).cloned().unwrap_or_default();

        let services = file
            .service
            .iter()
            .map(|service| {
                let full_name = qualify(&package, service.name());
                let methods = service
                    .method
                    .iter()
                    .map(|method| MethodSchema {
                        name: method.name().to_string(),
                        full_name: format!("{}.{}", full_name, method.name()),
                        input_type: method.input_type().to_string(),
                        output_type: method.output_type().to_string(),
                        comment: comment(&format!("{}.{}", service.name(), method.name())),
                        http: method.options.as_ref().and_then(|o| o.http.clone()),
                        client_streaming: method.client_streaming(),
                        server_streaming: method.server_streaming(),
                    })
                    .collect();
                ServiceSchema {
                    name: service.name().to_string(),
                    full_name,
                    comment: comment(service.name()),
                    methods,
                }
            })
            .collect();

        FileSchema {
            name: file.name().to_string(),
            package,
            comment: file_comment(file),
            services,
        }
    }
}

/// Tags of one message field relevant to request binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldTags {
    pub name: String,
    /// `header:"x-name"`: bound from this request header.
    pub header: Option<String>,
    /// `request:"attr"`: bound from a request attribute (method, path, ...).
    pub request: Option<String>,
}

impl FieldTags {
    pub fn is_request_bound(&self) -> bool {
        self.header.is_some() || self.request.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct MessageInfo {
    pub package: String,
    /// Message names from the outermost parent down to this message.
    pub path: Vec<String>,
    pub fields: Vec<FieldTags>,
}

/// Every message of the request keyed by fully qualified name (no leading dot).
#[derive(Debug, Default)]
pub struct MessageRegistry {
    messages: HashMap<String, MessageInfo>,
}

impl MessageRegistry {
    pub fn from_files(files: &[FileDescriptorProto]) -> Self {
        let mut registry = MessageRegistry::default();
        for file in files {
            let comments = extract_comments(file);
            for message in &file.message_type {
                registry.add_message(file.package(), &[], message, &comments);
            }
        }
        registry
    }

    fn add_message(
        &mut self,
        package: &str,
        parents: &[String],
        message: &DescriptorProto,
        comments: &HashMap<String, String>,
    ) {
        let mut path = parents.to_vec();
        path.push(message.name().to_string());
        let dotted = path.join(".");

        let fields = message
            .field
            .iter()
            .map(|field| {
                let mut tags = Tags::default();
                if let Some(more) = field.options.as_ref().and_then(|o| o.moretags.as_deref()) {
                    tags = Tags::parse(more);
                }
                let comment_tags = comments
                    .get(&format!("{}.{}", dotted, field.name()))
                    .map(|c| Tags::from_comment(c))
                    .unwrap_or_default();
                let lookup = |key: &str| {
                    tags.get(key)
                        .or_else(|| comment_tags.get(key))
                        .map(str::to_string)
                };
                FieldTags {
                    name: field.name().to_string(),
                    header: lookup("header"),
                    request: lookup("request"),
                }
            })
            .collect();

        for nested in &message.nested_type {
            self.add_message(package, &path, nested, comments);
        }

        self.messages.insert(
            qualify(package, &dotted),
            MessageInfo {
                package: package.to_string(),
                path,
                fields,
            },
        );
    }

    /// Look up a type reference such as `.shop.v1.Order`.
    pub fn get(&self, type_name: &str) -> Option<&MessageInfo> {
        self.messages.get(type_name.trim_start_matches('.'))
    }

    /// Whether any field of the message carries a `header` or `request` tag.
    pub fn has_header_tag(&self, type_name: &str) -> bool {
        self.get(type_name)
            .is_some_and(|message| message.fields.iter().any(FieldTags::is_request_bound))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn qualify(package: &str, name: &str) -> String {
    if package.is_empty() {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{FileBuilder, field, message, order_file, tagged_field};

    #[test]
    fn test_file_schema_keeps_declaration_order() {
        let schema = FileSchema::from_descriptor(&order_file());
        assert_eq!(schema.package, "shop.v1");
        let service = &schema.services[0];
        assert_eq!(service.full_name, "shop.v1.Order");
        assert_eq!(service.comment, "Order manages orders.");
        let names: Vec<_> = service.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Get", "Create", "Cancel"]);
        assert_eq!(service.methods[1].full_name, "shop.v1.Order.Create");
        assert_eq!(service.methods[1].comment, "Create places an order.\n`midware:\"b,a\"`");
        assert!(service.methods[0].http.is_some());
        assert!(service.methods[2].http.is_none());
    }

    #[test]
    fn test_registry_nested_messages() {
        let mut outer = message("Outer", &[field("id")]);
        outer.nested_type.push(message("Inner", &[field("x")]));
        let file = FileBuilder::new("a.proto", "pkg").message(outer).build();
        let registry = MessageRegistry::from_files(&[file]);

        assert_eq!(registry.len(), 2);
        let inner = registry.get(".pkg.Outer.Inner").unwrap();
        assert_eq!(inner.path, ["Outer", "Inner"]);
        assert_eq!(inner.package, "pkg");
        assert!(registry.get(".pkg.Missing").is_none());
    }

    #[test]
    fn test_header_tag_detection() {
        let file = FileBuilder::new("a.proto", "")
            .message(message("Plain", &[field("id"), tagged_field("name", r#"json:"name""#)]))
            .message(message("WithHeader", &[field("id"), tagged_field("trace", r#"header:"x-trace-id""#)]))
            .message(message("WithRequest", &[tagged_field("ip", r#"request:"remote_addr""#)]))
            .message(message("ByComment", &[field("id"), field("token")]))
            .field_comment(3, 1, "Auth token.\n`header:\"authorization\"`")
            .build();
        let registry = MessageRegistry::from_files(&[file]);

        assert!(!registry.has_header_tag(".Plain"));
        assert!(registry.has_header_tag(".WithHeader"));
        assert!(registry.has_header_tag(".WithRequest"));
        assert!(registry.has_header_tag(".ByComment"));
        assert!(!registry.has_header_tag(".Unknown"));

        let fields = &registry.get(".WithHeader").unwrap().fields;
        assert_eq!(fields[1].header.as_deref(), Some("x-trace-id"));
        let fields = &registry.get(".ByComment").unwrap().fields;
        assert_eq!(fields[1].header.as_deref(), Some("authorization"));
    }
}
