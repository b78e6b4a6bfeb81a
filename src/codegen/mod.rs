// protoroute codegen module

use prost::Message;
use prost_types::compiler::CodeGeneratorResponse;
use prost_types::compiler::code_generator_response::{Feature, File};
use tracing::{debug, error};

use crate::GenerateError;

pub mod annotation;
pub mod comments;
pub mod descriptor;
pub mod generator;
pub mod http;
pub mod names;
pub mod options;
pub mod routes;
pub mod schema;
pub mod service;
pub mod tags;

pub use descriptor::CodeGeneratorRequest;
pub use generator::GeneratedFile;
pub use options::Options;

use schema::{FileSchema, MessageRegistry};

/// Generate one file per schema file in `file_to_generate`, in request order.
///
/// Types are resolved against every file protoc sent, including imports. Any error aborts the
/// whole run.
pub fn generate(request: &CodeGeneratorRequest) -> Result<Vec<GeneratedFile>, GenerateError> {
    let options = Options::parse(request.parameter.as_deref())?;
    let registry = MessageRegistry::from_files(&request.proto_file);
    debug!(
        files = request.file_to_generate.len(),
        messages = registry.len(),
        ?options,
        "generating"
    );

    request
        .file_to_generate
        .iter()
        .filter_map(|name| {
            let file = request.proto_file.iter().find(|f| f.name() == name);
            if file.is_none() {
                debug!(file = %name, "file_to_generate missing from proto_file, skipped");
            }
            file
        })
        .map(|file| generator::generate_file(&FileSchema::from_descriptor(file), &registry, &options))
        .collect()
}

/// Run the generator and wrap the outcome in a response. Failures are reported through the
/// response's `error` field with no files, as protoc expects.
pub fn generate_response(request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    match generate(request) {
        Ok(files) => CodeGeneratorResponse {
            supported_features: Some(Feature::Proto3Optional as u64),
            file: files
                .into_iter()
                .map(|file| File {
                    name: Some(file.name),
                    content: Some(file.content),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        },
        Err(err) => {
            error!("{err}");
            CodeGeneratorResponse {
                error: Some(err.to_string()),
                supported_features: Some(Feature::Proto3Optional as u64),
                ..Default::default()
            }
        }
    }
}

/// Decode a serialized CodeGeneratorRequest, generate, and encode the response.
pub fn generate_from_bytes(request: &[u8]) -> Result<Vec<u8>, GenerateError> {
    let request = CodeGeneratorRequest::decode(request)?;
    Ok(generate_response(&request).encode_to_vec())
}
