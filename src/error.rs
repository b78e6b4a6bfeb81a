use thiserror::Error;

/// Reasons a generation run fails. Any of these aborts the whole response; protoc reports
/// the message and no file is written.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Two methods resolve to the same route.
    #[error("route conflict: {first} and {second} both bind {verb} {path}")]
    AnnotationConflict {
        verb: String,
        path: String,
        first: String,
        second: String,
    },

    /// A method's input or output type is not a message known to the request.
    #[error("cannot resolve type {type_name} used by {method}")]
    UnresolvableType { type_name: String, method: String },

    #[error("unsupported HTTP verb {verb:?} on {method}")]
    UnsupportedVerb { verb: String, method: String },

    #[error("unsupported path template {path:?} on {method}: {reason}")]
    UnsupportedPath {
        path: String,
        method: String,
        reason: &'static str,
    },

    /// A `midware` token is not usable as a parameter name.
    #[error("invalid middleware name {name:?} on {method}")]
    InvalidMiddleware { name: String, method: String },

    /// Two generated items of one file would share a name.
    #[error("generated identifier {ident} is produced by both {first} and {second}")]
    IdentifierCollision {
        ident: String,
        first: String,
        second: String,
    },

    #[error("invalid plugin parameter {0:?}")]
    InvalidParameter(String),

    #[error("failed to decode CodeGeneratorRequest: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The emitted tokens are not valid Rust. Always a bug in the generator.
    #[error("generated code for {file} does not parse: {source}")]
    Syntax {
        file: String,
        #[source]
        source: syn::Error,
    },
}
