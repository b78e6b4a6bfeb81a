// Request binding: query string or JSON body, path parameters and tagged fields, decoded
// into the method's input message.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use axum::body::to_bytes;
use axum::extract::rejection::RawPathParamsRejection;
use axum::extract::{ConnectInfo, FromRequestParts, RawPathParams, Request};
use axum::http::header::HOST;
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap, Method, Uri};
use serde::de::value::{MapDeserializer, StringDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Unexpected, Visitor};
use serde_json::Value;
use thiserror::Error;

// Same as axum's default body limit.
const BODY_LIMIT: usize = 2 * 1024 * 1024;

/// How a handler fills the input message.
#[derive(Debug, Clone, Copy)]
pub enum Binding {
    /// Query string (bodyless requests) or JSON body, plus path parameters.
    Default,
    /// As `Default`, then the listed fields are overwritten from headers or request
    /// attributes when present.
    Request(&'static [FieldSource]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSource {
    pub field: &'static str,
    pub from: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// A request header, by name.
    Header(&'static str),
    /// A request attribute: `method`, `path`, `uri`, `query`, `host` or `remote_addr`.
    Request(&'static str),
}

impl FieldSource {
    pub const fn header(field: &'static str, name: &'static str) -> Self {
        FieldSource {
            field,
            from: Source::Header(name),
        }
    }

    pub const fn request(field: &'static str, attribute: &'static str) -> Self {
        FieldSource {
            field,
            from: Source::Request(attribute),
        }
    }
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("invalid path parameters: {0}")]
    Path(String),
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
    #[error("invalid query: {0}")]
    Query(String),
    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("request body must be a JSON object")]
    NotAnObject,
}

/// Request data handed to the service implementation next to the decoded message.
#[derive(Debug)]
pub struct Context {
    parts: Parts,
    params: Vec<(String, String)>,
}

impl Context {
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Extensions set by middleware (authenticated user, request id, ...).
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn into_parts(self) -> Parts {
        self.parts
    }

    fn source_value(&self, source: Source) -> Option<String> {
        let header = |name: &str| {
            self.parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };
        match source {
            Source::Header(name) => header(name),
            Source::Request("method") => Some(self.parts.method.to_string()),
            Source::Request("path") => Some(self.parts.uri.path().to_string()),
            Source::Request("uri") => Some(self.parts.uri.to_string()),
            Source::Request("query") => self.parts.uri.query().map(str::to_string),
            Source::Request("host") => header(HOST.as_str()),
            Source::Request("remote_addr") => self
                .parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.to_string()),
            Source::Request(_) => None,
        }
    }
}

/// Decode `request` into `T`.
///
/// GET, HEAD and DELETE requests, and requests with an empty body, are decoded from the
/// query string. Everything else is decoded from a JSON body. Path parameters and tagged
/// fields are then laid over the decoded fields, in that order.
pub async fn bind<T: DeserializeOwned>(request: Request, binding: Binding) -> Result<(Context, T), BindError> {
    let (mut parts, body) = request.into_parts();
    let params = path_params(&mut parts).await?;
    let ctx = Context { parts, params };

    let tagged: Vec<(&str, String)> = match binding {
        Binding::Default => Vec::new(),
        Binding::Request(sources) => sources
            .iter()
            .filter_map(|source| ctx.source_value(source.from).map(|value| (source.field, value)))
            .collect(),
    };

    let bytes = to_bytes(body, BODY_LIMIT).await.map_err(BindError::Body)?;
    let bodyless = matches!(ctx.parts.method, Method::GET | Method::HEAD | Method::DELETE);
    let value = if bodyless || bytes.is_empty() {
        decode_query(&ctx, &tagged)?
    } else {
        decode_json(&bytes, &ctx, &tagged)?
    };
    Ok((ctx, value))
}

async fn path_params(parts: &mut Parts) -> Result<Vec<(String, String)>, BindError> {
    match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => Ok(params
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()),
        Err(RawPathParamsRejection::MissingPathParams(_)) => Ok(Vec::new()),
        Err(rejection) => Err(BindError::Path(rejection.body_text())),
    }
}

fn decode_query<T: DeserializeOwned>(ctx: &Context, tagged: &[(&str, String)]) -> Result<T, BindError> {
    let query = ctx.parts.uri.query().unwrap_or_default();
    let mut fields: BTreeMap<String, String> = serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map_err(|err| BindError::Query(err.to_string()))?
        .into_iter()
        .collect();
    fields.extend(ctx.params.iter().cloned());
    fields.extend(tagged.iter().map(|(field, value)| (field.to_string(), value.clone())));

    // serde_urlencoded parses numbers and booleans out of the string values
    let encoded = serde_urlencoded::to_string(&fields).map_err(|err| BindError::Query(err.to_string()))?;
    match serde_urlencoded::from_str::<T>(&encoded) {
        Ok(value) => Ok(value),
        // unit inputs (google.protobuf.Empty) do not deserialize from a map
        Err(err) if fields.is_empty() => {
            serde_json::from_value(Value::Null).map_err(|_| BindError::Query(err.to_string()))
        }
        Err(err) => Err(BindError::Query(err.to_string())),
    }
}

fn decode_json<T: DeserializeOwned>(bytes: &[u8], ctx: &Context, tagged: &[(&str, String)]) -> Result<T, BindError> {
    let value: Value = serde_json::from_slice(bytes)?;
    let overlay: Vec<(&str, &str)> = ctx
        .params
        .iter()
        .map(|(key, value)| (key.as_str(), value.as_str()))
        .chain(tagged.iter().map(|(field, value)| (*field, value.as_str())))
        .collect();
    if overlay.is_empty() {
        return Ok(serde_json::from_value(value)?);
    }

    let Value::Object(object) = value else {
        return Err(BindError::NotAnObject);
    };
    let mut fields: BTreeMap<String, Field> = object
        .into_iter()
        .map(|(key, value)| (key, Field::Json(value)))
        .collect();
    for (key, text) in overlay {
        fields.insert(key.to_string(), Field::Text(text.to_string()));
    }
    let map = MapDeserializer::<_, serde_json::Error>::new(fields.into_iter());
    Ok(T::deserialize(map)?)
}

/// A field of a JSON body after the overlay: either a value from the body, or text from the
/// path or a header that is parsed as whatever type the message field asks for.
enum Field {
    Json(Value),
    Text(String),
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for Field {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! parse_text {
    ($($method:ident => $visit:ident),* $(,)?) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self {
                Field::Json(value) => value.$method(visitor),
                Field::Text(text) => match text.parse() {
                    Ok(parsed) => visitor.$visit(parsed),
                    Err(_) => Err(de::Error::invalid_value(Unexpected::Str(&text), &visitor)),
                },
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Field {
    type Error = serde_json::Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Field::Json(value) => value.deserialize_any(visitor),
            Field::Text(text) => visitor.visit_string(text),
        }
    }

    parse_text! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self {
            Field::Json(value) => value.deserialize_option(visitor),
            text => visitor.visit_some(text),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self {
            Field::Json(value) => value.deserialize_newtype_struct(name, visitor),
            text => visitor.visit_newtype_struct(text),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self {
            Field::Json(value) => value.deserialize_enum(name, variants, visitor),
            Field::Text(text) => {
                let variant: StringDeserializer<serde_json::Error> = text.into_deserializer();
                visitor.visit_enum(variant)
            }
        }
    }

    serde::forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct seq tuple tuple_struct map
        struct identifier ignored_any
    }
}
