// Plugin parameters, passed as `--protoroute_opt=key=value,key=value`.

use proc_macro2::TokenStream;

use crate::GenerateError;

const DEFAULT_RUNTIME: &str = "::protoroute::rt";
const DEFAULT_SUFFIX: &str = ".route.rs";
const DEFAULT_SERVER_SUFFIX: &str = "HttpServer";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Path of the runtime module referenced by generated code.
    pub runtime: String,
    /// Appended to the schema file name (minus `.proto`) to name the output file.
    pub suffix: String,
    /// Appended to the service name to name the generated trait.
    pub server_suffix: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            runtime: DEFAULT_RUNTIME.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            server_suffix: DEFAULT_SERVER_SUFFIX.to_string(),
        }
    }
}

impl Options {
    pub fn parse(parameter: Option<&str>) -> Result<Self, GenerateError> {
        let mut options = Options::default();
        let Some(parameter) = parameter else {
            return Ok(options);
        };

        for part in parameter.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| GenerateError::InvalidParameter(part.to_string()))?;
            let value = value.trim();
            if value.is_empty() {
                return Err(GenerateError::InvalidParameter(part.to_string()));
            }
            match key.trim() {
                "runtime" => {
                    if syn::parse_str::<syn::Path>(value).is_err() {
                        return Err(GenerateError::InvalidParameter(part.to_string()));
                    }
                    options.runtime = value.to_string();
                }
                "suffix" => options.suffix = value.to_string(),
                "server_suffix" => {
                    if !super::names::is_identifier(value) {
                        return Err(GenerateError::InvalidParameter(part.to_string()));
                    }
                    options.server_suffix = value.to_string();
                }
                _ => return Err(GenerateError::InvalidParameter(part.to_string())),
            }
        }

        Ok(options)
    }

    /// Runtime module path as tokens. Validated by [`Options::parse`].
    pub fn runtime_tokens(&self) -> TokenStream {
        self.runtime.parse().unwrap_or_else(|_| DEFAULT_RUNTIME.parse().unwrap_or_default())
    }
}
