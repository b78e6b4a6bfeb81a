use super::tags::Tags;

const DYNAMIC: &str = "dynamic";
const DYNAMIC_RESP: &str = "dynamic_resp";
const MIDWARE: &str = "midware";

/// Routing directives of one RPC method, read from the tag lines of its leading comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteAnnotation {
    /// `dynamic:"true"`: the method gets no route, handler, constant or trait method.
    pub dynamic: bool,
    /// `dynamic_resp:"true"`: the trait method returns an untyped JSON value.
    pub dynamic_resp: bool,
    /// `midware:"a,b"`, split on commas exactly as written. Empty segments are kept.
    pub midware: Vec<String>,
}

impl RouteAnnotation {
    pub fn from_comment(comment: &str) -> Self {
        Self::from_tags(&Tags::from_comment(comment))
    }

    pub fn from_tags(tags: &Tags) -> Self {
        RouteAnnotation {
            dynamic: is_true(tags.get(DYNAMIC)),
            dynamic_resp: is_true(tags.get(DYNAMIC_RESP)),
            midware: tags
                .get(MIDWARE)
                .map(|list| list.split(',').map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }
}

// Only the exact string "true" enables a flag; "True" or "1" do not.
fn is_true(value: Option<&str>) -> bool {
    value == Some("true")
}
