// Struct-tag mini-language used in comments and `moretags` field options.
//
// A tag string is a sequence of `key:"value"` pairs separated by spaces, the format of Go
// struct tags. In comments, a tag string sits on its own line wrapped in backticks:
//
//     // Create places an order.
//     // `midware:"auth,audit" dynamic_resp:"true"`

use tracing::warn;

/// The key/value pairs of one tag string, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags {
    pairs: Vec<(String, String)>,
}

impl Tags {
    /// Parse a tag string. Parsing stops at the first malformed segment; the pairs before
    /// it are kept and the remainder is ignored.
    pub fn parse(tag: &str) -> Self {
        let (pairs, rest) = parse_pairs(tag);
        if !rest.trim().is_empty() {
            warn!(tag, ignored = rest, "malformed tag segment ignored");
        }
        Tags { pairs }
    }

    /// Collect the tags of every tag line of a comment, in line order.
    pub fn from_comment(comment: &str) -> Self {
        let mut pairs = Vec::new();
        for line in comment.lines() {
            if let Some(tag) = tag_line(line) {
                pairs.extend(Tags::parse(tag).pairs);
            }
        }
        Tags { pairs }
    }

    /// First non-empty value for `key`. An empty value reads as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// The inside of a backtick-wrapped tag line, or None for prose.
pub fn tag_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.len() > 2 && line.starts_with('`') && line.ends_with('`') {
        Some(&line[1..line.len() - 1])
    } else {
        None
    }
}

/// The comment with its tag lines removed.
pub fn strip_tag_lines(comment: &str) -> String {
    comment
        .lines()
        .filter(|line| tag_line(line).is_none())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// Returns the parsed pairs and the unparsed remainder (empty when the whole tag parsed).
fn parse_pairs(mut tag: &str) -> (Vec<(String, String)>, &str) {
    let mut pairs = Vec::new();
    loop {
        tag = tag.trim_start_matches(' ');
        if tag.is_empty() {
            return (pairs, tag);
        }

        // key: any printable run up to ':', no spaces, quotes or control characters
        let key_len = tag
            .bytes()
            .take_while(|&b| b > b' ' && b != b':' && b != b'"' && b != 0x7f)
            .count();
        let bytes = tag.as_bytes();
        if key_len == 0 || key_len + 1 >= bytes.len() || bytes[key_len] != b':' || bytes[key_len + 1] != b'"' {
            return (pairs, tag);
        }
        let key = &tag[..key_len];

        // quoted value, honouring backslash escapes
        let quoted = &tag[key_len + 1..];
        let qbytes = quoted.as_bytes();
        let mut i = 1;
        while i < qbytes.len() && qbytes[i] != b'"' {
            if qbytes[i] == b'\\' {
                i += 1;
            }
            i += 1;
        }
        if i >= qbytes.len() {
            return (pairs, tag);
        }
        let Some(value) = unquote(&quoted[1..i]) else {
            return (pairs, tag);
        };
        pairs.push((key.to_string(), value));
        tag = &quoted[i + 1..];
    }
}

fn unquote(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            '\'' => out.push('\''),
            _ => return None,
        }
    }
    Some(out)
}
