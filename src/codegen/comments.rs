// Comment extraction from SourceCodeInfo
//
// Builds a map from dotted name paths to leading comments by walking the numeric paths in
// SourceCodeInfo.Location through the file's services, methods, messages and fields.

use std::collections::HashMap;

use super::descriptor::{
    DescriptorProto, FILE_MESSAGE_TYPE, FILE_PACKAGE, FILE_SERVICE, FILE_SYNTAX,
    FileDescriptorProto, MESSAGE_FIELD, MESSAGE_NESTED_TYPE, SERVICE_METHOD,
};

/// Extract leading comments from a FileDescriptorProto's source_code_info.
/// Returns a map from dotted name path (e.g., "Order.Get" or "GetOrderRequest.id") to
/// comment text. Locations with only trailing comments are skipped: tags are read from
/// leading comments.
pub fn extract_comments(file: &FileDescriptorProto) -> HashMap<String, String> {
    let mut comments = HashMap::new();

    let Some(source_code_info) = file.source_code_info.as_ref() else {
        return comments;
    };

    for location in &source_code_info.location {
        let Some(comment) = location.leading_comments.as_deref() else {
            continue;
        };

        if let Some(name_path) = walk_path(file, &location.path) {
            let trimmed = trim_comment(comment);
            if !trimmed.is_empty() {
                comments.insert(name_path, trimmed);
            }
        }
    }

    comments
}

/// The comment describing the file itself: the leading comment of its `syntax` statement,
/// or of its `package` statement when the former has none.
pub fn file_comment(file: &FileDescriptorProto) -> String {
    let Some(source_code_info) = file.source_code_info.as_ref() else {
        return String::new();
    };
    let leading = |path: i32| {
        source_code_info
            .location
            .iter()
            .filter(|location| location.path == [path])
            .find_map(|location| location.leading_comments.as_deref())
            .map(trim_comment)
            .filter(|comment| !comment.is_empty())
    };
    leading(FILE_SYNTAX).or_else(|| leading(FILE_PACKAGE)).unwrap_or_default()
}

/// Resolve a SourceCodeInfo path to the dotted name of the element it points at.
/// Only services, methods, messages (nested included) and fields are named.
fn walk_path(file: &FileDescriptorProto, path: &[i32]) -> Option<String> {
    match path {
        [FILE_SERVICE, service] => {
            let service = file.service.get(index(*service)?)?;
            Some(service.name().to_string())
        }
        [FILE_SERVICE, service, SERVICE_METHOD, method] => {
            let service = file.service.get(index(*service)?)?;
            let method = service.method.get(index(*method)?)?;
            Some(format!("{}.{}", service.name(), method.name()))
        }
        [FILE_MESSAGE_TYPE, message, rest @ ..] => {
            let message = file.message_type.get(index(*message)?)?;
            let mut name_parts = vec![message.name().to_string()];
            walk_message(message, rest, &mut name_parts)?;
            Some(name_parts.join("."))
        }
        _ => None,
    }
}

fn walk_message(message: &DescriptorProto, path: &[i32], name_parts: &mut Vec<String>) -> Option<()> {
    match path {
        [] => Some(()),
        [MESSAGE_FIELD, field] => {
            let field = message.field.get(index(*field)?)?;
            name_parts.push(field.name().to_string());
            Some(())
        }
        [MESSAGE_NESTED_TYPE, nested, rest @ ..] => {
            let nested = message.nested_type.get(index(*nested)?)?;
            name_parts.push(nested.name().to_string());
            walk_message(nested, rest, name_parts)
        }
        _ => None,
    }
}

fn index(i: i32) -> Option<usize> {
    usize::try_from(i).ok()
}

/// Trim and clean up a comment string.
fn trim_comment(comment: &str) -> String {
    // Remove leading/trailing whitespace from each line and rejoin
    comment
        .lines()
        .map(|line| line.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
