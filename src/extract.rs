//! Heuristic extraction of generated identifiers from command output.
use regex::Regex;

/// Scan free-form CLI output for a newly generated identifier.
///
/// Primary heuristic: the `{TYPE}-{date}-{sequence}` shape the change
/// tracker stamps on created items, e.g. `FM-20240115-0007`. Secondary: the
/// first line with an `id:` or `created` marker followed by a token. A miss
/// returns `None`; the external operation may have succeeded without a
/// parseable identifier.
pub fn extract_generated_id(output: &str) -> Option<String> {
    let primary = Regex::new(r"\b[A-Z][A-Z0-9]{0,7}-\d{8}-\d{4,}\b").expect("primary id pattern");
    if let Some(found) = primary.find(output) {
        return Some(found.as_str().to_string());
    }

    let secondary =
        Regex::new(r"(?i)\b(?:id\s*:|created)[\s:]*([A-Za-z0-9][A-Za-z0-9-]*)").expect("secondary id pattern");
    for line in output.lines() {
        if let Some(captures) = secondary.captures(line) {
            return Some(captures[1].to_string());
        }
    }
    None
}
