use once_cell::sync::Lazy;
use regex::Regex;

const FENCE: &str = "```";
const SQL_FENCE: &str = "```sql";

pub const NO_CHANGE_SUMMARY: &str = "No change summary provided.";

static CHANGES_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bchanges\s*:\s*(.*)").unwrap()
});

/// pull the sql out of a model reply
///
/// Prefers a ```` ```sql ```` block, then any fenced block (skipping the
/// language tag line), then falls back to the whole reply.
pub fn extract_sql(text: &str) -> String {
    if let Some(sql) = sql_fence_body(text) {
        return sql.trim().to_string();
    }

    if let Some(body) = generic_fence_body(text) {
        return body.trim().to_string();
    }

    text.trim().to_string()
}

fn sql_fence_body(text: &str) -> Option<&str> {
    let start = text.find(SQL_FENCE)? + SQL_FENCE.len();
    let end = start + text[start..].find(FENCE)?;
    (end > start).then(|| &text[start..end])
}

fn generic_fence_body(text: &str) -> Option<&str> {
    let mut start = text.find(FENCE)? + FENCE.len();
    if let Some(newline) = text[start..].find('\n') {
        start += newline + 1;
    }
    let end = start + text[start..].find(FENCE)?;
    (end > start).then(|| &text[start..end])
}

/// text following the closing fence of the first code block, if any
fn after_code_block(text: &str) -> Option<&str> {
    let open = text.find(FENCE)? + FENCE.len();
    let close = open + text[open..].find(FENCE)?;
    Some(&text[close + FENCE.len()..])
}

/// change summary from a refinement reply
pub fn extract_changes(text: &str) -> String {
    let tail = after_code_block(text);

    if let Some(captures) = CHANGES_REGEX.captures(tail.unwrap_or(text)) {
        let summary = captures.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if !summary.is_empty() {
            return summary.to_string();
        }
    }

    match tail.map(str::trim) {
        Some(prose) if !prose.is_empty() => prose.to_string(),
        _ => NO_CHANGE_SUMMARY.to_string(),
    }
}

/// outermost `{...}` span of a reply, ignoring any fences or prose around it
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_sql_from_sql_fence() {
        let input = "Here you go:\n```sql\nSELECT COUNT(*) FROM customers;\n```\nDone.";
        assert_eq!(extract_sql(input), "SELECT COUNT(*) FROM customers;");
    }

    #[test]
    fn test_extract_sql_from_generic_fence_skips_language_tag() {
        let input = "```postgresql\nSELECT 1\n```";
        assert_eq!(extract_sql(input), "SELECT 1");

        let bare = "```\nSELECT 2\n```";
        assert_eq!(extract_sql(bare), "SELECT 2");
    }

    #[test]
    fn test_extract_sql_plain_text_is_trimmed() {
        assert_eq!(extract_sql("  SELECT * FROM orders  \n"), "SELECT * FROM orders");
    }

    #[test]
    fn test_extract_sql_fence_roundtrip_equals_trimmed_query() {
        for query in ["SELECT 1", "  SELECT name\nFROM customers\nWHERE id = 3 ", "WITH x AS (SELECT 1) SELECT * FROM x"] {
            let fenced = format!("```sql\n{}\n```", query);
            assert_eq!(extract_sql(&fenced), query.trim());
        }
    }

    #[test]
    fn test_extract_sql_unclosed_fence_falls_back() {
        let input = "```sql\nSELECT 1";
        assert_eq!(extract_sql(input), "```sql\nSELECT 1");
    }

    #[test]
    fn test_extract_changes_after_marker() {
        let input = "```sql\nSELECT * FROM customers WHERE active\n```\n\nChanges:\n- filter on active customers";
        assert_eq!(extract_changes(input), "- filter on active customers");
    }

    #[test]
    fn test_extract_changes_marker_is_case_insensitive() {
        let input = "```sql\nSELECT 1\n```\nCHANGES: added limit";
        assert_eq!(extract_changes(input), "added limit");
    }

    #[test]
    fn test_extract_changes_uses_trailing_prose() {
        let input = "```sql\nSELECT 1\n```\nI added a limit clause.";
        assert_eq!(extract_changes(input), "I added a limit clause.");
    }

    #[test]
    fn test_extract_changes_ignores_marker_inside_sql() {
        let input = "```sql\n-- changes: none\nSELECT 1\n```";
        assert_eq!(extract_changes(input), NO_CHANGE_SUMMARY);
    }

    #[test]
    fn test_extract_changes_default() {
        assert_eq!(extract_changes("SELECT 1"), NO_CHANGE_SUMMARY);
    }

    #[test]
    fn test_extract_json_object_strips_fences() {
        let input = "```json\n{\"is_valid\": true, \"issues\": []}\n```";
        assert_eq!(
            extract_json_object(input),
            Some("{\"is_valid\": true, \"issues\": []}")
        );
        assert_eq!(extract_json_object("no json here"), None);
    }
}
