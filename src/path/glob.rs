//! Graphite glob to index regex translation
//!
//! The search index takes anchored regular expressions; Graphite clients
//! speak globs. Substitution order is significant: dot/star/question first,
//! then brace lists, then numeric ranges.

/// Translate a Graphite glob into a regex pattern for the search index.
///
/// - `.` becomes a literal `\.`
/// - `*` becomes `.*`
/// - `?` becomes `.?`
/// - `{a,b,c}` becomes `(a|b|c)`
/// - `[2-5]` becomes `(2|3|4|5)`, order-normalized so `[5-2]` is equivalent
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    for c in glob.chars() {
        match c {
            '.' => out.push_str("\\."),
            '*' => out.push_str(".*"),
            '?' => out.push_str(".?"),
            c => out.push(c),
        }
    }
    let out = replace_braces(&out);
    replace_ranges(&out)
}

/// `{a,b,c}` list alternation. An unclosed brace is passed through verbatim.
fn replace_braces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        match rest[start..].find('}') {
            Some(end) => {
                let inner = &rest[start + 1..start + end];
                out.push('(');
                out.push_str(&inner.split(',').collect::<Vec<_>>().join("|"));
                out.push(')');
                rest = &rest[start + end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// `[N-M]` numeric range alternation. Non-numeric brackets pass through.
fn replace_ranges(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('[') {
        if let Some(end) = rest[start..].find(']') {
            if let Some((lo, hi)) = parse_numeric_range(&rest[start + 1..start + end]) {
                out.push_str(&rest[..start]);
                let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
                let alternation = (lo..=hi)
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join("|");
                out.push('(');
                out.push_str(&alternation);
                out.push(')');
                rest = &rest[start + end + 1..];
                continue;
            }
        }
        out.push_str(&rest[..=start]);
        rest = &rest[start + 1..];
    }

    out.push_str(rest);
    out
}

fn parse_numeric_range(inner: &str) -> Option<(i64, i64)> {
    let (lo, hi) = inner.split_once('-')?;
    Some((lo.trim().parse().ok()?, hi.trim().parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn matches(glob: &str, path: &str) -> bool {
        let re = Regex::new(&format!("^{}$", glob_to_regex(glob))).unwrap();
        re.is_match(path)
    }

    #[test]
    fn test_literal_segments_match_themselves() {
        assert_eq!(glob_to_regex("web.srv1.cpu"), "web\\.srv1\\.cpu");
        assert!(matches("web.srv1.cpu", "web.srv1.cpu"));
        assert!(!matches("web.srv1.cpu", "web.srv2.cpu"));
    }

    #[test]
    fn test_star_matches_segment_internal_strings() {
        assert!(matches("web.*.cpu", "web.srv1.cpu"));
        assert!(matches("web.srv*.cpu", "web.srv12.cpu"));
        assert!(matches("web.*.cpu", "web..cpu"));
    }

    #[test]
    fn test_question_matches_optional_single_char() {
        assert_eq!(glob_to_regex("srv?"), "srv.?");
        assert!(matches("srv?", "srv1"));
        assert!(matches("srv?", "srv"));
        assert!(!matches("srv?", "srv12"));
    }

    #[test]
    fn test_brace_lists() {
        assert_eq!(
            glob_to_regex("cpu.{user,system}"),
            "cpu\\.(user|system)"
        );
        assert!(matches("cpu.{user,system}", "cpu.user"));
        assert!(matches("cpu.{user,system}", "cpu.system"));
        assert!(!matches("cpu.{user,system}", "cpu.idle"));
    }

    #[test]
    fn test_numeric_ranges() {
        assert_eq!(glob_to_regex("srv[2-5]"), "srv(2|3|4|5)");
        assert!(matches("srv[2-5]", "srv3"));
        assert!(!matches("srv[2-5]", "srv6"));
    }

    #[test]
    fn test_numeric_range_order_normalized() {
        assert_eq!(glob_to_regex("srv[5-2]"), glob_to_regex("srv[2-5]"));
    }

    #[test]
    fn test_non_numeric_brackets_pass_through() {
        assert_eq!(glob_to_regex("a[bc]d"), "a[bc]d");
    }

    #[test]
    fn test_unclosed_brace_passes_through() {
        assert_eq!(glob_to_regex("a{b"), "a{b");
    }

    #[test]
    fn test_combined_glob() {
        let re = glob_to_regex("web.*.cpu.{user,system}");
        assert_eq!(re, "web\\..*\\.cpu\\.(user|system)");
        assert!(matches("web.*.cpu.{user,system}", "web.srv1.cpu.user"));
        assert!(matches("web.*.cpu.{user,system}", "web.srv2.cpu.system"));
        assert!(!matches("web.*.cpu.{user,system}", "web.srv1.mem.used"));
    }
}
