//! Attack signature matching.
//!
//! # Responsibilities
//! - Classify a single string as clean or as carrying a known attack signature
//! - Expose the traversal sub-pattern on its own for path checks
//!
//! # Design Decisions
//! - Patterns are compiled once at construction; the matcher is then read-only
//! - Case-insensitive everywhere
//! - Over-blocking is acceptable; distinct evasion encodings (overlong UTF-8
//!   such as `%c0%ae`, full-width dots, HTML entities) are not recognised

use std::fmt;

use regex::{Regex, RegexSet};
use serde::Serialize;

/// Kind of malicious input detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Injection,
    Script,
    Traversal,
    Header,
    Oversize,
    ControlByte,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Injection => "injection",
            Category::Script => "script",
            Category::Traversal => "traversal",
            Category::Header => "header",
            Category::Oversize => "oversize",
            Category::ControlByte => "control-byte",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of inspecting a value or a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionResult {
    Clean,
    Flagged(Category),
}

impl DetectionResult {
    pub fn is_clean(&self) -> bool {
        matches!(self, DetectionResult::Clean)
    }
}

const SQL_KEYWORDS: &str =
    r"(select|insert|update|delete|drop|alter|create|truncate|exec|execute|union|grant|revoke|shutdown|declare)";

fn injection_patterns() -> Vec<String> {
    vec![
        // terminator or quote followed by a statement keyword: `'; DROP TABLE`
        format!(r#"(?i)(;|'|")\s*{SQL_KEYWORDS}\b"#),
        // keyword later closed by a terminator or comment marker
        format!(r"(?i)\b{SQL_KEYWORDS}\b.*(;|--|/\*|#)"),
        // quoted-string tautology: `' OR '1'='1`, `" or 1=1`
        r#"(?i)['"]\s*(or|and)\s+['"]?\w+['"]?\s*(=|like\b)"#.to_string(),
        r"(?i)\bunion\b\s+(all\s+)?\bselect\b".to_string(),
        // quote immediately closed by a comment: `admin'--`
        r#"(?i)['"]\s*(--|#|/\*)"#.to_string(),
        r"(?i)\b(xp_cmdshell|sp_executesql|waitfor\s+delay|benchmark\s*\(|sleep\s*\()".to_string(),
    ]
}

const SCRIPT_PATTERNS: &[&str] = &[
    r"(?i)<\s*/?\s*script\b",
    r"(?i)\bon[a-z]{3,}\s*=",
    r"(?i)(java|vb)script\s*:",
    r"(?i)\beval\s*\(",
    r"(?i)expression\s*\(",
    r"(?i)<\s*(iframe|object|embed|svg)\b",
];

// `..` in literal, single-encoded or double-encoded form followed by a
// separator in any of the same forms.
const TRAVERSAL_PATTERN: &str =
    r"(?i)(\.|%2e|%252e)(\.|%2e|%252e)(/|\\|%2f|%5c|%252f|%255c)";

/// Stateless attack-signature classifier.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    injection: RegexSet,
    script: RegexSet,
    traversal: Regex,
}

impl PatternMatcher {
    pub fn new() -> Self {
        // The patterns are static; a failure here is a programming error
        // caught by the unit tests below.
        Self {
            injection: RegexSet::new(injection_patterns()).expect("injection patterns compile"),
            script: RegexSet::new(SCRIPT_PATTERNS).expect("script patterns compile"),
            traversal: Regex::new(TRAVERSAL_PATTERN).expect("traversal pattern compiles"),
        }
    }

    /// Classify a string. First matching category wins, checked in the
    /// order control-byte, traversal, script, injection.
    pub fn classify(&self, text: &str) -> DetectionResult {
        if has_control_byte(text) {
            return DetectionResult::Flagged(Category::ControlByte);
        }
        if self.is_traversal(text) {
            return DetectionResult::Flagged(Category::Traversal);
        }
        if self.script.is_match(text) {
            return DetectionResult::Flagged(Category::Script);
        }
        if self.injection.is_match(text) {
            return DetectionResult::Flagged(Category::Injection);
        }
        DetectionResult::Clean
    }

    /// The traversal sub-pattern alone.
    pub fn is_traversal(&self, text: &str) -> bool {
        self.traversal.is_match(text)
    }
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Embedded NUL, either raw or percent-encoded.
pub fn has_control_byte(text: &str) -> bool {
    text.contains('\0') || contains_ignore_ascii_case(text, "%00")
}

fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|w| w.eq_ignore_ascii_case(needle.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flagged(text: &str) -> Option<Category> {
        match PatternMatcher::new().classify(text) {
            DetectionResult::Clean => None,
            DetectionResult::Flagged(c) => Some(c),
        }
    }

    #[test]
    fn test_injection() {
        for s in [
            "'; DROP TABLE users;--",
            "' OR '1'='1",
            "1\" or 1=1",
            "x UNION ALL SELECT password FROM users",
            "admin'--",
            "1; exec xp_cmdshell 'dir'",
            "SeLeCt * from t; ",
        ] {
            assert_eq!(flagged(s), Some(Category::Injection), "{s}");
        }
    }

    #[test]
    fn test_script() {
        for s in [
            "<script>alert(1)</script>",
            "< SCRIPT src=x>",
            "<img src=x onerror=alert(1)>",
            "JavaScript:alert(1)",
            "eval(atob('x'))",
            "width: expression(alert(1))",
        ] {
            assert_eq!(flagged(s), Some(Category::Script), "{s}");
        }
    }

    #[test]
    fn test_traversal() {
        for s in [
            "../etc/passwd",
            "..\\windows\\system32",
            "%2e%2e%2fetc",
            "%2E%2E/etc",
            "..%2fetc",
            "%252e%252e%252fetc",
            ".%2e/etc",
        ] {
            assert_eq!(flagged(s), Some(Category::Traversal), "{s}");
        }
    }

    #[test]
    fn test_control_byte() {
        assert_eq!(flagged("file.txt\0.jpg"), Some(Category::ControlByte));
        assert_eq!(flagged("file.txt%00.jpg"), Some(Category::ControlByte));
    }

    #[test]
    fn test_clean_values() {
        for s in [
            "hello world",
            "2024-01-01",
            "rust programming",
            "user@example.com",
            "a.b.c",
            "selection",
            "one=two",
        ] {
            assert_eq!(flagged(s), None, "{s}");
        }
    }

    #[test]
    fn test_overlong_encoding_is_not_detected() {
        // Accepted limitation: distinct evasion encodings pass the matcher.
        assert_eq!(flagged("%c0%ae%c0%ae/etc"), None);
    }
}
