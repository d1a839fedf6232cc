//! Adversarial-input screening and sensitive-data redaction.
//!
//! Both rule sets are compiled once into static tables. Injection rules run
//! against the raw (untrimmed, un-normalized) input; redaction rules run over
//! any text that leaves the process (logs, error responses).

use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum characters of untrusted input copied into a log line.
pub const LOG_INPUT_MAX_CHARS: usize = 50;

struct InjectionRule {
    name: &'static str,
    pattern: Regex,
}

struct RedactionRule {
    pattern: Regex,
    replacement: &'static str,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static security pattern is valid")
}

static INJECTION_RULES: Lazy<Vec<InjectionRule>> = Lazy::new(|| {
    vec![
        InjectionRule {
            name: "instruction_override",
            pattern: compile(r"(?i)ignore\s+(previous|above|all)\s+(instructions|prompts)"),
        },
        InjectionRule {
            name: "system_prompt_assignment",
            pattern: compile(r#"(?i)system\s*[:=]\s*["']"#),
        },
        InjectionRule {
            name: "script_markup",
            pattern: compile(r"(?i)<\s*script\s*>"),
        },
        InjectionRule {
            name: "code_block",
            pattern: compile(r"(?s)```.*?```"),
        },
        InjectionRule {
            name: "brace_payload",
            pattern: compile(r"(?s)\{.*?\}"),
        },
    ]
});

static REDACTION_RULES: Lazy<Vec<RedactionRule>> = Lazy::new(|| {
    vec![
        RedactionRule {
            pattern: compile(
                r#"(?i)["']?api[_-]?key["']?\s*[:=]\s*["']?[A-Za-z0-9_\-]{20,}["']?"#,
            ),
            replacement: "api_key=***REDACTED***",
        },
        RedactionRule {
            pattern: compile(r"(?i)Bearer\s+[A-Za-z0-9_\-\.]{20,}"),
            replacement: "Bearer ***REDACTED***",
        },
        RedactionRule {
            pattern: compile(r"(?i)AKIA[0-9A-Z]{16}"),
            replacement: "***REDACTED_AWS_KEY***",
        },
        RedactionRule {
            pattern: compile(r"/(?:home|root|Users)/[^\s]+"),
            replacement: "***REDACTED_PATH***",
        },
        RedactionRule {
            pattern: compile(r"(?i)[A-Z]:\\(?:Users|Windows|Program Files)[^\s]*"),
            replacement: "***REDACTED_PATH***",
        },
        RedactionRule {
            pattern: compile(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b"),
            replacement: "***REDACTED_EMAIL***",
        },
        RedactionRule {
            pattern: compile(r"\b(?:\d{1,3}\.){3}\d{1,3}\b"),
            replacement: "***REDACTED_IP***",
        },
        RedactionRule {
            pattern: compile(r#"(?i)password["']?\s*[:=]\s*["']?[^\s"']+["']?"#),
            replacement: "password=***REDACTED***",
        },
        RedactionRule {
            pattern: compile(r"(?i)(?:postgres|mysql|mongodb)://[^\s]+"),
            replacement: "***REDACTED_DB_CONNECTION***",
        },
    ]
});

/// Returns the name of the first adversarial rule matching `raw`.
pub fn detect_injection(raw: &str) -> Option<&'static str> {
    INJECTION_RULES
        .iter()
        .find(|rule| rule.pattern.is_match(raw))
        .map(|rule| rule.name)
}

/// Scrub credentials, paths, addresses and connection strings from `text`.
///
/// Returns the scrubbed text and whether anything was replaced.
pub fn redact(text: &str) -> (String, bool) {
    let mut out = text.to_string();
    let mut changed = false;
    for rule in REDACTION_RULES.iter() {
        if rule.pattern.is_match(&out) {
            out = rule
                .pattern
                .replace_all(&out, rule.replacement)
                .into_owned();
            changed = true;
        }
    }
    (out, changed)
}

/// Truncate untrusted input to [`LOG_INPUT_MAX_CHARS`] characters.
pub fn truncate_for_log(raw: &str) -> String {
    raw.chars().take(LOG_INPUT_MAX_CHARS).collect()
}
