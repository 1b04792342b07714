//! Quality supervision: a last pass over every outgoing response.
//!
//! Issues with a known fix are corrected in place and noted. Issues without
//! one are reported as unresolved, which flags the response for a human.

use regex::Regex;
use std::sync::LazyLock;

/// Responses longer than this are cut at a sentence boundary.
pub const MAX_RESPONSE_CHARS: usize = 4000;
/// Any discount promise above this needs a human.
const MAX_PROMISED_DISCOUNT_PCT: f64 = 20.0;

static ROBOTIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(as an ai( language model)?|i am an ai|i'm an ai)\b[^.!?]*[.!?]?\s*")
        .expect("robotic phrase regex")
});
static GUARANTEE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwe guarantee\b").expect("guarantee regex"));
static GUARANTEED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bguaranteed\b").expect("guaranteed regex"));
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(customer name|name|first name)\]|\{\{\s*name\s*\}\}")
        .expect("placeholder regex")
});
static DISCOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*%\s*(off|discount)").expect("discount regex")
});

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupervisionReport {
    /// The response after corrections.
    pub text: String,
    pub corrections: Vec<String>,
    pub unresolved: Vec<String>,
}

impl SupervisionReport {
    pub fn is_clean(&self) -> bool {
        self.unresolved.is_empty()
    }
}

pub fn supervise(raw: &str, customer_name: Option<&str>) -> SupervisionReport {
    let mut report = SupervisionReport {
        text: raw.trim().to_string(),
        ..Default::default()
    };

    if ROBOTIC.is_match(&report.text) {
        report.text = ROBOTIC.replace_all(&report.text, "").trim().to_string();
        report.corrections.push("removed robotic self-reference".to_string());
    }

    if GUARANTEE.is_match(&report.text) || GUARANTEED.is_match(&report.text) {
        let softened = GUARANTEE.replace_all(&report.text, "we aim to ensure");
        report.text = GUARANTEED.replace_all(&softened, "planned").into_owned();
        report.corrections.push("softened guarantee language".to_string());
    }

    if PLACEHOLDER.is_match(&report.text) {
        match customer_name {
            Some(name) => {
                report.text = PLACEHOLDER.replace_all(&report.text, name).into_owned();
                report.corrections.push("filled customer name placeholder".to_string());
            }
            None => report
                .unresolved
                .push("unfilled customer name placeholder".to_string()),
        }
    }

    for caps in DISCOUNT.captures_iter(&report.text) {
        let pct: f64 = caps[1].parse().unwrap_or(0.0);
        if pct > MAX_PROMISED_DISCOUNT_PCT {
            report
                .unresolved
                .push(format!("promises an unapproved {pct}% discount"));
        }
    }

    if report.text.chars().count() > MAX_RESPONSE_CHARS {
        report.text = truncate_at_sentence(&report.text, MAX_RESPONSE_CHARS);
        report.corrections.push("trimmed overlong response".to_string());
    }

    if report.text.is_empty() {
        report.unresolved.push("empty response".to_string());
    }

    report
}

fn truncate_at_sentence(text: &str, max_chars: usize) -> String {
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(['.', '!', '?']) {
        Some(end) => cut[..=end].to_string(),
        None => cut,
    }
}
