//! Protected spans: parts of a text translation must not touch and the
//! quality gate must not measure (URLs, mentions, hashtags, cashtags, code).
//!
//! Before a chain runs, each span is swapped for a numbered placeholder such
//! as `__P0__`; after the final hop the spans are put back.

use std::sync::LazyLock;

use regex::Regex;

static PROTECTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        `[^`\n]+`                       # inline code
        | https?://[^\s]+               # URLs
        | www\.[^\s]+
        | @[A-Za-z0-9_]+                # mentions
        | \#[\p{L}\p{N}_]+              # hashtags
        | \$[A-Za-z][A-Za-z0-9_]*       # cashtags
        ",
    )
    .expect("protected span regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

// Translators may change the case or pad the underscores with spaces.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)__\s*p\s*(\d+)\s*__").expect("placeholder regex"));

/// A text with its protected spans replaced by placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedText {
    text: String,
    spans: Vec<String>,
}

impl MaskedText {
    /// The text to hand to the translator.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Protected spans in order of appearance.
    pub fn spans(&self) -> &[String] {
        &self.spans
    }

    /// Put the spans back into `translated`. Spans whose placeholder did not
    /// survive translation are appended at the end.
    pub fn restore(&self, translated: &str) -> String {
        if self.spans.is_empty() {
            return translated.to_string();
        }
        let mut seen = vec![false; self.spans.len()];
        let restored = PLACEHOLDER.replace_all(translated, |caps: &regex::Captures<'_>| {
            let index = caps[1].parse::<usize>().ok();
            match index.and_then(|i| self.spans.get(i).map(|span| (i, span))) {
                Some((i, span)) => {
                    seen[i] = true;
                    span.clone()
                }
                None => caps[0].to_string(),
            }
        });

        let mut out = restored.into_owned();
        for (span, _) in self.spans.iter().zip(&seen).filter(|(_, seen)| !**seen) {
            if !out.is_empty() && !out.ends_with(char::is_whitespace) {
                out.push(' ');
            }
            out.push_str(span);
        }
        out
    }
}

/// Swap every protected span in `text` for a numbered placeholder.
pub fn mask_protected(text: &str) -> MaskedText {
    let mut spans = Vec::new();
    let masked = PROTECTED.replace_all(text, |caps: &regex::Captures<'_>| {
        let placeholder = format!("__P{}__", spans.len());
        spans.push(caps[0].to_string());
        placeholder
    });
    MaskedText {
        text: masked.into_owned(),
        spans,
    }
}

/// `text` with every protected span removed, whitespace collapsed and trimmed.
pub fn strip_protected(text: &str) -> String {
    let without = PROTECTED.replace_all(text, " ");
    WHITESPACE.replace_all(without.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_every_span_kind() {
        let text = "check https://x.co/a @bob #Friday $TSLA `rm -rf` www.example.com now";
        assert_eq!(strip_protected(text), "check now");
    }

    #[test]
    fn masking_lists_spans_in_order() {
        let masked = mask_protected("hi @amy see #news and $BTC");
        assert_eq!(masked.spans(), ["@amy", "#news", "$BTC"]);
        assert_eq!(masked.text(), "hi __P0__ see __P1__ and __P2__");
    }

    #[test]
    fn plain_text_only_gets_whitespace_normalized() {
        assert_eq!(strip_protected("  hello \n  world  "), "hello world");
        let masked = mask_protected("hello world");
        assert!(masked.spans().is_empty());
        assert_eq!(masked.restore("bonjour monde"), "bonjour monde");
    }

    #[test]
    fn restore_survives_case_and_spacing_changes() {
        let masked = mask_protected("look at this https://x.co/AbC from @bob");
        assert_eq!(
            masked.restore("LOOK AT THIS __p0__ FROM __ P1 __"),
            "LOOK AT THIS https://x.co/AbC FROM @bob"
        );
    }

    #[test]
    fn lost_placeholders_are_appended() {
        let masked = mask_protected("see `cargo run` and #rust");
        assert_eq!(masked.restore("look __P1__"), "look #rust `cargo run`");
        assert_eq!(masked.restore(""), "`cargo run` #rust");
    }

    #[test]
    fn unknown_placeholder_is_left_alone() {
        let masked = mask_protected("hi @amy");
        assert_eq!(masked.restore("salut __P0__ __P7__"), "salut @amy __P7__");
    }

    #[test]
    fn prices_are_not_cashtags() {
        assert_eq!(strip_protected("it costs $5 today"), "it costs $5 today");
    }

    #[test]
    fn only_spans_leaves_nothing() {
        assert_eq!(strip_protected("@a #b https://c.d"), "");
    }
}
