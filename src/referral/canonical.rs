// Copyright (c) Rafiki Rewards Team
// SPDX-License-Identifier: Apache-2.0

/// Turn any raw referral token into its canonical form.
///
/// The raw token may carry URL debris (`?utm=...`, `#fragment`), whitespace,
/// a legacy prefix, or no prefix at all. Every call site shares this one
/// function; the prefix logic is not re-implemented anywhere else.
///
/// Returns `None` for tokens with no usable code body ("absent", not an
/// error). Idempotent: canonicalizing a canonical code returns it unchanged.
///
/// Tokens containing hyphens keep only the text after the last hyphen as the
/// code body. This is lossy for bodies that themselves contain hyphens;
/// codes issued by this service use hyphen-free bodies so none of them can
/// be mis-truncated.
pub fn canonicalize(prefix: &str, raw: &str) -> Option<String> {
    // Strip anything after the first query or fragment separator
    let token = match raw.find(|c| c == '?' || c == '#') {
        Some(idx) => &raw[..idx],
        None => raw,
    };
    let token = token.trim();

    if token.is_empty() {
        return None;
    }

    if token.starts_with(prefix) {
        return Some(token.to_string());
    }

    let body = match token.rfind('-') {
        Some(idx) => &token[idx + 1..],
        None => token,
    };

    if body.is_empty() {
        return None;
    }

    Some(format!("{}{}", prefix, body))
}

#[cfg(test)]
mod tests {
    use super::canonicalize;

    const PREFIX: &str = "rafiki-";

    #[test]
    fn legacy_prefix_is_replaced() {
        assert_eq!(
            canonicalize(PREFIX, "shuj-AB12"),
            Some("rafiki-AB12".to_string())
        );
    }

    #[test]
    fn canonical_input_is_unchanged() {
        assert_eq!(
            canonicalize(PREFIX, "rafiki-AB12"),
            Some("rafiki-AB12".to_string())
        );
    }

    #[test]
    fn query_and_fragment_are_stripped() {
        assert_eq!(
            canonicalize(PREFIX, "rafiki-AB12?foo=bar"),
            Some("rafiki-AB12".to_string())
        );
        assert_eq!(
            canonicalize(PREFIX, "AB12#section"),
            Some("rafiki-AB12".to_string())
        );
    }

    #[test]
    fn bare_body_is_prefixed() {
        assert_eq!(
            canonicalize(PREFIX, "AB12"),
            Some("rafiki-AB12".to_string())
        );
    }

    #[test]
    fn whitespace_is_trimmed() {
        assert_eq!(
            canonicalize(PREFIX, "  shuj-AB12 \n"),
            Some("rafiki-AB12".to_string())
        );
    }

    #[test]
    fn empty_input_is_absent() {
        assert_eq!(canonicalize(PREFIX, ""), None);
        assert_eq!(canonicalize(PREFIX, "   "), None);
        assert_eq!(canonicalize(PREFIX, "?ref=abc"), None);
    }

    #[test]
    fn trailing_hyphen_has_no_body() {
        assert_eq!(canonicalize(PREFIX, "shuj-"), None);
    }

    // Last-segment-wins is the accepted behavior for multi-hyphen tokens,
    // matched across all call sites.
    #[test]
    fn multi_hyphen_keeps_last_segment() {
        assert_eq!(
            canonicalize(PREFIX, "old-promo-AB12"),
            Some("rafiki-AB12".to_string())
        );
    }

    #[test]
    fn idempotent_for_all_non_empty_outputs() {
        for raw in ["shuj-AB12", "AB12", "rafiki-AB12", "a-b-c", "x?y", "z#w"] {
            if let Some(code) = canonicalize(PREFIX, raw) {
                assert_eq!(canonicalize(PREFIX, &code), Some(code.clone()));
            }
        }
    }
}
