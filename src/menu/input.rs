//! Extraction of the relevant token from the accumulated dialed string.
//!
//! The gateway re-sends the whole dialog each turn: after pressing 1, 25
//! and 70 the request carries `"1*25*70"`. Only the final segment matters
//! for the next transition.

/// Universal exit token, honored from any menu.
pub const EXIT_TOKEN: &str = "00";

/// Which token-extraction rule is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseRule {
    /// Take the segment after the last `*`. Correct for gateways that
    /// accumulate the dialog string.
    #[default]
    LastSegment,
    /// Split on `*`, drop non-numeric segments, use the last one. Retained
    /// for gateways that deliver keystrokes with stray separators or junk.
    FullSequence,
}

/// Extract the token relevant to the next transition from raw dialed text.
pub fn extract_token(text: &str, rule: ParseRule) -> String {
    let trimmed = text.trim();
    match rule {
        ParseRule::LastSegment => trimmed
            .rsplit('*')
            .next()
            .unwrap_or(trimmed)
            .trim()
            .to_string(),
        ParseRule::FullSequence => trimmed
            .split('*')
            .map(str::trim)
            .filter(|segment| {
                !segment.is_empty()
                    && segment.chars().all(|c| c.is_ascii_digit() || c == '.')
            })
            .next_back()
            .unwrap_or("")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_segment_of_accumulated_text() {
        assert_eq!(extract_token("1*25*70", ParseRule::LastSegment), "70");
        assert_eq!(extract_token("1", ParseRule::LastSegment), "1");
    }

    #[test]
    fn empty_text_yields_empty_token() {
        assert_eq!(extract_token("", ParseRule::LastSegment), "");
        assert_eq!(extract_token("", ParseRule::FullSequence), "");
    }

    #[test]
    fn last_segment_after_trailing_star_is_empty() {
        assert_eq!(extract_token("1*25*", ParseRule::LastSegment), "");
    }

    #[test]
    fn exit_token_survives_accumulation() {
        assert_eq!(extract_token("1*25*00", ParseRule::LastSegment), EXIT_TOKEN);
    }

    #[test]
    fn full_sequence_skips_non_numeric_segments() {
        assert_eq!(extract_token("1*70.5*ab", ParseRule::FullSequence), "70.5");
        assert_eq!(extract_token("*1*", ParseRule::FullSequence), "1");
    }

    #[test]
    fn tokens_are_trimmed() {
        assert_eq!(extract_token(" 1*25 ", ParseRule::LastSegment), "25");
    }
}
