//! Single-pass tokenizer from canonical text to runs, and the inverse serializer.
//!
//! Matching is left to right, lazy, and non-recursive. At each `<` we try to read a
//! catalog opening tag. If one is found and its closing tag appears later, the text
//! between them becomes an emotion run verbatim. Anything else (unknown ids, markers,
//! unmatched opening tags, stray closing tags) stays in the surrounding plain run.
//!
//! Since every byte of the input ends up in exactly one run and the emotion delimiters
//! are regenerated from the id, `serialize_runs(parse_to_runs(s)) == s` for any `s`.

use crate::grammar::EmotionId;
use crate::runs::{Run, RunTree};

/// Longest catalog id plus its closing `>`.
const MAX_OPEN_TAG_LOOKAHEAD: usize = 8;

/// Parse canonical text into a run tree.
pub fn parse_to_runs(text: &str) -> RunTree {
    let mut runs = Vec::new();
    let mut plain_start = 0;
    let mut cursor = 0;

    while let Some(found) = text[cursor..].find('<') {
        let lt = cursor + found;
        match match_emotion(text, lt) {
            Some((emotion, body, end)) => {
                if plain_start < lt {
                    runs.push(Run::Plain(text[plain_start..lt].to_string()));
                }
                runs.push(Run::Emotion {
                    emotion,
                    text: body.to_string(),
                });
                plain_start = end;
                cursor = end;
            }
            None => cursor = lt + 1,
        }
    }

    if plain_start < text.len() {
        runs.push(Run::Plain(text[plain_start..].to_string()));
    }

    tracing::trace!(target: "cuesheet::parse", runs = runs.len(), bytes = text.len(), "parsed script");
    RunTree::from_runs(runs)
}

/// Try to read `<id>body</id>` starting at byte `lt`, which must hold `<`.
///
/// Returns the emotion, its body, and the byte offset just past the closing tag.
fn match_emotion(text: &str, lt: usize) -> Option<(EmotionId, &str, usize)> {
    let rest = &text[lt + 1..];
    let gt = rest
        .bytes()
        .take(MAX_OPEN_TAG_LOOKAHEAD)
        .position(|b| b == b'>')?;
    let emotion = EmotionId::from_tag_name(&rest[..gt])?;

    let body_start = lt + 1 + gt + 1;
    let close = emotion.close_tag();
    let body_len = text[body_start..].find(close.as_str())?;
    let body_end = body_start + body_len;
    Some((emotion, &text[body_start..body_end], body_end + close.len()))
}

/// Serialize runs back to canonical text.
pub fn serialize_runs(runs: &[Run]) -> String {
    let mut out = String::with_capacity(runs.iter().map(|r| r.text().len() + 20).sum());
    for run in runs {
        run.write_canonical(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::EXAMPLE_SCRIPT;

    fn outline(text: &str) -> String {
        parse_to_runs(text).outline()
    }

    #[test]
    fn test_basic_round_trip() {
        let text = "Hello <happy>world</happy>!";
        let runs = parse_to_runs(text);
        assert_eq!(runs.to_canonical(), text);
        insta::assert_snapshot!(runs.outline(), @r#"
        plain "Hello "
        happy "world"
        plain "!"
        "#);
    }

    #[test]
    fn test_example_script_round_trips() {
        let runs = parse_to_runs(EXAMPLE_SCRIPT);
        assert_eq!(runs.to_canonical(), EXAMPLE_SCRIPT);
        let ids: Vec<_> = runs.emotion_spans().map(|s| s.emotion).collect();
        assert_eq!(
            ids,
            vec![
                EmotionId::Angry,
                EmotionId::Happy,
                EmotionId::Happy,
                EmotionId::Excited
            ]
        );
    }

    #[test]
    fn test_markers_stay_in_plain_runs() {
        insta::assert_snapshot!(outline("a<effect=1001>b<s=5><sad>c</sad>"), @r#"
        plain "a<effect=1001>b<s=5>"
        sad "c"
        "#);
    }

    #[test]
    fn test_unknown_and_unmatched_tags_are_plain() {
        assert_eq!(outline("<joyful>x</joyful>"), r#"plain "<joyful>x</joyful>""#);
        assert_eq!(outline("<happy>never closed"), r#"plain "<happy>never closed""#);
        assert_eq!(outline("stray </sad> close"), r#"plain "stray </sad> close""#);
        assert_eq!(outline("<Happy>x</Happy>"), r#"plain "<Happy>x</Happy>""#);
    }

    #[test]
    fn test_unmatched_open_then_valid_run() {
        // An opening tag with no partner is plain text; later tags still match.
        insta::assert_snapshot!(outline("<sad>a <happy>b</happy>"), @r#"
        plain "<sad>a "
        happy "b"
        "#);
    }

    #[test]
    fn test_body_is_verbatim() {
        // No recursive parsing inside a run.
        insta::assert_snapshot!(outline("<happy>a<sad>b</sad>c</happy>"), @r#"
        happy "a<sad>b</sad>c"
        "#);
        // Lazy: the first matching close tag ends the run.
        insta::assert_snapshot!(outline("<happy>a<happy>b</happy>c</happy>"), @r#"
        happy "a<happy>b"
        plain "c</happy>"
        "#);
    }

    #[test]
    fn test_empty_body() {
        let runs = parse_to_runs("x<tired></tired>y");
        assert_eq!(runs.run_count(), 3);
        assert_eq!(runs.len_chars(), 2);
        assert_eq!(runs.to_canonical(), "x<tired></tired>y");
    }

    #[test]
    fn test_adjacent_runs() {
        insta::assert_snapshot!(outline("<happy>a</happy><sad>b</sad>"), @r#"
        happy "a"
        sad "b"
        "#);
    }

    #[test]
    fn test_round_trip_on_malformed_input() {
        for text in [
            "",
            "<",
            "<<happy>>",
            "<happy",
            "</happy><happy>",
            "<excited>",
            "<happy></sad></happy>",
            "<s=>",
            "國王<angry>非常生氣</angry>。<",
            "<scared>\n\n</scared>",
        ] {
            assert_eq!(parse_to_runs(text).to_canonical(), text, "input {:?}", text);
        }
    }

    #[test]
    fn test_empty_input_has_no_runs() {
        assert_eq!(parse_to_runs("").run_count(), 0);
    }
}
