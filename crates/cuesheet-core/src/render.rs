//! HTML projection of the run tree.
//!
//! The editing surface is always rebuilt from this output. Nothing in the surface is
//! authoritative; it is read back only to pick up natively typed text.
//!
//! Every run becomes one `<span data-run="N">`, so DOM positions map straight back to
//! run positions. Marker tokens are ordinary plain-run text and render escaped.

use pulldown_cmark_escape::{FmtWriter, StrWrite, escape_html, escape_html_body_text};

use crate::color::Rgba;
use crate::grammar::EmotionId;
use crate::runs::{Run, RunTree};

/// Attribute holding a span's run index.
pub const RUN_INDEX_ATTR: &str = "data-run";

/// Attribute holding an emotion run's id.
pub const EMOTION_ATTR: &str = "data-emotion";

/// Class added to emotion run spans.
pub const EMOTION_CLASS: &str = "emotion";

/// Inline style for an emotion run: tinted background, full-strength text.
pub fn emotion_style(id: EmotionId) -> String {
    let emotion = id.emotion();
    format!(
        "background-color:{};color:{}",
        Rgba(emotion.fill),
        Rgba(emotion.stroke)
    )
}

/// Write the HTML for a run tree.
pub fn write_html<W: StrWrite>(mut writer: W, runs: &RunTree) -> Result<(), W::Error> {
    for (index, run) in runs.runs().iter().enumerate() {
        match run {
            Run::Plain(text) => {
                write!(writer, "<span {}=\"{}\">", RUN_INDEX_ATTR, index)?;
                escape_html_body_text(&mut writer, text)?;
            }
            Run::Emotion { emotion, text } => {
                write!(
                    writer,
                    "<span class=\"{}\" {}=\"{}\" {}=\"{}\" style=\"",
                    EMOTION_CLASS,
                    RUN_INDEX_ATTR,
                    index,
                    EMOTION_ATTR,
                    emotion
                )?;
                escape_html(&mut writer, &emotion_style(*emotion))?;
                writer.write_str("\">")?;
                escape_html_body_text(&mut writer, text)?;
            }
        }
        writer.write_str("</span>")?;
    }
    Ok(())
}

/// Escape text for use in HTML bodies and quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    if let Err(e) = escape_html(FmtWriter(&mut out), text) {
        tracing::error!(target: "cuesheet::render", "failed to escape text: {}", e);
    }
    out
}

/// Render a run tree to an HTML string.
pub fn render_html(runs: &RunTree) -> String {
    let mut out = String::with_capacity(runs.len_chars() * 2 + runs.run_count() * 48);
    if let Err(e) = write_html(FmtWriter(&mut out), runs) {
        tracing::error!(target: "cuesheet::render", "failed to render script: {}", e);
    }
    out
}
