//! Inline annotation grammar for audio-drama scripts.
//!
//! Two kinds of inline syntax exist in a script:
//! - Emotion spans: `<happy>...</happy>`, paired, never nested, ids from a closed catalog.
//! - Marker tokens: `<effect=1001>`, `<s=5>`, opaque literals with no closing counterpart.
//!
//! Markers have no tree node type of their own. They live inside plain runs as
//! ordinary characters, so the catalog here only describes how they are offered to
//! the user and how they are styled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};

use crate::error::ScriptError;

/// Identifier of an emotion from the built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionId {
    Happy,
    Sad,
    Angry,
    Tired,
    Excited,
    Scared,
}

impl EmotionId {
    /// All emotions in catalog order.
    pub const ALL: [EmotionId; 6] = [
        EmotionId::Happy,
        EmotionId::Sad,
        EmotionId::Angry,
        EmotionId::Tired,
        EmotionId::Excited,
        EmotionId::Scared,
    ];

    /// The tag name used in canonical text.
    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionId::Happy => "happy",
            EmotionId::Sad => "sad",
            EmotionId::Angry => "angry",
            EmotionId::Tired => "tired",
            EmotionId::Excited => "excited",
            EmotionId::Scared => "scared",
        }
    }

    /// Look up an id by its exact tag name. Unknown names yield `None`.
    pub fn from_tag_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }

    /// `<happy>`
    pub fn open_tag(&self) -> SmolStr {
        format_smolstr!("<{}>", self.as_str())
    }

    /// `</happy>`
    pub fn close_tag(&self) -> SmolStr {
        format_smolstr!("</{}>", self.as_str())
    }

    /// Wrap text in this emotion's tag pair.
    pub fn wrap(&self, text: &str) -> String {
        let name = self.as_str();
        let mut out = String::with_capacity(text.len() + 2 * name.len() + 5);
        out.push('<');
        out.push_str(name);
        out.push('>');
        out.push_str(text);
        out.push_str("</");
        out.push_str(name);
        out.push('>');
        out
    }

    /// Catalog entry for this id.
    pub fn emotion(&self) -> &'static Emotion {
        emotion(*self)
    }
}

impl fmt::Display for EmotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmotionId {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_tag_name(s).ok_or_else(|| ScriptError::UnknownEmotion(SmolStr::new(s)))
    }
}

/// A catalog entry describing how an emotion is presented.
///
/// Colors are packed as `0xRRGGBBAA`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Emotion {
    pub id: EmotionId,
    pub display_name: &'static str,
    pub stroke: u32,
    pub fill: u32,
}

/// The built-in emotion catalog, indexed in `EmotionId::ALL` order.
pub static EMOTIONS: [Emotion; 6] = [
    Emotion {
        id: EmotionId::Happy,
        display_name: "Happy",
        stroke: 0x22c55eff,
        fill: 0x22c55e33,
    },
    Emotion {
        id: EmotionId::Sad,
        display_name: "Sad",
        stroke: 0x3b82f6ff,
        fill: 0x3b82f633,
    },
    Emotion {
        id: EmotionId::Angry,
        display_name: "Angry",
        stroke: 0xef4444ff,
        fill: 0xef444433,
    },
    Emotion {
        id: EmotionId::Tired,
        display_name: "Tired",
        stroke: 0xa855f7ff,
        fill: 0xa855f733,
    },
    Emotion {
        id: EmotionId::Excited,
        display_name: "Excited",
        stroke: 0xf97316ff,
        fill: 0xf9731633,
    },
    Emotion {
        id: EmotionId::Scared,
        display_name: "Scared",
        stroke: 0x6366f1ff,
        fill: 0x6366f133,
    },
];

/// Look up the catalog entry for an emotion id.
pub fn emotion(id: EmotionId) -> &'static Emotion {
    // EMOTIONS is laid out in EmotionId::ALL order.
    &EMOTIONS[id as usize]
}

/// Kind of a marker token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    /// `<effect=NNNN>`: a sound effect cue.
    Effect,
    /// `<s=N>`: a timed silence.
    Silence,
}

impl MarkerKind {
    /// Recognize the shape of a marker literal.
    ///
    /// Only used for styling and logging. Insertion never depends on it: any token
    /// offered as a drag payload is inserted verbatim.
    pub fn classify(tag: &str) -> Option<Self> {
        let inner = tag.strip_prefix('<')?.strip_suffix('>')?;
        let (name, value) = inner.split_once('=')?;
        if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        match name {
            "effect" => Some(MarkerKind::Effect),
            "s" => Some(MarkerKind::Silence),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Effect => "effect",
            MarkerKind::Silence => "silence",
        }
    }
}

/// A draggable marker offered in the palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerToken {
    pub label: SmolStr,
    pub tag: SmolStr,
    pub kind: MarkerKind,
}

impl MarkerToken {
    /// A sound effect marker, `<effect=id>`.
    pub fn effect(label: impl Into<SmolStr>, id: u32) -> Self {
        Self {
            label: label.into(),
            tag: format_smolstr!("<effect={}>", id),
            kind: MarkerKind::Effect,
        }
    }

    /// A silence marker, `<s=seconds>`.
    pub fn silence(seconds: u32) -> Self {
        Self {
            label: format_smolstr!("{}s", seconds),
            tag: format_smolstr!("<s={}>", seconds),
            kind: MarkerKind::Silence,
        }
    }
}

/// The built-in marker palette: six effects and two silences.
pub fn default_markers() -> Vec<MarkerToken> {
    let mut markers: Vec<MarkerToken> = (1..=6)
        .map(|n| MarkerToken::effect(format_smolstr!("SFX #{}", n), 1000 + n))
        .collect();
    markers.push(MarkerToken::silence(5));
    markers.push(MarkerToken::silence(10));
    markers
}

/// Script loaded into a fresh editor.
pub const EXAMPLE_SCRIPT: &str = "『歡迎收聽今天的播客，我是你的主持人，今天我們要講述一個關於貪心與分享的故事』

從前有一個國王，他擁有全天下最多的禮物，卻一點也不快樂。他的心中似乎總是缺少了什麼。直到有一天，他遇到了一位拼被人。

拼被人擁有一床美麗的拼被，國王想要得到它，卻遭到了拒絕。<angry>國王非常生氣，決定懲罰拼被人</angry>。

他把拼被人送到深山，想讓大熊吃掉他，但大熊卻邀請拼被人共進早餐。國王又把拼被人送到小島，結果被一群麻雀救回。

國王無奈，只好答應拼被人的要求，把皇宮裡的禮物送給別人。於是，國王開始了他的分享之旅。

他先送出一顆彈珠，得到小男孩燦爛的微笑。又送出一些衣服，讓窮人在街上展示。<happy>國王的心情逐漸變得愉快</happy>。

接著，國王把自己的馬當作旋轉木馬，讓小朋友們玩得開心。<happy>這時，國王終於露出了笑容</happy>。

國王開始四處旅行，將所有的禮物送給最需要的人。他的心裡感到充實與滿足。

雖然他的皇袍破爛，鞋子也露出腳趾，但他的眼中充滿了光彩。<excited>他的笑聲如雷，寶物變成了世界各地的微笑</excited>。

最後，拼被人織了一床世界上最美麗的拼被給國王。國王披上它，感受到無與倫比的幸福。

這個故事告訴我們，真正的快樂來自於分享，而不是佔有。樂善好施，才是真正的幸福之道。

今天的故事就到這裡，謝謝你的收聽。我們下次再見。";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_order_matches_ids() {
        for id in EmotionId::ALL {
            assert_eq!(emotion(id).id, id);
        }
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(EmotionId::Happy.open_tag(), "<happy>");
        assert_eq!(EmotionId::Scared.close_tag(), "</scared>");
        assert_eq!(EmotionId::Sad.wrap("Hello"), "<sad>Hello</sad>");
    }

    #[test]
    fn test_from_str_only_accepts_catalog_ids() {
        assert_eq!("angry".parse::<EmotionId>().ok(), Some(EmotionId::Angry));
        assert!("Angry".parse::<EmotionId>().is_err());
        assert!("joyful".parse::<EmotionId>().is_err());
        assert_eq!(EmotionId::from_tag_name(""), None);
    }

    #[test]
    fn test_default_markers() {
        let markers = default_markers();
        assert_eq!(markers.len(), 8);
        assert_eq!(markers[0].label, "SFX #1");
        assert_eq!(markers[0].tag, "<effect=1001>");
        assert_eq!(markers[5].tag, "<effect=1006>");
        assert_eq!(markers[6].tag, "<s=5>");
        assert_eq!(markers[7].label, "10s");
        assert_eq!(markers[7].kind, MarkerKind::Silence);
    }

    #[test]
    fn test_classify_marker() {
        assert_eq!(MarkerKind::classify("<effect=1001>"), Some(MarkerKind::Effect));
        assert_eq!(MarkerKind::classify("<s=10>"), Some(MarkerKind::Silence));
        // Shapes outside the grammar are still insertable, just unclassified.
        assert_eq!(MarkerKind::classify("<effect=>"), None);
        assert_eq!(MarkerKind::classify("<s=ten>"), None);
        assert_eq!(MarkerKind::classify("<happy>"), None);
    }

    #[test]
    fn test_serde_ids_are_lowercase() {
        let json = serde_json::to_string(&EmotionId::Excited).unwrap();
        assert_eq!(json, "\"excited\"");
        let marker: MarkerToken =
            serde_json::from_str(r#"{"label":"Door","tag":"<effect=2001>","kind":"effect"}"#)
                .unwrap();
        assert_eq!(marker.kind, MarkerKind::Effect);
    }
}
