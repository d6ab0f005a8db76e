//! Popup, focus overlay and palette markup.
//!
//! Markup is built from the core view models as strings and dropped into host
//! elements wholesale. Clicks are routed back through `data-action` attributes, so
//! the host needs one delegated listener per host element.

use std::fmt::{self, Write};

use cuesheet_core::render::escape;
use cuesheet_core::view::{EmotionChoice, MarkerChip, emotion_legend, marker_chips};
use cuesheet_core::{EditorAction, EditorView, FocusOverlayView, MarkerToken, PopupView};
use web_sys::{Element, Event};

use crate::events::target_element;

/// Attribute naming the command a control triggers.
pub const ACTION_ATTR: &str = "data-action";
/// Attribute marking a popup container, valued `selection` or `hover`.
pub const POPUP_ATTR: &str = "data-popup";
/// Attribute holding a palette chip's marker tag.
pub const MARKER_ATTR: &str = "data-marker";

/// What a click on overlay chrome asks for.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayCommand {
    Action(EditorAction),
    /// Open or close the emotion submenu. Host-local, the editor never sees it.
    ToggleSubmenu,
}

/// Map a control's `data-action` (and `data-emotion`) to a command.
pub fn command_for(action: &str, emotion: Option<&str>) -> Option<OverlayCommand> {
    let emotion = || emotion.and_then(|e| e.parse().ok());
    let action = match action {
        "copy" => EditorAction::Copy,
        "cut" => EditorAction::Cut,
        "focus" => EditorAction::Focus,
        "apply-emotion" => EditorAction::ApplyEmotion(emotion()?),
        "change-emotion" => EditorAction::ChangeEmotion(emotion()?),
        "remove-emotion" => EditorAction::RemoveEmotion,
        "close-focus" => EditorAction::CloseFocus,
        "toggle-submenu" => return Some(OverlayCommand::ToggleSubmenu),
        _ => return None,
    };
    Some(OverlayCommand::Action(action))
}

/// Command for a click inside overlay chrome, if the click hit a control.
pub fn command_from_event(event: &Event) -> Option<OverlayCommand> {
    let target = event.target()?;
    let control = target_element(&target)?
        .closest(&format!("[{}]", ACTION_ATTR))
        .ok()??;
    let action = control.get_attribute(ACTION_ATTR)?;
    let emotion = control.get_attribute(cuesheet_core::EMOTION_ATTR);
    command_for(&action, emotion.as_deref())
}

/// Marker tag of the palette chip an event targets.
pub fn marker_from_event(event: &Event) -> Option<String> {
    let target = event.target()?;
    target_element(&target)?
        .closest(&format!("[{}]", MARKER_ATTR))
        .ok()??
        .get_attribute(MARKER_ATTR)
}

/// Popup and focus overlay markup for the current view.
pub fn overlay_html(view: &EditorView, submenu_open: bool) -> String {
    let mut out = String::new();
    let written = view
        .popup
        .as_ref()
        .map_or(Ok(()), |popup| write_popup(&mut out, popup, submenu_open))
        .and_then(|()| {
            view.overlay
                .as_ref()
                .map_or(Ok(()), |overlay| write_focus_overlay(&mut out, overlay))
        });
    if let Err(e) = written {
        tracing::error!(target: "cuesheet::overlay", "failed to build overlay: {}", e);
    }
    out
}

pub fn render_overlay(host: &Element, view: &EditorView, submenu_open: bool) {
    host.set_inner_html(&overlay_html(view, submenu_open));
}

fn write_popup(out: &mut String, popup: &PopupView, submenu_open: bool) -> fmt::Result {
    let placement = popup.placement();
    let kind = match popup {
        PopupView::Selection { .. } => "selection",
        PopupView::Hover { .. } => "hover",
    };
    write!(
        out,
        "<div class=\"cuesheet-popup\" {}=\"{}\" style=\"position:fixed;left:{}px;top:{}px;transform:translateX(-50%);z-index:50\">",
        POPUP_ATTR, kind, placement.x, placement.y
    )?;

    let choice_action = match popup {
        PopupView::Selection { .. } => {
            write_button(out, "copy", "Copy")?;
            write_button(out, "cut", "Cut")?;
            write_button(out, "toggle-submenu", "Emotion")?;
            write_button(out, "focus", "Focus")?;
            "apply-emotion"
        }
        PopupView::Hover { current, .. } => {
            let emotion = current.emotion();
            write!(
                out,
                "<span class=\"cuesheet-current\" style=\"color:{}\">{}</span>",
                cuesheet_core::color::Rgba(emotion.stroke),
                escape(emotion.display_name)
            )?;
            write_button(out, "toggle-submenu", "Change")?;
            write_button(out, "remove-emotion", "Remove")?;
            "change-emotion"
        }
    };

    if submenu_open {
        out.push_str("<div class=\"cuesheet-submenu\" role=\"menu\">");
        for choice in popup.emotion_choices() {
            write_choice(out, choice_action, &choice)?;
        }
        out.push_str("</div>");
    }
    out.push_str("</div>");
    Ok(())
}

fn write_button(out: &mut String, action: &str, label: &str) -> fmt::Result {
    write!(
        out,
        "<button type=\"button\" {}=\"{}\">{}</button>",
        ACTION_ATTR,
        action,
        escape(label)
    )
}

fn write_choice(out: &mut String, action: &str, choice: &EmotionChoice) -> fmt::Result {
    write!(
        out,
        "<button type=\"button\" role=\"menuitem\" {}=\"{}\" {}=\"{}\"",
        ACTION_ATTR,
        action,
        cuesheet_core::EMOTION_ATTR,
        choice.id
    )?;
    if choice.is_current {
        out.push_str(" aria-current=\"true\"");
    }
    write!(
        out,
        "><span class=\"cuesheet-swatch\" style=\"background-color:{}\"></span>{}</button>",
        choice.swatch,
        escape(choice.display_name)
    )
}

fn write_focus_overlay(out: &mut String, overlay: &FocusOverlayView) -> fmt::Result {
    let spot = overlay.spotlight;
    write!(
        out,
        "<div class=\"cuesheet-focus\" {}=\"close-focus\" style=\"position:fixed;inset:0;z-index:40\">",
        ACTION_ATTR
    )?;
    write!(
        out,
        "<div class=\"cuesheet-spotlight\" style=\"position:fixed;top:{}px;left:{}px;width:{}px;height:{}px;border-radius:8px;box-shadow:0 0 0 9999px rgba(0, 0, 0, 0.7);pointer-events:none\"></div>",
        spot.top, spot.left, spot.width, spot.height
    )?;
    write!(
        out,
        "<div class=\"cuesheet-focus-hint\" style=\"position:fixed;bottom:32px;left:50%;transform:translateX(-50%);pointer-events:none\">{}</div></div>",
        escape(overlay.hint)
    )
}

/// Palette markup: emotion legend, draggable marker chips and usage hints.
pub fn palette_html(markers: &[MarkerToken]) -> String {
    let mut out = String::new();
    if let Err(e) = write_palette(&mut out, markers) {
        tracing::error!(target: "cuesheet::overlay", "failed to build palette: {}", e);
    }
    out
}

pub fn render_palette(host: &Element, markers: &[MarkerToken]) {
    host.set_inner_html(&palette_html(markers));
}

fn write_palette(out: &mut String, markers: &[MarkerToken]) -> fmt::Result {
    out.push_str("<div class=\"cuesheet-palette\">");

    out.push_str("<section data-section=\"emotions\"><h3>Emotions</h3>");
    for entry in emotion_legend() {
        write!(
            out,
            "<span class=\"cuesheet-legend\" style=\"background-color:{};color:{}\">{}</span>",
            entry.background,
            entry.color,
            escape(entry.display_name)
        )?;
    }
    out.push_str("</section>");

    let (effects, silences) = marker_chips(markers);
    write_chip_group(out, "effects", "Sound effects", &effects)?;
    write_chip_group(out, "silences", "Silence", &silences)?;

    out.push_str("<section data-section=\"help\"><h3>How to use</h3><ul>");
    for hint in [
        "Select plain text to copy, cut, focus or tag it with an emotion.",
        "Hover a tagged span to change or remove its emotion.",
        "Drag a marker into the script to insert it at the drop point.",
    ] {
        write!(out, "<li>{}</li>", escape(hint))?;
    }
    out.push_str("</ul></section></div>");
    Ok(())
}

fn write_chip_group(out: &mut String, section: &str, title: &str, chips: &[MarkerChip<'_>]) -> fmt::Result {
    write!(out, "<section data-section=\"{}\"><h3>{}</h3>", section, escape(title))?;
    for chip in chips {
        write!(
            out,
            "<span class=\"cuesheet-marker\" draggable=\"true\" {}=\"{}\" title=\"{}\" style=\"background-color:{};border:1px solid {}\">{}</span>",
            MARKER_ATTR,
            escape(chip.tag),
            escape(chip.tag),
            chip.background,
            chip.border,
            escape(chip.label)
        )?;
    }
    out.push_str("</section>");
    Ok(())
}
