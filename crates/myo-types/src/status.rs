//! Status message dispatch for the operator console.
//!
//! The controller reports progress with `str*` tagged messages. Each
//! registered tag maps to one update routine that writes into console
//! elements through a [`ConsoleView`]. Tags outside the table are ignored.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Number of joints shown by the target achievement control panel.
pub const TAC_JOINTS: u8 = 3;

/// Element ids written by the dispatch routines.
pub mod ids {
    pub const MSG_STATUS: &str = "msg_status";
    pub const MSG_STATUS2: &str = "msg_status2";
    pub const MSG_TRAIN: &str = "msg_train";
    pub const MAIN_OUTPUT: &str = "main_output";
    pub const MT_OUTPUT: &str = "mt_output";
    pub const TAC_OUTPUT: &str = "tac_output";
    pub const MT_STATUS: &str = "mt_status";
    pub const MT_PROGRESS_BAR: &str = "mtProgressBar";
    pub const MT_PROGRESS_LABEL: &str = "mtProgressLabel";
    pub const MT_IMAGE: &str = "ID_MT_IMAGE";
    pub const TAC_STATUS: &str = "tac_status";

    /// `tacJoint{n}Name`
    pub fn tac_joint_name(joint: u8) -> String {
        format!("tacJoint{joint}Name")
    }

    /// `tacJoint{n}Bar`
    pub fn tac_joint_bar(joint: u8) -> String {
        format!("tacJoint{joint}Bar")
    }

    /// `tacJoint{n}Label`
    pub fn tac_joint_label(joint: u8) -> String {
        format!("tacJoint{joint}Label")
    }

    /// `tacJoint{n}Target`
    pub fn tac_joint_target(joint: u8) -> String {
        format!("tacJoint{joint}Target")
    }
}

/// The console surface status routines write into.
///
/// Implemented over the DOM in the browser and by [`ConsoleState`] in memory.
pub trait ConsoleView {
    /// Replace the text content of an element.
    fn set_text(&mut self, id: &str, text: &str);

    /// Replace the inner HTML of an element.
    fn set_html(&mut self, id: &str, html: &str);

    /// Set an inline style property (CSS property name, e.g. `margin-left`).
    fn set_style(&mut self, id: &str, property: &str, value: &str);

    /// Read an inline style property.
    fn style(&self, id: &str, property: &str) -> Option<String>;

    /// Replace an image element's source.
    fn set_image(&mut self, id: &str, src: &str);
}

/// Which part of a TAC joint row a message updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum JointField {
    Name,
    Bar,
    Target,
    Error,
}

impl JointField {
    fn as_str(&self) -> &'static str {
        match self {
            JointField::Name => "Name",
            JointField::Bar => "Bar",
            JointField::Target => "Target",
            JointField::Error => "Error",
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "Name" => Some(JointField::Name),
            "Bar" => Some(JointField::Bar),
            "Target" => Some(JointField::Target),
            "Error" => Some(JointField::Error),
            _ => None,
        }
    }
}

/// A registered status tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StatusTag {
    /// `strStatus`: system status banner (HTML).
    Status,
    /// `strTrainingMotion`: class currently being trained.
    TrainingMotion,
    /// `strOutputMotion`: classifier decision.
    OutputMotion,
    /// `strMotionTester`: motion tester status line.
    MotionTester,
    /// `strMotionTesterProgress`: motion tester completion percent.
    MotionTesterProgress,
    /// `strMotionTesterImage`: image of the class under test.
    MotionTesterImage,
    /// `strTAC`: TAC status line.
    Tac,
    /// `strTACJoint{n}{field}` for joints `1..=3`.
    TacJoint { joint: u8, field: JointField },
}

const TAC_JOINT_PREFIX: &str = "strTACJoint";

impl StatusTag {
    /// Look a wire tag up in the dispatch table.
    ///
    /// ```
    /// use myo_types::status::{JointField, StatusTag};
    ///
    /// assert_eq!(StatusTag::from_tag("strTAC"), Some(StatusTag::Tac));
    /// assert_eq!(
    ///     StatusTag::from_tag("strTACJoint2Bar"),
    ///     Some(StatusTag::TacJoint { joint: 2, field: JointField::Bar })
    /// );
    /// assert_eq!(StatusTag::from_tag("strTACJoint4Bar"), None);
    /// assert_eq!(StatusTag::from_tag("Cls"), None);
    /// ```
    pub fn from_tag(tag: &str) -> Option<Self> {
        let fixed = match tag {
            "strStatus" => StatusTag::Status,
            "strTrainingMotion" => StatusTag::TrainingMotion,
            "strOutputMotion" => StatusTag::OutputMotion,
            "strMotionTester" => StatusTag::MotionTester,
            "strMotionTesterProgress" => StatusTag::MotionTesterProgress,
            "strMotionTesterImage" => StatusTag::MotionTesterImage,
            "strTAC" => StatusTag::Tac,
            _ => return Self::parse_joint(tag),
        };
        Some(fixed)
    }

    fn parse_joint(tag: &str) -> Option<Self> {
        let rest = tag.strip_prefix(TAC_JOINT_PREFIX)?;
        let mut chars = rest.chars();
        let joint = chars.next()?.to_digit(10)? as u8;
        if !(1..=TAC_JOINTS).contains(&joint) {
            return None;
        }
        let field = JointField::from_suffix(chars.as_str())?;
        Some(StatusTag::TacJoint { joint, field })
    }

    /// Wire spelling of the tag.
    pub fn to_tag(&self) -> String {
        match self {
            StatusTag::Status => "strStatus".to_string(),
            StatusTag::TrainingMotion => "strTrainingMotion".to_string(),
            StatusTag::OutputMotion => "strOutputMotion".to_string(),
            StatusTag::MotionTester => "strMotionTester".to_string(),
            StatusTag::MotionTesterProgress => "strMotionTesterProgress".to_string(),
            StatusTag::MotionTesterImage => "strMotionTesterImage".to_string(),
            StatusTag::Tac => "strTAC".to_string(),
            StatusTag::TacJoint { joint, field } => {
                format!("{TAC_JOINT_PREFIX}{joint}{}", field.as_str())
            }
        }
    }

    /// Build a status message carrying `payload`.
    pub fn message(&self, payload: impl Into<String>) -> Message {
        Message::new(self.to_tag(), payload)
    }

    /// Apply this routine to a view.
    ///
    /// Returns `false` when a numeric routine received a payload that is not
    /// a number; the view is left untouched in that case.
    pub fn apply<V: ConsoleView + ?Sized>(&self, view: &mut V, payload: &str) -> bool {
        match *self {
            StatusTag::Status => {
                view.set_html(ids::MSG_STATUS, payload);
                view.set_html(ids::MSG_STATUS2, payload);
            }
            StatusTag::TrainingMotion => view.set_text(ids::MSG_TRAIN, payload),
            StatusTag::OutputMotion => {
                view.set_text(ids::MAIN_OUTPUT, payload);
                view.set_text(ids::MT_OUTPUT, payload);
                view.set_text(ids::TAC_OUTPUT, payload);
            }
            StatusTag::MotionTester => view.set_text(ids::MT_STATUS, payload),
            StatusTag::MotionTesterProgress => {
                let Some(percent) = parse_number(payload) else {
                    return false;
                };
                view.set_style(ids::MT_PROGRESS_BAR, "width", &percent_string(percent));
                view.set_text(ids::MT_PROGRESS_LABEL, &percent_string(percent));
            }
            StatusTag::MotionTesterImage => view.set_image(ids::MT_IMAGE, payload),
            StatusTag::Tac => view.set_text(ids::TAC_STATUS, payload),
            StatusTag::TacJoint { joint, field } => {
                return apply_joint(view, joint, field, payload);
            }
        }
        true
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_tag())
    }
}

fn apply_joint<V: ConsoleView + ?Sized>(
    view: &mut V,
    joint: u8,
    field: JointField,
    payload: &str,
) -> bool {
    if field == JointField::Name {
        view.set_text(&ids::tac_joint_name(joint), payload);
        return true;
    }

    let Some(value) = parse_number(payload) else {
        return false;
    };

    let target = ids::tac_joint_target(joint);
    match field {
        JointField::Bar => {
            // The bar marker is 5% wide; centre it on the value
            view.set_style(
                &ids::tac_joint_bar(joint),
                "margin-left",
                &percent_string(value - 2.5),
            );
            view.set_text(&ids::tac_joint_label(joint), &js_round(value).to_string());
        }
        JointField::Target => {
            let half_width = view
                .style(&target, "width")
                .and_then(|w| parse_number(w.trim_end_matches('%')))
                .unwrap_or(0.0)
                / 2.0;
            view.set_style(&target, "margin-left", &percent_string(value - half_width));
        }
        JointField::Error | JointField::Name => {
            view.set_style(&target, "width", &percent_string(value * 2.0));
        }
    }
    true
}

fn parse_number(raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            tracing::debug!(payload = raw, "Ignoring non-numeric status payload");
            None
        }
    }
}

fn percent_string(value: f64) -> String {
    format!("{value}%")
}

/// Round half up, matching how browsers round label values.
fn js_round(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// Dispatch one decoded status message.
///
/// Returns `true` if a registered routine updated the view. Unknown tags
/// perform no mutation.
///
/// ```
/// use myo_types::status::{dispatch, ConsoleState};
///
/// let mut state = ConsoleState::new();
/// assert!(dispatch(&mut state, "strTrainingMotion", "Hand Open"));
/// assert_eq!(state.text("msg_train"), Some("Hand Open"));
///
/// assert!(!dispatch(&mut state, "strUnknown", "ignored"));
/// ```
pub fn dispatch<V: ConsoleView + ?Sized>(view: &mut V, tag: &str, payload: &str) -> bool {
    match StatusTag::from_tag(tag) {
        Some(routine) => routine.apply(view, payload),
        None => false,
    }
}

/// Dispatch a raw status frame.
pub fn dispatch_frame<V: ConsoleView + ?Sized>(view: &mut V, raw: &str) -> bool {
    let msg = crate::message::decode(raw);
    dispatch(view, msg.tag(), msg.payload())
}

/// Recorded state of one console element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementState {
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub text: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub html: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub image: Option<String>,
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "BTreeMap::is_empty"))]
    pub style: BTreeMap<String, String>,
}

/// In-memory console view.
///
/// Records the last value written to each element, keyed by element id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConsoleState {
    elements: BTreeMap<String, ElementState>,
}

impl ConsoleState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of a single element, if anything was written to it.
    pub fn element(&self, id: &str) -> Option<&ElementState> {
        self.elements.get(id)
    }

    /// All written elements.
    pub fn elements(&self) -> &BTreeMap<String, ElementState> {
        &self.elements
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.element(id)?.text.as_deref()
    }

    pub fn html(&self, id: &str) -> Option<&str> {
        self.element(id)?.html.as_deref()
    }

    pub fn image(&self, id: &str) -> Option<&str> {
        self.element(id)?.image.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn entry(&mut self, id: &str) -> &mut ElementState {
        self.elements.entry(id.to_string()).or_default()
    }
}

impl ConsoleView for ConsoleState {
    fn set_text(&mut self, id: &str, text: &str) {
        self.entry(id).text = Some(text.to_string());
    }

    fn set_html(&mut self, id: &str, html: &str) {
        self.entry(id).html = Some(html.to_string());
    }

    fn set_style(&mut self, id: &str, property: &str, value: &str) {
        self.entry(id)
            .style
            .insert(property.to_string(), value.to_string());
    }

    fn style(&self, id: &str, property: &str) -> Option<String> {
        self.element(id)?.style.get(property).cloned()
    }

    fn set_image(&mut self, id: &str, src: &str) {
        self.entry(id).image = Some(src.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style(state: &ConsoleState, id: &str, property: &str) -> Option<String> {
        ConsoleView::style(state, id, property)
    }

    #[test]
    fn test_unknown_tag_is_ignored() {
        let mut state = ConsoleState::new();
        assert!(!dispatch(&mut state, "strNotRegistered", "value"));
        assert!(!dispatch(&mut state, "Cls", "Hand Open"));
        assert!(!dispatch(&mut state, "", ""));
        assert!(state.is_empty());
    }

    #[test]
    fn test_status_writes_both_banners() {
        let mut state = ConsoleState::new();
        assert!(dispatch(&mut state, "strStatus", "<b>Running</b>"));
        assert_eq!(state.html(ids::MSG_STATUS), Some("<b>Running</b>"));
        assert_eq!(state.html(ids::MSG_STATUS2), Some("<b>Running</b>"));
    }

    #[test]
    fn test_output_motion_writes_all_outputs() {
        let mut state = ConsoleState::new();
        dispatch(&mut state, "strOutputMotion", "Elbow Flexion");
        for id in [ids::MAIN_OUTPUT, ids::MT_OUTPUT, ids::TAC_OUTPUT] {
            assert_eq!(state.text(id), Some("Elbow Flexion"));
        }
    }

    #[test]
    fn test_motion_tester_progress() {
        let mut state = ConsoleState::new();
        assert!(dispatch(&mut state, "strMotionTesterProgress", "40"));
        assert_eq!(
            style(&state, ids::MT_PROGRESS_BAR, "width").as_deref(),
            Some("40%")
        );
        assert_eq!(state.text(ids::MT_PROGRESS_LABEL), Some("40%"));
    }

    #[test]
    fn test_non_numeric_payload_is_ignored() {
        let mut state = ConsoleState::new();
        assert!(!dispatch(&mut state, "strMotionTesterProgress", "lots"));
        assert!(!dispatch(&mut state, "strTACJoint1Bar", ""));
        assert!(!dispatch(&mut state, "strTACJoint1Error", "NaN"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_motion_tester_image() {
        let mut state = ConsoleState::new();
        dispatch(&mut state, "strMotionTesterImage", "img_grasps/Hand_Open.png");
        assert_eq!(state.image(ids::MT_IMAGE), Some("img_grasps/Hand_Open.png"));
    }

    #[test]
    fn test_tac_joint_bar() {
        let mut state = ConsoleState::new();
        dispatch(&mut state, "strTACJoint2Bar", "42.5");
        assert_eq!(
            style(&state, "tacJoint2Bar", "margin-left").as_deref(),
            Some("40%")
        );
        assert_eq!(state.text("tacJoint2Label"), Some("43"));
    }

    #[test]
    fn test_tac_joint_target_uses_error_width() {
        let mut state = ConsoleState::new();
        dispatch(&mut state, "strTACJoint1Error", "5");
        assert_eq!(
            style(&state, "tacJoint1Target", "width").as_deref(),
            Some("10%")
        );

        dispatch(&mut state, "strTACJoint1Target", "45");
        assert_eq!(
            style(&state, "tacJoint1Target", "margin-left").as_deref(),
            Some("40%")
        );
    }

    #[test]
    fn test_tac_joint_target_without_width() {
        let mut state = ConsoleState::new();
        dispatch(&mut state, "strTACJoint3Target", "45");
        assert_eq!(
            style(&state, "tacJoint3Target", "margin-left").as_deref(),
            Some("45%")
        );
    }

    #[test]
    fn test_tac_joint_name_and_status() {
        let mut state = ConsoleState::new();
        dispatch(&mut state, "strTACJoint3Name", "Wrist Rotate");
        dispatch(&mut state, "strTAC", "Target 2 of 5");
        assert_eq!(state.text("tacJoint3Name"), Some("Wrist Rotate"));
        assert_eq!(state.text(ids::TAC_STATUS), Some("Target 2 of 5"));
    }

    #[test]
    fn test_joint_tags_out_of_range() {
        assert_eq!(StatusTag::from_tag("strTACJoint0Name"), None);
        assert_eq!(StatusTag::from_tag("strTACJoint4Name"), None);
        assert_eq!(StatusTag::from_tag("strTACJoint1Speed"), None);
        assert_eq!(StatusTag::from_tag("strTACJoint"), None);
    }

    #[test]
    fn test_tag_spelling_round_trips() {
        let mut tags = vec![
            StatusTag::Status,
            StatusTag::TrainingMotion,
            StatusTag::OutputMotion,
            StatusTag::MotionTester,
            StatusTag::MotionTesterProgress,
            StatusTag::MotionTesterImage,
            StatusTag::Tac,
        ];
        for joint in 1..=TAC_JOINTS {
            for field in [
                JointField::Name,
                JointField::Bar,
                JointField::Target,
                JointField::Error,
            ] {
                tags.push(StatusTag::TacJoint { joint, field });
            }
        }
        assert_eq!(tags.len(), 19);
        for tag in tags {
            assert_eq!(StatusTag::from_tag(&tag.to_tag()), Some(tag));
        }
    }

    #[test]
    fn test_dispatch_frame() {
        let mut state = ConsoleState::new();
        assert!(dispatch_frame(&mut state, "strMotionTester:Elbow Flexion 3/5"));
        assert_eq!(state.text(ids::MT_STATUS), Some("Elbow Flexion 3/5"));
        // No delimiter: the whole frame is the tag and the payload is empty
        assert!(dispatch_frame(&mut state, "strMotionTester"));
        assert_eq!(state.text(ids::MT_STATUS), Some(""));
    }

    #[test]
    fn test_status_message_builder() {
        let msg = StatusTag::TacJoint {
            joint: 1,
            field: JointField::Target,
        }
        .message("45");
        assert_eq!(msg.encode(), "strTACJoint1Target:45");
    }

    #[test]
    fn test_js_round() {
        assert_eq!(js_round(2.5), 3);
        assert_eq!(js_round(-2.5), -2);
        assert_eq!(js_round(42.4), 42);
    }
}
