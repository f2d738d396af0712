//! Commands the operator console sends to the controller.
//!
//! Every control on the console maps to exactly one [`Message`]. Buttons and
//! switches produce `Cmd:` messages, assessments carry their parameters in a
//! dash-separated `Cmd:` payload, and the remaining controls use the `Cls`,
//! `Man`, `Log` and `Time` tags.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ParseError;
use crate::message::{CommandTag, Message};

/// Momentary buttons that send a fixed `Cmd:` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Button {
    Add,
    Stop,
    ClearClass,
    ClearAll,
    Train,
    Save,
    Backup,
    SpeedUp,
    SpeedDown,
    HandSpeedUp,
    HandSpeedDown,
    Pause,
    PauseHand,
    RestartMyo1,
    RestartMyo2,
    ChangeMyoSet1,
    ChangeMyoSet2,
    ReloadRoc,
    Reboot,
    Shutdown,
}

impl Button {
    /// Every button, in console layout order.
    pub const ALL: [Button; 20] = [
        Button::Add,
        Button::Stop,
        Button::ClearClass,
        Button::ClearAll,
        Button::Train,
        Button::Save,
        Button::Backup,
        Button::SpeedUp,
        Button::SpeedDown,
        Button::HandSpeedUp,
        Button::HandSpeedDown,
        Button::Pause,
        Button::PauseHand,
        Button::RestartMyo1,
        Button::RestartMyo2,
        Button::ChangeMyoSet1,
        Button::ChangeMyoSet2,
        Button::ReloadRoc,
        Button::Reboot,
        Button::Shutdown,
    ];

    /// The command word sent after `Cmd:`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Button::Add => "Add",
            Button::Stop => "Stop",
            Button::ClearClass => "ClearClass",
            Button::ClearAll => "ClearAll",
            Button::Train => "Train",
            Button::Save => "Save",
            Button::Backup => "Backup",
            Button::SpeedUp => "SpeedUp",
            Button::SpeedDown => "SpeedDown",
            Button::HandSpeedUp => "HandSpeedUp",
            Button::HandSpeedDown => "HandSpeedDown",
            Button::Pause => "Pause",
            Button::PauseHand => "PauseHand",
            Button::RestartMyo1 => "RestartMyo1",
            Button::RestartMyo2 => "RestartMyo2",
            Button::ChangeMyoSet1 => "ChangeMyoSet1",
            Button::ChangeMyoSet2 => "ChangeMyoSet2",
            Button::ReloadRoc => "ReloadRoc",
            Button::Reboot => "Reboot",
            Button::Shutdown => "Shutdown",
        }
    }

    /// Id of the button element on the console page.
    pub fn element_id(&self) -> &'static str {
        match self {
            Button::Add => "ID_ADD",
            Button::Stop => "ID_STOP",
            Button::ClearClass => "ID_CLEARCLASS",
            Button::ClearAll => "ID_CLEARALL",
            Button::Train => "ID_TRAIN",
            Button::Save => "ID_SAVE",
            Button::Backup => "ID_BACKUP",
            Button::SpeedUp => "ID_SPEEDUP",
            Button::SpeedDown => "ID_SPEEDDOWN",
            Button::HandSpeedUp => "ID_HAND_SPEED_UP",
            Button::HandSpeedDown => "ID_HAND_SPEED_DOWN",
            Button::Pause => "ID_PAUSE",
            Button::PauseHand => "ID_PAUSE_HAND",
            Button::RestartMyo1 => "ID_MYO1",
            Button::RestartMyo2 => "ID_MYO2",
            Button::ChangeMyoSet1 => "ID_SELECT_MYO_SET_1",
            Button::ChangeMyoSet2 => "ID_SELECT_MYO_SET_2",
            Button::ReloadRoc => "ID_RELOAD_ROC",
            Button::Reboot => "ID_REBOOT",
            Button::Shutdown => "ID_SHUTDOWN",
        }
    }

    pub fn command(&self) -> Message {
        Message::command(CommandTag::Cmd, self.as_str())
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Button {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Button::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| ParseError::InvalidValue(format!("unknown button '{s}'")))
    }
}

/// Two-state switches. Each state sends its own `Cmd:` word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Switch {
    /// Record training data (`Add`) or stop (`Stop`).
    Train,
    PrecisionMode,
    PauseAll,
    PauseHand,
    AutoSave,
}

impl Switch {
    pub const ALL: [Switch; 5] = [
        Switch::Train,
        Switch::PrecisionMode,
        Switch::PauseAll,
        Switch::PauseHand,
        Switch::AutoSave,
    ];

    /// Id of the switch element on the console page.
    pub fn element_id(&self) -> &'static str {
        match self {
            Switch::Train => "trainSwitch",
            Switch::PrecisionMode => "precisionMode",
            Switch::PauseAll => "pauseAll",
            Switch::PauseHand => "pauseHand",
            Switch::AutoSave => "autoSave",
        }
    }

    /// The command word for a switch position.
    pub fn word(&self, on: bool) -> &'static str {
        match (self, on) {
            (Switch::Train, true) => "Add",
            (Switch::Train, false) => "Stop",
            (Switch::PrecisionMode, true) => "PrecisionModeOn",
            (Switch::PrecisionMode, false) => "PrecisionModeOff",
            (Switch::PauseAll, true) => "PauseAllOn",
            (Switch::PauseAll, false) => "PauseAllOff",
            (Switch::PauseHand, true) => "PauseHandOn",
            (Switch::PauseHand, false) => "PauseHandOff",
            (Switch::AutoSave, true) => "AutoSaveOn",
            (Switch::AutoSave, false) => "AutoSaveOff",
        }
    }

    pub fn command(&self, on: bool) -> Message {
        Message::command(CommandTag::Cmd, self.word(on))
    }
}

/// Motion tester assessment parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MotionTesterParams {
    /// Times each trained class is assessed.
    pub repetitions: u32,
    /// Seconds allowed per class.
    pub timeout: f64,
    /// Correct classifications required to pass a class.
    pub max_classifications: u32,
}

impl Default for MotionTesterParams {
    fn default() -> Self {
        Self {
            repetitions: 3,
            timeout: 5.0,
            max_classifications: 10,
        }
    }
}

impl MotionTesterParams {
    /// `Cmd:StartMotionTester-<reps>-<timeout>-<max>`
    pub fn command(&self) -> Message {
        Message::command(
            CommandTag::Cmd,
            format!(
                "StartMotionTester-{}-{}-{}",
                self.repetitions, self.timeout, self.max_classifications
            ),
        )
    }
}

/// Target achievement control variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TacVariant {
    /// Single-joint targets.
    Tac1,
    /// Three-joint targets.
    Tac3,
}

impl TacVariant {
    fn word(&self) -> &'static str {
        match self {
            TacVariant::Tac1 => "StartTAC1",
            TacVariant::Tac3 => "StartTAC3",
        }
    }
}

/// Target achievement control assessment parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TacParams {
    /// Repetitions per joint.
    pub repetitions: u32,
    /// Seconds before a target is failed.
    pub timeout: f64,
    /// Seconds the limb must stay inside the target.
    pub dwell_time: f64,
    /// Allowed error for degree-based joints.
    pub degree_error: f64,
    /// Allowed error for percent-based grasps.
    pub grasp_error: f64,
}

impl Default for TacParams {
    fn default() -> Self {
        Self {
            repetitions: 2,
            timeout: 45.0,
            dwell_time: 2.0,
            degree_error: 5.0,
            grasp_error: 5.0,
        }
    }
}

impl TacParams {
    /// `Cmd:StartTAC{1,3}-<reps>-<timeout>-<dwell>-<degErr>-<graspErr>`
    pub fn command(&self, variant: TacVariant) -> Message {
        Message::command(
            CommandTag::Cmd,
            format!(
                "{}-{}-{}-{}-{}-{}",
                variant.word(),
                self.repetitions,
                self.timeout,
                self.dwell_time,
                self.degree_error,
                self.grasp_error
            ),
        )
    }
}

/// Select the class being trained (`Cls:<class>`).
pub fn class_selection(class: &str) -> Message {
    Message::command(CommandTag::Cls, class)
}

/// Drive a motion class manually (`Man:<class>`).
pub fn manual(class: &str) -> Message {
    Message::command(CommandTag::Man, class)
}

/// Append an operator note to the controller log (`Log:<text>`).
pub fn log_entry(text: &str) -> Message {
    Message::command(CommandTag::Log, text)
}

/// Clock synchronisation sent when the console connects (`Time:<unix ms>`).
pub fn time_sync(unix_millis: i64) -> Message {
    Message::command(CommandTag::Time, unix_millis.to_string())
}

/// [`time_sync`] for a timestamp.
pub fn time_sync_at(at: OffsetDateTime) -> Message {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    time_sync(millis as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_commands() {
        assert_eq!(Button::Add.command().encode(), "Cmd:Add");
        assert_eq!(Button::HandSpeedDown.command().encode(), "Cmd:HandSpeedDown");
        assert_eq!(Button::RestartMyo2.command().encode(), "Cmd:RestartMyo2");
        assert_eq!(Button::Shutdown.element_id(), "ID_SHUTDOWN");
    }

    #[test]
    fn test_button_parse() {
        for button in Button::ALL {
            assert_eq!(button.as_str().parse::<Button>().unwrap(), button);
        }
        assert!("Explode".parse::<Button>().is_err());
    }

    #[test]
    fn test_switch_words() {
        assert_eq!(Switch::Train.command(true).encode(), "Cmd:Add");
        assert_eq!(Switch::Train.command(false).encode(), "Cmd:Stop");
        assert_eq!(
            Switch::PrecisionMode.command(true).encode(),
            "Cmd:PrecisionModeOn"
        );
        assert_eq!(Switch::AutoSave.command(false).encode(), "Cmd:AutoSaveOff");
    }

    #[test]
    fn test_motion_tester_command() {
        let params = MotionTesterParams {
            repetitions: 2,
            timeout: 4.5,
            max_classifications: 20,
        };
        assert_eq!(params.command().encode(), "Cmd:StartMotionTester-2-4.5-20");
        assert_eq!(
            MotionTesterParams::default().command().encode(),
            "Cmd:StartMotionTester-3-5-10"
        );
    }

    #[test]
    fn test_tac_commands() {
        let params = TacParams::default();
        assert_eq!(
            params.command(TacVariant::Tac1).encode(),
            "Cmd:StartTAC1-2-45-2-5-5"
        );
        assert_eq!(
            params.command(TacVariant::Tac3).payload(),
            "StartTAC3-2-45-2-5-5"
        );
    }

    #[test]
    fn test_free_text_commands() {
        assert_eq!(class_selection("Hand Open").encode(), "Cls:Hand Open");
        assert_eq!(manual("Elbow Flexion").encode(), "Man:Elbow Flexion");
        assert_eq!(log_entry("note: test").encode(), "Log:note: test");
    }

    #[test]
    fn test_time_sync() {
        assert_eq!(time_sync(1_700_000_000_123).encode(), "Time:1700000000123");

        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        assert_eq!(time_sync_at(at).payload(), "1700000000000");
    }
}
