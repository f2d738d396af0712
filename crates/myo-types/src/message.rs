//! Text wire protocol shared by the console and the controller.
//!
//! Every frame is a newline-free UTF-8 string of the form `<Tag>:<Payload>`.
//! Only the first `:` separates the tag; the payload may contain further
//! colons. Commands (`Cmd`, `Man`, `Cls`, `Log`, `Time`) flow from the
//! console to the controller, status tags (`str*`) flow back.
//!
//! # Example
//!
//! ```
//! use myo_types::message::{Message, decode, encode};
//!
//! assert_eq!(encode("Cls", "Hand Open"), "Cls:Hand Open");
//!
//! let msg = decode("strTACJoint1Target:45");
//! assert_eq!(msg.tag(), "strTACJoint1Target");
//! assert_eq!(msg.payload(), "45");
//!
//! // A frame without a delimiter is all tag
//! let msg = decode("NoColonHere");
//! assert_eq!(msg.tag(), "NoColonHere");
//! assert_eq!(msg.payload(), "");
//! assert_eq!(msg.encode(), "NoColonHere");
//! ```

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Separator between tag and payload.
pub const DELIMITER: char = ':';

/// Encode a tag and payload into a wire frame.
pub fn encode(tag: &str, payload: &str) -> String {
    let mut frame = String::with_capacity(tag.len() + 1 + payload.len());
    frame.push_str(tag);
    frame.push(DELIMITER);
    frame.push_str(payload);
    frame
}

/// Decode a wire frame, splitting on the first `:`.
///
/// Never fails: a frame with no delimiter decodes to a tag spanning the
/// whole string and an empty payload.
pub fn decode(raw: &str) -> Message {
    match raw.split_once(DELIMITER) {
        Some((tag, payload)) => Message {
            tag: tag.to_string(),
            payload: Some(payload.to_string()),
        },
        None => Message {
            tag: raw.to_string(),
            payload: None,
        },
    }
}

/// A single tagged frame.
///
/// The message remembers whether the frame it was decoded from carried a
/// delimiter, so `decode(s).encode() == s` for every input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Message {
    tag: String,
    payload: Option<String>,
}

impl Message {
    /// Create a message from a tag and payload.
    pub fn new(tag: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            payload: Some(payload.into()),
        }
    }

    /// Create a command message with a known tag.
    pub fn command(tag: CommandTag, payload: impl Into<String>) -> Self {
        Self::new(tag.as_str(), payload)
    }

    /// The tag (text before the first `:`).
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The payload (text after the first `:`), empty when absent.
    pub fn payload(&self) -> &str {
        self.payload.as_deref().unwrap_or("")
    }

    /// Whether the source frame contained a delimiter.
    pub fn is_delimited(&self) -> bool {
        self.payload.is_some()
    }

    /// The tag as a console command, if it is one.
    pub fn command_tag(&self) -> Option<CommandTag> {
        self.tag.parse().ok()
    }

    /// Split into owned `(tag, payload)`.
    pub fn into_parts(self) -> (String, String) {
        (self.tag, self.payload.unwrap_or_default())
    }

    /// Serialize back into a wire frame.
    pub fn encode(&self) -> String {
        match &self.payload {
            Some(payload) => encode(&self.tag, payload),
            None => self.tag.clone(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)?;
        if let Some(payload) = &self.payload {
            write!(f, "{}{}", DELIMITER, payload)?;
        }
        Ok(())
    }
}

impl From<&str> for Message {
    fn from(raw: &str) -> Self {
        decode(raw)
    }
}

/// Tags of messages sent from the console to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CommandTag {
    /// Training, assessment, and system commands.
    Cmd,
    /// Manual motion-class control.
    Man,
    /// Training class selection.
    Cls,
    /// Operator log entry.
    Log,
    /// Browser clock (Unix milliseconds).
    Time,
}

impl CommandTag {
    /// All command tags.
    pub const ALL: [CommandTag; 5] = [
        CommandTag::Cmd,
        CommandTag::Man,
        CommandTag::Cls,
        CommandTag::Log,
        CommandTag::Time,
    ];

    /// Wire spelling of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandTag::Cmd => "Cmd",
            CommandTag::Man => "Man",
            CommandTag::Cls => "Cls",
            CommandTag::Log => "Log",
            CommandTag::Time => "Time",
        }
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a tag is not one of the console command tags.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized tag '{0}'")]
pub struct UnrecognizedTag(pub String);

impl FromStr for CommandTag {
    type Err = UnrecognizedTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| UnrecognizedTag(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_class_selection() {
        let msg = decode("Cls:Hand Open");
        assert_eq!(msg.tag(), "Cls");
        assert_eq!(msg.payload(), "Hand Open");
        assert_eq!(msg.command_tag(), Some(CommandTag::Cls));
    }

    #[test]
    fn test_decode_joint_target() {
        let msg = decode("strTACJoint1Target:45");
        assert_eq!(
            msg.into_parts(),
            ("strTACJoint1Target".to_string(), "45".to_string())
        );
    }

    #[test]
    fn test_decode_without_delimiter() {
        let msg = decode("NoColonHere");
        assert_eq!(msg.tag(), "NoColonHere");
        assert_eq!(msg.payload(), "");
        assert!(!msg.is_delimited());
        assert_eq!(msg.command_tag(), None);
    }

    #[test]
    fn test_decode_splits_on_first_colon_only() {
        let msg = decode("Log:note: elbow 12:30");
        assert_eq!(msg.tag(), "Log");
        assert_eq!(msg.payload(), "note: elbow 12:30");
    }

    #[test]
    fn test_decode_empty_payload_and_tag() {
        let msg = decode("Cmd:");
        assert_eq!(msg.tag(), "Cmd");
        assert_eq!(msg.payload(), "");
        assert!(msg.is_delimited());
        assert_eq!(msg.encode(), "Cmd:");

        let msg = decode(":orphan");
        assert_eq!(msg.tag(), "");
        assert_eq!(msg.payload(), "orphan");
    }

    #[test]
    fn test_message_display_matches_encode() {
        let msg = Message::command(CommandTag::Cmd, "Train");
        assert_eq!(msg.to_string(), "Cmd:Train");
        assert_eq!(msg.encode(), "Cmd:Train");
    }

    #[test]
    fn test_command_tag_parse() {
        for tag in CommandTag::ALL {
            assert_eq!(tag.as_str().parse::<CommandTag>(), Ok(tag));
        }
        let err = "strStatus".parse::<CommandTag>().unwrap_err();
        assert_eq!(err.to_string(), "unrecognized tag 'strStatus'");
        // Tags are case-sensitive on the wire
        assert!("cmd".parse::<CommandTag>().is_err());
    }
}
