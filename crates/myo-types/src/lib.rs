//! Platform-agnostic types for the Myo armband bridge.
//!
//! This crate provides shared types that can be used by both the native
//! agent and console (myo-core, myo-console) and the browser front-end
//! (myo-web).
//!
//! # Features
//!
//! - BLE UUID table for Myo armbands
//! - EMG, IMU and battery sample decoding
//! - The `<Tag>:<Payload>` wire codec shared by console and controller
//! - Status dispatch into an abstract console view
//! - Typed console command builders and the motion class gallery
//!
//! # Example
//!
//! ```
//! use myo_types::{ConsoleState, control, dispatch, message};
//!
//! let cmd = control::class_selection("Hand Open");
//! assert_eq!(cmd.encode(), "Cls:Hand Open");
//!
//! let mut view = ConsoleState::new();
//! let status = message::decode("strOutputMotion:Hand Open");
//! dispatch(&mut view, status.tag(), status.payload());
//! assert_eq!(view.text("main_output"), Some("Hand Open"));
//! ```

pub mod control;
pub mod error;
pub mod gallery;
pub mod message;
pub mod status;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use gallery::{Gallery, GalleryEntry};
pub use message::{CommandTag, Message};
pub use status::{ConsoleState, ConsoleView, StatusTag, dispatch};
pub use types::{
    ArmbandService, ArmbandState, EmgPacket, FirmwareVersion, ImuSample, normalize_address,
    parse_battery,
};
pub use uuid as uuids;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_then_status_flow() {
        // A console command and the controller's reply use the same codec
        let cmd = control::Button::Train.command();
        assert_eq!(cmd.command_tag(), Some(CommandTag::Cmd));

        let reply = StatusTag::Status.message("Training complete");
        let decoded = message::decode(&reply.encode());
        let mut view = ConsoleState::new();
        assert!(dispatch(&mut view, decoded.tag(), decoded.payload()));
        assert_eq!(view.html("msg_status"), Some("Training complete"));
    }

    #[test]
    fn test_gallery_drives_class_commands() {
        let gallery = Gallery::parse_str("class,image\nRest,rest.png\nHand Open,open.png\n")
            .expect("valid gallery");
        let sent: Vec<String> = (0..gallery.len())
            .filter_map(|i| gallery.slide_command(i))
            .map(|m| m.encode())
            .collect();
        assert_eq!(sent, ["Cls:Rest", "Cls:Hand Open"]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_console_state_serializes() {
        let mut view = ConsoleState::new();
        dispatch(&mut view, "strMotionTesterProgress", "25");
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["elements"]["mtProgressBar"]["style"]["width"], "25%");
        assert_eq!(json["elements"]["mtProgressLabel"]["text"], "25%");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_armband_state_serde() {
        let json = serde_json::to_string(&ArmbandState::Ready).unwrap();
        assert_eq!(json, "\"ready\"");
        let state: ArmbandState = serde_json::from_str("\"disconnected\"").unwrap();
        assert_eq!(state, ArmbandState::Disconnected);
    }
}
