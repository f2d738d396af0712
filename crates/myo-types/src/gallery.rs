//! Motion class gallery.
//!
//! The console shows one slide per motion class and one manual-control
//! button per class. Both are built from a small CSV resource:
//!
//! ```text
//! # Lines starting with '#' are comments
//! class,image,title
//! No Movement,img_arm_motions/No_Movement.png
//! Hand Open,img_grasps/Hand_Open.png
//! Wrist Rotate In,img_arm_motions/Wrist_Rotate_In.png,Wrist Rotate In (Pronate)
//! ```
//!
//! The first non-comment line is the header and must name the `class` and
//! `image` columns. An optional `title` column overrides the slide caption.

use std::io;
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::control;
use crate::error::{ParseError, ParseResult};
use crate::message::Message;

/// Display metadata for one motion class image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GalleryEntry {
    /// Class name sent to the controller.
    pub class: String,
    /// Caption shown under the slide.
    pub title: String,
    /// Image location, relative to the console page.
    pub href: String,
    /// Image media type, derived from the file extension.
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub media_type: String,
    /// Thumbnail location (the image itself).
    pub thumbnail: String,
}

impl GalleryEntry {
    /// Build an entry from a class name and image path.
    pub fn new(class: impl Into<String>, image: impl Into<String>) -> Self {
        let class = class.into();
        let href = image.into();
        Self {
            title: class.clone(),
            media_type: media_type_for(&href).to_string(),
            thumbnail: href.clone(),
            href,
            class,
        }
    }

    /// Override the caption.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// `Cls:<class>`, sent when this slide is shown.
    pub fn class_command(&self) -> Message {
        control::class_selection(&self.class)
    }

    /// `Man:<class>`, sent by this class's manual button.
    pub fn manual_command(&self) -> Message {
        control::manual(&self.class)
    }
}

/// Media type for an image path, from its extension.
pub fn media_type_for(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

/// The loaded gallery, in slide order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gallery {
    entries: Vec<GalleryEntry>,
}

impl Gallery {
    pub fn new(entries: Vec<GalleryEntry>) -> Self {
        Self { entries }
    }

    /// Parse gallery CSV from any reader.
    pub fn from_reader<R: io::Read>(reader: R) -> ParseResult<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers().map_err(csv_error)?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
        };
        let (Some(class_col), Some(image_col)) = (column("class"), column("image")) else {
            return Err(ParseError::Gallery {
                line: headers.position().map_or(0, |p| p.line()),
                message: format!(
                    "header must name 'class' and 'image' columns, got '{}'",
                    headers.iter().collect::<Vec<_>>().join(",")
                ),
            });
        };
        let title_col = column("title");

        let mut entries = Vec::new();
        for record in csv.records() {
            let record = record.map_err(csv_error)?;
            let line = record.position().map_or(0, |p| p.line());
            let field = |col: usize| record.get(col).unwrap_or("");

            // Blank rows are skipped
            if record.iter().all(str::is_empty) {
                continue;
            }

            let class = field(class_col);
            let image = field(image_col);
            if class.is_empty() || image.is_empty() {
                return Err(ParseError::Gallery {
                    line,
                    message: "row needs both a class and an image".to_string(),
                });
            }

            let mut entry = GalleryEntry::new(class, image);
            if let Some(title) = title_col.map(field).filter(|t| !t.is_empty()) {
                entry = entry.with_title(title);
            }
            entries.push(entry);
        }

        tracing::debug!(count = entries.len(), "Loaded gallery");
        Ok(Self { entries })
    }

    /// Parse gallery CSV text.
    pub fn parse_str(text: &str) -> ParseResult<Self> {
        Self::from_reader(text.as_bytes())
    }

    /// Load gallery CSV from a file.
    pub fn from_path(path: impl AsRef<Path>) -> ParseResult<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| ParseError::Gallery {
            line: 0,
            message: format!("{}: {}", path.display(), e),
        })?;
        Self::from_reader(io::BufReader::new(file))
    }

    pub fn entries(&self) -> &[GalleryEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &GalleryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Class names in slide order.
    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.class.as_str())
    }

    /// The `Cls:` command for a slide index. Out-of-range slides send nothing.
    pub fn slide_command(&self, index: usize) -> Option<Message> {
        self.entries.get(index).map(GalleryEntry::class_command)
    }

    /// `(class, Man:<class>)` for every manual-control button.
    pub fn manual_commands(&self) -> impl Iterator<Item = (&str, Message)> {
        self.entries
            .iter()
            .map(|e| (e.class.as_str(), e.manual_command()))
    }
}

fn csv_error(err: csv::Error) -> ParseError {
    ParseError::Gallery {
        line: err.position().map_or(0, |p| p.line()),
        message: err.to_string(),
    }
}
