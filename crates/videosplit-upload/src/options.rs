//! Split parameters sent with every upload

use std::fmt;
use std::str::FromStr;

use crate::error::UploadError;

pub const MIN_SEGMENT_SECS: u32 = 1;
pub const MAX_SEGMENT_SECS: u32 = 3600;

/// Target frame shape for cropping. `None` on `SplitOptions` keeps the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Landscape,
    Classic,
    Square,
    Portrait,
    Cinema,
    Custom { width: u32, height: u32 },
}

impl AspectRatio {
    /// Wire value of the `aspect_ratio` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Classic => "4:3",
            AspectRatio::Square => "1:1",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Cinema => "21:9",
            AspectRatio::Custom { .. } => "custom",
        }
    }

    /// Build from a config value; `custom` needs both dimensions.
    pub fn from_parts(
        name: &str,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<Self, UploadError> {
        if name.trim().eq_ignore_ascii_case("custom") {
            return match (width, height) {
                (Some(width), Some(height)) if width > 0 && height > 0 => {
                    Ok(AspectRatio::Custom { width, height })
                }
                _ => Err(UploadError::Validation(
                    "custom aspect ratio requires width and height".into(),
                )),
            };
        }
        name.parse()
    }
}

impl FromStr for AspectRatio {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "16:9" => Ok(AspectRatio::Landscape),
            "4:3" => Ok(AspectRatio::Classic),
            "1:1" => Ok(AspectRatio::Square),
            "9:16" => Ok(AspectRatio::Portrait),
            "21:9" => Ok(AspectRatio::Cinema),
            other => Err(UploadError::Validation(format!(
                "invalid aspect_ratio '{other}'"
            ))),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AspectRatio::Custom { width, height } => write!(f, "custom ({width}x{height})"),
            preset => f.write_str(preset.as_str()),
        }
    }
}

/// Which part of the frame survives a crop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CropPosition {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
}

impl CropPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            CropPosition::Center => "center",
            CropPosition::Top => "top",
            CropPosition::Bottom => "bottom",
            CropPosition::Left => "left",
            CropPosition::Right => "right",
        }
    }
}

impl FromStr for CropPosition {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "center" => Ok(CropPosition::Center),
            "top" => Ok(CropPosition::Top),
            "bottom" => Ok(CropPosition::Bottom),
            "left" => Ok(CropPosition::Left),
            "right" => Ok(CropPosition::Right),
            other => Err(UploadError::Validation(format!(
                "invalid crop_position '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitOptions {
    /// Segment length in seconds
    pub segment_duration: u32,
    pub aspect_ratio: Option<AspectRatio>,
    pub crop_position: CropPosition,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            segment_duration: 60,
            aspect_ratio: None,
            crop_position: CropPosition::Center,
        }
    }
}

impl SplitOptions {
    pub fn validate(&self) -> Result<(), UploadError> {
        if !(MIN_SEGMENT_SECS..=MAX_SEGMENT_SECS).contains(&self.segment_duration) {
            return Err(UploadError::Validation(format!(
                "segment_duration must be between {MIN_SEGMENT_SECS} and {MAX_SEGMENT_SECS} seconds, got {}",
                self.segment_duration
            )));
        }
        if let Some(AspectRatio::Custom { width, height }) = self.aspect_ratio {
            if width == 0 || height == 0 {
                return Err(UploadError::Validation(
                    "custom aspect ratio requires width and height".into(),
                ));
            }
        }
        Ok(())
    }

    /// Form fields sent next to the file, in wire order.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = Vec::with_capacity(4);
        if let Some(ratio) = self.aspect_ratio {
            fields.push(("aspect_ratio", ratio.as_str().to_owned()));
        }
        fields.push(("crop_position", self.crop_position.as_str().to_owned()));
        if let Some(AspectRatio::Custom { width, height }) = self.aspect_ratio {
            fields.push(("custom_width", width.to_string()));
            fields.push(("custom_height", height.to_string()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_valid() {
        let options = SplitOptions::default();
        options.validate().unwrap();
        assert_eq!(options.form_fields(), [("crop_position", "center".to_string())]);
    }

    #[test]
    fn segment_duration_bounds() {
        for secs in [0, 3601] {
            let options = SplitOptions {
                segment_duration: secs,
                ..SplitOptions::default()
            };
            assert!(options.validate().is_err(), "{secs}");
        }
        for secs in [1, 3600] {
            let options = SplitOptions {
                segment_duration: secs,
                ..SplitOptions::default()
            };
            options.validate().unwrap();
        }
    }

    #[test]
    fn presets_parse_and_round_trip_wire_value() {
        for wire in ["16:9", "4:3", "1:1", "9:16", "21:9"] {
            let ratio: AspectRatio = wire.parse().unwrap();
            assert_eq!(ratio.as_str(), wire);
        }
        assert!("3:2".parse::<AspectRatio>().is_err());
    }

    #[test]
    fn custom_ratio_needs_both_dimensions() {
        assert_eq!(
            AspectRatio::from_parts("custom", Some(1080), Some(1350)).unwrap(),
            AspectRatio::Custom {
                width: 1080,
                height: 1350
            }
        );
        assert!(AspectRatio::from_parts("custom", Some(1080), None).is_err());
        assert!(AspectRatio::from_parts("custom", Some(0), Some(10)).is_err());
        assert_eq!(
            AspectRatio::from_parts("9:16", None, None).unwrap(),
            AspectRatio::Portrait
        );
    }

    #[test]
    fn custom_ratio_sends_dimensions() {
        let options = SplitOptions {
            segment_duration: 30,
            aspect_ratio: Some(AspectRatio::Custom {
                width: 720,
                height: 900,
            }),
            crop_position: CropPosition::Top,
        };
        assert_eq!(
            options.form_fields(),
            [
                ("aspect_ratio", "custom".to_string()),
                ("crop_position", "top".to_string()),
                ("custom_width", "720".to_string()),
                ("custom_height", "900".to_string()),
            ]
        );
    }

    #[test]
    fn crop_position_parse() {
        assert_eq!("LEFT".parse::<CropPosition>().unwrap(), CropPosition::Left);
        assert!("middle".parse::<CropPosition>().is_err());
    }
}
