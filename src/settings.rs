//! Filter parameters and the discrete adjustment commands.
//!
//! [`FilterSettings`] captures the three bounded parameters of the
//! purple-black filter in a JSON-friendly form that can be shown to users,
//! persisted by an embedding transport, or sent between processes.
//! [`AdjustmentCommand`] is the fixed six-command vocabulary a transport maps
//! onto inline buttons; each command nudges one parameter by half a step and
//! clamps at the range boundary.
//!
//! # Example
//!
//! ```
//! use plum_engine::{AdjustmentCommand, FilterSettings};
//!
//! let settings = FilterSettings::default();
//! let nudged = AdjustmentCommand::PurpleUp.apply_to(settings);
//! assert_eq!(nudged.purple, 1.5);
//!
//! // Round-trip through JSON for the embedding transport
//! let json = nudged.to_json().unwrap();
//! let restored = FilterSettings::from_json(&json).unwrap();
//! assert_eq!(restored, nudged);
//! ```

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

// ============================================================================
// FilterSettings
// ============================================================================

/// The three bounded parameters of the purple-black filter.
///
/// Every stored value lies inside its closed range; constructors and
/// deserialization clamp out-of-range input rather than rejecting it. All
/// values reachable through [`AdjustmentCommand`] are multiples of 0.5 and
/// exactly representable, so settings compare with plain `==`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct FilterSettings {
    /// Purple push intensity (0.0–4.0).
    #[serde(default = "default_level")]
    pub purple: f32,

    /// Shadow crush intensity (0.0–4.0).
    #[serde(default = "default_level")]
    pub black: f32,

    /// Contrast factor (0.0–3.0); 1.0 leaves contrast unchanged.
    #[serde(default = "default_level")]
    pub contrast: f32,
}

impl FilterSettings {
    /// Inclusive range for the purple intensity.
    pub const PURPLE_RANGE: RangeInclusive<f32> = 0.0..=4.0;

    /// Inclusive range for the black intensity.
    pub const BLACK_RANGE: RangeInclusive<f32> = 0.0..=4.0;

    /// Inclusive range for the contrast factor.
    pub const CONTRAST_RANGE: RangeInclusive<f32> = 0.0..=3.0;

    /// Step applied by each adjustment command.
    pub const STEP: f32 = 0.5;

    /// Creates settings with each value clamped to its range.
    pub fn new(purple: f32, black: f32, contrast: f32) -> Self {
        Self {
            purple,
            black,
            contrast,
        }
        .clamped()
    }

    /// Returns a copy with every value clamped to its range.
    pub fn clamped(self) -> Self {
        Self {
            purple: clamp_to(self.purple, &Self::PURPLE_RANGE),
            black: clamp_to(self.black, &Self::BLACK_RANGE),
            contrast: clamp_to(self.contrast, &Self::CONTRAST_RANGE),
        }
    }

    /// Serializes the settings to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes settings from a JSON string.
    ///
    /// Missing fields take their defaults; out-of-range values are clamped.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(json).map(Self::clamped)
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            purple: default_level(),
            black: default_level(),
            contrast: default_level(),
        }
    }
}

fn default_level() -> f32 {
    1.0
}

fn clamp_to(value: f32, range: &RangeInclusive<f32>) -> f32 {
    value.clamp(*range.start(), *range.end())
}

// ============================================================================
// AdjustmentCommand
// ============================================================================

/// One of the six discrete parameter nudges a user can request.
///
/// The wire names (serde and [`callback_data`](Self::callback_data)) are the
/// snake_case identifiers a transport embeds in its button payloads:
/// `purple_up`, `purple_down`, `black_up`, `black_down`, `contrast_up`,
/// `contrast_down`. No other command values exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub enum AdjustmentCommand {
    PurpleUp,
    PurpleDown,
    BlackUp,
    BlackDown,
    ContrastUp,
    ContrastDown,
}

impl AdjustmentCommand {
    /// The full control set, in the order transports lay buttons out.
    pub const ALL: [Self; 6] = [
        Self::PurpleUp,
        Self::PurpleDown,
        Self::BlackUp,
        Self::BlackDown,
        Self::ContrastUp,
        Self::ContrastDown,
    ];

    /// The stable identifier embedded in button callback payloads.
    pub fn callback_data(self) -> &'static str {
        match self {
            Self::PurpleUp => "purple_up",
            Self::PurpleDown => "purple_down",
            Self::BlackUp => "black_up",
            Self::BlackDown => "black_down",
            Self::ContrastUp => "contrast_up",
            Self::ContrastDown => "contrast_down",
        }
    }

    /// Parses a callback payload back into a command.
    ///
    /// Returns `None` for anything outside the six known identifiers.
    pub fn from_callback_data(data: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmd| cmd.callback_data() == data)
    }

    /// Applies this command's half-step nudge to the settings.
    ///
    /// The touched value clamps at its range boundary; a command pushing
    /// against a boundary already at its limit returns the settings
    /// unchanged, which callers detect with `==`.
    pub fn apply_to(self, settings: FilterSettings) -> FilterSettings {
        let step = FilterSettings::STEP;
        let mut next = settings;
        match self {
            Self::PurpleUp => {
                next.purple = clamp_to(next.purple + step, &FilterSettings::PURPLE_RANGE);
            }
            Self::PurpleDown => {
                next.purple = clamp_to(next.purple - step, &FilterSettings::PURPLE_RANGE);
            }
            Self::BlackUp => {
                next.black = clamp_to(next.black + step, &FilterSettings::BLACK_RANGE);
            }
            Self::BlackDown => {
                next.black = clamp_to(next.black - step, &FilterSettings::BLACK_RANGE);
            }
            Self::ContrastUp => {
                next.contrast = clamp_to(next.contrast + step, &FilterSettings::CONTRAST_RANGE);
            }
            Self::ContrastDown => {
                next.contrast = clamp_to(next.contrast - step, &FilterSettings::CONTRAST_RANGE);
            }
        }
        next
    }
}

// ============================================================================
// Tests
// ============================================================================
