//! User settings: probe target, poll interval, sound and icon options.
//!
//! A [`Settings`] value is an immutable snapshot. Updates arrive as a
//! [`SettingsPatch`] (every field optional) that is merged onto the prior
//! snapshot to produce a new one, which is then swapped in wholesale.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PROBE_URL: &str = "https://www.google.com/generate_204";
pub const DEFAULT_POLL_INTERVAL_MILLIS: u64 = 2000;

/// Lower bound for the scheduler period.
pub const MIN_POLL_INTERVAL_MILLIS: u64 = 1000;

/// Named probe endpoints that can be picked instead of a custom URL.
pub const PROBE_PRESETS: &[(&str, &str)] = &[
    ("google", DEFAULT_PROBE_URL),
    ("cloudflare", "https://1.1.1.1"),
    ("baidu", "https://www.baidu.com"),
];

pub fn preset_url(name: &str) -> Option<&'static str> {
    PROBE_PRESETS
        .iter()
        .find(|(preset, _)| *preset == name)
        .map(|(_, url)| *url)
}

/// Sound style played by the surface on transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundProfile {
    #[default]
    Beep,
    Futuristic,
    #[serde(rename = "8bit")]
    EightBit,
    Soft,
    Voice,
}

impl SoundProfile {
    /// Parse a profile name, falling back to the default for unknown names.
    pub fn parse_lenient(name: &str) -> Self {
        match name {
            "futuristic" => Self::Futuristic,
            "8bit" => Self::EightBit,
            "soft" => Self::Soft,
            "voice" => Self::Voice,
            _ => Self::Beep,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beep => "beep",
            Self::Futuristic => "futuristic",
            Self::EightBit => "8bit",
            Self::Soft => "soft",
            Self::Voice => "voice",
        }
    }
}

/// Glyph set used when rendering the status icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IconTheme {
    #[default]
    Standard,
    Flat,
    House,
    WifiLine,
    WifiSolid,
    Traffic,
    Minimal,
}

impl IconTheme {
    pub fn parse_lenient(name: &str) -> Self {
        match name {
            "flat" => Self::Flat,
            "house" => Self::House,
            "wifiLine" => Self::WifiLine,
            "wifiSolid" => Self::WifiSolid,
            "traffic" => Self::Traffic,
            "minimal" => Self::Minimal,
            _ => Self::Standard,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Flat => "flat",
            Self::House => "house",
            Self::WifiLine => "wifiLine",
            Self::WifiSolid => "wifiSolid",
            Self::Traffic => "traffic",
            Self::Minimal => "minimal",
        }
    }
}

/// Immutable settings snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub probe_url: String,
    pub poll_interval_millis: u64,
    pub sound_enabled: bool,
    pub sound_profile: SoundProfile,
    pub icon_theme: IconTheme,
    pub volume: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            probe_url: DEFAULT_PROBE_URL.to_string(),
            poll_interval_millis: DEFAULT_POLL_INTERVAL_MILLIS,
            sound_enabled: true,
            sound_profile: SoundProfile::default(),
            icon_theme: IconTheme::default(),
            volume: 1.0,
        }
    }
}

impl Settings {
    /// Scheduler period, never shorter than [`MIN_POLL_INTERVAL_MILLIS`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis.max(MIN_POLL_INTERVAL_MILLIS))
    }

    /// Produce a new snapshot with every present field of `patch` applied.
    ///
    /// Only presence is checked: an empty URL or a zero interval is ignored,
    /// unknown enum names fall back to defaults, and volume is clamped.
    /// A known `preset` wins over `probe_url`; "custom" or an unknown preset
    /// leaves the URL to `probe_url`.
    pub fn merged(&self, patch: &SettingsPatch) -> Settings {
        let mut next = self.clone();

        let preset = patch.preset.as_deref().and_then(preset_url);
        if let Some(url) = preset.or(patch.probe_url.as_deref().filter(|u| !u.is_empty())) {
            next.probe_url = url.to_string();
        }
        if let Some(interval) = patch.poll_interval_millis.filter(|i| *i > 0) {
            next.poll_interval_millis = interval;
        }
        if let Some(enabled) = patch.sound_enabled {
            next.sound_enabled = enabled;
        }
        if let Some(profile) = &patch.sound_profile {
            next.sound_profile = SoundProfile::parse_lenient(profile);
        }
        if let Some(theme) = &patch.icon_theme {
            next.icon_theme = IconTheme::parse_lenient(theme);
        }
        if let Some(volume) = patch.volume.filter(|v| v.is_finite()) {
            next.volume = volume.clamp(0.0, 1.0);
        }

        next
    }
}

/// Partial settings as stored or submitted. Accepts the legacy key names.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, alias = "pingUrl", skip_serializing_if = "Option::is_none")]
    pub probe_url: Option<String>,
    #[serde(default, alias = "checkInterval", skip_serializing_if = "Option::is_none")]
    pub poll_interval_millis: Option<u64>,
    #[serde(default, alias = "playSounds", skip_serializing_if = "Option::is_none")]
    pub sound_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    /// Name from [`PROBE_PRESETS`], or "custom"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
}
