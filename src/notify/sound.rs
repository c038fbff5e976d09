//! Transition sound plans per profile.
//!
//! A plan describes what to play; turning it into audio is left to the
//! platform's audio backend.

use std::fmt;

use crate::db::ConnectivityState;
use crate::settings::SoundProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

/// One oscillator segment, frequency swept from `start_hz` to `end_hz`.
#[derive(Debug, Clone, PartialEq)]
pub struct Tone {
    pub waveform: Waveform,
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration_ms: u32,
    pub gain: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SoundPlan {
    Tones(Vec<Tone>),
    Speech {
        text: &'static str,
        rate: f32,
        pitch: f32,
        volume: f32,
    },
}

impl fmt::Display for SoundPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SoundPlan::Speech { text, .. } => write!(f, "say {:?}", text),
            SoundPlan::Tones(tones) => {
                let total: u32 = tones.iter().map(|t| t.duration_ms).sum();
                write!(f, "{} tone(s), {}ms", tones.len(), total)
            }
        }
    }
}

fn tone(waveform: Waveform, start_hz: f32, end_hz: f32, duration_ms: u32, gain: f32) -> Tone {
    Tone {
        waveform,
        start_hz,
        end_hz,
        duration_ms,
        gain,
    }
}

pub fn plan(profile: SoundProfile, sound: ConnectivityState, volume: f64) -> SoundPlan {
    use ConnectivityState::*;
    use Waveform::*;

    let volume = volume.clamp(0.0, 1.0) as f32;

    let tones = match (profile, sound) {
        (SoundProfile::Voice, _) => {
            let (text, rate, pitch) = match sound {
                Online => ("Internet Connection Restored", 1.1, 1.1),
                Offline => ("Internet Connection Lost", 1.2, 0.9),
                LanNoInternet => ("Warning: No Internet Access", 1.1, 1.0),
            };
            return SoundPlan::Speech { text, rate, pitch, volume };
        }

        (SoundProfile::Beep, Online) => vec![tone(Sine, 440.0, 880.0, 500, 0.3)],
        (SoundProfile::Beep, Offline) => vec![tone(Sawtooth, 150.0, 100.0, 500, 0.3)],
        (SoundProfile::Beep, LanNoInternet) => vec![
            tone(Square, 300.0, 300.0, 100, 0.2),
            tone(Square, 300.0, 300.0, 100, 0.0),
            tone(Square, 300.0, 300.0, 100, 0.2),
        ],

        (SoundProfile::Futuristic, Online) => vec![tone(Sine, 220.0, 1200.0, 600, 0.5)],
        (SoundProfile::Futuristic, Offline) => vec![tone(Triangle, 800.0, 50.0, 400, 0.5)],
        (SoundProfile::Futuristic, LanNoInternet) => vec![tone(Sawtooth, 400.0, 450.0, 200, 0.3)],

        (SoundProfile::EightBit, Online) => vec![
            tone(Square, 660.0, 660.0, 100, 0.1),
            tone(Square, 1320.0, 1320.0, 110, 0.1),
        ],
        (SoundProfile::EightBit, Offline) => vec![tone(Triangle, 440.0, 110.0, 300, 0.2)],
        (SoundProfile::EightBit, LanNoInternet) => vec![tone(Sawtooth, 150.0, 150.0, 100, 0.2)],

        (SoundProfile::Soft, Online) => vec![tone(Sine, 523.25, 523.25, 1000, 0.4)],
        (SoundProfile::Soft, Offline) => vec![tone(Sine, 392.0, 196.0, 800, 0.4)],
        (SoundProfile::Soft, LanNoInternet) => vec![tone(Triangle, 440.0, 440.0, 400, 0.2)],
    };

    SoundPlan::Tones(
        tones
            .into_iter()
            .map(|t| Tone {
                gain: t.gain * volume,
                ..t
            })
            .collect(),
    )
}
