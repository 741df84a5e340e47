//! Timecode parsing and frame arithmetic.
//!
//! Timecodes are `HH:MM:SS:FF` strings counted at the nominal integer
//! timebase of a frame rate (non-drop-frame), so 29.97 fps material counts
//! 30 frames per timecode second. Wall-clock conversions (seconds, Premiere
//! ticks, rescaling between rates) use the exact rational rate.
//!
//! A run uses exactly one [`FrameRate`], passed explicitly to every call.

use std::fmt;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Premiere Pro's internal clock resolution (ticks per second).
pub const PPRO_TICKS_PER_SECOND: u64 = 254_016_000_000;

/// Errors produced by the timecode engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimecodeError {
    #[error("malformed timecode '{value}': {reason}")]
    Malformed { value: String, reason: String },

    #[error("out point (frame {out_frames}) is before in point (frame {in_frames})")]
    InvalidRange { in_frames: u64, out_frames: u64 },

    #[error("invalid frame rate '{value}'")]
    InvalidFrameRate { value: String },
}

/// A frame rate expressed as a reduced rational `num/den` frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrameRate {
    num: u32,
    den: u32,
}

impl FrameRate {
    pub const FPS_24: Self = Self { num: 24, den: 1 };
    pub const FPS_25: Self = Self { num: 25, den: 1 };
    pub const FPS_30: Self = Self { num: 30, den: 1 };
    pub const FPS_60: Self = Self { num: 60, den: 1 };
    pub const NTSC_24: Self = Self {
        num: 24000,
        den: 1001,
    };
    pub const NTSC_30: Self = Self {
        num: 30000,
        den: 1001,
    };
    pub const NTSC_60: Self = Self {
        num: 60000,
        den: 1001,
    };

    /// Create a rate from a numerator and denominator, reducing the fraction.
    pub fn new(num: u32, den: u32) -> Result<Self, TimecodeError> {
        let invalid = || TimecodeError::InvalidFrameRate {
            value: format!("{num}/{den}"),
        };
        if num == 0 || den == 0 {
            return Err(invalid());
        }
        let divisor = gcd(u64::from(num), u64::from(den)) as u32;
        let rate = Self {
            num: num / divisor,
            den: den / divisor,
        };
        if rate.timebase() == 0 {
            return Err(invalid());
        }
        Ok(rate)
    }

    /// Rate from an XMEML-style `timebase` + `ntsc` pair.
    pub fn from_timebase(timebase: u32, ntsc: bool) -> Result<Self, TimecodeError> {
        if ntsc {
            let num = timebase
                .checked_mul(1000)
                .ok_or_else(|| TimecodeError::InvalidFrameRate {
                    value: format!("{timebase} (ntsc)"),
                })?;
            Self::new(num, 1001)
        } else {
            Self::new(timebase, 1)
        }
    }

    pub fn numerator(self) -> u32 {
        self.num
    }

    pub fn denominator(self) -> u32 {
        self.den
    }

    /// Nominal integer frames per timecode second (30 for 29.97).
    pub fn timebase(self) -> u32 {
        ((u64::from(self.num) + u64::from(self.den) / 2) / u64::from(self.den)) as u32
    }

    /// Whether this is a 1000/1001 pulled-down rate.
    pub fn is_ntsc(self) -> bool {
        self.den == 1001
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

impl FromStr for FrameRate {
    type Err = TimecodeError;

    /// Accepts `"30"`, `"30000/1001"`, and the usual decimal spellings
    /// of NTSC rates (`"29.97"`, `"23.976"`, `"59.94"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || TimecodeError::InvalidFrameRate {
            value: s.to_string(),
        };

        if let Some((num, den)) = s.split_once('/') {
            let num = num.trim().parse().map_err(|_| invalid())?;
            let den = den.trim().parse().map_err(|_| invalid())?;
            return Self::new(num, den).map_err(|_| invalid());
        }

        if let Ok(whole) = s.parse::<u32>() {
            return Self::new(whole, 1).map_err(|_| invalid());
        }

        let value: f64 = s.parse().map_err(|_| invalid())?;
        if !value.is_finite() || value <= 0.0 || value > f64::from(u32::MAX / 1000) {
            return Err(invalid());
        }
        let nominal = value.round();
        if (value - nominal).abs() < 1e-9 {
            return Self::new(nominal as u32, 1).map_err(|_| invalid());
        }
        if (value - nominal * 1000.0 / 1001.0).abs() < 0.01 {
            return Self::from_timebase(nominal as u32, true).map_err(|_| invalid());
        }
        Err(invalid())
    }
}

impl TryFrom<String> for FrameRate {
    type Error = TimecodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FrameRate> for String {
    fn from(rate: FrameRate) -> Self {
        rate.to_string()
    }
}

/// A position or length on a timeline, as an integer frame count.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timecode(u64);

impl Timecode {
    pub const ZERO: Self = Self(0);

    pub const fn from_frames(frames: u64) -> Self {
        Self(frames)
    }

    pub const fn to_frames(self) -> u64 {
        self.0
    }

    /// Parse `HH:MM:SS:FF` at the given rate.
    ///
    /// Minutes and seconds are exactly two digits; hours and frames are at
    /// least two. Minutes/seconds must be below 60 and frames below the
    /// rate's timebase.
    pub fn parse(text: &str, rate: FrameRate) -> Result<Self, TimecodeError> {
        let value = text.trim();
        let malformed = |reason: String| TimecodeError::Malformed {
            value: value.to_string(),
            reason,
        };

        let fields: Vec<&str> = value.split(':').collect();
        if fields.len() != 4 {
            return Err(malformed("expected HH:MM:SS:FF".to_string()));
        }
        for (i, field) in fields.iter().enumerate() {
            let width_ok = match i {
                1 | 2 => field.len() == 2,
                _ => field.len() >= 2,
            };
            if !width_ok || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed("expected HH:MM:SS:FF".to_string()));
            }
        }

        let number = |field: &str| -> Result<u64, TimecodeError> {
            field
                .parse::<u64>()
                .map_err(|_| malformed(format!("'{field}' is out of range")))
        };
        let hours = number(fields[0])?;
        let minutes = number(fields[1])?;
        let seconds = number(fields[2])?;
        let frames = number(fields[3])?;

        if minutes >= 60 {
            return Err(malformed(format!("minutes {minutes} must be below 60")));
        }
        if seconds >= 60 {
            return Err(malformed(format!("seconds {seconds} must be below 60")));
        }
        let timebase = u64::from(rate.timebase());
        if frames >= timebase {
            return Err(malformed(format!(
                "frame {frames} must be below the timebase {timebase}"
            )));
        }

        hours
            .checked_mul(3600)
            .and_then(|secs| secs.checked_add(minutes * 60 + seconds))
            .and_then(|secs| secs.checked_mul(timebase))
            .and_then(|total| total.checked_add(frames))
            .map(Self)
            .ok_or_else(|| malformed("hours out of range".to_string()))
    }

    /// Canonical zero-padded `HH:MM:SS:FF` form.
    pub fn format(self, rate: FrameRate) -> String {
        let timebase = u64::from(rate.timebase());
        let frames = self.0 % timebase;
        let total_secs = self.0 / timebase;
        format!(
            "{:02}:{:02}:{:02}:{:02}",
            total_secs / 3600,
            (total_secs / 60) % 60,
            total_secs % 60,
            frames
        )
    }

    /// Nearest frame to a wall-clock duration. Negative or non-finite
    /// input maps to zero.
    pub fn from_seconds(secs: f64, rate: FrameRate) -> Self {
        if !secs.is_finite() || secs <= 0.0 {
            return Self::ZERO;
        }
        Self((secs * f64::from(rate.num) / f64::from(rate.den)).round() as u64)
    }

    /// Wall-clock seconds at the exact rate.
    pub fn seconds(self, rate: FrameRate) -> f64 {
        self.0 as f64 * f64::from(rate.den) / f64::from(rate.num)
    }

    /// Position in Premiere ticks (truncated).
    pub fn ppro_ticks(self, rate: FrameRate) -> u64 {
        let ticks = u128::from(self.0) * u128::from(PPRO_TICKS_PER_SECOND) * u128::from(rate.den)
            / u128::from(rate.num);
        ticks as u64
    }

    /// Re-express this frame count at another rate, rounding to the
    /// nearest frame. Returns the converted value and its rounding error
    /// in target frames (`0.0` when the conversion is exact).
    pub fn rescale(self, from: FrameRate, to: FrameRate) -> (Self, f64) {
        if from == to {
            return (self, 0.0);
        }
        let numerator = u128::from(self.0) * u128::from(to.num) * u128::from(from.den);
        let denominator = u128::from(from.num) * u128::from(to.den);
        let quotient = numerator / denominator;
        let remainder = numerator % denominator;
        if remainder * 2 >= denominator {
            let error = (denominator - remainder) as f64 / denominator as f64;
            (Self(quotient as u64 + 1), error)
        } else {
            (Self(quotient as u64), remainder as f64 / denominator as f64)
        }
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl Add for Timecode {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Timecode {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

/// Length of the span `[in_point, out_point)`.
pub fn duration(in_point: Timecode, out_point: Timecode) -> Result<Timecode, TimecodeError> {
    out_point
        .checked_sub(in_point)
        .ok_or(TimecodeError::InvalidRange {
            in_frames: in_point.to_frames(),
            out_frames: out_point.to_frames(),
        })
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_counts_nominal_timebase() {
        let tc = Timecode::parse("00:00:29:07", FrameRate::FPS_30).unwrap();
        assert_eq!(tc.to_frames(), 29 * 30 + 7);

        // NTSC counts 30 frames per timecode second as well.
        let ntsc = Timecode::parse("00:01:00:00", FrameRate::NTSC_30).unwrap();
        assert_eq!(ntsc.to_frames(), 1800);

        let film = Timecode::parse("00:00:01:12", FrameRate::FPS_24).unwrap();
        assert_eq!(film.to_frames(), 36);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        for bad in [
            "",
            "00:00:10",
            "00:00:10:00:00",
            "00;00;10;00",
            "0:00:10:00",
            "00:0:10:00",
            "00:00:1a:00",
            "00:60:00:00",
            "00:00:60:00",
            "00:00:00:30",
            "-1:00:00:00",
        ] {
            let err = Timecode::parse(bad, FrameRate::FPS_30).unwrap_err();
            assert!(
                matches!(err, TimecodeError::Malformed { .. }),
                "{bad:?} should be malformed, got {err:?}"
            );
        }
    }

    #[test]
    fn test_frame_field_checked_against_rate() {
        assert!(Timecode::parse("00:00:00:24", FrameRate::FPS_25).is_ok());
        assert!(Timecode::parse("00:00:00:24", FrameRate::FPS_24).is_err());
        assert!(Timecode::parse("00:00:00:29", FrameRate::NTSC_30).is_ok());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let tc = Timecode::parse(" 00:00:01:00 ", FrameRate::FPS_25).unwrap();
        assert_eq!(tc.to_frames(), 25);
    }

    #[test]
    fn test_format_is_zero_padded() {
        assert_eq!(Timecode::from_frames(0).format(FrameRate::FPS_30), "00:00:00:00");
        assert_eq!(
            Timecode::from_frames(13_059).format(FrameRate::FPS_30),
            "00:07:15:09"
        );
        assert_eq!(
            Timecode::from_frames(108_000 * 101).format(FrameRate::FPS_30),
            "101:00:00:00"
        );
    }

    #[test]
    fn test_duration() {
        let a = Timecode::from_frames(877);
        let b = Timecode::from_frames(1320);
        assert_eq!(duration(a, b).unwrap().to_frames(), 443);
        assert_eq!(duration(a, a).unwrap(), Timecode::ZERO);
        assert_eq!(
            duration(b, a).unwrap_err(),
            TimecodeError::InvalidRange {
                in_frames: 1320,
                out_frames: 877
            }
        );
    }

    #[test]
    fn test_frame_rate_parsing() {
        assert_eq!("30".parse::<FrameRate>().unwrap(), FrameRate::FPS_30);
        assert_eq!("29.97".parse::<FrameRate>().unwrap(), FrameRate::NTSC_30);
        assert_eq!("23.976".parse::<FrameRate>().unwrap(), FrameRate::NTSC_24);
        assert_eq!("59.94".parse::<FrameRate>().unwrap(), FrameRate::NTSC_60);
        assert_eq!("30000/1001".parse::<FrameRate>().unwrap(), FrameRate::NTSC_30);
        assert_eq!("50/2".parse::<FrameRate>().unwrap(), FrameRate::FPS_25);
        assert_eq!("25.0".parse::<FrameRate>().unwrap(), FrameRate::FPS_25);

        for bad in ["", "0", "abc", "29.5", "30/0", "-30"] {
            assert!(bad.parse::<FrameRate>().is_err(), "{bad:?} should fail");
        }
    }

    #[test]
    fn test_frame_rate_properties() {
        assert_eq!(FrameRate::NTSC_30.timebase(), 30);
        assert!(FrameRate::NTSC_30.is_ntsc());
        assert!(!FrameRate::FPS_25.is_ntsc());
        assert_eq!(FrameRate::from_timebase(30, true).unwrap(), FrameRate::NTSC_30);
        assert_eq!(FrameRate::from_timebase(25, false).unwrap(), FrameRate::FPS_25);
        assert_eq!(FrameRate::NTSC_30.to_string(), "30000/1001");
        assert_eq!(FrameRate::FPS_24.to_string(), "24");
    }

    #[test]
    fn test_frame_rate_serializes_as_string() {
        let json = serde_json::to_string(&FrameRate::NTSC_30).unwrap();
        assert_eq!(json, "\"30000/1001\"");
        let parsed: FrameRate = serde_json::from_str("\"25\"").unwrap();
        assert_eq!(parsed, FrameRate::FPS_25);
        assert!(serde_json::from_str::<FrameRate>("\"0/1\"").is_err());
    }

    #[test]
    fn test_seconds_conversions() {
        assert_eq!(Timecode::from_seconds(5.0, FrameRate::FPS_30).to_frames(), 150);
        assert_eq!(Timecode::from_seconds(5.0, FrameRate::NTSC_30).to_frames(), 150);
        assert_eq!(Timecode::from_seconds(-1.0, FrameRate::FPS_30), Timecode::ZERO);
        assert!((Timecode::from_frames(75).seconds(FrameRate::FPS_25) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_ppro_ticks() {
        assert_eq!(
            Timecode::from_frames(30).ppro_ticks(FrameRate::FPS_30),
            PPRO_TICKS_PER_SECOND
        );
        assert_eq!(
            Timecode::from_frames(1).ppro_ticks(FrameRate::NTSC_30),
            8_475_667_200
        );
    }

    #[test]
    fn test_rescale() {
        let tc = Timecode::from_frames(90);
        assert_eq!(
            tc.rescale(FrameRate::FPS_30, FrameRate::FPS_60),
            (Timecode::from_frames(180), 0.0)
        );
        assert_eq!(
            tc.rescale(FrameRate::FPS_30, FrameRate::FPS_30),
            (tc, 0.0)
        );

        // 90 frames at 30 fps is 75 frames at 25 fps exactly.
        let (converted, error) = tc.rescale(FrameRate::FPS_30, FrameRate::FPS_25);
        assert_eq!(converted.to_frames(), 75);
        assert_eq!(error, 0.0);

        let (converted, error) =
            Timecode::from_frames(7).rescale(FrameRate::FPS_30, FrameRate::FPS_25);
        assert_eq!(converted.to_frames(), 6);
        assert!(error > 0.1);
    }

    fn rates() -> impl Strategy<Value = FrameRate> {
        prop::sample::select(vec![
            FrameRate::FPS_24,
            FrameRate::FPS_25,
            FrameRate::FPS_30,
            FrameRate::FPS_60,
            FrameRate::NTSC_24,
            FrameRate::NTSC_30,
            FrameRate::NTSC_60,
        ])
    }

    proptest! {
        #[test]
        fn prop_canonical_text_round_trips(
            rate in rates(),
            hours in 0u64..100,
            minutes in 0u64..60,
            seconds in 0u64..60,
            frames in 0u64..24,
        ) {
            let text = format!("{hours:02}:{minutes:02}:{seconds:02}:{frames:02}");
            let tc = Timecode::parse(&text, rate).unwrap();
            prop_assert_eq!(Timecode::from_frames(tc.to_frames()).format(rate), text);
        }

        #[test]
        fn prop_frames_round_trip(rate in rates(), frames in 0u64..50_000_000) {
            let text = Timecode::from_frames(frames).format(rate);
            prop_assert_eq!(Timecode::parse(&text, rate).unwrap().to_frames(), frames);
        }
    }
}
