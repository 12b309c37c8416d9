/*!
 # Scheduling types for the Lotus Lamp

 The lamp's scheduling protocol uses two different weekday encodings that the
 firmware correlates with each other:

 * time synchronization carries the weekday as a number, Monday = 1 through
   Sunday = 7;
 * timers carry a bitmask where bit 0 = Monday through bit 6 = Sunday, with
   bit 7 reserved for the timer's enabled flag.

 Both encodings are derived from the position of a day in [`Weekday::ALL`],
 so they cannot drift apart. A timer that fires on the wrong day is worse
 than a rejected command, which is why this module is the single source of
 truth for weekday numbering.
*/

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A day of the week as the lamp firmware understands it.
///
/// Discriminants follow the canonical Monday-first order; everything the
/// wire protocol needs is computed from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Weekday {
    Monday = 0,
    Tuesday = 1,
    Wednesday = 2,
    Thursday = 3,
    Friday = 4,
    Saturday = 5,
    Sunday = 6,
}

impl Weekday {
    /// Canonical week order. Both wire encodings are positions in this list.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Weekday value used by the time-sync command (Monday = 1 .. Sunday = 7).
    pub fn sync_value(self) -> u8 {
        self as u8 + 1
    }

    /// Bit position used by the timer bitmask (Monday = 0 .. Sunday = 6).
    pub fn bit_index(self) -> u8 {
        self as u8
    }

    /// Single-day bitmask value (Monday = 0x01 .. Sunday = 0x40).
    pub fn bit(self) -> u8 {
        1 << self.bit_index()
    }

    /// Inverse of [`Weekday::sync_value`], for callers holding a raw 1..7.
    pub fn from_sync_value(value: u8) -> Result<Weekday> {
        value
            .checked_sub(1)
            .and_then(|i| Weekday::ALL.get(i as usize))
            .copied()
            .ok_or(Error::ValueOutOfRange(value as u32, 1, 7))
    }

    fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Weekday {
    type Err = Error;

    fn from_str(s: &str) -> Result<Weekday> {
        match s.trim().to_lowercase().as_str() {
            "mon" | "monday" => Ok(Weekday::Monday),
            "tue" | "tuesday" => Ok(Weekday::Tuesday),
            "wed" | "wednesday" => Ok(Weekday::Wednesday),
            "thu" | "thursday" => Ok(Weekday::Thursday),
            "fri" | "friday" => Ok(Weekday::Friday),
            "sat" | "saturday" => Ok(Weekday::Saturday),
            "sun" | "sunday" => Ok(Weekday::Sunday),
            other => Err(Error::General(format!("unknown weekday: {other}"))),
        }
    }
}

/// Monday through Friday.
pub const WEEKDAYS: [Weekday; 5] = [
    Weekday::Monday,
    Weekday::Tuesday,
    Weekday::Wednesday,
    Weekday::Thursday,
    Weekday::Friday,
];

/// Saturday and Sunday.
pub const WEEKEND: [Weekday; 2] = [Weekday::Saturday, Weekday::Sunday];

/// Combine a set of weekdays into the timer's day bitmask.
///
/// Duplicates are harmless and order is irrelevant. The enabled flag (bit 7)
/// is not part of the day bits; the timer encoder adds it.
pub fn day_bits(days: &[Weekday]) -> u8 {
    days.iter().fold(0, |bits, day| bits | day.bit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_value_and_bit_index_agree() {
        // The firmware correlates the two encodings; they must stay in step.
        for day in Weekday::ALL {
            assert_eq!(day.sync_value() - 1, day.bit_index(), "{day}");
        }
    }

    #[test]
    fn test_sync_values_cover_1_through_7() {
        let values: Vec<u8> = Weekday::ALL.iter().map(|d| d.sync_value()).collect();
        assert_eq!(values, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_from_sync_value_round_trip() {
        for day in Weekday::ALL {
            assert_eq!(Weekday::from_sync_value(day.sync_value()).unwrap(), day);
        }
        assert!(Weekday::from_sync_value(0).is_err());
        assert!(Weekday::from_sync_value(8).is_err());
    }

    #[test]
    fn test_single_day_bits() {
        assert_eq!(Weekday::Monday.bit(), 0x01);
        assert_eq!(Weekday::Tuesday.bit(), 0x02);
        assert_eq!(Weekday::Wednesday.bit(), 0x04);
        assert_eq!(Weekday::Thursday.bit(), 0x08);
        assert_eq!(Weekday::Friday.bit(), 0x10);
        assert_eq!(Weekday::Saturday.bit(), 0x20);
        assert_eq!(Weekday::Sunday.bit(), 0x40);
    }

    #[test]
    fn test_day_set_bitmasks() {
        assert_eq!(day_bits(&WEEKDAYS), 0x1F);
        assert_eq!(day_bits(&WEEKEND), 0x60);
        assert_eq!(day_bits(&Weekday::ALL), 0x7F);
        assert_eq!(day_bits(&[]), 0x00);
        // Order and duplicates do not matter
        assert_eq!(
            day_bits(&[Weekday::Sunday, Weekday::Monday, Weekday::Monday]),
            0x41
        );
    }

    #[test]
    fn test_parse_weekday_names() {
        assert_eq!("mon".parse::<Weekday>().unwrap(), Weekday::Monday);
        assert_eq!("Friday".parse::<Weekday>().unwrap(), Weekday::Friday);
        assert_eq!(" sun ".parse::<Weekday>().unwrap(), Weekday::Sunday);
        assert!("noday".parse::<Weekday>().is_err());
    }
}
