/*!
 # Lotus Lamp command codec

 Pure encoders for the lamp's fixed 9-byte BLE command frames. Every encoder
 validates its parameters, builds a frame, and returns it by value; nothing
 here touches Bluetooth or keeps state, so frames can be generated and
 inspected anywhere (including tests) and the functions are safe to call from
 any number of tasks.

 ## Frame layout

 ```text
 byte 0: 0x7E          header
 byte 1: length tag    fixed per command type, not a computed length
 byte 2: command type
 byte 3..=6: params    unused slots are 0xFF, never 0x00
 byte 7: 0x00          color and timer commands override this byte
 byte 8: 0xEF          footer
 ```

 Several bytes in the protocol (the per-command length tags, the 0x03/0x10
 pair in the color command) have no known derivation. They are captured from
 the Lotus Lamp X app's traffic and must be reproduced literally.

 ## Scheduling

 The lamp has no real-time clock. A time-sync frame ([`encode_time_sync`])
 establishes the reference time and weekday the firmware uses to evaluate
 timers, so callers must send one before any timer frame. The codec itself is
 stateless and does not enforce that ordering.
*/

use crate::schedule::{day_bits, Weekday};
use crate::{Error, Result};

/// Every command frame is exactly this long.
pub const FRAME_LEN: usize = 9;

/// A complete, ready-to-send command frame.
pub type Frame = [u8; FRAME_LEN];

/// First byte of every frame.
pub const FRAME_HEADER: u8 = 0x7E;
/// Last byte of every frame.
pub const FRAME_FOOTER: u8 = 0xEF;

/// Filler for parameter slots a command does not use.
const UNUSED: u8 = 0xFF;

// Length tags, one per command type. The speed command's 0x04 is observed
// device behavior and must not be generalized to 0x07.
const LEN_BRIGHTNESS: u8 = 0x07;
const LEN_SPEED: u8 = 0x04;
const LEN_ANIMATION: u8 = 0x07;
const LEN_POWER: u8 = 0x07;
const LEN_COLOR: u8 = 0x07;
const LEN_TIME_SYNC: u8 = 0x06;
const LEN_TIMER: u8 = 0x07;

// Command type tags.
const CMD_BRIGHTNESS: u8 = 0x01;
const CMD_SPEED: u8 = 0x02;
const CMD_ANIMATION: u8 = 0x03;
const CMD_POWER: u8 = 0x04;
const CMD_COLOR: u8 = 0x05;
const CMD_TIMER: u8 = 0x82;
const CMD_TIME_SYNC: u8 = 0x83;

// Opaque protocol constants inside the color command.
const COLOR_PARAM_TAG: u8 = 0x03;
const COLOR_TRAILER: u8 = 0x10;

// Power sub-tags, carried in the first parameter byte.
const POWER_ON_TAG: u8 = 0x01;
const POWER_OFF_TAG: u8 = 0x00;

/// Highest accepted brightness and speed level, in percent.
pub const MAX_LEVEL: u8 = 100;

/// Highest animation mode the firmware knows (modes are 0..=212).
pub const MAX_ANIMATION_MODE: u8 = 212;

/// Bit 7 of the timer bitmask: the timer is armed.
pub const TIMER_ENABLED_BIT: u8 = 0x80;

/// Whether a timer turns the lamp on or off when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Turn the lamp on at the scheduled time
    On,
    /// Turn the lamp off at the scheduled time
    Off,
}

impl TimerKind {
    fn tag(self) -> u8 {
        match self {
            TimerKind::On => 0x00,
            TimerKind::Off => 0x01,
        }
    }
}

/// Assemble the shared 9-byte envelope.
///
/// Performs no validation; each encoder checks its own parameters first.
/// `byte7` is `None` for the common 0x00 case; the color and timer encoders
/// override it.
fn build_frame(length_tag: u8, cmd_type: u8, params: [u8; 4], byte7: Option<u8>) -> Frame {
    [
        FRAME_HEADER,
        length_tag,
        cmd_type,
        params[0],
        params[1],
        params[2],
        params[3],
        byte7.unwrap_or(0x00),
        FRAME_FOOTER,
    ]
}

fn check_range(value: u8, max: u8) -> Result<u8> {
    if value > max {
        return Err(Error::ValueOutOfRange(value as u32, 0, max as u32));
    }
    Ok(value)
}

/// Encode a solid RGB color command.
///
/// All channel values are full-range bytes, so this cannot fail.
pub fn encode_color(red: u8, green: u8, blue: u8) -> Frame {
    build_frame(
        LEN_COLOR,
        CMD_COLOR,
        [COLOR_PARAM_TAG, red, green, blue],
        Some(COLOR_TRAILER),
    )
}

/// Encode a brightness command. `level` is a percentage in 0..=100.
pub fn encode_brightness(level: u8) -> Result<Frame> {
    let level = check_range(level, MAX_LEVEL)?;
    Ok(build_frame(
        LEN_BRIGHTNESS,
        CMD_BRIGHTNESS,
        [level, UNUSED, UNUSED, UNUSED],
        None,
    ))
}

/// Encode an animation speed command. `level` is a percentage in 0..=100.
///
/// Speed only affects animation modes; the lamp ignores it while showing a
/// solid color.
pub fn encode_speed(level: u8) -> Result<Frame> {
    let level = check_range(level, MAX_LEVEL)?;
    Ok(build_frame(
        LEN_SPEED,
        CMD_SPEED,
        [level, UNUSED, UNUSED, UNUSED],
        None,
    ))
}

/// Encode an animation mode command. `mode` is in 0..=212.
pub fn encode_animation(mode: u8) -> Result<Frame> {
    let mode = check_range(mode, MAX_ANIMATION_MODE)?;
    Ok(build_frame(
        LEN_ANIMATION,
        CMD_ANIMATION,
        [mode, UNUSED, UNUSED, UNUSED],
        None,
    ))
}

/// Encode a power on/off command.
pub fn encode_power(on: bool) -> Frame {
    let tag = if on { POWER_ON_TAG } else { POWER_OFF_TAG };
    build_frame(LEN_POWER, CMD_POWER, [tag, 0x00, UNUSED, UNUSED], None)
}

/// Encode a time synchronization command.
///
/// Establishes the reference clock the firmware evaluates timers against;
/// send this before any timer command. `hour` is 0..=23, `minute` and
/// `second` are 0..=59.
pub fn encode_time_sync(hour: u8, minute: u8, second: u8, weekday: Weekday) -> Result<Frame> {
    let hour = check_range(hour, 23)?;
    let minute = check_range(minute, 59)?;
    let second = check_range(second, 59)?;
    Ok(build_frame(
        LEN_TIME_SYNC,
        CMD_TIME_SYNC,
        [hour, minute, second, weekday.sync_value()],
        None,
    ))
}

/// Encode a timer command.
///
/// `days` selects the weekdays the timer repeats on. An empty set with
/// `enabled` encodes a one-shot timer: the firmware fires it once at the next
/// matching time and clears it. To disable a timer, pass `hour` 0, `minute` 0,
/// `enabled` false and no days.
pub fn encode_timer(
    hour: u8,
    minute: u8,
    kind: TimerKind,
    enabled: bool,
    days: &[Weekday],
) -> Result<Frame> {
    let hour = check_range(hour, 23)?;
    let minute = check_range(minute, 59)?;
    let bitmask = day_bits(days) | if enabled { TIMER_ENABLED_BIT } else { 0x00 };
    Ok(build_frame(
        LEN_TIMER,
        CMD_TIMER,
        [hour, minute, 0x00, kind.tag()],
        Some(bitmask),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::WEEKDAYS;

    #[test]
    fn test_color_frame_layout() {
        assert_eq!(
            encode_color(255, 0, 0),
            [0x7E, 0x07, 0x05, 0x03, 0xFF, 0x00, 0x00, 0x10, 0xEF]
        );
        assert_eq!(
            encode_color(0x12, 0x34, 0x56),
            [0x7E, 0x07, 0x05, 0x03, 0x12, 0x34, 0x56, 0x10, 0xEF]
        );
        // Black is a valid color, not a power-off
        assert_eq!(
            encode_color(0, 0, 0),
            [0x7E, 0x07, 0x05, 0x03, 0x00, 0x00, 0x00, 0x10, 0xEF]
        );
    }

    #[test]
    fn test_brightness_frame_and_range() {
        assert_eq!(
            encode_brightness(50).unwrap(),
            [0x7E, 0x07, 0x01, 50, 0xFF, 0xFF, 0xFF, 0x00, 0xEF]
        );
        assert_eq!(
            encode_brightness(0).unwrap(),
            [0x7E, 0x07, 0x01, 0, 0xFF, 0xFF, 0xFF, 0x00, 0xEF]
        );
        assert_eq!(
            encode_brightness(100).unwrap(),
            [0x7E, 0x07, 0x01, 100, 0xFF, 0xFF, 0xFF, 0x00, 0xEF]
        );
        assert!(matches!(
            encode_brightness(101),
            Err(Error::ValueOutOfRange(101, 0, 100))
        ));
        assert!(encode_brightness(150).is_err());
    }

    #[test]
    fn test_speed_uses_its_own_length_tag() {
        // Speed is the one command with length tag 0x04
        assert_eq!(
            encode_speed(75).unwrap(),
            [0x7E, 0x04, 0x02, 75, 0xFF, 0xFF, 0xFF, 0x00, 0xEF]
        );
        assert!(encode_speed(101).is_err());
    }

    #[test]
    fn test_animation_frame_and_range() {
        assert_eq!(
            encode_animation(143).unwrap(),
            [0x7E, 0x07, 0x03, 143, 0xFF, 0xFF, 0xFF, 0x00, 0xEF]
        );
        assert_eq!(
            encode_animation(212).unwrap(),
            [0x7E, 0x07, 0x03, 212, 0xFF, 0xFF, 0xFF, 0x00, 0xEF]
        );
        assert!(matches!(
            encode_animation(213),
            Err(Error::ValueOutOfRange(213, 0, 212))
        ));
    }

    #[test]
    fn test_power_frames() {
        assert_eq!(
            encode_power(true),
            [0x7E, 0x07, 0x04, 0x01, 0x00, 0xFF, 0xFF, 0x00, 0xEF]
        );
        assert_eq!(
            encode_power(false),
            [0x7E, 0x07, 0x04, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0xEF]
        );
    }

    #[test]
    fn test_time_sync_frame() {
        // Monday 07:30:00
        assert_eq!(
            encode_time_sync(7, 30, 0, Weekday::Monday).unwrap(),
            [0x7E, 0x06, 0x83, 0x07, 0x1E, 0x00, 0x01, 0x00, 0xEF]
        );
        assert_eq!(
            encode_time_sync(23, 59, 59, Weekday::Sunday).unwrap(),
            [0x7E, 0x06, 0x83, 23, 59, 59, 0x07, 0x00, 0xEF]
        );
    }

    #[test]
    fn test_time_sync_rejects_out_of_range() {
        assert!(encode_time_sync(24, 0, 0, Weekday::Monday).is_err());
        assert!(encode_time_sync(0, 60, 0, Weekday::Monday).is_err());
        assert!(encode_time_sync(0, 0, 60, Weekday::Monday).is_err());
    }

    #[test]
    fn test_one_shot_timer() {
        // No days but enabled: fires once, firmware clears it afterwards
        assert_eq!(
            encode_timer(7, 30, TimerKind::On, true, &[]).unwrap(),
            [0x7E, 0x07, 0x82, 0x07, 0x1E, 0x00, 0x00, 0x80, 0xEF]
        );
    }

    #[test]
    fn test_recurring_timer_bitmask() {
        assert_eq!(
            encode_timer(7, 30, TimerKind::On, true, &WEEKDAYS).unwrap(),
            [0x7E, 0x07, 0x82, 0x07, 0x1E, 0x00, 0x00, 0x9F, 0xEF]
        );
        assert_eq!(
            encode_timer(23, 0, TimerKind::Off, true, &[Weekday::Saturday, Weekday::Sunday])
                .unwrap(),
            [0x7E, 0x07, 0x82, 23, 0x00, 0x00, 0x01, 0xE0, 0xEF]
        );
    }

    #[test]
    fn test_disable_timer_frame() {
        assert_eq!(
            encode_timer(0, 0, TimerKind::On, false, &[]).unwrap(),
            [0x7E, 0x07, 0x82, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEF]
        );
        assert_eq!(
            encode_timer(0, 0, TimerKind::Off, false, &[]).unwrap(),
            [0x7E, 0x07, 0x82, 0x00, 0x00, 0x00, 0x01, 0x00, 0xEF]
        );
    }

    #[test]
    fn test_timer_rejects_out_of_range() {
        assert!(encode_timer(24, 0, TimerKind::On, true, &[]).is_err());
        assert!(encode_timer(0, 60, TimerKind::On, true, &[]).is_err());
    }

    #[test]
    fn test_frames_share_the_envelope() {
        let frames = [
            encode_color(1, 2, 3),
            encode_brightness(10).unwrap(),
            encode_speed(10).unwrap(),
            encode_animation(10).unwrap(),
            encode_power(true),
            encode_time_sync(1, 2, 3, Weekday::Wednesday).unwrap(),
            encode_timer(1, 2, TimerKind::Off, true, &[Weekday::Friday]).unwrap(),
        ];
        for frame in frames {
            assert_eq!(frame.len(), FRAME_LEN);
            assert_eq!(frame[0], FRAME_HEADER);
            assert_eq!(frame[8], FRAME_FOOTER);
        }
    }

    #[test]
    fn test_encoding_is_deterministic() {
        // Stateless codec: identical inputs, identical bytes
        assert_eq!(encode_color(12, 34, 56), encode_color(12, 34, 56));
        assert_eq!(
            encode_timer(6, 15, TimerKind::On, true, &WEEKDAYS).unwrap(),
            encode_timer(6, 15, TimerKind::On, true, &WEEKDAYS).unwrap()
        );
    }
}
