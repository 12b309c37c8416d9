/*!
 # Lotus Lamp Bluetooth LED Controller Library

 A Rust library for controlling Lotus Lamp RGB LED lamps (MELK-OA10 and
 similar models speaking the Lotus Lamp X app protocol) over Bluetooth LE.

 ## Features

 * Power on/off control
 * RGB color control
 * Brightness adjustment
 * Animation modes with speed control
 * On-device scheduling (weekday timers, time synchronization)
 * JSON device configuration with default search locations

 ## Example

 ```rust,no_run
 use lotus_lamp_controller::*;

 #[tokio::main]
 async fn main() -> Result<()> {
     // Initialize tracing for logs
     tracing_subscriber::fmt::init();

     // Connect using the configured device (lotus_lamp_config.json)
     let mut lamp = LotusLamp::connect_default().await?;

     // Basic operations
     lamp.power_on().await?;
     lamp.set_color(255, 0, 0).await?; // Set to red
     lamp.set_brightness(80).await?;   // 80% brightness

     lamp.disconnect().await?;
     Ok(())
 }
 ```

 The wire protocol itself lives in [`protocol`] as pure functions returning
 9-byte frames, so it can be tested and reused without any Bluetooth stack.
*/

use thiserror::Error;

/// Custom error types for the Lotus Lamp controller library
#[derive(Error, Debug)]
pub enum Error {
    /// No Bluetooth adapters found
    #[error("No Bluetooth adapters found")]
    NoBluetoothAdapters,

    /// No compatible lamp found during scanning
    #[error("No compatible Lotus Lamp device found")]
    NoCompatibleDevice,

    /// Failed to find required BLE characteristic
    #[error("Could not find required BLE characteristic: {0}")]
    CharacteristicNotFound(String),

    /// BLE communication error
    #[error("BLE communication error: {0}")]
    BleError(String),

    /// Command timeout
    #[error("Command timed out after {0} retries")]
    CommandTimeout(u8),

    /// Value out of range
    #[error("Value {0} out of range ({1}..{2})")]
    ValueOutOfRange(u32, u32, u32),

    /// General error
    #[error("Error: {0}")]
    General(String),

    /// No device configuration could be found
    #[error("No Lotus Lamp devices configured; create lotus_lamp_config.json or pass a DeviceConfig")]
    NotConfigured,

    /// A named device is missing from the loaded configuration
    #[error("Device '{0}' not found in configuration")]
    UnknownDevice(String),

    /// Configuration file I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file parse error
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// Error from btleplug
    #[error(transparent)]
    BtlePlugError(#[from] btleplug::Error),

    /// Other errors
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

// Import needed for Result type extension
pub type Result<T> = std::result::Result<T, Error>;

// Re-export modules
pub mod config;
pub mod device;
pub mod modes;
pub mod protocol;
pub mod schedule;

// Re-export key types
pub use config::{ConfigManager, DeviceConfig};
pub use device::LotusLamp;
pub use protocol::{Frame, TimerKind};
pub use schedule::Weekday;
