/*!
 # BLE device layer for Lotus Lamps

 [`LotusLamp`] owns the Bluetooth connection and turns typed operations into
 protocol frames ([`crate::protocol`]), forwarding each frame verbatim to the
 lamp's write characteristic. The lamp accepts a single logical connection
 and silently drops commands sent back-to-back, so all writes go through a
 queue that serializes them and enforces a minimum spacing.
*/

use btleplug::api::{
    Central, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use chrono::{Datelike, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::{ConfigManager, DeviceConfig};
use crate::protocol::{self, Frame, TimerKind};
use crate::schedule::Weekday;
use crate::{modes, Error, Result};

/// Minimum spacing between commands in milliseconds.
const DEFAULT_COMMAND_DELAY_MS: u64 = 100;

/// Maximum time spent scanning before giving up.
const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

/// Advertised name fragments that usually identify a Lotus Lamp.
pub const COMMON_NAME_PATTERNS: [&str; 6] = ["MELK", "Lotus", "LED", "RGB", "LAMP", "Light"];

/// Gets the default Bluetooth adapter
#[instrument(skip(manager))]
async fn get_central(manager: &Manager) -> Result<Adapter> {
    debug!("Getting default Bluetooth adapter");
    let adapter = manager
        .adapters()
        .await?
        .into_iter()
        .next()
        .ok_or(Error::NoBluetoothAdapters)?;
    debug!("Using Bluetooth adapter");
    Ok(adapter)
}

/// A lamp seen during scanning, before any configuration exists for it.
#[derive(Debug, Clone)]
pub struct DiscoveredLamp {
    /// Advertised local name
    pub name: String,
    /// Bluetooth address
    pub address: String,
    /// Signal strength at discovery time, if reported
    pub rssi: Option<i16>,
}

/// Command queue that serializes writes and enforces minimum spacing
struct CommandQueue {
    /// Semaphore to limit command concurrency
    semaphore: Semaphore,
    /// Minimum delay between commands
    min_delay: Duration,
    /// Last command timestamp
    last_command: Mutex<std::time::Instant>,
}

impl CommandQueue {
    fn new(min_delay_ms: u64) -> Self {
        Self {
            semaphore: Semaphore::new(1), // Only allow one command at a time
            min_delay: Duration::from_millis(min_delay_ms),
            last_command: Mutex::new(std::time::Instant::now() - Duration::from_secs(1)),
        }
    }

    async fn execute<T, F>(&self, future: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| Error::General(e.to_string()))?;

        // Pace commands: the lamp drops frames that arrive too quickly
        let mut last_cmd = self.last_command.lock().await;
        let elapsed = last_cmd.elapsed();
        if elapsed < self.min_delay {
            let wait_time = self.min_delay - elapsed;
            trace!("Rate limiting: waiting {:?} before next command", wait_time);
            time::sleep(wait_time).await;
        }

        let result = future.await;

        *last_cmd = std::time::Instant::now();

        result
    }
}

/// Main struct for controlling a Lotus Lamp via Bluetooth LE
pub struct LotusLamp {
    /// The connected Bluetooth peripheral
    peripheral: Peripheral,
    /// Characteristic used for sending commands
    write_characteristic: Characteristic,
    /// Notify characteristic, present on some models but unused by the
    /// current protocol. Kept for future status reads.
    #[allow(dead_code)]
    notify_characteristic: Option<Characteristic>,
    /// Configuration the lamp was connected with (address filled in after
    /// discovery, so callers can persist it)
    config: DeviceConfig,
    /// Command queue for write serialization and pacing
    command_queue: Arc<CommandQueue>,
    /// Current power state
    pub is_on: bool,
    /// Current RGB color (red, green, blue)
    pub rgb_color: (u8, u8, u8),
    /// Current brightness (0-100)
    pub brightness: u8,
    /// Current animation mode if active
    pub animation: Option<u8>,
    /// Current animation speed if set
    pub animation_speed: Option<u8>,
}

impl LotusLamp {
    /// Connects using the default configured device.
    ///
    /// Searches the default configuration locations (see
    /// [`ConfigManager::default_config_paths`]) and connects to the first
    /// device in the file.
    #[instrument]
    pub async fn connect_default() -> Result<LotusLamp> {
        let manager = ConfigManager::discover()?;
        let config = manager.resolve(None)?;
        Self::connect(config).await
    }

    /// Scans for and connects to the lamp described by `config`.
    ///
    /// When the config carries a saved address the scan matches on it;
    /// otherwise the advertised name is matched against the configured name.
    /// After connecting the lamp's clock is synchronized to the system time,
    /// since the device has no clock of its own.
    #[instrument(skip(config), fields(device = %config.name))]
    pub async fn connect(config: DeviceConfig) -> Result<LotusLamp> {
        info!("Initializing Lotus Lamp controller");
        let manager = Manager::new().await?;
        let central = get_central(&manager).await?;

        info!("Scanning for {}...", config.name);
        central.start_scan(ScanFilter::default()).await?;

        let start_time = std::time::Instant::now();
        let mut found: Option<Peripheral> = None;

        // Poll for devices until we find a match or time out
        while start_time.elapsed() < SCAN_TIMEOUT && found.is_none() {
            let peripherals = central.peripherals().await?;
            debug!("Found {} BLE peripherals so far", peripherals.len());

            for p in peripherals {
                if let Ok(Some(props)) = p.properties().await {
                    let name = props.local_name.unwrap_or_default();
                    let address = p.address().to_string();
                    trace!("Found device: {} ({})", name, address);

                    let matches = match &config.address {
                        Some(addr) => {
                            address.eq_ignore_ascii_case(addr)
                                || p.id().to_string().eq_ignore_ascii_case(addr)
                        }
                        None => !name.is_empty() && name.contains(config.name.trim()),
                    };

                    if matches {
                        info!("Found lamp: {} ({})", name, address);
                        found = Some(p);
                        break;
                    }
                }
            }

            if found.is_none() {
                let remaining = SCAN_TIMEOUT
                    .as_secs()
                    .saturating_sub(start_time.elapsed().as_secs());
                info!("Still scanning... ({} seconds remaining)", remaining);
                time::sleep(Duration::from_millis(500)).await;
            }
        }

        let Some(peripheral) = found else {
            central.stop_scan().await?;
            error!(
                "No compatible lamp found within {} seconds",
                SCAN_TIMEOUT.as_secs()
            );
            return Err(Error::NoCompatibleDevice);
        };

        info!("Connecting to lamp...");
        if !peripheral.is_connected().await? {
            peripheral.connect().await?;
        }

        central.stop_scan().await?;
        debug!("Discovering services...");
        peripheral.discover_services().await?;

        // Remember the discovered address so callers can persist it
        let mut config = config;
        if config.address.is_none() {
            config.address = Some(peripheral.address().to_string());
        }

        let write_characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == config.write_char_uuid)
            .ok_or_else(|| Error::CharacteristicNotFound(config.write_char_uuid.to_string()))?;
        debug!("Found write characteristic: {}", write_characteristic.uuid);

        let notify_characteristic = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == config.notify_char_uuid);
        if notify_characteristic.is_none() {
            debug!("Notify characteristic not found, but this is optional");
        }

        let lamp = LotusLamp {
            peripheral,
            write_characteristic,
            notify_characteristic,
            config,
            command_queue: Arc::new(CommandQueue::new(DEFAULT_COMMAND_DELAY_MS)),
            is_on: false,
            rgb_color: (255, 255, 255),
            brightness: 100,
            animation: None,
            animation_speed: None,
        };

        // The lamp has no RTC; give it a clock before anyone sets a timer
        debug!("Synchronizing lamp time");
        lamp.sync_time().await?;

        info!("Successfully connected to {}", lamp.config.name);
        Ok(lamp)
    }

    /// Scans for lamps advertising any of the [`COMMON_NAME_PATTERNS`].
    ///
    /// Useful for first-time setup when no configuration exists yet.
    #[instrument]
    pub async fn scan(timeout: Duration) -> Result<Vec<DiscoveredLamp>> {
        let manager = Manager::new().await?;
        let central = get_central(&manager).await?;

        info!("Scanning for BLE devices for {:?}...", timeout);
        central.start_scan(ScanFilter::default()).await?;
        time::sleep(timeout).await;

        let mut lamps = Vec::new();
        for p in central.peripherals().await? {
            if let Ok(Some(props)) = p.properties().await {
                if let Some(name) = props.local_name {
                    if COMMON_NAME_PATTERNS
                        .iter()
                        .any(|pattern| name.to_lowercase().contains(&pattern.to_lowercase()))
                    {
                        lamps.push(DiscoveredLamp {
                            name,
                            address: p.address().to_string(),
                            rssi: props.rssi,
                        });
                    }
                }
            }
        }

        central.stop_scan().await?;
        info!("Found {} candidate lamp(s)", lamps.len());
        Ok(lamps)
    }

    /// The configuration this lamp was connected with, including the
    /// discovered address.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Disconnects from the lamp.
    #[instrument(skip(self))]
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.peripheral.is_connected().await? {
            self.peripheral.disconnect().await?;
            info!("Disconnected from {}", self.config.name);
        }
        Ok(())
    }

    /// Turns the lamp on
    #[instrument(skip(self))]
    pub async fn power_on(&mut self) -> Result<()> {
        debug!("Turning lamp on");
        self.send_frame(protocol::encode_power(true)).await?;
        self.is_on = true;
        info!("Lamp powered on");
        Ok(())
    }

    /// Turns the lamp off
    #[instrument(skip(self))]
    pub async fn power_off(&mut self) -> Result<()> {
        debug!("Turning lamp off");
        self.send_frame(protocol::encode_power(false)).await?;
        self.is_on = false;
        info!("Lamp powered off");
        Ok(())
    }

    /// Sets a solid RGB color
    ///
    /// # Arguments
    ///
    /// * `red` - Red component (0-255)
    /// * `green` - Green component (0-255)
    /// * `blue` - Blue component (0-255)
    #[instrument(skip(self))]
    pub async fn set_color(&mut self, red: u8, green: u8, blue: u8) -> Result<()> {
        debug!("Setting color to RGB({}, {}, {})", red, green, blue);
        self.send_frame(protocol::encode_color(red, green, blue))
            .await?;

        self.rgb_color = (red, green, blue);
        self.animation = None; // Solid color replaces any active animation

        info!("Color set to RGB({}, {}, {})", red, green, blue);
        Ok(())
    }

    /// Sets the brightness level
    ///
    /// # Arguments
    ///
    /// * `level` - Brightness level (0-100); out-of-range values are rejected
    #[instrument(skip(self))]
    pub async fn set_brightness(&mut self, level: u8) -> Result<()> {
        debug!("Setting brightness to {}%", level);
        self.send_frame(protocol::encode_brightness(level)?).await?;
        self.brightness = level;
        info!("Brightness set to {}%", level);
        Ok(())
    }

    /// Sets the animation speed
    ///
    /// # Arguments
    ///
    /// * `level` - Speed level (0-100); out-of-range values are rejected
    ///
    /// Speed only affects animation modes, not solid colors.
    #[instrument(skip(self))]
    pub async fn set_speed(&mut self, level: u8) -> Result<()> {
        if self.animation.is_none() {
            warn!("Setting speed without an active animation; the lamp will ignore it");
        }

        debug!("Setting animation speed to {}", level);
        self.send_frame(protocol::encode_speed(level)?).await?;
        self.animation_speed = Some(level);
        info!("Animation speed set to {}", level);
        Ok(())
    }

    /// Sets an animation mode
    ///
    /// # Arguments
    ///
    /// * `mode` - Animation mode number (0-212); see [`crate::modes`]
    #[instrument(skip(self))]
    pub async fn set_animation(&mut self, mode: u8) -> Result<()> {
        match modes::mode_name(mode) {
            Some(name) => debug!("Setting animation mode {} ({})", mode, name),
            None => debug!("Setting animation mode {}", mode),
        }

        self.send_frame(protocol::encode_animation(mode)?).await?;
        self.animation = Some(mode);
        info!("Animation mode set to {}", mode);
        Ok(())
    }

    /// Synchronizes the lamp's clock with the local system time
    #[instrument(skip(self))]
    pub async fn sync_time(&self) -> Result<()> {
        let now = chrono::Local::now();
        let weekday = Weekday::from_sync_value(now.weekday().number_from_monday() as u8)?;
        debug!(
            "Syncing lamp time to {}:{:02}:{:02} {}",
            now.hour(),
            now.minute(),
            now.second(),
            weekday
        );

        self.send_frame(protocol::encode_time_sync(
            now.hour() as u8,
            now.minute() as u8,
            now.second() as u8,
            weekday,
        )?)
        .await?;

        debug!("Time synchronization complete");
        Ok(())
    }

    /// Sets an arbitrary time on the lamp
    ///
    /// # Arguments
    ///
    /// * `hour` - Hour (0-23)
    /// * `minute` - Minute (0-59)
    /// * `second` - Second (0-59)
    /// * `weekday` - Day of week
    #[instrument(skip(self))]
    pub async fn set_custom_time(
        &self,
        hour: u8,
        minute: u8,
        second: u8,
        weekday: Weekday,
    ) -> Result<()> {
        debug!(
            "Setting lamp time to {}:{:02}:{:02} {}",
            hour, minute, second, weekday
        );
        self.send_frame(protocol::encode_time_sync(hour, minute, second, weekday)?)
            .await?;
        Ok(())
    }

    /// Schedules the lamp to turn on
    ///
    /// # Arguments
    ///
    /// * `hour` - Hour to turn on (0-23)
    /// * `minute` - Minute to turn on (0-59)
    /// * `days` - Weekdays to repeat on; empty for a one-shot timer
    ///
    /// Requires a prior [`LotusLamp::sync_time`], which `connect` performs.
    #[instrument(skip(self))]
    pub async fn set_timer_on(&self, hour: u8, minute: u8, days: &[Weekday]) -> Result<()> {
        debug!("Scheduling power-on at {}:{:02} on {:?}", hour, minute, days);
        self.send_frame(protocol::encode_timer(
            hour,
            minute,
            TimerKind::On,
            true,
            days,
        )?)
        .await?;
        info!("Power-on timer set for {}:{:02}", hour, minute);
        Ok(())
    }

    /// Schedules the lamp to turn off
    ///
    /// # Arguments
    ///
    /// * `hour` - Hour to turn off (0-23)
    /// * `minute` - Minute to turn off (0-59)
    /// * `days` - Weekdays to repeat on; empty for a one-shot timer
    #[instrument(skip(self))]
    pub async fn set_timer_off(&self, hour: u8, minute: u8, days: &[Weekday]) -> Result<()> {
        debug!("Scheduling power-off at {}:{:02} on {:?}", hour, minute, days);
        self.send_frame(protocol::encode_timer(
            hour,
            minute,
            TimerKind::Off,
            true,
            days,
        )?)
        .await?;
        info!("Power-off timer set for {}:{:02}", hour, minute);
        Ok(())
    }

    /// Disables a previously set timer
    #[instrument(skip(self))]
    pub async fn disable_timer(&self, kind: TimerKind) -> Result<()> {
        debug!("Disabling {:?} timer", kind);
        self.send_frame(protocol::encode_timer(0, 0, kind, false, &[])?)
            .await?;
        info!("{:?} timer disabled", kind);
        Ok(())
    }

    /// Pulses a color on and off
    #[instrument(skip(self))]
    pub async fn pulse(
        &mut self,
        red: u8,
        green: u8,
        blue: u8,
        times: u32,
        period: Duration,
    ) -> Result<()> {
        for _ in 0..times {
            self.set_color(red, green, blue).await?;
            time::sleep(period / 2).await;
            self.set_color(0, 0, 0).await?;
            time::sleep(period / 2).await;
        }
        Ok(())
    }

    /// Crossfades through the hue circle in `steps` solid-color commands
    #[instrument(skip(self))]
    pub async fn rainbow_cycle(&mut self, duration: Duration, steps: u32) -> Result<()> {
        let steps = steps.max(1);
        let delay = duration / steps;
        for i in 0..steps {
            let (r, g, b) = hsv_to_rgb(i as f64 / steps as f64, 1.0, 1.0);
            self.set_color(r, g, b).await?;
            time::sleep(delay).await;
        }
        Ok(())
    }

    /// Sends one frame to the lamp with pacing and retries
    #[instrument(skip(self, frame), fields(cmd = frame[2]))]
    async fn send_frame(&self, frame: Frame) -> Result<()> {
        let peripheral = self.peripheral.clone();
        let write_characteristic = self.write_characteristic.clone();

        self.command_queue
            .execute(async move {
                // BLE can be unreliable, so failed writes are retried
                let max_retries = 3;
                let mut attempt = 0;

                // Prefer WriteWithResponse when the characteristic supports it
                let write_type = if write_characteristic
                    .properties
                    .contains(btleplug::api::CharPropFlags::WRITE)
                {
                    WriteType::WithResponse
                } else {
                    WriteType::WithoutResponse
                };

                while attempt < max_retries {
                    trace!(
                        "Sending frame {:02X?} (attempt {}/{})",
                        frame,
                        attempt + 1,
                        max_retries
                    );

                    match peripheral
                        .write(&write_characteristic, &frame, write_type)
                        .await
                    {
                        Ok(_) => {
                            trace!("Frame sent successfully");
                            return Ok(());
                        }
                        Err(e) => {
                            attempt += 1;
                            warn!("Write failed (attempt {}/{}): {}", attempt, max_retries, e);

                            if attempt < max_retries {
                                time::sleep(Duration::from_millis(300)).await;
                            } else {
                                error!("Write failed permanently: {}", e);
                                return Err(Error::BleError(e.to_string()));
                            }
                        }
                    }
                }

                Err(Error::CommandTimeout(max_retries))
            })
            .await
    }
}

/// Convert a hue/saturation/value triple to RGB bytes. Hue wraps at 1.0.
fn hsv_to_rgb(h: f64, s: f64, v: f64) -> (u8, u8, u8) {
    let h = (h.rem_euclid(1.0)) * 6.0;
    let i = h.floor() as u32 % 6;
    let f = h - h.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    (
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hsv_primaries() {
        assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), (255, 0, 0));
        assert_eq!(hsv_to_rgb(1.0 / 3.0, 1.0, 1.0), (0, 255, 0));
        assert_eq!(hsv_to_rgb(2.0 / 3.0, 1.0, 1.0), (0, 0, 255));
        // Hue wraps
        assert_eq!(hsv_to_rgb(1.0, 1.0, 1.0), (255, 0, 0));
    }

    #[test]
    fn test_hsv_value_and_saturation() {
        assert_eq!(hsv_to_rgb(0.0, 0.0, 1.0), (255, 255, 255));
        assert_eq!(hsv_to_rgb(0.0, 1.0, 0.0), (0, 0, 0));
    }
}
