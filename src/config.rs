/*!
 # Device configuration for Lotus Lamps

 Lamps are addressed by a per-device configuration: a display name, an
 optional saved Bluetooth address, and the GATT UUIDs of the command service.
 Configurations live in JSON files managed by [`ConfigManager`], which
 searches a few default locations so a configured lamp "just works":

 1. `./lotus_lamp_config.json`
 2. `./.lotus_lamp.json`
 3. `$HOME/.lotus_lamp/config.json`

 Files normally hold a `{"devices": [...]}` list; a bare single-device object
 is accepted for older configs.
*/

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Error, Result};

/// GATT service common to Lotus Lamp models.
pub const DEFAULT_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000FFF0_0000_1000_8000_00805F9B34FB);
/// Characteristic commands are written to.
pub const DEFAULT_WRITE_CHAR_UUID: Uuid = Uuid::from_u128(0x0000FFF3_0000_1000_8000_00805F9B34FB);
/// Characteristic the lamp notifies on (unused by most models).
pub const DEFAULT_NOTIFY_CHAR_UUID: Uuid = Uuid::from_u128(0x0000FFF4_0000_1000_8000_00805F9B34FB);

fn default_service_uuid() -> Uuid {
    DEFAULT_SERVICE_UUID
}

fn default_write_char_uuid() -> Uuid {
    DEFAULT_WRITE_CHAR_UUID
}

fn default_notify_char_uuid() -> Uuid {
    DEFAULT_NOTIFY_CHAR_UUID
}

/// Configuration for a single lamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Display name, also matched against the advertised BLE name
    pub name: String,
    /// Saved Bluetooth address; discovered and filled in on first connect
    #[serde(default)]
    pub address: Option<String>,
    /// Command service UUID
    #[serde(default = "default_service_uuid")]
    pub service_uuid: Uuid,
    /// Write characteristic UUID
    #[serde(default = "default_write_char_uuid")]
    pub write_char_uuid: Uuid,
    /// Notify characteristic UUID
    #[serde(default = "default_notify_char_uuid")]
    pub notify_char_uuid: Uuid,
}

impl DeviceConfig {
    /// Configuration with protocol-default UUIDs and no saved address.
    pub fn new(name: impl Into<String>) -> Self {
        DeviceConfig {
            name: name.into(),
            address: None,
            service_uuid: DEFAULT_SERVICE_UUID,
            write_char_uuid: DEFAULT_WRITE_CHAR_UUID,
            notify_char_uuid: DEFAULT_NOTIFY_CHAR_UUID,
        }
    }

    /// Configuration for a lamp with a known address.
    pub fn with_address(name: impl Into<String>, address: impl Into<String>) -> Self {
        DeviceConfig {
            address: Some(address.into()),
            ..DeviceConfig::new(name)
        }
    }
}

// Config files are either {"devices": [...]} or a bare device object.
#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigFile {
    Devices { devices: Vec<DeviceConfig> },
    Single(DeviceConfig),
}

#[derive(Serialize)]
struct ConfigFileOut<'a> {
    devices: &'a [DeviceConfig],
}

/// Loads, stores and saves lamp configurations.
#[derive(Debug, Default)]
pub struct ConfigManager {
    devices: Vec<DeviceConfig>,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Empty manager, not backed by any file yet.
    pub fn new() -> Self {
        ConfigManager::default()
    }

    /// Paths searched by [`ConfigManager::discover`], in priority order.
    pub fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from("lotus_lamp_config.json"),
            PathBuf::from(".lotus_lamp.json"),
        ];
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(PathBuf::from(home).join(".lotus_lamp").join("config.json"));
        }
        paths
    }

    /// Load the first configuration file found in the default locations.
    ///
    /// Returns an empty manager when none exists; connecting then requires an
    /// explicit [`DeviceConfig`].
    pub fn discover() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                debug!("Loading config from {}", path.display());
                return Self::load(&path);
            }
        }
        debug!("No configuration file found in default locations");
        Ok(ConfigManager::new())
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let devices = match serde_json::from_str::<ConfigFile>(&contents)? {
            ConfigFile::Devices { devices } => devices,
            ConfigFile::Single(device) => vec![device],
        };
        info!("Loaded {} device(s) from {}", devices.len(), path.display());
        Ok(ConfigManager {
            devices,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Save to the given path, or to the path the manager was loaded from.
    ///
    /// Parent directories are created as needed.
    pub fn save(&mut self, path: Option<&Path>) -> Result<()> {
        let path = match path.or(self.config_path.as_deref()) {
            Some(p) => p.to_path_buf(),
            None => return Err(Error::General("no config path to save to".into())),
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&ConfigFileOut {
            devices: &self.devices,
        })?;
        fs::write(&path, json)?;
        self.config_path = Some(path);
        Ok(())
    }

    /// Add a device, replacing any existing device with the same name.
    pub fn add_device(&mut self, device: DeviceConfig) {
        if let Some(existing) = self.devices.iter_mut().find(|d| d.name == device.name) {
            *existing = device;
        } else {
            self.devices.push(device);
        }
    }

    /// Remove a device by name. Returns whether anything was removed.
    pub fn remove_device(&mut self, name: &str) -> bool {
        let before = self.devices.len();
        self.devices.retain(|d| d.name != name);
        self.devices.len() != before
    }

    /// Look up a device by name.
    pub fn get_device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Names of all configured devices, in file order.
    pub fn list_devices(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.name.as_str()).collect()
    }

    /// The default device: the first one in the file.
    pub fn default_device(&self) -> Option<&DeviceConfig> {
        self.devices.first()
    }

    /// Resolve a device by optional name: named lookup with a helpful error,
    /// or the default device when no name is given.
    pub fn resolve(&self, name: Option<&str>) -> Result<DeviceConfig> {
        match name {
            Some(name) => self
                .get_device(name)
                .cloned()
                .ok_or_else(|| Error::UnknownDevice(name.to_string())),
            None => self.default_device().cloned().ok_or(Error::NotConfigured),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: DeviceConfig =
            serde_json::from_str(r#"{"name": "MELK-OA10   5F"}"#).unwrap();
        assert_eq!(config.name, "MELK-OA10   5F");
        assert_eq!(config.address, None);
        assert_eq!(config.service_uuid, DEFAULT_SERVICE_UUID);
        assert_eq!(config.write_char_uuid, DEFAULT_WRITE_CHAR_UUID);
        assert_eq!(config.notify_char_uuid, DEFAULT_NOTIFY_CHAR_UUID);
    }

    #[test]
    fn test_round_trip_through_json() {
        let device = DeviceConfig::with_address("Bedroom", "AA:BB:CC:DD:EE:FF");
        let json = serde_json::to_string(&device).unwrap();
        let back: DeviceConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(device, back);
    }

    #[test]
    fn test_load_multi_device_file() {
        let dir = std::env::temp_dir().join("lotus_lamp_test_multi");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(
            &path,
            r#"{"devices": [{"name": "Desk"}, {"name": "Bedroom", "address": "AA:BB:CC:DD:EE:FF"}]}"#,
        )
        .unwrap();

        let manager = ConfigManager::load(&path).unwrap();
        assert_eq!(manager.list_devices(), vec!["Desk", "Bedroom"]);
        assert_eq!(manager.default_device().unwrap().name, "Desk");
        assert_eq!(
            manager.get_device("Bedroom").unwrap().address.as_deref(),
            Some("AA:BB:CC:DD:EE:FF")
        );
    }

    #[test]
    fn test_load_legacy_single_device_file() {
        let dir = std::env::temp_dir().join("lotus_lamp_test_legacy");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        fs::write(&path, r#"{"name": "Old Lamp"}"#).unwrap();

        let manager = ConfigManager::load(&path).unwrap();
        assert_eq!(manager.list_devices(), vec!["Old Lamp"]);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("lotus_lamp_test_save");
        let path = dir.join("nested").join("config.json");
        let _ = fs::remove_file(&path);

        let mut manager = ConfigManager::new();
        manager.add_device(DeviceConfig::new("Desk"));
        manager.add_device(DeviceConfig::with_address("Desk", "11:22:33:44:55:66"));
        manager.save(Some(path.as_path())).unwrap();

        let reloaded = ConfigManager::load(&path).unwrap();
        // add_device replaced the earlier entry instead of duplicating it
        assert_eq!(reloaded.list_devices(), vec!["Desk"]);
        assert_eq!(
            reloaded.default_device().unwrap().address.as_deref(),
            Some("11:22:33:44:55:66")
        );
    }

    #[test]
    fn test_resolve_devices() {
        let mut manager = ConfigManager::new();
        assert!(matches!(manager.resolve(None), Err(Error::NotConfigured)));

        manager.add_device(DeviceConfig::new("Desk"));
        assert_eq!(manager.resolve(None).unwrap().name, "Desk");
        assert_eq!(manager.resolve(Some("Desk")).unwrap().name, "Desk");
        assert!(matches!(
            manager.resolve(Some("Attic")),
            Err(Error::UnknownDevice(_))
        ));

        assert!(manager.remove_device("Desk"));
        assert!(!manager.remove_device("Desk"));
    }
}
