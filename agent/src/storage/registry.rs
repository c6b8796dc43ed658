//! Device registry file management

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::warn;

use crate::errors::BackupError;
use crate::filesys::file::File;

/// A FortiGate appliance to back up
///
/// Missing required fields deserialize as empty so that validation, not
/// loading, rejects the entry.
#[derive(Debug, Deserialize)]
pub struct Device {
    /// Device name, used in artifact names and reports
    #[serde(default)]
    pub name: String,

    /// Hostname or IP address
    #[serde(default)]
    pub host: String,

    /// SSH port
    #[serde(default = "default_port")]
    pub port: u16,

    /// SSH username
    #[serde(default)]
    pub username: String,

    /// SSH password
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    /// Virtual domain, recorded in the artifact header
    #[serde(default = "default_vdom")]
    pub vdom: String,

    /// Per-device timeout override in seconds
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Set when the registry entry could not be read as a device
    #[serde(skip)]
    invalid: Option<String>,
}

fn default_port() -> u16 {
    22
}

fn default_vdom() -> String {
    "root".to_string()
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.map(SecretString::from))
}

impl Device {
    /// Create a device with default port, vdom and timeout
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: default_port(),
            username: username.into(),
            password: Some(SecretString::from(password.into())),
            vdom: default_vdom(),
            timeout: None,
            invalid: None,
        }
    }

    /// Convert one registry entry. An entry that does not deserialize
    /// becomes a descriptor that fails validation, keeping whatever name
    /// and host it carries for reporting.
    fn from_entry(entry: Value) -> Self {
        match serde_json::from_value::<Device>(entry.clone()) {
            Ok(device) => device,
            Err(e) => {
                let text = |key: &str| {
                    entry
                        .get(key)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string()
                };
                let mut device = Device {
                    name: text("name"),
                    host: text("host"),
                    port: default_port(),
                    username: text("username"),
                    password: None,
                    vdom: default_vdom(),
                    timeout: None,
                    invalid: None,
                };
                let reason = format!(
                    "Invalid field '{}' in device '{}': {}",
                    invalid_field(&entry),
                    device.display_name(),
                    e
                );
                warn!("{}", reason);
                device.invalid = Some(reason);
                device
            }
        }
    }

    /// Name for log lines, even when the descriptor has none
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unknown"
        } else {
            &self.name
        }
    }

    /// Timeout for this device, falling back to the global one
    pub fn timeout_or(&self, default: Duration) -> Duration {
        self.timeout.map(Duration::from_secs).unwrap_or(default)
    }

    /// Exposed password, empty if absent
    pub fn password(&self) -> &str {
        self.password
            .as_ref()
            .map(|p| p.expose_secret())
            .unwrap_or("")
    }

    /// Check that the entry was readable, that name, host, username and
    /// password are present, and that the name is usable in a file name
    pub fn validate(&self) -> Result<(), BackupError> {
        if let Some(reason) = &self.invalid {
            return Err(BackupError::ValidationError(reason.clone()));
        }

        let missing = [
            ("name", self.name.trim().is_empty()),
            ("host", self.host.trim().is_empty()),
            ("username", self.username.trim().is_empty()),
            ("password", self.password.is_none()),
        ]
        .into_iter()
        .find(|(_, missing)| *missing);

        match missing {
            Some((field, _)) => Err(BackupError::ValidationError(format!(
                "Required field '{}' not found in device '{}'",
                field,
                self.display_name()
            ))),
            None if !is_safe_name(&self.name) => Err(BackupError::ValidationError(format!(
                "Device name '{}' must not contain path separators",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

fn is_safe_name(name: &str) -> bool {
    !name.contains(['/', '\\']) && name != "." && name != ".."
}

/// First key of an entry that does not deserialize on its own
fn invalid_field(entry: &Value) -> String {
    let Some(object) = entry.as_object() else {
        return "entry".to_string();
    };

    object
        .iter()
        .find(|(key, value)| {
            let single: Map<String, Value> = [((*key).clone(), (*value).clone())].into_iter().collect();
            serde_json::from_value::<Device>(Value::Object(single)).is_err()
        })
        .map(|(key, _)| key.clone())
        .unwrap_or_else(|| "entry".to_string())
}

#[derive(Debug, Default, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    devices: Vec<Value>,
}

/// Devices for one orchestration run, in file order
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
}

impl DeviceRegistry {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }

    /// Load the registry from a JSON document with a `devices` array
    pub async fn load(file: &File) -> Result<Self, BackupError> {
        let contents = file.read_string().await.map_err(|e| {
            BackupError::ConfigError(format!(
                "Unable to read device registry {}: {}",
                file.path().display(),
                e
            ))
        })?;

        Self::parse(&contents).map_err(|e| {
            BackupError::ConfigError(format!(
                "Invalid device registry {}: {}",
                file.path().display(),
                e
            ))
        })
    }

    /// Parse a registry document. Only a malformed document fails; a bad
    /// entry is kept as an invalid device.
    pub fn parse(contents: &str) -> Result<Self, BackupError> {
        let document: RegistryDocument = serde_json::from_str(contents)?;
        Ok(Self::new(
            document.devices.into_iter().map(Device::from_entry).collect(),
        ))
    }

    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn find(&self, name: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
