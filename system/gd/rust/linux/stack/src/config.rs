// Copyright 2024, The Android Open Source Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! LE Audio tunables.
//!
//! Read from the `[LeAudio]` section of an INI file, for example:
//!
//! ```ini
//! [LeAudio]
//! max_devices = 10
//! connect_timeout_ms = 30000
//! ```

use configparser::ini::Ini;
use std::path::Path;
use std::time::Duration;

use crate::error::LeAudioError;

const SECTION: &str = "leaudio";

/// Hard cap on tracked devices.
const DEFAULT_MAX_DEVICES: usize = 10;
const DEFAULT_MAX_BROADCASTS: i32 = 1;
const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_BOND_REMOVAL_TIMEOUT_MS: u64 = 10_000;

#[derive(Clone, Debug, PartialEq)]
pub struct LeAudioConfig {
    pub max_devices: usize,
    pub max_broadcasts: i32,
    /// Upper bound spent in the connecting and disconnecting states.
    pub connect_timeout: Duration,
    /// How long an unbonded device may stay around waiting for its disconnection.
    pub bond_removal_timeout: Duration,
    pub inband_ringtone_supported: bool,
}

impl Default for LeAudioConfig {
    fn default() -> Self {
        Self {
            max_devices: DEFAULT_MAX_DEVICES,
            max_broadcasts: DEFAULT_MAX_BROADCASTS,
            connect_timeout: Duration::from_millis(DEFAULT_CONNECT_TIMEOUT_MS),
            bond_removal_timeout: Duration::from_millis(DEFAULT_BOND_REMOVAL_TIMEOUT_MS),
            inband_ringtone_supported: true,
        }
    }
}

impl LeAudioConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LeAudioError> {
        let mut ini = Ini::new();
        ini.load(path.as_ref()).map_err(LeAudioError::Config)?;
        Self::from_ini(&ini)
    }

    pub fn from_ini_str(content: &str) -> Result<Self, LeAudioError> {
        let mut ini = Ini::new();
        ini.read(content.to_string()).map_err(LeAudioError::Config)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, LeAudioError> {
        let mut config = Self::default();

        if let Some(max_devices) =
            ini.getuint(SECTION, "max_devices").map_err(LeAudioError::Config)?
        {
            config.max_devices = max_devices as usize;
        }
        if let Some(max_broadcasts) =
            ini.getint(SECTION, "max_broadcasts").map_err(LeAudioError::Config)?
        {
            config.max_broadcasts = i32::try_from(max_broadcasts)
                .map_err(|_| LeAudioError::Config(format!("max_broadcasts {}", max_broadcasts)))?;
        }
        if let Some(ms) =
            ini.getuint(SECTION, "connect_timeout_ms").map_err(LeAudioError::Config)?
        {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) =
            ini.getuint(SECTION, "bond_removal_timeout_ms").map_err(LeAudioError::Config)?
        {
            config.bond_removal_timeout = Duration::from_millis(ms);
        }
        if let Some(supported) =
            ini.getbool(SECTION, "inband_ringtone_supported").map_err(LeAudioError::Config)?
        {
            config.inband_ringtone_supported = supported;
        }

        if config.max_devices == 0 {
            return Err(LeAudioError::Config("max_devices must be at least 1".to_string()));
        }
        Ok(config)
    }
}
