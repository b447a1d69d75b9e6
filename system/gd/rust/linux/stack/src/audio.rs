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

//! Services outside of the Bluetooth stack that LE Audio talks to.

use crate::btif::RawAddress;

/// Volume reported when the volume control service has nothing for the group.
pub const VOLUME_CONTROL_UNKNOWN_VOLUME: i32 = -1;

/// Payload handed to the audio framework along with an active device change.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProfileConnectionInfo {
    /// Do not emit an "audio becoming noisy" event for the previous device.
    pub suppress_noisy_intent: bool,
    pub volume: i32,
    pub is_output: bool,
}

impl ProfileConnectionInfo {
    pub fn le_audio_output(suppress_noisy_intent: bool, volume: i32) -> Self {
        Self { suppress_noisy_intent, volume, is_output: true }
    }

    pub fn le_audio_input(suppress_noisy_intent: bool) -> Self {
        Self { suppress_noisy_intent, volume: VOLUME_CONTROL_UNKNOWN_VOLUME, is_output: false }
    }
}

/// Which framework notification a registered audio device callback waits for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AudioDeviceCallbackKind {
    Added,
    Removed,
}

/// An LE Audio device as enumerated by the audio framework.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AudioDeviceInfo {
    pub address: RawAddress,
    /// Sink (output) port when true, source (input) port otherwise.
    pub is_sink: bool,
}

/// The audio routing framework.
pub trait AudioRouting: Send + Sync {
    fn handle_bluetooth_active_device_changed(
        &self,
        new_device: Option<RawAddress>,
        previous_device: Option<RawAddress>,
        info: ProfileConnectionInfo,
    );

    /// Asks to be told, through `LeAudio::audio_devices_added` or
    /// `LeAudio::audio_devices_removed`, once the framework has applied a change.
    fn register_audio_device_callback(&self, kind: AudioDeviceCallbackKind);
    fn unregister_audio_device_callback(&self, kind: AudioDeviceCallbackKind);
}

/// Volume Control Profile service.
pub trait VolumeControl: Send + Sync {
    /// `None` when the group volume is not known yet.
    fn get_group_volume(&self, group_id: i32) -> Option<i32>;
    fn set_group_volume(&self, group_id: i32, volume: i32);
}

/// Media and telephony control services (MCP / TBS) that gate access per device.
pub trait ContentControl: Send + Sync {
    fn set_device_authorized(&self, addr: RawAddress, authorized: bool);
    fn remove_authorization_info(&self, addr: RawAddress);
    fn set_inband_ringtone(&self, addr: RawAddress, enabled: bool);
}

/// Classic telephony audio (HFP), used to hand a call back after LE Audio goes idle.
pub trait TelephonyAudio: Send + Sync {
    fn set_active_device(&self, addr: RawAddress) -> bool;
}
