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

//! Devices and groups known to LE Audio.

use itertools::Itertools;
use log::{error, warn};
use std::collections::BTreeMap;
use tokio::task::JoinHandle;

use crate::btif::RawAddress;
use crate::codec::LeAudioCodecStatus;
use crate::profiles::le_audio::{
    AudioContext, AudioDirection, BtLeAudioConnectionState, LE_AUDIO_GROUP_ID_INVALID,
};
use crate::state_machine::LeAudioStateMachine;

/// Audio location reported before the remote told us anything.
pub const AUDIO_LOCATION_INVALID: u32 = 0;

pub struct DeviceDescriptor {
    pub state_machine: Option<LeAudioStateMachine>,
    pub group_id: i32,
    pub sink_audio_location: u32,
    pub direction: AudioDirection,
    /// Bond was removed while connected; the descriptor goes away once disconnected.
    pub bond_removed: bool,
    pub bond_removal_timer: Option<JoinHandle<()>>,
}

impl DeviceDescriptor {
    fn new() -> Self {
        Self {
            state_machine: None,
            group_id: LE_AUDIO_GROUP_ID_INVALID,
            sink_audio_location: AUDIO_LOCATION_INVALID,
            direction: AudioDirection::empty(),
            bond_removed: false,
            bond_removal_timer: None,
        }
    }

    pub fn connection_state(&self) -> BtLeAudioConnectionState {
        self.state_machine
            .as_ref()
            .map_or(BtLeAudioConnectionState::Disconnected, |sm| sm.state())
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state() == BtLeAudioConnectionState::Connected
    }

    /// Stops the state machine and any pending timer.
    pub fn quit(&mut self) {
        if let Some(mut sm) = self.state_machine.take() {
            sm.quit();
        }
        if let Some(timer) = self.bond_removal_timer.take() {
            timer.abort();
        }
    }
}

#[derive(Default)]
pub struct GroupDescriptor {
    pub is_connected: bool,
    pub is_active: bool,
    pub direction: AudioDirection,
    pub available_contexts: AudioContext,
    pub codec_status: Option<LeAudioCodecStatus>,
    /// Device last chosen to represent the group.
    pub current_lead_device: Option<RawAddress>,
    /// Lead device that dropped while the group was streaming; a key into the device map.
    pub lost_lead_device_while_streaming: Option<RawAddress>,
}

pub struct Registry {
    max_devices: usize,
    devices: BTreeMap<RawAddress, DeviceDescriptor>,
    groups: BTreeMap<i32, GroupDescriptor>,
}

impl Registry {
    pub fn new(max_devices: usize) -> Self {
        Self { max_devices, devices: BTreeMap::new(), groups: BTreeMap::new() }
    }

    pub fn max_devices(&self) -> usize {
        self.max_devices
    }

    /// Returns the descriptor for `addr`, creating it if there is room left.
    pub fn create_device_descriptor(&mut self, addr: RawAddress) -> Option<&mut DeviceDescriptor> {
        if !self.devices.contains_key(&addr) {
            if self.devices.len() >= self.max_devices {
                error!(
                    "[{}]: Maximum number of LE Audio devices ({}) reached",
                    addr, self.max_devices
                );
                return None;
            }
            self.devices.insert(addr, DeviceDescriptor::new());
        }
        self.devices.get_mut(&addr)
    }

    pub fn device(&self, addr: &RawAddress) -> Option<&DeviceDescriptor> {
        self.devices.get(addr)
    }

    pub fn device_mut(&mut self, addr: &RawAddress) -> Option<&mut DeviceDescriptor> {
        self.devices.get_mut(addr)
    }

    pub fn remove_device(&mut self, addr: &RawAddress) -> Option<DeviceDescriptor> {
        let mut descriptor = self.devices.remove(addr)?;
        descriptor.quit();
        Some(descriptor)
    }

    pub fn devices(&self) -> impl Iterator<Item = (&RawAddress, &DeviceDescriptor)> {
        self.devices.iter()
    }

    pub fn group(&self, group_id: i32) -> Option<&GroupDescriptor> {
        self.groups.get(&group_id)
    }

    pub fn group_mut(&mut self, group_id: i32) -> Option<&mut GroupDescriptor> {
        self.groups.get_mut(&group_id)
    }

    pub fn get_or_create_group(&mut self, group_id: i32) -> &mut GroupDescriptor {
        self.groups.entry(group_id).or_default()
    }

    /// Drops the descriptor of an inactive group. Active groups are never removed.
    pub fn remove_group(&mut self, group_id: i32) -> Option<GroupDescriptor> {
        if self.groups.get(&group_id)?.is_active {
            error!("group {}: refusing to remove an active group", group_id);
            return None;
        }
        self.groups.remove(&group_id)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&i32, &GroupDescriptor)> {
        self.groups.iter()
    }

    pub fn group_devices(&self, group_id: i32) -> Vec<RawAddress> {
        if group_id == LE_AUDIO_GROUP_ID_INVALID {
            return Vec::new();
        }
        self.devices.iter().filter(|(_, d)| d.group_id == group_id).map(|(a, _)| *a).collect_vec()
    }

    pub fn connected_group_devices(&self, group_id: i32) -> Vec<RawAddress> {
        if group_id == LE_AUDIO_GROUP_ID_INVALID {
            return Vec::new();
        }
        self.devices
            .iter()
            .filter(|(_, d)| d.group_id == group_id && d.is_connected())
            .map(|(a, _)| *a)
            .collect_vec()
    }

    /// A group is valid as long as it has at least one member.
    pub fn has_group_members(&self, group_id: i32) -> bool {
        self.devices.values().any(|d| d.group_id == group_id)
    }

    pub fn group_id(&self, addr: &RawAddress) -> i32 {
        self.devices.get(addr).map_or(LE_AUDIO_GROUP_ID_INVALID, |d| d.group_id)
    }

    pub fn active_group_id(&self) -> i32 {
        let mut active = self.groups.iter().filter(|(_, g)| g.is_active).map(|(id, _)| *id);
        let group_id = active.next().unwrap_or(LE_AUDIO_GROUP_ID_INVALID);
        if active.next().is_some() {
            warn!("More than one active group, reporting {}", group_id);
        }
        group_id
    }

    /// Takes every descriptor out, stopping all state machines first.
    pub fn clear(&mut self) {
        for descriptor in self.devices.values_mut() {
            descriptor.quit();
        }
        self.devices.clear();
        self.groups.clear();
    }
}
