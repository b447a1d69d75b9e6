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

//! LE Audio group and broadcast coordination.
//!
//! [`LeAudio`] owns every device, group and broadcast descriptor. It consumes native events
//! through [`LeAudio::dispatch_le_audio_callbacks`], decides which device represents the active
//! group to the audio framework, and reports everything to registered listeners.

use itertools::Itertools;
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc::Sender;
use tokio::time;

use crate::audio::{
    AudioDeviceCallbackKind, AudioDeviceInfo, AudioRouting, ContentControl,
    ProfileConnectionInfo, TelephonyAudio, VolumeControl, VOLUME_CONTROL_UNKNOWN_VOLUME,
};
use crate::broadcast::{
    validate_broadcast_code, BroadcastMetadata, BroadcastReason, BroadcastSessions,
    ContentMetadata, BROADCAST_PLACEHOLDER_DEVICE,
};
use crate::btif::{RawAddress, Uuid};
use crate::callbacks::{CallbackResult, Callbacks};
use crate::codec::{LeAudioCodecConfig, LeAudioCodecStatus};
use crate::config::LeAudioConfig;
use crate::error::LeAudioError;
use crate::profiles::le_audio::{
    AudioContext, AudioDirection, BtLeAudioConnectionState, BtLeAudioGroupNodeStatus,
    BtLeAudioGroupStatus, BtLeBroadcastState, LeAudioClientCallbacks,
    LeAudioClientCallbacksDispatcher, LeAudioNativeInterface, LE_AUDIO_GROUP_ID_INVALID,
};
use crate::registry::Registry;
use crate::state_machine::{LeAudioStateMachine, LeAudioStateMachineRequest, StateTransition};
use crate::Message;

/// Generic Media Control Service.
const UUID_GENERIC_MEDIA_CONTROL: u16 = 0x1849;
/// Generic Telephone Bearer Service.
const UUID_GENERIC_TELEPHONY_BEARER: u16 = 0x184C;

/// Deferred work posted back onto the stack's message channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LeAudioActions {
    ConnectTimeout(RawAddress),
    BondRemovalTimeout(RawAddress),
}

/// Observer of device and group events.
///
/// Every method defaults to doing nothing so that listeners only implement what they need.
pub trait ILeAudioCallback: Send {
    fn on_connection_state_changed(
        &mut self,
        _addr: RawAddress,
        _prev_state: BtLeAudioConnectionState,
        _state: BtLeAudioConnectionState,
    ) -> CallbackResult {
        Ok(())
    }

    fn on_group_node_added(&mut self, _addr: RawAddress, _group_id: i32) -> CallbackResult {
        Ok(())
    }

    fn on_group_node_removed(&mut self, _addr: RawAddress, _group_id: i32) -> CallbackResult {
        Ok(())
    }

    fn on_group_status_changed(
        &mut self,
        _group_id: i32,
        _status: BtLeAudioGroupStatus,
    ) -> CallbackResult {
        Ok(())
    }

    fn on_codec_config_changed(
        &mut self,
        _group_id: i32,
        _status: &LeAudioCodecStatus,
    ) -> CallbackResult {
        Ok(())
    }

    /// The audio framework confirmed a change of the active device. `None` once nothing is active.
    fn on_active_device_changed(&mut self, _addr: Option<RawAddress>) -> CallbackResult {
        Ok(())
    }
}

/// Observer of broadcast lifecycle events.
pub trait ILeAudioBroadcastCallback: Send {
    fn on_broadcast_started(&mut self, _reason: BroadcastReason, _id: i32) -> CallbackResult {
        Ok(())
    }

    fn on_broadcast_start_failed(&mut self, _reason: BroadcastReason) -> CallbackResult {
        Ok(())
    }

    fn on_broadcast_stopped(&mut self, _reason: BroadcastReason, _id: i32) -> CallbackResult {
        Ok(())
    }

    fn on_broadcast_stop_failed(&mut self, _reason: BroadcastReason) -> CallbackResult {
        Ok(())
    }

    fn on_playback_started(&mut self, _reason: BroadcastReason, _id: i32) -> CallbackResult {
        Ok(())
    }

    fn on_playback_stopped(&mut self, _reason: BroadcastReason, _id: i32) -> CallbackResult {
        Ok(())
    }

    fn on_broadcast_updated(&mut self, _reason: BroadcastReason, _id: i32) -> CallbackResult {
        Ok(())
    }

    fn on_broadcast_update_failed(&mut self, _reason: BroadcastReason, _id: i32) -> CallbackResult {
        Ok(())
    }

    fn on_broadcast_metadata_changed(
        &mut self,
        _id: i32,
        _metadata: &BroadcastMetadata,
    ) -> CallbackResult {
        Ok(())
    }
}

/// LE Audio API exposed to applications and services.
pub trait ILeAudio {
    /// Adds a device and group observer. Returns the id used to unregister it.
    fn register_callback(&mut self, callback: Box<dyn ILeAudioCallback>) -> u32;

    /// Returns false if `callback_id` is not recognized.
    fn unregister_callback(&mut self, callback_id: u32) -> bool;

    fn register_broadcast_callback(&mut self, callback: Box<dyn ILeAudioBroadcastCallback>) -> u32;

    fn unregister_broadcast_callback(&mut self, callback_id: u32) -> bool;

    /// Connects `addr` and then the rest of its group.
    ///
    /// Returns false if the device cannot be tracked, e.g. because too many devices are known.
    fn connect(&mut self, addr: RawAddress) -> bool;

    fn disconnect(&mut self, addr: RawAddress) -> bool;

    fn get_connected_devices(&self) -> Vec<RawAddress>;

    fn get_devices_matching_connection_states(
        &self,
        states: &[BtLeAudioConnectionState],
    ) -> Vec<RawAddress>;

    fn get_connection_state(&self, addr: RawAddress) -> BtLeAudioConnectionState;

    /// Makes the group of `addr` active, or clears the active group with `None`.
    ///
    /// Activation completes once the native stack reports the group as active.
    fn set_active_device(&mut self, addr: Option<RawAddress>) -> bool;

    /// The lead device of the active group and one of its peers.
    fn get_active_devices(&self) -> (Option<RawAddress>, Option<RawAddress>);

    fn get_group_id(&self, addr: RawAddress) -> i32;

    fn get_group_devices(&self, group_id: i32) -> Vec<RawAddress>;

    fn get_connected_group_lead_device(&self, group_id: i32) -> Option<RawAddress>;

    fn get_active_group_id(&self) -> i32;

    fn get_audio_location(&self, addr: RawAddress) -> u32;

    fn get_codec_status(&self, group_id: i32) -> Option<LeAudioCodecStatus>;

    fn set_codec_config_preference(
        &mut self,
        group_id: i32,
        input_codec_config: LeAudioCodecConfig,
        output_codec_config: LeAudioCodecConfig,
    ) -> Result<(), LeAudioError>;

    fn group_add_node(&mut self, group_id: i32, addr: RawAddress) -> bool;

    fn group_remove_node(&mut self, group_id: i32, addr: RawAddress) -> bool;

    /// Sets the volume of the active group.
    fn set_volume(&mut self, volume: i32);

    fn set_in_call(&mut self, in_call: bool);

    /// Drops the active group so that `hfp_device` can take the call over.
    ///
    /// Returns false if no group is active.
    fn set_inactive_for_hfp_handover(&mut self, hfp_device: RawAddress) -> bool;

    /// Ties a content control id to the context types of `user`.
    fn set_ccid_information(&mut self, user: Uuid, ccid: i32, context_type: AudioContext);

    fn create_broadcast(
        &mut self,
        metadata: ContentMetadata,
        broadcast_code: Option<Vec<u8>>,
    ) -> Result<(), LeAudioError>;

    fn start_broadcast(&mut self, broadcast_id: i32);

    fn update_broadcast(&mut self, broadcast_id: i32, metadata: ContentMetadata);

    fn stop_broadcast(&mut self, broadcast_id: i32);

    fn destroy_broadcast(&mut self, broadcast_id: i32);

    fn is_playing(&self, broadcast_id: i32) -> bool;

    fn get_all_broadcast_metadata(&self) -> Vec<BroadcastMetadata>;

    fn get_maximum_number_of_broadcasts(&self) -> i32;
}

/// Coordinates LE Audio devices, groups and broadcasts.
///
/// Callers share it as `Arc<Mutex<LeAudio>>`; that mutex is the single group lock.
pub struct LeAudio {
    config: LeAudioConfig,
    enabled: bool,

    native: Arc<dyn LeAudioNativeInterface>,
    audio_routing: Arc<dyn AudioRouting>,
    volume_control: Option<Arc<dyn VolumeControl>>,
    content_control: Option<Arc<dyn ContentControl>>,
    telephony_audio: Option<Arc<dyn TelephonyAudio>>,

    registry: Registry,
    broadcasts: BroadcastSessions,

    active_out_device: Option<RawAddress>,
    active_in_device: Option<RawAddress>,
    hfp_handover_device: Option<RawAddress>,

    input_local_codec_capabilities: Vec<LeAudioCodecConfig>,
    output_local_codec_capabilities: Vec<LeAudioCodecConfig>,

    native_initialized: bool,
    ccid_info: BTreeMap<Uuid, (i32, AudioContext)>,

    callbacks: Callbacks<dyn ILeAudioCallback>,
    broadcast_callbacks: Callbacks<dyn ILeAudioBroadcastCallback>,

    tx: Option<Sender<Message>>,
}

impl LeAudio {
    /// `tx` receives timer actions. Without it, or outside of a tokio runtime, no timer is armed.
    pub fn new(
        native: Arc<dyn LeAudioNativeInterface>,
        audio_routing: Arc<dyn AudioRouting>,
        tx: Option<Sender<Message>>,
    ) -> Self {
        let config = LeAudioConfig::default();
        Self {
            registry: Registry::new(config.max_devices),
            config,
            enabled: false,
            native,
            audio_routing,
            volume_control: None,
            content_control: None,
            telephony_audio: None,
            broadcasts: BroadcastSessions::new(),
            active_out_device: None,
            active_in_device: None,
            hfp_handover_device: None,
            input_local_codec_capabilities: Vec::new(),
            output_local_codec_capabilities: Vec::new(),
            native_initialized: false,
            ccid_info: BTreeMap::new(),
            callbacks: Callbacks::new("LeAudio"),
            broadcast_callbacks: Callbacks::new("LeAudioBroadcast"),
            tx,
        }
    }

    pub fn set_volume_control(&mut self, volume_control: Option<Arc<dyn VolumeControl>>) {
        self.volume_control = volume_control;
    }

    pub fn set_content_control(&mut self, content_control: Option<Arc<dyn ContentControl>>) {
        self.content_control = content_control;
    }

    pub fn set_telephony_audio(&mut self, telephony_audio: Option<Arc<dyn TelephonyAudio>>) {
        self.telephony_audio = telephony_audio;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn start(&mut self, config: LeAudioConfig) {
        if self.enabled {
            warn!("LE Audio already started");
            return;
        }
        info!("Starting LE Audio with {:?}", config);
        self.registry = Registry::new(config.max_devices);
        self.config = config;
        self.enabled = true;
    }

    /// Deactivates the active group, stops every state machine, then drops all descriptors.
    pub fn stop(&mut self) {
        if !self.enabled {
            return;
        }
        info!("Stopping LE Audio");

        let active_group_id = self.registry.active_group_id();
        if active_group_id != LE_AUDIO_GROUP_ID_INVALID {
            self.native.group_set_active(LE_AUDIO_GROUP_ID_INVALID);
            self.handle_group_transit_to_inactive(active_group_id);
        }
        if self.active_out_device == Some(BROADCAST_PLACEHOLDER_DEVICE) {
            self.update_broadcast_active_device(None, true);
        }

        self.registry.clear();
        self.broadcasts.clear();
        self.active_out_device = None;
        self.active_in_device = None;
        self.hfp_handover_device = None;
        self.input_local_codec_capabilities.clear();
        self.output_local_codec_capabilities.clear();
        self.native_initialized = false;
        self.enabled = false;
    }

    pub fn get_active_out_device(&self) -> Option<RawAddress> {
        self.active_out_device
    }

    pub fn get_active_in_device(&self) -> Option<RawAddress> {
        self.active_in_device
    }

    /// The single entry point for native events.
    pub fn dispatch_le_audio_callbacks(&mut self, cb: LeAudioClientCallbacks) {
        match cb {
            LeAudioClientCallbacks::Initialized => {
                info!("LE Audio native initialized");
                self.native_initialized = true;
                for (user, (ccid, context)) in self.ccid_info.iter() {
                    debug!("Replaying ccid {} for {} ({:?})", ccid, user, context);
                    self.native.set_ccid_information(*ccid, context.bits() as i32);
                }
            }
            LeAudioClientCallbacks::ConnectionStateChanged(addr, state) => {
                self.handle_connection_state_event(addr, state);
            }
            LeAudioClientCallbacks::GroupNodeStatusChanged(addr, group_id, status) => {
                match status {
                    BtLeAudioGroupNodeStatus::Added => self.handle_group_node_added(addr, group_id),
                    BtLeAudioGroupNodeStatus::Removed => {
                        self.handle_group_node_removed(addr, group_id)
                    }
                }
            }
            LeAudioClientCallbacks::AudioLocalCodecCapabilitiesChanged(input, output) => {
                self.input_local_codec_capabilities = input;
                self.output_local_codec_capabilities = output;
            }
            LeAudioClientCallbacks::AudioGroupCodecConfigChanged(
                group_id,
                input_codec_config,
                output_codec_config,
                input_selectable,
                output_selectable,
            ) => {
                let status = LeAudioCodecStatus {
                    input_codec_config,
                    output_codec_config,
                    input_codec_local_capabilities: self.input_local_codec_capabilities.clone(),
                    output_codec_local_capabilities: self.output_local_codec_capabilities.clone(),
                    input_codec_selectable_capabilities: input_selectable,
                    output_codec_selectable_capabilities: output_selectable,
                };
                self.handle_group_codec_config_changed(group_id, status);
            }
            LeAudioClientCallbacks::AudioConfChanged(
                direction,
                group_id,
                sink_location,
                source_location,
                available_contexts,
            ) => {
                debug!(
                    "group {}: audio conf direction {:?} sink {:#x} source {:#x} contexts {:?}",
                    group_id, direction, sink_location, source_location, available_contexts
                );
                self.handle_audio_conf_changed(group_id, direction, available_contexts);
            }
            LeAudioClientCallbacks::SinkAudioLocationAvailable(addr, location) => {
                match self.registry.device_mut(&addr) {
                    Some(descriptor) => descriptor.sink_audio_location = location,
                    None => warn!("[{}]: sink audio location for unknown device", addr),
                }
            }
            LeAudioClientCallbacks::GroupStatusChanged(group_id, status) => match status {
                BtLeAudioGroupStatus::Active => self.handle_group_transit_to_active(group_id),
                BtLeAudioGroupStatus::Inactive => self.handle_group_transit_to_inactive(group_id),
                BtLeAudioGroupStatus::TurnedIdleDuringCall => self.handle_group_idle_during_call(),
            },
            LeAudioClientCallbacks::BroadcastCreated(broadcast_id, success) => {
                self.handle_broadcast_created(broadcast_id, success);
            }
            LeAudioClientCallbacks::BroadcastDestroyed(broadcast_id) => {
                debug!("Broadcast {} destroyed", broadcast_id);
                self.broadcasts.purge(broadcast_id);
            }
            LeAudioClientCallbacks::BroadcastState(broadcast_id, state) => {
                self.handle_broadcast_state(broadcast_id, state);
            }
            LeAudioClientCallbacks::BroadcastMetadataChanged(broadcast_id, metadata) => {
                self.handle_broadcast_metadata_changed(broadcast_id, metadata);
            }
        }
    }

    pub fn handle_action(&mut self, action: LeAudioActions) {
        match action {
            LeAudioActions::ConnectTimeout(addr) => {
                self.process_state_machine(addr, LeAudioStateMachineRequest::ConnectTimeout);
            }
            LeAudioActions::BondRemovalTimeout(addr) => {
                let pending = self.registry.device(&addr).is_some_and(|d| d.bond_removed);
                if pending {
                    warn!("[{}]: disconnection after unbond never completed, removing", addr);
                    self.remove_device_descriptor(addr);
                }
            }
        }
    }

    /// Entry point for bond changes. Dropping the bond forgets the device once it is disconnected.
    pub fn bond_state_changed(&mut self, addr: RawAddress, bonded: bool) {
        if bonded {
            return;
        }
        let Some(descriptor) = self.registry.device_mut(&addr) else {
            debug!("[{}]: unbonded device was never tracked", addr);
            return;
        };

        if descriptor.connection_state() == BtLeAudioConnectionState::Disconnected {
            self.remove_device_descriptor(addr);
            return;
        }

        info!("[{}]: disconnecting device because it was unbonded", addr);
        descriptor.bond_removed = true;
        self.process_state_machine(addr, LeAudioStateMachineRequest::Disconnect);
        self.arm_bond_removal_timer(addr);
    }

    /// The audio framework added devices after an active device change.
    pub fn audio_devices_added(&mut self, devices: &[AudioDeviceInfo]) {
        let found = devices.iter().filter(|info| !info.address.is_empty()).find(|info| {
            let active =
                if info.is_sink { self.active_out_device } else { self.active_in_device };
            active == Some(info.address)
        });
        if let Some(info) = found {
            let addr = info.address;
            debug!("[{}]: audio device added", addr);
            self.audio_routing.unregister_audio_device_callback(AudioDeviceCallbackKind::Added);
            self.callbacks.for_all_callbacks(|cb| cb.on_active_device_changed(Some(addr)));
        }
    }

    /// The audio framework removed devices after an active device change.
    pub fn audio_devices_removed(&mut self, devices: &[AudioDeviceInfo]) {
        let found = devices.iter().filter(|info| !info.address.is_empty()).find(|info| {
            let active =
                if info.is_sink { self.active_out_device } else { self.active_in_device };
            active.is_none()
        });
        if let Some(info) = found {
            debug!("[{}]: audio device removed", info.address);
            self.audio_routing.unregister_audio_device_callback(AudioDeviceCallbackKind::Removed);
            self.callbacks.for_all_callbacks(|cb| cb.on_active_device_changed(None));
        }
    }

    /// Snapshot of the coordinator state for debugging.
    pub fn dump(&self) -> Value {
        let devices: Vec<Value> = self
            .registry
            .devices()
            .map(|(addr, d)| {
                json!({
                    "address": addr.to_string(),
                    "state": format!("{:?}", d.connection_state()),
                    "group_id": d.group_id,
                    "sink_audio_location": d.sink_audio_location,
                    "direction": d.direction.bits(),
                    "bond_removed": d.bond_removed,
                })
            })
            .collect();
        let groups: Vec<Value> = self
            .registry
            .groups()
            .map(|(group_id, g)| {
                json!({
                    "group_id": group_id,
                    "is_connected": g.is_connected,
                    "is_active": g.is_active,
                    "direction": g.direction.bits(),
                    "available_contexts": g.available_contexts.bits(),
                    "lead_device": g.current_lead_device.map(|a| a.to_string()),
                    "lost_lead_device": g.lost_lead_device_while_streaming.map(|a| a.to_string()),
                    "has_codec_status": g.codec_status.is_some(),
                })
            })
            .collect();
        let broadcasts: Vec<Value> = self
            .broadcasts
            .ids()
            .into_iter()
            .map(|id| {
                json!({
                    "broadcast_id": id,
                    "state": self.broadcasts.state(id).map(|s| format!("{:?}", s)),
                    "is_playing": self.broadcasts.is_playing(id),
                    "has_metadata": self.broadcasts.metadata(id).is_some(),
                })
            })
            .collect();

        json!({
            "enabled": self.enabled,
            "native_initialized": self.native_initialized,
            "max_devices": self.registry.max_devices(),
            "active_out_device": self.active_out_device.map(|a| a.to_string()),
            "active_in_device": self.active_in_device.map(|a| a.to_string()),
            "devices": devices,
            "groups": groups,
            "broadcasts": broadcasts,
        })
    }

    fn arm_bond_removal_timer(&mut self, addr: RawAddress) {
        let Some(tx) = self.tx.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let timeout = self.config.bond_removal_timeout;
        let Some(descriptor) = self.registry.device_mut(&addr) else {
            // Already disconnected and removed.
            return;
        };
        if let Some(timer) = descriptor.bond_removal_timer.take() {
            timer.abort();
        }
        descriptor.bond_removal_timer = Some(runtime.spawn(async move {
            time::sleep(timeout).await;
            let _result =
                tx.send(Message::LeAudioActions(LeAudioActions::BondRemovalTimeout(addr))).await;
        }));
    }

    fn get_or_create_state_machine(&mut self, addr: RawAddress) -> bool {
        let native = self.native.clone();
        let tx = self.tx.clone();
        let connect_timeout = self.config.connect_timeout;
        let Some(descriptor) = self.registry.create_device_descriptor(addr) else {
            return false;
        };
        if descriptor.state_machine.is_none() {
            debug!("[{}]: creating state machine", addr);
            descriptor.state_machine =
                Some(LeAudioStateMachine::new(addr, native, tx, connect_timeout));
        }
        true
    }

    fn process_state_machine(&mut self, addr: RawAddress, request: LeAudioStateMachineRequest) {
        let transitions =
            match self.registry.device_mut(&addr).and_then(|d| d.state_machine.as_mut()) {
                Some(sm) => sm.process(request),
                None => {
                    warn!("[{}]: no state machine for {:?}", addr, request);
                    return;
                }
            };
        for transition in transitions {
            self.handle_connection_transition(addr, transition);
        }
    }

    /// Sends a connect to every other member of the group of `addr`.
    fn connect_set(&mut self, addr: RawAddress) {
        let group_id = self.registry.group_id(&addr);
        if group_id == LE_AUDIO_GROUP_ID_INVALID {
            return;
        }
        for sibling in self.registry.group_devices(group_id) {
            if sibling == addr {
                continue;
            }
            debug!("[{}]: connecting with set member {}", sibling, addr);
            if self.get_or_create_state_machine(sibling) {
                self.process_state_machine(sibling, LeAudioStateMachineRequest::Connect);
            }
        }
    }

    fn handle_connection_state_event(&mut self, addr: RawAddress, state: BtLeAudioConnectionState) {
        let Some(descriptor) = self.registry.device(&addr) else {
            warn!("[{}]: connection state {:?} for unknown device", addr, state);
            return;
        };
        let group_id = descriptor.group_id;
        let has_state_machine = descriptor.state_machine.is_some();
        let bond_removed = descriptor.bond_removed;

        if let Some(group) = self.registry.group_mut(group_id) {
            if state == BtLeAudioConnectionState::Connected
                && group.lost_lead_device_while_streaming == Some(addr)
            {
                info!("[{}]: lost lead device is back, group {}", addr, group_id);
                group.lost_lead_device_while_streaming = None;
                self.connect_set(addr);
                return;
            }
        }

        let is_active_device =
            self.active_out_device == Some(addr) || self.active_in_device == Some(addr);
        if state == BtLeAudioConnectionState::Disconnected && is_active_device && !bond_removed {
            let group_is_active = self.registry.group(group_id).is_some_and(|g| g.is_active);
            if group_is_active && self.registry.connected_group_devices(group_id).len() >= 2 {
                info!("[{}]: lead device lost while streaming, group {}", addr, group_id);
                if let Some(group) = self.registry.group_mut(group_id) {
                    group.lost_lead_device_while_streaming = Some(addr);
                }
                return;
            }
        }

        if !has_state_machine {
            match state {
                BtLeAudioConnectionState::Connecting | BtLeAudioConnectionState::Connected => {
                    if !self.get_or_create_state_machine(addr) {
                        return;
                    }
                    // Incoming connection, bring the rest of the set along.
                    self.connect_set(addr);
                }
                _ => {
                    warn!("[{}]: {:?} without a state machine", addr, state);
                    return;
                }
            }
        }

        self.process_state_machine(addr, LeAudioStateMachineRequest::StackEvent(state));
    }

    fn handle_connection_transition(&mut self, addr: RawAddress, transition: StateTransition) {
        match transition.current {
            BtLeAudioConnectionState::Connected => {
                let group_id = self.registry.group_id(&addr);
                match self.registry.group_mut(group_id) {
                    Some(group) => group.is_connected = true,
                    None => debug!("[{}]: connected without a group", addr),
                }
            }
            BtLeAudioConnectionState::Disconnected => self.handle_device_disconnected(addr),
            _ => (),
        }

        self.callbacks.for_all_callbacks(|cb| {
            cb.on_connection_state_changed(addr, transition.previous, transition.current)
        });
    }

    fn handle_device_disconnected(&mut self, addr: RawAddress) {
        let group_id = self.registry.group_id(&addr);
        if let Some(content_control) = &self.content_control {
            content_control.set_device_authorized(addr, false);
        }
        if self.registry.device(&addr).is_some_and(|d| d.bond_removed) {
            self.remove_device_descriptor(addr);
        }

        let Some(group) = self.registry.group(group_id) else {
            return;
        };
        let is_active = group.is_active;
        let lost_lead = group.lost_lead_device_while_streaming;
        let connected = self.registry.connected_group_devices(group_id);

        if connected.len() == 1 && lost_lead == Some(connected[0]) {
            // Only the lost lead still looks connected, let it go as well.
            self.clear_lost_lead_device(group_id);
            return;
        }

        if connected.is_empty() {
            if let Some(group) = self.registry.group_mut(group_id) {
                group.is_connected = false;
            }
            if is_active {
                self.native.group_set_active(LE_AUDIO_GROUP_ID_INVALID);
                self.handle_group_transit_to_inactive(group_id);
            }
            return;
        }

        if is_active {
            self.refresh_active_group(group_id);
        }
    }

    /// Forgets `addr`. The group goes inactive first if this was its last member, otherwise
    /// the active devices are rearbitrated once `addr` is gone.
    fn remove_device_descriptor(&mut self, addr: RawAddress) {
        let group_id = self.registry.group_id(&addr);
        let last_member = group_id != LE_AUDIO_GROUP_ID_INVALID
            && self.registry.group_devices(group_id) == vec![addr];
        let previous_state = self.get_connection_state(addr);
        let was_active_device =
            self.active_out_device == Some(addr) || self.active_in_device == Some(addr);

        if let Some(group) = self.registry.group_mut(group_id) {
            if group.lost_lead_device_while_streaming == Some(addr) {
                group.lost_lead_device_while_streaming = None;
            }
        }
        if last_member {
            self.handle_group_transit_to_inactive(group_id);
        }

        info!("[{}]: removing device", addr);
        self.registry.remove_device(&addr);
        if let Some(content_control) = &self.content_control {
            content_control.remove_authorization_info(addr);
        }
        if previous_state != BtLeAudioConnectionState::Disconnected {
            self.callbacks.for_all_callbacks(|cb| {
                cb.on_connection_state_changed(
                    addr,
                    previous_state,
                    BtLeAudioConnectionState::Disconnected,
                )
            });
        }

        if last_member {
            debug!("group {}: removing, last member gone", group_id);
            self.registry.remove_group(group_id);
            return;
        }
        let group_is_active = self.registry.group(group_id).is_some_and(|g| g.is_active);
        if was_active_device && group_is_active {
            if self.registry.connected_group_devices(group_id).is_empty() {
                self.native.group_set_active(LE_AUDIO_GROUP_ID_INVALID);
                self.handle_group_transit_to_inactive(group_id);
            } else {
                self.refresh_active_group(group_id);
            }
        }
    }

    fn handle_group_node_added(&mut self, addr: RawAddress, group_id: i32) {
        let Some(descriptor) = self.registry.create_device_descriptor(addr) else {
            error!("[{}]: cannot add to group {}, too many devices", addr, group_id);
            return;
        };
        descriptor.group_id = group_id;
        self.registry.get_or_create_group(group_id);
        info!("[{}]: added to group {}", addr, group_id);

        self.callbacks.for_all_callbacks(|cb| cb.on_group_node_added(addr, group_id));
        if self.enabled {
            if let Some(content_control) = &self.content_control {
                content_control.set_device_authorized(addr, true);
            }
        }
    }

    fn handle_group_node_removed(&mut self, addr: RawAddress, group_id: i32) {
        let Some(group) = self.registry.group(group_id) else {
            warn!("[{}]: removed from unknown group {}", addr, group_id);
            return;
        };
        let was_lost_lead = group.lost_lead_device_while_streaming == Some(addr);
        if self.registry.group_id(&addr) != group_id {
            warn!("[{}]: removed from group {} it is not part of", addr, group_id);
            return;
        }

        // The suppressed disconnection is replayed while the device still belongs to the group.
        if was_lost_lead {
            self.clear_lost_lead_device(group_id);
        }

        let group_is_active = self.registry.group(group_id).is_some_and(|g| g.is_active);
        let last_member = self.registry.group_devices(group_id) == vec![addr];
        if last_member && group_is_active {
            self.handle_group_transit_to_inactive(group_id);
        }
        if let Some(descriptor) = self.registry.device_mut(&addr) {
            descriptor.group_id = LE_AUDIO_GROUP_ID_INVALID;
        }
        if last_member {
            debug!("group {}: removing, last member gone", group_id);
            self.registry.remove_group(group_id);
        }
        info!("[{}]: removed from group {}", addr, group_id);

        self.callbacks.for_all_callbacks(|cb| cb.on_group_node_removed(addr, group_id));
        if let Some(content_control) = &self.content_control {
            content_control.set_device_authorized(addr, false);
            content_control.remove_authorization_info(addr);
        }
    }

    fn handle_group_codec_config_changed(&mut self, group_id: i32, status: LeAudioCodecStatus) {
        let Some(group) = self.registry.group_mut(group_id) else {
            warn!("group {}: codec config for unknown group", group_id);
            return;
        };
        if group.codec_status.as_ref() == Some(&status) {
            return;
        }
        group.codec_status = Some(status.clone());
        self.callbacks.for_all_callbacks(|cb| cb.on_codec_config_changed(group_id, &status));
    }

    fn handle_audio_conf_changed(
        &mut self,
        group_id: i32,
        direction: AudioDirection,
        available_contexts: AudioContext,
    ) {
        let Some(group) = self.registry.group(group_id) else {
            warn!("group {}: audio conf for unknown group", group_id);
            return;
        };
        let previous_direction = group.direction;

        if group.is_active {
            let is_active =
                self.update_active_devices(group_id, previous_direction, direction, true);
            if let Some(group) = self.registry.group_mut(group_id) {
                group.is_active = is_active;
            }
            if !is_active {
                self.release_group(group_id, direction);
            }
        }

        if let Some(group) = self.registry.group_mut(group_id) {
            group.direction = direction;
            group.available_contexts = available_contexts;
        }
        self.update_inband_ringtone(group_id);
    }

    fn handle_group_transit_to_active(&mut self, group_id: i32) {
        let Some(group) = self.registry.group(group_id) else {
            warn!("group {}: active status for unknown group", group_id);
            return;
        };
        if group.is_active {
            debug!("group {}: already active", group_id);
            return;
        }
        let direction = group.direction;

        let is_active =
            self.update_active_devices(group_id, AudioDirection::empty(), direction, true);
        if let Some(group) = self.registry.group_mut(group_id) {
            group.is_active = is_active;
        }
        if !is_active {
            warn!("group {}: no device could be made active", group_id);
            return;
        }

        let others = self
            .registry
            .groups()
            .filter(|(id, g)| **id != group_id && g.is_active)
            .map(|(id, _)| *id)
            .collect_vec();
        for other in others {
            debug!("group {}: replaced by group {}", other, group_id);
            if let Some(group) = self.registry.group_mut(other) {
                group.is_active = false;
            }
        }

        self.notify_group_status(group_id, BtLeAudioGroupStatus::Active);
        self.update_inband_ringtone(group_id);
    }

    fn handle_group_transit_to_inactive(&mut self, group_id: i32) {
        let Some(group) = self.registry.group_mut(group_id) else {
            warn!("group {}: inactive status for unknown group", group_id);
            return;
        };
        if !group.is_active {
            debug!("group {}: already inactive", group_id);
            return;
        }
        group.is_active = false;
        let direction = group.direction;
        self.release_group(group_id, direction);
    }

    /// Moves every active device pointer still owned by the inactive `group_id` away from it.
    fn release_group(&mut self, group_id: i32, direction: AudioDirection) {
        self.update_active_devices(group_id, direction, AudioDirection::empty(), false);
        self.clear_lost_lead_device(group_id);
        self.notify_group_status(group_id, BtLeAudioGroupStatus::Inactive);
        self.update_inband_ringtone(group_id);
    }

    fn handle_group_idle_during_call(&mut self) {
        let Some(hfp_device) = self.hfp_handover_device else {
            debug!("Group idle during call without HFP handover");
            return;
        };
        let Some(telephony_audio) = &self.telephony_audio else {
            debug!("No telephony audio to hand the call over to");
            return;
        };
        self.hfp_handover_device = None;
        info!("[{}]: handing the call over to HFP", hfp_device);
        if !telephony_audio.set_active_device(hfp_device) {
            warn!("[{}]: HFP refused to become active", hfp_device);
        }
    }

    /// Replays the disconnection of a lead device that was kept alive while streaming.
    fn clear_lost_lead_device(&mut self, group_id: i32) {
        let Some(group) = self.registry.group_mut(group_id) else {
            return;
        };
        let Some(lost) = group.lost_lead_device_while_streaming.take() else {
            return;
        };
        if self.registry.device(&lost).is_some_and(|d| d.state_machine.is_some()) {
            info!("[{}]: releasing lost lead device of group {}", lost, group_id);
            self.process_state_machine(
                lost,
                LeAudioStateMachineRequest::StackEvent(BtLeAudioConnectionState::Disconnected),
            );
        }
    }

    /// Reruns arbitration for an active group whose membership changed.
    fn refresh_active_group(&mut self, group_id: i32) {
        let Some(direction) = self.registry.group(group_id).map(|g| g.direction) else {
            return;
        };
        let is_active = self.update_active_devices(group_id, direction, direction, true);
        if let Some(group) = self.registry.group_mut(group_id) {
            group.is_active = is_active;
        }
        if !is_active {
            self.release_group(group_id, direction);
        }
    }

    /// The device representing `group_id`: the active output if it belongs to the group, then
    /// the previous lead, then the first connected member.
    fn lead_device(&self, group_id: i32) -> Option<RawAddress> {
        let connected = self.registry.connected_group_devices(group_id);
        let current_lead = self.registry.group(group_id).and_then(|g| g.current_lead_device);
        [self.active_out_device, self.active_in_device, current_lead]
            .into_iter()
            .flatten()
            .find(|addr| connected.contains(addr))
            .or_else(|| connected.first().copied())
    }

    fn group_volume(&self, group_id: i32) -> i32 {
        self.volume_control
            .as_ref()
            .and_then(|volume_control| volume_control.get_group_volume(group_id))
            .unwrap_or(VOLUME_CONTROL_UNKNOWN_VOLUME)
    }

    /// Points the active devices at `group_id`, or away from it when `is_active` is false, and
    /// tells the audio framework about every direction that changed.
    ///
    /// Returns whether the active output device now belongs to `group_id`.
    fn update_active_devices(
        &mut self,
        group_id: i32,
        old_direction: AudioDirection,
        new_direction: AudioDirection,
        is_active: bool,
    ) -> bool {
        let device = if is_active { self.lead_device(group_id) } else { None };
        let previous_out = self.active_out_device;
        let previous_in = self.active_in_device;

        let out_changed = self.update_active_device(
            AudioDirection::OUTPUT,
            device,
            group_id,
            old_direction,
            new_direction,
        );
        let in_changed = self.update_active_device(
            AudioDirection::INPUT,
            device,
            group_id,
            old_direction,
            new_direction,
        );

        if let (Some(device), Some(group)) = (device, self.registry.group_mut(group_id)) {
            group.current_lead_device = Some(device);
        }

        if out_changed {
            let suppress_noisy_intent = self.active_out_device.is_some()
                || previous_out.is_some_and(|d| self.is_device_connected(d));
            let volume = self.group_volume(group_id);
            info!(
                "group {}: active output {:?} -> {:?}",
                group_id, previous_out, self.active_out_device
            );
            self.audio_routing.handle_bluetooth_active_device_changed(
                self.active_out_device,
                previous_out,
                ProfileConnectionInfo::le_audio_output(suppress_noisy_intent, volume),
            );
        }
        if in_changed {
            let suppress_noisy_intent = self.active_in_device.is_some()
                || previous_in.is_some_and(|d| self.is_device_connected(d));
            info!(
                "group {}: active input {:?} -> {:?}",
                group_id, previous_in, self.active_in_device
            );
            self.audio_routing.handle_bluetooth_active_device_changed(
                self.active_in_device,
                previous_in,
                ProfileConnectionInfo::le_audio_input(suppress_noisy_intent),
            );
        }

        self.active_out_device.is_some_and(|d| self.registry.group_id(&d) == group_id)
    }

    fn update_active_device(
        &mut self,
        direction: AudioDirection,
        device: Option<RawAddress>,
        group_id: i32,
        old_direction: AudioDirection,
        new_direction: AudioDirection,
    ) -> bool {
        let current = self.active_device(direction);
        let previous_group_id = current.map_or(LE_AUDIO_GROUP_ID_INVALID, |d| {
            self.registry.group_id(&d)
        });
        let switching_group = device.is_some()
            && previous_group_id != LE_AUDIO_GROUP_ID_INVALID
            && previous_group_id != group_id;
        if switching_group {
            if let Some(previous_group) = self.registry.group_mut(previous_group_id) {
                debug!("group {}: deactivated by group {}", previous_group_id, group_id);
                previous_group.is_active = false;
            }
        }

        let old_supported = old_direction.contains(direction);
        let new_supported = new_direction.contains(direction);
        if !old_supported && !new_supported && !switching_group {
            return false;
        }
        if let (None, Some(current)) = (device, current) {
            let owner = self.registry.group_id(&current);
            if current == BROADCAST_PLACEHOLDER_DEVICE
                || (owner != LE_AUDIO_GROUP_ID_INVALID && owner != group_id)
            {
                // Someone else owns the route.
                return false;
            }
        }

        let next = if new_supported { device } else { None };
        if next == current {
            return false;
        }
        self.set_active_device_pointer(direction, next);
        let kind = match next {
            Some(_) => AudioDeviceCallbackKind::Added,
            None => AudioDeviceCallbackKind::Removed,
        };
        self.audio_routing.register_audio_device_callback(kind);
        true
    }

    fn active_device(&self, direction: AudioDirection) -> Option<RawAddress> {
        if direction == AudioDirection::OUTPUT {
            self.active_out_device
        } else {
            self.active_in_device
        }
    }

    fn set_active_device_pointer(&mut self, direction: AudioDirection, addr: Option<RawAddress>) {
        if direction == AudioDirection::OUTPUT {
            self.active_out_device = addr;
        } else {
            self.active_in_device = addr;
        }
    }

    fn is_device_connected(&self, addr: RawAddress) -> bool {
        self.registry.device(&addr).is_some_and(|d| d.is_connected())
    }

    fn update_inband_ringtone(&self, group_id: i32) {
        if !self.config.inband_ringtone_supported {
            return;
        }
        let Some(content_control) = &self.content_control else {
            return;
        };
        let Some(group) = self.registry.group(group_id) else {
            return;
        };
        let enabled =
            group.is_active && group.available_contexts.contains(AudioContext::RINGTONE);
        for addr in self.registry.group_devices(group_id) {
            content_control.set_inband_ringtone(addr, enabled);
        }
    }

    fn notify_group_status(&mut self, group_id: i32, status: BtLeAudioGroupStatus) {
        info!("group {}: {:?}", group_id, status);
        self.callbacks.for_all_callbacks(|cb| cb.on_group_status_changed(group_id, status));
    }

    fn handle_broadcast_created(&mut self, broadcast_id: i32, success: bool) {
        if !success {
            warn!("Broadcast {} creation failed", broadcast_id);
            self.broadcast_callbacks
                .for_all_callbacks(|cb| cb.on_broadcast_start_failed(BroadcastReason::Unknown));
            return;
        }

        info!("Broadcast {} created", broadcast_id);
        self.broadcasts.register(broadcast_id);
        self.broadcast_callbacks.for_all_callbacks(|cb| {
            cb.on_broadcast_started(BroadcastReason::LocalAppRequest, broadcast_id)
        });
        self.native.start_broadcast(broadcast_id);
    }

    fn handle_broadcast_state(&mut self, broadcast_id: i32, state: BtLeBroadcastState) {
        if self.broadcasts.update_state(broadcast_id, state) {
            self.native.get_broadcast_metadata(broadcast_id);
        }
        debug!("Broadcast {} state {:?}", broadcast_id, state);

        match state {
            BtLeBroadcastState::Stopped => {
                self.broadcasts.set_playing(broadcast_id, false);
                self.broadcast_callbacks.for_all_callbacks(|cb| {
                    cb.on_broadcast_stopped(BroadcastReason::LocalAppRequest, broadcast_id)
                });

                if self.broadcasts.playing_count() == 0
                    && self.active_out_device == Some(BROADCAST_PLACEHOLDER_DEVICE)
                {
                    self.update_broadcast_active_device(None, true);
                }

                self.native.destroy_broadcast(broadcast_id);
                self.broadcasts.purge(broadcast_id);
            }
            BtLeBroadcastState::Paused => {
                self.broadcasts.set_playing(broadcast_id, false);
                self.broadcast_callbacks.for_all_callbacks(|cb| {
                    cb.on_playback_stopped(BroadcastReason::LocalStackRequest, broadcast_id)
                });
            }
            BtLeBroadcastState::Streaming => {
                self.broadcasts.set_playing(broadcast_id, true);
                self.broadcast_callbacks.for_all_callbacks(|cb| {
                    cb.on_playback_started(BroadcastReason::LocalStackRequest, broadcast_id)
                });

                if self.broadcasts.playing_count() == 1
                    && self.active_out_device != Some(BROADCAST_PLACEHOLDER_DEVICE)
                {
                    self.update_broadcast_active_device(Some(BROADCAST_PLACEHOLDER_DEVICE), false);
                }
            }
            BtLeBroadcastState::Configuring | BtLeBroadcastState::Stopping => (),
        }
    }

    fn update_broadcast_active_device(
        &mut self,
        addr: Option<RawAddress>,
        suppress_noisy_intent: bool,
    ) {
        let previous = self.active_out_device;
        info!("Broadcast active output {:?} -> {:?}", previous, addr);
        self.active_out_device = addr;
        self.audio_routing.handle_bluetooth_active_device_changed(
            addr,
            previous,
            ProfileConnectionInfo::le_audio_output(
                suppress_noisy_intent,
                VOLUME_CONTROL_UNKNOWN_VOLUME,
            ),
        );
    }

    fn handle_broadcast_metadata_changed(
        &mut self,
        broadcast_id: i32,
        metadata: Option<BroadcastMetadata>,
    ) {
        let Some(metadata) = metadata else {
            error!("Broadcast {} metadata changed, but no metadata was given", broadcast_id);
            return;
        };
        if !self.broadcasts.is_known(broadcast_id) {
            warn!("Dropping metadata of unknown broadcast {}", broadcast_id);
            return;
        }
        let updated = self.broadcasts.metadata(broadcast_id).is_some();
        self.broadcasts.set_metadata(broadcast_id, metadata.clone());

        if updated {
            self.broadcast_callbacks.for_all_callbacks(|cb| {
                cb.on_broadcast_updated(BroadcastReason::LocalAppRequest, broadcast_id)
            });
        }
        self.broadcast_callbacks
            .for_all_callbacks(|cb| cb.on_broadcast_metadata_changed(broadcast_id, &metadata));
    }
}

/// Forwards native events onto the stack's message channel, in the order they are reported.
///
/// The native stack calls the dispatcher from its own thread, never from inside the runtime.
pub fn get_le_audio_dispatcher(tx: Sender<Message>) -> LeAudioClientCallbacksDispatcher {
    LeAudioClientCallbacksDispatcher {
        dispatch: Box::new(move |cb| {
            if tx.blocking_send(Message::LeAudio(cb)).is_err() {
                warn!("LE Audio event dropped, dispatch loop is gone");
            }
        }),
    }
}

impl ILeAudio for LeAudio {
    fn register_callback(&mut self, callback: Box<dyn ILeAudioCallback>) -> u32 {
        self.callbacks.add_callback(callback)
    }

    fn unregister_callback(&mut self, callback_id: u32) -> bool {
        self.callbacks.remove_callback(callback_id)
    }

    fn register_broadcast_callback(&mut self, callback: Box<dyn ILeAudioBroadcastCallback>) -> u32 {
        self.broadcast_callbacks.add_callback(callback)
    }

    fn unregister_broadcast_callback(&mut self, callback_id: u32) -> bool {
        self.broadcast_callbacks.remove_callback(callback_id)
    }

    fn connect(&mut self, addr: RawAddress) -> bool {
        if !self.get_or_create_state_machine(addr) {
            return false;
        }
        self.process_state_machine(addr, LeAudioStateMachineRequest::Connect);
        self.connect_set(addr);
        true
    }

    fn disconnect(&mut self, addr: RawAddress) -> bool {
        match self.registry.device(&addr) {
            Some(descriptor) if descriptor.state_machine.is_some() => {
                self.process_state_machine(addr, LeAudioStateMachineRequest::Disconnect);
                true
            }
            Some(_) => {
                warn!("[{}]: disconnect without a state machine", addr);
                false
            }
            None => {
                warn!("[{}]: disconnect of unknown device", addr);
                false
            }
        }
    }

    fn get_connected_devices(&self) -> Vec<RawAddress> {
        self.get_devices_matching_connection_states(&[BtLeAudioConnectionState::Connected])
    }

    fn get_devices_matching_connection_states(
        &self,
        states: &[BtLeAudioConnectionState],
    ) -> Vec<RawAddress> {
        self.registry
            .devices()
            .filter(|(_, d)| states.contains(&d.connection_state()))
            .map(|(addr, _)| *addr)
            .collect()
    }

    fn get_connection_state(&self, addr: RawAddress) -> BtLeAudioConnectionState {
        self.registry
            .device(&addr)
            .map_or(BtLeAudioConnectionState::Disconnected, |d| d.connection_state())
    }

    fn set_active_device(&mut self, addr: Option<RawAddress>) -> bool {
        let active_group_id = self.registry.active_group_id();
        let Some(addr) = addr else {
            self.native.group_set_active(LE_AUDIO_GROUP_ID_INVALID);
            if active_group_id != LE_AUDIO_GROUP_ID_INVALID {
                self.handle_group_transit_to_inactive(active_group_id);
            }
            return true;
        };

        if !self.is_device_connected(addr) {
            warn!("[{}]: cannot make a disconnected device active", addr);
            return false;
        }
        let group_id = self.registry.group_id(&addr);
        if group_id == LE_AUDIO_GROUP_ID_INVALID {
            warn!("[{}]: cannot make a device without group active", addr);
            return false;
        }
        if group_id == active_group_id {
            debug!("group {}: already active", group_id);
            return true;
        }
        self.native.group_set_active(group_id);
        true
    }

    fn get_active_devices(&self) -> (Option<RawAddress>, Option<RawAddress>) {
        let group_id = self.registry.active_group_id();
        if group_id == LE_AUDIO_GROUP_ID_INVALID {
            return (None, None);
        }
        let lead = self.lead_device(group_id);
        let peer =
            self.registry.group_devices(group_id).into_iter().find(|addr| Some(*addr) != lead);
        (lead, peer)
    }

    fn get_group_id(&self, addr: RawAddress) -> i32 {
        self.registry.group_id(&addr)
    }

    fn get_group_devices(&self, group_id: i32) -> Vec<RawAddress> {
        self.registry.group_devices(group_id)
    }

    fn get_connected_group_lead_device(&self, group_id: i32) -> Option<RawAddress> {
        self.lead_device(group_id)
    }

    fn get_active_group_id(&self) -> i32 {
        self.registry.active_group_id()
    }

    fn get_audio_location(&self, addr: RawAddress) -> u32 {
        self.registry
            .device(&addr)
            .map_or(crate::registry::AUDIO_LOCATION_INVALID, |d| d.sink_audio_location)
    }

    fn get_codec_status(&self, group_id: i32) -> Option<LeAudioCodecStatus> {
        self.registry.group(group_id).and_then(|g| g.codec_status.clone())
    }

    fn set_codec_config_preference(
        &mut self,
        group_id: i32,
        input_codec_config: LeAudioCodecConfig,
        output_codec_config: LeAudioCodecConfig,
    ) -> Result<(), LeAudioError> {
        if input_codec_config.codec_type != output_codec_config.codec_type {
            let err = LeAudioError::CodecTypeMismatch {
                input: input_codec_config.codec_type,
                output: output_codec_config.codec_type,
            };
            error!("group {}: {}", group_id, err);
            return Err(err);
        }
        let Some(status) = self.registry.group(group_id).and_then(|g| g.codec_status.as_ref())
        else {
            error!("group {}: no codec status", group_id);
            return Err(LeAudioError::NoCodecStatus(group_id));
        };
        if !status.is_input_codec_config_selectable(&input_codec_config)
            || !status.is_output_codec_config_selectable(&output_codec_config)
        {
            debug!("group {}: codec configuration not selectable", group_id);
            return Ok(());
        }
        self.native.set_codec_config_preference(
            group_id,
            &input_codec_config,
            &output_codec_config,
        );
        Ok(())
    }

    fn group_add_node(&mut self, group_id: i32, addr: RawAddress) -> bool {
        self.native.group_add_node(group_id, addr)
    }

    fn group_remove_node(&mut self, group_id: i32, addr: RawAddress) -> bool {
        self.native.group_remove_node(group_id, addr)
    }

    fn set_volume(&mut self, volume: i32) {
        let group_id = self.registry.active_group_id();
        if group_id == LE_AUDIO_GROUP_ID_INVALID {
            debug!("No active group for volume {}", volume);
            return;
        }
        match &self.volume_control {
            Some(volume_control) => volume_control.set_group_volume(group_id, volume),
            None => warn!("group {}: volume control unavailable", group_id),
        }
    }

    fn set_in_call(&mut self, in_call: bool) {
        self.native.set_in_call(in_call);
    }

    fn set_inactive_for_hfp_handover(&mut self, hfp_device: RawAddress) -> bool {
        if self.registry.active_group_id() == LE_AUDIO_GROUP_ID_INVALID {
            return false;
        }
        info!("[{}]: LE Audio going inactive for HFP handover", hfp_device);
        self.hfp_handover_device = Some(hfp_device);
        self.set_active_device(None);
        true
    }

    fn set_ccid_information(&mut self, user: Uuid, ccid: i32, context_type: AudioContext) {
        if user != Uuid::from_u16(UUID_GENERIC_MEDIA_CONTROL)
            && user != Uuid::from_u16(UUID_GENERIC_TELEPHONY_BEARER)
        {
            debug!("Ignoring ccid {} of {}", ccid, user);
            return;
        }
        if context_type.is_empty() {
            return;
        }
        self.ccid_info.insert(user, (ccid, context_type));
        if self.native_initialized {
            self.native.set_ccid_information(ccid, context_type.bits() as i32);
        }
    }

    fn create_broadcast(
        &mut self,
        metadata: ContentMetadata,
        broadcast_code: Option<Vec<u8>>,
    ) -> Result<(), LeAudioError> {
        if let Err(err) = validate_broadcast_code(broadcast_code.as_deref().unwrap_or_default()) {
            error!("Cannot create broadcast: {}", err);
            return Err(err);
        }
        let broadcast_code = broadcast_code.filter(|code| !code.is_empty());
        self.native.create_broadcast(metadata.to_raw(), broadcast_code);
        Ok(())
    }

    fn start_broadcast(&mut self, broadcast_id: i32) {
        if !self.broadcasts.is_known(broadcast_id) {
            warn!("Cannot start unknown broadcast {}", broadcast_id);
            self.broadcast_callbacks.for_all_callbacks(|cb| {
                cb.on_broadcast_start_failed(BroadcastReason::InvalidBroadcastId)
            });
            return;
        }
        self.native.start_broadcast(broadcast_id);
    }

    fn update_broadcast(&mut self, broadcast_id: i32, metadata: ContentMetadata) {
        if !self.broadcasts.is_known(broadcast_id) {
            warn!("Cannot update unknown broadcast {}", broadcast_id);
            self.broadcast_callbacks.for_all_callbacks(|cb| {
                cb.on_broadcast_update_failed(BroadcastReason::InvalidBroadcastId, broadcast_id)
            });
            return;
        }
        self.native.update_metadata(broadcast_id, metadata.to_raw());
    }

    fn stop_broadcast(&mut self, broadcast_id: i32) {
        if !self.broadcasts.is_known(broadcast_id) {
            warn!("Cannot stop unknown broadcast {}", broadcast_id);
            self.broadcast_callbacks.for_all_callbacks(|cb| {
                cb.on_broadcast_stop_failed(BroadcastReason::InvalidBroadcastId)
            });
            return;
        }
        self.native.stop_broadcast(broadcast_id);
    }

    fn destroy_broadcast(&mut self, broadcast_id: i32) {
        if !self.broadcasts.is_known(broadcast_id) {
            warn!("Cannot destroy unknown broadcast {}", broadcast_id);
            self.broadcast_callbacks.for_all_callbacks(|cb| {
                cb.on_broadcast_stop_failed(BroadcastReason::InvalidBroadcastId)
            });
            return;
        }
        self.native.destroy_broadcast(broadcast_id);
    }

    fn is_playing(&self, broadcast_id: i32) -> bool {
        self.broadcasts.is_playing(broadcast_id)
    }

    fn get_all_broadcast_metadata(&self) -> Vec<BroadcastMetadata> {
        self.broadcasts.all_metadata()
    }

    fn get_maximum_number_of_broadcasts(&self) -> i32 {
        self.config.max_broadcasts
    }
}
