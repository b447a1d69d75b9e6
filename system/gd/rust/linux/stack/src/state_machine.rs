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

//! Per-device LE Audio connection state machine.
//!
//!              Connect                 Connected event
//!   Disconnected -------> Connecting ------------------> Connected
//!        ^                  |  timeout / Disconnect          |
//!        |<-----------------'                                | Disconnect
//!        |           Disconnected event / timeout            v
//!        '------------------------------------------- Disconnecting

use log::{debug, error, info, warn};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tokio::time;

use crate::btif::RawAddress;
use crate::le_audio::LeAudioActions;
use crate::profiles::le_audio::{BtLeAudioConnectionState, LeAudioNativeInterface};
use crate::Message;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LeAudioStateMachineRequest {
    Connect,
    Disconnect,
    StackEvent(BtLeAudioConnectionState),
    ConnectTimeout,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StateTransition {
    pub previous: BtLeAudioConnectionState,
    pub current: BtLeAudioConnectionState,
}

pub struct LeAudioStateMachine {
    addr: RawAddress,
    state: BtLeAudioConnectionState,
    native: Arc<dyn LeAudioNativeInterface>,
    tx: Option<Sender<Message>>,
    connect_timeout: Duration,
    timeout_timer: Option<JoinHandle<()>>,
    deferred: VecDeque<LeAudioStateMachineRequest>,
}

impl LeAudioStateMachine {
    pub fn new(
        addr: RawAddress,
        native: Arc<dyn LeAudioNativeInterface>,
        tx: Option<Sender<Message>>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            addr,
            state: BtLeAudioConnectionState::Disconnected,
            native,
            tx,
            connect_timeout,
            timeout_timer: None,
            deferred: VecDeque::new(),
        }
    }

    pub fn state(&self) -> BtLeAudioConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == BtLeAudioConnectionState::Connected
    }

    /// Handles `request` and returns every transition it caused, oldest first.
    pub fn process(&mut self, request: LeAudioStateMachineRequest) -> Vec<StateTransition> {
        let mut transitions = Vec::new();
        self.handle(request, &mut transitions);
        transitions
    }

    /// Stops the state machine; pending timers are cancelled and deferred requests dropped.
    pub fn quit(&mut self) {
        self.cancel_timer();
        self.deferred.clear();
    }

    fn handle(
        &mut self,
        request: LeAudioStateMachineRequest,
        transitions: &mut Vec<StateTransition>,
    ) {
        use BtLeAudioConnectionState::*;
        use LeAudioStateMachineRequest::*;

        let next = match (self.state, request) {
            (Disconnected, Connect) => {
                if self.native.connect(self.addr) {
                    Some(Connecting)
                } else {
                    error!("[{}]: Disconnected: failed to connect", self.addr);
                    None
                }
            }
            (Disconnected, StackEvent(event @ (Connecting | Connected))) => {
                info!("[{}]: Disconnected: incoming connection {:?}", self.addr, event);
                Some(event)
            }

            (Connecting, Connect) | (Disconnecting, Connect) | (Disconnecting, Disconnect) => {
                debug!("[{}]: {:?}: deferring {:?}", self.addr, self.state, request);
                self.deferred.push_back(request);
                None
            }
            (Connecting, Disconnect) => {
                if !self.native.disconnect(self.addr) {
                    error!("[{}]: Connecting: failed to disconnect", self.addr);
                }
                Some(Disconnected)
            }
            (Connecting, ConnectTimeout) => {
                warn!("[{}]: Connecting: connection timeout", self.addr);
                self.native.disconnect(self.addr);
                Some(Disconnected)
            }
            (Disconnecting, ConnectTimeout) => {
                warn!("[{}]: Disconnecting: disconnection timeout", self.addr);
                Some(Disconnected)
            }
            (Connecting | Disconnecting, StackEvent(event)) if event != self.state => Some(event),

            (Connected, Connect) => {
                debug!("[{}]: Connected: connect ignored", self.addr);
                None
            }
            (Connected, Disconnect) => {
                if self.native.disconnect(self.addr) {
                    Some(Disconnecting)
                } else {
                    error!("[{}]: Connected: failed to disconnect", self.addr);
                    None
                }
            }
            (Connected, StackEvent(event @ (Disconnected | Disconnecting))) => Some(event),

            (state, request) => {
                debug!("[{}]: {:?}: {:?} ignored", self.addr, state, request);
                None
            }
        };

        if let Some(next) = next {
            self.transition_to(next, transitions);
        }
    }

    fn transition_to(
        &mut self,
        next: BtLeAudioConnectionState,
        transitions: &mut Vec<StateTransition>,
    ) {
        let previous = self.state;
        self.state = next;
        info!("[{}]: connection state {:?} -> {:?}", self.addr, previous, next);

        self.cancel_timer();
        if matches!(
            next,
            BtLeAudioConnectionState::Connecting | BtLeAudioConnectionState::Disconnecting
        ) {
            self.arm_timer();
        }
        transitions.push(StateTransition { previous, current: next });

        let deferred: Vec<_> = self.deferred.drain(..).collect();
        for request in deferred {
            self.handle(request, transitions);
        }
    }

    fn arm_timer(&mut self) {
        let Some(tx) = self.tx.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            debug!("[{}]: no runtime, connection timeout not armed", self.addr);
            return;
        };

        let addr = self.addr;
        let timeout = self.connect_timeout;
        self.timeout_timer = Some(runtime.spawn(async move {
            time::sleep(timeout).await;
            let _result =
                tx.send(Message::LeAudioActions(LeAudioActions::ConnectTimeout(addr))).await;
        }));
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timeout_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for LeAudioStateMachine {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
