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

//! Identity types shared with the native stack.

use std::fmt::{Debug, Display, Formatter, Result};

/// Bluetooth device address, most significant octet first.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct RawAddress {
    pub address: [u8; 6],
}

impl RawAddress {
    pub const fn new(address: [u8; 6]) -> Self {
        Self { address }
    }

    pub const fn empty() -> Self {
        Self { address: [0u8; 6] }
    }

    pub fn is_empty(&self) -> bool {
        self.address == [0u8; 6]
    }

    /// Parses the `XX:XX:XX:XX:XX:XX` representation.
    pub fn from_string<S: AsRef<str>>(addr: S) -> Option<Self> {
        let parts: Vec<&str> = addr.as_ref().split(':').collect();
        if parts.len() != 6 {
            return None;
        }

        let mut address = [0u8; 6];
        for (octet, part) in address.iter_mut().zip(parts) {
            if part.len() != 2 {
                return None;
            }
            *octet = u8::from_str_radix(part, 16).ok()?;
        }
        Some(Self { address })
    }

    pub fn from_bytes(raw: &[u8]) -> Option<Self> {
        let address: [u8; 6] = raw.try_into().ok()?;
        Some(Self { address })
    }
}

impl Display for RawAddress {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let a = &self.address;
        write!(f, "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}", a[0], a[1], a[2], a[3], a[4], a[5])
    }
}

impl Debug for RawAddress {
    fn fmt(&self, f: &mut Formatter) -> Result {
        // Only the last two octets.
        let a = &self.address;
        write!(f, "xx:xx:xx:xx:{:02X}:{:02X}", a[4], a[5])
    }
}

/// 128-bit UUID identifying a content-control user (media player, telephony bearer).
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Uuid {
    pub uu: [u8; 16],
}

impl Uuid {
    /// Expands a 16-bit assigned number against the Bluetooth base UUID.
    pub fn from_u16(short: u16) -> Self {
        let mut uu = [
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0x80, 0x5F, 0x9B,
            0x34, 0xFB,
        ];
        uu[2..4].copy_from_slice(&short.to_be_bytes());
        Self { uu }
    }
}

impl Display for Uuid {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let u = &self.uu;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-\
             {:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            u[0], u[1], u[2], u[3], u[4], u[5], u[6], u[7], u[8], u[9], u[10], u[11], u[12], u[13],
            u[14], u[15]
        )
    }
}

impl Debug for Uuid {
    fn fmt(&self, f: &mut Formatter) -> Result {
        Display::fmt(self, f)
    }
}
