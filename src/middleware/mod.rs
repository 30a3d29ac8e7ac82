// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (device identification, security headers).

pub mod device;
pub mod security;

pub use device::{require_device_id, DeviceId};
