//! Scripted input
//!
//! Devices and button states are set by the caller through an
//! [`InputHandle`] rather than read from physical controllers.

use hh_libretro::ffi::{RETRO_DEVICE_JOYPAD, RETRO_DEVICE_NONE};
use hh_libretro::{ControllerInfo, Input, InputDescriptor};
use parking_lot::Mutex;
use std::sync::Arc;

/// Value reported for a pressed button
pub const PRESSED: i16 = 0x7fff;

/// Lower byte of a device id is its base type
const DEVICE_TYPE_MASK: u32 = 0xff;

#[derive(Debug, Default)]
struct Script {
    devices: Vec<u32>,
    /// Joypad button bitmask per port
    buttons: Vec<u16>,
    updated: bool,
    controller_info: Vec<ControllerInfo>,
    descriptors: Vec<InputDescriptor>,
    polls: u64,
}

impl Script {
    fn ensure_port(&mut self, port: usize) {
        if self.devices.len() <= port {
            self.devices.resize(port + 1, RETRO_DEVICE_NONE);
            self.buttons.resize(port + 1, 0);
        }
    }
}

/// Control side of a [`ScriptedInput`]
#[derive(Debug, Clone, Default)]
pub struct InputHandle(Arc<Mutex<Script>>);

impl InputHandle {
    /// Assign a device to a port, the core is told on its next step
    pub fn plug(&self, port: u32, device: u32) {
        let mut script = self.0.lock();
        script.ensure_port(port as usize);

        if script.devices[port as usize] != device {
            script.devices[port as usize] = device;
            script.updated = true;
        }
    }

    pub fn unplug(&self, port: u32) {
        self.plug(port, RETRO_DEVICE_NONE);
    }

    /// Set the state of joypad button `id` on `port`
    pub fn set_button(&self, port: u32, id: u32, pressed: bool) {
        if id >= 16 {
            return;
        }

        let mut script = self.0.lock();
        script.ensure_port(port as usize);

        let buttons = &mut script.buttons[port as usize];
        if pressed {
            *buttons |= 1 << id;
        } else {
            *buttons &= !(1 << id);
        }
    }

    pub fn release_all(&self) {
        self.0.lock().buttons.fill(0);
    }

    /// Device types the core accepts, per port
    pub fn controller_info(&self) -> Vec<ControllerInfo> {
        self.0.lock().controller_info.clone()
    }

    pub fn descriptors(&self) -> Vec<InputDescriptor> {
        self.0.lock().descriptors.clone()
    }

    /// Number of times the core polled input
    pub fn polls(&self) -> u64 {
        self.0.lock().polls
    }
}

/// [`Input`] driven by an [`InputHandle`]
#[derive(Debug, Default)]
pub struct ScriptedInput {
    script: InputHandle,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> InputHandle {
        self.script.clone()
    }
}

impl Input for ScriptedInput {
    fn set_input_descriptors(&mut self, descriptors: &[InputDescriptor]) {
        self.script.0.lock().descriptors = descriptors.to_vec();
    }

    fn set_controller_info(&mut self, info: &[ControllerInfo]) {
        let mut script = self.script.0.lock();
        script.controller_info = info.to_vec();
        script.ensure_port(info.len().saturating_sub(1));

        for (port, ports) in info.iter().enumerate() {
            let names: Vec<&str> = ports.types.iter().map(|t| t.desc.as_str()).collect();
            tracing::debug!("Port {} accepts {:?}", port, names);
        }
    }

    fn controllers_updated(&mut self) -> bool {
        std::mem::take(&mut self.script.0.lock().updated)
    }

    fn controller(&self, port: u32) -> u32 {
        self.script
            .0
            .lock()
            .devices
            .get(port as usize)
            .copied()
            .unwrap_or(RETRO_DEVICE_NONE)
    }

    fn poll(&mut self) {
        self.script.0.lock().polls += 1;
    }

    fn read(&self, port: u32, device: u32, _index: u32, id: u32) -> i16 {
        let script = self.script.0.lock();

        let Some(&plugged) = script.devices.get(port as usize) else {
            return 0;
        };
        if plugged != device || device & DEVICE_TYPE_MASK != RETRO_DEVICE_JOYPAD || id >= 16 {
            return 0;
        }

        if script.buttons[port as usize] & (1 << id) != 0 {
            PRESSED
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hh_libretro::ControllerDescription;

    #[test]
    fn test_plug_flags_update() {
        let mut input = ScriptedInput::new();
        let handle = input.handle();

        assert!(!input.controllers_updated());
        handle.plug(1, RETRO_DEVICE_JOYPAD);
        assert!(input.controllers_updated());
        assert!(!input.controllers_updated());

        assert_eq!(input.controller(0), RETRO_DEVICE_NONE);
        assert_eq!(input.controller(1), RETRO_DEVICE_JOYPAD);
        assert_eq!(input.controller(7), RETRO_DEVICE_NONE);

        // Re-plugging the same device is not a change
        handle.plug(1, RETRO_DEVICE_JOYPAD);
        assert!(!input.controllers_updated());
    }

    #[test]
    fn test_buttons() {
        let mut input = ScriptedInput::new();
        let handle = input.handle();
        handle.plug(0, RETRO_DEVICE_JOYPAD);
        handle.set_button(0, 8, true);
        input.poll();

        assert_eq!(input.read(0, RETRO_DEVICE_JOYPAD, 0, 8), PRESSED);
        assert_eq!(input.read(0, RETRO_DEVICE_JOYPAD, 0, 0), 0);
        // Wrong device or port
        assert_eq!(input.read(0, RETRO_DEVICE_NONE, 0, 8), 0);
        assert_eq!(input.read(3, RETRO_DEVICE_JOYPAD, 0, 8), 0);

        handle.set_button(0, 8, false);
        assert_eq!(input.read(0, RETRO_DEVICE_JOYPAD, 0, 8), 0);

        handle.set_button(0, 3, true);
        handle.release_all();
        assert_eq!(input.read(0, RETRO_DEVICE_JOYPAD, 0, 3), 0);
        assert_eq!(handle.polls(), 1);
    }

    #[test]
    fn test_controller_info_sizes_ports() {
        let mut input = ScriptedInput::new();
        let pad = ControllerInfo {
            types: vec![ControllerDescription {
                desc: "RetroPad".to_string(),
                id: RETRO_DEVICE_JOYPAD,
            }],
        };
        input.set_controller_info(&[pad.clone(), pad]);

        let handle = input.handle();
        assert_eq!(handle.controller_info().len(), 2);
        assert_eq!(input.controller(1), RETRO_DEVICE_NONE);
    }
}
