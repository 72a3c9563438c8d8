//! Routing of core callbacks to the active host
//!
//! libretro callbacks carry no user pointer, so the host publishes itself in
//! a thread-local slot for the duration of every call into the core. The
//! trampolines below look it up and forward to the host state.

use crate::components::VideoFrame;
use crate::environment;
use crate::ffi::RETRO_HW_FRAME_BUFFER_VALID;
use crate::host::{HostContext, HostState};
use std::cell::Cell;
use std::ffi::{c_uint, c_void};
use std::marker::PhantomData;

thread_local! {
    static ACTIVE: Cell<*const HostContext> = const { Cell::new(std::ptr::null()) };
}

/// Binds a host context to the current thread until dropped
///
/// The previous binding is restored on drop, so scopes nest.
pub(crate) struct CallbackScope<'a> {
    previous: *const HostContext,
    _context: PhantomData<&'a HostContext>,
}

impl<'a> CallbackScope<'a> {
    pub(crate) fn enter(context: &'a HostContext) -> Self {
        let previous = ACTIVE.with(|active| active.replace(context));
        Self {
            previous,
            _context: PhantomData,
        }
    }
}

impl Drop for CallbackScope<'_> {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.set(self.previous));
    }
}

/// Run `f` against the bound host state, or return `fallback`
fn with_state<R>(callback: &str, fallback: R, f: impl FnOnce(&mut HostState) -> R) -> R {
    let context = ACTIVE.with(|active| active.get());

    if context.is_null() {
        tracing::error!("{} called without an active host", callback);
        return fallback;
    }

    // SAFETY: the slot only holds a context while a CallbackScope borrowing it is alive
    let context = unsafe { &*context };

    match context.state.try_borrow_mut() {
        Ok(mut state) => f(&mut state),
        Err(_) => {
            tracing::error!("{} re-entered the host while it was busy", callback);
            fallback
        }
    }
}

pub(crate) unsafe extern "C" fn environment(cmd: c_uint, data: *mut c_void) -> bool {
    with_state("environment", false, |state| unsafe {
        environment::dispatch(state, cmd, data)
    })
}

pub(crate) unsafe extern "C" fn video_refresh(
    data: *const c_void,
    width: c_uint,
    height: c_uint,
    pitch: usize,
) {
    with_state("video_refresh", (), |state| {
        if data.is_null() {
            state.components.video.refresh(None);
            return;
        }

        if data == RETRO_HW_FRAME_BUFFER_VALID {
            tracing::warn!("Hardware rendered frame ignored");
            return;
        }

        let format = state.pixel_format;
        let len = match height {
            0 => 0,
            h => (h as usize - 1) * pitch + width as usize * format.bytes_per_pixel(),
        };

        // SAFETY: the core guarantees `height` rows of `pitch` bytes
        let pixels = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) };

        state.components.video.refresh(Some(VideoFrame {
            data: pixels,
            width,
            height,
            pitch,
            format,
        }));
    })
}

pub(crate) unsafe extern "C" fn audio_sample(left: i16, right: i16) {
    with_state("audio_sample", (), |state| {
        if !state.samples.push_frame(left, right) {
            tracing::trace!("Audio buffer full, sample dropped");
        }
    })
}

pub(crate) unsafe extern "C" fn audio_sample_batch(data: *const i16, frames: usize) -> usize {
    with_state("audio_sample_batch", 0, |state| {
        if data.is_null() || frames == 0 {
            return 0;
        }

        // SAFETY: the core passes `frames` interleaved stereo frames
        let samples = unsafe { std::slice::from_raw_parts(data, frames * 2) };
        let accepted = state.samples.push_batch(samples);

        if accepted < frames {
            tracing::trace!("Audio buffer full, {} frames dropped", frames - accepted);
        }

        frames
    })
}

pub(crate) unsafe extern "C" fn input_poll() {
    with_state("input_poll", (), |state| state.components.input.poll())
}

pub(crate) unsafe extern "C" fn input_state(
    port: c_uint,
    device: c_uint,
    index: c_uint,
    id: c_uint,
) -> i16 {
    with_state("input_state", 0, |state| {
        state.components.input.read(port, device, index, id)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Audio, Components, CoreConfig, Input, Loader, LogLevel, Logger, Video};
    use crate::ffi::RETRO_ENVIRONMENT_GET_CAN_DUPE;
    use crate::types::{ControllerInfo, InputDescriptor, PixelFormat, Variable};
    use std::panic::{self, AssertUnwindSafe};
    use std::path::Path;

    struct Silent;

    impl Logger for Silent {
        fn log(&self, _level: LogLevel, _message: &str) {}
    }

    impl CoreConfig for Silent {
        fn system_directory(&self) -> &Path {
            Path::new("")
        }
        fn assets_directory(&self) -> &Path {
            Path::new("")
        }
        fn save_directory(&self) -> &Path {
            Path::new("")
        }
        fn set_variables(&mut self, _variables: &[Variable]) {}
        fn variables_updated(&mut self) -> bool {
            false
        }
        fn variable(&self, _key: &str) -> Option<&str> {
            None
        }
    }

    impl Video for Silent {
        fn set_geometry(&mut self, _w: u32, _h: u32, _aspect: f32, _format: PixelFormat) -> bool {
            true
        }
        fn refresh(&mut self, _frame: Option<VideoFrame<'_>>) {}
        fn show_message(&mut self, _message: &str, _frames: u32) {}
    }

    impl Audio for Silent {
        fn set_rate(&mut self, _rate: f64) -> bool {
            true
        }
        fn mix(&mut self, _samples: &[i16]) {}
    }

    impl Input for Silent {
        fn set_input_descriptors(&mut self, _descriptors: &[InputDescriptor]) {}
        fn set_controller_info(&mut self, _info: &[ControllerInfo]) {}
        fn controllers_updated(&mut self) -> bool {
            false
        }
        fn controller(&self, _port: u32) -> u32 {
            0
        }
        fn poll(&mut self) {}
        fn read(&self, _port: u32, _device: u32, _index: u32, _id: u32) -> i16 {
            0
        }
    }

    impl Loader for Silent {
        fn load(&mut self, _path: &Path) -> std::io::Result<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    fn context() -> HostContext {
        HostContext::new(Components {
            logger: Box::new(Silent),
            config: Box::new(Silent),
            video: Box::new(Silent),
            audio: Box::new(Silent),
            input: Box::new(Silent),
            loader: Box::new(Silent),
        })
    }

    fn active() -> *const HostContext {
        ACTIVE.with(|active| active.get())
    }

    fn can_dupe() -> bool {
        let mut dupe = false;
        let ok = unsafe { environment(RETRO_ENVIRONMENT_GET_CAN_DUPE, (&mut dupe as *mut bool).cast()) };
        ok && dupe
    }

    #[test]
    fn test_nested_scopes_restore_binding() {
        let outer = context();
        let inner = context();
        assert!(active().is_null());

        {
            let _outer_scope = CallbackScope::enter(&outer);
            assert_eq!(active(), &outer as *const HostContext);
            assert!(can_dupe());

            {
                let _inner_scope = CallbackScope::enter(&inner);
                assert_eq!(active(), &inner as *const HostContext);
                assert!(can_dupe());
            }

            assert_eq!(active(), &outer as *const HostContext);
            assert!(can_dupe());
        }

        assert!(active().is_null());
        assert!(!can_dupe());
    }

    #[test]
    fn test_scope_unbinds_on_panic() {
        let host = context();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let _scope = CallbackScope::enter(&host);
            assert!(!active().is_null());
            panic!("core aborted");
        }));

        assert!(result.is_err());
        assert!(active().is_null());
        assert!(!can_dupe());
    }

    #[test]
    fn test_busy_state_is_neutral() {
        let host = context();
        let _scope = CallbackScope::enter(&host);

        let _busy = host.state.borrow_mut();
        assert!(!can_dupe());
        assert_eq!(unsafe { input_state(0, 1, 0, 0) }, 0);
    }

    #[test]
    fn test_unbound_callbacks_are_neutral() {
        unsafe {
            assert!(!environment(crate::ffi::RETRO_ENVIRONMENT_GET_CAN_DUPE, std::ptr::null_mut()));
            assert_eq!(audio_sample_batch([1i16, 2].as_ptr(), 1), 0);
            assert_eq!(input_state(0, 1, 0, 0), 0);
            audio_sample(1, 2);
            input_poll();
            video_refresh(std::ptr::null(), 0, 0, 0);
        }
    }
}
