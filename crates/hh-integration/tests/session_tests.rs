//! Session tests against an in-process fake NES core

use hh_core::{Config, HostError};
use hh_integration::input::PRESSED;
use hh_integration::Session;
use hh_libretro::ffi::*;
use hh_libretro::{CoreApi, LifecycleState, NativeModule, Platform};
use hh_memory::{Encoding, Operator, Width};
use std::cell::RefCell;
use std::ffi::{c_char, c_uint, c_void, CStr};
use std::path::Path;
use std::ptr;

#[derive(Default)]
struct FakeNes {
    environment: Option<retro_environment_t>,
    video: Option<retro_video_refresh_t>,
    audio_batch: Option<retro_audio_sample_batch_t>,
    input_poll: Option<retro_input_poll_t>,
    input_state: Option<retro_input_state_t>,
    shutdown_after: Option<u32>,
    runs: u32,
    speed: Option<String>,
    last_input: i16,
    game_size: usize,
    ram: Vec<u8>,
    sram: Vec<u8>,
}

thread_local! {
    static CORE: RefCell<FakeNes> = RefCell::new(FakeNes::default());
}

fn with_core<R>(f: impl FnOnce(&mut FakeNes) -> R) -> R {
    CORE.with(|core| f(&mut core.borrow_mut()))
}

unsafe fn env_call<T>(env: retro_environment_t, cmd: c_uint, data: &mut T) -> bool {
    unsafe { env(cmd, (data as *mut T).cast()) }
}

unsafe extern "C" fn nes_init() {}
unsafe extern "C" fn nes_deinit() {}

unsafe extern "C" fn nes_api_version() -> c_uint {
    RETRO_API_VERSION
}

unsafe extern "C" fn nes_get_system_info(info: *mut retro_system_info) {
    unsafe {
        *info = retro_system_info {
            library_name: c"QuickNES".as_ptr(),
            library_version: c"1.0".as_ptr(),
            valid_extensions: c"nes".as_ptr(),
            need_fullpath: false,
            block_extract: false,
        };
    }
}

unsafe extern "C" fn nes_get_system_av_info(info: *mut retro_system_av_info) {
    unsafe {
        *info = retro_system_av_info {
            geometry: retro_game_geometry {
                base_width: 256,
                base_height: 240,
                max_width: 256,
                max_height: 240,
                aspect_ratio: 0.0,
            },
            timing: retro_system_timing {
                fps: 60.0,
                sample_rate: 44100.0,
            },
        };
    }
}

unsafe extern "C" fn nes_set_environment(cb: retro_environment_t) {
    with_core(|c| c.environment = Some(cb));

    unsafe {
        let mut vars = [
            retro_variable {
                key: c"nes_speed".as_ptr(),
                value: c"Speed; normal|fast".as_ptr(),
            },
            retro_variable {
                key: ptr::null(),
                value: ptr::null(),
            },
        ];
        env_call(cb, RETRO_ENVIRONMENT_SET_VARIABLES, &mut vars[0]);

        let pad = [retro_controller_description {
            desc: c"Gamepad".as_ptr(),
            id: RETRO_DEVICE_JOYPAD,
        }];
        let mut infos = [
            retro_controller_info {
                types: pad.as_ptr(),
                num_types: 1,
            },
            retro_controller_info {
                types: ptr::null(),
                num_types: 0,
            },
        ];
        env_call(cb, RETRO_ENVIRONMENT_SET_CONTROLLER_INFO, &mut infos[0]);
    }
}

unsafe extern "C" fn nes_set_video_refresh(cb: retro_video_refresh_t) {
    with_core(|c| c.video = Some(cb));
}

unsafe extern "C" fn nes_set_audio_sample(_cb: retro_audio_sample_t) {}

unsafe extern "C" fn nes_set_audio_sample_batch(cb: retro_audio_sample_batch_t) {
    with_core(|c| c.audio_batch = Some(cb));
}

unsafe extern "C" fn nes_set_input_poll(cb: retro_input_poll_t) {
    with_core(|c| c.input_poll = Some(cb));
}

unsafe extern "C" fn nes_set_input_state(cb: retro_input_state_t) {
    with_core(|c| c.input_state = Some(cb));
}

unsafe extern "C" fn nes_set_controller_port_device(_port: c_uint, _device: c_uint) {}

unsafe extern "C" fn nes_reset() {}

unsafe extern "C" fn nes_run() {
    let (runs, env, shutdown_after, video, batch, poll, input) = with_core(|c| {
        c.runs += 1;
        c.ram[0x20] = c.runs as u8;
        (
            c.runs,
            c.environment,
            c.shutdown_after,
            c.video,
            c.audio_batch,
            c.input_poll,
            c.input_state,
        )
    });

    unsafe {
        if let Some(env) = env {
            let mut var = retro_variable {
                key: c"nes_speed".as_ptr(),
                value: ptr::null(),
            };
            if env_call(env, RETRO_ENVIRONMENT_GET_VARIABLE, &mut var) && !var.value.is_null() {
                let speed = CStr::from_ptr(var.value).to_string_lossy().into_owned();
                with_core(|c| c.speed = Some(speed));
            }

            if shutdown_after == Some(runs) {
                env_call(env, RETRO_ENVIRONMENT_SHUTDOWN, &mut ());
            }
        }

        if let (Some(poll), Some(input)) = (poll, input) {
            poll();
            let value = input(0, RETRO_DEVICE_JOYPAD, 0, 8);
            with_core(|c| c.last_input = value);
        }

        if let Some(video) = video {
            let pixels = [0x11u8; 16];
            video(pixels.as_ptr().cast(), 4, 2, 8);
        }

        if let Some(batch) = batch {
            let samples = [0i16; 8];
            batch(samples.as_ptr(), 4);
        }
    }
}

unsafe extern "C" fn nes_serialize_size() -> usize {
    0
}

unsafe extern "C" fn nes_serialize(_data: *mut c_void, _size: usize) -> bool {
    false
}

unsafe extern "C" fn nes_unserialize(_data: *const c_void, _size: usize) -> bool {
    false
}

unsafe extern "C" fn nes_cheat_reset() {}

unsafe extern "C" fn nes_cheat_set(_index: c_uint, _enabled: bool, _code: *const c_char) {}

unsafe extern "C" fn nes_load_game(game: *const retro_game_info) -> bool {
    with_core(|c| {
        if !game.is_null() {
            c.game_size = unsafe { (*game).size };
        }
        c.ram = vec![0; 0x800];
        c.sram = vec![0; 0x2000];
        c.ram[0x10] = 0x42;
        c.sram[0x100] = 0x42;
    });
    true
}

unsafe extern "C" fn nes_load_game_special(
    _game_type: c_uint,
    _info: *const retro_game_info,
    _num_info: usize,
) -> bool {
    false
}

unsafe extern "C" fn nes_unload_game() {
    with_core(|c| {
        c.ram.clear();
        c.sram.clear();
    });
}

unsafe extern "C" fn nes_get_region() -> c_uint {
    RETRO_REGION_NTSC
}

unsafe extern "C" fn nes_get_memory_data(id: c_uint) -> *mut c_void {
    with_core(|c| match id {
        RETRO_MEMORY_SYSTEM_RAM if !c.ram.is_empty() => c.ram.as_mut_ptr().cast(),
        RETRO_MEMORY_SAVE_RAM if !c.sram.is_empty() => c.sram.as_mut_ptr().cast(),
        _ => ptr::null_mut(),
    })
}

unsafe extern "C" fn nes_get_memory_size(id: c_uint) -> usize {
    with_core(|c| match id {
        RETRO_MEMORY_SYSTEM_RAM => c.ram.len(),
        RETRO_MEMORY_SAVE_RAM => c.sram.len(),
        _ => 0,
    })
}

fn fake_nes() -> NativeModule {
    NativeModule::from_api(CoreApi {
        init: nes_init,
        deinit: nes_deinit,
        api_version: nes_api_version,
        get_system_info: nes_get_system_info,
        get_system_av_info: nes_get_system_av_info,
        set_environment: nes_set_environment,
        set_video_refresh: nes_set_video_refresh,
        set_audio_sample: nes_set_audio_sample,
        set_audio_sample_batch: nes_set_audio_sample_batch,
        set_input_poll: nes_set_input_poll,
        set_input_state: nes_set_input_state,
        set_controller_port_device: nes_set_controller_port_device,
        reset: nes_reset,
        run: nes_run,
        serialize_size: nes_serialize_size,
        serialize: nes_serialize,
        unserialize: nes_unserialize,
        cheat_reset: nes_cheat_reset,
        cheat_set: nes_cheat_set,
        load_game: nes_load_game,
        load_game_special: nes_load_game_special,
        unload_game: nes_unload_game,
        get_region: nes_get_region,
        get_memory_data: nes_get_memory_data,
        get_memory_size: nes_get_memory_size,
    })
}

fn silent_config() -> Config {
    let mut config = Config::default();
    config.audio.enable = false;
    config
}

fn rom(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("game.nes");
    std::fs::write(&path, vec![0u8; 40976]).unwrap();
    path
}

#[test]
fn test_open_and_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&silent_config());

    session.open_module(fake_nes(), Some(&rom(dir.path()))).unwrap();
    assert_eq!(session.platform(), Platform::Nes);
    assert_eq!(with_core(|c| c.game_size), 40976);
    assert_eq!(session.video().geometry(), (256, 240, 256.0 / 240.0));

    assert_eq!(session.run_frames(3).unwrap(), 3);
    assert_eq!(session.steps(), 3);
    assert_eq!(session.video().frames(), 3);
    assert_eq!(session.host().lifecycle(), LifecycleState::Running);
    assert_eq!(with_core(|c| c.speed.clone()), Some("normal".to_string()));
}

#[test]
fn test_search_regions() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&silent_config());
    session.open_module(fake_nes(), Some(&rom(dir.path()))).unwrap();
    session.run_frames(1).unwrap();

    let names: Vec<_> = session.regions().iter().map(|r| (r.name(), r.base(), r.len())).collect();
    assert_eq!(names, vec![("Work RAM", 0, 0x800), ("Save RAM", 0x6000, 0x2000)]);

    let results = session.search(Width::Bits8, Encoding::LittleEndian, Operator::Equal, 0x42);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].region, "Work RAM");
    assert_eq!(results[0].matches.as_slice(), &[0x10]);
    assert_eq!(results[1].matches.as_slice(), &[0x6100]);

    // Narrow down a changing value across two snapshots
    let before = session.snapshot_all();
    session.run_frames(1).unwrap();
    let after = session.snapshot_all();
    let (_, work_before) = &before[0];
    let (_, work_after) = &after[0];
    let increased =
        work_after.filter_snapshot(Width::Bits8, Encoding::LittleEndian, Operator::GreaterThan, work_before);
    assert_eq!(increased.as_slice(), &[0x20]);
}

#[test]
fn test_config_overrides_reach_core() {
    let mut config = silent_config();
    config
        .core
        .options
        .entry("QuickNES".to_string())
        .or_default()
        .insert("nes_speed".to_string(), "fast".to_string());

    let mut session = Session::new(&config);
    session.open_module(fake_nes(), None).unwrap_err();

    // The core doesn't support running without content, try again with a ROM
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&config);
    session.open_module(fake_nes(), Some(&rom(dir.path()))).unwrap();
    session.run_frames(1).unwrap();
    assert_eq!(with_core(|c| c.speed.clone()), Some("fast".to_string()));
}

#[test]
fn test_scripted_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&silent_config());
    session.open_module(fake_nes(), Some(&rom(dir.path()))).unwrap();

    session.input().plug(0, RETRO_DEVICE_JOYPAD);
    session.input().set_button(0, 8, true);
    session.run_frames(1).unwrap();

    assert_eq!(with_core(|c| c.last_input), PRESSED);
    assert_eq!(session.host().ports()[0], RETRO_DEVICE_JOYPAD);
    assert_eq!(session.input().controller_info().len(), 1);
}

#[test]
fn test_shutdown_stops_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&silent_config());
    session.open_module(fake_nes(), Some(&rom(dir.path()))).unwrap();
    with_core(|c| c.shutdown_after = Some(2));

    assert_eq!(session.run_frames(10).unwrap(), 2);
    assert!(session.host().shutdown_requested());
}

#[test]
fn test_run_requires_content() {
    let mut session = Session::new(&silent_config());
    assert!(matches!(
        session.run_frames(1),
        Err(HostError::InvalidState { .. })
    ));
    assert!(session.regions().is_empty());
}

#[test]
fn test_missing_core() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&silent_config());

    let err = session.open(&dir.path().join("missing_libretro.so"), None).unwrap_err();
    assert!(matches!(err, HostError::Module(_)));
    assert_eq!(session.host().lifecycle(), LifecycleState::Unloaded);
}

#[test]
fn test_close_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let mut session = Session::new(&silent_config());
    session.open_module(fake_nes(), Some(&rom(dir.path()))).unwrap();

    session.close();
    assert_eq!(session.host().lifecycle(), LifecycleState::Unloaded);
    assert_eq!(session.platform(), Platform::Other);
    session.close();
}
