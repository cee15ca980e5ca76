//! End-to-end tests of the supervisor running the initialization sequence

use mrkt::config::InitTimings;
use mrkt::hal::MockBoard;
use mrkt::{CommError, Config, InitState, ModeController, ModeKind};

const VERSION_REPLY_1_1: &[u8] = b"[VER:1.1h.20190825:]\r\n[OPT:V,15,128]\r\nok\r\n";
const VERSION_REPLY_0_9: &[u8] = b"[VER:0.9j.20160303:]\r\n[OPT:V,15,128]\r\nok\r\n";

fn boot() -> ModeController<MockBoard> {
    ModeController::new(Config::default(), MockBoard::peripherals())
}

/// Ticks through the banner and the version query.
fn boot_until_query() -> ModeController<MockBoard> {
    let mut controller = boot();
    controller.tick();
    controller.tick();
    assert_eq!(controller.comm().serial().sent(), b"$I\r");
    assert_eq!(
        controller.modes().initialization.state(),
        InitState::GrblWaiting
    );
    controller
}

fn row(controller: &ModeController<MockBoard>, row: u8) -> String {
    controller.display().line(row).as_str().to_string()
}

fn init_state(controller: &ModeController<MockBoard>) -> InitState {
    controller.modes().initialization.state()
}

// ============================================================================
// Startup Tests
// ============================================================================

#[test]
fn banner_shows_firmware_version() {
    let mut controller = boot();
    controller.tick();

    let expected = format!("{:<16}", format!("Mrkt {}", env!("CARGO_PKG_VERSION")));
    assert_eq!(row(&controller, 0), expected);
}

#[test]
fn search_shows_ellipsis() {
    let controller = boot_until_query();
    assert_eq!(row(&controller, 1), "Grbl ~          ");
}

// ============================================================================
// Version Check Tests
// ============================================================================

#[test]
fn compatible_version_switches_to_working_mode() {
    let mut controller = boot_until_query();

    controller.serial_mut().feed(VERSION_REPLY_1_1);
    controller.tick();
    assert_eq!(init_state(&controller), InitState::GrblVersionOK);
    assert_eq!(row(&controller, 1), "Grbl 1.1h       ");

    controller.tick();
    assert_eq!(row(&controller, 1), "Grbl 1.1h   OK  ");
    assert_eq!(init_state(&controller), InitState::Final);

    // Version stays on screen for the display time
    controller.clock_mut().advance(999);
    controller.tick();
    assert_eq!(controller.current_mode(), ModeKind::Initialization);

    controller.clock_mut().advance(1);
    controller.tick();
    assert_eq!(controller.current_mode(), ModeKind::Command);
    assert_eq!(controller.modes().initialization.version(), Some("1.1h"));
    assert!(!controller.led().on);
    assert!(controller.display().contains("Command mode"));
}

#[test]
fn incompatible_version_is_terminal() {
    let mut controller = boot_until_query();

    controller.serial_mut().feed(VERSION_REPLY_0_9);
    controller.tick();
    assert_eq!(init_state(&controller), InitState::GrblVersionError);

    controller.tick();
    assert_eq!(row(&controller, 1), "Grbl 0.9j   ERR ");
    assert_eq!(controller.modes().initialization.blink_interval_ms(), 100);

    let toggles_before = controller.led().toggles;
    for _ in 0..100 {
        controller.clock_mut().advance(10);
        controller.tick();
    }

    assert_eq!(controller.current_mode(), ModeKind::Initialization);
    assert_eq!(init_state(&controller), InitState::GrblVersionError);
    assert_eq!(row(&controller, 1), "Grbl 0.9j   ERR ");
    // Fast blink: roughly every 100ms over one second
    assert!(controller.led().toggles - toggles_before >= 8);
    // No further queries
    assert_eq!(controller.comm().serial().sent(), b"$I\r");
}

// ============================================================================
// Failure and Retry Tests
// ============================================================================

#[test]
fn timeout_retries_after_delay() {
    let mut controller = boot_until_query();

    controller.clock_mut().set(1500);
    controller.tick();
    assert_eq!(init_state(&controller), InitState::GrblWaiting);

    controller.clock_mut().set(1501);
    controller.tick();
    assert_eq!(
        controller.modes().initialization.last_error(),
        Some(CommError::Timeout)
    );
    assert_eq!(row(&controller, 1), "Grbl Com Err -1 ");
    assert_eq!(init_state(&controller), InitState::GrblSearchStart);

    controller.clock_mut().set(1750);
    controller.tick();
    assert_eq!(controller.comm().serial().sent(), b"$I\r");

    controller.clock_mut().set(1751);
    controller.tick();
    assert_eq!(controller.comm().serial().sent(), b"$I\r$I\r");
    assert_eq!(row(&controller, 1), "Grbl ~          ");

    // The retry succeeds
    controller.serial_mut().feed(VERSION_REPLY_1_1);
    controller.tick();
    assert_eq!(init_state(&controller), InitState::GrblVersionOK);
}

#[test]
fn grbl_error_reply_is_shown_as_command_error() {
    let mut controller = boot_until_query();

    controller.serial_mut().feed(b"error:9\r\n");
    controller.tick();

    assert_eq!(
        controller.modes().initialization.last_error(),
        Some(CommError::Protocol(9))
    );
    assert_eq!(row(&controller, 1), "Grbl Cmd Err 9  ");
}

#[test]
fn reply_without_version_is_retried() {
    let mut controller = boot_until_query();

    controller.serial_mut().feed(b"ok\r\n");
    controller.tick();

    assert_eq!(
        controller.modes().initialization.last_error(),
        Some(CommError::MalformedReply)
    );
    assert_eq!(row(&controller, 1), "Grbl Com Err -3 ");
    assert_eq!(init_state(&controller), InitState::GrblSearchStart);
}

#[test]
fn oversized_reply_is_reported_as_overflow() {
    let mut controller = boot_until_query();

    controller.serial_mut().feed(&[b'#'; 64]);
    controller.tick();

    assert_eq!(
        controller.modes().initialization.last_error(),
        Some(CommError::Overflow)
    );
    assert_eq!(row(&controller, 1), "Grbl Com Err -2 ");
}

#[test]
fn custom_timings_are_honoured() {
    let config = Config::default().with_timing(
        InitTimings::default()
            .with_comm_timeout_ms(100)
            .with_retry_delay_ms(10),
    );
    let mut controller: ModeController<MockBoard> =
        ModeController::new(config, MockBoard::peripherals());
    controller.tick();
    controller.tick();

    controller.clock_mut().set(101);
    controller.tick();
    assert_eq!(init_state(&controller), InitState::GrblSearchStart);

    controller.clock_mut().set(111);
    controller.tick();
    assert_eq!(controller.comm().serial().sent(), b"$I\r$I\r");
}

// ============================================================================
// Event Echo Tests
// ============================================================================

#[test]
fn events_are_echoed_while_waiting() {
    let mut controller = boot_until_query();

    controller.panel_mut().set_keypad_level(100); // Up
    controller.tick();
    assert_eq!(init_state(&controller), InitState::EventDisplay);

    controller.tick();
    assert_eq!(row(&controller, 1), "KP Up     1     ");
    assert!(!controller.controls().is_event_available());

    // Echo stays for the display time; the reply is still accepted meanwhile
    controller.panel_mut().release_all();
    controller.panel_mut().turn_encoder(-8); // two detents, inverted
    controller.clock_mut().advance(100);
    controller.tick();
    assert_eq!(row(&controller, 1), "KP Up     1     ");
    assert!(controller.controls().is_event_available());

    controller.clock_mut().advance(650);
    controller.tick();
    controller.tick();
    assert_eq!(row(&controller, 1), "E Wheel   2     ");
}

#[test]
fn reply_wins_over_pending_event_echo() {
    let mut controller = boot_until_query();

    controller.panel_mut().set_button_level(100); // Mode button
    controller.tick();
    controller.tick();
    assert_eq!(row(&controller, 1), "M Button  1     ");

    controller.serial_mut().feed(VERSION_REPLY_1_1);
    controller.tick();
    assert_eq!(init_state(&controller), InitState::GrblVersionOK);
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[test]
fn switch_takes_effect_after_final_tick() {
    let mut controller = boot_until_query();
    controller.serial_mut().feed(VERSION_REPLY_1_1);
    controller.tick();
    controller.tick();
    controller.clock_mut().advance(1000);
    controller.tick();

    let command = &controller.modes().command;
    assert_eq!(command.activations(), 1);
    assert_eq!(command.ticks(), 0);

    controller.tick();
    assert_eq!(controller.modes().command.ticks(), 1);
}

#[test]
fn reentering_initialization_restarts_sequence() {
    let mut controller = boot_until_query();
    controller.serial_mut().feed(VERSION_REPLY_1_1);
    controller.tick();
    controller.tick();
    controller.clock_mut().advance(1000);
    controller.tick();
    assert_eq!(controller.current_mode(), ModeKind::Command);

    controller.switch_to_mode(ModeKind::Initialization);
    controller.tick();
    assert_eq!(controller.current_mode(), ModeKind::Initialization);
    assert_eq!(controller.modes().command.deactivations(), 1);
    assert_eq!(init_state(&controller), InitState::Initial);
    assert_eq!(controller.modes().initialization.version(), None);

    controller.tick();
    controller.tick();
    assert_eq!(controller.comm().serial().sent(), b"$I\r$I\r");
}

#[test]
fn placeholder_modes_discard_events() {
    let mut controller = boot();
    controller.switch_to_mode(ModeKind::Passthrough);
    controller.tick();

    controller.panel_mut().set_keypad_level(600); // Left
    controller.tick();
    assert!(!controller.controls().is_event_available());
    assert_eq!(row(&controller, 1), "Not available   ");
}
