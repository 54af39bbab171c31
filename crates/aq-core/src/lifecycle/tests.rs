use embassy_futures::block_on;

use super::*;
use crate::{
    backoff::BackoffState,
    particles::{ParticleField, ParticleReading},
    store::ByteRegion,
    test_support::InstantDelay,
    wake::{CapturedWake, PinId, WakeSignal},
};

const BUTTON: PinId = PinId(14);

#[derive(Default)]
struct RecordingBoard {
    light: u16,
    battery: f32,
    external_power: bool,
    pixels: Vec<(usize, Rgb)>,
    fills: Vec<(Rgb, f32)>,
    tones: Vec<(u32, u32)>,
    sensor_power: Vec<bool>,
    screens: Vec<Screen>,
    pixels_cleared: u8,
    power_downs: u8,
}

impl RecordingBoard {
    fn with_battery(battery: f32) -> Self {
        Self {
            battery,
            ..Self::default()
        }
    }

    fn last_pixel(&self, index: usize) -> Option<Rgb> {
        self.pixels
            .iter()
            .rev()
            .find(|(i, _)| *i == index)
            .map(|(_, color)| *color)
    }
}

impl Board for RecordingBoard {
    fn set_pixel(&mut self, index: usize, color: Rgb) {
        self.pixels.push((index, color));
    }

    fn fill_pixels(&mut self, color: Rgb, brightness: f32) {
        self.fills.push((color, brightness));
    }

    fn pixels_off(&mut self) {
        self.pixels_cleared += 1;
    }

    fn play_tone(&mut self, freq_hz: u32, duration_ms: u32) {
        self.tones.push((freq_hz, duration_ms));
    }

    fn ambient_light(&mut self) -> u16 {
        self.light
    }

    fn battery_voltage(&mut self) -> f32 {
        self.battery
    }

    fn external_power(&mut self) -> bool {
        self.external_power
    }

    fn set_sensor_power(&mut self, on: bool) {
        self.sensor_power.push(on);
    }

    fn show(&mut self, screen: &Screen) {
        self.screens.push(screen.clone());
    }

    fn power_down(&mut self) {
        self.power_downs += 1;
    }
}

/// Fails the first `failures` reads, then returns `reading`.
struct ScriptedParticulate {
    reading: ParticleReading,
    failures: usize,
    reads: usize,
}

impl ScriptedParticulate {
    fn steady(value: u16) -> Self {
        Self {
            reading: ParticleReading::uniform(value),
            failures: 0,
            reads: 0,
        }
    }

    fn broken() -> Self {
        Self {
            failures: usize::MAX,
            ..Self::steady(0)
        }
    }
}

impl ParticulateSensor for ScriptedParticulate {
    type Error = &'static str;

    async fn read(&mut self) -> Result<ParticleReading, Self::Error> {
        self.reads += 1;
        if self.reads <= self.failures {
            Err("checksum mismatch")
        } else {
            Ok(self.reading)
        }
    }
}

struct ScriptedEnvironment {
    reading: Option<EnvironmentReading>,
}

impl ScriptedEnvironment {
    fn office() -> Self {
        Self {
            reading: Some(EnvironmentReading {
                temperature_c: 21.5,
                relative_humidity: 40.0,
            }),
        }
    }

    fn unplugged() -> Self {
        Self { reading: None }
    }
}

impl EnvironmentSensor for ScriptedEnvironment {
    type Error = ();

    async fn read(&mut self) -> Result<EnvironmentReading, Self::Error> {
        self.reading.ok_or(())
    }
}

#[derive(Default)]
struct ScriptedUplink {
    connect_failures: u8,
    push_fails: bool,
    connects: u8,
    pushes: Vec<(String, f32, u8)>,
}

impl ScriptedUplink {
    fn online() -> Self {
        Self::default()
    }

    fn unreachable() -> Self {
        Self {
            connect_failures: u8::MAX,
            ..Self::default()
        }
    }

    fn pushed(&self, key: &str) -> Option<(f32, u8)> {
        self.pushes
            .iter()
            .find(|(k, _, _)| k == key)
            .map(|(_, value, precision)| (*value, *precision))
    }
}

impl Uplink for ScriptedUplink {
    type Error = &'static str;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        self.connects += 1;
        if self.connects <= self.connect_failures {
            Err("association timed out")
        } else {
            Ok(())
        }
    }

    async fn push(&mut self, feed_key: &str, value: f32, precision: u8) -> Result<(), Self::Error> {
        self.pushes.push((feed_key.into(), value, precision));
        if self.push_fails { Err("http 500") } else { Ok(()) }
    }
}

type TestStation = Station<
    RecordingBoard,
    ScriptedParticulate,
    ScriptedEnvironment,
    ScriptedUplink,
    ByteRegion<4>,
    InstantDelay,
>;

fn memory_with(state: BackoffState) -> ByteRegion<4> {
    let mut store = BackoffStore::new(ByteRegion::<4>::new(), Default::default());
    store.write(state);
    store.release()
}

fn station(
    config: StationConfig,
    board: RecordingBoard,
    particulate: ScriptedParticulate,
    environment: ScriptedEnvironment,
    uplink: ScriptedUplink,
    prior: BackoffState,
) -> TestStation {
    Station::new(
        config,
        board,
        particulate,
        environment,
        uplink,
        memory_with(prior),
        InstantDelay::default(),
    )
}

fn run(station: &mut TestStation, signal: WakeSignal) -> CycleOutcome {
    block_on(station.run(&mut CapturedWake(signal)))
}

#[test]
fn timer_wake_happy_path_uploads_and_clears_backoff() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::new(30, 2),
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(
        outcome.plan,
        SleepPlan::Refresh {
            after_secs: 180,
            wake_pin: BUTTON,
        }
    );
    assert_eq!(station.state(), LifecycleState::Sleeping(SleepKind::Normal));
    assert_eq!(station.backoff_store().read(), BackoffState::INACTIVE);

    let report = &outcome.report;
    assert_eq!(report.wake, WakeReason::TimerAlarm);
    assert_eq!(report.connect_attempts, 1);
    assert_eq!(report.samples, 10);
    assert_eq!(report.aggregate.get(ParticleField::Pm10Standard), Some(7.0));
    assert_eq!(report.uploads_delivered, 15);
    assert_eq!(report.uploads_failed, 0);
    assert!(!report.low_battery_alert);

    let uplink = station.uplink();
    assert_eq!(uplink.pushes.len(), 15);
    assert_eq!(uplink.pushed("air-quality-office.pm10-standard"), Some((7.0, 2)));
    assert_eq!(uplink.pushed("air-quality-office.temperature-c"), Some((21.5, 1)));
    assert_eq!(uplink.pushed("air-quality-office.relative-humidity"), Some((40.0, 1)));
    assert_eq!(uplink.pushed("air-quality-office.battery-voltage"), Some((4.0, 2)));

    let board = station.board();
    assert!(board.tones.is_empty());
    assert_eq!(board.sensor_power, [true, false]);
    assert_eq!(board.pixels_cleared, 1);
    assert_eq!(board.power_downs, 1);
    assert_eq!(board.last_pixel(UPLOAD_PIXEL), Some(Rgb::UPLOADED));
    match board.screens.last() {
        Some(Screen::Readings { pm10, pm25, .. }) => {
            assert_eq!(pm10.as_str(), "7");
            assert_eq!(pm25.as_str(), "7");
        }
        other => panic!("expected readings screen, got {other:?}"),
    }
}

#[test]
fn timer_wake_flashes_the_status_pixel_four_times() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(1),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::INACTIVE,
    );

    run(&mut station, WakeSignal::Timer);

    let yellow_flashes = station
        .board()
        .pixels
        .iter()
        .take_while(|(_, color)| *color != Rgb::CONNECTING)
        .filter(|(index, color)| *index == STATUS_PIXEL && *color == Rgb::YELLOW)
        .count();
    assert_eq!(yellow_flashes, 4);
}

#[test]
fn pin_wake_lights_pixels_and_sleeps_without_sampling() {
    let mut board = RecordingBoard::with_battery(4.0);
    board.light = 1000;
    let mut station = station(
        StationConfig::new(),
        board,
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::new(60, 3),
    );

    let outcome = run(&mut station, WakeSignal::Pin(Some(PinId(11))));

    assert_eq!(outcome.report.wake, WakeReason::PinAlarm(PinId(11)));
    assert_eq!(outcome.report.brightness, Some(0.75));
    assert_eq!(
        outcome.plan,
        SleepPlan::Refresh {
            after_secs: 180,
            wake_pin: BUTTON,
        }
    );
    assert_eq!(station.particulate().reads, 0);
    assert_eq!(station.uplink().connects, 0);
    assert!(station.uplink().pushes.is_empty());
    assert_eq!(station.board().fills, [(Rgb::WHITE, 0.75)]);
    assert!(station.board().sensor_power.is_empty());
    assert_eq!(station.backoff_store().read(), BackoffState::INACTIVE);
}

#[test]
fn exhausted_sampler_escalates_backoff() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::broken(),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::new(30, 2),
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(outcome.plan, SleepPlan::Backoff { after_secs: 60 });
    assert_eq!(station.state(), LifecycleState::Sleeping(SleepKind::Backoff));
    assert_eq!(station.backoff_store().read(), BackoffState::new(60, 3));
    assert_eq!(station.particulate().reads, 4);
    assert!(station.uplink().pushes.is_empty());
    assert_eq!(station.board().last_pixel(STATUS_PIXEL), Some(Rgb::RED));
    assert_eq!(station.board().sensor_power, [true, false]);
}

#[test]
fn first_backoff_starts_at_the_minimum_delay() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::broken(),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::INACTIVE,
    );

    let outcome = run(&mut station, WakeSignal::None);

    assert_eq!(outcome.plan, SleepPlan::Backoff { after_secs: 15 });
    assert_eq!(station.backoff_store().read(), BackoffState::new(15, 1));
}

#[test]
fn spent_backoff_budget_goes_dormant_until_the_button() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::broken(),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::new(300, 11),
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(outcome.plan, SleepPlan::Dormant { wake_pin: BUTTON });
    assert_eq!(outcome.plan.timer_secs(), None);
    assert_eq!(station.state(), LifecycleState::Sleeping(SleepKind::Dormant));
    assert_eq!(station.backoff_store().read(), BackoffState::new(300, 12));
}

#[test]
fn button_after_dormant_clears_the_budget() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::broken(),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::new(300, 12),
    );

    let outcome = run(&mut station, WakeSignal::Pin(None));

    assert_eq!(outcome.report.wake, WakeReason::PinAlarm(BUTTON));
    assert!(matches!(outcome.plan, SleepPlan::Refresh { .. }));
    assert_eq!(station.backoff_store().read(), BackoffState::INACTIVE);
}

#[test]
fn unreachable_network_sleeps_without_touching_backoff() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        ScriptedUplink::unreachable(),
        BackoffState::new(30, 2),
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(outcome.plan, SleepPlan::NetworkRetry { after_secs: 300 });
    assert_eq!(outcome.report.connect_attempts, 6);
    assert_eq!(station.uplink().connects, 6);
    assert_eq!(station.particulate().reads, 0);
    assert_eq!(station.backoff_store().read(), BackoffState::new(30, 2));
    assert_eq!(station.board().tones, [(1_200, 50); 5]);
    assert_eq!(station.board().sensor_power, [true, false]);
}

#[test]
fn late_connection_is_accepted() {
    let mut uplink = ScriptedUplink::online();
    uplink.connect_failures = 5;
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        uplink,
        BackoffState::INACTIVE,
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(outcome.report.connect_attempts, 6);
    assert!(matches!(outcome.plan, SleepPlan::Refresh { .. }));
}

#[test]
fn low_battery_beeps_unless_externally_powered() {
    let mut on_battery = station(
        StationConfig::new(),
        RecordingBoard::with_battery(3.2),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::INACTIVE,
    );
    let outcome = run(&mut on_battery, WakeSignal::Timer);
    assert!(outcome.report.low_battery_alert);
    assert_eq!(on_battery.board().tones, [(2_600, 100); 3]);

    let mut board = RecordingBoard::with_battery(3.2);
    board.external_power = true;
    let mut on_usb = station(
        StationConfig::new(),
        board,
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::INACTIVE,
    );
    let outcome = run(&mut on_usb, WakeSignal::Timer);
    assert!(!outcome.report.low_battery_alert);
    assert!(on_usb.board().tones.is_empty());
}

#[test]
fn cold_boot_shows_placeholder_before_readings() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::INACTIVE,
    );

    let outcome = run(&mut station, WakeSignal::None);

    assert_eq!(outcome.report.wake, WakeReason::ColdBoot);
    let screens = &station.board().screens;
    assert_eq!(screens.len(), 2);
    assert_eq!(
        screens[0],
        Screen::Placeholder {
            shade: PLACEHOLDER_SHADE
        }
    );
    assert!(matches!(screens[1], Screen::Readings { .. }));
}

#[test]
fn missing_environment_skips_its_uploads_only() {
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::unplugged(),
        ScriptedUplink::online(),
        BackoffState::INACTIVE,
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(outcome.report.environment, None);
    assert_eq!(outcome.report.uploads_delivered, 13);
    assert!(station.uplink().pushed("air-quality-office.temperature-c").is_none());
    assert!(matches!(outcome.plan, SleepPlan::Refresh { .. }));
}

#[test]
fn failed_uploads_do_not_change_the_sleep() {
    let mut uplink = ScriptedUplink::online();
    uplink.push_fails = true;
    let mut station = station(
        StationConfig::new(),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        uplink,
        BackoffState::new(15, 1),
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(outcome.report.uploads_failed, 15);
    assert_eq!(station.uplink().pushes.len(), 15 * 3);
    assert!(matches!(outcome.plan, SleepPlan::Refresh { .. }));
    assert_eq!(station.backoff_store().read(), BackoffState::INACTIVE);
    assert!(matches!(
        station.board().screens.last(),
        Some(Screen::Readings { .. })
    ));
}

#[test]
fn diagnostic_mode_takes_one_sample_and_stays_offline() {
    let mut station = station(
        StationConfig::new().with_debug(true),
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::INACTIVE,
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(outcome.report.samples, 1);
    assert_eq!(station.particulate().reads, 1);
    assert!(station.uplink().pushes.is_empty());
    assert!(matches!(outcome.plan, SleepPlan::Refresh { .. }));
}

#[test]
fn empty_batch_is_routed_to_backoff() {
    let mut config = StationConfig::new();
    config.samples = 0;
    let mut station = station(
        config,
        RecordingBoard::with_battery(4.0),
        ScriptedParticulate::steady(7),
        ScriptedEnvironment::office(),
        ScriptedUplink::online(),
        BackoffState::INACTIVE,
    );

    let outcome = run(&mut station, WakeSignal::Timer);

    assert_eq!(outcome.plan, SleepPlan::Backoff { after_secs: 15 });
    assert!(station.uplink().pushes.is_empty());
    assert!(station.board().screens.is_empty());
}
