//! Wake, sample, upload and sleep state machine for one station cycle.

use embedded_hal_async::delay::DelayNs;
use embedded_storage::{ReadStorage, Storage};
use log::{debug, error, info, warn};

use crate::{
    aggregate::{AggregateResult, aggregate, log_particle_table},
    backoff::BackoffStep,
    board::{
        Board, Rgb, STATUS_PIXEL, SampleIndicator, UPLOAD_PIXEL, UploadIndicator,
        brightness_for_light,
    },
    config::StationConfig,
    particles::EnvironmentReading,
    render::{PLACEHOLDER_SHADE, Screen},
    sampler::{Sampler, SamplerFault},
    sensor::{EnvironmentSensor, ParticulateSensor},
    sleep::SleepPlan,
    store::BackoffStore,
    uplink::{
        BATTERY_FEED, BATTERY_PRECISION, ENVIRONMENT_PRECISION, HUMIDITY_FEED,
        PARTICLE_PRECISION, TEMPERATURE_FEED, Uplink, UplinkPusher, feed_key,
    },
    wake::{self, WakeReason, WakeSource},
};

const PIN_WAKE_HOLD_MS: u32 = 6_000;
const BOOT_FLASHES: u8 = 4;
const BOOT_FLASH_OFF_MS: u32 = 500;
const BOOT_FLASH_ON_MS: u32 = 250;
const CONNECTED_HOLD_MS: u32 = 3_000;

const LOW_BATTERY_TONE_HZ: u32 = 2_600;
const LOW_BATTERY_TONE_MS: u32 = 100;
const LOW_BATTERY_TONE_GAP_MS: u32 = 200;
const LOW_BATTERY_TONES: u8 = 3;

const NETWORK_DOWN_TONE_HZ: u32 = 1_200;
const NETWORK_DOWN_TONE_MS: u32 = 50;
const NETWORK_DOWN_TONE_GAP_MS: u32 = 90;
const NETWORK_DOWN_TONES: u8 = 5;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SleepKind {
    Normal,
    Backoff,
    NetworkRetry,
    Dormant,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LifecycleState {
    Booting,
    ResolvingWake,
    HandlingPinAlarm,
    HandlingTimerAlarm,
    HandlingColdBoot,
    CheckingPower,
    Connecting,
    Sampling,
    Aggregating,
    Uploading,
    Rendering,
    Sleeping(SleepKind),
}

/// What happened during one cycle, for logging and tests.
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub wake: WakeReason,
    pub brightness: Option<f32>,
    pub low_battery_alert: bool,
    pub connect_attempts: u8,
    pub samples: u8,
    pub environment: Option<EnvironmentReading>,
    pub aggregate: AggregateResult,
    pub uploads_delivered: u8,
    pub uploads_failed: u8,
}

impl CycleReport {
    fn new(wake: WakeReason) -> Self {
        Self {
            wake,
            brightness: None,
            low_battery_alert: false,
            connect_attempts: 0,
            samples: 0,
            environment: None,
            aggregate: AggregateResult::default(),
            uploads_delivered: 0,
            uploads_failed: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CycleOutcome {
    pub plan: SleepPlan,
    pub report: CycleReport,
}

/// Lifecycle controller. Owns every collaborator for the length of a cycle.
pub struct Station<B, P, E, N, M, D> {
    config: StationConfig,
    board: B,
    particulate: P,
    environment: E,
    uplink: N,
    store: BackoffStore<M>,
    delay: D,
    state: LifecycleState,
    sensor_powered: bool,
}

impl<B, P, E, N, M, D> Station<B, P, E, N, M, D>
where
    B: Board,
    P: ParticulateSensor,
    E: EnvironmentSensor,
    N: Uplink,
    M: ReadStorage + Storage,
    M::Error: core::fmt::Debug,
    D: DelayNs,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: StationConfig,
        board: B,
        particulate: P,
        environment: E,
        uplink: N,
        sleep_memory: M,
        delay: D,
    ) -> Self {
        Self {
            config,
            board,
            particulate,
            environment,
            uplink,
            store: BackoffStore::new(sleep_memory, config.backoff),
            delay,
            state: LifecycleState::Booting,
            sensor_powered: false,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn particulate(&self) -> &P {
        &self.particulate
    }

    pub fn uplink(&self) -> &N {
        &self.uplink
    }

    pub fn backoff_store(&mut self) -> &mut BackoffStore<M> {
        &mut self.store
    }

    /// Runs one cycle from boot to the sleep decision. The caller enters the
    /// returned sleep; nothing here returns to a previous state.
    pub async fn run<W: WakeSource>(&mut self, wake_source: &mut W) -> CycleOutcome {
        self.state = LifecycleState::Booting;
        info!("lifecycle: booting");
        self.transition(LifecycleState::ResolvingWake);
        let reason = wake::resolve(wake_source, self.config.wake_pin);
        let mut report = CycleReport::new(reason);

        self.board.set_pixel(STATUS_PIXEL, Rgb::SETUP);

        match reason {
            WakeReason::PinAlarm(pin) => {
                self.transition(LifecycleState::HandlingPinAlarm);
                let light = self.board.ambient_light();
                let brightness = brightness_for_light(light);
                info!("pin {} alarm, light {} -> brightness {}", pin.0, light, brightness);
                report.brightness = Some(brightness);
                self.board.fill_pixels(Rgb::WHITE, brightness);
                self.delay.delay_ms(PIN_WAKE_HOLD_MS).await;
                let plan = self.sleep_normal();
                return CycleOutcome { plan, report };
            }
            WakeReason::TimerAlarm => {
                self.transition(LifecycleState::HandlingTimerAlarm);
                for _ in 0..BOOT_FLASHES {
                    self.delay.delay_ms(BOOT_FLASH_OFF_MS).await;
                    self.board.set_pixel(STATUS_PIXEL, Rgb::YELLOW);
                    self.delay.delay_ms(BOOT_FLASH_ON_MS).await;
                    self.board.set_pixel(STATUS_PIXEL, Rgb::OFF);
                }
            }
            WakeReason::ColdBoot => {
                self.transition(LifecycleState::HandlingColdBoot);
                self.board.show(&Screen::Placeholder {
                    shade: PLACEHOLDER_SHADE,
                });
            }
        }

        info!("waking particulate sensor from standby");
        self.board.set_sensor_power(true);
        self.sensor_powered = true;

        self.transition(LifecycleState::CheckingPower);
        let battery_volts = self.board.battery_voltage();
        report.low_battery_alert = self.check_battery(battery_volts).await;

        self.transition(LifecycleState::Connecting);
        match self.connect().await {
            Ok(attempts) => report.connect_attempts = attempts,
            Err(attempts) => {
                report.connect_attempts = attempts;
                let plan = self.sleep_network_retry().await;
                return CycleOutcome { plan, report };
            }
        }

        self.transition(LifecycleState::Sampling);
        info!(
            "waiting {}s for particulate sensor to warm up",
            self.config.sensor_warmup_secs
        );
        self.delay
            .delay_ms(self.config.sensor_warmup_secs.saturating_mul(1_000))
            .await;
        report.environment = self.read_environment().await;

        let batch = {
            let mut sampler = Sampler::new(
                &mut self.particulate,
                &mut self.delay,
                self.config.sample_settle_ms,
            );
            sampler
                .sample(
                    self.config.sample_count(),
                    self.config.max_consecutive_failures,
                    &mut SampleIndicator(&mut self.board),
                )
                .await
        };
        let batch = match batch {
            Ok(batch) => batch,
            Err(SamplerFault::Exhausted {
                consecutive_failures,
                collected,
            }) => {
                error!(
                    "particulate sensor failed {} times in a row ({} samples kept)",
                    consecutive_failures, collected
                );
                self.board.set_pixel(STATUS_PIXEL, Rgb::RED);
                let plan = self.sleep_backoff();
                return CycleOutcome { plan, report };
            }
        };
        report.samples = batch.len() as u8;

        self.transition(LifecycleState::Aggregating);
        let result = aggregate(&batch);
        if result.is_empty() {
            error!("no particulate samples to aggregate");
            self.board.set_pixel(STATUS_PIXEL, Rgb::RED);
            let plan = self.sleep_backoff();
            return CycleOutcome { plan, report };
        }
        if self.config.debug {
            log_particle_table(&result);
        }

        self.transition(LifecycleState::Uploading);
        self.upload(&result, battery_volts, &mut report).await;

        self.transition(LifecycleState::Rendering);
        match Screen::readings(&result, battery_volts) {
            Some(screen) => self.board.show(&screen),
            None => warn!("aggregate is missing display fields, keeping previous screen"),
        }
        report.aggregate = result;

        let plan = self.sleep_normal();
        CycleOutcome { plan, report }
    }

    fn transition(&mut self, next: LifecycleState) {
        info!("lifecycle: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    async fn check_battery(&mut self, battery_volts: f32) -> bool {
        debug!("battery at {} V", battery_volts);
        if battery_volts >= self.config.low_battery_volts {
            return false;
        }
        info!("low battery at {} V", battery_volts);
        if self.board.external_power() {
            return false;
        }
        for _ in 0..LOW_BATTERY_TONES {
            self.board
                .play_tone(LOW_BATTERY_TONE_HZ, LOW_BATTERY_TONE_MS);
            self.delay.delay_ms(LOW_BATTERY_TONE_GAP_MS).await;
        }
        true
    }

    /// Returns the number of attempts made, as `Err` when none succeeded.
    async fn connect(&mut self) -> Result<u8, u8> {
        self.board.set_pixel(STATUS_PIXEL, Rgb::CONNECTING);

        let attempts = self.config.connect_attempts.max(1);
        for attempt in 1..=attempts {
            match self.uplink.connect().await {
                Ok(()) => {
                    info!("connection established");
                    self.board.set_pixel(STATUS_PIXEL, Rgb::GREEN);
                    self.delay.delay_ms(CONNECTED_HOLD_MS).await;
                    self.board.set_pixel(STATUS_PIXEL, Rgb::OFF);
                    return Ok(attempt);
                }
                Err(err) => {
                    warn!(
                        "cannot connect to network ({}/{}): {:?}",
                        attempt, attempts, err
                    );
                    if attempt < attempts {
                        self.delay
                            .delay_ms(self.config.connect_retry_delay_ms)
                            .await;
                    }
                }
            }
        }
        Err(attempts)
    }

    async fn read_environment(&mut self) -> Option<EnvironmentReading> {
        let attempts = self.config.environment_attempts.max(1);
        for attempt in 1..=attempts {
            match self.environment.read().await {
                Ok(reading) => {
                    info!(
                        "environment: {} C, {} %RH",
                        reading.temperature_c, reading.relative_humidity
                    );
                    return Some(reading);
                }
                Err(err) => {
                    warn!(
                        "environment read {}/{} failed: {:?}",
                        attempt, attempts, err
                    );
                    self.delay.delay_ms(self.config.sample_settle_ms).await;
                }
            }
        }
        warn!("skipping temperature and humidity this cycle");
        None
    }

    async fn upload(
        &mut self,
        result: &AggregateResult,
        battery_volts: f32,
        report: &mut CycleReport,
    ) {
        let group = self.config.feed_group;
        let max_attempts = self.config.upload_attempts;
        let mut pusher = UplinkPusher::new(&mut self.uplink, &mut self.delay, self.config.debug)
            .with_settle_ms(self.config.sample_settle_ms)
            .with_retry_delay_ms(self.config.upload_retry_delay_ms);
        let mut indicator = UploadIndicator(&mut self.board);

        let mut values: heapless::Vec<(&str, f32, u8), 16> = heapless::Vec::new();
        if let Some(reading) = report.environment {
            let _ = values.push((TEMPERATURE_FEED, reading.temperature_c, ENVIRONMENT_PRECISION));
            let _ = values.push((HUMIDITY_FEED, reading.relative_humidity, ENVIRONMENT_PRECISION));
        }
        for (field, value) in result.iter() {
            let _ = values.push((field.name(), value, PARTICLE_PRECISION));
        }
        let _ = values.push((BATTERY_FEED, battery_volts, BATTERY_PRECISION));

        for (name, value, precision) in values {
            let Some(key) = feed_key(group, name) else {
                warn!("feed key for {} does not fit, skipping", name);
                report.uploads_failed = report.uploads_failed.saturating_add(1);
                continue;
            };
            if pusher
                .push(&key, value, precision, max_attempts, &mut indicator)
                .await
            {
                report.uploads_delivered = report.uploads_delivered.saturating_add(1);
            } else {
                report.uploads_failed = report.uploads_failed.saturating_add(1);
            }
        }

        indicator.0.set_pixel(UPLOAD_PIXEL, Rgb::UPLOADED);
        if report.uploads_failed > 0 {
            warn!(
                "{} of {} feed updates failed",
                report.uploads_failed,
                report.uploads_failed + report.uploads_delivered
            );
        }
    }

    fn sleep_normal(&mut self) -> SleepPlan {
        self.store.clear();
        self.enter(
            SleepKind::Normal,
            SleepPlan::Refresh {
                after_secs: self.config.refresh_interval_secs,
                wake_pin: self.config.wake_pin,
            },
        )
    }

    async fn sleep_network_retry(&mut self) -> SleepPlan {
        warn!(
            "cannot connect to network, sleeping for {}s",
            self.config.network_retry_sleep_secs
        );
        for _ in 0..NETWORK_DOWN_TONES {
            self.board
                .play_tone(NETWORK_DOWN_TONE_HZ, NETWORK_DOWN_TONE_MS);
            self.delay.delay_ms(NETWORK_DOWN_TONE_GAP_MS).await;
        }
        self.enter(SleepKind::NetworkRetry, self.config.network_retry_plan())
    }

    fn sleep_backoff(&mut self) -> SleepPlan {
        let current = self.store.read();
        match current.escalate(&self.config.backoff) {
            BackoffStep::Sleep(next) => {
                self.store.write(next);
                error!(
                    "exponential backoff: sleeping for {}s (cycle {})",
                    next.delay_secs, next.cycle_count
                );
                self.enter(
                    SleepKind::Backoff,
                    SleepPlan::Backoff {
                        after_secs: next.delay_secs as u32,
                    },
                )
            }
            BackoffStep::Exhausted(next) => {
                self.store.write(next);
                error!("backoff budget spent, sleeping until the wake button is pressed");
                self.enter(
                    SleepKind::Dormant,
                    SleepPlan::Dormant {
                        wake_pin: self.config.wake_pin,
                    },
                )
            }
        }
    }

    fn enter(&mut self, kind: SleepKind, plan: SleepPlan) -> SleepPlan {
        self.board.pixels_off();
        self.board.power_down();
        if self.sensor_powered {
            self.board.set_sensor_power(false);
            self.sensor_powered = false;
        }
        self.transition(LifecycleState::Sleeping(kind));
        info!("sleep plan: {:?}", plan);
        plan
    }
}

#[cfg(test)]
mod tests;
