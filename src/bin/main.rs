#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::fmt::Debug;

use aq_core::{
    board::{Board, Rgb},
    config::StationConfig,
    lifecycle::Station,
    render::Screen,
    sleep::SleepPlan,
    wake::PinId,
};
use aq_hal_esp32s3::{
    board::StationBoard,
    bus::{I2cBus, SharedI2c},
    network::{AioConfig, WifiConfig, WifiUplink},
    platform::{
        display::EpaperDisplay,
        pixels::{PIXEL_COUNT, StatusPixels},
        sense::SenseLines,
        speaker::Speaker,
    },
    sensors::{Pmsa003i, Sht40},
    storage::rtc_memory::{RtcMemory, SLEEP_MEMORY_LEN},
    wake::BootWake,
};
use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    Async,
    clock::CpuClock,
    delay::Delay,
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull, RtcPin},
    i2c::master::I2c,
    rmt::Rmt,
    rng::Rng,
    rtc_cntl::{SocResetReason, reset_reason},
    spi::master::Spi,
    system::Cpu,
    time::Rate,
    timer::timg::TimerGroup,
};
use esp_hal_smartled::{SmartLedsAdapter, smart_led_buffer};
use esp_radio::wifi::{ClientConfig, ModeConfig};
use il0373::Il0373;
use log::{LevelFilter, error, info, warn};
use static_cell::StaticCell;

#[path = "main/power.rs"]
mod power;

const DEBUG_MODE: bool = cfg!(feature = "debug-mode");
const DISPLAY_TEST: bool = cfg!(feature = "display-test");
const LOG_LEVEL: LevelFilter = if DEBUG_MODE {
    LevelFilter::Debug
} else {
    LevelFilter::Info
};

const FEED_GROUP: &str = "air-quality-office";
const WAKE_BUTTON: PinId = PinId(14);
const I2C_KHZ: u32 = 100;
const DHCP_TIMEOUT_SECS: u64 = 15;

const STATION_CONFIG: StationConfig = StationConfig::new()
    .with_debug(DEBUG_MODE)
    .with_feed_group(FEED_GROUP)
    .with_wake_pin(WAKE_BUTTON);

const WIFI_SSID: &str = env!(
    "AQ_WIFI_SSID",
    "Set AQ_WIFI_SSID in your environment before building/flashing."
);
const WIFI_PASSWORD: &str = env!(
    "AQ_WIFI_PASSWORD",
    "Set AQ_WIFI_PASSWORD in your environment before building/flashing."
);
const AIO_USERNAME: &str = env!(
    "AQ_AIO_USERNAME",
    "Set AQ_AIO_USERNAME in your environment before building/flashing."
);
const AIO_KEY: &str = env!(
    "AQ_AIO_KEY",
    "Set AQ_AIO_KEY in your environment before building/flashing."
);
const WIFI_CONFIG: WifiConfig = WifiConfig::new(WIFI_SSID, WIFI_PASSWORD);
const AIO_CONFIG: AioConfig = AioConfig::new(AIO_USERNAME, AIO_KEY);

static NET_RESOURCES: StaticCell<embassy_net::StackResources<4>> = StaticCell::new();
static I2C_BUS: StaticCell<I2cBus<I2c<'static, Async>>> = StaticCell::new();

#[esp_hal::ram(unstable(rtc_fast, persistent))]
static mut SLEEP_MEMORY: [u8; SLEEP_MEMORY_LEN] = [0; SLEEP_MEMORY_LEN];

/// A panic ends the cycle like a failed bring-up: retry on the network timer
/// rather than spin with the radio and sensor powered.
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    error!("panic: {}", info);
    power::enter_deep_sleep(STATION_CONFIG.network_retry_plan())
}

// This creates a default app-descriptor required by the esp-idf bootloader.
// For more information see: <https://docs.espressif.com/projects/esp-idf/en/stable/esp32/api-reference/system/app_image_format.html#application-description>
esp_bootloader_esp_idf::esp_app_desc!();

/// Without this peripheral the cycle cannot run; try again after the
/// network-retry sleep.
fn bring_up_failed(what: &str, err: impl Debug) -> ! {
    warn!("{} init failed: {:?}", what, err);
    power::enter_deep_sleep(STATION_CONFIG.network_retry_plan())
}

/// Draws fixed readings so the panel layout can be checked, then sleeps until
/// the button is pressed.
fn show_layout_preview(board: &mut impl Board) -> ! {
    board.set_pixel(3, Rgb::RED);
    match Screen::layout_preview() {
        Some(screen) => board.show(&screen),
        None => warn!("layout preview did not fit its text buffers"),
    }
    board.power_down();
    power::enter_deep_sleep(SleepPlan::Dormant {
        wake_pin: WAKE_BUTTON,
    })
}

#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    esp_println::logger::init_logger(LOG_LEVEL);

    // Latch the wake registers before any peripheral setup touches them.
    let mut boot_wake = BootWake::capture();
    let boot_reset_reason = reset_reason(Cpu::ProCpu);
    info!(
        "boot reset_reason={:?} wakeup_cause={:?} debug_mode={} display_test={}",
        boot_reset_reason,
        boot_wake.cause(),
        DEBUG_MODE,
        DISPLAY_TEST
    );

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 65536);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // SAFETY: the only reference to SLEEP_MEMORY, taken once at boot.
    let mut sleep_memory = RtcMemory::new(unsafe { &mut *core::ptr::addr_of_mut!(SLEEP_MEMORY) });
    if boot_reset_reason != Some(SocResetReason::CoreDeepSleep) {
        sleep_memory.wipe();
    }

    // Release the deep-sleep pad hold before driving SET again.
    let sensor_set_pin = peripherals.GPIO6;
    sensor_set_pin.rtcio_pad_hold(false);
    let sensor_set = Output::new(sensor_set_pin, Level::Low, OutputConfig::default());

    let rmt = match Rmt::new(peripherals.RMT, Rate::from_mhz(80)) {
        Ok(rmt) => rmt,
        Err(err) => bring_up_failed("rmt", err),
    };
    let mut led_buffer = smart_led_buffer!(PIXEL_COUNT);
    let pixels = StatusPixels::new(SmartLedsAdapter::new(
        rmt.channel0,
        peripherals.GPIO1,
        &mut led_buffer,
    ));

    let speaker = Speaker::new(
        Output::new(peripherals.GPIO17, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO16, Level::Low, OutputConfig::default()),
    );

    let sense = SenseLines::new(
        peripherals.ADC1,
        peripherals.GPIO3,
        peripherals.GPIO4,
        Input::new(
            peripherals.GPIO5,
            InputConfig::default().with_pull(Pull::Down),
        ),
    );

    let panel_config = il0373::Config::default();
    let spi_config = esp_hal::spi::master::Config::default()
        .with_frequency(Rate::from_hz(panel_config.spi_hz))
        .with_mode(esp_hal::spi::Mode::_0);
    let spi = match Spi::new(peripherals.SPI2, spi_config) {
        Ok(spi) => spi
            .with_sck(peripherals.GPIO12)
            .with_mosi(peripherals.GPIO11),
        Err(err) => bring_up_failed("display spi", err),
    };
    let cs = Output::new(peripherals.GPIO10, Level::High, OutputConfig::default());
    let Ok(spi_device) = ExclusiveDevice::new(spi, cs, Delay::new());
    let display = EpaperDisplay::new(Il0373::new(
        spi_device,
        Output::new(peripherals.GPIO13, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO15, Level::High, OutputConfig::default()),
        Input::new(peripherals.GPIO18, InputConfig::default()),
        panel_config,
    ));

    let mut board = StationBoard::new(pixels, speaker, sense, sensor_set, display);
    if DISPLAY_TEST {
        show_layout_preview(&mut board);
    }

    let i2c_config = esp_hal::i2c::master::Config::default().with_frequency(Rate::from_khz(I2C_KHZ));
    let i2c = match I2c::new(peripherals.I2C0, i2c_config) {
        Ok(i2c) => i2c
            .with_sda(peripherals.GPIO8)
            .with_scl(peripherals.GPIO9)
            .into_async(),
        Err(err) => bring_up_failed("i2c", err),
    };
    let i2c_bus = I2C_BUS.init(I2cBus::new(i2c));
    let particulate = Pmsa003i::new(SharedI2c::new(i2c_bus));
    let environment = Sht40::new(SharedI2c::new(i2c_bus));

    let radio = match esp_radio::init() {
        Ok(radio) => radio,
        Err(err) => bring_up_failed("esp-radio", err),
    };
    let (mut wifi_controller, interfaces) =
        match esp_radio::wifi::new(&radio, peripherals.WIFI, esp_radio::wifi::Config::default()) {
            Ok(parts) => parts,
            Err(err) => bring_up_failed("wifi peripheral", err),
        };

    let client_config = ClientConfig::default()
        .with_ssid(WIFI_CONFIG.ssid.into())
        .with_password(WIFI_CONFIG.password.into());
    if let Err(err) = wifi_controller.set_config(&ModeConfig::Client(client_config)) {
        bring_up_failed("wifi mode", err);
    }

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, mut net_runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        NET_RESOURCES.init(embassy_net::StackResources::<4>::new()),
        seed,
    );
    let uplink = WifiUplink::new(wifi_controller, stack, AIO_CONFIG)
        .with_dhcp_timeout_secs(DHCP_TIMEOUT_SECS);

    info!("Display pins: SCK=GPIO12 MOSI=GPIO11 CS=GPIO10 DC=GPIO13 RST=GPIO15 BUSY=GPIO18");
    info!("Sensor pins: SDA=GPIO8 SCL=GPIO9 SET=GPIO6; button=GPIO14");
    info!(
        "Wi-Fi configured from env; feeds under {}/{}",
        AIO_CONFIG.username, FEED_GROUP
    );

    let mut station = Station::new(
        STATION_CONFIG,
        board,
        particulate,
        environment,
        uplink,
        sleep_memory,
        embassy_time::Delay,
    );

    // The net runner only has to live as long as the cycle does.
    let outcome = match select(net_runner.run(), station.run(&mut boot_wake)).await {
        Either::First(never) => match never {},
        Either::Second(outcome) => outcome,
    };
    info!("cycle finished: {:?}", outcome.report);

    power::enter_deep_sleep(outcome.plan)
}
