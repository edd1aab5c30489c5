//! Thermo-monitor firmware — OTA update entry point.
//!
//! Boot, join Wi-Fi, pull the firmware image for the inactive slot over
//! HTTP, and restart: into the new image on success, into the current one
//! otherwise.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                 Adapters (outer ring)                     │
//! │                                                           │
//! │  TcpTransport   EspOtaSink   SystemClock   LogEventSink   │
//! │  (Transport)    (FlashSink)  (Clock)       (EventSink)    │
//! │                                                           │
//! │  ─────────────── Port Trait Boundary ───────────────      │
//! │                                                           │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │  OtaUpdater ──▶ TransferSession ──▶ HeaderParser    │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{error, info, warn};

use thermo_monitor::adapters::flash::{self, EspOtaSink};
use thermo_monitor::adapters::log_sink::LogEventSink;
use thermo_monitor::adapters::tcp::TcpTransport;
use thermo_monitor::adapters::time::SystemClock;
use thermo_monitor::app::updater::OtaUpdater;
use thermo_monitor::config::OtaConfig;
use thermo_monitor::ota::OtaSlot;

static SSID: &str = env!("WIFI_SSID");
static PASSWORD: &str = env!("WIFI_PASS");

/// Socket receive buffer; one read fills at most this much.
const RECV_BUF_LEN: usize = 1024;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Thermo-monitor v{}                 ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Boot partition checks ──────────────────────────────
    flash::check_rollback();
    let (running, boot) = flash::partitions();
    if running != boot {
        warn!(
            "Configured OTA boot partition {:?} differs from running partition {:?}",
            boot, running
        );
    }
    let running = running.unwrap_or(OtaSlot::Factory);
    info!("Running from {:?}, update goes to {:?}", running, running.update_target());

    // ── 3. Config ─────────────────────────────────────────────
    let config = load_config();

    // ── 4. Network ────────────────────────────────────────────
    let _wifi = match setup_wifi() {
        Ok(w) => w,
        Err(e) => {
            error!("Wi-Fi setup failed: {:?}", e);
            flash::restart();
        }
    };

    // ── 5. Update ─────────────────────────────────────────────
    let image = config.image_for(running);
    let clock = SystemClock::new();
    let mut sink = EspOtaSink::new();
    let mut events = LogEventSink::new();
    let mut buf = [0u8; RECV_BUF_LEN];

    let read_timeout = Duration::from_millis(u64::from(config.read_timeout_ms));
    match TcpTransport::connect(&config.server_host, config.server_port, read_timeout) {
        Ok(mut transport) => {
            let updater = OtaUpdater::new(&config);
            match updater.run(image, &mut buf, &mut transport, &mut sink, &clock, &mut events) {
                Ok(report) => info!(
                    "Update to {:?} done: {} bytes (+{} header) in {} ms",
                    running.update_target(),
                    report.image_bytes,
                    report.header_bytes,
                    report.elapsed_ms
                ),
                Err(e) => error!("Update failed: {}", e),
            }
        }
        Err(e) => error!("Cannot reach {}:{}: {}", config.server_host, config.server_port, e),
    }

    // ── 6. Restart either way ─────────────────────────────────
    flash::restart();
}

fn load_config() -> OtaConfig {
    match option_env!("THERMO_MONITOR_OTA_CONFIG") {
        Some(json) => match OtaConfig::from_json(json) {
            Ok(c) => {
                info!("OTA config loaded from build environment");
                c
            }
            Err(e) => {
                warn!("OTA config rejected ({}), using defaults", e);
                OtaConfig::default()
            }
        },
        None => OtaConfig::default(),
    }
}

fn setup_wifi() -> Result<BlockingWifi<EspWifi<'static>>> {
    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;

    let auth_method = if PASSWORD.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::WPA2Personal
    };
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: SSID
            .try_into()
            .map_err(|()| anyhow::anyhow!("SSID longer than 32 bytes"))?,
        password: PASSWORD
            .try_into()
            .map_err(|()| anyhow::anyhow!("password longer than 64 bytes"))?,
        auth_method,
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;

    let ip = wifi.wifi().sta_netif().get_ip_info()?;
    info!("Wi-Fi connected to `{}`, address {}", SSID, ip.ip);
    Ok(wifi)
}
