//! Wi-Fi association and Adafruit IO feed uploads.

use core::fmt::Write as _;

use aq_core::uplink::{Uplink, format_value};
use embassy_net::{
    Stack,
    dns::DnsSocket,
    tcp::client::{TcpClient, TcpClientState},
};
use embassy_time::{Duration, WithTimeout};
use esp_radio::wifi::WifiController;
use heapless::String;
use log::{debug, info, warn};
use reqwless::{
    client::HttpClient,
    request::{Method, RequestBuilder},
};

/// Adafruit IO REST endpoint. Plain HTTP keeps TLS off the device.
pub const AIO_BASE_URL: &str = "http://io.adafruit.com/api/v2";
pub const DEFAULT_DHCP_TIMEOUT_SECS: u64 = 15;

const URL_CAPACITY: usize = 192;
const BODY_CAPACITY: usize = 48;
const TCP_BUFFER_LEN: usize = 1024;
const RX_BUFFER_LEN: usize = 1024;

/// Wi-Fi credentials source.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
}

impl WifiConfig {
    pub const fn new(ssid: &'static str, password: &'static str) -> Self {
        Self { ssid, password }
    }
}

/// Adafruit IO account the feeds live under.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AioConfig {
    pub username: &'static str,
    pub key: &'static str,
}

impl AioConfig {
    pub const fn new(username: &'static str, key: &'static str) -> Self {
        Self { username, key }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum UplinkError {
    WifiStart,
    Associate,
    DhcpTimeout,
    NotConnected,
    /// URL or body did not fit its buffer.
    Format,
    Request,
    /// Server answered outside of 2xx.
    Status(u16),
}

/// Station-mode Wi-Fi link that posts feed values over HTTP.
pub struct WifiUplink<'d> {
    controller: WifiController<'d>,
    stack: Stack<'d>,
    aio: AioConfig,
    dhcp_timeout_secs: u64,
}

impl<'d> WifiUplink<'d> {
    /// `controller` must already carry the client configuration.
    pub fn new(controller: WifiController<'d>, stack: Stack<'d>, aio: AioConfig) -> Self {
        Self {
            controller,
            stack,
            aio,
            dhcp_timeout_secs: DEFAULT_DHCP_TIMEOUT_SECS,
        }
    }

    pub fn with_dhcp_timeout_secs(mut self, secs: u64) -> Self {
        self.dhcp_timeout_secs = secs;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.stack.is_link_up()
            && self.stack.config_v4().is_some()
            && matches!(self.controller.is_connected(), Ok(true))
    }

    fn feed_url(&self, feed_key: &str) -> Result<String<URL_CAPACITY>, UplinkError> {
        let mut url = String::new();
        write!(
            url,
            "{}/{}/feeds/{}/data",
            AIO_BASE_URL, self.aio.username, feed_key
        )
        .map_err(|_| UplinkError::Format)?;
        Ok(url)
    }
}

impl Uplink for WifiUplink<'_> {
    type Error = UplinkError;

    async fn connect(&mut self) -> Result<(), Self::Error> {
        if self.is_connected() {
            return Ok(());
        }

        if !self.controller.is_started().unwrap_or(false) {
            if let Err(err) = self.controller.start_async().await {
                warn!("wifi start failed: {:?}", err);
                return Err(UplinkError::WifiStart);
            }
        }

        if let Err(err) = self.controller.connect_async().await {
            warn!("wifi connect failed: {:?}", err);
            let _ = self.controller.disconnect_async().await;
            return Err(UplinkError::Associate);
        }

        match self
            .stack
            .wait_config_up()
            .with_timeout(Duration::from_secs(self.dhcp_timeout_secs))
            .await
        {
            Ok(()) => {
                info!(
                    "wifi connected and dhcp ready: {:?}",
                    self.stack.config_v4().map(|config| config.address)
                );
                Ok(())
            }
            Err(_) => {
                warn!("dhcp timeout after {}s", self.dhcp_timeout_secs);
                let _ = self.controller.disconnect_async().await;
                Err(UplinkError::DhcpTimeout)
            }
        }
    }

    async fn push(&mut self, feed_key: &str, value: f32, precision: u8) -> Result<(), Self::Error> {
        if !self.is_connected() {
            return Err(UplinkError::NotConnected);
        }

        let formatted = format_value(value, precision).ok_or(UplinkError::Format)?;
        let url = self.feed_url(feed_key)?;
        let mut body: String<BODY_CAPACITY> = String::new();
        write!(body, "{{\"value\":\"{}\"}}", formatted).map_err(|_| UplinkError::Format)?;

        let client_state = TcpClientState::<1, TCP_BUFFER_LEN, TCP_BUFFER_LEN>::new();
        let tcp_client = TcpClient::new(self.stack, &client_state);
        let dns_client = DnsSocket::new(self.stack);
        let mut http_client = HttpClient::new(&tcp_client, &dns_client);
        let mut rx_buffer = [0u8; RX_BUFFER_LEN];

        let headers = [
            ("Content-Type", "application/json"),
            ("X-AIO-Key", self.aio.key),
        ];
        let request = http_client
            .request(Method::POST, &url)
            .await
            .map_err(|err| {
                warn!("feed {} request failed: {:?}", feed_key, err);
                UplinkError::Request
            })?;
        let mut request = request.headers(&headers).body(body.as_bytes());
        let response = request.send(&mut rx_buffer).await.map_err(|err| {
            warn!("feed {} send failed: {:?}", feed_key, err);
            UplinkError::Request
        })?;

        let status = response.status.0;
        if (200..300).contains(&status) {
            debug!("feed {} <- {} (status {})", feed_key, formatted, status);
            Ok(())
        } else {
            warn!("feed {} rejected with status {}", feed_key, status);
            Err(UplinkError::Status(status))
        }
    }
}
