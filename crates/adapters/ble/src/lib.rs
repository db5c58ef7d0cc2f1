//! # stimlink-adapter-ble
//!
//! BLE adapter: implements the [`Transport`](stimlink_app::ports::Transport)
//! port on top of btleplug (BlueZ, CoreBluetooth or WinRT depending on the
//! host).
//!
//! ## How it works
//!
//! - Scans report every `DeviceDiscovered` / `DeviceUpdated` event of the
//!   central as a scan result, with the local name and RSSI the stack holds.
//! - Connecting subscribes to the central's event stream and watches for the
//!   `DeviceDisconnected` event of that peripheral.
//! - Notifications of the subscribed characteristic are forwarded as raw
//!   byte vectors; decoding happens in the app layer.
//! - Writes always use write-with-response.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `stimlink-app` and `stimlink-domain`.

mod advertisement;
mod config;
mod error;
mod transport;

pub use config::BleConfig;
pub use error::BleError;
pub use transport::BtleplugTransport;
