//! Vendor drivers for network-attached PDUs.
//!
//! [`PduDispatcher`] maps a manufacturer identifier onto one of a closed set
//! of [`PduDriver`] implementations. Drivers are synchronous and perform
//! their own network I/O, so async callers should run them on a blocking
//! thread.

mod apc;
mod aten;
mod dispatcher;
mod dli;
mod driver;
mod errors;
mod manufacturer;
mod raritan;

pub use apc::ApcDriver;
pub use aten::AtenDriver;
pub use dispatcher::PduDispatcher;
pub use dli::DliDriver;
pub use driver::{InvalidOutlet, Outlet, PduDriver, Target};
pub use errors::{DispatchError, DriverError, PduOperation};
pub use manufacturer::{Manufacturer, ManufacturerParseError};
pub use raritan::{HttpsRpcTransport, RaritanDriver, RpcError, RpcTransport};

#[cfg(test)]
mod tests;
