//! This crate exposes GPIO interface of the BCM2835 SoC, as found on the first [Raspberry Pi](https://www.raspberrypi.com/) boards,
//! for programmatic use in Rust.
//!
//! Instead of going through the kernel for every pin change, the GPIO register block is memory-mapped into the process
//! once (through `/dev/mem` as root, `/dev/gpiomem` otherwise) and pins are driven by writing registers directly.
//! Setting, clearing and reading a pin costs a single memory access.
//!
//! The mapping is process-wide and created lazily on first use by `ensure_mapped` or `open_pin`. It is never unmapped.
//!
//! Pins returned by `open_pin` implement relevant [`embedded_hal`](https://crates.io/crates/embedded-hal)
//! abstractions so this crate can be used with driver implementations using `embedded_hal` generic traits.
//!
//! ```no_run
//! use bcm2835_mmap_gpio::{ensure_mapped, Function, GpioPin, PinNumber, PullDirection};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gpio = ensure_mapped();
//! let button = PinNumber::new(17)?;
//!
//! gpio.function_select(button, Function::Input);
//! gpio.configure_pull(button, PullDirection::PullUp);
//! println!("button pressed: {}", !gpio.get(button));
//! # Ok(())
//! # }
//! ```
//!
//! Pin numbers are BCM GPIO numbers (`0..=53`), not header positions. `HeaderPin` translates the latter.

use thiserror::Error;

mod device;
mod pin_map;

pub use device::error::DeviceError;
pub use device::error::PinError;
pub use device::{
    ensure_mapped, install, try_ensure_mapped, Device, DeviceCell, DeviceConfig, Function,
    GpioPin, Pin, PullDirection, StdDelay, PULL_SETTLE_US,
};
pub use pin_map::{HeaderPin, PinNumber, PIN_COUNT};

/// Main error type for this crate.
///
/// For more details, see `PinError` and `DeviceError` enums documentation.
#[derive(Error, Debug)]
pub enum Bcm2835Error {
    #[error("error while operating on a pin")]
    PinError(#[source] device::error::PinError),
    #[error("error while operating on a device")]
    DeviceError(#[source] device::error::DeviceError),
}

pub type Bcm2835Result<T> = Result<T, Bcm2835Error>;

/// Opens a pin on the process-wide device, mapping it first if needed.
///
/// `inner` is the upstream pin implementation to extend, `()` if there is none. Configuring direction is left
/// to it, or to `Pin::function_select`.
///
/// Fails with `PinError::InvalidPin` for numbers outside of `0..=53`. A `DeviceError` means the GPIO block could
/// not be mapped, which no later call will fix: treat it as fatal.
pub fn open_pin<P>(number: u8, inner: P) -> Bcm2835Result<Pin<'static, P>> {
    let number = PinNumber::new(number).map_err(Bcm2835Error::PinError)?;
    let device = try_ensure_mapped()?;

    Ok(device.pin(number, inner))
}
