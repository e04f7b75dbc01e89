use super::Bcm2835Error;
use embedded_hal::blocking::delay::DelayUs;
use log::{debug, error};
use memmap::{MmapMut, MmapOptions};
use nix::fcntl::{open, OFlag};
use nix::sys::stat::Mode;
use std::convert::TryFrom;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

pub mod error;
mod memory;
mod pin;
mod registers;

use crate::{pin_map::PinNumber, Bcm2835Result};
use error::{DeviceError, PinError};
use memory::Registers;

pub use pin::{GpioPin, Pin};
pub use registers::{Function, PullDirection, StdDelay, PULL_SETTLE_US};

/// Where and how to map the GPIO register block.
///
/// `/dev/mem` exposes the whole physical address space, so the block lives at its physical address there.
/// `/dev/gpiomem` exposes only the GPIO block, starting at offset 0, and can be opened without root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    pub path: PathBuf,
    pub base_address: u64,
    pub block_size: usize,
}

impl DeviceConfig {
    /// Physical address of the GPIO block on the BCM2835.
    pub const GPIO_BASE_ADDR: u64 = 0x2020_0000;
    pub const BLOCK_SIZE: usize = 4096;

    pub fn dev_mem() -> Self {
        Self {
            path: PathBuf::from("/dev/mem"),
            base_address: Self::GPIO_BASE_ADDR,
            block_size: Self::BLOCK_SIZE,
        }
    }

    pub fn gpiomem() -> Self {
        Self {
            path: PathBuf::from("/dev/gpiomem"),
            base_address: 0,
            block_size: Self::BLOCK_SIZE,
        }
    }

    /// `/dev/mem` when running as root, `/dev/gpiomem` otherwise.
    pub fn for_current_user() -> Self {
        use nix::unistd::Uid;

        if Uid::current().is_root() {
            Self::dev_mem()
        } else {
            Self::gpiomem()
        }
    }

    pub fn with_path<T: Into<PathBuf>>(mut self, path: T) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_base_address(mut self, base_address: u64) -> Self {
        self.base_address = base_address;
        self
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::for_current_user()
    }
}

/// The mapped GPIO register block of a BCM2835.
///
/// This struct owns the memory mapping and the file handle it was made from. Register group views are carved
/// out of the mapping once, when the device is created; every pin operation goes straight to those views
/// without any system call.
///
/// Most programs never create a `Device` themselves and use the process-wide one returned by
/// `ensure_mapped` (or `open_pin`) instead.
///
/// # Concurrency
///
/// `set`, `clear` and `get` are safe to call from any number of threads: set and clear registers are
/// write-only and every pin owns its own bit.
///
/// `function_select` and `configure_pull` are **not** serialized by this crate. `function_select` does a
/// read-modify-write of a register shared by 10 pins, and every `configure_pull` call drives the single global
/// pull control register. Callers running either of them from more than one thread must guard all such calls
/// with one lock of their own.
#[derive(Debug)]
pub struct Device {
    registers: Registers,
    _map: MmapMut,
    _file_handle: Option<File>,
}

impl Device {
    /// Opens the memory device named by `config` and maps the GPIO block from it.
    ///
    /// Fails with `DeviceError::PermissionDenied` or `DeviceError::DeviceNotFound` when the device file can't
    /// be opened, and with `DeviceError::MemoryMapFailed` when it can't be mapped.
    pub fn open(config: &DeviceConfig) -> Bcm2835Result<Self> {
        use std::os::unix::io::FromRawFd;

        let mut open_flags = OFlag::empty();
        open_flags.insert(OFlag::O_RDWR);
        open_flags.insert(OFlag::O_SYNC);
        open_flags.insert(OFlag::O_CLOEXEC);

        let file_fd = open(config.path.as_path(), open_flags, Mode::empty()).map_err(|err| {
            Bcm2835Error::DeviceError(DeviceError::from_open(config.path.clone(), err))
        })?;

        // SAFETY: Validity of file_fd is checked by Nix and nothing else owns it.
        let handle = unsafe { File::from_raw_fd(file_fd) };

        debug!(
            "mapping {} bytes of {} at {:#x}",
            config.block_size,
            config.path.display(),
            config.base_address
        );

        Self::from_file(handle, config.base_address, config.block_size)
    }

    /// Maps the GPIO block from an already opened, read-write memory device handle.
    pub fn from_file(file: File, base_address: u64, block_size: usize) -> Bcm2835Result<Self> {
        use DeviceError::*;

        let mut map_opts = MmapOptions::new();
        map_opts.offset(base_address);
        map_opts.len(block_size);

        // SAFETY: File handle is valid and kept open for as long as the mapping lives.
        let map = unsafe {
            map_opts
                .map_mut(&file)
                .map_err(|err| Bcm2835Error::DeviceError(MemoryMapFailed(err)))?
        };

        Self::from_map(Some(file), map)
    }

    /// Creates a device backed by zeroed anonymous memory instead of hardware.
    ///
    /// Writes land in plain memory and nothing mirrors them into the level registers, which makes this useful for
    /// exercising code built on top of this crate on a development machine.
    pub fn simulated() -> Bcm2835Result<Self> {
        let map = MmapMut::map_anon(DeviceConfig::BLOCK_SIZE)
            .map_err(|err| Bcm2835Error::DeviceError(DeviceError::MemoryMapFailed(err)))?;

        Self::from_map(None, map)
    }

    fn from_map(file_handle: Option<File>, mut map: MmapMut) -> Bcm2835Result<Self> {
        // SAFETY: `map` is moved into the returned device next to the views and never accessed directly again.
        // Moving an `MmapMut` does not move the mapped memory.
        let registers =
            unsafe { Registers::from_block(&mut map[..]) }.map_err(Bcm2835Error::DeviceError)?;

        Ok(Self {
            registers,
            _map: map,
            _file_handle: file_handle,
        })
    }

    pub(crate) fn registers(&self) -> &Registers {
        &self.registers
    }

    /// Drives an output pin high.
    pub fn set(&self, pin: PinNumber) {
        self.registers.set_pin(pin);
    }

    /// Drives an output pin low.
    pub fn clear(&self, pin: PinNumber) {
        self.registers.clear_pin(pin);
    }

    /// Reads the current level of a pin.
    pub fn get(&self, pin: PinNumber) -> bool {
        self.registers.level(pin)
    }

    /// Selects the function of a pin. See the concurrency notes on `Device`.
    pub fn function_select(&self, pin: PinNumber, function: Function) {
        self.registers.function_select(pin, function);
    }

    /// Like `function_select`, with a raw 3-bit function code.
    ///
    /// Fails with `PinError::InvalidFunction` for codes above 7, without touching any register.
    pub fn function_select_code(&self, pin: PinNumber, code: u8) -> Bcm2835Result<()> {
        let function = Function::try_from(code)
            .map_err(|_| Bcm2835Error::PinError(PinError::InvalidFunction(code)))?;

        self.function_select(pin, function);
        Ok(())
    }

    pub fn function(&self, pin: PinNumber) -> Function {
        self.registers.function(pin)
    }

    /// Configures the pull resistor of a pin.
    ///
    /// Blocks for two settle delays of `PULL_SETTLE_US` microseconds each. The sequence cannot be interrupted
    /// halfway. See the concurrency notes on `Device`.
    pub fn configure_pull(&self, pin: PinNumber, direction: PullDirection) {
        self.configure_pull_with(pin, direction, &mut StdDelay);
    }

    /// Like `configure_pull`, waiting the settle delays with `delay`.
    pub fn configure_pull_with<D>(&self, pin: PinNumber, direction: PullDirection, delay: &mut D)
    where
        D: DelayUs<u32>,
    {
        self.registers.configure_pull(pin, direction, delay);
    }

    /// Like `configure_pull`, with a raw pull direction code.
    ///
    /// Fails with `PinError::InvalidPullDirection` for codes other than 0, 1 and 2, without touching any register.
    pub fn configure_pull_code(&self, pin: PinNumber, code: u8) -> Bcm2835Result<()> {
        let direction = PullDirection::try_from(code)
            .map_err(|_| Bcm2835Error::PinError(PinError::InvalidPullDirection(code)))?;

        self.configure_pull(pin, direction);
        Ok(())
    }

    /// Wraps an upstream pin implementation with the register fast path of this device.
    pub fn pin<P>(&self, number: PinNumber, inner: P) -> Pin<'_, P> {
        Pin::new(self, number, inner)
    }
}

/// Holds at most one `Device`, mapping it on first use.
///
/// Mapping is serialized: however many threads race on `get_or_map`, the map closure runs until it succeeds once,
/// and every caller gets the same device afterwards.
#[derive(Debug)]
pub struct DeviceCell {
    device: OnceLock<Device>,
    init: Mutex<()>,
}

impl DeviceCell {
    pub const fn new() -> Self {
        Self {
            device: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn get(&self) -> Option<&Device> {
        self.device.get()
    }

    /// Returns the held device, running `map` first if there is none yet.
    ///
    /// A failing `map` leaves the cell empty and its error is returned to this caller only.
    pub fn get_or_map<F>(&self, map: F) -> Bcm2835Result<&Device>
    where
        F: FnOnce() -> Bcm2835Result<Device>,
    {
        if let Some(device) = self.device.get() {
            return Ok(device);
        }

        let _guard = self
            .init
            .lock()
            .map_err(|_| Bcm2835Error::DeviceError(DeviceError::InitLockPoisoned))?;

        if let Some(device) = self.device.get() {
            return Ok(device);
        }

        let device = map()?;
        Ok(self.device.get_or_init(|| device))
    }

    /// Puts `device` into an empty cell.
    ///
    /// Gives the device back if the cell already holds one or a previous initialization panicked.
    pub fn install(&self, device: Device) -> Result<&Device, Device> {
        let _guard = match self.init.lock() {
            Ok(guard) => guard,
            Err(_) => return Err(device),
        };

        if self.device.get().is_some() {
            return Err(device);
        }

        Ok(self.device.get_or_init(|| device))
    }
}

impl Default for DeviceCell {
    fn default() -> Self {
        Self::new()
    }
}

static DEVICE: DeviceCell = DeviceCell::new();

/// Returns the process-wide device, mapping it with `DeviceConfig::for_current_user` on first call.
///
/// The mapping is created at most once and lives until the process exits.
pub fn try_ensure_mapped() -> Bcm2835Result<&'static Device> {
    DEVICE.get_or_map(|| Device::open(&DeviceConfig::for_current_user()))
}

/// Like `try_ensure_mapped`, treating a mapping failure as fatal.
///
/// # Panics
///
/// Panics with a diagnostic naming the cause (missing privileges, missing device, mmap failure) when the GPIO
/// block can't be mapped. No GPIO operation can run without it.
pub fn ensure_mapped() -> &'static Device {
    match try_ensure_mapped() {
        Ok(device) => device,
        Err(err) => {
            let report = error_report(&err);
            error!("unable to map GPIO registers: {}", report);
            panic!("unable to map GPIO registers: {}", report);
        }
    }
}

/// Installs `device` as the process-wide device, e.g. one opened with a custom `DeviceConfig`.
///
/// Must happen before the first `ensure_mapped` call. Gives the device back if one is already mapped.
pub fn install(device: Device) -> Result<&'static Device, Device> {
    DEVICE.install(device)
}

fn error_report(err: &dyn Error) -> String {
    let mut report = err.to_string();
    let mut source = err.source();

    while let Some(cause) = source {
        report.push_str(": ");
        report.push_str(&cause.to_string());
        source = cause.source();
    }

    report
}
