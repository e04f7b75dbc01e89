//! Reads a push button wired between GPIO4 (physical pin #7) and ground.
//!
//! The internal pull-up keeps the line high while the button is released, so no external resistor is needed.
//! Pass a device path (e.g. `/dev/mem`) as the first argument to override the default device.

use bcm2835_mmap_gpio::{
    ensure_mapped, install, Device, DeviceConfig, Function, PinNumber, PullDirection,
};
use std::env;
use std::error::Error;
use std::thread::sleep;
use std::time::Duration;

fn main() -> Result<(), Box<dyn Error>> {
    if let Some(path) = env::args().nth(1) {
        let config = DeviceConfig::for_current_user().with_path(path);
        if install(Device::open(&config)?).is_err() {
            return Err("GPIO block already mapped".into());
        }
    }

    let gpio = ensure_mapped();
    let button = PinNumber::new(4)?;

    gpio.function_select(button, Function::Input);
    gpio.configure_pull(button, PullDirection::PullUp);

    let mut pressed = false;
    loop {
        let now_pressed = !gpio.get(button);
        if now_pressed != pressed {
            println!("{}", if now_pressed { "pressed" } else { "released" });
            pressed = now_pressed;
        }
        sleep(Duration::from_millis(20));
    }
}
