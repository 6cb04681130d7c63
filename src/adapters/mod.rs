// Adapters layer: concrete implementations of the domain ports (serial port, keyboard, result log, clock).

pub mod clock;
pub mod keyboard;
pub mod record_log;
pub mod serial;
