#![no_std]

//! ESP32-S3 glue for the air-quality station: implements the `aq-core`
//! collaborator traits on the board's peripherals.

pub mod board;
pub mod bus;
pub mod network;
pub mod render;
pub mod sensors;
pub mod wake;

pub mod platform {
    pub mod display;
    pub mod pixels;
    pub mod sense;
    pub mod speaker;
}

pub mod storage {
    pub mod rtc_memory;
}
