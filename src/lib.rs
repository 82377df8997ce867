#![cfg_attr(not(test), no_std)]

pub mod ble;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod protocol;
pub mod sensor;
pub mod tasks;
