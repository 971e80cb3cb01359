pub mod config;
pub mod main_lib;
pub mod ntp;

pub use main_lib::{cancel_on_ctrl_c, init_tracing, run_probe};
