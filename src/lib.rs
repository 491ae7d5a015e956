pub mod cli;
pub mod config;
pub mod discovery;
pub mod pairing;
pub mod preflight;
pub mod questions;
pub mod wizard;

mod util;
