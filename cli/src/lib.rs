// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rengo CLI - line-oriented chat front end for rengo games

pub mod commands;
pub mod config;
pub mod render;

pub use commands::{Bot, Command, Request};
pub use config::{load_config, Config};
