//! Dispatch simulation and investment appraisal for battery energy storage.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cash_flow;
pub mod cli;
pub mod demand_charge;
pub mod dispatch;
pub mod finance;
pub mod input;
pub mod load_analysis;
pub mod load_profile;
pub mod log;
pub mod output;
pub mod scenario;
pub mod settings;
pub mod simulation;
pub mod storage;
pub mod tariff;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory where program configuration files are stored.
///
/// Falls back to the current directory if the platform's config directory cannot be determined.
pub fn get_config_dir() -> PathBuf {
    let Some(mut dir) = dirs::config_dir() else {
        return PathBuf::from(".");
    };
    dir.push("bess-appraise");

    dir
}
