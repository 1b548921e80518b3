//! Battery charge from `pmset -g batt`.
//!
//! ```text
//! $ /usr/bin/pmset -g batt
//! Now drawing from 'Battery Power'
//!  -InternalBattery-0 (id=4653155)        100%; discharging; 20:00 remaining present: true
//! ```

use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

use super::BatteryReader;

const PMSET: &str = "/usr/bin/pmset";

#[derive(Debug, Error)]
pub enum BatteryError {
    #[error("failed to run pmset: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("pmset exited with {0}")]
    Exit(std::process::ExitStatus),

    #[error("no percentage in pmset output")]
    NoPercentage,

    #[error("implausible charge {0}%")]
    OutOfRange(String),

    #[error("invalid percentage pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone)]
pub struct Pmset {
    program: PathBuf,
    percent: Regex,
}

impl Pmset {
    pub fn new() -> Result<Self, BatteryError> {
        Self::with_program(PMSET)
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Result<Self, BatteryError> {
        Ok(Self {
            program: program.into(),
            percent: Regex::new(r"(\d+)%")?,
        })
    }

    pub fn parse_percentage(&self, output: &str) -> Result<u8, BatteryError> {
        let digits = self
            .percent
            .captures(output)
            .and_then(|caps| caps.get(1))
            .ok_or(BatteryError::NoPercentage)?
            .as_str();
        digits
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| BatteryError::OutOfRange(digits.to_string()))
    }
}

#[async_trait]
impl BatteryReader for Pmset {
    async fn read(&self) -> Result<u8, BatteryError> {
        let output = Command::new(&self.program)
            .args(["-g", "batt"])
            .kill_on_drop(true)
            .output()
            .await?;
        if !output.status.success() {
            return Err(BatteryError::Exit(output.status));
        }
        self.parse_percentage(&String::from_utf8_lossy(&output.stdout))
    }
}
