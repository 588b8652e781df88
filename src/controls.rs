//! Commands that change brightness, night light and vibrance.
//!
//! Brightness is updated in the local snapshot right after the helper call,
//! whether or not the helper succeeded; the next refresh corrects any drift.
//! Night light and vibrance are left entirely to their helpers and re-read.

use anyhow::{Result, anyhow};

use crate::config::Settings;
use crate::process::Runner;
use crate::status::{self, BrightnessStatus, NightLightStatus, VibranceStatus};

/// Verb understood by the night-light and vibrance helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Up,
    Down,
    Toggle,
}

impl Step {
    pub fn as_arg(self) -> &'static str {
        match self {
            Step::Up => "up",
            Step::Down => "down",
            Step::Toggle => "toggle",
        }
    }
}

/// Result of validating a direct brightness entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    Cancel,
    Invalid,
    Value(u32),
}

/// Digits only, clamped to `max`; empty input cancels.
pub fn parse_entry(input: &str, max: u32) -> Entry {
    let s = input.trim();
    if s.is_empty() {
        return Entry::Cancel;
    }
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return Entry::Invalid;
    }
    // Overflowing digit strings are still "more than max".
    let value = s.parse::<u64>().map_or(max, |v| v.min(u64::from(max)) as u32);
    Entry::Value(value)
}

pub fn clamp_target(cur: i64, step: i64, max: u32) -> u32 {
    cur.saturating_add(step).clamp(0, i64::from(max)) as u32
}

/// Talks to the three helpers on behalf of the view.
pub struct Controls<'a> {
    settings: &'a Settings,
    runner: Runner,
}

impl<'a> Controls<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self {
            settings,
            runner: Runner::new(settings.cmd_timeout),
        }
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    pub fn brightness_status(&self) -> BrightnessStatus {
        status::brightness_status(self.settings, &self.runner)
    }

    pub fn sunset_status(&self) -> NightLightStatus {
        status::sunset_status(self.settings, &self.runner)
    }

    pub fn vibrance_status(&self) -> VibranceStatus {
        status::vibrance_status(self.settings)
    }

    pub fn set_brightness(&self, target: u32) -> Result<()> {
        self.runner
            .call(&self.settings.brightness_script, &["set", &target.to_string()])
    }

    /// Returns `(cur, max)` from `bst`, re-reading it once from the helper
    /// if the cached snapshot is unusable.
    pub fn ensure_brightness(&self, bst: &mut BrightnessStatus) -> Result<(i64, u32)> {
        if let Some(pair) = bst.usable() {
            return Ok(pair);
        }
        tracing::debug!(?bst, "brightness snapshot unusable, refreshing");
        *bst = self.brightness_status();
        bst.usable().ok_or_else(|| anyhow!("bad brightness status"))
    }

    /// Moves brightness by `step`, clamped to `0..=max`.
    pub fn adjust_brightness(&self, bst: &mut BrightnessStatus, step: i64) -> Result<()> {
        let (cur, max) = self.ensure_brightness(bst)?;
        let target = clamp_target(cur, step, max);
        let res = self.set_brightness(target);
        bst.cur = target.to_string();
        tracing::debug!(target, ok = res.is_ok(), "brightness updated optimistically");
        res
    }

    /// Applies a direct entry. `Ok(false)` means the entry was cancelled.
    pub fn enter_brightness(&self, bst: &mut BrightnessStatus, input: &str) -> Result<bool> {
        let (_, max) = self.ensure_brightness(bst)?;
        let target = match parse_entry(input, max) {
            Entry::Cancel => return Ok(false),
            Entry::Invalid => return Err(anyhow!("numbers only")),
            Entry::Value(v) => v,
        };
        let res = self.set_brightness(target);
        bst.cur = target.to_string();
        tracing::debug!(target, ok = res.is_ok(), "brightness entered optimistically");
        res.map(|()| true)
    }

    pub fn sunset(&self, step: Step) -> Result<()> {
        self.runner.call(&self.settings.sunset_script, &[step.as_arg()])
    }

    pub fn vibrance(&self, step: Step) -> Result<()> {
        self.runner.call(&self.settings.vibrance_script, &[step.as_arg()])
    }
}
