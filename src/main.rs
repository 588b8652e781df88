//! Hypr Quick Settings (hypr-quicksettings)
//!
//! A small terminal panel for the display knobs of a Hyprland session:
//! DDC brightness, hyprsunset night light and the vibrance screen shader.
//! The actual work is done by helper scripts; this tool reads their status,
//! renders it and sends them `up`/`down`/`toggle`/`set` commands.
//!
//! Keys:
//!   Up/Down     select a row
//!   Left/Right  adjust the selected row
//!   Enter       toggle, or type an exact brightness
//!   r           re-read everything
//!   q / Esc     quit

mod app;
mod config;
mod controls;
mod logging;
mod process;
mod status;
mod ui;

use anyhow::Result;

use crate::app::App;
use crate::config::Settings;
use crate::controls::Controls;

fn main() -> Result<()> {
    // 1. Settings (env > dotfiles config > defaults)
    let settings = Settings::load()?;

    // 2. Logging is optional; the panel works without it
    match logging::log_dir() {
        Ok(dir) => {
            if let Err(e) = logging::init_logging(&dir, &settings.log_filter) {
                eprintln!("warning: logging disabled: {e:#}");
            }
        }
        Err(e) => eprintln!("warning: logging disabled: {e:#}"),
    }
    tracing::debug!(?settings, "settings resolved");

    // 3. All helpers must exist before we take over the terminal
    if let Some(path) = settings.missing_helper() {
        tracing::error!(path = %path.display(), "helper missing");
        println!("missing: {}", path.display());
        return Ok(());
    }

    // 4. Interactive loop
    let mut app = App::new(Controls::new(&settings));
    ui::run_tui(&mut app)?;
    tracing::info!("quit");
    Ok(())
}
