use std::time::Instant;

use crossterm::event::KeyCode;
use ratatui::widgets::ListState;

use crate::controls::{Controls, Step};
use crate::status::{BrightnessStatus, NightLightStatus, VibranceStatus};

/// Longest direct brightness entry accepted by the prompt.
const MAX_ENTRY_LEN: usize = 16;

//Typing digits into the brightness prompt must not trigger the normal bindings
#[derive(Debug, PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    Brightness,
    NightLight,
    Vibrance,
}

impl Item {
    pub const ALL: [Item; 3] = [Item::Brightness, Item::NightLight, Item::Vibrance];

    pub fn label(self) -> &'static str {
        match self {
            Item::Brightness => "Brightness",
            Item::NightLight => "Night Light",
            Item::Vibrance => "Vibrance",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Item::Brightness => "brightness",
            Item::NightLight => "night light",
            Item::Vibrance => "vibrance",
        }
    }
}

/// What the event loop should do after a key was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum After {
    Redraw,
    /// Drop queued key presses before redrawing.
    FlushInput,
}

pub struct App<'a> {
    controls: Controls<'a>,
    pub items: [Item; 3],
    pub state: ListState,
    pub should_quit: bool,
    pub message: String,
    pub input: String,
    pub input_mode: InputMode,
    pub entry_max: u32,
    last_lr: Option<Instant>,
    pub brightness: BrightnessStatus,
    pub sunset: NightLightStatus,
    pub vibrance: VibranceStatus,
}

impl<'a> App<'a> {
    /// Builds the view from a full status read.
    pub fn new(controls: Controls<'a>) -> Self {
        let mut state = ListState::default();
        state.select(Some(0));
        let mut app = Self {
            controls,
            items: Item::ALL,
            state,
            should_quit: false,
            message: String::new(),
            input: String::new(),
            input_mode: InputMode::Normal,
            entry_max: 0,
            last_lr: None,
            brightness: BrightnessStatus::default(),
            sunset: NightLightStatus::default(),
            vibrance: VibranceStatus::default(),
        };
        app.refresh();
        app
    }

    pub fn refresh(&mut self) {
        self.brightness = self.controls.brightness_status();
        self.sunset = self.controls.sunset_status();
        self.vibrance = self.controls.vibrance_status();
    }

    pub fn selected_item(&self) -> Option<Item> {
        self.state.selected().and_then(|i| self.items.get(i).copied())
    }

    pub fn value_of(&self, item: Item) -> String {
        match item {
            Item::Brightness => self.brightness.to_string(),
            Item::NightLight => self.sunset.to_string(),
            Item::Vibrance => self.vibrance.to_string(),
        }
    }

    pub fn next(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    /// Handles one key press received at `now`.
    pub fn handle_key(&mut self, code: KeyCode, now: Instant) -> After {
        self.message.clear();
        match self.input_mode {
            InputMode::Normal => self.handle_normal(code, now),
            InputMode::Editing => self.handle_editing(code),
        }
    }

    fn handle_normal(&mut self, code: KeyCode, now: Instant) -> After {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                After::Redraw
            }
            KeyCode::Up => {
                self.previous();
                After::Redraw
            }
            KeyCode::Down => {
                self.next();
                After::Redraw
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.refresh();
                After::FlushInput
            }
            KeyCode::Left | KeyCode::Right => {
                if let Some(last) = self.last_lr {
                    if now.saturating_duration_since(last) < self.controls.settings().lr_guard {
                        tracing::trace!("directional key inside repeat guard, dropped");
                        return After::FlushInput;
                    }
                }
                self.last_lr = Some(now);
                let up = code == KeyCode::Right;
                self.adjust(up);
                After::FlushInput
            }
            KeyCode::Enter => {
                self.confirm();
                After::FlushInput
            }
            _ => After::Redraw,
        }
    }

    fn adjust(&mut self, up: bool) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let step = if up { Step::Up } else { Step::Down };
        let res = match item {
            Item::Brightness => {
                let delta = i64::from(self.controls.settings().brightness_step);
                let delta = if up { delta } else { -delta };
                self.controls.adjust_brightness(&mut self.brightness, delta)
            }
            Item::NightLight => {
                let res = self.controls.sunset(step);
                self.sunset = self.controls.sunset_status();
                res
            }
            Item::Vibrance => {
                let res = self.controls.vibrance(step);
                self.vibrance = self.controls.vibrance_status();
                res
            }
        };
        self.report(item, res);
    }

    fn confirm(&mut self) {
        let Some(item) = self.selected_item() else {
            self.message = "nothing to toggle/edit here".to_string();
            return;
        };
        let res = match item {
            Item::Brightness => self
                .controls
                .ensure_brightness(&mut self.brightness)
                .map(|(cur, max)| {
                    self.entry_max = max;
                    self.input = cur.to_string();
                    self.input_mode = InputMode::Editing;
                }),
            Item::NightLight => {
                let res = self.controls.sunset(Step::Toggle);
                self.sunset = self.controls.sunset_status();
                res
            }
            Item::Vibrance => {
                let res = self.controls.vibrance(Step::Toggle);
                self.vibrance = self.controls.vibrance_status();
                res
            }
        };
        self.report(item, res);
    }

    fn handle_editing(&mut self, code: KeyCode) -> After {
        match code {
            KeyCode::Enter => {
                let input = std::mem::take(&mut self.input);
                self.input_mode = InputMode::Normal;
                let res = self
                    .controls
                    .enter_brightness(&mut self.brightness, &input)
                    .map(|_| ());
                self.report(Item::Brightness, res);
                After::FlushInput
            }
            KeyCode::Esc => {
                self.input.clear();
                self.input_mode = InputMode::Normal;
                After::Redraw
            }
            KeyCode::Backspace => {
                self.input.pop();
                After::Redraw
            }
            KeyCode::Char(c) => {
                if self.input.chars().count() < MAX_ENTRY_LEN {
                    self.input.push(c);
                }
                After::Redraw
            }
            _ => After::Redraw,
        }
    }

    fn report(&mut self, item: Item, res: anyhow::Result<()>) {
        if let Err(e) = res {
            tracing::warn!(item = item.tag(), error = %e, "action failed");
            self.message = format!("{}: {e}", item.tag());
        }
    }
}
