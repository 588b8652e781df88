//! Status snapshots of the three display subsystems and how they are read.
//!
//! Brightness and night light come from their helpers' `status` output
//! (`key=value` lines); vibrance is read straight from the shader file and the
//! Hyprland config.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::config::Settings;
use crate::process::Runner;

pub const NA: &str = "N/A";

/// Directive in `hyprland.conf` that selects the screen shader.
const SHADER_DIRECTIVE: &str = "screen_shader";
/// Any `screen_shader` path ending in this is taken to be the vibrance shader.
const VIBRANCE_SHADER_SUFFIX: &str = "/shaders/vibrance";

/// A flag that an external source may leave undetermined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriState {
    True,
    False,
    #[default]
    Unknown,
}

impl TriState {
    fn parse(raw: &str) -> Self {
        match raw {
            "true" => TriState::True,
            "false" => TriState::False,
            _ => TriState::Unknown,
        }
    }
}

/// Splits `text` into `key=value` pairs. Lines without `=` are skipped, the
/// last duplicate key wins.
pub fn parse_kv(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

// --- Brightness ---

/// Values are kept as the helper printed them; they are parsed only when an
/// adjustment needs numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrightnessStatus {
    pub conn: String,
    pub cur: String,
    pub max: String,
}

impl Default for BrightnessStatus {
    fn default() -> Self {
        Self {
            conn: NA.to_string(),
            cur: NA.to_string(),
            max: NA.to_string(),
        }
    }
}

impl BrightnessStatus {
    pub fn from_kv(kv: &HashMap<String, String>) -> Self {
        let field = |key: &str| kv.get(key).cloned().unwrap_or_else(|| NA.to_string());
        Self {
            conn: field("conn"),
            cur: field("cur"),
            max: field("max"),
        }
    }

    /// `(cur, max)` when the snapshot is trustworthy enough to adjust from.
    pub fn usable(&self) -> Option<(i64, u32)> {
        let cur = self.cur.parse::<i64>().ok()?;
        let max = self.max.parse::<u32>().ok()?;
        (max > 0 && self.conn != NA).then_some((cur, max))
    }
}

impl fmt::Display for BrightnessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.conn, self.cur, self.max)
    }
}

// --- Night light ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NightLightStatus {
    pub temp: String,
    pub identity: TriState,
    pub enabled: bool,
}

impl Default for NightLightStatus {
    fn default() -> Self {
        Self {
            temp: NA.to_string(),
            identity: TriState::Unknown,
            enabled: false,
        }
    }
}

impl NightLightStatus {
    pub fn from_kv(kv: &HashMap<String, String>) -> Self {
        Self {
            temp: kv.get("temp").cloned().unwrap_or_else(|| NA.to_string()),
            identity: kv.get("identity").map_or(TriState::Unknown, |v| TriState::parse(v)),
            enabled: kv.get("enabled").is_some_and(|v| v == "1"),
        }
    }

    /// An identity transform means the filter is off; only when that is
    /// unknown does the `enabled` flag decide.
    pub fn is_on(&self) -> bool {
        match self.identity {
            TriState::True => false,
            TriState::False => true,
            TriState::Unknown => self.enabled,
        }
    }
}

impl fmt::Display for NightLightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let onoff = if self.is_on() { "on" } else { "off" };
        write!(f, "{} ({onoff})", self.temp)
    }
}

// --- Vibrance ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VibranceStatus {
    pub value: String,
    pub active: TriState,
}

impl Default for VibranceStatus {
    fn default() -> Self {
        Self {
            value: NA.to_string(),
            active: TriState::Unknown,
        }
    }
}

impl fmt::Display for VibranceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.active {
            TriState::True => "on",
            TriState::False => "off",
            TriState::Unknown => "unknown",
        };
        write!(f, "{} ({state})", self.value)
    }
}

/// Finds `#define VIBRANCE <x>` in shader source; `0.00` when absent.
pub fn parse_vibrance_value(text: &str) -> String {
    for line in text.lines() {
        let s = line.trim();
        if !(s.starts_with("#define") && s.contains("VIBRANCE")) {
            continue;
        }
        let parts: Vec<&str> = s.split_whitespace().collect();
        if parts.len() >= 3 && parts[1] == "VIBRANCE" {
            return match parts[2].parse::<f64>() {
                Ok(v) => format!("{v:.2}"),
                Err(_) => parts[2].to_string(),
            };
        }
    }
    "0.00".to_string()
}

/// Whether any active `screen_shader = ...` line points at the vibrance shader.
pub fn parse_shader_active(text: &str) -> bool {
    text.lines()
        .map(|raw| raw.trim_end_matches('\r').trim_start())
        .filter(|t| !t.starts_with('#') && t.starts_with(SHADER_DIRECTIVE))
        .filter_map(|t| t.split_once('=').map(|(_, rhs)| rhs))
        .any(|rhs| {
            let rhs = rhs.split('#').next().unwrap_or("");
            let compact: String = rhs.chars().filter(|c| !c.is_whitespace()).collect();
            compact.ends_with(VIBRANCE_SHADER_SUFFIX)
        })
}

fn read_lossy(path: &Path) -> Option<String> {
    if !path.is_file() {
        return None;
    }
    fs::read(path)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

pub fn vibrance_value(shader: &Path) -> String {
    read_lossy(shader).map_or_else(|| NA.to_string(), |text| parse_vibrance_value(&text))
}

pub fn vibrance_active(hyprland_conf: &Path) -> TriState {
    match read_lossy(hyprland_conf) {
        Some(text) if parse_shader_active(&text) => TriState::True,
        Some(_) => TriState::False,
        None => TriState::Unknown,
    }
}

// --- Queries against the helpers ---

pub fn brightness_status(settings: &Settings, runner: &Runner) -> BrightnessStatus {
    let out = runner.run(&settings.brightness_script, &["status"]);
    if !out.success() || out.stdout.is_empty() {
        return BrightnessStatus::default();
    }
    BrightnessStatus::from_kv(&parse_kv(&out.stdout))
}

pub fn sunset_status(settings: &Settings, runner: &Runner) -> NightLightStatus {
    let out = runner.run(&settings.sunset_script, &["status"]);
    if !out.success() || out.stdout.is_empty() {
        return NightLightStatus::default();
    }
    NightLightStatus::from_kv(&parse_kv(&out.stdout))
}

pub fn vibrance_status(settings: &Settings) -> VibranceStatus {
    VibranceStatus {
        value: vibrance_value(&settings.vibrance_shader),
        active: vibrance_active(&settings.hyprland_conf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn kv_skips_lines_without_equals_and_keeps_last_duplicate() {
        let kv = parse_kv("conn = DP-1\nnoise line\ncur=10\ncur=20\nurl=a=b\n");
        assert_eq!(kv.len(), 3);
        assert_eq!(kv["conn"], "DP-1");
        assert_eq!(kv["cur"], "20");
        assert_eq!(kv["url"], "a=b");
        assert!(!kv.contains_key("noise line"));
    }

    proptest! {
        #[test]
        fn kv_is_order_independent(
            pairs in proptest::collection::hash_map("[a-z]{1,6}", "[a-z0-9]{0,6}", 0..8)
        ) {
            let mut lines: Vec<String> = pairs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            let forward = parse_kv(&lines.join("\n"));
            lines.reverse();
            let backward = parse_kv(&lines.join("\n"));
            prop_assert_eq!(&forward, &backward);
            prop_assert_eq!(forward.len(), pairs.len());
        }

        #[test]
        fn kv_never_yields_keys_from_plain_lines(line in "[a-z ]{1,20}") {
            prop_assert!(parse_kv(&line).is_empty());
        }
    }

    #[test]
    fn brightness_parses_and_formats() {
        let st = BrightnessStatus::from_kv(&parse_kv("conn=DP-2\ncur=40\nmax=100"));
        assert_eq!(st.usable(), Some((40, 100)));
        assert_eq!(st.to_string(), "DP-2 40/100");

        let fallback = BrightnessStatus::default();
        assert_eq!(fallback.to_string(), "N/A N/A/N/A");
        assert_eq!(fallback.usable(), None);
    }

    #[test]
    fn brightness_shows_helper_text_verbatim() {
        let st = BrightnessStatus::from_kv(&parse_kv("conn=DP-1\ncur=-1\nmax=abc"));
        assert_eq!(st.to_string(), "DP-1 -1/abc");
        assert_eq!(st.usable(), None);

        let negative = BrightnessStatus::from_kv(&parse_kv("conn=DP-1\ncur=-1\nmax=100"));
        assert_eq!(negative.usable(), Some((-1, 100)));
    }

    #[test]
    fn brightness_needs_connector_and_positive_max() {
        let no_conn = BrightnessStatus::from_kv(&parse_kv("cur=40\nmax=100"));
        assert_eq!(no_conn.usable(), None);
        let zero_max = BrightnessStatus::from_kv(&parse_kv("conn=DP-1\ncur=0\nmax=0"));
        assert_eq!(zero_max.usable(), None);
    }

    #[test]
    fn identity_overrides_enabled_flag() {
        let st = |text: &str| NightLightStatus::from_kv(&parse_kv(text));
        assert_eq!(st("temp=4500\nidentity=true\nenabled=1").to_string(), "4500 (off)");
        assert_eq!(st("temp=4500\nidentity=false\nenabled=0").to_string(), "4500 (on)");
        assert_eq!(st("temp=4500\nidentity=maybe\nenabled=1").to_string(), "4500 (on)");
        assert_eq!(NightLightStatus::default().to_string(), "N/A (off)");
    }

    #[test]
    fn vibrance_value_from_define() {
        assert_eq!(parse_vibrance_value("// shader\n#define VIBRANCE 0.5\n"), "0.50");
        assert_eq!(parse_vibrance_value("  #define VIBRANCE   1.257"), "1.26");
        assert_eq!(parse_vibrance_value("#define VIBRANCE strong"), "strong");
        assert_eq!(parse_vibrance_value("#define VIBRANCE_MAX 2.0\nvoid main() {}"), "0.00");
        assert_eq!(parse_vibrance_value(""), "0.00");
    }

    #[test]
    fn vibrance_value_missing_file_is_na() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(vibrance_value(&dir.path().join("vibrance")), "N/A");

        let shader = dir.path().join("vibrance.glsl");
        fs::write(&shader, "#define VIBRANCE 0.35\n").unwrap();
        assert_eq!(vibrance_value(&shader), "0.35");
    }

    #[test]
    fn shader_active_detection() {
        assert!(parse_shader_active(
            "screen_shader = ~/.config/hypr/shaders/vibrance # comment\n"
        ));
        assert!(parse_shader_active("decoration {\n  screen_shader=/x/shaders/vib rance\r\n}"));
        assert!(!parse_shader_active("screen_shader = other/path\n"));
        assert!(!parse_shader_active("# screen_shader = ~/.config/hypr/shaders/vibrance\n"));
        assert!(!parse_shader_active("screen_shader ~/.config/hypr/shaders/vibrance\n"));
        assert!(!parse_shader_active("general {\n}\n"));
    }

    #[test]
    fn shader_active_tri_state_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("hyprland.conf");
        assert_eq!(vibrance_active(&conf), TriState::Unknown);

        fs::write(&conf, "screen_shader = ~/.config/hypr/shaders/vibrance # on\n").unwrap();
        assert_eq!(vibrance_active(&conf), TriState::True);

        fs::write(&conf, "screen_shader = other/path\n").unwrap();
        assert_eq!(vibrance_active(&conf), TriState::False);
    }

    #[test]
    fn vibrance_formats_all_three_states() {
        let mut st = VibranceStatus {
            value: "0.50".into(),
            active: TriState::True,
        };
        assert_eq!(st.to_string(), "0.50 (on)");
        st.active = TriState::False;
        assert_eq!(st.to_string(), "0.50 (off)");
        st.active = TriState::Unknown;
        assert_eq!(st.to_string(), "0.50 (unknown)");
    }
}
