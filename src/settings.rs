use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::storage::{keys, Storage};

pub const DEFAULT_DATE_FORMAT: &str = "dd/mm/yyyy - HH:MM:ss";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingKey {
    SaveHistory,
    CursorLastPosition,
    ReturnKeyToggle,
    EnablePowerMode,
    PowerModeColor,
    PowerModeShake,
}

impl SettingKey {
    pub const ALL: [SettingKey; 6] = [
        SettingKey::SaveHistory,
        SettingKey::CursorLastPosition,
        SettingKey::ReturnKeyToggle,
        SettingKey::EnablePowerMode,
        SettingKey::PowerModeColor,
        SettingKey::PowerModeShake,
    ];

    /// Persisted field name, also used as the `data-setting` attribute.
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::SaveHistory => "saveHistory",
            SettingKey::CursorLastPosition => "cursorLastPosition",
            SettingKey::ReturnKeyToggle => "returnKeyToggle",
            SettingKey::EnablePowerMode => "enablePowerMode",
            SettingKey::PowerModeColor => "PowerModeColor",
            SettingKey::PowerModeShake => "PowerModeShake",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingKey::SaveHistory => "Save revision history",
            SettingKey::CursorLastPosition => "Restore cursor position",
            SettingKey::ReturnKeyToggle => "Toggle modes with modifier + Return",
            SettingKey::EnablePowerMode => "Power mode",
            SettingKey::PowerModeColor => "Colourful power mode",
            SettingKey::PowerModeShake => "Shake on power mode",
        }
    }

    /// Sub-flags only matter while their parent is on.
    pub fn parent(self) -> Option<SettingKey> {
        match self {
            SettingKey::PowerModeColor | SettingKey::PowerModeShake => {
                Some(SettingKey::EnablePowerMode)
            }
            _ => None,
        }
    }
}

/// Fixed-shape preference record. Serializes to exactly six keys.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    #[serde(rename = "saveHistory")]
    pub save_history: bool,
    #[serde(rename = "cursorLastPosition")]
    pub cursor_last_position: bool,
    #[serde(rename = "returnKeyToggle")]
    pub return_key_toggle: bool,
    #[serde(rename = "enablePowerMode")]
    pub enable_power_mode: bool,
    #[serde(rename = "PowerModeColor")]
    pub power_mode_color: bool,
    #[serde(rename = "PowerModeShake")]
    pub power_mode_shake: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            save_history: true,
            cursor_last_position: true,
            return_key_toggle: false,
            enable_power_mode: false,
            power_mode_color: false,
            power_mode_shake: false,
        }
    }
}

impl Settings {
    pub fn get(&self, key: SettingKey) -> bool {
        match key {
            SettingKey::SaveHistory => self.save_history,
            SettingKey::CursorLastPosition => self.cursor_last_position,
            SettingKey::ReturnKeyToggle => self.return_key_toggle,
            SettingKey::EnablePowerMode => self.enable_power_mode,
            SettingKey::PowerModeColor => self.power_mode_color,
            SettingKey::PowerModeShake => self.power_mode_shake,
        }
    }

    pub fn set(&mut self, key: SettingKey, value: bool) {
        let field = match key {
            SettingKey::SaveHistory => &mut self.save_history,
            SettingKey::CursorLastPosition => &mut self.cursor_last_position,
            SettingKey::ReturnKeyToggle => &mut self.return_key_toggle,
            SettingKey::EnablePowerMode => &mut self.enable_power_mode,
            SettingKey::PowerModeColor => &mut self.power_mode_color,
            SettingKey::PowerModeShake => &mut self.power_mode_shake,
        };
        *field = value;
    }

    /// `None` when the stored record is missing, unparseable, or not exactly
    /// the six known boolean fields.
    pub fn load(storage: &Storage) -> Option<Self> {
        let record = storage.get_json::<Map<String, Value>>(keys::SETTINGS)?;
        Self::from_record(&record)
    }

    fn from_record(record: &Map<String, Value>) -> Option<Self> {
        if record.len() != SettingKey::ALL.len() {
            log::debug!(
                "settings record has {} fields, expected {}",
                record.len(),
                SettingKey::ALL.len()
            );
            return None;
        }
        let mut settings = Self::default();
        for key in SettingKey::ALL {
            let value = record.get(key.as_str()).and_then(Value::as_bool)?;
            settings.set(key, value);
        }
        Some(settings)
    }

    pub fn persist(&self, storage: &mut Storage) {
        storage.set_json(keys::SETTINGS, self);
    }

    /// Loads (resetting to defaults if the stored shape is wrong), applies a
    /// single field and writes the whole record back.
    pub fn update(storage: &mut Storage, key: SettingKey, value: bool) -> Self {
        let mut settings = Self::load(storage).unwrap_or_else(|| {
            log::info!("initialising settings with defaults");
            Self::default()
        });
        settings.set(key, value);
        settings.persist(storage);
        settings
    }

    /// Makes sure a well-formed record is stored and returns it.
    pub fn ensure(storage: &mut Storage) -> Self {
        match Self::load(storage) {
            Some(settings) => settings,
            None => {
                let settings = Self::default();
                settings.persist(storage);
                settings
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PowerMode {
    pub colorful: bool,
    pub shake: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListenerChange {
    Attached,
    Detached,
    Unchanged,
}

/// Settings as the controller consults them, plus whether the power-mode
/// input listener is currently attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RuntimeFlags {
    pub save_history: bool,
    pub cursor_last_position: bool,
    pub return_key_toggle: bool,
    power_mode: PowerMode,
    power_listener: bool,
}

impl RuntimeFlags {
    pub fn apply(&mut self, settings: &Settings) -> ListenerChange {
        self.save_history = settings.save_history;
        self.cursor_last_position = settings.cursor_last_position;
        self.return_key_toggle = settings.return_key_toggle;
        self.power_mode = PowerMode {
            colorful: settings.power_mode_color,
            shake: settings.power_mode_shake,
        };

        match (settings.enable_power_mode, self.power_listener) {
            (true, false) => {
                self.power_listener = true;
                ListenerChange::Attached
            }
            (false, true) => {
                self.power_listener = false;
                ListenerChange::Detached
            }
            _ => ListenerChange::Unchanged,
        }
    }

    /// `Some` while the input listener is attached.
    pub fn power_mode(&self) -> Option<PowerMode> {
        self.power_listener.then_some(self.power_mode)
    }
}

pub fn date_format(storage: &Storage) -> String {
    storage
        .get(keys::DATE_FORMAT)
        .filter(|format| !format.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATE_FORMAT.to_string())
}

pub fn custom_css(storage: &Storage) -> String {
    storage.get(keys::CUSTOM_CSS).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_field_count(storage: &Storage) -> usize {
        storage
            .get_json::<Map<String, Value>>(keys::SETTINGS)
            .map(|record| record.len())
            .unwrap_or_default()
    }

    #[test]
    fn first_update_starts_from_defaults() {
        let mut storage = Storage::in_memory();
        let settings = Settings::update(&mut storage, SettingKey::ReturnKeyToggle, true);

        assert!(settings.return_key_toggle);
        assert!(settings.save_history);
        assert_eq!(stored_field_count(&storage), 6);
        assert_eq!(Settings::load(&storage), Some(settings));
    }

    #[test]
    fn wrong_shape_is_reset_before_updating() {
        let mut storage = Storage::in_memory();
        storage.set(
            keys::SETTINGS,
            r#"{"saveHistory":false,"cursorLastPosition":false,"extra":1}"#,
        );
        assert_eq!(Settings::load(&storage), None);

        let settings = Settings::update(&mut storage, SettingKey::EnablePowerMode, true);
        assert!(settings.save_history);
        assert!(settings.enable_power_mode);
        assert_eq!(stored_field_count(&storage), 6);
    }

    #[test]
    fn corrupt_json_is_reset_before_updating() {
        let mut storage = Storage::in_memory();
        storage.set(keys::SETTINGS, "{{{");
        Settings::update(&mut storage, SettingKey::SaveHistory, false);
        assert_eq!(stored_field_count(&storage), 6);
        assert_eq!(
            Settings::load(&storage).map(|s| s.save_history),
            Some(false)
        );
    }

    #[test]
    fn six_keys_with_unknown_names_are_rejected() {
        let mut storage = Storage::in_memory();
        storage.set(
            keys::SETTINGS,
            r#"{"a":true,"b":true,"c":true,"d":true,"e":true,"f":true}"#,
        );
        assert_eq!(Settings::load(&storage), None);
    }

    #[test]
    fn ensure_keeps_a_valid_record() {
        let mut storage = Storage::in_memory();
        Settings::update(&mut storage, SettingKey::CursorLastPosition, false);
        assert!(!Settings::ensure(&mut storage).cursor_last_position);
    }

    #[test]
    fn power_listener_attaches_only_on_transitions() {
        let mut flags = RuntimeFlags::default();
        let mut settings = Settings::default();

        assert_eq!(flags.apply(&settings), ListenerChange::Unchanged);
        assert_eq!(flags.power_mode(), None);

        settings.enable_power_mode = true;
        settings.power_mode_shake = true;
        assert_eq!(flags.apply(&settings), ListenerChange::Attached);
        assert_eq!(flags.apply(&settings), ListenerChange::Unchanged);
        assert_eq!(
            flags.power_mode(),
            Some(PowerMode {
                colorful: false,
                shake: true
            })
        );

        settings.enable_power_mode = false;
        assert_eq!(flags.apply(&settings), ListenerChange::Detached);
        assert_eq!(flags.power_mode(), None);
    }

    #[test]
    fn blank_date_format_falls_back_to_default() {
        let mut storage = Storage::in_memory();
        assert_eq!(date_format(&storage), DEFAULT_DATE_FORMAT);
        storage.set(keys::DATE_FORMAT, "  ");
        assert_eq!(date_format(&storage), DEFAULT_DATE_FORMAT);
        storage.set(keys::DATE_FORMAT, "HH:MM");
        assert_eq!(date_format(&storage), "HH:MM");
    }
}
