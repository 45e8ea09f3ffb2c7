// src/keys.rs

//! Handset key codes, game actions and vendor keyboard layouts.
//!
//! Handset key codes follow the legacy toolkit numbering: digit keys use their
//! ASCII code, `*` and `#` likewise, and the navigation/soft keys are negative.
//! Some vendors shipped handsets whose physical codes differ from the standard
//! negative codes; selecting a [`KeyLayout`] re-derives the direction, fire and
//! soft-key bindings from that vendor's codes.

use crate::error::LcduiError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const KEY_POUND: i32 = 35;
pub const KEY_STAR: i32 = 42;
pub const KEY_NUM0: i32 = 48;
pub const KEY_NUM1: i32 = 49;
pub const KEY_NUM2: i32 = 50;
pub const KEY_NUM3: i32 = 51;
pub const KEY_NUM4: i32 = 52;
pub const KEY_NUM5: i32 = 53;
pub const KEY_NUM6: i32 = 54;
pub const KEY_NUM7: i32 = 55;
pub const KEY_NUM8: i32 = 56;
pub const KEY_NUM9: i32 = 57;

pub const KEY_UP: i32 = -1;
pub const KEY_DOWN: i32 = -2;
pub const KEY_LEFT: i32 = -3;
pub const KEY_RIGHT: i32 = -4;
pub const KEY_FIRE: i32 = -5;
pub const KEY_SOFT_LEFT: i32 = -6;
pub const KEY_SOFT_RIGHT: i32 = -7;
pub const KEY_CLEAR: i32 = -8;
pub const KEY_SEND: i32 = -10;
pub const KEY_END: i32 = -11;

pub const SIEMENS_KEY_UP: i32 = -59;
pub const SIEMENS_KEY_DOWN: i32 = -60;
pub const SIEMENS_KEY_LEFT: i32 = -61;
pub const SIEMENS_KEY_RIGHT: i32 = -62;
pub const SIEMENS_KEY_SOFT_LEFT: i32 = -1;
pub const SIEMENS_KEY_SOFT_RIGHT: i32 = -4;

pub const MOTOROLA_KEY_UP: i32 = -1;
pub const MOTOROLA_KEY_DOWN: i32 = -6;
pub const MOTOROLA_KEY_LEFT: i32 = -2;
pub const MOTOROLA_KEY_RIGHT: i32 = -5;
pub const MOTOROLA_KEY_FIRE: i32 = -20;
pub const MOTOROLA_KEY_SOFT_LEFT: i32 = -21;
pub const MOTOROLA_KEY_SOFT_RIGHT: i32 = -22;

/// Abstract directional/button semantic, independent of the physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum GameAction {
    Up = 1,
    Left = 2,
    Right = 5,
    Down = 6,
    Fire = 8,
    GameA = 9,
    GameB = 10,
    GameC = 11,
    GameD = 12,
}

impl GameAction {
    pub const ALL: [GameAction; 9] = [
        GameAction::Up,
        GameAction::Left,
        GameAction::Right,
        GameAction::Down,
        GameAction::Fire,
        GameAction::GameA,
        GameAction::GameB,
        GameAction::GameC,
        GameAction::GameD,
    ];

    /// Numeric value used by the legacy API.
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|action| action.code() == code)
    }
}

/// Vendor keyboard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLayout {
    #[default]
    Default,
    Siemens,
    Motorola,
}

#[derive(Debug, Clone)]
struct KeyTables {
    game_actions: HashMap<i32, Option<GameAction>>,
    key_codes: HashMap<GameAction, i32>,
    names: HashMap<i32, &'static str>,
}

impl KeyTables {
    fn standard() -> Self {
        let mut tables = KeyTables {
            game_actions: HashMap::new(),
            key_codes: HashMap::new(),
            names: HashMap::new(),
        };

        tables.map_key(KEY_NUM0, None, "0");
        tables.map_key(KEY_NUM1, None, "1");
        tables.map_key(KEY_NUM2, Some(GameAction::Up), "2");
        tables.map_key(KEY_NUM3, None, "3");
        tables.map_key(KEY_NUM4, Some(GameAction::Left), "4");
        tables.map_key(KEY_NUM5, Some(GameAction::Fire), "5");
        tables.map_key(KEY_NUM6, Some(GameAction::Right), "6");
        tables.map_key(KEY_NUM7, Some(GameAction::GameA), "7");
        tables.map_key(KEY_NUM8, Some(GameAction::Down), "8");
        tables.map_key(KEY_NUM9, Some(GameAction::GameB), "9");
        tables.map_key(KEY_STAR, Some(GameAction::GameC), "ASTERISK");
        tables.map_key(KEY_POUND, Some(GameAction::GameD), "POUND");
        tables.map_key(KEY_UP, Some(GameAction::Up), "UP");
        tables.map_key(KEY_DOWN, Some(GameAction::Down), "DOWN");
        tables.map_key(KEY_LEFT, Some(GameAction::Left), "LEFT");
        tables.map_key(KEY_RIGHT, Some(GameAction::Right), "RIGHT");
        tables.map_key(KEY_FIRE, Some(GameAction::Fire), "SELECT");
        tables.map_key(KEY_SOFT_LEFT, None, "SOFT1");
        tables.map_key(KEY_SOFT_RIGHT, None, "SOFT2");
        tables.map_key(KEY_CLEAR, None, "CLEAR");
        tables.map_key(KEY_SEND, None, "SEND");
        tables.map_key(KEY_END, None, "END");

        tables.map_action(GameAction::Up, KEY_UP);
        tables.map_action(GameAction::Left, KEY_LEFT);
        tables.map_action(GameAction::Right, KEY_RIGHT);
        tables.map_action(GameAction::Down, KEY_DOWN);
        tables.map_action(GameAction::Fire, KEY_FIRE);
        tables.map_action(GameAction::GameA, KEY_NUM7);
        tables.map_action(GameAction::GameB, KEY_NUM9);
        tables.map_action(GameAction::GameC, KEY_STAR);
        tables.map_action(GameAction::GameD, KEY_POUND);

        tables
    }

    fn map_key(&mut self, code: i32, action: Option<GameAction>, name: &'static str) {
        self.game_actions.insert(code, action);
        self.names.insert(code, name);
    }

    fn map_action(&mut self, action: GameAction, code: i32) {
        self.key_codes.insert(action, code);
    }
}

/// Standard tables, built once on first use.
static STANDARD_TABLES: Lazy<KeyTables> = Lazy::new(KeyTables::standard);

/// Bidirectional key code / game action / key name tables plus the active
/// vendor remap.
#[derive(Debug, Clone)]
pub struct KeyMap {
    layout: KeyLayout,
    tables: KeyTables,
    vendor_remap: HashMap<i32, i32>,
}

impl Default for KeyMap {
    fn default() -> Self {
        Self::with_layout(KeyLayout::Default)
    }
}

impl KeyMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: KeyLayout) -> Self {
        let mut map = KeyMap {
            layout: KeyLayout::Default,
            tables: STANDARD_TABLES.clone(),
            vendor_remap: HashMap::new(),
        };
        map.set_layout(layout);
        map
    }

    pub fn layout(&self) -> KeyLayout {
        self.layout
    }

    /// Selects a vendor layout.
    ///
    /// Tables are rebuilt from the standard set each time, so switching from
    /// one vendor to another never leaves stale bindings behind.
    pub fn set_layout(&mut self, layout: KeyLayout) {
        self.tables = STANDARD_TABLES.clone();
        self.vendor_remap.clear();
        self.layout = layout;

        match layout {
            KeyLayout::Default => {}
            KeyLayout::Siemens => {
                self.vendor_remap.insert(KEY_LEFT, SIEMENS_KEY_LEFT);
                self.vendor_remap.insert(KEY_RIGHT, SIEMENS_KEY_RIGHT);
                self.vendor_remap.insert(KEY_UP, SIEMENS_KEY_UP);
                self.vendor_remap.insert(KEY_DOWN, SIEMENS_KEY_DOWN);
                self.vendor_remap.insert(KEY_SOFT_LEFT, SIEMENS_KEY_SOFT_LEFT);
                self.vendor_remap.insert(KEY_SOFT_RIGHT, SIEMENS_KEY_SOFT_RIGHT);

                self.tables.map_action(GameAction::Left, SIEMENS_KEY_LEFT);
                self.tables.map_action(GameAction::Right, SIEMENS_KEY_RIGHT);
                self.tables.map_action(GameAction::Up, SIEMENS_KEY_UP);
                self.tables.map_action(GameAction::Down, SIEMENS_KEY_DOWN);

                // Soft keys reuse codes of the standard arrows, so they go last.
                self.tables.map_key(SIEMENS_KEY_UP, Some(GameAction::Up), "UP");
                self.tables.map_key(SIEMENS_KEY_DOWN, Some(GameAction::Down), "DOWN");
                self.tables.map_key(SIEMENS_KEY_LEFT, Some(GameAction::Left), "LEFT");
                self.tables.map_key(SIEMENS_KEY_RIGHT, Some(GameAction::Right), "RIGHT");
                self.tables.map_key(SIEMENS_KEY_SOFT_LEFT, None, "SOFT1");
                self.tables.map_key(SIEMENS_KEY_SOFT_RIGHT, None, "SOFT2");
            }
            KeyLayout::Motorola => {
                self.vendor_remap.insert(KEY_UP, MOTOROLA_KEY_UP);
                self.vendor_remap.insert(KEY_DOWN, MOTOROLA_KEY_DOWN);
                self.vendor_remap.insert(KEY_LEFT, MOTOROLA_KEY_LEFT);
                self.vendor_remap.insert(KEY_RIGHT, MOTOROLA_KEY_RIGHT);
                self.vendor_remap.insert(KEY_FIRE, MOTOROLA_KEY_FIRE);
                self.vendor_remap.insert(KEY_SOFT_LEFT, MOTOROLA_KEY_SOFT_LEFT);
                self.vendor_remap.insert(KEY_SOFT_RIGHT, MOTOROLA_KEY_SOFT_RIGHT);

                self.tables.map_action(GameAction::Left, MOTOROLA_KEY_LEFT);
                self.tables.map_action(GameAction::Right, MOTOROLA_KEY_RIGHT);
                self.tables.map_action(GameAction::Up, MOTOROLA_KEY_UP);
                self.tables.map_action(GameAction::Down, MOTOROLA_KEY_DOWN);
                self.tables.map_action(GameAction::Fire, MOTOROLA_KEY_FIRE);

                self.tables.map_key(MOTOROLA_KEY_UP, Some(GameAction::Up), "UP");
                self.tables.map_key(MOTOROLA_KEY_DOWN, Some(GameAction::Down), "DOWN");
                self.tables.map_key(MOTOROLA_KEY_LEFT, Some(GameAction::Left), "LEFT");
                self.tables.map_key(MOTOROLA_KEY_RIGHT, Some(GameAction::Right), "RIGHT");
                self.tables.map_key(MOTOROLA_KEY_FIRE, Some(GameAction::Fire), "SELECT");
                self.tables.map_key(MOTOROLA_KEY_SOFT_LEFT, None, "SOFT1");
                self.tables.map_key(MOTOROLA_KEY_SOFT_RIGHT, None, "SOFT2");
            }
        }

        log::debug!(
            "KeyMap: Layout {:?} selected ({} vendor remaps)",
            layout,
            self.vendor_remap.len()
        );
    }

    /// Applies the active vendor remap. Unmapped codes pass through.
    pub fn convert_key_code(&self, code: i32) -> i32 {
        self.vendor_remap.get(&code).copied().unwrap_or(code)
    }

    /// Game action bound to `code`.
    ///
    /// `Ok(None)` means the key is known but carries no game action (e.g. `1`).
    pub fn game_action(&self, code: i32) -> Result<Option<GameAction>, LcduiError> {
        self.tables
            .game_actions
            .get(&code)
            .copied()
            .ok_or(LcduiError::UnknownKeyCode(code))
    }

    /// Key code bound to the numeric game action `action`.
    pub fn key_code(&self, action: i32) -> Result<i32, LcduiError> {
        GameAction::from_code(action)
            .and_then(|action| self.tables.key_codes.get(&action).copied())
            .ok_or(LcduiError::UnknownGameAction(action))
    }

    pub fn key_name(&self, code: i32) -> Result<&'static str, LcduiError> {
        self.tables
            .names
            .get(&code)
            .copied()
            .ok_or(LcduiError::UnknownKeyCode(code))
    }
}

/// Host (Android) key codes used by the default host binding table.
pub mod host {
    pub const SOFT_LEFT: i32 = 1;
    pub const SOFT_RIGHT: i32 = 2;
    pub const CALL: i32 = 5;
    pub const ENDCALL: i32 = 6;
    pub const NUM_0: i32 = 7;
    pub const NUM_1: i32 = 8;
    pub const NUM_2: i32 = 9;
    pub const NUM_3: i32 = 10;
    pub const NUM_4: i32 = 11;
    pub const NUM_5: i32 = 12;
    pub const NUM_6: i32 = 13;
    pub const NUM_7: i32 = 14;
    pub const NUM_8: i32 = 15;
    pub const NUM_9: i32 = 16;
    pub const STAR: i32 = 17;
    pub const POUND: i32 = 18;
    pub const DPAD_UP: i32 = 19;
    pub const DPAD_DOWN: i32 = 20;
    pub const DPAD_LEFT: i32 = 21;
    pub const DPAD_RIGHT: i32 = 22;
    pub const ENTER: i32 = 66;
}

/// One host key → handset key binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub host: i32,
    pub handset: i32,
}

impl KeyBinding {
    pub const fn new(host: i32, handset: i32) -> Self {
        Self { host, handset }
    }
}

/// Default host bindings: digits, `*`, `#`, the D-pad, enter as fire, soft
/// keys and the call/end-call keys.
pub fn default_key_bindings() -> Vec<KeyBinding> {
    vec![
        KeyBinding::new(host::NUM_0, KEY_NUM0),
        KeyBinding::new(host::NUM_1, KEY_NUM1),
        KeyBinding::new(host::NUM_2, KEY_NUM2),
        KeyBinding::new(host::NUM_3, KEY_NUM3),
        KeyBinding::new(host::NUM_4, KEY_NUM4),
        KeyBinding::new(host::NUM_5, KEY_NUM5),
        KeyBinding::new(host::NUM_6, KEY_NUM6),
        KeyBinding::new(host::NUM_7, KEY_NUM7),
        KeyBinding::new(host::NUM_8, KEY_NUM8),
        KeyBinding::new(host::NUM_9, KEY_NUM9),
        KeyBinding::new(host::STAR, KEY_STAR),
        KeyBinding::new(host::POUND, KEY_POUND),
        KeyBinding::new(host::DPAD_UP, KEY_UP),
        KeyBinding::new(host::DPAD_DOWN, KEY_DOWN),
        KeyBinding::new(host::DPAD_LEFT, KEY_LEFT),
        KeyBinding::new(host::DPAD_RIGHT, KEY_RIGHT),
        KeyBinding::new(host::ENTER, KEY_FIRE),
        KeyBinding::new(host::SOFT_LEFT, KEY_SOFT_LEFT),
        KeyBinding::new(host::SOFT_RIGHT, KEY_SOFT_RIGHT),
        KeyBinding::new(host::CALL, KEY_SEND),
        KeyBinding::new(host::ENDCALL, KEY_END),
    ]
}

/// Host key code → handset key code normalization table.
#[derive(Debug, Clone, Default)]
pub struct HostKeyTable {
    map: HashMap<i32, i32>,
}

impl HostKeyTable {
    pub fn from_bindings(bindings: &[KeyBinding]) -> Self {
        Self {
            map: bindings.iter().map(|b| (b.host, b.handset)).collect(),
        }
    }

    /// `None` when the host key has no handset equivalent.
    pub fn convert(&self, host_code: i32) -> Option<i32> {
        self.map.get(&host_code).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn standard_layout_passes_codes_through() {
        let map = KeyMap::new();
        assert_eq!(map.convert_key_code(KEY_LEFT), KEY_LEFT);
        assert_eq!(map.convert_key_code(KEY_NUM5), KEY_NUM5);
        assert_eq!(map.convert_key_code(1234), 1234);
    }

    #[test]
    fn digits_and_arrows_resolve_game_actions() {
        let map = KeyMap::new();
        assert_eq!(map.game_action(KEY_NUM2), Ok(Some(GameAction::Up)));
        assert_eq!(map.game_action(KEY_FIRE), Ok(Some(GameAction::Fire)));
        assert_eq!(map.game_action(KEY_STAR), Ok(Some(GameAction::GameC)));
        assert_eq!(map.game_action(KEY_NUM1), Ok(None));
    }

    #[test]
    fn unknown_lookups_are_invalid_arguments() {
        let map = KeyMap::new();
        assert_eq!(map.game_action(999), Err(LcduiError::UnknownKeyCode(999)));
        assert_eq!(map.key_name(-99), Err(LcduiError::UnknownKeyCode(-99)));
        assert_eq!(map.key_code(3), Err(LcduiError::UnknownGameAction(3)));
        assert_eq!(map.key_code(0), Err(LcduiError::UnknownGameAction(0)));
    }

    #[test]
    fn key_code_and_name_lookups() {
        let map = KeyMap::new();
        assert_eq!(map.key_code(GameAction::GameA.code()), Ok(KEY_NUM7));
        assert_eq!(map.key_code(GameAction::Down.code()), Ok(KEY_DOWN));
        assert_eq!(map.key_name(KEY_FIRE), Ok("SELECT"));
        assert_eq!(map.key_name(KEY_POUND), Ok("POUND"));
    }

    #[test]
    fn siemens_layout_remaps_left_to_vendor_code() {
        let map = KeyMap::with_layout(KeyLayout::Siemens);
        let mapped = map.convert_key_code(KEY_LEFT);
        assert_eq!(mapped, SIEMENS_KEY_LEFT);
        assert_eq!(map.game_action(mapped), Ok(Some(GameAction::Left)));
        assert_eq!(map.key_code(GameAction::Left.code()), Ok(SIEMENS_KEY_LEFT));
    }

    #[test]
    fn siemens_soft_keys_shadow_standard_arrow_codes() {
        let map = KeyMap::with_layout(KeyLayout::Siemens);
        assert_eq!(map.convert_key_code(KEY_SOFT_LEFT), SIEMENS_KEY_SOFT_LEFT);
        assert_eq!(map.key_name(SIEMENS_KEY_SOFT_LEFT), Ok("SOFT1"));
        assert_eq!(map.game_action(SIEMENS_KEY_SOFT_LEFT), Ok(None));
        assert_eq!(map.key_name(SIEMENS_KEY_SOFT_RIGHT), Ok("SOFT2"));
    }

    #[test]
    fn motorola_layout_remaps_fire() {
        let map = KeyMap::with_layout(KeyLayout::Motorola);
        assert_eq!(map.convert_key_code(KEY_FIRE), MOTOROLA_KEY_FIRE);
        assert_eq!(map.game_action(MOTOROLA_KEY_FIRE), Ok(Some(GameAction::Fire)));
        assert_eq!(map.key_code(GameAction::Fire.code()), Ok(MOTOROLA_KEY_FIRE));
        assert_eq!(map.game_action(MOTOROLA_KEY_DOWN), Ok(Some(GameAction::Down)));
    }

    #[test]
    fn switching_layouts_drops_previous_vendor_bindings() {
        let mut map = KeyMap::with_layout(KeyLayout::Motorola);
        map.set_layout(KeyLayout::Siemens);
        assert_eq!(map.layout(), KeyLayout::Siemens);
        assert_eq!(map.convert_key_code(KEY_FIRE), KEY_FIRE);
        assert!(map.game_action(MOTOROLA_KEY_FIRE).is_err());

        map.set_layout(KeyLayout::Default);
        assert_eq!(map.convert_key_code(KEY_LEFT), KEY_LEFT);
        assert!(map.game_action(SIEMENS_KEY_LEFT).is_err());
    }

    #[test]
    fn default_host_table_covers_dpad_and_digits() {
        let table = HostKeyTable::from_bindings(&default_key_bindings());
        assert_eq!(table.len(), 21);
        assert_eq!(table.convert(host::DPAD_LEFT), Some(KEY_LEFT));
        assert_eq!(table.convert(host::ENTER), Some(KEY_FIRE));
        assert_eq!(table.convert(host::NUM_9), Some(KEY_NUM9));
        assert_eq!(table.convert(host::ENDCALL), Some(KEY_END));
        assert_eq!(table.convert(200), None);
    }

    #[test]
    fn game_action_codes_round_trip() {
        for action in GameAction::ALL {
            assert_eq!(GameAction::from_code(action.code()), Some(action));
        }
        assert_eq!(GameAction::from_code(0), None);
    }
}
