use crate::notepad::Mode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Mac,
    Other,
}

impl Platform {
    /// `navigator.platform` contains "Mac" on every Apple desktop.
    pub fn detect(navigator_platform: &str) -> Self {
        if navigator_platform.contains("Mac") {
            Platform::Mac
        } else {
            Platform::Other
        }
    }

    pub fn modifier_label(self) -> &'static str {
        match self {
            Platform::Mac => "Cmd",
            Platform::Other => "Ctrl",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPress {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
}

impl KeyPress {
    fn modifier(&self, platform: Platform) -> bool {
        match platform {
            Platform::Mac => self.meta,
            Platform::Other => self.ctrl,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    Edit,
    Save,
    CloseTopModal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub action: KeyAction,
    pub prevent_default: bool,
}

impl Binding {
    fn handled(action: KeyAction) -> Self {
        Self {
            action,
            prevent_default: true,
        }
    }
}

/// Maps a document-level keydown to an action.
///
/// With the return-key toggle on, modifier+Enter flips between modes and the
/// S/X shortcuts are disabled.
pub fn resolve(
    press: &KeyPress,
    platform: Platform,
    mode: Mode,
    return_key_toggle: bool,
) -> Option<Binding> {
    if press.modifier(platform) {
        let key = press.key.to_ascii_lowercase();
        if return_key_toggle {
            return (key == "enter").then(|| match mode {
                Mode::Editing => Binding::handled(KeyAction::Save),
                Mode::Viewing => Binding::handled(KeyAction::Edit),
            });
        }
        return match (key.as_str(), mode) {
            ("s", Mode::Editing) => Some(Binding::handled(KeyAction::Save)),
            ("x", Mode::Viewing) => Some(Binding::handled(KeyAction::Edit)),
            _ => None,
        };
    }

    (press.key == "Escape").then_some(Binding {
        action: KeyAction::CloseTopModal,
        prevent_default: false,
    })
}
