//! The notepad controller: owns all application state and turns UI commands
//! into state changes plus a short list of imperative effects for the view.

use std::collections::BTreeSet;

use chrono::{DateTime, FixedOffset, Utc};

use crate::clock;
use crate::history::{History, HistoryEntry};
use crate::keymap::Platform;
use crate::markdown::{MarkdownRenderer, RenderOptions};
use crate::modal::{ModalId, ModalStack};
use crate::settings::{self, ListenerChange, PowerMode, RuntimeFlags, SettingKey, Settings};
use crate::storage::{keys, Storage};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Viewing,
    Editing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PreferenceForm {
    DateFormat,
    CustomCss,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Edit,
    /// `caret` is the input's selection start in UTF-16 units.
    Save { caret: u32 },
    Input(String),
    OpenModal(ModalId),
    CloseModal(ModalId),
    CloseTopModal,
    BackgroundClick,
    ToggleSetting(SettingKey),
    DeleteHistory { rank: usize },
    ToggleHistoryView { rank: usize },
    SaveDateFormat(String),
    SaveCustomCss(String),
    PageHidden { caret: u32 },
}

/// Things the view has to do that do not follow from state alone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    FocusInput,
    SetCaret(u32),
    ScrollInputToTop,
    FlashSaved(PreferenceForm),
    PowerPulse(PowerMode),
}

/// Which parts of the view a dispatch invalidated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Changes {
    /// Mode, draft or rendered text.
    pub document: bool,
    pub modals: bool,
    /// History entries or their raw/rendered toggles.
    pub history: bool,
    /// Settings, date format or custom CSS.
    pub preferences: bool,
}

impl Changes {
    pub fn any(self) -> bool {
        self.document || self.modals || self.history || self.preferences
    }
}

pub struct Notepad {
    storage: Storage,
    renderer: MarkdownRenderer,
    platform: Platform,
    mode: Mode,
    raw_text: String,
    draft: String,
    /// Always `renderer.render(&raw_text)` once a save has run.
    rendered: String,
    flags: RuntimeFlags,
    settings: Settings,
    modals: ModalStack,
    raw_views: BTreeSet<usize>,
    changes: Changes,
}

impl Notepad {
    /// Restores state from storage and performs the initial save.
    pub fn boot(mut storage: Storage, platform: Platform, now: DateTime<Utc>) -> Self {
        repair_last_edited(&mut storage);

        let renderer = MarkdownRenderer::new(RenderOptions::GITHUB);
        let stored = storage.get(keys::RAW_TEXT);
        let raw_text = stored.clone().unwrap_or_default();
        let draft = stored.unwrap_or_else(|| welcome_text(platform));
        let rendered = renderer.render(&raw_text);

        let settings = Settings::ensure(&mut storage);
        let mut notepad = Self {
            storage,
            renderer,
            platform,
            mode: Mode::Viewing,
            raw_text,
            draft,
            rendered,
            flags: RuntimeFlags::default(),
            settings,
            modals: ModalStack::new(),
            raw_views: BTreeSet::new(),
            changes: Changes::default(),
        };
        notepad.apply_settings();
        notepad.save(None, true, now);
        log::info!(
            "notepad ready ({} history entries, synced: {})",
            notepad.history().len(),
            notepad.storage.is_synced()
        );
        notepad
    }

    pub fn dispatch(&mut self, command: Command, now: DateTime<Utc>) -> Vec<Effect> {
        match command {
            Command::Edit => {
                self.changes.document = true;
                self.edit()
            }
            Command::Save { caret } => {
                self.changes.document = true;
                self.changes.history |= self.save(Some(caret), true, now);
                Vec::new()
            }
            // The input surface already shows the draft.
            Command::Input(text) => {
                self.draft = text;
                self.flags
                    .power_mode()
                    .map(Effect::PowerPulse)
                    .into_iter()
                    .collect()
            }
            Command::OpenModal(id) => {
                // Opening the history re-reads it and shows every item rendered.
                if id == ModalId::History {
                    self.changes.history = true;
                    self.raw_views.clear();
                }
                self.changes.modals |= self.modals.open(id);
                Vec::new()
            }
            Command::CloseModal(id) => {
                self.changes.modals |= self.modals.close(id);
                Vec::new()
            }
            Command::CloseTopModal => {
                self.changes.modals |= self.modals.close_top().is_some();
                Vec::new()
            }
            Command::BackgroundClick => {
                if self.modals.closes_on_background() {
                    self.changes.modals |= !self.modals.close_all().is_empty();
                }
                Vec::new()
            }
            Command::ToggleSetting(key) => {
                let value = !self.settings.get(key);
                self.settings = Settings::update(&mut self.storage, key, value);
                self.apply_settings();
                self.changes.preferences = true;
                Vec::new()
            }
            Command::DeleteHistory { rank } => {
                let mut history = self.history();
                if history.remove_rank(rank).is_some() {
                    history.persist(&mut self.storage);
                }
                self.raw_views.clear();
                self.changes.history = true;
                Vec::new()
            }
            Command::ToggleHistoryView { rank } => {
                if !self.raw_views.remove(&rank) {
                    self.raw_views.insert(rank);
                }
                self.changes.history = true;
                Vec::new()
            }
            Command::SaveDateFormat(format) => {
                self.storage.set(keys::DATE_FORMAT, format.trim());
                self.changes.preferences = true;
                vec![Effect::FlashSaved(PreferenceForm::DateFormat)]
            }
            Command::SaveCustomCss(css) => {
                self.storage.set(keys::CUSTOM_CSS, css.trim());
                self.changes.preferences = true;
                vec![Effect::FlashSaved(PreferenceForm::CustomCss)]
            }
            Command::PageHidden { caret } => {
                if self.mode != Mode::Editing {
                    return Vec::new();
                }
                self.changes.document = true;
                self.save(Some(caret), false, now);
                let mut effects = self.edit();
                effects.push(Effect::SetCaret(self.stored_caret()));
                effects
            }
        }
    }

    /// What the dispatches since the last call invalidated.
    pub fn take_changes(&mut self) -> Changes {
        std::mem::take(&mut self.changes)
    }

    fn edit(&mut self) -> Vec<Effect> {
        self.mode = Mode::Editing;
        if self.flags.cursor_last_position {
            vec![Effect::FocusInput, Effect::SetCaret(self.stored_caret())]
        } else {
            vec![
                Effect::FocusInput,
                Effect::SetCaret(0),
                Effect::ScrollInputToTop,
            ]
        }
    }

    /// Renders the draft and persists it when the rendered output differs
    /// from the last saved text. Returns whether it did.
    fn save(&mut self, caret: Option<u32>, record_history: bool, now: DateTime<Utc>) -> bool {
        if let Some(caret) = caret {
            self.storage
                .set(keys::CURSOR_LAST_POSITION, &caret.to_string());
        }
        self.mode = Mode::Viewing;

        let html = self.renderer.render(&self.draft);
        let changed = html != self.rendered;
        if changed {
            self.storage.set(keys::RAW_TEXT, &self.draft);
            self.raw_text = self.draft.clone();
            if record_history && self.flags.save_history {
                self.storage.set(keys::LAST_EDITED, &now.to_rfc3339());
                let mut history = self.history();
                history.push(HistoryEntry {
                    date: now,
                    text: self.raw_text.clone(),
                });
                history.persist(&mut self.storage);
            }
        }
        self.rendered = html;
        changed
    }

    fn apply_settings(&mut self) {
        match self.flags.apply(&self.settings) {
            ListenerChange::Attached => log::debug!("power mode listener attached"),
            ListenerChange::Detached => log::debug!("power mode listener detached"),
            ListenerChange::Unchanged => {}
        }
    }

    fn stored_caret(&self) -> u32 {
        self.storage
            .get(keys::CURSOR_LAST_POSITION)
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn rendered_html(&self) -> &str {
        &self.rendered
    }

    pub fn render(&self, text: &str) -> String {
        self.renderer.render(text)
    }

    pub fn flags(&self) -> &RuntimeFlags {
        &self.flags
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn modals(&self) -> &ModalStack {
        &self.modals
    }

    pub fn history(&self) -> History {
        History::load(&self.storage)
    }

    pub fn is_raw_view(&self, rank: usize) -> bool {
        self.raw_views.contains(&rank)
    }

    pub fn date_format(&self) -> String {
        settings::date_format(&self.storage)
    }

    pub fn custom_css(&self) -> String {
        settings::custom_css(&self.storage)
    }

    pub fn clock_text(&self, now: &DateTime<FixedOffset>) -> String {
        clock::format_date(now, &self.date_format(), now.date_naive())
    }

    pub fn last_edited_text(&self, now: DateTime<Utc>) -> String {
        clock::last_edited_label(self.storage.get(keys::LAST_EDITED).as_deref(), now)
    }
}

fn welcome_text(platform: Platform) -> String {
    let modifier = platform.modifier_label();
    format!(
        "# Hello, world!\n\n\
         Start editing right now by clicking the *edit* button or pressing \
         <kbd>{modifier}</kbd> + <kbd>X</kbd>.\n\n\
         To save the file click the *save* button or press \
         <kbd>{modifier}</kbd> + <kbd>S</kbd>.\n\n\
         Cheers!"
    )
}

/// Old builds could store the literal string `[object Object]`; rebuild it
/// from the newest history entry.
fn repair_last_edited(storage: &mut Storage) {
    if storage.get(keys::LAST_EDITED).as_deref() != Some("[object Object]") {
        return;
    }
    let repaired = History::load(storage)
        .newest()
        .map(|entry| entry.date.to_rfc3339())
        .unwrap_or_else(|| "0".to_string());
    log::info!("repairing corrupt lastEdited value");
    storage.set(keys::LAST_EDITED, &repaired);
}
