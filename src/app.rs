use std::time::Duration;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use leptos::ev;
use leptos::html;
use leptos::prelude::*;
use wasm_bindgen::prelude::*;

use crate::clock::{self, HISTORY_DATE_FORMAT};
use crate::drag::{DragState, Point};
use crate::indent::{self, Selection};
use crate::keymap::{self, KeyAction, KeyPress};
use crate::modal::ModalId;
use crate::notepad::{Changes, Command, Effect, Mode, Notepad, PreferenceForm};
use crate::settings::{PowerMode, SettingKey};

type NotepadSignal = RwSignal<Notepad, LocalStorage>;

/// One trigger per view area. The notepad signal itself is only updated
/// untracked, so readers subscribe to the area they show.
#[derive(Clone, Copy)]
struct Refresh {
    document: Trigger,
    modals: Trigger,
    history: Trigger,
    preferences: Trigger,
}

impl Refresh {
    fn new() -> Self {
        Self {
            document: Trigger::new(),
            modals: Trigger::new(),
            history: Trigger::new(),
            preferences: Trigger::new(),
        }
    }

    fn notify(self, changes: Changes) {
        if changes.document {
            self.document.notify();
        }
        if changes.modals {
            self.modals.notify();
        }
        if changes.history {
            self.history.notify();
        }
        if changes.preferences {
            self.preferences.notify();
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct HistoryRow {
    rank: usize,
    date: String,
    text: String,
    html: String,
    raw: bool,
}

fn history_rows(notepad: &Notepad, today: NaiveDate) -> Vec<HistoryRow> {
    notepad
        .history()
        .ranked()
        .map(|(rank, entry)| HistoryRow {
            rank,
            date: clock::format_date(
                &entry.date.with_timezone(&Local).fixed_offset(),
                HISTORY_DATE_FORMAT,
                today,
            ),
            text: entry.text.clone(),
            html: notepad.render(&entry.text),
            raw: notepad.is_raw_view(rank),
        })
        .collect()
}

fn now_local() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

fn apply_input_effect(textarea: &web_sys::HtmlTextAreaElement, effect: Effect) {
    match effect {
        Effect::FocusInput => {
            let _ = textarea.focus();
        }
        Effect::SetCaret(pos) => {
            // selectionStart/End are in UTF-16 code units.
            let len = textarea.value().encode_utf16().count() as u32;
            let pos = pos.min(len);
            let _ = textarea.set_selection_range(pos, pos);
        }
        Effect::ScrollInputToTop => textarea.set_scroll_top(0),
        Effect::FlashSaved(_) | Effect::PowerPulse(_) => {}
    }
}

/// Runs on the next tick so the textarea is visible before it takes focus.
fn defer_input_effects(textarea_ref: NodeRef<html::Textarea>, effects: Vec<Effect>) {
    let Some(textarea) = textarea_ref.get_untracked() else {
        return;
    };
    let callback = Closure::once_into_js(move || {
        for effect in effects {
            apply_input_effect(&textarea, effect);
        }
    });
    let _ = window()
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0);
}

fn indent_on_tab(ev: &ev::KeyboardEvent, textarea_ref: NodeRef<html::Textarea>) {
    if ev.key() != "Tab" {
        return;
    }
    let Some(textarea) = textarea_ref.get_untracked() else {
        return;
    };
    ev.prevent_default();

    let text = textarea.value();
    let start = textarea.selection_start().ok().flatten().unwrap_or(0);
    let end = textarea.selection_end().ok().flatten().unwrap_or(start);
    let selection = Selection::new(
        indent::utf16_to_byte(&text, start),
        indent::utf16_to_byte(&text, end),
    );
    let edit = if ev.shift_key() {
        indent::outdent(&text, selection)
    } else {
        Some(indent::indent(&text, selection))
    };
    if let Some(edit) = edit {
        textarea.set_value(&edit.text);
        let _ = textarea.set_selection_range(
            indent::byte_to_utf16(&edit.text, edit.selection.start),
            indent::byte_to_utf16(&edit.text, edit.selection.end),
        );
    }
}

fn saved_class(flashed: RwSignal<Option<PreferenceForm>>, form: PreferenceForm) -> &'static str {
    if flashed.get() == Some(form) {
        "submit saved"
    } else {
        "submit"
    }
}

fn modal_frame(
    id: ModalId,
    notepad: NotepadSignal,
    refresh: Refresh,
    dispatch: impl Fn(Command) + Copy + 'static,
    body: impl IntoView + 'static,
) -> impl IntoView {
    let section_ref = NodeRef::<html::Section>::new();
    let drag = RwSignal::new(DragState::default());
    let position = RwSignal::new(None::<Point>);
    let z_index = Memo::new(move |_| {
        refresh.modals.track();
        notepad.with_untracked(|n| n.modals().z_index(id))
    });

    // Move/up listeners stay installed; they only act while a drag is live.
    let _ = window_event_listener(ev::mousemove, move |ev| {
        if !drag.with_untracked(DragState::is_active) {
            return;
        }
        ev.prevent_default();
        let Some(section) = section_ref.get_untracked() else {
            return;
        };
        let current = Point::new(section.offset_left() as f64, section.offset_top() as f64);
        let pointer = Point::new(ev.client_x() as f64, ev.client_y() as f64);
        if let Some(next) = drag.try_update(|d| d.step(pointer, current)).flatten() {
            position.set(Some(next));
        }
    });
    let _ = window_event_listener(ev::mouseup, move |_| {
        drag.update(|d| {
            d.end();
        });
    });

    let class = move || {
        let hidden = if z_index.get().is_none() { " nodisplay" } else { "" };
        format!("modal {}{}", id.class_name(), hidden)
    };
    let style = move || {
        let mut style = String::new();
        if let Some(z) = z_index.get() {
            style.push_str(&format!("z-index: {z};"));
        }
        if let Some(p) = position.get() {
            style.push_str(&format!(" top: {}px; left: {}px;", p.y, p.x));
        }
        style
    };

    view! {
        <section node_ref=section_ref class=class style=style>
            <div
                class="header noselect"
                on:mousedown=move |ev: ev::MouseEvent| {
                    ev.prevent_default();
                    let pointer = Point::new(ev.client_x() as f64, ev.client_y() as f64);
                    drag.update(|d| d.begin(pointer));
                }
            >
                <h2>{id.title()}</h2>
                <div class="button close" on:click=move |_| dispatch(Command::CloseModal(id))>
                    "✕"
                </div>
            </div>
            <div class="content">{body}</div>
        </section>
    }
}

#[component]
pub fn App(notepad: Notepad) -> impl IntoView {
    let platform = notepad.platform();
    let initial_date_format = notepad.date_format();
    let initial_css = notepad.custom_css();
    let initial_clock = notepad.clock_text(&now_local());
    let initial_last_edited = notepad.last_edited_text(Utc::now());
    let notepad: NotepadSignal = RwSignal::new_local(notepad);
    let refresh = Refresh::new();

    let textarea_ref = NodeRef::<html::Textarea>::new();
    let date_input_ref = NodeRef::<html::Input>::new();
    let css_ref = NodeRef::<html::Textarea>::new();
    let flashed = RwSignal::new(None::<PreferenceForm>);
    let pulse = RwSignal::new(None::<PowerMode>);

    let mode = Memo::new(move |_| {
        refresh.document.track();
        notepad.with_untracked(|n| n.mode())
    });
    let draft = Memo::new(move |_| {
        refresh.document.track();
        notepad.with_untracked(|n| n.draft().to_string())
    });
    let rendered = Memo::new(move |_| {
        refresh.document.track();
        notepad.with_untracked(|n| n.rendered_html().to_string())
    });
    let blurred = Memo::new(move |_| {
        refresh.modals.track();
        notepad.with_untracked(|n| n.modals().is_blurred())
    });
    let custom_css = Memo::new(move |_| {
        refresh.preferences.track();
        notepad.with_untracked(|n| n.custom_css())
    });
    let history = Memo::new(move |_| {
        refresh.history.track();
        let today = Local::now().date_naive();
        notepad.with_untracked(|n| history_rows(n, today))
    });

    let caret = move || {
        textarea_ref
            .get_untracked()
            .and_then(|t| t.selection_start().ok().flatten())
            .unwrap_or(0)
    };

    let dispatch = move |command: Command| {
        let Some((effects, changes)) = notepad.try_update_untracked(|n| {
            let effects = n.dispatch(command, Utc::now());
            (effects, n.take_changes())
        }) else {
            return;
        };
        refresh.notify(changes);
        let mut input_effects = Vec::new();
        for effect in effects {
            match effect {
                Effect::FlashSaved(form) => {
                    flashed.set(Some(form));
                    set_timeout(move || flashed.set(None), Duration::from_millis(500));
                }
                Effect::PowerPulse(power) => {
                    pulse.set(Some(power));
                    set_timeout(move || pulse.set(None), Duration::from_millis(120));
                }
                other => input_effects.push(other),
            }
        }
        if !input_effects.is_empty() {
            defer_input_effects(textarea_ref, input_effects);
        }
    };

    let (clock_text, set_clock_text) = signal(initial_clock);
    let (last_edited, set_last_edited) = signal(initial_last_edited);
    set_interval(
        move || set_clock_text.set(notepad.with_untracked(|n| n.clock_text(&now_local()))),
        Duration::from_secs(1),
    );
    set_interval(
        move || set_last_edited.set(notepad.with_untracked(|n| n.last_edited_text(Utc::now()))),
        Duration::from_secs(1),
    );

    let _ = window_event_listener(ev::keydown, move |ev| {
        let press = KeyPress {
            key: ev.key(),
            ctrl: ev.ctrl_key(),
            meta: ev.meta_key(),
        };
        let (current_mode, return_key_toggle) =
            notepad.with_untracked(|n| (n.mode(), n.flags().return_key_toggle));
        let Some(binding) = keymap::resolve(&press, platform, current_mode, return_key_toggle)
        else {
            return;
        };
        if binding.prevent_default {
            ev.prevent_default();
        }
        dispatch(match binding.action {
            KeyAction::Edit => Command::Edit,
            KeyAction::Save => Command::Save { caret: caret() },
            KeyAction::CloseTopModal => Command::CloseTopModal,
        });
    });

    let on_visibility = Closure::<dyn FnMut()>::new(move || {
        if document().hidden() {
            dispatch(Command::PageHidden { caret: caret() });
        }
    });
    let _ = document()
        .add_event_listener_with_callback("visibilitychange", on_visibility.as_ref().unchecked_ref());
    on_visibility.forget();

    let editor_class = move || {
        let mut class = String::from("editor");
        if mode.get() != Mode::Editing {
            class.push_str(" nodisplay");
        }
        if let Some(power) = pulse.get() {
            class.push_str(" power");
            if power.colorful {
                class.push_str(" power-color");
            }
            if power.shake {
                class.push_str(" power-shake");
            }
        }
        class
    };

    let history_item = move |row: HistoryRow| {
        let HistoryRow {
            rank,
            date,
            text,
            html,
            raw,
        } = row;
        let body_class = if raw { "markdown-body nodisplay" } else { "markdown-body" };
        let raw_class = if raw { "raw" } else { "raw nodisplay" };
        view! {
            <div class="item">
                <div class="label flex">
                    <div>
                        <p class="id">{format!("#{rank}")}</p>
                        <p class="date">{date}</p>
                    </div>
                    <div class="noselect flex">
                        <div
                            class="button"
                            title="Delete"
                            on:click=move |_| dispatch(Command::DeleteHistory { rank })
                        >
                            "delete"
                        </div>
                        <div
                            class="button"
                            title="Toggle raw text"
                            on:click=move |_| dispatch(Command::ToggleHistoryView { rank })
                        >
                            {if raw { "rendered" } else { "raw" }}
                        </div>
                    </div>
                </div>
                <div class=body_class inner_html=html></div>
                <textarea class=raw_class readonly=true prop:value=text></textarea>
            </div>
        }
    };

    let settings_items = SettingKey::ALL
        .into_iter()
        .map(|key| {
            let enabled = Memo::new(move |_| {
                refresh.preferences.track();
                notepad.with_untracked(|n| n.settings().get(key))
            });
            let class = move || {
                let state = if enabled.get() { "on" } else { "off" };
                match key.parent() {
                    Some(_) => format!("item sub {state}"),
                    None => format!("item {state}"),
                }
            };
            view! {
                <div
                    class=class
                    data-setting=key.as_str()
                    on:click=move |_| dispatch(Command::ToggleSetting(key))
                >
                    <p>{key.label()}</p>
                    <div class="switch">
                        <div class="knob"></div>
                    </div>
                </div>
            }
        })
        .collect::<Vec<_>>();

    let history_body = view! {
        <div class="list">
            <For each=move || history.get() key=|row| row.clone() children=history_item />
        </div>
    };

    let settings_body = view! {
        <div class="list">
            {settings_items}
            <div class="item dateFormat">
                <p>"Date format"</p>
                <form on:submit=move |ev: ev::SubmitEvent| {
                    ev.prevent_default();
                    if let Some(input) = date_input_ref.get_untracked() {
                        dispatch(Command::SaveDateFormat(input.value()));
                    }
                }>
                    <input
                        type="text"
                        name="dateFormat"
                        spellcheck="false"
                        node_ref=date_input_ref
                        value=initial_date_format
                    />
                    <input
                        type="submit"
                        value="Save"
                        class=move || saved_class(flashed, PreferenceForm::DateFormat)
                    />
                </form>
            </div>
            <div class="item customCss">
                <p>"Custom CSS"</p>
                <form on:submit=move |ev: ev::SubmitEvent| {
                    ev.prevent_default();
                    if let Some(textarea) = css_ref.get_untracked() {
                        dispatch(Command::SaveCustomCss(textarea.value()));
                    }
                }>
                    <textarea
                        spellcheck="false"
                        node_ref=css_ref
                        prop:value=initial_css
                        on:keydown=move |ev: ev::KeyboardEvent| indent_on_tab(&ev, css_ref)
                    ></textarea>
                    <input
                        type="submit"
                        value="Save"
                        class=move || saved_class(flashed, PreferenceForm::CustomCss)
                    />
                </form>
            </div>
        </div>
    };

    view! {
        <style>{move || custom_css.get()}</style>
        <section
            class=move || if blurred.get() { "main blur" } else { "main noblur" }
            on:click=move |_| dispatch(Command::BackgroundClick)
        >
            <div
                class=move || {
                    if mode.get() == Mode::Editing { "markdown-body nodisplay" } else { "markdown-body" }
                }
                inner_html=move || rendered.get()
            ></div>
            <textarea
                node_ref=textarea_ref
                class=editor_class
                spellcheck="false"
                prop:value=move || draft.get()
                on:input=move |ev| dispatch(Command::Input(event_target_value(&ev)))
            ></textarea>
        </section>
        <footer class="bar noselect flex">
            <p id="time">{move || clock_text.get()}</p>
            <p id="lastEdited" on:click=move |_| dispatch(Command::OpenModal(ModalId::History))>
                {move || last_edited.get()}
            </p>
            <div class="buttons flex">
                <div
                    id="edit"
                    class=move || if mode.get() == Mode::Viewing { "button" } else { "button nodisplay" }
                    on:click=move |_| dispatch(Command::Edit)
                >
                    "edit"
                </div>
                <div
                    id="save"
                    class=move || if mode.get() == Mode::Editing { "button" } else { "button nodisplay" }
                    on:click=move |_| dispatch(Command::Save { caret: caret() })
                >
                    "save"
                </div>
                <div
                    id="settings"
                    class="button"
                    on:click=move |_| dispatch(Command::OpenModal(ModalId::Settings))
                >
                    "settings"
                </div>
            </div>
        </footer>
        {modal_frame(ModalId::History, notepad, refresh, dispatch, history_body)}
        {modal_frame(ModalId::Settings, notepad, refresh, dispatch, settings_body)}
    }
}
