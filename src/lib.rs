pub mod app;
pub mod clock;
pub mod drag;
pub mod history;
pub mod indent;
pub mod keymap;
pub mod logging;
pub mod markdown;
pub mod modal;
pub mod notepad;
pub mod settings;
pub mod storage;
pub mod web_storage;
