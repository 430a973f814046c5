use chrono::Utc;
use leptos::prelude::*;

use markdown_new_tab::app::App;
use markdown_new_tab::keymap::Platform;
use markdown_new_tab::logging;
use markdown_new_tab::notepad::Notepad;
use markdown_new_tab::storage::{Storage, StorageError};
use markdown_new_tab::web_storage::{ChromeSync, LocalStore};

async fn boot() -> Result<Notepad, StorageError> {
    let mut storage = Storage::new(Box::new(LocalStore::open()?));
    if let Some(sync) = ChromeSync::detect() {
        let hydrated = storage.hydrate(sync.snapshot().await);
        log::debug!("hydrated {hydrated} items from synced storage");
        storage = storage.with_remote(Box::new(sync));
    }
    let platform = Platform::detect(&window().navigator().platform().unwrap_or_default());
    Ok(Notepad::boot(storage, platform, Utc::now()))
}

fn main() {
    console_error_panic_hook::set_once();
    let search = window().location().search().unwrap_or_default();
    logging::init(logging::level_from_query(&search));

    leptos::task::spawn_local(async {
        match boot().await {
            Ok(notepad) => mount_to_body(move || view! { <App notepad=notepad/> }),
            Err(err) => log::error!("could not start the notepad: {err}"),
        }
    });
}
