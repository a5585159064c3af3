// Cross-platform file collaborators. On wasm, uploads come through a hidden <input type=file>
// read into bytes, and exports leave through a Blob object-URL download; on native the app uses
// rfd dialogs directly and only the export writer lives here.

use chrono::{DateTime, Utc};

/// A file chosen by the user, normalized across platforms: raw bytes plus
/// the metadata the upload pipeline needs.
pub struct PickedFile {
    pub name: String,
    pub declared_type: String,
    pub last_modified: DateTime<Utc>,
    pub bytes: Vec<u8>,
}

#[cfg(target_arch = "wasm32")]
mod web {
    use super::PickedFile;
    use chrono::{DateTime, Utc};
    use js_sys::Uint8Array;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{JsCast as _, JsValue};
    use web_sys::{FileReader, HtmlAnchorElement, HtmlInputElement};

    static PICKED_FILE: Lazy<Mutex<Option<PickedFile>>> = Lazy::new(|| Mutex::new(None));

    pub fn open_image_picker() {
        let window = match web_sys::window() {
            Some(w) => w,
            None => return,
        };
        let document = match window.document() {
            Some(d) => d,
            None => return,
        };

        // Keep the input off-screen instead of display:none (some browsers block clicks on display:none)
        let input = match document.create_element("input") {
            Ok(el) => el,
            Err(_) => return,
        };
        let input = match input.dyn_into::<HtmlInputElement>() {
            Ok(i) => i,
            Err(_) => return,
        };

        input.set_type("file");
        input.set_accept("image/png,image/jpeg");
        let _ = input.set_attribute(
            "style",
            "position: fixed; left: -9999px; width: 1px; height: 1px; opacity: 0;",
        );

        // Append to body so click is allowed
        if let Some(body) = document.body() {
            let _ = body.append_child(&input);
        }

        // onChange handler: read the first file into bytes together with the
        // metadata the upload pipeline wants (name, declared type, mtime).
        let onchange = Closure::wrap(Box::new(move |ev: web_sys::Event| {
            let input = match ev.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) {
                Some(i) => i,
                None => return,
            };
            if let Some(files) = input.files() {
                if let Some(file) = files.get(0) {
                    let reader = match FileReader::new() {
                        Ok(r) => r,
                        Err(_) => return,
                    };
                    let reader2 = reader.clone();
                    let name = file.name();
                    let declared_type = file.type_();
                    let last_modified =
                        DateTime::<Utc>::from_timestamp_millis(file.last_modified() as i64)
                            .unwrap_or_else(Utc::now);
                    let onload = Closure::once(Box::new(move |_e: JsValue| {
                        let result = match reader2.result() {
                            Ok(r) => r,
                            Err(_) => return,
                        };
                        let array = Uint8Array::new(&result);
                        let mut bytes = vec![0u8; array.length() as usize];
                        array.copy_to(&mut bytes[..]);
                        *PICKED_FILE.lock().unwrap() = Some(PickedFile {
                            name,
                            declared_type,
                            last_modified,
                            bytes,
                        });
                    }) as Box<dyn FnOnce(_)>);
                    reader.set_onload(Some(onload.as_ref().unchecked_ref()));
                    onload.forget();
                    let _ = reader.read_as_array_buffer(&file);
                }
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(onchange.as_ref().unchecked_ref()));
        onchange.forget(); // keep alive

        // Trigger the native file dialog
        input.click();
    }

    pub fn take_picked_file() -> Option<PickedFile> {
        PICKED_FILE.lock().unwrap().take()
    }

    /// Hand an export to the browser as a download: text goes into a Blob,
    /// the Blob into an object URL, the URL into a clicked anchor.
    pub fn save_text_file(name: &str, mime: &str, contents: &str) {
        let document = match web_sys::window().and_then(|w| w.document()) {
            Some(d) => d,
            None => return,
        };

        let parts = js_sys::Array::new();
        parts.push(&JsValue::from_str(contents));
        let props = web_sys::BlobPropertyBag::new();
        props.set_type(mime);
        let blob = match web_sys::Blob::new_with_str_sequence_and_options(&parts, &props) {
            Ok(b) => b,
            Err(_) => return,
        };
        let url = match web_sys::Url::create_object_url_with_blob(&blob) {
            Ok(u) => u,
            Err(_) => return,
        };

        if let Ok(element) = document.create_element("a") {
            if let Ok(anchor) = element.dyn_into::<HtmlAnchorElement>() {
                anchor.set_href(&url);
                anchor.set_download(name);
                anchor.click();
            }
        }
        let _ = web_sys::Url::revoke_object_url(&url);
    }
}

#[cfg(target_arch = "wasm32")]
pub use web::{open_image_picker, save_text_file, take_picked_file};

#[cfg(not(target_arch = "wasm32"))]
// Native stubs; native builds open files through rfd::FileDialog directly
pub fn open_image_picker() {}

#[cfg(not(target_arch = "wasm32"))]
pub fn take_picked_file() -> Option<PickedFile> {
    None
}

/// Ask where to save an export, then write it there. Write failures are
/// logged; the download collaborator has no user-visible error channel.
#[cfg(all(not(target_arch = "wasm32"), not(target_os = "android")))]
pub fn save_text_file(name: &str, _mime: &str, contents: &str) {
    if let Some(path) = rfd::FileDialog::new().set_file_name(name).save_file() {
        if let Err(err) = std::fs::write(&path, contents) {
            log::warn!("failed to write export to {}: {err}", path.display());
        }
    }
}

#[cfg(target_os = "android")]
pub fn save_text_file(name: &str, _mime: &str, _contents: &str) {
    log::warn!("no save dialog on this platform, dropping export {name}");
}
