#![warn(clippy::all, rust_2018_idioms)]

//! Screenshot coordinate analyzer: upload a screenshot, click it to record
//! points, export the recorded coordinates as JSON or CSV.

pub mod export;
pub mod points;
pub mod upload;

mod app;
mod file_picker;

pub use app::CoordinateApp;

#[cfg(target_os = "android")]
use egui_winit::winit;

#[cfg(not(target_arch = "wasm32"))]
impl CoordinateApp {
    /// Run the app with provided NativeOptions (used by Android entrypoint).
    pub fn run(options: eframe::NativeOptions) -> Result<(), eframe::Error> {
        eframe::run_native(
            "Screenshot Coordinate Analyzer",
            options,
            Box::new(|cc| Ok(Box::new(CoordinateApp::new(cc)))),
        )
    }
}

#[cfg(target_os = "android")]
#[allow(unsafe_code)]
#[unsafe(no_mangle)]
pub extern "C" fn android_main(app: winit::platform::android::activity::AndroidApp) {
    use eframe::Renderer;

    unsafe {
        std::env::set_var("RUST_BACKTRACE", "full");
    }
    android_logger::init_once(
        android_logger::Config::default().with_max_level(log::LevelFilter::Info),
    );

    let options = eframe::NativeOptions {
        android_app: Some(app),
        renderer: Renderer::Wgpu,
        ..Default::default()
    };

    CoordinateApp::run(options).unwrap();
}
