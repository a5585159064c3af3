use chrono::{DateTime, Utc};
use egui::{Align2, Color32, ColorImage, FontId, Rect, RichText, Stroke, TextureHandle, TextureOptions};

use crate::export;
use crate::file_picker;
use crate::points::{ClickPoint, PointLog};
use crate::upload::{self, ImageRecord, UploadError};

#[cfg(all(not(target_arch = "wasm32"), not(target_os = "android")))]
use rfd::FileDialog;

/// Marker disc radius, in UI points.
const MARKER_RADIUS: f32 = 9.0;

/// How long the per-point copy confirmation stays visible, in seconds.
const COPY_FEEDBACK_SECS: f64 = 2.0;

/// The uploaded image and everything recorded against it. Replaced as one
/// unit, so recorded points can never outlive the image they were clicked on.
struct Workspace {
    record: ImageRecord,
    points: PointLog,
    texture: Option<TextureHandle>,
}

impl Workspace {
    fn new(record: ImageRecord) -> Self {
        Self {
            record,
            points: PointLog::new(),
            texture: None,
        }
    }
}

/// State changes produced while drawing a frame. Collected during the UI
/// pass and applied in one place afterwards.
enum Command {
    UploadCompleted(Box<ImageRecord>),
    UploadFailed(String),
    PointAdded(ClickPoint),
    PointRemoved(String),
    AllCleared,
    NewImageRequested,
}

enum ExportKind {
    Json,
    Csv,
}

pub struct CoordinateApp {
    workspace: Option<Workspace>,
    upload_error: Option<String>,
    /// Which point id was last copied to the clipboard, and when (egui time).
    copied: Option<(String, f64)>,
}

impl CoordinateApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Set visuals to dark by default
        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        Self {
            workspace: None,
            upload_error: None,
            copied: None,
        }
    }

    /// Pick up files arriving from outside the UI pass: the wasm picker slot
    /// and drag-and-drop. Uploads are only accepted on the upload screen.
    fn collect_file_inputs(&self, ctx: &egui::Context, commands: &mut Vec<Command>) {
        if self.workspace.is_some() {
            return;
        }

        if let Some(picked) = file_picker::take_picked_file() {
            commands.push(upload_command(
                picked.name,
                picked.declared_type,
                picked.last_modified,
                &picked.bytes,
            ));
        }

        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(file) = dropped.into_iter().next() {
            commands.push(command_for_dropped_file(&file));
        }
    }

    fn upload_ui(&self, ui: &mut egui::Ui, commands: &mut Vec<Command>) {
        ui.vertical_centered(|ui| {
            ui.add_space(24.0);
            ui.heading("Screenshot Coordinate Analyzer");
            ui.label("Upload an image and click anywhere to get coordinates");
            ui.add_space(24.0);

            let hovering_file = ui.input(|i| !i.raw.hovered_files.is_empty());
            ui.group(|ui| {
                ui.set_width(380.0);
                ui.add_space(28.0);
                if hovering_file {
                    ui.label(RichText::new("Drop the image here...").size(18.0).strong());
                } else {
                    ui.label(RichText::new("Drag & drop your screenshot here").size(18.0).strong());
                    ui.label("or");
                    if ui.button("Select image...").clicked() {
                        open_file_picker(commands);
                    }
                }
                ui.add_space(8.0);
                ui.label(RichText::new("Supports: JPG, PNG (Max 10MB)").weak());
                ui.add_space(28.0);
            });

            if let Some(error) = &self.upload_error {
                ui.add_space(12.0);
                ui.colored_label(Color32::RED, error);
            }
        });
    }

    fn viewer_ui(&mut self, ui: &mut egui::Ui, commands: &mut Vec<Command>) {
        let Some(workspace) = &mut self.workspace else {
            return;
        };

        if workspace.texture.is_none() {
            let record = &workspace.record;
            let size = [record.width as usize, record.height as usize];
            let color_image = ColorImage::from_rgba_unmultiplied(size, record.pixels.as_raw());
            workspace.texture =
                Some(ui.ctx().load_texture("uploaded_image", color_image, TextureOptions::LINEAR));
        }
        let Some(texture) = &workspace.texture else {
            return;
        };

        ui.vertical_centered(|ui| {
            // Fit the image into the available space while preserving aspect
            // ratio; never upscale past natural size.
            let avail = ui.available_size();
            let natural_w = workspace.record.width as f32;
            let natural_h = workspace.record.height as f32;
            let max_w = (avail.x - 20.0).max(10.0);
            let max_h = (avail.y - 90.0).max(10.0);
            let scale = (max_w / natural_w).min(max_h / natural_h).min(1.0);
            let desired_size = egui::vec2(natural_w * scale, natural_h * scale);

            let response = ui.add(
                egui::Image::new((texture.id(), desired_size)).sense(egui::Sense::click()),
            );
            // Re-measured every frame; resizes are picked up automatically.
            let rendered = response.rect;

            if response.clicked() {
                if let Some(pointer) = response.interact_pointer_pos() {
                    if let Some(point) =
                        ClickPoint::from_click(pointer, rendered, workspace.record.dimensions())
                    {
                        commands.push(Command::PointAdded(point));
                    }
                }
            }

            paint_markers(ui, rendered, &workspace.points, workspace.record.dimensions());

            ui.add_space(6.0);
            ui.label("Click anywhere on the image to mark coordinates");
            ui.label(
                RichText::new(format!(
                    "Image: {} × {}px | Display: {} × {}px",
                    workspace.record.width,
                    workspace.record.height,
                    rendered.width().round(),
                    rendered.height().round(),
                ))
                .weak(),
            );

            ui.add_space(8.0);
            if ui.button("Upload New Image").clicked() {
                commands.push(Command::NewImageRequested);
            }
        });
    }

    fn inspector_ui(&mut self, ui: &mut egui::Ui, commands: &mut Vec<Command>) {
        let now = ui.input(|i| i.time);
        let feedback_expired = self
            .copied
            .as_ref()
            .is_some_and(|(_, copied_at)| now - copied_at > COPY_FEEDBACK_SECS);
        if feedback_expired {
            self.copied = None;
        }
        let copied_id = self.copied.as_ref().map(|(id, _)| id.clone());

        let Some(workspace) = &self.workspace else {
            return;
        };
        let mut copied_now = None;

        egui::ScrollArea::vertical().auto_shrink([false; 2]).show(ui, |ui| {
            image_details_ui(ui, &workspace.record);
            ui.separator();
            coordinates_list_ui(ui, workspace, copied_id.as_deref(), &mut copied_now, commands);
        });

        if let Some(id) = copied_now {
            self.copied = Some((id, now));
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::UploadCompleted(record) => {
                log::info!("loaded '{}' ({}×{})", record.name, record.width, record.height);
                // One assignment: a fresh image always comes with an empty log.
                self.workspace = Some(Workspace::new(*record));
                self.upload_error = None;
                self.copied = None;
            }
            Command::UploadFailed(message) => {
                log::warn!("upload rejected: {message}");
                self.upload_error = Some(message);
            }
            Command::PointAdded(point) => {
                if let Some(workspace) = &mut self.workspace {
                    workspace.points.push(point);
                }
            }
            Command::PointRemoved(id) => {
                if let Some(workspace) = &mut self.workspace {
                    workspace.points.remove(&id);
                }
            }
            Command::AllCleared => {
                if let Some(workspace) = &mut self.workspace {
                    workspace.points.clear();
                }
            }
            Command::NewImageRequested => {
                self.workspace = None;
                self.upload_error = None;
                self.copied = None;
            }
        }
    }
}

impl eframe::App for CoordinateApp {
    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut commands = Vec::new();

        self.collect_file_inputs(ctx, &mut commands);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                // NOTE: no File->Quit on web pages!
                let is_web = cfg!(target_arch = "wasm32");
                if !is_web {
                    ui.menu_button("File", |ui| {
                        if ui.button("Quit").clicked() {
                            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                        }
                    });
                    ui.add_space(16.0);
                }

                egui::widgets::global_theme_preference_buttons(ui);
            });
        });

        if self.workspace.is_some() {
            egui::SidePanel::right("inspector_panel")
                .resizable(true)
                .default_width(340.0)
                .show(ctx, |ui| {
                    self.inspector_ui(ui, &mut commands);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.workspace.is_some() {
                self.viewer_ui(ui, &mut commands);
            } else {
                self.upload_ui(ui, &mut commands);

                ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
                    powered_by_egui_and_eframe(ui);
                    egui::warn_if_debug_build(ui);
                });
            }
        });

        for command in commands {
            self.apply(command);
        }
    }
}

/// Draw a numbered disc at each recorded point, inverse-mapped into the rect
/// the image is currently drawn in.
fn paint_markers(ui: &egui::Ui, rendered: Rect, points: &PointLog, natural_size: (u32, u32)) {
    let painter = ui.painter_at(rendered.expand(MARKER_RADIUS));
    for (index, point) in points.points().iter().enumerate() {
        let center = point.marker_position(rendered, natural_size);
        painter.circle(
            center,
            MARKER_RADIUS,
            Color32::from_rgb(220, 50, 50),
            Stroke::new(1.5, Color32::WHITE),
        );
        painter.text(
            center,
            Align2::CENTER_CENTER,
            (index + 1).to_string(),
            FontId::proportional(11.0),
            Color32::WHITE,
        );
    }
}

fn image_details_ui(ui: &mut egui::Ui, record: &ImageRecord) {
    ui.label(RichText::new("Image Details").strong());
    ui.add_space(4.0);
    egui::Grid::new("image_details").num_columns(2).spacing([12.0, 4.0]).show(ui, |ui| {
        ui.label(RichText::new("File Name:").weak());
        ui.label(record.name.as_str());
        ui.end_row();

        ui.label(RichText::new("File Size:").weak());
        ui.label(export::format_file_size(record.size));
        ui.end_row();

        ui.label(RichText::new("Dimensions:").weak());
        ui.label(format!("{} × {} pixels", record.width, record.height));
        ui.end_row();

        ui.label(RichText::new("Format:").weak());
        ui.label(record.declared_type.to_uppercase().replace("IMAGE/", ""));
        ui.end_row();

        ui.label(RichText::new("Last Modified:").weak());
        ui.label(
            record
                .last_modified
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        );
        ui.end_row();

        ui.label(RichText::new("Validated Type:").weak());
        ui.label(record.sniffed_type);
        ui.end_row();
    });
}

fn coordinates_list_ui(
    ui: &mut egui::Ui,
    workspace: &Workspace,
    copied_id: Option<&str>,
    copied_now: &mut Option<String>,
    commands: &mut Vec<Command>,
) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(format!("Click Coordinates ({})", workspace.points.len())).strong());
        if !workspace.points.is_empty() {
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("Clear All").on_hover_text("Clear all coordinates").clicked() {
                    commands.push(Command::AllCleared);
                }
            });
        }
    });

    if workspace.points.is_empty() {
        ui.label(RichText::new("No coordinates marked yet").weak());
        return;
    }

    for (index, point) in workspace.points.points().iter().enumerate() {
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("{}", index + 1)).strong());
            ui.vertical(|ui| {
                ui.label(format!("Image: ({}, {})", point.image_x, point.image_y));
                ui.label(
                    RichText::new(format!(
                        "Display: ({}, {})",
                        point.display_x.round(),
                        point.display_y.round()
                    ))
                    .weak(),
                );
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("✖").on_hover_text("Remove this point").clicked() {
                    commands.push(Command::PointRemoved(point.id.clone()));
                }
                let copy_label = if copied_id == Some(point.id.as_str()) { "✔" } else { "Copy" };
                if ui.small_button(copy_label).on_hover_text("Copy coordinates").clicked() {
                    ui.ctx().copy_text(export::clipboard_line(point));
                    *copied_now = Some(point.id.clone());
                }
            });
        });
    }

    ui.add_space(8.0);
    ui.horizontal(|ui| {
        if ui.button("Export JSON").clicked() {
            export_points(&workspace.points, &ExportKind::Json);
        }
        if ui.button("Export CSV").clicked() {
            export_points(&workspace.points, &ExportKind::Csv);
        }
    });
}

/// Serialize the log and hand it to the platform download collaborator.
fn export_points(points: &PointLog, kind: &ExportKind) {
    let (contents, extension, mime) = match kind {
        ExportKind::Json => match export::to_json(points.points()) {
            Ok(json) => (json, "json", "application/json"),
            Err(err) => {
                log::error!("JSON export failed: {err}");
                return;
            }
        },
        ExportKind::Csv => (export::to_csv(points.points()), "csv", "text/csv"),
    };
    file_picker::save_text_file(&export::export_file_name(extension), mime, &contents);
}

fn upload_command(
    name: String,
    declared_type: String,
    last_modified: DateTime<Utc>,
    bytes: &[u8],
) -> Command {
    match upload::process_upload(name, declared_type, last_modified, bytes) {
        Ok(record) => Command::UploadCompleted(Box::new(record)),
        Err(err) => Command::UploadFailed(err.to_string()),
    }
}

fn command_for_dropped_file(file: &egui::DroppedFile) -> Command {
    if let Some(bytes) = &file.bytes {
        // Web drops arrive as bytes with the browser-declared MIME type.
        let declared_type = if file.mime.is_empty() {
            upload::declared_type_for_name(&file.name)
        } else {
            file.mime.clone()
        };
        let last_modified = file
            .last_modified
            .map(DateTime::<Utc>::from)
            .unwrap_or_else(Utc::now);
        upload_command(file.name.clone(), declared_type, last_modified, bytes)
    } else if let Some(path) = &file.path {
        upload_command_for_path(path)
    } else {
        Command::UploadFailed(UploadError::ReadFailed.to_string())
    }
}

/// Native drops arrive as a path; read the bytes and metadata ourselves.
#[cfg(not(target_arch = "wasm32"))]
fn upload_command_for_path(path: &std::path::Path) -> Command {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::warn!("failed to read {}: {err}", path.display());
            return Command::UploadFailed(UploadError::ReadFailed.to_string());
        }
    };
    let last_modified = std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    upload_command(name.clone(), upload::declared_type_for_name(&name), last_modified, &bytes)
}

#[cfg(target_arch = "wasm32")]
fn upload_command_for_path(_path: &std::path::Path) -> Command {
    Command::UploadFailed(UploadError::ReadFailed.to_string())
}

#[cfg(all(not(target_arch = "wasm32"), not(target_os = "android")))]
fn open_file_picker(commands: &mut Vec<Command>) {
    if let Some(path) = FileDialog::new()
        .add_filter("Image", &["png", "jpg", "jpeg"])
        .pick_file()
    {
        commands.push(upload_command_for_path(&path));
    }
}

#[cfg(target_arch = "wasm32")]
fn open_file_picker(_commands: &mut Vec<Command>) {
    // The result lands in the picker slot and is collected next frame.
    file_picker::open_image_picker();
}

#[cfg(target_os = "android")]
fn open_file_picker(_commands: &mut Vec<Command>) {}

fn powered_by_egui_and_eframe(ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        ui.spacing_mut().item_spacing.x = 0.0;
        ui.label("Powered by ");
        ui.hyperlink_to("egui", "https://github.com/emilk/egui");
        ui.label(" and ");
        ui.hyperlink_to(
            "eframe",
            "https://github.com/emilk/egui/tree/master/crates/eframe",
        );
        ui.label(".");
    });
}
