use std::sync::Arc;

use eframe::egui;
use eframe::egui::{
    Align, Color32, CornerRadius, FontFamily, FontId, Frame, Layout, Margin, RichText,
    ScrollArea, Stroke, TextEdit, TextStyle, Vec2,
};
use strum::IntoEnumIterator;
use tokio::runtime::Handle;

use ragview_core::chat::{ChatMessage, Role};
use ragview_core::graph::GraphSource;
use ragview_core::logs::LogsState;
use ragview_core::refresh::{GraphRefresh, RefreshStatus};
use ragview_core::types::EvaluationRecord;
use ragview_core::upload::FileKind;
use ragview_core::{BackendHealth, Gateway, Session};

use crate::error::GuiResult;
use crate::graph_view::GraphView;

const CHAT_PANEL_WIDTH: f32 = 420.0;
const UPLOAD_HINT: &str = "Pick a PDF, text, image, or audio file for ingestion.";

pub struct GuiArgs {
    pub runtime_handle: Handle,
    pub gateway: Arc<dyn Gateway>,
    pub graph_source: Arc<dyn GraphSource>,
    pub backend_label: String,
}

pub fn run_gui(args: GuiArgs) -> GuiResult<()> {
    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1400.0, 900.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Ragview",
        native_options,
        Box::new(|cc| {
            let palette = Palette::default();
            setup_style(&cc.egui_ctx, &palette);
            Ok(Box::new(GuiApp::new(
                args.runtime_handle.clone(),
                args.gateway.clone(),
                args.graph_source.clone(),
                args.backend_label.clone(),
                cc.egui_ctx.clone(),
            )))
        }),
    )
    .map_err(|err| std::io::Error::other(err.to_string()))?;
    Ok(())
}

#[derive(Clone)]
pub struct Palette {
    pub bg_primary: Color32,
    pub bg_panel: Color32,
    pub bg_elevated: Color32,
    pub accent: Color32,
    pub accent_warm: Color32,
    pub success: Color32,
    pub danger: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub border: Color32,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            bg_primary: Color32::from_rgb(0x02, 0x06, 0x17),
            bg_panel: Color32::from_rgb(0x0F, 0x17, 0x2A),
            bg_elevated: Color32::from_rgb(0x1E, 0x29, 0x3B),
            accent: Color32::from_rgb(0x10, 0xB9, 0x81),
            accent_warm: Color32::from_rgb(0xE6, 0xA3, 0x6C),
            success: Color32::from_rgb(0x38, 0xBD, 0xF8),
            danger: Color32::from_rgb(0xF8, 0x71, 0x71),
            text_primary: Color32::from_rgb(0xF1, 0xF5, 0xF9),
            text_muted: Color32::from_rgb(0x94, 0xA3, 0xB8),
            border: Color32::from_rgb(0x1E, 0x29, 0x3B),
        }
    }
}

pub fn lighten_color(color: Color32, factor: f32) -> Color32 {
    color.gamma_multiply(factor)
}

fn setup_style(ctx: &egui::Context, palette: &Palette) {
    let mut visuals = egui::Visuals::dark();
    visuals.panel_fill = palette.bg_panel;
    visuals.window_fill = palette.bg_primary;
    visuals.faint_bg_color = lighten_color(palette.bg_panel, 1.04);
    visuals.extreme_bg_color = palette.bg_elevated;
    visuals.text_edit_bg_color = Some(palette.bg_elevated);
    visuals.widgets.noninteractive.bg_fill = palette.bg_panel;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, palette.border);
    visuals.widgets.inactive.bg_fill = palette.bg_elevated;
    visuals.widgets.active.bg_fill = lighten_color(palette.bg_elevated, 1.08);
    visuals.widgets.hovered.bg_fill = lighten_color(palette.bg_elevated, 1.06);
    visuals.selection.bg_fill = palette.accent.gamma_multiply(0.3);
    visuals.selection.stroke = Stroke::new(1.0, palette.accent);
    visuals.override_text_color = Some(palette.text_primary);
    visuals.weak_text_color = Some(palette.text_muted);
    visuals.hyperlink_color = palette.accent;
    visuals.warn_fg_color = palette.accent_warm;
    visuals.error_fg_color = palette.danger;

    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, palette.border);
    visuals.widgets.active.bg_stroke = Stroke::new(1.0, palette.accent);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.5, palette.text_muted);
    visuals.widgets.noninteractive.corner_radius = CornerRadius::same(6);
    visuals.widgets.inactive.corner_radius = CornerRadius::same(6);
    visuals.widgets.hovered.corner_radius = CornerRadius::same(6);
    visuals.widgets.active.corner_radius = CornerRadius::same(6);
    visuals.window_corner_radius = CornerRadius::same(10);
    visuals.window_stroke = Stroke::new(1.0, palette.border);
    visuals.window_shadow = egui::Shadow {
        offset: [10, 18],
        blur: 16,
        spread: 0,
        color: Color32::from_black_alpha(110),
    };
    visuals.collapsing_header_frame = true;
    visuals.indent_has_left_vline = false;

    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.text_styles.insert(
        TextStyle::Heading,
        FontId::new(16.0, FontFamily::Proportional),
    );
    style
        .text_styles
        .insert(TextStyle::Body, FontId::new(13.0, FontFamily::Proportional));
    style.text_styles.insert(
        TextStyle::Small,
        FontId::new(11.0, FontFamily::Proportional),
    );
    style.text_styles.insert(
        TextStyle::Monospace,
        FontId::new(12.0, FontFamily::Monospace),
    );
    style.text_styles.insert(
        TextStyle::Button,
        FontId::new(13.0, FontFamily::Proportional),
    );
    style.spacing.item_spacing = Vec2::new(8.0, 8.0);
    style.spacing.window_margin = Margin::same(14);
    style.spacing.button_padding = Vec2::new(10.0, 5.0);
    ctx.set_style(style);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Muted,
    Good,
    Busy,
    Bad,
}

impl Tone {
    fn color(self, palette: &Palette) -> Color32 {
        match self {
            Tone::Muted => palette.text_muted,
            Tone::Good => palette.accent,
            Tone::Busy => palette.accent_warm,
            Tone::Bad => palette.danger,
        }
    }
}

fn health_badge(health: &BackendHealth) -> (&'static str, Tone, Option<&str>) {
    match health {
        BackendHealth::Unknown => ("Checking backend...", Tone::Muted, None),
        BackendHealth::Online => ("Backend online", Tone::Good, None),
        BackendHealth::Offline(err) => ("Backend offline", Tone::Bad, Some(err.as_str())),
    }
}

fn sync_badge(refresh: &GraphRefresh, graph_loading: bool) -> (&'static str, Tone, Option<&str>) {
    if refresh.is_syncing() || graph_loading {
        return ("Syncing...", Tone::Busy, None);
    }
    match refresh.status() {
        RefreshStatus::Failed(err) => ("Sync failed", Tone::Bad, Some(err.as_str())),
        _ => ("Synced", Tone::Muted, None),
    }
}

fn supported_types_hint() -> String {
    FileKind::iter()
        .map(|kind| kind.extension().to_uppercase())
        .collect::<Vec<_>>()
        .join(", ")
}

fn file_dialog_extensions() -> Vec<String> {
    FileKind::extensions()
        .into_iter()
        .flat_map(|ext| [ext.to_string(), ext.to_uppercase()])
        .collect()
}

pub struct GuiApp {
    session: Session,
    graph: GraphView,
    palette: Palette,
    backend_label: String,
    input: String,
}

impl GuiApp {
    fn new(
        runtime: Handle,
        gateway: Arc<dyn Gateway>,
        graph_source: Arc<dyn GraphSource>,
        backend_label: String,
        egui_ctx: egui::Context,
    ) -> Self {
        let repaint_ctx = egui_ctx.clone();
        let mut session = Session::new(
            runtime.clone(),
            gateway,
            Arc::new(move || repaint_ctx.request_repaint()),
        );
        session.check_health();
        Self {
            session,
            graph: GraphView::new(runtime, graph_source, egui_ctx),
            palette: Palette::default(),
            backend_label,
            input: String::new(),
        }
    }

    fn submit_chat(&mut self) {
        if self.session.submit_chat(&self.input) {
            self.input.clear();
        }
    }

    fn pick_upload_file(&mut self) {
        let extensions = file_dialog_extensions();
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Upload document or media")
            .add_filter("Supported files", extensions.as_slice())
            .pick_file()
        {
            self.session.select_file(path);
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        let mut open_logs = false;
        let mut open_upload = false;
        let mut recheck = false;

        egui::TopBottomPanel::top("header")
            .exact_height(60.0)
            .frame(
                Frame::new()
                    .fill(self.palette.bg_primary)
                    .stroke(Stroke::new(1.0, self.palette.border))
                    .inner_margin(Margin::symmetric(20, 10)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    let (rect, _) = ui.allocate_exact_size(Vec2::splat(30.0), egui::Sense::hover());
                    ui.painter().rect_filled(rect, CornerRadius::same(8), self.palette.accent);
                    ui.vertical(|ui| {
                        ui.spacing_mut().item_spacing.y = 2.0;
                        ui.label(
                            RichText::new("MULTIMODAL RAG")
                                .size(10.0)
                                .color(self.palette.text_muted),
                        );
                        ui.label(
                            RichText::new("Starter Pokemons: Generation 1")
                                .size(15.0)
                                .color(self.palette.text_primary)
                                .strong(),
                        );
                    });

                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let upload = egui::Button::new(
                            RichText::new("Upload").color(self.palette.bg_primary).strong(),
                        )
                        .fill(self.palette.accent)
                        .corner_radius(CornerRadius::same(6));
                        if ui.add(upload).clicked() {
                            open_upload = true;
                        }
                        if ui
                            .add(egui::Button::new("Logs").stroke(Stroke::new(
                                1.0,
                                self.palette.border,
                            )))
                            .clicked()
                        {
                            open_logs = true;
                        }

                        ui.add_space(12.0);
                        let (label, tone, detail) = health_badge(self.session.health());
                        let pill = ui
                            .add(
                                egui::Button::new(
                                    RichText::new(label).size(11.0).color(tone.color(&self.palette)),
                                )
                                .fill(self.palette.bg_panel)
                                .corner_radius(CornerRadius::same(12)),
                            )
                            .on_hover_text(format!(
                                "{}\n{}",
                                self.backend_label,
                                detail.unwrap_or("Click to check again")
                            ));
                        if pill.clicked() {
                            recheck = true;
                        }
                    });
                });
            });

        if open_upload {
            self.session.open_upload();
        }
        if open_logs {
            self.session.open_logs();
        }
        if recheck {
            self.session.check_health();
        }
    }

    fn render_chat(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("chat")
            .exact_width(CHAT_PANEL_WIDTH)
            .resizable(false)
            .frame(
                Frame::new()
                    .fill(self.palette.bg_primary)
                    .stroke(Stroke::new(1.0, self.palette.border)),
            )
            .show(ctx, |ui| {
                egui::TopBottomPanel::bottom("chat_input")
                    .frame(
                        Frame::new()
                            .fill(self.palette.bg_primary)
                            .stroke(Stroke::new(1.0, self.palette.border))
                            .inner_margin(Margin::symmetric(16, 12)),
                    )
                    .show_inside(ui, |ui| {
                        ui.horizontal(|ui| {
                            let send_width = 64.0;
                            let response = ui.add_sized(
                                [ui.available_width() - send_width - 8.0, 40.0],
                                TextEdit::singleline(&mut self.input)
                                    .hint_text("Ask about Bulbasaur, Charmander, or Squirtle...")
                                    .background_color(self.palette.bg_elevated)
                                    .margin(Margin::symmetric(12, 8)),
                            );
                            let mut submit = response.lost_focus()
                                && ctx.input(|i| i.key_pressed(egui::Key::Enter));
                            let can_send = !self.input.trim().is_empty();
                            let send = ui.add_enabled(
                                can_send,
                                egui::Button::new(
                                    RichText::new("Send").color(self.palette.bg_primary).strong(),
                                )
                                .fill(self.palette.accent)
                                .min_size(Vec2::new(send_width, 40.0))
                                .corner_radius(CornerRadius::same(20)),
                            );
                            submit |= send.clicked();
                            if submit {
                                self.submit_chat();
                                response.request_focus();
                            }
                        });
                    });

                egui::CentralPanel::default()
                    .frame(Frame::new().inner_margin(Margin::symmetric(16, 16)))
                    .show_inside(ui, |ui| {
                        ScrollArea::vertical()
                            .auto_shrink([false; 2])
                            .stick_to_bottom(true)
                            .show(ui, |ui| {
                                let chat = self.session.chat();
                                if chat.transcript().is_empty() {
                                    ui.label(
                                        RichText::new("Ask a question to start the conversation.")
                                            .color(self.palette.text_muted)
                                            .italics(),
                                    );
                                }
                                let max_width = ui.available_width() * 0.75;
                                for message in chat.transcript() {
                                    render_message(ui, message, &self.palette, max_width);
                                }
                                if chat.is_waiting() {
                                    ui.horizontal(|ui| {
                                        ui.add(egui::Spinner::new().size(12.0));
                                        ui.label(
                                            RichText::new("Waiting for the answer...")
                                                .size(11.0)
                                                .color(self.palette.text_muted),
                                        );
                                    });
                                }
                            });
                    });
            });
    }

    fn render_graph(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default()
            .frame(
                Frame::new()
                    .fill(self.palette.bg_panel)
                    .inner_margin(Margin::symmetric(24, 16)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new("Knowledge graph")
                            .size(14.0)
                            .color(self.palette.text_primary)
                            .strong(),
                    );
                    if let Some(name) = self.session.chat().focused_entity() {
                        ui.label(
                            RichText::new(format!("Focused: {name}"))
                                .size(11.0)
                                .color(self.palette.accent_warm),
                        );
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let (label, tone, detail) =
                            sync_badge(self.session.refresh(), self.graph.is_loading());
                        let badge = Frame::new()
                            .stroke(Stroke::new(1.0, self.palette.border))
                            .corner_radius(CornerRadius::same(10))
                            .inner_margin(Margin::symmetric(8, 2))
                            .show(ui, |ui| {
                                ui.label(
                                    RichText::new(label)
                                        .size(10.0)
                                        .color(tone.color(&self.palette)),
                                );
                            })
                            .response;
                        badge.on_hover_text(
                            detail.map_or_else(|| self.graph.source_label(), str::to_string),
                        );
                    });
                });
                ui.add_space(8.0);
                self.graph.show(ui, &self.palette);
            });
    }

    fn render_upload_window(&mut self, ctx: &egui::Context) {
        if !self.session.upload().is_open() {
            return;
        }
        let mut open = true;
        let mut choose = false;
        let mut cancel = false;
        let upload = self.session.upload();
        let palette = &self.palette;

        egui::Window::new("Upload document or media")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .default_width(380.0)
            .show(ctx, |ui| {
                match upload.error() {
                    Some(err) => ui.label(RichText::new(err).size(12.0).color(palette.danger)),
                    None => ui.label(RichText::new(UPLOAD_HINT).size(12.0).color(palette.text_muted)),
                };
                ui.add_space(6.0);
                ui.label(RichText::new("File").size(11.0).strong());
                let picker = egui::Button::new(
                    RichText::new(format!(
                        "Choose file\n{}",
                        supported_types_hint()
                    ))
                    .size(11.0)
                    .color(palette.text_muted),
                )
                .fill(palette.bg_panel)
                .stroke(Stroke::new(1.0, palette.border))
                .corner_radius(CornerRadius::same(12));
                if ui
                    .add_sized([ui.available_width(), 90.0], picker)
                    .clicked()
                {
                    choose = true;
                }
                if let Some(name) = upload.selection() {
                    ui.horizontal(|ui| {
                        ui.add(egui::Spinner::new().size(12.0));
                        ui.label(
                            RichText::new(format!("Selected: {name}"))
                                .size(11.0)
                                .color(palette.accent),
                        );
                    });
                }
                ui.add_space(6.0);
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Cancel").clicked() {
                        cancel = true;
                    }
                });
            });

        if !open || cancel {
            self.session.cancel_upload();
            return;
        }
        if choose {
            self.pick_upload_file();
        }
    }

    fn render_logs_window(&mut self, ctx: &egui::Context) {
        if !self.session.logs().is_open() {
            return;
        }
        let mut open = true;
        let mut close = false;
        let logs = self.session.logs();
        let palette = &self.palette;

        egui::Window::new("Evaluation logs")
            .open(&mut open)
            .collapsible(false)
            .default_width(640.0)
            .show(ctx, |ui| {
                ui.label(
                    RichText::new("Recent query / answer pairs and their evaluation metadata.")
                        .size(11.0)
                        .color(palette.text_muted),
                );
                Frame::new()
                    .fill(palette.bg_primary)
                    .stroke(Stroke::new(1.0, palette.border))
                    .corner_radius(CornerRadius::same(8))
                    .inner_margin(Margin::same(10))
                    .show(ui, |ui| {
                        ScrollArea::vertical()
                            .max_height(340.0)
                            .auto_shrink([false, true])
                            .show(ui, |ui| match logs.state() {
                                LogsState::Closed => {}
                                LogsState::Loading => {
                                    ui.horizontal(|ui| {
                                        ui.add(egui::Spinner::new().size(12.0));
                                        ui.label(
                                            RichText::new("Loading...")
                                                .size(11.0)
                                                .color(palette.text_muted),
                                        );
                                    });
                                }
                                LogsState::Failed(err) => {
                                    ui.label(RichText::new(err).size(11.0).color(palette.danger));
                                }
                                LogsState::Ready(records) if records.is_empty() => {
                                    ui.label(
                                        RichText::new("No logs recorded yet.")
                                            .size(11.0)
                                            .color(palette.text_muted),
                                    );
                                }
                                LogsState::Ready(records) => {
                                    for (idx, record) in records.iter().enumerate() {
                                        render_log_record(ui, idx, record, palette);
                                    }
                                }
                            });
                    });
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.button("Close").clicked() {
                        close = true;
                    }
                });
            });

        if !open || close {
            self.session.close_logs();
        }
    }
}

impl eframe::App for GuiApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.session.drain_events() {
            ctx.request_repaint();
        }
        self.graph.sync(
            self.session.refresh().revision(),
            self.session.chat().focused_entity(),
        );

        self.render_header(ctx);
        self.render_chat(ctx);
        self.render_graph(ctx);
        self.render_logs_window(ctx);
        self.render_upload_window(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.session.shutdown();
    }
}

fn render_message(ui: &mut egui::Ui, message: &ChatMessage, palette: &Palette, max_width: f32) {
    let is_user = message.role == Role::User;
    let layout = if is_user {
        Layout::right_to_left(Align::TOP)
    } else {
        Layout::left_to_right(Align::TOP)
    };
    let (fill, text_color, stamp_color, corner_radius) = if is_user {
        (
            palette.accent,
            palette.bg_primary,
            palette.bg_primary.gamma_multiply(0.8),
            CornerRadius {
                nw: 16,
                ne: 16,
                sw: 16,
                se: 2,
            },
        )
    } else {
        (
            palette.bg_elevated,
            palette.text_primary,
            palette.text_muted,
            CornerRadius {
                nw: 16,
                ne: 16,
                sw: 2,
                se: 16,
            },
        )
    };
    ui.with_layout(layout, |ui| {
        Frame::new()
            .fill(fill)
            .corner_radius(corner_radius)
            .inner_margin(Margin::symmetric(14, 8))
            .show(ui, |ui| {
                ui.set_max_width(max_width);
                ui.vertical(|ui| {
                    ui.label(RichText::new(&message.text).color(text_color));
                    ui.with_layout(Layout::right_to_left(Align::Min), |ui| {
                        ui.label(
                            RichText::new(message.sent_at.format("%H:%M").to_string())
                                .size(10.0)
                                .color(stamp_color),
                        );
                    });
                });
            });
    });
    ui.add_space(4.0);
}

fn render_log_record(ui: &mut egui::Ui, idx: usize, record: &EvaluationRecord, palette: &Palette) {
    Frame::new()
        .fill(palette.bg_panel)
        .stroke(Stroke::new(1.0, palette.border))
        .corner_radius(CornerRadius::same(6))
        .inner_margin(Margin::same(8))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.horizontal(|ui| {
                ui.label(RichText::new(&record.query).size(12.0).strong());
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    ui.label(
                        RichText::new(record.display_timestamp())
                            .size(10.0)
                            .color(palette.text_muted),
                    );
                });
            });
            if let Some(name) = record.focused_name() {
                ui.label(
                    RichText::new(format!("Focused: {name}"))
                        .size(11.0)
                        .color(palette.accent),
                );
            }
            ui.label(RichText::new("Answer:").size(11.0).color(palette.text_muted));
            ui.label(RichText::new(&record.answer).size(11.0));
            egui::CollapsingHeader::new(RichText::new("Context & evaluation").size(11.0))
                .id_salt(("log_details", idx, &record.timestamp))
                .show(ui, |ui| {
                    ui.label(
                        RichText::new(record.retrieved_context_text())
                            .size(11.0)
                            .monospace()
                            .color(palette.text_muted),
                    );
                    ui.horizontal(|ui| {
                        ui.label(RichText::new("grounded_in_graph:").size(11.0).strong());
                        ui.label(RichText::new(record.grounded_in_graph_text()).size(11.0));
                    });
                    if let Some(latency) = record.latency_ms() {
                        ui.horizontal(|ui| {
                            ui.label(RichText::new("latency_ms:").size(11.0).strong());
                            ui.label(
                                RichText::new(ragview_core::types::value_text(latency)).size(11.0),
                            );
                        });
                    }
                });
        });
    ui.add_space(6.0);
}
