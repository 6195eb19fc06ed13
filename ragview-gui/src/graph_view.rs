use std::collections::HashMap;
use std::sync::{mpsc, Arc};

use eframe::egui;
use eframe::egui::{Align2, Color32, CornerRadius, FontFamily, FontId, Pos2, Sense, Stroke, Vec2};
use petgraph::graph::NodeIndex;
use tokio::runtime::Handle;

use ragview_core::errors::{ClientResult, ErrorKind};
use ragview_core::graph::{EntityKind, GraphSnapshot, GraphSource};

use crate::gui::{lighten_color, Palette};

const NODE_HIT_RADIUS: f32 = 12.0;
const PAN_EASING: f32 = 0.18;

struct GraphLoad {
    revision: u64,
    result: ClientResult<GraphSnapshot>,
}

/// Knowledge graph panel. Reloads whenever the refresh revision it is handed
/// differs from the one it last requested, and recentres on the focused entity.
pub struct GraphView {
    runtime: Handle,
    source: Arc<dyn GraphSource>,
    egui_ctx: egui::Context,
    loads_tx: mpsc::Sender<GraphLoad>,
    loads_rx: mpsc::Receiver<GraphLoad>,
    requested_revision: Option<u64>,
    loading: bool,
    snapshot: Option<GraphSnapshot>,
    load_error: Option<String>,
    focus: Option<String>,
    follow_focus: bool,
    pan: Vec2,
    pan_target: Vec2,
}

impl GraphView {
    pub fn new(runtime: Handle, source: Arc<dyn GraphSource>, egui_ctx: egui::Context) -> Self {
        let (loads_tx, loads_rx) = mpsc::channel();
        Self {
            runtime,
            source,
            egui_ctx,
            loads_tx,
            loads_rx,
            requested_revision: None,
            loading: false,
            snapshot: None,
            load_error: None,
            focus: None,
            follow_focus: false,
            pan: Vec2::ZERO,
            pan_target: Vec2::ZERO,
        }
    }

    pub fn source_label(&self) -> String {
        self.source.describe()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Feeds the refresh signal and focus target in once per frame.
    pub fn sync(&mut self, revision: u64, focus: Option<&str>) {
        while let Ok(load) = self.loads_rx.try_recv() {
            if Some(load.revision) != self.requested_revision {
                continue;
            }
            self.loading = false;
            match load.result {
                Ok(snapshot) => {
                    self.snapshot = Some(snapshot);
                    self.load_error = None;
                    self.follow_focus = self.focus.is_some();
                }
                Err(err) => {
                    tracing::warn!("Graph load failed: {err}");
                    self.load_error = Some(describe_load_error(&err));
                }
            }
        }

        if self.requested_revision != Some(revision) {
            self.request_load(revision);
        }

        if self.focus.as_deref() != focus {
            self.focus = focus.map(str::to_string);
            self.follow_focus = self.focus.is_some();
        }
    }

    fn request_load(&mut self, revision: u64) {
        self.requested_revision = Some(revision);
        self.loading = true;
        let tx = self.loads_tx.clone();
        let source = self.source.clone();
        let ctx = self.egui_ctx.clone();
        self.runtime.spawn(async move {
            let result = source.load().await;
            let _ = tx.send(GraphLoad { revision, result });
            ctx.request_repaint();
        });
    }

    fn focused_node(&self) -> Option<NodeIndex> {
        let snapshot = self.snapshot.as_ref()?;
        snapshot.find(self.focus.as_deref()?)
    }

    pub fn show(&mut self, ui: &mut egui::Ui, palette: &Palette) {
        let size = ui.available_size();
        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let painter = ui.painter_at(rect);
        draw_grid(&painter, rect, palette);

        let Some(snapshot) = self.snapshot.as_ref().filter(|s| !s.is_empty()) else {
            let message = match (&self.load_error, self.loading) {
                (Some(err), _) => err.clone(),
                (None, true) => "Loading graph...".to_string(),
                (None, false) => "No graph data".to_string(),
            };
            painter.text(
                rect.center(),
                Align2::CENTER_CENTER,
                message,
                FontId::new(12.0, FontFamily::Proportional),
                palette.text_muted,
            );
            return;
        };

        let radius = rect.width().min(rect.height()) * 0.45;
        let offsets = ring_layout(snapshot, radius);
        let focused = self.focused_node();

        if response.dragged() {
            self.pan += response.drag_delta();
            self.pan_target = self.pan;
            self.follow_focus = false;
        } else if response.double_clicked() {
            self.pan_target = Vec2::ZERO;
            self.follow_focus = false;
        }
        if self.follow_focus {
            if let Some(offset) = focused.and_then(|idx| offsets.get(&idx)) {
                self.pan_target = -*offset;
            }
        }
        let remaining = self.pan_target - self.pan;
        if remaining.length() > 0.5 {
            self.pan += remaining * PAN_EASING;
            ui.ctx().request_repaint();
        } else {
            self.pan = self.pan_target;
        }

        let origin = rect.center() + self.pan;
        let positions: HashMap<NodeIndex, Pos2> = offsets
            .iter()
            .map(|(idx, offset)| (*idx, origin + *offset))
            .collect();

        for (from, to, relation) in snapshot.relations() {
            let (Some(a), Some(b)) = (positions.get(&from), positions.get(&to)) else {
                continue;
            };
            let touches_focus = focused.is_some_and(|idx| idx == from || idx == to);
            if touches_focus {
                painter.line_segment([*a, *b], Stroke::new(2.5, palette.accent_warm));
                let mid = Pos2::new((a.x + b.x) * 0.5, (a.y + b.y) * 0.5);
                let label = relation.label();
                let text_width = label.len() as f32 * 6.0;
                let text_rect = egui::Rect::from_center_size(mid, Vec2::new(text_width + 12.0, 16.0));
                painter.rect(
                    text_rect,
                    CornerRadius::same(6),
                    palette.bg_primary,
                    Stroke::new(1.0, palette.border),
                    egui::StrokeKind::Middle,
                );
                painter.text(
                    mid,
                    Align2::CENTER_CENTER,
                    label,
                    FontId::new(10.0, FontFamily::Proportional),
                    palette.text_muted,
                );
            } else {
                painter.line_segment(
                    [*a, *b],
                    Stroke::new(2.0, lighten_color(palette.border, 1.12)),
                );
                painter.line_segment([*a, *b], Stroke::new(1.0, palette.text_muted));
            }
        }

        let hover = response.hover_pos();
        let mut hovered: Option<NodeIndex> = None;
        for (idx, entity) in snapshot.entities() {
            let Some(pos) = positions.get(&idx) else {
                continue;
            };
            let color = kind_color(entity.kind, palette);
            if Some(idx) == focused {
                painter.circle_filled(*pos, 20.0, palette.accent_warm.gamma_multiply(0.18));
                painter.circle_stroke(*pos, 15.0, Stroke::new(2.0, palette.accent_warm));
                painter.circle_filled(*pos, 7.0, palette.accent_warm);
            } else {
                painter.circle_filled(*pos, 14.0, color.gamma_multiply(0.1));
                painter.circle_stroke(*pos, 12.0, Stroke::new(1.0, color.gamma_multiply(0.5)));
                painter.circle_filled(*pos, 5.0, color);
            }
            painter.text(
                *pos + Vec2::new(0.0, 18.0),
                Align2::CENTER_TOP,
                &entity.name,
                FontId::new(12.0, FontFamily::Proportional),
                palette.text_primary,
            );
            if hover.is_some_and(|h| h.distance(*pos) <= NODE_HIT_RADIUS) {
                hovered = Some(idx);
            }
        }

        if let Some(idx) = hovered {
            let entity = snapshot.entity(idx);
            let mut lines = vec![format!("{} ({:?})", entity.name, entity.kind)];
            lines.extend(entity.details.iter().map(|(k, v)| format!("{k}: {v}")));
            lines.push(format!("{} connections", snapshot.neighbors(idx).len()));
            painter.text(
                rect.left_top() + Vec2::new(12.0, 12.0),
                Align2::LEFT_TOP,
                lines.join("\n"),
                FontId::new(11.0, FontFamily::Monospace),
                palette.text_primary,
            );
        }

        painter.text(
            rect.right_bottom() - Vec2::new(12.0, 12.0),
            Align2::RIGHT_BOTTOM,
            format!(
                "{} nodes • {} edges",
                snapshot.node_count(),
                snapshot.edge_count()
            ),
            FontId::new(10.0, FontFamily::Proportional),
            palette.text_muted,
        );
    }
}

fn describe_load_error(err: &ragview_core::ClientError) -> String {
    match err.kind() {
        ErrorKind::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            "No graph data".to_string()
        }
        _ => format!("Graph unavailable: {err}"),
    }
}

fn kind_color(kind: EntityKind, palette: &Palette) -> Color32 {
    match kind {
        EntityKind::Pokemon => palette.accent,
        EntityKind::Type => palette.success,
        EntityKind::Media => palette.text_muted,
    }
}

fn draw_grid(painter: &egui::Painter, rect: egui::Rect, palette: &Palette) {
    let grid_step = 30.0;
    let grid_color = palette.bg_elevated.gamma_multiply(0.4);
    let mut x = rect.left();
    while x < rect.right() {
        painter.line_segment(
            [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
            Stroke::new(0.5, grid_color),
        );
        x += grid_step;
    }
    let mut y = rect.top();
    while y < rect.bottom() {
        painter.line_segment(
            [egui::pos2(rect.left(), y), egui::pos2(rect.right(), y)],
            Stroke::new(0.5, grid_color),
        );
        y += grid_step;
    }
}

/// Offsets from the view centre: pokemon on the inner ring, types in the
/// middle, media outermost. Each ring is ordered by name.
fn ring_layout(snapshot: &GraphSnapshot, radius: f32) -> HashMap<NodeIndex, Vec2> {
    let mut rings: [Vec<(NodeIndex, &str)>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    for (idx, entity) in snapshot.entities() {
        let ring = match entity.kind {
            EntityKind::Pokemon => 0,
            EntityKind::Type => 1,
            EntityKind::Media => 2,
        };
        rings[ring].push((idx, entity.name.as_str()));
    }

    let scales = [0.45, 0.75, 1.0];
    let mut offsets = HashMap::new();
    for (ring, members) in rings.iter_mut().enumerate() {
        members.sort_by(|a, b| a.1.cmp(b.1));
        let count = members.len();
        let ring_radius = radius * scales[ring];
        for (pos, (idx, _)) in members.iter().enumerate() {
            let angle = pos as f32 / count as f32 * std::f32::consts::TAU
                + ring as f32 * 0.35;
            offsets.insert(
                *idx,
                Vec2::new(ring_radius * angle.cos(), ring_radius * angle.sin()),
            );
        }
    }
    offsets
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "pokemon_nodes": [{"name": "Squirtle"}, {"name": "Bulbasaur"}],
        "type_nodes": [{"name": "Water"}],
        "pokemon_type_edges": [{"from_pokemon": "Squirtle", "to_type": "Water"}],
        "mentions_edges": [{"from_media_id": "audio-7", "to_pokemon": "Squirtle"}]
    }"#;

    #[test]
    fn ring_layout_places_kinds_on_separate_rings() {
        let snapshot = GraphSnapshot::parse(SAMPLE).unwrap();
        let offsets = ring_layout(&snapshot, 100.0);
        assert_eq!(offsets.len(), snapshot.node_count());

        let pokemon = offsets[&snapshot.find("Squirtle").unwrap()];
        let kind = offsets[&snapshot.find("Water").unwrap()];
        let media = offsets[&snapshot.find("audio-7").unwrap()];
        assert!((pokemon.length() - 45.0).abs() < 0.01);
        assert!((kind.length() - 75.0).abs() < 0.01);
        assert!((media.length() - 100.0).abs() < 0.01);
    }

    #[test]
    fn ring_layout_is_stable_by_name() {
        let snapshot = GraphSnapshot::parse(SAMPLE).unwrap();
        let first = ring_layout(&snapshot, 80.0);
        let bulbasaur = first[&snapshot.find("Bulbasaur").unwrap()];
        // Alphabetically first on the pokemon ring, so angle zero.
        assert!((bulbasaur.x - 36.0).abs() < 0.01);
        assert!(bulbasaur.y.abs() < 0.01);
    }

    #[test]
    fn missing_graph_file_reads_as_no_data() {
        let err: ragview_core::ClientError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(describe_load_error(&err), "No graph data");
        let err: ragview_core::ClientError =
            ErrorKind::InvalidConfig("graph path is a directory".to_string()).into();
        assert!(describe_load_error(&err).starts_with("Graph unavailable"));
    }
}
