//! Native flow viewer
//!
//! Polls a flowviz-web server for integration documents, runs the
//! build -> layout -> bounds pipeline on every data or selection change,
//! and renders the result in the canvas widget. Stand and integration
//! selection live in the side panel.

use std::sync::{mpsc, Arc};
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowviz::graph::{build_flow_graph, LayoutDirection};
use flowviz::loader::{DocumentPoller, HttpSource, PollHandle};
use flowviz::model::Integration;
use flowviz_canvas::api::ApiClient;
use flowviz_canvas::FlowCanvas;

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowviz=info,flowviz_canvas=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server =
        std::env::var("FLOWVIZ_SERVER").unwrap_or_else(|_| "http://localhost:3001".to_string());

    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let api = ApiClient::new(&server);
    let stands = runtime.block_on(api.get_stands()).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "stand listing failed, falling back to IFT");
        vec!["IFT".to_string()]
    });

    let mut app = ViewerApp::new(runtime, server, stands);
    app.start_polling();

    eframe::run_native(
        "flowviz",
        eframe::NativeOptions::default(),
        Box::new(|_cc| Ok(Box::new(app))),
    )
}

struct ViewerApp {
    runtime: tokio::runtime::Runtime,
    server: String,
    stands: Vec<String>,
    current_stand: usize,
    integrations: Vec<Integration>,
    selected_flow: Option<String>,
    selected_node: Option<String>,
    canvas: FlowCanvas,
    rx: Option<mpsc::Receiver<Vec<Integration>>>,
    poll_handle: Option<PollHandle>,
}

impl ViewerApp {
    fn new(runtime: tokio::runtime::Runtime, server: String, stands: Vec<String>) -> Self {
        Self {
            runtime,
            server,
            stands,
            current_stand: 0,
            integrations: Vec::new(),
            selected_flow: None,
            selected_node: None,
            canvas: FlowCanvas::new(),
            rx: None,
            poll_handle: None,
        }
    }

    /// (Re)start the polling loop for the current stand
    fn start_polling(&mut self) {
        if let Some(handle) = self.poll_handle.take() {
            handle.stop();
        }
        let Some(stand) = self.stands.get(self.current_stand) else {
            return;
        };

        let (tx, rx) = mpsc::channel();
        let source = Arc::new(HttpSource::new(self.server.as_str(), stand.as_str()));
        let _guard = self.runtime.enter();
        let handle = DocumentPoller::new(source).spawn(move |snapshot| {
            let _ = tx.send(snapshot);
        });

        self.rx = Some(rx);
        self.poll_handle = Some(handle);
        self.integrations.clear();
        self.canvas.clear();
    }

    /// Drain poll results; the newest snapshot wins
    fn drain_updates(&mut self) -> bool {
        let mut latest = None;
        if let Some(rx) = &self.rx {
            while let Ok(snapshot) = rx.try_recv() {
                latest = Some(snapshot);
            }
        }
        let Some(snapshot) = latest else {
            return false;
        };

        self.integrations = snapshot;
        // Keep the selected flow across reloads when it still exists
        let still_there = self
            .selected_flow
            .as_ref()
            .map(|f| self.integrations.iter().any(|i| &i.flow_name == f))
            .unwrap_or(false);
        if !still_there {
            self.selected_flow = self.integrations.first().map(|i| i.flow_name.clone());
            self.selected_node = None;
        }
        true
    }

    /// Re-run the full pipeline for the selected integration
    fn rebuild(&mut self) {
        let Some(integration) = self
            .selected_flow
            .as_ref()
            .and_then(|f| self.integrations.iter().find(|i| &i.flow_name == f))
        else {
            self.canvas.clear();
            return;
        };
        let graph = build_flow_graph(
            integration,
            self.selected_node.as_deref(),
            LayoutDirection::LeftToRight,
        );
        self.canvas.set_graph(graph);
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut dirty = self.drain_updates();

        egui::SidePanel::left("integrations")
            .default_width(280.0)
            .show(ctx, |ui| {
                ui.heading("Integration flows");
                ui.separator();

                // Stand selector
                let mut stand_changed = false;
                egui::ComboBox::from_label("Stand")
                    .selected_text(
                        self.stands
                            .get(self.current_stand)
                            .cloned()
                            .unwrap_or_default(),
                    )
                    .show_ui(ui, |ui| {
                        for (i, stand) in self.stands.iter().enumerate() {
                            if ui
                                .selectable_value(&mut self.current_stand, i, stand)
                                .changed()
                            {
                                stand_changed = true;
                            }
                        }
                    });
                if stand_changed {
                    self.selected_flow = None;
                    self.selected_node = None;
                    self.start_polling();
                }

                ui.separator();
                for integration in &self.integrations {
                    let is_selected = self.selected_flow.as_deref()
                        == Some(integration.flow_name.as_str());
                    if ui
                        .selectable_label(is_selected, &integration.name)
                        .clicked()
                    {
                        self.selected_flow = Some(integration.flow_name.clone());
                        self.selected_node = None;
                        dirty = true;
                    }
                    if let Some(description) = &integration.description {
                        ui.small(description.as_str());
                    }
                }

                if let Some(selected) = &self.selected_node {
                    ui.separator();
                    ui.label(format!("Selected: {}", selected));
                }
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            if let Some(change) = self.canvas.take_selection_change() {
                self.selected_node = change;
                dirty = true;
            }
            if dirty {
                self.rebuild();
            }
            self.canvas.ui(ui);
        });

        // Poll results arrive without input events; wake up regularly
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}
