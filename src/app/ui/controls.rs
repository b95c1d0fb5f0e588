use eframe::egui::{self, RichText, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use crate::fleet::Entity;
use crate::map::{MapGesture, RefreshOutcome};

use super::super::ViewModel;

const SEARCH_RESULT_LIMIT: usize = 40;
const FOCUS_MIN_ZOOM: f64 = 16.0;

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}

/// Vehicle ids matching `query`, best match first.
pub(in crate::app) fn search_vehicles<'a>(entities: &'a [Entity], query: &str) -> Vec<&'a Entity> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }

    let matcher = SkimMatcherV2::default();
    let mut scored = entities
        .iter()
        .filter_map(|entity| {
            fuzzy_match_score(&matcher, &entity.id, query).map(|score| (score, entity))
        })
        .collect::<Vec<_>>();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.id.cmp(&b.1.id)));
    scored.truncate(SEARCH_RESULT_LIMIT);
    scored.into_iter().map(|(_, entity)| entity).collect()
}

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Live vehicles");
        ui.add_space(6.0);

        let paused = self.layer.interaction().is_engaged();
        let refresh_button = ui
            .add_enabled(
                !paused && !self.refresher.is_fetching(),
                egui::Button::new("Refresh now"),
            )
            .on_disabled_hover_text("Close the open popup or cluster to resume updates.");
        if refresh_button.clicked() {
            self.refresher.request_now();
        }

        if let Some(outcome) = &self.last_outcome {
            let text = match outcome {
                RefreshOutcome::Applied { located, clusters, .. } => {
                    format!("last refresh: {located} on map in {clusters} groups")
                }
                RefreshOutcome::Failed(_) => {
                    "last refresh: failed, keeping previous view".to_owned()
                }
                RefreshOutcome::Discarded => "last refresh: dropped while interacting".to_owned(),
            };
            ui.small(text);
        }

        let interaction = self.layer.interaction();
        ui.small(format!(
            "{} markers on map",
            interaction.rendered_single_markers().len()
        ));
        if let Some(cluster) = interaction.open_cluster_id() {
            ui.small(format!(
                "group #{cluster} expanded into {} vehicles",
                interaction.rendered_spider_markers().len()
            ));
        }
        if let Some(id) = interaction.open_popup_entity_id() {
            ui.small(format!("showing details for {id}"));
        }

        ui.separator();

        let radius_slider = ui
            .add(
                egui::Slider::new(&mut self.cluster_radius_px, 8.0..=96.0)
                    .text("Cluster radius (px)")
                    .clamping(egui::SliderClamping::Always),
            )
            .on_hover_text("Markers closer than this on screen are grouped.");
        if radius_slider.changed() {
            self.refresher.set_radius_px(self.cluster_radius_px);
            self.view_dirty = true;
        }

        ui.separator();
        ui.label(RichText::new("Find vehicle").strong());
        ui.text_edit_singleline(&mut self.search);

        let Some(snapshot) = self.refresher.last_snapshot() else {
            return;
        };
        let results = search_vehicles(&snapshot.entities, &self.search)
            .into_iter()
            .map(|entity| (entity.id.clone(), entity.position().is_some()))
            .collect::<Vec<_>>();

        let mut focus = None;
        egui::ScrollArea::vertical()
            .id_salt("vehicle_search_results")
            .show(ui, |ui| {
                for (id, located) in &results {
                    let response =
                        ui.add_enabled(*located, egui::Button::selectable(false, id.as_str()));
                    if response.clicked() {
                        focus = Some(id.clone());
                    }
                }
            });

        if let Some(id) = focus {
            self.focus_vehicle(&id);
        }
    }

    fn focus_vehicle(&mut self, id: &str) {
        let Some(position) = self
            .refresher
            .last_snapshot()
            .and_then(|snapshot| snapshot.find(id))
            .and_then(Entity::position)
        else {
            return;
        };

        self.layer.handle_gesture(MapGesture::MoveStart);
        self.center = position;
        self.zoom = self.zoom.max(FOCUS_MIN_ZOOM);
        self.view_dirty = true;
    }
}
