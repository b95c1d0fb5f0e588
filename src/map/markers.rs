use std::collections::{BTreeMap, BTreeSet};

use eframe::egui::Pos2;

use crate::fleet::{Entity, GeoPoint};
use crate::layout::spider_layout;

use super::cluster::{Cluster, ClusterId};
use super::projection::Projection;

pub const ENTITY_MARKER_RADIUS: f32 = 8.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerHandle(u64);

#[derive(Clone, Debug)]
pub enum MarkerKind {
    Entity(Entity),
    Cluster { cluster: ClusterId, count: usize },
    Spider { entity: Entity, anchor: GeoPoint },
}

/// What a click on a marker does.
#[derive(Clone, Debug, PartialEq)]
pub enum MarkerAction {
    TogglePopup(Entity),
    ToggleSpiderfy(ClusterId),
}

#[derive(Clone, Debug)]
pub struct Marker {
    pub position: GeoPoint,
    pub kind: MarkerKind,
    pub visible: bool,
}

impl Marker {
    pub fn action(&self) -> MarkerAction {
        match &self.kind {
            MarkerKind::Entity(entity) | MarkerKind::Spider { entity, .. } => {
                MarkerAction::TogglePopup(entity.clone())
            }
            MarkerKind::Cluster { cluster, .. } => MarkerAction::ToggleSpiderfy(*cluster),
        }
    }

    pub fn screen_radius(&self) -> f32 {
        match &self.kind {
            MarkerKind::Entity(_) | MarkerKind::Spider { .. } => ENTITY_MARKER_RADIUS,
            MarkerKind::Cluster { count, .. } => {
                (12.0 + (*count as f32).log2() * 3.0).clamp(14.0, 30.0)
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct Popup {
    pub entity: Entity,
    pub marker: MarkerHandle,
    pub position: GeoPoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickTarget {
    Marker(MarkerHandle),
    Popup,
    Map,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapGesture {
    MoveStart,
    ZoomStart,
    DragStart,
    Click(ClickTarget),
}

/// Which popup and which expanded cluster are open, plus the handles the
/// layer currently owns. Only [`MarkerLayer`] writes to it.
#[derive(Debug, Default)]
pub struct InteractionState {
    open_popup_entity_id: Option<String>,
    open_cluster_id: Option<ClusterId>,
    rendered_single_markers: BTreeSet<MarkerHandle>,
    rendered_spider_markers: BTreeSet<MarkerHandle>,
}

impl InteractionState {
    pub fn open_popup_entity_id(&self) -> Option<&str> {
        self.open_popup_entity_id.as_deref()
    }

    pub fn open_cluster_id(&self) -> Option<ClusterId> {
        self.open_cluster_id
    }

    pub fn rendered_single_markers(&self) -> &BTreeSet<MarkerHandle> {
        &self.rendered_single_markers
    }

    pub fn rendered_spider_markers(&self) -> &BTreeSet<MarkerHandle> {
        &self.rendered_spider_markers
    }

    /// True while the user is looking at a popup or an expanded cluster.
    pub fn is_engaged(&self) -> bool {
        self.open_popup_entity_id.is_some() || self.open_cluster_id.is_some()
    }
}

/// Owns every marker on the map and the open popup / spiderfy state.
#[derive(Debug, Default)]
pub struct MarkerLayer {
    markers: BTreeMap<MarkerHandle, Marker>,
    next_handle: u64,
    clusters: Vec<Cluster>,
    popup: Option<Popup>,
    spider_origin: Option<MarkerHandle>,
    state: InteractionState,
    gestures_attached: bool,
}

impl MarkerLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.state
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn clusters(&self) -> &[Cluster] {
        &self.clusters
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<&Marker> {
        self.markers.get(&handle)
    }

    pub fn markers(&self) -> impl Iterator<Item = (MarkerHandle, &Marker)> {
        self.markers.iter().map(|(handle, marker)| (*handle, marker))
    }

    pub fn visible_markers(&self) -> impl Iterator<Item = (MarkerHandle, &Marker)> {
        self.markers().filter(|(_, marker)| marker.visible)
    }

    fn add_marker(&mut self, position: GeoPoint, kind: MarkerKind) -> MarkerHandle {
        let handle = MarkerHandle(self.next_handle);
        self.next_handle += 1;
        self.markers.insert(
            handle,
            Marker {
                position,
                kind,
                visible: true,
            },
        );
        handle
    }

    /// Replaces the single and cluster markers with `clusters`.
    ///
    /// An expanded cluster and an open popup are left as they are; callers
    /// are expected not to re-render while either is open.
    pub fn render_snapshot(&mut self, mut clusters: Vec<Cluster>) {
        for handle in std::mem::take(&mut self.state.rendered_single_markers) {
            self.markers.remove(&handle);
        }

        for cluster in &mut clusters {
            let handle = if cluster.is_single() {
                let entity = cluster.members[0].clone();
                self.add_marker(cluster.centroid_geo, MarkerKind::Entity(entity))
            } else {
                self.add_marker(
                    cluster.centroid_geo,
                    MarkerKind::Cluster {
                        cluster: cluster.id,
                        count: cluster.len(),
                    },
                )
            };
            cluster.marker = Some(handle);
            self.state.rendered_single_markers.insert(handle);
        }

        self.clusters = clusters;
    }

    /// Opens the popup for `entity` on `marker`, closing any other popup first.
    pub fn open_popup(&mut self, entity: &Entity, marker: MarkerHandle) {
        if self.popup.is_some() {
            self.close_popup();
        }

        let Some(position) = self
            .markers
            .get(&marker)
            .map(|marker| marker.position)
            .or_else(|| entity.position())
        else {
            log::warn!("cannot open popup for {}: no position", entity.id);
            return;
        };

        self.popup = Some(Popup {
            entity: entity.clone(),
            marker,
            position,
        });
        self.state.open_popup_entity_id = Some(entity.id.clone());
    }

    pub fn close_popup(&mut self) {
        self.popup = None;
        self.state.open_popup_entity_id = None;
    }

    /// Expands the cluster into a ring of member markers, or collapses it if
    /// it is the one already expanded.
    pub fn toggle_spiderfy(&mut self, cluster_id: ClusterId, projection: &dyn Projection) {
        if self.state.open_cluster_id == Some(cluster_id) {
            self.close_spiderfy();
            return;
        }

        self.close_spiderfy();

        let Some(cluster) = self
            .clusters
            .iter()
            .find(|cluster| cluster.id == cluster_id)
        else {
            log::warn!("spiderfy requested for unknown cluster {cluster_id}");
            return;
        };
        if cluster.is_single() {
            return;
        }

        let glyph = cluster.marker;
        let anchor_geo = glyph
            .and_then(|handle| self.markers.get(&handle))
            .map(|marker| marker.position)
            .unwrap_or(cluster.centroid_geo);
        let anchor: Pos2 = projection.project(anchor_geo);
        let offsets = spider_layout(cluster.len());
        let members = cluster.members.clone();

        if let Some(marker) = glyph.and_then(|handle| self.markers.get_mut(&handle)) {
            marker.visible = false;
        }
        self.spider_origin = glyph;

        for (entity, offset) in members.into_iter().zip(offsets) {
            let position = projection.unproject(anchor + offset);
            let handle = self.add_marker(
                position,
                MarkerKind::Spider {
                    entity,
                    anchor: anchor_geo,
                },
            );
            self.state.rendered_spider_markers.insert(handle);
        }

        log::debug!(
            "expanded cluster {cluster_id} into {} markers",
            self.state.rendered_spider_markers.len()
        );
        self.state.open_cluster_id = Some(cluster_id);
    }

    pub fn close_spiderfy(&mut self) {
        for handle in std::mem::take(&mut self.state.rendered_spider_markers) {
            self.markers.remove(&handle);
        }

        if let Some(origin) = self.spider_origin.take()
            && let Some(marker) = self.markers.get_mut(&origin)
        {
            marker.visible = true;
        }

        if let Some(cluster_id) = self.state.open_cluster_id.take() {
            log::debug!("collapsed cluster {cluster_id}");
        }
    }

    pub fn handle_marker_click(&mut self, handle: MarkerHandle, projection: &dyn Projection) {
        let Some(action) = self.markers.get(&handle).map(Marker::action) else {
            return;
        };

        match action {
            MarkerAction::TogglePopup(entity) => {
                if self.state.open_popup_entity_id.as_deref() == Some(entity.id.as_str()) {
                    self.close_popup();
                } else {
                    self.open_popup(&entity, handle);
                }
            }
            MarkerAction::ToggleSpiderfy(cluster_id) => {
                self.toggle_spiderfy(cluster_id, projection);
            }
        }
    }

    /// Enables the map-wide close-on-gesture handler. Returns false if it was
    /// already attached.
    pub fn attach_gesture_handler(&mut self) -> bool {
        if self.gestures_attached {
            return false;
        }
        self.gestures_attached = true;
        true
    }

    pub fn handle_gesture(&mut self, gesture: MapGesture) {
        if !self.gestures_attached {
            return;
        }

        match gesture {
            MapGesture::MoveStart
            | MapGesture::ZoomStart
            | MapGesture::DragStart
            | MapGesture::Click(ClickTarget::Map) => {
                self.close_popup();
                self.close_spiderfy();
            }
            MapGesture::Click(ClickTarget::Marker(_) | ClickTarget::Popup) => {}
        }
    }

    /// Topmost visible marker under `pointer`, nearest centre wins.
    pub fn hit_test(&self, projection: &dyn Projection, pointer: Pos2) -> Option<MarkerHandle> {
        self.visible_markers()
            .filter_map(|(handle, marker)| {
                let distance = projection.project(marker.position).distance(pointer);
                if distance <= marker.screen_radius() {
                    Some((handle, distance))
                } else {
                    None
                }
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(handle, _)| handle)
    }
}
