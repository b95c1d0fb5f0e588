use eframe::egui::Pos2;

use crate::fleet::{Entity, GeoPoint};

use super::markers::MarkerHandle;
use super::projection::Projection;

pub const CLUSTER_DISTANCE_PX: f32 = 28.0;

pub type ClusterId = usize;

#[derive(Clone, Debug)]
pub struct Cluster {
    pub id: ClusterId,
    pub members: Vec<Entity>,
    pub centroid_geo: GeoPoint,
    pub centroid_screen: Pos2,
    pub marker: Option<MarkerHandle>,
    lon_sum: f64,
    lat_sum: f64,
}

impl Cluster {
    fn seed(id: ClusterId, entity: Entity, geo: GeoPoint, screen: Pos2) -> Self {
        Self {
            id,
            members: vec![entity],
            centroid_geo: geo,
            centroid_screen: screen,
            marker: None,
            lon_sum: geo.lon,
            lat_sum: geo.lat,
        }
    }

    fn absorb(&mut self, entity: Entity, geo: GeoPoint, projection: &dyn Projection) {
        self.members.push(entity);
        self.lon_sum += geo.lon;
        self.lat_sum += geo.lat;
        let count = self.members.len() as f64;
        self.centroid_geo = GeoPoint::new(self.lon_sum / count, self.lat_sum / count);
        self.centroid_screen = projection.project(self.centroid_geo);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }
}

/// Greedy single-pass grouping in screen space.
///
/// Each located entity joins the first cluster, in creation order, whose
/// current centroid lies within `radius_px`; otherwise it seeds a new one.
/// Centroids move as members are added and earlier members are never
/// re-evaluated, so the result depends on input order.
pub fn cluster(entities: &[Entity], projection: &dyn Projection, radius_px: f32) -> Vec<Cluster> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for entity in entities {
        let Some(geo) = entity.position() else {
            continue;
        };
        let screen = projection.project(geo);

        match clusters
            .iter_mut()
            .find(|cluster| cluster.centroid_screen.distance(screen) <= radius_px)
        {
            Some(cluster) => cluster.absorb(entity.clone(), geo, projection),
            None => {
                let id = clusters.len();
                clusters.push(Cluster::seed(id, entity.clone(), geo, screen));
            }
        }
    }

    clusters
}

#[cfg(test)]
pub(super) mod tests {
    use eframe::egui::{Pos2, pos2};

    use super::*;

    /// One degree of longitude or latitude per pixel, y growing downwards.
    pub(in crate::map) struct PixelProjection;

    impl Projection for PixelProjection {
        fn project(&self, geo: GeoPoint) -> Pos2 {
            pos2(geo.lon as f32, -geo.lat as f32)
        }

        fn unproject(&self, screen: Pos2) -> GeoPoint {
            GeoPoint::new(f64::from(screen.x), -f64::from(screen.y))
        }
    }

    pub(in crate::map) fn vehicle(id: &str, x: f64, y: f64) -> Entity {
        Entity {
            id: id.to_owned(),
            longitude: Some(x),
            latitude: Some(-y),
            ..Default::default()
        }
    }

    fn ids(cluster: &Cluster) -> Vec<&str> {
        cluster.members.iter().map(|entity| entity.id.as_str()).collect()
    }

    #[test]
    fn near_pair_clusters_and_far_entity_stays_single() {
        let entities = vec![
            vehicle("a", 100.0, 100.0),
            vehicle("b", 110.0, 100.0),
            vehicle("c", 300.0, 100.0),
        ];

        let clusters = cluster(&entities, &PixelProjection, CLUSTER_DISTANCE_PX);
        assert_eq!(clusters.len(), 2);
        assert_eq!(ids(&clusters[0]), ["a", "b"]);
        assert!(clusters[1].is_single());
        assert_eq!(ids(&clusters[1]), ["c"]);
        assert_eq!(clusters[0].centroid_screen, pos2(105.0, 100.0));
    }

    #[test]
    fn entities_without_coordinates_are_skipped() {
        let mut missing = vehicle("ghost", 0.0, 0.0);
        missing.latitude = None;
        let entities = vec![missing, vehicle("a", 0.0, 0.0)];

        let clusters = cluster(&entities, &PixelProjection, CLUSTER_DISTANCE_PX);
        assert_eq!(clusters.len(), 1);
        assert_eq!(ids(&clusters[0]), ["a"]);
        assert_eq!(clusters[0].id, 0);
    }

    #[test]
    fn first_qualifying_cluster_wins() {
        let entities = vec![
            vehicle("left", 0.0, 0.0),
            vehicle("right", 40.0, 0.0),
            vehicle("middle", 20.0, 0.0),
        ];

        let clusters = cluster(&entities, &PixelProjection, CLUSTER_DISTANCE_PX);
        assert_eq!(clusters.len(), 2);
        assert_eq!(ids(&clusters[0]), ["left", "middle"]);
        assert_eq!(ids(&clusters[1]), ["right"]);
    }

    #[test]
    fn centroid_is_running_mean() {
        let entities = vec![
            vehicle("a", 0.0, 0.0),
            vehicle("b", 20.0, 0.0),
            vehicle("c", 10.0, 15.0),
        ];

        let clusters = cluster(&entities, &PixelProjection, CLUSTER_DISTANCE_PX);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].centroid_screen, pos2(10.0, 5.0));
        assert_eq!(clusters[0].centroid_geo, GeoPoint::new(10.0, -5.0));
    }

    #[test]
    fn drift_does_not_evict_early_members() {
        // The centroid walks right as members arrive; "a" ends up outside the
        // radius of the final centroid but stays in the cluster.
        let entities = vec![
            vehicle("a", 0.0, 0.0),
            vehicle("b", 27.0, 0.0),
            vehicle("c", 40.0, 0.0),
            vehicle("d", 50.0, 0.0),
        ];

        let clusters = cluster(&entities, &PixelProjection, CLUSTER_DISTANCE_PX);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 4);
        let a = clusters[0].centroid_screen.distance(pos2(0.0, 0.0));
        assert!(a > CLUSTER_DISTANCE_PX);
    }

    #[test]
    fn members_were_within_radius_when_they_joined() {
        let entities = (0..40)
            .map(|index| {
                let x = f64::from((index * 37) % 200);
                let y = f64::from((index * 53) % 150);
                vehicle(&format!("v{index}"), x, y)
            })
            .collect::<Vec<_>>();

        // Replay the incremental definition member by member.
        let clusters = cluster(&entities, &PixelProjection, CLUSTER_DISTANCE_PX);
        for cluster in &clusters {
            let mut sum = (0.0, 0.0);
            for (count, member) in cluster.members.iter().enumerate() {
                let Some(geo) = member.position() else {
                    panic!("clustered entity without position");
                };
                let screen = PixelProjection.project(geo);
                if count > 0 {
                    let centroid = PixelProjection.project(GeoPoint::new(
                        sum.0 / count as f64,
                        sum.1 / count as f64,
                    ));
                    assert!(centroid.distance(screen) <= CLUSTER_DISTANCE_PX);
                }
                sum.0 += geo.lon;
                sum.1 += geo.lat;
            }
        }

        let total = clusters.iter().map(Cluster::len).sum::<usize>();
        assert_eq!(total, entities.len());
    }

    #[test]
    fn clustering_is_deterministic() {
        let entities = (0..25)
            .map(|index| vehicle(&format!("v{index}"), f64::from(index * 9), f64::from(index % 4)))
            .collect::<Vec<_>>();

        let first = cluster(&entities, &PixelProjection, CLUSTER_DISTANCE_PX);
        let second = cluster(&entities, &PixelProjection, CLUSTER_DISTANCE_PX);
        let groups = |clusters: &[Cluster]| {
            clusters
                .iter()
                .map(|cluster| ids(cluster).join(","))
                .collect::<Vec<_>>()
        };
        assert_eq!(groups(&first), groups(&second));
    }
}
