use bevy::prelude::*;
use rstar::{PointDistance, RTree};

use crate::config::MapConfig;
use crate::geojson::ParsedFeed;
use crate::types::{MarkerHit, PlateBoundary, Quake};

use super::{
    FeedKind, FeedPayload, FeedPipeline, FeedReceiver, FeedRequest, FeedWorker, FeedWorkerPlugin,
};

pub struct QuakePlugin;

impl Plugin for QuakePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(FeedWorkerPlugin)
            .init_resource::<FeedPipeline>()
            .init_resource::<QuakeLayer>()
            .init_resource::<PlateLayer>()
            .init_resource::<OverlayVisibility>()
            .add_event::<ReloadFeeds>()
            .add_systems(Startup, (setup_overlay_groups, start_feeds))
            .add_systems(
                Update,
                (handle_reload, read_feed_receiver, apply_overlay_visibility).chain(),
            );
    }
}

/// Parent entity of one overlay; hiding it hides every marker or line below it.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayGroup(pub FeedKind);

#[derive(Resource, Debug, Clone, PartialEq)]
pub struct OverlayVisibility {
    pub earthquakes: bool,
    pub plates: bool,
    /// Shown once the first batch of earthquakes is on the map.
    pub legend: bool,
}

impl Default for OverlayVisibility {
    fn default() -> Self {
        Self {
            earthquakes: true,
            plates: true,
            legend: false,
        }
    }
}

impl OverlayVisibility {
    pub fn is_visible(&self, kind: FeedKind) -> bool {
        match kind {
            FeedKind::Earthquakes => self.earthquakes,
            FeedKind::Plates => self.plates,
        }
    }
}

#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ReloadFeeds;

#[derive(Resource, Default)]
pub struct QuakeLayer {
    pub quakes: Vec<Quake>,
    pub skipped: usize,
    index: RTree<MarkerHit>,
    max_radius: f32,
    pub respawn: bool,
}

impl QuakeLayer {
    pub fn replace(&mut self, parsed: ParsedFeed<Quake>) {
        self.quakes = parsed.items;
        self.skipped = parsed.skipped;
        self.index = RTree::new();
        self.max_radius = 0.0;
        self.respawn = true;
    }

    pub fn clear(&mut self) {
        self.replace(ParsedFeed {
            items: Vec::new(),
            skipped: 0,
        });
    }

    pub fn set_markers(&mut self, hits: Vec<MarkerHit>) {
        self.max_radius = hits.iter().map(|h| h.radius).fold(0.0, f32::max);
        self.index = RTree::bulk_load(hits);
    }

    pub fn marker_count(&self) -> usize {
        self.index.size()
    }

    /// Topmost marker under `point` (world units) at the given camera scale.
    pub fn pick(&self, point: Vec2, scale: f32) -> Option<MarkerHit> {
        let point = [point.x, point.y];
        let reach = self.max_radius * scale;
        self.index
            .locate_within_distance(point, reach * reach)
            .filter(|hit| {
                let r = hit.radius * scale;
                hit.distance_2(&point) <= r * r
            })
            .max_by(|a, b| a.z.total_cmp(&b.z))
            .copied()
    }
}

#[derive(Resource, Default)]
pub struct PlateLayer {
    pub plates: Vec<PlateBoundary>,
    pub skipped: usize,
    pub respawn: bool,
}

impl PlateLayer {
    pub fn replace(&mut self, parsed: ParsedFeed<PlateBoundary>) {
        self.plates = parsed.items;
        self.skipped = parsed.skipped;
        self.respawn = true;
    }

    pub fn clear(&mut self) {
        self.plates.clear();
        self.skipped = 0;
        self.respawn = true;
    }
}

fn setup_overlay_groups(mut commands: Commands) {
    for kind in [FeedKind::Plates, FeedKind::Earthquakes] {
        commands.spawn((
            OverlayGroup(kind),
            Name::new(format!("{} overlay", kind)),
            Transform::default(),
            Visibility::default(),
        ));
    }
}

fn start_feeds(
    mut pipeline: ResMut<FeedPipeline>,
    worker: Res<FeedWorker>,
    config: Res<MapConfig>,
) {
    let (generation, kind) = pipeline.start();
    worker.queue_request(FeedRequest {
        generation,
        kind,
        url: config.earthquake_feed_url.clone(),
    });
}

/// Queues the plate feed once it is due. Returns whether a request went out.
pub fn request_plates(
    pipeline: &mut FeedPipeline,
    worker: &FeedWorker,
    config: &MapConfig,
) -> bool {
    let Some((generation, kind)) = pipeline.on_quakes_rendered() else {
        return false;
    };
    worker.queue_request(FeedRequest {
        generation,
        kind,
        url: config.plate_feed_url.clone(),
    });
    true
}

fn handle_reload(
    mut reload: EventReader<ReloadFeeds>,
    mut pipeline: ResMut<FeedPipeline>,
    mut quakes: ResMut<QuakeLayer>,
    mut plates: ResMut<PlateLayer>,
    mut overlays: ResMut<OverlayVisibility>,
    worker: Res<FeedWorker>,
    config: Res<MapConfig>,
) {
    if reload.is_empty() {
        return;
    }
    reload.clear();

    info!("Reloading feeds");
    quakes.clear();
    plates.clear();
    overlays.legend = false;
    let (generation, kind) = pipeline.start();
    worker.queue_request(FeedRequest {
        generation,
        kind,
        url: config.earthquake_feed_url.clone(),
    });
}

fn read_feed_receiver(
    receiver: Res<FeedReceiver>,
    mut pipeline: ResMut<FeedPipeline>,
    mut quakes: ResMut<QuakeLayer>,
    mut plates: ResMut<PlateLayer>,
) {
    while let Ok(message) = receiver.try_recv() {
        match message.result {
            Ok(payload) => {
                if !pipeline.on_loaded(message.generation, message.kind) {
                    debug!("Dropping stale {} result", message.kind);
                    continue;
                }
                match payload {
                    FeedPayload::Quakes(parsed) => {
                        info!(
                            "Loaded {} earthquakes ({} skipped)",
                            parsed.items.len(),
                            parsed.skipped
                        );
                        quakes.replace(parsed);
                    }
                    FeedPayload::Plates(parsed) => {
                        info!(
                            "Loaded {} plate boundaries ({} skipped)",
                            parsed.items.len(),
                            parsed.skipped
                        );
                        plates.replace(parsed);
                    }
                }
            }
            Err(e) => {
                error!("Failed to load {}: {}", message.kind, e);
                pipeline.on_failed(message.generation, message.kind, e.to_string());
            }
        }
    }
}

fn apply_overlay_visibility(
    overlays: Res<OverlayVisibility>,
    mut groups: Query<(&OverlayGroup, &mut Visibility)>,
) {
    if !overlays.is_changed() {
        return;
    }
    for (group, mut visibility) in groups.iter_mut() {
        *visibility = if overlays.is_visible(group.0) {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        };
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::{event::Events, system::RunSystemOnce};

    use super::*;
    use crate::config::EARTHQUAKE_FEED_URL;
    use crate::quakes::{FeedClient, FeedStage};

    fn hit(index: usize, x: f32, radius: f32, z: f32) -> MarkerHit {
        MarkerHit {
            index,
            position: [x, 0.0],
            radius,
            z,
        }
    }

    #[test]
    fn pick_prefers_the_marker_on_top() {
        let mut layer = QuakeLayer::default();
        layer.set_markers(vec![hit(0, 0.0, 20.0, 2.1), hit(1, 5.0, 4.0, 2.5)]);
        assert_eq!(layer.pick(Vec2::new(4.0, 0.0), 1.0).map(|h| h.index), Some(1));
        assert_eq!(layer.pick(Vec2::new(-10.0, 0.0), 1.0).map(|h| h.index), Some(0));
        assert_eq!(layer.pick(Vec2::new(30.0, 0.0), 1.0), None);
    }

    #[test]
    fn pick_radius_follows_camera_scale() {
        let mut layer = QuakeLayer::default();
        layer.set_markers(vec![hit(0, 0.0, 10.0, 2.0)]);
        // Zoomed in four times: a 10 px marker spans 2.5 world units.
        assert!(layer.pick(Vec2::new(2.0, 0.0), 0.25).is_some());
        assert!(layer.pick(Vec2::new(3.0, 0.0), 0.25).is_none());
    }

    #[test]
    fn replacing_quakes_clears_the_index() {
        let mut layer = QuakeLayer::default();
        layer.set_markers(vec![hit(0, 0.0, 10.0, 2.0)]);
        layer.clear();
        assert!(layer.respawn);
        assert_eq!(layer.marker_count(), 0);
        assert_eq!(layer.pick(Vec2::ZERO, 1.0), None);
    }

    #[test]
    fn overlay_toggles_are_independent() {
        let mut overlays = OverlayVisibility::default();
        overlays.plates = false;
        assert!(overlays.is_visible(FeedKind::Earthquakes));
        assert!(!overlays.is_visible(FeedKind::Plates));
    }

    fn quake(magnitude: f64) -> Quake {
        Quake {
            id: None,
            magnitude: Some(magnitude),
            place: None,
            time_ms: None,
            longitude: 0.0,
            latitude: 10.0,
            depth_km: Some(20.0),
        }
    }

    fn feed_world() -> World {
        let mut world = World::new();
        let config = MapConfig::default();
        let (worker, receiver) = FeedWorker::new(FeedClient::from_config(&config), 1);
        world.insert_resource(config);
        world.insert_resource(worker);
        world.insert_resource(receiver);
        world.init_resource::<FeedPipeline>();
        world.init_resource::<QuakeLayer>();
        world.init_resource::<PlateLayer>();
        world.init_resource::<OverlayVisibility>();
        world.init_resource::<Events<ReloadFeeds>>();
        world
    }

    #[test]
    fn reload_clears_both_layers_and_requests_quakes_only() {
        let mut world = feed_world();
        {
            let mut pipeline = world.resource_mut::<FeedPipeline>();
            let (generation, _) = pipeline.start();
            pipeline.on_loaded(generation, FeedKind::Earthquakes);
            pipeline.on_quakes_rendered();
            pipeline.on_loaded(generation, FeedKind::Plates);
            assert_eq!(pipeline.stage(), &FeedStage::Ready);
        }
        world.resource_mut::<QuakeLayer>().replace(ParsedFeed {
            items: vec![quake(5.0)],
            skipped: 1,
        });
        world.resource_mut::<PlateLayer>().replace(ParsedFeed {
            items: vec![PlateBoundary {
                lines: geo::MultiLineString(vec![]),
            }],
            skipped: 0,
        });
        world.resource_mut::<OverlayVisibility>().legend = true;

        // Nothing happens without the event.
        world.run_system_once(handle_reload).unwrap();
        assert!(world.resource::<FeedWorker>().queued().is_empty());
        assert_eq!(world.resource::<QuakeLayer>().quakes.len(), 1);

        world.send_event(ReloadFeeds);
        world.run_system_once(handle_reload).unwrap();

        let quakes = world.resource::<QuakeLayer>();
        assert!(quakes.quakes.is_empty());
        assert_eq!(quakes.skipped, 0);
        assert!(quakes.respawn);
        let plates = world.resource::<PlateLayer>();
        assert!(plates.plates.is_empty());
        assert!(plates.respawn);
        assert!(!world.resource::<OverlayVisibility>().legend);

        let pipeline = world.resource::<FeedPipeline>();
        assert_eq!(pipeline.stage(), &FeedStage::LoadingQuakes);
        assert_eq!(pipeline.generation(), 2);
        assert_eq!(
            world.resource::<FeedWorker>().queued(),
            vec![FeedRequest {
                generation: 2,
                kind: FeedKind::Earthquakes,
                url: EARTHQUAKE_FEED_URL.to_string(),
            }]
        );
    }
}
