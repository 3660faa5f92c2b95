use std::thread;

use bevy::{
    platform::collections::{HashMap, HashSet},
    prelude::*,
    window::PrimaryWindow,
};
use crossbeam_channel::{Receiver, Sender, bounded};

use super::{DecodedTile, TileError, TileFetcher, TilesUiPlugin, tile_to_bevy_image};
use crate::{
    camera::{camera_scale, camera_view_rect},
    config::{BaseLayerConfig, MapConfig},
    types::{Tile, scale_for_zoom, tile_zoom_for_scale, tiles_in_view},
};

const TILE_Z: f32 = 0.0;
const STALE_TILE_Z: f32 = -0.5;
/// Upper bound on tile downloads in flight.
const MAX_PENDING: usize = 32;

pub struct TileMapPlugin;

impl Plugin for TileMapPlugin {
    fn build(&self, app: &mut App) {
        let (tx, rx): (TileSenderType, TileReceiverType) = bounded(MAX_PENDING * 2);
        app.insert_resource(TileReceiver(rx))
            .insert_resource(TileSender(tx))
            .init_resource::<TileMapResources>()
            .add_systems(
                Update,
                (
                    detect_zoom_level,
                    clean_tile_map,
                    spawn_tiles_around_camera,
                    read_tile_map_receiver,
                    despawn_outofrange_tiles,
                )
                    .chain(),
            )
            .add_plugins(TilesUiPlugin);
    }
}

#[derive(Resource)]
pub struct TileMapResources {
    pub layers: Vec<BaseLayerConfig>,
    active_layer: usize,
    /// Tile zoom matching the current camera scale.
    pub zoom: u32,
    /// Bumped whenever the base layer changes so late downloads are discarded.
    generation: u64,
    spawned: HashMap<Tile, Entity>,
    pending: HashSet<Tile>,
    failed: HashSet<Tile>,
    clean: bool,
    fetcher: TileFetcher,
}

impl FromWorld for TileMapResources {
    fn from_world(world: &mut World) -> Self {
        let config = world.resource::<MapConfig>();
        TileMapResources::new(config)
    }
}

impl TileMapResources {
    pub fn new(config: &MapConfig) -> Self {
        Self {
            layers: config.base_layers.clone(),
            active_layer: 0,
            zoom: tile_zoom_for_scale(scale_for_zoom(config.starting_zoom)),
            generation: 0,
            spawned: HashMap::default(),
            pending: HashSet::default(),
            failed: HashSet::default(),
            clean: false,
            fetcher: TileFetcher::new(
                config.request_timeout_secs,
                &config.user_agent,
                config.tile_cache_dir(),
            ),
        }
    }

    pub fn active_layer(&self) -> Option<&BaseLayerConfig> {
        self.layers.get(self.active_layer)
    }

    pub fn active_index(&self) -> usize {
        self.active_layer
    }

    /// Switches base layers. Returns false if `index` is already active or out of range.
    pub fn set_active_layer(&mut self, index: usize) -> bool {
        if index == self.active_layer || index >= self.layers.len() {
            return false;
        }
        info!("Switching base layer to {}", self.layers[index].name);
        self.active_layer = index;
        self.generation += 1;
        self.pending.clear();
        self.failed.clear();
        self.clean = true;
        true
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    fn wants(&self, tile: &Tile) -> bool {
        !self.spawned.contains_key(tile)
            && !self.pending.contains(tile)
            && !self.failed.contains(tile)
    }
}

pub type TileData = (u64, Tile, Result<DecodedTile, TileError>);
pub type TileSenderType = Sender<TileData>;
pub type TileReceiverType = Receiver<TileData>;

#[derive(Resource, Deref)]
pub struct TileReceiver(TileReceiverType);

#[derive(Resource, Deref)]
pub struct TileSender(TileSenderType);

#[derive(Component, Debug, Clone, Copy)]
pub struct TileMarker(pub Tile);

fn detect_zoom_level(
    mut res_manager: ResMut<TileMapResources>,
    camera: Query<&Projection, With<Camera2d>>,
) {
    let Ok(projection) = camera.single() else {
        return;
    };
    let zoom = tile_zoom_for_scale(camera_scale(projection));
    if zoom != res_manager.zoom {
        debug!("Tile zoom {} -> {}", res_manager.zoom, zoom);
        res_manager.zoom = zoom;
        // Anything still downloading for the old zoom will be dropped on arrival.
        res_manager.pending.retain(|tile| tile.zoom == zoom);
    }
}

fn clean_tile_map(
    mut res_manager: ResMut<TileMapResources>,
    mut commands: Commands,
    tiles: Query<Entity, With<TileMarker>>,
) {
    if res_manager.clean {
        res_manager.clean = false;
        for entity in tiles.iter() {
            commands.entity(entity).despawn();
        }
        res_manager.spawned.clear();
    }
}

fn spawn_tiles_around_camera(
    camera: Query<(&Transform, &Projection), With<Camera2d>>,
    q_windows: Query<&Window, With<PrimaryWindow>>,
    tile_sender: Res<TileSender>,
    mut res_manager: ResMut<TileMapResources>,
) {
    let (Ok((transform, projection)), Ok(window)) = (camera.single(), q_windows.single()) else {
        return;
    };
    let Some(template) = res_manager.active_layer().map(|l| l.url_template.clone()) else {
        return;
    };

    let view = camera_view_rect(window, transform, camera_scale(projection));
    let zoom = res_manager.zoom;
    let generation = res_manager.generation;

    for tile in tiles_in_view(view, zoom, 1) {
        if res_manager.pending.len() >= MAX_PENDING {
            break;
        }
        if !res_manager.wants(&tile) {
            continue;
        }
        res_manager.pending.insert(tile);

        let tx = tile_sender.clone();
        let fetcher = res_manager.fetcher.clone();
        let template = template.clone();
        thread::spawn(move || {
            let result = fetcher.fetch(&template, &tile);
            if let Err(e) = tx.send((generation, tile, result)) {
                warn!("Failed to send tile data: {:?}", e.0.1);
            }
        });
    }
}

fn read_tile_map_receiver(
    mut commands: Commands,
    map_receiver: Res<TileReceiver>,
    mut images: ResMut<Assets<Image>>,
    mut res_manager: ResMut<TileMapResources>,
) {
    while let Ok((generation, tile, result)) = map_receiver.try_recv() {
        if generation != res_manager.generation || !res_manager.pending.remove(&tile) {
            continue;
        }
        match result {
            Ok(decoded) => {
                let rect = tile.world_rect();
                let handle = images.add(tile_to_bevy_image(decoded));
                let entity = commands
                    .spawn((
                        Sprite {
                            image: handle,
                            custom_size: Some(rect.size()),
                            ..default()
                        },
                        Transform::from_translation(rect.center().extend(TILE_Z)),
                        TileMarker(tile),
                    ))
                    .id();
                res_manager.spawned.insert(tile, entity);
            }
            Err(e) => {
                warn!("Tile {}/{}/{} unavailable: {}", tile.zoom, tile.x, tile.y, e);
                res_manager.failed.insert(tile);
            }
        }
    }
}

/// Drops tiles that left the view. Tiles from another zoom stay behind the
/// current ones until the current zoom has finished loading.
fn despawn_outofrange_tiles(
    mut commands: Commands,
    camera: Query<(&Transform, &Projection), With<Camera2d>>,
    q_windows: Query<&Window, With<PrimaryWindow>>,
    mut tiles: Query<(Entity, &mut Transform, &TileMarker), Without<Camera2d>>,
    mut res_manager: ResMut<TileMapResources>,
) {
    let (Ok((camera_transform, projection)), Ok(window)) = (camera.single(), q_windows.single())
    else {
        return;
    };
    let view = camera_view_rect(window, camera_transform, camera_scale(projection));
    let zoom = res_manager.zoom;
    let keep: HashSet<Tile> = tiles_in_view(view, zoom, 2).into_iter().collect();
    let current_loaded = !res_manager.is_loading();

    for (entity, mut transform, marker) in tiles.iter_mut() {
        let tile = marker.0;
        let remove = if tile.zoom == zoom {
            !keep.contains(&tile)
        } else {
            transform.translation.z = STALE_TILE_Z;
            current_loaded || tile.world_rect().intersect(view).is_empty()
        };
        if remove {
            commands.entity(entity).despawn();
            res_manager.spawned.remove(&tile);
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::system::RunSystemOnce;

    use super::*;

    fn resources() -> TileMapResources {
        let mut config = MapConfig::default();
        config.tile_cache_dir = Some(std::env::temp_dir().join("quake-map-test-tiles"));
        TileMapResources::new(&config)
    }

    #[test]
    fn starts_on_the_first_base_layer() {
        let res = resources();
        assert_eq!(res.active_index(), 0);
        assert_eq!(res.active_layer().map(|l| l.name.as_str()), Some("Basemap"));
        assert!(!res.is_loading());
    }

    #[test]
    fn switching_layers_invalidates_downloads() {
        let mut res = resources();
        res.pending.insert(Tile::new(0, 0, 2));
        res.failed.insert(Tile::new(1, 0, 2));
        assert!(res.set_active_layer(1));
        assert_eq!(res.generation, 1);
        assert!(res.pending.is_empty());
        assert!(res.failed.is_empty());
        assert!(res.clean);
        assert!(!res.set_active_layer(1));
        assert!(!res.set_active_layer(7));
    }

    #[test]
    fn failed_tiles_are_not_requested_again() {
        let mut res = resources();
        let tile = Tile::new(2, 1, 2);
        assert!(res.wants(&tile));
        res.failed.insert(tile);
        assert!(!res.wants(&tile));
    }

    fn decoded() -> DecodedTile {
        DecodedTile {
            width: 1,
            height: 1,
            rgba: vec![255, 0, 0, 255],
        }
    }

    fn tile_world(res: TileMapResources) -> (World, TileSenderType) {
        let (tx, rx) = bounded(8);
        let mut world = World::new();
        world.insert_resource(res);
        world.insert_resource(TileReceiver(rx));
        world.init_resource::<Assets<Image>>();
        (world, tx)
    }

    #[test]
    fn late_tiles_from_a_previous_layer_are_dropped() {
        let mut res = resources();
        let old = Tile::new(0, 0, 2);
        res.pending.insert(old);
        res.set_active_layer(1);
        let current = Tile::new(1, 1, 2);
        let broken = Tile::new(2, 1, 2);
        res.pending.insert(current);
        res.pending.insert(broken);

        let (mut world, tx) = tile_world(res);
        tx.send((0, old, Ok(decoded()))).unwrap();
        tx.send((1, current, Ok(decoded()))).unwrap();
        tx.send((1, broken, Err(TileError::Io(std::io::Error::other("gone")))))
            .unwrap();
        world.run_system_once(read_tile_map_receiver).unwrap();

        let tiles: Vec<Tile> = world
            .query::<&TileMarker>()
            .iter(&world)
            .map(|marker| marker.0)
            .collect();
        assert_eq!(tiles, vec![current]);

        let res = world.resource::<TileMapResources>();
        assert!(res.spawned.contains_key(&current));
        assert!(!res.spawned.contains_key(&old));
        assert!(res.failed.contains(&broken));
        assert!(!res.is_loading());
        assert_eq!(world.resource::<Assets<Image>>().len(), 1);
    }

    #[test]
    fn tiles_no_longer_pending_are_dropped() {
        let mut res = resources();
        let tile = Tile::new(3, 3, 3);
        res.pending.insert(tile);
        // A zoom change forgets downloads for the old zoom.
        res.pending.retain(|t| t.zoom == 4);

        let (mut world, tx) = tile_world(res);
        tx.send((0, tile, Ok(decoded()))).unwrap();
        world.run_system_once(read_tile_map_receiver).unwrap();

        assert_eq!(world.query::<&TileMarker>().iter(&world).count(), 0);
        assert!(world.resource::<TileMapResources>().spawned.is_empty());
    }
}
