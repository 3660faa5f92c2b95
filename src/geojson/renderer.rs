use bevy::{
    asset::RenderAssetUsages,
    platform::collections::HashMap,
    prelude::*,
    render::mesh::{Indices, PrimitiveTopology},
};
use lyon::{
    math::point,
    path::Path,
    tessellation::{
        BuffersBuilder, LineCap, LineJoin, StrokeOptions, StrokeTessellator, StrokeVertex,
        VertexBuffers,
    },
};

use crate::{
    camera::camera_scale,
    config::MapConfig,
    quakes::{
        FeedKind, FeedPipeline, FeedWorker, OverlayGroup, OverlayVisibility, PLATE_COLOR,
        PLATE_WEIGHT, PlateLayer, QuakeLayer, css_color, marker_style, request_plates,
    },
    tiles::TileMapResources,
    types::{MarkerHit, scale_for_zoom},
};

const PLATE_Z: f32 = 1.0;
const MARKER_Z: f32 = 2.0;
/// Ring sits just above its fill.
const RING_Z_OFFSET: f32 = 1e-5;

#[derive(Component, Debug, Clone, Copy)]
pub struct QuakeMarker {
    pub index: usize,
}

#[derive(Component)]
pub struct PlateLine;

/// Meshes and materials shared between markers of the same size and colour.
#[derive(Resource, Default)]
pub struct MarkerAssets {
    circles: HashMap<u32, Handle<Mesh>>,
    rings: HashMap<u32, Handle<Mesh>>,
    materials: HashMap<(&'static str, u32), Handle<ColorMaterial>>,
}

impl MarkerAssets {
    fn circle(&mut self, radius: f32, meshes: &mut Assets<Mesh>) -> Handle<Mesh> {
        self.circles
            .entry(radius_key(radius))
            .or_insert_with(|| meshes.add(Circle::new(radius)))
            .clone()
    }

    fn ring(&mut self, radius: f32, weight: f32, meshes: &mut Assets<Mesh>) -> Handle<Mesh> {
        self.rings
            .entry(radius_key(radius))
            .or_insert_with(|| {
                let half = weight / 2.0;
                meshes.add(Annulus::new((radius - half).max(0.0), radius + half))
            })
            .clone()
    }

    fn material(
        &mut self,
        color: &'static str,
        alpha: f32,
        materials: &mut Assets<ColorMaterial>,
    ) -> Handle<ColorMaterial> {
        self.materials
            .entry((color, alpha.to_bits()))
            .or_insert_with(|| materials.add(ColorMaterial::from_color(css_color(color, alpha))))
            .clone()
    }
}

fn radius_key(radius: f32) -> u32 {
    (radius * 100.0).round() as u32
}

/// Draw depth of the `index`-th of `count` markers. Later features land on top.
pub fn marker_z(index: usize, count: usize) -> f32 {
    MARKER_Z + (index + 1) as f32 / (count + 1) as f32
}

fn overlay_group(groups: &Query<(Entity, &OverlayGroup)>, kind: FeedKind) -> Option<Entity> {
    groups
        .iter()
        .find(|(_, group)| group.0 == kind)
        .map(|(entity, _)| entity)
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_quake_markers(
    mut commands: Commands,
    mut layer: ResMut<QuakeLayer>,
    mut pipeline: ResMut<FeedPipeline>,
    mut overlays: ResMut<OverlayVisibility>,
    mut assets: ResMut<MarkerAssets>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    worker: Res<FeedWorker>,
    config: Res<MapConfig>,
    groups: Query<(Entity, &OverlayGroup)>,
    markers: Query<Entity, With<QuakeMarker>>,
    camera: Query<&Projection, With<Camera2d>>,
) {
    if !layer.respawn {
        return;
    }
    layer.respawn = false;

    for entity in markers.iter() {
        commands.entity(entity).despawn();
    }

    let Some(group) = overlay_group(&groups, FeedKind::Earthquakes) else {
        warn!("Earthquake overlay group missing");
        return;
    };
    let scale = camera.single().map(camera_scale).unwrap_or(1.0);
    let count = layer.quakes.len();
    let mut hits = Vec::with_capacity(count);

    commands.entity(group).with_children(|parent| {
        for (index, quake) in layer.quakes.iter().enumerate() {
            let style = marker_style(quake);
            let position = quake.coord().to_world();
            let z = marker_z(index, count);

            parent
                .spawn((
                    QuakeMarker { index },
                    Mesh2d(assets.circle(style.radius, &mut meshes)),
                    MeshMaterial2d(assets.material(
                        style.fill_color,
                        style.fill_opacity,
                        &mut materials,
                    )),
                    Transform::from_translation(position.extend(z))
                        .with_scale(Vec3::new(scale, scale, 1.0)),
                ))
                .with_child((
                    Mesh2d(assets.ring(style.radius, style.weight, &mut meshes)),
                    MeshMaterial2d(assets.material(
                        style.stroke_color,
                        style.opacity,
                        &mut materials,
                    )),
                    Transform::from_xyz(0.0, 0.0, RING_Z_OFFSET),
                ));

            hits.push(MarkerHit {
                index,
                position: position.into(),
                radius: style.radius,
                z,
            });
        }
    });

    layer.set_markers(hits);
    if request_plates(&mut pipeline, &worker, &config) {
        info!("Spawned {} earthquake markers", count);
        overlays.legend = true;
    }
}

/// Keeps markers the same size on screen whatever the zoom.
pub fn scale_markers(
    camera: Query<&Projection, (With<Camera2d>, Changed<Projection>)>,
    mut markers: Query<&mut Transform, With<QuakeMarker>>,
) {
    let Ok(projection) = camera.single() else {
        return;
    };
    let scale = camera_scale(projection);
    for mut transform in markers.iter_mut() {
        transform.scale = Vec3::new(scale, scale, 1.0);
    }
}

/// Rebuilds the plate mesh when new plates arrive or the tile zoom changes,
/// so the stroke stays about `PLATE_WEIGHT` pixels wide.
#[allow(clippy::too_many_arguments)]
pub fn spawn_plate_lines(
    mut commands: Commands,
    mut layer: ResMut<PlateLayer>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    mut last_zoom: Local<Option<u32>>,
    tiles: Res<TileMapResources>,
    groups: Query<(Entity, &OverlayGroup)>,
    lines: Query<Entity, With<PlateLine>>,
) {
    if !layer.respawn && *last_zoom == Some(tiles.zoom) {
        return;
    }
    layer.respawn = false;
    *last_zoom = Some(tiles.zoom);

    for entity in lines.iter() {
        commands.entity(entity).despawn();
    }
    if layer.plates.is_empty() {
        return;
    }
    let Some(group) = overlay_group(&groups, FeedKind::Plates) else {
        warn!("Plate overlay group missing");
        return;
    };

    let polylines: Vec<Vec<Vec2>> = layer
        .plates
        .iter()
        .flat_map(|plate| plate.world_lines())
        .collect();
    let width = PLATE_WEIGHT * scale_for_zoom(tiles.zoom as f32);
    let Some(mesh) = polyline_mesh(&polylines, width) else {
        return;
    };

    debug!("Plate mesh rebuilt for zoom {}", tiles.zoom);
    let material = materials.add(ColorMaterial::from_color(css_color(PLATE_COLOR, 1.0)));
    commands.entity(group).with_child((
        PlateLine,
        Mesh2d(meshes.add(mesh)),
        MeshMaterial2d(material),
        Transform::from_xyz(0.0, 0.0, PLATE_Z),
    ));
}

/// Strokes every polyline with round joins and caps.
pub fn tessellate_polylines(lines: &[Vec<Vec2>], width: f32) -> VertexBuffers<[f32; 3], u32> {
    let mut builder = Path::builder();
    for line in lines.iter().filter(|line| line.len() >= 2) {
        builder.begin(point(line[0].x, line[0].y));
        for p in &line[1..] {
            builder.line_to(point(p.x, p.y));
        }
        builder.end(false);
    }
    let path = builder.build();

    let options = StrokeOptions::default()
        .with_line_width(width)
        .with_line_join(LineJoin::Round)
        .with_line_cap(LineCap::Round)
        .with_tolerance((width * 0.1).max(f32::EPSILON));

    let mut buffers: VertexBuffers<[f32; 3], u32> = VertexBuffers::new();
    let mut tessellator = StrokeTessellator::new();
    if let Err(e) = tessellator.tessellate_path(
        &path,
        &options,
        &mut BuffersBuilder::new(&mut buffers, |vertex: StrokeVertex| {
            let p = vertex.position();
            [p.x, p.y, 0.0]
        }),
    ) {
        warn!("Failed to tessellate plate boundaries: {:?}", e);
    }
    buffers
}

pub fn polyline_mesh(lines: &[Vec<Vec2>], width: f32) -> Option<Mesh> {
    let buffers = tessellate_polylines(lines, width);
    if buffers.indices.is_empty() {
        return None;
    }
    let count = buffers.vertices.len();
    Some(
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, buffers.vertices)
            .with_inserted_attribute(Mesh::ATTRIBUTE_NORMAL, vec![[0.0, 0.0, 1.0]; count])
            .with_inserted_attribute(Mesh::ATTRIBUTE_UV_0, vec![[0.0, 0.0]; count])
            .with_inserted_indices(Indices::U32(buffers.indices)),
    )
}
