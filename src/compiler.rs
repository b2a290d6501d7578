//! Phase sequencing: one entity from brushes to repaired faces.

use crate::areas::{flood_areas, mark_visible_sides, place_occupants};
use crate::brush::Brush;
use crate::bspbuild::{BuildStats, brush_bsp};
use crate::contents::GameDef;
use crate::errors::CompileError;
use crate::faces::make_faces;
use crate::map::{MapData, Options};
use crate::merge::merge_all;
use crate::portals::make_tree_portals;
use crate::tjunc::{TjuncStats, tjunc};
use crate::tree::Tree;
use crate::vertices::emit_vertices;

#[derive(Debug, Default)]
pub struct CompileStats {
    pub build: BuildStats,
    pub faces: usize,
    pub mergefaces: usize,
    pub tjunc: TjuncStats,
}

/// Compile one entity's brushes into an annotated tree: build, portalize,
/// flood areas, mark and emit faces, merge, emit vertices, repair
/// T-junctions. The tree is returned with leaves carrying contents and
/// areas, and interior nodes carrying fragment-ready faces.
pub fn compile_entity(
    map: &mut MapData,
    entity: usize,
    game: &dyn GameDef,
    options: &Options,
) -> Result<(Tree, CompileStats), CompileError> {
    let mut stats = CompileStats::default();

    // wind the entity's brushes in place, then work on copies; the
    // originals stay behind for side marking and area-portal lookup
    let brushes: Vec<Brush> = {
        let MapData {
            planes, entities, ..
        } = &mut *map;
        let ent = &mut entities[entity];
        for (i, brush) in ent.brushes.iter_mut().enumerate() {
            brush.original = i;
            brush.create_windings(planes, options.worldextent, entity)?;
        }
        ent.calc_bounds();
        ent.brushes.clone()
    };

    let mut tree = brush_bsp(&map.planes, game, options, brushes, &mut stats.build)?;

    make_tree_portals(&mut tree, &mut map.planes, game, options)?;

    place_occupants(&mut tree, map, game);
    flood_areas(&mut tree, map, game, entity)?;

    mark_visible_sides(&mut tree, map, game, entity);
    stats.faces = make_faces(&mut tree, map, game, entity);

    stats.mergefaces = merge_all(&mut tree, &map.planes);

    let mut table = std::mem::take(&mut map.vertices);
    emit_vertices(&mut tree, &mut table);
    stats.tjunc = tjunc(&mut tree, &map.planes, &table, options);
    map.vertices = table;

    Ok((tree, stats))
}
