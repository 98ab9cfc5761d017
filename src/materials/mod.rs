//! Material normalization.
//!
//! Every viewport renders its own clone of the loaded graph so display
//! overrides never leak between viewports. [`normalize`] produces that
//! clone: either a wireframe override or the "fix dark import" heuristic
//! that lightens assets exported with broken PBR parameters.

use crate::scene::SceneGraph;

/// Process-wide display state applied uniformly to every viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplayState {
    pub wireframe: bool,
}

/// Thresholds and replacement values for the dark-import heuristic.
///
/// The numbers are empirical ("looks better"), not normative, so they are
/// grouped here instead of being scattered as magic constants.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeSettings {
    /// Metallic values above this are clamped to `metallic_replacement`.
    pub metallic_ceiling: f32,
    pub metallic_replacement: f32,
    /// Roughness values below this are raised to `roughness_replacement`.
    pub roughness_floor: f32,
    pub roughness_replacement: f32,
    /// Colors with all three channels below this are considered near-black.
    pub darkness_floor: f32,
    /// Neutral gray substituted for near-black base colors.
    pub dark_replacement: [f32; 3],
}

impl Default for NormalizeSettings {
    fn default() -> Self {
        Self {
            metallic_ceiling: 0.8,
            metallic_replacement: 0.5,
            roughness_floor: 0.2,
            roughness_replacement: 0.5,
            darkness_floor: 0.1,
            dark_replacement: [0.667, 0.667, 0.667],
        }
    }
}

/// Deep-clone `graph` and rewrite its materials for display.
///
/// With `wireframe` on, only the wireframe flag is set; shading parameters
/// stay untouched so toggling off restores the shaded look exactly (the
/// caller always re-derives from the pristine graph, never from a previous
/// clone). With it off, visually-broken imports are corrected by
/// one-directional clamps, which makes the pass idempotent.
pub fn normalize(graph: &SceneGraph, display: &DisplayState) -> SceneGraph {
    normalize_with(graph, display, &NormalizeSettings::default())
}

pub fn normalize_with(
    graph: &SceneGraph,
    display: &DisplayState,
    settings: &NormalizeSettings,
) -> SceneGraph {
    let mut clone = graph.clone();
    clone.visit_materials_mut(|material| {
        if display.wireframe {
            material.wireframe = true;
        } else {
            material.wireframe = false;
            if material.metallic > settings.metallic_ceiling {
                material.metallic = settings.metallic_replacement;
            }
            if material.roughness < settings.roughness_floor {
                material.roughness = settings.roughness_replacement;
            }
            let [r, g, b, a] = material.base_color;
            if r < settings.darkness_floor
                && g < settings.darkness_floor
                && b < settings.darkness_floor
            {
                let [nr, ng, nb] = settings.dark_replacement;
                material.base_color = [nr, ng, nb, a];
            }
        }
    });
    clone
}
