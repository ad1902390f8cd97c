/// Distance-banded movement path overlay
///
/// Builds the colored segments for one token's movement in its current scene:
/// - Segments follow ledger order, from token center to token center
/// - Distance is grid-unit Manhattan (|dx| + |dy|), summed per segment
/// - Each segment is banded by the cumulative distance at its end

use bytemuck::{Pod, Zeroable};
use glam::DVec2;

use crate::config::PathStyle;
use crate::host::{MoveStats, TokenRef, TokenSnapshot};
use crate::movement::record::Ledger;

/// Distance classification of a path segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    /// Within battle move
    Battle,
    /// Within full move
    Full,
    /// Beyond full move
    Exceeded,
}

/// Classify a cumulative distance against the token's movement allowances
pub fn classify(cumulative: f64, stats: MoveStats) -> Band {
    if cumulative <= stats.battle {
        Band::Battle
    } else if cumulative <= stats.full {
        Band::Full
    } else {
        Band::Exceeded
    }
}

/// Manhattan distance in grid units between two pixel positions
pub fn grid_distance(from: DVec2, to: DVec2, grid_size: f64) -> f64 {
    let delta = (to - from).abs() / grid_size;
    delta.x + delta.y
}

/// One drawn line
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub move_order: u64,
    /// Token center at the segment start, scene pixels
    pub from: DVec2,
    /// Token center at the segment end, scene pixels
    pub to: DVec2,
    /// Grid units covered by this segment
    pub distance: f64,
    /// Grid units covered up to and including this segment
    pub cumulative: f64,
    pub band: Band,
}

/// Vertex layout for a line-list upload (two vertices per segment)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// All segments for one token, drawn as a single overlay object
#[derive(Debug, Clone, PartialEq)]
pub struct PathOverlay {
    pub token: TokenRef,
    pub segments: Vec<PathSegment>,
    pub line_width: f32,
    /// Per-band RGBA, indexed by `band_index`
    palette: [[f32; 4]; 3],
}

impl PathOverlay {
    pub fn total_distance(&self) -> f64 {
        self.segments.last().map(|s| s.cumulative).unwrap_or(0.0)
    }

    pub fn color(&self, band: Band) -> [f32; 4] {
        self.palette[band_index(band)]
    }

    /// Line-list vertices ready for a GPU buffer
    pub fn vertices(&self) -> Vec<LineVertex> {
        let mut vertices = Vec::with_capacity(self.segments.len() * 2);
        for segment in &self.segments {
            let color = self.color(segment.band);
            vertices.push(LineVertex {
                position: segment.from.as_vec2().to_array(),
                color,
            });
            vertices.push(LineVertex {
                position: segment.to.as_vec2().to_array(),
                color,
            });
        }
        vertices
    }

    /// Raw bytes of `vertices()`
    pub fn vertex_bytes(&self) -> Vec<u8> {
        bytemuck::cast_slice(&self.vertices()).to_vec()
    }
}

fn band_index(band: Band) -> usize {
    match band {
        Band::Battle => 0,
        Band::Full => 1,
        Band::Exceeded => 2,
    }
}

/// Build the overlay for `token` from the ledger.
///
/// Returns `None` when the token has no records in its current scene or the
/// grid size is unusable.
pub fn build_path(
    ledger: &Ledger,
    token: &TokenSnapshot,
    grid_size: f64,
    style: &PathStyle,
) -> Option<PathOverlay> {
    if grid_size <= 0.0 {
        return None;
    }

    let records = ledger.token_path(&token.scene_id, &token.id);
    if records.is_empty() {
        return None;
    }

    let stats = token.move_stats();
    let half_footprint = token.footprint_px(grid_size) / 2.0;

    let mut cumulative = 0.0;
    let segments = records
        .iter()
        .map(|record| {
            let distance = grid_distance(record.from, record.to, grid_size);
            cumulative += distance;
            PathSegment {
                move_order: record.move_order,
                from: record.from + half_footprint,
                to: record.to + half_footprint,
                distance,
                cumulative,
                band: classify(cumulative, stats),
            }
        })
        .collect();

    Some(PathOverlay {
        token: token.token_ref(),
        segments,
        line_width: style.line_width,
        palette: [
            style.rgba(Band::Battle),
            style.rgba(Band::Full),
            style.rgba(Band::Exceeded),
        ],
    })
}
