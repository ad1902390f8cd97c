/// In-process tabletop state on an ECS world
///
/// Tokens are hecs entities; scenes, combat and the change counter live beside
/// the world. Every token write bumps the change counter so all participants
/// see the same change id for one update.

use glam::DVec2;
use hecs::{Entity, World};
use std::collections::{HashMap, HashSet};

use crate::error::MoveError;
use crate::host::{MoveStats, TokenSnapshot};

/// Token identity
#[derive(Debug, Clone)]
pub struct TokenDoc {
    pub id: String,
    pub name: String,
}

/// Scene the token is placed in
#[derive(Debug, Clone)]
pub struct SceneLink(pub String);

/// Top-left corner, scene pixels
#[derive(Debug, Clone, Copy)]
pub struct Position(pub DVec2);

/// Size in grid cells
#[derive(Debug, Clone, Copy)]
pub struct Footprint {
    pub width: f64,
    pub height: f64,
}

impl Default for Footprint {
    fn default() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Movement allowances from the token's actor
#[derive(Debug, Clone, Copy)]
pub struct ActorStats(pub MoveStats);

/// Transient waypoint buffer of the latest drag
#[derive(Debug, Clone, Default)]
pub struct Waypoints(pub Vec<DVec2>);

/// Users other than the authority allowed to update the token
#[derive(Debug, Clone, Default)]
pub struct Owners(pub HashSet<String>);

#[derive(Debug, Clone)]
pub struct Scene {
    pub name: String,
    pub grid_size: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combat {
    pub id: String,
    pub round: u32,
}

/// Builder for a token placed on the table
#[derive(Debug, Clone)]
pub struct TokenSpec {
    id: String,
    name: String,
    scene_id: String,
    position: DVec2,
    footprint: Footprint,
    stats: Option<MoveStats>,
    owners: HashSet<String>,
}

impl TokenSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, scene_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            scene_id: scene_id.into(),
            position: DVec2::ZERO,
            footprint: Footprint::default(),
            stats: None,
            owners: HashSet::new(),
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = DVec2::new(x, y);
        self
    }

    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.footprint = Footprint { width, height };
        self
    }

    pub fn stats(mut self, battle: f64, full: f64) -> Self {
        self.stats = Some(MoveStats { battle, full });
        self
    }

    pub fn owned_by(mut self, user_id: impl Into<String>) -> Self {
        self.owners.insert(user_id.into());
        self
    }
}

pub struct TableWorld {
    world: World,
    scenes: HashMap<String, Scene>,
    combat: Option<Combat>,
    last_change: u64,
}

impl Default for TableWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TableWorld {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            scenes: HashMap::new(),
            combat: None,
            last_change: 0,
        }
    }

    pub fn add_scene(&mut self, id: impl Into<String>, name: impl Into<String>, grid_size: f64) {
        self.scenes.insert(
            id.into(),
            Scene {
                name: name.into(),
                grid_size,
            },
        );
    }

    pub fn spawn_token(&mut self, spec: TokenSpec) -> Entity {
        let entity = self.world.spawn((
            TokenDoc {
                id: spec.id,
                name: spec.name,
            },
            SceneLink(spec.scene_id),
            Position(spec.position),
            spec.footprint,
            Waypoints::default(),
            Owners(spec.owners),
        ));
        if let Some(stats) = spec.stats {
            // entity was just spawned, insert cannot miss
            let _ = self.world.insert_one(entity, ActorStats(stats));
        }
        entity
    }

    pub fn despawn_token(&mut self, scene_id: &str, token_id: &str) -> Result<(), MoveError> {
        let entity = self.find(scene_id, token_id)?;
        self.world
            .despawn(entity)
            .map_err(|_| MoveError::token_not_found(scene_id, token_id))
    }

    fn find(&self, scene_id: &str, token_id: &str) -> Result<Entity, MoveError> {
        if !self.scenes.contains_key(scene_id) {
            return Err(MoveError::SceneNotFound(scene_id.to_string()));
        }
        self.world
            .query::<(&TokenDoc, &SceneLink)>()
            .iter()
            .find(|(_, (doc, scene))| doc.id == token_id && scene.0 == scene_id)
            .map(|(entity, _)| entity)
            .ok_or_else(|| MoveError::token_not_found(scene_id, token_id))
    }

    pub fn snapshot(&self, scene_id: &str, token_id: &str) -> Option<TokenSnapshot> {
        let entity = self.find(scene_id, token_id).ok()?;
        let mut query = self
            .world
            .query_one::<(&TokenDoc, &Position, &Footprint, Option<&ActorStats>)>(entity)
            .ok()?;
        let (doc, position, footprint, stats) = query.get()?;

        let scene_name = self
            .scenes
            .get(scene_id)
            .map(|scene| scene.name.clone())
            .unwrap_or_default();

        Some(TokenSnapshot {
            id: doc.id.clone(),
            name: doc.name.clone(),
            scene_id: scene_id.to_string(),
            scene_name,
            position: position.0,
            width: footprint.width,
            height: footprint.height,
            move_stats: stats.map(|stats| stats.0),
        })
    }

    pub fn grid_size(&self, scene_id: &str) -> Option<f64> {
        self.scenes.get(scene_id).map(|scene| scene.grid_size)
    }

    /// Drag a token along `path`; returns the change id of the update
    pub fn drag_token(&mut self, scene_id: &str, token_id: &str, path: &[DVec2]) -> Result<u64, MoveError> {
        let entity = self.find(scene_id, token_id)?;
        let change_id = self.next_change();

        let mut query = self
            .world
            .query_one::<(&mut Position, &mut Waypoints)>(entity)
            .map_err(|_| MoveError::token_not_found(scene_id, token_id))?;
        let (position, waypoints) = query
            .get()
            .ok_or_else(|| MoveError::token_not_found(scene_id, token_id))?;

        waypoints.0.clear();
        waypoints.0.push(position.0);
        waypoints.0.extend_from_slice(path);
        if let Some(&last) = path.last() {
            position.0 = last;
        }
        Ok(change_id)
    }

    /// Programmatic placement; leaves no waypoints behind
    pub fn reposition(&mut self, scene_id: &str, token_id: &str, target: DVec2) -> Result<u64, MoveError> {
        let entity = self.find(scene_id, token_id)?;
        let change_id = self.next_change();

        let mut query = self
            .world
            .query_one::<(&mut Position, &mut Waypoints)>(entity)
            .map_err(|_| MoveError::token_not_found(scene_id, token_id))?;
        let (position, waypoints) = query
            .get()
            .ok_or_else(|| MoveError::token_not_found(scene_id, token_id))?;

        position.0 = target;
        waypoints.0.clear();
        Ok(change_id)
    }

    pub fn waypoints(&self, scene_id: &str, token_id: &str) -> Vec<DVec2> {
        self.find(scene_id, token_id)
            .ok()
            .and_then(|entity| self.world.get::<&Waypoints>(entity).ok().map(|w| w.0.clone()))
            .unwrap_or_default()
    }

    pub fn clear_waypoints(&mut self, scene_id: &str, token_id: &str) -> Result<(), MoveError> {
        let entity = self.find(scene_id, token_id)?;
        let mut waypoints = self
            .world
            .get::<&mut Waypoints>(entity)
            .map_err(|_| MoveError::token_not_found(scene_id, token_id))?;
        waypoints.0.clear();
        Ok(())
    }

    pub fn is_owner(&self, scene_id: &str, token_id: &str, user_id: &str) -> bool {
        self.find(scene_id, token_id)
            .ok()
            .and_then(|entity| self.world.get::<&Owners>(entity).ok().map(|o| o.0.contains(user_id)))
            .unwrap_or(false)
    }

    pub fn combat(&self) -> Option<&Combat> {
        self.combat.as_ref()
    }

    pub fn start_combat(&mut self, id: impl Into<String>) {
        self.combat = Some(Combat {
            id: id.into(),
            round: 1,
        });
    }

    /// Advance to the next round; `None` without an active combat
    pub fn advance_round(&mut self) -> Option<Combat> {
        let combat = self.combat.as_mut()?;
        combat.round += 1;
        Some(combat.clone())
    }

    pub fn end_combat(&mut self) -> Option<Combat> {
        self.combat.take()
    }

    fn next_change(&mut self) -> u64 {
        self.last_change += 1;
        self.last_change
    }
}
