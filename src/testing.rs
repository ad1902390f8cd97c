/// Shared fixtures for unit tests: record/token builders and a recording host

use glam::DVec2;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::MoveError;
use crate::host::{
    Broadcast, Canvas, LedgerSlot, MoveStats, NoticeLevel, Participant, Role, Table, TokenRef,
    TokenSnapshot, Ui,
};
use crate::movement::grouping::HistoryView;
use crate::movement::record::{Ledger, MoveRecord};
use crate::overlay::path::PathOverlay;
use crate::overlay::slots::OverlayHandle;

pub const SCENE_ID: &str = "scene-1";
pub const SCENE_NAME: &str = "Arena";

/// Stamped record in the test scene; the token name is the upper-cased id
pub fn record(token_id: &str, move_order: u64, from: (f64, f64), to: (f64, f64)) -> MoveRecord {
    MoveRecord {
        token_id: token_id.to_string(),
        token_name: token_id.to_uppercase(),
        scene_id: SCENE_ID.to_string(),
        scene_name: SCENE_NAME.to_string(),
        from: DVec2::new(from.0, from.1),
        to: DVec2::new(to.0, to.1),
        timestamp: 0,
        move_order,
    }
}

/// 1x1 token with battle move 3 and full move 6
pub fn token(token_id: &str, position: (f64, f64)) -> TokenSnapshot {
    TokenSnapshot {
        id: token_id.to_string(),
        name: token_id.to_uppercase(),
        scene_id: SCENE_ID.to_string(),
        scene_name: SCENE_NAME.to_string(),
        position: DVec2::new(position.0, position.1),
        width: 1.0,
        height: 1.0,
        move_stats: Some(MoveStats {
            battle: 3.0,
            full: 6.0,
        }),
    }
}

/// Single-scene host that records every call made into it
pub struct MockHost {
    pub role: Role,
    pub user_id: String,

    pub ledger: Ledger,
    pub writes: usize,
    pub emitted: Vec<(String, Vec<u8>)>,

    pub combat: bool,
    pub grid: f64,
    pub tokens: HashMap<String, TokenSnapshot>,
    pub waypoints: HashMap<String, Vec<DVec2>>,
    pub modifiable: HashSet<String>,
    pub controlled: Option<TokenRef>,
    pub repositions: Vec<(String, DVec2, bool)>,
    pub fail_reposition: bool,

    pub overlays: BTreeMap<OverlayHandle, PathOverlay>,
    pub detached: Vec<OverlayHandle>,
    next_handle: u64,

    pub notices: Vec<(NoticeLevel, String)>,
    pub history_renders: Vec<HistoryView>,
}

impl MockHost {
    pub fn new(role: Role) -> Self {
        let user_id = match role {
            Role::Authority => "gm",
            Role::Player => "player-1",
        };
        Self {
            role,
            user_id: user_id.to_string(),
            ledger: Ledger::new(),
            writes: 0,
            emitted: Vec::new(),
            combat: false,
            grid: 100.0,
            tokens: HashMap::new(),
            waypoints: HashMap::new(),
            modifiable: HashSet::new(),
            controlled: None,
            repositions: Vec::new(),
            fail_reposition: false,
            overlays: BTreeMap::new(),
            detached: Vec::new(),
            next_handle: 0,
            notices: Vec::new(),
            history_renders: Vec::new(),
        }
    }

    pub fn add_token(&mut self, token_id: &str, position: (f64, f64)) {
        self.tokens.insert(token_id.to_string(), token(token_id, position));
    }

    /// Drag a token through `points`: the waypoint buffer starts at the
    /// current position and the token ends on the last point
    pub fn step(&mut self, token_id: &str, points: &[(f64, f64)]) {
        let Some(snapshot) = self.tokens.get_mut(token_id) else {
            panic!("unknown token {token_id}");
        };
        let mut path = vec![snapshot.position];
        path.extend(points.iter().map(|&(x, y)| DVec2::new(x, y)));
        if let Some(&last) = path.last() {
            snapshot.position = last;
        }
        self.waypoints.insert(token_id.to_string(), path);
    }
}

impl Participant for MockHost {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn role(&self) -> Role {
        self.role
    }
}

impl LedgerSlot for MockHost {
    fn read_ledger(&self) -> Ledger {
        self.ledger.clone()
    }

    fn write_ledger(&mut self, ledger: Ledger) -> Result<(), MoveError> {
        self.ledger = ledger;
        self.writes += 1;
        Ok(())
    }
}

impl Broadcast for MockHost {
    fn emit(&mut self, namespace: &str, payload: Vec<u8>) {
        self.emitted.push((namespace.to_string(), payload));
    }
}

impl Table for MockHost {
    fn combat_active(&self) -> bool {
        self.combat
    }

    fn token(&self, scene_id: &str, token_id: &str) -> Option<TokenSnapshot> {
        self.tokens
            .get(token_id)
            .filter(|snapshot| snapshot.scene_id == scene_id)
            .cloned()
    }

    fn grid_size(&self, scene_id: &str) -> Option<f64> {
        (scene_id == SCENE_ID).then_some(self.grid)
    }

    fn waypoints(&self, _scene_id: &str, token_id: &str) -> Vec<DVec2> {
        self.waypoints.get(token_id).cloned().unwrap_or_default()
    }

    fn clear_waypoints(&mut self, _scene_id: &str, token_id: &str) -> Result<(), MoveError> {
        if let Some(points) = self.waypoints.get_mut(token_id) {
            points.clear();
        }
        Ok(())
    }

    fn reposition_token(
        &mut self,
        scene_id: &str,
        token_id: &str,
        position: DVec2,
        animate: bool,
    ) -> Result<(), MoveError> {
        if self.fail_reposition {
            return Err(MoveError::Host("reposition rejected".to_string()));
        }
        let Some(snapshot) = self.tokens.get_mut(token_id) else {
            return Err(MoveError::token_not_found(scene_id, token_id));
        };
        snapshot.position = position;
        self.repositions.push((token_id.to_string(), position, animate));
        Ok(())
    }

    fn can_modify(&self, _scene_id: &str, token_id: &str) -> bool {
        self.role == Role::Authority || self.modifiable.contains(token_id)
    }

    fn controlled_token(&self) -> Option<TokenRef> {
        self.controlled.clone()
    }
}

impl Canvas for MockHost {
    fn attach_overlay(&mut self, overlay: PathOverlay) -> OverlayHandle {
        self.next_handle += 1;
        let handle = OverlayHandle(self.next_handle);
        self.overlays.insert(handle, overlay);
        handle
    }

    fn detach_overlay(&mut self, handle: OverlayHandle) {
        if self.overlays.remove(&handle).is_some() {
            self.detached.push(handle);
        }
    }
}

impl Ui for MockHost {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.notices.push((level, message.to_string()));
    }

    fn render_history(&mut self, view: &HistoryView) {
        self.history_renders.push(view.clone());
    }
}
