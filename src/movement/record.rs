/// Movement records and the shared ledger
///
/// A `MoveRecord` is one net token displacement. The `Ledger` is the ordered log
/// shared by every participant; `move_order` is its only ordering key.

use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::MoveError;
use crate::host::TokenSnapshot;

/// One atomic token displacement (scene pixel coordinates, top-left corner)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub token_id: String,
    pub token_name: String,
    pub scene_id: String,
    pub scene_name: String,

    #[serde(with = "point_serde")]
    pub from: DVec2,

    #[serde(with = "point_serde")]
    pub to: DVec2,

    /// Milliseconds since epoch, informational only
    pub timestamp: u64,

    /// Zero until stamped by the authority
    #[serde(default)]
    pub move_order: u64,
}

impl MoveRecord {
    /// Build an unstamped record for a token's net displacement
    pub fn unstamped(token: &TokenSnapshot, from: DVec2, to: DVec2) -> Self {
        Self {
            token_id: token.id.clone(),
            token_name: token.name.clone(),
            scene_id: token.scene_id.clone(),
            scene_name: token.scene_name.clone(),
            from,
            to,
            timestamp: now_millis(),
            move_order: 0,
        }
    }

    pub fn is_stamped(&self) -> bool {
        self.move_order > 0
    }

    /// Pixel displacement of this record
    pub fn displacement(&self) -> DVec2 {
        self.to - self.from
    }
}

/// Ordered log of movement records for the whole session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    records: Vec<MoveRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<MoveRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[MoveRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: MoveRecord) {
        self.records.push(record);
    }

    /// Records in ascending `move_order`
    pub fn sorted(&self) -> Vec<&MoveRecord> {
        let mut sorted: Vec<&MoveRecord> = self.records.iter().collect();
        sorted.sort_by_key(|record| record.move_order);
        sorted
    }

    /// Highest order in the ledger, 0 when empty
    pub fn max_move_order(&self) -> u64 {
        self.records
            .iter()
            .map(|record| record.move_order)
            .max()
            .unwrap_or(0)
    }

    /// Copy of the ledger with every record whose order is in `orders` removed
    pub fn without_orders(&self, orders: &BTreeSet<u64>) -> Ledger {
        Ledger {
            records: self
                .records
                .iter()
                .filter(|record| !orders.contains(&record.move_order))
                .cloned()
                .collect(),
        }
    }

    /// One token's records within a scene, ascending by order
    pub fn token_path(&self, scene_id: &str, token_id: &str) -> Vec<&MoveRecord> {
        let mut path: Vec<&MoveRecord> = self
            .records
            .iter()
            .filter(|record| record.token_id == token_id && record.scene_id == scene_id)
            .collect();
        path.sort_by_key(|record| record.move_order);
        path
    }

    pub fn to_json(&self) -> Result<String, MoveError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, MoveError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Process-wide order counter, derivable from the ledger at any time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveCounter {
    value: u64,
}

impl MoveCounter {
    pub fn seeded_from(ledger: &Ledger) -> Self {
        Self {
            value: ledger.max_move_order(),
        }
    }

    pub fn current(&self) -> u64 {
        self.value
    }

    /// Advance and return the next order
    pub fn next(&mut self) -> u64 {
        self.value += 1;
        self.value
    }

    pub fn reseed(&mut self, ledger: &Ledger) {
        self.value = ledger.max_move_order();
    }

    pub fn reset(&mut self) {
        self.value = 0;
    }
}

/// Milliseconds since the unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Serialize `DVec2` as an `{x, y}` object
pub mod point_serde {
    use glam::DVec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct PointData {
        x: f64,
        y: f64,
    }

    pub fn serialize<S>(point: &DVec2, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        PointData {
            x: point.x,
            y: point.y,
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DVec2, D::Error>
    where
        D: Deserializer<'de>,
    {
        let data = PointData::deserialize(deserializer)?;
        Ok(DVec2::new(data.x, data.y))
    }
}
