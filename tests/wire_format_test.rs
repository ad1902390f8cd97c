/// Compatibility tests for the persisted ledger and the socket payloads
/// Both formats are shared with participants running other builds of the module

use move_ledger::ledger::{Command, RequestEnvelope};
use move_ledger::movement::{plan_undo, Ledger};

const STORED: &str = r#"[
  {
    "tokenId": "tk1", "tokenName": "Kestrel",
    "sceneId": "sc1", "sceneName": "Arena",
    "from": {"x": 0, "y": 0}, "to": {"x": 200, "y": 100},
    "timestamp": 1700000000000, "moveOrder": 2
  },
  {
    "tokenId": "tk1", "tokenName": "Kestrel",
    "sceneId": "sc1", "sceneName": "Arena",
    "from": {"x": 200, "y": 100}, "to": {"x": 300, "y": 100},
    "timestamp": 1700000000500
  }
]"#;

#[test]
fn test_stored_ledger_loads_with_missing_order() {
    let ledger = Ledger::from_json(STORED).unwrap();
    assert_eq!(ledger.len(), 2);

    // records written before ordering existed sort first
    let sorted = ledger.sorted();
    assert_eq!(sorted[0].move_order, 0);
    assert_eq!(sorted[1].move_order, 2);
    assert_eq!(ledger.max_move_order(), 2);
}

#[test]
fn test_ledger_writes_camel_case_points() {
    let ledger = Ledger::from_json(STORED).unwrap();
    let value: serde_json::Value = serde_json::from_str(&ledger.to_json().unwrap()).unwrap();

    let first = &value[0];
    assert_eq!(first["tokenId"], "tk1");
    assert_eq!(first["moveOrder"], 2);
    assert_eq!(first["to"]["x"], 200.0);
    assert_eq!(first["to"]["y"], 100.0);
}

#[test]
fn test_undo_plan_on_stored_ledger() {
    let ledger = Ledger::from_json(STORED).unwrap();
    let plan = plan_undo(&ledger).unwrap();

    assert_eq!(plan.token.token_id, "tk1");
    assert_eq!(plan.orders.len(), 2);
    assert_eq!(plan.restore_to.x, 200.0);
    assert!(plan.remaining(&ledger).is_empty());
}

#[test]
fn test_socket_request_from_older_client() {
    // older builds send neither a sender nor a change id
    let payload = format!(r#"{{"action":"setMoveHistory","history":{STORED}}}"#);
    let envelope = RequestEnvelope::decode(payload.as_bytes()).unwrap();

    assert_eq!(envelope.sender, "");
    match envelope.command {
        Command::Replace { history } => assert_eq!(history.len(), 2),
        other => panic!("unexpected command {}", other.action()),
    }
}

#[test]
fn test_append_request_from_older_client() {
    let payload = br#"{"action":"saveMoveHistory","moveData":{
        "tokenId":"tk1","tokenName":"Kestrel","sceneId":"sc1","sceneName":"Arena",
        "from":{"x":0,"y":0},"to":{"x":200,"y":100},"timestamp":1700000000000}}"#;
    let envelope = RequestEnvelope::decode(payload).unwrap();

    assert_eq!(envelope.sender, "");
    match envelope.command {
        Command::Append { record, change_id } => {
            assert_eq!(record.token_id, "tk1");
            assert_eq!(record.move_order, 0);
            assert_eq!(change_id, None);
        }
        other => panic!("unexpected command {}", other.action()),
    }
}

#[test]
fn test_unknown_action_is_rejected() {
    let payload = br#"{"action":"dropTables","sender":"user-7"}"#;
    assert!(RequestEnvelope::decode(payload).is_err());
}
