use anyhow::Result;
use move_ledger::host::Role;
use move_ledger::ledger::FileLedgerSlot;
use move_ledger::movement::HostEvent;
use move_ledger::overlay::{LineVertex, OverlayChannel};
use move_ledger::sim::{settle, Client, Session, SettingsSlot, TableWorld, TokenSpec};
use move_ledger::{ModuleConfig, TokenRef};

const SCENE: &str = "arena";

fn print_history(label: &str, client: &Client) {
    println!("--- {label} ---");
    match client.host.history() {
        Some(view) => {
            for line in view.lines() {
                println!("  {line}");
            }
            println!(
                "  clear: {}  undo: {}",
                view.can_clear_history, view.can_undo_move
            );
        }
        None => println!("  (history window closed)"),
    }
}

fn print_path(client: &Client) {
    let Some(path) = client.path(OverlayChannel::Selection) else {
        println!("  no path drawn");
        return;
    };
    for segment in &path.segments {
        println!(
            "  #{} {:.0} squares (total {:.0}) {:?}",
            segment.move_order, segment.distance, segment.cumulative, segment.band
        );
    }
    if let Some(bytes) = client.path_vertices(OverlayChannel::Selection) {
        println!(
            "  {} line vertices ({} bytes)",
            bytes.len() / std::mem::size_of::<LineVertex>(),
            bytes.len()
        );
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== Move Ledger Demo ===");
    let config = ModuleConfig::load_or_default("config/move-ledger.json");

    let mut table = TableWorld::new();
    table.add_scene(SCENE, "Arena", 100.0);
    table.spawn_token(
        TokenSpec::new("kestrel", "Kestrel", SCENE)
            .at(0.0, 0.0)
            .stats(3.0, 6.0)
            .owned_by("player-1"),
    );
    table.spawn_token(
        TokenSpec::new("goblin", "Goblin", SCENE)
            .at(800.0, 0.0)
            .size(2.0, 2.0)
            .stats(2.0, 4.0),
    );

    let session = match std::env::args().nth(1) {
        Some(path) => {
            println!("Ledger file: {path}");
            Session::with_settings(table, SettingsSlot::File(FileLedgerSlot::open_or_empty(path)))
        }
        None => Session::new(table),
    };

    let mut gm = Client::connect(&session, "gm", Role::Authority, config.clone())?;
    let mut player = Client::connect(&session, "player-1", Role::Player, config)?;
    println!("Existing records: {}", session.ledger().len());

    session.start_combat("combat-1");
    gm.act(HostEvent::OpenHistory)?;
    player.act(HostEvent::OpenHistory)?;
    player.select(Some(TokenRef::new(SCENE, "kestrel")))?;

    session.drag_token(SCENE, "kestrel", &[(100.0, 0.0), (300.0, 0.0)])?;
    settle(&mut [&mut gm, &mut player]);
    session.drag_token(SCENE, "kestrel", &[(300.0, 300.0)])?;
    settle(&mut [&mut gm, &mut player]);
    session.drag_token(SCENE, "goblin", &[(800.0, 200.0)])?;
    settle(&mut [&mut gm, &mut player]);
    session.drag_token(SCENE, "kestrel", &[(700.0, 300.0)])?;
    settle(&mut [&mut gm, &mut player]);

    print_history("after movement (player)", &player);
    println!("Kestrel path:");
    print_path(&player);

    println!("Player undoes the last move...");
    player.act(HostEvent::UndoRequested)?;
    settle(&mut [&mut gm, &mut player]);
    print_history("after undo (gm)", &gm);
    println!("Kestrel path:");
    print_path(&player);

    println!("Advancing round...");
    session.advance_round();
    settle(&mut [&mut gm, &mut player]);
    print_history("after round change (gm)", &gm);
    for (level, message) in gm.host.notices() {
        println!("  gm notice [{level:?}] {message}");
    }

    gm.act(HostEvent::Unload)?;
    player.act(HostEvent::Unload)?;
    println!("Demo complete.");
    Ok(())
}
