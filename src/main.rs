//! Stack 'n Roll entry point
//!
//! The web build is driven from `web::WebGame`. Natively this runs a short
//! headless round against the in-memory sandbox world and logs what happens.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use glam::Vec2;
    use stack_n_roll::game::{Difficulty, Game, GameEvent, RoundEvent};
    use stack_n_roll::settings::{ScanMode, Settings};
    use stack_n_roll::sim::{ConnectionEvent, PhysicsWorld, SandboxWorld};

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Stack 'n Roll (native, headless) starting...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(42);

    let mut game = Game::new(Settings::load(), seed);
    if let Some(arg) = std::env::args().nth(2) {
        match ScanMode::from_str(&arg) {
            Some(mode) => game.set_scan_mode(mode),
            None => log::warn!("Unknown scan mode {}, keeping {}", arg, game.settings().magnet.scan_mode.as_str()),
        }
    }
    let mut world = SandboxWorld::new();
    game.start_round(&mut world, Difficulty::Normal);

    // Lay the blocks out in a row on the floor, slightly uneven gaps
    let ids: Vec<_> = game.blocks().iter().map(|b| b.body.id).collect();
    let mut x = 100.0;
    for (i, id) in ids.iter().enumerate() {
        let Some(half) = world.body(*id).map(|b| b.half_extents) else {
            continue;
        };
        x += half.x;
        world.set_transform(*id, Vec2::new(x, 700.0 - half.y), 0.0);
        x += half.x + if i % 3 == 0 { 4.0 } else { 40.0 };
    }

    let dt = 1.0 / 60.0;
    let mut connected = 0;
    let mut frames = 0;
    loop {
        frames += 1;
        let mut resolved = false;
        for event in game.tick(&mut world, dt) {
            match event {
                GameEvent::Connection(ConnectionEvent::Connected { a, b, strength, .. }) => {
                    connected += 1;
                    log::info!("{} + {} joined (stiffness {:.2})", a, b, strength.stiffness);
                }
                GameEvent::Round(RoundEvent::TimeUp) => {
                    // Pretend the truck knocked two blocks down
                    for id in ids.iter().take(2) {
                        game.record_ground_contact(*id);
                    }
                }
                GameEvent::Round(RoundEvent::Resolved(outcome)) => {
                    log::info!("Outcome: {:?}", outcome);
                    resolved = true;
                }
                _ => {}
            }
        }
        if resolved || frames > 60 * 120 {
            break;
        }
    }

    let state = game.render_state();
    println!(
        "{} joints ({} lines drawn) after {:.1}s, {} fallen",
        connected,
        state.connections.len(),
        frames as f32 * dt,
        game.round().fallen_count()
    );
    game.return_to_menu(&mut world);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is web::start, this is just to satisfy the compiler
}
