//! Headless симуляция BattleGame
//!
//! Дуэль двух клиентов через dedicated server (loopback, без рендера).
//! Аргумент: seed (по умолчанию 42).

use battlegame_simulation::logger::{set_log_level, LogLevel};
use battlegame_simulation::{init_logger, log_warning, run_duel, DuelConfig};

fn main() {
    init_logger();
    set_log_level(LogLevel::Info);

    let seed = match std::env::args().nth(1) {
        Some(arg) => arg.parse().unwrap_or_else(|_| {
            log_warning(&format!("Invalid seed '{}', using 42", arg));
            42
        }),
        None => 42,
    };

    let config = DuelConfig {
        seed,
        ..DuelConfig::default()
    };
    println!("Starting BattleGame headless duel (seed: {}, ticks: {})", seed, config.ticks);

    let outcome = run_duel(&config);

    println!("Attack presses: {}", outcome.presses);
    for (net_id, health) in &outcome.server_health {
        println!("Server  {:?}: HP {:.1}", net_id, health);
    }
    for (index, (healths, fx)) in outcome
        .client_health
        .iter()
        .zip(&outcome.client_fx)
        .enumerate()
    {
        println!(
            "Client {}: replica {:?}, FX attempted {} / succeeded {}",
            index, healths, fx.attempted, fx.succeeded
        );
    }

    println!("Simulation complete!");
}
