//! The focused scribe composes calling cards
//!
//! Very rarely drops the pen, which shows up as a multi-second outlier in
//! the latency distribution; otherwise adds a modest random delay.

use beacon_lib::{CallingCard, ChaosChances};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::warn;

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

const NOD_OPTIONS: &[&str] = &[
    "A pleasure!",
    "Charmed!",
    "Delighted!",
    "Charmed, I'm sure!",
    "Quite so!",
    "Splendid!",
    "How lovely!",
    "My compliments!",
    "Pray tell!",
    "Fancy that!",
    "Always a joy!",
    "Quel plaisir!",
    "Enchantée!",
    "Très honorée!",
    "Très ravie!",
];

/// Compose a calling card; never fails, sometimes dawdles
pub async fn compose_calling_card(
    app_name: &str,
    node_name: &str,
    chances: ChaosChances,
    request_id: &str,
) -> CallingCard {
    let (pen_drop_draw, delay) = {
        let mut rng = rand::thread_rng();
        (rng.gen::<f64>(), rng.gen_range(50..130))
    };

    if pen_drop_draw < chances.pen_drop_chance {
        warn!("Scribe dropped the pen 🔍!!");
        tokio::time::sleep(Duration::from_secs(3)).await;
    } else {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let salutation = NOD_OPTIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("A pleasure!");

    CallingCard {
        attendant: app_name.to_string(),
        salutation: salutation.to_string(),
        card_version: BUILD_VERSION.to_string(),
        signature: node_name.to_string(),
        identifier: request_id.to_string(),
    }
}
