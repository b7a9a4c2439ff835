//! The diligent clerk composes telegrams
//!
//! Applies the chaos chances: a break (teapot), an indisposition (service
//! unavailable) or, most of the time, a short random delay that stretches
//! the request trace.

use beacon_lib::{ChaosChances, ClockReading, Telegram};
use rand::Rng;
use std::time::Duration;
use tracing::{debug, error};

const BUILD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request-scoped failures injected by the clerk
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClerkError {
    #[error("clerk seems to be having a break 🫖")]
    Break,
    #[error("clerk seems to be indisposed 💩")]
    Indisposed,
}

/// Compose the telegram, or fail with one of the chaos conditions
///
/// On failure the returned telegram carries the apology message so the
/// caller can still render a body alongside the error status.
pub async fn compose_telegram(
    app_name: &str,
    node_name: &str,
    chances: ChaosChances,
    clock: &ClockReading,
    use_clock: bool,
    request_id: &str,
) -> Result<Telegram, (Telegram, ClerkError)> {
    debug!("Clerk at work 🖊️");

    let mut telegram = Telegram {
        identifier: request_id.to_string(),
        service: app_name.to_string(),
        telegraphist: node_name.to_string(),
        form_version: BUILD_VERSION.to_string(),
        ..Telegram::default()
    };

    if use_clock {
        telegram.message = format!("The time is {}", clock.time_reading);
        telegram.emoji = "🕰️".to_string();
        telegram.clock_reference = clock.clock_name.clone();
    } else {
        telegram.message = format!("Today is {} – that's all we have!", clock.time_reading);
        telegram.emoji = "📅".to_string();
        telegram.clock_reference = "unavailable".to_string();
    }

    let (break_draw, indisposed_draw) = {
        let mut rng = rand::thread_rng();
        (rng.gen::<f64>(), rng.gen::<f64>())
    };

    if break_draw < chances.break_chance {
        let err = ClerkError::Break;
        error!(error = %err, "Clerk failure");
        telegram.message = "The time is not available at this moment!!".to_string();
        return Err((telegram, err));
    }
    if indisposed_draw < chances.indisposed_chance {
        let err = ClerkError::Indisposed;
        error!(error = %err, "Clerk failure");
        telegram.message = "The time is not available at this moment!!".to_string();
        return Err((telegram, err));
    }

    // Normal artificial span increase
    let delay = rand::thread_rng().gen_range(20..90);
    tokio::time::sleep(Duration::from_millis(delay)).await;

    Ok(telegram)
}
