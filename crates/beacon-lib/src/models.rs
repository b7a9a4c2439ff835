//! Core data models for the beacon

use serde::{Deserialize, Serialize};

/// The message composed by the clerk for the `/telegram` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Telegram {
    pub message: String,
    pub emoji: String,
    pub form_version: String,
    pub service: String,
    pub telegraphist: String,
    pub identifier: String,
    pub clock_reference: String,
}

/// A clock answer, either local or fetched from a remote clock beacon
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClockReading {
    pub time_reading: String,
    pub clock_name: String,
}

/// The card composed by the scribe for the `/emission` endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallingCard {
    pub attendant: String,
    pub salutation: String,
    pub card_version: String,
    pub signature: String,
    pub identifier: String,
}
