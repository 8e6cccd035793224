//! Recorded giveaway winners.

use chrono::{DateTime, Utc};
use serde::Serialize;

use raze_core::GiveawayWinnerId;

/// A winner picked by staff.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GiveawayWinner {
    pub id: GiveawayWinnerId,
    pub email: String,
    pub entry_id: String,
    pub prize: String,
    pub winner_name: Option<String>,
    /// Staff member who made the pick.
    pub selected_by: String,
    /// Whether the winner notification was delivered.
    pub webhook_sent: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for recording a winner.
#[derive(Debug, Clone)]
pub struct NewGiveawayWinner<'a> {
    pub email: &'a str,
    pub entry_id: &'a str,
    pub prize: &'a str,
    pub winner_name: Option<&'a str>,
    pub selected_by: &'a str,
    pub webhook_sent: bool,
}
