//! Event types for Slaintrack log monitoring.
//!
//! This module defines the records extracted from the game log and the JSON
//! payloads sent to the collector. Wire payloads serialize to camelCase JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One defeat of a non-player character, as reported by a single log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillEvent {
    /// Name of the defeated NPC, trimmed and never empty.
    pub npc_name: String,

    /// Zone the kill happened in, when the line names one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,

    /// Whether the line was an authoritative `[PVP]` broadcast.
    pub is_pvp: bool,

    /// Wall-clock time at which the line was parsed.
    pub occurred_at: DateTime<Utc>,

    /// Player credited with the kill.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,

    /// Guild of the credited player.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_name: Option<String>,
}

impl KillEvent {
    /// Creates a kill event stamped with the current time.
    #[must_use]
    pub fn new(npc_name: impl Into<String>, is_pvp: bool) -> Self {
        Self {
            npc_name: npc_name.into(),
            zone: None,
            is_pvp,
            occurred_at: Utc::now(),
            player_name: None,
            guild_name: None,
        }
    }

    /// Returns the correlation key derived from the NPC name.
    #[must_use]
    pub fn correlation_key(&self) -> CorrelationKey {
        CorrelationKey::from_npc_name(&self.npc_name)
    }
}

/// A parsed "the next event will begin in ..." countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEventAnnouncement {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl ScheduledEventAnnouncement {
    /// Total countdown length in seconds.
    #[must_use]
    pub fn total_seconds(&self) -> u64 {
        u64::from(self.days) * 86_400
            + u64::from(self.hours) * 3_600
            + u64::from(self.minutes) * 60
            + u64::from(self.seconds)
    }
}

/// Normalized NPC identity used to match related reports of one kill.
///
/// Built by stripping leading `#` characters, turning underscores into spaces,
/// lowercasing, and collapsing whitespace runs. Normalizing an already
/// normalized key yields the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CorrelationKey(String);

impl CorrelationKey {
    /// Derives the key for an NPC name.
    #[must_use]
    pub fn from_npc_name(npc_name: &str) -> Self {
        let normalized = npc_name
            .trim_start_matches('#')
            .replace('_', " ")
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Self(normalized)
    }

    /// Returns the normalized key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Body of `POST /api/slain`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlainPayload {
    pub npc_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    /// `1` for PVP kills, `0` otherwise.
    pub pvp: u8,
    pub killed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guild_name: Option<String>,
}

impl From<&KillEvent> for SlainPayload {
    fn from(event: &KillEvent) -> Self {
        Self {
            npc_name: event.npc_name.clone(),
            zone: event.zone.clone(),
            pvp: u8::from(event.is_pvp),
            killed_at: event.occurred_at,
            player_name: event.player_name.clone(),
            guild_name: event.guild_name.clone(),
        }
    }
}

/// Body of `POST /api/earthquake`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarthquakePayload {
    /// The raw announcement line, unmodified.
    pub log_line: String,
    /// Literal UTC offset of the server that writes the announcement.
    pub timezone: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn correlation_key_normalizes_equivalent_names() {
        let a = CorrelationKey::from_npc_name("##Grimrod_the_Destroyer");
        let b = CorrelationKey::from_npc_name("grimrod the destroyer");
        let c = CorrelationKey::from_npc_name("Grimrod   The   Destroyer");

        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "grimrod the destroyer");
    }

    #[test]
    fn correlation_key_is_idempotent() {
        let once = CorrelationKey::from_npc_name("  #a_Decaying  Skeleton ");
        let twice = CorrelationKey::from_npc_name(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn correlation_key_keeps_inner_hashes() {
        let key = CorrelationKey::from_npc_name("#Sir #2");
        assert_eq!(key.as_str(), "sir #2");
    }

    #[test]
    fn scheduled_event_total_seconds() {
        let announcement = ScheduledEventAnnouncement {
            days: 1,
            hours: 2,
            minutes: 3,
            seconds: 4,
        };
        assert_eq!(announcement.total_seconds(), 86_400 + 7_200 + 180 + 4);
    }

    #[test]
    fn slain_payload_omits_absent_fields() {
        let mut event = KillEvent::new("a decaying skeleton", false);
        event.occurred_at = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let json = serde_json::to_value(SlainPayload::from(&event)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "npcName": "a decaying skeleton",
                "pvp": 0,
                "killedAt": "2026-01-15T10:00:00Z",
            })
        );
    }

    #[test]
    fn slain_payload_carries_pvp_fields() {
        let mut event = KillEvent::new("Grimrod", true);
        event.zone = Some("The Nektulos Forest".to_string());
        event.player_name = Some("Aaeldar".to_string());
        event.guild_name = Some("Ashenwood".to_string());

        let json = serde_json::to_value(SlainPayload::from(&event)).unwrap();

        assert_eq!(json["pvp"], 1);
        assert_eq!(json["zone"], "The Nektulos Forest");
        assert_eq!(json["playerName"], "Aaeldar");
        assert_eq!(json["guildName"], "Ashenwood");
    }

    #[test]
    fn earthquake_payload_uses_camel_case() {
        let payload = EarthquakePayload {
            log_line: "The next earthquake will begin in 12 Seconds".to_string(),
            timezone: "-05:00".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"logLine\""));
        assert!(json.contains("\"timezone\":\"-05:00\""));
    }
}
