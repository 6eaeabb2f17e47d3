//! Game log line parser for Slaintrack Monitor.
//!
//! This module turns a single log line into at most one typed record. Parsing
//! is pure: no state is kept between lines and nothing is ever written.
//!
//! # Kill Grammars
//!
//! Kill lines are matched against an ordered list of grammars. The first
//! grammar that matches wins:
//!
//! | # | Grammar | Example | PVP |
//! |---|---------|---------|-----|
//! | 1 | PVP broadcast | `[PVP] Aaeldar of <Ashenwood> has killed Grimrod in Nektulos!` | yes |
//! | 2 | Guild relay | `Gromm tells the guild, 'Aaeldar of <Ashenwood> has killed a bear!'` | no |
//! | 3 | Slain by | `a gnoll has been slain by Aaeldar!` | no |
//! | 4 | First person | `You have slain a decaying skeleton.` | no |
//!
//! # Scheduled Events
//!
//! Countdown announcements such as
//! `The next earthquake will begin in 3 Days, 20 Hours, 57 Minutes, and 42 Seconds`
//! are matched case-insensitively. Only the seconds component is required.
//!
//! # Example Usage
//!
//! ```
//! use slaintrack_monitor::parser::{parse_line, ParsedLine};
//!
//! let parsed = parse_line("You have slain a decaying skeleton.");
//! match parsed {
//!     Some(ParsedLine::Kill(event)) => assert_eq!(event.npc_name, "a decaying skeleton"),
//!     _ => panic!("expected a kill"),
//! }
//! ```

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::types::{KillEvent, ScheduledEventAnnouncement};

/// Leading client timestamp, e.g. `[Mon Jan 15 10:00:00 2026] `.
static LOG_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(?:[A-Z][a-z]{2} ){2}[ \d]\d \d{2}:\d{2}:\d{2} \d{4}\]\s*")
        .expect("timestamp pattern is valid")
});

static SCHEDULED_EVENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\bthe next\s+(?:[a-z'-]+\s+)?will begin in\s+",
        r"(?:(?P<days>\d+)\s+days?,?\s+)?(?:and\s+)?",
        r"(?:(?P<hours>\d+)\s+hours?,?\s+)?(?:and\s+)?",
        r"(?:(?P<minutes>\d+)\s+minutes?,?\s+)?(?:and\s+)?",
        r"(?P<seconds>\d+)\s+seconds?\b",
    ))
    .expect("scheduled event pattern is valid")
});

/// One kill grammar: a compiled pattern plus how to classify its matches.
///
/// Every pattern exposes an `npc` group and may expose `player`, `guild` and
/// `zone` groups.
struct KillGrammar {
    name: &'static str,
    pattern: Regex,
    is_pvp: bool,
}

impl KillGrammar {
    fn new(name: &'static str, pattern: &str, is_pvp: bool) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("kill grammar pattern is valid"),
            is_pvp,
        }
    }

    fn extract(&self, body: &str) -> Option<KillEvent> {
        let caps = self.pattern.captures(body)?;
        let npc_name = capture(&caps, "npc")?;

        let mut event = KillEvent::new(npc_name, self.is_pvp);
        event.zone = capture(&caps, "zone");
        event.player_name = capture(&caps, "player");
        event.guild_name = capture(&caps, "guild");
        Some(event)
    }
}

/// Kill grammars in precedence order.
static KILL_GRAMMARS: LazyLock<Vec<KillGrammar>> = LazyLock::new(|| {
    vec![
        KillGrammar::new(
            "pvp_broadcast",
            r"^\[PVP\]\s+(?P<player>.+?)(?:\s+of\s+<?(?P<guild>[^<>]+?)>?)?\s+has killed\s+(?P<npc>.+?)(?:\s+in\s+(?P<zone>.+?))?!\s*$",
            true,
        ),
        KillGrammar::new(
            "guild_relay",
            r"^.+?\s+tells the guild,\s+'(?:\[PVP\]\s+)?(?P<player>.+?)\s+of\s+<?(?P<guild>[^<>]+?)>?\s+has killed\s+(?P<npc>.+?)(?:\s+in\s+(?P<zone>.+?))?!'\s*$",
            false,
        ),
        KillGrammar::new(
            "slain_by",
            r"^(?P<npc>[^']+?)\s+has been slain by\s+(?P<player>[^!']+?)!?\s*$",
            false,
        ),
        KillGrammar::new(
            "first_person",
            r"^You have slain\s+(?P<npc>.+?)[.!]?\s*$",
            false,
        ),
    ]
});

/// A record extracted from one log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParsedLine {
    /// A countdown to the next scheduled world event.
    ScheduledEvent(ScheduledEventAnnouncement),

    /// An NPC kill.
    Kill(KillEvent),
}

/// Parses a line, trying the scheduled-event grammar before the kill grammars.
///
/// A line never yields both kinds of record.
#[must_use]
pub fn parse_line(line: &str) -> Option<ParsedLine> {
    if let Some(announcement) = parse_scheduled_event_line(line) {
        return Some(ParsedLine::ScheduledEvent(announcement));
    }
    parse_kill_line(line).map(ParsedLine::Kill)
}

/// Parses a kill line into a [`KillEvent`].
///
/// Returns `None` when no grammar matches or when the extracted NPC name is
/// empty after trimming. `occurred_at` is set to the current time.
#[must_use]
pub fn parse_kill_line(line: &str) -> Option<KillEvent> {
    let body = strip_log_timestamp(line);
    KILL_GRAMMARS.iter().find_map(|grammar| {
        let event = grammar.extract(body)?;
        tracing::trace!(grammar = grammar.name, npc = %event.npc_name, "Matched kill line");
        Some(event)
    })
}

/// Parses a scheduled-event countdown announcement.
///
/// Missing day, hour or minute components default to zero. Counts that do not
/// fit in a `u32` are treated as a non-match.
#[must_use]
pub fn parse_scheduled_event_line(line: &str) -> Option<ScheduledEventAnnouncement> {
    let caps = SCHEDULED_EVENT.captures(line)?;

    let component = |name: &str| -> Option<u32> {
        match caps.name(name) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };

    Some(ScheduledEventAnnouncement {
        days: component("days")?,
        hours: component("hours")?,
        minutes: component("minutes")?,
        seconds: caps.name("seconds")?.as_str().parse().ok()?,
    })
}

/// Removes a leading client timestamp, if the line carries one.
fn strip_log_timestamp(line: &str) -> &str {
    match LOG_TIMESTAMP.find(line) {
        Some(m) => &line[m.end()..],
        None => line,
    }
}

/// Returns a trimmed capture, treating absent and blank groups alike.
fn capture(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
