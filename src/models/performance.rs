// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Canonical timed performance model shared by every source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use uuid::Uuid;

/// Swimming style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stroke {
    Freestyle,
    Backstroke,
    Breaststroke,
    Butterfly,
    IndividualMedley,
    MedleyRelay,
}

impl Stroke {
    pub const ALL: [Stroke; 6] = [
        Stroke::Freestyle,
        Stroke::Backstroke,
        Stroke::Breaststroke,
        Stroke::Butterfly,
        Stroke::IndividualMedley,
        Stroke::MedleyRelay,
    ];

    /// Stored/wire representation (matches the serde encoding).
    pub fn as_str(&self) -> &'static str {
        match self {
            Stroke::Freestyle => "FREESTYLE",
            Stroke::Backstroke => "BACKSTROKE",
            Stroke::Breaststroke => "BREASTSTROKE",
            Stroke::Butterfly => "BUTTERFLY",
            Stroke::IndividualMedley => "INDIVIDUAL_MEDLEY",
            Stroke::MedleyRelay => "MEDLEY_RELAY",
        }
    }

    /// Parse the stroke labels used by the upstream forms and result sheets.
    ///
    /// Accepts the canonical names plus the short forms coaches type in
    /// ("free", "fly", "IM", ...). Case, spaces and dashes are ignored.
    pub fn parse_label(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "freestyle" | "free" | "fr" | "crawl" => Some(Stroke::Freestyle),
            "backstroke" | "back" | "bk" => Some(Stroke::Backstroke),
            "breaststroke" | "breast" | "br" => Some(Stroke::Breaststroke),
            "butterfly" | "fly" | "fl" => Some(Stroke::Butterfly),
            "individualmedley" | "medley" | "im" => Some(Stroke::IndividualMedley),
            "medleyrelay" | "relay" => Some(Stroke::MedleyRelay),
            _ => None,
        }
    }
}

impl fmt::Display for Stroke {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pool length. Times are never compared across pool lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum PoolLength {
    #[serde(rename = "SHORT_25M")]
    Short25m,
    #[serde(rename = "LONG_50M")]
    Long50m,
}

impl PoolLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolLength::Short25m => "SHORT_25M",
            PoolLength::Long50m => "LONG_50M",
        }
    }

    /// Parse pool labels ("25m", "SCM", "short course", "LONG_50M", ...).
    pub fn parse_label(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "short25m" | "25m" | "25" | "scm" | "short" | "shortcourse" => {
                Some(PoolLength::Short25m)
            }
            "long50m" | "50m" | "50" | "lcm" | "long" | "longcourse" => Some(PoolLength::Long50m),
            _ => None,
        }
    }
}

impl fmt::Display for PoolLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a performance came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Source {
    Competition,
    Training,
    InternalMeet,
}

impl Source {
    /// Sources whose rows carry a reliable pool length and therefore take
    /// part in the personal-best flag.
    pub const PERSONAL_BEST_SOURCES: [Source; 2] = [Source::Competition, Source::Training];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Competition => "COMPETITION",
            Source::Training => "TRAINING",
            Source::InternalMeet => "INTERNAL_MEET",
        }
    }

    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "COMPETITION" => Some(Source::Competition),
            "TRAINING" => Some(Source::Training),
            "INTERNAL_MEET" | "INTERNALMEET" => Some(Source::InternalMeet),
            _ => None,
        }
    }

    pub fn carries_personal_best(&self) -> bool {
        Self::PERSONAL_BEST_SOURCES.contains(self)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source-specific payload, passed through untouched by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceMetadata {
    Competition {
        competition_name: Option<String>,
        placement: Option<u32>,
    },
    Training {
        /// Lap split times in seconds
        lap_splits: Vec<f64>,
        lap_count: usize,
    },
    InternalMeet {
        meet_id: Option<String>,
        heat_id: String,
        lane: u8,
    },
}

impl SourceMetadata {
    pub fn competition_name(&self) -> Option<&str> {
        match self {
            SourceMetadata::Competition {
                competition_name, ..
            } => competition_name.as_deref(),
            _ => None,
        }
    }
}

/// Scope of the personal-best flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PersonalBestKey {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    pub stroke: Stroke,
    pub distance_meters: u32,
    pub pool_length: PoolLength,
}

impl fmt::Display for PersonalBestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}m {}/{}",
            self.athlete_id, self.distance_meters, self.stroke, self.pool_length
        )
    }
}

/// Stored performance record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TimedPerformance {
    /// Performance ID (also used as document ID)
    pub id: Uuid,
    /// Owning swimmer
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub athlete_id: u64,
    pub stroke: Stroke,
    pub distance_meters: u32,
    /// Unknown for internal meets
    pub pool_length: Option<PoolLength>,
    /// Swim time in seconds
    pub elapsed_seconds: f64,
    pub occurred_at: DateTime<Utc>,
    pub source: Source,
    /// Maintained by the personal-best recompute, never set on ingest
    #[serde(default)]
    pub is_personal_best: bool,
    pub source_metadata: SourceMetadata,
}

impl TimedPerformance {
    /// The personal-best scope this row belongs to, if any.
    ///
    /// Internal meet rows and rows without a pool length have none.
    pub fn personal_best_key(&self) -> Option<PersonalBestKey> {
        if !self.source.carries_personal_best() {
            return None;
        }
        self.pool_length.map(|pool_length| PersonalBestKey {
            athlete_id: self.athlete_id,
            stroke: self.stroke,
            distance_meters: self.distance_meters,
            pool_length,
        })
    }
}

/// In-place edit of an existing performance.
///
/// Only competition rows may be edited; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PerformanceEdit {
    #[serde(default)]
    pub elapsed_seconds: Option<f64>,
    #[serde(default)]
    pub stroke: Option<Stroke>,
    #[serde(default)]
    pub distance_meters: Option<u32>,
    #[serde(default)]
    pub pool_length: Option<PoolLength>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source_metadata: Option<SourceMetadata>,
}
