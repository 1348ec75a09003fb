use crate::error::BootstrapError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Fantasy roster position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    QB,
    RB,
    WR,
    TE,
    K,
    #[serde(rename = "D/ST", alias = "DST", alias = "DEF")]
    DST,
}

impl Position {
    /// Every position, in roster order
    pub const ALL: [Position; 6] =
        [Position::QB, Position::RB, Position::WR, Position::TE, Position::K, Position::DST];

    /// Position code as it appears in projection tables (e.g. "D/ST")
    pub fn as_str(&self) -> &'static str {
        match self {
            Position::QB => "QB",
            Position::RB => "RB",
            Position::WR => "WR",
            Position::TE => "TE",
            Position::K => "K",
            Position::DST => "D/ST",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QB" => Ok(Position::QB),
            "RB" => Ok(Position::RB),
            "WR" => Ok(Position::WR),
            "TE" => Ok(Position::TE),
            "K" => Ok(Position::K),
            "D/ST" | "DST" | "DEF" => Ok(Position::DST),
            other => Err(BootstrapError::invalid_parameter(format!("unknown position '{other}'"))),
        }
    }
}

/// One expert's projection for one player in one week, joined with what the player scored.
///
/// Observations are validated once at ingestion and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Projection source (e.g. "espn", "cbs")
    pub expert: String,

    /// Player name as reconciled by the join step
    pub player: String,

    /// Team abbreviation, when the source had one
    #[serde(default)]
    pub team: Option<String>,

    pub position: Position,

    /// Week of the season, starting at 1
    pub week: u32,

    pub projected_points: f64,

    pub actual_points: f64,
}

impl Observation {
    pub fn new(
        expert: impl Into<String>,
        player: impl Into<String>,
        position: Position,
        week: u32,
        projected_points: f64,
        actual_points: f64,
    ) -> Self {
        Self {
            expert: expert.into(),
            player: player.into(),
            team: None,
            position,
            week,
            projected_points,
            actual_points,
        }
    }

    /// Attach a team abbreviation
    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    /// Projected minus actual points (positive when the expert over-projected)
    pub fn error(&self) -> f64 {
        self.projected_points - self.actual_points
    }

    /// Error as a fraction of the projection.
    ///
    /// `None` when the projection is zero or the quotient is not finite; such
    /// observations never enter a relative-error partition.
    pub fn relative_error(&self) -> Option<f64> {
        if self.projected_points == 0.0 {
            return None;
        }
        let relative = self.error() / self.projected_points;
        relative.is_finite().then_some(relative)
    }

    /// Check the ingestion contract; `row` only labels the error.
    ///
    /// A non-finite score is treated as missing, the way a blank cell reads.
    pub fn validate(&self, row: usize) -> Result<(), BootstrapError> {
        if self.expert.trim().is_empty() {
            return Err(BootstrapError::MissingField { field: "expert", row });
        }
        if self.player.trim().is_empty() {
            return Err(BootstrapError::MissingField { field: "player", row });
        }
        if self.week == 0 {
            return Err(BootstrapError::MissingField { field: "week", row });
        }
        if !self.projected_points.is_finite() {
            return Err(BootstrapError::MissingField { field: "projected_points", row });
        }
        if !self.actual_points.is_finite() {
            return Err(BootstrapError::MissingField { field: "actual_points", row });
        }
        Ok(())
    }

    /// Value of the requested error field
    pub fn error_value(&self, field: ErrorField) -> Option<f64> {
        match field {
            ErrorField::Absolute => Some(self.error()),
            ErrorField::Relative => self.relative_error(),
        }
    }
}

/// Which derived error a partition is resampled on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorField {
    /// Signed point difference, projected minus actual
    Absolute,
    /// Point difference divided by projected points
    Relative,
}

impl ErrorField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorField::Absolute => "absolute",
            ErrorField::Relative => "relative",
        }
    }
}

impl fmt::Display for ErrorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorField {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" | "points" => Ok(ErrorField::Absolute),
            "relative" => Ok(ErrorField::Relative),
            other => {
                Err(BootstrapError::invalid_parameter(format!("unknown error field '{other}'")))
            }
        }
    }
}

/// An observation with its rank inside its ranking partition (1 = highest score)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedObservation {
    pub observation: Observation,
    pub rank: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_parsing() {
        assert_eq!("qb".parse::<Position>().unwrap(), Position::QB);
        assert_eq!("D/ST".parse::<Position>().unwrap(), Position::DST);
        assert_eq!("DEF".parse::<Position>().unwrap(), Position::DST);
        assert!("LB".parse::<Position>().is_err());
        assert_eq!(Position::DST.to_string(), "D/ST");
    }

    #[test]
    fn test_position_serde_uses_table_codes() {
        let json = serde_json::to_string(&Position::DST).unwrap();
        assert_eq!(json, "\"D/ST\"");
        let parsed: Position = serde_json::from_str("\"DST\"").unwrap();
        assert_eq!(parsed, Position::DST);
    }

    #[test]
    fn test_error_values() {
        let obs = Observation::new("espn", "Peyton Manning", Position::QB, 1, 20.0, 25.0);
        assert_eq!(obs.error(), -5.0);
        assert_eq!(obs.relative_error(), Some(-0.25));
        assert_eq!(obs.error_value(ErrorField::Absolute), Some(-5.0));
    }

    #[test]
    fn test_relative_error_undefined_for_zero_projection() {
        let obs = Observation::new("espn", "Backup QB", Position::QB, 1, 0.0, 3.0);
        assert_eq!(obs.relative_error(), None);
        assert_eq!(obs.error_value(ErrorField::Relative), None);
        assert_eq!(obs.error_value(ErrorField::Absolute), Some(-3.0));
    }

    #[test]
    fn test_validate_reports_missing_fields() {
        let obs = Observation::new("espn", "Matt Forte", Position::RB, 2, 12.0, 15.5);
        assert!(obs.validate(0).is_ok());

        let no_actual = Observation::new("espn", "Matt Forte", Position::RB, 2, 12.0, f64::NAN);
        assert!(matches!(
            no_actual.validate(4),
            Err(BootstrapError::MissingField { field: "actual_points", row: 4 })
        ));

        let no_expert = Observation::new("", "Matt Forte", Position::RB, 2, 12.0, 15.5);
        assert!(matches!(
            no_expert.validate(0),
            Err(BootstrapError::MissingField { field: "expert", .. })
        ));
    }
}
