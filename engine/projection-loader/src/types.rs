use accuracy_engine::{Observation, Position};
use serde::{Deserialize, Serialize};

use crate::error::{LoadError, Result};

/// One row of a joined projection/scoring table before validation.
///
/// Column names follow the joined table; the aliases cover the scraper and
/// scoring exports that feed it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawObservationRow {
    #[serde(default, alias = "EXPERT", alias = "source")]
    pub expert: Option<String>,

    #[serde(default, alias = "name", alias = "PLAYER_NAME", alias = "Player")]
    pub player: Option<String>,

    #[serde(default, alias = "TEAM")]
    pub team: Option<String>,

    #[serde(default, alias = "POSITION")]
    pub position: Option<String>,

    #[serde(default, alias = "WEEK")]
    pub week: Option<u32>,

    #[serde(default, alias = "projected_pts", alias = "FPTS")]
    pub projected_points: Option<f64>,

    #[serde(default, alias = "total_pts", alias = "PTS_SCORED")]
    pub actual_points: Option<f64>,
}

/// JSON tables come either bare or wrapped in an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawTable {
    Rows(Vec<RawObservationRow>),
    Wrapped { observations: Vec<RawObservationRow> },
}

impl RawTable {
    pub(crate) fn into_rows(self) -> Vec<RawObservationRow> {
        match self {
            RawTable::Rows(rows) | RawTable::Wrapped { observations: rows } => rows,
        }
    }
}

/// Outcome of validating one raw row
#[derive(Debug)]
pub(crate) enum RowOutcome {
    Valid(Observation),
    /// No actual score yet; never reaches the core
    MissingActual,
}

fn required_text(value: Option<String>, field: &'static str, row: usize) -> Result<String> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(LoadError::MissingField { field, row }),
    }
}

fn required_points(value: Option<f64>, field: &'static str, row: usize) -> Result<f64> {
    let value = value.ok_or(LoadError::MissingField { field, row })?;
    if !value.is_finite() {
        return Err(LoadError::invalid_row(row, format!("{field} is not finite")));
    }
    Ok(value)
}

impl RawObservationRow {
    /// Validate once at the boundary; `row` is 1-based for messages
    pub(crate) fn validate(self, row: usize) -> Result<RowOutcome> {
        let expert = required_text(self.expert, "expert", row)?;
        let player = required_text(self.player, "player", row)?;
        let position_code = required_text(self.position, "position", row)?;
        let position: Position = position_code
            .parse()
            .map_err(|_| LoadError::invalid_row(row, format!("unknown position '{position_code}'")))?;

        let week = self.week.ok_or(LoadError::MissingField { field: "week", row })?;
        if week == 0 {
            return Err(LoadError::invalid_row(row, "week must be 1 or greater"));
        }

        let projected_points = required_points(self.projected_points, "projected_points", row)?;

        let actual_points = match self.actual_points {
            Some(points) => required_points(Some(points), "actual_points", row)?,
            None => return Ok(RowOutcome::MissingActual),
        };

        let team = self.team.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());

        Ok(RowOutcome::Valid(Observation {
            expert,
            player,
            team,
            position,
            week,
            projected_points,
            actual_points,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> RawObservationRow {
        RawObservationRow {
            expert: Some("espn".to_string()),
            player: Some(" Matt Forte ".to_string()),
            team: Some("CHI".to_string()),
            position: Some("RB".to_string()),
            week: Some(3),
            projected_points: Some(14.5),
            actual_points: Some(21.2),
        }
    }

    #[test]
    fn test_valid_row() {
        match row().validate(1).unwrap() {
            RowOutcome::Valid(obs) => {
                assert_eq!(obs.player, "Matt Forte");
                assert_eq!(obs.position, Position::RB);
                assert_eq!(obs.team.as_deref(), Some("CHI"));
            }
            other => panic!("Expected valid row, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_actual_is_not_an_error() {
        let raw = RawObservationRow { actual_points: None, ..row() };
        assert!(matches!(raw.validate(1).unwrap(), RowOutcome::MissingActual));
    }

    #[test]
    fn test_missing_projection_is_an_error() {
        let raw = RawObservationRow { projected_points: None, ..row() };
        assert!(matches!(
            raw.validate(7),
            Err(LoadError::MissingField { field: "projected_points", row: 7 })
        ));
    }

    #[test]
    fn test_invalid_values() {
        let raw = RawObservationRow { position: Some("LB".to_string()), ..row() };
        assert!(matches!(raw.validate(1), Err(LoadError::InvalidRow { .. })));

        let raw = RawObservationRow { week: Some(0), ..row() };
        assert!(matches!(raw.validate(1), Err(LoadError::InvalidRow { .. })));

        let raw = RawObservationRow { expert: Some("  ".to_string()), ..row() };
        assert!(matches!(raw.validate(1), Err(LoadError::MissingField { field: "expert", .. })));
    }
}
