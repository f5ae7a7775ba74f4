use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Line {line}: expected `key = value`")]
    MalformedLine { line: usize },
    #[error("Line {line}: unknown key `{key}`")]
    UnknownKey { line: usize, key: String },
    #[error("Line {line}: invalid value `{value}` for `{key}`")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },
    #[error("Grid size must be at least 2, got {0}")]
    GridTooSmall(i32),
    #[error("Minimum round duration must be positive and not above the initial one")]
    RoundDurations,
}

/// Tunables of a delivery session.
#[derive(Debug, Clone, PartialEq)]
pub struct GameConfiguration {
    /// Buildings per side of the square city.
    pub grid_size: i32,
    /// World units between two building centers.
    pub building_size: f32,
    /// World units per second while holding forward.
    pub forward_speed: f32,
    /// Degrees per second while holding a turn.
    pub turn_speed: f32,
    pub stun_time: f32,
    pub initial_round_duration: f32,
    pub min_round_duration: f32,
    /// Round duration at which routes would have no moves at all.
    pub route_budget: f32,
    pub delivery_points: u32,
    /// Deliver on the building across the street from where the route ends.
    pub change_street_side: bool,
    pub seed: Option<u64>,
}

impl Default for GameConfiguration {
    fn default() -> Self {
        Self {
            grid_size: 6,
            building_size: 100.,
            forward_speed: 100.,
            turn_speed: 90.,
            stun_time: 1.,
            initial_round_duration: 25.,
            min_round_duration: 12.,
            route_budget: 30.,
            delivery_points: 100,
            change_street_side: false,
            seed: None,
        }
    }
}

impl GameConfiguration {
    fn validate(self) -> Result<Self, ConfigurationError> {
        if self.grid_size < 2 {
            return Err(ConfigurationError::GridTooSmall(self.grid_size));
        }
        if self.min_round_duration <= 0. || self.min_round_duration > self.initial_round_duration
        {
            return Err(ConfigurationError::RoundDurations);
        }
        Ok(self)
    }
}

fn parse_value<V: FromStr>(line: usize, key: &str, value: &str) -> Result<V, ConfigurationError> {
    value.parse().map_err(|_| ConfigurationError::InvalidValue {
        line,
        key: key.to_string(),
        value: value.to_string(),
    })
}

impl FromStr for GameConfiguration {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut configuration = GameConfiguration::default();

        for (i, line) in s.lines().enumerate() {
            let line_number = i + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line
                .split_once('=')
                .ok_or(ConfigurationError::MalformedLine { line: line_number })?;
            let (key, value) = (key.trim(), value.trim());

            match key {
                "grid_size" => configuration.grid_size = parse_value(line_number, key, value)?,
                "building_size" => {
                    configuration.building_size = parse_value(line_number, key, value)?
                }
                "forward_speed" => {
                    configuration.forward_speed = parse_value(line_number, key, value)?
                }
                "turn_speed" => configuration.turn_speed = parse_value(line_number, key, value)?,
                "stun_time" => configuration.stun_time = parse_value(line_number, key, value)?,
                "initial_round_duration" => {
                    configuration.initial_round_duration = parse_value(line_number, key, value)?
                }
                "min_round_duration" => {
                    configuration.min_round_duration = parse_value(line_number, key, value)?
                }
                "route_budget" => {
                    configuration.route_budget = parse_value(line_number, key, value)?
                }
                "delivery_points" => {
                    configuration.delivery_points = parse_value(line_number, key, value)?
                }
                "change_street_side" => {
                    configuration.change_street_side = parse_value(line_number, key, value)?
                }
                "seed" => {
                    configuration.seed = match value {
                        "none" => None,
                        _ => Some(parse_value(line_number, key, value)?),
                    }
                }
                _ => {
                    return Err(ConfigurationError::UnknownKey {
                        line: line_number,
                        key: key.to_string(),
                    })
                }
            }
        }

        configuration.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigurationError, GameConfiguration};

    #[test]
    fn test_embedded_configuration_matches_defaults() {
        let configuration: GameConfiguration = include_str!("../config/default.cfg").parse().unwrap();
        assert_eq!(configuration, GameConfiguration::default());
        assert_eq!(configuration.forward_speed, 100.);
        assert_eq!(configuration.turn_speed, 90.);
    }

    #[test]
    fn test_parse_overrides() {
        let s = r#"
# a tiny city
grid_size = 4
seed = 7
change_street_side = true
"#;
        let configuration: GameConfiguration = s.parse().unwrap();
        assert_eq!(configuration.grid_size, 4);
        assert_eq!(configuration.seed, Some(7));
        assert!(configuration.change_street_side);
        assert_eq!(configuration.min_round_duration, 12.);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "grid_size 4".parse::<GameConfiguration>(),
            Err(ConfigurationError::MalformedLine { line: 1 })
        );
        assert_eq!(
            "\nspeed = 4".parse::<GameConfiguration>(),
            Err(ConfigurationError::UnknownKey {
                line: 2,
                key: "speed".to_string()
            })
        );
        assert_eq!(
            "stun_time = long".parse::<GameConfiguration>(),
            Err(ConfigurationError::InvalidValue {
                line: 1,
                key: "stun_time".to_string(),
                value: "long".to_string()
            })
        );
        assert_eq!(
            "grid_size = 1".parse::<GameConfiguration>(),
            Err(ConfigurationError::GridTooSmall(1))
        );
        assert_eq!(
            "min_round_duration = 30".parse::<GameConfiguration>(),
            Err(ConfigurationError::RoundDurations)
        );
    }
}
