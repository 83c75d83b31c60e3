use serde::Deserialize;
use thiserror::Error;

use crate::command::{run_command_output, CommandError};
use crate::geo::Coordinates;

/// Where the current position comes from.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum LocationSource {
    #[default]
    Disabled,
    Fixed {
        latitude: f64,
        longitude: f64,
    },
    /// Run a program that prints `latitude,longitude`, `latitude longitude`
    /// or a `{"latitude":..,"longitude":..}` object on stdout.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum LocationError {
    #[error("no location source configured")]
    Disabled,
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("invalid location reading: {message}")]
    InvalidReading { message: String },
}

pub trait LocationProvider {
    fn current_position(&self) -> Result<Coordinates, LocationError>;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    coordinates: Coordinates,
}

impl FixedLocationProvider {
    pub const fn new(coordinates: Coordinates) -> Self {
        Self { coordinates }
    }
}

impl LocationProvider for FixedLocationProvider {
    fn current_position(&self) -> Result<Coordinates, LocationError> {
        if !self.coordinates.is_valid() {
            return Err(LocationError::InvalidReading {
                message: format!("configured location out of range: {}", self.coordinates),
            });
        }
        Ok(self.coordinates)
    }
}

#[derive(Debug, Clone)]
pub struct CommandLocationProvider {
    program: String,
    args: Vec<String>,
}

impl CommandLocationProvider {
    pub fn new(program: String, args: Vec<String>) -> Self {
        Self { program, args }
    }
}

impl LocationProvider for CommandLocationProvider {
    fn current_position(&self) -> Result<Coordinates, LocationError> {
        let stdout = run_command_output(&self.program, &self.args)?;
        let coords = parse_coordinates(&stdout)?;
        tracing::debug!(program = %self.program, %coords, "sampled location");
        Ok(coords)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledLocationProvider;

impl LocationProvider for DisabledLocationProvider {
    fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Disabled)
    }
}

pub fn location_provider_for(source: &LocationSource) -> Box<dyn LocationProvider> {
    match source {
        LocationSource::Disabled => Box::new(DisabledLocationProvider),
        LocationSource::Fixed {
            latitude,
            longitude,
        } => Box::new(FixedLocationProvider::new(Coordinates::new(
            *latitude, *longitude,
        ))),
        LocationSource::Command { program, args } => {
            Box::new(CommandLocationProvider::new(program.clone(), args.clone()))
        }
    }
}

pub fn parse_coordinates(raw: &str) -> Result<Coordinates, LocationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(LocationError::InvalidReading {
            message: "empty location reading".to_string(),
        });
    }

    let coords = if trimmed.starts_with('{') {
        serde_json::from_str::<Coordinates>(trimmed).map_err(|err| {
            LocationError::InvalidReading {
                message: format!("invalid location json: {err}"),
            }
        })?
    } else {
        let mut parts = trimmed
            .split(|ch: char| ch == ',' || ch.is_whitespace())
            .filter(|part| !part.is_empty());
        let (Some(latitude), Some(longitude), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(LocationError::InvalidReading {
                message: format!("expected 'latitude,longitude', got '{trimmed}'"),
            });
        };
        Coordinates::new(parse_degrees(latitude)?, parse_degrees(longitude)?)
    };

    if !coords.is_valid() {
        return Err(LocationError::InvalidReading {
            message: format!("coordinates out of range: {coords}"),
        });
    }
    Ok(coords)
}

fn parse_degrees(value: &str) -> Result<f64, LocationError> {
    value
        .parse::<f64>()
        .map_err(|err| LocationError::InvalidReading {
            message: format!("invalid degrees '{value}': {err}"),
        })
}
