//! Error types for instance validation and search configuration.

use std::fmt;

/// Errors surfaced by instance construction and the search engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A client was constructed with a negative demand.
    NegativeDemand { client: usize, demand: i64 },
    /// A client was constructed with a negative service duration.
    NegativeServiceDuration { client: usize, duration: i64 },
    /// A client time window closes before it opens.
    InvalidTimeWindow { client: usize, early: i64, late: i64 },
    /// A client was constructed with a negative release time.
    NegativeReleaseTime { client: usize, release: i64 },
    /// The depot must have zero demand and zero service duration.
    InvalidDepot,
    /// A distance or duration matrix does not match the number of clients.
    MatrixDimensionMismatch { expected: usize, actual: usize },
    /// More routes were supplied than there are vehicles.
    TooManyRoutes { routes: usize, vehicles: usize },
    /// The granular neighbourhood size is zero.
    EmptyNeighbourhood,
    /// `search` was called without any registered node operators.
    NoOperators,
    /// The population holds no individuals to select from.
    EmptyPopulation,
    /// An instance file could not be parsed.
    ParseError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NegativeDemand { client, demand } => {
                write!(f, "client {} has negative demand {}", client, demand)
            }
            Error::NegativeServiceDuration { client, duration } => {
                write!(
                    f,
                    "client {} has negative service duration {}",
                    client, duration
                )
            }
            Error::InvalidTimeWindow {
                client,
                early,
                late,
            } => {
                write!(
                    f,
                    "client {} has time window [{}, {}] closing before it opens",
                    client, early, late
                )
            }
            Error::NegativeReleaseTime { client, release } => {
                write!(f, "client {} has negative release time {}", client, release)
            }
            Error::InvalidDepot => {
                write!(f, "depot must have zero demand and zero service duration")
            }
            Error::MatrixDimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "matrix dimension mismatch: expected {expected}x{expected}, got {actual}x{actual}"
                )
            }
            Error::TooManyRoutes { routes, vehicles } => {
                write!(f, "{} routes given for {} vehicles", routes, vehicles)
            }
            Error::EmptyNeighbourhood => {
                write!(f, "granular neighbourhood size must be positive")
            }
            Error::NoOperators => write!(f, "no known node operators"),
            Error::EmptyPopulation => write!(f, "population holds no individuals"),
            Error::ParseError(msg) => write!(f, "could not parse instance: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}
