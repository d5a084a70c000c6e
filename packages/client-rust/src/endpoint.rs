//! Endpoint resolution and weighted selection.
//!
//! Locations come in three shapes: a single `"host:port"` string, a list of
//! them, or a map from location to dispatch weight. Missing ports default
//! to 11211. List and single forms get uniform weight 1; map weights are
//! honored as given.

use std::collections::HashMap;

use crate::error::{ClientError, Result};

/// The memcached default port, assumed when a location omits one.
pub const DEFAULT_PORT: u16 = 11211;

/// One server the client may dispatch to.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Relative dispatch weight; must be positive.
    pub weight: f64,
}

impl Endpoint {
    /// Parses `"host:port"` (or bare `"host"`) with the given weight.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::BadEndpoint`] on an empty host, an unparsable
    /// port, or a non-positive weight.
    pub fn parse(location: &str, weight: f64) -> Result<Self> {
        if weight <= 0.0 {
            return Err(ClientError::BadEndpoint(format!(
                "{location}: weight must be positive"
            )));
        }
        let (host, port) = match location.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| ClientError::BadEndpoint(location.to_string()))?;
                (host, port)
            }
            None => (location, DEFAULT_PORT),
        };
        if host.is_empty() {
            return Err(ClientError::BadEndpoint(location.to_string()));
        }
        Ok(Self {
            host: host.to_string(),
            port,
            weight,
        })
    }

    /// The `host:port` form of this endpoint.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The accepted location shapes.
#[derive(Debug, Clone)]
pub enum Locations {
    /// One `"host:port"`.
    Single(String),
    /// Several locations with uniform weight.
    List(Vec<String>),
    /// Locations with caller-supplied weights.
    Weighted(Vec<(String, f64)>),
}

impl Locations {
    /// Resolves the location shape into concrete endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NoEndpoints`] for an empty list or map, and
    /// [`ClientError::BadEndpoint`] for an unparsable location.
    pub fn resolve(&self) -> Result<Vec<Endpoint>> {
        let endpoints = match self {
            Locations::Single(location) => vec![Endpoint::parse(location, 1.0)?],
            Locations::List(locations) => locations
                .iter()
                .map(|location| Endpoint::parse(location, 1.0))
                .collect::<Result<Vec<_>>>()?,
            Locations::Weighted(pairs) => pairs
                .iter()
                .map(|(location, weight)| Endpoint::parse(location, *weight))
                .collect::<Result<Vec<_>>>()?,
        };
        if endpoints.is_empty() {
            return Err(ClientError::NoEndpoints);
        }
        Ok(endpoints)
    }
}

impl From<&str> for Locations {
    fn from(location: &str) -> Self {
        Locations::Single(location.to_string())
    }
}

impl From<String> for Locations {
    fn from(location: String) -> Self {
        Locations::Single(location)
    }
}

impl From<Vec<String>> for Locations {
    fn from(locations: Vec<String>) -> Self {
        Locations::List(locations)
    }
}

impl From<Vec<&str>> for Locations {
    fn from(locations: Vec<&str>) -> Self {
        Locations::List(locations.into_iter().map(str::to_string).collect())
    }
}

impl From<HashMap<String, f64>> for Locations {
    fn from(weighted: HashMap<String, f64>) -> Self {
        Locations::Weighted(weighted.into_iter().collect())
    }
}

/// Maps a draw from `[0, sum(weights))` to an index: walk the weights,
/// subtracting each, until the remainder is no longer positive.
#[must_use]
pub fn pick_weighted(weights: &[f64], mut draw: f64) -> usize {
    debug_assert!(!weights.is_empty());
    for (index, weight) in weights.iter().enumerate() {
        draw -= weight;
        if draw <= 0.0 {
            return index;
        }
    }
    weights.len() - 1
}
