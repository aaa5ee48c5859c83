//! Problem definition and instance reading for the VRPTW.

use crate::error::Error;
use crate::matrix::Matrix;
use crate::{Distance, Duration, Load};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A client (or the depot, at index 0) in the problem instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub x: i64,
    pub y: i64,
    pub demand: Load,
    pub service_duration: Duration,
    /// Earliest possible visit moment
    pub tw_early: Duration,
    /// Latest possible visit moment
    pub tw_late: Duration,
    /// Routes visiting this client cannot leave the depot before this time
    pub release_time: Duration,
}

impl Client {
    /// Create a new client.
    pub fn new(
        x: i64,
        y: i64,
        demand: Load,
        service_duration: Duration,
        tw_early: Duration,
        tw_late: Duration,
        release_time: Duration,
    ) -> Self {
        Client {
            x,
            y,
            demand,
            service_duration,
            tw_early,
            tw_late,
            release_time,
        }
    }
}

/// An immutable VRPTW instance: clients, fleet, and travel matrices.
///
/// Index 0 of `clients` is the depot. The distance and duration matrices
/// cover clients and depot; no symmetry is assumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemData {
    clients: Vec<Client>,
    num_vehicles: usize,
    vehicle_capacity: Load,
    dist: Matrix<Distance>,
    dur: Matrix<Duration>,
}

impl ProblemData {
    /// Create a new problem instance. Validates all client attributes, the
    /// depot, and the matrix dimensions.
    pub fn new(
        clients: Vec<Client>,
        num_vehicles: usize,
        vehicle_capacity: Load,
        dist: Matrix<Distance>,
        dur: Matrix<Duration>,
    ) -> Result<Self, Error> {
        for (idx, client) in clients.iter().enumerate() {
            if client.demand < 0 {
                return Err(Error::NegativeDemand {
                    client: idx,
                    demand: client.demand,
                });
            }

            if client.service_duration < 0 {
                return Err(Error::NegativeServiceDuration {
                    client: idx,
                    duration: client.service_duration,
                });
            }

            if client.tw_early > client.tw_late {
                return Err(Error::InvalidTimeWindow {
                    client: idx,
                    early: client.tw_early,
                    late: client.tw_late,
                });
            }

            if client.release_time < 0 {
                return Err(Error::NegativeReleaseTime {
                    client: idx,
                    release: client.release_time,
                });
            }
        }

        let depot = &clients[0];
        if depot.demand != 0 || depot.service_duration != 0 {
            return Err(Error::InvalidDepot);
        }

        if dist.size() != clients.len() {
            return Err(Error::MatrixDimensionMismatch {
                expected: clients.len(),
                actual: dist.size(),
            });
        }

        if dur.size() != clients.len() {
            return Err(Error::MatrixDimensionMismatch {
                expected: clients.len(),
                actual: dur.size(),
            });
        }

        Ok(ProblemData {
            clients,
            num_vehicles,
            vehicle_capacity,
            dist,
            dur,
        })
    }

    /// Get the client (or depot) at the given index.
    pub fn client(&self, idx: usize) -> &Client {
        &self.clients[idx]
    }

    /// Get the depot.
    pub fn depot(&self) -> &Client {
        &self.clients[0]
    }

    /// The number of clients, excluding the depot.
    pub fn num_clients(&self) -> usize {
        self.clients.len() - 1
    }

    /// The number of vehicles in the fleet.
    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }

    /// The capacity shared by all vehicles.
    pub fn vehicle_capacity(&self) -> Load {
        self.vehicle_capacity
    }

    /// Travel distance from one location to another.
    pub fn dist(&self, from: usize, to: usize) -> Distance {
        self.dist.get(from, to)
    }

    /// Travel duration from one location to another.
    pub fn duration(&self, from: usize, to: usize) -> Duration {
        self.dur.get(from, to)
    }

    /// The full distance matrix, used by segment merges.
    pub fn distance_matrix(&self) -> &Matrix<Distance> {
        &self.dist
    }

    /// The full duration matrix, used by segment merges.
    pub fn duration_matrix(&self) -> &Matrix<Duration> {
        &self.dur
    }

    /// The centre of all client locations (excluding the depot).
    pub fn centroid(&self) -> (f64, f64) {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;

        for client in &self.clients[1..] {
            sum_x += client.x as f64;
            sum_y += client.y as f64;
        }

        let count = self.num_clients().max(1) as f64;
        (sum_x / count, sum_y / count)
    }

    /// Read an instance in VRPLIB format, with optional time window,
    /// service time, and release time sections. Distances are rounded
    /// Euclidean; durations equal distances for such instances.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let mut dimension = 0;
        let mut num_vehicles = 0;
        let mut capacity: Load = 0;

        let mut coords: Vec<(i64, i64)> = Vec::new();
        let mut demands: Vec<Load> = Vec::new();
        let mut windows: Vec<(Duration, Duration)> = Vec::new();
        let mut services: Vec<Duration> = Vec::new();
        let mut releases: Vec<Duration> = Vec::new();

        let mut section = String::new();

        for line in reader.lines() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line == "EOF" {
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim();
                let value = value.trim();

                match key {
                    "DIMENSION" => dimension = parse_num(value)? as usize,
                    "VEHICLES" => num_vehicles = parse_num(value)? as usize,
                    "CAPACITY" => capacity = parse_num(value)?,
                    _ => {} // NAME, COMMENT, TYPE, EDGE_WEIGHT_TYPE, ...
                }

                continue;
            }

            if line.ends_with("_SECTION") {
                section = line.to_string();
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();

            match section.as_str() {
                "NODE_COORD_SECTION" if fields.len() >= 3 => {
                    coords.push((parse_num(fields[1])?, parse_num(fields[2])?));
                }
                "DEMAND_SECTION" if fields.len() >= 2 => {
                    demands.push(parse_num(fields[1])?);
                }
                "TIME_WINDOW_SECTION" if fields.len() >= 3 => {
                    windows.push((parse_num(fields[1])?, parse_num(fields[2])?));
                }
                "SERVICE_TIME_SECTION" if fields.len() >= 2 => {
                    services.push(parse_num(fields[1])?);
                }
                "RELEASE_TIME_SECTION" if fields.len() >= 2 => {
                    releases.push(parse_num(fields[1])?);
                }
                _ => {} // DEPOT_SECTION and unknown sections
            }
        }

        if dimension == 0 || coords.len() != dimension || demands.len() != dimension {
            return Err(Error::ParseError(format!(
                "expected {} coordinate and demand entries, got {} and {}",
                dimension,
                coords.len(),
                demands.len()
            )));
        }

        // Optional sections default to all-zero service/release and wide
        // open time windows.
        let horizon = Duration::MAX / 4;
        windows.resize(dimension, (0, horizon));
        services.resize(dimension, 0);
        releases.resize(dimension, 0);

        if num_vehicles == 0 {
            num_vehicles = dimension - 1; // one vehicle per client at worst
        }

        let clients = (0..dimension)
            .map(|idx| {
                Client::new(
                    coords[idx].0,
                    coords[idx].1,
                    demands[idx],
                    services[idx],
                    windows[idx].0,
                    windows[idx].1,
                    releases[idx],
                )
            })
            .collect();

        let mut dist = Matrix::new(dimension);

        for i in 0..dimension {
            for j in 0..dimension {
                let dx = (coords[i].0 - coords[j].0) as f64;
                let dy = (coords[i].1 - coords[j].1) as f64;
                dist.set(i, j, (dx * dx + dy * dy).sqrt().round() as Distance);
            }
        }

        let dur = dist.clone();
        ProblemData::new(clients, num_vehicles, capacity, dist, dur)
    }
}

fn parse_num(value: &str) -> Result<i64, Error> {
    value
        .parse::<f64>()
        .map(|num| num.round() as i64)
        .map_err(|_| Error::ParseError(format!("invalid number '{}'", value)))
}
