//! Named isochrones over one network.
//!
//! [`IsochroneGenerator`] owns a [`TimeWeightedNetwork`], a registry of the
//! isochrones generated so far and an LRU cache of computed boundaries. Routes
//! and network exports are always derived from a registered isochrone, so they
//! refer to exactly the subgraph its boundary was drawn around.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::Instant;

use geo::Point;
use geojson::FeatureCollection;
use log::{debug, info};
use petgraph::graph::NodeIndex;

use crate::cache::{CachedIsochrone, IsochroneCache, IsochroneKey};
use crate::config::GeneratorConfig;
use crate::error::{Error, Result};
use crate::export;
use crate::graph::{RawNetwork, TimeWeightedNetwork};
use crate::hull::{self, Boundary, HullOptions, HullType};
use crate::reachability::{self, ReachableSubgraph};
use crate::routes::{self, RouteSet};

#[derive(Debug, Clone, PartialEq)]
pub struct IsochroneResult {
    pub name: String,
    pub boundary: Boundary,
    pub subgraph: ReachableSubgraph,
    pub source: NodeIndex,
}

#[derive(Debug)]
pub struct IsochroneGenerator {
    network: TimeWeightedNetwork,
    config: GeneratorConfig,
    registry: HashMap<String, IsochroneResult>,
    cache: IsochroneCache,
}

impl IsochroneGenerator {
    pub fn new(raw: RawNetwork, config: GeneratorConfig) -> Result<Self> {
        config.validate()?;
        let network = TimeWeightedNetwork::new(raw, config.default_speed_kmh)?;
        let cache = IsochroneCache::new(config.cache_capacity);

        Ok(Self {
            network,
            config,
            registry: HashMap::new(),
            cache,
        })
    }

    pub fn network(&self) -> &TimeWeightedNetwork {
        &self.network
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Configured boundary options, with the strategy optionally overridden.
    pub fn hull_options(&self, hull_type: Option<HullType>) -> HullOptions {
        HullOptions {
            hull_type: hull_type.unwrap_or(self.config.hull_type),
            alpha: self.config.alpha,
        }
    }

    /// Computes the area reachable from the node nearest to (`lat`, `lon`)
    /// within `max_time` minutes and registers it under `name`, replacing any
    /// isochrone of that name.
    pub fn generate_isochrone(
        &mut self,
        name: &str,
        lat: f64,
        lon: f64,
        max_time: f64,
        hull_type: Option<HullType>,
    ) -> Result<&Boundary> {
        let options = self.hull_options(hull_type);
        self.generate_isochrone_with(name, lat, lon, max_time, options)
    }

    /// Like [`generate_isochrone`](Self::generate_isochrone), with explicit
    /// boundary options.
    pub fn generate_isochrone_with(
        &mut self,
        name: &str,
        lat: f64,
        lon: f64,
        max_time: f64,
        options: HullOptions,
    ) -> Result<&Boundary> {
        options.validate()?;
        let key = IsochroneKey::new(lat, lon, max_time, options);

        let computed = match self.cache.get(&key) {
            Some(cached) => {
                debug!("Isochrone cache hit for {name:?}");
                cached.clone()
            }
            None => {
                let computed = self.compute(lat, lon, max_time, options)?;
                self.cache.put(key, computed.clone());
                computed
            }
        };

        info!(
            "Isochrone {name:?}: {} nodes within {max_time} min, {} boundary part(s)",
            computed.subgraph.node_count(),
            computed.boundary.part_count()
        );

        let result = IsochroneResult {
            name: name.to_string(),
            source: computed.subgraph.source(),
            boundary: computed.boundary,
            subgraph: computed.subgraph,
        };

        let stored = match self.registry.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                entry.insert(result);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(result),
        };
        Ok(&stored.boundary)
    }

    /// Boundaries for several budgets around one point, in the order given.
    ///
    /// A single search at the largest budget serves all of them. The results
    /// are not registered.
    pub fn generate_isochrones(
        &self,
        lat: f64,
        lon: f64,
        budgets: &[f64],
        hull_type: Option<HullType>,
    ) -> Result<Vec<Boundary>> {
        let options = self.hull_options(hull_type);
        options.validate()?;
        let Some(largest) = budgets.iter().copied().reduce(f64::max) else {
            return Ok(Vec::new());
        };

        let start_time = Instant::now();
        let source = self.network.latlon_to_node(lat, lon)?;
        let full = reachability::reachable(&self.network, source, largest)?;

        let boundaries = budgets
            .iter()
            .map(|&budget| {
                let subgraph = full.restrict(&self.network, budget)?;
                hull::boundary(&self.positions(&subgraph), options)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Generated {} isochrones from one search in {:?}",
            boundaries.len(),
            start_time.elapsed()
        );

        Ok(boundaries)
    }

    /// Shortest-by-distance routes from the isochrone's source to its boundary.
    pub fn generate_shortest_paths(&self, name: &str) -> Result<RouteSet> {
        let result = self.isochrone(name)?;
        routes::shortest_paths(&self.network, &result.subgraph, &result.boundary, name)
    }

    /// The roads and nodes inside the isochrone as a feature collection.
    pub fn generate_road_network(&self, name: &str) -> Result<FeatureCollection> {
        let result = self.isochrone(name)?;
        Ok(export::road_network_to_geojson(&self.network, &result.subgraph))
    }

    pub fn isochrone(&self, name: &str) -> Result<&IsochroneResult> {
        self.registry
            .get(name)
            .ok_or_else(|| Error::UnknownIsochrone(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn isochrone_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn remove_isochrone(&mut self, name: &str) -> Option<IsochroneResult> {
        self.registry.remove(name)
    }

    /// Replaces the network. Registered isochrones and cached results refer
    /// to the old one, so both are dropped. On error nothing changes.
    pub fn reload_network(&mut self, raw: RawNetwork) -> Result<()> {
        let network = TimeWeightedNetwork::new(raw, self.config.default_speed_kmh)?;

        self.network = network;
        self.registry.clear();
        self.cache.clear();
        info!("Network reloaded, cleared registered isochrones");

        Ok(())
    }

    fn compute(
        &self,
        lat: f64,
        lon: f64,
        max_time: f64,
        options: HullOptions,
    ) -> Result<CachedIsochrone> {
        let source = self.network.latlon_to_node(lat, lon)?;
        let subgraph = reachability::reachable(&self.network, source, max_time)?;
        let boundary = hull::boundary(&self.positions(&subgraph), options)?;

        Ok(CachedIsochrone { boundary, subgraph })
    }

    fn positions(&self, subgraph: &ReachableSubgraph) -> Vec<Point<f64>> {
        subgraph
            .nodes()
            .map(|node_index| self.network.position(node_index))
            .collect()
    }
}
