use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::GeneratorConfig;
use crate::error::Error;
use crate::export;
use crate::graph::RawNetwork;
use crate::hull::{HullOptions, HullType};
use crate::isochrone::IsochroneGenerator;

impl From<Error> for PyErr {
    fn from(err: Error) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

fn parse_hull_type(hull_type: &str) -> PyResult<HullType> {
    match hull_type {
        "Concave" => Ok(HullType::Concave),
        "Convex" => Ok(HullType::Convex),
        _ => Err(PyValueError::new_err(format!("Invalid hull type: {hull_type}"))),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> PyResult<String> {
    serde_json::to_string(value).map_err(|e| Error::GeoJson(e.to_string()).into())
}

/// Isochrones over a road network given as JSON `{"nodes": [...], "segments": [...]}`.
#[pyclass(name = "IsochroneGenerator")]
pub struct PyIsochroneGenerator {
    inner: IsochroneGenerator,
}

#[pymethods]
impl PyIsochroneGenerator {
    #[new]
    #[pyo3(signature = (network_json, default_speed = crate::config::DEFAULT_SPEED_KMH))]
    fn new(network_json: &str, default_speed: f64) -> PyResult<Self> {
        let raw: RawNetwork = serde_json::from_str(network_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid network JSON: {e}")))?;
        let config = GeneratorConfig::default().with_default_speed(default_speed);

        Ok(Self {
            inner: IsochroneGenerator::new(raw, config)?,
        })
    }

    /// Returns the boundary as a GeoJSON geometry string.
    #[pyo3(signature = (name, lat, lon, max_time, alpha = None, hull_type = "Concave"))]
    fn generate_isochrone(
        &mut self,
        name: &str,
        lat: f64,
        lon: f64,
        max_time: f64,
        alpha: Option<f64>,
        hull_type: &str,
    ) -> PyResult<String> {
        let options = HullOptions {
            hull_type: parse_hull_type(hull_type)?,
            alpha: alpha.unwrap_or(self.inner.config().alpha),
        };
        let boundary = self
            .inner
            .generate_isochrone_with(name, lat, lon, max_time, options)?;
        Ok(export::boundary_to_geojson_string(boundary)?)
    }

    /// Returns a JSON list of LineString features.
    fn generate_shortest_paths(&self, name: &str) -> PyResult<String> {
        let route_set = self.inner.generate_shortest_paths(name)?;
        to_json(&route_set.to_features())
    }

    /// Returns a JSON FeatureCollection.
    fn generate_road_network(&self, name: &str) -> PyResult<String> {
        let collection = self.inner.generate_road_network(name)?;
        to_json(&collection)
    }

    fn isochrone_names(&self) -> Vec<String> {
        self.inner
            .isochrone_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    fn remove_isochrone(&mut self, name: &str) -> bool {
        self.inner.remove_isochrone(name).is_some()
    }
}

/// Python module for generating isochrones
#[pymodule]
fn isochrone_generator(_py: Python, m: &PyModule) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PyIsochroneGenerator>()?;
    Ok(())
}
