// Export our modules for use in binaries, the web app and tests
pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
pub mod map;
pub mod scene;

pub use config::{Length, MapOptions};
pub use domain::{FlowOptions, FlowRecord};
pub use error::{FlowMapError, Result};
pub use geo::Geography;
pub use map::{demo_flows, FlowEdge, FlowId, FlowMap, UpdateSummary};
