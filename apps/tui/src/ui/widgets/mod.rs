pub mod flow_map;
pub mod panels;
