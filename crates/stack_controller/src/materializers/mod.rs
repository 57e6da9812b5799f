pub mod addons;
pub mod autoscaler;
pub mod common;
pub mod dcgm;
pub mod epp_config;
pub mod gateway;
pub mod inference_pool;
pub mod route;
