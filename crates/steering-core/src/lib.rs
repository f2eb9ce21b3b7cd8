//! Crowd steering simulation: a uniform grid for neighbor discovery, flocking
//! steering and overlap resolution over thousands of agents in a bounded plane.

pub mod agent;
pub mod collision;
pub mod config;
pub mod grid;
pub mod math;
pub mod neighbor;
pub mod steering;
pub mod wall;
pub mod world;
