pub mod bracket;
pub mod config;
pub mod graph;
pub mod http_client;
pub mod layout;
pub mod leaderboard;
pub mod model;
pub mod persist;
pub mod propagate;
pub mod provider;
pub mod rows;
pub mod sheet_fetch;
pub mod state;
pub mod submit;
