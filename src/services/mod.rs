pub mod api;
pub mod orchestrator;
pub mod refresh;
pub mod timeline;
pub mod view;
pub mod wind;
