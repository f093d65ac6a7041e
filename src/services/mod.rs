pub mod hotspots;
pub mod interactions;
pub mod recommendations;
pub mod scoring;
pub mod social_graph;
pub mod video_search;
