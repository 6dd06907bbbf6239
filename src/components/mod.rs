pub mod connection_graph;
