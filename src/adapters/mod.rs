// Adapters layer: default implementations of the ports for running outside a web application.

pub mod form;
pub mod http;
pub mod wkt;
