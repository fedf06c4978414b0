pub mod classifier;
pub mod extinf;
pub mod m3u_parser;
pub mod merger;
pub mod pipeline;
pub mod prober;
pub mod snapshot;
