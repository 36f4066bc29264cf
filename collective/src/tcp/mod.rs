//! A collective over framed links arranged as a star around the root.

mod bootstrap;
mod star;

pub use bootstrap::{TcpCollective, accept_peers, bind_root, connect_root};
pub use star::{Link, StarCollective};
