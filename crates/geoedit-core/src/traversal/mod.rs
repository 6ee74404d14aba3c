pub mod topo;

pub use topo::{is_topologically_ordered, topo_sort};
