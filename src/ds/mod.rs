pub mod sharded_map;

pub use sharded_map::{ShardedMap, Slot};

pub(crate) use sharded_map::default_shard_count;
