//! causeway-adapter-memory - 进程内有界缓存适配器

mod local;

pub use local::*;
