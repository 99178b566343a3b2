mod flush;

pub use flush::cmd_flush;
