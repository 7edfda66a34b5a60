mod plugin_error;

pub use plugin_error::{map_reqwest_error, ErrorKind, PluginError};
