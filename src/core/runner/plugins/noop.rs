use crate::core::runner::plugin::Plugin;
use async_trait::async_trait;

/// Defines no capabilities; every hook falls back to its default.
#[derive(Default)]
pub struct NoOpPlugin;

#[async_trait]
impl Plugin for NoOpPlugin {}
