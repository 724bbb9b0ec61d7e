//! Broadcast channels
//!
//! A broadcast channel carries one event from a source tile to every tile
//! on which the channel is open. A single handle spans a set of tiles and
//! holds the same channel index on each of them, so an event routed onto
//! the channel at one end is seen as `Broadcast(n)` at the other.

use crate::error::ResourceError;
use crate::handle::{ResourceHandle, ResourceSpec};
use crate::kind::ResourceKind;
use crate::pool::{Lease, ResourcePool};
use aie_hal::{AieDevice, HalError};
use aie_types::{ControllerId, Event, ModuleType, TileLocation};
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastChannel {
    tiles: Vec<TileLocation>,
}

impl BroadcastChannel {
    /// Channel covering `tiles`; order and duplicates do not matter
    pub fn new(tiles: impl IntoIterator<Item = TileLocation>) -> Self {
        let mut tiles: Vec<_> = tiles.into_iter().collect();
        tiles.sort();
        tiles.dedup();
        Self { tiles }
    }

    pub fn tiles(&self) -> &[TileLocation] {
        &self.tiles
    }
}

impl ResourceSpec for BroadcastChannel {
    const KIND: ResourceKind = ResourceKind::BroadcastChannel;

    fn span(&self, _loc: TileLocation) -> Vec<TileLocation> {
        self.tiles.clone()
    }

    fn check_ready(&self, _loc: TileLocation) -> Result<(), ResourceError> {
        if self.tiles.is_empty() {
            return Err(ResourceError::EmptySpan { kind: Self::KIND });
        }
        Ok(())
    }

    fn start(&self, device: &dyn AieDevice, lease: &Lease) -> Result<(), HalError> {
        let channel = lease.instance();
        for (opened, tile) in lease.tiles().iter().enumerate() {
            if let Err(err) = device.enable_broadcast(*tile, lease.module(), channel) {
                for done in &lease.tiles()[..opened] {
                    if let Err(undo) = device.disable_broadcast(*done, lease.module(), channel) {
                        warn!(loc = %done, channel, error = %undo, "broadcast rollback failed");
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn stop(&self, device: &dyn AieDevice, lease: &Lease) -> Result<(), HalError> {
        let mut first = None;
        for tile in lease.tiles() {
            if let Err(err) = device.disable_broadcast(*tile, lease.module(), lease.instance()) {
                warn!(loc = %tile, channel = lease.instance(), error = %err, "broadcast disable failed");
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }
}

impl ResourceHandle<BroadcastChannel> {
    /// Unreserved channel spanning `tiles` in `module`
    pub fn spanning(
        pool: &Arc<ResourcePool>,
        owner: ControllerId,
        tiles: impl IntoIterator<Item = TileLocation>,
        module: ModuleType,
    ) -> Result<Self, ResourceError> {
        let spec = BroadcastChannel::new(tiles);
        let anchor = spec
            .tiles()
            .first()
            .copied()
            .ok_or(ResourceError::EmptySpan {
                kind: ResourceKind::BroadcastChannel,
            })?;
        Self::new(pool, owner, anchor, module, spec)
    }

    /// Reserved channel index
    pub fn channel(&self) -> Result<u8, ResourceError> {
        Ok(self.require_lease()?.instance())
    }

    /// Event observed at `loc`/`module` when the channel fires
    pub fn event(&self, loc: TileLocation, module: ModuleType) -> Result<Event, ResourceError> {
        let lease = self.require_lease()?;
        if module != lease.module() || !lease.covers(loc) {
            return Err(ResourceError::NotCovered { loc, module });
        }
        Ok(Event::Broadcast(lease.instance()))
    }

    /// Routes `event` raised at `loc` onto the channel
    pub fn route_event(
        &self,
        device: &dyn AieDevice,
        loc: TileLocation,
        event: Event,
    ) -> Result<(), ResourceError> {
        let lease = self.require_lease()?;
        if !lease.covers(loc) {
            return Err(ResourceError::NotCovered {
                loc,
                module: lease.module(),
            });
        }
        device.broadcast_event(loc, lease.module(), lease.instance(), event)?;
        Ok(())
    }
}
