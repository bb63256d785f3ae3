//! Hash map used by host-side tables. Enabling `std-hash` swaps hashbrown
//! for the standard library map.

#[cfg(feature = "std-hash")]
use std::collections::HashMap;

#[cfg(not(feature = "std-hash"))]
use hashbrown::HashMap;

use crate::element::EventHandler;

/// Listeners of one host element keyed by event name, in registration order
/// per event.
pub type ListenerMap = HashMap<String, Vec<EventHandler>>;
