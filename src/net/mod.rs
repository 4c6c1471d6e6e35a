//! Peer synchronization
//!
//! Best-effort position gossip over stateless HTTP. The simulation thread
//! never blocks on anything in here except cloning the latest roster
//! snapshot.

pub mod roster;
pub mod sync;
pub mod transport;
pub mod wire;

pub use roster::{PeerMotion, PeerRoster, RosterSnapshot, SharedPosition, SharedRoster};
pub use sync::{Cadence, PeerSync, SyncLink, SyncOutcome};
pub use transport::{HttpTransport, Transport};
pub use wire::{decode_position, encode_position, parse_roster};
