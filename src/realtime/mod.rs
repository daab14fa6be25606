/// Realtime notification relay
///
/// Forwards freshly written notifications to connected clients on a per-user
/// channel. Best-effort: no backfill, no reconnection protocol.

pub mod manager;
pub mod messages;

pub use manager::ConnectionManager;
pub use messages::RealtimeMessage;
