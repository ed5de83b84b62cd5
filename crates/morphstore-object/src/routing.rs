//! Name-based server routing.

/// Routes an object name to a server index.
///
/// Computed once at handle construction and stable for the handle's lifetime;
/// it is the routing key for the object's backend server.
pub fn route_index(name: &str, server_count: u32) -> u32 {
    debug_assert!(server_count > 0);
    let hash = blake3::hash(name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&hash.as_bytes()[..8]);
    (u64::from_le_bytes(prefix) % u64::from(server_count)) as u32
}
