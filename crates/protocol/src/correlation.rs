//! Correlation key derivation.

/// Derive the correlation key for a command name.
///
/// The daemon replies to `check_*` commands with a `result.type` that omits
/// the prefix (`check_order_count` comes back as `order_count`), so a literal
/// leading `check_` is removed when registering callbacks. Applied to command
/// names on the send side only; the received `result.type` is matched as-is,
/// and the wire `command` field keeps the full name.
pub fn correlation_key(command: &str) -> &str {
    command.strip_prefix("check_").unwrap_or(command)
}
