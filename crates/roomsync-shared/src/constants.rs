/// Inbound push and outbound send share this event name
pub const EVENT_NEW_MESSAGE: &str = "messages:new_message";

/// Outbound backfill request
pub const EVENT_GET_OLD_MESSAGES: &str = "messages:get_old_messages";

/// Separator between the two sorted identities of a direct-chat room id
pub const ROOM_ID_SEPARATOR: &str = "-";

/// Scroll offset (distance from top of loaded history) at or below which
/// older history is prefetched
pub const SCROLL_PREFETCH_THRESHOLD: f64 = 200.0;

/// Maximum length of a username or channel name, in chars
pub const MAX_NAME_LEN: usize = 64;

/// Maximum length of an outgoing message, in chars
pub const MAX_MESSAGE_LEN: usize = 4_000;

/// Default backfill request timeout in milliseconds
pub const DEFAULT_BACKFILL_TIMEOUT_MS: u64 = 10_000;

/// Default capacity of the cache-update broadcast channel
pub const DEFAULT_UPDATE_BUFFER: usize = 256;
