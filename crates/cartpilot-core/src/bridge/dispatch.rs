use cartpilot_contracts::{Message, encode_to_string};

/// DOM event the page-side engine listens on for host messages.
pub const BRIDGE_EVENT: &str = "CartPilotWebViewMessage";

/// Script message handler the page posts its messages to.
pub const BRIDGE_HANDLER: &str = "CartPilotMessageBridge";

const DETAIL_PREFIX: &str = "{ detail: ";
const DETAIL_SUFFIX: &str = " }));";

/// Script that hands `message` to the page-side engine.
pub fn dispatch_script(message: &Message) -> serde_json::Result<String> {
    // U+2028/U+2029 are legal in JSON strings but end a line in older JS.
    let payload = encode_to_string(message)?
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029");
    Ok(format!(
        "window.dispatchEvent(new CustomEvent({event:?}, {DETAIL_PREFIX}{payload}{DETAIL_SUFFIX}",
        event = BRIDGE_EVENT,
    ))
}

/// The envelope carried by a script built with [`dispatch_script`].
pub fn dispatched_payload(script: &str) -> Option<&str> {
    let start = script.find(DETAIL_PREFIX)? + DETAIL_PREFIX.len();
    script[start..].strip_suffix(DETAIL_SUFFIX)
}
