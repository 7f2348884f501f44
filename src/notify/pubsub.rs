use futures_util::StreamExt;
use redis::Client;
use tracing::debug;

use crate::keys;
use crate::notify::WaiterRegistry;

/// Per-instance bus subscriber.
///
/// One dedicated connection pattern-subscribes to every user notification
/// channel and dispatches payloads to whichever waiter this instance holds.
/// Publishes for users waited on elsewhere (or nowhere) are dropped here,
/// which is the at-most-once contract.
pub async fn start_match_listener(
    client: Client,
    registry: WaiterRegistry,
) -> redis::RedisResult<()> {
    // Pub/sub requires a dedicated connection, not the multiplexed manager.
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(keys::match_channel_pattern()).await?;
    let mut stream = pubsub.on_message();

    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let payload: String = msg.get_payload()?;
        let Some(user_id) = keys::user_from_match_channel(&channel) else {
            continue;
        };
        if !registry.deliver(user_id, payload).await {
            debug!(user_id, "no local waiter for match publish, dropped");
        }
    }

    Ok(())
}
