use std::time::Duration;

use guild_stats_dispatcher::{
    BotlistSpace, DiscordBotsOrg, DispatcherBuilder, GenericProvider, WebhookDestination,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let provider = GenericProvider::new(123_456_789, || 1_337)
        .with_shards(|| vec![0, 1], || vec![700, 637]);

    let dispatcher = DispatcherBuilder::new()
        .provider(provider)
        .bot_list(DiscordBotsOrg::new("dbl-token"))
        .bot_list(BotlistSpace::new("space-token"))
        .bot_list(
            WebhookDestination::new("internal", "https://example.com/bots/{id}/stats")
                .with_secret(b"supersecret".to_vec()),
        )
        .shard_mode(true)
        .interval(Duration::from_secs(30 * 60))
        .initial_delay(Duration::from_secs(5))
        .build()?;

    let summary = dispatcher.post().await?;
    println!("delivered={} failed={}", summary.delivered, summary.failed);

    tokio::signal::ctrl_c().await?;
    dispatcher.stop_loop();
    Ok(())
}
