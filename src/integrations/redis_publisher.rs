use crate::integrations::EventPublisher;
use anyhow::Result;

pub struct RedisStreamPublisher {
    pub client: redis::Client,
    pub stream_key: String,
}

impl RedisStreamPublisher {
    pub fn connect(redis_url: &str, stream_key: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(redis_url)?,
            stream_key: stream_key.to_string(),
        })
    }
}

#[async_trait::async_trait]
impl EventPublisher for RedisStreamPublisher {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let body = serde_json::to_string(&payload)?;
        let _: String = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("MAXLEN")
            .arg("~")
            .arg(1_000_000)
            .arg("*")
            .arg("topic")
            .arg(topic)
            .arg("event")
            .arg(body)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}
