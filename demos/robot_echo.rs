//! Echo robot: acknowledges every robot message with its own text and answers
//! graph API invocations with a fixed body.
//!
//! ```text
//! DW_CLIENT_ID=… DW_CLIENT_SECRET=… cargo run --example robot_echo
//! ```

use dwstream::{
    ClientConfig, ClientError, DownstreamEnvelope, DwClient, EventAckData, GraphApiResponse, Replier,
    TOPIC_AI_GRAPH_API, TOPIC_ROBOT,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RobotMessage {
    #[serde(default)]
    sender_staff_id: String,
    #[serde(default)]
    text: Option<RobotText>,
}

#[derive(Debug, Deserialize)]
struct RobotText {
    content: String,
}

async fn on_robot_message(env: DownstreamEnvelope, replier: Replier) {
    let message: RobotMessage = match serde_json::from_str(&env.data) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "robot message not understood");
            RobotMessage::default()
        }
    };
    let content = message.text.map_or_else(String::new, |t| t.content);
    info!(sender = %message.sender_staff_id, %content, "robot message");

    let body = json!({ "msgtype": "text", "text": { "content": format!("echo: {content}") } });
    if let Err(e) = replier.reply(env.message_id(), &body) {
        warn!(error = %e, "robot ack failed");
    }
}

async fn on_graph_api(env: DownstreamEnvelope, replier: Replier) {
    info!(message_id = env.message_id(), "graph api invocation");
    let response = GraphApiResponse::ok(json!({ "text": "hello" }).to_string());
    if let Err(e) = replier.reply_graph_api(env.message_id(), &response) {
        warn!(error = %e, "graph api ack failed");
    }
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env()?.with_keep_alive(true);
    let handle = DwClient::new(config)
        .register_topic(TOPIC_ROBOT, on_robot_message)?
        .register_topic(TOPIC_AI_GRAPH_API, on_graph_api)?
        .register_catch_all(|env: DownstreamEnvelope| async move {
            info!(topic = env.topic(), "event");
            EventAckData::success()
        })
        .connect()
        .await?;

    tokio::select! {
        () = handle.closed() => warn!("connection closed"),
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "ctrl-c handler failed");
            }
            info!("shutting down");
            handle.disconnect();
            handle.closed().await;
        }
    }
    Ok(())
}
