use async_trait::async_trait;
use tracing::info;

use super::{FlowmailerContext, SentMessage};
use crate::Result;

#[async_trait]
pub trait SendRawMessage: Send + Sync {
    /// Sends the given raw email message.
    ///
    /// The envelope is derived from the message headers.
    async fn send_raw_message(&self, raw_msg: &[u8]) -> Result<SentMessage>;
}

#[derive(Clone)]
pub struct SendFlowmailerRawMessage {
    ctx: FlowmailerContext,
}

impl SendFlowmailerRawMessage {
    pub fn new(ctx: &FlowmailerContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    pub fn new_boxed(ctx: &FlowmailerContext) -> Box<dyn SendRawMessage> {
        Box::new(Self::new(ctx))
    }
}

#[async_trait]
impl SendRawMessage for SendFlowmailerRawMessage {
    async fn send_raw_message(&self, raw_msg: &[u8]) -> Result<SentMessage> {
        info!("sending raw flowmailer message through {}", self.ctx);
        self.ctx.send_raw(raw_msg).await
    }
}
