use async_trait::async_trait;
use tracing::info;

use super::{FlowmailerContext, SentMessage};
use crate::{
    email::{Email, Envelope},
    Result,
};

#[async_trait]
pub trait SendMessage: Send + Sync {
    /// Sends the given email to the recipients of the given envelope.
    async fn send_message(&self, email: &Email, envelope: &Envelope) -> Result<SentMessage>;
}

#[derive(Clone)]
pub struct SendFlowmailerMessage {
    ctx: FlowmailerContext,
}

impl SendFlowmailerMessage {
    pub fn new(ctx: &FlowmailerContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    pub fn new_boxed(ctx: &FlowmailerContext) -> Box<dyn SendMessage> {
        Box::new(Self::new(ctx))
    }
}

#[async_trait]
impl SendMessage for SendFlowmailerMessage {
    async fn send_message(&self, email: &Email, envelope: &Envelope) -> Result<SentMessage> {
        info!("sending flowmailer message through {}", self.ctx);
        self.ctx.send(email, envelope).await
    }
}
