use msgs::{
    wire::{decode, to_frame},
    Request, Response, SyncError, TabId,
};
use tokio::sync::{mpsc, oneshot};

use crate::events::HostEvent;

/// A frame handed to a context, with the slot its single reply goes into.
#[derive(Debug)]
pub struct Delivery {
    pub frame: Vec<u8>,
    pub reply: Option<oneshot::Sender<Vec<u8>>>,
}

/// Inbox of a content script living in a tab.
pub type ContentPort = mpsc::Sender<Delivery>;

pub const PORT_CAPACITY: usize = 100;

impl Delivery {
    /// Decodes the request and hands back the slot to answer it through.
    pub fn open(self) -> (Result<Request, SyncError>, Responder) {
        let request = decode::<Request>(&self.frame);
        (request, Responder { reply: self.reply })
    }

    /// Splits off the raw frame, for callers that forward it untouched.
    pub fn into_parts(self) -> (Vec<u8>, Responder) {
        (self.frame, Responder { reply: self.reply })
    }
}

/// Answers one delivery. Consumed on use, so a request gets at most one response.
#[derive(Debug)]
pub struct Responder {
    reply: Option<oneshot::Sender<Vec<u8>>>,
}

impl Responder {
    pub fn expects_reply(&self) -> bool {
        self.reply.is_some()
    }

    pub fn respond(self, response: &Response) {
        match to_frame(response) {
            Ok(frame) => self.respond_raw(frame),
            Err(e) => tracing::error!("failed to encode response: {e}"),
        }
    }

    pub fn respond_raw(self, frame: Vec<u8>) {
        let Some(reply) = self.reply else {
            return
        };
        if reply.send(frame).is_err() {
            tracing::debug!("caller went away before the response arrived");
        }
    }
}

fn no_receiver() -> SyncError {
    SyncError::unreachable("Could not establish connection. Receiving end does not exist.")
}

fn port_closed() -> SyncError {
    SyncError::unreachable("The message port closed before a response was received.")
}

/// Sends a raw frame and waits for the raw reply frame.
pub async fn send_frame(port: &ContentPort, frame: Vec<u8>) -> Result<Vec<u8>, SyncError> {
    let (tx, rx) = oneshot::channel();
    port.send(Delivery { frame, reply: Some(tx) }).await.map_err(|_| no_receiver())?;
    rx.await.map_err(|_| port_closed())
}

/// Sends `request` and waits for its response. `Response::Error` comes back as `Err`.
pub async fn send_message(port: &ContentPort, request: &Request) -> Result<Response, SyncError> {
    let reply = send_frame(port, to_frame(request)?).await?;
    decode::<Response>(&reply)?.into_result()
}

/// Fire-and-forget delivery.
pub async fn post_message(port: &ContentPort, request: &Request) -> Result<(), SyncError> {
    let frame = to_frame(request)?;
    port.send(Delivery { frame, reply: None }).await.map_err(|_| no_receiver())
}

/// The channel a content script uses to talk to the coordinator.
#[derive(Debug, Clone)]
pub struct RuntimePort {
    sender: TabId,
    tx: mpsc::UnboundedSender<HostEvent>,
}

impl RuntimePort {
    pub fn new(sender: TabId, tx: mpsc::UnboundedSender<HostEvent>) -> RuntimePort {
        RuntimePort { sender, tx }
    }

    pub fn sender(&self) -> TabId {
        self.sender
    }

    pub async fn send_message(&self, request: &Request) -> Result<Response, SyncError> {
        let (reply, rx) = oneshot::channel();
        let delivery = Delivery { frame: to_frame(request)?, reply: Some(reply) };
        self.tx
            .send(HostEvent::RuntimeMessage { sender: self.sender, delivery })
            .map_err(|_| no_receiver())?;
        let frame = rx.await.map_err(|_| port_closed())?;
        decode::<Response>(&frame)?.into_result()
    }
}
