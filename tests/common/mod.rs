#![allow(dead_code)]

use std::future::{Future, poll_fn};

use jsonlink::{Client, FrameRead, FrameWrite, Methods, NO_PARAMS, Result};
use serde_json::Value;
use tokio::sync::mpsc;

/// Raw-frame handle to the remote end of a client under test: inject
/// inbound frames, observe outbound ones. Dropping it closes the client's
/// inbound half.
pub struct Peer {
    to_client: mpsc::UnboundedSender<String>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl Peer {
    /// Delivers one raw frame to the client.
    pub fn send(&self, frame: impl Into<String>) {
        self.to_client.send(frame.into()).unwrap();
    }

    /// The next frame the client wrote, parsed as JSON.
    pub async fn recv_json(&mut self) -> Value {
        let frame = self
            .from_client
            .recv()
            .await
            .expect("client closed its writer");
        serde_json::from_str(&frame).unwrap()
    }
}

struct PeerReader(mpsc::UnboundedReceiver<String>);

impl FrameRead for PeerReader {
    fn read(&mut self) -> impl Future<Output = Result<Option<String>>> + Send + Sync {
        poll_fn(|cx| self.0.poll_recv(cx).map(Ok))
    }
}

struct PeerWriter(mpsc::UnboundedSender<String>);

impl FrameWrite for PeerWriter {
    fn write(&mut self, frame: &str) -> impl Future<Output = Result<()>> + Send + Sync {
        let _ = self.0.send(frame.to_owned());
        async { Ok(()) }
    }
}

/// A client wired to in-memory frame channels the test fully controls.
pub fn client_with_peer(methods: Methods) -> (Client, Peer) {
    let (to_client, inbound) = mpsc::unbounded_channel();
    let (outbound, from_client) = mpsc::unbounded_channel();
    let client = Client::with_methods(methods, PeerReader(inbound), PeerWriter(outbound));
    (
        client,
        Peer {
            to_client,
            from_client,
        },
    )
}

/// One full call round-trip answered by the peer. Dispatch handles frames
/// in order, so returning from here guarantees every earlier inbound frame
/// has been processed.
pub async fn round_trip(client: &Client, peer: &mut Peer) {
    let call = client.call::<_, Value>("sync", NO_PARAMS);
    let drive = async {
        let frame = peer.recv_json().await;
        peer.send(format!(
            r#"{{"jsonrpc":"2.0","result":"done","id":{}}}"#,
            frame["id"]
        ));
    };
    let (got, ()) = tokio::join!(call, drive);
    got.expect("sync round-trip failed");
}
