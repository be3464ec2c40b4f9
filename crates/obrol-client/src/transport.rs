//! WebSocket transport for the client.
//!
//! Provides [`ConnectedTransport`] which handles WebSocket I/O for text
//! frames. This is a thin layer that just pumps frames over channels -
//! protocol logic remains in the Sans-IO [`ChatClient`](crate::ChatClient).

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{frame::coding::CloseCode, CloseFrame, Message},
};

use obrol_proto::CLOSE_ABNORMAL;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),
}

/// Commands the driver sends down to the socket task.
#[derive(Debug, Clone)]
pub enum TransportCommand {
    /// Send a text frame.
    Text(String),
    /// Close the socket with this code.
    Close(u16),
}

/// Events the socket task reports up to the driver.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A text frame arrived.
    Text(String),
    /// The socket closed. 1006 when no close frame was received.
    Closed {
        /// WebSocket close code.
        code: u16,
    },
    /// A socket-level error occurred. A `Closed` event follows.
    Failed(String),
}

/// Handle to a live WebSocket connection.
///
/// Frames are sent/received via the channels; an internal task owns the
/// socket. Dropping the handle (or calling [`stop`](Self::stop)) aborts
/// the task.
pub struct ConnectedTransport {
    /// Send commands to the socket task.
    pub to_server: mpsc::Sender<TransportCommand>,
    /// Receive events from the socket task.
    pub from_server: mpsc::Receiver<TransportEvent>,
    /// Abort handle to stop the connection task.
    abort_handle: tokio::task::AbortHandle,
}

impl ConnectedTransport {
    /// Stop the connection task.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

impl Drop for ConnectedTransport {
    fn drop(&mut self) {
        self.abort_handle.abort();
    }
}

/// Dial an Obrol server over WebSocket.
///
/// Resolves once the handshake completes. Returns a
/// [`ConnectedTransport`] with channels for frame transport.
pub async fn connect(url: &str) -> Result<ConnectedTransport, TransportError> {
    let (stream, _response) = connect_async(url)
        .await
        .map_err(|e| TransportError::Connection(e.to_string()))?;

    let (to_server_tx, to_server_rx) = mpsc::channel::<TransportCommand>(32);
    let (from_server_tx, from_server_rx) = mpsc::channel::<TransportEvent>(32);

    let handle = tokio::spawn(run_connection(stream, to_server_rx, from_server_tx));

    Ok(ConnectedTransport {
        to_server: to_server_tx,
        from_server: from_server_rx,
        abort_handle: handle.abort_handle(),
    })
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Run the connection, bridging between channels and the socket.
async fn run_connection(
    stream: WsStream,
    mut to_server: mpsc::Receiver<TransportCommand>,
    from_server: mpsc::Sender<TransportEvent>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            command = to_server.recv() => {
                match command {
                    Some(TransportCommand::Text(text)) => {
                        if let Err(e) = sink.send(Message::Text(text.into())).await {
                            let _ = from_server.send(TransportEvent::Failed(e.to_string())).await;
                            let _ = from_server.send(TransportEvent::Closed { code: CLOSE_ABNORMAL }).await;
                            return;
                        }
                    },
                    Some(TransportCommand::Close(code)) => {
                        let frame = CloseFrame { code: CloseCode::from(code), reason: "".into() };
                        let _ = sink.send(Message::Close(Some(frame))).await;
                        let _ = from_server.send(TransportEvent::Closed { code }).await;
                        return;
                    },
                    // Driver hung up: tear the socket down quietly.
                    None => return,
                }
            },
            inbound = source.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if from_server.send(TransportEvent::Text(text.as_str().to_owned())).await.is_err() {
                            return;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        let code = frame.map_or(CLOSE_ABNORMAL, |f| f.code.into());
                        let _ = from_server.send(TransportEvent::Closed { code }).await;
                        return;
                    },
                    // Pings are answered by tungstenite itself; binary
                    // frames are not part of the protocol.
                    Some(Ok(_)) => {},
                    Some(Err(e)) => {
                        let _ = from_server.send(TransportEvent::Failed(e.to_string())).await;
                        let _ = from_server.send(TransportEvent::Closed { code: CLOSE_ABNORMAL }).await;
                        return;
                    },
                    None => {
                        let _ = from_server.send(TransportEvent::Closed { code: CLOSE_ABNORMAL }).await;
                        return;
                    },
                }
            },
        }
    }
}
