//! Authenticated Kraken WebSocket connection
//!
//! One socket carries both the private feed and outbound order commands.
//! `connect` splits it: a reader task forwards text frames to the returned
//! channel (closing it when the connection ends) and answers pings, a writer
//! task drains the outbound queue so callers never hold the sink.
//!
//! Every command waits for the writer to report the outcome of its socket
//! write. Once the reader stops, the writer stops too and pending or later
//! commands fail with [`KrakenError::ConnectionClosed`].

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use orders::{CancelOrders, ExchangeClient, PlaceOrder};

use crate::decoder::{OPEN_ORDERS, OWN_TRADES};
use crate::error::{KrakenError, Result};
use crate::messages::{AddOrderMessage, CancelOrderMessage, SubscribeMessage};

/// Capacity of the raw feed and outbound queues
pub const CHANNEL_BUFFER: usize = 100;

/// A frame queued for the writer, with an optional write acknowledgment
struct Outbound {
    message: Message,
    ack: Option<oneshot::Sender<Result<()>>>,
}

/// Command side of a Kraken WebSocket connection
#[derive(Clone)]
pub struct KrakenWsClient {
    outbound: mpsc::Sender<Outbound>,
}

impl KrakenWsClient {
    /// Connect and start the reader and writer tasks.
    ///
    /// Returns the client and the channel of raw feed frames.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::Receiver<String>)> {
        tracing::info!(url, "Connecting to Kraken WebSocket");
        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| KrakenError::WebSocket(e.to_string()))?;
        tracing::info!(url, "Kraken WebSocket connected");

        let (mut write, mut read) = ws_stream.split();
        let (feed_tx, feed_rx) = mpsc::channel::<String>(CHANNEL_BUFFER);
        let (outbound_tx, mut outbound_rx) = mpsc::channel::<Outbound>(CHANNEL_BUFFER);
        let closed = CancellationToken::new();

        let reader_closed = closed.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = closed.cancelled() => break,
                    next = outbound_rx.recv() => {
                        let Some(Outbound { message, ack }) = next else { break };
                        let result = write
                            .send(message)
                            .await
                            .map_err(|e| KrakenError::WebSocket(e.to_string()));
                        let failed = result.is_err();
                        if let Err(e) = &result {
                            tracing::warn!(error = %e, "WebSocket write failed");
                        }
                        if let Some(ack) = ack {
                            let _ = ack.send(result);
                        }
                        if failed {
                            break;
                        }
                    }
                }
            }

            // Refuse new commands, then fail whatever is still queued
            outbound_rx.close();
            while let Ok(Outbound { ack, .. }) = outbound_rx.try_recv() {
                if let Some(ack) = ack {
                    let _ = ack.send(Err(KrakenError::ConnectionClosed));
                }
            }
            let _ = write.close().await;
            tracing::debug!("WebSocket writer stopped");
        });

        let pong_tx = outbound_tx.clone();
        tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if feed_tx.send(text).await.is_err() {
                            tracing::debug!("Feed receiver dropped, stopping reader");
                            break;
                        }
                    }
                    Ok(Message::Ping(payload)) => {
                        let _ = pong_tx
                            .send(Outbound {
                                message: Message::Pong(payload),
                                ack: None,
                            })
                            .await;
                    }
                    Ok(Message::Close(frame)) => {
                        tracing::info!(?frame, "Kraken closed the WebSocket");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket read failed");
                        break;
                    }
                }
            }
            // Stop the writer before the feed channel closes
            reader_closed.cancel();
            tracing::info!("Kraken feed ended");
        });

        Ok((Self { outbound: outbound_tx }, feed_rx))
    }

    /// Queue a JSON text frame and wait until it is written to the socket
    async fn send_json<T: Serialize>(&self, message: &T) -> Result<()> {
        let text = serde_json::to_string(message)?;
        let (ack_tx, ack_rx) = oneshot::channel();
        self.outbound
            .send(Outbound {
                message: Message::Text(text),
                ack: Some(ack_tx),
            })
            .await
            .map_err(|_| KrakenError::ConnectionClosed)?;
        ack_rx.await.map_err(|_| KrakenError::ConnectionClosed)?
    }

    /// Subscribe to a private channel
    pub async fn subscribe(&self, channel: &str, token: &str) -> Result<()> {
        tracing::info!(channel, "Subscribing");
        self.send_json(&SubscribeMessage::new(channel, token)).await
    }

    /// Subscribe to both order and trade channels
    pub async fn subscribe_private(&self, token: &str) -> Result<()> {
        self.subscribe(OPEN_ORDERS, token).await?;
        self.subscribe(OWN_TRADES, token).await
    }
}

#[async_trait]
impl ExchangeClient for KrakenWsClient {
    async fn add_order(&self, request: PlaceOrder) -> orders::Result<()> {
        tracing::debug!(ref_id = request.ref_id, pair = %request.pair, "Sending addOrder");
        self.send_json(&AddOrderMessage::from(&request)).await?;
        Ok(())
    }

    async fn cancel_order(&self, request: CancelOrders) -> orders::Result<()> {
        tracing::debug!(order_ids = ?request.order_ids, "Sending cancelOrder");
        self.send_json(&CancelOrderMessage::from(&request)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use orders::OrdersError;
    use tokio::net::TcpListener;

    fn place(ref_id: i32) -> PlaceOrder {
        PlaceOrder {
            ref_id,
            pair: "XBT/USD".to_string(),
            side: orders::Side::Buy,
            price: 1.0,
            volume: 1.0,
            token: "tok".to_string(),
        }
    }

    /// Client whose writer acknowledges every frame and records its text
    fn recording_client() -> (KrakenWsClient, mpsc::UnboundedReceiver<String>) {
        let (outbound, mut rx) = mpsc::channel::<Outbound>(4);
        let (texts_tx, texts_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(Outbound { message, ack }) = rx.recv().await {
                if let Message::Text(text) = message {
                    let _ = texts_tx.send(text);
                }
                if let Some(ack) = ack {
                    let _ = ack.send(Ok(()));
                }
            }
        });
        (KrakenWsClient { outbound }, texts_rx)
    }

    #[tokio::test]
    async fn test_connect_to_invalid_url_fails() {
        let result = KrakenWsClient::connect("not a url").await;
        assert_matches!(result.err(), Some(KrakenError::WebSocket(_)));
    }

    #[tokio::test]
    async fn test_commands_are_written_in_order() {
        let (client, mut texts) = recording_client();

        client.subscribe_private("tok").await.unwrap();
        client
            .cancel_order(CancelOrders {
                order_ids: vec!["OID".to_string()],
                token: "tok".to_string(),
            })
            .await
            .unwrap();

        assert!(texts.recv().await.unwrap().contains("\"openOrders\""));
        assert!(texts.recv().await.unwrap().contains("\"ownTrades\""));
        assert!(texts.recv().await.unwrap().contains("\"cancelOrder\""));
    }

    #[tokio::test]
    async fn test_send_after_writer_gone() {
        let (outbound, rx) = mpsc::channel(1);
        drop(rx);
        let client = KrakenWsClient { outbound };

        let err = client.add_order(place(1)).await.unwrap_err();
        assert_matches!(err, OrdersError::Transport(_));
    }

    #[tokio::test]
    async fn test_unacknowledged_write_is_a_failure() {
        let (outbound, mut rx) = mpsc::channel::<Outbound>(1);
        tokio::spawn(async move {
            // Writer drops the frame without reporting back
            let _ = rx.recv().await;
        });
        let client = KrakenWsClient { outbound };

        let err = client.add_order(place(2)).await.unwrap_err();
        assert_matches!(err, OrdersError::Transport(_));
    }

    #[tokio::test]
    async fn test_live_socket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (got_tx, got_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            ws.send(Message::Text(r#"{"event":"heartbeat"}"#.to_string())).await.unwrap();
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = got_tx.send(text);
            }
        });

        let (client, mut feed) = KrakenWsClient::connect(&format!("ws://{}", addr)).await.unwrap();
        assert_eq!(feed.recv().await.unwrap(), r#"{"event":"heartbeat"}"#);

        client.add_order(place(3)).await.unwrap();
        assert!(got_rx.await.unwrap().contains("\"addOrder\""));
    }

    #[tokio::test]
    async fn test_commands_fail_after_peer_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            let _ = ws.close(None).await;
            while let Some(Ok(_)) = ws.next().await {}
        });

        let (client, mut feed) = KrakenWsClient::connect(&format!("ws://{}", addr)).await.unwrap();
        assert!(feed.recv().await.is_none());

        let first = client.add_order(place(4)).await;
        assert_matches!(first, Err(OrdersError::Transport(_)));
        let second = client.add_order(place(5)).await;
        assert_matches!(second, Err(OrdersError::Transport(_)));
    }
}
