//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a `tokio-tungstenite` client so the
//! frames actually cross a socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;

    use civdraft_transport::{Connection, Transport, TransportError, WebSocketConnection, WebSocketTransport};
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    /// Binds on a free port and returns the server side of one connected
    /// client, plus the client.
    async fn connected_pair() -> (WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("client should connect");
        let conn = server.await.expect("task should complete");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_text_both_directions() {
        let (conn, mut client) = connected_pair().await;
        assert!(conn.id().into_inner() > 0);

        conn.send(r#"{"event":"bug"}"#).await.expect("send should succeed");
        let msg = client.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), r#"{"event":"bug"}"#);

        client
            .send(Message::text(r#"{"event":"refill","draft_id":"1"}"#.to_owned()))
            .await
            .unwrap();
        let received = conn.recv().await.expect("recv should succeed");
        assert_eq!(received.as_deref(), Some(r#"{"event":"refill","draft_id":"1"}"#));
    }

    #[tokio::test]
    async fn test_websocket_binary_utf8_is_accepted() {
        let (conn, mut client) = connected_pair().await;

        client
            .send(Message::Binary(b"{\"event\":\"clear\"}".to_vec().into()))
            .await
            .unwrap();
        assert_eq!(
            conn.recv().await.unwrap().as_deref(),
            Some("{\"event\":\"clear\"}")
        );

        client
            .send(Message::Binary(vec![0xff, 0xfe].into()))
            .await
            .unwrap();
        assert!(matches!(conn.recv().await, Err(TransportError::InvalidFrame(_))));
    }

    #[tokio::test]
    async fn test_websocket_client_close_yields_none() {
        let (conn, mut client) = connected_pair().await;
        client.close(None).await.unwrap();
        assert!(conn.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_websocket_send_while_receiving() {
        let (conn, mut client) = connected_pair().await;
        let conn = Arc::new(conn);

        // A reader parked in `recv` must not block the writer.
        let reader = {
            let conn = Arc::clone(&conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::task::yield_now().await;

        conn.send("ping from server").await.unwrap();
        let msg = client.next().await.unwrap().unwrap();
        assert_eq!(msg.into_text().unwrap().as_str(), "ping from server");

        client.send(Message::text("done".to_owned())).await.unwrap();
        let received = reader.await.unwrap().unwrap();
        assert_eq!(received.as_deref(), Some("done"));
    }
}
