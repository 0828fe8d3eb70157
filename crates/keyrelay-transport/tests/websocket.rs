//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a `tokio-tungstenite` client so
//! frames actually cross a socket.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use keyrelay_transport::{Connection, Transport, WebSocketTransport};
    use tokio_tungstenite::tungstenite::Message;

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on an OS-assigned port, connects one client, and returns
    /// both ends.
    async fn connected_pair() -> (keyrelay_transport::WebSocketConnection, ClientWs)
    {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("local addr");

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (client_ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");
        let server_conn = server_handle.await.expect("task should complete");
        (server_conn, client_ws)
    }

    #[tokio::test]
    async fn test_websocket_accept_and_send_receive() {
        let (server_conn, mut client_ws) = connected_pair().await;
        assert!(server_conn.id().into_inner() > 0);

        // --- Server sends text, client receives a text frame ---
        server_conn
            .send_text("hello from server")
            .await
            .expect("send should succeed");
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(msg.into_text().unwrap().as_str(), "hello from server");

        // --- Client sends, server receives ---
        client_ws
            .send(Message::text("alice_wonder".to_string()))
            .await
            .unwrap();
        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, b"alice_wonder");

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = connected_pair().await;

        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_close_unblocks_pending_recv() {
        let (server_conn, _client_ws) = connected_pair().await;
        let server_conn = Arc::new(server_conn);

        let reader = {
            let conn = Arc::clone(&server_conn);
            tokio::spawn(async move { conn.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The reader holds the stream half; closing must still go through.
        server_conn.close().await.expect("close should succeed");
        server_conn.close().await.expect("second close is a no-op");

        let result = tokio::time::timeout(Duration::from_secs(2), reader)
            .await
            .expect("reader should finish")
            .unwrap()
            .expect("recv should not error");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_websocket_close_unblocks_pending_send() {
        // The client never reads, so the socket buffers fill and a send
        // parks inside the sink.
        let (server_conn, _client_ws) = connected_pair().await;
        let server_conn = Arc::new(server_conn);

        let writer = {
            let conn = Arc::clone(&server_conn);
            tokio::spawn(async move {
                let frame = "x".repeat(1024 * 1024);
                loop {
                    if let Err(e) = conn.send_text(&frame).await {
                        return e;
                    }
                }
            })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!writer.is_finished(), "writer should be stuck on a full socket");

        tokio::time::timeout(Duration::from_secs(5), server_conn.close())
            .await
            .expect("close should not wait behind the stuck send")
            .expect("close should succeed");

        let err = tokio::time::timeout(Duration::from_secs(2), writer)
            .await
            .expect("writer should be released")
            .unwrap();
        assert!(err.is_closed(), "expected a closed error, got {err:?}");
    }

    #[tokio::test]
    async fn test_websocket_send_after_close_fails() {
        let (server_conn, _client_ws) = connected_pair().await;
        server_conn.close().await.unwrap();

        let err = server_conn.send_text("late").await.unwrap_err();
        assert!(err.is_closed());
    }
}
