//! Integration tests for the capture-agent WebSocket link.
//!
//! A real listener is bound on an OS-assigned port and driven by a
//! `tokio-tungstenite` client playing the role of a capture agent.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use tokio_tungstenite::tungstenite::Message;

    use crewhush_transport::{Connection, Transport, WebSocketTransport};

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on port 0 and connects one agent, returning both ends.
    async fn pair() -> (crewhush_transport::WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("bound address");

        let server = tokio::spawn(async move { transport.accept().await.expect("should accept") });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("agent should connect");
        let conn = server.await.expect("accept task");
        (conn, client)
    }

    #[tokio::test]
    async fn test_websocket_text_frames_flow_both_ways() {
        let (conn, mut agent) = pair().await;
        assert!(conn.id().into_inner() > 0);
        assert!(conn.peer_addr().ip().is_loopback());

        conn.send(br#"{"type":"HelloAck"}"#).await.expect("send");
        let msg = agent.next().await.expect("frame").expect("ok frame");
        assert!(msg.is_text(), "server frames should be text");
        assert_eq!(msg.into_data().as_ref(), br#"{"type":"HelloAck"}"#);

        agent
            .send(Message::text(r#"{"type":"Heartbeat"}"#.to_owned()))
            .await
            .unwrap();
        let received = conn.recv().await.expect("recv").expect("data");
        assert_eq!(received, br#"{"type":"Heartbeat"}"#);

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_binary_frames_are_accepted() {
        let (conn, mut agent) = pair().await;

        agent
            .send(Message::Binary(b"{}".to_vec().into()))
            .await
            .unwrap();

        assert_eq!(conn.recv().await.unwrap().unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_websocket_send_rejects_non_utf8() {
        let (conn, _agent) = pair().await;

        let result = conn.send(&[0xff, 0xfe]).await;

        assert!(result.is_err(), "non-UTF-8 payloads cannot be text frames");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_agent_close() {
        let (conn, mut agent) = pair().await;

        agent.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on agent close");
    }
}
