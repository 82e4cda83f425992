//! End-to-end tests for the client against a small in-process server.
//!
//! The server speaks the same preamble, HTTP tunnel and framing the client expects and
//! answers requests concurrently, so replies can overtake each other on the wire.

use bytes::{Buf, Bytes};
use std::sync::Arc;
use std::time::Duration;
use streamrpc::client::{CONNECTED, MAGIC_NUMBER, PREAMBLE_LEN};
use streamrpc::codec::{CodecType, CodecWrite, Format, Header, codec_factory};
use streamrpc::{Options, RpcError, done_channel, xdial};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream));
        }
    });
    addr
}

async fn serve(mut stream: TcpStream) {
    let mut first = [0u8; 1];
    if stream.peek(&mut first).await.unwrap_or(0) == 0 {
        return;
    }
    if first[0] == b'C' {
        let mut request = Vec::new();
        while !request.ends_with(b"\n\n") {
            request.push(stream.read_u8().await.unwrap());
        }
        stream
            .write_all(format!("HTTP/1.0 {CONNECTED}\n\n").as_bytes())
            .await
            .unwrap();
    }

    let mut preamble = [0u8; PREAMBLE_LEN];
    stream.read_exact(&mut preamble).await.unwrap();
    let mut preamble = &preamble[..];
    assert_eq!(preamble.get_u64(), MAGIC_NUMBER);
    let codec_type = CodecType(preamble.get_u64());
    let _timeout = preamble.get_u64();

    let factory = codec_factory(codec_type).expect("client only sends known codecs");
    let (mut reader, writer, format) = factory(Box::new(stream)).split();
    let writer: Arc<Mutex<Box<dyn CodecWrite>>> = Arc::new(Mutex::new(writer));

    while let Ok(header) = reader.read_header().await {
        let Ok(body) = reader.read_body().await else {
            break;
        };
        let writer = Arc::clone(&writer);
        tokio::spawn(async move {
            let (reply, error) = handle(&header.service_method, format, &body).await;
            let header = Header { error, ..header };
            let _ = writer.lock().await.write(&header, reply).await;
        });
    }
}

async fn handle(method: &str, format: Format, body: &[u8]) -> (Bytes, String) {
    match method {
        "Arith.Sum" => {
            let (a, b): (i32, i32) = format.decode(body).unwrap();
            (format.encode(&(a + b)).unwrap(), String::new())
        }
        "Arith.Sleep" => {
            let ms: u64 = format.decode(body).unwrap();
            tokio::time::sleep(Duration::from_millis(ms)).await;
            (format.encode(&ms).unwrap(), String::new())
        }
        other => (
            Bytes::new(),
            format!("rpc server: can't find service {other}"),
        ),
    }
}

#[tokio::test]
async fn test_tcp_address_uses_raw_bootstrap() {
    let addr = spawn_server().await;
    let client = xdial(&format!("tcp@{addr}"), None).await.unwrap();

    let sum: i32 = client.call("Arith.Sum", &(1, 2)).await.unwrap();
    assert_eq!(sum, 3);
}

#[tokio::test]
async fn test_http_address_uses_tunnel() {
    let addr = spawn_server().await;
    let opts = Options::default().with_codec_type(CodecType::JSON);
    let client = xdial(&format!("http@{addr}"), Some(opts)).await.unwrap();

    let sum: i32 = client.call("Arith.Sum", &(20, 22)).await.unwrap();
    assert_eq!(sum, 42);
}

#[tokio::test]
async fn test_unknown_method_is_remote_error() {
    let addr = spawn_server().await;
    let client = xdial(&format!("tcp@{addr}"), None).await.unwrap();

    let err = client.call::<_, i32>("Arith.Nope", &()).await.unwrap_err();
    assert!(matches!(err, RpcError::Remote(text) if text.contains("Arith.Nope")));
    assert!(client.is_available().await);
}

#[tokio::test]
async fn test_slow_call_times_out_without_blocking_others() {
    let addr = spawn_server().await;
    let client = xdial(&format!("tcp@{addr}"), None).await.unwrap();

    let err = client
        .call_with_timeout::<_, u64>("Arith.Sleep", &500u64, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Cancelled(_)));

    let sum: i32 = client.call("Arith.Sum", &(2, 3)).await.unwrap();
    assert_eq!(sum, 5);
}

#[tokio::test]
async fn test_pipelined_calls_complete_out_of_order() {
    let addr = spawn_server().await;
    let client = xdial(&format!("tcp@{addr}"), None).await.unwrap();
    let (done, mut completions) = done_channel(3);

    let slow = client.go("Arith.Sleep", &200u64, Some(done.clone())).await.seq();
    let fast = client.go("Arith.Sleep", &1u64, Some(done)).await.seq();
    assert!(slow < fast);

    let first = completions.recv().await.unwrap();
    assert_eq!(first.seq, fast);
    assert_eq!(first.reply::<u64>().unwrap(), 1);

    let second = completions.recv().await.unwrap();
    assert_eq!(second.seq, slow);
    assert_eq!(second.reply::<u64>().unwrap(), 200);
}

#[tokio::test]
async fn test_closed_client_rejects_calls() {
    let addr = spawn_server().await;
    let client = xdial(&format!("tcp@{addr}"), None).await.unwrap();

    client.close().await.unwrap();
    assert!(!client.is_available().await);

    let err = client.call::<_, i32>("Arith.Sum", &(1, 1)).await.unwrap_err();
    assert!(matches!(err, RpcError::Shutdown));
}

#[tokio::test]
async fn test_many_concurrent_callers() {
    let addr = spawn_server().await;
    let client = Arc::new(xdial(&format!("tcp@{addr}"), None).await.unwrap());

    let tasks: Vec<_> = (0..100)
        .map(|i| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.call::<_, i32>("Arith.Sum", &(i, i)).await })
        })
        .collect();

    for (i, task) in tasks.into_iter().enumerate() {
        assert_eq!(task.await.unwrap().unwrap(), 2 * i as i32);
    }
}

#[tokio::test]
async fn test_server_going_away_fails_pending_calls() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Accept, read the preamble and one request, then hang up.
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; PREAMBLE_LEN];
        stream.read_exact(&mut buf).await.unwrap();
        let mut request = [0u8; 4];
        let _ = stream.read(&mut request).await;
        drop(stream);
    });

    let client = xdial(&format!("tcp@{addr}"), None).await.unwrap();
    let err = client.call::<_, i32>("Arith.Sum", &(1, 2)).await.unwrap_err();
    assert!(matches!(err, RpcError::Codec(_)));
    assert!(!client.is_available().await);
}
