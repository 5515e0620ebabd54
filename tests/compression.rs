//! permessage-deflate from handshake to delivered message.

use std::sync::Arc;

use bytes::Bytes;
use rstest::rstest;
use tokio::io::{AsyncReadExt, duplex};
use wsframe::{
    Compressor,
    Decompressor,
    DeflateConfig,
    NegotiatedDeflate,
    PerMessageDeflate,
    Receiver,
    ReceiverConfig,
    Role,
    SendOptions,
    Sender,
    WindowBits,
    deflate::{WindowBitsOption, format_extensions, parse_extensions},
};
use wsframe_testing::{Event, RecordingHandler, feed_chunked};

/// Run the offer/accept exchange through real header strings.
fn handshake(client: DeflateConfig, server: DeflateConfig) -> (Arc<NegotiatedDeflate>, Arc<NegotiatedDeflate>) {
    let client = PerMessageDeflate::new(client, Role::Client);
    let server = PerMessageDeflate::new(server, Role::Server);

    let request = format_extensions(&[client.offer()]);
    let offers: Vec<_> = parse_extensions(&request).into_iter().map(|ext| ext.params).collect();
    let accepted = server.accept(&offers).expect("server accepts offer");

    let response = format_extensions(&[accepted.to_extension()]);
    let responses: Vec<_> = parse_extensions(&response)
        .into_iter()
        .map(|ext| ext.params)
        .collect();
    let confirmed = client.accept(&responses).expect("client accepts response");
    (confirmed, accepted)
}

async fn transfer(
    sender: &mut Sender<tokio::io::DuplexStream>,
    reader: &mut tokio::io::DuplexStream,
    receiver: &mut Receiver<RecordingHandler>,
    payload: &[u8],
    options: SendOptions,
) {
    sender
        .send(Bytes::copy_from_slice(payload), options)
        .await
        .expect("send");
    let mut buf = vec![0; 1 << 20];
    let mut wire = Vec::new();
    // Each send flushes a whole frame; read until the expected bytes arrive.
    loop {
        let n = reader.read(&mut buf).await.expect("read");
        wire.extend_from_slice(&buf[..n]);
        let before = receiver.handler().events().len();
        feed_chunked(receiver, &wire, 1500).await;
        wire.clear();
        if receiver.handler().events().len() > before || !options.fin {
            break;
        }
    }
}

#[rstest]
#[case::empty(0)]
#[case::one(1)]
#[case::large(70 * 1024)]
#[tokio::test]
async fn client_messages_inflate_on_the_server(
    #[case] len: usize,
    #[values(false, true)] no_context_takeover: bool,
) {
    let config = DeflateConfig::default().client_no_context_takeover(no_context_takeover);
    let (client_params, server_params) = handshake(config, DeflateConfig::default());
    assert_eq!(client_params, server_params);
    assert_eq!(client_params.client_no_context_takeover, no_context_takeover);

    let (writer, mut reader) = duplex(1 << 20);
    let mut sender = Sender::new(writer).with_compressor(Compressor::new(
        client_params,
        Role::Client,
        flate2::Compression::default(),
    ));
    let mut receiver = Receiver::new(RecordingHandler::default(), ReceiverConfig::default())
        .with_decompressor(Decompressor::new(server_params, Role::Server));

    let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
    let options = SendOptions {
        mask: true,
        compress: true,
        binary: true,
        ..SendOptions::default()
    };
    for _ in 0..3 {
        transfer(&mut sender, &mut reader, &mut receiver, &payload, options).await;
    }
    assert_eq!(receiver.handler().events(), vec![Event::Binary(payload); 3]);
}

#[tokio::test]
async fn narrow_windows_negotiate_and_round_trip() {
    let bits = WindowBits::new(9).expect("in range");
    let client = DeflateConfig::default()
        .server_max_window_bits(WindowBitsOption::Limit(bits))
        .client_max_window_bits(WindowBitsOption::Limit(bits));
    let (client_params, server_params) = handshake(client, DeflateConfig::default());
    assert_eq!(server_params.server_max_window_bits, Some(bits));
    assert_eq!(server_params.client_max_window_bits, Some(bits));

    let (writer, mut reader) = duplex(1 << 16);
    let mut sender = Sender::new(writer).with_compressor(Compressor::new(
        server_params,
        Role::Server,
        flate2::Compression::best(),
    ));
    let mut receiver = Receiver::new(RecordingHandler::default(), ReceiverConfig::default())
        .with_decompressor(Decompressor::new(client_params, Role::Client));

    let text = "window ".repeat(400);
    let options = SendOptions {
        compress: true,
        ..SendOptions::default()
    };
    transfer(&mut sender, &mut reader, &mut receiver, text.as_bytes(), options).await;
    assert_eq!(receiver.handler().events(), &[Event::Text(text)]);
}

#[tokio::test]
async fn uncompressed_messages_pass_through_a_deflate_session() {
    let (client_params, server_params) = handshake(DeflateConfig::default(), DeflateConfig::default());
    let (writer, mut reader) = duplex(4096);
    let mut sender = Sender::new(writer).with_compressor(Compressor::new(
        client_params,
        Role::Client,
        flate2::Compression::default(),
    ));
    let mut receiver = Receiver::new(RecordingHandler::default(), ReceiverConfig::default())
        .with_decompressor(Decompressor::new(server_params, Role::Server));

    let plain = SendOptions {
        mask: true,
        ..SendOptions::default()
    };
    transfer(&mut sender, &mut reader, &mut receiver, b"plain", plain).await;
    let packed = SendOptions {
        compress: true,
        ..plain
    };
    transfer(&mut sender, &mut reader, &mut receiver, b"packed", packed).await;
    assert_eq!(
        receiver.handler().events(),
        &[Event::Text("plain".into()), Event::Text("packed".into())]
    );
}
