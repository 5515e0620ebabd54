//! Tests for extension parameters, negotiation and the streaming codec.

use std::sync::Arc;

use bytes::Bytes;
use flate2::{Compress, Compression, FlushCompress};
use rstest::{fixture, rstest};

use super::*;

fn raw(params: &[(&str, Option<&str>)]) -> Vec<(String, Option<String>)> {
    params
        .iter()
        .map(|(key, value)| ((*key).to_owned(), value.map(str::to_owned)))
        .collect()
}

fn bits(value: u8) -> WindowBits { WindowBits::new(value).expect("valid window bits") }

#[test]
fn header_round_trips_through_format() {
    let header = "permessage-deflate; client_max_window_bits; server_max_window_bits=10, \
                  permessage-deflate";
    let parsed = parse_extensions(header);
    assert_eq!(parsed.len(), 2);
    assert_eq!(
        format_extensions(&parsed),
        "permessage-deflate; client_max_window_bits; server_max_window_bits=10, permessage-deflate"
    );
}

#[test]
fn empty_header_has_no_extensions() {
    assert!(parse_extensions("").is_empty());
    assert!(parse_extensions(" , ").is_empty());
}

#[rstest]
#[case::duplicate(
    &[("server_no_context_takeover", None), ("server_no_context_takeover", None)],
    NegotiationError::DuplicateParameter { key: "server_no_context_takeover".into() }
)]
#[case::valued_flag(
    &[("client_no_context_takeover", Some("true"))],
    NegotiationError::InvalidValue { key: "client_no_context_takeover".into(), value: "true".into() }
)]
#[case::too_small(
    &[("server_max_window_bits", Some("7"))],
    NegotiationError::InvalidValue { key: "server_max_window_bits".into(), value: "7".into() }
)]
#[case::not_a_number(
    &[("client_max_window_bits", Some("ten"))],
    NegotiationError::InvalidValue { key: "client_max_window_bits".into(), value: "ten".into() }
)]
#[case::unknown(
    &[("mem_level", Some("8"))],
    NegotiationError::UnknownParameter { key: "mem_level".into() }
)]
fn malformed_parameters_are_rejected(
    #[case] params: &[(&str, Option<&str>)],
    #[case] expected: NegotiationError,
) {
    assert_eq!(DeflateParams::normalize(&raw(params), Role::Server), Err(expected));
}

#[test]
fn bare_window_bits_only_accepted_from_clients() {
    let params = raw(&[("client_max_window_bits", None)]);
    assert_eq!(
        DeflateParams::normalize(&params, Role::Server)
            .expect("bare flag in an offer")
            .client_max_window_bits,
        Some(RequestedWindowBits::Any)
    );
    assert_eq!(
        DeflateParams::normalize(&params, Role::Client),
        Err(NegotiationError::MissingValue {
            key: "client_max_window_bits".into()
        })
    );
}

#[test]
fn window_bits_bounds() {
    assert!(WindowBits::new(8).is_ok());
    assert!(WindowBits::new(15).is_ok());
    assert_eq!(
        WindowBits::new(16),
        Err(NegotiationError::WindowBitsOutOfRange { bits: 16 })
    );
}

#[rstest]
#[case::defaults(DeflateConfig::default(), "permessage-deflate; client_max_window_bits")]
#[case::limits(
    DeflateConfig::default()
        .server_no_context_takeover(true)
        .server_max_window_bits(WindowBitsOption::Limit(bits(10)))
        .client_max_window_bits(WindowBitsOption::Limit(bits(9))),
    "permessage-deflate; server_no_context_takeover; server_max_window_bits=10; client_max_window_bits=9"
)]
#[case::disallowed(
    DeflateConfig::default().client_max_window_bits(WindowBitsOption::Disallowed),
    "permessage-deflate"
)]
fn offers_reflect_local_options(#[case] config: DeflateConfig, #[case] expected: &str) {
    let offer = PerMessageDeflate::new(config, Role::Client).offer();
    assert_eq!(offer.to_string(), expected);
}

#[test]
fn server_accepts_first_compatible_offer() {
    let server = PerMessageDeflate::new(
        DeflateConfig::default().server_no_context_takeover(false),
        Role::Server,
    );
    let offers = vec![
        raw(&[("server_no_context_takeover", None)]),
        raw(&[("client_max_window_bits", Some("12"))]),
    ];
    let negotiated = server.accept(&offers).expect("second offer is compatible");
    assert!(!negotiated.server_no_context_takeover);
    assert_eq!(negotiated.client_max_window_bits, Some(bits(12)));
}

#[rstest]
#[case::weaker_peer_limit(10, 8)]
#[case::stronger_peer_limit(10, 11)]
fn server_rejects_mismatched_server_window(#[case] offered: u8, #[case] local: u8) {
    let server = PerMessageDeflate::new(
        DeflateConfig::default().server_max_window_bits(WindowBitsOption::Limit(bits(local))),
        Role::Server,
    );
    let offered = offered.to_string();
    let offers = vec![raw(&[("server_max_window_bits", Some(offered.as_str()))])];
    assert_eq!(server.accept(&offers), Err(NegotiationError::NoAcceptableOffer));
}

#[test]
fn server_requires_client_window_when_limiting_it() {
    let server = PerMessageDeflate::new(
        DeflateConfig::default().client_max_window_bits(WindowBitsOption::Limit(bits(10))),
        Role::Server,
    );
    assert_eq!(
        server.accept(&[raw(&[])]),
        Err(NegotiationError::NoAcceptableOffer)
    );
    let negotiated = server
        .accept(&[raw(&[("client_max_window_bits", None)])])
        .expect("bare flag lets the server choose");
    assert_eq!(negotiated.client_max_window_bits, Some(bits(10)));
}

#[test]
fn server_honours_requested_context_takeover() {
    let server = PerMessageDeflate::new(DeflateConfig::default(), Role::Server);
    let negotiated = server
        .accept(&[raw(&[
            ("server_no_context_takeover", None),
            ("client_no_context_takeover", None),
        ])])
        .expect("no local objections");
    assert!(negotiated.server_no_context_takeover);
    assert!(negotiated.client_no_context_takeover);
    assert_eq!(
        negotiated.to_extension().to_string(),
        "permessage-deflate; server_no_context_takeover; client_no_context_takeover"
    );
}

#[test]
fn client_validates_single_response() {
    let client = PerMessageDeflate::new(
        DeflateConfig::default().client_max_window_bits(WindowBitsOption::Limit(bits(10))),
        Role::Client,
    );
    assert_eq!(
        client.accept(&[]),
        Err(NegotiationError::UnexpectedResponseCount { count: 0 })
    );
    assert_eq!(
        client.accept(&[raw(&[("client_max_window_bits", Some("12"))])]),
        Err(NegotiationError::RejectedResponse {
            key: "client_max_window_bits"
        })
    );
    let negotiated = client
        .accept(&[raw(&[("client_max_window_bits", Some("9"))])])
        .expect("within local limit");
    assert_eq!(negotiated.client_max_window_bits, Some(bits(9)));
}

#[test]
fn client_rejects_server_window_above_its_limit() {
    let client = PerMessageDeflate::new(
        DeflateConfig::default().server_max_window_bits(WindowBitsOption::Limit(bits(8))),
        Role::Client,
    );
    assert_eq!(
        client.accept(&[raw(&[("server_max_window_bits", Some("10"))])]),
        Err(NegotiationError::RejectedResponse {
            key: "server_max_window_bits"
        })
    );
}

#[test]
fn client_rejects_refused_context_takeover() {
    let client = PerMessageDeflate::new(
        DeflateConfig::default().client_no_context_takeover(false),
        Role::Client,
    );
    assert!(client
        .accept(&[raw(&[("client_no_context_takeover", None)])])
        .is_err());
}

fn with_takeover() -> Arc<NegotiatedDeflate> { Arc::new(NegotiatedDeflate::default()) }

#[allow(
    unused_braces,
    reason = "rustc false positive for single line rstest fixtures"
)]
#[fixture]
fn takeover() -> Arc<NegotiatedDeflate> { with_takeover() }

fn no_takeover() -> Arc<NegotiatedDeflate> {
    Arc::new(NegotiatedDeflate {
        server_no_context_takeover: true,
        client_no_context_takeover: true,
        ..NegotiatedDeflate::default()
    })
}

fn pair(params: &Arc<NegotiatedDeflate>) -> (Compressor, Decompressor) {
    (
        Compressor::new(params.clone(), Role::Client, Compression::default()),
        Decompressor::new(params.clone(), Role::Server),
    )
}

fn sample(len: usize) -> Bytes {
    Bytes::from(
        (0..len)
            .map(|i| u8::try_from(i % 251).expect("below 251"))
            .collect::<Vec<_>>(),
    )
}

#[rstest]
#[case::empty(0)]
#[case::single_byte(1)]
#[case::large(70 * 1024)]
#[tokio::test]
async fn compression_round_trips(#[case] len: usize, #[values(true, false)] context_takeover: bool) {
    let params = if context_takeover {
        with_takeover()
    } else {
        no_takeover()
    };
    let (mut deflate, mut inflate) = pair(&params);
    let payload = sample(len);
    for _ in 0..2 {
        let compressed = deflate.compress(payload.clone(), true).await.expect("compress");
        assert!(!compressed.ends_with(&DEFLATE_TRAILER));
        let restored = inflate.decompress(&compressed, true).await.expect("decompress");
        assert_eq!(restored, payload);
        assert_eq!(deflate.has_stream(), context_takeover);
        assert_eq!(inflate.has_stream(), context_takeover);
    }
}

#[rstest]
#[tokio::test]
async fn fragments_share_one_stream(takeover: Arc<NegotiatedDeflate>) {
    let (mut deflate, mut inflate) = pair(&takeover);
    let first = deflate
        .compress(Bytes::from_static(b"hello "), false)
        .await
        .expect("compress");
    let second = deflate
        .compress(Bytes::from_static(b"world"), true)
        .await
        .expect("compress");

    let mut restored = inflate.decompress(&first, false).await.expect("inflate").to_vec();
    restored.extend_from_slice(&inflate.decompress(&second, true).await.expect("inflate"));
    assert_eq!(restored, b"hello world");
}

#[rstest]
#[tokio::test]
async fn context_takeover_shrinks_repeated_messages(takeover: Arc<NegotiatedDeflate>) {
    let (mut deflate, _) = pair(&takeover);
    let message = Bytes::from_static(b"a message repeated across the connection");
    let first = deflate.compress(message.clone(), true).await.expect("compress");
    let second = deflate.compress(message, true).await.expect("compress");
    assert!(second.len() < first.len());
}

#[rstest]
#[tokio::test]
async fn garbage_fails_and_drops_stream(takeover: Arc<NegotiatedDeflate>) {
    let (_, mut inflate) = pair(&takeover);
    let err = inflate
        .decompress(&[0xff, 0xff, 0xff, 0xff], true)
        .await
        .expect_err("not a deflate stream");
    assert!(matches!(err, DeflateError::Decompress(_)));
    assert!(!inflate.has_stream());
}

/// Compress `data` the way a peer does when it ends a message with a final
/// block: a fresh raw stream finished with `BFINAL` set.
fn finished_message(data: &[u8]) -> Vec<u8> {
    let mut stream = Compress::new_with_window_bits(Compression::default(), false, 15);
    let mut out = Vec::with_capacity(data.len() + 64);
    stream
        .compress_vec(data, &mut out, FlushCompress::Finish)
        .expect("finish");
    out
}

#[rstest]
#[tokio::test]
async fn final_block_restarts_inflation(takeover: Arc<NegotiatedDeflate>) {
    let (mut deflate, mut inflate) = pair(&takeover);
    let first = finished_message(b"first");
    assert_eq!(
        inflate.decompress(&first, true).await.expect("inflate"),
        Bytes::from_static(b"first")
    );

    // A peer that sent a final block starts the next message from scratch.
    let second = deflate
        .compress(Bytes::from_static(b"second"), true)
        .await
        .expect("compress");
    assert_eq!(
        inflate.decompress(&second, true).await.expect("inflate"),
        Bytes::from_static(b"second")
    );
    let third = deflate
        .compress(Bytes::from_static(b"second and third"), true)
        .await
        .expect("compress");
    assert_eq!(
        inflate.decompress(&third, true).await.expect("inflate"),
        Bytes::from_static(b"second and third")
    );
}

#[rstest]
#[tokio::test]
async fn input_after_final_block_starts_a_new_stream(takeover: Arc<NegotiatedDeflate>) {
    let (_, mut inflate) = pair(&takeover);
    let mut payload = finished_message(b"one ");
    payload.extend_from_slice(&finished_message(b"two"));
    assert_eq!(
        inflate.decompress(&payload, true).await.expect("inflate"),
        Bytes::from_static(b"one two")
    );

    let mut garbage = finished_message(b"one");
    garbage.extend_from_slice(&[0xff, 0xff, 0xff, 0xff]);
    let err = inflate.decompress(&garbage, true).await.expect_err("corrupt tail");
    assert!(matches!(err, DeflateError::Decompress(_)));
    assert!(!inflate.has_stream());
}

#[tokio::test]
async fn eight_bit_windows_round_trip() {
    let params = Arc::new(NegotiatedDeflate {
        server_max_window_bits: Some(bits(8)),
        client_max_window_bits: Some(bits(8)),
        ..NegotiatedDeflate::default()
    });
    let (mut deflate, mut inflate) = pair(&params);
    let payload = sample(2048);
    let compressed = deflate.compress(payload.clone(), true).await.expect("compress");
    assert_eq!(
        inflate.decompress(&compressed, true).await.expect("decompress"),
        payload
    );
}
