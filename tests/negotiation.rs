//! Extension negotiation driven by `Sec-WebSocket-Extensions` values.

use rstest::rstest;
use wsframe::{
    DeflateConfig,
    PerMessageDeflate,
    Role,
    WindowBits,
    deflate::{NegotiationError, WindowBitsOption, parse_extensions},
};

fn offers(header: &str) -> Vec<Vec<(String, Option<String>)>> {
    parse_extensions(header).into_iter().map(|ext| ext.params).collect()
}

fn limit(bits: u8) -> WindowBitsOption { WindowBitsOption::Limit(WindowBits::new(bits).expect("in range")) }

#[rstest]
#[case::weaker_offer(10, 8)]
#[case::stronger_offer(8, 10)]
fn server_window_mismatch_fails(#[case] offered: u8, #[case] local: u8) {
    let server = PerMessageDeflate::new(
        DeflateConfig::default().server_max_window_bits(limit(local)),
        Role::Server,
    );
    let header = format!("permessage-deflate; server_max_window_bits={offered}");
    assert_eq!(
        server.accept(&offers(&header)),
        Err(NegotiationError::NoAcceptableOffer)
    );
}

#[test]
fn client_rejects_server_window_above_its_limit() {
    let client = PerMessageDeflate::new(
        DeflateConfig::default().server_max_window_bits(limit(8)),
        Role::Client,
    );
    let result = client.accept(&offers("permessage-deflate; server_max_window_bits=10"));
    assert!(matches!(result, Err(NegotiationError::RejectedResponse { .. })));
}

#[test]
fn server_skips_incompatible_offers() {
    let server = PerMessageDeflate::new(
        DeflateConfig::default().server_no_context_takeover(false),
        Role::Server,
    );
    let header = "permessage-deflate; server_no_context_takeover, \
                  permessage-deflate; client_max_window_bits";
    let accepted = server.accept(&offers(header)).expect("second offer fits");
    assert!(!accepted.server_no_context_takeover);
    assert_eq!(accepted.to_extension().to_string(), "permessage-deflate");
}

#[rstest]
#[case::unknown("permessage-deflate; foo=1")]
#[case::duplicate("permessage-deflate; server_no_context_takeover; server_no_context_takeover")]
#[case::valued_flag("permessage-deflate; client_no_context_takeover=1")]
#[case::too_small("permessage-deflate; server_max_window_bits=7")]
#[case::too_large("permessage-deflate; client_max_window_bits=16")]
#[case::not_a_number("permessage-deflate; client_max_window_bits=abc")]
fn malformed_offers_fail_before_selection(#[case] header: &str) {
    let server = PerMessageDeflate::new(DeflateConfig::default(), Role::Server);
    let result = server.accept(&offers(header));
    assert!(result.is_err(), "{header} should be rejected");
    assert_ne!(result, Err(NegotiationError::NoAcceptableOffer));
}

#[test]
fn client_requires_exactly_one_response() {
    let client = PerMessageDeflate::new(DeflateConfig::default(), Role::Client);
    let result = client.accept(&offers("permessage-deflate, permessage-deflate"));
    assert_eq!(result, Err(NegotiationError::UnexpectedResponseCount { count: 2 }));
}

#[test]
fn bare_window_bits_only_valid_in_offers() {
    let client = PerMessageDeflate::new(DeflateConfig::default(), Role::Client);
    let result = client.accept(&offers("permessage-deflate; client_max_window_bits"));
    assert!(matches!(result, Err(NegotiationError::MissingValue { .. })));
}
