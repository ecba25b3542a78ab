mod common;

use common::*;
use heimdall_acl::dns::DomainName;
use heimdall_acl::tsig::{AuthFailure, TsigRecord, TsigState};
use heimdall_acl::{AclDirection, Denial, Options, QueryFacts, TsigAlgorithm};

fn verdict_for(options: &Options, peer: &str, msg: Vec<u8>) -> (isize, Option<Denial>) {
    let query = QueryFacts::new(addr(peer), msg);
    let verdict = options
        .check_incoming(&example_com(), AclDirection::ProvideXfr, &query)
        .unwrap();
    (verdict.match_index(), verdict.denial)
}

fn keyed_options() -> Options {
    load_options(&provide_xfr_config(&["192.0.2.0/24 xfr.example."]))
}

#[test]
fn test_signed_query_parses() {
    let options = keyed_options();
    let key = options.find_key("xfr.example.").unwrap().tsig_key.clone().unwrap();
    let msg = signed_axfr(0x1234, "example.com", &key);

    let query = QueryFacts::new(addr("192.0.2.1:53"), msg);
    let TsigState::Present(record) = query.tsig() else {
        panic!("expected a TSIG record, got {:?}", query.tsig());
    };
    assert_eq!(record.key_name, DomainName::parse("xfr.example").unwrap());
    assert_eq!(record.algorithm(), Some(TsigAlgorithm::HmacSha256));
    assert_eq!(record.original_id, 0x1234);
    assert_eq!(record.time_signed, TIME_SIGNED);
    assert_eq!(record.position, axfr_query(0x1234, "example.com").len());
}

#[test]
fn test_tampered_message_fails_verification() {
    let options = keyed_options();
    let key = options.find_key("xfr.example.").unwrap().tsig_key.clone().unwrap();
    let msg = signed_axfr(0x1234, "example.com", &key);
    assert_eq!(verdict_for(&options, "192.0.2.1:53", msg.clone()), (0, None));

    let record = TsigRecord::find(&msg).unwrap().unwrap();

    // ID, flags, counts (except ARCOUNT) and the question
    let mut offsets: Vec<usize> = (0..10).chain(12..record.position).collect();

    // Time signed and fudge inside the TSIG RDATA
    let rdata_start = record.position + record.key_name.wire_len() + 10;
    let time_at = rdata_start + record.algorithm_name.wire_len();
    offsets.extend(time_at..time_at + 8);

    for offset in offsets {
        let mut tampered = msg.clone();
        tampered[offset] ^= 0x04;
        let (index, denial) = verdict_for(&options, "192.0.2.1:53", tampered);
        assert_eq!(index, -1, "offset {} accepted", offset);
        assert!(denial.is_some());
    }
}

#[test]
fn test_tampered_mac_is_bad_signature() {
    let options = keyed_options();
    let key = options.find_key("xfr.example.").unwrap().tsig_key.clone().unwrap();
    let mut msg = signed_axfr(1, "example.com", &key);
    let first_mac_byte = msg.len() - 6 - 32;
    msg[first_mac_byte] ^= 0x01;
    assert_eq!(
        verdict_for(&options, "192.0.2.1:53", msg),
        (-1, Some(Denial::Tsig(AuthFailure::BadSignature)))
    );
}

#[test]
fn test_wrong_key_name_fails_at_key_matcher() {
    let options = keyed_options();
    let other = options
        .find_key("other.example.")
        .unwrap()
        .tsig_key
        .clone()
        .unwrap();
    let msg = signed_axfr(1, "example.com", &other);
    // The only entry needs xfr.example., so nothing matches and no
    // signature check runs
    assert_eq!(
        verdict_for(&options, "192.0.2.1:53", msg),
        (-1, Some(Denial::NoMatch))
    );
}

#[test]
fn test_unsigned_query_against_keyed_entry() {
    let options = keyed_options();
    assert_eq!(
        verdict_for(&options, "192.0.2.1:53", axfr_query(1, "example.com")),
        (-1, Some(Denial::NoMatch))
    );
}

#[test]
fn test_algorithm_spelling_must_match_definition() {
    let config = provide_xfr_config(&["192.0.2.0/24 xfr.example."])
        .replacen("algorithm = \"hmac-sha256\"", "algorithm = \"HMAC-SHA256\"", 1);
    let options = load_options(&config);
    let key = options.find_key("xfr.example.").unwrap().tsig_key.clone().unwrap();
    assert_eq!(key.algorithm(), TsigAlgorithm::HmacSha256);

    let msg = signed_axfr(1, "example.com", &key);
    assert_eq!(
        verdict_for(&options, "192.0.2.1:53", msg),
        (-1, Some(Denial::Tsig(AuthFailure::WrongAlgorithm)))
    );
}

#[test]
fn test_unusable_key_denies() {
    // md5 keys do not bind, so the entry can never be satisfied
    let config = provide_xfr_config(&["192.0.2.0/24 xfr.example."])
        .replacen("algorithm = \"hmac-sha256\"", "algorithm = \"hmac-md5\"", 1);
    let options = load_options(&config);
    assert!(options.find_key("xfr.example.").unwrap().tsig_key.is_none());

    let stand_in = heimdall_acl::TsigKey::from_base64(
        DomainName::parse("xfr.example.").unwrap(),
        TsigAlgorithm::HmacSha256,
        XFR_SECRET,
    )
    .unwrap();
    let msg = signed_axfr(1, "example.com", &stand_in);
    assert_eq!(
        verdict_for(&options, "192.0.2.1:53", msg),
        (-1, Some(Denial::NoMatch))
    );
}

#[test]
fn test_signature_verifies_across_generations() {
    // A reload builds new runtime keys; a request signed with the old
    // generation's key verifies against the new one with the same secret.
    let first = keyed_options();
    let second = keyed_options();
    let key = first.find_key("xfr.example.").unwrap().tsig_key.clone().unwrap();
    let msg = signed_axfr(1, "example.com", &key);
    assert_eq!(verdict_for(&second, "192.0.2.1:53", msg), (0, None));
}

#[test]
fn test_changed_id_is_bad_signature() {
    let options = keyed_options();
    let key = options.find_key("xfr.example.").unwrap().tsig_key.clone().unwrap();
    let mut msg = signed_axfr(0x1234, "example.com", &key);
    msg[0] ^= 0xFF;
    assert_eq!(
        verdict_for(&options, "192.0.2.1:53", msg),
        (-1, Some(Denial::Tsig(AuthFailure::BadSignature)))
    );
}
