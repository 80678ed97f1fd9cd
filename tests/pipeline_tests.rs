//! End-to-end pipeline tests over the pure stages: raw contract payload in,
//! prepared artwork out, plus the registration-time integrity contract.

use base64::Engine;
use tessera::{
    content_hash, decode_envelope, prepare, sniff_format, ArtworkPayload, Error, FormatTag,
    IntegrityRecord, PreparedArtwork,
};

fn base64_envelope(json: &str) -> String {
    format!(
        "data:application/json;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(json)
    )
}

#[test]
fn legacy_binary_payload_resolves_to_sniffed_bytes() {
    // A legacy getImageData-style result: raw GIF bytes.
    let payload = ArtworkPayload::Bytes(b"GIF89a\x01\x00\x01\x00".to_vec());
    match prepare(&payload).unwrap() {
        PreparedArtwork::Bytes { bytes, format } => {
            assert_eq!(format, FormatTag::Gif);
            assert!(bytes.starts_with(b"GIF8"));
        }
        other => panic!("expected bytes, got {other:?}"),
    }
}

#[test]
fn hex_payload_decodes_then_sniffs() {
    // PNG signature, hex-encoded the way JSON-RPC returns binary.
    let payload = ArtworkPayload::from("0x89504e470d0a1a0a");
    assert_eq!(prepare(&payload).unwrap().format(), FormatTag::Png);
}

#[test]
fn odd_length_hex_fails_without_partial_decode() {
    let payload = ArtworkPayload::from("0x89504e470d0a1a0");
    assert!(matches!(
        prepare(&payload),
        Err(Error::MalformedHexPayload(_))
    ));
}

#[test]
fn empty_payloads_are_rejected() {
    assert!(matches!(
        prepare(&ArtworkPayload::Bytes(vec![])),
        Err(Error::EmptyPayload)
    ));
    assert!(matches!(
        prepare(&ArtworkPayload::from("")),
        Err(Error::EmptyPayload)
    ));
}

#[test]
fn envelope_round_trips_to_nested_image() {
    let envelope = base64_envelope(
        r#"{"name":"Sunset","description":"A sunset","image":"data:image/png;base64,iVBORw0KGgo="}"#,
    );

    let decoded = decode_envelope(&envelope).unwrap();
    assert_eq!(decoded.name, "Sunset");
    assert_eq!(decoded.description, "A sunset");
    assert_eq!(decoded.image, "data:image/png;base64,iVBORw0KGgo=");

    // Decoding the retained original again is field-wise identical.
    assert_eq!(decode_envelope(&decoded.original_envelope).unwrap(), decoded);

    // And the full pipeline routes the nested image straight through.
    match prepare(&ArtworkPayload::from(envelope)).unwrap() {
        PreparedArtwork::DataUrl {
            url,
            format,
            metadata,
            from_envelope,
        } => {
            assert_eq!(url, "data:image/png;base64,iVBORw0KGgo=");
            assert_eq!(format, FormatTag::Png);
            assert!(from_envelope);
            assert_eq!(metadata.unwrap().name, "Sunset");
        }
        other => panic!("expected data url, got {other:?}"),
    }
}

#[test]
fn broken_envelope_falls_back_to_raw_mode() {
    // Envelope prefix but no usable JSON behind it: recovered locally, the
    // string itself becomes the raw payload.
    let payload = ArtworkPayload::from("data:application/json;base64,////");
    match prepare(&payload).unwrap() {
        PreparedArtwork::Bytes { .. } => {}
        other => panic!("expected raw fallback, got {other:?}"),
    }
}

#[test]
fn plain_data_url_bypasses_decoding_entirely() {
    // Not valid base64 after the comma; it must pass through untouched
    // because data:image URLs are never decoded here.
    let url = "data:image/webp;base64,@@not-checked@@";
    match prepare(&ArtworkPayload::from(url)).unwrap() {
        PreparedArtwork::DataUrl { url: out, format, .. } => {
            assert_eq!(out, url);
            assert_eq!(format, FormatTag::Webp);
        }
        other => panic!("expected data url, got {other:?}"),
    }
}

#[test]
fn sniffer_matches_specimen_signatures() {
    assert_eq!(
        sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]),
        FormatTag::Jpeg
    );
    assert_eq!(
        sniff_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
        FormatTag::Png
    );
    assert_eq!(
        sniff_format(&[
            0x52, 0x49, 0x46, 0x46, 0, 0, 0, 0, 0x57, 0x45, 0x42, 0x50
        ]),
        FormatTag::Webp
    );
    assert_eq!(sniff_format(&[0x00, 0x01]), FormatTag::Avif);
}

#[test]
fn integrity_record_matches_registration_contract() {
    let record = IntegrityRecord::check("abc123", "abc123", 30.0);
    assert!(record.hashes_match);
    assert!(record.within_size_limit);

    let record = IntegrityRecord::check("abc123", "abc123", 50.0);
    assert!(record.hashes_match);
    assert!(!record.within_size_limit);

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["originalHash"], "abc123");
    assert_eq!(json["hashesMatch"], true);
    assert_eq!(json["withinSizeLimit"], false);
    assert_eq!(json["sizeKB"], 50.0);
}

#[test]
fn content_hash_pairs_with_integrity_check() {
    let payload = b"artwork bytes";
    let record =
        IntegrityRecord::from_sizes(&content_hash(payload), &content_hash(payload), payload.len());
    assert!(record.hashes_match);
    assert!(record.within_size_limit);
    assert!(!record.needs_acknowledgement());
}
