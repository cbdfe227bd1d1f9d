mod common;

use ciborium::Value;
use common::*;
use cwt_protocol::cbor;

#[test]
fn test_direct_recipient_shapes_fail_construction() {
    init_tracing();
    let direct = Header::new().with(label::ALG, cbor::int(-6));

    let non_empty_protected = Recipient::new(
        Header::new().with(label::KID, Value::Bytes(b"01".to_vec())),
        direct.clone(),
        Vec::new(),
        Vec::new(),
    );
    let non_empty_ciphertext =
        Recipient::new(Header::new(), direct.clone(), vec![0u8; 16], Vec::new());
    let with_children = Recipient::new(
        Header::new(),
        direct,
        Vec::new(),
        vec![Recipient::direct(None).unwrap()],
    );

    for result in [non_empty_protected, non_empty_ciphertext, with_children] {
        assert!(result.unwrap_err().is_argument_error());
    }
}

#[test]
fn test_mac_with_direct_recipient() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let key = CoseKey::generate(Algorithm::HMAC_256_256)?.with_kid(b"our-secret".to_vec());
    let recipient = Recipient::direct(Some(b"our-secret"))?;

    let token = Cwt::new().encode_and_mac(&sample_claims(), &key, vec![recipient])?;
    let envelope = Envelope::from_bytes(&token)?;
    assert_eq!(envelope.kind, EnvelopeKind::Mac);
    assert_eq!(envelope.recipients.len(), 1);

    assert_eq!(Cwt::new().decode(&token, &key)?, sample_claims());

    let other_kid = key.clone().with_kid(b"someone-else".to_vec());
    assert!(Cwt::new().decode(&token, &other_kid).unwrap_err().is_decode_error());
    Ok(())
}

#[test]
fn test_encrypt_with_key_wrap_recipient() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cek = CoseKey::generate(Algorithm::A256GCM)?;
    let kek = CoseKey::generate(Algorithm::A128KW)?.with_kid(b"kek-01".to_vec());

    let mut recipient = Recipient::key_wrap(kek.clone(), Vec::new())?;
    recipient.wrap_key(cek.key())?;
    let token = Cwt::new().encode_and_encrypt(&sample_claims(), &cek, None, vec![recipient])?;

    // the receiver only holds the key-encryption key
    assert_eq!(Cwt::new().decode(&token, &kek)?, sample_claims());

    let wrong = CoseKey::generate(Algorithm::A128KW)?;
    assert!(Cwt::new().decode(&token, &wrong).unwrap_err().is_decode_error());
    Ok(())
}

#[test]
fn test_encrypt_with_hkdf_recipient() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let shared = [0x5au8; 32];
    let context = KdfContext::from_json(&serde_json::json!({
        "alg": "AES-CCM-16-64-128",
        "party_u": {"identity": "lighting-client"},
        "party_v": {"identity": "lighting-server"},
    }))?;

    let recipient = Recipient::hkdf(
        Algorithm::DIRECT_HKDF_SHA_256,
        context.clone(),
        Some(b"aabbccddeeffgghh".to_vec()),
        Some(b"01"),
    )?;
    let cek = recipient.derive_key(&shared, &context)?;
    assert_eq!(cek.alg(), Algorithm::AES_CCM_16_64_128);
    let token = Cwt::new().encode_and_encrypt(&sample_claims(), &cek, None, vec![recipient])?;

    let material =
        CoseKey::from_symmetric_key(&shared, Algorithm::DIRECT_HKDF_SHA_256, Some(b"01"))?;
    assert_eq!(Cwt::new().decode(&token, &material)?, sample_claims());

    let other = CoseKey::from_symmetric_key(&[0u8; 32], Algorithm::DIRECT_HKDF_SHA_256, None)?;
    assert!(Cwt::new().decode(&token, &other).unwrap_err().is_decode_error());
    Ok(())
}

#[test]
fn test_two_layer_tree_scenario_c() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let (sender_secret, receiver_secret) = ecdh_shared_secrets();
    assert_eq!(sender_secret, receiver_secret);

    // inner: ECDH material -> HKDF -> A128KW key-encryption key
    let mut kek_context = KdfContext::new(Algorithm::A128KW);
    kek_context.party_u.identity = Some(b"sender".to_vec());
    kek_context.party_v.identity = Some(b"receiver".to_vec());
    let inner = Recipient::hkdf(
        Algorithm::DIRECT_HKDF_SHA_256,
        kek_context.clone(),
        Some(b"scenario-c-salt".to_vec()),
        None,
    )?;
    let kek = inner.derive_key(&sender_secret, &kek_context)?;

    // outer: content key wrapped under the derived key
    let cek = CoseKey::generate(Algorithm::A256GCM)?;
    let mut outer = Recipient::key_wrap(kek.clone(), vec![inner.clone()])?;
    outer.wrap_key(cek.key())?;

    let token = Cwt::new().encode_and_encrypt(&sample_claims(), &cek, None, vec![outer])?;

    let material =
        CoseKey::from_symmetric_key(&receiver_secret, Algorithm::DIRECT_HKDF_SHA_256, None)?;
    assert_eq!(Cwt::new().decode(&token, &material)?, sample_claims());

    // the decoded tree resolves to the same keys
    let envelope = Envelope::from_bytes(&token)?;
    let resolved = cwt::recipient::resolve(
        &envelope.recipients,
        &material,
        Algorithm::A256GCM,
        RecipientPolicy::FirstMatch,
    )?;
    assert_eq!(resolved.key(), cek.key());

    let decoded_inner = &envelope.recipients[0].recipients()[0];
    decoded_inner.verify_key(&receiver_secret, kek.key(), &kek_context)?;
    inner.verify_key(&receiver_secret, kek.key(), &kek_context)?;

    let err = inner
        .verify_key(&[0u8; 32], kek.key(), &kek_context)
        .unwrap_err();
    assert!(err.is_verify_error());
    Ok(())
}

#[test]
fn test_first_match_uses_the_resolving_sibling() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cek = CoseKey::generate(Algorithm::A128GCM)?;
    let alice = CoseKey::generate(Algorithm::A192KW)?.with_kid(b"alice".to_vec());
    let bob = CoseKey::generate(Algorithm::A192KW)?.with_kid(b"bob".to_vec());

    let mut for_alice = Recipient::key_wrap(alice.clone(), Vec::new())?;
    for_alice.wrap_key(cek.key())?;
    let mut for_bob = Recipient::key_wrap(bob.clone(), Vec::new())?;
    for_bob.wrap_key(cek.key())?;

    let token = Cwt::new().encode_and_encrypt(
        &sample_claims(),
        &cek,
        None,
        vec![for_alice, for_bob],
    )?;
    assert_eq!(Cwt::new().decode(&token, &alice)?, sample_claims());
    assert_eq!(Cwt::new().decode(&token, &bob)?, sample_claims());

    let strict = Cwt::with_options(CwtOptions {
        recipient_policy: RecipientPolicy::ExactlyOne,
        ..CwtOptions::default()
    });
    assert_eq!(strict.decode(&token, &bob)?, sample_claims());
    Ok(())
}

#[test]
fn test_exactly_one_rejects_ambiguous_siblings() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cek = CoseKey::generate(Algorithm::A128GCM)?;
    let kek = CoseKey::generate(Algorithm::A128KW)?;

    let mut first = Recipient::key_wrap(kek.clone(), Vec::new())?;
    first.wrap_key(cek.key())?;
    let mut second = Recipient::key_wrap(kek.clone(), Vec::new())?;
    second.wrap_key(cek.key())?;

    let token =
        Cwt::new().encode_and_encrypt(&sample_claims(), &cek, None, vec![first, second])?;
    assert_eq!(Cwt::new().decode(&token, &kek)?, sample_claims());

    let strict = Cwt::with_options(CwtOptions {
        recipient_policy: RecipientPolicy::ExactlyOne,
        ..CwtOptions::default()
    });
    let err = strict.decode(&token, &kek).unwrap_err();
    assert!(err.is_decode_error());
    assert!(err.to_string().contains("more than one recipient"));
    Ok(())
}

#[test]
fn test_malformed_recipient_in_token_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let key = CoseKey::generate(Algorithm::HMAC_256_256)?;
    let token = Cwt::new().encode_and_mac(
        &sample_claims(),
        &key,
        vec![Recipient::direct(None)?],
    )?;

    let envelope = Envelope::from_bytes(&token)?;
    // a direct recipient that claims to carry a ciphertext
    let bad = Value::Array(vec![
        Value::Bytes(Vec::new()),
        Header::new().with(label::ALG, cbor::int(-6)).to_value(),
        Value::Bytes(vec![1, 2, 3]),
    ]);
    let mut value = envelope.to_value()?;
    if let Value::Array(items) = &mut value {
        items[4] = Value::Array(vec![bad]);
    }
    let bytes = cbor::to_vec(&value)?;
    assert!(Cwt::new().decode(&bytes, &key).unwrap_err().is_argument_error());
    Ok(())
}

#[test]
fn test_malformed_sibling_after_valid_key_wrap_is_rejected(
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cek = CoseKey::generate(Algorithm::A128GCM)?;
    let kek = CoseKey::generate(Algorithm::A128KW)?.with_kid(b"kek-01".to_vec());
    let mut recipient = Recipient::key_wrap(kek.clone(), Vec::new())?;
    recipient.wrap_key(cek.key())?;
    let token = Cwt::new().encode_and_encrypt(&sample_claims(), &cek, None, vec![recipient])?;
    assert_eq!(Cwt::new().decode(&token, &kek)?, sample_claims());

    // the first sibling alone would resolve the content key
    let bad = Value::Array(vec![
        Value::Bytes(Vec::new()),
        Header::new().with(label::ALG, cbor::int(-6)).to_value(),
        Value::Bytes(vec![0u8; 24]),
    ]);
    let mut value = Envelope::from_bytes(&token)?.to_value()?;
    if let Value::Array(items) = &mut value {
        if let Value::Array(siblings) = &mut items[3] {
            assert_eq!(siblings.len(), 1);
            siblings.push(bad);
        }
    }
    let bytes = cbor::to_vec(&value)?;

    let err = Cwt::new().decode(&bytes, &kek).unwrap_err();
    assert!(err.is_argument_error());
    assert!(err.to_string().contains("ciphertext should be zero-length bytes."));
    Ok(())
}

#[test]
fn test_hkdf_sha512_from_ecdh_secret() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let (sender_secret, receiver_secret) = ecdh_shared_secrets();
    assert_eq!(receiver_secret.len(), 32);

    let context = KdfContext::new(Algorithm::A256GCM);
    let recipient = Recipient::hkdf(
        Algorithm::DIRECT_HKDF_SHA_512,
        context.clone(),
        Some(b"salt-512".to_vec()),
        Some(b"receiver"),
    )?;
    let cek = recipient.derive_key(&sender_secret, &context)?;
    assert_eq!(cek.key().len(), 32);
    let token = Cwt::new().encode_and_encrypt(&sample_claims(), &cek, None, vec![recipient])?;

    let material = CoseKey::from_symmetric_key(
        &receiver_secret,
        Algorithm::DIRECT_HKDF_SHA_512,
        Some(b"receiver"),
    )?;
    assert_eq!(Cwt::new().decode(&token, &material)?, sample_claims());
    Ok(())
}
