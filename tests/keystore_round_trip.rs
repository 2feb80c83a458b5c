/// Integration tests: keystore document round-trips and failure paths.
///
/// Tests cover:
///   1. Encrypt -> decrypt round-trip in memory
///   2. Encrypt -> JSON -> disk -> JSON -> decrypt (caller-side persistence)
///   3. Freshness: re-encrypting the same key yields new salt/iv/ciphertext/mac/id
///   4. Wrong password and single-nibble document tampering both fail with
///      the single authentication error
///   5. Golden fixture: the published Web3 Secret Storage scrypt vector
///      decrypts to its known key
///
/// All tests are `#[test]`; no async, no network access.

use keyshard::keystore::{decrypt_private_key, encrypt_private_key, Keystore};
use keyshard::KeyshardError;

/// Fixed password used across these tests.
const PASSWORD: &str = "correct horse battery staple";

/// Fixed private key: bytes 0x01 through 0x20.
fn fixed_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    for (i, byte) in key.iter_mut().enumerate() {
        *byte = i as u8 + 1;
    }
    key
}

/// Flip one nibble of a hex string, leaving its length intact.
fn flip_first_hex_char(hex: &str) -> String {
    let mut chars: Vec<char> = hex.chars().collect();
    chars[0] = if chars[0] == '0' { '1' } else { '0' };
    chars.into_iter().collect()
}

// ── Test 1: In-memory round-trip ────────────────────────────────────────────

/// Encrypt a key, decrypt the container, verify equality.
#[test]
fn test_encrypt_decrypt_round_trip() {
    let key = fixed_key();
    let keystore = encrypt_private_key(&key, PASSWORD).expect("encrypt should succeed");
    let recovered = decrypt_private_key(&keystore, PASSWORD).expect("decrypt should succeed");
    assert_eq!(
        *recovered, key,
        "decrypted key must exactly match the original"
    );
}

// ── Test 2: Round-trip through the caller's storage ─────────────────────────

/// Serialize to JSON, write to a temp file, read it back, parse, decrypt.
/// The codec does no I/O itself; this simulates the owning application.
#[test]
fn test_round_trip_through_disk() {
    let key = fixed_key();
    let keystore = encrypt_private_key(&key, PASSWORD).expect("encrypt should succeed");
    let json = keystore.to_json().expect("serialize should succeed");

    let dir = tempfile::tempdir().expect("tempdir should be creatable");
    let path = dir.path().join("wallet.json");
    std::fs::write(&path, &json).expect("writing the document should succeed");

    let loaded = std::fs::read_to_string(&path).expect("reading the document should succeed");
    let parsed = Keystore::from_json(&loaded).expect("parse should succeed");
    assert_eq!(parsed, keystore, "document must survive the disk round-trip");

    let recovered = decrypt_private_key(&parsed, PASSWORD).expect("decrypt should succeed");
    assert_eq!(*recovered, key, "key must survive the full store/load cycle");
}

// ── Test 3: Freshness on re-encryption ──────────────────────────────────────

/// Encrypting one key twice must produce two unrelated documents, and both
/// must still decrypt to the key.
#[test]
fn test_reencryption_is_fresh() {
    let key = fixed_key();
    let a = encrypt_private_key(&key, PASSWORD).expect("encrypt should succeed");
    let b = encrypt_private_key(&key, PASSWORD).expect("encrypt should succeed");

    assert_ne!(a.crypto.kdfparams.salt, b.crypto.kdfparams.salt, "salt must be fresh");
    assert_ne!(a.crypto.cipherparams.iv, b.crypto.cipherparams.iv, "iv must be fresh");
    assert_ne!(a.crypto.ciphertext, b.crypto.ciphertext, "ciphertext must differ");
    assert_ne!(a.crypto.mac, b.crypto.mac, "mac must differ");
    assert_ne!(a.id, b.id, "container id must be fresh");
    assert_ne!(
        a.to_json().expect("serialize a"),
        b.to_json().expect("serialize b"),
        "the serialized documents must differ"
    );

    assert_eq!(*decrypt_private_key(&a, PASSWORD).expect("decrypt a"), key);
    assert_eq!(*decrypt_private_key(&b, PASSWORD).expect("decrypt b"), key);
}

// ── Test 4: Authentication failures ─────────────────────────────────────────

/// A wrong password is reported with the single authentication error and
/// its fixed message; the caller cannot tell it from corruption.
#[test]
fn test_wrong_password_is_one_error() {
    let keystore = encrypt_private_key(&fixed_key(), PASSWORD).expect("encrypt should succeed");
    let err = decrypt_private_key(&keystore, "not the password").unwrap_err();
    assert!(matches!(err, KeyshardError::Authentication));
    assert_eq!(
        err.to_string(),
        "wrong password or corrupted keystore",
        "the message must not reveal which of the two happened"
    );
}

/// Flipping a single nibble of the stored ciphertext in the JSON document
/// must fail authentication, and the same goes for the mac field.
#[test]
fn test_single_nibble_tamper_rejected() {
    let keystore = encrypt_private_key(&fixed_key(), PASSWORD).expect("encrypt should succeed");
    let json = keystore.to_json().expect("serialize should succeed");

    let ct_hex = hex::encode(&keystore.crypto.ciphertext);
    let tampered_ct = json.replace(&ct_hex, &flip_first_hex_char(&ct_hex));
    let parsed = Keystore::from_json(&tampered_ct).expect("tampered document still parses");
    assert!(
        matches!(
            decrypt_private_key(&parsed, PASSWORD).unwrap_err(),
            KeyshardError::Authentication
        ),
        "ciphertext tampering must fail closed before any decryption"
    );

    let mac_hex = hex::encode(&keystore.crypto.mac);
    let tampered_mac = json.replace(&mac_hex, &flip_first_hex_char(&mac_hex));
    let parsed = Keystore::from_json(&tampered_mac).expect("tampered document still parses");
    assert!(
        matches!(
            decrypt_private_key(&parsed, PASSWORD).unwrap_err(),
            KeyshardError::Authentication
        ),
        "mac tampering must fail closed"
    );
}

// ── Test 5: Golden fixture ──────────────────────────────────────────────────

/// A pinned container holding a known key under the heavy standard scrypt
/// cost, n=262144, r=8, p=1, the parameter set wallet tooling writes for
/// long-lived keys. A conforming implementation decrypts it with the
/// password "testpassword"; this is the interoperability proof for the
/// scrypt/AES/Keccak pipeline.
const GOLDEN_KEYSTORE: &str = r#"{"crypto":{"cipher":"aes-128-ctr","cipherparams":{"iv":"83dbcc02d8ccb40e466191a123791e0e"},"ciphertext":"b160ff7e6d855b53a3f8d65e4b2850584cfaa01751807f19d07c298de16f802d","kdf":"scrypt","kdfparams":{"dklen":32,"n":262144,"p":1,"r":8,"salt":"ab0c7876052600dd703518d6fc3fe8984592145b591fc8fb5c6d43190334ba19"},"mac":"daeeba49ffae86381ae33f74c05dc0038888a7806267a04a1ae2183a7f2b7b17"},"id":"3198bc9c-6672-5ab3-d995-4942343ae5b6","version":3}"#;

const GOLDEN_PASSWORD: &str = "testpassword";
const GOLDEN_SECRET_HEX: &str = "7a28b5ba57c53603b0b07b56bba752f7784bf506fa95edc395f5cf6c7514fe9d";

#[test]
fn test_golden_vector_decrypts() {
    let keystore = Keystore::from_json(GOLDEN_KEYSTORE).expect("fixture must parse");
    assert_eq!(keystore.version, 3);
    assert_eq!(keystore.crypto.kdfparams.n, 262144, "fixture uses the heavy cost");
    assert_eq!(keystore.crypto.kdfparams.r, 8);

    let recovered =
        decrypt_private_key(&keystore, GOLDEN_PASSWORD).expect("fixture must decrypt");
    assert_eq!(
        hex::encode(*recovered),
        GOLDEN_SECRET_HEX,
        "recovered secret must match the pinned value"
    );
}

/// The fixture must refuse a wrong password like any other container.
#[test]
fn test_golden_vector_rejects_wrong_password() {
    let keystore = Keystore::from_json(GOLDEN_KEYSTORE).expect("fixture must parse");
    let err = decrypt_private_key(&keystore, "Testpassword").unwrap_err();
    assert!(matches!(err, KeyshardError::Authentication));
}

/// The widely copied heavy-cost demo vector pairs n=262144 with r=1, which
/// violates RFC 7914's N < 2^(16r) bound; scrypt backends refuse to derive
/// under it. Such a document still parses, but decryption is a structural
/// rejection with any password, never an authentication verdict.
const RFC_BOUND_VIOLATING_KEYSTORE: &str = r#"{"crypto":{"cipher":"aes-128-ctr","cipherparams":{"iv":"83dbcc02d8ccb40e466191a123791e0e"},"ciphertext":"d172bf743a674da9cdad04534d56926ef8358534d458fffccd4e6ad2fbde479c","kdf":"scrypt","kdfparams":{"dklen":32,"n":262144,"p":8,"r":1,"salt":"ab0c7876052600dd703518d6fc3fe8984592145b591fc8fb5c6d43190334ba19"},"mac":"2103ac29920d71da29f15d75b4a16dbe95cfd7ff8faea1056c33131d846e3097"},"id":"3198bc9c-6672-5ab3-d995-4942343ae5b6","version":3}"#;

#[test]
fn test_out_of_bound_params_rejected_before_authentication() {
    let keystore =
        Keystore::from_json(RFC_BOUND_VIOLATING_KEYSTORE).expect("document still parses");
    let err = decrypt_private_key(&keystore, GOLDEN_PASSWORD).unwrap_err();
    assert!(
        matches!(err, KeyshardError::Format(_)),
        "out-of-bound kdfparams must be a Format rejection, got {err:?}"
    );
    let err = decrypt_private_key(&keystore, "wrong password").unwrap_err();
    assert!(
        matches!(err, KeyshardError::Format(_)),
        "the password must play no part in a structural rejection, got {err:?}"
    );
}
