//! Multisig signing, incremental accumulation, introspection, and
//! pay-to-script-hash round trips.

use coin_primitives::ec::PrivateKey;
use coin_script::interpreter::VerifyFlags;
use coin_script::templates;
use coin_script::{Address, Network, Script};
use coin_transaction::input::{Outpoint, TxIn, DEFAULT_SEQUENCE};
use coin_transaction::signer::{sign, KeyMap, ScriptMap};
use coin_transaction::sighash::SIGHASH_ALL;
use coin_transaction::validator::{bad_signature_count, who_signed};
use coin_transaction::{Transaction, TransactionError, TxOut};

const FLAGS: VerifyFlags = VerifyFlags::P2SH;

fn test_keys(count: usize) -> Vec<PrivateKey> {
    (1..=count as u64)
        .map(|i| PrivateKey::from_scalar(i).expect("small scalar is a valid key"))
        .collect()
}

fn sec_keys(keys: &[PrivateKey]) -> Vec<Vec<u8>> {
    keys.iter().map(|k| k.pub_key().to_compressed().to_vec()).collect()
}

/// A coinbase transaction funding one output with the given script.
fn funding_tx(script_pubkey: Script) -> Transaction {
    let mut tx = Transaction::new();
    tx.inputs.push(TxIn::coinbase(b"\x00\x00"));
    tx.outputs.push(TxOut::new(1_000_000, script_pubkey));
    tx
}

/// An unsigned transaction spending the funding tx's only output to a
/// throwaway pay-to-pubkey-hash destination.
fn spend_of(funding: &Transaction, payout_key: &PrivateKey) -> Transaction {
    let dest = templates::pay_to_pubkey_hash(&payout_key.pub_key().hash160());
    let mut tx = Transaction::new();
    tx.inputs.push(TxIn::new(
        Outpoint::new(funding.tx_id(), 0),
        Script::new(),
        DEFAULT_SEQUENCE,
    ));
    tx.outputs.push(TxOut::new(1_000_000, dest));
    tx.set_unspents(funding.outputs_as_spendables()).unwrap();
    tx
}

fn address_of(key: &PrivateKey) -> String {
    Address::for_public_key(&key.pub_key().to_compressed(), Network::Mainnet).encode()
}

#[test]
fn test_p2pkh_sign_and_who_signed() {
    let keys = test_keys(2);
    let script = templates::pay_to_pubkey_hash(&keys[0].pub_key().hash160());
    let funding = funding_tx(script);
    let mut tx = spend_of(&funding, &keys[1]);

    assert_eq!(bad_signature_count(&tx, FLAGS), 1);
    sign(&mut tx, &KeyMap::new([keys[0].clone()]), None, SIGHASH_ALL).unwrap();
    assert_eq!(bad_signature_count(&tx, FLAGS), 0);

    let signers = who_signed(&tx, 0).unwrap();
    assert_eq!(signers, vec![(address_of(&keys[0]), SIGHASH_ALL)]);
}

#[test]
fn test_p2pk_sign() {
    let keys = test_keys(2);
    let script = templates::pay_to_pubkey(&keys[0].pub_key().to_compressed()).unwrap();
    let funding = funding_tx(script);
    let mut tx = spend_of(&funding, &keys[1]);

    assert_eq!(bad_signature_count(&tx, FLAGS), 1);
    sign(&mut tx, &KeyMap::new([keys[0].clone()]), None, SIGHASH_ALL).unwrap();
    assert_eq!(bad_signature_count(&tx, FLAGS), 0);

    let signers = who_signed(&tx, 0).unwrap();
    assert_eq!(signers, vec![(address_of(&keys[0]), SIGHASH_ALL)]);
}

#[test]
fn test_missing_key_leaves_input_unsigned() {
    let keys = test_keys(2);
    let script = templates::pay_to_pubkey_hash(&keys[0].pub_key().hash160());
    let funding = funding_tx(script);
    let mut tx = spend_of(&funding, &keys[1]);

    // The wrong key cannot address the input; no error, no progress.
    sign(&mut tx, &KeyMap::new([keys[1].clone()]), None, SIGHASH_ALL).unwrap();
    assert!(tx.inputs[0].script_sig.is_empty());
    assert_eq!(bad_signature_count(&tx, FLAGS), 1);
}

fn multisig_m_of_n_individually(m: usize, n: usize, orders: &[Vec<usize>]) {
    let keys = test_keys(n + 1);
    let script = templates::multisig(m, &sec_keys(&keys[..n])).unwrap();
    let funding = funding_tx(script);

    for order in orders {
        let mut tx = spend_of(&funding, &keys[n]);
        for &key_idx in &order[..m] {
            assert_eq!(
                bad_signature_count(&tx, FLAGS),
                1,
                "{}-of-{} should not verify before signature {} lands",
                m,
                n,
                key_idx
            );
            sign(
                &mut tx,
                &KeyMap::new([keys[key_idx].clone()]),
                None,
                SIGHASH_ALL,
            )
            .unwrap();
        }
        assert_eq!(bad_signature_count(&tx, FLAGS), 0, "{}-of-{} {:?}", m, n, order);
    }
}

#[test]
fn test_multisig_one_key_at_a_time() {
    for n in 1..=3usize {
        for m in 1..=n {
            // Natural order and reversed order among the first m keys.
            let natural: Vec<usize> = (0..n).collect();
            let reversed: Vec<usize> = (0..n).rev().collect();
            multisig_m_of_n_individually(m, n, &[natural, reversed]);
        }
    }
}

#[test]
fn test_multisig_incremental_who_signed_and_id_changes() {
    let (m, n) = (3, 3);
    let keys = test_keys(n + 1);
    let script = templates::multisig(m, &sec_keys(&keys[..n])).unwrap();
    let funding = funding_tx(script);
    let mut tx = spend_of(&funding, &keys[n]);

    let mut seen_ids = vec![tx.tx_id_hex()];
    for i in 0..n {
        assert_eq!(bad_signature_count(&tx, FLAGS), 1);
        sign(&mut tx, &KeyMap::new([keys[i].clone()]), None, SIGHASH_ALL).unwrap();

        // Each added signature rewrites the scriptSig, so the id moves.
        let id = tx.tx_id_hex();
        assert!(!seen_ids.contains(&id), "id did not change at step {}", i);
        seen_ids.push(id);

        let mut expected: Vec<(String, u32)> = keys[..=i]
            .iter()
            .map(|k| (address_of(k), SIGHASH_ALL))
            .collect();
        expected.sort();
        assert_eq!(who_signed(&tx, 0).unwrap(), expected);
    }
    assert_eq!(bad_signature_count(&tx, FLAGS), 0);
}

#[test]
fn test_multisig_extra_keys_do_not_oversign() {
    // Signing with every key at once still produces exactly m
    // signatures in pubkey order.
    let (m, n) = (2, 3);
    let keys = test_keys(n + 1);
    let script = templates::multisig(m, &sec_keys(&keys[..n])).unwrap();
    let funding = funding_tx(script);
    let mut tx = spend_of(&funding, &keys[n]);

    sign(&mut tx, &KeyMap::new(keys[..n].to_vec()), None, SIGHASH_ALL).unwrap();
    assert_eq!(bad_signature_count(&tx, FLAGS), 0);
    let signers = who_signed(&tx, 0).unwrap();
    assert_eq!(signers.len(), m);
    let mut expected: Vec<(String, u32)> = keys[..m]
        .iter()
        .map(|k| (address_of(k), SIGHASH_ALL))
        .collect();
    expected.sort();
    assert_eq!(signers, expected);
}

#[test]
fn test_sign_pay_to_script_hash_multisig() {
    let (m, n) = (3, 3);
    let keys = test_keys(n + 1);
    let redeem = templates::multisig(m, &sec_keys(&keys[..n])).unwrap();
    let address = Address::for_script(redeem.to_bytes(), Network::Mainnet);
    let script = templates::script_for_address(&address);
    let funding = funding_tx(script);
    let mut tx = spend_of(&funding, &keys[n]);

    assert_eq!(bad_signature_count(&tx, FLAGS), 1);
    sign(
        &mut tx,
        &KeyMap::new(keys[..n].to_vec()),
        Some(&ScriptMap::new([redeem])),
        SIGHASH_ALL,
    )
    .unwrap();
    assert_eq!(bad_signature_count(&tx, FLAGS), 0);

    // The script-hash template exposes no enumerable key set.
    assert!(matches!(
        who_signed(&tx, 0),
        Err(TransactionError::NoAddressesForScriptType(_))
    ));
}

#[test]
fn test_p2sh_without_redeem_lookup_stays_unsigned() {
    let (m, n) = (2, 2);
    let keys = test_keys(n + 1);
    let redeem = templates::multisig(m, &sec_keys(&keys[..n])).unwrap();
    let address = Address::for_script(redeem.to_bytes(), Network::Mainnet);
    let funding = funding_tx(templates::script_for_address(&address));
    let mut tx = spend_of(&funding, &keys[n]);

    // No redeem lookup at all, then a lookup that misses.
    sign(&mut tx, &KeyMap::new(keys[..n].to_vec()), None, SIGHASH_ALL).unwrap();
    assert!(tx.inputs[0].script_sig.is_empty());
    let empty_map = ScriptMap::new(Vec::<Script>::new());
    sign(
        &mut tx,
        &KeyMap::new(keys[..n].to_vec()),
        Some(&empty_map),
        SIGHASH_ALL,
    )
    .unwrap();
    assert!(tx.inputs[0].script_sig.is_empty());
    assert_eq!(bad_signature_count(&tx, FLAGS), 1);
}

#[test]
fn test_p2sh_multisig_incremental() {
    let (m, n) = (2, 3);
    let keys = test_keys(n + 1);
    let redeem = templates::multisig(m, &sec_keys(&keys[..n])).unwrap();
    let address = Address::for_script(redeem.to_bytes(), Network::Mainnet);
    let funding = funding_tx(templates::script_for_address(&address));
    let mut tx = spend_of(&funding, &keys[n]);

    let redeem_map = ScriptMap::new([redeem]);
    // First key alone: a partial scriptSig that does not yet verify.
    sign(
        &mut tx,
        &KeyMap::new([keys[1].clone()]),
        Some(&redeem_map),
        SIGHASH_ALL,
    )
    .unwrap();
    assert!(!tx.inputs[0].script_sig.is_empty());
    assert_eq!(bad_signature_count(&tx, FLAGS), 1);

    // Second key completes the threshold, preserving the first
    // signature.
    sign(
        &mut tx,
        &KeyMap::new([keys[0].clone()]),
        Some(&redeem_map),
        SIGHASH_ALL,
    )
    .unwrap();
    assert_eq!(bad_signature_count(&tx, FLAGS), 0);
}

#[test]
fn test_per_input_sighash_mode_is_reported() {
    use coin_transaction::sighash::SIGHASH_SINGLE;
    use coin_transaction::signer::sign_input;

    let keys = test_keys(2);
    let script = templates::pay_to_pubkey_hash(&keys[0].pub_key().hash160());
    let funding = funding_tx(script);
    let mut tx = spend_of(&funding, &keys[1]);

    sign_input(
        &mut tx,
        0,
        &KeyMap::new([keys[0].clone()]),
        None,
        SIGHASH_SINGLE,
    )
    .unwrap();
    assert_eq!(bad_signature_count(&tx, FLAGS), 0);
    assert_eq!(
        who_signed(&tx, 0).unwrap(),
        vec![(address_of(&keys[0]), SIGHASH_SINGLE)]
    );
}

#[test]
fn test_unknown_script_gets_no_signing_help() {
    let keys = test_keys(1);
    // An arbitrary non-standard lock.
    let script = Script::from_bytes(&[0x76, 0x75, 0x51]); // DUP DROP TRUE
    let funding = funding_tx(script);
    let mut tx = spend_of(&funding, &keys[0]);

    sign(&mut tx, &KeyMap::new(keys.clone()), None, SIGHASH_ALL).unwrap();
    assert!(tx.inputs[0].script_sig.is_empty());
}
