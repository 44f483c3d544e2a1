use proptest::prelude::*;

use coin_script::Script;
use coin_transaction::input::{Outpoint, TxIn};
use coin_transaction::sighash::{signature_hash, SIGHASH_ALL};
use coin_transaction::{Spendable, Transaction, TxOut};

fn arb_outpoint() -> impl Strategy<Value = Outpoint> {
    (prop::array::uniform32(any::<u8>()), 0u32..1000).prop_map(|(txid, index)| Outpoint::new(txid, index))
}

fn arb_input() -> impl Strategy<Value = TxIn> {
    (
        arb_outpoint(),
        prop::collection::vec(any::<u8>(), 0..64),
        any::<u32>(),
    )
        .prop_map(|(outpoint, script, sequence)| {
            TxIn::new(outpoint, Script::from_bytes(&script), sequence)
        })
}

fn arb_output() -> impl Strategy<Value = TxOut> {
    (0i64..21_000_000 * 100_000_000, prop::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(value, script)| TxOut::new(value, Script::from_bytes(&script)))
}

fn arb_tx() -> impl Strategy<Value = Transaction> {
    (
        1u32..=2,
        prop::collection::vec(arb_input(), 1..4),
        prop::collection::vec(arb_output(), 1..4),
        any::<u32>(),
    )
        .prop_map(|(version, inputs, outputs, lock_time)| Transaction {
            version,
            inputs,
            outputs,
            lock_time,
            unspents: Vec::new(),
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn serialization_roundtrip(tx in arb_tx()) {
        let decoded = Transaction::from_bytes(&tx.to_bytes()).unwrap();
        prop_assert_eq!(&decoded.version, &tx.version);
        prop_assert_eq!(&decoded.inputs, &tx.inputs);
        prop_assert_eq!(&decoded.outputs, &tx.outputs);
        prop_assert_eq!(&decoded.lock_time, &tx.lock_time);
        prop_assert_eq!(decoded.tx_id(), tx.tx_id());
    }

    #[test]
    fn fixture_extension_roundtrip(tx in arb_tx()) {
        let mut tx = tx;
        let unspents: Vec<Spendable> = tx
            .inputs
            .iter()
            .map(|input| {
                Spendable::new(
                    1000,
                    Script::from_bytes(&[0x51]),
                    input.previous_output.txid,
                    input.previous_output.index,
                )
            })
            .collect();
        tx.set_unspents(unspents).unwrap();
        let decoded = Transaction::from_bytes_with_unspents(&tx.to_bytes_with_unspents()).unwrap();
        prop_assert_eq!(&decoded.unspents, &tx.unspents);
        prop_assert_eq!(decoded.tx_id(), tx.tx_id());
    }

    #[test]
    fn sighash_is_deterministic_and_script_sig_independent(tx in arb_tx()) {
        let mut tx = tx;
        let prior = Script::from_bytes(&[0x76, 0xa9]);
        let digest = signature_hash(&tx, 0, &prior, SIGHASH_ALL).unwrap();
        prop_assert_eq!(signature_hash(&tx, 0, &prior, SIGHASH_ALL).unwrap(), digest);

        // Rewriting any scriptSig leaves the digest unchanged.
        for input in &mut tx.inputs {
            input.script_sig = Script::from_bytes(&[0xde, 0xad]);
        }
        prop_assert_eq!(signature_hash(&tx, 0, &prior, SIGHASH_ALL).unwrap(), digest);
    }
}
