//! Script text compilation and disassembly.
//!
//! Compiles whitespace-separated mnemonic text to binary scripts and
//! back. Tokens are opcode names (with or without the `OP_` prefix),
//! bracketed hex pushes (`[aabb]`), decimal integer literals,
//! single-quoted strings, raw `0x`-prefixed bytes appended verbatim
//! (the form the external test vectors use for explicit encodings),
//! or bare hex pushes.
//!
//! Disassembly renders pushes as `[hex]` and opcodes by their canonical
//! names; that output recompiles to the same bytes, except for the
//! alternate PUSHDATA encodings, which disassemble to the canonical
//! minimal form.

use crate::chunk::read_chunk;
use crate::opcodes::{opcode_to_string, string_to_opcode};
use crate::{Script, ScriptError};

pub use crate::interpreter::scriptnum::{int_from_script_bytes, int_to_script_bytes};

/// Compile script text into a binary script.
pub fn compile(text: &str) -> Result<Script, ScriptError> {
    let mut script = Script::new();
    for token in text.split_whitespace() {
        if let Some(op) = string_to_opcode(token) {
            script.append_opcodes(&[op])?;
        } else if let Some(raw) = token.strip_prefix("0x") {
            // Raw bytes, appended without a push prefix.
            let bytes = hex::decode(raw)
                .map_err(|_| ScriptError::BadLiteral(token.to_string()))?;
            let mut with_raw = script.to_bytes().to_vec();
            with_raw.extend_from_slice(&bytes);
            script = Script::from_bytes(&with_raw);
        } else if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
            script.append_push_data(token[1..token.len() - 1].as_bytes())?;
        } else if token.starts_with('[') && token.ends_with(']') {
            let mut inner = token[1..token.len() - 1].to_string();
            if inner.len() % 2 == 1 {
                inner.insert(0, '0');
            }
            let bytes = hex::decode(&inner)
                .map_err(|_| ScriptError::BadLiteral(token.to_string()))?;
            script.append_push_data(&bytes)?;
        } else if let Ok(n) = token.parse::<i64>() {
            script.append_push_data(&int_to_script_bytes(n))?;
        } else if token.len() % 2 == 0 {
            let bytes = hex::decode(token)
                .map_err(|_| ScriptError::UnknownToken(token.to_string()))?;
            script.append_push_data(&bytes)?;
        } else {
            return Err(ScriptError::UnknownToken(token.to_string()));
        }
    }
    Ok(script)
}

/// Disassemble a binary script into mnemonic text.
///
/// Trailing bytes that do not parse (a push header past the end of the
/// script) are reported inline as a final `[error: hex]` token rather
/// than silently dropped.
pub fn disassemble(script: &Script) -> String {
    let bytes = script.to_bytes();
    let mut tokens: Vec<String> = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        match read_chunk(bytes, pos) {
            Ok((chunk, next)) => {
                match chunk.data {
                    Some(data) => tokens.push(format!("[{}]", hex::encode(data))),
                    None => tokens.push(opcode_to_string(chunk.op).to_string()),
                }
                pos = next;
            }
            Err(_) => {
                tokens.push(format!("[error: {}]", hex::encode(&bytes[pos..])));
                break;
            }
        }
    }
    tokens.join(" ")
}

/// Build a push-only script from a list of byte strings.
///
/// Each item is pushed with the same minimal encoding `compile` picks;
/// an empty item pushes the empty string (OP_0). Items of 0x1000000
/// bytes or more are rejected.
pub fn bin_script(items: &[&[u8]]) -> Result<Script, ScriptError> {
    let mut script = Script::new();
    for item in items {
        script.append_push_data(item)?;
    }
    Ok(script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::MAX_PUSH_SIZE;
    use crate::opcodes::*;

    fn check_roundtrip(text: &str) {
        let b1 = compile(text).expect("compiles");
        let s1 = disassemble(&b1);
        let b2 = compile(&s1).expect("recompiles");
        assert_eq!(text, s1, "disassembly differs for '{}'", text);
        assert_eq!(b1, b2, "recompile differs for '{}'", text);
    }

    /// Build deterministic pseudo-random hex of `size` bytes.
    fn build_hex(size: usize, a: u64, b: u64) -> String {
        let body: String = (0..size)
            .map(|i| format!("{:02x}", ((i as u64 + a) * b) & 0xff))
            .collect();
        format!("[{}]", body)
    }

    #[test]
    fn test_compile_decompile_pushes() {
        check_roundtrip("[ff]");
        check_roundtrip("[ff03]");
        check_roundtrip("[ff030102]");
        check_roundtrip("[55aabbccddeeff112131]");
        let long_260 = build_hex(260, 13, 93);
        let long_270 = build_hex(270, 11, 47);
        check_roundtrip(&format!("{} {}", long_260, long_270));
    }

    #[test]
    fn test_compile_decompile_opcodes() {
        // Every named opcode round-trips. The PUSHDATA forms are the
        // documented exception: they disassemble to the minimal form.
        for op in 0u8..=OP_NOP10 {
            let name = opcode_to_string(op);
            if name == "OP_UNKNOWN" || name.starts_with("OP_PUSHDATA") {
                continue;
            }
            // Direct pushes have no standalone name either.
            if (OP_DATA_1..=OP_DATA_75).contains(&op) {
                continue;
            }
            check_roundtrip(name);
        }
    }

    #[test]
    fn test_compile_p2pkh_text() {
        let script = compile(
            "OP_DUP OP_HASH160 [e2a623699e81b291c0327f408fea765d534baa2a] OP_EQUALVERIFY OP_CHECKSIG",
        )
        .unwrap();
        assert_eq!(
            script.to_hex(),
            "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac"
        );
    }

    #[test]
    fn test_compile_bare_names_and_raw_hex() {
        // The external vector format: bare names plus 0x raw bytes.
        let a = compile("DUP HASH160 0x14 0xe2a623699e81b291c0327f408fea765d534baa2a EQUALVERIFY CHECKSIG").unwrap();
        let b = compile(
            "OP_DUP OP_HASH160 [e2a623699e81b291c0327f408fea765d534baa2a] OP_EQUALVERIFY OP_CHECKSIG",
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compile_small_int_literals() {
        // 1..16 hit the OP_N table; larger decimals push script numbers.
        assert_eq!(compile("1").unwrap().to_bytes(), &[OP_1]);
        assert_eq!(compile("16").unwrap().to_bytes(), &[OP_16]);
        assert_eq!(compile("17").unwrap().to_bytes(), &[0x01, 0x11]);
        assert_eq!(compile("-5").unwrap().to_bytes(), &[0x01, 0x85]);
        assert_eq!(compile("1000").unwrap().to_bytes(), &[0x02, 0xe8, 0x03]);
    }

    #[test]
    fn test_compile_quoted_string() {
        let script = compile("'abc'").unwrap();
        assert_eq!(script.to_bytes(), &[0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn test_compile_unknown_token() {
        assert!(matches!(
            compile("OP_BOGUS"),
            Err(ScriptError::UnknownToken(_))
        ));
        assert!(compile("[zz]").is_err());
    }

    #[test]
    fn test_disassemble_multisig_script_sig() {
        // A testnet scriptSig spending a 2-of-3 multisig, with an extra
        // OP_0 appended: OP_0, two signature pushes, the PUSHDATA1
        // redeem push, and the trailing OP_0.
        let script = Script::from_hex(
            "0047304402201f994ca49451bc764fd090f31adb2fa4381b91f967dc05a6f538d4d1baaa83cd022\
             06ef3ad06de7890bc4130b4f57401412ca94897ea19b646f794a4472375351c1f0147304402201f\
             994ca49451bc764fd090f31adb2fa4381b91f967dc05a6f538d4d1baaa83cd02204655e9eccac41\
             2407dfc3e5753a0f2ac605e41c7eb91630dc67137f2d8081c3a014d0b0152410479be667ef9dcbb\
             ac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798483ada7726a3c4655da4fbfc0e110\
             8a8fd17b448a68554199c47d08ffb10d4b84104c6047f9441ed7d6d3045406e95c07cd85c778e4b\
             8cef3ca7abac09b95c709ee51ae168fea63dc339a3c58419466ceaeef7f632653266d0e1236431a\
             950cfe52a4104f9308a019258c31049344f85f89d5229b531c845836f99b08601f113bce036f938\
             8f7b0f632de8140fe337e62a37f3566500a99934c2231b6cb9fd7584b8e6724104e493dbf1c10d8\
             0f3581e4904930b1404cc6c13900ee0758474fa94abe8c4cd1351ed993ea0d455b75642e2098ea5\
             1448d967ae33bfbdfe40cfe97bdc4773992254ae00",
        )
        .unwrap();
        let text = disassemble(&script);
        let parts: Vec<&str> = text.split(' ').collect();
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], "OP_0");
        assert_eq!(parts[4], "OP_0");
    }

    #[test]
    fn test_disassemble_reports_trailing_garbage() {
        // A push header claiming 5 bytes with only 2 present.
        let script = Script::from_bytes(&[OP_DUP, 0x05, 0xaa, 0xbb]);
        let text = disassemble(&script);
        assert_eq!(text, "OP_DUP [error: 05aabb]");
    }

    #[test]
    fn test_bin_script_boundaries() {
        // Encoding form selection at every documented boundary.
        let cases: &[(usize, &[u8])] = &[
            (0, &[0x00]),
            (1, &[0x01]),
            (75, &[0x4b]),
            (76, &[0x4c, 76]),
            (255, &[0x4c, 255]),
            (256, &[0x4d, 0x00, 0x01]),
            (65535, &[0x4d, 0xff, 0xff]),
            (65536, &[0x4e, 0x00, 0x00, 0x01, 0x00]),
        ];
        for (len, prefix) in cases {
            let data = vec![0x42u8; *len];
            let script = bin_script(&[&data]).unwrap();
            assert_eq!(&script.to_bytes()[..prefix.len()], *prefix, "len {}", len);
            assert_eq!(script.len(), prefix.len() + len, "len {}", len);
        }
    }

    #[test]
    fn test_bin_script_rejects_max_push() {
        let data = vec![30u8; MAX_PUSH_SIZE];
        assert!(matches!(
            bin_script(&[&data]),
            Err(ScriptError::PushTooLarge(_))
        ));
        let ok = vec![30u8; MAX_PUSH_SIZE - 1];
        assert!(bin_script(&[&ok]).is_ok());
    }

    #[test]
    fn test_int_script_bytes_law() {
        for i in -127i64..127 {
            assert_eq!(int_from_script_bytes(&int_to_script_bytes(i)), i);
        }
        for i in (-1024i64..1024).step_by(16) {
            assert_eq!(int_from_script_bytes(&int_to_script_bytes(i)), i);
        }
        for i in (-1_048_576i64..1_048_576).step_by(10_000) {
            assert_eq!(int_from_script_bytes(&int_to_script_bytes(i)), i);
        }
        assert_eq!(int_to_script_bytes(0), Vec::<u8>::new());
        assert_eq!(int_to_script_bytes(1), vec![0x01]);
        assert_eq!(int_to_script_bytes(127), vec![0x7f]);
        assert_eq!(int_to_script_bytes(128), vec![0x80, 0x00]);
    }
}
