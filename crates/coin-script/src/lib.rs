/// Script handling for the validation engine.
///
/// Provides the Script type, the opcode table, text compilation and
/// disassembly, standard output-script templates, address encoding,
/// and the stack-machine interpreter.

pub mod address;
pub mod chunk;
pub mod codec;
pub mod interpreter;
pub mod opcodes;
pub mod script;
pub mod templates;

mod error;
pub use error::ScriptError;
pub use script::Script;
pub use address::{Address, AddressKind, Network};
pub use chunk::ScriptChunk;
pub use templates::ScriptType;
