//! Host IR for the add-fusion autovectorizer.
//!
//! This crate provides what a compiler framework would otherwise supply to
//! the pass:
//!
//! - **Function IR** ([`Function`], [`Block`], [`Inst`], [`Value`]) — an
//!   arena of instructions addressed by stable [`InstId`]s, with per-value
//!   use-lists kept in sync by every mutation.
//! - **Construction** ([`Builder`]) — emits instructions before or after an
//!   existing one, or at the end of a block.
//! - **Text** ([`parse_module`], [`parse_function`], `Display`) — a small
//!   LLVM-flavoured textual form, used by the driver and by tests.
//! - **Verification** ([`verify`]) — dangling operands, definition order
//!   and use-list consistency.
//!
//! # Design
//!
//! Instruction kinds form a closed enum and every query over them is an
//! exhaustive `match`; the pass asks for an [`InstClass`] instead of
//! downcasting. Erasure tombstones the arena slot, so ids stay valid for
//! the lifetime of the function.

pub mod builder;
mod error;
pub mod ir;
pub mod parse;
mod print;
pub mod verify;

pub use builder::{Builder, InsertPoint};
pub use error::IrError;
pub use ir::{
    ArgId, BinOp, Block, BlockId, Constant, Function, Inst, InstClass, InstData, InstId, Param,
    Symbol, Type, Use, Value,
};
pub use parse::{parse_function, parse_module, ParseError};
pub use print::{DisplayInst, DisplayValue};
pub use verify::{verify, VerifyError};
